//! GPU 缓冲区
//!
//! - 默认堆缓冲区：只在初始化时通过中间上传缓冲区填充一次（顶点、索引）
//! - `MappedBuffer`：上传堆上持久映射的缓冲区，作为 `UploadBuffer` 的后备内存
//! - `GpuMesh`：把 `MeshGeometry` 上传到 GPU 并保存顶点/索引缓冲区视图

use tracing::debug;
use windows::Win32::Graphics::Direct3D::*;
use windows::Win32::Graphics::Direct3D12::*;
use windows::Win32::Graphics::Dxgi::Common::*;

use crate::core::error::{GraphicsError, Result};
use crate::geometry::{MeshGeometry, VertexLayout};
use crate::renderer::upload::MappedMemory;

use super::context::transition;

fn buffer_desc(size: u64) -> D3D12_RESOURCE_DESC {
    D3D12_RESOURCE_DESC {
        Dimension: D3D12_RESOURCE_DIMENSION_BUFFER,
        Width: size,
        Height: 1,
        DepthOrArraySize: 1,
        MipLevels: 1,
        SampleDesc: DXGI_SAMPLE_DESC { Count: 1, Quality: 0 },
        Layout: D3D12_TEXTURE_LAYOUT_ROW_MAJOR,
        ..Default::default()
    }
}

/// 在指定类型的堆上创建缓冲区
pub fn create_buffer(
    device: &ID3D12Device,
    heap_type: D3D12_HEAP_TYPE,
    size: u64,
    state: D3D12_RESOURCE_STATES,
) -> Result<ID3D12Resource> {
    let heap_props = D3D12_HEAP_PROPERTIES {
        Type: heap_type,
        ..Default::default()
    };

    let mut buffer: Option<ID3D12Resource> = None;
    unsafe {
        device
            .CreateCommittedResource(
                &heap_props,
                D3D12_HEAP_FLAG_NONE,
                &buffer_desc(size),
                state,
                None,
                &mut buffer,
            )
            .map_err(|e| GraphicsError::ResourceCreation(format!("Failed to create {} byte buffer: {}", size, e)))?;
    }
    buffer.ok_or_else(|| GraphicsError::ResourceCreation("CreateCommittedResource returned no buffer".to_string()).into())
}

/// 创建默认堆缓冲区并录制从上传缓冲区复制数据的命令
///
/// 返回 `(默认缓冲区, 上传缓冲区)`。上传缓冲区必须存活到
/// 命令列表执行完毕为止。
pub fn create_default_buffer(
    device: &ID3D12Device,
    list: &ID3D12GraphicsCommandList,
    data: &[u8],
) -> Result<(ID3D12Resource, ID3D12Resource)> {
    let size = data.len() as u64;

    let default_buffer = create_buffer(device, D3D12_HEAP_TYPE_DEFAULT, size, D3D12_RESOURCE_STATE_COMMON)?;
    let mut upload = MappedBuffer::new(device, size)?;
    upload.as_bytes_mut().copy_from_slice(data);

    transition(list, &default_buffer, D3D12_RESOURCE_STATE_COMMON, D3D12_RESOURCE_STATE_COPY_DEST);
    unsafe {
        list.CopyBufferRegion(&default_buffer, 0, upload.resource(), 0, size);
    }
    transition(list, &default_buffer, D3D12_RESOURCE_STATE_COPY_DEST, D3D12_RESOURCE_STATE_GENERIC_READ);

    Ok((default_buffer, upload.into_resource()))
}

/// 上传堆上持久映射的缓冲区
///
/// 映射在整个生命周期内有效，CPU 写入后 GPU 直接读取。
/// 写入仍被 GPU 使用的区域是调用方的责任（由帧资源环保证）。
pub struct MappedBuffer {
    resource: ID3D12Resource,
    data: *mut u8,
    size: usize,
}

impl MappedBuffer {
    pub fn new(device: &ID3D12Device, size: u64) -> Result<Self> {
        let resource = create_buffer(device, D3D12_HEAP_TYPE_UPLOAD, size, D3D12_RESOURCE_STATE_GENERIC_READ)?;

        let mut data = std::ptr::null_mut();
        unsafe {
            resource
                .Map(0, None, Some(&mut data))
                .map_err(|e| GraphicsError::ResourceCreation(format!("Failed to map upload buffer: {}", e)))?;
        }
        if data.is_null() {
            return Err(GraphicsError::ResourceCreation("Map returned a null pointer".to_string()).into());
        }

        Ok(Self {
            resource,
            data: data as *mut u8,
            size: size as usize,
        })
    }

    pub fn resource(&self) -> &ID3D12Resource {
        &self.resource
    }

    fn into_resource(self) -> ID3D12Resource {
        let resource = self.resource.clone();
        drop(self);
        resource
    }
}

impl MappedMemory for MappedBuffer {
    fn as_bytes(&self) -> &[u8] {
        unsafe { std::slice::from_raw_parts(self.data, self.size) }
    }

    fn as_bytes_mut(&mut self) -> &mut [u8] {
        unsafe { std::slice::from_raw_parts_mut(self.data, self.size) }
    }

    fn gpu_address(&self) -> u64 {
        unsafe { self.resource.GetGPUVirtualAddress() }
    }
}

impl Drop for MappedBuffer {
    fn drop(&mut self) {
        unsafe {
            self.resource.Unmap(0, None);
        }
    }
}

/// 上传到 GPU 的网格
pub struct GpuMesh {
    /// 视图引用这两个缓冲区的 GPU 地址，必须与网格同生命周期
    _buffers: [ID3D12Resource; 2],
    uploaders: Vec<ID3D12Resource>,
    vertex_buffer_view: D3D12_VERTEX_BUFFER_VIEW,
    index_buffer_view: D3D12_INDEX_BUFFER_VIEW,
}

impl GpuMesh {
    /// 录制上传命令；命令执行完毕后调用 `release_uploaders`
    pub fn new<V: VertexLayout>(
        device: &ID3D12Device,
        list: &ID3D12GraphicsCommandList,
        mesh: &MeshGeometry<V>,
    ) -> Result<Self> {
        mesh.validate()?;

        let (vertex_buffer, vertex_upload) = create_default_buffer(device, list, mesh.vertex_bytes())?;
        let (index_buffer, index_upload) = create_default_buffer(device, list, mesh.index_bytes())?;

        let vertex_buffer_view = D3D12_VERTEX_BUFFER_VIEW {
            BufferLocation: unsafe { vertex_buffer.GetGPUVirtualAddress() },
            SizeInBytes: mesh.vertex_buffer_byte_size(),
            StrideInBytes: mesh.vertex_byte_stride(),
        };
        let index_buffer_view = D3D12_INDEX_BUFFER_VIEW {
            BufferLocation: unsafe { index_buffer.GetGPUVirtualAddress() },
            SizeInBytes: mesh.index_buffer_byte_size(),
            Format: DXGI_FORMAT_R16_UINT,
        };

        debug!(
            mesh = %mesh.name,
            vertices = mesh.vertices.len(),
            indices = mesh.indices.len(),
            "Mesh upload recorded"
        );

        Ok(Self {
            _buffers: [vertex_buffer, index_buffer],
            uploaders: vec![vertex_upload, index_upload],
            vertex_buffer_view,
            index_buffer_view,
        })
    }

    pub fn release_uploaders(&mut self) {
        self.uploaders.clear();
    }

    /// 绑定顶点/索引缓冲区和三角形列表拓扑
    pub fn bind(&self, list: &ID3D12GraphicsCommandList) {
        unsafe {
            list.IASetVertexBuffers(0, Some(&[self.vertex_buffer_view]));
            list.IASetIndexBuffer(Some(&self.index_buffer_view));
            list.IASetPrimitiveTopology(D3D_PRIMITIVE_TOPOLOGY_TRIANGLELIST);
        }
    }
}
