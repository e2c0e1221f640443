//! 彩色立方体示例
//!
//! 只有一个物体常量缓冲区，通过着色器可见的 CBV 描述符表绑定。
//! 每帧结束时都会等待 GPU 完成，因此不需要帧资源环。

use std::sync::Arc;

use tracing::{info, warn};
use windows::Win32::Graphics::Direct3D12::*;
use winit::window::Window;

use crate::app::Demo;
use crate::core::error::{GraphicsError, Result};
use crate::core::input::InputSystem;
use crate::core::timer::GameTimer;
use crate::core::Config;
use crate::geometry::generator::BOX_SUBMESH;
use crate::geometry::ColorVertex;
use crate::renderer::constants::BoxConstants;
use crate::renderer::pipeline::PipelineKind;
use crate::renderer::upload::{BufferUsage, UploadBuffer};
use crate::scene::box_scene::{BoxScene, CLEAR_COLOR};

use super::buffer::{GpuMesh, MappedBuffer};
use super::context::Dx12Context;
use super::pipeline;

pub struct BoxDemo {
    scene: BoxScene,
    mesh: GpuMesh,
    root_signature: ID3D12RootSignature,
    pso: ID3D12PipelineState,
    cbv_heap: ID3D12DescriptorHeap,
    constants: UploadBuffer<BoxConstants, MappedBuffer>,
    gfx: Dx12Context,
}

impl BoxDemo {
    pub fn new(window: Arc<Window>, config: &Config) -> Result<Self> {
        let mut gfx = Dx12Context::new(window, config)?;
        let scene = BoxScene::new(gfx.aspect_ratio());

        gfx.begin_setup()?;
        let mut mesh = GpuMesh::new(&gfx.device, &gfx.command_list, scene.mesh())?;
        gfx.end_setup()?;
        mesh.release_uploaders();

        let size = UploadBuffer::<BoxConstants, MappedBuffer>::required_size(1, BufferUsage::Constant);
        let constants = UploadBuffer::new(MappedBuffer::new(&gfx.device, size)?, 1, BufferUsage::Constant)?;

        let cbv_heap = unsafe {
            gfx.device.CreateDescriptorHeap::<ID3D12DescriptorHeap>(&D3D12_DESCRIPTOR_HEAP_DESC {
                NumDescriptors: 1,
                Type: D3D12_DESCRIPTOR_HEAP_TYPE_CBV_SRV_UAV,
                Flags: D3D12_DESCRIPTOR_HEAP_FLAG_SHADER_VISIBLE,
                NodeMask: 0,
            })
        }
        .map_err(|e| GraphicsError::ResourceCreation(format!("Failed to create CBV heap: {}", e)))?;

        let cbv_desc = D3D12_CONSTANT_BUFFER_VIEW_DESC {
            BufferLocation: constants.element_gpu_address(0)?,
            SizeInBytes: constants.element_size() as u32,
        };
        unsafe {
            gfx.device
                .CreateConstantBufferView(Some(&cbv_desc), cbv_heap.GetCPUDescriptorHandleForHeapStart());
        }

        let ranges = [D3D12_DESCRIPTOR_RANGE {
            RangeType: D3D12_DESCRIPTOR_RANGE_TYPE_CBV,
            NumDescriptors: 1,
            BaseShaderRegister: 0,
            RegisterSpace: 0,
            OffsetInDescriptorsFromTableStart: D3D12_DESCRIPTOR_RANGE_OFFSET_APPEND,
        }];
        let root_signature =
            pipeline::create_root_signature(&gfx.device, &[pipeline::root_descriptor_table(&ranges)])?;

        let kind = PipelineKind::Color;
        let state = kind.state();
        let shaders = pipeline::compile_program(state.shader)?;
        let layout = pipeline::input_layout::<ColorVertex>();
        let pso = pipeline::create_pipeline_state(&gfx.device, &root_signature, &shaders, &layout, &state)?;

        info!(pipeline = kind.name(), "Box demo initialized");

        Ok(Self {
            scene,
            mesh,
            root_signature,
            pso,
            cbv_heap,
            constants,
            gfx,
        })
    }
}

impl Demo for BoxDemo {
    fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        self.gfx.resize(width, height)?;
        self.scene.resize(self.gfx.aspect_ratio());
        Ok(())
    }

    fn update(&mut self, input: &mut InputSystem, timer: &GameTimer) -> Result<()> {
        let constants = self.scene.update(input, timer.total_time());
        self.constants.copy_data(0, &constants)
    }

    fn draw(&mut self, _timer: &GameTimer) -> Result<()> {
        let submesh = self.scene.mesh().submesh(BOX_SUBMESH)?;

        self.gfx.reset_commands(&self.gfx.direct_allocator, Some(&self.pso))?;
        self.gfx.begin_frame_commands(&CLEAR_COLOR.to_array())?;

        let list = &self.gfx.command_list;
        unsafe {
            list.SetDescriptorHeaps(&[Some(self.cbv_heap.clone())]);
            list.SetGraphicsRootSignature(&self.root_signature);
            self.mesh.bind(list);
            list.SetGraphicsRootDescriptorTable(0, self.cbv_heap.GetGPUDescriptorHandleForHeapStart());
            list.DrawIndexedInstanced(submesh.index_count, 1, submesh.start_index, submesh.base_vertex, 0);
        }

        self.gfx.end_frame_commands()?;
        // 简单起见每帧都等待 GPU
        self.gfx.flush()?;
        Ok(())
    }
}

impl Drop for BoxDemo {
    fn drop(&mut self) {
        if let Err(e) = self.gfx.flush() {
            warn!("Failed to flush before releasing box resources: {}", e);
        }
    }
}
