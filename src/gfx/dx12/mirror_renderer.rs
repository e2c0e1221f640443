//! 镜面反射与平面阴影示例
//!
//! 每个帧资源拥有自己的命令分配器和三组常量缓冲区（渲染遍、物体、材质），
//! CPU 可以领先 GPU 若干帧录制命令。绘制顺序见 `renderer::pass::MIRROR_FRAME`。
//!
//! 根签名：
//!
//! | 参数 | 寄存器 | 内容 |
//! |------|--------|------|
//! | 0    | b0     | 物体常量 |
//! | 1    | b1     | 渲染遍常量 |
//! | 2    | b2     | 材质常量 |

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info, trace, warn};
use windows::Win32::Graphics::Direct3D12::*;
use winit::window::Window;

use crate::app::Demo;
use crate::core::error::{DemoError, GraphicsError, Result};
use crate::core::input::InputSystem;
use crate::core::timer::GameTimer;
use crate::core::Config;
use crate::geometry::Vertex;
use crate::renderer::constants::{MaterialConstants, ObjectConstants, PassConstants};
use crate::renderer::frame::FrameRing;
use crate::renderer::pass::{PassSlot, RenderLayer, MIRROR_FRAME};
use crate::renderer::pipeline::{PipelineKind, ShaderProgram};
use crate::renderer::upload::{BufferUsage, UploadBuffer};
use crate::scene::mirror_scene::{MeshId, MirrorScene, FOG_COLOR, MATERIAL_COUNT, OBJECT_COUNT};

use super::buffer::{GpuMesh, MappedBuffer};
use super::context::Dx12Context;
use super::pipeline;

const ROOT_OBJECT_CB: u32 = 0;
const ROOT_PASS_CB: u32 = 1;
const ROOT_MATERIAL_CB: u32 = 2;

/// 单个帧资源私有的 GPU 资源
struct FrameResources {
    allocator: ID3D12CommandAllocator,
    pass_cb: UploadBuffer<PassConstants, MappedBuffer>,
    object_cb: UploadBuffer<ObjectConstants, MappedBuffer>,
    material_cb: UploadBuffer<MaterialConstants, MappedBuffer>,
}

impl FrameResources {
    fn new(device: &ID3D12Device) -> Result<Self> {
        let allocator: ID3D12CommandAllocator = unsafe { device.CreateCommandAllocator(D3D12_COMMAND_LIST_TYPE_DIRECT) }
            .map_err(|e| GraphicsError::ResourceCreation(format!("Failed to create frame allocator: {}", e)))?;

        Ok(Self {
            allocator,
            pass_cb: constant_buffer(device, PassSlot::COUNT)?,
            object_cb: constant_buffer(device, OBJECT_COUNT)?,
            material_cb: constant_buffer(device, MATERIAL_COUNT)?,
        })
    }
}

fn constant_buffer<T: bytemuck::Pod>(device: &ID3D12Device, count: usize) -> Result<UploadBuffer<T, MappedBuffer>> {
    let size = UploadBuffer::<T, MappedBuffer>::required_size(count, BufferUsage::Constant);
    UploadBuffer::new(MappedBuffer::new(device, size)?, count, BufferUsage::Constant)
}

pub struct MirrorDemo {
    scene: MirrorScene,
    room: GpuMesh,
    subject: GpuMesh,
    root_signature: ID3D12RootSignature,
    pipelines: HashMap<PipelineKind, ID3D12PipelineState>,
    frames: FrameRing<FrameResources>,
    gfx: Dx12Context,
}

impl MirrorDemo {
    pub fn new(window: Arc<Window>, config: &Config) -> Result<Self> {
        let mut gfx = Dx12Context::new(window, config)?;
        let frame_count = config.graphics.frame_resources;
        let scene = MirrorScene::new(gfx.aspect_ratio(), frame_count)?;

        gfx.begin_setup()?;
        let mut room = GpuMesh::new(&gfx.device, &gfx.command_list, scene.mesh(MeshId::Room))?;
        let mut subject = GpuMesh::new(&gfx.device, &gfx.command_list, scene.mesh(MeshId::Subject))?;
        gfx.end_setup()?;
        room.release_uploaders();
        subject.release_uploaders();

        let root_signature = pipeline::create_root_signature(
            &gfx.device,
            &[
                pipeline::root_cbv(0),
                pipeline::root_cbv(1),
                pipeline::root_cbv(2),
            ],
        )?;

        let shaders = pipeline::compile_program(ShaderProgram::Lit)?;
        let layout = pipeline::input_layout::<Vertex>();
        let mut pipelines = HashMap::new();
        for kind in PipelineKind::MIRROR_SCENE {
            let pso = pipeline::create_pipeline_state(&gfx.device, &root_signature, &shaders, &layout, &kind.state())?;
            debug!(pipeline = kind.name(), "PSO created");
            pipelines.insert(kind, pso);
        }

        let device = gfx.device.clone();
        let frames = FrameRing::new(frame_count, |_| FrameResources::new(&device))?;

        info!(frame_resources = frames.frame_count(), pipelines = pipelines.len(), "Stencil demo initialized");

        Ok(Self {
            scene,
            room,
            subject,
            root_signature,
            pipelines,
            frames,
            gfx,
        })
    }

    fn pipeline(&self, kind: PipelineKind) -> Result<&ID3D12PipelineState> {
        self.pipelines
            .get(&kind)
            .ok_or_else(|| DemoError::Runtime(format!("pipeline '{}' was not created", kind.name())))
    }

    fn mesh(&self, id: MeshId) -> &GpuMesh {
        match id {
            MeshId::Room => &self.room,
            MeshId::Subject => &self.subject,
        }
    }

    /// 绘制某一层的全部渲染项
    fn draw_layer(&self, list: &ID3D12GraphicsCommandList, frame: &FrameResources, layer: RenderLayer) -> Result<()> {
        let materials = self.scene.materials();

        for item in self.scene.layer(layer) {
            let material = materials.get(item.material).ok_or(GraphicsError::OutOfBounds {
                index: item.material,
                count: materials.len(),
            })?;
            let object_address = frame.object_cb.element_gpu_address(item.obj_cb_index)?;
            let material_address = frame.material_cb.element_gpu_address(material.cb_index)?;

            self.mesh(item.mesh).bind(list);
            unsafe {
                list.SetGraphicsRootConstantBufferView(ROOT_OBJECT_CB, object_address);
                list.SetGraphicsRootConstantBufferView(ROOT_MATERIAL_CB, material_address);
                list.DrawIndexedInstanced(
                    item.submesh.index_count,
                    1,
                    item.submesh.start_index,
                    item.submesh.base_vertex,
                    0,
                );
            }
        }
        Ok(())
    }
}

impl Demo for MirrorDemo {
    fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        self.gfx.resize(width, height)?;
        self.scene.resize(self.gfx.aspect_ratio());
        Ok(())
    }

    fn update(&mut self, input: &mut InputSystem, timer: &GameTimer) -> Result<()> {
        self.scene.handle_input(input, timer.delta_time());

        // 等待 GPU 释放下一个帧资源
        let frame = self.frames.begin_frame(&self.gfx.fence)?;
        let resources = &mut frame.resources;

        let objects = self.scene.update_object_constants(&mut resources.object_cb)?;
        let materials = self.scene.update_material_constants(&mut resources.material_cb)?;
        self.scene.update_pass_constants(self.gfx.client_size(), timer);
        self.scene.write_pass_constants(&mut resources.pass_cb)?;

        trace!(slot = self.frames.current_index(), objects, materials, "Frame constants updated");
        Ok(())
    }

    fn draw(&mut self, _timer: &GameTimer) -> Result<()> {
        let frame = &self.frames.current().resources;

        self.gfx.reset_commands(&frame.allocator, Some(self.pipeline(PipelineKind::Opaque)?))?;
        self.gfx.begin_frame_commands(&FOG_COLOR.to_array())?;

        let list = &self.gfx.command_list;
        unsafe {
            list.SetGraphicsRootSignature(&self.root_signature);
        }

        for step in &MIRROR_FRAME {
            let pass_address = frame.pass_cb.element_gpu_address(step.pass.index())?;
            unsafe {
                list.SetPipelineState(self.pipeline(step.pipeline)?);
                list.OMSetStencilRef(step.stencil_ref);
                list.SetGraphicsRootConstantBufferView(ROOT_PASS_CB, pass_address);
            }
            self.draw_layer(list, frame, step.layer)?;
        }

        self.gfx.end_frame_commands()?;

        let fence = self.frames.end_frame(&self.gfx.fence, &mut self.gfx.fence_counter)?;
        trace!(slot = self.frames.current_index(), fence = fence.value(), "Frame submitted");
        Ok(())
    }
}

impl Drop for MirrorDemo {
    fn drop(&mut self) {
        if let Err(e) = self.gfx.flush() {
            warn!("Failed to flush before releasing frame resources: {}", e);
        }
    }
}
