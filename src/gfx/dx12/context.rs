//! Direct3D 12 设备上下文
//!
//! 两个示例共用的底层资源：设备、命令队列、交换链、
//! 深度/模板缓冲区、描述符堆和 fence。
//!
//! # 初始化流程
//!
//! 1. 启用调试层（配置开启时）
//! 2. 创建 DXGI 工厂
//! 3. 创建 D3D12 设备，硬件失败时回退到 WARP
//! 4. 创建 fence、命令队列、分配器和命令列表
//! 5. 创建交换链和 RTV/DSV 描述符堆
//! 6. 按窗口尺寸创建渲染目标视图和深度/模板缓冲区

use std::mem::ManuallyDrop;
use std::sync::Arc;

use tracing::{debug, info, warn};
use windows::{
    core::Interface, Win32::Foundation::*, Win32::Graphics::Direct3D::*,
    Win32::Graphics::Direct3D12::*, Win32::Graphics::Dxgi::Common::*, Win32::Graphics::Dxgi::*,
    Win32::System::Threading::*,
};
use winit::raw_window_handle::{HasWindowHandle, RawWindowHandle};
use winit::window::Window;

use crate::core::error::{GraphicsError, Result};
use crate::core::Config;
use crate::renderer::sync::{self, FenceCounter, FenceValue, GpuFence};

/// 交换链缓冲区数量
pub const SWAP_CHAIN_BUFFER_COUNT: usize = 2;
pub const BACK_BUFFER_FORMAT: DXGI_FORMAT = DXGI_FORMAT_R8G8B8A8_UNORM;
/// 镜面场景需要模板位
pub const DEPTH_STENCIL_FORMAT: DXGI_FORMAT = DXGI_FORMAT_D24_UNORM_S8_UINT;

/// 命令队列上的 fence
pub struct Dx12Fence {
    fence: ID3D12Fence,
    queue: ID3D12CommandQueue,
    event: HANDLE,
}

impl Dx12Fence {
    fn new(device: &ID3D12Device, queue: &ID3D12CommandQueue) -> Result<Self> {
        unsafe {
            let fence: ID3D12Fence = device
                .CreateFence(0, D3D12_FENCE_FLAG_NONE)
                .map_err(|e| GraphicsError::Synchronization(format!("Failed to create fence: {}", e)))?;
            let event = CreateEventA(None, false, false, None)
                .map_err(|e| GraphicsError::Synchronization(format!("Failed to create fence event: {}", e)))?;

            Ok(Self {
                fence,
                queue: queue.clone(),
                event,
            })
        }
    }
}

impl GpuFence for Dx12Fence {
    fn completed_value(&self) -> FenceValue {
        FenceValue::new(unsafe { self.fence.GetCompletedValue() })
    }

    fn wait_for(&self, value: FenceValue) -> Result<()> {
        unsafe {
            self.fence
                .SetEventOnCompletion(value.value(), self.event)
                .map_err(|e| GraphicsError::Synchronization(format!("Failed to set fence event: {}", e)))?;
            WaitForSingleObject(self.event, INFINITE);
        }
        Ok(())
    }

    fn signal(&self, value: FenceValue) -> Result<()> {
        unsafe { self.queue.Signal(&self.fence, value.value()) }
            .map_err(|e| GraphicsError::Synchronization(format!("Failed to signal fence {}: {}", value, e)))?;
        Ok(())
    }
}

impl Drop for Dx12Fence {
    fn drop(&mut self) {
        unsafe {
            let _ = CloseHandle(self.event);
        }
    }
}

/// Direct3D 12 上下文
pub struct Dx12Context {
    pub device: ID3D12Device,
    pub command_queue: ID3D12CommandQueue,
    /// 初始化和资源上传使用的分配器
    pub direct_allocator: ID3D12CommandAllocator,
    pub command_list: ID3D12GraphicsCommandList,

    pub swap_chain: IDXGISwapChain3,
    swap_chain_buffers: Vec<ID3D12Resource>,
    current_back_buffer: usize,
    depth_stencil_buffer: Option<ID3D12Resource>,

    rtv_heap: ID3D12DescriptorHeap,
    rtv_descriptor_size: usize,
    dsv_heap: ID3D12DescriptorHeap,
    /// CBV/SRV/UAV 描述符大小
    pub cbv_srv_uav_descriptor_size: u32,

    pub fence: Dx12Fence,
    pub fence_counter: FenceCounter,

    pub viewport: D3D12_VIEWPORT,
    pub scissor_rect: RECT,
    pub width: u32,
    pub height: u32,
    vsync: bool,

    pub window: Arc<Window>,
}

impl Dx12Context {
    pub fn new(window: Arc<Window>, config: &Config) -> Result<Self> {
        let size = window.inner_size();
        let (width, height) = (size.width.max(1), size.height.max(1));

        unsafe {
            let mut factory_flags = DXGI_CREATE_FACTORY_FLAGS(0);
            if config.graphics.debug_layer {
                let mut debug: Option<ID3D12Debug> = None;
                if let Some(debug) = D3D12GetDebugInterface(&mut debug).ok().and(debug) {
                    debug.EnableDebugLayer();
                    factory_flags |= DXGI_CREATE_FACTORY_DEBUG;
                    debug!("DX12 Debug Layer enabled");
                } else {
                    warn!("Failed to enable DX12 Debug Layer");
                }
            }

            let factory: IDXGIFactory4 = CreateDXGIFactory2(factory_flags)
                .map_err(|e| GraphicsError::DeviceCreation(format!("Failed to create DXGI factory: {}", e)))?;

            let device = create_device(&factory, config.graphics.use_warp)?;

            let queue_desc = D3D12_COMMAND_QUEUE_DESC {
                Type: D3D12_COMMAND_LIST_TYPE_DIRECT,
                Flags: D3D12_COMMAND_QUEUE_FLAG_NONE,
                ..Default::default()
            };
            let command_queue: ID3D12CommandQueue = device
                .CreateCommandQueue(&queue_desc)
                .map_err(|e| GraphicsError::DeviceCreation(format!("Failed to create command queue: {}", e)))?;

            let fence = Dx12Fence::new(&device, &command_queue)?;

            let direct_allocator: ID3D12CommandAllocator = device
                .CreateCommandAllocator(D3D12_COMMAND_LIST_TYPE_DIRECT)
                .map_err(|e| GraphicsError::DeviceCreation(format!("Failed to create command allocator: {}", e)))?;
            let command_list: ID3D12GraphicsCommandList = device
                .CreateCommandList(0, D3D12_COMMAND_LIST_TYPE_DIRECT, &direct_allocator, None::<&ID3D12PipelineState>)
                .map_err(|e| GraphicsError::DeviceCreation(format!("Failed to create command list: {}", e)))?;
            // 第一次 Reset 之前必须先关闭
            command_list
                .Close()
                .map_err(|e| GraphicsError::CommandExecution(format!("Failed to close command list: {}", e)))?;

            let hwnd = window_hwnd(&window)?;
            let swap_chain_desc = DXGI_SWAP_CHAIN_DESC1 {
                Width: width,
                Height: height,
                Format: BACK_BUFFER_FORMAT,
                SampleDesc: DXGI_SAMPLE_DESC {
                    Count: 1,
                    ..Default::default()
                },
                BufferUsage: DXGI_USAGE_RENDER_TARGET_OUTPUT,
                BufferCount: SWAP_CHAIN_BUFFER_COUNT as u32,
                SwapEffect: DXGI_SWAP_EFFECT_FLIP_DISCARD,
                ..Default::default()
            };
            let swap_chain: IDXGISwapChain1 = factory
                .CreateSwapChainForHwnd(&command_queue, hwnd, &swap_chain_desc, None, None)
                .map_err(|e| GraphicsError::SwapchainError(format!("Failed to create swap chain: {}", e)))?;
            let swap_chain: IDXGISwapChain3 = swap_chain
                .cast()
                .map_err(|e| GraphicsError::SwapchainError(format!("IDXGISwapChain3 unavailable: {}", e)))?;

            let rtv_heap: ID3D12DescriptorHeap = device
                .CreateDescriptorHeap(&D3D12_DESCRIPTOR_HEAP_DESC {
                    NumDescriptors: SWAP_CHAIN_BUFFER_COUNT as u32,
                    Type: D3D12_DESCRIPTOR_HEAP_TYPE_RTV,
                    Flags: D3D12_DESCRIPTOR_HEAP_FLAG_NONE,
                    NodeMask: 0,
                })
                .map_err(|e| GraphicsError::ResourceCreation(format!("Failed to create RTV heap: {}", e)))?;
            let dsv_heap: ID3D12DescriptorHeap = device
                .CreateDescriptorHeap(&D3D12_DESCRIPTOR_HEAP_DESC {
                    NumDescriptors: 1,
                    Type: D3D12_DESCRIPTOR_HEAP_TYPE_DSV,
                    Flags: D3D12_DESCRIPTOR_HEAP_FLAG_NONE,
                    NodeMask: 0,
                })
                .map_err(|e| GraphicsError::ResourceCreation(format!("Failed to create DSV heap: {}", e)))?;

            let rtv_descriptor_size =
                device.GetDescriptorHandleIncrementSize(D3D12_DESCRIPTOR_HEAP_TYPE_RTV) as usize;
            let cbv_srv_uav_descriptor_size =
                device.GetDescriptorHandleIncrementSize(D3D12_DESCRIPTOR_HEAP_TYPE_CBV_SRV_UAV);

            let mut context = Self {
                device,
                command_queue,
                direct_allocator,
                command_list,
                swap_chain,
                swap_chain_buffers: Vec::with_capacity(SWAP_CHAIN_BUFFER_COUNT),
                current_back_buffer: 0,
                depth_stencil_buffer: None,
                rtv_heap,
                rtv_descriptor_size,
                dsv_heap,
                cbv_srv_uav_descriptor_size,
                fence,
                fence_counter: FenceCounter::new(),
                viewport: D3D12_VIEWPORT::default(),
                scissor_rect: RECT::default(),
                width,
                height,
                vsync: config.graphics.vsync,
                window,
            };
            context.create_size_dependent_resources()?;

            info!(
                width,
                height,
                buffers = SWAP_CHAIN_BUFFER_COUNT,
                vsync = context.vsync,
                "DX12 context initialized"
            );
            Ok(context)
        }
    }

    /// 等待 GPU 执行完队列中的所有命令
    pub fn flush(&mut self) -> Result<FenceValue> {
        sync::flush(&self.fence, &mut self.fence_counter)
    }

    /// 按新的客户区尺寸重建交换链缓冲区和深度/模板缓冲区
    pub fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        if width == 0 || height == 0 {
            return Ok(());
        }
        self.flush()?;

        // 释放所有对旧缓冲区的引用之后才能 ResizeBuffers
        self.swap_chain_buffers.clear();
        self.depth_stencil_buffer = None;

        unsafe {
            self.swap_chain
                .ResizeBuffers(
                    SWAP_CHAIN_BUFFER_COUNT as u32,
                    width,
                    height,
                    BACK_BUFFER_FORMAT,
                    DXGI_SWAP_CHAIN_FLAG(0),
                )
                .map_err(|e| GraphicsError::SwapchainError(format!("Failed to resize swap chain: {}", e)))?;
        }

        self.width = width;
        self.height = height;
        self.create_size_dependent_resources()?;

        debug!(width, height, "Resize completed");
        Ok(())
    }

    fn create_size_dependent_resources(&mut self) -> Result<()> {
        unsafe {
            let rtv_start = self.rtv_heap.GetCPUDescriptorHandleForHeapStart();
            for i in 0..SWAP_CHAIN_BUFFER_COUNT {
                let surface: ID3D12Resource = self
                    .swap_chain
                    .GetBuffer(i as u32)
                    .map_err(|e| GraphicsError::SwapchainError(format!("Failed to get swap chain buffer {}: {}", i, e)))?;
                let handle = D3D12_CPU_DESCRIPTOR_HANDLE {
                    ptr: rtv_start.ptr + i * self.rtv_descriptor_size,
                };
                self.device.CreateRenderTargetView(&surface, None, handle);
                self.swap_chain_buffers.push(surface);
            }
            self.current_back_buffer = self.swap_chain.GetCurrentBackBufferIndex() as usize;

            let depth_heap_props = D3D12_HEAP_PROPERTIES {
                Type: D3D12_HEAP_TYPE_DEFAULT,
                ..Default::default()
            };
            let depth_resource_desc = D3D12_RESOURCE_DESC {
                Dimension: D3D12_RESOURCE_DIMENSION_TEXTURE2D,
                Width: self.width as u64,
                Height: self.height,
                DepthOrArraySize: 1,
                MipLevels: 1,
                Format: DEPTH_STENCIL_FORMAT,
                SampleDesc: DXGI_SAMPLE_DESC { Count: 1, Quality: 0 },
                Layout: D3D12_TEXTURE_LAYOUT_UNKNOWN,
                Flags: D3D12_RESOURCE_FLAG_ALLOW_DEPTH_STENCIL,
                ..Default::default()
            };
            let clear_value = D3D12_CLEAR_VALUE {
                Format: DEPTH_STENCIL_FORMAT,
                Anonymous: D3D12_CLEAR_VALUE_0 {
                    DepthStencil: D3D12_DEPTH_STENCIL_VALUE {
                        Depth: 1.0,
                        Stencil: 0,
                    },
                },
            };

            let mut depth_stencil_buffer: Option<ID3D12Resource> = None;
            self.device
                .CreateCommittedResource(
                    &depth_heap_props,
                    D3D12_HEAP_FLAG_NONE,
                    &depth_resource_desc,
                    D3D12_RESOURCE_STATE_DEPTH_WRITE,
                    Some(&clear_value),
                    &mut depth_stencil_buffer,
                )
                .map_err(|e| GraphicsError::ResourceCreation(format!("Failed to create depth stencil buffer: {}", e)))?;
            let depth_stencil_buffer = depth_stencil_buffer.ok_or_else(|| {
                GraphicsError::ResourceCreation("CreateCommittedResource returned no depth buffer".to_string())
            })?;

            self.device.CreateDepthStencilView(
                &depth_stencil_buffer,
                None,
                self.dsv_heap.GetCPUDescriptorHandleForHeapStart(),
            );
            self.depth_stencil_buffer = Some(depth_stencil_buffer);
        }

        self.viewport = D3D12_VIEWPORT {
            TopLeftX: 0.0,
            TopLeftY: 0.0,
            Width: self.width as f32,
            Height: self.height as f32,
            MinDepth: 0.0,
            MaxDepth: 1.0,
        };
        self.scissor_rect = RECT {
            left: 0,
            top: 0,
            right: self.width as i32,
            bottom: self.height as i32,
        };
        Ok(())
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.width as f32 / self.height as f32
    }

    pub fn client_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn current_back_buffer(&self) -> Result<&ID3D12Resource> {
        self.swap_chain_buffers
            .get(self.current_back_buffer)
            .ok_or_else(|| {
                GraphicsError::OutOfBounds {
                    index: self.current_back_buffer,
                    count: self.swap_chain_buffers.len(),
                }
                .into()
            })
    }

    pub fn current_back_buffer_view(&self) -> D3D12_CPU_DESCRIPTOR_HANDLE {
        let start = unsafe { self.rtv_heap.GetCPUDescriptorHandleForHeapStart() };
        D3D12_CPU_DESCRIPTOR_HANDLE {
            ptr: start.ptr + self.current_back_buffer * self.rtv_descriptor_size,
        }
    }

    pub fn depth_stencil_view(&self) -> D3D12_CPU_DESCRIPTOR_HANDLE {
        unsafe { self.dsv_heap.GetCPUDescriptorHandleForHeapStart() }
    }

    /// 关闭命令列表并提交到队列
    pub fn execute(&self) -> Result<()> {
        unsafe {
            self.command_list
                .Close()
                .map_err(|e| GraphicsError::CommandExecution(format!("Failed to close command list: {}", e)))?;
            let command_lists = [Some(self.command_list.clone().into())];
            self.command_queue.ExecuteCommandLists(&command_lists);
        }
        Ok(())
    }

    /// 重置分配器并让命令列表从它开始录制
    ///
    /// 分配器上一次录制的命令必须已经执行完毕。
    pub fn reset_commands(
        &self,
        allocator: &ID3D12CommandAllocator,
        pso: Option<&ID3D12PipelineState>,
    ) -> Result<()> {
        unsafe {
            allocator
                .Reset()
                .map_err(|e| GraphicsError::CommandExecution(format!("Failed to reset allocator: {}", e)))?;
            self.command_list
                .Reset(allocator, pso)
                .map_err(|e| GraphicsError::CommandExecution(format!("Failed to reset command list: {}", e)))?;
        }
        Ok(())
    }

    /// 用初始化分配器开始录制，用于上传资源
    pub fn begin_setup(&self) -> Result<()> {
        self.reset_commands(&self.direct_allocator, None)
    }

    /// 提交上传命令并等待完成
    pub fn end_setup(&mut self) -> Result<()> {
        self.execute()?;
        self.flush()?;
        Ok(())
    }

    /// 录制每帧开头的命令：后台缓冲区转为渲染目标，设置视口并清屏
    pub fn begin_frame_commands(&self, clear_color: &[f32; 4]) -> Result<()> {
        let list = &self.command_list;
        transition(
            list,
            self.current_back_buffer()?,
            D3D12_RESOURCE_STATE_PRESENT,
            D3D12_RESOURCE_STATE_RENDER_TARGET,
        );

        let rtv = self.current_back_buffer_view();
        let dsv = self.depth_stencil_view();
        unsafe {
            list.RSSetViewports(&[self.viewport]);
            list.RSSetScissorRects(&[self.scissor_rect]);
            list.ClearRenderTargetView(rtv, clear_color, None);
            list.ClearDepthStencilView(dsv, D3D12_CLEAR_FLAG_DEPTH | D3D12_CLEAR_FLAG_STENCIL, 1.0, 0, None);
            list.OMSetRenderTargets(1, Some(&rtv), false, Some(&dsv));
        }
        Ok(())
    }

    /// 后台缓冲区转回呈现状态，提交并呈现
    pub fn end_frame_commands(&mut self) -> Result<()> {
        transition(
            &self.command_list,
            self.current_back_buffer()?,
            D3D12_RESOURCE_STATE_RENDER_TARGET,
            D3D12_RESOURCE_STATE_PRESENT,
        );
        self.execute()?;
        self.present()
    }

    pub fn present(&mut self) -> Result<()> {
        let interval = if self.vsync { 1 } else { 0 };
        unsafe {
            self.swap_chain
                .Present(interval, DXGI_PRESENT(0))
                .ok()
                .map_err(|e| GraphicsError::SwapchainError(format!("Failed to present: {}", e)))?;
        }
        self.current_back_buffer = (self.current_back_buffer + 1) % SWAP_CHAIN_BUFFER_COUNT;
        Ok(())
    }
}

impl Drop for Dx12Context {
    fn drop(&mut self) {
        // GPU 仍可能引用即将释放的资源
        if let Err(e) = self.flush() {
            warn!("Failed to flush command queue on shutdown: {}", e);
        }
    }
}

/// 录制一个状态转换屏障
pub fn transition(
    list: &ID3D12GraphicsCommandList,
    resource: &ID3D12Resource,
    before: D3D12_RESOURCE_STATES,
    after: D3D12_RESOURCE_STATES,
) {
    let barrier = D3D12_RESOURCE_BARRIER {
        Type: D3D12_RESOURCE_BARRIER_TYPE_TRANSITION,
        Flags: D3D12_RESOURCE_BARRIER_FLAG_NONE,
        Anonymous: D3D12_RESOURCE_BARRIER_0 {
            Transition: ManuallyDrop::new(D3D12_RESOURCE_TRANSITION_BARRIER {
                pResource: ManuallyDrop::new(Some(resource.clone())),
                Subresource: D3D12_RESOURCE_BARRIER_ALL_SUBRESOURCES,
                StateBefore: before,
                StateAfter: after,
            }),
        },
    };
    unsafe {
        list.ResourceBarrier(std::slice::from_ref(&barrier));
        // 释放屏障里持有的资源引用
        let transition = ManuallyDrop::into_inner(barrier.Anonymous.Transition);
        drop(ManuallyDrop::into_inner(transition.pResource));
    }
}

unsafe fn create_device(factory: &IDXGIFactory4, use_warp: bool) -> Result<ID3D12Device> {
    if !use_warp {
        let mut device: Option<ID3D12Device> = None;
        match D3D12CreateDevice(None, D3D_FEATURE_LEVEL_11_0, &mut device) {
            Ok(()) => {
                if let Some(device) = device {
                    debug!("D3D12 hardware device created");
                    return Ok(device);
                }
            }
            Err(e) => warn!("Hardware device unavailable ({}), falling back to WARP", e),
        }
    }

    let adapter: IDXGIAdapter = factory
        .EnumWarpAdapter()
        .map_err(|e| GraphicsError::DeviceCreation(format!("Failed to enumerate WARP adapter: {}", e)))?;
    let mut device: Option<ID3D12Device> = None;
    D3D12CreateDevice(&adapter, D3D_FEATURE_LEVEL_11_0, &mut device)
        .map_err(|e| GraphicsError::DeviceCreation(format!("Failed to create WARP device: {}", e)))?;
    info!("Using WARP adapter");
    device.ok_or_else(|| GraphicsError::DeviceCreation("D3D12CreateDevice returned no device".to_string()).into())
}

fn window_hwnd(window: &Window) -> Result<HWND> {
    let handle = window
        .window_handle()
        .map_err(|e| GraphicsError::SwapchainError(format!("Failed to get window handle: {}", e)))?;
    match handle.as_raw() {
        RawWindowHandle::Win32(win32_handle) => Ok(HWND(win32_handle.hwnd.get() as *mut std::ffi::c_void)),
        _ => Err(GraphicsError::SwapchainError("Expected a Win32 window handle".to_string()).into()),
    }
}
