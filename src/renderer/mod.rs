//! 渲染器模块
//!
//! 与具体图形 API 无关的渲染基础设施：
//!
//! - `sync`：fence 值、计数器和 `GpuFence` 抽象
//! - `frame`：帧资源环与脏标记
//! - `upload`：常量缓冲区对齐和类型化上传缓冲区
//! - `constants`：着色器常量布局
//! - `pipeline`：管线状态描述
//! - `pass`：渲染层与镜面场景的绘制顺序
//!
//! 具体的 D3D12 实现在 `gfx::dx12` 中，只依赖这里的描述和 trait。

pub mod sync;
pub mod frame;
pub mod upload;
pub mod constants;
pub mod pipeline;
pub mod pass;

pub use frame::{DirtyFrames, FrameResource, FrameRing};
pub use pass::{DrawStep, PassSlot, RenderLayer, MIRROR_FRAME};
pub use pipeline::{PipelineKind, PipelineState};
pub use sync::{FenceCounter, FenceValue, GpuFence};
pub use upload::{BufferUsage, MappedMemory, UploadBuffer};
