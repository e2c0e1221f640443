//! DirectX 12 图形 API 实现模块
//!
//! - `context`：设备、命令队列、交换链、深度/模板缓冲区和 fence
//! - `buffer`：默认堆/上传堆缓冲区和 GPU 网格
//! - `pipeline`：着色器编译、根签名和 PSO
//! - `box_renderer`：彩色立方体示例
//! - `mirror_renderer`：镜面反射与平面阴影示例

pub mod context;
pub mod buffer;
pub mod pipeline;
pub mod box_renderer;
pub mod mirror_renderer;

// 重新导出常用类型
pub use box_renderer::BoxDemo;
pub use context::Dx12Context;
pub use mirror_renderer::MirrorDemo;
