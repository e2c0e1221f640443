//! d3d_demos - Direct3D 12 示例程序
//!
//! 两个示例共用一个小框架：
//!
//! - `my_box`：可用鼠标环绕观察的彩色立方体
//! - `stencil_demo`：利用模板缓冲区实现的平面镜反射和平面阴影
//!
//! # 模块结构
//!
//! - `core`: 配置、日志、错误处理、计时和输入状态
//! - `math`: 数学类型和 D3D 风格的矩阵函数
//! - `geometry`: 顶点格式、网格数据和程序化几何体
//! - `renderer`: 与图形 API 无关的渲染基础设施（fence、帧资源环、上传缓冲区、管线描述）
//! - `scene`: 两个示例的 CPU 侧场景状态
//! - `app`: 窗口和事件循环
//! - `gfx`: Direct3D 12 后端（仅 Windows）
//!
//! # 使用示例
//!
//! ```
//! use d3d_demos::renderer::sync::{FenceCounter, FenceValue};
//!
//! let mut counter = FenceCounter::new();
//! assert_eq!(counter.current(), FenceValue::NONE);
//! assert_eq!(counter.advance().value(), 1);
//! ```

pub mod core;
pub mod math;
pub mod geometry;
pub mod renderer;
pub mod scene;
pub mod app;
pub mod gfx;
