//! 图形后端模块
//!
//! 目前只有 Direct3D 12 后端，仅在 Windows 上编译。
//! 与 API 无关的部分（同步、帧资源、常量布局、管线描述）在 `renderer` 中。

#[cfg(target_os = "windows")]
pub mod dx12;

#[cfg(target_os = "windows")]
pub use dx12::{BoxDemo, Dx12Context, MirrorDemo};
