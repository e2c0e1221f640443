//! 核心功能模块
//!
//! 本模块提供了两个示例程序共用的基础功能，与具体图形 API 无关：
//!
//! - `config`：配置管理，支持从配置文件加载设置
//! - `log`：日志系统，提供结构化的日志记录功能
//! - `error`：错误处理，定义统一的错误类型
//! - `timer`：帧计时与帧率统计
//! - `input`：鼠标与键盘状态

pub mod config;
pub mod log;
pub mod error;
pub mod timer;
pub mod input;

// 重新导出常用类型，方便使用
pub use config::Config;
pub use error::{Result, DemoError};
pub use timer::{GameTimer, FrameStats};
pub use input::InputSystem;
