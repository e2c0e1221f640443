//! 错误处理模块
//!
//! 定义了两个示例程序共用的错误类型。
//!
//! # 设计原则
//!
//! - 为每种错误类型提供清晰的上下文信息
//! - 支持错误链（error source）
//! - 易于模式匹配和错误处理

use std::fmt;

/// 统一的 Result 类型
///
/// 所有可能返回错误的函数都应该使用这个类型。
pub type Result<T> = std::result::Result<T, DemoError>;

/// 示例程序的错误类型
#[derive(Debug)]
pub enum DemoError {
    /// 配置错误
    Config(ConfigError),

    /// 图形 API 错误
    Graphics(GraphicsError),

    /// IO 错误
    Io(std::io::Error),

    /// 初始化错误
    Initialization(String),

    /// 运行时错误
    Runtime(String),
}

/// 配置相关的错误
#[derive(Debug)]
pub enum ConfigError {
    /// 配置文件未找到
    FileNotFound(String),

    /// 配置文件解析失败
    ParseError(String),

    /// 配置值无效
    InvalidValue { field: String, reason: String },
}

/// 图形 API 相关的错误
#[derive(Debug)]
pub enum GraphicsError {
    /// 设备创建失败
    DeviceCreation(String),

    /// 交换链错误
    SwapchainError(String),

    /// 着色器编译失败
    ShaderCompilation(String),

    /// 资源创建失败
    ResourceCreation(String),

    /// 渲染命令执行失败
    CommandExecution(String),

    /// CPU/GPU 同步失败
    Synchronization(String),

    /// 缓冲区访问越界
    OutOfBounds { index: usize, count: usize },

    /// 子网格不存在
    MissingSubmesh(String),
}

impl fmt::Display for DemoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DemoError::Config(e) => write!(f, "Configuration error: {}", e),
            DemoError::Graphics(e) => write!(f, "Graphics error: {}", e),
            DemoError::Io(e) => write!(f, "IO error: {}", e),
            DemoError::Initialization(msg) => write!(f, "Initialization error: {}", msg),
            DemoError::Runtime(msg) => write!(f, "Runtime error: {}", msg),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::FileNotFound(path) => write!(f, "Config file not found: {}", path),
            ConfigError::ParseError(msg) => write!(f, "Failed to parse config: {}", msg),
            ConfigError::InvalidValue { field, reason } => {
                write!(f, "Invalid value for '{}': {}", field, reason)
            }
        }
    }
}

impl fmt::Display for GraphicsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GraphicsError::DeviceCreation(msg) => write!(f, "Device creation failed: {}", msg),
            GraphicsError::SwapchainError(msg) => write!(f, "Swapchain error: {}", msg),
            GraphicsError::ShaderCompilation(msg) => write!(f, "Shader compilation failed: {}", msg),
            GraphicsError::ResourceCreation(msg) => write!(f, "Resource creation failed: {}", msg),
            GraphicsError::CommandExecution(msg) => write!(f, "Command execution failed: {}", msg),
            GraphicsError::Synchronization(msg) => write!(f, "Synchronization failed: {}", msg),
            GraphicsError::OutOfBounds { index, count } => {
                write!(f, "Element {} out of bounds (buffer holds {})", index, count)
            }
            GraphicsError::MissingSubmesh(name) => write!(f, "Unknown submesh '{}'", name),
        }
    }
}

impl std::error::Error for DemoError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DemoError::Config(e) => Some(e),
            DemoError::Graphics(e) => Some(e),
            DemoError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl std::error::Error for ConfigError {}
impl std::error::Error for GraphicsError {}

// 实现 From trait 以便于错误转换
impl From<std::io::Error> for DemoError {
    fn from(err: std::io::Error) -> Self {
        DemoError::Io(err)
    }
}

impl From<ConfigError> for DemoError {
    fn from(err: ConfigError) -> Self {
        DemoError::Config(err)
    }
}

impl From<GraphicsError> for DemoError {
    fn from(err: GraphicsError) -> Self {
        DemoError::Graphics(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_context() {
        let err: DemoError = ConfigError::InvalidValue {
            field: "graphics.frame_resources".to_string(),
            reason: "must be at least 1".to_string(),
        }
        .into();
        let text = err.to_string();
        assert!(text.starts_with("Configuration error"));
        assert!(text.contains("graphics.frame_resources"));
    }

    #[test]
    fn test_source_chain() {
        use std::error::Error;

        let err: DemoError = GraphicsError::OutOfBounds { index: 7, count: 6 }.into();
        assert!(err.source().is_some());
        assert_eq!(
            err.source().map(|s| s.to_string()),
            Some("Element 7 out of bounds (buffer holds 6)".to_string())
        );
    }
}
