//! 配置管理模块
//!
//! 提供示例程序配置的加载、解析和管理功能。
//! 支持从 TOML 配置文件加载，也支持命令行参数覆盖。
//!
//! # 配置文件格式 (config.toml)
//!
//! ```toml
//! [window]
//! width = 800
//! height = 600
//! title = "d3d_demos"  # 可选，缺省时使用各示例自己的标题
//! resizable = true
//!
//! [graphics]
//! vsync = false
//! frame_resources = 3  # 帧资源环的槽位数
//! debug_layer = true
//! use_warp = false     # 使用 WARP 软件光栅化器
//!
//! [logging]
//! level = "info"      # trace, debug, info, warn, error
//! file_output = true
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

use super::error::{ConfigError, Result};

/// 帧资源数量的上限
pub const MAX_FRAME_RESOURCES: usize = 8;

/// 示例程序配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// 窗口配置
    #[serde(default)]
    pub window: WindowConfig,

    /// 图形配置
    #[serde(default)]
    pub graphics: GraphicsConfig,

    /// 日志配置
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// 窗口配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowConfig {
    /// 窗口宽度
    #[serde(default = "default_width")]
    pub width: u32,

    /// 窗口高度
    #[serde(default = "default_height")]
    pub height: u32,

    /// 窗口标题前缀，未设置时由示例提供
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// 是否可调整大小
    #[serde(default = "default_resizable")]
    pub resizable: bool,
}

/// 图形配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphicsConfig {
    /// 垂直同步
    #[serde(default = "default_vsync")]
    pub vsync: bool,

    /// 帧资源环的槽位数（CPU 最多领先 GPU 的帧数）
    #[serde(default = "default_frame_resources")]
    pub frame_resources: usize,

    /// 是否启用 D3D12 调试层（仅 Debug 构建生效）
    #[serde(default = "default_debug_layer")]
    pub debug_layer: bool,

    /// 强制使用 WARP 适配器
    #[serde(default = "default_use_warp")]
    pub use_warp: bool,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// 日志级别
    #[serde(default = "default_log_level")]
    pub level: LogLevel,

    /// 是否输出到文件
    #[serde(default = "default_file_output")]
    pub file_output: bool,

    /// 日志文件路径
    #[serde(default = "default_log_file")]
    pub log_file: String,
}

/// 日志级别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

// 默认值函数
fn default_width() -> u32 { 800 }
fn default_height() -> u32 { 600 }
fn default_resizable() -> bool { true }
fn default_vsync() -> bool { false }
fn default_frame_resources() -> usize { 3 }
fn default_debug_layer() -> bool { true }
fn default_use_warp() -> bool { false }
fn default_log_level() -> LogLevel { LogLevel::Info }
fn default_file_output() -> bool { false }
fn default_log_file() -> String { "d3d_demos.log".to_string() }

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            title: None,
            resizable: default_resizable(),
        }
    }
}

impl Default for GraphicsConfig {
    fn default() -> Self {
        Self {
            vsync: default_vsync(),
            frame_resources: default_frame_resources(),
            debug_layer: default_debug_layer(),
            use_warp: default_use_warp(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file_output: default_file_output(),
            log_file: default_log_file(),
        }
    }
}

impl WindowConfig {
    /// 配置文件没有给出标题时使用 `title`
    pub fn set_default_title(&mut self, title: &str) {
        self.title.get_or_insert_with(|| title.to_string());
    }

    /// 窗口标题，未设置时为包名
    pub fn title(&self) -> &str {
        self.title.as_deref().unwrap_or(env!("CARGO_PKG_NAME"))
    }
}

impl Config {
    /// 从配置文件加载
    ///
    /// # 参数
    ///
    /// * `path` - 配置文件路径
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_str = path.as_ref().to_string_lossy().to_string();

        let contents = std::fs::read_to_string(path)
            .map_err(|_| ConfigError::FileNotFound(path_str.clone()))?;

        Self::from_toml_str(&contents)
    }

    /// 从 TOML 字符串解析配置
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        toml::from_str(contents)
            .map_err(|e| ConfigError::ParseError(e.to_string()).into())
    }

    /// 从配置文件加载，如果文件不存在或解析失败则使用默认配置
    pub fn from_file_or_default<P: AsRef<Path>>(path: P) -> Self {
        Self::from_file(path).unwrap_or_default()
    }

    /// 保存配置到文件
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;

        std::fs::write(path, contents)?;
        Ok(())
    }

    /// 从命令行参数覆盖配置
    ///
    /// 支持的参数：
    /// - `--width <value>` / `--height <value>`: 窗口尺寸
    /// - `--vsync` / `--no-vsync`: 垂直同步开关
    /// - `--warp`: 使用 WARP 适配器
    /// - `--frames <value>`: 帧资源数量
    pub fn apply_args<I>(&mut self, args: I)
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let args: Vec<String> = args.into_iter().map(|s| s.as_ref().to_string()).collect();

        if args.iter().any(|a| a == "--vsync") {
            self.graphics.vsync = true;
        }
        if args.iter().any(|a| a == "--no-vsync") {
            self.graphics.vsync = false;
        }
        if args.iter().any(|a| a == "--warp") {
            self.graphics.use_warp = true;
        }

        if let Some(width) = value_after(&args, "--width") {
            self.window.width = width;
        }
        if let Some(height) = value_after(&args, "--height") {
            self.window.height = height;
        }
        if let Some(frames) = value_after(&args, "--frames") {
            self.graphics.frame_resources = frames;
        }
    }

    /// 验证配置的有效性
    pub fn validate(&self) -> Result<()> {
        if self.window.width == 0 || self.window.height == 0 {
            return Err(ConfigError::InvalidValue {
                field: "window.width/height".to_string(),
                reason: "Window dimensions must be greater than 0".to_string(),
            }.into());
        }

        if !(1..=MAX_FRAME_RESOURCES).contains(&self.graphics.frame_resources) {
            return Err(ConfigError::InvalidValue {
                field: "graphics.frame_resources".to_string(),
                reason: format!("must be between 1 and {}", MAX_FRAME_RESOURCES),
            }.into());
        }

        Ok(())
    }
}

fn value_after<T: std::str::FromStr>(args: &[String], flag: &str) -> Option<T> {
    let idx = args.iter().position(|a| a == flag)?;
    args.get(idx + 1)?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.window.width, 800);
        assert_eq!(config.window.height, 600);
        assert_eq!(config.graphics.frame_resources, 3);
        assert!(!config.graphics.vsync);
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        assert!(config.validate().is_ok());

        config.window.width = 0;
        assert!(config.validate().is_err());

        config.window.width = 800;
        config.graphics.frame_resources = 0;
        assert!(config.validate().is_err());

        config.graphics.frame_resources = MAX_FRAME_RESOURCES + 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = Config::from_toml_str(
            r#"
            [graphics]
            frame_resources = 2

            [logging]
            level = "debug"
            "#,
        )
        .unwrap();

        assert_eq!(config.graphics.frame_resources, 2);
        assert_eq!(config.logging.level, LogLevel::Debug);
        assert_eq!(config.window.width, 800);
        assert!(config.graphics.debug_layer);
    }

    #[test]
    fn test_title_from_file_wins_over_default() {
        let mut config = Config::from_toml_str(
            r#"
            [window]
            title = "Mirrors"
            "#,
        )
        .unwrap();
        config.window.set_default_title("StencilDemo");
        assert_eq!(config.window.title(), "Mirrors");

        let mut config = Config::default();
        assert_eq!(config.window.title(), "d3d_demos");
        config.window.set_default_title("MyBox");
        assert_eq!(config.window.title(), "MyBox");
    }

    #[test]
    fn test_invalid_toml_is_parse_error() {
        let err = Config::from_toml_str("[window\nwidth = ").unwrap_err();
        assert!(matches!(
            err,
            crate::core::error::DemoError::Config(ConfigError::ParseError(_))
        ));
    }

    #[test]
    fn test_apply_args() {
        let mut config = Config::default();
        config.apply_args(["demo", "--width", "1280", "--height", "720", "--vsync", "--frames", "2", "--warp"]);

        assert_eq!(config.window.width, 1280);
        assert_eq!(config.window.height, 720);
        assert!(config.graphics.vsync);
        assert!(config.graphics.use_warp);
        assert_eq!(config.graphics.frame_resources, 2);
    }

    #[test]
    fn test_apply_args_ignores_malformed_values() {
        let mut config = Config::default();
        config.apply_args(["demo", "--width", "wide", "--frames"]);

        assert_eq!(config.window.width, 800);
        assert_eq!(config.graphics.frame_resources, 3);
    }
}
