//! 模板缓冲示例：镜面反射与平面阴影
//!
//! ```bash
//! cargo run --bin stencil_demo -- --frames 3
//! ```
//!
//! WASD 移动球体（W/S 上下移动、A/D 沿 x 轴，不会低于地板），鼠标左键拖动旋转相机，右键拖动缩放。

use d3d_demos::core::{log, Config};
use tracing::info;

fn main() -> anyhow::Result<()> {
    let mut config = Config::from_file_or_default("config.toml");
    config.window.set_default_title("StencilDemo");
    config.apply_args(std::env::args());
    config.validate()?;

    let log_file = if config.logging.file_output {
        Some(config.logging.log_file.as_str())
    } else {
        None
    };
    log::init_logger(config.logging.level, config.logging.file_output, log_file);
    info!(version = env!("CARGO_PKG_VERSION"), "StencilDemo starting...");
    info!(
        width = config.window.width,
        height = config.window.height,
        frame_resources = config.graphics.frame_resources,
        vsync = config.graphics.vsync,
        "Graphics configuration"
    );

    run(config)
}

#[cfg(target_os = "windows")]
fn run(config: Config) -> anyhow::Result<()> {
    use d3d_demos::gfx::MirrorDemo;

    d3d_demos::app::run(config, |window, config| MirrorDemo::new(window, config))?;
    info!("StencilDemo exited");
    Ok(())
}

#[cfg(not(target_os = "windows"))]
fn run(_config: Config) -> anyhow::Result<()> {
    anyhow::bail!("StencilDemo requires Direct3D 12 and only runs on Windows")
}
