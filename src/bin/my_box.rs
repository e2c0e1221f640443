//! 旋转彩色立方体
//!
//! ```bash
//! cargo run --bin my_box
//! cargo run --bin my_box -- --warp --width 1280 --height 720
//! ```
//!
//! 鼠标左键拖动旋转相机，右键拖动缩放，Esc 退出。

use d3d_demos::core::{log, Config};
use tracing::info;

fn main() -> anyhow::Result<()> {
    let mut config = Config::from_file_or_default("config.toml");
    config.window.set_default_title("MyBox");
    config.apply_args(std::env::args());
    config.validate()?;

    let log_file = if config.logging.file_output {
        Some(config.logging.log_file.as_str())
    } else {
        None
    };
    log::init_logger(config.logging.level, config.logging.file_output, log_file);
    info!(version = env!("CARGO_PKG_VERSION"), "MyBox starting...");

    run(config)
}

#[cfg(target_os = "windows")]
fn run(config: Config) -> anyhow::Result<()> {
    use d3d_demos::gfx::BoxDemo;

    d3d_demos::app::run(config, |window, config| BoxDemo::new(window, config))?;
    info!("MyBox exited");
    Ok(())
}

#[cfg(not(target_os = "windows"))]
fn run(_config: Config) -> anyhow::Result<()> {
    anyhow::bail!("MyBox requires Direct3D 12 and only runs on Windows")
}
