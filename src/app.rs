//! 示例程序框架
//!
//! 负责窗口、事件循环和计时，把每帧的工作交给实现了 [`Demo`] 的示例：
//!
//! ```text
//! Resized          -> Demo::resize
//! RedrawRequested  -> GameTimer::tick -> Demo::update -> Demo::draw
//! AboutToWait      -> request_redraw（暂停时不请求）
//! ```
//!
//! 窗口失去焦点或最小化时暂停计时，不再更新和绘制。

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use tracing::{debug, error, info};
use winit::dpi::LogicalSize;
use winit::event::{ElementState, Event, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowBuilder};

use crate::core::error::{DemoError, Result};
use crate::core::input::InputSystem;
use crate::core::timer::{FrameRate, FrameStats, GameTimer};
use crate::core::Config;

/// 单个示例程序
///
/// 框架保证只在窗口客户区非空时调用 `resize`，
/// 并且每帧先调用 `update` 再调用 `draw`。
pub trait Demo {
    /// 客户区尺寸改变（物理像素）
    fn resize(&mut self, width: u32, height: u32) -> Result<()>;

    /// 处理输入，更新 CPU 侧状态
    fn update(&mut self, input: &mut InputSystem, timer: &GameTimer) -> Result<()>;

    /// 录制并提交一帧
    fn draw(&mut self, timer: &GameTimer) -> Result<()>;
}

/// 窗口标题里的帧率信息
pub fn stats_title(title: &str, rate: FrameRate) -> String {
    format!("{}    fps: {:.0}   mspf: {:.3}", title, rate.fps, rate.mspf)
}

/// 创建窗口并运行示例，直到窗口关闭或示例返回错误
///
/// `build` 在窗口创建之后调用，示例持有窗口的 `Arc`。
pub fn run<D, F>(config: Config, build: F) -> Result<()>
where
    D: Demo + 'static,
    F: FnOnce(Arc<Window>, &Config) -> Result<D>,
{
    let event_loop = EventLoop::new()
        .map_err(|e| DemoError::Initialization(format!("Failed to create event loop: {}", e)))?;

    let title = config.window.title().to_string();
    let window = Arc::new(
        WindowBuilder::new()
            .with_title(title.as_str())
            .with_inner_size(LogicalSize::new(config.window.width, config.window.height))
            .with_resizable(config.window.resizable)
            .build(&event_loop)
            .map_err(|e| DemoError::Initialization(format!("Failed to create window: {}", e)))?,
    );

    // 示例先于窗口销毁：关闭时把它从 Option 中取出并 drop
    let mut demo = Some(build(window.clone(), &config)?);
    info!(title = %title, "Demo initialized, entering main loop");

    let failure: Rc<RefCell<Option<DemoError>>> = Rc::new(RefCell::new(None));
    let loop_failure = failure.clone();

    let mut input = InputSystem::new();
    let mut timer = GameTimer::new();
    let mut stats = FrameStats::new();
    let mut paused = false;
    let mut minimized = false;
    timer.reset();

    event_loop
        .run(move |event, elwt| {
            let Some(active) = demo.as_mut() else {
                return;
            };

            let result = match event {
                Event::WindowEvent { event, .. } => match event {
                    WindowEvent::CloseRequested => {
                        info!("Close requested, shutting down...");
                        demo = None;
                        elwt.exit();
                        Ok(())
                    }
                    WindowEvent::Resized(size) => {
                        if size.width == 0 || size.height == 0 {
                            debug!("Window minimized");
                            minimized = true;
                            timer.stop();
                            Ok(())
                        } else {
                            if minimized {
                                minimized = false;
                                if !paused {
                                    timer.start();
                                }
                            }
                            debug!(width = size.width, height = size.height, "Window resized");
                            active.resize(size.width, size.height)
                        }
                    }
                    WindowEvent::Focused(focused) => {
                        paused = !focused;
                        if paused {
                            timer.stop();
                            input.clear();
                        } else if !minimized {
                            timer.start();
                        }
                        Ok(())
                    }
                    WindowEvent::MouseInput { state, button, .. } => {
                        input.on_mouse_button(button, state);
                        Ok(())
                    }
                    WindowEvent::CursorMoved { position, .. } => {
                        input.on_mouse_move((position.x, position.y));
                        Ok(())
                    }
                    WindowEvent::KeyboardInput { event, .. } => {
                        if let PhysicalKey::Code(code) = event.physical_key {
                            if code == KeyCode::Escape && event.state == ElementState::Pressed {
                                demo = None;
                                elwt.exit();
                                return;
                            }
                            input.on_keyboard_input(code, event.state);
                        }
                        Ok(())
                    }
                    WindowEvent::RedrawRequested => {
                        if paused || minimized {
                            return;
                        }
                        timer.tick();
                        if let Some(rate) = stats.record(timer.total_time()) {
                            window.set_title(&stats_title(&title, rate));
                        }
                        active
                            .update(&mut input, &timer)
                            .and_then(|()| active.draw(&timer))
                    }
                    _ => Ok(()),
                },
                Event::AboutToWait => {
                    if paused || minimized {
                        elwt.set_control_flow(ControlFlow::Wait);
                    } else {
                        elwt.set_control_flow(ControlFlow::Poll);
                        window.request_redraw();
                    }
                    Ok(())
                }
                _ => Ok(()),
            };

            if let Err(e) = result {
                error!("Demo failed: {}", e);
                *loop_failure.borrow_mut() = Some(e);
                demo = None;
                elwt.exit();
            }
        })
        .map_err(|e| DemoError::Runtime(format!("Event loop error: {}", e)))?;

    take_failure(&failure)
}

/// 取出事件循环中记录的错误
fn take_failure(failure: &RefCell<Option<DemoError>>) -> Result<()> {
    let taken = failure.borrow_mut().take();
    match taken {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_title() {
        let rate = FrameRate { fps: 60.0, mspf: 1000.0 / 60.0 };
        assert_eq!(stats_title("Box", rate), "Box    fps: 60   mspf: 16.667");
    }

    #[test]
    fn test_take_failure_returns_recorded_error_once() {
        let failure: Rc<RefCell<Option<DemoError>>> = Rc::new(RefCell::new(None));
        assert!(take_failure(&failure).is_ok());

        *failure.borrow_mut() = Some(DemoError::Runtime("device removed".to_string()));
        match take_failure(&failure) {
            Err(DemoError::Runtime(msg)) => assert_eq!(msg, "device removed"),
            other => panic!("unexpected result: {:?}", other),
        }
        assert!(take_failure(&failure).is_ok());
    }
}
