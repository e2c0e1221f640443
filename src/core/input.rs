//! Input state gathered from window events
//!
//! Demos never see raw window messages: the event loop forwards them here
//! and each demo polls keys and the accumulated mouse drag once per frame.

use std::collections::HashSet;
use winit::event::{ElementState, MouseButton};
use winit::keyboard::KeyCode;

/// Mouse movement accumulated while a button was held
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Drag {
    pub button: MouseButton,
    pub dx: f32,
    pub dy: f32,
}

/// InputSystem manages keyboard and mouse input state
#[derive(Debug, Default)]
pub struct InputSystem {
    pressed_keys: HashSet<KeyCode>,
    mouse_buttons: HashSet<MouseButton>,
    last_mouse_pos: Option<(f64, f64)>,
    /// One pending drag per button, oldest first
    drags: Vec<Drag>,
}

impl InputSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process keyboard input event
    pub fn on_keyboard_input(&mut self, keycode: KeyCode, state: ElementState) {
        match state {
            ElementState::Pressed => {
                self.pressed_keys.insert(keycode);
            }
            ElementState::Released => {
                self.pressed_keys.remove(&keycode);
            }
        }
    }

    /// Process mouse button event
    pub fn on_mouse_button(&mut self, button: MouseButton, state: ElementState) {
        match state {
            ElementState::Pressed => {
                self.mouse_buttons.insert(button);
            }
            ElementState::Released => {
                self.mouse_buttons.remove(&button);
            }
        }
    }

    /// Process cursor movement
    ///
    /// Left button takes precedence over right when both are held.
    pub fn on_mouse_move(&mut self, position: (f64, f64)) {
        let Some(last) = self.last_mouse_pos.replace(position) else {
            return;
        };

        let button = if self.mouse_buttons.contains(&MouseButton::Left) {
            MouseButton::Left
        } else if self.mouse_buttons.contains(&MouseButton::Right) {
            MouseButton::Right
        } else {
            return;
        };

        let dx = (position.0 - last.0) as f32;
        let dy = (position.1 - last.1) as f32;

        match self.drags.iter_mut().find(|drag| drag.button == button) {
            Some(drag) => {
                drag.dx += dx;
                drag.dy += dy;
            }
            None => self.drags.push(Drag { button, dx, dy }),
        }
    }

    /// Forget all held keys and buttons (focus lost)
    pub fn clear(&mut self) {
        self.pressed_keys.clear();
        self.mouse_buttons.clear();
        self.drags.clear();
    }

    pub fn is_key_pressed(&self, keycode: KeyCode) -> bool {
        self.pressed_keys.contains(&keycode)
    }

    pub fn is_button_pressed(&self, button: MouseButton) -> bool {
        self.mouse_buttons.contains(&button)
    }

    /// Returns the oldest pending drag and clears it
    ///
    /// Call until `None` to drain drags of both buttons.
    pub fn take_drag(&mut self) -> Option<Drag> {
        if self.drags.is_empty() {
            None
        } else {
            Some(self.drags.remove(0))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_track_press_and_release() {
        let mut input = InputSystem::new();
        input.on_keyboard_input(KeyCode::KeyA, ElementState::Pressed);
        assert!(input.is_key_pressed(KeyCode::KeyA));

        input.on_keyboard_input(KeyCode::KeyA, ElementState::Released);
        assert!(!input.is_key_pressed(KeyCode::KeyA));
    }

    #[test]
    fn test_move_without_button_is_not_a_drag() {
        let mut input = InputSystem::new();
        input.on_mouse_move((10.0, 10.0));
        input.on_mouse_move((20.0, 30.0));
        assert_eq!(input.take_drag(), None);
    }

    #[test]
    fn test_drag_accumulates_until_taken() {
        let mut input = InputSystem::new();
        input.on_mouse_move((100.0, 100.0));
        input.on_mouse_button(MouseButton::Left, ElementState::Pressed);
        input.on_mouse_move((104.0, 99.0));
        input.on_mouse_move((110.0, 95.0));

        let drag = input.take_drag().unwrap();
        assert_eq!(drag.button, MouseButton::Left);
        assert_eq!(drag.dx, 10.0);
        assert_eq!(drag.dy, -5.0);
        assert_eq!(input.take_drag(), None);
    }

    #[test]
    fn test_right_drag_and_clear() {
        let mut input = InputSystem::new();
        input.on_mouse_move((0.0, 0.0));
        input.on_mouse_button(MouseButton::Right, ElementState::Pressed);
        input.on_mouse_move((3.0, 4.0));
        assert_eq!(input.take_drag().map(|d| d.button), Some(MouseButton::Right));

        input.on_keyboard_input(KeyCode::KeyW, ElementState::Pressed);
        input.clear();
        assert!(!input.is_key_pressed(KeyCode::KeyW));
        assert!(!input.is_button_pressed(MouseButton::Right));
    }

    #[test]
    fn test_switching_buttons_keeps_both_drags() {
        let mut input = InputSystem::new();
        input.on_mouse_move((0.0, 0.0));
        input.on_mouse_button(MouseButton::Right, ElementState::Pressed);
        input.on_mouse_move((2.0, 0.0));
        input.on_mouse_move((5.0, 1.0));
        input.on_mouse_button(MouseButton::Left, ElementState::Pressed);
        input.on_mouse_move((6.0, 3.0));
        input.on_mouse_button(MouseButton::Left, ElementState::Released);
        input.on_mouse_move((8.0, 3.0));

        let right = input.take_drag().unwrap();
        assert_eq!((right.button, right.dx, right.dy), (MouseButton::Right, 7.0, 1.0));
        let left = input.take_drag().unwrap();
        assert_eq!((left.button, left.dx, left.dy), (MouseButton::Left, 1.0, 2.0));
        assert_eq!(input.take_drag(), None);
    }
}
