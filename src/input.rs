use std::collections::HashSet;

use winit::event::{ElementState, WindowEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

/// Tracks keyboard state across frames.
#[derive(Debug, Default)]
pub struct Input {
    keys_down: HashSet<KeyCode>,
    keys_pressed: HashSet<KeyCode>,
    keys_released: HashSet<KeyCode>,
}

impl Input {
    pub fn new() -> Self {
        Self::default()
    }

    /// Call once the frame has consumed its input to reset per-frame state.
    pub fn end_frame(&mut self) {
        self.keys_pressed.clear();
        self.keys_released.clear();
    }

    /// Process a window event and update input state.
    pub fn handle_event(&mut self, event: &WindowEvent) {
        if let WindowEvent::KeyboardInput { event, .. } = event {
            if let PhysicalKey::Code(key) = event.physical_key {
                match event.state {
                    ElementState::Pressed => self.press(key),
                    ElementState::Released => self.release(key),
                }
            }
        }
    }

    /// Records a key going down. Auto-repeat while held is not a new press.
    pub fn press(&mut self, key: KeyCode) {
        if self.keys_down.insert(key) {
            self.keys_pressed.insert(key);
        }
    }

    pub fn release(&mut self, key: KeyCode) {
        if self.keys_down.remove(&key) {
            self.keys_released.insert(key);
        }
    }

    /// Returns true if the key is currently held down.
    pub fn key_down(&self, key: KeyCode) -> bool {
        self.keys_down.contains(&key)
    }

    /// Returns true if the key was pressed this frame.
    pub fn key_pressed(&self, key: KeyCode) -> bool {
        self.keys_pressed.contains(&key)
    }

    /// Returns true if the key was released this frame.
    pub fn key_released(&self, key: KeyCode) -> bool {
        self.keys_released.contains(&key)
    }

    /// Keys pressed this frame.
    pub fn pressed(&self) -> impl Iterator<Item = KeyCode> + '_ {
        self.keys_pressed.iter().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn press_is_reported_once() {
        let mut input = Input::new();
        input.press(KeyCode::KeyW);
        assert!(input.key_pressed(KeyCode::KeyW));
        assert!(input.key_down(KeyCode::KeyW));

        input.end_frame();
        input.press(KeyCode::KeyW);
        assert!(!input.key_pressed(KeyCode::KeyW));
        assert!(input.key_down(KeyCode::KeyW));
    }

    #[test]
    fn release_clears_down_state() {
        let mut input = Input::new();
        input.press(KeyCode::KeyA);
        input.end_frame();
        input.release(KeyCode::KeyA);

        assert!(!input.key_down(KeyCode::KeyA));
        assert!(input.key_released(KeyCode::KeyA));

        input.end_frame();
        assert!(!input.key_released(KeyCode::KeyA));
    }

    #[test]
    fn releasing_an_unpressed_key_is_ignored() {
        let mut input = Input::new();
        input.release(KeyCode::Escape);
        assert!(!input.key_released(KeyCode::Escape));
    }

    #[test]
    fn pressed_lists_this_frame_only() {
        let mut input = Input::new();
        input.press(KeyCode::KeyZ);
        input.press(KeyCode::KeyX);
        let mut keys: Vec<_> = input.pressed().collect();
        keys.sort_by_key(|k| format!("{k:?}"));
        assert_eq!(keys, vec![KeyCode::KeyX, KeyCode::KeyZ]);

        input.end_frame();
        assert_eq!(input.pressed().count(), 0);
    }
}
