use std::collections::HashSet;

use glam::Vec2;
use winit::event::MouseButton;
use winit::keyboard::KeyCode;

/// Keyboard and mouse state accumulated between two frames.
#[derive(Debug, Default)]
pub struct InputState {
    pressed_keys: HashSet<KeyCode>,
    held_buttons: HashSet<MouseButton>,
    cursor: Option<Vec2>,
    pub mouse_delta: Vec2,
    pub scroll_delta: f32,
}

impl InputState {
    /// Records a key press. Returns `false` for auto-repeat of a held key.
    pub fn press_key(&mut self, key: KeyCode) -> bool {
        self.pressed_keys.insert(key)
    }

    pub fn release_key(&mut self, key: KeyCode) {
        self.pressed_keys.remove(&key);
    }

    pub fn press_button(&mut self, button: MouseButton) {
        self.held_buttons.insert(button);
    }

    pub fn release_button(&mut self, button: MouseButton) {
        self.held_buttons.remove(&button);
    }

    pub fn is_held(&self, button: MouseButton) -> bool {
        self.held_buttons.contains(&button)
    }

    /// Tracks the cursor and returns its movement since the last position.
    pub fn move_cursor(&mut self, position: Vec2) -> Vec2 {
        let delta = self.cursor.map_or(Vec2::ZERO, |previous| position - previous);
        self.cursor = Some(position);
        self.mouse_delta += delta;
        delta
    }

    pub fn cursor_left(&mut self) {
        self.cursor = None;
    }

    pub fn add_scroll(&mut self, lines: f32) {
        self.scroll_delta += lines;
    }

    pub fn clear_frame(&mut self) {
        self.mouse_delta = Vec2::ZERO;
        self.scroll_delta = 0.0;
    }

    pub fn clear_all(&mut self) {
        self.pressed_keys.clear();
        self.held_buttons.clear();
        self.cursor = None;
        self.clear_frame();
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec2;
    use winit::event::MouseButton;
    use winit::keyboard::KeyCode;

    use super::InputState;

    #[test]
    fn cursor_delta_starts_after_first_position() {
        let mut input = InputState::default();
        assert_eq!(input.move_cursor(Vec2::new(10.0, 10.0)), Vec2::ZERO);
        assert_eq!(input.move_cursor(Vec2::new(14.0, 7.0)), Vec2::new(4.0, -3.0));
        assert_eq!(input.mouse_delta, Vec2::new(4.0, -3.0));

        input.clear_frame();
        assert_eq!(input.mouse_delta, Vec2::ZERO);
        input.cursor_left();
        assert_eq!(input.move_cursor(Vec2::new(0.0, 0.0)), Vec2::ZERO);
    }

    #[test]
    fn key_repeat_is_reported() {
        let mut input = InputState::default();
        assert!(input.press_key(KeyCode::F1));
        assert!(!input.press_key(KeyCode::F1));
        input.release_key(KeyCode::F1);
        assert!(input.press_key(KeyCode::F1));

        input.press_button(MouseButton::Left);
        assert!(input.is_held(MouseButton::Left));
        input.clear_all();
        assert!(!input.is_held(MouseButton::Left));
    }
}
