//! Translates winit window events into benchmark events.

use meshbench::config::{OptionFlag, SubmissionStrategy};
use meshbench::scheduler::{BenchEvent, Scale};
use winit::event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent};
use winit::keyboard::{Key, NamedKey};

/// Forward offset applied per wheel notch.
pub const WHEEL_STEP: f64 = 0.1;

/// Key bindings:
///
/// | key | action |
/// |---|---|
/// | `q`, Escape | quit |
/// | `+`, `=` / `-` | double / halve the triangle target |
/// | `w` `m` `c` `t` `p` `s` | toggle wireframe, smooth shading, color, texture, back-face painting, strip |
/// | F1-F4 | immediate, command list, static buffer, dynamic buffer |
/// | Space | toggle rotation |
/// | `b` | start or abort a sweep |
pub fn map_key(key: &Key) -> Option<BenchEvent> {
    let event = match key {
        Key::Named(NamedKey::Escape) => BenchEvent::Quit,
        Key::Named(NamedKey::Space) => BenchEvent::ToggleRotation,
        Key::Named(NamedKey::F1) => BenchEvent::SelectStrategy(SubmissionStrategy::Immediate),
        Key::Named(NamedKey::F2) => BenchEvent::SelectStrategy(SubmissionStrategy::CommandList),
        Key::Named(NamedKey::F3) => BenchEvent::SelectStrategy(SubmissionStrategy::StaticBuffer),
        Key::Named(NamedKey::F4) => BenchEvent::SelectStrategy(SubmissionStrategy::DynamicBuffer),
        Key::Character(text) => match text.to_lowercase().as_str() {
            "q" => BenchEvent::Quit,
            "+" | "=" => BenchEvent::ScaleTriangles(Scale::Double),
            "-" => BenchEvent::ScaleTriangles(Scale::Halve),
            "w" => BenchEvent::ToggleOption(OptionFlag::Wireframe),
            "m" => BenchEvent::ToggleOption(OptionFlag::SmoothShading),
            "c" => BenchEvent::ToggleOption(OptionFlag::Color),
            "t" => BenchEvent::ToggleOption(OptionFlag::Texture),
            "p" => BenchEvent::ToggleOption(OptionFlag::BackFacePainting),
            "s" => BenchEvent::ToggleOption(OptionFlag::TriangleStrip),
            "b" => BenchEvent::Sweep,
            " " => BenchEvent::ToggleRotation,
            _ => return None,
        },
        _ => return None,
    };
    Some(event)
}

/// Stateful mouse tracking plus key mapping.
#[derive(Debug, Default)]
pub struct InputMapper {
    dragging: bool,
    last_cursor: Option<(f64, f64)>,
}

impl InputMapper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle_event(&mut self, event: &WindowEvent) -> Option<BenchEvent> {
        match event {
            WindowEvent::CloseRequested => Some(BenchEvent::Quit),
            WindowEvent::Resized(size) => Some(BenchEvent::Resize {
                width: size.width,
                height: size.height,
            }),
            WindowEvent::KeyboardInput { event, .. }
                if event.state == ElementState::Pressed && !event.repeat =>
            {
                map_key(&event.logical_key)
            }
            WindowEvent::MouseInput { button, state, .. } if *button == MouseButton::Left => {
                self.set_dragging(*state == ElementState::Pressed);
                None
            }
            WindowEvent::CursorMoved { position, .. } => self.cursor_moved((position.x, position.y)),
            WindowEvent::MouseWheel { delta, .. } => {
                let scroll = match delta {
                    MouseScrollDelta::LineDelta(_, y) => f64::from(*y),
                    MouseScrollDelta::PixelDelta(pos) => pos.y,
                };
                wheel(scroll)
            }
            _ => None,
        }
    }

    fn set_dragging(&mut self, pressed: bool) {
        self.dragging = pressed;
        if !pressed {
            self.last_cursor = None;
        }
    }

    /// Drags rotate: vertical motion tilts around X, horizontal spins around Y.
    fn cursor_moved(&mut self, xy: (f64, f64)) -> Option<BenchEvent> {
        if !self.dragging {
            return None;
        }
        let event = self.last_cursor.map(|last| BenchEvent::Rotate {
            dx: xy.0 - last.0,
            dy: xy.1 - last.1,
        });
        self.last_cursor = Some(xy);
        event
    }
}

fn wheel(scroll: f64) -> Option<BenchEvent> {
    if scroll > 0.0 {
        Some(BenchEvent::MoveForward(WHEEL_STEP))
    } else if scroll < 0.0 {
        Some(BenchEvent::MoveForward(-WHEEL_STEP))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use winit::keyboard::SmolStr;

    fn char_key(text: &str) -> Key {
        Key::Character(SmolStr::new(text))
    }

    #[test]
    fn test_character_bindings() {
        assert_eq!(map_key(&char_key("q")), Some(BenchEvent::Quit));
        assert_eq!(map_key(&char_key("Q")), Some(BenchEvent::Quit));
        assert_eq!(
            map_key(&char_key("=")),
            Some(BenchEvent::ScaleTriangles(Scale::Double))
        );
        assert_eq!(
            map_key(&char_key("-")),
            Some(BenchEvent::ScaleTriangles(Scale::Halve))
        );
        assert_eq!(
            map_key(&char_key("s")),
            Some(BenchEvent::ToggleOption(OptionFlag::TriangleStrip))
        );
        assert_eq!(map_key(&char_key("b")), Some(BenchEvent::Sweep));
        assert_eq!(map_key(&char_key("x")), None);
    }

    #[test]
    fn test_named_bindings() {
        assert_eq!(map_key(&Key::Named(NamedKey::Escape)), Some(BenchEvent::Quit));
        assert_eq!(
            map_key(&Key::Named(NamedKey::Space)),
            Some(BenchEvent::ToggleRotation)
        );
        assert_eq!(
            map_key(&Key::Named(NamedKey::F4)),
            Some(BenchEvent::SelectStrategy(SubmissionStrategy::DynamicBuffer))
        );
        assert_eq!(map_key(&Key::Named(NamedKey::Tab)), None);
    }

    #[test]
    fn test_drag_tracks_only_while_pressed() {
        let mut input = InputMapper::new();
        assert_eq!(input.cursor_moved((10.0, 10.0)), None);

        input.set_dragging(true);
        assert_eq!(input.cursor_moved((10.0, 10.0)), None);
        assert_eq!(
            input.cursor_moved((13.0, 8.0)),
            Some(BenchEvent::Rotate { dx: 3.0, dy: -2.0 })
        );

        input.set_dragging(false);
        input.set_dragging(true);
        assert_eq!(input.cursor_moved((50.0, 50.0)), None);
    }

    #[test]
    fn test_wheel_steps() {
        assert_eq!(wheel(1.0), Some(BenchEvent::MoveForward(WHEEL_STEP)));
        assert_eq!(wheel(-3.0), Some(BenchEvent::MoveForward(-WHEEL_STEP)));
        assert_eq!(wheel(0.0), None);
    }
}
