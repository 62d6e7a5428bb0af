use std::collections::HashSet;

pub use winit::keyboard::KeyCode;
use winit::{
    event::{ElementState, KeyEvent, MouseScrollDelta, WindowEvent},
    keyboard::PhysicalKey,
};

/// Pixels per wheel "line" when the platform reports pixel deltas.
const PIXELS_PER_LINE: f64 = 40.0;

/// Turns absolute cursor positions into offsets. The first position only sets
/// the baseline, so the camera does not jump when the cursor enters the window.
#[derive(Debug, Default, Clone)]
pub struct MouseTracker {
    last: Option<(f64, f64)>,
}

impl MouseTracker {
    /// Returns `(x_offset, y_offset)` with y pointing up, or `None` for the
    /// baseline event.
    pub fn track(&mut self, x: f64, y: f64) -> Option<(f32, f32)> {
        let offset = self
            .last
            .map(|(last_x, last_y)| ((x - last_x) as f32, (last_y - y) as f32));
        self.last = Some((x, y));
        offset
    }

    pub fn has_baseline(&self) -> bool {
        self.last.is_some()
    }

    /// Next position becomes a new baseline (e.g. after focus loss).
    pub fn reset(&mut self) {
        self.last = None;
    }
}

/// Keyboard and mouse state accumulated between two frames.
#[derive(Debug, Default)]
pub struct InputState {
    pressed: HashSet<KeyCode>,
    mouse: MouseTracker,
    /// Raw device motion has arrived since the last baseline; cursor
    /// positions then only keep the tracker current.
    raw_motion: bool,

    // per-frame accumulators, cleared by `end_frame`
    pub mouse_delta: (f32, f32),
    pub scroll_delta: f32,
}

impl InputState {
    pub fn is_pressed(&self, key: KeyCode) -> bool {
        self.pressed.contains(&key)
    }

    pub fn press(&mut self, key: KeyCode) {
        self.pressed.insert(key);
    }

    pub fn release(&mut self, key: KeyCode) {
        self.pressed.remove(&key);
    }

    pub fn cursor_moved(&mut self, x: f64, y: f64) {
        let offset = self.mouse.track(x, y);
        if self.raw_motion {
            return;
        }
        if let Some((dx, dy)) = offset {
            self.mouse_delta.0 += dx;
            self.mouse_delta.1 += dy;
        }
    }

    /// Relative device motion (y down), unbounded by the window edges. The
    /// first event after startup or focus loss is only a baseline.
    pub fn mouse_motion(&mut self, dx: f64, dy: f64) {
        if !self.raw_motion {
            self.raw_motion = true;
            return;
        }
        self.mouse_delta.0 += dx as f32;
        self.mouse_delta.1 -= dy as f32;
    }

    pub fn scrolled(&mut self, lines: f32) {
        self.scroll_delta += lines;
    }

    /// Drops held keys and the mouse baseline, e.g. when focus is lost.
    pub fn clear(&mut self) {
        self.pressed.clear();
        self.mouse.reset();
        self.raw_motion = false;
        self.end_frame();
    }

    /// Resets the per-frame accumulators. Held keys persist.
    pub fn end_frame(&mut self) {
        self.mouse_delta = (0.0, 0.0);
        self.scroll_delta = 0.0;
    }

    pub fn handle_window_event(&mut self, event: &WindowEvent) {
        match event {
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(code),
                        state,
                        ..
                    },
                ..
            } => match state {
                ElementState::Pressed => self.press(*code),
                ElementState::Released => self.release(*code),
            },
            WindowEvent::CursorMoved { position, .. } => {
                self.cursor_moved(position.x, position.y);
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let lines = match delta {
                    MouseScrollDelta::LineDelta(_, y) => *y,
                    MouseScrollDelta::PixelDelta(position) => (position.y / PIXELS_PER_LINE) as f32,
                };
                self.scrolled(lines);
            }
            WindowEvent::Focused(false) => {
                log::debug!("Window lost focus, clearing input state");
                self.clear();
            }
            _ => {}
        }
    }
}
