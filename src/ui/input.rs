/// Terminal input drain.
///
/// Collects everything crossterm has buffered since the last frame:
///   - key presses (edge-triggered; repeats count, releases are dropped)
///   - mouse presses, drags and releases in cell coordinates
///   - wheel scrolling and terminal resizes
///
/// Events are handled in arrival order, one at a time, so each one sees
/// the state left by the previous.

use std::time::Duration;

use crossterm::event::{
    self, poll, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEvent,
    MouseEventKind,
};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum InputEvent {
    Key(KeyEvent),
    MouseDown { x: i32, y: i32 },
    MouseDrag { x: i32, y: i32 },
    MouseUp { x: i32, y: i32 },
    ScrollUp,
    ScrollDown,
    Resize { width: u16, height: u16 },
}

#[derive(Default)]
pub struct InputState {
    /// Events collected during the most recent drain, in order.
    events: Vec<InputEvent>,
    /// Key codes pressed during the most recent drain.
    fresh_presses: Vec<KeyCode>,
}

impl InputState {
    pub fn new() -> Self {
        InputState {
            events: Vec::with_capacity(8),
            fresh_presses: Vec::with_capacity(8),
        }
    }

    /// Drain all pending terminal events. Call once per frame.
    pub fn drain_events(&mut self) {
        self.clear();
        while poll(Duration::ZERO).unwrap_or(false) {
            match event::read() {
                Ok(ev) => self.record(ev),
                Err(e) => {
                    log::warn!("input read failed: {e}");
                    break;
                }
            }
        }
    }

    pub fn clear(&mut self) {
        self.events.clear();
        self.fresh_presses.clear();
    }

    /// Translate one crossterm event.
    pub fn record(&mut self, ev: Event) {
        match ev {
            Event::Key(key) if key.kind != KeyEventKind::Release => {
                self.fresh_presses.push(key.code);
                self.events.push(InputEvent::Key(key));
            }
            Event::Mouse(mouse) => {
                if let Some(e) = translate_mouse(mouse) {
                    self.events.push(e);
                }
            }
            Event::Resize(width, height) => {
                self.events.push(InputEvent::Resize { width, height });
            }
            _ => {}
        }
    }

    pub fn events(&self) -> &[InputEvent] {
        &self.events
    }

    /// Was this key pressed this frame?
    pub fn was_pressed(&self, code: KeyCode) -> bool {
        self.fresh_presses.contains(&code)
    }

    pub fn any_pressed(&self, codes: &[KeyCode]) -> bool {
        codes.iter().any(|c| self.was_pressed(*c))
    }

    /// Check if any key event this frame is Ctrl+C
    pub fn ctrl_c_pressed(&self) -> bool {
        self.events.iter().any(|e| match e {
            InputEvent::Key(k) => {
                k.modifiers.contains(KeyModifiers::CONTROL)
                    && matches!(k.code, KeyCode::Char('c') | KeyCode::Char('C'))
            }
            _ => false,
        })
    }
}

fn translate_mouse(mouse: MouseEvent) -> Option<InputEvent> {
    let (x, y) = (mouse.column as i32, mouse.row as i32);
    match mouse.kind {
        MouseEventKind::Down(MouseButton::Left) => Some(InputEvent::MouseDown { x, y }),
        MouseEventKind::Drag(MouseButton::Left) => Some(InputEvent::MouseDrag { x, y }),
        MouseEventKind::Up(MouseButton::Left) => Some(InputEvent::MouseUp { x, y }),
        MouseEventKind::ScrollUp => Some(InputEvent::ScrollUp),
        MouseEventKind::ScrollDown => Some(InputEvent::ScrollDown),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode, kind: KeyEventKind) -> Event {
        let mut k = KeyEvent::new(code, KeyModifiers::NONE);
        k.kind = kind;
        Event::Key(k)
    }

    #[test]
    fn releases_are_dropped() {
        let mut input = InputState::new();
        input.record(key(KeyCode::Right, KeyEventKind::Press));
        input.record(key(KeyCode::Right, KeyEventKind::Release));
        assert_eq!(input.events().len(), 1);
        assert!(input.was_pressed(KeyCode::Right));
        assert!(!input.was_pressed(KeyCode::Left));
    }

    #[test]
    fn mouse_events_keep_cell_coordinates() {
        let mut input = InputState::new();
        input.record(Event::Mouse(MouseEvent {
            kind: MouseEventKind::Down(MouseButton::Left),
            column: 12,
            row: 3,
            modifiers: KeyModifiers::NONE,
        }));
        input.record(Event::Mouse(MouseEvent {
            kind: MouseEventKind::Moved,
            column: 13,
            row: 3,
            modifiers: KeyModifiers::NONE,
        }));
        assert_eq!(input.events(), &[InputEvent::MouseDown { x: 12, y: 3 }]);
    }

    #[test]
    fn ctrl_c_is_detected() {
        let mut input = InputState::new();
        input.record(Event::Key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)));
        assert!(input.ctrl_c_pressed());
        input.clear();
        assert!(!input.ctrl_c_pressed());
    }
}
