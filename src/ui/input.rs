/// Keyboard input provider.
///
/// Tracks which keys are held so movement is continuous while one-shot
/// actions (jump, attack, menu keys) fire only on the initial press, then
/// folds the result into one `InputFrame` per tick.
///
/// Terminals that report key release get exact hold tracking; the rest
/// fall back to treating a key as released after a short silence.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crossterm::event::{self, poll, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use water41::sim::step::InputFrame;

/// Without Release events, a key counts as held this long after its last
/// Press/Repeat.
const HOLD_TIMEOUT: Duration = Duration::from_millis(160);

// ── Key tables ──

const KEYS_LEFT: &[KeyCode] = &[KeyCode::Left, KeyCode::Char('a'), KeyCode::Char('A')];
const KEYS_RIGHT: &[KeyCode] = &[KeyCode::Right, KeyCode::Char('d'), KeyCode::Char('D')];
const KEYS_JUMP: &[KeyCode] = &[KeyCode::Up, KeyCode::Char('w'), KeyCode::Char('W'), KeyCode::Char(' ')];
const KEYS_DASH: &[KeyCode] = &[KeyCode::Char('k'), KeyCode::Char('K')];
const KEYS_ATTACK: &[KeyCode] = &[KeyCode::Char('j'), KeyCode::Char('J'), KeyCode::Enter];
const KEYS_TACTICAL: &[KeyCode] = &[KeyCode::Char('t'), KeyCode::Char('T')];
const KEYS_INVENTORY: &[KeyCode] = &[KeyCode::Char('i'), KeyCode::Char('I')];
const KEYS_USE: &[KeyCode] = &[KeyCode::Char('u'), KeyCode::Char('U')];
const KEYS_DISCARD: &[KeyCode] = &[KeyCode::Char('x'), KeyCode::Char('X')];
const KEYS_BEFRIEND: &[KeyCode] = &[KeyCode::Char('b'), KeyCode::Char('B')];
const KEYS_FIGHT: &[KeyCode] = &[KeyCode::Char('f'), KeyCode::Char('F')];
const KEYS_FLEE: &[KeyCode] = &[KeyCode::Esc, KeyCode::Char('r'), KeyCode::Char('R')];
const KEYS_QUIT: &[KeyCode] = &[KeyCode::Char('q'), KeyCode::Char('Q')];

pub struct InputState {
    /// Last Press/Repeat per key.
    last_active: HashMap<KeyCode, Instant>,
    /// Keys that went from released to held during the last drain.
    fresh_presses: Vec<KeyCode>,
    raw_events: Vec<KeyEvent>,
    /// Trust Release events. Only set once keyboard enhancement is on.
    pub honor_release: bool,
}

impl InputState {
    pub fn new() -> Self {
        InputState {
            last_active: HashMap::with_capacity(16),
            fresh_presses: Vec::with_capacity(8),
            raw_events: Vec::with_capacity(8),
            honor_release: false,
        }
    }

    /// Read every pending terminal event without blocking. Call once per
    /// frame, before building the tick's `InputFrame`.
    pub fn drain_events(&mut self) {
        self.fresh_presses.clear();
        self.raw_events.clear();

        while poll(Duration::ZERO).unwrap_or(false) {
            if let Ok(Event::Key(key)) = event::read() {
                self.record(key, Instant::now());
            }
        }

        let now = Instant::now();
        self.last_active.retain(|_, t| now.duration_since(*t) < HOLD_TIMEOUT);
    }

    fn record(&mut self, key: KeyEvent, at: Instant) {
        self.raw_events.push(key);
        match key.kind {
            KeyEventKind::Release if self.honor_release => {
                self.last_active.remove(&key.code);
            }
            KeyEventKind::Release => {}
            _ => {
                let was_held = self.is_held(key.code);
                self.last_active.insert(key.code, at);
                if !was_held {
                    self.fresh_presses.push(key.code);
                }
            }
        }
    }

    pub fn is_held(&self, code: KeyCode) -> bool {
        self.last_active.get(&code)
            .map(|t| t.elapsed() < HOLD_TIMEOUT)
            .unwrap_or(false)
    }

    pub fn any_held(&self, codes: &[KeyCode]) -> bool {
        codes.iter().any(|c| self.is_held(*c))
    }

    /// Edge trigger: pressed during the last drain.
    pub fn any_pressed(&self, codes: &[KeyCode]) -> bool {
        codes.iter().any(|c| self.fresh_presses.contains(c))
    }

    pub fn quit_requested(&self) -> bool {
        self.any_pressed(KEYS_QUIT) || self.raw_events.iter().any(|k| {
            k.modifiers.contains(KeyModifiers::CONTROL)
                && (k.code == KeyCode::Char('c') || k.code == KeyCode::Char('C'))
        })
    }

    /// Fold the key state into this tick's action set.
    pub fn frame(&self) -> InputFrame {
        InputFrame {
            left: self.any_held(KEYS_LEFT),
            right: self.any_held(KEYS_RIGHT),
            jump: self.any_pressed(KEYS_JUMP),
            dash: self.any_pressed(KEYS_DASH),
            attack: self.any_pressed(KEYS_ATTACK),
            enter_tactical: self.any_pressed(KEYS_TACTICAL),
            toggle_inventory: self.any_pressed(KEYS_INVENTORY),
            use_item: self.any_pressed(KEYS_USE),
            discard_item: self.any_pressed(KEYS_DISCARD),
            befriend: self.any_pressed(KEYS_BEFRIEND),
            fight: self.any_pressed(KEYS_FIGHT),
            flee: self.any_pressed(KEYS_FLEE),
            menu_left: self.any_pressed(KEYS_LEFT),
            menu_right: self.any_pressed(KEYS_RIGHT),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode, kind: KeyEventKind) -> KeyEvent {
        KeyEvent::new_with_kind(code, KeyModifiers::NONE, kind)
    }

    #[test]
    fn held_movement_and_one_shot_attack() {
        let mut s = InputState::new();
        s.record(key(KeyCode::Right, KeyEventKind::Press), Instant::now());
        s.record(key(KeyCode::Char('j'), KeyEventKind::Press), Instant::now());
        let f = s.frame();
        assert!(f.right && f.menu_right && f.attack);
        assert!(!f.left && !f.jump);

        s.fresh_presses.clear();
        s.record(key(KeyCode::Right, KeyEventKind::Repeat), Instant::now());
        let f = s.frame();
        assert!(f.right);
        assert!(!f.menu_right && !f.attack);
    }

    #[test]
    fn release_only_counts_when_trusted() {
        let mut s = InputState::new();
        s.record(key(KeyCode::Left, KeyEventKind::Press), Instant::now());
        s.record(key(KeyCode::Left, KeyEventKind::Release), Instant::now());
        assert!(s.frame().left);

        s.honor_release = true;
        s.record(key(KeyCode::Left, KeyEventKind::Release), Instant::now());
        assert!(!s.frame().left);
    }

    #[test]
    fn ctrl_c_quits() {
        let mut s = InputState::new();
        s.record(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL), Instant::now());
        assert!(s.quit_requested());
    }
}
