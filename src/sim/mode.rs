/// Modal layers over the stage simulation.
///
/// The stage runs only while the stack is empty. Pushing a mode suspends
/// the stage (nothing is destroyed); popping resumes it on the next tick.
/// `step` routes input to the top mode instead of the player.

use super::tactical::TacticalEncounter;

/// Cursor over the player's inventory.
#[derive(Clone, Debug, Default)]
pub struct InventoryMenu {
    pub cursor: usize,
}

impl InventoryMenu {
    /// Move by `delta`, wrapping over `len` slots.
    pub fn move_cursor(&mut self, delta: i32, len: usize) {
        if len == 0 {
            self.cursor = 0;
            return;
        }
        self.cursor = (self.cursor as i32 + delta).rem_euclid(len as i32) as usize;
    }

    /// Keep the cursor on a valid slot after the list shrank.
    pub fn clamp(&mut self, len: usize) {
        self.cursor = self.cursor.min(len.saturating_sub(1));
    }
}

#[derive(Clone, Debug)]
pub enum Mode {
    Tactical(TacticalEncounter),
    Inventory(InventoryMenu),
}

#[derive(Clone, Debug, Default)]
pub struct ModeStack {
    stack: Vec<Mode>,
}

impl ModeStack {
    pub fn push(&mut self, mode: Mode) {
        self.stack.push(mode);
    }

    pub fn pop(&mut self) -> Option<Mode> {
        self.stack.pop()
    }

    pub fn top(&self) -> Option<&Mode> {
        self.stack.last()
    }

    pub fn top_mut(&mut self) -> Option<&mut Mode> {
        self.stack.last_mut()
    }

    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    pub fn clear(&mut self) {
        self.stack.clear();
    }

    pub fn in_tactical(&self) -> bool {
        matches!(self.top(), Some(Mode::Tactical(_)))
    }

    pub fn in_inventory(&self) -> bool {
        matches!(self.top(), Some(Mode::Inventory(_)))
    }
}
