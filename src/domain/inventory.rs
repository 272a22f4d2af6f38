/// Items and the player's inventory.
///
/// Items move by value: ground → inventory → consumed or discarded.
/// Selecting from an empty inventory is a no-op with a message; a slot
/// index past the end is an `ActionError::InvalidIndex`.

use crate::error::ActionError;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ItemKind {
    Potion,
    BuffStrength,
    Key,
}

impl ItemKind {
    pub fn label(self) -> &'static str {
        match self {
            ItemKind::Potion => "potion",
            ItemKind::BuffStrength => "buff_strength",
            ItemKind::Key => "key",
        }
    }
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Item {
    pub id: u32,
    pub name: String,
    pub kind: ItemKind,
    pub value: i32,
}

impl Item {
    pub fn new(id: u32, name: &str, kind: ItemKind, value: i32) -> Self {
        Item { id, name: name.to_string(), kind, value }
    }
}

/// What using an item did to its holder.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ItemEffect {
    Healed(i32),
    StrengthUp(i32),
    Story,
    Nothing,
}

/// Result of a successful inventory action: a line for the message log
/// plus the effect the caller must apply to the player.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct ItemOutcome {
    pub message: String,
    pub effect: ItemEffect,
}

impl ItemOutcome {
    fn nothing(message: &str) -> Self {
        ItemOutcome { message: message.to_string(), effect: ItemEffect::Nothing }
    }
}

pub const EMPTY_MESSAGE: &str = "Inventory is empty.";

#[derive(Clone, Debug, Default)]
pub struct Inventory {
    items: Vec<Item>,
}

impl Inventory {
    pub fn add(&mut self, item: Item) {
        self.items.push(item);
    }

    pub fn len(&self) -> usize { self.items.len() }
    pub fn is_empty(&self) -> bool { self.items.is_empty() }

    /// Numbered listing, one line per item.
    pub fn list(&self) -> Vec<String> {
        self.items.iter().enumerate()
            .map(|(i, it)| format!("{}. {} ({})", i + 1, it.name, it.kind.label()))
            .collect()
    }

    /// Consume the item at `index`.
    ///
    /// `health`/`max_health` only shape the heal message; the caller applies
    /// the returned effect so clamping stays on the Actor.
    pub fn use_item(&mut self, index: usize, health: i32, max_health: i32) -> Result<ItemOutcome, ActionError> {
        if self.items.is_empty() {
            return Ok(ItemOutcome::nothing(EMPTY_MESSAGE));
        }
        self.check(index)?;
        let item = self.items.remove(index);
        let outcome = match item.kind {
            ItemKind::Potion => {
                let restored = item.value.max(0).min((max_health - health).max(0));
                ItemOutcome {
                    message: format!("Used {}. Restored {} HP.", item.name, restored),
                    effect: ItemEffect::Healed(item.value),
                }
            }
            ItemKind::BuffStrength => ItemOutcome {
                message: format!("{} equipped. Strength +{}.", item.name, item.value),
                effect: ItemEffect::StrengthUp(item.value),
            },
            ItemKind::Key => ItemOutcome {
                message: format!("Used {} (story item).", item.name),
                effect: ItemEffect::Story,
            },
        };
        Ok(outcome)
    }

    pub fn discard_item(&mut self, index: usize) -> Result<ItemOutcome, ActionError> {
        if self.items.is_empty() {
            return Ok(ItemOutcome::nothing(EMPTY_MESSAGE));
        }
        self.check(index)?;
        let item = self.items.remove(index);
        Ok(ItemOutcome::nothing(&format!("Discarded {}.", item.name)))
    }

    /// Index of the first potion, if any.
    pub fn first_potion(&self) -> Option<usize> {
        self.items.iter().position(|it| it.kind == ItemKind::Potion)
    }

    fn check(&self, index: usize) -> Result<(), ActionError> {
        if index >= self.items.len() {
            return Err(ActionError::InvalidIndex { index, len: self.items.len() });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bag() -> Inventory {
        let mut inv = Inventory::default();
        inv.add(Item::new(1, "Minor Potion", ItemKind::Potion, 25));
        inv.add(Item::new(2, "Rusty Ring", ItemKind::BuffStrength, 1));
        inv.add(Item::new(3, "Rusty Key", ItemKind::Key, 0));
        inv
    }

    #[test]
    fn listing_is_numbered() {
        let inv = bag();
        assert_eq!(inv.list()[0], "1. Minor Potion (potion)");
        assert_eq!(inv.list()[1], "2. Rusty Ring (buff_strength)");
    }

    #[test]
    fn potion_message_reports_clamped_heal() {
        let mut inv = bag();
        let out = inv.use_item(0, 90, 100).unwrap();
        assert_eq!(out.message, "Used Minor Potion. Restored 10 HP.");
        assert_eq!(out.effect, ItemEffect::Healed(25));
        assert_eq!(inv.len(), 2);
    }

    #[test]
    fn buff_and_key_messages() {
        let mut inv = bag();
        let ring = inv.use_item(1, 50, 100).unwrap();
        assert_eq!(ring.message, "Rusty Ring equipped. Strength +1.");
        assert_eq!(ring.effect, ItemEffect::StrengthUp(1));
        let key = inv.use_item(1, 50, 100).unwrap();
        assert_eq!(key.message, "Used Rusty Key (story item).");
    }

    #[test]
    fn bad_index_is_an_error_and_keeps_items() {
        let mut inv = bag();
        let err = inv.use_item(7, 10, 10).unwrap_err();
        assert_eq!(err, ActionError::InvalidIndex { index: 7, len: 3 });
        assert_eq!(err.to_string(), "Invalid item index.");
        assert!(inv.discard_item(3).is_err());
        assert_eq!(inv.len(), 3);
    }

    #[test]
    fn empty_inventory_is_a_no_op() {
        let mut inv = Inventory::default();
        let out = inv.use_item(0, 1, 1).unwrap();
        assert_eq!(out.message, EMPTY_MESSAGE);
        assert_eq!(out.effect, ItemEffect::Nothing);
        assert_eq!(inv.discard_item(4).unwrap().message, EMPTY_MESSAGE);
    }

    #[test]
    fn first_potion_skips_other_kinds() {
        let mut inv = Inventory::default();
        inv.add(Item::new(1, "Rusty Key", ItemKind::Key, 0));
        assert_eq!(inv.first_potion(), None);
        inv.add(Item::new(2, "Tiny Potion", ItemKind::Potion, 15));
        assert_eq!(inv.first_potion(), Some(1));
    }
}
