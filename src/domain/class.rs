/// Character classes and their fixed stat tables.
///
/// The class is picked once at startup from a name string. Unknown names
/// fall back to the balanced Wanderer rather than failing.

use tracing::warn;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum CharClass {
    Wizard,
    Worrier,
    Warrior,
    Wanderer,
}

/// Shape of the real-time attack hitbox.
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum HitboxShape {
    /// Rectangle in front of the actor, growing to full range.
    Forward { height: f32 },
    /// Circle on the actor's center, growing to full range.
    Radial,
    /// Long rectangle that starts at full reach and retracts.
    Reach { height_ratio: f32 },
}

#[derive(Clone, Copy, PartialEq, Debug)]
pub struct ClassStats {
    pub max_health: i32,
    pub strength: i32,
    pub agility: i32,
    pub magic: i32,
    pub magic_power: i32,
    pub defense: i32,
    pub attack_cooldown: f64,
    pub attack_frames: u32,
    pub attack_range: f32,
    pub shape: HitboxShape,
    pub base_damage: i32,
    pub dash_duration: f32,
    /// px/s
    pub dash_speed: f32,
}

const WIZARD: ClassStats = ClassStats {
    max_health: 80,
    strength: 6,
    agility: 10,
    magic: 18,
    magic_power: 50,
    defense: 12,
    attack_cooldown: 0.45,
    attack_frames: 15,
    attack_range: 45.0,
    shape: HitboxShape::Forward { height: 16.0 },
    base_damage: 20,
    dash_duration: 0.15,
    dash_speed: 600.0,
};

const WORRIER: ClassStats = ClassStats {
    max_health: 120,
    strength: 12,
    agility: 8,
    magic: 6,
    magic_power: 10,
    defense: 40,
    attack_cooldown: 0.5,
    attack_frames: 12,
    attack_range: 40.0,
    shape: HitboxShape::Radial,
    base_damage: 30,
    dash_duration: 0.25,
    dash_speed: 420.0,
};

const WARRIOR: ClassStats = ClassStats {
    max_health: 140,
    strength: 16,
    agility: 6,
    magic: 4,
    magic_power: 5,
    defense: 50,
    attack_cooldown: 0.48,
    attack_frames: 14,
    attack_range: 48.0,
    shape: HitboxShape::Reach { height_ratio: 0.6 },
    base_damage: 24,
    dash_duration: 0.18,
    dash_speed: 480.0,
};

const WANDERER: ClassStats = ClassStats {
    max_health: 100,
    strength: 10,
    agility: 10,
    magic: 10,
    magic_power: 10,
    defense: 10,
    attack_cooldown: 0.4,
    attack_frames: 12,
    attack_range: 40.0,
    shape: HitboxShape::Forward { height: 16.0 },
    base_damage: 20,
    dash_duration: 0.18,
    dash_speed: 480.0,
};

impl CharClass {
    /// Case-insensitive lookup. Unknown names become `Wanderer`.
    pub fn from_name(name: &str) -> CharClass {
        match name.trim().to_ascii_lowercase().as_str() {
            "wizard" => CharClass::Wizard,
            "worrier" => CharClass::Worrier,
            "warrior" => CharClass::Warrior,
            "wanderer" => CharClass::Wanderer,
            other => {
                warn!(class = other, "unknown class name, using Wanderer");
                CharClass::Wanderer
            }
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            CharClass::Wizard => "Wizard",
            CharClass::Worrier => "Worrier",
            CharClass::Warrior => "Warrior",
            CharClass::Wanderer => "Wanderer",
        }
    }

    pub fn stats(self) -> ClassStats {
        match self {
            CharClass::Wizard => WIZARD,
            CharClass::Worrier => WORRIER,
            CharClass::Warrior => WARRIOR,
            CharClass::Wanderer => WANDERER,
        }
    }
}

/// Run-speed multiplier from agility (10 is neutral).
pub fn move_multiplier(agility: i32) -> f32 {
    1.0 + (agility - 10) as f32 * 0.03
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip_and_fallback() {
        for class in [CharClass::Wizard, CharClass::Worrier, CharClass::Warrior] {
            assert_eq!(CharClass::from_name(class.name()), class);
        }
        assert_eq!(CharClass::from_name("  WARRIOR "), CharClass::Warrior);
        assert_eq!(CharClass::from_name("bard"), CharClass::Wanderer);
    }

    #[test]
    fn class_shapes() {
        assert_eq!(CharClass::Worrier.stats().shape, HitboxShape::Radial);
        assert!(matches!(CharClass::Warrior.stats().shape, HitboxShape::Reach { .. }));
        assert!(matches!(CharClass::Wizard.stats().shape, HitboxShape::Forward { .. }));
    }

    #[test]
    fn agility_scales_speed() {
        assert_eq!(move_multiplier(10), 1.0);
        assert!(move_multiplier(6) < 1.0);
        assert!((move_multiplier(20) - 1.3).abs() < 1e-6);
    }
}
