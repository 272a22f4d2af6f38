/// Combat formulas and ending selection.
///
/// Pure functions. Randomness comes in through `&mut impl Rng` so callers
/// decide the seed.
///
/// ## Formula Table
///
/// ┌───────────────────────┬────────────────────────────────────────────┐
/// │ Quantity               │ Rule                                       │
/// ├───────────────────────┼────────────────────────────────────────────┤
/// │ enemy attack chance    │ aggression + (1 - hp/max) * 0.3, ≤ 1       │
/// │ real-time damage       │ base + (str - class_str) + U(-2..=4), ≥ 1  │
/// │ dodge chance           │ clamp(agility * 0.01, 0, 0.6)              │
/// │ d20 hit                │ d20 + floor(stat * scale) ≥ 8 + defense    │
/// │ flee chance            │ 0.4 + agility * 0.02, ≤ 1                  │
/// │ magic power            │ floor(magic*1.5) + floor(magic_power*0.1)  │
/// └───────────────────────┴────────────────────────────────────────────┘
///
/// ## Endings
///
/// ┌───────────────────┬───────────┐
/// │ choice points      │ ending    │
/// ├───────────────────┼───────────┤
/// │ ≥ 5                │ good      │
/// │ ≥ 2                │ neutral   │
/// │ otherwise          │ bad       │
/// │ (lives exhausted)  │ defeat    │
/// └───────────────────┴───────────┘

use rand::Rng;

use super::class::ClassStats;

// ══════════════════════════════════════════════════════════════
// Real-time
// ══════════════════════════════════════════════════════════════

/// Per-tick probability that an eligible enemy commits to an attack.
pub fn attack_chance(aggression: f32, health_fraction: f32) -> f32 {
    (aggression + (1.0 - health_fraction.clamp(0.0, 1.0)) * 0.3).clamp(0.0, 1.0)
}

/// Damage of one player swing.
pub fn player_damage<R: Rng + ?Sized>(class: &ClassStats, strength: i32, rng: &mut R) -> i32 {
    let bonus = strength - class.strength;
    (class.base_damage + bonus + rng.random_range(-2..=4)).max(1)
}

pub fn dodge_chance(agility: i32) -> f32 {
    (agility as f32 * 0.01).clamp(0.0, 0.6)
}

// ══════════════════════════════════════════════════════════════
// Tactical
// ══════════════════════════════════════════════════════════════

pub fn d20<R: Rng + ?Sized>(rng: &mut R) -> i32 {
    rng.random_range(1..=20)
}

/// `roll` already includes the d20.
pub fn hit_succeeds(roll: i32, stat: i32, scale: f32, defense: i32) -> bool {
    roll + (stat as f32 * scale).floor() as i32 >= 8 + defense
}

pub fn roll_hit<R: Rng + ?Sized>(stat: i32, scale: f32, defense: i32, rng: &mut R) -> bool {
    hit_succeeds(d20(rng), stat, scale, defense)
}

pub fn flee_chance(agility: i32) -> f32 {
    (0.4 + agility as f32 * 0.02).clamp(0.0, 1.0)
}

pub fn magic_power(magic: i32, magic_power: i32) -> i32 {
    (magic as f32 * 1.5).floor() as i32 + (magic_power as f32 * 0.1).floor() as i32
}

/// Uniform in `[lo, hi]`; collapses to `lo` when the range is empty.
pub fn spread<R: Rng + ?Sized>(lo: i32, hi: i32, rng: &mut R) -> i32 {
    if hi <= lo { lo } else { rng.random_range(lo..=hi) }
}

/// Scale by a random factor in `[1 + lo, 1 + hi]`, at least 1.
pub fn vary<R: Rng + ?Sized>(value: i32, lo: f32, hi: f32, rng: &mut R) -> i32 {
    let factor = 1.0 + rng.random_range(lo..=hi);
    ((value as f32 * factor).round() as i32).max(1)
}

// ══════════════════════════════════════════════════════════════
// Endings
// ══════════════════════════════════════════════════════════════

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Ending {
    Good,
    Neutral,
    Bad,
    Defeat,
}

impl Ending {
    pub fn as_str(self) -> &'static str {
        match self {
            Ending::Good => "good",
            Ending::Neutral => "neutral",
            Ending::Bad => "bad",
            Ending::Defeat => "defeat",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Ending::Good => "Good Ending - Shared Water (Guide saved you)",
            Ending::Neutral => "Neutral Ending - You drink alone",
            Ending::Bad => "Bad Ending - Guide betrays you and claims 41 Water",
            Ending::Defeat => "Defeat - You couldn't find 41 Water",
        }
    }
}

pub fn select_ending(choice_points: i32) -> Ending {
    if choice_points >= 5 {
        Ending::Good
    } else if choice_points >= 2 {
        Ending::Neutral
    } else {
        Ending::Bad
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::class::CharClass;
    use crate::domain::entity::Actor;
    use crate::domain::geometry::Rect;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn ending_thresholds() {
        assert_eq!(select_ending(6), Ending::Good);
        assert_eq!(select_ending(5), Ending::Good);
        assert_eq!(select_ending(3), Ending::Neutral);
        assert_eq!(select_ending(2), Ending::Neutral);
        assert_eq!(select_ending(0), Ending::Bad);
        assert_eq!(select_ending(-4), Ending::Bad);
        assert_eq!(select_ending(6).as_str(), "good");
    }

    #[test]
    fn wounded_enemies_attack_more_readily() {
        assert_eq!(attack_chance(0.5, 1.0), 0.5);
        assert!((attack_chance(0.5, 0.0) - 0.8).abs() < 1e-6);
        assert_eq!(attack_chance(0.9, 0.0), 1.0);
    }

    #[test]
    fn wanderer_damage_range() {
        let stats = CharClass::Wanderer.stats();
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        for _ in 0..200 {
            let d = player_damage(&stats, 10, &mut rng);
            assert!((18..=24).contains(&d));
        }
    }

    #[test]
    fn two_swings_kill_a_thirty_hp_target() {
        let stats = CharClass::Wanderer.stats();
        let mut rng = ChaCha8Rng::seed_from_u64(41);
        for _ in 0..50 {
            let mut target = Actor::new(1, Rect::new(0.0, 0.0, 32.0, 32.0), 30);
            target.apply_damage(player_damage(&stats, 10, &mut rng));
            assert!((6..=12).contains(&target.health()));
            target.apply_damage(player_damage(&stats, 10, &mut rng));
            assert!(target.is_dead());
        }
    }

    #[test]
    fn damage_has_a_floor() {
        let stats = CharClass::Wizard.stats();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        assert!(player_damage(&stats, -100, &mut rng) >= 1);
    }

    #[test]
    fn d20_formula_boundary() {
        assert!(hit_succeeds(8, 0, 0.5, 0));
        assert!(!hit_succeeds(7, 1, 0.5, 0));
        assert!(hit_succeeds(7, 2, 0.5, 0));
        assert!(!hit_succeeds(20, 10, 0.5, 18));
    }

    #[test]
    fn chances_are_clamped() {
        assert_eq!(dodge_chance(100), 0.6);
        assert_eq!(dodge_chance(-5), 0.0);
        assert!((flee_chance(10) - 0.6).abs() < 1e-6);
        assert_eq!(flee_chance(50), 1.0);
    }

    #[test]
    fn magic_power_for_wizard() {
        let s = CharClass::Wizard.stats();
        assert_eq!(magic_power(s.magic, s.magic_power), 27 + 5);
    }

    #[test]
    fn spread_handles_empty_ranges() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        assert_eq!(spread(4, 4, &mut rng), 4);
        assert_eq!(spread(4, 1, &mut rng), 4);
        let v = spread(0, 3, &mut rng);
        assert!((0..=3).contains(&v));
    }
}
