/// Entities: the shared Actor body, the Player, checkpoints, pickups
/// and the presentation records produced by combat.
///
/// Every timer on an Actor is a simulation timestamp (seconds since the
/// run started, accumulated from the caller's `dt`), never a wall clock.

use super::class::{move_multiplier, CharClass, ClassStats};
use super::geometry::Rect;
use super::inventory::{Inventory, Item};

/// Stable identity of an actor for the lifetime of a stage.
pub type EntityId = u32;

pub const PLAYER_ID: EntityId = 0;
pub const PLAYER_W: f32 = 24.0;
pub const PLAYER_H: f32 = 36.0;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Facing {
    Left,
    Right,
}

impl Facing {
    pub fn sign(self) -> f32 {
        match self {
            Facing::Left => -1.0,
            Facing::Right => 1.0,
        }
    }

    /// Direction of a signed delta; zero keeps `fallback`.
    pub fn toward(delta: f32, fallback: Facing) -> Facing {
        if delta > 0.0 {
            Facing::Right
        } else if delta < 0.0 {
            Facing::Left
        } else {
            fallback
        }
    }
}

/// Discrete tag the renderer uses to pick a sprite.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum VisualState {
    Idle,
    Attacking,
    Dashing,
    Hurt,
    Phased,
}

// ══════════════════════════════════════════════════════════════
// AttackWindow
// ══════════════════════════════════════════════════════════════

/// Time-bounded active attack.
///
/// `remaining` counts down one per simulation tick from `initial`; when it
/// reaches zero the window closes. `struck` remembers every target this
/// swing already damaged so overlap on later ticks cannot hit twice.
#[derive(Clone, Debug, Default)]
pub struct AttackWindow {
    pub active: bool,
    pub remaining: u32,
    pub initial: u32,
    struck: Vec<EntityId>,
}

impl AttackWindow {
    pub fn start(&mut self, frames: u32) {
        let frames = frames.max(1);
        self.active = true;
        self.remaining = frames;
        self.initial = frames;
        self.struck.clear();
    }

    /// remaining / initial; 0.0 while idle.
    pub fn progress(&self) -> f32 {
        if !self.active || self.initial == 0 { return 0.0; }
        self.remaining as f32 / self.initial as f32
    }

    /// Advance one tick. Returns true on the tick the window closes.
    pub fn advance(&mut self) -> bool {
        if !self.active { return false; }
        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining == 0 {
            self.active = false;
            return true;
        }
        false
    }

    pub fn cancel(&mut self) {
        self.active = false;
        self.remaining = 0;
    }

    pub fn already_struck(&self, id: EntityId) -> bool {
        self.struck.contains(&id)
    }

    pub fn mark_struck(&mut self, id: EntityId) {
        if !self.struck.contains(&id) {
            self.struck.push(id);
        }
    }
}

// ══════════════════════════════════════════════════════════════
// Status effects
// ══════════════════════════════════════════════════════════════

#[derive(Clone, Copy, PartialEq, Debug)]
pub enum EffectKind {
    /// Damaging puddle left by a slime. `area` is fixed in world space.
    AcidPool { damage: i32, area: Rect },
    /// Strand fired by a spider; snares the player on contact.
    WebStrand { area: Rect },
}

#[derive(Clone, Copy, PartialEq, Debug)]
pub struct StatusEffect {
    pub kind: EffectKind,
    pub remaining: f32,
    /// Set once the effect has touched the player.
    pub spent: bool,
}

impl StatusEffect {
    pub fn new(kind: EffectKind, duration: f32) -> Self {
        StatusEffect { kind, remaining: duration, spent: false }
    }
}

// ══════════════════════════════════════════════════════════════
// Actor
// ══════════════════════════════════════════════════════════════

/// Physical body shared by player, enemies and boss.
#[derive(Clone, Debug)]
pub struct Actor {
    pub id: EntityId,
    pub rect: Rect,
    pub vx: f32,
    pub vy: f32,
    /// Impulse from the last hit, added on top of `vx` and bled off by
    /// the integrator.
    pub knockback_vx: f32,
    pub on_ground: bool,
    pub facing: Facing,
    health: i32,
    max_health: i32,
    dead: bool,
    pub last_attack: f64,
    pub last_hurt: f64,
    pub invulnerable_until: f64,
    pub attack: AttackWindow,
    pub effects: Vec<StatusEffect>,
}

impl Actor {
    pub fn new(id: EntityId, rect: Rect, max_health: i32) -> Self {
        let max_health = max_health.max(1);
        Actor {
            id,
            rect,
            vx: 0.0,
            vy: 0.0,
            knockback_vx: 0.0,
            on_ground: false,
            facing: Facing::Right,
            health: max_health,
            max_health,
            dead: false,
            last_attack: f64::NEG_INFINITY,
            last_hurt: f64::NEG_INFINITY,
            invulnerable_until: f64::NEG_INFINITY,
            attack: AttackWindow::default(),
            effects: Vec::new(),
        }
    }

    pub fn health(&self) -> i32 { self.health }
    pub fn max_health(&self) -> i32 { self.max_health }
    pub fn is_dead(&self) -> bool { self.dead }

    pub fn health_fraction(&self) -> f32 {
        self.health as f32 / self.max_health as f32
    }

    /// Subtract `amount` (negative treated as zero). Returns the damage
    /// actually removed after clamping at zero.
    pub fn apply_damage(&mut self, amount: i32) -> i32 {
        let before = self.health;
        self.set_health(self.health - amount.max(0));
        before - self.health
    }

    /// Add `amount`, clamped at max. Returns the health actually restored.
    pub fn heal(&mut self, amount: i32) -> i32 {
        if self.dead { return 0; }
        let before = self.health;
        self.set_health(self.health + amount.max(0));
        self.health - before
    }

    pub fn set_health(&mut self, value: i32) {
        self.health = value.clamp(0, self.max_health);
        self.dead = self.health <= 0;
    }

    /// Back to full health and alive.
    pub fn revive(&mut self) {
        self.health = self.max_health;
        self.dead = false;
    }

    pub fn is_invulnerable(&self, now: f64) -> bool {
        now < self.invulnerable_until
    }

    /// Extend (never shorten) the invulnerability window.
    pub fn grant_invulnerability(&mut self, now: f64, duration: f64) {
        self.invulnerable_until = self.invulnerable_until.max(now + duration);
    }

    /// Count effect durations down and drop the expired ones.
    pub fn tick_effects(&mut self, dt: f32) {
        for e in self.effects.iter_mut() {
            e.remaining -= dt;
        }
        self.effects.retain(|e| e.remaining > 0.0);
    }

    pub fn recently_hurt(&self, now: f64, window: f64) -> bool {
        now - self.last_hurt < window
    }
}

// ══════════════════════════════════════════════════════════════
// Player
// ══════════════════════════════════════════════════════════════

#[derive(Clone, Debug)]
pub struct Player {
    pub actor: Actor,
    pub class: CharClass,
    pub strength: i32,
    pub agility: i32,
    pub magic: i32,
    pub magic_power: i32,
    pub defense: i32,
    /// Seconds since the feet last touched ground.
    pub airborne_for: f32,
    pub dash_remaining: f32,
    pub dash_dir: f32,
    pub can_dash: bool,
    /// Seconds of web snare left.
    pub snare_remaining: f32,
    /// Inside a ghost's fear aura this tick.
    pub feared: bool,
    pub inventory: Inventory,
    pub exp: u32,
}

impl Player {
    pub fn new(class: CharClass, x: f32, y: f32) -> Self {
        let stats = class.stats();
        Player {
            actor: Actor::new(PLAYER_ID, Rect::new(x, y, PLAYER_W, PLAYER_H), stats.max_health),
            class,
            strength: stats.strength,
            agility: stats.agility,
            magic: stats.magic,
            magic_power: stats.magic_power,
            defense: stats.defense,
            airborne_for: 0.0,
            dash_remaining: 0.0,
            dash_dir: 1.0,
            can_dash: true,
            snare_remaining: 0.0,
            feared: false,
            inventory: Inventory::default(),
            exp: 0,
        }
    }

    pub fn stats(&self) -> ClassStats {
        self.class.stats()
    }

    pub fn is_dashing(&self) -> bool {
        self.dash_remaining > 0.0
    }

    /// Horizontal run speed after agility and active slows.
    pub fn run_speed(&self, base: f32) -> f32 {
        let mut speed = base * move_multiplier(self.agility);
        if self.snare_remaining > 0.0 { speed *= 0.5; }
        if self.feared { speed *= 0.7; }
        speed
    }

    /// Put the player back on its feet at a spawn point.
    pub fn respawn_at(&mut self, x: f32, y: f32, now: f64, protection: f64) {
        self.actor.rect.x = x;
        self.actor.rect.y = y;
        self.actor.vx = 0.0;
        self.actor.vy = 0.0;
        self.actor.knockback_vx = 0.0;
        self.actor.on_ground = false;
        self.actor.revive();
        self.actor.attack.cancel();
        self.actor.effects.clear();
        self.actor.grant_invulnerability(now, protection);
        self.airborne_for = 0.0;
        self.dash_remaining = 0.0;
        self.can_dash = true;
        self.snare_remaining = 0.0;
        self.feared = false;
    }

    pub fn visual_state(&self, now: f64) -> VisualState {
        if self.is_dashing() {
            VisualState::Dashing
        } else if self.actor.attack.active {
            VisualState::Attacking
        } else if self.actor.recently_hurt(now, 0.2) {
            VisualState::Hurt
        } else {
            VisualState::Idle
        }
    }

    pub fn pick_up(&mut self, item: Item) {
        self.inventory.add(item);
    }
}

// ══════════════════════════════════════════════════════════════
// Stage fixtures
// ══════════════════════════════════════════════════════════════

/// Static respawn marker. Activation is one-way.
#[derive(Clone, Debug)]
pub struct Checkpoint {
    pub rect: Rect,
    activated_at: Option<f64>,
}

impl Checkpoint {
    pub fn new(rect: Rect) -> Self {
        Checkpoint { rect, activated_at: None }
    }

    pub fn is_activated(&self) -> bool {
        self.activated_at.is_some()
    }

    pub fn activated_at(&self) -> Option<f64> {
        self.activated_at
    }

    /// Returns true only on the first activation.
    pub fn activate(&mut self, now: f64) -> bool {
        if self.activated_at.is_some() { return false; }
        self.activated_at = Some(now);
        true
    }
}

/// An item lying in the stage, waiting to be touched.
#[derive(Clone, Debug)]
pub struct GroundItem {
    pub item: Item,
    pub rect: Rect,
}

// ══════════════════════════════════════════════════════════════
// Presentation records
// ══════════════════════════════════════════════════════════════

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum DamageTint {
    /// Damage dealt by the player.
    Dealt,
    /// Damage taken by the player.
    Taken,
    /// A dodged hit (amount 0).
    Dodged,
}

/// Floating number spawned by a hit. Rises and fades over `life` seconds.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct DamageNumber {
    pub x: f32,
    pub y: f32,
    pub amount: i32,
    pub tint: DamageTint,
    pub life: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn actor(hp: i32) -> Actor {
        Actor::new(7, Rect::new(0.0, 0.0, 10.0, 10.0), hp)
    }

    #[test]
    fn health_stays_in_range() {
        let mut a = actor(30);
        assert_eq!(a.apply_damage(12), 12);
        assert_eq!(a.health(), 18);
        assert!(!a.is_dead());

        assert_eq!(a.heal(100), 12);
        assert_eq!(a.health(), 30);

        assert_eq!(a.apply_damage(-5), 0);
        assert_eq!(a.apply_damage(99), 30);
        assert_eq!(a.health(), 0);
        assert!(a.is_dead());

        // Dead actors are not healed back by potions or regen.
        assert_eq!(a.heal(10), 0);
        assert!(a.is_dead());
    }

    #[test]
    fn set_health_clamps_and_revive_restores() {
        let mut a = actor(40);
        a.set_health(99);
        assert_eq!(a.health(), 40);
        a.set_health(-3);
        assert_eq!(a.health(), 0);
        assert!(a.is_dead());
        a.revive();
        assert_eq!(a.health(), 40);
        assert!(!a.is_dead());
    }

    #[test]
    fn attack_window_progress_is_non_increasing() {
        let mut w = AttackWindow::default();
        assert_eq!(w.progress(), 0.0);
        w.start(4);
        let mut last = w.progress();
        assert_eq!(last, 1.0);
        let mut closed = false;
        for _ in 0..4 {
            closed = w.advance();
            assert!(w.progress() <= last);
            last = w.progress();
        }
        assert!(closed);
        assert!(!w.active);
        assert_eq!(w.progress(), 0.0);
        assert!(!w.advance());
    }

    #[test]
    fn restarting_a_window_forgets_struck_targets() {
        let mut w = AttackWindow::default();
        w.start(3);
        w.mark_struck(5);
        w.mark_struck(5);
        assert!(w.already_struck(5));
        w.start(3);
        assert!(!w.already_struck(5));
    }

    #[test]
    fn effects_expire_at_zero() {
        let mut a = actor(10);
        a.effects.push(StatusEffect::new(
            EffectKind::WebStrand { area: Rect::new(0.0, 0.0, 8.0, 8.0) },
            0.5,
        ));
        a.tick_effects(0.25);
        assert_eq!(a.effects.len(), 1);
        a.tick_effects(0.25);
        assert!(a.effects.is_empty());
    }

    #[test]
    fn checkpoint_activation_is_one_way() {
        let mut cp = Checkpoint::new(Rect::new(0.0, 0.0, 16.0, 48.0));
        assert!(cp.activate(3.0));
        assert!(!cp.activate(9.0));
        assert_eq!(cp.activated_at(), Some(3.0));
    }

    #[test]
    fn invulnerability_only_extends() {
        let mut a = actor(10);
        a.grant_invulnerability(0.0, 2.0);
        a.grant_invulnerability(0.5, 0.6);
        assert!(a.is_invulnerable(1.9));
        assert!(!a.is_invulnerable(2.0));
    }
}
