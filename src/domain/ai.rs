/// Enemy AI: one small state machine per species.
///
/// Each species owns its special ability as an explicit, bounded resource:
///   - **Grub**   patrol ↔ burrowed. Burrowing is gated by a recharge timer.
///   - **Spider** chase ↔ web-ready. Webs are charges with timed recharge.
///   - **Slime**  bounce ↔ split. Size is the split capacity (2 → 1).
///   - **Ghost**  visible ↔ hidden. Energy regenerates and pays for hidden
///                movement and the phase-in burst.
///
/// `think` runs once per tick and only writes intent: velocities, attack
/// windows and status effects on the enemy itself. Movement is resolved by
/// the physics layer afterwards; hits are resolved by the combat layer.
///
/// Per-frame chances from the tuning tables are converted to the caller's
/// `dt` with `chance_per_tick`, so behavior does not depend on tick rate.

use rand::Rng;
use tracing::debug;

use super::class::HitboxShape;
use super::entity::{Actor, EffectKind, EntityId, StatusEffect, VisualState};
use super::geometry::Rect;
use super::physics::{BodyParams, CollisionWorld};
use super::rules;

pub const ENEMY_SIZE: f32 = 32.0;
const ENEMY_ATTACK_FRAMES: u32 = 10;

// ══════════════════════════════════════════════════════════════
// Species tables
// ══════════════════════════════════════════════════════════════

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum EnemyKind {
    Grub,
    Spider,
    Slime,
    Ghost,
}

#[derive(Clone, Copy, PartialEq, Debug)]
pub struct SpeciesStats {
    pub max_health: i32,
    /// px/s
    pub speed: f32,
    pub damage: i32,
    pub attack_range: f32,
    pub attack_cooldown: f64,
    pub hurt_debounce: f64,
}

impl EnemyKind {
    pub fn name(self) -> &'static str {
        match self {
            EnemyKind::Grub => "grub",
            EnemyKind::Spider => "spider",
            EnemyKind::Slime => "slime",
            EnemyKind::Ghost => "ghost",
        }
    }

    pub fn stats(self) -> SpeciesStats {
        match self {
            EnemyKind::Grub => SpeciesStats {
                max_health: 30, speed: 48.0, damage: 8,
                attack_range: 45.0, attack_cooldown: 2.0, hurt_debounce: 0.15,
            },
            EnemyKind::Spider => SpeciesStats {
                max_health: 25, speed: 84.0, damage: 12,
                attack_range: 70.0, attack_cooldown: 1.8, hurt_debounce: 0.12,
            },
            EnemyKind::Slime => SpeciesStats {
                max_health: 40, speed: 42.0, damage: 10,
                attack_range: 35.0, attack_cooldown: 2.2, hurt_debounce: 0.15,
            },
            EnemyKind::Ghost => SpeciesStats {
                max_health: 28, speed: 66.0, damage: 14,
                attack_range: 55.0, attack_cooldown: 1.9, hurt_debounce: 0.15,
            },
        }
    }

    /// Body constants relative to the world's base gravity/terminal speed.
    pub fn body_params(self, gravity: f32, terminal_velocity: f32) -> BodyParams {
        match self {
            EnemyKind::Slime => BodyParams { gravity: gravity * 2.0 / 3.0, terminal_velocity, collides: true },
            EnemyKind::Spider => BodyParams { gravity, terminal_velocity: terminal_velocity * 2.0 / 3.0, collides: true },
            EnemyKind::Ghost => BodyParams { gravity: 0.0, terminal_velocity, collides: false },
            EnemyKind::Grub => BodyParams { gravity, terminal_velocity, collides: true },
        }
    }
}

/// Convert a per-frame (60 Hz) probability to one tick of length `dt`.
pub fn chance_per_tick(per_frame: f32, dt: f32) -> f32 {
    let p = per_frame.clamp(0.0, 1.0);
    1.0 - (1.0 - p).powf(dt * 60.0)
}

fn roll<R: Rng + ?Sized>(rng: &mut R, p: f32) -> bool {
    rng.random::<f32>() < p
}

fn sign(v: f32) -> f32 {
    if v < 0.0 { -1.0 } else { 1.0 }
}

// ══════════════════════════════════════════════════════════════
// Bounded resources
// ══════════════════════════════════════════════════════════════

/// One-shot timer that must run down before the ability is usable again.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct Cooldown {
    remaining: f32,
    duration: f32,
}

impl Cooldown {
    pub fn new(duration: f32) -> Self {
        Cooldown { remaining: 0.0, duration }
    }

    pub fn ready(&self) -> bool { self.remaining <= 0.0 }
    pub fn trigger(&mut self) { self.remaining = self.duration; }

    pub fn tick(&mut self, dt: f32) {
        if self.remaining > 0.0 {
            self.remaining -= dt;
        }
    }
}

/// Stack of uses that refills one at a time.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct Charges {
    current: u32,
    max: u32,
    recharge: f32,
    progress: f32,
}

impl Charges {
    pub fn full(max: u32, recharge: f32) -> Self {
        Charges { current: max, max, recharge, progress: 0.0 }
    }

    pub fn current(&self) -> u32 { self.current }

    pub fn try_spend(&mut self) -> bool {
        if self.current == 0 { return false; }
        self.current -= 1;
        true
    }

    pub fn tick(&mut self, dt: f32) {
        if self.current >= self.max {
            self.progress = 0.0;
            return;
        }
        self.progress += dt;
        while self.progress >= self.recharge && self.current < self.max {
            self.progress -= self.recharge;
            self.current += 1;
        }
    }
}

/// Continuous pool with passive regeneration.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct Energy {
    current: f32,
    max: f32,
    regen: f32,
}

impl Energy {
    pub fn full(max: f32, regen: f32) -> Self {
        Energy { current: max, max, regen }
    }

    pub fn current(&self) -> f32 { self.current }

    pub fn tick(&mut self, dt: f32) {
        self.current = (self.current + self.regen * dt).min(self.max);
    }

    pub fn try_spend(&mut self, amount: f32) -> bool {
        if self.current < amount { return false; }
        self.current -= amount;
        true
    }

    pub fn drain(&mut self, amount: f32) {
        self.current = (self.current - amount).max(0.0);
    }
}

// ══════════════════════════════════════════════════════════════
// Brains
// ══════════════════════════════════════════════════════════════

pub const BURROW_TIME: f32 = 2.0;
pub const BURROW_RECHARGE: f32 = 5.0;
const GRUB_PATROL_RANGE: f32 = 150.0;
const GRUB_RETREAT_RANGE: f32 = 60.0;
const GRUB_EMERGE_RADIUS: f32 = 30.0;
const GRUB_ARMOR: i32 = 2;

#[derive(Clone, Copy, PartialEq, Debug)]
pub enum GrubState {
    Patrol,
    Burrowed { remaining: f32 },
}

#[derive(Clone, Debug)]
pub struct GrubBrain {
    pub state: GrubState,
    pub burrow: Cooldown,
}

pub const WEB_CHARGES: u32 = 2;
pub const WEB_RECHARGE: f32 = 5.0;
const WEB_GAP: f32 = 1.0;
const WEB_FRAMES: u32 = 8;
const WEB_LENGTH: f32 = 160.0;
const WEB_LIFETIME: f32 = 0.6;
const SPIDER_CHASE_RANGE: f32 = 200.0;
const SPIDER_OPTIMAL_RANGE: f32 = 100.0;
const SPIDER_JUMP_SPEED: f32 = 480.0;
const SPIDER_CRIT: f32 = 0.15;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum SpiderState {
    Chase,
    WebReady,
}

#[derive(Clone, Debug)]
pub struct SpiderBrain {
    pub state: SpiderState,
    pub webs: Charges,
    pub web_gap: Cooldown,
    pub jump: Cooldown,
}

pub const SPLIT_THRESHOLD: i32 = 20;
const SPLIT_HEALTH: i32 = 25;
const SPLIT_WOBBLE: f32 = 0.5;
const SLIME_JUMP_INTERVAL: f32 = 2.0;
const SLIME_REGEN: f32 = 1.0;
const ACID_DURATION: f32 = 3.0;
const ACID_CHANCE: f32 = 0.3;
const SLIME_ABSORPTION: f32 = 0.2;

#[derive(Clone, Copy, PartialEq, Debug)]
pub enum SlimeState {
    Bounce,
    /// Wobbling right after a split; no jumping.
    Split { remaining: f32 },
}

#[derive(Clone, Debug)]
pub struct SlimeBrain {
    pub state: SlimeState,
    /// Remaining split capacity: a slime can split while `size > 1`.
    pub size: u32,
    pub jump_timer: f32,
    regen_carry: f32,
}

pub const GHOST_ENERGY: f32 = 100.0;
const GHOST_REGEN: f32 = 5.0;
const PHASE_PERIOD: f32 = 2.0;
const BURST_COST: f32 = 30.0;
const BURST_RADIUS: f32 = 40.0;
const BURST_TRIGGER: f32 = 100.0;
const BURST_FRAMES: u32 = 15;
const HIDDEN_MOVE_COST: f32 = 10.0;
const GHOST_CHASE_RANGE: f32 = 180.0;
pub const FEAR_RADIUS: f32 = 80.0;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum GhostState {
    Visible,
    Hidden,
}

#[derive(Clone, Debug)]
pub struct GhostBrain {
    pub state: GhostState,
    pub energy: Energy,
    pub phase_timer: f32,
}

#[derive(Clone, Debug)]
pub enum Brain {
    Grub(GrubBrain),
    Spider(SpiderBrain),
    Slime(SlimeBrain),
    Ghost(GhostBrain),
}

impl Brain {
    fn for_kind(kind: EnemyKind) -> Brain {
        match kind {
            EnemyKind::Grub => Brain::Grub(GrubBrain {
                state: GrubState::Patrol,
                burrow: Cooldown::new(BURROW_RECHARGE),
            }),
            EnemyKind::Spider => Brain::Spider(SpiderBrain {
                state: SpiderState::WebReady,
                webs: Charges::full(WEB_CHARGES, WEB_RECHARGE),
                web_gap: Cooldown::new(WEB_GAP),
                jump: Cooldown::new(2.0),
            }),
            EnemyKind::Slime => Brain::Slime(SlimeBrain {
                state: SlimeState::Bounce,
                size: 2,
                jump_timer: 0.0,
                regen_carry: 0.0,
            }),
            EnemyKind::Ghost => Brain::Ghost(GhostBrain {
                state: GhostState::Visible,
                energy: Energy::full(GHOST_ENERGY, GHOST_REGEN),
                phase_timer: 0.0,
            }),
        }
    }
}

/// Which attack an open window belongs to.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Strike {
    Bite,
    Emergence,
    Burst,
    Web,
}

// ══════════════════════════════════════════════════════════════
// Enemy
// ══════════════════════════════════════════════════════════════

#[derive(Clone, Debug)]
pub struct Enemy {
    pub actor: Actor,
    pub kind: EnemyKind,
    /// In [0, 1], fixed at spawn.
    pub aggression: f32,
    /// In [0, 1], fixed at spawn.
    pub confidence: f32,
    pub damage: i32,
    pub speed: f32,
    pub exp_value: u32,
    pub strike: Strike,
    pub brain: Brain,
}

impl Enemy {
    pub fn spawn<R: Rng + ?Sized>(id: EntityId, kind: EnemyKind, x: f32, y: f32, rng: &mut R) -> Self {
        let stats = kind.stats();
        let mut actor = Actor::new(id, Rect::new(x, y, ENEMY_SIZE, ENEMY_SIZE), stats.max_health);
        actor.vx = if rng.random_bool(0.5) { 36.0 } else { -36.0 };
        Enemy {
            actor,
            kind,
            aggression: rng.random_range(0.4..0.8),
            confidence: rng.random_range(0.5..1.0),
            damage: stats.damage,
            speed: stats.speed,
            exp_value: 5,
            strike: Strike::Bite,
            brain: Brain::for_kind(kind),
        }
    }

    pub fn attack_range(&self) -> f32 { self.kind.stats().attack_range }
    pub fn attack_cooldown(&self) -> f64 { self.kind.stats().attack_cooldown }
    pub fn hurt_debounce(&self) -> f64 { self.kind.stats().hurt_debounce }

    pub fn is_burrowed(&self) -> bool {
        matches!(self.brain, Brain::Grub(GrubBrain { state: GrubState::Burrowed { .. }, .. }))
    }

    pub fn is_hidden(&self) -> bool {
        matches!(self.brain, Brain::Ghost(GhostBrain { state: GhostState::Hidden, .. }))
    }

    /// Burrowed grubs and hidden ghosts cannot be struck.
    pub fn is_targetable(&self) -> bool {
        !self.actor.is_dead() && !self.is_burrowed() && !self.is_hidden()
    }

    /// Wounded past what its confidence tolerates.
    pub fn is_shaken(&self) -> bool {
        self.actor.health_fraction() < 1.0 - self.confidence
    }

    /// Range and cooldown gate for starting a regular attack.
    /// `distance == attack_range` is eligible.
    pub fn attack_eligible(&self, distance: f32, now: f64) -> bool {
        distance <= self.attack_range() && now - self.actor.last_attack >= self.attack_cooldown()
    }

    /// Species damage reduction applied to incoming hits (minimum 1).
    pub fn mitigate(&self, raw: i32) -> i32 {
        let reduced = match self.kind {
            EnemyKind::Grub => raw - GRUB_ARMOR,
            EnemyKind::Slime => (raw as f32 * (1.0 - SLIME_ABSORPTION)).round() as i32,
            _ => raw,
        };
        reduced.max(1)
    }

    /// Geometry of the current strike: (shape, full range).
    pub fn strike_shape(&self) -> (HitboxShape, f32) {
        match self.strike {
            Strike::Emergence => (HitboxShape::Radial, GRUB_EMERGE_RADIUS),
            Strike::Burst => (HitboxShape::Radial, BURST_RADIUS),
            Strike::Bite | Strike::Web => (HitboxShape::Forward { height: self.actor.rect.h }, self.attack_range()),
        }
    }

    /// Damage of the current strike. Webs snare instead of hurting.
    pub fn strike_damage<R: Rng + ?Sized>(&self, rng: &mut R) -> i32 {
        match self.strike {
            Strike::Web => 0,
            Strike::Burst => (self.damage as f32 * 1.5) as i32,
            Strike::Emergence => self.damage + self.damage / 2,
            Strike::Bite => {
                if self.kind == EnemyKind::Spider && roll(rng, SPIDER_CRIT) {
                    self.damage * 2
                } else {
                    self.damage
                }
            }
        }
    }

    pub fn visual_state(&self, now: f64) -> VisualState {
        if self.is_burrowed() || self.is_hidden() {
            VisualState::Phased
        } else if self.actor.attack.active {
            VisualState::Attacking
        } else if self.actor.recently_hurt(now, 0.2) {
            VisualState::Hurt
        } else {
            VisualState::Idle
        }
    }

    /// The smaller twin produced by a split. Copies the already-shrunk parent
    /// and sets it down beside it, left if there is room, otherwise right.
    pub fn split_child(&self, id: EntityId, tiles: &CollisionWorld) -> Enemy {
        let mut child = self.clone();
        child.actor.id = id;
        child.actor.effects.clear();
        child.actor.attack.cancel();
        child.actor.knockback_vx = 0.0;

        let w = self.actor.rect.w;
        let speed = self.actor.vx.abs().max(self.speed);
        child.actor.vx = -speed;
        if tiles.slide_x(&mut child.actor.rect, -w) {
            child.actor.rect = self.actor.rect;
            tiles.slide_x(&mut child.actor.rect, w);
            child.actor.vx = speed;
        }
        child
    }

    /// Reverse after hitting a wall, losing some speed.
    pub fn bounce_off_wall(&mut self, prior_vx: f32) {
        self.actor.vx = -prior_vx * 0.8;
    }
}

// ══════════════════════════════════════════════════════════════
// Per-tick decision
// ══════════════════════════════════════════════════════════════

/// What the enemy sees this tick.
#[derive(Clone, Copy, Debug)]
pub struct Perception {
    /// player.center - enemy.center
    pub dx: f32,
    pub dy: f32,
    pub now: f64,
    pub dt: f32,
}

impl Perception {
    pub fn between(enemy: &Rect, player: &Rect, now: f64, dt: f32) -> Self {
        Perception {
            dx: player.center_x() - enemy.center_x(),
            dy: player.center_y() - enemy.center_y(),
            now,
            dt,
        }
    }

    pub fn distance(&self) -> f32 {
        (self.dx * self.dx + self.dy * self.dy).sqrt()
    }
}

/// Signals for the caller.
#[derive(Clone, Copy, Default, PartialEq, Eq, Debug)]
pub struct AiTick {
    /// A regular attack window opened this tick.
    pub attacked: bool,
    /// A burrowed grub surfaced next to the player.
    pub emerged: bool,
    /// A slime split; the caller spawns `split_child`.
    pub split: bool,
    pub web_fired: bool,
    pub burst: bool,
    /// Player is inside a fear aura.
    pub fear: bool,
}

pub fn think<R: Rng + ?Sized>(enemy: &mut Enemy, p: &Perception, rng: &mut R) -> AiTick {
    let mut tick = AiTick::default();
    enemy.actor.tick_effects(p.dt);

    match enemy.kind {
        EnemyKind::Grub => think_grub(enemy, p, rng, &mut tick),
        EnemyKind::Spider => think_spider(enemy, p, rng, &mut tick),
        EnemyKind::Slime => think_slime(enemy, p, rng, &mut tick),
        EnemyKind::Ghost => think_ghost(enemy, p, &mut tick),
    }

    if p.dx != 0.0 {
        enemy.actor.facing = super::entity::Facing::toward(p.dx, enemy.actor.facing);
    }

    // ── Regular attack intent ──
    let d = p.distance();
    let busy = enemy.actor.attack.active;
    if !busy && !enemy.is_burrowed() && !enemy.is_hidden() && enemy.attack_eligible(d, p.now) {
        let chance = rules::attack_chance(enemy.aggression, enemy.actor.health_fraction());
        if roll(rng, chance) {
            enemy.strike = Strike::Bite;
            enemy.actor.attack.start(ENEMY_ATTACK_FRAMES);
            enemy.actor.last_attack = p.now;
            tick.attacked = true;
        }
    }

    tick
}

fn think_grub<R: Rng + ?Sized>(enemy: &mut Enemy, p: &Perception, rng: &mut R, tick: &mut AiTick) {
    let d = p.distance();
    let speed = enemy.speed;
    let shaken = enemy.is_shaken();
    let Brain::Grub(brain) = &mut enemy.brain else { return };
    brain.burrow.tick(p.dt);

    match brain.state {
        GrubState::Patrol => {
            let mut burrow = false;
            if d < GRUB_RETREAT_RANGE || (shaken && d < GRUB_PATROL_RANGE) {
                enemy.actor.vx = -sign(p.dx) * speed * 1.2;
                burrow = brain.burrow.ready();
            } else if d < GRUB_PATROL_RANGE {
                enemy.actor.vx = sign(p.dx) * speed * (d / GRUB_PATROL_RANGE);
            } else if roll(rng, chance_per_tick(0.02, p.dt)) {
                enemy.actor.vx = if rng.random_bool(0.5) { speed } else { -speed };
            }
            if !burrow && brain.burrow.ready() && roll(rng, chance_per_tick(0.01, p.dt)) {
                burrow = true;
            }
            if burrow {
                brain.state = GrubState::Burrowed { remaining: BURROW_TIME };
                enemy.actor.vx = 0.0;
                enemy.actor.attack.cancel();
                debug!(id = enemy.actor.id, "grub burrowed");
            }
        }
        GrubState::Burrowed { remaining } => {
            enemy.actor.vx = 0.0;
            let remaining = remaining - p.dt;
            if remaining > 0.0 {
                brain.state = GrubState::Burrowed { remaining };
                return;
            }
            brain.state = GrubState::Patrol;
            brain.burrow.trigger();
            if d < GRUB_RETREAT_RANGE {
                enemy.strike = Strike::Emergence;
                enemy.actor.attack.start(15);
                enemy.actor.last_attack = p.now;
                tick.emerged = true;
            }
        }
    }
}

fn think_spider<R: Rng + ?Sized>(enemy: &mut Enemy, p: &Perception, rng: &mut R, tick: &mut AiTick) {
    let d = p.distance();
    let speed = enemy.speed;
    let aggression = enemy.aggression;
    let shaken = enemy.is_shaken();
    let center = (enemy.actor.rect.center_x(), enemy.actor.rect.center_y());
    let Brain::Spider(brain) = &mut enemy.brain else { return };
    brain.webs.tick(p.dt);
    brain.web_gap.tick(p.dt);
    brain.jump.tick(p.dt);

    brain.state = if brain.webs.current() > 0 && brain.web_gap.ready() {
        SpiderState::WebReady
    } else {
        SpiderState::Chase
    };

    if d < SPIDER_CHASE_RANGE {
        let keep_away = brain.state == SpiderState::WebReady || shaken;
        enemy.actor.vx = if keep_away && d < SPIDER_OPTIMAL_RANGE {
            -sign(p.dx) * speed * 0.5
        } else {
            sign(p.dx) * speed * 1.2
        };

        if enemy.actor.on_ground && brain.jump.ready() && roll(rng, chance_per_tick(0.05, p.dt)) {
            enemy.actor.vy = -SPIDER_JUMP_SPEED;
            enemy.actor.on_ground = false;
            brain.jump.trigger();
        }

        let web_chance = chance_per_tick(0.02 * (0.5 + aggression), p.dt);
        if brain.state == SpiderState::WebReady
            && !enemy.actor.attack.active
            && roll(rng, web_chance)
            && brain.webs.try_spend()
        {
            brain.web_gap.trigger();
            let len = d.min(WEB_LENGTH);
            let x = if p.dx >= 0.0 { center.0 } else { center.0 - len };
            let area = Rect::new(x, center.1 - 4.0, len, 8.0);
            enemy.actor.effects.push(StatusEffect::new(EffectKind::WebStrand { area }, WEB_LIFETIME));
            enemy.strike = Strike::Web;
            enemy.actor.attack.start(WEB_FRAMES);
            tick.web_fired = true;
            debug!(id = enemy.actor.id, charges = brain.webs.current(), "spider web");
        }
    }
}

fn think_slime<R: Rng + ?Sized>(enemy: &mut Enemy, p: &Perception, rng: &mut R, tick: &mut AiTick) {
    let d = p.distance();
    let speed = enemy.speed;
    let on_ground = enemy.actor.on_ground;
    let Brain::Slime(brain) = &mut enemy.brain else { return };

    // Regeneration in whole hit points.
    brain.regen_carry += SLIME_REGEN * p.dt;
    if brain.regen_carry >= 1.0 {
        let whole = brain.regen_carry.floor();
        brain.regen_carry -= whole;
        enemy.actor.heal(whole as i32);
    }

    match brain.state {
        SlimeState::Split { remaining } => {
            enemy.actor.vx *= 0.9;
            let remaining = remaining - p.dt;
            brain.state = if remaining > 0.0 {
                SlimeState::Split { remaining }
            } else {
                SlimeState::Bounce
            };
        }
        SlimeState::Bounce => {
            brain.jump_timer += p.dt;
            if on_ground && brain.jump_timer >= SLIME_JUMP_INTERVAL {
                if d < 200.0 {
                    enemy.actor.vy = -(6.0 + (200.0 - d) / 50.0) * 60.0;
                    enemy.actor.vx = sign(p.dx) * speed * 1.5;
                } else {
                    enemy.actor.vy = -240.0;
                    enemy.actor.vx = if rng.random_bool(0.5) { speed } else { -speed };
                }
                enemy.actor.on_ground = false;
                brain.jump_timer = 0.0;

                if roll(rng, ACID_CHANCE) {
                    let r = enemy.actor.rect;
                    let area = Rect::new(r.x - 20.0, r.bottom() - 5.0, r.w + 40.0, 5.0);
                    let damage = (enemy.damage / 2).max(1);
                    enemy.actor.effects.push(StatusEffect::new(EffectKind::AcidPool { damage, area }, ACID_DURATION));
                }
            }
        }
    }

    if enemy.actor.health() <= SPLIT_THRESHOLD && !enemy.actor.is_dead() && brain.size > 1 {
        brain.size -= 1;
        brain.state = SlimeState::Split { remaining: SPLIT_WOBBLE };
        enemy.actor.rect.shrink_to(0.7);
        enemy.actor.set_health(SPLIT_HEALTH);
        enemy.damage = ((enemy.damage as f32) * 0.7).round().max(1.0) as i32;
        enemy.speed *= 1.2;
        tick.split = true;
        debug!(id = enemy.actor.id, "slime split");
    }
}

fn think_ghost(enemy: &mut Enemy, p: &Perception, tick: &mut AiTick) {
    let d = p.distance();
    let speed = enemy.speed;
    let Brain::Ghost(brain) = &mut enemy.brain else { return };
    brain.energy.tick(p.dt);
    brain.phase_timer += p.dt;

    if brain.phase_timer >= PHASE_PERIOD {
        brain.phase_timer = 0.0;
        brain.state = match brain.state {
            GhostState::Visible => GhostState::Hidden,
            GhostState::Hidden => GhostState::Visible,
        };
        if brain.state == GhostState::Hidden {
            enemy.actor.attack.cancel();
        } else if d < BURST_TRIGGER && brain.energy.try_spend(BURST_COST) {
            enemy.strike = Strike::Burst;
            enemy.actor.attack.start(BURST_FRAMES);
            enemy.actor.last_attack = p.now;
            tick.burst = true;
        }
    }

    let hidden = brain.state == GhostState::Hidden;
    if d < GHOST_CHASE_RANGE && (!hidden || brain.energy.current() >= HIDDEN_MOVE_COST) {
        let mult = if hidden { 1.5 } else { 1.0 };
        enemy.actor.vx = sign(p.dx) * speed * mult;
        enemy.actor.vy = sign(p.dy) * speed * mult / 2.0;
        if hidden {
            brain.energy.drain(HIDDEN_MOVE_COST * p.dt);
        }
    } else {
        enemy.actor.vx = 0.0;
        enemy.actor.vy = 0.0;
    }

    tick.fear = d < FEAR_RADIUS;
}

// ══════════════════════════════════════════════════════════════
// Boss
// ══════════════════════════════════════════════════════════════

pub const BOSS_SIZE: f32 = 64.0;
pub const BOSS_HEALTH: i32 = 200;
const BOSS_SPEED: f32 = 120.0;
const BOSS_JUMP_SPEED: f32 = 600.0;
pub const BOSS_ATTACK_RANGE: f32 = 70.0;
const BOSS_ATTACK_COOLDOWN: f64 = 1.5;
pub const BOSS_DEBOUNCE: f64 = 0.15;
const BOSS_FRAMES: u32 = 12;

#[derive(Clone, Debug)]
pub struct Boss {
    pub actor: Actor,
    pub damage: i32,
}

impl Boss {
    pub fn new(id: EntityId, x: f32, y: f32) -> Self {
        Boss {
            actor: Actor::new(id, Rect::new(x, y, BOSS_SIZE, BOSS_SIZE), BOSS_HEALTH),
            damage: 18,
        }
    }

    pub fn body_params(gravity: f32, terminal_velocity: f32) -> BodyParams {
        BodyParams { gravity: gravity * 5.0 / 6.0, terminal_velocity, collides: true }
    }

    pub fn visual_state(&self, now: f64) -> VisualState {
        if self.actor.attack.active {
            VisualState::Attacking
        } else if self.actor.recently_hurt(now, 0.2) {
            VisualState::Hurt
        } else {
            VisualState::Idle
        }
    }
}

/// Walk at the player, hop at random, swing when close. Returns true when
/// a swing starts.
pub fn think_boss<R: Rng + ?Sized>(boss: &mut Boss, p: &Perception, rng: &mut R) -> bool {
    boss.actor.vx = sign(p.dx) * BOSS_SPEED;
    boss.actor.facing = super::entity::Facing::toward(p.dx, boss.actor.facing);
    if boss.actor.on_ground && roll(rng, chance_per_tick(0.02, p.dt)) {
        boss.actor.vy = -BOSS_JUMP_SPEED;
        boss.actor.on_ground = false;
    }
    if !boss.actor.attack.active
        && p.distance() <= BOSS_ATTACK_RANGE
        && p.now - boss.actor.last_attack >= BOSS_ATTACK_COOLDOWN
    {
        boss.actor.attack.start(BOSS_FRAMES);
        boss.actor.last_attack = p.now;
        return true;
    }
    false
}
