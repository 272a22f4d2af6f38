/// Real-time hit resolution.
///
/// The resolver never decides *who* attacks. It turns an open AttackWindow
/// into geometry and applies a landed hit: damage, knockback, a floating
/// number, hitstop and shake. Refusal rules (dead, invulnerable, hurt
/// debounce) are checked here so every attacker goes through the same gate.

use super::class::HitboxShape;
use super::entity::{Actor, DamageNumber, DamageTint};
use super::geometry::{Circle, Hitbox, Rect};
use super::physics::CollisionWorld;

// ══════════════════════════════════════════════════════════════
// Presentation triggers
// ══════════════════════════════════════════════════════════════

/// Numeric cues for the renderer. The simulation only writes them.
#[derive(Clone, Debug, Default)]
pub struct Feedback {
    /// Seconds of global freeze left.
    pub hitstop: f32,
    /// Shake magnitude; decays toward 0.
    pub shake: f32,
    pub damage_numbers: Vec<DamageNumber>,
}

impl Feedback {
    /// Age presentation state by `dt`. Hitstop is consumed separately by the
    /// step function because it gates the whole tick.
    pub fn tick(&mut self, dt: f32, shake_decay: f32) {
        self.shake = (self.shake - shake_decay * dt).max(0.0);
        for n in self.damage_numbers.iter_mut() {
            n.life -= dt;
            n.y -= 30.0 * dt;
        }
        self.damage_numbers.retain(|n| n.life > 0.0);
    }

    /// Consume hitstop. Returns true while the tick must be skipped.
    pub fn hold(&mut self, dt: f32) -> bool {
        if self.hitstop <= 0.0 {
            return false;
        }
        self.hitstop = (self.hitstop - dt).max(0.0);
        true
    }

    pub fn number(&mut self, at: &Rect, amount: i32, tint: DamageTint, life: f32) {
        self.damage_numbers.push(DamageNumber {
            x: at.center_x(),
            y: at.top(),
            amount,
            tint,
            life,
        });
    }
}

/// Tunables for a landed hit.
#[derive(Clone, Copy, Debug)]
pub struct HitParams {
    pub hitstop: f32,
    pub knockback_offset: f32,
    pub knockback_impulse: f32,
    pub shake: f32,
    pub number_life: f32,
}

/// One incoming hit.
#[derive(Clone, Copy, Debug)]
pub struct HitSpec {
    pub damage: i32,
    /// Attacker center x; knockback points away from it.
    pub source_x: f32,
    /// Minimum time since the target was last hurt.
    pub debounce: f64,
    /// Post-hit invulnerability granted to the target.
    pub grace: f64,
    pub tint: DamageTint,
}

// ══════════════════════════════════════════════════════════════
// Attack lifecycle
// ══════════════════════════════════════════════════════════════

/// Open an attack window if the cooldown has elapsed.
pub fn try_start_attack(actor: &mut Actor, now: f64, cooldown: f64, frames: u32) -> bool {
    if actor.attack.active || now - actor.last_attack < cooldown {
        return false;
    }
    actor.last_attack = now;
    actor.attack.start(frames);
    true
}

/// Hitbox of the actor's open window, recomputed from `progress` alone.
/// `None` while no window is open.
pub fn hitbox(actor: &Actor, shape: HitboxShape, range: f32) -> Option<Hitbox> {
    if !actor.attack.active {
        return None;
    }
    let p = actor.attack.progress();
    let r = &actor.rect;
    let dir = actor.facing.sign();

    let forward = |len: f32, height: f32| {
        let len = len.max(0.0);
        let x = if dir > 0.0 { r.right() } else { r.left() - len };
        Rect::new(x, r.center_y() - height / 2.0, len, height)
    };

    Some(match shape {
        HitboxShape::Forward { height } => Hitbox::Rect(forward(range * (1.0 - p), height)),
        HitboxShape::Radial => Hitbox::Circle(Circle {
            cx: r.center_x(),
            cy: r.center_y(),
            r: range * (1.0 - p),
        }),
        HitboxShape::Reach { height_ratio } => {
            Hitbox::Rect(forward(range * (1.0 - p + 0.2), r.h * height_ratio))
        }
    })
}

// ══════════════════════════════════════════════════════════════
// Applying a hit
// ══════════════════════════════════════════════════════════════

/// Why a hit did not land.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Refusal {
    Dead,
    Invulnerable,
    Debounced,
}

pub fn can_take_hit(target: &Actor, now: f64, debounce: f64) -> Result<(), Refusal> {
    if target.is_dead() {
        Err(Refusal::Dead)
    } else if target.is_invulnerable(now) {
        Err(Refusal::Invulnerable)
    } else if now - target.last_hurt < debounce {
        Err(Refusal::Debounced)
    } else {
        Ok(())
    }
}

/// Apply a hit. Returns the damage removed, or the reason it was refused.
///
/// The positional nudge stops at solid tiles; the velocity impulse goes to
/// `knockback_vx` so movement intent set next tick cannot erase it.
pub fn apply_hit(
    target: &mut Actor,
    hit: HitSpec,
    now: f64,
    params: &HitParams,
    tiles: &CollisionWorld,
    feedback: &mut Feedback,
) -> Result<i32, Refusal> {
    can_take_hit(target, now, hit.debounce)?;

    let dealt = target.apply_damage(hit.damage.max(0));
    target.last_hurt = now;
    if hit.grace > 0.0 {
        target.grant_invulnerability(now, hit.grace);
    }

    let away = if target.rect.center_x() >= hit.source_x { 1.0 } else { -1.0 };
    tiles.slide_x(&mut target.rect, away * params.knockback_offset);
    target.knockback_vx = away * params.knockback_impulse;

    feedback.number(&target.rect, dealt, hit.tint, params.number_life);
    feedback.hitstop = feedback.hitstop.max(params.hitstop);
    feedback.shake = feedback.shake.max(params.shake);
    Ok(dealt)
}
