/// WorldState: the complete, owned context of one playthrough.
///
/// Everything the tick mutates lives here and is passed explicitly to
/// `step`; there is no global state. Several worlds can run side by side
/// (tests do this).
///
/// ## Camera
///
/// Horizontal only. `camera.x` is the world x of the left edge of the
/// view. It eases toward the player and is clamped to the level, and the
/// player is kept from walking back out of the left side of the view.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::config::GameConfig;
use crate::domain::ai::{Boss, Enemy, EnemyKind};
use crate::domain::class::CharClass;
use crate::domain::combat::{Feedback, HitParams};
use crate::domain::entity::{Checkpoint, EntityId, Facing, GroundItem, Player, VisualState, PLAYER_ID};
use crate::domain::geometry::Rect;
use crate::domain::physics::{BodyParams, CollisionWorld};
use crate::domain::rules::Ending;
use super::event::GameEvent;
use super::guide::Guide;
use super::level;
use super::mode::ModeStack;

const LOG_LINES: usize = 8;
/// Closest the player may get to the left edge of the view.
pub const CAMERA_LEFT_MARGIN: f32 = 20.0;
const CAMERA_SMOOTHING: f32 = 0.1;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum StagePhase {
    Loading,
    Active,
    /// Exit reached on a non-final stage; the next tick loads the next one.
    Advancing,
    Ending(Ending),
}

#[derive(Clone, Debug)]
pub struct Camera {
    pub x: f32,
    pub view_w: f32,
}

impl Camera {
    pub fn new(view_w: f32) -> Self {
        Camera { x: 0.0, view_w }
    }

    fn target(&self, center_x: f32, level_w: f32) -> f32 {
        (center_x - self.view_w / 2.0).clamp(0.0, (level_w - self.view_w).max(0.0))
    }

    /// Ease toward `center_x`; 10% of the gap per 60 Hz frame.
    pub fn follow(&mut self, center_x: f32, level_w: f32, dt: f32) {
        let goal = self.target(center_x, level_w);
        let alpha = 1.0 - (1.0 - CAMERA_SMOOTHING).powf(dt * 60.0);
        self.x += (goal - self.x) * alpha;
        self.x = self.x.clamp(0.0, (level_w - self.view_w).max(0.0));
    }

    /// Jump straight to `center_x`. Used on stage load and respawn.
    pub fn snap(&mut self, center_x: f32, level_w: f32) {
        self.x = self.target(center_x, level_w);
    }
}

/// What an on-screen actor is.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ActorKind {
    Player,
    Enemy(EnemyKind),
    Boss,
    Guide,
}

/// Read-only snapshot handed to the renderer.
#[derive(Clone, Copy, Debug)]
pub struct ActorView {
    pub id: EntityId,
    pub kind: ActorKind,
    pub rect: Rect,
    pub facing: Facing,
    pub visual: VisualState,
    pub health_fraction: f32,
}

pub struct WorldState {
    pub config: GameConfig,
    pub rng: ChaCha8Rng,
    /// Simulation seconds since the run started.
    pub time: f64,
    pub tick: u64,
    pub phase: StagePhase,
    pub modes: ModeStack,

    // ── Stage ──
    pub stage_index: usize,
    pub stage_name: String,
    pub collision: CollisionWorld,
    pub spawn_point: (f32, f32),
    pub respawn_point: (f32, f32),
    pub checkpoints: Vec<Checkpoint>,
    pub ground_items: Vec<GroundItem>,
    pub camera: Camera,

    // ── Actors ──
    pub player: Player,
    pub enemies: Vec<Enemy>,
    pub boss: Option<Boss>,
    pub guide: Option<Guide>,

    // ── Progress ──
    pub lives: i32,
    pub respawn_at: Option<f64>,
    pub enemies_defeated: u32,
    pub quota: u32,
    pub max_enemies: usize,
    pub last_spawn: f64,
    pub choice_points: i32,
    pub guide_help_count: i32,
    pub guide_helped_this_stage: bool,

    // ── Presentation ──
    pub feedback: Feedback,
    pub message: String,
    pub log: Vec<String>,

    next_id: EntityId,
    next_item_id: u32,
}

impl WorldState {
    /// Empty world; call `level::load_stage` (or use `start`) before stepping.
    pub fn new(config: GameConfig, class: CharClass) -> Self {
        let rng = ChaCha8Rng::seed_from_u64(config.general.seed);
        let lives = config.progression.lives;
        let view_w = config.progression.view_width;
        let tile = config.physics.tile_size;
        WorldState {
            config,
            rng,
            time: 0.0,
            tick: 0,
            phase: StagePhase::Loading,
            modes: ModeStack::default(),
            stage_index: 0,
            stage_name: String::new(),
            collision: CollisionWorld::from_rows::<&str>(&[], tile),
            spawn_point: (0.0, 0.0),
            respawn_point: (0.0, 0.0),
            checkpoints: Vec::new(),
            ground_items: Vec::new(),
            camera: Camera::new(view_w),
            player: Player::new(class, 0.0, 0.0),
            enemies: Vec::new(),
            boss: None,
            guide: None,
            lives,
            respawn_at: None,
            enemies_defeated: 0,
            quota: 0,
            max_enemies: 0,
            last_spawn: f64::NEG_INFINITY,
            choice_points: 0,
            guide_help_count: 0,
            guide_helped_this_stage: false,
            feedback: Feedback::default(),
            message: String::new(),
            log: Vec::new(),
            next_id: PLAYER_ID + 1,
            next_item_id: 1,
        }
    }

    /// New world with the first stage loaded. Unknown class names fall
    /// back to Wanderer.
    pub fn start(config: GameConfig, class_name: &str) -> (Self, Vec<GameEvent>) {
        let mut world = WorldState::new(config, CharClass::from_name(class_name));
        let mut events = Vec::new();
        level::load_stage(&mut world, 0, &mut events);
        (world, events)
    }

    pub fn alloc_id(&mut self) -> EntityId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub fn alloc_item_id(&mut self) -> u32 {
        let id = self.next_item_id;
        self.next_item_id += 1;
        id
    }

    pub fn level_width(&self) -> f32 {
        self.collision.pixel_width()
    }

    pub fn is_final_stage(&self) -> bool {
        self.stage_index + 1 >= level::stage_count()
    }

    pub fn ending(&self) -> Option<Ending> {
        match self.phase {
            StagePhase::Ending(e) => Some(e),
            _ => None,
        }
    }

    /// Show `text` as the current line and append it to the log.
    pub fn set_message(&mut self, text: &str) {
        self.message = text.to_string();
        self.log.push(text.to_string());
        if self.log.len() > LOG_LINES {
            let extra = self.log.len() - LOG_LINES;
            self.log.drain(..extra);
        }
    }

    pub fn player_body(&self) -> BodyParams {
        BodyParams {
            gravity: self.config.physics.gravity,
            terminal_velocity: self.config.physics.terminal_velocity,
            collides: true,
        }
    }

    pub fn hit_params(&self) -> HitParams {
        let c = &self.config.combat;
        HitParams {
            hitstop: c.hitstop,
            knockback_offset: c.knockback_offset,
            knockback_impulse: c.knockback_impulse,
            shake: c.shake_on_hit,
            number_life: c.damage_number_lifetime,
        }
    }

    /// Choice points plus guide help, floored at zero.
    pub fn final_score(&self) -> i32 {
        (self.choice_points + self.guide_help_count).max(0)
    }

    /// Everything the renderer draws as an actor, back to front.
    pub fn actor_views(&self) -> Vec<ActorView> {
        let now = self.time;
        let mut views = Vec::with_capacity(self.enemies.len() + 3);
        if let Some(g) = &self.guide {
            if g.is_present() {
                views.push(ActorView {
                    id: EntityId::MAX,
                    kind: ActorKind::Guide,
                    rect: g.rect,
                    facing: Facing::Left,
                    visual: VisualState::Idle,
                    health_fraction: 1.0,
                });
            }
        }
        for e in &self.enemies {
            views.push(ActorView {
                id: e.actor.id,
                kind: ActorKind::Enemy(e.kind),
                rect: e.actor.rect,
                facing: e.actor.facing,
                visual: e.visual_state(now),
                health_fraction: e.actor.health_fraction(),
            });
        }
        if let Some(b) = &self.boss {
            views.push(ActorView {
                id: b.actor.id,
                kind: ActorKind::Boss,
                rect: b.actor.rect,
                facing: b.actor.facing,
                visual: b.visual_state(now),
                health_fraction: b.actor.health_fraction(),
            });
        }
        if !self.player.actor.is_dead() {
            views.push(ActorView {
                id: PLAYER_ID,
                kind: ActorKind::Player,
                rect: self.player.actor.rect,
                facing: self.player.actor.facing,
                visual: self.player.visual_state(now),
                health_fraction: self.player.actor.health_fraction(),
            });
        }
        views
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn camera_eases_and_clamps() {
        let mut cam = Camera::new(640.0);
        cam.follow(2000.0, 4000.0, 1.0 / 60.0);
        assert!((cam.x - 168.0).abs() < 0.01);
        cam.snap(3990.0, 4000.0);
        assert_eq!(cam.x, 3360.0);
        cam.snap(10.0, 4000.0);
        assert_eq!(cam.x, 0.0);
    }

    #[test]
    fn camera_on_narrow_level_stays_at_zero() {
        let mut cam = Camera::new(640.0);
        cam.follow(300.0, 400.0, 1.0);
        assert_eq!(cam.x, 0.0);
    }

    #[test]
    fn message_log_is_bounded() {
        let mut w = WorldState::new(GameConfig::default(), CharClass::Wizard);
        for i in 0..20 {
            w.set_message(&format!("line {i}"));
        }
        assert_eq!(w.log.len(), LOG_LINES);
        assert_eq!(w.message, "line 19");
        assert_eq!(w.log[0], "line 12");
    }

    #[test]
    fn ids_are_unique() {
        let mut w = WorldState::new(GameConfig::default(), CharClass::Wizard);
        let a = w.alloc_id();
        let b = w.alloc_id();
        assert_ne!(a, b);
        assert_ne!(a, PLAYER_ID);
    }
}
