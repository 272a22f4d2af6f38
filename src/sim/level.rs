/// Stage definitions, stage loading and enemy spawning.
///
/// ## Tile legend:
///   'G' = Grass (solid)    'R' = Rock (solid)
///   'P' = Player spawn     '.' = Empty
///
/// Stages are embedded; every map has a solid floor across its bottom
/// two rows. Checkpoints are spaced evenly along the stage width and sit
/// on the highest surface in their column.

use rand::Rng;
use tracing::{debug, info};

use crate::domain::ai::{Enemy, EnemyKind, ENEMY_SIZE};
use crate::domain::ai::EnemyKind::{Ghost, Grub, Slime, Spider};
use crate::domain::entity::{Checkpoint, EntityId, PLAYER_H};
use crate::domain::geometry::Rect;
use crate::domain::physics::CollisionWorld;
use super::event::GameEvent;
use super::guide::{Guide, GUIDE_H};
use super::world::{StagePhase, WorldState};

pub struct StageDef {
    pub name: &'static str,
    pub story: &'static str,
    pub outro: &'static str,
    pub pool: &'static [EnemyKind],
    pub rows: &'static [&'static str],
}

pub static STAGES: [StageDef; 3] = [
    StageDef {
        name: "Haunted Forest",
        story: "Haunted Forest: Strange creatures guard the path to 41 Water.",
        outro: "The forest falls quiet behind you.",
        pool: &[Grub, Grub, Spider, Slime],
        rows: &[
            "........................................................................................",
            "........................................................................................",
            "..P.....................................................................................",
            "........................................................................................",
            "................GG..........................GGG.......................GG................",
            "..............GGGGGG.............GGGGGGGGGGGG.....................GGGGGGG...............",
            "GGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGG",
            "GGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGG",
        ],
    },
    StageDef {
        name: "Enchanted Castle",
        story: "Enchanted Castle: The halls hold secrets and tests of will.",
        outro: "The castle gates close. The water is near.",
        pool: &[Spider, Slime, Ghost],
        rows: &[
            "........................................................................................",
            ".........................R................................R.............................",
            "............RRRRRRRRRRRRRR..............RR..............RRRRR...........................",
            "..................R.....R................................R..............................",
            "......P.................................................................................",
            "..........................................................................RR............",
            "RRRRRRRRRRRRRRRRRRRRRRRRRRRRRRRRRRRRRRRRRRRRRRRRRRRRRRRRRRRRRRRRRRRRRRRRRRRRRRRRRRRRRRRR",
            "RRRRRRRRRRRRRRRRRRRRRRRRRRRRRRRRRRRRRRRRRRRRRRRRRRRRRRRRRRRRRRRRRRRRRRRRRRRRRRRRRRRRRRRR",
        ],
    },
    StageDef {
        name: "Bandit's Lair",
        story: "Bandit's Lair: This is where choices matter.",
        outro: "41 Water lies before you.",
        pool: &[Spider, Slime, Ghost],
        rows: &[
            "........................................................................................",
            "........................................................................................",
            "..........GGGGGG............GGG...............................GGGGGG....................",
            "....P...................................................................................",
            "..............GGGGGGGG..........GGGGGG....................GGGGGGGG......................",
            "........................................................................................",
            "GGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGG",
            "GGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGG",
        ],
    },
];

pub const CHECKPOINT_TEXT: &str = "Checkpoint reached. Your progress is saved.";

pub fn stage_count() -> usize {
    STAGES.len()
}

/// Locate the 'P' marker as (col, row).
fn find_spawn(rows: &[&str]) -> Option<(usize, usize)> {
    rows.iter().enumerate().find_map(|(row, line)| line.chars().position(|c| c == 'P').map(|col| (col, row)))
}

/// Top-left for a body of height `h` standing in cell (col, row).
fn cell_floor(col: usize, row: usize, h: f32, tile: f32) -> (f32, f32) {
    (col as f32 * tile, (row + 1) as f32 * tile - h)
}

/// Height of the walkable surface under world x, falling back to the
/// bottom of the map.
fn surface_at(collision: &CollisionWorld, x: f32) -> f32 {
    let col = (x / collision.tile_size()).max(0.0) as usize;
    collision.surface_top(col).unwrap_or(collision.pixel_height())
}

fn build_checkpoints(collision: &CollisionWorld, count: usize) -> Vec<Checkpoint> {
    let width = collision.pixel_width();
    let tile = collision.tile_size();
    (0..count)
        .map(|i| {
            let cx = width * (i + 1) as f32 / (count + 1) as f32;
            let top = surface_at(collision, cx);
            Checkpoint::new(Rect::new(cx - 8.0, top - tile, 16.0, tile))
        })
        .collect()
}

// ══════════════════════════════════════════════════════════════
// Public API
// ══════════════════════════════════════════════════════════════

/// Load stage `index` into the world. Keeps the player's class, stats,
/// inventory, lives and choice points. An index past the last stage is
/// ignored.
pub fn load_stage(world: &mut WorldState, index: usize, events: &mut Vec<GameEvent>) {
    let Some(def) = STAGES.get(index) else { return };
    world.phase = StagePhase::Loading;

    let tile = world.config.physics.tile_size;
    world.collision = CollisionWorld::from_rows(def.rows, tile);
    world.stage_index = index;
    world.stage_name = def.name.to_string();

    let (col, row) = find_spawn(def.rows).unwrap_or((1, 0));
    world.spawn_point = cell_floor(col, row, PLAYER_H, tile);
    world.respawn_point = world.spawn_point;

    let (sx, sy) = world.spawn_point;
    let protection = world.config.combat.spawn_protection;
    let hp = world.player.actor.health();
    world.player.respawn_at(sx, sy, world.time, protection);
    if hp > 0 {
        world.player.actor.set_health(hp);
    }
    world.respawn_at = None;

    world.checkpoints = build_checkpoints(&world.collision, world.config.progression.checkpoint_count);
    world.enemies.clear();
    world.ground_items.clear();
    world.boss = None;
    world.modes.clear();
    world.feedback = Default::default();

    let prog = &world.config.progression;
    world.quota = prog.base_quota + prog.quota_per_stage * index as u32;
    world.enemies_defeated = 0;
    let spawn = &world.config.spawn;
    world.max_enemies = spawn.base_max_enemies + spawn.max_enemies_per_stage * index;
    world.last_spawn = f64::NEG_INFINITY;
    world.guide_helped_this_stage = false;

    world.guide = if index + 1 == STAGES.len() {
        let gx = world.collision.pixel_width() / 2.0;
        let gy = surface_at(&world.collision, gx) - GUIDE_H;
        Some(Guide::new(gx, gy))
    } else {
        None
    };

    let level_w = world.level_width();
    let center = world.player.actor.rect.center_x();
    world.camera.snap(center, level_w);

    for _ in 0..world.config.spawn.initial_enemies {
        if let Some((id, kind)) = try_spawn_enemy(world, true) {
            events.push(GameEvent::EnemySpawned { id, kind });
        }
    }

    world.set_message(def.story);
    world.phase = StagePhase::Active;
    info!(stage = index, name = def.name, quota = world.quota, "stage loaded");
    events.push(GameEvent::StageLoaded { index });
}

/// Try to put one enemy just beyond the right edge of the view.
///
/// Rate-limited by the spawn cooldown and capped by `max_enemies` unless
/// `force` is set. A candidate must be clear of tiles and at least
/// `min_spawn_distance` from the player. Gives up silently after the
/// configured number of attempts.
pub fn try_spawn_enemy(world: &mut WorldState, force: bool) -> Option<(EntityId, EnemyKind)> {
    let cfg = world.config.spawn.clone();
    if !force
        && (world.time - world.last_spawn < cfg.spawn_cooldown || world.enemies.len() >= world.max_enemies)
    {
        return None;
    }

    let view_w = world.camera.view_w;
    let level_w = world.level_width();
    let level_h = world.collision.pixel_height();
    let mut lo = world.camera.x + view_w + 16.0;
    let mut hi = (lo + view_w / 2.0).min(level_w - 100.0);
    if lo >= hi {
        lo = view_w * 0.7;
        hi = level_w * 0.9;
    }
    let y_hi = (level_h * 0.7).max(41.0);
    let player = world.player.actor.rect;
    let pool = STAGES.get(world.stage_index).map(|s| s.pool).unwrap_or(&[Grub]);

    for _ in 0..cfg.spawn_attempts {
        if hi <= lo { break; }
        let ex = world.rng.random_range(lo..hi);
        let ey = world.rng.random_range(40.0..y_hi);
        let area = Rect::new(ex, ey, ENEMY_SIZE, ENEMY_SIZE);
        if !world.collision.is_clear(&area) {
            continue;
        }
        let dx = area.center_x() - player.center_x();
        let dy = area.center_y() - player.center_y();
        if (dx * dx + dy * dy).sqrt() < cfg.min_spawn_distance {
            continue;
        }

        let kind = pool[world.rng.random_range(0..pool.len())];
        let id = world.alloc_id();
        let enemy = Enemy::spawn(id, kind, ex, ey, &mut world.rng);
        world.enemies.push(enemy);
        world.last_spawn = world.time;
        debug!(id, kind = kind.name(), x = ex, y = ey, "enemy spawned");
        return Some((id, kind));
    }
    debug!("no spawn location found");
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;
    use crate::domain::class::CharClass;

    fn world() -> WorldState {
        WorldState::new(GameConfig::default(), CharClass::Wanderer)
    }

    #[test]
    fn every_stage_has_a_spawn_and_a_floor() {
        for def in STAGES.iter() {
            assert!(find_spawn(def.rows).is_some(), "{} has no spawn", def.name);
            let cw = CollisionWorld::from_rows(def.rows, 48.0);
            for col in 0..cw.cols() {
                assert!(cw.surface_top(col).is_some(), "{} has a hole at column {col}", def.name);
            }
            assert!(!def.pool.is_empty());
        }
    }

    #[test]
    fn load_resets_stage_state() {
        let mut w = world();
        let mut events = Vec::new();
        load_stage(&mut w, 1, &mut events);
        assert_eq!(w.phase, StagePhase::Active);
        assert_eq!(w.stage_name, "Enchanted Castle");
        assert_eq!(w.quota, 9);
        assert_eq!(w.max_enemies, 8);
        assert_eq!(w.checkpoints.len(), 2);
        assert!(w.checkpoints.iter().all(|c| !c.is_activated()));
        assert!(w.guide.is_none());
        assert_eq!(w.message, STAGES[1].story);
        assert!(events.contains(&GameEvent::StageLoaded { index: 1 }));
        assert_eq!(w.player.actor.rect.x, 6.0 * 48.0);
        assert_eq!(w.player.actor.rect.bottom(), 5.0 * 48.0);
    }

    #[test]
    fn final_stage_places_the_guide_on_the_ground() {
        let mut w = world();
        load_stage(&mut w, 2, &mut Vec::new());
        let g = w.guide.as_ref().unwrap();
        assert_eq!(g.rect.bottom(), 6.0 * 48.0);
        assert!(w.collision.is_clear(&g.rect));
    }

    #[test]
    fn checkpoints_are_evenly_spaced_on_surfaces() {
        let mut w = world();
        load_stage(&mut w, 0, &mut Vec::new());
        let width = w.level_width();
        let xs: Vec<f32> = w.checkpoints.iter().map(|c| c.rect.center_x()).collect();
        assert!((xs[0] - width / 3.0).abs() < 1.0);
        assert!((xs[1] - 2.0 * width / 3.0).abs() < 1.0);
        for cp in &w.checkpoints {
            assert!(w.collision.is_clear(&cp.rect));
        }
    }

    #[test]
    fn spawns_are_rate_limited_and_capped() {
        let mut w = world();
        load_stage(&mut w, 0, &mut Vec::new());
        let start = w.enemies.len();
        assert!(start > 0);
        w.time = 100.0;
        w.last_spawn = 99.5;
        assert!(try_spawn_enemy(&mut w, false).is_none());

        w.last_spawn = 0.0;
        let mut spawned = 0;
        for _ in 0..50 {
            w.last_spawn = f64::NEG_INFINITY;
            if try_spawn_enemy(&mut w, false).is_some() { spawned += 1; }
        }
        assert!(spawned > 0);
        assert!(w.enemies.len() <= w.max_enemies);
    }

    #[test]
    fn spawned_enemies_are_clear_and_distant() {
        let mut w = world();
        load_stage(&mut w, 0, &mut Vec::new());
        let p = w.player.actor.rect;
        for e in &w.enemies {
            assert!(w.collision.is_clear(&e.actor.rect));
            let dx = e.actor.rect.center_x() - p.center_x();
            let dy = e.actor.rect.center_y() - p.center_y();
            assert!((dx * dx + dy * dy).sqrt() >= 200.0);
            assert!(STAGES[0].pool.contains(&e.kind));
        }
    }
}
