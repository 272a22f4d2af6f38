/// The step function: advances the world by one tick.
///
/// Processing order:
///   0. Stage transitions (advancing, ending) and hitstop freeze
///   1. Modal input (tactical / inventory); the stage is suspended
///   2. Mode requests, death and respawn
///   3. Player input (run, jump, dash, attack, guide choice)
///   4. Physics (player, then enemies and boss)
///   5. Enemy AI intent
///   6. Combat (player swing, enemy swings, hazards, window advance)
///   7. Progression (defeats, pickups, checkpoints, guide, spawns, exit)
///   8. Presentation decay and camera
///
/// Removals from the enemy list always work on an id snapshot taken
/// before the list is touched.

use rand::Rng;
use tracing::{debug, info};

use crate::domain::ai::{self, Boss, Enemy, EnemyKind, Perception, Strike};
use crate::domain::class::HitboxShape;
use crate::domain::combat::{self, HitSpec};
use crate::domain::entity::{DamageTint, EffectKind, EntityId, Facing, GroundItem};
use crate::domain::geometry::Rect;
use crate::domain::inventory::{Item, ItemEffect, ItemKind};
use crate::domain::physics;
use crate::domain::rules::{self, Ending};
use super::event::GameEvent;
use super::guide::{self, Choice};
use super::level::{self, CHECKPOINT_TEXT};
use super::mode::{InventoryMenu, Mode};
use super::tactical::{Outcome, TacticalAction, TacticalEncounter};
use super::world::{StagePhase, WorldState, CAMERA_LEFT_MARGIN};

/// Longest tick the simulation will integrate in one go.
pub const MAX_DT: f32 = 0.05;
const SNARE_TIME: f32 = 2.0;
const GUIDE_HELP_HEAL: i32 = 10;
const GUIDE_HELP_CAP: i32 = 3;
const FLEE_PENALTY: i32 = 5;
const DROP_SIZE: f32 = 8.0;

/// One tick of player intent. Produced by the input provider; the core
/// never reads devices itself.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct InputFrame {
    pub left: bool,
    pub right: bool,
    pub jump: bool,
    pub dash: bool,
    pub attack: bool,
    pub enter_tactical: bool,
    pub toggle_inventory: bool,
    pub use_item: bool,
    pub discard_item: bool,
    pub befriend: bool,
    pub fight: bool,
    pub flee: bool,
    pub menu_left: bool,
    pub menu_right: bool,
}

// ══════════════════════════════════════════════════════════════
// Main entry point
// ══════════════════════════════════════════════════════════════

pub fn step(world: &mut WorldState, input: &InputFrame, dt: f32) -> Vec<GameEvent> {
    let mut events: Vec<GameEvent> = Vec::new();
    let dt = dt.clamp(0.0, MAX_DT);

    match world.phase {
        StagePhase::Ending(_) | StagePhase::Loading => return events,
        StagePhase::Advancing => {
            let next = world.stage_index + 1;
            level::load_stage(world, next, &mut events);
            return events;
        }
        StagePhase::Active => {}
    }

    if world.feedback.hold(dt) {
        return events;
    }

    if !world.modes.is_empty() {
        resolve_mode_input(world, input, &mut events);
        return events;
    }

    world.time += dt as f64;
    world.tick += 1;

    if resolve_mode_requests(world, input, &mut events) { return events; }
    if resolve_player_death(world, &mut events) {
        world.feedback.tick(dt, world.config.combat.shake_decay);
        return events;
    }

    resolve_guide_choice(world, input, &mut events);
    resolve_player_input(world, input);
    resolve_player_physics(world, dt);
    resolve_enemy_ai(world, dt, &mut events);
    resolve_enemy_physics(world, dt);
    resolve_player_attack(world, &mut events);
    resolve_enemy_attacks(world, &mut events);
    resolve_hazards(world, &mut events);
    advance_attack_windows(world);
    resolve_defeats(world, &mut events);
    resolve_pickups(world, &mut events);
    resolve_checkpoints(world, &mut events);
    resolve_guide(world, &mut events);
    if let Some((id, kind)) = level::try_spawn_enemy(world, false) {
        events.push(GameEvent::EnemySpawned { id, kind });
    }
    if !resolve_player_death(world, &mut events) {
        resolve_exit(world, &mut events);
    }

    world.feedback.tick(dt, world.config.combat.shake_decay);
    let level_w = world.level_width();
    let center = world.player.actor.rect.center_x();
    world.camera.follow(center, level_w, dt);

    events
}

// ══════════════════════════════════════════════════════════════
// Modes
// ══════════════════════════════════════════════════════════════

/// Push a modal mode when asked. Returns true when the stage is now suspended.
fn resolve_mode_requests(world: &mut WorldState, input: &InputFrame, events: &mut Vec<GameEvent>) -> bool {
    if world.player.actor.is_dead() { return false; }

    if input.toggle_inventory {
        world.modes.push(Mode::Inventory(InventoryMenu::default()));
        let lines = world.player.inventory.list();
        let text = if lines.is_empty() { crate::domain::inventory::EMPTY_MESSAGE.to_string() } else { lines.join("  ") };
        world.set_message(&text);
        return true;
    }

    if input.enter_tactical {
        let cfg = world.config.tactical.clone();
        let p = world.player.actor.rect;
        let mut nearby: Vec<(f32, usize)> = world.enemies.iter().enumerate()
            .filter(|(_, e)| e.is_targetable())
            .map(|(i, e)| (Perception::between(&e.actor.rect, &p, 0.0, 0.0).distance(), i))
            .filter(|(d, _)| *d <= cfg.proximity)
            .collect();
        if nearby.is_empty() {
            world.set_message("No enemies close enough to engage.");
            return false;
        }
        nearby.sort_by(|a, b| a.0.total_cmp(&b.0));
        nearby.truncate(cfg.max_participants);

        let picked: Vec<&Enemy> = nearby.iter().map(|(_, i)| &world.enemies[*i]).collect();
        let encounter = TacticalEncounter::begin(&world.player, &picked, cfg.max_turns, &mut world.rng);
        events.push(GameEvent::TacticalStarted { enemies: encounter.enemies.len() });
        world.modes.push(Mode::Tactical(encounter));
        return true;
    }
    false
}

fn resolve_mode_input(world: &mut WorldState, input: &InputFrame, events: &mut Vec<GameEvent>) {
    let delta = input.menu_right as i32 - input.menu_left as i32;
    let finished = match world.modes.top_mut() {
        Some(Mode::Tactical(enc)) => {
            if delta != 0 { enc.move_cursor(delta); }
            let action = if input.flee {
                Some(TacticalAction::Flee)
            } else if input.attack {
                Some(enc.selected())
            } else {
                None
            };
            match action {
                Some(a) => match enc.act(&mut world.player, a, &mut world.rng) {
                    Ok(outcome) => outcome.map(|o| (o, enc.defeated_sources())),
                    Err(e) => {
                        enc.log.push(e.to_string());
                        None
                    }
                },
                None => None,
            }
        }
        Some(Mode::Inventory(menu)) => {
            if input.toggle_inventory {
                world.modes.pop();
                return;
            }
            let len = world.player.inventory.len();
            if delta != 0 { menu.move_cursor(delta, len); }
            let cursor = menu.cursor;
            if input.use_item {
                use_inventory_item(world, cursor);
            } else if input.discard_item {
                let msg = match world.player.inventory.discard_item(cursor) {
                    Ok(out) => out.message,
                    Err(e) => e.to_string(),
                };
                world.set_message(&msg);
            }
            let len = world.player.inventory.len();
            if let Some(Mode::Inventory(menu)) = world.modes.top_mut() {
                menu.clamp(len);
            }
            None
        }
        None => None,
    };

    if let Some((outcome, defeated)) = finished {
        world.modes.pop();
        finish_tactical(world, outcome, &defeated, events);
    }
}

fn use_inventory_item(world: &mut WorldState, index: usize) {
    let hp = world.player.actor.health();
    let max = world.player.actor.max_health();
    let msg = match world.player.inventory.use_item(index, hp, max) {
        Ok(out) => {
            match out.effect {
                ItemEffect::Healed(n) => { world.player.actor.heal(n); }
                ItemEffect::StrengthUp(n) => world.player.strength += n,
                ItemEffect::Story | ItemEffect::Nothing => {}
            }
            out.message
        }
        Err(e) => e.to_string(),
    };
    world.set_message(&msg);
}

/// Reconcile a finished encounter into the stage.
fn finish_tactical(world: &mut WorldState, outcome: Outcome, defeated: &[EntityId], events: &mut Vec<GameEvent>) {
    let before = world.enemies.len();
    world.enemies.retain(|e| !defeated.contains(&e.actor.id));
    world.enemies_defeated += (before - world.enemies.len()) as u32;

    match outcome {
        Outcome::Victory => {
            let exp = 10 * (1 + world.stage_index as u32);
            world.player.exp += exp;
            if world.rng.random_bool(0.6) {
                let id = world.alloc_item_id();
                let item = match world.rng.random_range(0..3) {
                    0 => Item::new(id, "Minor Potion", ItemKind::Potion, 30),
                    1 => Item::new(id, "Ring of Strength", ItemKind::BuffStrength, 2),
                    _ => Item::new(id, "Rusty Key", ItemKind::Key, 0),
                };
                world.player.pick_up(item);
            }
        }
        Outcome::Fled | Outcome::TurnLimit => {
            let hp = world.player.actor.health();
            if hp > 0 {
                world.player.actor.set_health((hp - FLEE_PENALTY).max(1));
            }
        }
        Outcome::Defeat => {}
    }

    info!(?outcome, removed = defeated.len(), "tactical encounter resolved");
    world.set_message("Tactical combat ended.");
    events.push(GameEvent::TacticalEnded { outcome });
}

// ══════════════════════════════════════════════════════════════
// Death and respawn
// ══════════════════════════════════════════════════════════════

/// Register a fresh death and run the respawn timer. Returns true while
/// the player is down; the respawn tick itself is also consumed.
fn resolve_player_death(world: &mut WorldState, events: &mut Vec<GameEvent>) -> bool {
    if !world.player.actor.is_dead() {
        return false;
    }
    if world.ending().is_some() {
        return true;
    }

    match world.respawn_at {
        None => {
            world.lives -= 1;
            world.player.actor.vx = 0.0;
            world.player.actor.vy = 0.0;
            world.player.actor.attack.cancel();
            events.push(GameEvent::PlayerDied { lives_left: world.lives });
            info!(lives = world.lives, "player died");
            if world.lives < 0 {
                end_game(world, Ending::Defeat, events);
            } else {
                world.respawn_at = Some(world.time + world.config.progression.respawn_delay);
            }
        }
        Some(at) if world.time >= at => {
            let (x, y) = world.respawn_point;
            let protection = world.config.combat.spawn_protection;
            world.player.respawn_at(x, y, world.time, protection);
            world.respawn_at = None;
            let level_w = world.level_width();
            world.camera.snap(world.player.actor.rect.center_x(), level_w);
            events.push(GameEvent::PlayerRespawned);
            info!(x, y, "player respawned");
        }
        Some(_) => {}
    }
    true
}

fn end_game(world: &mut WorldState, ending: Ending, events: &mut Vec<GameEvent>) {
    world.phase = StagePhase::Ending(ending);
    world.set_message(ending.title());
    info!(ending = ending.as_str(), score = world.final_score(), "game ended");
    events.push(GameEvent::GameEnded { ending });
}

// ══════════════════════════════════════════════════════════════
// Player
// ══════════════════════════════════════════════════════════════

fn resolve_guide_choice(world: &mut WorldState, input: &InputFrame, events: &mut Vec<GameEvent>) {
    let choice = if input.befriend {
        Choice::Befriend
    } else if input.fight {
        Choice::Betray
    } else {
        return;
    };
    let Some(guide) = world.guide.as_mut() else { return };
    let Some(made) = guide.choose(choice) else { return };
    let spot = guide.rect;

    match made {
        Choice::Befriend => {
            world.guide_help_count += 2;
            world.choice_points += 2;
            world.set_message(guide::BEFRIEND_TEXT);
            events.push(GameEvent::GuideBefriended);
        }
        Choice::Betray => {
            world.choice_points -= 1;
            let id = world.alloc_id();
            let boss = Boss::new(id, spot.center_x() - ai::BOSS_SIZE / 2.0, spot.bottom() - ai::BOSS_SIZE);
            world.boss = Some(boss);
            world.set_message(guide::BETRAY_TEXT);
            events.push(GameEvent::GuideBetrayed);
        }
    }
    info!(choice = ?made, points = world.choice_points, "guide choice");
}

fn resolve_player_input(world: &mut WorldState, input: &InputFrame) {
    let now = world.time;
    let base = world.config.physics.player_speed;
    let jump = world.config.physics.jump_speed;
    let coyote = world.config.physics.coyote_time;
    let p = &mut world.player;

    let dir = input.right as i32 - input.left as i32;
    if dir != 0 {
        p.actor.facing = Facing::toward(dir as f32, p.actor.facing);
    }
    if input.dash {
        physics::try_dash(p, now);
    }
    if input.jump {
        physics::try_jump(p, jump, coyote);
    }

    p.actor.vx = if p.is_dashing() {
        p.dash_dir * p.stats().dash_speed
    } else {
        dir as f32 * p.run_speed(base)
    };

    if input.attack {
        let stats = p.stats();
        combat::try_start_attack(&mut p.actor, now, stats.attack_cooldown, stats.attack_frames);
    }
}

fn resolve_player_physics(world: &mut WorldState, dt: f32) {
    let params = world.player_body();
    let p = &mut world.player;
    physics::integrate(&mut p.actor, dt, &world.collision, &params);
    physics::settle_player(p, dt);

    let min_x = world.camera.x + CAMERA_LEFT_MARGIN;
    if p.actor.rect.x < min_x {
        p.actor.rect.x = min_x.min(world.collision.pixel_width() - p.actor.rect.w);
    }
    if p.snare_remaining > 0.0 {
        p.snare_remaining = (p.snare_remaining - dt).max(0.0);
    }
    p.actor.tick_effects(dt);

    if p.actor.rect.top() > world.collision.pixel_height() + 200.0 {
        p.actor.set_health(0);
    }
}

// ══════════════════════════════════════════════════════════════
// Enemies
// ══════════════════════════════════════════════════════════════

fn resolve_enemy_ai(world: &mut WorldState, dt: f32, events: &mut Vec<GameEvent>) {
    let now = world.time;
    let target = world.player.actor.rect;
    let mut feared = false;
    let mut splits: Vec<usize> = Vec::new();

    for (i, enemy) in world.enemies.iter_mut().enumerate() {
        let seen = Perception::between(&enemy.actor.rect, &target, now, dt);
        let tick = ai::think(enemy, &seen, &mut world.rng);
        feared |= tick.fear;
        if tick.split { splits.push(i); }
        if tick.attacked || tick.emerged || tick.burst || tick.web_fired {
            debug!(id = enemy.actor.id, kind = enemy.kind.name(), ?tick, "enemy acted");
        }
    }
    world.player.feared = feared;

    for i in splits {
        let id = world.alloc_id();
        let child = world.enemies[i].split_child(id, &world.collision);
        let parent = world.enemies[i].actor.id;
        world.enemies.push(child);
        events.push(GameEvent::SlimeSplit { parent, child: id });
    }

    if let Some(boss) = world.boss.as_mut() {
        let seen = Perception::between(&boss.actor.rect, &target, now, dt);
        ai::think_boss(boss, &seen, &mut world.rng);
    }
}

fn resolve_enemy_physics(world: &mut WorldState, dt: f32) {
    let gravity = world.config.physics.gravity;
    let terminal = world.config.physics.terminal_velocity;
    let width = world.collision.pixel_width();
    let height = world.collision.pixel_height();

    for enemy in world.enemies.iter_mut() {
        let params = enemy.kind.body_params(gravity, terminal);
        let prior_vx = enemy.actor.vx;
        let contacts = physics::integrate(&mut enemy.actor, dt, &world.collision, &params);
        if contacts.hit_wall {
            enemy.bounce_off_wall(prior_vx);
        }
        if !params.collides {
            let r = &mut enemy.actor.rect;
            r.x = r.x.clamp(0.0, (width - r.w).max(0.0));
            r.y = r.y.clamp(0.0, (height - r.h).max(0.0));
        }
    }

    if let Some(boss) = world.boss.as_mut() {
        let params = Boss::body_params(gravity, terminal);
        physics::integrate(&mut boss.actor, dt, &world.collision, &params);
    }
}

// ══════════════════════════════════════════════════════════════
// Combat
// ══════════════════════════════════════════════════════════════

fn resolve_player_attack(world: &mut WorldState, events: &mut Vec<GameEvent>) {
    let stats = world.player.stats();
    let Some(hitbox) = combat::hitbox(&world.player.actor, stats.shape, stats.attack_range) else { return };
    let now = world.time;
    let params = world.hit_params();
    let source_x = world.player.actor.rect.center_x();
    let strength = world.player.strength;

    for enemy in world.enemies.iter_mut() {
        let id = enemy.actor.id;
        if !enemy.is_targetable() || world.player.actor.attack.already_struck(id) { continue; }
        if !hitbox.overlaps(&enemy.actor.rect) { continue; }
        let raw = rules::player_damage(&stats, strength, &mut world.rng);
        let hit = HitSpec {
            damage: enemy.mitigate(raw),
            source_x,
            debounce: enemy.hurt_debounce(),
            grace: 0.0,
            tint: DamageTint::Dealt,
        };
        if let Ok(dealt) = combat::apply_hit(&mut enemy.actor, hit, now, &params, &world.collision, &mut world.feedback) {
            world.player.actor.attack.mark_struck(id);
            debug!(id, dealt, hp = enemy.actor.health(), "enemy hit");
            events.push(GameEvent::EnemyHit { id, damage: dealt });
        }
    }

    if let Some(boss) = world.boss.as_mut() {
        let id = boss.actor.id;
        if !world.player.actor.attack.already_struck(id) && hitbox.overlaps(&boss.actor.rect) {
            let hit = HitSpec {
                damage: rules::player_damage(&stats, strength, &mut world.rng),
                source_x,
                debounce: ai::BOSS_DEBOUNCE,
                grace: 0.0,
                tint: DamageTint::Dealt,
            };
            if let Ok(dealt) = combat::apply_hit(&mut boss.actor, hit, now, &params, &world.collision, &mut world.feedback) {
                world.player.actor.attack.mark_struck(id);
                events.push(GameEvent::BossHit { damage: dealt });
            }
        }
    }
}

/// One hostile strike against the player: dodge roll, then the hit.
fn strike_player(world: &mut WorldState, damage: i32, source_x: f32, events: &mut Vec<GameEvent>) {
    let now = world.time;
    if combat::can_take_hit(&world.player.actor, now, 0.0).is_err() {
        return;
    }
    if world.rng.random::<f32>() < rules::dodge_chance(world.player.agility) {
        let life = world.config.combat.damage_number_lifetime;
        world.feedback.number(&world.player.actor.rect, 0, DamageTint::Dodged, life);
        events.push(GameEvent::PlayerDodged);
        return;
    }
    let params = world.hit_params();
    let hit = HitSpec {
        damage,
        source_x,
        debounce: 0.0,
        grace: world.config.combat.player_hit_grace,
        tint: DamageTint::Taken,
    };
    if let Ok(dealt) = combat::apply_hit(&mut world.player.actor, hit, now, &params, &world.collision, &mut world.feedback) {
        debug!(dealt, hp = world.player.actor.health(), "player hit");
        events.push(GameEvent::PlayerHit { damage: dealt });
    }
}

fn resolve_enemy_attacks(world: &mut WorldState, events: &mut Vec<GameEvent>) {
    let target = world.player.actor.rect;
    let mut strikes: Vec<(usize, f32)> = Vec::new();

    for (i, enemy) in world.enemies.iter().enumerate() {
        if !enemy.actor.attack.active || enemy.strike == Strike::Web { continue; }
        if enemy.actor.attack.already_struck(world.player.actor.id) { continue; }
        let (shape, range) = enemy.strike_shape();
        let Some(hitbox) = combat::hitbox(&enemy.actor, shape, range) else { continue };
        if hitbox.overlaps(&target) {
            strikes.push((i, enemy.actor.rect.center_x()));
        }
    }

    let player_id = world.player.actor.id;
    for (i, source_x) in strikes {
        let damage = world.enemies[i].strike_damage(&mut world.rng);
        world.enemies[i].actor.attack.mark_struck(player_id);
        strike_player(world, damage, source_x, events);
    }

    let boss_strike = world.boss.as_mut().and_then(|boss| {
        if !boss.actor.attack.active || boss.actor.attack.already_struck(player_id) {
            return None;
        }
        let shape = HitboxShape::Forward { height: boss.actor.rect.h };
        let hitbox = combat::hitbox(&boss.actor, shape, ai::BOSS_ATTACK_RANGE)?;
        if !hitbox.overlaps(&target) {
            return None;
        }
        boss.actor.attack.mark_struck(player_id);
        Some((boss.damage, boss.actor.rect.center_x()))
    });
    if let Some((damage, source_x)) = boss_strike {
        strike_player(world, damage, source_x, events);
    }
}

/// Status effects left in the world by enemies.
fn resolve_hazards(world: &mut WorldState, events: &mut Vec<GameEvent>) {
    let target = world.player.actor.rect;
    let mut acid: Vec<(i32, f32)> = Vec::new();
    let mut snared = false;

    for enemy in world.enemies.iter_mut() {
        for effect in enemy.actor.effects.iter_mut() {
            if effect.spent { continue; }
            match effect.kind {
                EffectKind::AcidPool { damage, area } => {
                    if area.overlaps(&target) {
                        acid.push((damage, area.center_x()));
                    }
                }
                EffectKind::WebStrand { area } => {
                    if area.overlaps(&target) {
                        effect.spent = true;
                        snared = true;
                    }
                }
            }
        }
    }

    if snared {
        world.player.snare_remaining = SNARE_TIME;
        events.push(GameEvent::PlayerSnared);
    }
    for (damage, x) in acid {
        strike_player(world, damage, x, events);
    }
}

fn advance_attack_windows(world: &mut WorldState) {
    world.player.actor.attack.advance();
    for enemy in world.enemies.iter_mut() {
        enemy.actor.attack.advance();
    }
    if let Some(boss) = world.boss.as_mut() {
        boss.actor.attack.advance();
    }
}

// ══════════════════════════════════════════════════════════════
// Progression
// ══════════════════════════════════════════════════════════════

fn resolve_defeats(world: &mut WorldState, events: &mut Vec<GameEvent>) {
    let dead: Vec<(EntityId, EnemyKind, Rect, u32)> = world.enemies.iter()
        .filter(|e| e.actor.is_dead())
        .map(|e| (e.actor.id, e.kind, e.actor.rect, e.exp_value))
        .collect();
    if !dead.is_empty() {
        world.enemies.retain(|e| !e.actor.is_dead());
    }

    for (id, kind, rect, exp) in dead {
        world.enemies_defeated += 1;
        world.player.exp += exp;
        events.push(GameEvent::EnemyDefeated { id, kind });
        debug!(id, kind = kind.name(), defeated = world.enemies_defeated, "enemy defeated");

        if world.rng.random_bool(0.5) {
            let item_id = world.alloc_item_id();
            let item = match world.rng.random_range(0..3) {
                0 => Item::new(item_id, "Minor Potion", ItemKind::Potion, 25),
                1 => Item::new(item_id, "Tiny Potion", ItemKind::Potion, 15),
                _ => Item::new(item_id, "Rusty Ring", ItemKind::BuffStrength, 1),
            };
            let spot = Rect::new(rect.center_x() - DROP_SIZE / 2.0, rect.center_y() - DROP_SIZE / 2.0, DROP_SIZE, DROP_SIZE);
            world.ground_items.push(GroundItem { item, rect: spot });
            events.push(GameEvent::ItemDropped { x: spot.x, y: spot.y });
        }
    }

    if world.boss.as_ref().is_some_and(|b| b.actor.is_dead()) {
        world.boss = None;
        world.set_message("The guide falls. The way to the water is open.");
        info!("boss defeated");
        events.push(GameEvent::BossDefeated);
    }
}

fn resolve_pickups(world: &mut WorldState, events: &mut Vec<GameEvent>) {
    let p = world.player.actor.rect;
    let (taken, left): (Vec<GroundItem>, Vec<GroundItem>) =
        std::mem::take(&mut world.ground_items).into_iter().partition(|g| g.rect.overlaps(&p));
    world.ground_items = left;
    for g in taken {
        let name = g.item.name.clone();
        world.player.pick_up(g.item);
        world.set_message(&format!("Picked up {name}."));
        events.push(GameEvent::ItemPicked { name });
    }
}

fn resolve_checkpoints(world: &mut WorldState, events: &mut Vec<GameEvent>) {
    let p = world.player.actor.rect;
    let tile = world.collision.tile_size();
    let now = world.time;
    let mut reached = None;
    for (i, cp) in world.checkpoints.iter_mut().enumerate() {
        if cp.rect.overlaps(&p) && cp.activate(now) {
            reached = Some((i, cp.rect));
        }
    }
    if let Some((index, rect)) = reached {
        world.respawn_point = (rect.x, rect.y - tile);
        world.set_message(CHECKPOINT_TEXT);
        info!(index, "checkpoint activated");
        events.push(GameEvent::CheckpointActivated { index });
    }
}

fn resolve_guide(world: &mut WorldState, events: &mut Vec<GameEvent>) {
    // Help: once per stage when the field is nearly clear.
    if !world.guide_helped_this_stage && world.enemies.len() < 2 && world.guide_help_count < GUIDE_HELP_CAP {
        world.guide_helped_this_stage = true;
        world.guide_help_count += 1;
        world.player.actor.heal(GUIDE_HELP_HEAL);
        world.set_message(guide::HELP_TEXT);
        events.push(GameEvent::GuideHelped);
    }

    let p = world.player.actor.rect;
    let now = world.time;
    let trigger = world.config.progression.guide_trigger_distance;
    let duration = world.config.progression.cutscene_duration;
    let Some(guide) = world.guide.as_mut() else { return };
    let was_waiting = guide.phase == guide::GuidePhase::Waiting;
    if let Some(text) = guide.update(&p, now, trigger, duration) {
        world.set_message(text);
        if was_waiting {
            events.push(GameEvent::GuideCutscene);
        }
    }
}

/// Far edge reached with the quota met and no boss standing.
fn resolve_exit(world: &mut WorldState, events: &mut Vec<GameEvent>) {
    let margin = world.config.progression.exit_margin;
    let at_edge = world.player.actor.rect.right() >= world.level_width() - margin;
    if !at_edge || world.enemies_defeated < world.quota || world.boss.is_some() {
        return;
    }

    let index = world.stage_index;
    events.push(GameEvent::StageCleared { index });
    if let Some(def) = level::STAGES.get(index) {
        world.set_message(def.outro);
    }
    info!(stage = index, "stage cleared");

    if world.is_final_stage() {
        let ending = rules::select_ending(world.final_score());
        end_game(world, ending, events);
    } else {
        world.phase = StagePhase::Advancing;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;
    use crate::domain::ai::Enemy;
    use crate::domain::entity::PLAYER_ID;
    use crate::domain::inventory::Item;

    const DT: f32 = 1.0 / 60.0;

    fn idle() -> InputFrame { InputFrame::default() }

    fn started(class: &str) -> WorldState {
        let (mut w, _) = WorldState::start(GameConfig::default(), class);
        w.enemies.clear();
        w.guide_helped_this_stage = true;
        w
    }

    /// Let the player fall onto the floor and the spawn grace expire.
    fn settle(w: &mut WorldState) {
        w.config.spawn.spawn_cooldown = 1.0e9;
        for _ in 0..150 {
            step(w, &idle(), DT);
        }
        w.player.actor.invulnerable_until = f64::NEG_INFINITY;
    }

    fn enemy_beside_player(w: &mut WorldState, kind: EnemyKind, gap: f32) -> EntityId {
        let id = w.alloc_id();
        let p = w.player.actor.rect;
        let mut e = Enemy::spawn(id, kind, p.right() + gap, p.bottom() - 32.0, &mut w.rng);
        e.aggression = 0.0;
        e.actor.vx = 0.0;
        w.enemies.push(e);
        id
    }

    #[test]
    fn player_lands_and_walks() {
        let mut w = started("Wanderer");
        settle(&mut w);
        assert!(w.player.actor.on_ground);
        let x0 = w.player.actor.rect.x;
        let right = InputFrame { right: true, ..idle() };
        for _ in 0..30 {
            step(&mut w, &right, DT);
        }
        assert!(w.player.actor.rect.x > x0 + 50.0);
        assert_eq!(w.player.actor.facing, Facing::Right);
    }

    #[test]
    fn swing_hits_each_enemy_once() {
        let mut w = started("Wanderer");
        settle(&mut w);
        let id = enemy_beside_player(&mut w, EnemyKind::Spider, 4.0);
        let hp0 = w.enemies[0].actor.health();

        let attack = InputFrame { attack: true, ..idle() };
        let mut hits = 0;
        for frame in 0..12 {
            let input = if frame == 0 { attack } else { idle() };
            for ev in step(&mut w, &input, DT) {
                if matches!(ev, GameEvent::EnemyHit { id: hit, .. } if hit == id) { hits += 1; }
            }
        }
        assert_eq!(hits, 1);
        let hp = w.enemies.iter().find(|e| e.actor.id == id).map(|e| e.actor.health()).unwrap_or(0);
        assert!(hp < hp0);
    }

    #[test]
    fn hitstop_freezes_the_world() {
        let mut w = started("Wanderer");
        settle(&mut w);
        w.feedback.hitstop = 0.05;
        let t0 = w.time;
        let x0 = w.player.actor.rect.x;
        let right = InputFrame { right: true, ..idle() };
        step(&mut w, &right, DT);
        assert_eq!(w.time, t0);
        assert_eq!(w.player.actor.rect.x, x0);
    }

    #[test]
    fn invulnerable_player_takes_nothing() {
        let mut w = started("Wanderer");
        settle(&mut w);
        w.player.actor.grant_invulnerability(w.time, 100.0);
        let hp = w.player.actor.health();
        let mut events = Vec::new();
        strike_player(&mut w, 999, 0.0, &mut events);
        assert_eq!(w.player.actor.health(), hp);
        assert!(events.is_empty());
    }

    #[test]
    fn death_costs_a_life_then_respawns_at_checkpoint() {
        let mut w = started("Wanderer");
        settle(&mut w);
        let cp = w.checkpoints[0].rect;
        w.player.actor.rect.x = cp.x;
        w.player.actor.rect.set_bottom(cp.bottom());
        step(&mut w, &idle(), DT);
        assert!(w.checkpoints[0].is_activated());
        let respawn = w.respawn_point;

        w.player.actor.set_health(0);
        let events = step(&mut w, &idle(), DT);
        assert!(events.contains(&GameEvent::PlayerDied { lives_left: 2 }));
        assert_eq!(w.lives, 2);

        let mut back = false;
        for _ in 0..200 {
            if step(&mut w, &idle(), DT).contains(&GameEvent::PlayerRespawned) {
                back = true;
                break;
            }
        }
        assert!(back);
        assert_eq!((w.player.actor.rect.x, w.player.actor.rect.y), respawn);
        assert!(w.player.actor.is_invulnerable(w.time));
    }

    #[test]
    fn checkpoint_touch_is_idempotent() {
        let mut w = started("Wanderer");
        settle(&mut w);
        let cp = w.checkpoints[0].rect;
        w.player.actor.rect.x = cp.x;
        w.player.actor.rect.set_bottom(cp.bottom());
        let first = step(&mut w, &idle(), DT);
        assert!(first.contains(&GameEvent::CheckpointActivated { index: 0 }));
        let at = w.checkpoints[0].activated_at();
        let point = w.respawn_point;

        w.respawn_point = (1.0, 1.0);
        w.set_message("something else");
        let again = step(&mut w, &idle(), DT);
        assert!(!again.iter().any(|e| matches!(e, GameEvent::CheckpointActivated { .. })));
        assert_eq!(w.checkpoints[0].activated_at(), at);
        assert_eq!(w.respawn_point, (1.0, 1.0));
        assert_ne!(point, (1.0, 1.0));
        assert_eq!(w.message, "something else");
    }

    #[test]
    fn running_out_of_lives_is_defeat() {
        let mut w = started("Wanderer");
        settle(&mut w);
        w.lives = 0;
        w.player.actor.set_health(0);
        let events = step(&mut w, &idle(), DT);
        assert!(events.contains(&GameEvent::GameEnded { ending: Ending::Defeat }));
        assert_eq!(w.ending(), Some(Ending::Defeat));
        assert!(step(&mut w, &idle(), DT).is_empty());
    }

    #[test]
    fn tactical_mode_suspends_the_stage() {
        let mut w = started("Warrior");
        settle(&mut w);
        enemy_beside_player(&mut w, EnemyKind::Grub, 20.0);
        let events = step(&mut w, &InputFrame { enter_tactical: true, ..idle() }, DT);
        assert!(events.contains(&GameEvent::TacticalStarted { enemies: 1 }));
        assert!(w.modes.in_tactical());

        let t0 = w.time;
        step(&mut w, &InputFrame { right: true, ..idle() }, DT);
        assert_eq!(w.time, t0);

        // One weak enemy against a strong spell: the fight can only be won.
        w.player.magic = 40;
        if let Some(Mode::Tactical(enc)) = w.modes.top_mut() {
            enc.enemies[0].hp = 1;
            enc.cursor = 2;
        }
        assert_eq!(tactical_outcome(&mut w, InputFrame { attack: true, ..idle() }), Some(Outcome::Victory));
        assert!(w.modes.is_empty());
        assert!(w.enemies.is_empty());
        assert_eq!(w.enemies_defeated, 1);
        assert_eq!(w.player.exp, 10);
    }

    /// Feed `input` until the encounter on top of the stack reports an end.
    fn tactical_outcome(w: &mut WorldState, input: InputFrame) -> Option<Outcome> {
        for _ in 0..200 {
            for ev in step(w, &input, DT) {
                if let GameEvent::TacticalEnded { outcome } = ev { return Some(outcome); }
            }
        }
        None
    }

    #[test]
    fn fleeing_costs_five_health_but_never_the_last_point() {
        let mut w = started("Warrior");
        settle(&mut w);
        let id = enemy_beside_player(&mut w, EnemyKind::Grub, 20.0);
        w.player.agility = 50;
        let flee = InputFrame { flee: true, ..idle() };

        w.player.actor.set_health(50);
        step(&mut w, &InputFrame { enter_tactical: true, ..idle() }, DT);
        assert_eq!(tactical_outcome(&mut w, flee), Some(Outcome::Fled));
        assert_eq!(w.player.actor.health(), 45);
        assert!(w.enemies.iter().any(|e| e.actor.id == id));
        assert_eq!(w.enemies_defeated, 0);
        assert_eq!(w.player.exp, 0);

        w.player.actor.set_health(3);
        step(&mut w, &InputFrame { enter_tactical: true, ..idle() }, DT);
        assert!(w.modes.in_tactical());
        assert_eq!(tactical_outcome(&mut w, flee), Some(Outcome::Fled));
        assert_eq!(w.player.actor.health(), 1);
        assert!(w.modes.is_empty());
    }

    #[test]
    fn turn_limit_is_penalised_like_a_flee() {
        let mut w = started("Warrior");
        settle(&mut w);
        enemy_beside_player(&mut w, EnemyKind::Grub, 20.0);
        w.config.tactical.max_turns = 1;
        w.player.actor.set_health(4);
        step(&mut w, &InputFrame { enter_tactical: true, ..idle() }, DT);
        if let Some(Mode::Tactical(enc)) = w.modes.top_mut() {
            enc.enemies[0].atk = 0;
            enc.cursor = 1;
        }
        assert_eq!(tactical_outcome(&mut w, InputFrame { attack: true, ..idle() }), Some(Outcome::TurnLimit));
        assert_eq!(w.player.actor.health(), 1);
        assert_eq!(w.enemies.len(), 1);
    }

    #[test]
    fn knockback_carries_the_player_past_the_nudge() {
        let mut w = started("Wanderer");
        settle(&mut w);
        w.player.agility = 0;
        let x0 = w.player.actor.rect.x;
        let source = w.player.actor.rect.center_x() - 100.0;
        let mut events = Vec::new();
        strike_player(&mut w, 1, source, &mut events);
        assert!(events.contains(&GameEvent::PlayerHit { damage: 1 }));
        let nudged = w.player.actor.rect.x;
        assert_eq!(nudged, x0 + w.config.combat.knockback_offset);

        for _ in 0..30 {
            step(&mut w, &idle(), DT);
        }
        assert!(w.player.actor.rect.x > nudged + 8.0, "x = {}", w.player.actor.rect.x);
        assert_eq!(w.player.actor.knockback_vx, 0.0);
        assert_eq!(w.player.actor.vx, 0.0);
    }

    #[test]
    fn tactical_needs_someone_nearby() {
        let mut w = started("Wizard");
        settle(&mut w);
        let events = step(&mut w, &InputFrame { enter_tactical: true, ..idle() }, DT);
        assert!(events.is_empty());
        assert!(w.modes.is_empty());
    }

    #[test]
    fn inventory_mode_uses_and_discards() {
        let mut w = started("Wanderer");
        settle(&mut w);
        w.player.inventory.add(Item::new(1, "Rusty Ring", ItemKind::BuffStrength, 1));
        w.player.inventory.add(Item::new(2, "Tiny Potion", ItemKind::Potion, 15));
        step(&mut w, &InputFrame { toggle_inventory: true, ..idle() }, DT);
        assert!(w.modes.in_inventory());

        step(&mut w, &InputFrame { use_item: true, ..idle() }, DT);
        assert_eq!(w.player.strength, 11);
        assert_eq!(w.message, "Rusty Ring equipped. Strength +1.");

        step(&mut w, &InputFrame { discard_item: true, ..idle() }, DT);
        assert_eq!(w.message, "Discarded Tiny Potion.");
        assert!(w.player.inventory.is_empty());

        step(&mut w, &InputFrame { use_item: true, ..idle() }, DT);
        assert_eq!(w.message, crate::domain::inventory::EMPTY_MESSAGE);

        step(&mut w, &InputFrame { toggle_inventory: true, ..idle() }, DT);
        assert!(w.modes.is_empty());
    }

    #[test]
    fn exit_needs_the_quota() {
        let mut w = started("Wanderer");
        settle(&mut w);
        let edge = w.level_width() - 70.0;
        w.camera.x = edge - 300.0;
        w.player.actor.rect.x = edge;
        w.enemies_defeated = 0;
        step(&mut w, &InputFrame { right: true, ..idle() }, DT);
        step(&mut w, &InputFrame { right: true, ..idle() }, DT);
        assert_eq!(w.phase, StagePhase::Active);

        w.enemies_defeated = w.quota;
        let events = step(&mut w, &InputFrame { right: true, ..idle() }, DT);
        assert!(events.contains(&GameEvent::StageCleared { index: 0 }));
        assert_eq!(w.phase, StagePhase::Advancing);
        step(&mut w, &idle(), DT);
        assert_eq!(w.stage_index, 1);
        assert_eq!(w.phase, StagePhase::Active);
    }

    #[test]
    fn betrayal_spawns_one_boss_and_blocks_the_exit() {
        let mut w = started("Wanderer");
        level::load_stage(&mut w, 2, &mut Vec::new());
        w.enemies.clear();
        w.guide_helped_this_stage = true;
        if let Some(g) = w.guide.as_mut() {
            g.phase = guide::GuidePhase::Choosing;
        }
        let events = step(&mut w, &InputFrame { fight: true, ..idle() }, DT);
        assert!(events.contains(&GameEvent::GuideBetrayed));
        assert!(w.boss.is_some());
        assert_eq!(w.choice_points, -1);

        let boss_id = w.boss.as_ref().map(|b| b.actor.id);
        step(&mut w, &InputFrame { fight: true, ..idle() }, DT);
        assert_eq!(w.boss.as_ref().map(|b| b.actor.id), boss_id);
        assert_eq!(w.choice_points, -1);
    }

    #[test]
    fn befriending_leads_to_good_or_neutral() {
        let mut w = started("Wanderer");
        level::load_stage(&mut w, 2, &mut Vec::new());
        w.enemies.clear();
        w.guide_helped_this_stage = true;
        w.guide_help_count = 1;
        if let Some(g) = w.guide.as_mut() {
            g.phase = guide::GuidePhase::Choosing;
        }
        step(&mut w, &InputFrame { befriend: true, ..idle() }, DT);
        assert_eq!(w.choice_points, 2);
        assert_eq!(w.guide_help_count, 3);
        assert_eq!(w.final_score(), 5);

        w.enemies_defeated = w.quota;
        w.player.actor.rect.x = w.level_width() - 40.0;
        w.camera.x = w.level_width() - 640.0;
        let events = step(&mut w, &idle(), DT);
        assert!(events.contains(&GameEvent::GameEnded { ending: Ending::Good }));
    }

    #[test]
    fn guide_helps_once_per_stage() {
        let (mut w, _) = WorldState::start(GameConfig::default(), "Wanderer");
        w.config.spawn.spawn_cooldown = 1.0e9;
        w.enemies.clear();
        let helped = step(&mut w, &idle(), DT).contains(&GameEvent::GuideHelped);
        assert!(helped);
        assert_eq!(w.guide_help_count, 1);
        assert!(!step(&mut w, &idle(), DT).contains(&GameEvent::GuideHelped));
    }

    #[test]
    fn player_id_is_reserved() {
        let w = started("Wanderer");
        assert_eq!(w.player.actor.id, PLAYER_ID);
        assert!(w.enemies.iter().all(|e| e.actor.id != PLAYER_ID));
    }
}
