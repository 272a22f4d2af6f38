/// Turn-based tactical encounter.
///
/// A self-contained snapshot: nearby enemies are copied into
/// `Participant`s with re-rolled stats and linked back only by
/// `source` id. The encounter mutates the live player's health and
/// inventory directly; the enemy list is reconciled by the caller from
/// `defeated_sources()` once the encounter reports an outcome.
///
/// ## Round
///
///   1. Player action (Attack / Defend / Magic / Item / Flee) on the
///      first surviving enemy.
///   2. Unless a flee succeeded, every surviving enemy acts once, in
///      turn order, each with a 90% chance to swing.
///   3. Termination check: player down → Defeat, no enemies → Victory,
///      turn bound reached → TurnLimit.

use rand::Rng;
use tracing::{debug, info};

use crate::domain::ai::Enemy;
use crate::domain::entity::{EntityId, Player};
use crate::domain::inventory::ItemEffect;
use crate::domain::rules;
use crate::error::ActionError;

#[derive(Clone, Debug)]
pub struct Participant {
    pub source: EntityId,
    pub name: String,
    pub hp: i32,
    pub atk: i32,
    pub def: i32,
    pub agi: i32,
}

impl Participant {
    pub fn from_enemy<R: Rng + ?Sized>(enemy: &Enemy, rng: &mut R) -> Self {
        Participant {
            source: enemy.actor.id,
            name: enemy.kind.name().to_string(),
            hp: rules::vary(enemy.actor.max_health(), -0.1, 0.2, rng).max(10),
            atk: rules::vary(enemy.damage, -0.2, 0.3, rng).max(3),
            def: 2,
            agi: rng.random_range(4..=7),
        }
    }

    pub fn is_down(&self) -> bool {
        self.hp <= 0
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum TacticalAction {
    Attack,
    Defend,
    Magic,
    Item,
    Flee,
}

impl TacticalAction {
    pub const ALL: [TacticalAction; 5] = [
        TacticalAction::Attack,
        TacticalAction::Defend,
        TacticalAction::Magic,
        TacticalAction::Item,
        TacticalAction::Flee,
    ];

    pub fn label(self) -> &'static str {
        match self {
            TacticalAction::Attack => "Attack",
            TacticalAction::Defend => "Defend",
            TacticalAction::Magic => "Magic",
            TacticalAction::Item => "Item",
            TacticalAction::Flee => "Flee",
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Outcome {
    Victory,
    Defeat,
    Fled,
    TurnLimit,
}

/// Slot in the initiative order.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Combatant {
    Player,
    Enemy(usize),
}

#[derive(Clone, Debug)]
pub struct TacticalEncounter {
    pub enemies: Vec<Participant>,
    pub order: Vec<Combatant>,
    pub log: Vec<String>,
    /// Menu cursor into `TacticalAction::ALL`.
    pub cursor: usize,
    turns: u32,
    max_turns: u32,
    outcome: Option<Outcome>,
}

impl TacticalEncounter {
    /// Snapshot `nearby` (already sorted by proximity, at most the
    /// participant cap) and fix the turn order.
    pub fn begin<R: Rng + ?Sized>(player: &Player, nearby: &[&Enemy], max_turns: u32, rng: &mut R) -> Self {
        let enemies: Vec<Participant> = nearby.iter().map(|e| Participant::from_enemy(e, rng)).collect();

        // Stable sort: equal agility keeps insertion order, player first.
        let mut slots: Vec<(Combatant, i32)> = vec![(Combatant::Player, player.agility)];
        slots.extend(enemies.iter().enumerate().map(|(i, p)| (Combatant::Enemy(i), p.agi)));
        slots.sort_by(|a, b| b.1.cmp(&a.1));

        info!(enemies = enemies.len(), "tactical encounter started");
        TacticalEncounter {
            enemies,
            order: slots.into_iter().map(|(c, _)| c).collect(),
            log: vec!["Tactical Combat started. Choose an action.".to_string()],
            cursor: 0,
            turns: 0,
            max_turns: max_turns.max(1),
            outcome: None,
        }
    }

    pub fn outcome(&self) -> Option<Outcome> { self.outcome }
    pub fn turns(&self) -> u32 { self.turns }

    pub fn selected(&self) -> TacticalAction {
        TacticalAction::ALL[self.cursor % TacticalAction::ALL.len()]
    }

    pub fn move_cursor(&mut self, delta: i32) {
        let n = TacticalAction::ALL.len() as i32;
        self.cursor = (self.cursor as i32 + delta).rem_euclid(n) as usize;
    }

    /// Index of the first enemy still standing.
    pub fn target(&self) -> Option<usize> {
        self.enemies.iter().position(|e| !e.is_down())
    }

    /// Ids of snapshot enemies knocked out, for removal from the live list.
    pub fn defeated_sources(&self) -> Vec<EntityId> {
        self.enemies.iter().filter(|e| e.is_down()).map(|e| e.source).collect()
    }

    /// Resolve one full round driven by the player's `action`.
    pub fn act<R: Rng + ?Sized>(
        &mut self,
        player: &mut Player,
        action: TacticalAction,
        rng: &mut R,
    ) -> Result<Option<Outcome>, ActionError> {
        if self.outcome.is_some() {
            return Err(ActionError::EncounterOver);
        }
        let target = self.target().ok_or(ActionError::NoTarget)?;
        self.turns += 1;

        let mut defending = false;
        match action {
            TacticalAction::Attack => self.player_attack(player, target, rng),
            TacticalAction::Defend => {
                defending = true;
                self.log.push("You brace for incoming attacks.".to_string());
            }
            TacticalAction::Magic => self.player_magic(player, target, rng),
            TacticalAction::Item => self.player_item(player),
            TacticalAction::Flee => {
                if rng.random::<f32>() < rules::flee_chance(player.agility) {
                    self.log.push("You successfully fled.".to_string());
                    return Ok(self.finish(Outcome::Fled));
                }
                self.log.push("Failed to flee.".to_string());
            }
        }

        let enemy_slots: Vec<usize> = self.order.iter()
            .filter_map(|c| match c { Combatant::Enemy(i) => Some(*i), Combatant::Player => None })
            .collect();
        for i in enemy_slots {
            if player.actor.is_dead() { break; }
            if self.enemies[i].is_down() { continue; }
            if rng.random::<f32>() < 0.9 {
                self.enemy_action(i, player, defending, rng);
            }
        }

        Ok(self.check_end(player))
    }

    fn player_attack<R: Rng + ?Sized>(&mut self, player: &Player, target: usize, rng: &mut R) {
        let base_atk = (player.strength + rng.random_range(-2..=3)).max(1);
        let enemy = &mut self.enemies[target];
        if rules::roll_hit(base_atk, 0.5, enemy.def, rng) {
            let dmg = base_atk + rules::spread(0, player.strength / 2, rng);
            enemy.hp -= dmg;
            self.log.push(format!("You hit {} for {}.", enemy.name, dmg));
        } else {
            self.log.push("Your attack missed.".to_string());
        }
    }

    fn player_magic<R: Rng + ?Sized>(&mut self, player: &Player, target: usize, rng: &mut R) {
        let power = rules::magic_power(player.magic, player.magic_power);
        let enemy = &mut self.enemies[target];
        if rng.random::<f32>() < 0.9 {
            let dmg = power + rules::spread(-2, power / 4, rng);
            enemy.hp -= dmg;
            self.log.push(format!("You cast a spell on {} for {}.", enemy.name, dmg));
        } else {
            self.log.push("Spell fizzled.".to_string());
        }
    }

    fn player_item(&mut self, player: &mut Player) {
        let Some(slot) = player.inventory.first_potion() else {
            self.log.push("No usable potions.".to_string());
            return;
        };
        let (hp, max) = (player.actor.health(), player.actor.max_health());
        match player.inventory.use_item(slot, hp, max) {
            Ok(out) => {
                if let ItemEffect::Healed(n) = out.effect {
                    player.actor.heal(n);
                }
                self.log.push(out.message);
            }
            Err(e) => self.log.push(e.to_string()),
        }
    }

    fn enemy_action<R: Rng + ?Sized>(&mut self, i: usize, player: &mut Player, defending: bool, rng: &mut R) {
        let e = &self.enemies[i];
        let player_def = (player.defense as f32 * 0.1).floor() as i32;
        if rules::roll_hit(e.atk, 0.5, player_def, rng) {
            let mut dmg = e.atk + rules::spread(0, e.atk / 2, rng);
            if defending {
                dmg = (dmg - (player.defense as f32 * 0.3).floor() as i32).max(0);
            }
            player.actor.apply_damage(dmg);
            self.log.push(format!("{} hits you for {}.", e.name, dmg));
        } else {
            self.log.push(format!("{}'s attack missed.", e.name));
        }
    }

    fn check_end(&mut self, player: &Player) -> Option<Outcome> {
        if player.actor.is_dead() {
            self.log.push("You were defeated...".to_string());
            return self.finish(Outcome::Defeat);
        }
        if self.target().is_none() {
            self.log.push("Victory!".to_string());
            return self.finish(Outcome::Victory);
        }
        if self.turns >= self.max_turns {
            self.log.push("The fight drags on; you withdraw.".to_string());
            return self.finish(Outcome::TurnLimit);
        }
        None
    }

    fn finish(&mut self, outcome: Outcome) -> Option<Outcome> {
        debug!(?outcome, turns = self.turns, "tactical encounter finished");
        self.outcome = Some(outcome);
        self.outcome
    }
}
