/// Events emitted during a simulation step.
/// The presentation layer consumes these for effects and the log.

use crate::domain::ai::EnemyKind;
use crate::domain::entity::EntityId;
use crate::domain::rules::Ending;
use super::tactical::Outcome;

#[derive(Clone, Debug, PartialEq)]
pub enum GameEvent {
    StageLoaded { index: usize },
    EnemySpawned { id: EntityId, kind: EnemyKind },
    EnemyHit { id: EntityId, damage: i32 },
    EnemyDefeated { id: EntityId, kind: EnemyKind },
    SlimeSplit { parent: EntityId, child: EntityId },
    PlayerHit { damage: i32 },
    PlayerDodged,
    PlayerSnared,
    PlayerDied { lives_left: i32 },
    PlayerRespawned,
    ItemDropped { x: f32, y: f32 },
    ItemPicked { name: String },
    CheckpointActivated { index: usize },
    GuideCutscene,
    GuideHelped,
    GuideBefriended,
    GuideBetrayed,
    BossHit { damage: i32 },
    BossDefeated,
    TacticalStarted { enemies: usize },
    TacticalEnded { outcome: Outcome },
    StageCleared { index: usize },
    GameEnded { ending: Ending },
}
