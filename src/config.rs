/// External configuration loader.
///
/// Reads `config.toml` from the executable's directory (or CWD).
/// Falls back to defaults if the file is missing or incomplete; a file
/// that fails to parse is reported and ignored.

use serde::Deserialize;
use std::path::PathBuf;
use tracing::{info, warn};

use crate::error::ConfigError;

// ── Public Config Structs ──

#[derive(Deserialize, Clone, Debug, Default)]
pub struct GameConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub physics: PhysicsConfig,
    #[serde(default)]
    pub combat: CombatConfig,
    #[serde(default)]
    pub spawn: SpawnConfig,
    #[serde(default)]
    pub progression: ProgressionConfig,
    #[serde(default)]
    pub tactical: TacticalConfig,
}

#[derive(Deserialize, Clone, Debug)]
pub struct GeneralConfig {
    /// 0 = seed from the clock.
    #[serde(default = "default_seed")]
    pub seed: u64,
    #[serde(default = "default_tick_rate")]
    pub tick_rate_ms: u64,
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
    #[serde(default = "default_log_dir")]
    pub log_dir: String,
}

/// Units: px, seconds, px/s, px/s².
#[derive(Deserialize, Clone, Debug)]
pub struct PhysicsConfig {
    #[serde(default = "default_gravity")]
    pub gravity: f32,
    #[serde(default = "default_terminal_velocity")]
    pub terminal_velocity: f32,
    #[serde(default = "default_player_speed")]
    pub player_speed: f32,
    #[serde(default = "default_jump_speed")]
    pub jump_speed: f32,
    #[serde(default = "default_coyote_time")]
    pub coyote_time: f32,
    #[serde(default = "default_tile_size")]
    pub tile_size: f32,
}

#[derive(Deserialize, Clone, Debug)]
pub struct CombatConfig {
    #[serde(default = "default_hitstop")]
    pub hitstop: f32,
    #[serde(default = "default_player_hit_grace")]
    pub player_hit_grace: f64,
    #[serde(default = "default_spawn_protection")]
    pub spawn_protection: f64,
    #[serde(default = "default_knockback_offset")]
    pub knockback_offset: f32,
    #[serde(default = "default_knockback_impulse")]
    pub knockback_impulse: f32,
    #[serde(default = "default_shake_on_hit")]
    pub shake_on_hit: f32,
    #[serde(default = "default_shake_decay")]
    pub shake_decay: f32,
    #[serde(default = "default_number_lifetime")]
    pub damage_number_lifetime: f32,
}

#[derive(Deserialize, Clone, Debug)]
pub struct SpawnConfig {
    #[serde(default = "default_spawn_cooldown")]
    pub spawn_cooldown: f64,
    #[serde(default = "default_min_spawn_distance")]
    pub min_spawn_distance: f32,
    #[serde(default = "default_spawn_attempts")]
    pub spawn_attempts: u32,
    #[serde(default = "default_initial_enemies")]
    pub initial_enemies: usize,
    #[serde(default = "default_base_max_enemies")]
    pub base_max_enemies: usize,
    #[serde(default = "default_max_enemies_per_stage")]
    pub max_enemies_per_stage: usize,
}

#[derive(Deserialize, Clone, Debug)]
pub struct ProgressionConfig {
    #[serde(default = "default_lives")]
    pub lives: i32,
    #[serde(default = "default_respawn_delay")]
    pub respawn_delay: f64,
    #[serde(default = "default_checkpoint_count")]
    pub checkpoint_count: usize,
    #[serde(default = "default_base_quota")]
    pub base_quota: u32,
    #[serde(default = "default_quota_per_stage")]
    pub quota_per_stage: u32,
    #[serde(default = "default_exit_margin")]
    pub exit_margin: f32,
    #[serde(default = "default_guide_trigger")]
    pub guide_trigger_distance: f32,
    #[serde(default = "default_cutscene_duration")]
    pub cutscene_duration: f64,
    #[serde(default = "default_view_width")]
    pub view_width: f32,
}

#[derive(Deserialize, Clone, Debug)]
pub struct TacticalConfig {
    #[serde(default = "default_proximity")]
    pub proximity: f32,
    #[serde(default = "default_max_participants")]
    pub max_participants: usize,
    #[serde(default = "default_max_turns")]
    pub max_turns: u32,
}

// ── Defaults ──

fn default_seed() -> u64 { 41 }
fn default_tick_rate() -> u64 { 16 }
fn default_log_filter() -> String { "info".into() }
fn default_log_dir() -> String { "logs".into() }

fn default_gravity() -> f32 { 2160.0 }           // 0.6 px/frame² at 60 Hz
fn default_terminal_velocity() -> f32 { 720.0 }  // 12 px/frame
fn default_player_speed() -> f32 { 132.0 }
fn default_jump_speed() -> f32 { 540.0 }
fn default_coyote_time() -> f32 { 0.1 }
fn default_tile_size() -> f32 { 48.0 }

fn default_hitstop() -> f32 { 0.06 }
fn default_player_hit_grace() -> f64 { 0.6 }
fn default_spawn_protection() -> f64 { 2.0 }
fn default_knockback_offset() -> f32 { 4.0 }
fn default_knockback_impulse() -> f32 { 240.0 }
fn default_shake_on_hit() -> f32 { 3.0 }
fn default_shake_decay() -> f32 { 24.0 }
fn default_number_lifetime() -> f32 { 1.0 }

fn default_spawn_cooldown() -> f64 { 2.0 }
fn default_min_spawn_distance() -> f32 { 200.0 }
fn default_spawn_attempts() -> u32 { 10 }
fn default_initial_enemies() -> usize { 3 }
fn default_base_max_enemies() -> usize { 6 }
fn default_max_enemies_per_stage() -> usize { 2 }

fn default_lives() -> i32 { 3 }
fn default_respawn_delay() -> f64 { 2.0 }
fn default_checkpoint_count() -> usize { 2 }
fn default_base_quota() -> u32 { 6 }
fn default_quota_per_stage() -> u32 { 3 }
fn default_exit_margin() -> f32 { 60.0 }
fn default_guide_trigger() -> f32 { 96.0 }
fn default_cutscene_duration() -> f64 { 1.4 }
fn default_view_width() -> f32 { 640.0 }

fn default_proximity() -> f32 { 160.0 }
fn default_max_participants() -> usize { 4 }
fn default_max_turns() -> u32 { 100 }

impl Default for GeneralConfig {
    fn default() -> Self {
        GeneralConfig {
            seed: default_seed(),
            tick_rate_ms: default_tick_rate(),
            log_filter: default_log_filter(),
            log_dir: default_log_dir(),
        }
    }
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        PhysicsConfig {
            gravity: default_gravity(),
            terminal_velocity: default_terminal_velocity(),
            player_speed: default_player_speed(),
            jump_speed: default_jump_speed(),
            coyote_time: default_coyote_time(),
            tile_size: default_tile_size(),
        }
    }
}

impl Default for CombatConfig {
    fn default() -> Self {
        CombatConfig {
            hitstop: default_hitstop(),
            player_hit_grace: default_player_hit_grace(),
            spawn_protection: default_spawn_protection(),
            knockback_offset: default_knockback_offset(),
            knockback_impulse: default_knockback_impulse(),
            shake_on_hit: default_shake_on_hit(),
            shake_decay: default_shake_decay(),
            damage_number_lifetime: default_number_lifetime(),
        }
    }
}

impl Default for SpawnConfig {
    fn default() -> Self {
        SpawnConfig {
            spawn_cooldown: default_spawn_cooldown(),
            min_spawn_distance: default_min_spawn_distance(),
            spawn_attempts: default_spawn_attempts(),
            initial_enemies: default_initial_enemies(),
            base_max_enemies: default_base_max_enemies(),
            max_enemies_per_stage: default_max_enemies_per_stage(),
        }
    }
}

impl Default for ProgressionConfig {
    fn default() -> Self {
        ProgressionConfig {
            lives: default_lives(),
            respawn_delay: default_respawn_delay(),
            checkpoint_count: default_checkpoint_count(),
            base_quota: default_base_quota(),
            quota_per_stage: default_quota_per_stage(),
            exit_margin: default_exit_margin(),
            guide_trigger_distance: default_guide_trigger(),
            cutscene_duration: default_cutscene_duration(),
            view_width: default_view_width(),
        }
    }
}

impl Default for TacticalConfig {
    fn default() -> Self {
        TacticalConfig {
            proximity: default_proximity(),
            max_participants: default_max_participants(),
            max_turns: default_max_turns(),
        }
    }
}

// ── Loading ──

/// Where the active config came from. Reading happens before the log
/// subscriber exists (the config names the log directory), so the outcome
/// is kept and reported once logging is up.
#[derive(Debug)]
pub enum ConfigSource {
    Defaults,
    File(PathBuf),
    Rejected { path: PathBuf, error: ConfigError },
}

impl ConfigSource {
    pub fn report(&self) {
        match self {
            ConfigSource::Defaults => info!("no config.toml found, using defaults"),
            ConfigSource::File(path) => info!(path = %path.display(), "loaded config"),
            ConfigSource::Rejected { path, error } => {
                warn!(path = %path.display(), error = %error, "config ignored, using defaults")
            }
        }
    }
}

impl GameConfig {
    /// Read `config.toml` without logging.
    /// Search order: (1) exe directory, (2) current working directory.
    /// Missing file or missing keys fall back to defaults.
    pub fn read() -> (Self, ConfigSource) {
        for dir in candidate_dirs() {
            let path = dir.join("config.toml");
            if path.exists() {
                return Self::read_file(path);
            }
        }
        (GameConfig::default(), ConfigSource::Defaults)
    }

    /// Read one file; a broken file yields defaults plus the error.
    pub fn read_file(path: PathBuf) -> (Self, ConfigSource) {
        match Self::from_path(&path) {
            Ok(cfg) => (cfg, ConfigSource::File(path)),
            Err(error) => (GameConfig::default(), ConfigSource::Rejected { path, error }),
        }
    }

    pub fn from_path(path: &std::path::Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str::<GameConfig>(text)?)
    }
}

/// Candidate directories to search: exe dir + CWD (deduplicated).
fn candidate_dirs() -> Vec<PathBuf> {
    let mut dirs = vec![];

    if let Ok(exe) = std::env::current_exe() {
        let resolved = exe.canonicalize().unwrap_or(exe);
        if let Some(parent) = resolved.parent() {
            dirs.push(parent.to_path_buf());
        }
    }

    if let Ok(cwd) = std::env::current_dir() {
        if !dirs.iter().any(|d| d == &cwd) {
            dirs.push(cwd);
        }
    }

    if dirs.is_empty() {
        dirs.push(PathBuf::from("."));
    }

    dirs
}
