/// Error types.
///
/// Nothing here is fatal to a run: config errors fall back to defaults and
/// action errors are shown to the player, who simply tries again.

use thiserror::Error;

/// Problems reading `config.toml`.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// A player action that cannot be carried out as requested.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ActionError {
    #[error("Invalid item index.")]
    InvalidIndex { index: usize, len: usize },

    #[error("No enemy left to target.")]
    NoTarget,

    #[error("The encounter is already over.")]
    EncounterOver,
}
