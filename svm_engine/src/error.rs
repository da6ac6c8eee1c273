use std::path::PathBuf;

use svm_keymap::KeymapError;
use thiserror::Error;

/// Failures surfaced by the launcher, the run loop and the engines.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("no engine knows game id '{0}'")]
    UnsupportedGameId(String),
    #[error("game '{0}' was detected but is not supported")]
    UnsupportedGame(String),
    #[error("no engine registered under id '{0}'")]
    UnknownEngine(String),
    #[error("target '{0}' is not configured")]
    UnknownTarget(String),
    #[error("required game data file {} is missing", .0.display())]
    NoGameData(PathBuf),
    #[error("reading failed: {0}")]
    ReadingFailed(String),
    #[error("writing failed: {0}")]
    WritingFailed(String),
    #[error("save slot {slot} is outside 0..={max}")]
    InvalidSlot { slot: u32, max: u32 },
    #[error("save slot {0} is write protected")]
    WriteProtected(u32),
    #[error("the game cannot be saved right now")]
    SaveNotAllowed,
    #[error("a saved game cannot be loaded right now")]
    LoadNotAllowed,
    #[error("malformed game data: {0}")]
    GameData(String),
    #[error(transparent)]
    Keymap(#[from] KeymapError),
}

impl EngineError {
    pub(crate) fn reading(context: impl std::fmt::Display, err: impl std::fmt::Display) -> Self {
        EngineError::ReadingFailed(format!("{context}: {err:#}"))
    }

    pub(crate) fn writing(context: impl std::fmt::Display, err: impl std::fmt::Display) -> Self {
        EngineError::WritingFailed(format!("{context}: {err:#}"))
    }
}
