use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::de::DeserializeOwned;
use svm_formats::{DirectorySaveFiles, SaveFileManager, AUTOSAVE_SLOT};
use svm_keymap::Keymapper;

use crate::config::{keys, ConfigManager};
use crate::error::EngineError;
use crate::rng::RandomSource;
use crate::system::{Clock, EventSource, NullEvents, SystemClock};

pub const DEFAULT_MAX_SAVE_SLOT: u32 = 99;
const DEFAULT_SAVE_DIR: &str = "saves";

/// Which slots a target may write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotPolicy {
    pub max_slot: u32,
    pub autosave_slot: Option<u32>,
}

impl Default for SlotPolicy {
    fn default() -> Self {
        SlotPolicy {
            max_slot: DEFAULT_MAX_SAVE_SLOT,
            autosave_slot: Some(AUTOSAVE_SLOT),
        }
    }
}

/// Everything a running engine may touch outside its own state. Passed by
/// `&mut` into every engine call.
pub struct EngineContext {
    pub target: String,
    pub engine_id: String,
    pub game_id: String,
    pub game_path: PathBuf,
    pub config: ConfigManager,
    pub saves: Box<dyn SaveFileManager>,
    pub clock: Box<dyn Clock>,
    pub events: Box<dyn EventSource>,
    pub keymapper: Keymapper,
    pub rng: RandomSource,
    pub slots: SlotPolicy,
}

impl EngineContext {
    /// Builds a context from the target's config domain with a wall clock,
    /// no input and directory-backed saves.
    pub fn for_target(config: ConfigManager, target: &str) -> Result<Self, EngineError> {
        if !config.has_domain(target) {
            return Err(EngineError::UnknownTarget(target.to_string()));
        }
        let required = |key: &str| {
            config
                .read_string(target, key)
                .map(str::to_string)
                .ok_or_else(|| EngineError::GameData(format!("target {target} has no {key}")))
        };
        let engine_id = required(keys::ENGINE_ID)?;
        let game_id = required(keys::GAME_ID)?;
        let game_path = PathBuf::from(required(keys::PATH)?);
        let save_dir = config
            .read_string(target, keys::SAVE_PATH)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SAVE_DIR));
        let seed = config
            .read_int(target, keys::RANDOM_SEED)
            .map(|seed| seed as u64);

        Ok(EngineContext {
            target: target.to_string(),
            engine_id,
            game_id,
            game_path,
            rng: RandomSource::for_target(target, seed),
            config,
            saves: Box::new(DirectorySaveFiles::new(save_dir)),
            clock: Box::new(SystemClock::new()),
            events: Box::new(NullEvents),
            keymapper: Keymapper::new(),
            slots: SlotPolicy::default(),
        })
    }

    pub fn with_clock(mut self, clock: Box<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_events(mut self, events: Box<dyn EventSource>) -> Self {
        self.events = events;
        self
    }

    pub fn with_saves(mut self, saves: Box<dyn SaveFileManager>) -> Self {
        self.saves = saves;
        self
    }

    pub fn now(&self) -> u64 {
        self.clock.millis()
    }

    pub fn game_file(&self, name: &str) -> PathBuf {
        self.game_path.join(name)
    }

    /// Loads one of the game's JSON data files.
    pub fn load_game_json<T: DeserializeOwned>(&self, name: &str) -> Result<T, EngineError> {
        load_json(&self.game_file(name))
    }

    pub fn config_int(&self, key: &str) -> Option<i64> {
        self.config.read_int(&self.target, key)
    }
}

pub(crate) fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T, EngineError> {
    if !path.is_file() {
        return Err(EngineError::NoGameData(path.to_path_buf()));
    }
    let raw = fs::read_to_string(path).map_err(|err| EngineError::reading(path.display(), err))?;
    serde_json::from_str(&raw)
        .map_err(|err| EngineError::GameData(format!("{}: {err}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_target_is_reported() {
        let config = ConfigManager::default();
        assert!(matches!(
            EngineContext::for_target(config, "nowhere"),
            Err(EngineError::UnknownTarget(t)) if t == "nowhere"
        ));
    }

    #[test]
    fn context_reads_target_domain() {
        let mut config = ConfigManager::default();
        config.write_string("eob", keys::ENGINE_ID, "eob");
        config.write_string("eob", keys::GAME_ID, "eob");
        config.write_string("eob", keys::PATH, "/games/eob");
        config.write_int("eob", keys::RANDOM_SEED, 5);
        let ctx = EngineContext::for_target(config, "eob").unwrap();
        assert_eq!(ctx.game_file("eob.json"), PathBuf::from("/games/eob/eob.json"));
        assert_eq!(ctx.rng.seed(), 5);
        assert_eq!(ctx.slots, SlotPolicy::default());
    }

    #[test]
    fn incomplete_target_is_game_data_error() {
        let mut config = ConfigManager::default();
        config.write_string("eob", keys::ENGINE_ID, "eob");
        assert!(matches!(
            EngineContext::for_target(config, "eob"),
            Err(EngineError::GameData(_))
        ));
    }
}
