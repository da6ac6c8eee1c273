//! Engine plugin interfaces and the registry of compiled-in plugins.

use std::path::Path;

use anyhow::{Context, Result};
use log::{info, warn};
use svm_formats::{
    list_saves, query_save_meta_infos, scan_directory, slot_file_name, SaveFileManager,
    SaveStateDescriptor, Thumbnail, AUTOSAVE_SLOT,
};
use svm_keymap::{Event, Keymap};

use crate::context::{EngineContext, DEFAULT_MAX_SAVE_SLOT};
use crate::detection::{detect, DetectionReport, GameDescription};
use crate::engines;
use crate::error::EngineError;

/// Directory depth searched when detecting games.
pub const DETECTION_DEPTH: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetaEngineFeature {
    SupportsListSaves,
    SupportsLoadingDuringStartup,
    SupportsDeleteSave,
    SavesSupportMetaInfo,
    SavesSupportThumbnail,
    SavesSupportCreationDate,
    SavesSupportPlayTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineFeature {
    SupportsReturnToLauncher,
    SupportsLoadingDuringRuntime,
    SupportsSavingDuringRuntime,
}

/// Requests an engine hands back to the run loop from `handle_event`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineRequest {
    QuickSave,
    QuickLoad,
    ReturnToLauncher,
}

/// Per engine family: detection table, save listing, keymaps and the
/// factory for running instances.
pub trait MetaEngine {
    fn engine_id(&self) -> &'static str;
    fn name(&self) -> &'static str;
    fn copyright(&self) -> &'static str;
    fn games(&self) -> &'static [GameDescription];
    fn has_feature(&self, feature: MetaEngineFeature) -> bool;

    fn max_save_slot(&self) -> u32 {
        DEFAULT_MAX_SAVE_SLOT
    }

    fn autosave_slot(&self) -> Option<u32> {
        Some(AUTOSAVE_SLOT)
    }

    fn create_instance(
        &self,
        ctx: &mut EngineContext,
        game: &GameDescription,
    ) -> Result<Box<dyn Engine>, EngineError>;

    /// Default keymaps for `game_id`; config overrides are applied by the
    /// launcher.
    fn init_keymaps(&self, target: &str, game_id: &str) -> Vec<Keymap>;

    fn find_game(&self, game_id: &str) -> Option<&'static GameDescription> {
        self.games().iter().find(|g| g.game_id == game_id)
    }

    fn list_saves(
        &self,
        saves: &dyn SaveFileManager,
        target: &str,
    ) -> Result<Vec<SaveStateDescriptor>, EngineError> {
        if !self.has_feature(MetaEngineFeature::SupportsListSaves) {
            return Ok(Vec::new());
        }
        let mut listed = list_saves(saves, target, self.max_save_slot())
            .map_err(|err| EngineError::reading(format!("save list of {target}"), err))?;
        for save in &mut listed {
            let is_autosave = self.autosave_slot() == Some(save.slot);
            save.is_autosave = is_autosave;
            save.write_protected = is_autosave;
        }
        Ok(listed)
    }

    fn query_save_meta_infos(
        &self,
        saves: &dyn SaveFileManager,
        target: &str,
        slot: u32,
    ) -> Option<SaveStateDescriptor> {
        if !self.has_feature(MetaEngineFeature::SavesSupportMetaInfo) || slot > self.max_save_slot()
        {
            return None;
        }
        let mut meta = query_save_meta_infos(saves, target, slot)?;
        meta.is_autosave = self.autosave_slot() == Some(slot);
        meta.write_protected = meta.is_autosave;
        if !self.has_feature(MetaEngineFeature::SavesSupportThumbnail) {
            meta.thumbnail = None;
        }
        Some(meta)
    }

    fn remove_save(
        &self,
        saves: &dyn SaveFileManager,
        target: &str,
        slot: u32,
    ) -> Result<(), EngineError> {
        if !self.has_feature(MetaEngineFeature::SupportsDeleteSave) {
            return Err(EngineError::WriteProtected(slot));
        }
        if slot > self.max_save_slot() {
            return Err(EngineError::InvalidSlot {
                slot,
                max: self.max_save_slot(),
            });
        }
        if self.autosave_slot() == Some(slot) {
            return Err(EngineError::WriteProtected(slot));
        }
        let name = slot_file_name(target, slot);
        saves
            .remove(&name)
            .map_err(|err| EngineError::writing(format!("removing {name}"), err))?;
        info!("removed save {name}");
        Ok(())
    }
}

/// One running game.
pub trait Engine {
    fn has_feature(&self, feature: EngineFeature) -> bool;

    /// Feeds one keymapped event to the game.
    fn handle_event(
        &mut self,
        ctx: &mut EngineContext,
        event: &Event,
    ) -> Result<Option<EngineRequest>, EngineError>;

    /// Advances the game to the context clock's current time.
    fn tick(&mut self, ctx: &mut EngineContext) -> Result<(), EngineError>;

    fn should_quit(&self) -> bool;

    /// Frame pacing for the run loop.
    fn frame_interval_ms(&self) -> u64 {
        20
    }

    fn can_save_game_state_currently(&self) -> bool;
    fn can_load_game_state_currently(&self) -> bool;

    fn save_state_payload(&self, ctx: &EngineContext) -> Result<Vec<u8>, EngineError>;
    fn load_state_payload(
        &mut self,
        ctx: &mut EngineContext,
        payload: &[u8],
    ) -> Result<(), EngineError>;

    fn thumbnail(&self) -> Option<Thumbnail>;

    /// Seconds played, including time restored from a save.
    fn total_play_time(&self) -> u32;
    fn set_total_play_time(&mut self, secs: u32);

    fn status_snapshot(&self) -> serde_json::Value;
}

/// Compiled-in plugins keyed by engine id, in registration order.
#[derive(Default)]
pub struct PluginRegistry {
    plugins: Vec<Box<dyn MetaEngine>>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_static_plugins() -> Self {
        let mut registry = Self::new();
        for plugin in engines::static_plugins() {
            registry.register(plugin);
        }
        registry
    }

    /// Registers `plugin`; a later plugin with the same id is ignored.
    pub fn register(&mut self, plugin: Box<dyn MetaEngine>) {
        if self.find_engine(plugin.engine_id()).is_some() {
            warn!("ignoring duplicate engine plugin {}", plugin.engine_id());
            return;
        }
        info!(
            "registered engine {} ({} games)",
            plugin.engine_id(),
            plugin.games().len()
        );
        self.plugins.push(plugin);
    }

    pub fn plugins(&self) -> impl Iterator<Item = &dyn MetaEngine> {
        self.plugins.iter().map(|p| -> &dyn MetaEngine { p.as_ref() })
    }

    pub fn find_engine(&self, engine_id: &str) -> Option<&dyn MetaEngine> {
        self.plugins().find(|p| p.engine_id() == engine_id)
    }

    pub fn find_game(
        &self,
        game_id: &str,
    ) -> Result<(&dyn MetaEngine, &'static GameDescription), EngineError> {
        self.plugins()
            .find_map(|p| p.find_game(game_id).map(|g| (p, g)))
            .ok_or_else(|| EngineError::UnsupportedGameId(game_id.to_string()))
    }

    pub fn detect_all(&self, path: &Path) -> Result<DetectionReport> {
        let scan = scan_directory(path, DETECTION_DEPTH)
            .with_context(|| format!("scanning {} for games", path.display()))?;
        let mut report = DetectionReport::default();
        for plugin in self.plugins() {
            report.extend(detect(plugin.engine_id(), plugin.games(), &scan)?);
        }
        report
            .matches
            .sort_by(|a, b| b.matched_files.cmp(&a.matched_files));
        Ok(report)
    }
}
