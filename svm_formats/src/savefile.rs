use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::warn;
use serde::Serialize;

use crate::savegame::{SaveDate, read_save_metadata};
use crate::thumbnail::Thumbnail;

/// Slot reserved for periodic autosaves.
pub const AUTOSAVE_SLOT: u32 = 0;

/// `target.###`
pub fn slot_file_name(target: &str, slot: u32) -> String {
    format!("{target}.{slot:03}")
}

/// Inverse of [`slot_file_name`]; anything but exactly three digits after
/// `target.` is rejected.
pub fn parse_slot(target: &str, file_name: &str) -> Option<u32> {
    let suffix = file_name.strip_prefix(target)?.strip_prefix('.')?;
    if suffix.len() != 3 || !suffix.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    suffix.parse().ok()
}

/// Storage backend for savegame files.
pub trait SaveFileManager {
    /// File names belonging to `target`, in no particular order.
    fn list(&self, target: &str) -> Result<Vec<String>>;
    fn open_for_loading(&self, name: &str) -> Result<Box<dyn Read>>;
    fn open_for_saving(&self, name: &str) -> Result<Box<dyn Write>>;
    fn remove(&self, name: &str) -> Result<()>;
    fn exists(&self, name: &str) -> bool;
}

/// Save files kept as plain files in one directory.
#[derive(Debug, Clone)]
pub struct DirectorySaveFiles {
    root: PathBuf,
}

impl DirectorySaveFiles {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        DirectorySaveFiles {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }
}

impl SaveFileManager for DirectorySaveFiles {
    fn list(&self, target: &str) -> Result<Vec<String>> {
        if !self.root.is_dir() {
            return Ok(Vec::new());
        }
        let prefix = format!("{target}.");
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.root)
            .with_context(|| format!("listing save directory {}", self.root.display()))?
        {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with(&prefix) {
                names.push(name);
            }
        }
        Ok(names)
    }

    fn open_for_loading(&self, name: &str) -> Result<Box<dyn Read>> {
        let path = self.path_for(name);
        let file =
            File::open(&path).with_context(|| format!("opening save file {}", path.display()))?;
        Ok(Box::new(BufReader::new(file)))
    }

    fn open_for_saving(&self, name: &str) -> Result<Box<dyn Write>> {
        fs::create_dir_all(&self.root)
            .with_context(|| format!("creating save directory {}", self.root.display()))?;
        let path = self.path_for(name);
        let file = File::create(&path)
            .with_context(|| format!("creating save file {}", path.display()))?;
        Ok(Box::new(BufWriter::new(file)))
    }

    fn remove(&self, name: &str) -> Result<()> {
        let path = self.path_for(name);
        fs::remove_file(&path).with_context(|| format!("removing save file {}", path.display()))
    }

    fn exists(&self, name: &str) -> bool {
        self.path_for(name).is_file()
    }
}

/// What the launcher shows for one occupied slot.
#[derive(Debug, Clone, Serialize)]
pub struct SaveStateDescriptor {
    pub slot: u32,
    pub description: String,
    pub engine_id: String,
    pub is_autosave: bool,
    pub write_protected: bool,
    pub play_time_secs: u32,
    pub date: Option<SaveDate>,
    #[serde(skip)]
    pub thumbnail: Option<Thumbnail>,
}

/// Enumerates the occupied slots of `target`, skipping unreadable files.
pub fn list_saves(
    manager: &dyn SaveFileManager,
    target: &str,
    max_slot: u32,
) -> Result<Vec<SaveStateDescriptor>> {
    let mut saves = Vec::new();
    for name in manager.list(target)? {
        let Some(slot) = parse_slot(target, &name) else {
            continue;
        };
        if slot > max_slot {
            continue;
        }
        if let Some(descriptor) = describe_slot(manager, &name, slot, true) {
            saves.push(descriptor);
        }
    }
    saves.sort_by_key(|d| d.slot);
    Ok(saves)
}

/// Full metadata of one slot, thumbnail included.
pub fn query_save_meta_infos(
    manager: &dyn SaveFileManager,
    target: &str,
    slot: u32,
) -> Option<SaveStateDescriptor> {
    let name = slot_file_name(target, slot);
    if !manager.exists(&name) {
        return None;
    }
    describe_slot(manager, &name, slot, false)
}

fn describe_slot(
    manager: &dyn SaveFileManager,
    name: &str,
    slot: u32,
    skip_thumbnail: bool,
) -> Option<SaveStateDescriptor> {
    let mut reader = match manager.open_for_loading(name) {
        Ok(reader) => reader,
        Err(err) => {
            warn!("skipping save {name}: {err:#}");
            return None;
        }
    };
    let metadata = match read_save_metadata(&mut reader, skip_thumbnail) {
        Ok(metadata) => metadata,
        Err(err) => {
            warn!("skipping save {name}: {err}");
            return None;
        }
    };
    let is_autosave = slot == AUTOSAVE_SLOT;
    Some(SaveStateDescriptor {
        slot,
        description: metadata.header.description,
        engine_id: metadata.header.engine_id,
        is_autosave,
        write_protected: is_autosave,
        play_time_secs: metadata.info.play_time_secs,
        date: (!metadata.info.date.is_unset()).then_some(metadata.info.date),
        thumbnail: metadata.thumbnail,
    })
}
