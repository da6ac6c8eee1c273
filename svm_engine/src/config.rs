use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use anyhow::{anyhow, Context, Result};
use log::warn;
use serde::Deserialize;
use serde_json::{Map, Number, Value};

/// Domain holding settings shared by every target.
pub const GLOBAL_DOMAIN: &str = "svm";

pub mod keys {
    pub const ENGINE_ID: &str = "engineid";
    pub const GAME_ID: &str = "gameid";
    pub const DESCRIPTION: &str = "description";
    pub const PATH: &str = "path";
    pub const EXTRA: &str = "extra";
    pub const LANGUAGE: &str = "language";
    pub const PLATFORM: &str = "platform";
    pub const SAVE_PATH: &str = "savepath";
    pub const SAVE_SLOT: &str = "save_slot";
    pub const AUTOSAVE_PERIOD: &str = "autosave_period";
    pub const RANDOM_SEED: &str = "random_seed";
    pub const QUICK_SLOT: &str = "quick_slot";
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum JsonPrimitive {
    String(String),
    Int(i64),
    Bool(bool),
    Float(f64),
    Null,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValue {
    String(String),
    Int(i64),
    Bool(bool),
    Float(f64),
    Null,
}

impl From<JsonPrimitive> for ConfigValue {
    fn from(value: JsonPrimitive) -> Self {
        match value {
            JsonPrimitive::String(s) => ConfigValue::String(s),
            JsonPrimitive::Int(i) => ConfigValue::Int(i),
            JsonPrimitive::Bool(b) => ConfigValue::Bool(b),
            JsonPrimitive::Float(f) => ConfigValue::Float(f),
            JsonPrimitive::Null => ConfigValue::Null,
        }
    }
}

type Domain = BTreeMap<String, ConfigValue>;

/// JSON-backed settings store: one domain per configured target plus the
/// global domain.
#[derive(Debug, Default, Clone)]
pub struct ConfigManager {
    domains: BTreeMap<String, Domain>,
    dirty: bool,
    backing_path: Option<PathBuf>,
}

impl ConfigManager {
    pub fn from_json_file(path: Option<&Path>) -> Result<Self> {
        let mut config = ConfigManager {
            domains: BTreeMap::new(),
            dirty: false,
            backing_path: path.map(|p| p.to_path_buf()),
        };
        if let Some(p) = path {
            if p.exists() {
                let raw = fs::read_to_string(p)
                    .with_context(|| format!("failed to read config file: {}", p.display()))?;
                let parsed: BTreeMap<String, BTreeMap<String, JsonPrimitive>> =
                    serde_json::from_str(&raw)
                        .with_context(|| format!("failed to parse config json: {}", p.display()))?;
                for (domain, values) in parsed {
                    config.domains.insert(
                        domain,
                        values
                            .into_iter()
                            .map(|(k, v)| (k, ConfigValue::from(v)))
                            .collect(),
                    );
                }
            }
        }
        Ok(config)
    }

    pub fn has_domain(&self, domain: &str) -> bool {
        self.domains.contains_key(domain)
    }

    /// Configured targets, i.e. every domain but the global one.
    pub fn targets(&self) -> impl Iterator<Item = &str> {
        self.domains
            .keys()
            .map(String::as_str)
            .filter(|d| *d != GLOBAL_DOMAIN)
    }

    /// Value of `key` in `domain`, falling back to the global domain.
    pub fn get(&self, domain: &str, key: &str) -> Option<&ConfigValue> {
        self.domains
            .get(domain)
            .and_then(|d| d.get(key))
            .or_else(|| {
                if domain == GLOBAL_DOMAIN {
                    None
                } else {
                    self.domains.get(GLOBAL_DOMAIN).and_then(|d| d.get(key))
                }
            })
    }

    pub fn read_string(&self, domain: &str, key: &str) -> Option<&str> {
        match self.get(domain, key) {
            Some(ConfigValue::String(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Integers stored as strings are accepted, as hand-edited files often
    /// quote them.
    pub fn read_int(&self, domain: &str, key: &str) -> Option<i64> {
        match self.get(domain, key) {
            Some(ConfigValue::Int(i)) => Some(*i),
            Some(ConfigValue::Float(f)) => Some(*f as i64),
            Some(ConfigValue::String(s)) => match s.trim().parse() {
                Ok(value) => Some(value),
                Err(_) => {
                    warn!("ignoring non-numeric value '{s}' for {domain}/{key}");
                    None
                }
            },
            _ => None,
        }
    }

    pub fn read_bool(&self, domain: &str, key: &str) -> Option<bool> {
        match self.get(domain, key) {
            Some(ConfigValue::Bool(b)) => Some(*b),
            Some(ConfigValue::String(s)) => match s.as_str() {
                "true" | "yes" | "1" => Some(true),
                "false" | "no" | "0" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    pub fn read_float(&self, domain: &str, key: &str) -> Option<f64> {
        match self.get(domain, key) {
            Some(ConfigValue::Float(f)) => Some(*f),
            Some(ConfigValue::Int(i)) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn write_string(&mut self, domain: &str, key: impl Into<String>, value: impl Into<String>) {
        self.write_value(domain, key.into(), ConfigValue::String(value.into()));
    }

    pub fn write_int(&mut self, domain: &str, key: impl Into<String>, value: i64) {
        self.write_value(domain, key.into(), ConfigValue::Int(value));
    }

    pub fn write_bool(&mut self, domain: &str, key: impl Into<String>, value: bool) {
        self.write_value(domain, key.into(), ConfigValue::Bool(value));
    }

    pub fn write_float(&mut self, domain: &str, key: impl Into<String>, value: f64) {
        self.write_value(domain, key.into(), ConfigValue::Float(value));
    }

    pub fn write_null(&mut self, domain: &str, key: impl Into<String>) {
        self.write_value(domain, key.into(), ConfigValue::Null);
    }

    pub fn remove(&mut self, domain: &str, key: &str) {
        if let Some(values) = self.domains.get_mut(domain) {
            if values.remove(key).is_some() {
                self.dirty = true;
            }
        }
    }

    pub fn remove_domain(&mut self, domain: &str) -> bool {
        let removed = self.domains.remove(domain).is_some();
        self.dirty |= removed;
        removed
    }

    /// Keys set directly on `domain` (no global fallback), in sorted order.
    pub fn domain_keys(&self, domain: &str) -> Vec<&str> {
        self.domains
            .get(domain)
            .map(|d| d.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Creates an empty domain for a newly added game and returns its name:
    /// the game id itself, or `gameid-N` for the first free `N`.
    pub fn add_target(&mut self, game_id: &str) -> String {
        let mut name = game_id.to_string();
        let mut suffix = 1;
        while self.domains.contains_key(&name) || name == GLOBAL_DOMAIN {
            name = format!("{game_id}-{suffix}");
            suffix += 1;
        }
        self.domains.insert(name.clone(), Domain::new());
        self.dirty = true;
        name
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn set_backing_path(&mut self, path: PathBuf) {
        self.backing_path = Some(path);
    }

    pub fn save(&mut self) -> Result<()> {
        let Some(path) = self.backing_path.as_ref() else {
            self.dirty = false;
            return Ok(());
        };

        if !self.dirty {
            return Ok(());
        }

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).with_context(|| {
                    format!("failed to create config directory: {}", parent.display())
                })?;
            }
        }

        let json_value = self.to_json()?;
        let serialized = serde_json::to_string_pretty(&json_value)
            .with_context(|| format!("failed to serialize config to JSON: {}", path.display()))?;
        fs::write(path, serialized)
            .with_context(|| format!("failed to write config file: {}", path.display()))?;
        self.dirty = false;
        Ok(())
    }

    fn write_value(&mut self, domain: &str, key: String, value: ConfigValue) {
        let values = self.domains.entry(domain.to_string()).or_default();
        let needs_write = match values.get(&key) {
            Some(existing) => existing != &value,
            None => true,
        };
        if needs_write {
            values.insert(key, value);
            self.dirty = true;
        }
    }

    fn to_json(&self) -> Result<Value> {
        let mut root = Map::new();
        for (domain, values) in &self.domains {
            let mut map = Map::new();
            for (key, value) in values {
                map.insert(key.clone(), Self::value_to_json(value)?);
            }
            root.insert(domain.clone(), Value::Object(map));
        }
        Ok(Value::Object(root))
    }

    fn value_to_json(value: &ConfigValue) -> Result<Value> {
        match value {
            ConfigValue::String(s) => Ok(Value::String(s.clone())),
            ConfigValue::Int(i) => Ok(Value::Number((*i).into())),
            ConfigValue::Bool(b) => Ok(Value::Bool(*b)),
            ConfigValue::Float(f) => Number::from_f64(*f)
                .map(Value::Number)
                .ok_or_else(|| anyhow!("unable to serialize NaN/inf float to JSON")),
            ConfigValue::Null => Ok(Value::Null),
        }
    }
}

/// Config key holding the override for one keymap action.
pub fn keymap_override_key(keymap: &str, action: &str) -> String {
    format!("keymap_{keymap}_{action}")
}
