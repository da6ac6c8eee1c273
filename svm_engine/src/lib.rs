pub mod cli;
pub mod config;
pub mod context;
pub mod detection;
pub mod engines;
pub mod error;
pub mod launcher;
pub mod plugin;
pub mod rng;
pub mod runtime;
pub mod system;
pub mod timer;

pub use config::{ConfigManager, ConfigValue, GLOBAL_DOMAIN};
pub use context::{EngineContext, SlotPolicy};
pub use detection::{DetectionReport, GameDescription, GameFlags};
pub use error::EngineError;
pub use plugin::{Engine, EngineRequest, MetaEngine, PluginRegistry};
pub use rng::RandomSource;
pub use runtime::{run_engine, QuitReason, RunOptions, RunSummary};
pub use system::{Clock, EventSource, ScriptedEvents, VirtualClock};
