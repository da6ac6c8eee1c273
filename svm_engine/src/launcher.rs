//! Subcommand implementations behind the `svm` binary.

use std::{fs, path::Path};

use anyhow::{bail, Context, Result};
use log::{info, warn};
use svm_keymap::{Keymap, Keymapper};

use crate::cli::{Cli, Command, RunArgs};
use crate::config::{keymap_override_key, keys, ConfigManager};
use crate::context::{EngineContext, SlotPolicy};
use crate::detection::GameFlags;
use crate::error::EngineError;
use crate::plugin::{MetaEngine, PluginRegistry};
use crate::runtime::{global_keymap, run_engine, RunOptions, RunSummary};
use crate::system::{ScriptedEvents, VirtualClock};

pub fn execute(cli: Cli) -> Result<()> {
    let mut config = ConfigManager::from_json_file(Some(&cli.config))
        .with_context(|| format!("loading config {}", cli.config.display()))?;
    let registry = PluginRegistry::with_static_plugins();

    match cli.command {
        Command::ListEngines => list_engines(&registry),
        Command::Detect { path, json } => detect(&registry, &path, json)?,
        Command::Add { path } => {
            let target = add_game(&mut config, &registry, &path)?;
            config.save()?;
            println!("added target {target}");
        }
        Command::ListSaves { target } => list_saves(config, &registry, &target)?,
        Command::RemoveSave { target, slot } => {
            let ctx = EngineContext::for_target(config, &target)?;
            let meta = meta_engine(&registry, &ctx)?;
            meta.remove_save(ctx.saves.as_ref(), &target, slot)?;
            println!("removed slot {slot} of {target}");
        }
        Command::Keymaps { target } => print_keymaps(&config, &registry, &target)?,
        Command::Run(args) => {
            let summary = launch(config, &registry, &args)?;
            println!(
                "{}: {} frames, {:?}, {}s played",
                args.target, summary.frames, summary.quit_reason, summary.play_time_secs
            );
        }
    }
    Ok(())
}

fn list_engines(registry: &PluginRegistry) {
    for plugin in registry.plugins() {
        println!("{} - {} ({})", plugin.engine_id(), plugin.name(), plugin.copyright());
        for game in plugin.games() {
            let flags = game.flags.names();
            if flags.is_empty() {
                println!("  {:<14} {}", game.game_id, game.title);
            } else {
                println!("  {:<14} {} [{}]", game.game_id, game.title, flags.join(", "));
            }
        }
    }
}

fn detect(registry: &PluginRegistry, path: &Path, json: bool) -> Result<()> {
    let report = registry.detect_all(path)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }
    if report.matches.is_empty() {
        println!("no known game in {}", path.display());
    }
    for game in &report.matches {
        println!(
            "{}:{} - {} ({}/{})",
            game.engine_id, game.game_id, game.title, game.language, game.platform
        );
    }
    for unknown in &report.unknown {
        println!(
            "partial match {}:{}, missing {}",
            unknown.engine_id,
            unknown.game_id,
            unknown.missing.join(", ")
        );
    }
    Ok(())
}

/// Detects the game in `path` and writes a new target for it. Returns the
/// target name.
pub fn add_game(config: &mut ConfigManager, registry: &PluginRegistry, path: &Path) -> Result<String> {
    let report = registry.detect_all(path)?;
    let Some(game) = report.best() else {
        bail!("no supported game found in {}", path.display());
    };
    let game_path = fs::canonicalize(path)
        .with_context(|| format!("resolving {}", path.display()))?;

    let target = config.add_target(game.game_id);
    config.write_string(&target, keys::ENGINE_ID, game.engine_id);
    config.write_string(&target, keys::GAME_ID, game.game_id);
    config.write_string(&target, keys::DESCRIPTION, game.title);
    config.write_string(&target, keys::PATH, game_path.display().to_string());
    config.write_string(&target, keys::EXTRA, game.extra);
    config.write_string(&target, keys::LANGUAGE, game.language);
    config.write_string(&target, keys::PLATFORM, game.platform);
    info!("added {} as target {target}", game.title);
    Ok(target)
}

fn meta_engine<'a>(
    registry: &'a PluginRegistry,
    ctx: &EngineContext,
) -> Result<&'a dyn MetaEngine, EngineError> {
    registry
        .find_engine(&ctx.engine_id)
        .ok_or_else(|| EngineError::UnknownEngine(ctx.engine_id.clone()))
}

fn list_saves(config: ConfigManager, registry: &PluginRegistry, target: &str) -> Result<()> {
    let ctx = EngineContext::for_target(config, target)?;
    let meta = meta_engine(registry, &ctx)?;
    let saves = meta.list_saves(ctx.saves.as_ref(), target)?;
    if saves.is_empty() {
        println!("no saves for {target}");
    }
    for save in saves {
        let date = save
            .date
            .map(|d| format!("{:04}-{:02}-{:02} {:02}:{:02}", d.year, d.month, d.day, d.hour, d.minute))
            .unwrap_or_default();
        println!(
            "{:>3} {:<32} {:>6}s {}{}",
            save.slot,
            save.description,
            save.play_time_secs,
            date,
            if save.is_autosave { " (autosave)" } else { "" }
        );
    }
    Ok(())
}

/// Engine keymaps for a target with the `keymap_<keymap>_<action>` config
/// overrides applied.
pub fn configured_keymaps(
    config: &ConfigManager,
    meta: &dyn MetaEngine,
    target: &str,
    game_id: &str,
) -> Result<Vec<Keymap>, EngineError> {
    let mut keymaps = vec![global_keymap()];
    keymaps.extend(meta.init_keymaps(target, game_id));
    for keymap in &mut keymaps {
        let overrides: Vec<(String, String)> = keymap
            .actions()
            .iter()
            .filter_map(|action| {
                config
                    .read_string(target, &keymap_override_key(&keymap.id, &action.id))
                    .map(|list| (action.id.clone(), list.to_string()))
            })
            .collect();
        for (action, list) in overrides {
            match Keymapper::parse_input_list(&list) {
                Ok(inputs) => keymap.set_bindings(&action, inputs)?,
                Err(err) => warn!("ignoring binding override for {}/{action}: {err}", keymap.id),
            }
        }
    }
    Ok(keymaps)
}

fn print_keymaps(config: &ConfigManager, registry: &PluginRegistry, target: &str) -> Result<()> {
    let engine_id = config
        .read_string(target, keys::ENGINE_ID)
        .ok_or_else(|| EngineError::UnknownTarget(target.to_string()))?;
    let game_id = config.read_string(target, keys::GAME_ID).unwrap_or_default();
    let meta = registry
        .find_engine(engine_id)
        .ok_or_else(|| EngineError::UnknownEngine(engine_id.to_string()))?;
    for keymap in configured_keymaps(config, meta, target, game_id)? {
        println!("{} ({})", keymap.id, keymap.description);
        for action in keymap.actions() {
            println!(
                "  {:<14} {:<28} {}",
                action.id,
                action.description,
                Keymapper::format_input_list(action.inputs())
            );
        }
    }
    Ok(())
}

/// Builds the context for `args.target`, creates the engine and runs it.
pub fn launch(config: ConfigManager, registry: &PluginRegistry, args: &RunArgs) -> Result<RunSummary> {
    let mut ctx = EngineContext::for_target(config, &args.target)?;
    let meta = meta_engine(registry, &ctx)?;
    let game = meta
        .find_game(&ctx.game_id)
        .ok_or_else(|| EngineError::UnsupportedGameId(ctx.game_id.clone()))?;
    if game.flags.contains(GameFlags::UNSUPPORTED) {
        return Err(EngineError::UnsupportedGame(game.game_id.to_string()).into());
    }

    ctx.slots = SlotPolicy {
        max_slot: meta.max_save_slot(),
        autosave_slot: meta.autosave_slot(),
    };
    for keymap in configured_keymaps(&ctx.config, meta, &args.target, game.game_id)? {
        ctx.keymapper.add_keymap(keymap)?;
    }
    if let Some(script) = args.script.as_deref() {
        let events = ScriptedEvents::from_path(script)?;
        info!("replaying {} scripted events from {}", events.len(), script.display());
        ctx = ctx
            .with_events(Box::new(events))
            .with_clock(Box::new(VirtualClock::new()));
    }

    let mut engine = meta.create_instance(&mut ctx, game)?;
    let options = RunOptions {
        max_frames: args.max_frames,
        save_slot: args.save_slot,
    };
    let summary = run_engine(&mut ctx, engine.as_mut(), &options)?;

    if let Some(path) = args.state_json.as_deref() {
        let json = serde_json::to_string_pretty(&summary)?;
        fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
    }
    Ok(summary)
}
