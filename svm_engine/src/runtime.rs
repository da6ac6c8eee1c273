use std::io::Write;

use log::{debug, info, warn};
use serde::Serialize;
use svm_formats::{
    read_savegame, slot_file_name, write_savegame, SaveDate, SaveHeader, SaveInfo,
};
use svm_keymap::{ActionEvent, ActionSpec, Event, Keymap, KeymapKind};

use crate::config::keys;
use crate::context::EngineContext;
use crate::error::EngineError;
use crate::plugin::{Engine, EngineRequest};
use crate::timer::TimerQueue;

pub const GLOBAL_KEYMAP_ID: &str = "svm-global";
pub const DEFAULT_AUTOSAVE_PERIOD_SECS: i64 = 300;
pub const DEFAULT_QUICK_SLOT: u32 = 1;
const AUTOSAVE_DESCRIPTION: &str = "Autosave";

const GLOBAL_ACTIONS: &[ActionSpec] = &[ActionSpec {
    id: "QUIT",
    description: "Quit",
    event: ActionEvent::Quit,
    inputs: &["C+q"],
}];

/// Keymap active for every target, below the engine's own maps.
pub fn global_keymap() -> Keymap {
    Keymap::from_table(KeymapKind::Global, GLOBAL_KEYMAP_ID, "Global", GLOBAL_ACTIONS)
}

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub max_frames: Option<u64>,
    /// Slot restored before the first frame; overrides `save_slot`.
    pub save_slot: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QuitReason {
    EngineQuit,
    QuitEvent,
    ReturnToLauncher,
    MaxFrames,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub frames: u64,
    pub elapsed_ms: u64,
    pub quit_reason: QuitReason,
    pub play_time_secs: u32,
    pub autosaves: u32,
    pub status: serde_json::Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoopTimer {
    Autosave,
}

/// Drives `engine` until it quits, a quit event arrives or the frame budget
/// runs out.
pub fn run_engine(
    ctx: &mut EngineContext,
    engine: &mut dyn Engine,
    options: &RunOptions,
) -> Result<RunSummary, EngineError> {
    let start_slot = options.save_slot.or_else(|| {
        ctx.config_int(keys::SAVE_SLOT)
            .and_then(|slot| u32::try_from(slot).ok())
    });
    if let Some(slot) = start_slot {
        load_game_state(ctx, engine, slot)?;
    }

    let quick_slot = ctx
        .config_int(keys::QUICK_SLOT)
        .and_then(|slot| u32::try_from(slot).ok())
        .unwrap_or(DEFAULT_QUICK_SLOT);
    let autosave_period = ctx
        .config_int(keys::AUTOSAVE_PERIOD)
        .unwrap_or(DEFAULT_AUTOSAVE_PERIOD_SECS);

    let started_at = ctx.now();
    let mut timers = TimerQueue::new();
    if autosave_period > 0 && ctx.slots.autosave_slot.is_some() {
        timers.schedule_periodic(started_at, autosave_period as u64 * 1000, LoopTimer::Autosave);
    }

    info!(
        "running {} ({}:{}), quick slot {quick_slot}, autosave every {autosave_period}s",
        ctx.target, ctx.engine_id, ctx.game_id
    );

    let mut frames = 0u64;
    let mut autosaves = 0u32;
    let quit_reason = 'frames: loop {
        if options.max_frames.is_some_and(|max| frames >= max) {
            break QuitReason::MaxFrames;
        }

        let frame_start = ctx.now();
        while let Some(raw) = ctx.events.poll_event(frame_start) {
            for event in ctx.keymapper.map_event(&raw) {
                match event {
                    Event::Quit => break 'frames QuitReason::QuitEvent,
                    Event::ReturnToLauncher => break 'frames QuitReason::ReturnToLauncher,
                    _ => {}
                }
                match engine.handle_event(ctx, &event)? {
                    Some(EngineRequest::QuickSave) => {
                        if let Err(err) = save_game_state(ctx, engine, quick_slot, "Quick save") {
                            warn!("quick save failed: {err}");
                        }
                    }
                    Some(EngineRequest::QuickLoad) => {
                        if let Err(err) = load_game_state(ctx, engine, quick_slot) {
                            warn!("quick load failed: {err}");
                        }
                    }
                    Some(EngineRequest::ReturnToLauncher) => {
                        break 'frames QuitReason::ReturnToLauncher
                    }
                    None => {}
                }
            }
        }

        engine.tick(ctx)?;
        if engine.should_quit() {
            break QuitReason::EngineQuit;
        }

        for timer in timers.fire_due(ctx.now()) {
            match timer {
                LoopTimer::Autosave => match try_autosave(ctx, engine) {
                    Ok(true) => autosaves += 1,
                    Ok(false) => {}
                    Err(err) => warn!("autosave failed: {err}"),
                },
            }
        }

        frames += 1;
        let spent = ctx.now().saturating_sub(frame_start);
        ctx.clock
            .delay_millis(engine.frame_interval_ms().saturating_sub(spent));
    };

    let summary = RunSummary {
        frames,
        elapsed_ms: ctx.now() - started_at,
        quit_reason,
        play_time_secs: engine.total_play_time(),
        autosaves,
        status: engine.status_snapshot(),
    };
    info!(
        "{} stopped after {} frames ({:?})",
        ctx.target, summary.frames, summary.quit_reason
    );
    Ok(summary)
}

fn try_autosave(ctx: &mut EngineContext, engine: &mut dyn Engine) -> Result<bool, EngineError> {
    let Some(slot) = ctx.slots.autosave_slot else {
        return Ok(false);
    };
    if !engine.can_save_game_state_currently() {
        debug!("autosave skipped, saving not allowed right now");
        return Ok(false);
    }
    write_slot(ctx, engine, slot, AUTOSAVE_DESCRIPTION)?;
    Ok(true)
}

/// Writes the engine's state to a user slot. The autosave slot is write
/// protected.
pub fn save_game_state(
    ctx: &mut EngineContext,
    engine: &mut dyn Engine,
    slot: u32,
    description: &str,
) -> Result<(), EngineError> {
    if slot > ctx.slots.max_slot {
        return Err(EngineError::InvalidSlot {
            slot,
            max: ctx.slots.max_slot,
        });
    }
    if ctx.slots.autosave_slot == Some(slot) {
        return Err(EngineError::WriteProtected(slot));
    }
    if !engine.can_save_game_state_currently() {
        return Err(EngineError::SaveNotAllowed);
    }
    write_slot(ctx, engine, slot, description)
}

fn write_slot(
    ctx: &mut EngineContext,
    engine: &mut dyn Engine,
    slot: u32,
    description: &str,
) -> Result<(), EngineError> {
    let payload = engine.save_state_payload(ctx)?;
    let header = SaveHeader::new(description, ctx.engine_id.clone());
    let info = SaveInfo {
        play_time_secs: engine.total_play_time(),
        date: SaveDate::now(),
    };
    let thumbnail = engine.thumbnail();
    let name = slot_file_name(&ctx.target, slot);

    let mut out = ctx
        .saves
        .open_for_saving(&name)
        .map_err(|err| EngineError::writing(&name, err))?;
    write_savegame(&mut out, &header, &info, thumbnail.as_ref(), &payload)
        .map_err(|err| EngineError::writing(&name, err))?;
    out.flush().map_err(|err| EngineError::writing(&name, err))?;
    info!("saved {name} ({description}, {} bytes)", payload.len());
    Ok(())
}

/// Restores the engine from `slot`, including the accumulated play time.
pub fn load_game_state(
    ctx: &mut EngineContext,
    engine: &mut dyn Engine,
    slot: u32,
) -> Result<(), EngineError> {
    if slot > ctx.slots.max_slot {
        return Err(EngineError::InvalidSlot {
            slot,
            max: ctx.slots.max_slot,
        });
    }
    if !engine.can_load_game_state_currently() {
        return Err(EngineError::LoadNotAllowed);
    }
    let name = slot_file_name(&ctx.target, slot);
    let mut input = ctx
        .saves
        .open_for_loading(&name)
        .map_err(|err| EngineError::reading(&name, err))?;
    let save = read_savegame(&mut input).map_err(|err| EngineError::reading(&name, err))?;
    if !save.header.engine_id.is_empty() && save.header.engine_id != ctx.engine_id {
        return Err(EngineError::ReadingFailed(format!(
            "{name} was written by engine {}, not {}",
            save.header.engine_id, ctx.engine_id
        )));
    }
    engine.load_state_payload(ctx, &save.payload)?;
    engine.set_total_play_time(save.info.play_time_secs);
    info!("loaded {name} ({})", save.header.description);
    Ok(())
}
