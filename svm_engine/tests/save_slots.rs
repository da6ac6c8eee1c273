use std::fs;
use std::path::PathBuf;

use anyhow::Result;
use svm_engine::config::keys;
use svm_engine::engines::eob::keymap::TURN_RIGHT;
use svm_engine::launcher::add_game;
use svm_engine::runtime::{load_game_state, run_engine, save_game_state, RunOptions};
use svm_engine::{
    ConfigManager, Engine, EngineContext, EngineError, MetaEngine, PluginRegistry, QuitReason,
    SlotPolicy, VirtualClock,
};
use svm_formats::DirectorySaveFiles;
use svm_keymap::Event;
use tempfile::{tempdir, TempDir};

struct Session {
    _dir: TempDir,
    ctx: EngineContext,
    engine: Box<dyn Engine>,
}

fn eob_session(registry: &PluginRegistry) -> Result<Session> {
    let dir = tempdir()?;
    let data = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("data").join("eob");
    let mut config = ConfigManager::default();
    let target = add_game(&mut config, registry, &data)?;
    config.write_string(&target, keys::SAVE_PATH, dir.path().display().to_string());

    let meta = registry.find_engine("eob").expect("eob plugin is registered");
    let mut ctx = EngineContext::for_target(config, &target)?;
    ctx.slots = SlotPolicy {
        max_slot: meta.max_save_slot(),
        autosave_slot: meta.autosave_slot(),
    };
    let game = meta.find_game("eob").expect("eob is in the game table");
    let engine = meta.create_instance(&mut ctx, game)?;
    Ok(Session {
        _dir: dir,
        ctx,
        engine,
    })
}

fn turn_right(session: &mut Session) -> Result<()> {
    session
        .engine
        .handle_event(&mut session.ctx, &Event::CustomEngineActionStart(TURN_RIGHT))?;
    Ok(())
}

#[test]
fn loading_a_slot_restores_the_saved_state() -> Result<()> {
    let registry = PluginRegistry::with_static_plugins();
    let mut session = eob_session(&registry)?;
    turn_right(&mut session)?;
    session.engine.set_total_play_time(42);
    save_game_state(&mut session.ctx, session.engine.as_mut(), 3, "facing east")?;
    let saved = session.engine.status_snapshot();

    turn_right(&mut session)?;
    session.engine.set_total_play_time(50);
    assert_ne!(session.engine.status_snapshot()["direction"], saved["direction"]);

    load_game_state(&mut session.ctx, session.engine.as_mut(), 3)?;
    assert_eq!(session.engine.status_snapshot()["direction"], saved["direction"]);
    assert_eq!(session.engine.total_play_time(), 42);
    Ok(())
}

#[test]
fn listed_saves_carry_their_metadata() -> Result<()> {
    let registry = PluginRegistry::with_static_plugins();
    let mut session = eob_session(&registry)?;
    save_game_state(&mut session.ctx, session.engine.as_mut(), 7, "by the door")?;
    save_game_state(&mut session.ctx, session.engine.as_mut(), 2, "start")?;

    let meta = registry.find_engine("eob").expect("eob plugin is registered");
    let saves = meta.list_saves(session.ctx.saves.as_ref(), &session.ctx.target)?;
    let slots: Vec<u32> = saves.iter().map(|s| s.slot).collect();
    assert_eq!(slots, vec![2, 7]);
    assert_eq!(saves[1].description, "by the door");
    assert_eq!(saves[1].engine_id, "eob");
    assert!(!saves[1].is_autosave);

    let info = meta
        .query_save_meta_infos(session.ctx.saves.as_ref(), &session.ctx.target, 7)
        .expect("slot 7 is occupied");
    assert!(info.thumbnail.is_some());
    assert!(meta
        .query_save_meta_infos(session.ctx.saves.as_ref(), &session.ctx.target, 8)
        .is_none());
    Ok(())
}

#[test]
fn autosave_slot_is_write_protected() -> Result<()> {
    let registry = PluginRegistry::with_static_plugins();
    let mut session = eob_session(&registry)?;
    let err = save_game_state(&mut session.ctx, session.engine.as_mut(), 0, "mine")
        .expect_err("slot 0 is the autosave slot");
    assert!(matches!(err, EngineError::WriteProtected(0)), "{err}");

    let meta = registry.find_engine("eob").expect("eob plugin is registered");
    let err = meta
        .remove_save(session.ctx.saves.as_ref(), &session.ctx.target, 0)
        .expect_err("autosaves cannot be removed");
    assert!(matches!(err, EngineError::WriteProtected(0)), "{err}");
    Ok(())
}

#[test]
fn removed_saves_disappear_from_the_list() -> Result<()> {
    let registry = PluginRegistry::with_static_plugins();
    let mut session = eob_session(&registry)?;
    save_game_state(&mut session.ctx, session.engine.as_mut(), 4, "doomed")?;

    let meta = registry.find_engine("eob").expect("eob plugin is registered");
    meta.remove_save(session.ctx.saves.as_ref(), &session.ctx.target, 4)?;
    assert!(meta
        .list_saves(session.ctx.saves.as_ref(), &session.ctx.target)?
        .is_empty());
    Ok(())
}

#[test]
fn out_of_range_slots_are_rejected() -> Result<()> {
    let registry = PluginRegistry::with_static_plugins();
    let mut session = eob_session(&registry)?;
    let max = session.ctx.slots.max_slot;
    let err = save_game_state(&mut session.ctx, session.engine.as_mut(), max + 1, "late")
        .expect_err("slot past the maximum");
    assert!(matches!(err, EngineError::InvalidSlot { .. }), "{err}");
    let err = load_game_state(&mut session.ctx, session.engine.as_mut(), 5)
        .expect_err("slot 5 was never written");
    assert!(matches!(err, EngineError::ReadingFailed(_)), "{err}");
    Ok(())
}

#[test]
fn unwritable_save_directory_only_skips_autosaves() -> Result<()> {
    let registry = PluginRegistry::with_static_plugins();
    let session = eob_session(&registry)?;
    let Session {
        _dir: dir,
        ctx,
        mut engine,
    } = session;
    let blocker = dir.path().join("not_a_dir");
    fs::write(&blocker, b"")?;

    let mut ctx = ctx
        .with_saves(Box::new(DirectorySaveFiles::new(&blocker)))
        .with_clock(Box::new(VirtualClock::new()));
    let target = ctx.target.clone();
    ctx.config.write_int(&target, keys::AUTOSAVE_PERIOD, 1);

    let options = RunOptions {
        max_frames: Some(200),
        save_slot: None,
    };
    let summary = run_engine(&mut ctx, engine.as_mut(), &options)?;
    assert_eq!(summary.quit_reason, QuitReason::MaxFrames);
    assert_eq!(summary.frames, 200);
    assert_eq!(summary.autosaves, 0);
    Ok(())
}
