//! Freescape engine: Castle Master and Dark Side.
//!
//! Areas, objects and condition scripts come from a JSON export of the
//! game. The engine owns the mutable [`GameState`]; everything it needs
//! from the host (clock, random numbers, saves) arrives through the
//! [`EngineContext`] passed to each call.

pub mod data;
pub mod fcl;
pub mod geometry;
pub mod keymap;
pub mod sensor;
pub mod state;

use glam::Vec3;
use log::{debug, info, warn};
use serde_json::json;
use svm_formats::{decode_payload, encode_payload, rgb565, Thumbnail};
use svm_keymap::{Event, Keymap};

use crate::context::EngineContext;
use crate::detection::{FileRequirement, GameDescription, GameFlags};
use crate::error::EngineError;
use crate::plugin::{Engine, EngineFeature, EngineRequest, MetaEngine, MetaEngineFeature};
use crate::timer::{TimerId, TimerQueue};

pub use data::{FreescapeData, Variant};
pub use state::{EndReason, GameState};

use data::{ObjectKind, Trigger, KEEP_POSITION, VAR_ENERGY, VAR_SCORE, VAR_SHIELD};
use fcl::Effects;
use geometry::{heading, view_direction, wrap_degrees, Aabb};

pub const ENGINE_ID: &str = "freescape";

/// Milliseconds between the end of a game and the engine asking to quit.
pub const END_GAME_DELAY_MS: u64 = 2000;
const TURN_DEGREES: f32 = 15.0;
const LOOK_DEGREES: f32 = 10.0;
const MAX_PITCH: f32 = 60.0;
const STEP_SCALE: f32 = 2.0;
const DEFAULT_SCALE: f32 = 4.0;
const SENSOR_SCORE: i32 = 5;
const MAX_AREA_HOPS: usize = 8;
const THUMBNAIL_WIDTH: u16 = 80;
const THUMBNAIL_HEIGHT: u16 = 50;

static GAMES: &[GameDescription] = &[
    GameDescription {
        game_id: "castlemaster",
        title: "Castle Master",
        extra: "",
        files: &[FileRequirement::any("castle.json")],
        language: "en",
        platform: "dos",
        flags: GameFlags::empty(),
    },
    GameDescription {
        game_id: "darkside",
        title: "Dark Side",
        extra: "",
        files: &[FileRequirement::any("darkside.json")],
        language: "en",
        platform: "dos",
        flags: GameFlags::empty(),
    },
    GameDescription {
        game_id: "totaleclipse",
        title: "Total Eclipse",
        extra: "",
        files: &[FileRequirement::any("eclipse.json")],
        language: "en",
        platform: "dos",
        flags: GameFlags::UNSUPPORTED,
    },
];

fn variant_for(game_id: &str) -> Variant {
    match game_id {
        "castlemaster" => Variant::Castle,
        _ => Variant::Dark,
    }
}

#[derive(Debug, Default)]
pub struct FreescapeMetaEngine;

impl MetaEngine for FreescapeMetaEngine {
    fn engine_id(&self) -> &'static str {
        ENGINE_ID
    }

    fn name(&self) -> &'static str {
        "Freescape"
    }

    fn copyright(&self) -> &'static str {
        "Castle Master (C) Incentive Software, Dark Side (C) Incentive Software"
    }

    fn games(&self) -> &'static [GameDescription] {
        GAMES
    }

    fn has_feature(&self, _feature: MetaEngineFeature) -> bool {
        true
    }

    fn create_instance(
        &self,
        ctx: &mut EngineContext,
        game: &GameDescription,
    ) -> Result<Box<dyn Engine>, EngineError> {
        let file = game
            .data_file()
            .ok_or_else(|| EngineError::GameData(format!("{} lists no data file", game.game_id)))?;
        let data: FreescapeData = ctx.load_game_json(file)?;
        data.validate()?;
        let engine = FreescapeEngine::new(ctx, game.game_id, data)?;
        Ok(Box::new(engine))
    }

    fn init_keymaps(&self, _target: &str, game_id: &str) -> Vec<Keymap> {
        keymap::keymaps(variant_for(game_id))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FreescapeTimer {
    Tick,
    Second,
    EndGame,
}

pub struct FreescapeEngine {
    game_id: String,
    data: FreescapeData,
    state: GameState,
    timers: TimerQueue<FreescapeTimer>,
    end_timer: Option<TimerId>,
    play_time_ms: u64,
    last_ms: Option<u64>,
    quit: bool,
}

impl FreescapeEngine {
    pub fn new(
        ctx: &mut EngineContext,
        game_id: &str,
        data: FreescapeData,
    ) -> Result<Self, EngineError> {
        let now = ctx.now();
        let mut timers = TimerQueue::new();
        timers.schedule_periodic(
            now,
            1000 / u64::from(data.ticks_per_second.max(1)),
            FreescapeTimer::Tick,
        );
        timers.schedule_periodic(now, 1000, FreescapeTimer::Second);

        let state = GameState::new(&data);
        let (start_area, start_entrance) = (data.start_area, data.start_entrance);
        let mut engine = FreescapeEngine {
            game_id: game_id.to_string(),
            data,
            state,
            timers,
            end_timer: None,
            play_time_ms: 0,
            last_ms: Some(now),
            quit: false,
        };
        info!("starting {} ({})", engine.data.title, engine.game_id);
        engine.goto_area(start_area, start_entrance)?;
        Ok(engine)
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn data(&self) -> &FreescapeData {
        &self.data
    }

    /// Moves the player into `area_id`. Area entry scripts may chain into
    /// further area changes.
    pub fn goto_area(&mut self, area_id: u16, entrance: i16) -> Result<(), EngineError> {
        let (mut area_id, mut entrance) = (area_id, entrance);
        for _ in 0..MAX_AREA_HOPS {
            let Some(area) = self.data.area(area_id) else {
                return Err(EngineError::GameData(format!("area {area_id} does not exist")));
            };
            self.state.area = area_id;
            if entrance != KEEP_POSITION {
                match area
                    .entrances
                    .iter()
                    .find(|e| e.id == entrance)
                    .or_else(|| area.entrances.first())
                {
                    Some(found) => {
                        if found.id != entrance {
                            warn!(
                                "area {area_id} has no entrance {entrance}, using {}",
                                found.id
                            );
                        }
                        self.state.position = found.position;
                        self.state.yaw = found.yaw;
                        self.state.pitch = found.pitch;
                    }
                    None => warn!("area {area_id} has no entrances, keeping position"),
                }
            }
            self.state.sensor_timers.clear();
            info!("entering area {} ({})", area.id, area.name);

            let mut effects = Effects::default();
            fcl::run_conditions(
                &area.conditions,
                Trigger::Always,
                &self.data,
                &mut self.state,
                &mut effects,
            );
            self.settle();
            self.state.delay_ticks += effects.delay_ticks;
            match effects.goto {
                Some((next_area, next_entrance)) => {
                    area_id = next_area;
                    entrance = next_entrance;
                }
                None => return Ok(()),
            }
        }
        warn!(
            "area change chain exceeded {MAX_AREA_HOPS} hops, staying in area {}",
            self.state.area
        );
        Ok(())
    }

    fn apply_effects(&mut self, effects: Effects) -> Result<(), EngineError> {
        self.state.delay_ticks += effects.delay_ticks;
        if let Some((area, entrance)) = effects.goto {
            self.goto_area(area, entrance)?;
        }
        Ok(())
    }

    fn player_height(&self) -> f32 {
        match self.state.castle() {
            Some(castle) if castle.crouched => self.data.player_height / 2.0,
            _ => self.data.player_height,
        }
    }

    fn eye(&self) -> Vec3 {
        self.state.position() + Vec3::new(0.0, self.player_height(), 0.0)
    }

    fn is_flying(&self) -> bool {
        self.state.dark().is_some_and(|d| d.flying)
    }

    fn step_length(&self) -> f32 {
        self.data
            .area(self.state.area)
            .map_or(DEFAULT_SCALE, |a| a.scale)
            * STEP_SCALE
    }

    /// Present, solid, physical objects of the current area overlapping
    /// `bounds`, by id.
    fn obstacles(&self, bounds: &Aabb) -> Vec<(u16, f32)> {
        let Some(area) = self.data.area(self.state.area) else {
            return Vec::new();
        };
        area.objects
            .iter()
            .filter(|o| o.solid && o.kind != ObjectKind::Group)
            .filter(|o| self.state.is_present(area.id, o.id))
            .filter(|o| bounds.intersects(&Aabb::new(o.min(), o.max())))
            .map(|o| (o.id, o.max().y))
            .collect()
    }

    /// Tries to walk `distance` along `direction`. Low obstacles are
    /// climbed; anything else blocks and runs its collision script.
    fn walk(&mut self, direction: Vec3, distance: f32) -> Result<(), EngineError> {
        let feet = self.state.position();
        let target = feet + direction * distance;
        let (radius, height) = (self.data.player_radius, self.player_height());
        let blockers = self.obstacles(&Aabb::player(target, radius, height));
        if blockers.is_empty() {
            self.state.set_position(target);
            self.settle();
            return Ok(());
        }

        let top = blockers.iter().map(|(_, top)| *top).fold(f32::MIN, f32::max);
        if top - feet.y <= self.data.step_height {
            let climbed = Vec3::new(target.x, top, target.z);
            if self.obstacles(&Aabb::player(climbed, radius, height)).is_empty() {
                debug!("stepping up {:.1} units", top - feet.y);
                self.state.set_position(climbed);
                self.settle();
                return Ok(());
            }
        }

        let object = blockers[0].0;
        debug!("movement blocked by object {object}");
        self.run_object_conditions(object, Trigger::Collided)
    }

    fn run_object_conditions(&mut self, object: u16, trigger: Trigger) -> Result<(), EngineError> {
        let area_id = self.state.area;
        let Some(found) = self.data.object(area_id, object) else {
            return Ok(());
        };
        let mut effects = Effects::default();
        let ran = fcl::run_conditions(
            &found.conditions,
            trigger,
            &self.data,
            &mut self.state,
            &mut effects,
        );
        if ran > 0 {
            debug!("object {object}: ran {ran} {trigger:?} condition(s)");
        }
        self.apply_effects(effects)
    }

    /// Drops the player onto the highest surface below their feet. Falls
    /// longer than `max_fall` hurt.
    fn settle(&mut self) {
        if self.is_flying() {
            return;
        }
        let feet = self.state.position();
        let footprint = Aabb::player(feet, self.data.player_radius, self.player_height());
        let ground = self
            .data
            .area(self.state.area)
            .map(|area| {
                area.objects
                    .iter()
                    .filter(|o| o.solid && o.kind != ObjectKind::Group)
                    .filter(|o| self.state.is_present(area.id, o.id))
                    .filter(|o| footprint.overlaps_xz(&Aabb::new(o.min(), o.max())))
                    .map(|o| o.max().y)
                    .filter(|top| *top <= feet.y + 0.01)
                    .fold(0.0f32, f32::max)
            })
            .unwrap_or(0.0);
        let drop = feet.y - ground;
        if drop <= 0.0 {
            return;
        }
        self.state.set_position(Vec3::new(feet.x, ground, feet.z));
        if drop > self.data.max_fall {
            let damage = (drop / self.data.max_fall) as i32;
            info!("fell {drop:.1} units, {damage} damage");
            match self.state.castle_mut() {
                Some(castle) => castle.strength -= damage,
                None => self.state.add_var(&self.data, VAR_SHIELD, -damage),
            }
        }
    }

    fn rise(&mut self, up: bool) {
        if !self.is_flying() {
            return;
        }
        let scale = self
            .data
            .area(self.state.area)
            .map_or(DEFAULT_SCALE, |a| a.scale);
        let feet = self.state.position();
        let mut target = feet + Vec3::new(0.0, if up { scale } else { -scale }, 0.0);
        target.y = target.y.max(0.0);
        let bounds = Aabb::player(target, self.data.player_radius, self.player_height());
        if self.obstacles(&bounds).is_empty() {
            self.state.set_position(target);
        } else {
            debug!("vertical movement blocked");
        }
    }

    /// Nearest present object along the view ray within `reach`.
    fn object_in_sight(&self, reach: f32) -> Option<u16> {
        let area = self.data.area(self.state.area)?;
        let eye = self.eye();
        let dir = view_direction(self.state.yaw, self.state.pitch);
        area.objects
            .iter()
            .filter(|o| o.kind != ObjectKind::Group)
            .filter(|o| self.state.is_present(area.id, o.id))
            .filter_map(|o| {
                Aabb::new(o.min(), o.max())
                    .ray_hit(eye, dir)
                    .filter(|t| *t <= reach)
                    .map(|t| (o.id, t))
            })
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(id, _)| id)
    }

    fn shoot(&mut self) -> Result<(), EngineError> {
        let Some(object) = self.object_in_sight(f32::INFINITY) else {
            debug!("shot hit nothing");
            return Ok(());
        };
        debug!("shot hit object {object}");
        let area = self.state.area;
        let is_sensor = self
            .data
            .object(area, object)
            .is_some_and(|o| o.kind == ObjectKind::Sensor);
        if is_sensor && self.state.destroy(&self.data, area, object) {
            info!("sensor {object} destroyed");
            self.state.add_var(&self.data, VAR_SCORE, SENSOR_SCORE);
        }
        self.run_object_conditions(object, Trigger::Shot)
    }

    fn activate(&mut self) -> Result<(), EngineError> {
        let Some(reach) = self.data.castle.as_ref().map(|c| c.activate_reach) else {
            return Ok(());
        };
        match self.object_in_sight(reach) {
            Some(object) => self.run_object_conditions(object, Trigger::Activated),
            None => {
                debug!("nothing to activate");
                Ok(())
            }
        }
    }

    fn game_tick(&mut self) {
        if self.state.game_over.is_some() {
            return;
        }
        if self.state.delay_ticks > 0 {
            self.state.delay_ticks -= 1;
            return;
        }
        self.state.ticks += 1;
        let eye = self.eye();
        if let Some(area) = self.data.area(self.state.area) {
            sensor::update_sensors(&self.data, area, &mut self.state, eye);
        }
        self.state.check_if_game_ended();
    }

    fn second_elapsed(&mut self) -> Result<(), EngineError> {
        if self.state.game_over.is_some() {
            return Ok(());
        }
        self.state.seconds += 1;
        let mut jet_drain = false;
        if let Some(dark) = self.state.dark_mut() {
            if let Some(countdown) = dark.countdown.as_mut() {
                *countdown = countdown.saturating_sub(1);
            }
            jet_drain = dark.flying;
        }
        if jet_drain {
            self.state.add_var(&self.data, VAR_ENERGY, -1);
        }

        let mut effects = Effects::default();
        if let Some(area) = self.data.area(self.state.area) {
            fcl::run_conditions(
                &area.conditions,
                Trigger::Timer,
                &self.data,
                &mut self.state,
                &mut effects,
            );
        }
        fcl::run_conditions(
            &self.data.global_conditions,
            Trigger::Timer,
            &self.data,
            &mut self.state,
            &mut effects,
        );
        self.apply_effects(effects)?;
        self.state.check_if_game_ended();
        Ok(())
    }

    /// Schedules the delayed quit once the game has ended.
    fn resolve_end(&mut self, now: u64) {
        let Some(reason) = self.state.check_if_game_ended() else {
            return;
        };
        if self.end_timer.is_some() {
            return;
        }
        info!("game over: {}", reason.message());
        self.state.push_message(reason.message());
        self.end_timer = Some(
            self.timers
                .schedule_once(now, END_GAME_DELAY_MS, FreescapeTimer::EndGame),
        );
    }

    fn perform(&mut self, action: u32) -> Result<Option<EngineRequest>, EngineError> {
        match action {
            keymap::QUICK_SAVE => return Ok(Some(EngineRequest::QuickSave)),
            keymap::QUICK_LOAD => return Ok(Some(EngineRequest::QuickLoad)),
            keymap::MENU => return Ok(Some(EngineRequest::ReturnToLauncher)),
            _ => {}
        }
        if self.state.game_over.is_some() {
            return Ok(None);
        }

        let step = self.step_length();
        let yaw = self.state.yaw;
        match action {
            keymap::MOVE_FORWARD => self.walk(heading(yaw), step)?,
            keymap::MOVE_BACKWARD => self.walk(-heading(yaw), step)?,
            keymap::STRAFE_LEFT => self.walk(heading(yaw - 90.0), step)?,
            keymap::STRAFE_RIGHT => self.walk(heading(yaw + 90.0), step)?,
            keymap::TURN_LEFT => self.state.yaw = wrap_degrees(yaw - TURN_DEGREES),
            keymap::TURN_RIGHT => self.state.yaw = wrap_degrees(yaw + TURN_DEGREES),
            keymap::LOOK_UP => {
                self.state.pitch = (self.state.pitch + LOOK_DEGREES).min(MAX_PITCH)
            }
            keymap::LOOK_DOWN => {
                self.state.pitch = (self.state.pitch - LOOK_DEGREES).max(-MAX_PITCH)
            }
            keymap::CENTER_VIEW => self.state.pitch = 0.0,
            keymap::SHOOT => self.shoot()?,
            keymap::ACTIVATE => self.activate()?,
            keymap::CROUCH => {
                if let Some(castle) = self.state.castle_mut() {
                    castle.crouched = !castle.crouched;
                }
            }
            keymap::SWITCH_JETPACK => {
                if let Some(dark) = self.state.dark_mut() {
                    dark.flying = !dark.flying;
                    info!("jetpack {}", if dark.flying { "on" } else { "off" });
                }
                self.settle();
            }
            keymap::RISE => self.rise(true),
            keymap::LOWER => self.rise(false),
            other => debug!("unhandled freescape action {other}"),
        }
        Ok(None)
    }
}

impl Engine for FreescapeEngine {
    fn has_feature(&self, _feature: EngineFeature) -> bool {
        true
    }

    fn handle_event(
        &mut self,
        ctx: &mut EngineContext,
        event: &Event,
    ) -> Result<Option<EngineRequest>, EngineError> {
        let Event::CustomEngineActionStart(action) = event else {
            return Ok(None);
        };
        let request = self.perform(*action)?;
        self.resolve_end(ctx.now());
        Ok(request)
    }

    fn tick(&mut self, ctx: &mut EngineContext) -> Result<(), EngineError> {
        let now = ctx.now();
        if let Some(last) = self.last_ms {
            self.play_time_ms += now.saturating_sub(last);
        }
        self.last_ms = Some(now);

        for timer in self.timers.fire_due(now) {
            match timer {
                FreescapeTimer::Tick => self.game_tick(),
                FreescapeTimer::Second => self.second_elapsed()?,
                FreescapeTimer::EndGame => {
                    info!("leaving {} after game over", self.data.title);
                    self.quit = true;
                }
            }
        }
        self.resolve_end(now);
        Ok(())
    }

    fn should_quit(&self) -> bool {
        self.quit
    }

    fn can_save_game_state_currently(&self) -> bool {
        self.state.game_over.is_none()
    }

    fn can_load_game_state_currently(&self) -> bool {
        true
    }

    fn save_state_payload(&self, _ctx: &EngineContext) -> Result<Vec<u8>, EngineError> {
        encode_payload(&self.state).map_err(|err| EngineError::writing("freescape state", err))
    }

    fn load_state_payload(
        &mut self,
        ctx: &mut EngineContext,
        payload: &[u8],
    ) -> Result<(), EngineError> {
        let state: GameState =
            decode_payload(payload).map_err(|err| EngineError::reading("freescape state", err))?;
        if self.data.area(state.area).is_none() {
            return Err(EngineError::ReadingFailed(format!(
                "saved area {} does not exist in {}",
                state.area, self.data.title
            )));
        }
        self.state = state;
        if let Some(timer) = self.end_timer.take() {
            self.timers.cancel(timer);
        }
        self.resolve_end(ctx.now());
        Ok(())
    }

    /// Top-down map of the current area.
    fn thumbnail(&self) -> Option<Thumbnail> {
        let area = self.data.area(self.state.area)?;
        let mut thumb = Thumbnail::new(THUMBNAIL_WIDTH, THUMBNAIL_HEIGHT, rgb565(0, 0, 32));
        let player = self.state.position();
        let visible: Vec<_> = area
            .objects
            .iter()
            .filter(|o| o.kind != ObjectKind::Group && self.state.is_present(area.id, o.id))
            .collect();

        let (mut min, mut max) = (player, player);
        for object in &visible {
            min = min.min(object.min());
            max = max.max(object.max());
        }
        let extent = (max - min).max(Vec3::ONE);
        let sx = f32::from(THUMBNAIL_WIDTH - 1) / extent.x;
        let sz = f32::from(THUMBNAIL_HEIGHT - 1) / extent.z;
        let to_px = |x: f32, z: f32| (((x - min.x) * sx) as u16, ((z - min.z) * sz) as u16);

        for object in visible {
            let [r, g, b] = area
                .palette
                .get(object.color as usize)
                .copied()
                .unwrap_or([160, 160, 160]);
            let (x0, y0) = to_px(object.min().x, object.min().z);
            let (x1, y1) = to_px(object.max().x, object.max().z);
            thumb.fill_rect(x0, y0, x1 + 1, y1 + 1, rgb565(r, g, b));
        }
        let (px, pz) = to_px(player.x, player.z);
        thumb.fill_rect(px.saturating_sub(1), pz.saturating_sub(1), px + 2, pz + 2, 0xffff);
        Some(thumb)
    }

    fn total_play_time(&self) -> u32 {
        (self.play_time_ms / 1000) as u32
    }

    fn set_total_play_time(&mut self, secs: u32) {
        self.play_time_ms = u64::from(secs) * 1000;
    }

    fn status_snapshot(&self) -> serde_json::Value {
        let area_name = self
            .data
            .area(self.state.area)
            .map(|a| a.name.as_str())
            .unwrap_or("");
        json!({
            "engine": ENGINE_ID,
            "game_id": self.game_id,
            "title": self.data.title,
            "area": self.state.area,
            "area_name": area_name,
            "position": self.state.position,
            "yaw": self.state.yaw,
            "pitch": self.state.pitch,
            "shield": self.state.var(VAR_SHIELD),
            "energy": self.state.var(VAR_ENERGY),
            "score": self.state.var(VAR_SCORE),
            "ticks": self.state.ticks,
            "seconds": self.state.seconds,
            "variant": self.state.variant,
            "game_over": self.state.game_over.map(EndReason::message),
            "messages": self.state.messages,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{keys, ConfigManager};
    use crate::system::VirtualClock;

    const AREAS: &str = r#"
        "areas": [
            {"id": 1, "name": "Gate", "scale": 4,
             "entrances": [{"id": 1, "position": [0, 0, 0]}],
             "objects": [
                {"id": 2, "kind": "cube", "origin": [-8, 0, 20], "size": [16, 16, 4],
                 "conditions": [{"trigger": "collided", "instructions": [{"op": "print", "message": 0}]},
                                {"trigger": "shot", "instructions": [{"op": "add_var", "var": 61, "value": 1}]}]},
                {"id": 3, "kind": "cube", "origin": [-4, 0, 6], "size": [8, 2, 4]},
                {"id": 4, "kind": "rectangle", "origin": [20, 30, 0], "size": [4, 0, 4]},
                {"id": 5, "kind": "cube", "origin": [40, 0, 40], "size": [2, 16, 2],
                 "conditions": [{"trigger": "shot", "instructions": [{"op": "goto", "area": 2, "entrance": 7}]}]}
             ],
             "conditions": [{"trigger": "timer", "instructions": [{"op": "sub_var", "var": 62, "value": 1}]}]},
            {"id": 2, "name": "Keep",
             "entrances": [{"id": 7, "position": [5, 0, 5], "yaw": 90}],
             "conditions": [{"trigger": "always", "instructions": [{"op": "set_bit", "bit": 1}]}]}
        ]"#;

    fn freescape_data(variant: &str, extra: &str) -> FreescapeData {
        let raw = format!(
            r#"{{"title": "Test", "variant": "{variant}", "start_area": 1, "start_entrance": 1,
                "max_shield": 30, "max_energy": 30, "messages": ["BUMP"], {extra} {AREAS}}}"#
        );
        serde_json::from_str(&raw).unwrap()
    }

    fn context() -> EngineContext {
        let mut config = ConfigManager::default();
        config.write_string("test", keys::ENGINE_ID, ENGINE_ID);
        config.write_string("test", keys::GAME_ID, "darkside");
        config.write_string("test", keys::PATH, ".");
        EngineContext::for_target(config, "test")
            .unwrap()
            .with_clock(Box::new(VirtualClock::new()))
    }

    fn press(engine: &mut FreescapeEngine, ctx: &mut EngineContext, action: u32) {
        engine
            .handle_event(ctx, &Event::CustomEngineActionStart(action))
            .unwrap();
    }

    fn run_for(engine: &mut FreescapeEngine, ctx: &mut EngineContext, ms: u64) {
        for _ in 0..ms / 20 {
            ctx.clock.delay_millis(20);
            engine.tick(ctx).unwrap();
        }
    }

    #[test]
    fn walking_climbs_steps_and_bumps_walls() {
        let mut ctx = context();
        let mut engine = FreescapeEngine::new(&mut ctx, "darkside", freescape_data("dark", "")).unwrap();
        press(&mut engine, &mut ctx, keymap::MOVE_FORWARD);
        assert_eq!(engine.state().position, [0.0, 2.0, 8.0], "climbed the low cube");
        press(&mut engine, &mut ctx, keymap::MOVE_FORWARD);
        assert_eq!(engine.state().position, [0.0, 0.0, 16.0], "dropped off the step");
        press(&mut engine, &mut ctx, keymap::MOVE_FORWARD);
        assert_eq!(engine.state().position, [0.0, 0.0, 16.0]);
        assert_eq!(engine.state().messages, vec!["BUMP".to_string()]);
    }

    #[test]
    fn shooting_runs_scripts_and_changes_area() {
        let mut ctx = context();
        let mut engine = FreescapeEngine::new(&mut ctx, "darkside", freescape_data("dark", "")).unwrap();
        press(&mut engine, &mut ctx, keymap::SHOOT);
        assert_eq!(engine.state().var(VAR_SCORE), 1);

        engine.state.set_position(Vec3::new(41.0, 0.0, 30.0));
        press(&mut engine, &mut ctx, keymap::LOOK_DOWN);
        press(&mut engine, &mut ctx, keymap::CENTER_VIEW);
        press(&mut engine, &mut ctx, keymap::SHOOT);
        assert_eq!(engine.state().area, 2);
        assert_eq!(engine.state().position, [5.0, 0.0, 5.0]);
        assert_eq!(engine.state().yaw, 90.0);
        assert!(engine.state().bit(1), "always condition ran on entry");
    }

    #[test]
    fn unknown_area_is_a_game_data_error() {
        let mut ctx = context();
        let mut engine = FreescapeEngine::new(&mut ctx, "darkside", freescape_data("dark", "")).unwrap();
        assert!(matches!(engine.goto_area(9, 0), Err(EngineError::GameData(_))));
        engine.goto_area(2, 42).unwrap();
        assert_eq!(engine.state().position, [5.0, 0.0, 5.0], "falls back to first entrance");
    }

    #[test]
    fn long_falls_cost_shield_or_strength() {
        let mut ctx = context();
        let mut engine = FreescapeEngine::new(&mut ctx, "darkside", freescape_data("dark", "")).unwrap();
        press(&mut engine, &mut ctx, keymap::SWITCH_JETPACK);
        for _ in 0..9 {
            press(&mut engine, &mut ctx, keymap::RISE);
        }
        assert_eq!(engine.state().position[1], 36.0);
        press(&mut engine, &mut ctx, keymap::SWITCH_JETPACK);
        assert_eq!(engine.state().position[1], 0.0);
        assert_eq!(engine.state().var(VAR_SHIELD), 28);

        let castle = r#""castle": {"spirits_max": 10, "strength": 8},"#;
        let mut engine =
            FreescapeEngine::new(&mut ctx, "castlemaster", freescape_data("castle", castle)).unwrap();
        engine.state.set_position(Vec3::new(22.0, 40.0, 2.0));
        engine.settle();
        assert_eq!(engine.state().position[1], 30.0, "landed on the ledge");
        engine.state.set_position(Vec3::new(-30.0, 40.0, -30.0));
        engine.settle();
        assert_eq!(engine.state().castle().unwrap().strength, 6);
    }

    #[test]
    fn timer_conditions_drain_energy_until_game_over() {
        let mut ctx = context();
        let mut engine = FreescapeEngine::new(&mut ctx, "darkside", freescape_data("dark", "")).unwrap();
        run_for(&mut engine, &mut ctx, 10_000);
        assert_eq!(engine.state().var(VAR_ENERGY), 20);
        assert!(engine.can_save_game_state_currently());

        run_for(&mut engine, &mut ctx, 10_000);
        assert_eq!(engine.state().var(VAR_ENERGY), 10);
        assert_eq!(engine.state().game_over, None);

        run_for(&mut engine, &mut ctx, 10_000);
        assert_eq!(engine.state().game_over, Some(EndReason::EnergyExhausted));
        assert!(!engine.can_save_game_state_currently());
        assert!(!engine.should_quit());
        run_for(&mut engine, &mut ctx, END_GAME_DELAY_MS + 20);
        assert!(engine.should_quit());
        assert_eq!(engine.total_play_time(), 32);
    }

    #[test]
    fn payload_restores_state() {
        let mut ctx = context();
        let mut engine = FreescapeEngine::new(&mut ctx, "darkside", freescape_data("dark", "")).unwrap();
        press(&mut engine, &mut ctx, keymap::TURN_RIGHT);
        press(&mut engine, &mut ctx, keymap::SHOOT);
        let payload = engine.save_state_payload(&ctx).unwrap();
        let saved = engine.state().clone();

        engine.goto_area(2, 7).unwrap();
        engine.load_state_payload(&mut ctx, &payload).unwrap();
        assert_eq!(engine.state(), &saved);

        let thumb = engine.thumbnail().unwrap();
        assert_eq!((thumb.width, thumb.height), (THUMBNAIL_WIDTH, THUMBNAIL_HEIGHT));
        assert_eq!(engine.status_snapshot()["area_name"], "Gate");
    }
}
