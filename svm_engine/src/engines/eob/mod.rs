//! Eye of the Beholder: grid movement and the AD&D combat core.

pub mod character;
pub mod combat;
pub mod data;
pub mod keymap;
pub mod monster;
pub mod rules;
pub mod spells;
pub mod state;

use log::{debug, info};
use serde_json::json;
use svm_formats::{decode_payload, encode_payload, rgb565, Thumbnail};
use svm_keymap::{Event, Keymap};

use crate::context::EngineContext;
use crate::detection::{FileRequirement, GameDescription, GameFlags};
use crate::error::EngineError;
use crate::plugin::{Engine, EngineFeature, EngineRequest, MetaEngine, MetaEngineFeature};
use crate::rng::RandomSource;
use crate::timer::{TimerId, TimerQueue};

pub use data::{Direction, EobData, Position};
pub use state::EobState;

use character::CharacterStatus;
use combat::{character_attack, inflict_character_damage, monster_close_attack, AttackOutcome};

pub const ENGINE_ID: &str = "eob";

/// Milliseconds between the party's defeat and the engine asking to quit.
pub const END_GAME_DELAY_MS: u64 = 2000;
/// Monsters notice the party closer than this many blocks.
const MONSTER_SIGHT: i32 = 4;
/// Resting is refused with a monster closer than this.
const REST_DISTANCE: i32 = 2;
const THUMBNAIL_WIDTH: u16 = 80;
const THUMBNAIL_HEIGHT: u16 = 50;

static GAMES: &[GameDescription] = &[
    GameDescription {
        game_id: "eob",
        title: "Eye of the Beholder",
        extra: "",
        files: &[FileRequirement::any("eob.json")],
        language: "en",
        platform: "dos",
        flags: GameFlags::empty(),
    },
    GameDescription {
        game_id: "eob2",
        title: "Eye of the Beholder II: The Legend of Darkmoon",
        extra: "",
        files: &[FileRequirement::any("eob2.json")],
        language: "en",
        platform: "dos",
        flags: GameFlags::UNSUPPORTED,
    },
];

#[derive(Debug, Default)]
pub struct EobMetaEngine;

impl MetaEngine for EobMetaEngine {
    fn engine_id(&self) -> &'static str {
        ENGINE_ID
    }

    fn name(&self) -> &'static str {
        "Eye of the Beholder"
    }

    fn copyright(&self) -> &'static str {
        "Eye of the Beholder (C) TSR, Inc., (C) Strategic Simulations, Inc."
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
        let data: EobData = ctx.load_game_json(file)?;
        data.validate()?;
        Ok(Box::new(EobEngine::new(ctx, game.game_id, data)))
    }

    fn init_keymaps(&self, _target: &str, _game_id: &str) -> Vec<Keymap> {
        keymap::keymaps()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EobTimer {
    Tick,
    Second,
    EndGame,
}

pub struct EobEngine {
    game_id: String,
    data: EobData,
    state: EobState,
    timers: TimerQueue<EobTimer>,
    end_timer: Option<TimerId>,
    play_time_ms: u64,
    last_ms: Option<u64>,
    quit: bool,
}

/// Facing that points from `from` towards `to` along the longer axis.
fn direction_towards(from: Position, to: Position) -> Direction {
    let (dx, dy) = (to.x - from.x, to.y - from.y);
    if dx.abs() >= dy.abs() {
        if dx >= 0 {
            Direction::East
        } else {
            Direction::West
        }
    } else if dy > 0 {
        Direction::South
    } else {
        Direction::North
    }
}

impl EobEngine {
    pub fn new(ctx: &mut EngineContext, game_id: &str, data: EobData) -> Self {
        let now = ctx.now();
        let mut timers = TimerQueue::new();
        timers.schedule_periodic(
            now,
            1000 / u64::from(data.ticks_per_second.max(1)),
            EobTimer::Tick,
        );
        timers.schedule_periodic(now, 1000, EobTimer::Second);
        let state = EobState::new(&data, &mut ctx.rng);
        info!(
            "starting {} ({}) with {} characters and {} monsters",
            data.title,
            game_id,
            state.party.len(),
            state.monsters.len()
        );
        EobEngine {
            game_id: game_id.to_string(),
            data,
            state,
            timers,
            end_timer: None,
            play_time_ms: 0,
            last_ms: Some(now),
            quit: false,
        }
    }

    pub fn state(&self) -> &EobState {
        &self.state
    }

    pub fn data(&self) -> &EobData {
        &self.data
    }

    fn try_move(&mut self, direction: Direction) {
        let target = self.state.position.step(direction);
        if self.state.is_blocked(&self.data, target) {
            debug!("move to {},{} blocked", target.x, target.y);
            return;
        }
        self.state.position = target;
    }

    /// Restores spells and a little health unless a monster is close.
    pub fn rest(&mut self) -> bool {
        let position = self.state.position;
        let threatened = self
            .state
            .monsters
            .iter()
            .any(|m| m.is_alive() && m.position.distance(position) < REST_DISTANCE);
        if threatened {
            self.state
                .push_message("You cannot rest with monsters nearby");
            return false;
        }
        for character in self.state.party.iter_mut().filter(|c| c.is_alive()) {
            character.memorized = character.prepared.clone();
            let level = character.level;
            character.heal(level);
        }
        info!("party rests");
        self.state.push_message("The party rests");
        true
    }

    fn update_monsters(&mut self, rng: &mut RandomSource) {
        let party = self.state.position;
        for index in 0..self.state.monsters.len() {
            let monster = &self.state.monsters[index];
            if !monster.is_alive() {
                continue;
            }
            let at = monster.position;
            if at.is_adjacent(party) {
                self.state.monsters[index].direction = direction_towards(at, party);
                monster_close_attack(&mut self.state, &self.data, rng, index);
            } else if at.distance(party) < MONSTER_SIGHT {
                let facing = direction_towards(at, party);
                let next = at.step(facing);
                if !self.state.is_blocked(&self.data, next) {
                    let monster = &mut self.state.monsters[index];
                    monster.position = next;
                    monster.direction = facing;
                }
            }
        }
    }

    fn game_tick(&mut self, rng: &mut RandomSource) {
        if self.state.game_over {
            return;
        }
        self.state.ticks += 1;
        self.state.tick_effects();
        let interval = u64::from(self.data.timing.monster_attack_interval.max(1));
        if self.state.ticks % interval == 0 {
            self.update_monsters(rng);
        }
    }

    fn second_elapsed(&mut self) {
        if self.state.game_over {
            return;
        }
        self.state.seconds += 1;
        let poison_due =
            self.state.seconds % u64::from(self.data.timing.poison_interval_secs.max(1)) == 0;
        let mut recovered = Vec::new();
        for character in self.state.party.iter_mut().filter(|c| c.is_alive()) {
            if poison_due && character.is_poisoned() {
                inflict_character_damage(character, 1);
            }
            if character.status.contains(CharacterStatus::PARALYZED) {
                character.paralysis_secs = character.paralysis_secs.saturating_sub(1);
                if character.paralysis_secs == 0 {
                    character.status.remove(CharacterStatus::PARALYZED);
                    recovered.push(character.name.clone());
                }
            }
        }
        for name in recovered {
            self.state.push_message(format!("{name} can move again"));
        }
    }

    /// Schedules the delayed quit once nobody in the party can act.
    fn resolve_end(&mut self, now: u64) {
        if !self.state.game_over && !self.state.party_can_act() {
            self.state.game_over = true;
            info!("game over: the party is defeated");
            self.state.push_message("The party is defeated");
        }
        if self.state.game_over && self.end_timer.is_none() {
            self.end_timer = Some(
                self.timers
                    .schedule_once(now, END_GAME_DELAY_MS, EobTimer::EndGame),
            );
        }
    }

    fn perform(
        &mut self,
        rng: &mut RandomSource,
        action: u32,
    ) -> Result<Option<EngineRequest>, EngineError> {
        match action {
            keymap::QUICK_SAVE => return Ok(Some(EngineRequest::QuickSave)),
            keymap::QUICK_LOAD => return Ok(Some(EngineRequest::QuickLoad)),
            keymap::MENU => return Ok(Some(EngineRequest::ReturnToLauncher)),
            _ => {}
        }
        if self.state.game_over {
            return Ok(None);
        }

        let facing = self.state.direction;
        match action {
            keymap::MOVE_FORWARD => self.try_move(facing),
            keymap::MOVE_BACKWARD => self.try_move(facing.opposite()),
            keymap::STRAFE_LEFT => self.try_move(facing.turn_left()),
            keymap::STRAFE_RIGHT => self.try_move(facing.turn_right()),
            keymap::TURN_LEFT => self.state.direction = facing.turn_left(),
            keymap::TURN_RIGHT => self.state.direction = facing.turn_right(),
            keymap::ATTACK_1..=keymap::ATTACK_6 => {
                let index = (action - keymap::ATTACK_1) as usize;
                let outcome = character_attack(&mut self.state, &self.data, rng, index);
                debug!("attack by character {index}: {outcome:?}");
                if outcome == AttackOutcome::OutOfReach {
                    self.state.push_message("Out of reach");
                }
            }
            keymap::CAST_1..=keymap::CAST_6 => {
                let index = (action - keymap::CAST_1) as usize;
                let spell = self
                    .state
                    .party
                    .get(index)
                    .and_then(|c| c.memorized.first().copied());
                match spell {
                    Some(spell) => {
                        if let Err(err) =
                            spells::cast(&mut self.state, &self.data, rng, index, spell)
                        {
                            debug!("cast failed: {err}");
                            self.state.push_message(err.to_string());
                        }
                    }
                    None => debug!("character {index} has no spell memorized"),
                }
            }
            keymap::REST => {
                self.rest();
            }
            other => debug!("unhandled eob action {other}"),
        }
        Ok(None)
    }
}

impl Engine for EobEngine {
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
        let request = self.perform(&mut ctx.rng, *action)?;
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
                EobTimer::Tick => self.game_tick(&mut ctx.rng),
                EobTimer::Second => self.second_elapsed(),
                EobTimer::EndGame => {
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
        !self.state.game_over
    }

    fn can_load_game_state_currently(&self) -> bool {
        true
    }

    fn save_state_payload(&self, _ctx: &EngineContext) -> Result<Vec<u8>, EngineError> {
        encode_payload(&self.state).map_err(|err| EngineError::writing("eob state", err))
    }

    fn load_state_payload(
        &mut self,
        ctx: &mut EngineContext,
        payload: &[u8],
    ) -> Result<(), EngineError> {
        let state: EobState =
            decode_payload(payload).map_err(|err| EngineError::reading("eob state", err))?;
        if self.data.level.is_wall(state.position) {
            return Err(EngineError::ReadingFailed(format!(
                "saved party position {},{} is not on the map of {}",
                state.position.x, state.position.y, self.data.title
            )));
        }
        if let Some(bad) = state
            .monsters
            .iter()
            .find(|m| m.monster_type >= self.data.monster_types.len())
        {
            return Err(EngineError::ReadingFailed(format!(
                "saved monster type {} is unknown",
                bad.monster_type
            )));
        }
        self.state = state;
        if let Some(timer) = self.end_timer.take() {
            self.timers.cancel(timer);
        }
        self.resolve_end(ctx.now());
        Ok(())
    }

    /// The level grid with the party and monsters marked.
    fn thumbnail(&self) -> Option<Thumbnail> {
        let level = &self.data.level;
        let mut thumb = Thumbnail::new(THUMBNAIL_WIDTH, THUMBNAIL_HEIGHT, rgb565(0, 0, 0));
        let cell = (i32::from(THUMBNAIL_WIDTH) / level.width.max(1))
            .min(i32::from(THUMBNAIL_HEIGHT) / level.height.max(1))
            .max(1);
        let mut paint = |at: Position, color: u16| {
            let (x, y) = ((at.x * cell) as u16, (at.y * cell) as u16);
            let size = cell as u16;
            thumb.fill_rect(x, y, x.saturating_add(size), y.saturating_add(size), color);
        };
        for y in 0..level.height {
            for x in 0..level.width {
                let at = Position::new(x, y);
                let color = if level.is_wall(at) {
                    rgb565(96, 96, 96)
                } else {
                    rgb565(24, 24, 48)
                };
                paint(at, color);
            }
        }
        for monster in self.state.monsters.iter().filter(|m| m.is_alive()) {
            paint(monster.position, rgb565(200, 32, 32));
        }
        paint(self.state.position, 0xffff);
        Some(thumb)
    }

    fn total_play_time(&self) -> u32 {
        (self.play_time_ms / 1000) as u32
    }

    fn set_total_play_time(&mut self, secs: u32) {
        self.play_time_ms = u64::from(secs) * 1000;
    }

    fn status_snapshot(&self) -> serde_json::Value {
        let party: Vec<_> = self
            .state
            .party
            .iter()
            .map(|c| {
                json!({
                    "name": c.name,
                    "hp": c.hp,
                    "hp_max": c.hp_max,
                    "status": c.status,
                    "experience": c.experience,
                    "memorized": c.memorized,
                })
            })
            .collect();
        json!({
            "engine": ENGINE_ID,
            "game_id": self.game_id,
            "title": self.data.title,
            "position": self.state.position,
            "direction": self.state.direction,
            "party": party,
            "monsters_alive": self.state.monsters.iter().filter(|m| m.is_alive()).count(),
            "bless": self.state.bless,
            "ticks": self.state.ticks,
            "seconds": self.state.seconds,
            "game_over": self.state.game_over,
            "messages": self.state.messages,
        })
    }
}
