//! Backend services the run loop talks to: a millisecond clock and a source
//! of input events.

use std::{
    collections::VecDeque,
    fs,
    path::Path,
    thread,
    time::{Duration, Instant},
};

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use svm_keymap::{Event, HardwareInput};

pub trait Clock {
    /// Milliseconds since the clock was created.
    fn millis(&self) -> u64;
    fn delay_millis(&mut self, ms: u64);
}

#[derive(Debug, Clone)]
pub struct SystemClock {
    start: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        SystemClock {
            start: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn millis(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }

    fn delay_millis(&mut self, ms: u64) {
        if ms > 0 {
            thread::sleep(Duration::from_millis(ms));
        }
    }
}

/// Clock that only advances when the loop delays; runs are reproducible.
#[derive(Debug, Clone, Default)]
pub struct VirtualClock {
    now: u64,
}

impl VirtualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&mut self, ms: u64) {
        self.now += ms;
    }
}

impl Clock for VirtualClock {
    fn millis(&self) -> u64 {
        self.now
    }

    fn delay_millis(&mut self, ms: u64) {
        self.advance(ms);
    }
}

pub trait EventSource {
    /// Next event due at or before `now_ms`, if any.
    fn poll_event(&mut self, now_ms: u64) -> Option<Event>;

    /// True once the source will never produce another event.
    fn is_exhausted(&self) -> bool {
        false
    }
}

/// Source that never produces input.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullEvents;

impl EventSource for NullEvents {
    fn poll_event(&mut self, _now_ms: u64) -> Option<Event> {
        None
    }

    fn is_exhausted(&self) -> bool {
        true
    }
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
enum InputState {
    Press,
    Release,
    Tap,
}

#[derive(Debug, Deserialize)]
struct ScriptRow {
    at_ms: u64,
    #[serde(default)]
    input: Option<String>,
    #[serde(default)]
    state: Option<InputState>,
    #[serde(default)]
    hold_ms: Option<u64>,
    #[serde(default)]
    quit: bool,
}

const DEFAULT_TAP_HOLD_MS: u64 = 50;

/// Replays a timed list of hardware inputs.
#[derive(Debug, Clone, Default)]
pub struct ScriptedEvents {
    queue: VecDeque<(u64, Event)>,
}

impl ScriptedEvents {
    pub fn new<I>(events: I) -> Self
    where
        I: IntoIterator<Item = (u64, Event)>,
    {
        let mut events: Vec<(u64, Event)> = events.into_iter().collect();
        events.sort_by_key(|(at, _)| *at);
        ScriptedEvents {
            queue: events.into(),
        }
    }

    /// Parses a script of `{ "at_ms", "input", "state" }` rows; `state` is
    /// `press`, `release` or `tap` (press plus release after `hold_ms`).
    /// A row `{ "at_ms", "quit": true }` requests shutdown.
    pub fn from_json_str(raw: &str) -> Result<Self> {
        let rows: Vec<ScriptRow> =
            serde_json::from_str(raw).context("parsing scripted input json")?;
        let mut events = Vec::with_capacity(rows.len());
        for (index, row) in rows.into_iter().enumerate() {
            if row.quit {
                events.push((row.at_ms, Event::Quit));
                continue;
            }
            let Some(id) = row.input.as_deref() else {
                bail!("script row {index} has neither an input nor quit");
            };
            let input = HardwareInput::parse(id)
                .with_context(|| format!("script row {index} names an unknown input"))?;
            match row.state.unwrap_or(InputState::Tap) {
                InputState::Press => events.push((row.at_ms, input.press_event())),
                InputState::Release => events.push((row.at_ms, input.release_event())),
                InputState::Tap => {
                    let hold = row.hold_ms.unwrap_or(DEFAULT_TAP_HOLD_MS);
                    events.push((row.at_ms, input.press_event()));
                    events.push((row.at_ms + hold, input.release_event()));
                }
            }
        }
        Ok(Self::new(events))
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading input script {}", path.display()))?;
        Self::from_json_str(&raw).with_context(|| format!("loading {}", path.display()))
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

impl EventSource for ScriptedEvents {
    fn poll_event(&mut self, now_ms: u64) -> Option<Event> {
        match self.queue.front() {
            Some((at, _)) if *at <= now_ms => self.queue.pop_front().map(|(_, event)| event),
            _ => None,
        }
    }

    fn is_exhausted(&self) -> bool {
        self.queue.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use svm_keymap::{KeyCode, KeyState, MouseButton};

    #[test]
    fn virtual_clock_advances_only_on_delay() {
        let mut clock = VirtualClock::new();
        assert_eq!(clock.millis(), 0);
        clock.delay_millis(20);
        clock.delay_millis(20);
        assert_eq!(clock.millis(), 40);
    }

    #[test]
    fn script_rows_become_timed_events() -> Result<()> {
        let raw = r#"[
            {"at_ms": 100, "input": "UP", "state": "press"},
            {"at_ms": 300, "input": "UP", "state": "release"},
            {"at_ms": 120, "input": "MOUSE_LEFT", "hold_ms": 10},
            {"at_ms": 500, "quit": true}
        ]"#;
        let mut script = ScriptedEvents::from_json_str(raw)?;
        assert_eq!(script.len(), 5);

        assert_eq!(script.poll_event(50), None);
        let up = KeyState::new(KeyCode::Up);
        assert_eq!(script.poll_event(150), Some(Event::KeyDown(up)));
        assert_eq!(script.poll_event(150), Some(Event::MouseDown(MouseButton::Left)));
        assert_eq!(script.poll_event(150), Some(Event::MouseUp(MouseButton::Left)));
        assert_eq!(script.poll_event(150), None);
        assert_eq!(script.poll_event(1000), Some(Event::KeyUp(up)));
        assert_eq!(script.poll_event(1000), Some(Event::Quit));
        assert!(script.is_exhausted());
        Ok(())
    }

    #[test]
    fn malformed_rows_are_rejected() {
        assert!(ScriptedEvents::from_json_str(r#"[{"at_ms": 0}]"#).is_err());
        assert!(ScriptedEvents::from_json_str(r#"[{"at_ms": 0, "input": "NOPE"}]"#).is_err());
    }
}
