use serde::Serialize;

/// Upper bound on how many missed periods a periodic timer replays in one
/// call; beyond that the timer is re-anchored on the current time.
const MAX_CATCH_UP: u32 = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct TimerId(u64);

#[derive(Debug, Clone)]
struct Timer<T> {
    id: TimerId,
    tag: T,
    due_ms: u64,
    period_ms: Option<u64>,
}

/// Cooperative timers fired from the game loop, tagged with caller data.
#[derive(Debug, Clone)]
pub struct TimerQueue<T> {
    timers: Vec<Timer<T>>,
    next_id: u64,
}

impl<T> Default for TimerQueue<T> {
    fn default() -> Self {
        TimerQueue {
            timers: Vec::new(),
            next_id: 0,
        }
    }
}

impl<T: Clone> TimerQueue<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule_once(&mut self, now_ms: u64, delay_ms: u64, tag: T) -> TimerId {
        self.push(now_ms + delay_ms, None, tag)
    }

    pub fn schedule_periodic(&mut self, now_ms: u64, period_ms: u64, tag: T) -> TimerId {
        let period = period_ms.max(1);
        self.push(now_ms + period, Some(period), tag)
    }

    pub fn cancel(&mut self, id: TimerId) -> bool {
        let before = self.timers.len();
        self.timers.retain(|t| t.id != id);
        before != self.timers.len()
    }

    pub fn clear(&mut self) {
        self.timers.clear();
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    /// Absolute time of the earliest pending timer.
    pub fn next_due(&self) -> Option<u64> {
        self.timers.iter().map(|t| t.due_ms).min()
    }

    /// Fires every timer due at `now_ms`, in due order; a periodic timer
    /// fires once per elapsed period.
    pub fn fire_due(&mut self, now_ms: u64) -> Vec<T> {
        let mut fired: Vec<(u64, TimerId, T)> = Vec::new();
        let mut expired = Vec::new();
        for timer in &mut self.timers {
            let mut count = 0;
            while timer.due_ms <= now_ms {
                fired.push((timer.due_ms, timer.id, timer.tag.clone()));
                match timer.period_ms {
                    Some(period) => {
                        count += 1;
                        if count >= MAX_CATCH_UP {
                            timer.due_ms = now_ms + period;
                            break;
                        }
                        timer.due_ms += period;
                    }
                    None => {
                        expired.push(timer.id);
                        break;
                    }
                }
            }
        }
        self.timers.retain(|t| !expired.contains(&t.id));
        fired.sort_by_key(|(due, id, _)| (*due, *id));
        fired.into_iter().map(|(_, _, tag)| tag).collect()
    }

    fn push(&mut self, due_ms: u64, period_ms: Option<u64>, tag: T) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        self.timers.push(Timer {
            id,
            tag,
            due_ms,
            period_ms,
        });
        id
    }
}
