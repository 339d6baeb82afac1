//! The planner's view of the outside world: a clock and an input channel.
//!
//! In PERFORMANCE mode the scheduler never runs a subgoal ahead of the
//! [`Clock`], and after each tick it pulls one unit of understood input from
//! the [`InputChannel`]. Idle demons compare against the channel's idle time.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::prop::Proposition;
use crate::symbol::Symbol;
use crate::time::{Dur, Ts};

/// Source of "now".
pub trait Clock {
    fn now(&self) -> Ts;
}

/// Wall-clock seconds since the Unix epoch.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Ts {
        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0);
        Ts::from_secs(secs)
    }
}

/// A clock that only moves when told to. Clones share the same time.
#[derive(Debug, Default, Clone)]
pub struct ManualClock(Arc<AtomicI64>);

impl ManualClock {
    pub fn new(start: Ts) -> Self {
        ManualClock(Arc::new(AtomicI64::new(start.secs())))
    }

    pub fn set(&self, ts: Ts) {
        self.0.store(ts.secs(), Ordering::SeqCst);
    }

    pub fn advance(&self, dur: Dur) {
        self.0.fetch_add(dur, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Ts {
        Ts::from_secs(self.0.load(Ordering::SeqCst))
    }
}

/// One understood piece of input.
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    /// A state that starts now.
    Assert(Proposition),
    /// An action that starts now and takes `dur` seconds.
    Action { prop: Proposition, dur: Dur },
    /// End the validity of matching facts now.
    Retract(Proposition),
    /// Someone takes on a goal.
    Goal {
        actor: Option<Symbol>,
        objective: Proposition,
    },
    /// `[appointment actor counterpart location goal range]` was agreed.
    Appointment(Proposition),
    /// `[appointment actor counterpart ...]` was called off.
    CancelAppointment(Proposition),
}

/// Everything read in one go, e.g. one sentence.
pub type InputUnit = Vec<InputEvent>;

/// Discourse input as the planner consumes it.
pub trait InputChannel {
    /// Seconds since the last input arrived.
    fn idle_time(&self, now: Ts) -> Dur;
    fn was_recent_activity(&self) -> bool;
    fn clear_activity(&mut self);
    /// Read one more unit of input. `None` at end of stream.
    fn read_unit(&mut self, now: Ts) -> Option<InputUnit>;
}

/// Input replayed from a fixed script.
#[derive(Debug, Default, Clone)]
pub struct ScriptedChannel {
    units: VecDeque<InputUnit>,
    last_input: Ts,
    recent: bool,
}

impl ScriptedChannel {
    pub fn new(start: Ts) -> Self {
        ScriptedChannel {
            units: VecDeque::new(),
            last_input: start,
            recent: false,
        }
    }

    pub fn with_units(start: Ts, units: impl IntoIterator<Item = InputUnit>) -> Self {
        let mut channel = Self::new(start);
        channel.units.extend(units);
        channel
    }

    pub fn push(&mut self, unit: InputUnit) {
        self.units.push_back(unit);
    }

    pub fn remaining(&self) -> usize {
        self.units.len()
    }
}

impl InputChannel for ScriptedChannel {
    fn idle_time(&self, now: Ts) -> Dur {
        now.since(self.last_input).max(0)
    }

    fn was_recent_activity(&self) -> bool {
        self.recent
    }

    fn clear_activity(&mut self) {
        self.recent = false;
    }

    fn read_unit(&mut self, now: Ts) -> Option<InputUnit> {
        let unit = self.units.pop_front()?;
        self.last_input = now;
        self.recent = true;
        Some(unit)
    }
}

/// Input released on a story-time schedule, pacing a [`ManualClock`].
///
/// Every read moves the shared clock on by `tick`, so a PERFORMANCE run
/// advances story time one tick per scheduler pass. A unit is handed out
/// once the clock has reached its time; before that a read yields an empty
/// unit. After the last unit the channel keeps ticking for `linger`
/// seconds so the consequences of the final input can play out, then ends.
#[derive(Debug, Clone)]
pub struct ReplayChannel {
    clock: ManualClock,
    tick: Dur,
    linger: Dur,
    pending: VecDeque<(Ts, InputUnit)>,
    last_input: Ts,
    last_due: Ts,
    recent: bool,
}

impl ReplayChannel {
    pub fn new(clock: ManualClock, tick: Dur, linger: Dur) -> Self {
        let start = clock.now();
        ReplayChannel {
            clock,
            tick: tick.max(1),
            linger,
            pending: VecDeque::new(),
            last_input: start,
            last_due: start,
            recent: false,
        }
    }

    /// Schedule `unit` for story time `at`. Units are kept in time order.
    pub fn schedule(&mut self, at: Ts, unit: InputUnit) {
        let pos = self.pending.partition_point(|(t, _)| *t <= at);
        self.pending.insert(pos, (at, unit));
        self.last_due = self.last_due.max(at);
    }

    pub fn remaining(&self) -> usize {
        self.pending.len()
    }
}

impl InputChannel for ReplayChannel {
    fn idle_time(&self, now: Ts) -> Dur {
        now.since(self.last_input).max(0)
    }

    fn was_recent_activity(&self) -> bool {
        self.recent
    }

    fn clear_activity(&mut self) {
        self.recent = false;
    }

    fn read_unit(&mut self, now: Ts) -> Option<InputUnit> {
        if self.pending.front().is_some_and(|(at, _)| *at <= now) {
            let (_, unit) = self.pending.pop_front()?;
            self.last_input = now;
            self.recent = true;
            return Some(unit);
        }
        if self.pending.is_empty() && now >= self.last_due.plus(self.linger) {
            return None;
        }
        self.clock.advance(self.tick);
        Some(Vec::new())
    }
}
