//! The daily sleep cycle, run as a top-level handler for every actor.
//!
//! Restedness and energy run from 1 (just woken) to -1 (exhausted). Awake,
//! they fall linearly over the waking part of the actor's circadian
//! rhythm; asleep, they rise over the ideal sleep time. Without a recent
//! reading they are estimated from the time of day.

use tracing::debug;

use crate::plan::{Locals, Mode, Planner, SubgoalState};
use crate::prop;
use crate::symbol::Symbol;
use crate::time::{SECONDS_PER_DAY, SECONDS_PER_HOUR, SECONDS_PER_MINUTE, Ts};

use super::args;

const DEFAULT_SLEEP_TIME: f64 = 8.0 * SECONDS_PER_HOUR as f64;
const DEFAULT_CIRCADIAN: f64 = 24.0 * SECONDS_PER_HOUR as f64;

/// Below this an awake actor heads for bed.
const EXHAUSTED: f64 = -0.9;
/// Below this an actor lying in bed falls asleep.
const DROWSY: f64 = -0.8;
/// Above this a sleeping actor wakes up.
const RESTED: f64 = 0.9;

/// Rest weighs more than energy in how sleepy an actor feels.
fn combined(rest: f64, energy: f64) -> f64 {
    0.8 * rest + 0.2 * energy
}

fn relation_secs(p: &Planner<'_>, relation: &str, a: &Symbol, default: f64) -> f64 {
    p.view()
        .first(&prop![relation, a, "*"])
        .and_then(|f| f.num(2))
        .unwrap_or(default)
}

/// The most recent `hour` o'clock at or before `ts`.
fn last_hour(ts: Ts, hour: i64) -> Ts {
    let at = ts.at_hour(hour);
    if at > ts { at.plus(-SECONDS_PER_DAY) } else { at }
}

/// The next `hour` o'clock after `ts`.
fn next_hour(ts: Ts, hour: i64) -> Ts {
    let at = ts.at_hour(hour);
    if at <= ts { at.plus(SECONDS_PER_DAY) } else { at }
}

/// Update and return the actor's sleepiness level.
///
/// With `estimate` set, or when the last reading was on another day, the
/// levels are estimated from the time since the usual bedtime or wake time.
fn levels(p: &mut Planner<'_>, a: &Symbol, estimate: bool, asleep: bool) -> f64 {
    let sleep_time = relation_secs(p, "ideal-sleep-of", a, DEFAULT_SLEEP_TIME);
    let circadian = relation_secs(p, "circadian-rhythm-of", a, DEFAULT_CIRCADIAN);
    let awake_time = (circadian - sleep_time).max(1.0);
    let (bedtime, wake) = (p.config().sleep.bedtime_hour, p.config().sleep.wake_hour);
    let ts = p.ts();
    let last = match p.locals() {
        Some(Locals::Sleep { levels_at, .. }) => levels_at.replace(ts),
        _ => None,
    };
    let (prev_rest, prev_energy) = p
        .context()
        .and_then(|c| c.actor(a))
        .map(|ac| (ac.rest_level.unwrap_or(1.0), ac.energy_level.unwrap_or(1.0)))
        .unwrap_or((1.0, 1.0));

    let (rest, energy) = match last.filter(|l| !estimate && l.same_day(ts)) {
        Some(last) => {
            let elapsed = ts.since(last) as f64;
            let delta = if asleep {
                2.0 * elapsed / sleep_time
            } else {
                -2.0 * elapsed / awake_time
            };
            (
                (prev_rest + delta).clamp(-1.0, 1.0),
                (prev_energy + delta).clamp(-1.0, 1.0),
            )
        }
        None => {
            let level = if asleep {
                let elapsed = ts.since(last_hour(ts, bedtime)) as f64;
                -1.0 + 2.0 * elapsed / sleep_time
            } else {
                let elapsed = ts.since(last_hour(ts, wake)) as f64;
                1.0 - 2.0 * elapsed / awake_time
            };
            let level = level.clamp(-1.0, 1.0);
            (level, level)
        }
    };
    if let Some(ac) = p.actor_rec_mut() {
        ac.rest_level = Some(rest);
        ac.energy_level = Some(energy);
    }
    combined(rest, energy)
}

fn set_bed(p: &mut Planner<'_>, chosen: Symbol) {
    if let Some(Locals::Sleep { bed, .. }) = p.locals() {
        *bed = Some(chosen);
    }
}

fn bed(p: &mut Planner<'_>) -> Option<Symbol> {
    match p.locals() {
        Some(Locals::Sleep { bed, .. }) => bed.clone(),
        _ => None,
    }
}

/// `[sleep a]`
pub fn sleep(p: &mut Planner<'_>) {
    let Some([a]) = args(p, [1]) else {
        return;
    };
    match p.state() {
        SubgoalState::Begin => {
            levels(p, &a, true, false);
            p.retract(&prop!["asleep", &a]);
            p.assert_state(0, prop!["awake", &a]);
            p.step(100);
        }
        // Awake: watch for sleepiness.
        SubgoalState::Step(100) => {
            let spinning_to_bed = p.mode() == Mode::Spinning
                && p.spin_to().step().is_some_and(|n| n >= 200);
            if spinning_to_bed {
                return p.step(200);
            }
            if levels(p, &a, false, false) < EXHAUSTED {
                debug!(actor = %a, "exhausted");
                return p.step(200);
            }
            let ts = p.ts();
            if ts > ts.at_hour(p.config().sleep.bedtime_hour) {
                return p.step(200);
            }
            let interval = p.config().sleep.check_interval;
            p.wait_for(interval, SubgoalState::Step(100));
        }
        // Time for bed.
        SubgoalState::Step(200) => {
            let found = {
                let view = p.view();
                view.all_syms(1, &prop!["owner-of", "*", &a])
                    .into_iter()
                    .find(|o| view.isa("bed", o))
            };
            let Some(chosen) = found else {
                debug!(actor = %a, "no bed");
                return p.failure();
            };
            set_bed(p, chosen.clone());
            p.sub_step(210, prop!["near-reachable", &a, &chosen]);
        }
        SubgoalState::Step(210) => {
            p.sub_step(220, prop!["strip", &a]);
        }
        SubgoalState::Step(220) => {
            let Some(chosen) = bed(p) else {
                return p.failure();
            };
            p.sub_step(300, prop!["lie-on", &a, &chosen]);
        }
        // Trying to fall asleep.
        SubgoalState::Step(300) => {
            if levels(p, &a, false, false) < DROWSY {
                return p.step(400);
            }
            p.wait_for(SECONDS_PER_MINUTE, SubgoalState::Step(300));
        }
        SubgoalState::Step(400) => {
            debug!(actor = %a, ts = %p.ts(), "falls asleep");
            p.retract(&prop!["awake", &a]);
            p.assert_state(0, prop!["asleep", &a]);
            p.step(410);
        }
        // Asleep.
        SubgoalState::Step(410) => {
            if p.mode() == Mode::Spinning && p.spin_to() == SubgoalState::Step(100) {
                let wake = next_hour(p.ts(), p.config().sleep.wake_hour);
                p.set_ts(wake);
                return p.goto(SubgoalState::Begin);
            }
            if levels(p, &a, false, true) > RESTED {
                return p.step(500);
            }
            p.wait_ptn(false, SubgoalState::Step(500), prop!["wake", "*", &a]);
            let interval = p.config().sleep.wake_check_interval;
            p.wait_for(interval, SubgoalState::Step(410));
        }
        // Waking up.
        SubgoalState::Step(500) => {
            debug!(actor = %a, ts = %p.ts(), "wakes up");
            p.retract(&prop!["asleep", &a]);
            p.assert_state(0, prop!["awake", &a]);
            p.step(100);
        }
        _ => p.undefined("sleep"),
    }
}

/// `[strip a]`: take off everything `a` is wearing (`[wearing-of a c]`),
/// one item per step.
pub fn strip(p: &mut Planner<'_>) {
    let Some([a]) = args(p, [1]) else {
        return;
    };
    match p.state() {
        SubgoalState::Begin => {
            let worn = p.view().all_syms(2, &prop!["wearing-of", &a, "*"]);
            if let Some(locals) = p.locals() {
                *locals = Locals::Strip { remaining: worn };
            }
            p.step(1);
        }
        SubgoalState::Step(1) => {
            let next = match p.locals() {
                Some(Locals::Strip { remaining }) => remaining.pop(),
                _ => None,
            };
            let Some(item) = next else {
                return p.success();
            };
            let d = p.duration("take-off");
            p.assert_action(d, prop!["take-off", &a, &item]);
            p.advance(d);
            p.retract(&prop!["wearing-of", &a, &item]);
            p.step(1);
        }
        _ => p.undefined("strip"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hours_wrap_around_midnight() {
        let ten_pm = Ts::from_secs(SECONDS_PER_DAY + 22 * SECONDS_PER_HOUR);
        assert_eq!(last_hour(ten_pm, 23), Ts::from_secs(23 * SECONDS_PER_HOUR));
        assert_eq!(last_hour(ten_pm, 7), Ts::from_secs(SECONDS_PER_DAY + 7 * SECONDS_PER_HOUR));
        assert_eq!(next_hour(ten_pm, 7), Ts::from_secs(2 * SECONDS_PER_DAY + 7 * SECONDS_PER_HOUR));
        assert_eq!(next_hour(ten_pm, 23), Ts::from_secs(SECONDS_PER_DAY + 23 * SECONDS_PER_HOUR));
    }

    #[test]
    fn rest_counts_more_than_energy() {
        assert!((combined(1.0, -1.0) - 0.6).abs() < 1e-9);
        assert!((combined(-1.0, 1.0) + 0.6).abs() < 1e-9);
    }
}
