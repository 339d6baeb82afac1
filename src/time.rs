//! Story time: timestamps, durations and validity ranges.
//!
//! Story time is a count of seconds on the simulated narrative clock. It is
//! distinct from wall-clock time, although PERFORMANCE runs compare the two
//! through a [`Clock`](crate::channel::Clock).
//!
//! A [`TsRange`] is a closed interval whose ends may be open (`None`):
//!
//! - **state** facts start at a time and hold until retracted (`[t, ∞)`)
//! - **action** facts cover the interval the action takes (`[t, t+d]`)
//! - **NA** ranges (both ends open and flagged unknown) carry no information

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ParseError;

/// Signed number of seconds.
pub type Dur = i64;

pub const SECONDS_PER_MINUTE: Dur = 60;
pub const SECONDS_PER_HOUR: Dur = 3600;
pub const SECONDS_PER_DAY: Dur = 86_400;

/// A point on the story clock, in seconds.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ts(i64);

impl Ts {
    pub const ZERO: Ts = Ts(0);

    pub fn from_secs(secs: i64) -> Self {
        Ts(secs)
    }

    pub fn secs(self) -> i64 {
        self.0
    }

    /// This timestamp moved forward by `dur` seconds.
    pub fn plus(self, dur: Dur) -> Ts {
        Ts(self.0 + dur)
    }

    /// Seconds from `earlier` to `self`.
    pub fn since(self, earlier: Ts) -> Dur {
        self.0 - earlier.0
    }

    /// Seconds elapsed since midnight of this timestamp's day.
    pub fn time_of_day(self) -> Dur {
        self.0.rem_euclid(SECONDS_PER_DAY)
    }

    /// Midnight at the start of this timestamp's day.
    pub fn midnight(self) -> Ts {
        Ts(self.0 - self.time_of_day())
    }

    /// `hour:00` on the same day.
    pub fn at_hour(self, hour: i64) -> Ts {
        self.midnight().plus(hour * SECONDS_PER_HOUR)
    }

    pub fn day(self) -> i64 {
        self.0.div_euclid(SECONDS_PER_DAY)
    }

    pub fn same_day(self, other: Ts) -> bool {
        self.day() == other.day()
    }
}

impl fmt::Display for Ts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tod = self.time_of_day();
        write!(
            f,
            "d{}+{:02}:{:02}:{:02}",
            self.day(),
            tod / SECONDS_PER_HOUR,
            (tod % SECONDS_PER_HOUR) / SECONDS_PER_MINUTE,
            tod % SECONDS_PER_MINUTE
        )
    }
}

/// Parses what [`Display`](fmt::Display) prints, the same without the day
/// (`08:30`, `08:30:15`), or plain seconds.
impl FromStr for Ts {
    type Err = ParseError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let bad = || ParseError::BadTime {
            text: text.to_string(),
        };
        let trimmed = text.trim();
        if let Ok(secs) = trimmed.parse::<i64>() {
            return Ok(Ts(secs));
        }
        let (day, clock) = match trimmed.strip_prefix('d').and_then(|t| t.split_once('+')) {
            Some((day, clock)) => (day.parse::<i64>().map_err(|_| bad())?, clock),
            None => (0, trimmed),
        };
        let fields: Vec<i64> = clock
            .split(':')
            .map(|f| f.parse::<i64>().map_err(|_| bad()))
            .collect::<Result<_, _>>()?;
        let (h, m, s) = match fields[..] {
            [h, m] => (h, m, 0),
            [h, m, s] => (h, m, s),
            _ => return Err(bad()),
        };
        if !(0..24).contains(&h) || !(0..60).contains(&m) || !(0..60).contains(&s) {
            return Err(bad());
        }
        Ok(Ts(day * SECONDS_PER_DAY + h * SECONDS_PER_HOUR + m * SECONDS_PER_MINUTE + s))
    }
}

/// A closed validity interval with optionally open ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TsRange {
    pub start: Option<Ts>,
    pub stop: Option<Ts>,
}

impl TsRange {
    /// The unknown range.
    pub fn na() -> Self {
        TsRange {
            start: None,
            stop: None,
        }
    }

    pub fn is_na(&self) -> bool {
        self.start.is_none() && self.stop.is_none()
    }

    pub fn new(start: Ts, stop: Ts) -> Self {
        TsRange {
            start: Some(start),
            stop: Some(stop),
        }
    }

    /// A single instant.
    pub fn point(ts: Ts) -> Self {
        TsRange::new(ts, ts)
    }

    /// A state that begins `delay` seconds after `ts` and lasts until retracted.
    pub fn state(ts: Ts, delay: Dur) -> Self {
        TsRange {
            start: Some(ts.plus(delay)),
            stop: None,
        }
    }

    /// An action starting at `ts` and taking `dur` seconds.
    pub fn action(ts: Ts, dur: Dur) -> Self {
        TsRange::new(ts, ts.plus(dur))
    }

    pub fn contains(&self, ts: Ts) -> bool {
        self.start.is_none_or(|s| s <= ts) && self.stop.is_none_or(|e| ts <= e)
    }

    /// Whether two ranges share at least one instant. NA ranges overlap nothing.
    pub fn overlaps(&self, other: &TsRange) -> bool {
        if self.is_na() || other.is_na() {
            return false;
        }
        let starts_before_other_ends = match (self.start, other.stop) {
            (Some(s), Some(e)) => s <= e,
            _ => true,
        };
        let other_starts_before_end = match (other.start, self.stop) {
            (Some(s), Some(e)) => s <= e,
            _ => true,
        };
        starts_before_other_ends && other_starts_before_end
    }

    /// Length in seconds, if both ends are known.
    pub fn duration(&self) -> Option<Dur> {
        match (self.start, self.stop) {
            (Some(s), Some(e)) => Some(e.since(s)),
            _ => None,
        }
    }
}

impl fmt::Display for TsRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let end = |t: Option<Ts>| t.map_or_else(|| "na".to_string(), |t| t.secs().to_string());
        write!(f, "{{{} {}}}", end(self.start), end(self.stop))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_range_is_open_ended() {
        let r = TsRange::state(Ts::from_secs(10), 5);
        assert!(!r.contains(Ts::from_secs(14)));
        assert!(r.contains(Ts::from_secs(15)));
        assert!(r.contains(Ts::from_secs(1_000_000)));
    }

    #[test]
    fn action_range_is_closed() {
        let r = TsRange::action(Ts::from_secs(10), 5);
        assert!(r.contains(Ts::from_secs(10)));
        assert!(r.contains(Ts::from_secs(15)));
        assert!(!r.contains(Ts::from_secs(16)));
        assert_eq!(r.duration(), Some(5));
    }

    #[test]
    fn overlap_rules() {
        let a = TsRange::new(Ts::from_secs(0), Ts::from_secs(100));
        let b = TsRange::new(Ts::from_secs(50), Ts::from_secs(150));
        let c = TsRange::new(Ts::from_secs(101), Ts::from_secs(200));
        assert!(a.overlaps(&b));
        assert!(b.overlaps(&a));
        assert!(!a.overlaps(&c));
        assert!(!a.overlaps(&TsRange::na()));
    }

    #[test]
    fn time_of_day_helpers() {
        let t = Ts::from_secs(SECONDS_PER_DAY + 8 * SECONDS_PER_HOUR + 61);
        assert_eq!(t.day(), 1);
        assert_eq!(t.at_hour(23).secs(), SECONDS_PER_DAY + 23 * SECONDS_PER_HOUR);
        assert!(t.same_day(t.midnight()));
        assert_eq!(t.to_string(), "d1+08:01:01");
    }

    #[test]
    fn story_times_parse() {
        assert_eq!("08:30".parse::<Ts>().unwrap(), Ts::from_secs(8 * SECONDS_PER_HOUR + 30 * SECONDS_PER_MINUTE));
        assert_eq!("d1+08:01:01".parse::<Ts>().unwrap().to_string(), "d1+08:01:01");
        assert_eq!("3600".parse::<Ts>().unwrap(), Ts::from_secs(3600));
        assert!("25:00".parse::<Ts>().is_err());
        assert!("8h".parse::<Ts>().is_err());
    }
}
