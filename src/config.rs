//! Planner configuration, persisted as TOML.
//!
//! Every field has a default, so an empty file (or no file) is a valid
//! configuration. `ttplan dump-config` prints the defaults.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::time::{Dur, SECONDS_PER_MINUTE};

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Tunables for the scheduler and the bundled planning agents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// Consecutive ticks without progress after which a non-PERFORMANCE
    /// main loop stops.
    pub no_activity_limit: u32,
    /// Actor used when a goal names none and has no supergoal.
    pub default_actor: String,
    /// Only actors of this class are scheduled.
    pub actor_class: String,
    /// Top-level handler goals started for every newly created actor.
    pub handlers: Vec<String>,
    /// Seconds an action takes, keyed by the action's head.
    pub durations: HashMap<String, Dur>,
    /// Seconds for actions missing from `durations`.
    pub default_duration: Dur,
    /// Grid distance at which an object counts as within reach.
    pub reach: i64,
    pub appointment: AppointmentConfig,
    pub sleep: SleepConfig,
}

/// Appointment keeping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppointmentConfig {
    /// How early an actor leaves, in seconds before the latest leave time.
    pub punctuality: Dur,
    /// How long an actor waits for a late counterpart.
    pub wait_limit: Dur,
    /// Poll interval while waiting at the meeting place.
    pub retry_interval: Dur,
    /// Assumed travel time to the meeting place.
    pub travel_allowance: Dur,
    /// Sense at or above which a proposed appointment is accepted.
    pub accept_sense: f64,
}

/// Sleep cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SleepConfig {
    pub bedtime_hour: i64,
    pub wake_hour: i64,
    /// How often an awake actor reconsiders going to bed.
    pub check_interval: Dur,
    /// How often a sleeping actor reconsiders waking.
    pub wake_check_interval: Dur,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        let durations = [
            ("grasp", 1),
            ("release", 1),
            ("move-to", 2),
            ("action-open", 2),
            ("action-close", 2),
            ("connect-to", 3),
            ("rub", 5),
            ("pour-onto", 3),
            ("flip-to", 1),
            ("gesture-here", 1),
            ("grid-walk", 1),
            ("grid-drive-car", 1),
            ("warp", 5),
            ("sit-on", 3),
            ("stand-on", 2),
            ("lie-on", 3),
            ("take-off", 20),
            ("mtrans", 5),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();
        Self {
            no_activity_limit: 50,
            default_actor: "human".into(),
            actor_class: "animal".into(),
            handlers: vec!["handle-proposal".into(), "sleep".into()],
            durations,
            default_duration: 1,
            reach: 1,
            appointment: AppointmentConfig::default(),
            sleep: SleepConfig::default(),
        }
    }
}

impl Default for AppointmentConfig {
    fn default() -> Self {
        Self {
            punctuality: 5 * SECONDS_PER_MINUTE,
            wait_limit: 15 * SECONDS_PER_MINUTE,
            retry_interval: SECONDS_PER_MINUTE,
            travel_allowance: 30,
            accept_sense: 0.5,
        }
    }
}

impl Default for SleepConfig {
    fn default() -> Self {
        Self {
            bedtime_hour: 23,
            wake_hour: 7,
            check_interval: 15 * SECONDS_PER_MINUTE,
            wake_check_interval: 15 * SECONDS_PER_MINUTE,
        }
    }
}

impl PlannerConfig {
    /// Seconds the action named `head` takes.
    pub fn duration_of(&self, head: &str) -> Dur {
        self.durations
            .get(head)
            .copied()
            .unwrap_or(self.default_duration)
    }

    /// Parse a configuration from TOML text.
    pub fn from_toml_str(text: &str, origin: &str) -> ConfigResult<Self> {
        let config: PlannerConfig = toml::from_str(text).map_err(|e| ConfigError::Parse {
            path: origin.to_string(),
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> ConfigResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::from_toml_str(&text, &path.display().to_string())
    }

    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        let text = self.to_toml()?;
        std::fs::write(path, text).map_err(|e| ConfigError::Write {
            path: path.display().to_string(),
            source: e,
        })
    }

    pub fn to_toml(&self) -> ConfigResult<String> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Invalid {
            key: "<root>".into(),
            message: e.to_string(),
        })
    }

    fn validate(&self) -> ConfigResult<()> {
        if self.default_duration < 0 {
            return Err(ConfigError::Invalid {
                key: "default_duration".into(),
                message: "must not be negative".into(),
            });
        }
        if let Some((k, _)) = self.durations.iter().find(|(_, d)| **d < 0) {
            return Err(ConfigError::Invalid {
                key: format!("durations.{k}"),
                message: "must not be negative".into(),
            });
        }
        for (key, hour) in [
            ("sleep.bedtime_hour", self.sleep.bedtime_hour),
            ("sleep.wake_hour", self.sleep.wake_hour),
        ] {
            if !(0..24).contains(&hour) {
                return Err(ConfigError::Invalid {
                    key: key.into(),
                    message: format!("{hour} is not an hour of the day"),
                });
            }
        }
        Ok(())
    }
}
