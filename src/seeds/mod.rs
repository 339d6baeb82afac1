//! World files: story setups for the planner.
//!
//! A world is a TOML document naming the class links, the facts that hold
//! when the story starts, the goals and appointments actors begin with, and
//! input to feed a PERFORMANCE run on a schedule. Two worlds are bundled
//! into the binary: `meeting` and `bedtime`.
//!
//! ```toml
//! [world]
//! id = "example"
//! start = "08:00"
//! horizon = "12:00"
//! isa = [["jim", "human"]]
//! facts = ["[at-grid jim room1 1 1]"]
//!
//! [[goal]]
//! actor = "jim"
//! objective = "[near-reachable jim room1]"
//!
//! [[input]]
//! at = "08:05"
//! assert = ["[ring phone1]"]
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use miette::Diagnostic;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::agents::appointment::appointment_make;
use crate::channel::{InputEvent, InputUnit, ManualClock, ReplayChannel};
use crate::config::PlannerConfig;
use crate::plan::{ContextId, Mode, Session};
use crate::prop::Proposition;
use crate::symbol::Symbol;
use crate::time::{Dur, Ts};

// -- Errors -----------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum WorldError {
    #[error("world not found: \"{id}\"")]
    #[diagnostic(
        code(tt::world::not_found),
        help("Pass a path to a world TOML file, or one of the bundled worlds listed by `ttplan check --list`.")
    )]
    NotFound { id: String },

    #[error("failed to parse world \"{origin}\": {message}")]
    #[diagnostic(
        code(tt::world::parse),
        help("Check the TOML syntax, and that propositions are written as `[head arg ...]`.")
    )]
    Parse { origin: String, message: String },

    #[error("failed to read world file: {path}")]
    #[diagnostic(code(tt::world::io), help("Ensure the file exists and is readable."))]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid world \"{origin}\": {message}")]
    #[diagnostic(code(tt::world::invalid))]
    Invalid { origin: String, message: String },
}

pub type WorldResult<T> = std::result::Result<T, WorldError>;

// -- World data model -------------------------------------------------------

/// Where a world came from.
#[derive(Debug, Clone, PartialEq)]
pub enum WorldSource {
    /// Bundled into the binary via `include_str!`.
    Bundled,
    /// Loaded from a file.
    File(PathBuf),
    /// Parsed from text handed in by the caller.
    Inline,
}

/// A goal an actor holds from the start, or takes on at `at`.
#[derive(Debug, Clone, PartialEq)]
pub struct WorldGoal {
    pub actor: Option<Symbol>,
    pub objective: Proposition,
    pub at: Option<Ts>,
}

/// A parsed world.
#[derive(Debug, Clone)]
pub struct World {
    pub id: String,
    pub name: String,
    pub description: String,
    pub start: Ts,
    pub horizon: Option<Ts>,
    pub isa: Vec<(Symbol, Symbol)>,
    /// Actors present from the start, with their handler goals running.
    pub actors: Vec<Symbol>,
    pub facts: Vec<Proposition>,
    pub goals: Vec<WorldGoal>,
    pub appointments: Vec<Proposition>,
    /// Input units in time order.
    pub input: Vec<(Ts, InputUnit)>,
    pub source: WorldSource,
}

/// What applying a world to a session did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorldReport {
    pub links: usize,
    pub actors: usize,
    pub facts: usize,
    pub goals: usize,
    pub appointments: usize,
    pub input_units: usize,
}

// -- TOML deserialization helpers -------------------------------------------

/// Story time as seconds or as text such as `08:30` or `d1+07:00:00`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum TimeSpec {
    Secs(i64),
    Text(String),
}

impl TimeSpec {
    fn resolve(&self, origin: &str) -> WorldResult<Ts> {
        match self {
            TimeSpec::Secs(s) => Ok(Ts::from_secs(*s)),
            TimeSpec::Text(t) => t.parse().map_err(|e: crate::error::ParseError| WorldError::Invalid {
                origin: origin.to_string(),
                message: e.to_string(),
            }),
        }
    }
}

#[derive(Debug, Deserialize)]
struct WorldToml {
    world: WorldMeta,
    #[serde(default)]
    goal: Vec<GoalToml>,
    #[serde(default)]
    input: Vec<InputToml>,
}

#[derive(Debug, Deserialize)]
struct WorldMeta {
    id: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    description: String,
    #[serde(default)]
    start: Option<TimeSpec>,
    #[serde(default)]
    horizon: Option<TimeSpec>,
    #[serde(default)]
    isa: Vec<(String, String)>,
    #[serde(default)]
    actors: Vec<String>,
    #[serde(default)]
    facts: Vec<Proposition>,
    #[serde(default)]
    appointments: Vec<Proposition>,
}

#[derive(Debug, Deserialize)]
struct GoalToml {
    #[serde(default)]
    actor: Option<String>,
    objective: Proposition,
    #[serde(default)]
    at: Option<TimeSpec>,
}

#[derive(Debug, Deserialize)]
struct InputToml {
    at: TimeSpec,
    #[serde(default)]
    assert: Vec<Proposition>,
    #[serde(default)]
    retract: Vec<Proposition>,
    /// Actions keyed by how many seconds they take.
    #[serde(default)]
    actions: BTreeMap<String, Vec<Proposition>>,
    #[serde(default)]
    goals: Vec<GoalToml>,
    #[serde(default)]
    appointments: Vec<Proposition>,
    #[serde(default)]
    cancel: Vec<Proposition>,
}

impl InputToml {
    fn into_unit(self, origin: &str) -> WorldResult<InputUnit> {
        let mut unit: InputUnit = Vec::new();
        unit.extend(self.assert.into_iter().map(InputEvent::Assert));
        unit.extend(self.retract.into_iter().map(InputEvent::Retract));
        for (dur, props) in self.actions {
            let dur: Dur = dur.parse().map_err(|_| WorldError::Invalid {
                origin: origin.to_string(),
                message: format!("action duration `{dur}` is not a number of seconds"),
            })?;
            unit.extend(props.into_iter().map(|prop| InputEvent::Action { prop, dur }));
        }
        unit.extend(self.goals.into_iter().map(|g| InputEvent::Goal {
            actor: g.actor.map(Symbol::from),
            objective: g.objective,
        }));
        unit.extend(self.appointments.into_iter().map(InputEvent::Appointment));
        unit.extend(self.cancel.into_iter().map(InputEvent::CancelAppointment));
        Ok(unit)
    }
}

// -- Bundled worlds ---------------------------------------------------------

const MEETING_TOML: &str = include_str!("../../worlds/meeting.toml");
const BEDTIME_TOML: &str = include_str!("../../worlds/bedtime.toml");

/// Every bundled world, by id.
pub fn bundled_worlds() -> Vec<World> {
    [(MEETING_TOML, "meeting"), (BEDTIME_TOML, "bedtime")]
        .iter()
        .filter_map(|(toml, id)| match World::parse(toml, id, WorldSource::Bundled) {
            Ok(world) => Some(world),
            Err(e) => {
                warn!(world = id, "failed to parse bundled world: {e}");
                None
            }
        })
        .collect()
}

impl World {
    /// Parse a world from TOML text. `origin` names it in errors.
    pub fn from_toml_str(text: &str, origin: &str) -> WorldResult<World> {
        Self::parse(text, origin, WorldSource::Inline)
    }

    pub fn load(path: &Path) -> WorldResult<World> {
        let text = std::fs::read_to_string(path).map_err(|e| WorldError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::parse(&text, &path.display().to_string(), WorldSource::File(path.to_path_buf()))
    }

    /// A bundled world by id, or else a world file at that path.
    pub fn resolve(name: &str) -> WorldResult<World> {
        if let Some(world) = bundled_worlds().into_iter().find(|w| w.id == name) {
            return Ok(world);
        }
        let path = Path::new(name);
        if path.is_file() {
            return Self::load(path);
        }
        Err(WorldError::NotFound { id: name.to_string() })
    }

    fn parse(text: &str, origin: &str, source: WorldSource) -> WorldResult<World> {
        let parsed: WorldToml = toml::from_str(text).map_err(|e| WorldError::Parse {
            origin: origin.to_string(),
            message: e.to_string(),
        })?;
        let meta = parsed.world;
        let start = match &meta.start {
            Some(t) => t.resolve(origin)?,
            None => Ts::ZERO,
        };
        let horizon = meta.horizon.as_ref().map(|t| t.resolve(origin)).transpose()?;
        if horizon.is_some_and(|h| h < start) {
            return Err(WorldError::Invalid {
                origin: origin.to_string(),
                message: "horizon is before the start time".into(),
            });
        }
        let goals = parsed
            .goal
            .into_iter()
            .map(|g| {
                Ok(WorldGoal {
                    actor: g.actor.map(Symbol::from),
                    objective: g.objective,
                    at: g.at.as_ref().map(|t| t.resolve(origin)).transpose()?,
                })
            })
            .collect::<WorldResult<Vec<_>>>()?;
        let mut input = Vec::with_capacity(parsed.input.len());
        for unit in parsed.input {
            let at = unit.at.resolve(origin)?;
            input.push((at, unit.into_unit(origin)?));
        }
        input.sort_by_key(|(at, _)| *at);
        Ok(World {
            name: meta.name.unwrap_or_else(|| meta.id.clone()),
            id: meta.id,
            description: meta.description,
            start,
            horizon,
            isa: meta
                .isa
                .into_iter()
                .map(|(c, p)| (Symbol::from(c), Symbol::from(p)))
                .collect(),
            actors: meta.actors.into_iter().map(Symbol::from).collect(),
            facts: meta.facts,
            goals,
            appointments: meta.appointments,
            input,
            source,
        })
    }

    /// A session set up for this world and run `mode`.
    ///
    /// PERFORMANCE sessions are paced by a manual clock that the world's
    /// input replays against, one second per scheduler pass.
    pub fn session(&self, config: PlannerConfig, mode: Mode) -> Session {
        let mut builder = Session::builder().config(config).start(self.start);
        if let Some(h) = self.horizon {
            builder = builder.horizon(h);
        }
        if mode == Mode::Performance {
            let clock = ManualClock::new(self.start);
            let linger = self.horizon.map_or(0, |h| h.since(self.start));
            let mut channel = ReplayChannel::new(clock.clone(), 1, linger);
            for (at, unit) in &self.input {
                channel.schedule(*at, unit.clone());
            }
            builder = builder.clock(clock).channel(channel);
        }
        let mut session = builder.build();
        self.apply(&mut session, mode);
        session
    }

    /// Load this world into `s`.
    ///
    /// Class links go into the ontology and facts into the root context, so
    /// every alternative sees them. Actors, goals and appointments start in
    /// the best alternative. Outside PERFORMANCE there is no input channel, so
    /// scripted input is applied up front at the times it names.
    pub fn apply(&self, s: &mut Session, mode: Mode) -> WorldReport {
        for (child, parent) in &self.isa {
            s.ontology_mut().add_isa(child, parent);
        }
        for fact in &self.facts {
            s.assert_state(ContextId::ROOT, self.start, 0, fact.clone());
        }
        let cx = s.best();
        for actor in &self.actors {
            s.actor_find_or_create(cx, actor, self.start);
        }
        for goal in &self.goals {
            let at = goal.at.unwrap_or(self.start);
            debug!(objective = %goal.objective, %at, "world goal");
            s.top_goal(cx, at, goal.actor.clone(), goal.objective.clone());
        }
        for appointment in &self.appointments {
            appointment_make(s, cx, self.start, appointment.clone());
        }
        if mode != Mode::Performance {
            for (at, unit) in &self.input {
                s.apply_input(cx, *at, unit.clone());
            }
        }
        let report = WorldReport {
            links: self.isa.len(),
            actors: self.actors.len(),
            facts: self.facts.len(),
            goals: self.goals.len(),
            appointments: self.appointments.len(),
            input_units: self.input.len(),
        };
        info!(world = %self.id, ?report, "world loaded");
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prop;

    const SMALL: &str = r#"
        [world]
        id = "small"
        start = "08:00"
        horizon = 36000
        isa = [["jim", "human"], ["room1", "room"]]
        facts = ["[at-grid jim room1 1 1]"]
        appointments = ["[appointment jim amy room1 na {43200 46800}]"]

        [[goal]]
        actor = "jim"
        objective = "[near-reachable jim room1]"

        [[input]]
        at = "09:00"
        assert = ["[ring phone1]"]
        actions.5 = ["[knock amy door1]"]

        [[input]]
        at = "08:30"
        cancel = ["[appointment jim amy]"]
    "#;

    #[test]
    fn bundled_worlds_parse() {
        let worlds = bundled_worlds();
        assert_eq!(worlds.len(), 2);
        assert!(worlds.iter().any(|w| w.id == "meeting"));
        assert!(worlds.iter().any(|w| w.id == "bedtime"));
        assert!(worlds.iter().all(|w| w.horizon.is_some()));
    }

    #[test]
    fn small_world_parses() {
        let world = World::from_toml_str(SMALL, "small").unwrap();
        assert_eq!(world.name, "small");
        assert_eq!(world.start, "08:00".parse().unwrap());
        assert_eq!(world.horizon, Some(Ts::from_secs(36000)));
        assert_eq!(world.isa[0], (Symbol::new("jim"), Symbol::new("human")));
        assert_eq!(world.facts, vec![prop!["at-grid", "jim", "room1", 1, 1]]);
        assert_eq!(world.goals[0].actor, Some(Symbol::new("jim")));
        assert_eq!(world.appointments.len(), 1);

        // Input comes out in time order.
        let (first_at, first) = &world.input[0];
        assert_eq!(*first_at, "08:30".parse().unwrap());
        assert!(matches!(first[0], InputEvent::CancelAppointment(_)));
        let (_, second) = &world.input[1];
        assert_eq!(second.len(), 2);
        assert!(matches!(second[1], InputEvent::Action { dur: 5, .. }));
    }

    #[test]
    fn bad_worlds_are_reported() {
        let err = World::from_toml_str("[world]\nid = \"x\"\nfacts = [\"[oops\"]", "x").unwrap_err();
        assert!(matches!(err, WorldError::Parse { .. }));

        let err = World::from_toml_str("[world]\nid = \"x\"\nstart = \"25:00\"", "x").unwrap_err();
        assert!(matches!(err, WorldError::Invalid { .. }));

        let err = World::from_toml_str("[world]\nid = \"x\"\nstart = 100\nhorizon = 50", "x").unwrap_err();
        assert!(matches!(err, WorldError::Invalid { .. }));

        assert!(matches!(
            World::resolve("no-such-world-anywhere"),
            Err(WorldError::NotFound { .. })
        ));
    }

    #[test]
    fn applying_puts_facts_in_the_root() {
        let world = World::from_toml_str(SMALL, "small").unwrap();
        let mut config = PlannerConfig::default();
        config.handlers = Vec::new();
        let s = world.session(config, Mode::Daydreaming);
        let view = s.view(ContextId::ROOT, world.start);
        assert!(view.is_true(&prop!["at-grid", "jim", "room1", 1, 1]));
        assert_eq!(s.horizon(), Some(Ts::from_secs(36000)));
        let best = s.best();
        assert!(s.context(best).and_then(|c| c.actor(&Symbol::new("jim"))).is_some());
    }
}
