// thiserror's #[error("...{field}...")] format strings reference struct fields,
// but the compiler doesn't see through the derive macro and reports false positives.
#![allow(unused_assignments)]

//! # tt-planner
//!
//! Goal-directed simulation of actors in a story world. Each actor pursues
//! goals through trees of subgoals driven by planning agents, a
//! discrete-event scheduler advances story time, and alternative
//! interpretations of what happens are kept as branching contexts ranked by
//! how much sense they make.
//!
//! ## Architecture
//!
//! - **Propositions** (`prop`, `symbol`, `time`): `[head arg ...]` facts with
//!   wildcards, variables and validity ranges
//! - **Ontology** (`ontology`): `isa` hierarchy on a `petgraph` DAG
//! - **Fact store** (`store`): per-context timestamped facts with visibility
//!   inherited from ancestor contexts
//! - **Engine** (`plan`): contexts, actors, subgoals, demons, dispatch, the
//!   scheduler and the spin controller
//! - **Planning agents** (`agents`): grasping, travel, communication,
//!   appointments, sleep and device rules
//! - **World files** (`seeds`): TOML story setups
//!
//! ## Library usage
//!
//! ```no_run
//! use tt_planner::config::PlannerConfig;
//! use tt_planner::plan::{Mode, Session};
//! use tt_planner::prop;
//! use tt_planner::time::Ts;
//!
//! let mut s = Session::new(PlannerConfig::default());
//! s.add_isa("jim", "human");
//! let cx = s.best();
//! s.assert_state(cx, Ts::ZERO, 0, prop!["at-grid", "jim", "room1", 1, 1]);
//! s.top_goal(cx, Ts::ZERO, None, prop!["near-reachable", "jim", "room1"]);
//! s.main_loop(cx, Mode::Daydreaming);
//! ```

pub mod agents;
pub mod channel;
pub mod config;
pub mod error;
pub mod ontology;
pub mod plan;
pub mod prop;
pub mod seeds;
pub mod store;
pub mod symbol;
pub mod time;
