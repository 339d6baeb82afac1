//! The planning engine.
//!
//! - [`Session`] owns all state and drives everything below
//! - [`Context`] is one hypothesized story world with its [`Actor`]s
//! - [`Subgoal`] nodes form each actor's goal trees; [`Demon`]s suspend them
//! - the [`PlanRegistry`] maps objectives to planning agent bodies, which
//!   run through a [`Planner`] handle
//! - the scheduler ([`Session::pass`], [`Session::main_loop`]) and the spin
//!   controller ([`Session::spin_to`]) move time forward

pub mod actor;
pub mod context;
pub mod demon;
pub mod emotion;
pub mod planner;
pub mod registry;
pub mod report;
pub mod scheduler;
pub mod session;
pub mod spin;
pub mod state;
pub mod subgoal;

pub use actor::{Actor, Antecedent, CHANNEL_MAX, Friend, SyntacticRole};
pub use context::{Context, ContextId, Rsn};
pub use demon::{Demon, DemonTrigger};
pub use emotion::{BasicEmotions, EmotionHook, NoEmotions};
pub use planner::{Frame, Planner};
pub use registry::{PlanEntry, PlanFn, PlanRegistry, Tier};
pub use report::{ActorReport, ContextReport, SubgoalReport};
pub use session::{ContextResult, Session, SessionBuilder};
pub use state::{GoalStatus, Mode, SubgoalState};
pub use subgoal::{Locals, Subgoal, SubgoalId};
