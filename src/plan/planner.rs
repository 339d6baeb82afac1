//! The handle a planning agent body works through.
//!
//! A body is invoked with a [`Planner`] for one subgoal. Every helper acts
//! on that subgoal: its context, its clock, its objective. A body reads
//! [`Planner::state`], does one step, and leaves by starting a child
//! ([`Planner::sub`]), transitioning ([`Planner::goto`], [`Planner::success`],
//! [`Planner::failure`]) or arming a wait ([`Planner::wait_for`],
//! [`Planner::wait_ptn`], [`Planner::wait_idle`]).

use tracing::warn;

use crate::config::PlannerConfig;
use crate::prop::Proposition;
use crate::store::View;
use crate::symbol::Symbol;
use crate::time::{Dur, Ts};

use super::context::{Context, ContextId};
use super::session::Session;
use super::state::{Mode, SubgoalState};
use super::subgoal::{Locals, SubgoalId};

/// The subgoal a body is running for, captured before the call.
#[derive(Debug, Clone)]
pub struct Frame {
    pub cx: ContextId,
    pub sg: SubgoalId,
    pub actor: Symbol,
    pub objective: Proposition,
    pub state: SubgoalState,
}

/// A session borrowed for one body invocation.
pub struct Planner<'a> {
    pub s: &'a mut Session,
    pub f: Frame,
}

impl<'a> Planner<'a> {
    pub fn new(s: &'a mut Session, f: Frame) -> Self {
        Planner { s, f }
    }

    pub fn state(&self) -> SubgoalState {
        self.f.state
    }

    pub fn actor(&self) -> &Symbol {
        &self.f.actor
    }

    pub fn obj(&self) -> &Proposition {
        &self.f.objective
    }

    /// Symbol argument `i` of the objective.
    pub fn arg(&self, i: usize) -> Option<Symbol> {
        self.f.objective.sym(i).cloned()
    }

    pub fn cx(&self) -> ContextId {
        self.f.cx
    }

    pub fn context(&self) -> Option<&Context> {
        self.s.context(self.f.cx)
    }

    pub fn mode(&self) -> Mode {
        self.s.mode(self.f.cx)
    }

    pub fn config(&self) -> &PlannerConfig {
        self.s.config()
    }

    /// The subgoal's own clock.
    pub fn ts(&self) -> Ts {
        self.s.sg(self.f.cx, self.f.sg).map(|sg| sg.ts).unwrap_or(Ts::ZERO)
    }

    /// When the subgoal was started.
    pub fn start_ts(&self) -> Ts {
        self.s.sg(self.f.cx, self.f.sg).map(|sg| sg.start_ts).unwrap_or(Ts::ZERO)
    }

    /// Clock value at the subgoal's last productive tick.
    pub fn last_ts(&self) -> Ts {
        self.s.sg(self.f.cx, self.f.sg).map(|sg| sg.last_ts).unwrap_or(Ts::ZERO)
    }

    /// Move the subgoal's clock to `ts`.
    pub fn set_ts(&mut self, ts: Ts) {
        if let Some(sg) = self.s.sg_mut(self.f.cx, self.f.sg) {
            sg.ts = ts;
        }
    }

    /// The spin flag or target of this subgoal.
    pub fn spin_to(&self) -> SubgoalState {
        self.s
            .sg(self.f.cx, self.f.sg)
            .map(|sg| sg.spin_to)
            .unwrap_or(SubgoalState::NoSpin)
    }

    pub fn advance(&mut self, dur: Dur) {
        if let Some(sg) = self.s.sg_mut(self.f.cx, self.f.sg) {
            sg.ts = sg.ts.plus(dur);
        }
    }

    /// Configured duration of the objective itself, for action bodies.
    pub fn own_duration(&self) -> Dur {
        self.duration(self.f.objective.head().as_str())
    }

    /// Advance the clock by the configured duration of `action`.
    pub fn advance_by(&mut self, action: &str) {
        let dur = self.duration(action);
        self.advance(dur);
    }

    pub fn duration(&self, action: &str) -> Dur {
        self.s.config().duration_of(action)
    }

    /// What holds in this context at the subgoal's clock.
    pub fn view(&self) -> View<'_> {
        self.s.view(self.f.cx, self.ts())
    }

    pub fn trigger(&self) -> Option<Proposition> {
        self.s.sg(self.f.cx, self.f.sg).and_then(|sg| sg.trigger.clone())
    }

    /// Objective of the child most recently started by this subgoal.
    pub fn last_child(&self) -> Option<Proposition> {
        self.s.sg(self.f.cx, self.f.sg).and_then(|sg| sg.last_child.clone())
    }

    pub fn locals(&mut self) -> Option<&mut Locals> {
        self.s.sg_mut(self.f.cx, self.f.sg).map(|sg| &mut sg.locals)
    }

    // -- leaving a step -----------------------------------------------------

    pub fn goto(&mut self, state: SubgoalState) {
        self.s.transition_to(self.f.cx, self.f.sg, state);
    }

    /// Move to private step `n`.
    pub fn step(&mut self, n: u32) {
        self.goto(SubgoalState::Step(n));
    }

    pub fn success(&mut self) {
        self.goto(SubgoalState::Success);
    }

    pub fn failure(&mut self) {
        self.goto(SubgoalState::Failure);
    }

    /// Report a state the body has no case for and fail.
    pub fn undefined(&mut self, body: &str) {
        warn!(body, state = %self.f.state, objective = %self.f.objective, "undefined subgoal state");
        self.failure();
    }

    /// Start a child subgoal at this subgoal's clock.
    pub fn sub(&mut self, on_success: SubgoalState, on_failure: SubgoalState, objective: Proposition) -> Option<SubgoalId> {
        self.s.child_goal(self.f.cx, self.f.sg, on_success, on_failure, objective)
    }

    /// Start a child with the usual targets: step `n` or FAILURE.
    pub fn sub_step(&mut self, n: u32, objective: Proposition) -> Option<SubgoalId> {
        self.sub(SubgoalState::Step(n), SubgoalState::Failure, objective)
    }

    /// Wait until `base + dur` on this subgoal's clock.
    pub fn wait_ts(&mut self, base: Ts, dur: Dur, to_state: SubgoalState) {
        self.s.wait_ts(self.f.cx, self.f.sg, base, dur, to_state);
    }

    /// Wait `dur` from now.
    pub fn wait_for(&mut self, dur: Dur, to_state: SubgoalState) {
        let base = self.ts();
        self.wait_ts(base, dur, to_state);
    }

    pub fn wait_ptn(&mut self, check_now: bool, to_state: SubgoalState, pattern: Proposition) -> bool {
        self.s.wait_ptn(self.f.cx, self.f.sg, check_now, to_state, pattern)
    }

    pub fn wait_idle(&mut self, dur: Dur, to_state: SubgoalState) {
        self.s.wait_idle(self.f.cx, self.f.sg, dur, to_state);
    }

    pub fn add_success_cause(&mut self, cause: Proposition) {
        self.s.add_success_cause(self.f.cx, self.f.sg, cause);
    }

    pub fn add_failure_cause(&mut self, cause: Proposition) {
        self.s.add_failure_cause(self.f.cx, self.f.sg, cause);
    }

    // -- facts --------------------------------------------------------------

    /// A state that holds from `delay` seconds after now.
    pub fn assert_state(&mut self, delay: Dur, prop: Proposition) {
        let ts = self.ts();
        self.s.assert_state(self.f.cx, ts, delay, prop);
    }

    /// An action starting now and lasting `dur`.
    pub fn assert_action(&mut self, dur: Dur, prop: Proposition) {
        let ts = self.ts();
        self.s.assert_action(self.f.cx, ts, dur, prop);
    }

    pub fn assert_range(&mut self, start: Ts, stop: Ts, prop: Proposition) {
        self.s.assert_range(self.f.cx, start, stop, prop);
    }

    pub fn retract(&mut self, pattern: &Proposition) -> Vec<Proposition> {
        let ts = self.ts();
        self.s.retract(self.f.cx, ts, pattern)
    }

    /// Retract every `[X arg]` whose head is a `class`.
    pub fn retract_class(&mut self, class: &str, arg: &Symbol) -> Vec<Proposition> {
        let ts = self.ts();
        self.s.retract_class(self.f.cx, ts, class, arg)
    }

    /// Scale this context's sense.
    pub fn scale_sense(&mut self, factor: f64) {
        if let Some(cx) = self.s.context_mut(self.f.cx) {
            cx.sense *= factor;
        }
    }

    /// Fold a relevance / sense / novelty judgement into this context.
    pub fn set_rsn(&mut self, relevance: f64, sense: f64, novelty: f64) {
        if let Some(cx) = self.s.context_mut(self.f.cx) {
            cx.set_rsn(relevance, sense, novelty);
        }
    }

    /// The actor record of this subgoal's actor.
    pub fn actor_rec_mut(&mut self) -> Option<&mut super::actor::Actor> {
        let actor = self.f.actor.clone();
        self.s.context_mut(self.f.cx)?.actor_mut(&actor)
    }
}
