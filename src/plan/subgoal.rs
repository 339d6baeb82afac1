//! Subgoal nodes and the transition protocol that links them into trees.
//!
//! A [`Subgoal`] lives in its context's arena and is addressed by
//! [`SubgoalId`]. Its supergoal is an id, not an owner: ownership flows from
//! the context through the actor's subgoal list.
//!
//! Transition rules:
//!
//! 1. asking for the current state or for [`SubgoalState::Na`] is a no-op
//! 2. a stopped subgoal never leaves its terminal state by transition
//! 3. SUCCESS records a `succeeded-goal` status, pulls the supergoal's clock
//!    forward to this subgoal's clock, and moves the supergoal to its
//!    on-success target
//! 4. FAILURE records a `failed-goal` status and moves the supergoal to its
//!    on-failure target, or to its on-success target while spinning toward
//!    a goal of the supergoal

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::prop;
use crate::prop::Proposition;
use crate::symbol::Symbol;
use crate::time::Ts;

use super::context::ContextId;
use super::demon::Demon;
use super::session::Session;
use super::state::{GoalStatus, Mode, SubgoalState};

/// Index of a subgoal in its context's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubgoalId(u32);

impl SubgoalId {
    pub fn from_raw(raw: u32) -> Self {
        SubgoalId(raw)
    }

    pub fn raw(self) -> u32 {
        self.0
    }

    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for SubgoalId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "sg:{}", self.0)
    }
}

/// Body-private variables that survive suspension.
///
/// The variant is chosen when the subgoal is created, from the planning
/// agent that will run it; only that agent reads it.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub enum Locals {
    #[default]
    None,
    /// The hand chosen for a manipulation.
    Hand { hand: Option<Symbol> },
    /// Cells still to traverse on `grid`, and the wormhole to leave by.
    Trip {
        grid: Option<Symbol>,
        path: Vec<(i64, i64)>,
        next: usize,
        via: Option<Symbol>,
    },
    /// Clothes still to take off.
    Strip { remaining: Vec<Symbol> },
    /// When to set off for an appointment.
    Appointment {
        leave_at: Option<Ts>,
        leave_before: Option<Ts>,
    },
    /// The bed chosen for the night, and when rest levels were last updated.
    Sleep {
        bed: Option<Symbol>,
        levels_at: Option<Ts>,
    },
}

impl Locals {
    pub fn hand() -> Self {
        Locals::Hand { hand: None }
    }

    pub fn trip() -> Self {
        Locals::Trip {
            grid: None,
            path: Vec::new(),
            next: 0,
            via: None,
        }
    }

    pub fn strip() -> Self {
        Locals::Strip {
            remaining: Vec::new(),
        }
    }

    pub fn appointment() -> Self {
        Locals::Appointment {
            leave_at: None,
            leave_before: None,
        }
    }

    pub fn sleep() -> Self {
        Locals::Sleep {
            bed: None,
            levels_at: None,
        }
    }
}

/// One node of an actor's goal tree.
#[derive(Debug, Clone, Serialize)]
pub struct Subgoal {
    pub id: SubgoalId,
    pub actor: Symbol,
    pub objective: Proposition,
    pub state: SubgoalState,
    pub last_state: SubgoalState,
    /// This subgoal's own clock.
    pub ts: Ts,
    pub start_ts: Ts,
    /// Clock value at the last tick that made progress.
    pub last_ts: Ts,
    /// Supergoal state to enter when this subgoal succeeds.
    pub on_success: SubgoalState,
    /// Supergoal state to enter when this subgoal fails.
    pub on_failure: SubgoalState,
    pub supergoal: Option<SubgoalId>,
    /// Newest first.
    pub demons: Vec<Demon>,
    /// The assertion that fired the last pattern demon.
    pub trigger: Option<Proposition>,
    pub success_causes: Vec<Proposition>,
    pub failure_causes: Vec<Proposition>,
    /// `Spin`/`NoSpin` flag, or the state a spin is heading for.
    pub spin_to: SubgoalState,
    /// Known emotion behind a spin, asserted when the spin target is reached.
    pub spin_emotion: Option<Proposition>,
    /// The status proposition currently asserted for this subgoal.
    pub cur_goal: Option<Proposition>,
    /// Objective of the child most recently started under this subgoal.
    pub last_child: Option<Proposition>,
    pub locals: Locals,
}

impl Subgoal {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        id: SubgoalId,
        actor: Symbol,
        objective: Proposition,
        ts: Ts,
        supergoal: Option<SubgoalId>,
        on_success: SubgoalState,
        on_failure: SubgoalState,
        spin_to: SubgoalState,
        locals: Locals,
    ) -> Self {
        Subgoal {
            id,
            actor,
            objective,
            state: SubgoalState::Begin,
            last_state: SubgoalState::Na,
            ts,
            start_ts: ts,
            last_ts: ts,
            on_success,
            on_failure,
            supergoal,
            demons: Vec::new(),
            trigger: None,
            success_causes: Vec::new(),
            failure_causes: Vec::new(),
            spin_to,
            spin_emotion: None,
            cur_goal: None,
            last_child: None,
            locals,
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.state.is_stopped()
    }

    /// A copy for a sprouted context. Spin parameters, trigger and causes
    /// start fresh; the supergoal link still names the original and is
    /// remapped by the caller.
    pub(crate) fn copy_for_branch(&self, id: SubgoalId) -> Subgoal {
        Subgoal {
            id,
            trigger: None,
            success_causes: Vec::new(),
            failure_causes: Vec::new(),
            spin_to: SubgoalState::NoSpin,
            spin_emotion: None,
            ..self.clone()
        }
    }
}

// ---------------------------------------------------------------------------
// Starting and transitioning subgoals
// ---------------------------------------------------------------------------

impl Session {
    /// Start pursuing `objective`.
    ///
    /// The actor is `actor` if given, else the first or second argument of
    /// the objective when that is an actor, else the supergoal's actor,
    /// else the configured default. If the objective already holds at `ts`
    /// a SUCCESS node is recorded, the supergoal moves to `on_success`, and
    /// `None` is returned. Otherwise the new subgoal starts in BEGIN and the
    /// supergoal waits for it.
    pub fn start_subgoal(
        &mut self,
        cx: ContextId,
        ts: Ts,
        actor: Option<Symbol>,
        supergoal: Option<SubgoalId>,
        on_success: SubgoalState,
        on_failure: SubgoalState,
        objective: Proposition,
    ) -> Option<SubgoalId> {
        let sup = supergoal.and_then(|id| self.sg(cx, id).map(|s| (s.actor.clone(), s.spin_to)));
        let actor = actor.unwrap_or_else(|| self.infer_actor(&objective, sup.as_ref().map(|s| &s.0)));
        self.actor_find_or_create(cx, &actor, ts)?;

        let spin_to = match sup {
            Some((_, spin)) if spin != SubgoalState::NoSpin => SubgoalState::Spin,
            _ => SubgoalState::NoSpin,
        };
        if let Some(s) = supergoal.and_then(|id| self.sg_mut(cx, id)) {
            s.last_child = Some(objective.clone());
        }
        let locals = self.registry.locals_for(objective.head(), &self.ontology);
        let id = self.context_mut(cx)?.add_subgoal(|id| {
            Subgoal::new(
                id,
                actor.clone(),
                objective.clone(),
                ts,
                supergoal,
                on_success,
                on_failure,
                spin_to,
                locals,
            )
        });
        if let Some(ac) = self.context_mut(cx)?.actor_mut(&actor) {
            ac.subgoals.push(id);
        }
        debug!(actor = %actor, objective = %objective, %ts, subgoal = %id, "start subgoal");

        if self.store.is_true(cx, ts, &objective) {
            debug!(objective = %objective, "subgoal already achieved");
            self.transition_to(cx, id, SubgoalState::Success);
            if let Some(sup) = supergoal {
                self.transition_to(cx, sup, on_success);
            }
            return None;
        }
        self.status_change(cx, id, GoalStatus::Active, &[]);
        if let Some(sup) = supergoal {
            self.transition_to(cx, sup, SubgoalState::Waiting);
        }
        Some(id)
    }

    /// Start a top-level goal.
    pub fn top_goal(
        &mut self,
        cx: ContextId,
        ts: Ts,
        actor: Option<Symbol>,
        objective: Proposition,
    ) -> Option<SubgoalId> {
        self.start_subgoal(
            cx,
            ts,
            actor,
            None,
            SubgoalState::Na,
            SubgoalState::Na,
            objective,
        )
    }

    /// Start a child of `supergoal` at the supergoal's clock.
    pub fn child_goal(
        &mut self,
        cx: ContextId,
        supergoal: SubgoalId,
        on_success: SubgoalState,
        on_failure: SubgoalState,
        objective: Proposition,
    ) -> Option<SubgoalId> {
        let ts = self.sg(cx, supergoal)?.ts;
        self.start_subgoal(cx, ts, None, Some(supergoal), on_success, on_failure, objective)
    }

    fn infer_actor(&self, objective: &Proposition, supergoal_actor: Option<&Symbol>) -> Symbol {
        for i in [1, 2] {
            if let Some(a) = objective.sym(i) {
                if self.is_actor(a) {
                    return a.clone();
                }
            }
        }
        if let Some(a) = supergoal_actor {
            return a.clone();
        }
        warn!(objective = %objective, "actor not found, using default actor");
        Symbol::from(self.config.default_actor.as_str())
    }

    /// Move a subgoal to `state`, propagating outcomes to its supergoal.
    pub fn transition_to(&mut self, cx: ContextId, id: SubgoalId, state: SubgoalState) {
        let mode = self.mode(cx);
        let Some(sg) = self.sg_mut(cx, id) else {
            return;
        };
        let cur = sg.state;
        if cur == state || state == SubgoalState::Na {
            return;
        }
        if cur.is_stopped() {
            warn!(
                subgoal = %id,
                objective = %sg.objective,
                from = %cur,
                to = %state,
                "attempt to revive stopped goal ignored"
            );
            return;
        }
        debug!(subgoal = %id, objective = %sg.objective, from = %cur, to = %state, "transition");
        sg.last_state = cur;
        sg.state = state;
        let (supergoal, on_success, on_failure, ts) = (sg.supergoal, sg.on_success, sg.on_failure, sg.ts);

        if state == SubgoalState::Success {
            let causes = sg.success_causes.clone();
            self.status_change(cx, id, GoalStatus::Succeeded, &causes);
            if let Some(sup) = supergoal {
                if let Some(s) = self.sg_mut(cx, sup) {
                    if s.ts < ts {
                        debug!(subgoal = %sup, from = %s.ts, to = %ts, "advancing supergoal clock");
                        s.ts = ts;
                    }
                }
                self.transition_to(cx, sup, on_success);
            }
        } else if state.is_failure() {
            let causes = sg.failure_causes.clone();
            self.status_change(cx, id, GoalStatus::Failed, &causes);
            if let Some(sup) = supergoal {
                let relaxed = mode == Mode::Spinning
                    && self.sg(cx, sup).is_some_and(|s| s.spin_to != SubgoalState::NoSpin);
                if relaxed {
                    debug!(subgoal = %id, "relaxed subgoal failure while spinning");
                    self.transition_to(cx, sup, on_success);
                } else {
                    self.transition_to(cx, sup, on_failure);
                }
            }
        }
    }

    /// Record a new status for a subgoal in the fact store.
    ///
    /// The previous status proposition is retracted, the new one asserted
    /// together with a `leadto` link from every cause. A pending spin
    /// emotion is delivered once the spin target is reached; otherwise the
    /// emotion hook sees status changes of top-level goals.
    pub(crate) fn status_change(
        &mut self,
        cx: ContextId,
        id: SubgoalId,
        status: GoalStatus,
        causes: &[Proposition],
    ) {
        let Some(sg) = self.sg_mut(cx, id) else {
            return;
        };
        let cur = prop![status.as_label(), &sg.actor, &sg.objective];
        let previous = sg.cur_goal.replace(cur.clone());
        let (actor, ts, state, spin_to, is_top) =
            (sg.actor.clone(), sg.ts, sg.state, sg.spin_to, sg.supergoal.is_none());
        let spin_emotion = if sg.spin_emotion.is_some() && spin_to == state {
            sg.spin_emotion.take()
        } else {
            None
        };
        let spinning_with_emotion = sg.spin_emotion.is_some();

        if let Some(previous) = previous {
            self.retract(cx, ts, &previous);
        }
        self.assert_state(cx, ts, 0, cur.clone());
        for cause in causes {
            self.assert_state(cx, ts, 0, prop!["leadto", cause, &cur]);
        }
        if let Some(emotion) = spin_emotion {
            self.assert_state(cx, ts, 0, prop!["leadto", &cur, emotion]);
        } else if !spinning_with_emotion && is_top {
            if status != GoalStatus::Active {
                info!(actor = %actor, goal = %cur, "top-level goal outcome");
            }
            let hook = self.emotions.clone();
            hook.goal_status(self, cx, &actor, ts, &cur, causes);
        }
    }

    /// Restart a stopped subgoal at BEGIN, discarding its causes.
    pub fn revive_subgoal(&mut self, cx: ContextId, id: SubgoalId) {
        let Some(sg) = self.sg_mut(cx, id) else {
            return;
        };
        sg.success_causes.clear();
        sg.failure_causes.clear();
        sg.demons.clear();
        sg.last_state = sg.state;
        sg.state = SubgoalState::Begin;
        debug!(subgoal = %id, objective = %sg.objective, "revived");
        self.status_change(cx, id, GoalStatus::Active, &[]);
    }

    pub fn add_success_cause(&mut self, cx: ContextId, id: SubgoalId, cause: Proposition) {
        if let Some(sg) = self.sg_mut(cx, id) {
            sg.success_causes.push(cause);
        }
    }

    pub fn add_failure_cause(&mut self, cx: ContextId, id: SubgoalId, cause: Proposition) {
        if let Some(sg) = self.sg_mut(cx, id) {
            sg.failure_causes.push(cause);
        }
    }
}
