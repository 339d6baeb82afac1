//! The discrete-event scheduler.
//!
//! Each [`Session::pass`] finds the lowest clock among eligible subgoals,
//! moves the context's story time up to it, and runs every eligible subgoal
//! whose clock equals it. Subgoals sharing a clock value step in the same
//! pass, actors most recently created first and, within an actor, subgoals
//! most recently created first. A pass whose lowest clock lies past the
//! session's horizon stops the loop instead.
//!
//! Passes without progress are counted, and outside PERFORMANCE mode the
//! loop stops once `no_activity_limit` of them come in a row. Ticking a
//! waiter that has no deadline pending is not progress. Standing waiters of
//! that kind are left to the horizon.

use tracing::{debug, trace, warn};

use crate::time::Ts;

use super::context::ContextId;
use super::planner::{Frame, Planner};
use super::session::Session;
use super::state::{Mode, SubgoalState};
use super::subgoal::SubgoalId;

impl Session {
    /// Step one subgoal. Returns whether this counts as activity.
    ///
    /// Due demons fire first. A WAITING subgoal with nothing due only moves
    /// its clock on by one second, which counts as activity only while a
    /// deadline is pending. Anything else runs its planning agent, or fails
    /// with FAILURE-NO-PLAN when none matches.
    pub fn run_subgoal(&mut self, cx: ContextId, id: SubgoalId) -> bool {
        let (fired, pending) = self.demon_ts_test(cx, id);
        if fired {
            return true;
        }
        if self.demon_idle_test(cx, id) {
            return true;
        }
        let Some(sg) = self.sg_mut(cx, id) else {
            return false;
        };
        if sg.state == SubgoalState::Waiting {
            sg.ts = sg.ts.plus(1);
            return pending;
        }
        let frame = Frame {
            cx,
            sg: id,
            actor: sg.actor.clone(),
            objective: sg.objective.clone(),
            state: sg.state,
        };
        let registry = self.registry.clone();
        match registry.resolve(frame.objective.head(), &self.ontology) {
            Some(entry) => {
                trace!(plan = %entry.name, objective = %frame.objective, state = %frame.state, "run");
                (entry.body)(&mut Planner::new(self, frame));
            }
            None => {
                warn!(objective = %frame.objective, "no plan");
                self.transition_to(cx, id, SubgoalState::FailureNoPlan);
            }
        }
        true
    }

    fn ineligible(&self, cx: ContextId, id: SubgoalId, mode: Mode, now: Ts, depends_on_now: &mut bool) -> bool {
        let Some(sg) = self.sg(cx, id) else {
            return true;
        };
        if sg.is_stopped() {
            return true;
        }
        if mode == Mode::Performance && sg.ts > now {
            *depends_on_now = true;
            return true;
        }
        mode == Mode::Spinning && sg.spin_to == SubgoalState::NoSpin
    }

    /// Whether a spin targeting this subgoal has reached its target.
    pub fn spin_is_finished(&self, cx: ContextId, id: SubgoalId) -> bool {
        self.mode(cx) == Mode::Spinning
            && self
                .sg(cx, id)
                .is_some_and(|sg| sg.spin_to != SubgoalState::Spin && sg.state == sg.spin_to)
    }

    /// Subgoals of schedulable actors, in scheduling order.
    fn schedule_order(&self, cx: ContextId) -> Vec<SubgoalId> {
        let Some(context) = self.context(cx) else {
            return Vec::new();
        };
        context
            .actors()
            .filter(|a| self.is_actor(&a.name))
            .flat_map(|a| a.newest_first())
            .collect()
    }

    /// One scheduler tick. Returns `false` when the main loop should stop.
    pub fn pass(&mut self, cx: ContextId) -> bool {
        let mode = self.mode(cx);
        let now = self.clock.now();
        let order = self.schedule_order(cx);

        let mut depends_on_now = false;
        let mut lowest: Option<Ts> = None;
        for id in &order {
            if self.ineligible(cx, *id, mode, now, &mut depends_on_now) {
                continue;
            }
            if let Some(sg) = self.sg(cx, *id) {
                if lowest.is_none_or(|l| sg.ts < l) {
                    lowest = Some(sg.ts);
                }
            }
        }
        let Some(lowest) = lowest else {
            trace!(context = %cx, depends_on_now, "nothing eligible");
            return depends_on_now;
        };
        if self.horizon.is_some_and(|h| lowest > h) {
            debug!(context = %cx, %lowest, "past the horizon, stopping");
            return false;
        }
        trace!(context = %cx, %lowest, "pass");
        if let Some(context) = self.context_mut(cx) {
            context.story_time.stop = Some(lowest);
        }

        let mut activity = false;
        let mut ignored = false;
        for id in order {
            if self.ineligible(cx, id, mode, now, &mut ignored) {
                continue;
            }
            if self.sg(cx, id).is_none_or(|sg| sg.ts != lowest) {
                continue;
            }
            if self.spin_is_finished(cx, id) {
                return false;
            }
            if self.run_subgoal(cx, id) {
                activity = true;
                if let Some(sg) = self.sg_mut(cx, id) {
                    sg.last_ts = sg.ts;
                }
            }
            if self.spin_is_finished(cx, id) {
                return false;
            }
        }

        if activity {
            self.no_activity = 0;
        } else {
            self.no_activity += 1;
        }
        if mode != Mode::Performance && self.no_activity > self.config.no_activity_limit {
            debug!(context = %cx, ticks = self.no_activity, "no activity, stopping");
            return false;
        }
        true
    }

    /// Run passes until the scheduler stops. Returns the number of passes.
    ///
    /// In PERFORMANCE mode one unit of input is read after every pass and
    /// the loop follows the best alternative; end of input ends the loop.
    pub fn main_loop(&mut self, cx: ContextId, mode: Mode) -> usize {
        let mut cx = cx;
        self.set_mode(cx, mode);
        self.no_activity = 0;
        let mut passes = 0;
        debug!(context = %cx, %mode, "main loop");
        loop {
            passes += 1;
            if !self.pass(cx) {
                break;
            }
            if mode == Mode::Performance {
                if !self.read_understand() {
                    debug!("main loop exited at end of input");
                    break;
                }
                cx = self.best;
                self.set_mode(cx, mode);
            }
        }
        passes
    }

    pub(crate) fn set_mode(&mut self, cx: ContextId, mode: Mode) {
        if let Some(context) = self.context_mut(cx) {
            context.mode = mode;
        }
    }

    /// Run the best alternative until it settles.
    pub fn daydream(&mut self) -> usize {
        let cx = self.best;
        self.main_loop(cx, Mode::Daydreaming)
    }
}
