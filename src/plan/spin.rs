//! Spinning: fast-forwarding one goal lineage to see where it ends up.
//!
//! A spin marks one subgoal with a target state and runs the scheduler in
//! SPINNING mode. Only subgoals flagged `Spin` (descendants started while
//! the spin was set up) or carrying a target are eligible, so unrelated
//! goals stay where they are. The spin ends when the target is reached or
//! the scheduler runs out of activity.

use tracing::{debug, warn};

use crate::prop::Proposition;
use crate::symbol::Symbol;

use super::context::ContextId;
use super::session::Session;
use super::state::{GoalStatus, Mode, SubgoalState};
use super::subgoal::SubgoalId;

impl Session {
    /// Spin `id` until it reaches `target`. Returns whether it did.
    ///
    /// The caller's mode and no-activity count are restored afterwards, so a
    /// spin can be started from inside another main loop.
    pub fn spin_to(&mut self, cx: ContextId, id: SubgoalId, target: SubgoalState) -> bool {
        let saved_mode = self.mode(cx);
        let saved_no_activity = self.no_activity;
        debug!(context = %cx, subgoal = %id, %target, "start spinning");

        if let Some(context) = self.context_mut(cx) {
            context.clear_spin();
        }
        if let Some(sg) = self.sg_mut(cx, id) {
            sg.spin_to = target;
        }
        let passes = self.main_loop(cx, Mode::Spinning);
        let reached = self.state_of(cx, id) == Some(target);
        debug!(context = %cx, subgoal = %id, passes, reached, "finished spinning");
        if let Some(context) = self.context_mut(cx) {
            context.clear_spin();
        }

        self.set_mode(cx, saved_mode);
        self.no_activity = saved_no_activity;
        reached
    }

    /// Spin a subgoal to the state matching a goal status.
    ///
    /// `status` is `active-goal`, `succeeded-goal` or `failed-goal`; any
    /// other value is treated as failure. `emotion` is a known emotion
    /// behind the status change, linked to the goal once the target is
    /// reached. Nothing happens if the goal already has that status.
    pub fn spin_to_goal_status(
        &mut self,
        cx: ContextId,
        id: SubgoalId,
        status: &Symbol,
        emotion: Option<Proposition>,
    ) -> bool {
        let Some(sg) = self.sg_mut(cx, id) else {
            return false;
        };
        if sg.cur_goal.as_ref().is_some_and(|g| g.head() == status) {
            debug!(subgoal = %id, %status, "already in goal status");
            return false;
        }
        sg.spin_emotion = emotion;
        let target = match GoalStatus::from_label(status.as_str()) {
            Some(s) => s.target_state(),
            None => {
                warn!(%status, "unknown goal status, spinning to failure");
                SubgoalState::Failure
            }
        };
        self.spin_to(cx, id, target)
    }
}
