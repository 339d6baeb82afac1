//! Demons: the suspension primitive.
//!
//! A subgoal suspends by arming one or more demons and entering WAITING.
//! The first demon to fire clears all of them and moves the subgoal to the
//! fired demon's target state. Deadline demons are tested by the scheduler
//! against the subgoal's own clock; idle demons against the input channel;
//! pattern demons synchronously whenever a fact is asserted.

use serde::Serialize;
use tracing::debug;

use crate::prop::Proposition;
use crate::time::{Dur, Ts};

use super::context::ContextId;
use super::session::Session;
use super::state::SubgoalState;
use super::subgoal::SubgoalId;

/// What makes a demon fire.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum DemonTrigger {
    /// The subgoal's clock reaches this time.
    Deadline(Ts),
    /// A fact matching this pattern is asserted.
    Pattern(Proposition),
    /// The input channel has been idle for longer than this.
    Idle(Dur),
}

/// One armed trigger and the state it leads to.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Demon {
    pub trigger: DemonTrigger,
    pub to_state: SubgoalState,
}

impl Session {
    /// Arm a demon on a subgoal. Newer demons are tested first.
    pub fn demon_set(&mut self, cx: ContextId, id: SubgoalId, trigger: DemonTrigger, to_state: SubgoalState) {
        if let Some(sg) = self.sg_mut(cx, id) {
            debug!(subgoal = %id, ?trigger, to = %to_state, "demon armed");
            sg.demons.insert(0, Demon { trigger, to_state });
        }
    }

    pub fn demon_clear_all(&mut self, cx: ContextId, id: SubgoalId) {
        if let Some(sg) = self.sg_mut(cx, id) {
            sg.demons.clear();
        }
    }

    /// Fire `demon`: clear every demon on the subgoal, then transition.
    fn demon_fire(&mut self, cx: ContextId, id: SubgoalId, to_state: SubgoalState, trigger: Option<Proposition>) {
        if let Some(sg) = self.sg_mut(cx, id) {
            sg.demons.clear();
            if trigger.is_some() {
                sg.trigger = trigger;
            }
        }
        debug!(subgoal = %id, to = %to_state, "demon fired");
        self.transition_to(cx, id, to_state);
    }

    /// Test deadline demons against the subgoal's clock.
    ///
    /// Returns `(fired, pending)` where `pending` says whether any deadline
    /// demon was armed at all.
    pub fn demon_ts_test(&mut self, cx: ContextId, id: SubgoalId) -> (bool, bool) {
        let Some(sg) = self.sg(cx, id) else {
            return (false, false);
        };
        let mut pending = false;
        let mut due = None;
        for d in &sg.demons {
            if let DemonTrigger::Deadline(at) = d.trigger {
                pending = true;
                if due.is_none() && at <= sg.ts {
                    due = Some(d.to_state);
                }
            }
        }
        match due {
            Some(to) => {
                self.demon_fire(cx, id, to, None);
                (true, pending)
            }
            None => (false, pending),
        }
    }

    /// Test idle demons against the input channel.
    pub fn demon_idle_test(&mut self, cx: ContextId, id: SubgoalId) -> bool {
        let idle = self.channel.idle_time(self.clock.now());
        let due = self.sg(cx, id).and_then(|sg| {
            sg.demons.iter().find_map(|d| match d.trigger {
                DemonTrigger::Idle(threshold) if idle > threshold => Some(d.to_state),
                _ => None,
            })
        });
        match due {
            Some(to) => {
                self.demon_fire(cx, id, to, None);
                true
            }
            None => false,
        }
    }

    /// Test pattern demons against a newly asserted fact.
    pub fn demon_ptn_test(&mut self, cx: ContextId, id: SubgoalId, asserted: &Proposition) -> bool {
        let due = self.sg(cx, id).and_then(|sg| {
            sg.demons.iter().find_map(|d| match &d.trigger {
                DemonTrigger::Pattern(p) if p.matches(asserted) => Some(d.to_state),
                _ => None,
            })
        });
        match due {
            Some(to) => {
                self.demon_fire(cx, id, to, Some(asserted.clone()));
                true
            }
            None => false,
        }
    }

    /// Offer a newly asserted fact to every live subgoal in `cx`.
    pub fn demon_ptn_test_all(&mut self, cx: ContextId, asserted: &Proposition) {
        let Some(context) = self.context(cx) else {
            return;
        };
        let ids: Vec<SubgoalId> = context
            .actors()
            .flat_map(|a| a.newest_first())
            .filter(|id| {
                context
                    .subgoal(*id)
                    .is_some_and(|sg| !sg.is_stopped() && !sg.demons.is_empty())
            })
            .collect();
        for id in ids {
            self.demon_ptn_test(cx, id, asserted);
        }
    }

    /// Deliver an assertion to the demons that can see it: all alternatives
    /// for a root fact, only `cx` otherwise.
    pub(crate) fn demon_fan_out(&mut self, cx: ContextId, asserted: &Proposition) {
        if cx == ContextId::ROOT {
            for alt in self.alternatives.clone() {
                self.demon_ptn_test_all(alt, asserted);
            }
        } else {
            self.demon_ptn_test_all(cx, asserted);
        }
    }

    /// Force the newest demon on a subgoal to fire now.
    pub fn demon_stop(&mut self, cx: ContextId, id: SubgoalId) -> bool {
        let Some(to) = self.sg(cx, id).and_then(|sg| sg.demons.first()).map(|d| d.to_state) else {
            return false;
        };
        self.demon_fire(cx, id, to, None);
        true
    }

    // -- wait helpers -------------------------------------------------------

    /// Wait until the subgoal's clock reaches `base + dur`.
    pub fn wait_ts(&mut self, cx: ContextId, id: SubgoalId, base: Ts, dur: Dur, to_state: SubgoalState) {
        self.demon_set(cx, id, DemonTrigger::Deadline(base.plus(dur)), to_state);
        self.transition_to(cx, id, SubgoalState::Waiting);
    }

    /// Wait for a fact matching `pattern`.
    ///
    /// With `check_now`, a matching fact that already holds at the
    /// subgoal's clock satisfies the wait at once: it becomes the trigger,
    /// the subgoal moves to `to_state`, and `true` is returned.
    pub fn wait_ptn(
        &mut self,
        cx: ContextId,
        id: SubgoalId,
        check_now: bool,
        to_state: SubgoalState,
        pattern: Proposition,
    ) -> bool {
        if check_now {
            let ts = self.sg(cx, id).map(|sg| sg.ts);
            let found = ts.and_then(|ts| self.view(cx, ts).first(&pattern));
            if let Some(fact) = found {
                if let Some(sg) = self.sg_mut(cx, id) {
                    sg.trigger = Some(fact);
                }
                self.transition_to(cx, id, to_state);
                return true;
            }
        }
        self.demon_set(cx, id, DemonTrigger::Pattern(pattern), to_state);
        self.transition_to(cx, id, SubgoalState::Waiting);
        false
    }

    /// Wait until the input channel has been idle for more than `dur`.
    pub fn wait_idle(&mut self, cx: ContextId, id: SubgoalId, dur: Dur, to_state: SubgoalState) {
        self.demon_set(cx, id, DemonTrigger::Idle(dur), to_state);
        self.transition_to(cx, id, SubgoalState::Waiting);
    }
}
