//! Manipulating objects with hands.
//!
//! Argument conventions: `[grasp hand obj]`, `[release hand obj]`,
//! `[move-to actor grasper obj]`, `[near-graspable grasper obj]`,
//! `[holding grasper obj]`, `[inside obj container]`, `[open obj]`,
//! `[action-open hand obj]`, `[connect-to hand obj1 obj2]`,
//! `[rub hand obj secs]`, `[pour-onto hand obj1 obj2]`,
//! `[flip-to hand knob na position]`, `[gesture-here from to hand obj]`,
//! `[hand-to giver receiver obj]`, `[receive-from receiver giver obj]`.

use tracing::{debug, warn};

use crate::plan::{Planner, SubgoalState};
use crate::prop;
use crate::prop::Term;
use crate::symbol::Symbol;

use super::motion::grasper_move;
use super::{args, chosen_hand, free_hand, holding_hand, remember_hand};

/// Seconds a giver waits for the receiver before offering again.
const HANDOVER_PATIENCE: i64 = 10;

/// Fail unless `hand` belongs to the subgoal's actor.
fn own_hand(p: &mut Planner<'_>, hand: &Symbol) -> bool {
    if p.view().is_part_of(hand, p.actor()) {
        return true;
    }
    debug!(hand = %hand, actor = %p.actor(), "grasper not part of actor");
    p.failure();
    false
}

pub fn grasp(p: &mut Planner<'_>) {
    let Some([hand, obj]) = args(p, [1, 2]) else {
        return;
    };
    match p.state() {
        SubgoalState::Begin => {
            if own_hand(p, &hand) {
                p.sub_step(1, prop!["near-graspable", &hand, &obj]);
            }
        }
        SubgoalState::Step(1) => {
            let d = p.own_duration();
            p.assert_action(d, p.obj().clone());
            p.assert_state(d, prop!["holding", &hand, &obj]);
            p.advance(d);
            p.success();
        }
        _ => p.undefined("grasp"),
    }
}

pub fn release(p: &mut Planner<'_>) {
    let Some([hand, obj]) = args(p, [1, 2]) else {
        return;
    };
    match p.state() {
        SubgoalState::Begin => {
            if !own_hand(p, &hand) {
                return;
            }
            let d = p.own_duration();
            p.assert_action(d, p.obj().clone());
            p.advance(d);
            if p.retract(&prop!["holding", &hand, &obj]).is_empty() {
                warn!(hand = %hand, object = %obj, "not already holding object");
            }
            p.success();
        }
        _ => p.undefined("release"),
    }
}

pub fn holding(p: &mut Planner<'_>) {
    let Some([hand, obj]) = args(p, [1, 2]) else {
        return;
    };
    match p.state() {
        SubgoalState::Begin => {
            p.sub(SubgoalState::Success, SubgoalState::Failure, prop!["grasp", &hand, &obj]);
        }
        _ => p.undefined("holding"),
    }
}

/// Get `obj` inside `container`: by walking in for an animate object going
/// into a large container, else by carrying it there by hand.
pub fn inside(p: &mut Planner<'_>) {
    let Some([obj, container]) = args(p, [1, 2]) else {
        return;
    };
    match p.state() {
        SubgoalState::Begin => {
            let walk_in = {
                let v = p.view();
                v.isa("animate-object", &obj) && v.isa("large-container", &container)
            };
            p.step(if walk_in { 200 } else { 100 });
        }
        SubgoalState::Step(100) => {
            p.sub_step(101, prop!["open", &container]);
        }
        SubgoalState::Step(101) => {
            let Some(hand) = free_hand(p) else {
                debug!(actor = %p.actor(), "no free hand");
                return p.failure();
            };
            remember_hand(p, &hand);
            p.sub_step(102, prop!["holding", &hand, &obj]);
        }
        SubgoalState::Step(102) => {
            let Some(hand) = chosen_hand(p) else {
                return p.failure();
            };
            let actor = p.actor().clone();
            p.sub_step(103, prop!["move-to", &actor, &hand, &container]);
        }
        SubgoalState::Step(103) => {
            let Some(hand) = chosen_hand(p) else {
                return p.failure();
            };
            p.sub_step(104, prop!["release", &hand, &obj]);
        }
        SubgoalState::Step(104) => {
            p.assert_state(0, p.obj().clone());
            p.success();
        }
        SubgoalState::Step(200) => {
            p.sub(
                SubgoalState::Success,
                SubgoalState::Failure,
                prop!["near-reachable", &obj, &container],
            );
        }
        _ => p.undefined("inside"),
    }
}

/// Bring a grasper of the actor next to an object.
pub fn move_to(p: &mut Planner<'_>) {
    let Some([actor, grasper, obj]) = args(p, [1, 2, 3]) else {
        return;
    };
    match p.state() {
        SubgoalState::Begin => {
            if p.view().retrieve_whole("animal", &grasper).as_ref() != Some(&actor) {
                debug!(grasper = %grasper, actor = %actor, "grasper not part of actor");
                return p.failure();
            }
            p.sub_step(1, prop!["near-reachable", &actor, &obj]);
        }
        SubgoalState::Step(1) => {
            let closed_container = {
                let v = p.view();
                v.first_sym(2, &prop!["inside", &obj, "*"])
                    .filter(|c| v.is_true(&prop!["closed", c]))
            };
            match closed_container {
                Some(c) => {
                    p.sub_step(2, prop!["open", &c]);
                }
                None => p.step(2),
            }
        }
        SubgoalState::Step(2) => {
            let (cx, ts) = (p.cx(), p.ts());
            grasper_move(p.s, cx, ts, &grasper, None);
            let d = p.own_duration();
            p.assert_action(d, p.obj().clone());
            p.advance(d);
            p.assert_state(0, prop!["near-graspable", &grasper, &obj]);
            p.success();
        }
        _ => p.undefined("move-to"),
    }
}

pub fn near_graspable(p: &mut Planner<'_>) {
    let Some([grasper, obj]) = args(p, [1, 2]) else {
        return;
    };
    match p.state() {
        SubgoalState::Begin => {
            let actor = p.actor().clone();
            if p.view().retrieve_whole("animal", &grasper).as_ref() != Some(&actor) {
                debug!(grasper = %grasper, actor = %actor, "grasper not part of actor");
                return p.failure();
            }
            p.sub_step(1, prop!["near-reachable", &actor, &obj]);
        }
        SubgoalState::Step(1) => {
            if p.view().is_true(p.obj()) {
                return p.success();
            }
            let actor = p.actor().clone();
            p.sub(
                SubgoalState::Success,
                SubgoalState::Failure,
                prop!["move-to", &actor, &grasper, &obj],
            );
        }
        _ => p.undefined("near-graspable"),
    }
}

fn open_or_close(p: &mut Planner<'_>, action: &str) {
    let Some([obj]) = args(p, [1]) else {
        return;
    };
    match p.state() {
        SubgoalState::Begin => {
            let Some(hand) = free_hand(p) else {
                debug!(actor = %p.actor(), "no free hand");
                return p.failure();
            };
            p.sub(SubgoalState::Success, SubgoalState::Failure, prop![action, &hand, &obj]);
        }
        _ => p.undefined(action),
    }
}

pub fn open(p: &mut Planner<'_>) {
    open_or_close(p, "action-open");
}

pub fn closed(p: &mut Planner<'_>) {
    open_or_close(p, "action-close");
}

fn action_open_or_close(p: &mut Planner<'_>, from: &str, to: &str) {
    let Some([hand, obj]) = args(p, [1, 2]) else {
        return;
    };
    match p.state() {
        SubgoalState::Begin => {
            if own_hand(p, &hand) {
                p.sub_step(1, prop!["near-graspable", &hand, &obj]);
            }
        }
        SubgoalState::Step(1) => {
            let d = p.own_duration();
            p.assert_action(d, p.obj().clone());
            p.advance(d);
            if p.retract(&prop![from, &obj]).is_empty() {
                debug!(object = %obj, state = from, "object was not in expected state");
            }
            p.assert_state(0, prop![to, &obj]);
            p.success();
        }
        _ => {
            let name = p.obj().head().clone();
            p.undefined(name.as_str());
        }
    }
}

pub fn action_open(p: &mut Planner<'_>) {
    action_open_or_close(p, "closed", "open");
}

pub fn action_close(p: &mut Planner<'_>) {
    action_open_or_close(p, "open", "closed");
}

pub fn connected_to(p: &mut Planner<'_>) {
    let Some([a, b]) = args(p, [1, 2]) else {
        return;
    };
    match p.state() {
        SubgoalState::Begin => {
            let Some(hand) = free_hand(p) else {
                return p.failure();
            };
            p.sub(
                SubgoalState::Success,
                SubgoalState::Failure,
                prop!["connect-to", &hand, &a, &b],
            );
        }
        _ => p.undefined("connected-to"),
    }
}

pub fn connect_to(p: &mut Planner<'_>) {
    let Some([hand, a, b]) = args(p, [1, 2, 3]) else {
        return;
    };
    match p.state() {
        SubgoalState::Begin => {
            p.sub_step(1, prop!["grasp", &hand, &a]);
        }
        SubgoalState::Step(1) => {
            p.sub_step(2, prop!["near-graspable", &hand, &b]);
        }
        SubgoalState::Step(2) => {
            let d = p.own_duration();
            p.assert_action(d, p.obj().clone());
            p.advance(d);
            p.step(3);
        }
        SubgoalState::Step(3) => {
            p.sub_step(4, prop!["release", &hand, &a]);
        }
        SubgoalState::Step(4) => {
            p.assert_state(0, prop!["connected-to", &a, &b]);
            p.success();
        }
        _ => p.undefined("connect-to"),
    }
}

pub fn rub(p: &mut Planner<'_>) {
    let Some([hand, obj]) = args(p, [1, 2]) else {
        return;
    };
    match p.state() {
        SubgoalState::Begin => {
            if own_hand(p, &hand) {
                p.sub_step(1, prop!["near-graspable", &hand, &obj]);
            }
        }
        SubgoalState::Step(1) => {
            let d = p.obj().num(3).map(|n| n as i64).unwrap_or_else(|| p.own_duration());
            p.assert_action(d, p.obj().clone());
            p.advance(d);
            p.success();
        }
        _ => p.undefined("rub"),
    }
}

pub fn pour_onto(p: &mut Planner<'_>) {
    let Some([hand, what, onto]) = args(p, [1, 2, 3]) else {
        return;
    };
    match p.state() {
        SubgoalState::Begin => {
            p.sub_step(2, prop!["holding", &hand, &what]);
        }
        SubgoalState::Step(2) => {
            p.sub_step(3, prop!["near-graspable", &hand, &onto]);
        }
        SubgoalState::Step(3) => {
            let d = p.own_duration();
            p.assert_action(d, p.obj().clone());
            p.advance(d);
            p.success();
        }
        _ => p.undefined("pour-onto"),
    }
}

/// `[knob-high knob]` and the like: turn the knob with a free hand.
pub fn knob_position(p: &mut Planner<'_>) {
    let Some([knob]) = args(p, [1]) else {
        return;
    };
    match p.state() {
        SubgoalState::Begin => {
            let Some(hand) = free_hand(p) else {
                return p.failure();
            };
            let position = p.obj().head().clone();
            p.sub(
                SubgoalState::Success,
                SubgoalState::Failure,
                prop!["flip-to", &hand, &knob, Term::Na, &position],
            );
        }
        _ => p.undefined("knob-position"),
    }
}

/// `[switch-on x]` and the like. A lock needs its key inserted first.
pub fn switch_x(p: &mut Planner<'_>) {
    let Some([obj]) = args(p, [1]) else {
        return;
    };
    match p.state() {
        SubgoalState::Begin => {
            if !p.view().isa("lock", &obj) {
                return p.step(1);
            }
            let key = p.view().first_sym(2, &prop!["key-of", &obj, "*"]);
            let Some(key) = key else {
                debug!(lock = %obj, "no key for lock");
                return p.failure();
            };
            p.sub_step(1, prop!["inside", &key, &obj]);
        }
        SubgoalState::Step(1) => {
            let Some(hand) = free_hand(p) else {
                return p.failure();
            };
            let position = p.obj().head().clone();
            p.sub(
                SubgoalState::Success,
                SubgoalState::Failure,
                prop!["flip-to", &hand, &obj, Term::Na, &position],
            );
        }
        _ => p.undefined("switch"),
    }
}

pub fn flip_to(p: &mut Planner<'_>) {
    let Some([hand, knob]) = args(p, [1, 2]) else {
        return;
    };
    let Some(position) = p.arg(4) else {
        return p.failure();
    };
    match p.state() {
        SubgoalState::Begin => {
            p.sub_step(1, prop!["near-graspable", &hand, &knob]);
        }
        SubgoalState::Step(1) => {
            let d = p.own_duration();
            p.assert_action(d, p.obj().clone());
            p.advance(d);
            let family = if p.view().isa("on-or-off-state", &position) {
                "on-or-off-state"
            } else {
                "knob-position"
            };
            p.retract_class(family, &knob);
            p.assert_state(0, prop![&position, &knob]);
            p.success();
        }
        _ => p.undefined("flip-to"),
    }
}

pub fn gesture_here(p: &mut Planner<'_>) {
    let Some([from, to]) = args(p, [1, 2]) else {
        return;
    };
    match p.state() {
        SubgoalState::Begin => {
            p.sub_step(1, prop!["near-reachable", &from, &to]);
        }
        SubgoalState::Step(1) => {
            let d = p.own_duration();
            p.assert_action(d, p.obj().clone());
            p.advance(d);
            p.success();
        }
        _ => p.undefined("gesture-here"),
    }
}

/// Offer an object until the receiver takes it, then let go.
pub fn hand_to(p: &mut Planner<'_>) {
    let Some([receiver, obj]) = args(p, [2, 3]) else {
        return;
    };
    match p.state() {
        SubgoalState::Begin => {
            let Some(hand) = holding_hand(p, &obj).or_else(|| free_hand(p)) else {
                debug!(actor = %p.actor(), "no free hand");
                return p.failure();
            };
            remember_hand(p, &hand);
            p.sub_step(1, prop!["holding", &hand, &obj]);
        }
        SubgoalState::Step(1) => {
            let Some(hand) = chosen_hand(p) else {
                return p.failure();
            };
            let actor = p.actor().clone();
            p.sub_step(2, prop!["gesture-here", &actor, &receiver, &hand, &obj]);
        }
        SubgoalState::Step(2) => {
            if !p.wait_ptn(true, SubgoalState::Step(3), prop!["grasp", "*", &obj]) {
                p.wait_for(HANDOVER_PATIENCE, SubgoalState::Step(1));
            }
        }
        SubgoalState::Step(3) => {
            let Some(hand) = chosen_hand(p) else {
                return p.failure();
            };
            p.sub(SubgoalState::Success, SubgoalState::Failure, prop!["release", &hand, &obj]);
        }
        _ => p.undefined("hand-to"),
    }
}

/// Wait for someone to offer an object, then take it.
pub fn receive_from(p: &mut Planner<'_>) {
    let Some([giver, obj]) = args(p, [2, 3]) else {
        return;
    };
    match p.state() {
        SubgoalState::Begin => {
            let actor = p.actor().clone();
            p.wait_ptn(
                false,
                SubgoalState::Step(2),
                prop!["gesture-here", &giver, &actor, "*", &obj],
            );
            p.wait_for(HANDOVER_PATIENCE, SubgoalState::Failure);
        }
        SubgoalState::Step(2) => {
            let offered = p.trigger().and_then(|t| t.sym(4).cloned()).unwrap_or(obj);
            let Some(hand) = free_hand(p) else {
                return p.failure();
            };
            p.sub(SubgoalState::Success, SubgoalState::Failure, prop!["grasp", &hand, &offered]);
        }
        _ => p.undefined("receive-from"),
    }
}
