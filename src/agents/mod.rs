//! Planning agent bodies and the world model they act on.
//!
//! Each body is a plain function over a [`Planner`] handle that switches on
//! the subgoal's state, does a little work, and leaves the subgoal in its
//! next state. [`standard_registry`] wires them to the objectives they
//! pursue.

pub mod appointment;
pub mod devices;
pub mod grasp;
pub mod motion;
pub mod mtrans;
pub mod ptrans;
pub mod sleep;
pub mod space;

use tracing::warn;

use crate::plan::{Locals, PlanRegistry, Planner, Tier};
use crate::prop;
use crate::symbol::Symbol;

/// The symbol arguments at positions `idx` of the objective.
///
/// Fails the subgoal when any of them is missing or not a symbol.
pub(crate) fn args<const N: usize>(p: &mut Planner<'_>, idx: [usize; N]) -> Option<[Symbol; N]> {
    let found: Option<Vec<Symbol>> = idx.iter().map(|&i| p.arg(i)).collect();
    let found = found.and_then(|v| <[Symbol; N]>::try_from(v).ok());
    if found.is_none() {
        warn!(objective = %p.obj(), "missing argument");
        p.failure();
    }
    found
}

/// A grasper of the subgoal's actor that is not holding anything.
pub(crate) fn free_hand(p: &Planner<'_>) -> Option<Symbol> {
    let view = p.view();
    motion::graspers(&*p.s, p.cx(), p.ts(), p.actor())
        .into_iter()
        .find(|g| !view.is_true(&prop!["holding", g, "*"]))
}

/// The actor's grasper already holding `obj`.
pub(crate) fn holding_hand(p: &Planner<'_>, obj: &Symbol) -> Option<Symbol> {
    let view = p.view();
    motion::graspers(&*p.s, p.cx(), p.ts(), p.actor())
        .into_iter()
        .find(|g| view.is_true(&prop!["holding", g, obj]))
}

pub(crate) fn remember_hand(p: &mut Planner<'_>, chosen: &Symbol) {
    if let Some(Locals::Hand { hand }) = p.locals() {
        *hand = Some(chosen.clone());
    }
}

pub(crate) fn chosen_hand(p: &mut Planner<'_>) -> Option<Symbol> {
    match p.locals() {
        Some(Locals::Hand { hand }) => hand.clone(),
        _ => None,
    }
}

/// Every bundled planning agent, in dispatch order.
pub fn standard_registry() -> PlanRegistry {
    let mut r = PlanRegistry::new();

    r.action("grasp", grasp::grasp)
        .action("release", grasp::release)
        .action("rub", grasp::rub)
        .action("pour-onto", grasp::pour_onto)
        .action("grid-walk", ptrans::grid_walk)
        .action("grid-drive-car", ptrans::grid_drive_car)
        .action("warp", ptrans::warp)
        .action("flip-to", grasp::flip_to)
        .action("move-to", grasp::move_to)
        .action("action-open", grasp::action_open)
        .action("action-close", grasp::action_close)
        .action("connect-to", grasp::connect_to)
        .action("sit-on", ptrans::sit_or_lie_on)
        .action("lie-on", ptrans::sit_or_lie_on)
        .action("stand-on", ptrans::stand_on)
        .action("gesture-here", grasp::gesture_here);

    r.add(Tier::State, "near-reachable", ptrans::near_reachable, Locals::trip)
        .state("near-graspable", grasp::near_graspable)
        .state("near-audible", ptrans::near_audible)
        .state("open", grasp::open)
        .state("closed", grasp::closed)
        .state("holding", grasp::holding)
        .add(Tier::State, "inside", grasp::inside, Locals::hand)
        .state("motor-vehicle-on", devices::device_power)
        .state("motor-vehicle-off", devices::device_power)
        .state("tv-set-on", devices::device_power)
        .state("tv-set-off", devices::device_power)
        .state("connected-to", grasp::connected_to)
        .state("sitting", ptrans::posture)
        .state("standing", ptrans::posture)
        .state("lying", ptrans::posture);

    r.state_class("knob-position", grasp::knob_position)
        .state_class("on-or-off-state", grasp::switch_x);

    r.add(Tier::Script, "drive", ptrans::drive, Locals::trip)
        .script("obtain-permission", mtrans::obtain_permission)
        .script("handle-proposal", mtrans::handle_proposal)
        .script("mtrans", mtrans::mtrans)
        .add(Tier::Script, "hand-to", grasp::hand_to, Locals::hand)
        .script("receive-from", grasp::receive_from)
        .add(Tier::Script, "appointment", appointment::appointment, Locals::appointment)
        .add(Tier::Script, "strip", sleep::strip, Locals::strip)
        .add(Tier::Script, "sleep", sleep::sleep, Locals::sleep);

    r
}
