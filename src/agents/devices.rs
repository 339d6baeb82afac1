//! Device state rules.
//!
//! Some objects are on or off because one of their parts is: a car runs
//! while its ignition switch is on. Whenever a switch state is asserted the
//! rule for the nearest enclosing device updates that device's state, and
//! the `device_power` body gets a device into a state by flipping the part.

use tracing::debug;

use crate::plan::{ContextId, Planner, Session, SubgoalState};
use crate::prop;
use crate::prop::Proposition;
use crate::symbol::Symbol;
use crate::time::TsRange;

use super::args;

/// How a whole follows the on/off state of one of its parts.
struct DeviceRule {
    whole: &'static str,
    switch: &'static str,
    on: &'static str,
    off: &'static str,
}

const RULES: &[DeviceRule] = &[
    DeviceRule {
        whole: "motor-vehicle",
        switch: "ignition-switch",
        on: "motor-vehicle-on",
        off: "motor-vehicle-off",
    },
    DeviceRule {
        whole: "tv-set",
        switch: "power-switch",
        on: "tv-set-on",
        off: "tv-set-off",
    },
];

fn rule_for_state(head: &Symbol) -> Option<&'static DeviceRule> {
    RULES.iter().find(|r| head == r.on || head == r.off)
}

/// Propagate a newly asserted switch state to the device it belongs to.
pub(crate) fn on_assert(s: &mut Session, cx: ContextId, range: TsRange, fact: &Proposition) {
    let Some(ts) = range.start else {
        return;
    };
    let Some(part) = fact.sym(1) else {
        return;
    };
    if fact.args().len() != 1 || !s.ontology().isa("on-or-off-state", fact.head()) {
        return;
    }
    let on = match fact.head().as_str() {
        "switch-on" => true,
        "switch-off" => false,
        _ => return,
    };
    let (device, rule, was) = {
        let view = s.view(cx, ts);
        let Some(rule) = RULES.iter().find(|r| view.isa(r.switch, part)) else {
            return;
        };
        let Some(device) = view.retrieve_whole(rule.whole, part) else {
            return;
        };
        let was = if view.is_true(&prop![rule.on, &device]) {
            Some(true)
        } else if view.is_true(&prop![rule.off, &device]) {
            Some(false)
        } else {
            None
        };
        (device, rule, was)
    };
    if was == Some(on) {
        return;
    }
    let (new, old) = if on { (rule.on, rule.off) } else { (rule.off, rule.on) };
    debug!(context = %cx, device = %device, switch = %part, state = new, "device state follows switch");
    s.retract(cx, ts, &prop![old, &device]);
    s.assert_state(cx, ts, 0, prop![new, &device]);
}

/// `[motor-vehicle-on car]`, `[tv-set-off tv]` and the like: flip the
/// controlling switch, then wait for the device to follow.
pub fn device_power(p: &mut Planner<'_>) {
    let Some([device]) = args(p, [1]) else {
        return;
    };
    let head = p.obj().head().clone();
    let Some(rule) = rule_for_state(&head) else {
        return p.undefined("device-power");
    };
    match p.state() {
        SubgoalState::Begin => {
            if p.view().is_true(p.obj()) {
                return p.success();
            }
            let switch = p.view().retrieve_part(rule.switch, &device);
            let Some(switch) = switch else {
                debug!(device = %device, switch = rule.switch, "device has no switch");
                return p.failure();
            };
            let position = if head == rule.on { "switch-on" } else { "switch-off" };
            p.sub_step(1, prop![position, &switch]);
        }
        SubgoalState::Step(1) => {
            let want = p.obj().clone();
            p.wait_ptn(true, SubgoalState::Success, want);
        }
        _ => p.undefined("device-power"),
    }
}
