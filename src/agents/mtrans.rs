//! Communication between actors.
//!
//! A speech act `[propose a b content]`, `[inform a b content]` and so on
//! is a `mtrans`: the speaker gets within earshot, then says it. Saying it
//! asserts the act, which is what wakes a listener waiting on the pattern.

use tracing::debug;

use crate::plan::{Planner, SubgoalState};
use crate::prop;
use crate::prop::Term;

use super::appointment::is_proposal_accepted;
use super::args;

/// Any `mtrans` subclass: `[head speaker listener content]`.
pub fn mtrans(p: &mut Planner<'_>) {
    let Some([speaker, listener]) = args(p, [1, 2]) else {
        return;
    };
    match p.state() {
        SubgoalState::Begin => {
            p.sub_step(1, prop!["near-audible", &speaker, &listener]);
        }
        SubgoalState::Step(1) => {
            let head = p.obj().head().clone();
            let d = if p.config().durations.contains_key(head.as_str()) {
                p.own_duration()
            } else {
                p.duration("mtrans")
            };
            p.assert_action(d, p.obj().clone());
            p.advance(d);
            p.success();
        }
        _ => p.undefined("mtrans"),
    }
}

/// `[obtain-permission a other proposal]`: propose, then wait for an answer.
pub fn obtain_permission(p: &mut Planner<'_>) {
    let Some([a, other]) = args(p, [1, 2]) else {
        return;
    };
    let proposal = p.obj().term(3).clone();
    match p.state() {
        SubgoalState::Begin => {
            p.sub_step(1, prop!["propose", &a, &other, &proposal]);
        }
        SubgoalState::Step(1) => {
            if !p.wait_ptn(true, SubgoalState::Step(999), prop!["accept", &other, "*", &proposal]) {
                p.wait_ptn(false, SubgoalState::Failure, prop!["reject", &other, "*", &proposal]);
            }
        }
        SubgoalState::Step(999) => {
            let (start, now) = (p.start_ts(), p.ts());
            p.assert_range(start, now, p.obj().clone());
            p.success();
        }
        _ => p.undefined("obtain-permission"),
    }
}

/// `[handle-proposal a]`: answer every proposal made to `a`, forever.
///
/// Appointment proposals are weighed against `a`'s calendar; anything else
/// is accepted.
pub fn handle_proposal(p: &mut Planner<'_>) {
    let Some([a]) = args(p, [1]) else {
        return;
    };
    match p.state() {
        SubgoalState::Begin => p.step(100),
        SubgoalState::Step(100) => {
            p.wait_ptn(false, SubgoalState::Step(200), prop!["propose", "*", &a, "*"]);
        }
        SubgoalState::Step(200) => {
            let Some(trigger) = p.trigger() else {
                return p.step(100);
            };
            let Some(proposer) = trigger.sym(1).cloned() else {
                return p.step(100);
            };
            let appointment = trigger
                .sub(3)
                .filter(|q| p.s.ontology().isa("appointment", q.head()))
                .cloned();
            let Some(mut appointment) = appointment else {
                return p.step(300);
            };
            // The proposer's appointment, seen from the listener's side.
            appointment.set_term(1, Term::from(&a));
            appointment.set_term(2, Term::from(&proposer));
            let (cx, ts) = (p.cx(), p.ts());
            let (accepted, reasons) = is_proposal_accepted(p.s, cx, ts, &a, appointment);
            debug!(actor = %a, proposer = %proposer, accepted, reasons = reasons.len(), "proposal weighed");
            p.step(if accepted { 300 } else { 400 });
        }
        SubgoalState::Step(300) | SubgoalState::Step(400) => {
            let answer = if p.state() == SubgoalState::Step(300) { "accept" } else { "reject" };
            let Some(trigger) = p.trigger() else {
                return p.step(100);
            };
            let proposer = trigger.term(1).clone();
            let proposal = trigger.term(3).clone();
            p.sub(
                SubgoalState::Step(100),
                SubgoalState::Step(100),
                prop![answer, &a, proposer, proposal],
            );
        }
        _ => p.undefined("handle-proposal"),
    }
}
