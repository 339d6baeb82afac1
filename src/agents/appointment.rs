//! Appointments: keeping them, and making sense of talk about them.
//!
//! An appointment objective reads
//! `[appointment actor counterpart location goal range]`. Any of the
//! counterpart, location and goal may be `na`; the range should be known.
//!
//! The planning agent waits until it is time to leave, travels to the
//! location, waits there for the counterpart, pursues the shared goal and
//! records the meeting. The understanding side turns an agreed, changed or
//! cancelled appointment into subgoal operations and a judgement of how
//! much sense the news makes.

use tracing::{debug, info, warn};

use crate::config::AppointmentConfig;
use crate::plan::context::{
    NOVELTY_EXPECTED, NOVELTY_HALF, NOVELTY_MOSTLY, NOVELTY_NONE, NOVELTY_TOTAL, SENSE_HALF, SENSE_LITTLE,
    SENSE_MOSTLY, SENSE_TOTAL,
};
use crate::plan::{ContextId, Locals, Mode, Planner, Session, SubgoalId, SubgoalState};
use crate::prop;
use crate::prop::{Proposition, Term};
use crate::symbol::Symbol;
use crate::time::{Ts, TsRange};

use super::args;
use super::space::is_near_reachable;

/// Sense lost for every detail an appointment leaves unspecified.
const MISSING_DETAIL_PENALTY: f64 = 0.05;

const COUNTERPART: usize = 2;
const LOCATION: usize = 3;
const GOAL: usize = 4;
const RANGE: usize = 5;

/// The roles of an appointment objective.
#[derive(Debug, Clone, PartialEq)]
pub struct Roles {
    pub counterpart: Term,
    pub location: Term,
    pub goal: Term,
    pub range: TsRange,
}

impl Roles {
    pub fn of(appointment: &Proposition) -> Self {
        Roles {
            counterpart: appointment.term(COUNTERPART).clone(),
            location: appointment.term(LOCATION).clone(),
            goal: appointment.term(GOAL).clone(),
            range: appointment.range(RANGE).copied().unwrap_or_else(TsRange::na),
        }
    }

    /// Whether two descriptions can be of the same appointment: every role
    /// is equal or unknown on one side.
    pub fn matches(&self, other: &Roles) -> bool {
        fn similar(a: &Term, b: &Term) -> bool {
            a.is_na() || b.is_na() || a == b
        }
        similar(&self.counterpart, &other.counterpart)
            && similar(&self.location, &other.location)
            && similar(&self.goal, &other.goal)
            && (self.range.is_na() || other.range.is_na() || self.range == other.range)
    }
}

/// When to set off, and the latest departure still worth making.
pub fn leave_times(config: &AppointmentConfig, range: &TsRange) -> Option<(Ts, Ts)> {
    let start = range.start?;
    let depart = start.plus(-config.travel_allowance);
    Some((depart.plus(-config.punctuality), depart.plus(config.wait_limit)))
}

fn rsn(s: &mut Session, cx: ContextId, relevance: f64, sense: f64, novelty: f64) {
    if let Some(context) = s.context_mut(cx) {
        context.set_rsn(relevance, sense, novelty);
    }
}

// ---------------------------------------------------------------------------
// Planning agent
// ---------------------------------------------------------------------------

pub fn appointment(p: &mut Planner<'_>) {
    let Some([a]) = args(p, [1]) else {
        return;
    };
    let roles = Roles::of(p.obj());
    match p.state() {
        SubgoalState::Begin => p.step(10),
        SubgoalState::Step(10) => p.step(100),
        // Waiting to leave.
        SubgoalState::Step(100) => {
            let Some((leave_at, leave_before)) = leave_times(&p.config().appointment, &roles.range) else {
                warn!(appointment = %p.obj(), "appointment without a start time");
                return p.failure();
            };
            if let Some(locals) = p.locals() {
                *locals = Locals::Appointment {
                    leave_at: Some(leave_at),
                    leave_before: Some(leave_before),
                };
            }
            p.wait_ts(leave_at, 0, SubgoalState::Step(101));
        }
        SubgoalState::Step(101) => {
            let ts = p.ts();
            if roles.range.stop.is_some_and(|stop| ts > stop) {
                if p.mode() == Mode::Spinning {
                    // Assume it was kept.
                    p.set_rsn(SENSE_HALF, SENSE_HALF, NOVELTY_HALF);
                    return p.success();
                }
                return no_show(p, &a);
            }
            let stored = match p.locals() {
                Some(Locals::Appointment {
                    leave_at: Some(at),
                    leave_before: Some(before),
                }) => Some((*at, *before)),
                _ => None,
            };
            let times = stored.or_else(|| leave_times(&p.config().appointment, &roles.range));
            let Some((leave_at, leave_before)) = times else {
                return p.failure();
            };
            if ts > leave_before {
                p.set_rsn(SENSE_TOTAL, SENSE_LITTLE, NOVELTY_TOTAL);
                no_show(p, &a);
            } else if ts >= leave_at {
                let objective = p.obj().clone();
                if let Some(actor) = p.actor_rec_mut() {
                    if let Some(previous) = actor.appointment_cur.replace(objective) {
                        debug!(actor = %a, previous = %previous, "abandoning current appointment trip");
                    }
                }
                p.set_rsn(SENSE_TOTAL, SENSE_TOTAL, NOVELTY_EXPECTED);
                let location = roles.location.clone();
                p.sub_step(110, prop!["near-reachable", &a, location]);
            } else {
                p.step(100);
            }
        }
        // Waiting for the counterpart.
        SubgoalState::Step(110) => {
            let (Some(counterpart), Some(location)) = (roles.counterpart.as_sym(), roles.location.as_sym()) else {
                return p.step(200);
            };
            let reach = p.config().reach;
            if is_near_reachable(&p.view(), reach, counterpart, location) {
                return p.step(200);
            }
            let wait_limit = p.config().appointment.wait_limit;
            let gave_up = roles.range.start.is_some_and(|start| p.ts() >= start.plus(wait_limit));
            if gave_up {
                let counterpart = counterpart.clone();
                return no_show(p, &counterpart);
            }
            let retry = p.config().appointment.retry_interval;
            p.wait_for(retry, SubgoalState::Step(110));
        }
        // The appointment begins.
        SubgoalState::Step(200) => match roles.goal.as_prop() {
            Some(goal) => {
                p.sub_step(999, goal.clone());
            }
            None => p.step(999),
        },
        SubgoalState::Step(999) => {
            let ts = p.ts();
            let counterpart = roles.counterpart.as_sym().cloned();
            if let Some(actor) = p.actor_rec_mut() {
                if let Some(friend) = counterpart.and_then(|c| actor.find_friend_mut(&c)) {
                    friend.last_seen = Some(ts);
                }
                actor.appointment_cur = None;
            }
            let start = p.start_ts();
            p.assert_range(start, ts, p.obj().clone());
            p.success();
        }
        _ => p.undefined("appointment"),
    }
}

fn no_show(p: &mut Planner<'_>, who: &Symbol) {
    info!(appointment = %p.obj(), no_show = %who, "appointment missed");
    if let Some(actor) = p.actor_rec_mut() {
        actor.appointment_cur = None;
    }
    p.add_failure_cause(prop!["action", who]);
    p.failure();
}

// ---------------------------------------------------------------------------
// Understanding
// ---------------------------------------------------------------------------

/// Live appointments of `actor`, newest first, optionally only those
/// overlapping `range`.
pub fn appointments_in(s: &Session, cx: ContextId, actor: &Symbol, range: Option<TsRange>) -> Vec<Proposition> {
    let Some(context) = s.context(cx) else {
        return Vec::new();
    };
    context
        .find_subgoals_head(s.ontology(), actor, "appointment")
        .into_iter()
        .filter_map(|id| context.subgoal(id))
        .map(|sg| sg.objective.clone())
        .filter(|obj| match range {
            Some(r) if !r.is_na() => Roles::of(obj).range.overlaps(&r),
            _ => true,
        })
        .collect()
}

fn live_appointments(s: &Session, cx: ContextId, actor: &Symbol) -> Vec<SubgoalId> {
    s.context(cx)
        .map(|context| context.find_subgoals_head(s.ontology(), actor, "appointment"))
        .unwrap_or_default()
}

/// The same appointment as seen by the counterpart.
fn mirrored(appointment: &Proposition) -> Option<Proposition> {
    let a = appointment.sym(1)?.clone();
    let counterpart = appointment.sym(COUNTERPART)?.clone();
    let mut m = appointment.clone();
    m.set_term(1, Term::from(counterpart));
    m.set_term(COUNTERPART, Term::from(a));
    Some(m)
}

/// An appointment was agreed: give it to both parties.
pub fn appointment_make(s: &mut Session, cx: ContextId, now: Ts, appointment: Proposition) {
    let other_side = mirrored(&appointment).filter(|m| m.sym(1).is_some_and(|c| s.is_actor(c)));
    appointment_make_for(s, cx, now, appointment);
    if let Some(m) = other_side {
        appointment_make_for(s, cx, now, m);
    }
}

/// Fold a new appointment into its actor's calendar.
///
/// An overlapping appointment with the same counterpart is the same one and
/// is modified in place. An overlapping one with someone else is a conflict:
/// the new appointment is still added but makes little sense. Otherwise the
/// appointment is added, making less sense the less it specifies. Returns
/// the newly added subgoal, if any.
pub fn appointment_make_for(s: &mut Session, cx: ContextId, now: Ts, appointment: Proposition) -> Option<SubgoalId> {
    let Some(a) = appointment.sym(1).cloned() else {
        warn!(appointment = %appointment, "appointment without an actor");
        return None;
    };
    s.actor_find_or_create(cx, &a, now)?;
    let incoming = Roles::of(&appointment);

    for id in live_appointments(s, cx, &a) {
        let Some(existing) = s.sg(cx, id).map(|sg| sg.objective.clone()) else {
            continue;
        };
        let known = Roles::of(&existing);
        if !incoming.range.overlaps(&known.range) {
            continue;
        }
        if incoming.counterpart == known.counterpart {
            debug!(actor = %a, appointment = %existing, "modifying existing appointment");
            appointment_mod(s, cx, id, &incoming.goal, GOAL);
            appointment_mod(s, cx, id, &incoming.location, LOCATION);
            appointment_mod(s, cx, id, &Term::Range(incoming.range), RANGE);
            return None;
        }
        debug!(actor = %a, existing = %existing, new = %appointment, "conflicting appointment");
        rsn(s, cx, SENSE_TOTAL, SENSE_LITTLE, NOVELTY_TOTAL);
        if let Some(context) = s.context_mut(cx) {
            context.add_not_make_sense_reason(existing);
        }
        return appointment_add(s, cx, now, &a, appointment);
    }

    let missing = [
        incoming.range.is_na(),
        incoming.goal.is_na(),
        incoming.location.is_na(),
        incoming.counterpart.is_na(),
    ]
    .into_iter()
    .filter(|m| *m)
    .count();
    let sense = SENSE_TOTAL - MISSING_DETAIL_PENALTY * missing as f64;
    rsn(s, cx, SENSE_TOTAL, sense, NOVELTY_TOTAL);
    appointment_add(s, cx, now, &a, appointment)
}

/// Start the appointment as a top-level goal and befriend the counterpart.
pub fn appointment_add(s: &mut Session, cx: ContextId, now: Ts, a: &Symbol, appointment: Proposition) -> Option<SubgoalId> {
    if Roles::of(&appointment).range.is_na() {
        warn!(appointment = %appointment, "appointment time not known");
    }
    let counterpart = appointment.sym(COUNTERPART).cloned();
    let id = s.top_goal(cx, now, Some(a.clone()), appointment);
    if let (Some(c), Some(context)) = (counterpart, s.context_mut(cx)) {
        if let Some(actor) = context.actor_mut(a) {
            actor.add_friend(c);
        }
    }
    id
}

/// Update role `pos` of an appointment from new information. Unknown or
/// repeated values confirm it; a different value is taken as a change.
pub fn appointment_mod(s: &mut Session, cx: ContextId, id: SubgoalId, value: &Term, pos: usize) {
    let Some(current) = s.sg(cx, id).map(|sg| sg.objective.term(pos).clone()) else {
        return;
    };
    let same = match (value, &current) {
        (Term::Range(r), _) if r.is_na() => true,
        _ => value.is_na() || value == &current,
    };
    if same {
        rsn(s, cx, SENSE_TOTAL, SENSE_TOTAL, NOVELTY_NONE);
        return;
    }
    rsn(s, cx, SENSE_TOTAL, SENSE_MOSTLY, NOVELTY_MOSTLY);
    if let Some(sg) = s.sg_mut(cx, id) {
        debug!(subgoal = %id, pos, from = %current, to = %value, "appointment changed");
        sg.objective.set_term(pos, value.clone());
    }
}

/// Call off every appointment matching the description, for both parties.
/// Returns whether the actor had one.
///
/// Cancelling an appointment nobody knew about still records it, cancelled,
/// and makes little sense.
pub fn appointment_cancel(s: &mut Session, cx: ContextId, now: Ts, appointment: &Proposition) -> bool {
    let found = appointment_cancel_for(s, cx, now, appointment, true);
    if let Some(m) = mirrored(appointment).filter(|m| m.sym(1).is_some_and(|c| s.is_actor(c))) {
        appointment_cancel_for(s, cx, now, &m, false);
    }
    found
}

fn appointment_cancel_for(s: &mut Session, cx: ContextId, now: Ts, appointment: &Proposition, record_unknown: bool) -> bool {
    let Some(a) = appointment.sym(1).cloned() else {
        return false;
    };
    let cause = Proposition::new("cancel-appointment", appointment.args().to_vec());
    let incoming = Roles::of(appointment);
    let mut found = false;
    for id in live_appointments(s, cx, &a) {
        let matches = s
            .sg(cx, id)
            .is_some_and(|sg| incoming.matches(&Roles::of(&sg.objective)));
        if !matches {
            continue;
        }
        found = true;
        rsn(s, cx, SENSE_TOTAL, SENSE_TOTAL, NOVELTY_TOTAL);
        info!(actor = %a, subgoal = %id, "appointment cancelled");
        s.add_failure_cause(cx, id, cause.clone());
        s.transition_to(cx, id, SubgoalState::Failure);
    }
    if !found && record_unknown {
        if let Some(id) = appointment_add(s, cx, now, &a, appointment.clone()) {
            s.add_failure_cause(cx, id, cause);
            s.transition_to(cx, id, SubgoalState::Failure);
        }
        rsn(s, cx, SENSE_TOTAL, SENSE_LITTLE, NOVELTY_TOTAL);
        let counterpart = appointment.term(COUNTERPART).clone();
        if let Some(context) = s.context_mut(cx) {
            context.add_not_make_sense_reason(prop!["not", prop!["appointment", &a, counterpart]]);
        }
    }
    found
}

/// Fail an appointment because `who` did not turn up.
pub fn appointment_no_show(s: &mut Session, cx: ContextId, id: SubgoalId, who: &Symbol) {
    s.add_failure_cause(cx, id, prop!["action", who]);
    s.transition_to(cx, id, SubgoalState::Failure);
}

/// Whether `a` should accept a proposed appointment, with the reasons.
///
/// The proposal is understood as if agreed, starting from a clean slate of
/// relevance, sense and novelty; it is accepted when the result makes more
/// sense than the configured threshold. A rejected appointment does not
/// stay on the calendar.
pub fn is_proposal_accepted(
    s: &mut Session,
    cx: ContextId,
    now: Ts,
    a: &Symbol,
    proposal: Proposition,
) -> (bool, Vec<Proposition>) {
    if let Some(context) = s.context_mut(cx) {
        context.rsn_reset();
        context.makes_sense_reasons.clear();
        context.not_make_sense_reasons.clear();
    }
    let added = appointment_make_for(s, cx, now, proposal.clone());
    let threshold = s.config().appointment.accept_sense;
    let Some(context) = s.context(cx) else {
        return (false, Vec::new());
    };
    let accepted = context.rsn.sense > threshold;
    let reasons = if accepted {
        context.makes_sense_reasons.clone()
    } else {
        context.not_make_sense_reasons.clone()
    };
    if !accepted {
        if let Some(id) = added {
            s.add_failure_cause(cx, id, prop!["reject", a, &proposal]);
            s.transition_to(cx, id, SubgoalState::Failure);
        }
    }
    (accepted, reasons)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PlannerConfig;

    fn range(start: i64, stop: i64) -> Term {
        Term::Range(TsRange::new(Ts::from_secs(start), Ts::from_secs(stop)))
    }

    fn session() -> (Session, ContextId) {
        let config = PlannerConfig {
            handlers: Vec::new(),
            ..PlannerConfig::default()
        };
        let mut s = Session::new(config);
        for who in ["Jim", "Mary", "Peter"] {
            s.add_isa(who, "human");
        }
        let cx = s.best();
        (s, cx)
    }

    #[test]
    fn leave_times_allow_for_travel_and_waiting() {
        let config = AppointmentConfig::default();
        let r = TsRange::new(Ts::from_secs(10_000), Ts::from_secs(12_000));
        let (at, before) = leave_times(&config, &r).unwrap();
        assert_eq!(at, Ts::from_secs(10_000 - 30 - 300));
        assert_eq!(before, Ts::from_secs(10_000 - 30 + 900));
        assert!(leave_times(&config, &TsRange::na()).is_none());
    }

    #[test]
    fn roles_match_when_unknown_on_either_side() {
        let full = prop!["appointment", "Jim", "Mary", "cafe1", Term::Na, range(0, 10)];
        let vague = prop!["appointment", "Jim", "Mary", Term::Na, Term::Na, Term::Na];
        let other = prop!["appointment", "Jim", "Peter", Term::Na, Term::Na, Term::Na];
        assert!(Roles::of(&vague).matches(&Roles::of(&full)));
        assert!(!Roles::of(&other).matches(&Roles::of(&full)));
    }

    #[test]
    fn agreed_appointment_goes_to_both_parties() {
        let (mut s, cx) = session();
        appointment_make(
            &mut s,
            cx,
            Ts::ZERO,
            prop!["appointment", "Jim", "Mary", "cafe1", Term::Na, range(3600, 7200)],
        );
        let jim = appointments_in(&s, cx, &Symbol::new("Jim"), None);
        let mary = appointments_in(&s, cx, &Symbol::new("Mary"), None);
        assert_eq!(jim.len(), 1);
        assert_eq!(mary.len(), 1);
        assert_eq!(mary[0].sym(2), Some(&Symbol::new("Jim")));
        let context = s.context(cx).unwrap();
        assert!((context.rsn.sense - 0.95).abs() < 1e-9);
        assert!(context.actor(&Symbol::new("Jim")).unwrap().find_friend(&Symbol::new("Mary")).is_some());
    }

    #[test]
    fn appointments_in_filters_by_range() {
        let (mut s, cx) = session();
        let jim = Symbol::new("Jim");
        appointment_make_for(&mut s, cx, Ts::ZERO, prop!["appointment", "Jim", "Mary", "cafe1", Term::Na, range(3600, 7200)]);
        let later = Some(TsRange::new(Ts::from_secs(90_000), Ts::from_secs(91_000)));
        assert!(appointments_in(&s, cx, &jim, later).is_empty());
        let overlapping = Some(TsRange::new(Ts::from_secs(7000), Ts::from_secs(8000)));
        assert_eq!(appointments_in(&s, cx, &jim, overlapping).len(), 1);
    }

    #[test]
    fn cancelling_an_unknown_appointment_makes_little_sense() {
        let (mut s, cx) = session();
        let found = appointment_cancel(
            &mut s,
            cx,
            Ts::ZERO,
            &prop!["appointment", "Jim", "Peter", Term::Na, Term::Na, range(0, 100)],
        );
        assert!(!found);
        let context = s.context(cx).unwrap();
        assert!(context.rsn.sense <= SENSE_LITTLE);
        assert_eq!(
            context.not_make_sense_reasons,
            vec![prop!["not", prop!["appointment", "Jim", "Peter"]]]
        );
        assert!(appointments_in(&s, cx, &Symbol::new("Jim"), None).is_empty());
    }

    #[test]
    fn proposals_that_conflict_are_rejected_and_dropped() {
        let (mut s, cx) = session();
        let jim = Symbol::new("Jim");
        appointment_make_for(&mut s, cx, Ts::ZERO, prop!["appointment", "Jim", "Mary", "cafe1", Term::Na, range(3600, 7200)]);

        let clash = prop!["appointment", "Jim", "Peter", "bar1", Term::Na, range(5000, 9000)];
        let (accepted, reasons) = is_proposal_accepted(&mut s, cx, Ts::ZERO, &jim, clash);
        assert!(!accepted);
        assert_eq!(reasons.len(), 1);
        assert_eq!(reasons[0].sym(2), Some(&Symbol::new("Mary")));
        assert_eq!(appointments_in(&s, cx, &jim, None).len(), 1);

        let free = prop!["appointment", "Jim", "Peter", "bar1", Term::Na, range(20_000, 21_000)];
        let (accepted, _) = is_proposal_accepted(&mut s, cx, Ts::ZERO, &jim, free);
        assert!(accepted);
        assert_eq!(appointments_in(&s, cx, &jim, None).len(), 2);
    }
}
