//! End-to-end runs of the planning agents in small hand-built worlds.

use tt_planner::agents::appointment::{appointment_cancel, appointment_make, appointment_make_for, appointments_in};
use tt_planner::agents::space::{Loc, at_grid, locate};
use tt_planner::config::PlannerConfig;
use tt_planner::plan::{ContextId, Mode, Session, SubgoalState};
use tt_planner::prop;
use tt_planner::prop::{Proposition, Term};
use tt_planner::seeds::World;
use tt_planner::store::When;
use tt_planner::symbol::Symbol;
use tt_planner::time::{Ts, TsRange};

fn quiet_session(isa: &[(&str, &str)]) -> (Session, ContextId) {
    let config = PlannerConfig {
        handlers: Vec::new(),
        ..PlannerConfig::default()
    };
    let mut s = Session::new(config);
    for (child, parent) in isa {
        s.add_isa(child, parent);
    }
    let cx = s.best();
    (s, cx)
}

fn sym(name: &str) -> Symbol {
    Symbol::new(name)
}

fn place(s: &mut Session, cx: ContextId, who: &str, grid: &str, row: i64, col: i64) {
    s.assert_state(cx, Ts::ZERO, 0, at_grid(&sym(who), &Loc::new(grid, row, col)));
}

fn fact(s: &mut Session, cx: ContextId, p: Proposition) {
    s.assert_state(cx, Ts::ZERO, 0, p);
}

fn goal_state(s: &Session, cx: ContextId, pattern: &Proposition) -> Option<SubgoalState> {
    let context = s.context(cx)?;
    let id = *context.find_matching_subgoals(pattern).first()?;
    s.state_of(cx, id)
}

fn range(start: i64, stop: i64) -> Term {
    Term::Range(TsRange::new(Ts::from_secs(start), Ts::from_secs(stop)))
}

#[test]
fn grasp_walk_and_release() {
    let (mut s, cx) = quiet_session(&[("jim", "human"), ("hand1", "right-hand"), ("chair1", "chair")]);
    fact(&mut s, cx, prop!["cpart-of", "hand1", "jim"]);
    place(&mut s, cx, "jim", "kitchen1", 1, 1);
    fact(&mut s, cx, prop!["standing", "jim", Term::Na]);
    place(&mut s, cx, "cup1", "kitchen1", 1, 2);
    place(&mut s, cx, "chair1", "kitchen1", 6, 6);

    let grasp = s
        .top_goal(cx, Ts::ZERO, Some(sym("jim")), prop!["grasp", "hand1", "cup1"])
        .unwrap();
    s.main_loop(cx, Mode::Daydreaming);
    assert_eq!(s.state_of(cx, grasp), Some(SubgoalState::Success));
    assert!(s.view(cx, Ts::from_secs(50)).is_true(&prop!["holding", "hand1", "cup1"]));

    // The cup travels in the hand.
    let walk = s
        .top_goal(cx, Ts::from_secs(60), None, prop!["near-reachable", "jim", "chair1"])
        .unwrap();
    s.main_loop(cx, Mode::Daydreaming);
    assert_eq!(s.state_of(cx, walk), Some(SubgoalState::Success));
    let view = s.view(cx, Ts::from_secs(150));
    assert_eq!(locate(&view, &sym("jim")), Some(Loc::new("kitchen1", 5, 5)));
    assert_eq!(locate(&view, &sym("cup1")), Some(Loc::new("kitchen1", 5, 5)));

    let release = s
        .top_goal(cx, Ts::from_secs(200), Some(sym("jim")), prop!["release", "hand1", "cup1"])
        .unwrap();
    s.main_loop(cx, Mode::Daydreaming);
    assert_eq!(s.state_of(cx, release), Some(SubgoalState::Success));
    let view = s.view(cx, Ts::from_secs(300));
    assert!(!view.is_true(&prop!["holding", "*", "cup1"]));
    assert!(view.is_true(&prop!["at-grid", "cup1", "kitchen1", 5, 5]));
}

#[test]
fn walking_through_a_door() {
    let (mut s, cx) = quiet_session(&[
        ("jim", "human"),
        ("apartment1", "room"),
        ("diner1", "room"),
        ("door1", "door"),
        ("table1", "furniture"),
    ]);
    place(&mut s, cx, "jim", "apartment1", 1, 1);
    fact(&mut s, cx, prop!["standing", "jim", Term::Na]);
    place(&mut s, cx, "door1", "apartment1", 3, 3);
    place(&mut s, cx, "door1", "diner1", 0, 0);
    place(&mut s, cx, "table1", "diner1", 2, 2);

    let id = s
        .top_goal(cx, Ts::ZERO, None, prop!["near-reachable", "jim", "table1"])
        .unwrap();
    s.main_loop(cx, Mode::Daydreaming);

    assert_eq!(s.state_of(cx, id), Some(SubgoalState::Success));
    let view = s.view(cx, Ts::from_secs(500));
    assert_eq!(locate(&view, &sym("jim")), Some(Loc::new("diner1", 1, 1)));
    assert!(!s.store().retrieve(cx, When::Ever, &prop!["warp", "jim", "*", "*", "*"]).is_empty());
    assert!((s.context(cx).unwrap().sense - 1.0).abs() < 1e-9);
}

#[test]
fn unreachable_places_fail_and_cost_sense() {
    let (mut s, cx) = quiet_session(&[("jim", "human"), ("table2", "furniture")]);
    place(&mut s, cx, "jim", "apartment1", 1, 1);
    fact(&mut s, cx, prop!["standing", "jim", Term::Na]);
    place(&mut s, cx, "table2", "island1", 0, 0);

    let id = s
        .top_goal(cx, Ts::ZERO, None, prop!["near-reachable", "jim", "table2"])
        .unwrap();
    s.main_loop(cx, Mode::Daydreaming);

    assert_eq!(s.state_of(cx, id), Some(SubgoalState::Failure));
    assert!(s.context(cx).unwrap().sense < 1.0);
    let view = s.view(cx, Ts::from_secs(100));
    assert_eq!(locate(&view, &sym("jim")), Some(Loc::new("apartment1", 1, 1)));
}

#[test]
fn handing_over_an_object() {
    let (mut s, cx) = quiet_session(&[
        ("jim", "human"),
        ("amy", "human"),
        ("hand1", "right-hand"),
        ("hand2", "left-hand"),
    ]);
    fact(&mut s, cx, prop!["cpart-of", "hand1", "jim"]);
    fact(&mut s, cx, prop!["cpart-of", "hand2", "amy"]);
    place(&mut s, cx, "jim", "hall1", 1, 1);
    place(&mut s, cx, "amy", "hall1", 1, 2);
    place(&mut s, cx, "cup1", "hall1", 1, 1);
    fact(&mut s, cx, prop!["holding", "hand1", "cup1"]);

    let receive = s
        .top_goal(cx, Ts::ZERO, None, prop!["receive-from", "amy", "jim", "cup1"])
        .unwrap();
    let give = s
        .top_goal(cx, Ts::ZERO, None, prop!["hand-to", "jim", "amy", "cup1"])
        .unwrap();
    s.main_loop(cx, Mode::Daydreaming);

    assert_eq!(s.state_of(cx, give), Some(SubgoalState::Success));
    assert_eq!(s.state_of(cx, receive), Some(SubgoalState::Success));
    let view = s.view(cx, Ts::from_secs(200));
    assert!(view.is_true(&prop!["holding", "hand2", "cup1"]));
    assert!(!view.is_true(&prop!["holding", "hand1", "cup1"]));
}

#[test]
fn undressing_takes_off_one_item_at_a_time() {
    let (mut s, cx) = quiet_session(&[("jim", "human"), ("shirt1", "shirt"), ("pants1", "pants")]);
    fact(&mut s, cx, prop!["wearing-of", "jim", "shirt1"]);
    fact(&mut s, cx, prop!["wearing-of", "jim", "pants1"]);

    let id = s.top_goal(cx, Ts::ZERO, Some(sym("jim")), prop!["strip", "jim"]).unwrap();
    s.main_loop(cx, Mode::Daydreaming);
    assert_eq!(s.state_of(cx, id), Some(SubgoalState::Success));
    assert_eq!(s.subgoal(cx, id).unwrap().ts, Ts::from_secs(40));

    let take_off = prop!["take-off", "jim", "*"];
    let mut starts: Vec<Ts> = s
        .store()
        .dump(cx)
        .into_iter()
        .filter(|f| take_off.matches(&f.prop))
        .filter_map(|f| f.range.start)
        .collect();
    starts.sort();
    assert_eq!(starts, vec![Ts::ZERO, Ts::from_secs(20)]);

    let worn = |ts: i64| s.view(cx, Ts::from_secs(ts)).all_syms(2, &prop!["wearing-of", "jim", "*"]).len();
    assert_eq!(worn(10), 2);
    assert_eq!(worn(30), 1);
    assert_eq!(worn(40), 0);
}

#[test]
fn driving_a_car_down_the_street() {
    let (mut s, cx) = quiet_session(&[
        ("jim", "human"),
        ("hand1", "right-hand"),
        ("car1", "car"),
        ("ign1", "ignition-switch"),
    ]);
    fact(&mut s, cx, prop!["cpart-of", "hand1", "jim"]);
    fact(&mut s, cx, prop!["cpart-of", "ign1", "car1"]);
    place(&mut s, cx, "jim", "street1", 0, 0);
    fact(&mut s, cx, prop!["standing", "jim", Term::Na]);
    place(&mut s, cx, "car1", "street1", 0, 1);

    let id = s
        .top_goal(cx, Ts::ZERO, None, prop!["drive", "jim", "car1", "street1", 0, 5])
        .unwrap();
    s.main_loop(cx, Mode::Daydreaming);

    assert_eq!(s.state_of(cx, id), Some(SubgoalState::Success));
    let view = s.view(cx, s.subgoal(cx, id).unwrap().ts.plus(1));
    assert_eq!(locate(&view, &sym("car1")), Some(Loc::new("street1", 0, 5)));
    assert_eq!(locate(&view, &sym("jim")), Some(Loc::new("street1", 0, 5)));
    assert!(view.is_true(&prop!["motor-vehicle-off", "car1"]));
    assert!(!view.is_true(&prop!["motor-vehicle-on", "car1"]));
    assert!(view.is_true(&prop!["inside", "jim", "car1"]));
}

#[test]
fn changing_where_to_meet_modifies_the_appointment() {
    let (mut s, cx) = quiet_session(&[("jim", "human"), ("amy", "human")]);
    appointment_make(
        &mut s,
        cx,
        Ts::ZERO,
        prop!["appointment", "jim", "amy", "diner1", Term::Na, range(3600, 7200)],
    );
    let added = appointment_make_for(
        &mut s,
        cx,
        Ts::ZERO,
        prop!["appointment", "jim", "amy", "cafe2", Term::Na, range(3600, 7200)],
    );
    assert!(added.is_none());

    let jims = appointments_in(&s, cx, &sym("jim"), None);
    assert_eq!(jims.len(), 1);
    assert_eq!(jims[0].sym(3), Some(&sym("cafe2")));
    assert!(s.context(cx).unwrap().not_make_sense_reasons.is_empty());
}

#[test]
fn double_booking_does_not_make_sense() {
    let (mut s, cx) = quiet_session(&[("jim", "human"), ("amy", "human"), ("bob", "human")]);
    let first = prop!["appointment", "jim", "amy", "diner1", Term::Na, range(3600, 7200)];
    appointment_make(&mut s, cx, Ts::ZERO, first.clone());
    appointment_make(
        &mut s,
        cx,
        Ts::ZERO,
        prop!["appointment", "jim", "bob", "bar1", Term::Na, range(5000, 9000)],
    );

    assert_eq!(appointments_in(&s, cx, &sym("jim"), None).len(), 2);
    let context = s.context(cx).unwrap();
    assert!(context.rsn.sense < 0.5);
    assert!(context.not_make_sense_reasons.contains(&first));
}

#[test]
fn cancelling_fails_both_sides() {
    let (mut s, cx) = quiet_session(&[("jim", "human"), ("amy", "human")]);
    appointment_make(
        &mut s,
        cx,
        Ts::ZERO,
        prop!["appointment", "jim", "amy", "diner1", Term::Na, range(3600, 7200)],
    );
    let found = appointment_cancel(
        &mut s,
        cx,
        Ts::from_secs(60),
        &prop!["appointment", "jim", "amy", Term::Na, Term::Na, Term::Na],
    );
    assert!(found);
    assert!(appointments_in(&s, cx, &sym("jim"), None).is_empty());
    assert!(appointments_in(&s, cx, &sym("amy"), None).is_empty());

    let pattern = prop!["appointment", "jim", "*", "*", "*", "*"];
    assert_eq!(goal_state(&s, cx, &pattern), Some(SubgoalState::Failure));
    let context = s.context(cx).unwrap();
    let id = context.find_matching_subgoals(&pattern)[0];
    assert!(context.subgoal(id).unwrap().failure_causes[0].is("cancel-appointment"));
}

const PERMISSION: &str = r#"
    [world]
    id = "permission"
    start = 0
    horizon = 600
    actors = ["jim", "amy"]
    isa = [["jim", "human"], ["amy", "human"], ["bob", "human"], ["room1", "room"]]
    facts = [
        "[at-grid jim room1 1 1]",
        "[at-grid amy room1 1 2]",
        "[standing jim na]",
        "[standing amy na]",
    ]

    [[goal]]
    actor = "jim"
    objective = "[obtain-permission jim amy [appointment jim amy diner1 na {3600 7200}]]"
"#;

fn proposal_handlers() -> PlannerConfig {
    PlannerConfig {
        handlers: vec!["handle-proposal".to_string()],
        ..PlannerConfig::default()
    }
}

#[test]
fn a_free_counterpart_accepts_a_proposal() {
    let world = World::from_toml_str(PERMISSION, "permission").unwrap();
    let mut s = world.session(proposal_handlers(), Mode::Daydreaming);
    let cx = s.best();
    s.main_loop(cx, Mode::Daydreaming);

    let cx = s.best();
    let pattern = prop!["obtain-permission", "jim", "amy", "*"];
    assert_eq!(goal_state(&s, cx, &pattern), Some(SubgoalState::Success));

    let amys = appointments_in(&s, cx, &sym("amy"), None);
    assert_eq!(amys.len(), 1);
    assert_eq!(amys[0].sym(2), Some(&sym("jim")));
    assert!(!s.store().retrieve(cx, When::Ever, &prop!["accept", "amy", "jim", "*"]).is_empty());
}

#[test]
fn a_busy_counterpart_rejects_a_proposal() {
    let text = PERMISSION.replace(
        "actors = [\"jim\", \"amy\"]",
        "actors = [\"jim\", \"amy\"]\n    appointments = [\"[appointment amy bob cafe2 na {3000 8000}]\"]",
    );
    let world = World::from_toml_str(&text, "permission").unwrap();
    assert_eq!(world.appointments.len(), 1);
    let mut s = world.session(proposal_handlers(), Mode::Daydreaming);
    let cx = s.best();
    s.main_loop(cx, Mode::Daydreaming);

    let cx = s.best();
    let pattern = prop!["obtain-permission", "jim", "amy", "*"];
    assert_eq!(goal_state(&s, cx, &pattern), Some(SubgoalState::Failure));
    assert!(!s.store().retrieve(cx, When::Ever, &prop!["reject", "amy", "jim", "*"]).is_empty());
    // Only the appointment with Bob is still on Amy's calendar.
    let amys = appointments_in(&s, cx, &sym("amy"), None);
    assert_eq!(amys.len(), 1);
    assert_eq!(amys[0].sym(2), Some(&sym("bob")));
}
