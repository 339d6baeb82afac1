//! Whole-world runs: the bundled worlds, PERFORMANCE replay and loading
//! worlds and configuration from disk.

use std::fs;

use tempfile::TempDir;

use tt_planner::agents::space::{Loc, locate};
use tt_planner::config::PlannerConfig;
use tt_planner::plan::{ContextId, Mode, Session, SubgoalState};
use tt_planner::prop;
use tt_planner::prop::Proposition;
use tt_planner::seeds::{World, WorldSource};
use tt_planner::store::When;
use tt_planner::symbol::Symbol;
use tt_planner::time::Ts;

fn jim() -> Symbol {
    Symbol::new("jim")
}

fn at(text: &str) -> Ts {
    text.parse().unwrap()
}

fn goal_state(s: &Session, cx: ContextId, pattern: &Proposition) -> Option<SubgoalState> {
    let context = s.context(cx)?;
    let id = *context.find_matching_subgoals(pattern).first()?;
    s.state_of(cx, id)
}

fn run(world: &World, config: PlannerConfig, mode: Mode) -> Session {
    let mut s = world.session(config, mode);
    let cx = s.best();
    s.main_loop(cx, mode);
    s
}

fn check_meeting(s: &Session) {
    let cx = s.best();
    let appointment = prop!["appointment", "jim", "amy", "*", "*", "*"];
    assert_eq!(goal_state(s, cx, &appointment), Some(SubgoalState::Success));

    let view = s.view(cx, at("13:30"));
    let loc = locate(&view, &jim()).unwrap();
    assert_eq!(loc.grid, Symbol::new("diner1"));
    assert!(view.is_true(&prop!["inside", "jim", "diner1"]));
}

#[test]
fn meeting_world_daydreams_to_lunch() {
    let world = World::resolve("meeting").unwrap();
    assert_eq!(world.source, WorldSource::Bundled);
    let s = run(&world, PlannerConfig::default(), Mode::Daydreaming);
    check_meeting(&s);

    // Amy was already there and kept her side too.
    let cx = s.best();
    let amys = prop!["appointment", "amy", "jim", "*", "*", "*"];
    assert_eq!(goal_state(&s, cx, &amys), Some(SubgoalState::Success));
}

#[test]
fn meeting_world_performs_against_the_clock() {
    let world = World::resolve("meeting").unwrap();
    let s = run(&world, PlannerConfig::default(), Mode::Performance);
    check_meeting(&s);
    // The clock was paced up to the horizon and not far beyond it.
    assert!(s.now() >= at("12:00"));
    assert!(s.now() <= at("13:31"));
}

#[test]
fn bedtime_world_goes_to_sleep() {
    let world = World::resolve("bedtime").unwrap();
    let mut s = world.session(PlannerConfig::default(), Mode::Daydreaming);
    s.set_horizon(Some(at("23:30")));
    let cx = s.best();
    s.main_loop(cx, Mode::Daydreaming);

    let view = s.view(cx, at("23:30"));
    assert!(view.is_true(&prop!["asleep", "jim"]));
    assert!(view.is_true(&prop!["lying", "jim", "bed1"]));
    assert!(!view.is_true(&prop!["wearing-of", "jim", "*"]));
    let undressing = s
        .store()
        .retrieve(cx, When::Ever, &prop!["take-off", "jim", "*"]);
    assert_eq!(undressing.len(), 2);
}

#[test]
fn bedtime_world_wakes_in_the_morning() {
    let world = World::resolve("bedtime").unwrap();
    let s = run(&world, PlannerConfig::default(), Mode::Daydreaming);
    let cx = s.best();

    let night = s.view(cx, at("d1+02:00"));
    assert!(night.is_true(&prop!["asleep", "jim"]));
    let morning = s.view(cx, at("d1+07:45"));
    assert!(morning.is_true(&prop!["awake", "jim"]));
    assert!(!morning.is_true(&prop!["asleep", "jim"]));
    // The knock happened but did not wake him.
    assert!(!s.store().retrieve(cx, When::Ever, &prop!["knock", "amy", "door1"]).is_empty());
    assert!(s.view(cx, at("23:50")).is_true(&prop!["asleep", "jim"]));
}

const ERRAND: &str = r#"
    [world]
    id = "errand"
    start = "08:00"
    horizon = "08:10"
    actors = ["jim", "amy"]
    isa = [["jim", "human"], ["amy", "human"], ["office1", "room"]]
    facts = [
        "[at-grid jim office1 1 1]",
        "[at-grid amy office1 1 2]",
    ]

    [[input]]
    at = "08:00:30"
    goals = [{ actor = "jim", objective = "[obtain-permission jim amy [walk jim amy park1]]" }]
"#;

#[test]
fn performance_input_starts_goals_on_time() {
    let world = World::from_toml_str(ERRAND, "errand").unwrap();
    assert_eq!(world.source, WorldSource::Inline);
    let config = PlannerConfig {
        handlers: vec!["handle-proposal".to_string()],
        ..PlannerConfig::default()
    };
    let s = run(&world, config, Mode::Performance);
    let cx = s.best();

    let pattern = prop!["obtain-permission", "jim", "amy", "*"];
    assert_eq!(goal_state(&s, cx, &pattern), Some(SubgoalState::Success));

    let proposal = prop!["propose", "jim", "amy", "*"];
    let proposals: Vec<_> = s
        .store()
        .dump(cx)
        .into_iter()
        .filter(|f| proposal.matches(&f.prop))
        .collect();
    assert_eq!(proposals.len(), 1);
    assert!(proposals[0].range.start.is_some_and(|t| t >= at("08:00:30")));
    assert!(!s.store().retrieve(cx, When::Ever, &prop!["accept", "amy", "jim", "*"]).is_empty());
}

#[test]
fn scripted_input_is_applied_up_front_when_daydreaming() {
    let world = World::from_toml_str(ERRAND, "errand").unwrap();
    let config = PlannerConfig {
        handlers: vec!["handle-proposal".to_string()],
        ..PlannerConfig::default()
    };
    let s = run(&world, config, Mode::Daydreaming);
    let cx = s.best();
    let pattern = prop!["obtain-permission", "jim", "amy", "*"];
    assert_eq!(goal_state(&s, cx, &pattern), Some(SubgoalState::Success));
}

#[test]
fn worlds_load_from_files() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("errand.toml");
    fs::write(&path, ERRAND).unwrap();

    let world = World::load(&path).unwrap();
    assert_eq!(world.id, "errand");
    assert_eq!(world.source, WorldSource::File(path.clone()));
    assert_eq!(world.horizon, Some(at("08:10")));
    assert_eq!(world.input.len(), 1);

    let by_path = World::resolve(path.to_str().unwrap()).unwrap();
    assert_eq!(by_path.id, "errand");

    let mut s = Session::new(PlannerConfig::default());
    let report = world.apply(&mut s, Mode::Daydreaming);
    assert_eq!(report.facts, 2);
    assert_eq!(report.actors, 2);
    assert!(s.is_actor(&Symbol::new("amy")));

    assert!(World::load(&dir.path().join("missing.toml")).is_err());
}

#[test]
fn configuration_files_tune_the_run() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("planner.toml");
    fs::write(
        &path,
        "handlers = []\nno_activity_limit = 20\n\n[durations]\ngrid-walk = 10\n",
    )
    .unwrap();
    let slow = PlannerConfig::load(&path).unwrap();
    assert_eq!(slow.no_activity_limit, 20);
    assert_eq!(slow.duration_of("grid-walk"), 10);
    assert_eq!(slow.appointment.wait_limit, 900);

    let walk_time = |config: PlannerConfig| {
        let mut s = Session::new(config);
        s.add_isa("jim", "human");
        s.add_isa("chair1", "chair");
        let cx = s.best();
        s.assert_state(cx, Ts::ZERO, 0, prop!["at-grid", "jim", "hall1", 0, 0]);
        s.assert_state(cx, Ts::ZERO, 0, prop!["standing", "jim", "na"]);
        s.assert_state(cx, Ts::ZERO, 0, prop!["at-grid", "chair1", "hall1", 5, 5]);
        let id = s
            .top_goal(cx, Ts::ZERO, None, prop!["near-reachable", "jim", "chair1"])
            .unwrap();
        s.main_loop(cx, Mode::Daydreaming);
        assert_eq!(s.state_of(cx, id), Some(SubgoalState::Success));
        let view = s.view(cx, Ts::from_secs(1000));
        assert_eq!(locate(&view, &jim()), Some(Loc::new("hall1", 4, 4)));
        s.subgoal(cx, id).unwrap().ts.since(Ts::ZERO)
    };
    let quick = PlannerConfig {
        handlers: Vec::new(),
        ..PlannerConfig::default()
    };
    assert!(walk_time(slow) >= 40);
    assert!(walk_time(quick) < 40);

    // Saved configuration reads back unchanged.
    let copy = dir.path().join("copy.toml");
    PlannerConfig::default().save(&copy).unwrap();
    assert_eq!(PlannerConfig::load(&copy).unwrap(), PlannerConfig::default());

    fs::write(&path, "default_duration = -1\n").unwrap();
    assert!(PlannerConfig::load(&path).is_err());
}
