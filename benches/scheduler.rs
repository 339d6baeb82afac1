//! Benchmarks for the scheduler and context branching.

use criterion::{Criterion, black_box, criterion_group, criterion_main};

use tt_planner::config::PlannerConfig;
use tt_planner::plan::{Mode, Session};
use tt_planner::prop;
use tt_planner::time::Ts;

fn walking_session() -> Session {
    let mut config = PlannerConfig::default();
    config.handlers = Vec::new();
    let mut s = Session::new(config);
    s.add_isa("jim", "human");
    s.add_isa("chair1", "chair");
    let cx = s.best();
    s.assert_state(cx, Ts::ZERO, 0, prop!["at-grid", "jim", "hall1", 0, 0]);
    s.assert_state(cx, Ts::ZERO, 0, prop!["standing", "jim", "na"]);
    s.assert_state(cx, Ts::ZERO, 0, prop!["at-grid", "chair1", "hall1", 40, 40]);
    s.top_goal(cx, Ts::ZERO, None, prop!["near-reachable", "jim", "chair1"]);
    s
}

fn bench_walk(c: &mut Criterion) {
    c.bench_function("daydream_walk_40_cells", |bench| {
        bench.iter_batched(
            walking_session,
            |mut s| {
                let cx = s.best();
                black_box(s.main_loop(cx, Mode::Daydreaming))
            },
            criterion::BatchSize::SmallInput,
        )
    });
}

fn bench_sprout(c: &mut Criterion) {
    let s = walking_session();
    c.bench_function("sprout_with_goal_tree", |bench| {
        bench.iter_batched(
            || {
                let mut s = Session::new(s.config().clone());
                s.add_isa("jim", "human");
                let cx = s.best();
                s.top_goal(cx, Ts::ZERO, None, prop!["sleep", "jim"]);
                s
            },
            |mut s| {
                let cx = s.best();
                black_box(s.sprout(cx, None).ok())
            },
            criterion::BatchSize::SmallInput,
        )
    });
}

criterion_group!(benches, bench_walk, bench_sprout);
criterion_main!(benches);
