//! Getting about: walking grids, passing through wormholes, driving, and
//! changing posture.
//!
//! `[near-reachable a o]` walks `a` along a grid path until `o` is within
//! reach. When `o` is on another grid (or is another grid) the path leads
//! to a wormhole joining the two, the actor warps through, and planning
//! starts over from the far side.

use tracing::{debug, trace};

use crate::plan::{Locals, Planner, SubgoalState};
use crate::prop;
use crate::prop::{Proposition, Term};
use crate::symbol::Symbol;

use super::args;
use super::motion::{actor_move, large_container_move};
use super::space::{Loc, find_wormhole, grid_path, is_grid, is_near_audible, is_near_reachable, locate, wormhole_exit};

/// Sense penalty for a context in which someone cannot get somewhere.
const UNREACHABLE_SENSE: f64 = 0.8;

/// A planned route: cells on `grid`, then optionally a wormhole.
struct Route {
    grid: Symbol,
    path: Vec<(i64, i64)>,
    via: Option<Symbol>,
}

fn set_route(p: &mut Planner<'_>, route: Route) {
    if let Some(locals) = p.locals() {
        *locals = Locals::Trip {
            grid: Some(route.grid),
            path: route.path,
            next: 1,
            via: route.via,
        };
    }
}

/// The next leg of the stored route, advancing past it.
fn next_leg(p: &mut Planner<'_>) -> Option<(Symbol, (i64, i64), (i64, i64))> {
    let Some(Locals::Trip {
        grid: Some(grid),
        path,
        next,
        ..
    }) = p.locals()
    else {
        return None;
    };
    if *next == 0 || *next >= path.len() {
        return None;
    }
    let leg = (grid.clone(), path[*next - 1], path[*next]);
    *next += 1;
    Some(leg)
}

fn route_via(p: &mut Planner<'_>) -> Option<Symbol> {
    match p.locals() {
        Some(Locals::Trip { via, .. }) => via.clone(),
        _ => None,
    }
}

/// The grid `target` is on, or `target` itself when it is a grid.
fn target_grid(p: &Planner<'_>, target: &Symbol) -> Option<Symbol> {
    let view = p.view();
    if is_grid(&view, target) {
        return Some(target.clone());
    }
    locate(&view, target).map(|l| l.grid)
}

fn walk_prop(head: &str, who: &[&Symbol], grid: &Symbol, from: (i64, i64), to: (i64, i64)) -> Proposition {
    let mut args: Vec<Term> = who.iter().map(|s| Term::from(*s)).collect();
    args.push(Term::from(grid));
    args.extend([from.0, from.1, to.0, to.1].map(Term::from));
    Proposition::new(head, args)
}

fn plan_route(p: &Planner<'_>, a: &Symbol, target: &Symbol) -> Option<Route> {
    let reach = p.config().reach;
    let view = p.view();
    let from = locate(&view, a)?;
    let target_is_grid = is_grid(&view, target);
    let dest = if target_is_grid {
        None
    } else {
        Some(locate(&view, target)?)
    };
    match dest {
        Some(dest) if dest.grid == from.grid => Some(Route {
            path: grid_path(from.cell(), dest.cell(), reach),
            grid: from.grid,
            via: None,
        }),
        _ => {
            let to_grid = dest.map(|d| d.grid).unwrap_or_else(|| target.clone());
            let wormhole = find_wormhole(&view, &from.grid, &to_grid)?;
            let door = wormhole_exit(&view, &wormhole, &from.grid)?;
            Some(Route {
                path: grid_path(from.cell(), door.cell(), 0),
                grid: from.grid,
                via: Some(wormhole),
            })
        }
    }
}

pub fn near_reachable(p: &mut Planner<'_>) {
    let Some([a, target]) = args(p, [1, 2]) else {
        return;
    };
    match p.state() {
        SubgoalState::Begin => {
            let reach = p.config().reach;
            if is_near_reachable(&p.view(), reach, &a, &target) {
                return p.step(990);
            }
            match plan_route(p, &a, &target) {
                Some(route) => {
                    debug!(actor = %a, target = %target, cells = route.path.len(), via = ?route.via, "route planned");
                    set_route(p, route);
                    p.step(100);
                }
                None => {
                    debug!(actor = %a, target = %target, "no route");
                    p.scale_sense(UNREACHABLE_SENSE);
                    p.failure();
                }
            }
        }
        SubgoalState::Step(100) => match next_leg(p) {
            Some((grid, from, to)) => {
                p.sub_step(100, walk_prop("grid-walk", &[&a], &grid, from, to));
            }
            None if route_via(p).is_some() => p.step(200),
            None => p.step(990),
        },
        SubgoalState::Step(200) => {
            let (Some(wormhole), Some(to_grid)) = (route_via(p), target_grid(p, &target)) else {
                return p.failure();
            };
            let here = locate(&p.view(), &a);
            let Some(from_grid) = here.map(|l| l.grid) else {
                return p.failure();
            };
            p.sub(
                SubgoalState::Begin,
                SubgoalState::Failure,
                prop!["warp", &a, &from_grid, &to_grid, &wormhole],
            );
        }
        SubgoalState::Step(990) => {
            if p.view().isa("large-container", &target) && p.view().isa("animate-object", &a) {
                p.assert_state(0, prop!["inside", &a, &target]);
            }
            p.success();
        }
        _ => p.undefined("near-reachable"),
    }
}

/// `[grid-walk a grid from-row from-col to-row to-col]`
pub fn grid_walk(p: &mut Planner<'_>) {
    let Some([a, grid]) = args(p, [1, 2]) else {
        return;
    };
    match p.state() {
        SubgoalState::Begin => {
            if p.view().is_true(&prop!["standing", &a, "*"]) {
                return p.step(1);
            }
            p.sub_step(1, prop!["standing", &a, Term::Na]);
        }
        SubgoalState::Step(1) => {
            let (Some(row), Some(col)) = (p.obj().num(5), p.obj().num(6)) else {
                return p.failure();
            };
            let d = p.own_duration();
            p.assert_action(d, p.obj().clone());
            p.advance(d);
            let (cx, ts) = (p.cx(), p.ts());
            actor_move(p.s, cx, ts, &a, &Loc::new(grid, row as i64, col as i64), true);
            p.success();
        }
        _ => p.undefined("grid-walk"),
    }
}

/// `[warp a from-grid to-grid wormhole]`
pub fn warp(p: &mut Planner<'_>) {
    let Some([a, _from, to, wormhole]) = args(p, [1, 2, 3, 4]) else {
        return;
    };
    match p.state() {
        SubgoalState::Begin => {
            let exit = wormhole_exit(&p.view(), &wormhole, &to);
            let Some(exit) = exit else {
                debug!(wormhole = %wormhole, grid = %to, "wormhole does not lead there");
                return p.failure();
            };
            let d = p.own_duration();
            p.assert_action(d, p.obj().clone());
            p.advance(d);
            let (cx, ts) = (p.cx(), p.ts());
            actor_move(p.s, cx, ts, &a, &exit, true);
            p.success();
        }
        _ => p.undefined("warp"),
    }
}

/// `[grid-drive-car driver car grid from-row from-col to-row to-col]`
pub fn grid_drive_car(p: &mut Planner<'_>) {
    let Some([_driver, car, grid]) = args(p, [1, 2, 3]) else {
        return;
    };
    match p.state() {
        SubgoalState::Begin => {
            let (Some(row), Some(col)) = (p.obj().num(6), p.obj().num(7)) else {
                return p.failure();
            };
            let d = p.own_duration();
            p.assert_action(d, p.obj().clone());
            p.advance(d);
            let (cx, ts) = (p.cx(), p.ts());
            large_container_move(p.s, cx, ts, &car, &Loc::new(grid, row as i64, col as i64));
            p.success();
        }
        _ => p.undefined("grid-drive-car"),
    }
}

/// `[drive driver car grid row col]`: get in, start up, drive cell by cell,
/// switch off.
pub fn drive(p: &mut Planner<'_>) {
    let Some([driver, car, grid]) = args(p, [1, 2, 3]) else {
        return;
    };
    match p.state() {
        SubgoalState::Begin => {
            p.sub_step(2, prop!["inside", &driver, &car]);
        }
        SubgoalState::Step(2) => {
            p.sub_step(3, prop!["motor-vehicle-on", &car]);
        }
        SubgoalState::Step(3) => {
            let (Some(row), Some(col)) = (p.obj().num(4), p.obj().num(5)) else {
                return p.failure();
            };
            let at = locate(&p.view(), &car);
            let Some(at) = at else {
                debug!(car = %car, "car has no position");
                return p.failure();
            };
            if at.grid != grid {
                debug!(car = %car, on = %at.grid, wanted = %grid, "car is on another grid");
                return p.failure();
            }
            let path = grid_path(at.cell(), (row as i64, col as i64), 0);
            set_route(p, Route { grid, path, via: None });
            p.step(100);
        }
        SubgoalState::Step(100) => match next_leg(p) {
            Some((grid, from, to)) => {
                trace!(car = %car, ?from, ?to, "drive leg");
                p.sub_step(100, walk_prop("grid-drive-car", &[&driver, &car], &grid, from, to));
            }
            None => p.step(5),
        },
        SubgoalState::Step(5) => {
            p.sub_step(999, prop!["motor-vehicle-off", &car]);
        }
        SubgoalState::Step(999) => {
            let (start, now) = (p.start_ts(), p.ts());
            p.assert_range(start, now, p.obj().clone());
            p.success();
        }
        _ => p.undefined("drive"),
    }
}

/// `[sitting a o]`, `[standing a o]`, `[lying a o]`
pub fn posture(p: &mut Planner<'_>) {
    let Some([a]) = args(p, [1]) else {
        return;
    };
    let action = match p.obj().head().as_str() {
        "sitting" => "sit-on",
        "lying" => "lie-on",
        _ => "stand-on",
    };
    match p.state() {
        SubgoalState::Begin => {
            let on = p.obj().term(2).clone();
            p.sub(SubgoalState::Success, SubgoalState::Failure, prop![action, &a, on]);
        }
        _ => p.undefined("posture"),
    }
}

fn change_posture(p: &mut Planner<'_>, a: &Symbol, posture: &str) {
    let on = p.obj().term(2).clone();
    let d = p.own_duration();
    p.assert_action(d, p.obj().clone());
    p.advance(d);
    for old in ["sitting", "standing", "lying"] {
        p.retract(&prop![old, a, "*"]);
    }
    p.assert_state(0, prop![posture, a, on]);
    p.success();
}

/// `[sit-on a o]` and `[lie-on a o]`: go to `o`, then settle on it.
pub fn sit_or_lie_on(p: &mut Planner<'_>) {
    let Some([a]) = args(p, [1]) else {
        return;
    };
    let posture = if p.obj().is("lie-on") { "lying" } else { "sitting" };
    match p.state() {
        SubgoalState::Begin => match p.arg(2) {
            Some(on) => {
                p.sub_step(1, prop!["near-reachable", &a, &on]);
            }
            None => p.step(1),
        },
        SubgoalState::Step(1) => change_posture(p, &a, posture),
        _ => p.undefined(posture),
    }
}

pub fn stand_on(p: &mut Planner<'_>) {
    let Some([a]) = args(p, [1]) else {
        return;
    };
    match p.state() {
        SubgoalState::Begin => change_posture(p, &a, "standing"),
        _ => p.undefined("stand-on"),
    }
}

/// `[near-audible a o]`: on the same grid as `o`, walking there if needed.
pub fn near_audible(p: &mut Planner<'_>) {
    let Some([a, o]) = args(p, [1, 2]) else {
        return;
    };
    match p.state() {
        SubgoalState::Begin => {
            if is_near_audible(&p.view(), &a, &o) {
                return p.success();
            }
            p.sub(SubgoalState::Success, SubgoalState::Failure, prop!["near-reachable", &a, &o]);
        }
        _ => p.undefined("near-audible"),
    }
}
