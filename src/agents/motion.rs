//! Moving objects and keeping `holding`, `inside` and `at-grid` consistent.
//!
//! - a grasper carries what it holds, and whatever is inside that
//! - a held object that moves is no longer inside anything
//! - an actor that walks leaves any large container it was in
//! - a large container carries its occupants
//!
//! Worn clothing is not carried along with an actor's own moves, so
//! anything in a pocket stays behind.
// TODO: cascade actor moves into the part hierarchy of worn clothing.

use tracing::trace;

use crate::plan::{ContextId, Session};
use crate::prop;
use crate::symbol::Symbol;
use crate::time::Ts;

use super::space::{Loc, at_grid};

/// Put `obj` at `at`. Nothing happens without a destination.
pub fn move_object(s: &mut Session, cx: ContextId, ts: Ts, obj: &Symbol, at: Option<&Loc>) {
    let Some(at) = at else {
        return;
    };
    trace!(object = %obj, grid = %at.grid, row = at.row, col = at.col, "move object");
    s.retract(cx, ts, &prop!["at-grid", obj, "*", "*", "*"]);
    s.assert_state(cx, ts, 0, at_grid(obj, at));
}

/// Move an object that is being held, with its contents.
pub fn held_object_move(s: &mut Session, cx: ContextId, ts: Ts, held: &Symbol, at: Option<&Loc>) {
    s.retract(cx, ts, &prop!["inside", held, "*"]);
    if at.is_some() {
        let contents = s.view(cx, ts).all_syms(1, &prop!["inside", "*", held]);
        for obj in &contents {
            move_object(s, cx, ts, obj, at);
        }
    }
    move_object(s, cx, ts, held, at);
}

/// Move a grasper: it is no longer next to what it was near, and what it
/// holds comes along.
pub fn grasper_move(s: &mut Session, cx: ContextId, ts: Ts, grasper: &Symbol, at: Option<&Loc>) {
    s.retract(cx, ts, &prop!["near-graspable", grasper, "*"]);
    let held = s.view(cx, ts).all_syms(2, &prop!["holding", grasper, "*"]);
    for obj in &held {
        held_object_move(s, cx, ts, obj, at);
    }
}

/// Graspers of `actor`, right hands first.
pub fn graspers(s: &Session, cx: ContextId, ts: Ts, actor: &Symbol) -> Vec<Symbol> {
    let view = s.view(cx, ts);
    let mut out = view.retrieve_parts("right-hand", actor);
    out.extend(view.retrieve_parts("left-hand", actor));
    out
}

/// Move an actor to `at`. A walking actor leaves any container it was in.
pub fn actor_move(s: &mut Session, cx: ContextId, ts: Ts, actor: &Symbol, at: &Loc, walk: bool) {
    if walk {
        s.retract(cx, ts, &prop!["inside", actor, "*"]);
    }
    if s.ontology().isa("animal", actor) {
        for grasper in graspers(s, cx, ts, actor) {
            grasper_move(s, cx, ts, &grasper, Some(at));
        }
    }
    move_object(s, cx, ts, actor, Some(at));
}

/// Move a large container together with everyone inside it.
pub fn large_container_move(s: &mut Session, cx: ContextId, ts: Ts, container: &Symbol, at: &Loc) {
    let occupants = s.view(cx, ts).all_syms(1, &prop!["inside", "*", container]);
    for occupant in &occupants {
        actor_move(s, cx, ts, occupant, at, false);
    }
    move_object(s, cx, ts, container, Some(at));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::space::locate;
    use crate::config::PlannerConfig;

    fn session() -> (Session, ContextId) {
        let config = PlannerConfig {
            handlers: Vec::new(),
            ..PlannerConfig::default()
        };
        let mut s = Session::new(config);
        s.add_isa("Jim", "human");
        s.add_isa("hand1", "right-hand");
        s.add_isa("car1", "car");
        let cx = s.best();
        for f in [
            prop!["cpart-of", "hand1", "Jim"],
            prop!["holding", "hand1", "bag1"],
            prop!["inside", "wallet1", "bag1"],
            prop!["inside", "bag1", "drawer1"],
            prop!["inside", "Jim", "car1"],
            at_grid(&Symbol::new("Jim"), &Loc::new("street", 0, 0)),
            at_grid(&Symbol::new("car1"), &Loc::new("street", 0, 0)),
        ] {
            s.assert_state(cx, Ts::ZERO, 0, f);
        }
        (s, cx)
    }

    #[test]
    fn walking_carries_held_objects_and_leaves_containers() {
        let (mut s, cx) = session();
        let ts = Ts::from_secs(10);
        let jim = Symbol::new("Jim");
        actor_move(&mut s, cx, ts, &jim, &Loc::new("street", 3, 4), true);

        let v = s.view(cx, ts.plus(1));
        assert!(!v.is_true(&prop!["inside", "Jim", "car1"]));
        assert!(!v.is_true(&prop!["inside", "bag1", "drawer1"]));
        assert!(v.is_true(&prop!["inside", "wallet1", "bag1"]));
        assert!(v.is_true(&prop!["holding", "hand1", "bag1"]));
        assert_eq!(locate(&v, &Symbol::new("wallet1")), Some(Loc::new("street", 3, 4)));
        assert_eq!(v.all(&prop!["at-grid", "Jim", "*", "*", "*"]).len(), 1);
    }

    #[test]
    fn driving_carries_occupants() {
        let (mut s, cx) = session();
        let ts = Ts::from_secs(10);
        large_container_move(&mut s, cx, ts, &Symbol::new("car1"), &Loc::new("street", 9, 9));
        let v = s.view(cx, ts.plus(1));
        assert!(v.is_true(&prop!["inside", "Jim", "car1"]));
        assert!(v.is_true(&at_grid(&Symbol::new("Jim"), &Loc::new("street", 9, 9))));
        assert!(v.is_true(&at_grid(&Symbol::new("bag1"), &Loc::new("street", 9, 9))));
    }

    #[test]
    fn moving_a_grasper_without_destination_only_drops_nearness() {
        let (mut s, cx) = session();
        s.assert_state(cx, Ts::ZERO, 0, prop!["near-graspable", "hand1", "cup1"]);
        let ts = Ts::from_secs(5);
        grasper_move(&mut s, cx, ts, &Symbol::new("hand1"), None);
        let v = s.view(cx, ts);
        assert!(!v.is_true(&prop!["near-graspable", "hand1", "cup1"]));
        assert!(!v.is_true(&prop!["inside", "bag1", "drawer1"]));
        assert!(v.first(&prop!["at-grid", "bag1", "*", "*", "*"]).is_none());
    }
}
