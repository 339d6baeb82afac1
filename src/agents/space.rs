//! Where things are.
//!
//! Positions are `[at-grid obj grid row col]` facts. An object without its
//! own position is wherever its holder, container or whole is. Distances
//! are Chebyshev distances on a shared grid; objects on different grids
//! are never near each other.

use crate::prop;
use crate::prop::Term;
use crate::store::View;
use crate::symbol::Symbol;

/// Containment and holding chains deeper than this are treated as broken data.
const MAX_LOCATE_DEPTH: usize = 8;

/// A cell on a grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Loc {
    pub grid: Symbol,
    pub row: i64,
    pub col: i64,
}

impl Loc {
    pub fn new(grid: impl Into<Symbol>, row: i64, col: i64) -> Self {
        Loc {
            grid: grid.into(),
            row,
            col,
        }
    }

    pub fn cell(&self) -> (i64, i64) {
        (self.row, self.col)
    }

    /// Chebyshev distance, or `None` across grids.
    pub fn distance(&self, other: &Loc) -> Option<i64> {
        (self.grid == other.grid)
            .then(|| (self.row - other.row).abs().max((self.col - other.col).abs()))
    }
}

fn own_position(view: &View<'_>, x: &Symbol) -> Option<Loc> {
    let fact = view.first(&prop!["at-grid", x, "*", "*", "*"])?;
    let grid = fact.sym(2)?.clone();
    let row = fact.num(3)? as i64;
    let col = fact.num(4)? as i64;
    Some(Loc { grid, row, col })
}

/// Position of `x`, falling back to whatever holds, contains or includes it.
pub fn locate(view: &View<'_>, x: &Symbol) -> Option<Loc> {
    let mut cur = x.clone();
    for _ in 0..MAX_LOCATE_DEPTH {
        if let Some(loc) = own_position(view, &cur) {
            return Some(loc);
        }
        let holder = view
            .first_sym(1, &prop!["holding", "*", &cur])
            .and_then(|hand| view.retrieve_whole("animal", &hand));
        let next = holder
            .or_else(|| view.first_sym(2, &prop!["inside", &cur, "*"]))
            .or_else(|| view.whole_of(&cur))?;
        cur = next;
    }
    None
}

/// Whether anything is positioned on `x`, which makes `x` a grid.
pub fn is_grid(view: &View<'_>, x: &Symbol) -> bool {
    view.first(&prop!["at-grid", "*", x, "*", "*"]).is_some()
}

/// Whether `a` can reach `b`: same grid within `reach` cells, or `b` is the
/// grid `a` stands on.
pub fn is_near_reachable(view: &View<'_>, reach: i64, a: &Symbol, b: &Symbol) -> bool {
    let Some(la) = locate(view, a) else {
        return false;
    };
    if &la.grid == b {
        return true;
    }
    locate(view, b)
        .and_then(|lb| la.distance(&lb))
        .is_some_and(|d| d <= reach)
}

/// Whether `a` and `b` are on the same grid.
pub fn is_near_audible(view: &View<'_>, a: &Symbol, b: &Symbol) -> bool {
    match (locate(view, a), locate(view, b)) {
        (Some(la), Some(lb)) => la.grid == lb.grid,
        _ => false,
    }
}

/// Cells from `from` toward `to`, stepping diagonally first, until within
/// `within` cells of `to`. The first element is `from` itself.
pub fn grid_path(from: (i64, i64), to: (i64, i64), within: i64) -> Vec<(i64, i64)> {
    let mut path = vec![from];
    let mut cur = from;
    while (to.0 - cur.0).abs().max((to.1 - cur.1).abs()) > within {
        cur = (cur.0 + (to.0 - cur.0).signum(), cur.1 + (to.1 - cur.1).signum());
        path.push(cur);
    }
    path
}

/// A wormhole positioned on both grids.
pub fn find_wormhole(view: &View<'_>, from: &Symbol, to: &Symbol) -> Option<Symbol> {
    view.all_syms(1, &prop!["at-grid", "*", from, "*", "*"])
        .into_iter()
        .filter(|w| view.isa("wormhole", w))
        .find(|w| view.first(&prop!["at-grid", w, to, "*", "*"]).is_some())
}

/// Where `wormhole` comes out on `grid`.
pub fn wormhole_exit(view: &View<'_>, wormhole: &Symbol, grid: &Symbol) -> Option<Loc> {
    let fact = view.first(&prop!["at-grid", wormhole, grid, "*", "*"])?;
    Some(Loc::new(grid, fact.num(3)? as i64, fact.num(4)? as i64))
}

/// `[at-grid obj grid row col]`.
pub fn at_grid(obj: &Symbol, loc: &Loc) -> crate::prop::Proposition {
    prop!["at-grid", obj, &loc.grid, Term::from(loc.row), Term::from(loc.col)]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ontology::Ontology;
    use crate::plan::ContextId;
    use crate::store::{FactStore, MemFactStore};
    use crate::time::{Ts, TsRange};

    fn sym(s: &str) -> Symbol {
        Symbol::new(s)
    }

    fn world() -> (MemFactStore, Ontology) {
        let mut ont = Ontology::base();
        ont.add_isa(&sym("Jim"), &sym("human"));
        ont.add_isa(&sym("hand1"), &sym("right-hand"));
        ont.add_isa(&sym("door1"), &sym("door"));
        let mut store = MemFactStore::new();
        store.add_context(ContextId::ROOT, None);
        let facts = [
            at_grid(&sym("Jim"), &Loc::new("kitchen", 2, 2)),
            at_grid(&sym("box1"), &Loc::new("kitchen", 2, 5)),
            at_grid(&sym("door1"), &Loc::new("kitchen", 0, 0)),
            at_grid(&sym("door1"), &Loc::new("hall", 4, 4)),
            prop!["cpart-of", "hand1", "Jim"],
            prop!["holding", "hand1", "cup1"],
            prop!["inside", "spoon1", "cup1"],
        ];
        for f in facts {
            store.assert(ContextId::ROOT, TsRange::state(Ts::ZERO, 0), f);
        }
        (store, ont)
    }

    #[test]
    fn locate_follows_holding_and_containment() {
        let (store, ont) = world();
        let v = View::new(&store, &ont, ContextId::ROOT, Ts::from_secs(1));
        assert_eq!(locate(&v, &sym("spoon1")), Some(Loc::new("kitchen", 2, 2)));
        assert_eq!(locate(&v, &sym("nowhere")), None);
        assert!(is_grid(&v, &sym("kitchen")));
        assert!(!is_grid(&v, &sym("box1")));
    }

    #[test]
    fn reachability_uses_chebyshev_distance() {
        let (store, ont) = world();
        let v = View::new(&store, &ont, ContextId::ROOT, Ts::from_secs(1));
        assert!(!is_near_reachable(&v, 1, &sym("Jim"), &sym("box1")));
        assert!(is_near_reachable(&v, 3, &sym("Jim"), &sym("box1")));
        assert!(is_near_reachable(&v, 1, &sym("Jim"), &sym("kitchen")));
        assert!(is_near_audible(&v, &sym("Jim"), &sym("box1")));
    }

    #[test]
    fn paths_stop_within_reach() {
        assert_eq!(grid_path((2, 2), (2, 5), 1), vec![(2, 2), (2, 3), (2, 4)]);
        assert_eq!(grid_path((0, 0), (2, 3), 0), vec![(0, 0), (1, 1), (2, 2), (2, 3)]);
        assert_eq!(grid_path((1, 1), (1, 2), 1), vec![(1, 1)]);
    }

    #[test]
    fn wormholes_connect_grids() {
        let (store, ont) = world();
        let v = View::new(&store, &ont, ContextId::ROOT, Ts::from_secs(1));
        assert_eq!(find_wormhole(&v, &sym("kitchen"), &sym("hall")), Some(sym("door1")));
        assert_eq!(find_wormhole(&v, &sym("kitchen"), &sym("attic")), None);
        assert_eq!(
            wormhole_exit(&v, &sym("door1"), &sym("hall")),
            Some(Loc::new("hall", 4, 4))
        );
    }
}
