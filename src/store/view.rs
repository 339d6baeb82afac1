//! "Here and now" queries over a fact store.

use crate::ontology::Ontology;
use crate::plan::ContextId;
use crate::prop::{Proposition, Term};
use crate::symbol::Symbol;
use crate::time::Ts;

use super::{FactStore, When};

/// Part-of chains deeper than this are treated as broken data.
const MAX_PART_DEPTH: usize = 8;

/// A read-only window onto the facts visible from one context at one time.
#[derive(Clone, Copy)]
pub struct View<'a> {
    pub store: &'a dyn FactStore,
    pub ontology: &'a Ontology,
    pub cx: ContextId,
    pub ts: Ts,
}

impl<'a> View<'a> {
    pub fn new(store: &'a dyn FactStore, ontology: &'a Ontology, cx: ContextId, ts: Ts) -> Self {
        View {
            store,
            ontology,
            cx,
            ts,
        }
    }

    /// The same view at another time.
    pub fn at(self, ts: Ts) -> Self {
        View { ts, ..self }
    }

    pub fn is_true(&self, prop: &Proposition) -> bool {
        self.store.is_true(self.cx, self.ts, prop)
    }

    pub fn first(&self, pattern: &Proposition) -> Option<Proposition> {
        self.store.retrieve_first(self.cx, When::At(self.ts), pattern)
    }

    pub fn all(&self, pattern: &Proposition) -> Vec<Proposition> {
        self.store.retrieve(self.cx, When::At(self.ts), pattern)
    }

    /// Symbol at position `i` of the first fact matching `pattern`.
    pub fn first_sym(&self, i: usize, pattern: &Proposition) -> Option<Symbol> {
        self.first(pattern).and_then(|p| p.sym(i).cloned())
    }

    /// Symbols at position `i` of every fact matching `pattern`.
    pub fn all_syms(&self, i: usize, pattern: &Proposition) -> Vec<Symbol> {
        self.all(pattern)
            .into_iter()
            .filter_map(|p| p.sym(i).cloned())
            .collect()
    }

    pub fn isa(&self, class: &str, x: &Symbol) -> bool {
        self.ontology.isa(class, x)
    }

    /// Direct parts of `whole`.
    pub fn parts(&self, whole: &Symbol) -> Vec<Symbol> {
        self.all_syms(1, &crate::prop!["cpart-of", Term::Wild, whole])
    }

    /// Every part of `whole` that is a `class`, searching breadth first.
    pub fn retrieve_parts(&self, class: &str, whole: &Symbol) -> Vec<Symbol> {
        let mut out = Vec::new();
        let mut frontier = vec![whole.clone()];
        for _ in 0..MAX_PART_DEPTH {
            let mut next = Vec::new();
            for w in &frontier {
                for part in self.parts(w) {
                    if self.isa(class, &part) && !out.contains(&part) {
                        out.push(part.clone());
                    }
                    next.push(part);
                }
            }
            if next.is_empty() {
                break;
            }
            frontier = next;
        }
        out
    }

    /// First part of `whole` that is a `class`.
    pub fn retrieve_part(&self, class: &str, whole: &Symbol) -> Option<Symbol> {
        self.retrieve_parts(class, whole).into_iter().next()
    }

    /// The object `part` is directly a part of.
    pub fn whole_of(&self, part: &Symbol) -> Option<Symbol> {
        self.first_sym(2, &crate::prop!["cpart-of", part, Term::Wild])
    }

    /// Whether `part` is a part of `whole`, directly or transitively.
    pub fn is_part_of(&self, part: &Symbol, whole: &Symbol) -> bool {
        let mut cur = part.clone();
        for _ in 0..MAX_PART_DEPTH {
            match self.whole_of(&cur) {
                Some(w) if &w == whole => return true,
                Some(w) => cur = w,
                None => return false,
            }
        }
        false
    }

    /// Nearest enclosing whole of `part` that is a `class`.
    pub fn retrieve_whole(&self, class: &str, part: &Symbol) -> Option<Symbol> {
        let mut cur = part.clone();
        for _ in 0..MAX_PART_DEPTH {
            let whole = self.whole_of(&cur)?;
            if self.isa(class, &whole) {
                return Some(whole);
            }
            cur = whole;
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prop;
    use crate::store::MemFactStore;
    use crate::time::TsRange;

    fn world() -> (MemFactStore, Ontology) {
        let mut ont = Ontology::base();
        let sym = Symbol::new;
        ont.add_isa(&sym("Jim"), &sym("human"));
        ont.add_isa(&sym("hand1"), &sym("right-hand"));
        ont.add_isa(&sym("finger1"), &sym("body-part"));
        let mut store = MemFactStore::new();
        store.add_context(ContextId::ROOT, None);
        for (part, whole) in [("hand1", "Jim"), ("finger1", "hand1")] {
            store.assert(
                ContextId::ROOT,
                TsRange::state(Ts::ZERO, 0),
                prop!["cpart-of", part, whole],
            );
        }
        (store, ont)
    }

    #[test]
    fn part_traversal() {
        let (store, ont) = world();
        let v = View::new(&store, &ont, ContextId::ROOT, Ts::from_secs(1));
        let jim = Symbol::new("Jim");
        let finger = Symbol::new("finger1");
        assert_eq!(v.retrieve_part("hand", &jim), Some(Symbol::new("hand1")));
        assert!(v.is_part_of(&finger, &jim));
        assert!(!v.is_part_of(&jim, &finger));
        assert_eq!(v.retrieve_whole("human", &finger), Some(jim.clone()));
        assert_eq!(v.retrieve_parts("body-part", &jim).len(), 2);
    }
}
