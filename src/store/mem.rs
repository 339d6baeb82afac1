//! In-memory fact store with a head-symbol index.

use std::collections::HashMap;

use crate::plan::ContextId;
use crate::prop::{Proposition, Term};
use crate::symbol::Symbol;
use crate::time::{Ts, TsRange};

use super::{Fact, FactStore, When};

#[derive(Debug, Clone)]
struct Entry {
    context: ContextId,
    range: TsRange,
    prop: Proposition,
    /// Retractions, each scoped to the context that issued it.
    retractions: Vec<(ContextId, Ts)>,
}

/// Facts kept in a vector and indexed by head symbol.
#[derive(Debug, Clone, Default)]
pub struct MemFactStore {
    entries: Vec<Option<Entry>>,
    by_head: HashMap<Symbol, Vec<usize>>,
    parents: HashMap<ContextId, Option<ContextId>>,
}

impl MemFactStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// `cx` followed by its ancestors up to the root.
    fn lineage(&self, cx: ContextId) -> Vec<ContextId> {
        let mut out = vec![cx];
        let mut cur = cx;
        while let Some(Some(parent)) = self.parents.get(&cur) {
            out.push(*parent);
            cur = *parent;
        }
        out
    }

    fn cut(entry: &Entry, lineage: &[ContextId]) -> Option<Ts> {
        entry
            .retractions
            .iter()
            .filter(|(cx, _)| lineage.contains(cx))
            .map(|(_, ts)| *ts)
            .min()
    }

    fn visible(entry: &Entry, lineage: &[ContextId], when: When) -> bool {
        if !lineage.contains(&entry.context) {
            return false;
        }
        let cut = Self::cut(entry, lineage);
        match when {
            When::At(ts) => entry.range.contains(ts) && cut.is_none_or(|c| ts < c),
            When::During(range) => {
                let live = match (cut, range.start) {
                    (Some(c), Some(s)) => s < c,
                    _ => true,
                };
                live && (range.is_na() || entry.range.overlaps(&range) || entry.range.is_na())
            }
            When::Ever => cut.is_none(),
        }
    }

    /// Indices of candidate entries for `pattern`, newest first.
    fn candidates(&self, pattern: &Proposition) -> Vec<usize> {
        let mut idxs: Vec<usize> = match pattern.term(0) {
            Term::Sym(head) => self.by_head.get(head).cloned().unwrap_or_default(),
            _ => (0..self.entries.len()).collect(),
        };
        idxs.reverse();
        idxs
    }
}

impl FactStore for MemFactStore {
    fn add_context(&mut self, child: ContextId, parent: Option<ContextId>) {
        self.parents.insert(child, parent);
    }

    fn drop_context(&mut self, cx: ContextId) {
        for slot in self.entries.iter_mut() {
            let owned = slot.as_ref().is_some_and(|e| e.context == cx);
            if owned {
                *slot = None;
            } else if let Some(entry) = slot.as_mut() {
                entry.retractions.retain(|(rcx, _)| *rcx != cx);
            }
        }
        for idxs in self.by_head.values_mut() {
            idxs.retain(|&i| self.entries[i].is_some());
        }
        self.parents.remove(&cx);
    }

    fn assert(&mut self, cx: ContextId, range: TsRange, prop: Proposition) {
        let idx = self.entries.len();
        self.by_head.entry(prop.head().clone()).or_default().push(idx);
        self.entries.push(Some(Entry {
            context: cx,
            range,
            prop,
            retractions: Vec::new(),
        }));
    }

    fn retract(&mut self, cx: ContextId, ts: Ts, pattern: &Proposition) -> Vec<Proposition> {
        let lineage = self.lineage(cx);
        let mut out = Vec::new();
        for idx in self.candidates(pattern) {
            let Some(entry) = self.entries[idx].as_mut() else {
                continue;
            };
            if Self::visible(entry, &lineage, When::At(ts)) && pattern.matches(&entry.prop) {
                entry.retractions.push((cx, ts));
                out.push(entry.prop.clone());
            }
        }
        out
    }

    fn retrieve(&self, cx: ContextId, when: When, pattern: &Proposition) -> Vec<Proposition> {
        let lineage = self.lineage(cx);
        self.candidates(pattern)
            .into_iter()
            .filter_map(|idx| self.entries[idx].as_ref())
            .filter(|e| Self::visible(e, &lineage, when) && pattern.matches(&e.prop))
            .map(|e| e.prop.clone())
            .collect()
    }

    fn dump(&self, cx: ContextId) -> Vec<Fact> {
        let lineage = self.lineage(cx);
        self.entries
            .iter()
            .flatten()
            .filter(|e| lineage.contains(&e.context))
            .map(|e| Fact {
                context: e.context,
                range: e.range,
                prop: e.prop.clone(),
                retracted_at: Self::cut(e, &lineage),
            })
            .collect()
    }

    fn len(&self) -> usize {
        self.entries.iter().flatten().count()
    }
}
