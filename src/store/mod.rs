//! Timestamped fact storage.
//!
//! The planner treats the fact store as ground truth. Facts are propositions
//! with a validity [`TsRange`], asserted into a context. A fact is visible
//! from its own context and from every context sprouted below it.
//! Retraction ends validity at a timestamp, scoped the same way: a
//! hypothetical context can retract a root fact without changing what the
//! root or its sibling contexts see.
//!
//! - [`FactStore`] is the contract the planner consumes
//! - [`MemFactStore`] is the in-memory implementation
//! - [`View`] bundles a store, the ontology, a context and a timestamp for
//!   the common "what is true here and now" queries, including part-of
//!   traversal

pub mod mem;
pub mod view;

pub use mem::MemFactStore;
pub use view::View;

use serde::Serialize;

use crate::plan::ContextId;
use crate::prop::Proposition;
use crate::time::{Ts, TsRange};

/// When a retrieval looks for matching facts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum When {
    /// True at this instant.
    At(Ts),
    /// True at some instant of this range.
    During(TsRange),
    /// Ever asserted and never retracted.
    Ever,
}

/// A stored fact as reported by [`FactStore::dump`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Fact {
    pub context: ContextId,
    pub range: TsRange,
    pub prop: Proposition,
    /// Earliest retraction visible from the context that asked.
    pub retracted_at: Option<Ts>,
}

/// Assert / retract / retrieve contract over timestamped propositions.
pub trait FactStore {
    /// Register `child` as a context that inherits `parent`'s facts.
    fn add_context(&mut self, child: ContextId, parent: Option<ContextId>);

    /// Forget every fact and retraction that belongs to `cx`.
    fn drop_context(&mut self, cx: ContextId);

    /// Add a fact valid over `range`.
    fn assert(&mut self, cx: ContextId, range: TsRange, prop: Proposition);

    /// End, at `ts`, the validity of every fact visible from `cx` at `ts`
    /// that matches `pattern`. Returns the retracted propositions.
    fn retract(&mut self, cx: ContextId, ts: Ts, pattern: &Proposition) -> Vec<Proposition>;

    /// Every visible fact matching `pattern`, most recently asserted first.
    fn retrieve(&self, cx: ContextId, when: When, pattern: &Proposition) -> Vec<Proposition>;

    fn retrieve_first(&self, cx: ContextId, when: When, pattern: &Proposition) -> Option<Proposition> {
        self.retrieve(cx, when, pattern).into_iter().next()
    }

    fn is_true(&self, cx: ContextId, ts: Ts, prop: &Proposition) -> bool {
        self.retrieve_first(cx, When::At(ts), prop).is_some()
    }

    /// Every fact visible from `cx`, oldest first, for reports.
    fn dump(&self, cx: ContextId) -> Vec<Fact>;

    /// Total number of stored facts across all contexts.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
