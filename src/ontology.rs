//! Class membership for dispatch and reasoning.
//!
//! The ontology is a directed acyclic graph of `isa` links from an instance
//! or subclass to its parents, stored in a `petgraph` [`DiGraph`]. `is_a` is
//! reflexive and transitive, so an instance of `car` is also a
//! `motor-vehicle` and a `large-container`.

use std::collections::HashMap;

use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::Dfs;

use crate::symbol::Symbol;

/// Class links the bundled planning agents rely on.
const BASE_LINKS: &[(&str, &str)] = &[
    // agents and their parts
    ("animal", "animate-object"),
    ("animate-object", "physical-object"),
    ("human", "animal"),
    ("right-hand", "hand"),
    ("left-hand", "hand"),
    ("hand", "body-part"),
    ("body-part", "physical-object"),
    // containers and places
    ("container", "physical-object"),
    ("box", "container"),
    ("large-container", "container"),
    ("room", "large-container"),
    ("motor-vehicle", "large-container"),
    ("car", "motor-vehicle"),
    ("door", "wormhole"),
    ("wormhole", "physical-object"),
    ("furniture", "physical-object"),
    ("bed", "furniture"),
    ("chair", "furniture"),
    ("clothing", "physical-object"),
    ("shirt", "clothing"),
    ("pants", "clothing"),
    ("key", "physical-object"),
    ("lock", "physical-object"),
    // devices
    ("switch", "physical-object"),
    ("ignition-switch", "switch"),
    ("power-switch", "switch"),
    ("knob", "physical-object"),
    ("device", "physical-object"),
    ("tv-set", "device"),
    // states
    ("switch-on", "on-or-off-state"),
    ("switch-off", "on-or-off-state"),
    ("motor-vehicle-on", "on-or-off-state"),
    ("motor-vehicle-off", "on-or-off-state"),
    ("tv-set-on", "on-or-off-state"),
    ("tv-set-off", "on-or-off-state"),
    ("knob-low", "knob-position"),
    ("knob-medium", "knob-position"),
    ("knob-high", "knob-position"),
    ("sitting", "body-position"),
    ("standing", "body-position"),
    ("lying", "body-position"),
    ("asleep", "sleep-state"),
    ("awake", "sleep-state"),
    // communication
    ("propose", "mtrans"),
    ("accept", "mtrans"),
    ("reject", "mtrans"),
    ("request", "mtrans"),
    ("inform", "mtrans"),
    ("wake", "action"),
    // goals and scripts
    ("appointment", "script"),
    ("drive", "script"),
    ("strip", "script"),
    ("obtain-permission", "script"),
    ("hand-to", "script"),
    ("receive-from", "script"),
    ("sleep", "top-level-goal"),
    ("handle-proposal", "top-level-goal"),
    // emotions
    ("positive-emotion", "emotion"),
    ("negative-emotion", "emotion"),
    ("gratitude", "positive-emotion"),
    ("anger", "negative-emotion"),
];

/// The `isa` hierarchy.
#[derive(Debug, Clone, Default)]
pub struct Ontology {
    graph: DiGraph<Symbol, ()>,
    nodes: HashMap<Symbol, NodeIndex>,
}

impl Ontology {
    /// An empty hierarchy.
    pub fn new() -> Self {
        Self::default()
    }

    /// The hierarchy the bundled planning agents expect.
    pub fn base() -> Self {
        let mut ont = Self::new();
        for (child, parent) in BASE_LINKS {
            ont.add_isa(&Symbol::new(child), &Symbol::new(parent));
        }
        ont
    }

    fn ensure_node(&mut self, sym: &Symbol) -> NodeIndex {
        if let Some(idx) = self.nodes.get(sym) {
            return *idx;
        }
        let idx = self.graph.add_node(sym.clone());
        self.nodes.insert(sym.clone(), idx);
        idx
    }

    /// Record that `child` is an instance or subclass of `parent`.
    ///
    /// Links that would close a cycle are ignored.
    pub fn add_isa(&mut self, child: &Symbol, parent: &Symbol) {
        if child == parent || self.is_a(child, parent) {
            return;
        }
        if self.is_a(parent, child) {
            tracing::warn!(child = %child, parent = %parent, "isa link would close a cycle, ignored");
            return;
        }
        let c = self.ensure_node(child);
        let p = self.ensure_node(parent);
        self.graph.add_edge(c, p, ());
    }

    /// Whether `x` is `class` or reaches it through `isa` links.
    pub fn is_a(&self, class: &Symbol, x: &Symbol) -> bool {
        if class == x {
            return true;
        }
        let (Some(&start), Some(&target)) = (self.nodes.get(x), self.nodes.get(class)) else {
            return false;
        };
        let mut dfs = Dfs::new(&self.graph, start);
        while let Some(node) = dfs.next(&self.graph) {
            if node == target {
                return true;
            }
        }
        false
    }

    /// Shorthand for [`is_a`](Self::is_a) with a string class name.
    pub fn isa(&self, class: &str, x: &Symbol) -> bool {
        self.is_a(&Symbol::new(class), x)
    }

    /// Direct parents of `x`.
    pub fn parents(&self, x: &Symbol) -> Vec<Symbol> {
        self.nodes
            .get(x)
            .map(|&idx| {
                self.graph
                    .neighbors_directed(idx, Direction::Outgoing)
                    .map(|n| self.graph[n].clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.edge_count() == 0
    }
}
