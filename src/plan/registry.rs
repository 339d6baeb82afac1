//! Dispatch from an objective to the planning agent that pursues it.
//!
//! Entries are grouped in tiers that are tried in a fixed order. Exact tiers
//! compare the objective's head symbol, class tiers ask the ontology whether
//! the head is a kind of the entry's class. Within a tier, registration
//! order decides, and the first match wins. Class tiers overlap on purpose
//! (an `appointment` is also a `script`), so the order is part of the
//! behavior.

use tracing::trace;

use crate::ontology::Ontology;
use crate::symbol::Symbol;

use super::planner::Planner;
use super::subgoal::Locals;

/// A planning agent body.
pub type PlanFn = fn(&mut Planner<'_>);

/// Priority group of a registry entry, in dispatch order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Tier {
    /// Primitive actions, matched by exact head.
    Action,
    /// States, matched by exact head.
    State,
    /// Families of states, matched by class.
    StateClass,
    /// Top-level goals, matched by class.
    TopLevel,
    /// Scripts and handlers, matched by class.
    Script,
}

impl Tier {
    pub const ALL: [Tier; 5] = [
        Tier::Action,
        Tier::State,
        Tier::StateClass,
        Tier::TopLevel,
        Tier::Script,
    ];

    pub fn is_exact(self) -> bool {
        matches!(self, Tier::Action | Tier::State)
    }
}

/// One registered planning agent.
#[derive(Clone)]
pub struct PlanEntry {
    pub name: Symbol,
    pub tier: Tier,
    pub body: PlanFn,
    /// Builds the locals a new subgoal of this kind starts with.
    pub locals: fn() -> Locals,
}

impl std::fmt::Debug for PlanEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlanEntry")
            .field("name", &self.name)
            .field("tier", &self.tier)
            .finish()
    }
}

impl PlanEntry {
    pub fn matches(&self, head: &Symbol, ontology: &Ontology) -> bool {
        if self.tier.is_exact() {
            &self.name == head
        } else {
            ontology.is_a(&self.name, head)
        }
    }
}

/// Ordered collection of planning agents.
#[derive(Debug, Clone, Default)]
pub struct PlanRegistry {
    entries: Vec<PlanEntry>,
}

impl PlanRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, entry: PlanEntry) -> &mut Self {
        self.entries.push(entry);
        self
    }

    pub fn action(&mut self, name: &str, body: PlanFn) -> &mut Self {
        self.add(Tier::Action, name, body, Locals::default)
    }

    pub fn state(&mut self, name: &str, body: PlanFn) -> &mut Self {
        self.add(Tier::State, name, body, Locals::default)
    }

    pub fn state_class(&mut self, name: &str, body: PlanFn) -> &mut Self {
        self.add(Tier::StateClass, name, body, Locals::default)
    }

    pub fn top_level(&mut self, name: &str, body: PlanFn) -> &mut Self {
        self.add(Tier::TopLevel, name, body, Locals::default)
    }

    pub fn script(&mut self, name: &str, body: PlanFn) -> &mut Self {
        self.add(Tier::Script, name, body, Locals::default)
    }

    /// Register with explicit locals.
    pub fn add(&mut self, tier: Tier, name: &str, body: PlanFn, locals: fn() -> Locals) -> &mut Self {
        self.register(PlanEntry {
            name: Symbol::new(name),
            tier,
            body,
            locals,
        })
    }

    /// The entry that runs objectives headed by `head`.
    pub fn resolve(&self, head: &Symbol, ontology: &Ontology) -> Option<&PlanEntry> {
        let found = Tier::ALL.iter().find_map(|tier| {
            self.entries
                .iter()
                .filter(|e| e.tier == *tier)
                .find(|e| e.matches(head, ontology))
        });
        trace!(head = %head, plan = ?found.map(|e| &e.name), "resolve");
        found
    }

    /// Initial locals for a subgoal headed by `head`.
    pub fn locals_for(&self, head: &Symbol, ontology: &Ontology) -> Locals {
        self.resolve(head, ontology)
            .map(|e| (e.locals)())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[PlanEntry] {
        &self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop(_: &mut Planner<'_>) {}

    #[test]
    fn tiers_decide_before_registration_order() {
        let mut ont = Ontology::base();
        ont.add_isa(&Symbol::new("visit"), &Symbol::new("appointment"));
        let mut reg = PlanRegistry::new();
        reg.script("script", noop)
            .add(Tier::Script, "appointment", noop, Locals::appointment)
            .top_level("appointment", noop);

        let hit = reg.resolve(&Symbol::new("visit"), &ont).unwrap();
        assert_eq!(hit.tier, Tier::TopLevel);

        // Within one tier the first registration wins.
        let mut reg = PlanRegistry::new();
        reg.add(Tier::Script, "appointment", noop, Locals::appointment)
            .script("script", noop);
        let hit = reg.resolve(&Symbol::new("visit"), &ont).unwrap();
        assert_eq!(hit.name, "appointment");
        assert_eq!(reg.locals_for(&Symbol::new("visit"), &ont), Locals::appointment());
    }

    #[test]
    fn exact_tiers_ignore_classes() {
        let ont = Ontology::base();
        let mut reg = PlanRegistry::new();
        reg.action("mtrans", noop);
        assert!(reg.resolve(&Symbol::new("propose"), &ont).is_none());
        assert!(reg.resolve(&Symbol::new("mtrans"), &ont).is_some());
        assert_eq!(reg.locals_for(&Symbol::new("unknown"), &ont), Locals::None);
    }
}
