//! Hypothesized story worlds.
//!
//! A [`Context`] holds its own actors and subgoal arena, a run mode, the
//! story-time interval simulated so far, and the bookkeeping used to rank
//! alternative interpretations: sense, relevance/sense/novelty and the
//! reasons that justify them.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::ontology::Ontology;
use crate::prop::Proposition;
use crate::symbol::Symbol;
use crate::time::TsRange;

use super::actor::Actor;
use super::state::{Mode, SubgoalState};
use super::subgoal::{Subgoal, SubgoalId};

pub const SENSE_LITTLE: f64 = 0.1;
pub const SENSE_SOME: f64 = 0.25;
pub const SENSE_HALF: f64 = 0.5;
pub const SENSE_MOSTLY: f64 = 0.75;
pub const SENSE_TOTAL: f64 = 1.0;

pub const NOVELTY_NONE: f64 = 0.0;
pub const NOVELTY_EXPECTED: f64 = 0.25;
pub const NOVELTY_HALF: f64 = 0.5;
pub const NOVELTY_MOSTLY: f64 = 0.75;
pub const NOVELTY_TOTAL: f64 = 1.0;

/// Index of a context in the session's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContextId(u32);

impl ContextId {
    /// The context of facts that hold unconditionally.
    pub const ROOT: ContextId = ContextId(0);

    pub fn from_raw(raw: u32) -> Self {
        ContextId(raw)
    }

    pub fn raw(self) -> u32 {
        self.0
    }

    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for ContextId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "cx:{}", self.0)
    }
}

/// Relevance, sense and novelty of an interpretation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Rsn {
    pub relevance: f64,
    pub sense: f64,
    pub novelty: f64,
}

impl Default for Rsn {
    fn default() -> Self {
        Rsn {
            relevance: 0.0,
            sense: SENSE_TOTAL,
            novelty: NOVELTY_NONE,
        }
    }
}

/// One alternative story world.
#[derive(Debug, Clone, Serialize)]
pub struct Context {
    pub id: ContextId,
    /// Human-readable numbering: a child of `n` is `n * 10 + k`.
    pub serial: u64,
    pub parent: Option<ContextId>,
    /// Plausibility used to rank alternatives.
    pub sense: f64,
    /// Story time simulated so far. The scheduler advances `stop`.
    pub story_time: TsRange,
    pub mode: Mode,
    pub rsn: Rsn,
    pub makes_sense_reasons: Vec<Proposition>,
    pub not_make_sense_reasons: Vec<Proposition>,
    /// What the context was sprouted to explore.
    pub sprout_concept: Option<Proposition>,
    /// Creation order. The scheduler walks them newest first.
    pub(crate) actors: Vec<Actor>,
    pub(crate) subgoals: Vec<Subgoal>,
    num_children: u32,
}

impl Context {
    pub(crate) fn new(id: ContextId, serial: u64, parent: Option<ContextId>, story_time: TsRange) -> Self {
        Context {
            id,
            serial,
            parent,
            sense: SENSE_TOTAL,
            story_time,
            mode: Mode::Stopped,
            rsn: Rsn::default(),
            makes_sense_reasons: Vec::new(),
            not_make_sense_reasons: Vec::new(),
            sprout_concept: None,
            actors: Vec::new(),
            subgoals: Vec::new(),
            num_children: 0,
        }
    }

    /// A child of this context. Actors and subgoals are deep-copied and
    /// every subgoal reference is remapped onto the copies.
    pub(crate) fn sprout_child(&mut self, id: ContextId, concept: Option<Proposition>) -> Context {
        self.num_children += 1;
        let mut child = Context::new(
            id,
            self.serial * 10 + u64::from(self.num_children),
            Some(self.id),
            self.story_time,
        );
        child.sense = self.sense;
        child.mode = self.mode;
        child.rsn = self.rsn;
        child.makes_sense_reasons = self.makes_sense_reasons.clone();
        child.not_make_sense_reasons = self.not_make_sense_reasons.clone();
        child.sprout_concept = concept;
        self.copy_actors_into(&mut child);
        child
    }

    /// Two passes: clone every subgoal into `child`'s arena recording
    /// old id -> new id, then rewrite supergoal and friendship links
    /// through that table.
    fn copy_actors_into(&self, child: &mut Context) {
        let mut remap: HashMap<SubgoalId, SubgoalId> = HashMap::new();
        for actor in &self.actors {
            let mut copy = actor.clone();
            copy.subgoals.clear();
            for old in &actor.subgoals {
                let Some(sg) = self.subgoal(*old) else {
                    continue;
                };
                let new = SubgoalId::from_raw(child.subgoals.len() as u32);
                child.subgoals.push(sg.copy_for_branch(new));
                remap.insert(*old, new);
                copy.subgoals.push(new);
            }
            child.actors.push(copy);
        }
        for sg in &mut child.subgoals {
            sg.supergoal = sg.supergoal.and_then(|old| remap.get(&old).copied());
        }
        for actor in &mut child.actors {
            for friend in &mut actor.friends {
                friend.maintain = friend.maintain.and_then(|old| remap.get(&old).copied());
            }
        }
    }

    // -- actors -------------------------------------------------------------

    pub fn actor(&self, name: &Symbol) -> Option<&Actor> {
        self.actors.iter().find(|a| &a.name == name)
    }

    pub fn actor_mut(&mut self, name: &Symbol) -> Option<&mut Actor> {
        self.actors.iter_mut().find(|a| &a.name == name)
    }

    /// Actors in scheduling order, most recently created first.
    pub fn actors(&self) -> impl Iterator<Item = &Actor> + '_ {
        self.actors.iter().rev()
    }

    pub(crate) fn push_actor(&mut self, actor: Actor) {
        self.actors.push(actor);
    }

    // -- subgoals -----------------------------------------------------------

    pub fn subgoal(&self, id: SubgoalId) -> Option<&Subgoal> {
        self.subgoals.get(id.index())
    }

    pub fn subgoal_mut(&mut self, id: SubgoalId) -> Option<&mut Subgoal> {
        self.subgoals.get_mut(id.index())
    }

    /// Every subgoal ever created in this context, oldest first.
    pub fn subgoals(&self) -> &[Subgoal] {
        &self.subgoals
    }

    /// Allocate an arena slot and build the subgoal that goes in it.
    pub(crate) fn add_subgoal(&mut self, build: impl FnOnce(SubgoalId) -> Subgoal) -> SubgoalId {
        let id = SubgoalId::from_raw(self.subgoals.len() as u32);
        self.subgoals.push(build(id));
        id
    }

    /// Subgoals whose objective matches `pattern`, in scheduling order.
    pub fn find_matching_subgoals(&self, pattern: &Proposition) -> Vec<SubgoalId> {
        self.actors()
            .flat_map(|a| a.newest_first())
            .filter(|id| self.subgoal(*id).is_some_and(|sg| pattern.matches(&sg.objective)))
            .collect()
    }

    /// First subgoal with a supergoal whose objective matches `pattern`.
    pub fn find_subgoal(&self, pattern: &Proposition) -> Option<SubgoalId> {
        self.find_matching_subgoals(pattern)
            .into_iter()
            .find(|id| self.subgoal(*id).is_some_and(|sg| sg.supergoal.is_some()))
    }

    pub fn supergoal_of(&self, id: SubgoalId) -> Option<SubgoalId> {
        self.subgoal(id)?.supergoal
    }

    /// Direct children of `id`, newest first.
    pub fn subgoals_of(&self, id: SubgoalId) -> Vec<SubgoalId> {
        self.subgoals
            .iter()
            .rev()
            .filter(|sg| sg.supergoal == Some(id))
            .map(|sg| sg.id)
            .collect()
    }

    /// Live subgoals of `actor` whose objective head is a `class`.
    pub fn find_subgoals_head(&self, ontology: &Ontology, actor: &Symbol, class: &str) -> Vec<SubgoalId> {
        let Some(ac) = self.actor(actor) else {
            return Vec::new();
        };
        ac.newest_first()
            .filter(|id| {
                self.subgoal(*id)
                    .is_some_and(|sg| !sg.is_stopped() && ontology.isa(class, sg.objective.head()))
            })
            .collect()
    }

    /// Reset every subgoal's spin target.
    pub(crate) fn clear_spin(&mut self) {
        for sg in &mut self.subgoals {
            sg.spin_to = SubgoalState::NoSpin;
        }
    }

    // -- sense bookkeeping --------------------------------------------------

    pub fn rsn_reset(&mut self) {
        self.rsn = Rsn::default();
    }

    pub fn sense_reset(&mut self) {
        self.rsn.sense = SENSE_TOTAL;
        self.makes_sense_reasons.clear();
        self.not_make_sense_reasons.clear();
    }

    /// Fold in another judgement: sense can only drop, relevance and
    /// novelty can only rise.
    pub fn set_rsn(&mut self, relevance: f64, sense: f64, novelty: f64) {
        self.rsn.relevance = self.rsn.relevance.max(relevance);
        self.rsn.sense = self.rsn.sense.min(sense);
        self.rsn.novelty = self.rsn.novelty.max(novelty);
    }

    pub fn add_makes_sense_reason(&mut self, reason: Proposition) {
        if !self.makes_sense_reasons.contains(&reason) {
            self.makes_sense_reasons.push(reason);
        }
    }

    pub fn add_not_make_sense_reason(&mut self, reason: Proposition) {
        if !self.not_make_sense_reasons.contains(&reason) {
            self.not_make_sense_reasons.push(reason);
        }
    }

    /// Record `sense` with the reason behind it.
    pub fn set_justified_sense(&mut self, sense: f64, reason: Proposition) {
        self.set_rsn(0.0, sense, NOVELTY_NONE);
        if sense <= SENSE_LITTLE {
            self.add_not_make_sense_reason(reason);
        } else if sense >= SENSE_MOSTLY {
            self.add_makes_sense_reason(reason);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::state::SubgoalState;
    use crate::plan::subgoal::Locals;
    use crate::prop;
    use crate::time::Ts;

    fn push(cx: &mut Context, actor: &str, objective: Proposition, sup: Option<SubgoalId>) -> SubgoalId {
        let name = Symbol::new(actor);
        let id = cx.add_subgoal(|id| {
            Subgoal::new(
                id,
                name.clone(),
                objective,
                Ts::ZERO,
                sup,
                SubgoalState::Step(1),
                SubgoalState::Failure,
                SubgoalState::NoSpin,
                Locals::None,
            )
        });
        if cx.actor(&name).is_none() {
            cx.push_actor(Actor::new(name.clone(), true));
        }
        if let Some(a) = cx.actor_mut(&name) {
            a.subgoals.push(id);
        }
        id
    }

    #[test]
    fn rsn_folds_monotonically() {
        let mut cx = Context::new(ContextId::ROOT, 0, None, TsRange::na());
        cx.set_rsn(0.5, SENSE_MOSTLY, NOVELTY_EXPECTED);
        cx.set_rsn(0.2, SENSE_TOTAL, NOVELTY_NONE);
        assert_eq!(cx.rsn.relevance, 0.5);
        assert_eq!(cx.rsn.sense, SENSE_MOSTLY);
        assert_eq!(cx.rsn.novelty, NOVELTY_EXPECTED);
        cx.rsn_reset();
        assert_eq!(cx.rsn, Rsn::default());
    }

    #[test]
    fn justified_sense_records_reasons_once() {
        let mut cx = Context::new(ContextId::ROOT, 0, None, TsRange::na());
        let why = prop!["appointment", "Jim", "Mary"];
        cx.set_justified_sense(SENSE_LITTLE, why.clone());
        cx.set_justified_sense(SENSE_LITTLE, why.clone());
        cx.set_justified_sense(SENSE_HALF, prop!["unrelated"]);
        assert_eq!(cx.not_make_sense_reasons, vec![why]);
        assert!(cx.makes_sense_reasons.is_empty());
        cx.sense_reset();
        assert!(cx.not_make_sense_reasons.is_empty());
    }

    #[test]
    fn sprout_remaps_supergoals() {
        let mut parent = Context::new(ContextId::from_raw(1), 1, Some(ContextId::ROOT), TsRange::na());
        let a = push(&mut parent, "Jim", prop!["sleep", "Jim"], None);
        let b = push(&mut parent, "Mary", prop!["handle-proposal", "Mary"], None);
        let c = push(&mut parent, "Jim", prop!["lying", "Jim", "bed1"], Some(a));
        parent.actor_mut(&Symbol::new("Jim")).unwrap().add_friend(Symbol::new("Mary")).maintain = Some(a);

        let child = parent.sprout_child(ContextId::from_raw(2), None);
        assert_eq!(child.serial, 11);
        assert_eq!(child.parent, Some(parent.id));
        assert_eq!(child.subgoals().len(), 3);

        // Jim's subgoals were copied first, so the ids moved.
        let jim = child.actor(&Symbol::new("Jim")).unwrap();
        assert_eq!(jim.subgoals.len(), 2);
        let new_c = jim.subgoals[1];
        let new_a = jim.subgoals[0];
        assert_ne!(new_c, c);
        assert_eq!(child.supergoal_of(new_c), Some(new_a));
        assert_eq!(child.subgoal(new_a).unwrap().objective, prop!["sleep", "Jim"]);
        assert_eq!(jim.find_friend(&Symbol::new("Mary")).unwrap().maintain, Some(new_a));

        let mary = child.actor(&Symbol::new("Mary")).unwrap();
        assert_eq!(
            child.subgoal(mary.subgoals[0]).unwrap().objective,
            parent.subgoal(b).unwrap().objective
        );

        let second = parent.sprout_child(ContextId::from_raw(3), None);
        assert_eq!(second.serial, 12);
    }

    #[test]
    fn subgoal_queries() {
        let mut cx = Context::new(ContextId::ROOT, 0, None, TsRange::na());
        let top = push(&mut cx, "Jim", prop!["sleep", "Jim"], None);
        let kid = push(&mut cx, "Jim", prop!["lying", "Jim", "bed1"], Some(top));
        assert_eq!(cx.subgoals_of(top), vec![kid]);
        assert_eq!(cx.find_subgoal(&prop!["sleep", "Jim"]), None);
        assert_eq!(cx.find_subgoal(&prop!["lying", "*", "*"]), Some(kid));
        assert_eq!(cx.find_matching_subgoals(&prop!["*", "Jim", "*"]), vec![kid]);
        let ont = Ontology::base();
        assert_eq!(cx.find_subgoals_head(&ont, &Symbol::new("Jim"), "top-level-goal"), vec![top]);
    }
}
