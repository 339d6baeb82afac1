//! The planning session: everything one discourse run owns.
//!
//! [`Session`] holds the fact store, the ontology, the arena of contexts
//! (root first), the list of live alternatives and the best one, the input
//! channel and clock, the scheduler's no-activity counter, the plan registry
//! and the emotion hook. Every operation of the planner is a method on it;
//! there is no process-global state.

use std::rc::Rc;

use tracing::{debug, info, warn};

use crate::agents;
use crate::channel::{Clock, InputChannel, InputEvent, InputUnit, ManualClock, ScriptedChannel};
use crate::config::PlannerConfig;
use crate::error::ContextError;
use crate::ontology::Ontology;
use crate::prop::{Proposition, Term};
use crate::store::{FactStore, MemFactStore, View, When};
use crate::symbol::{InstanceNamer, Symbol};
use crate::time::{Dur, Ts, TsRange};

use super::actor::Actor;
use super::context::{Context, ContextId};
use super::emotion::{BasicEmotions, EmotionHook};
use super::registry::PlanRegistry;
use super::state::{Mode, SubgoalState};
use super::subgoal::{Subgoal, SubgoalId};

pub type ContextResult<T> = std::result::Result<T, ContextError>;

/// One planning run.
pub struct Session {
    pub(super) config: PlannerConfig,
    pub(super) store: Box<dyn FactStore>,
    pub(super) ontology: Ontology,
    pub(super) contexts: Vec<Option<Context>>,
    pub(super) alternatives: Vec<ContextId>,
    pub(super) best: ContextId,
    pub(super) channel: Box<dyn InputChannel>,
    pub(super) clock: Box<dyn Clock>,
    /// Consecutive passes without progress.
    pub(super) no_activity: u32,
    pub(super) registry: Rc<PlanRegistry>,
    pub(super) emotions: Rc<dyn EmotionHook>,
    pub(super) namer: InstanceNamer,
    /// Story time past which the scheduler does not run.
    pub(super) horizon: Option<Ts>,
}

/// Builder for [`Session`]. Anything not set gets a default: an in-memory
/// store, the base ontology, the standard planning agents, an empty
/// scripted channel and a manual clock at the start time.
pub struct SessionBuilder {
    config: PlannerConfig,
    start: Ts,
    store: Option<Box<dyn FactStore>>,
    ontology: Option<Ontology>,
    channel: Option<Box<dyn InputChannel>>,
    clock: Option<Box<dyn Clock>>,
    registry: Option<PlanRegistry>,
    emotions: Option<Rc<dyn EmotionHook>>,
    horizon: Option<Ts>,
}

impl SessionBuilder {
    pub fn config(mut self, config: PlannerConfig) -> Self {
        self.config = config;
        self
    }

    /// Story time at which the session begins.
    pub fn start(mut self, start: Ts) -> Self {
        self.start = start;
        self
    }

    pub fn store(mut self, store: impl FactStore + 'static) -> Self {
        self.store = Some(Box::new(store));
        self
    }

    pub fn ontology(mut self, ontology: Ontology) -> Self {
        self.ontology = Some(ontology);
        self
    }

    pub fn channel(mut self, channel: impl InputChannel + 'static) -> Self {
        self.channel = Some(Box::new(channel));
        self
    }

    pub fn clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Some(Box::new(clock));
        self
    }

    pub fn registry(mut self, registry: PlanRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn emotions(mut self, hook: impl EmotionHook + 'static) -> Self {
        self.emotions = Some(Rc::new(hook));
        self
    }

    /// Stop scheduling once every runnable subgoal is past `horizon`.
    pub fn horizon(mut self, horizon: Ts) -> Self {
        self.horizon = Some(horizon);
        self
    }

    pub fn build(self) -> Session {
        let start = self.start;
        let mut session = Session {
            config: self.config,
            store: self.store.unwrap_or_else(|| Box::new(MemFactStore::new())),
            ontology: self.ontology.unwrap_or_else(Ontology::base),
            contexts: Vec::new(),
            alternatives: Vec::new(),
            best: ContextId::ROOT,
            channel: self
                .channel
                .unwrap_or_else(|| Box::new(ScriptedChannel::new(start))),
            clock: self.clock.unwrap_or_else(|| Box::new(ManualClock::new(start))),
            no_activity: 0,
            registry: Rc::new(self.registry.unwrap_or_else(agents::standard_registry)),
            emotions: self.emotions.unwrap_or_else(|| Rc::new(BasicEmotions)),
            namer: InstanceNamer::new(),
            horizon: self.horizon,
        };
        let story_time = TsRange::new(start, start);
        session
            .contexts
            .push(Some(Context::new(ContextId::ROOT, 0, None, story_time)));
        session.store.add_context(ContextId::ROOT, None);
        if let Ok(first) = session.sprout(ContextId::ROOT, None) {
            session.best = first;
        }
        session
    }
}

impl Session {
    pub fn builder() -> SessionBuilder {
        SessionBuilder {
            config: PlannerConfig::default(),
            start: Ts::ZERO,
            store: None,
            ontology: None,
            channel: None,
            clock: None,
            registry: None,
            emotions: None,
            horizon: None,
        }
    }

    /// A session with `config` and every other part defaulted.
    pub fn new(config: PlannerConfig) -> Self {
        Self::builder().config(config).build()
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    pub fn ontology(&self) -> &Ontology {
        &self.ontology
    }

    pub fn ontology_mut(&mut self) -> &mut Ontology {
        &mut self.ontology
    }

    /// Declare `child` an instance or subclass of `parent`.
    pub fn add_isa(&mut self, child: &str, parent: &str) {
        self.ontology.add_isa(&Symbol::new(child), &Symbol::new(parent));
    }

    pub fn store(&self) -> &dyn FactStore {
        self.store.as_ref()
    }

    pub fn registry(&self) -> &PlanRegistry {
        &self.registry
    }

    /// The clock's current time.
    pub fn now(&self) -> Ts {
        self.clock.now()
    }

    pub fn horizon(&self) -> Option<Ts> {
        self.horizon
    }

    pub fn set_horizon(&mut self, horizon: Option<Ts>) {
        self.horizon = horizon;
    }

    pub fn fresh_instance(&mut self, class: &Symbol) -> Symbol {
        self.namer.fresh(class)
    }

    // -- contexts -----------------------------------------------------------

    /// The currently best-ranked alternative.
    pub fn best(&self) -> ContextId {
        self.best
    }

    /// Live alternative contexts, in creation order.
    pub fn alternatives(&self) -> &[ContextId] {
        &self.alternatives
    }

    pub fn context(&self, id: ContextId) -> Option<&Context> {
        self.contexts.get(id.index()).and_then(Option::as_ref)
    }

    pub fn context_mut(&mut self, id: ContextId) -> Option<&mut Context> {
        self.contexts.get_mut(id.index()).and_then(Option::as_mut)
    }

    /// Look up a context id handed in from outside.
    pub fn try_context(&self, id: ContextId) -> ContextResult<&Context> {
        match self.contexts.get(id.index()) {
            Some(Some(cx)) => Ok(cx),
            Some(None) => Err(ContextError::Pruned { id: id.raw() }),
            None => Err(ContextError::NotFound { id: id.raw() }),
        }
    }

    pub fn subgoal(&self, cx: ContextId, id: SubgoalId) -> ContextResult<&Subgoal> {
        self.try_context(cx)?
            .subgoal(id)
            .ok_or(ContextError::SubgoalNotFound {
                context: cx.raw(),
                subgoal: id.raw(),
            })
    }

    pub fn actor(&self, cx: ContextId, name: &Symbol) -> ContextResult<&Actor> {
        self.try_context(cx)?
            .actor(name)
            .ok_or_else(|| ContextError::ActorNotFound {
                context: cx.raw(),
                actor: name.to_string(),
            })
    }

    pub(crate) fn sg(&self, cx: ContextId, id: SubgoalId) -> Option<&Subgoal> {
        self.context(cx)?.subgoal(id)
    }

    pub(crate) fn sg_mut(&mut self, cx: ContextId, id: SubgoalId) -> Option<&mut Subgoal> {
        self.context_mut(cx)?.subgoal_mut(id)
    }

    pub fn state_of(&self, cx: ContextId, id: SubgoalId) -> Option<SubgoalState> {
        self.sg(cx, id).map(|sg| sg.state)
    }

    pub fn mode(&self, cx: ContextId) -> Mode {
        self.context(cx).map(|c| c.mode).unwrap_or(Mode::Stopped)
    }

    /// Branch `parent` into a new alternative.
    pub fn sprout(&mut self, parent: ContextId, concept: Option<Proposition>) -> ContextResult<ContextId> {
        let id = ContextId::from_raw(self.contexts.len() as u32);
        let parent_cx = self
            .context_mut(parent)
            .ok_or(ContextError::NotFound { id: parent.raw() })?;
        let child = parent_cx.sprout_child(id, concept);
        debug!(parent = %parent, child = %id, serial = child.serial, "sprouted context");
        self.contexts.push(Some(child));
        self.store.add_context(id, Some(parent));
        self.alternatives.push(id);
        Ok(id)
    }

    /// Make the alternative with the highest sense the best one.
    pub fn find_best(&mut self) -> Option<ContextId> {
        let mut best: Option<(ContextId, f64)> = None;
        for id in &self.alternatives {
            let Some(cx) = self.context(*id) else {
                continue;
            };
            if best.is_none_or(|(_, sense)| cx.sense > sense) {
                best = Some((*id, cx.sense));
            }
        }
        let (id, _) = best?;
        self.best = id;
        Some(id)
    }

    /// Keep only the `keep` most sensible alternatives.
    ///
    /// A dropped alternative that is an ancestor of a kept one leaves the
    /// list but keeps its facts, which its descendants still see.
    pub fn prune(&mut self, keep: usize) {
        let mut ranked: Vec<(ContextId, f64)> = self
            .alternatives
            .iter()
            .filter_map(|id| self.context(*id).map(|cx| (*id, cx.sense)))
            .collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        let keep = keep.max(1);
        let kept: Vec<ContextId> = ranked.iter().take(keep).map(|(id, _)| *id).collect();
        for (id, _) in ranked.iter().skip(keep) {
            if kept.iter().any(|k| self.is_ancestor(*id, *k)) {
                continue;
            }
            debug!(context = %id, "pruned");
            self.store.drop_context(*id);
            if let Some(slot) = self.contexts.get_mut(id.index()) {
                *slot = None;
            }
        }
        self.alternatives.retain(|id| kept.contains(id));
        if !kept.contains(&self.best) {
            self.find_best();
        }
    }

    /// Whether `ancestor` is a proper ancestor of `cx`.
    pub fn is_ancestor(&self, ancestor: ContextId, cx: ContextId) -> bool {
        let mut cur = self.context(cx).and_then(|c| c.parent);
        while let Some(id) = cur {
            if id == ancestor {
                return true;
            }
            cur = self.context(id).and_then(|c| c.parent);
        }
        false
    }

    // -- actors -------------------------------------------------------------

    /// Whether `x` is something the scheduler runs plans for.
    pub fn is_actor(&self, x: &Symbol) -> bool {
        self.ontology.isa(&self.config.actor_class, x)
    }

    /// Make sure `name` has an actor in `cx`. A new actor gets the
    /// configured handler goals at the context's story time.
    pub(crate) fn actor_find_or_create(&mut self, cx: ContextId, name: &Symbol, ts: Ts) -> Option<()> {
        let is_animal = self.is_actor(name);
        let context = self.context_mut(cx)?;
        if context.actor(name).is_some() {
            return Some(());
        }
        context.push_actor(Actor::new(name.clone(), is_animal));
        let at = context.story_time.stop.unwrap_or(ts);
        debug!(actor = %name, context = %cx, "actor created");
        for handler in self.config.handlers.clone() {
            let goal = Proposition::new(handler.as_str(), vec![Term::from(name)]);
            self.top_goal(cx, at, Some(name.clone()), goal);
        }
        Some(())
    }

    // -- facts --------------------------------------------------------------

    /// What holds in `cx` at `ts`.
    pub fn view(&self, cx: ContextId, ts: Ts) -> View<'_> {
        View::new(self.store.as_ref(), &self.ontology, cx, ts)
    }

    /// Assert a fact, derive device states from it, and wake any pattern
    /// demons it satisfies.
    pub fn assert_fact(&mut self, cx: ContextId, range: TsRange, prop: Proposition) {
        debug!(context = %cx, %range, fact = %prop, "assert");
        self.store.assert(cx, range, prop.clone());
        agents::devices::on_assert(self, cx, range, &prop);
        self.demon_fan_out(cx, &prop);
    }

    /// A state that holds from `ts + delay` on.
    pub fn assert_state(&mut self, cx: ContextId, ts: Ts, delay: Dur, prop: Proposition) {
        self.assert_fact(cx, TsRange::state(ts, delay), prop);
    }

    /// An action over `[ts, ts + dur]`.
    pub fn assert_action(&mut self, cx: ContextId, ts: Ts, dur: Dur, prop: Proposition) {
        self.assert_fact(cx, TsRange::action(ts, dur), prop);
    }

    pub fn assert_range(&mut self, cx: ContextId, start: Ts, stop: Ts, prop: Proposition) {
        self.assert_fact(cx, TsRange::new(start, stop), prop);
    }

    /// End, at `ts`, every fact in `cx` matching `pattern`.
    pub fn retract(&mut self, cx: ContextId, ts: Ts, pattern: &Proposition) -> Vec<Proposition> {
        let gone = self.store.retract(cx, ts, pattern);
        if !gone.is_empty() {
            debug!(context = %cx, %ts, pattern = %pattern, count = gone.len(), "retract");
        }
        gone
    }

    /// Retract every `[X arg]` whose head is a `class`.
    pub fn retract_class(&mut self, cx: ContextId, ts: Ts, class: &str, arg: &Symbol) -> Vec<Proposition> {
        let candidates = self.store.retrieve(
            cx,
            When::At(ts),
            &Proposition::wild_head(vec![Term::from(arg)]),
        );
        let mut gone = Vec::new();
        for fact in candidates {
            if self.ontology.isa(class, fact.head()) {
                gone.extend(self.retract(cx, ts, &fact));
            }
        }
        gone
    }

    // -- input --------------------------------------------------------------

    /// Apply one unit of understood input to `cx` at `now`.
    pub fn apply_input(&mut self, cx: ContextId, now: Ts, unit: InputUnit) {
        for event in unit {
            match event {
                InputEvent::Assert(p) => self.assert_state(cx, now, 0, p),
                InputEvent::Action { prop, dur } => self.assert_action(cx, now, dur, prop),
                InputEvent::Retract(p) => {
                    self.retract(cx, now, &p);
                }
                InputEvent::Goal { actor, objective } => {
                    info!(objective = %objective, "goal from input");
                    self.top_goal(cx, now, actor, objective);
                }
                InputEvent::Appointment(p) => agents::appointment::appointment_make(self, cx, now, p),
                InputEvent::CancelAppointment(p) => {
                    if !agents::appointment::appointment_cancel(self, cx, now, &p) {
                        warn!(appointment = %p, "no matching appointment to cancel");
                    }
                }
            }
        }
    }

    /// Read one unit from the channel and apply it to the best context.
    /// Returns `false` at end of input.
    pub fn read_understand(&mut self) -> bool {
        let Some(unit) = self.channel.read_unit(self.clock.now()) else {
            return false;
        };
        let now = self.clock.now();
        let cx = self.best;
        self.apply_input(cx, now, unit);
        true
    }

    pub fn channel(&self) -> &dyn InputChannel {
        self.channel.as_ref()
    }

    pub fn channel_mut(&mut self) -> &mut dyn InputChannel {
        self.channel.as_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prop;

    #[test]
    fn new_session_has_one_alternative() {
        let s = Session::new(PlannerConfig::default());
        assert_eq!(s.alternatives().len(), 1);
        let best = s.best();
        assert_ne!(best, ContextId::ROOT);
        let cx = s.try_context(best).unwrap();
        assert_eq!(cx.parent, Some(ContextId::ROOT));
        assert_eq!(cx.serial, 1);
        assert!(matches!(
            s.try_context(ContextId::from_raw(42)),
            Err(ContextError::NotFound { id: 42 })
        ));
    }

    #[test]
    fn find_best_and_prune() {
        let mut s = Session::new(PlannerConfig::default());
        let first = s.best();
        let second = s.sprout(ContextId::ROOT, None).unwrap();
        let third = s.sprout(ContextId::ROOT, None).unwrap();
        s.context_mut(first).unwrap().sense = 0.2;
        s.context_mut(second).unwrap().sense = 0.9;
        s.context_mut(third).unwrap().sense = 0.5;
        assert_eq!(s.find_best(), Some(second));

        s.prune(2);
        assert_eq!(s.alternatives(), &[second, third]);
        assert!(matches!(s.try_context(first), Err(ContextError::Pruned { .. })));
        assert_eq!(s.best(), second);
    }

    #[test]
    fn pruning_keeps_ancestors_of_survivors() {
        let mut s = Session::new(PlannerConfig::default());
        let parent = s.best();
        s.assert_state(parent, Ts::ZERO, 0, prop!["closed", "box1"]);
        let child = s.sprout(parent, None).unwrap();
        s.context_mut(parent).unwrap().sense = 0.1;
        assert!(s.is_ancestor(parent, child));
        s.prune(1);
        assert_eq!(s.alternatives(), &[child]);
        assert!(s.view(child, Ts::from_secs(1)).is_true(&prop!["closed", "box1"]));
    }

    #[test]
    fn retract_class_matches_by_head_class() {
        let mut s = Session::new(PlannerConfig::default());
        let cx = s.best();
        s.assert_state(cx, Ts::ZERO, 0, prop!["knob-low", "knob1"]);
        s.assert_state(cx, Ts::ZERO, 0, prop!["color", "knob1"]);
        let gone = s.retract_class(cx, Ts::from_secs(5), "knob-position", &Symbol::new("knob1"));
        assert_eq!(gone, vec![prop!["knob-low", "knob1"]]);
        assert!(s.view(cx, Ts::from_secs(6)).is_true(&prop!["color", "knob1"]));
    }
}
