//! Emotional side effects of top-level goal outcomes.
//!
//! The planner only decides *when* an emotion arises: a top-level goal
//! changes status outside a spin that already carries a known emotion.
//! What the emotion is belongs to an [`EmotionHook`].

use crate::prop;
use crate::prop::Proposition;
use crate::symbol::Symbol;
use crate::time::Ts;

use super::context::ContextId;
use super::session::Session;

/// Called whenever a top-level goal's status proposition changes.
pub trait EmotionHook {
    fn goal_status(
        &self,
        session: &mut Session,
        cx: ContextId,
        actor: &Symbol,
        ts: Ts,
        status: &Proposition,
        causes: &[Proposition],
    );
}

/// Succeeded goals make the actor feel a positive emotion, failed goals a
/// negative one; each is linked to the goal by `leadto`. When a cause names
/// another actor, the emotion is directed at them (`gratitude` or `anger`).
#[derive(Debug, Default, Clone, Copy)]
pub struct BasicEmotions;

impl EmotionHook for BasicEmotions {
    fn goal_status(
        &self,
        session: &mut Session,
        cx: ContextId,
        actor: &Symbol,
        ts: Ts,
        status: &Proposition,
        causes: &[Proposition],
    ) {
        let (general, directed) = if status.is("succeeded-goal") {
            ("positive-emotion", "gratitude")
        } else if status.is("failed-goal") {
            ("negative-emotion", "anger")
        } else {
            return;
        };
        let other = causes
            .iter()
            .filter_map(|c| c.sym(1))
            .find(|who| *who != actor && session.is_actor(who))
            .cloned();
        let emotion = match other {
            Some(who) => prop![directed, actor, who],
            None => prop![general, actor],
        };
        session.assert_state(cx, ts, 0, emotion.clone());
        session.assert_state(cx, ts, 0, prop!["leadto", status, &emotion]);
        if let Some(ac) = session.context_mut(cx).and_then(|c| c.actor_mut(actor)) {
            ac.emotions.push(emotion);
        }
    }
}

/// Records nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoEmotions;

impl EmotionHook for NoEmotions {
    fn goal_status(&self, _: &mut Session, _: ContextId, _: &Symbol, _: Ts, _: &Proposition, _: &[Proposition]) {}
}
