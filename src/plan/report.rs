//! Snapshots of a context for printing.

use std::fmt;

use serde::Serialize;

use crate::prop::Proposition;
use crate::store::Fact;
use crate::symbol::Symbol;
use crate::time::{Ts, TsRange};

use super::actor::Friend;
use super::context::{ContextId, Rsn};
use super::session::{ContextResult, Session};
use super::state::{Mode, SubgoalState};
use super::subgoal::SubgoalId;

#[derive(Debug, Clone, Serialize)]
pub struct SubgoalReport {
    pub id: SubgoalId,
    pub objective: Proposition,
    pub state: String,
    pub ts: Ts,
    pub supergoal: Option<SubgoalId>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ActorReport {
    pub name: Symbol,
    pub subgoals: Vec<SubgoalReport>,
    pub emotions: Vec<Proposition>,
    pub friends: Vec<Friend>,
}

/// Everything worth showing about one context.
#[derive(Debug, Clone, Serialize)]
pub struct ContextReport {
    pub id: ContextId,
    pub serial: u64,
    pub parent: Option<ContextId>,
    pub mode: Mode,
    pub sense: f64,
    pub rsn: Rsn,
    pub story_time: TsRange,
    pub makes_sense_reasons: Vec<Proposition>,
    pub not_make_sense_reasons: Vec<Proposition>,
    pub actors: Vec<ActorReport>,
    pub facts: Vec<Fact>,
}

impl Session {
    pub fn report(&self, cx: ContextId) -> ContextResult<ContextReport> {
        let context = self.try_context(cx)?;
        let actors = context
            .actors()
            .map(|a| ActorReport {
                name: a.name.clone(),
                subgoals: a
                    .newest_first()
                    .filter_map(|id| context.subgoal(id))
                    .map(|sg| SubgoalReport {
                        id: sg.id,
                        objective: sg.objective.clone(),
                        state: sg.state.as_label(),
                        ts: sg.ts,
                        supergoal: sg.supergoal,
                    })
                    .collect(),
                emotions: a.emotions.clone(),
                friends: a.friends.clone(),
            })
            .collect();
        Ok(ContextReport {
            id: context.id,
            serial: context.serial,
            parent: context.parent,
            mode: context.mode,
            sense: context.sense,
            rsn: context.rsn,
            story_time: context.story_time,
            makes_sense_reasons: context.makes_sense_reasons.clone(),
            not_make_sense_reasons: context.not_make_sense_reasons.clone(),
            actors,
            facts: self.store.dump(cx),
        })
    }
}

impl fmt::Display for ContextReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "context {} ({}) sense {:.2} mode {} story time {}",
            self.serial, self.id, self.sense, self.mode, self.story_time
        )?;
        for r in &self.not_make_sense_reasons {
            writeln!(f, "  does not make sense: {r}")?;
        }
        for r in &self.makes_sense_reasons {
            writeln!(f, "  makes sense: {r}")?;
        }
        for actor in &self.actors {
            writeln!(f, "actor {}", actor.name)?;
            for sg in &actor.subgoals {
                let state = SubgoalState::from_label(&sg.state).unwrap_or(SubgoalState::Na);
                let indent = if sg.supergoal.is_some() { "    " } else { "  " };
                writeln!(f, "{indent}{} {} {} @ {}", sg.id, sg.objective, state, sg.ts)?;
            }
            for e in &actor.emotions {
                writeln!(f, "  feels {e}")?;
            }
        }
        writeln!(f, "facts:")?;
        for fact in &self.facts {
            match fact.retracted_at {
                Some(at) => writeln!(f, "  {} {} (until {at})", fact.range, fact.prop)?,
                None => writeln!(f, "  {} {}", fact.range, fact.prop)?,
            }
        }
        Ok(())
    }
}
