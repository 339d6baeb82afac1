//! Per-agent planning state.
//!
//! An [`Actor`] owns the ids of its subgoals (live and terminal, in creation
//! order; the scheduler walks them newest first), its learned social state
//! and one [`Antecedent`] salience tracker per discourse channel.

use serde::Serialize;

use crate::prop::Proposition;
use crate::symbol::Symbol;
use crate::time::{Dur, Ts};

use super::subgoal::SubgoalId;

/// Number of discourse channels an actor tracks salience for.
pub const CHANNEL_MAX: usize = 6;

/// Where a mention of the actor appeared in a sentence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyntacticRole {
    Subject,
    Object,
    IndirectObject,
    /// Anything more deeply nested than the above.
    Nested,
    /// Mentioned as part of a list.
    List,
}

/// Salience of an actor as an antecedent for later pronouns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Antecedent {
    pub sigweight_major: u32,
    pub sigweight_subject: u32,
    pub sigweight_nested: u32,
    pub sigweight_list: u32,
    pub gender: Option<char>,
    pub number: Option<char>,
    pub person: Option<char>,
}

impl Antecedent {
    pub fn salience(&self) -> u32 {
        self.sigweight_major + self.sigweight_subject + self.sigweight_nested + self.sigweight_list
    }

    /// One sentence has passed without a mention.
    pub fn decay(&mut self) {
        for w in [
            &mut self.sigweight_major,
            &mut self.sigweight_subject,
            &mut self.sigweight_nested,
            &mut self.sigweight_list,
        ] {
            *w = w.saturating_sub(1);
        }
    }

    /// The actor was mentioned in `role`.
    pub fn refresh(&mut self, role: SyntacticRole) {
        match role {
            SyntacticRole::List => self.sigweight_list += 3,
            SyntacticRole::Subject => {
                self.sigweight_major += 3;
                self.sigweight_subject += 2;
            }
            SyntacticRole::Object | SyntacticRole::IndirectObject => self.sigweight_major += 3,
            SyntacticRole::Nested => self.sigweight_nested += 1,
        }
    }
}

/// Someone an actor keeps in touch with.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Friend {
    pub actor: Symbol,
    pub last_seen: Option<Ts>,
    /// How often the two want to see each other.
    pub see_interval: Option<Dur>,
    /// The goal that maintains the friendship, if any.
    pub maintain: Option<SubgoalId>,
}

impl Friend {
    pub fn new(actor: Symbol) -> Self {
        Friend {
            actor,
            last_seen: None,
            see_interval: None,
            maintain: None,
        }
    }
}

/// One agent's goal forest and social state within a context.
#[derive(Debug, Clone, Serialize)]
pub struct Actor {
    pub name: Symbol,
    /// Creation order. Iterate with [`Actor::newest_first`].
    pub subgoals: Vec<SubgoalId>,
    pub emotions: Vec<Proposition>,
    pub friends: Vec<Friend>,
    /// Objective of the appointment the actor is currently travelling to.
    pub appointment_cur: Option<Proposition>,
    /// Restedness in `[-1, 1]`; only animals have one.
    pub rest_level: Option<f64>,
    /// Energy in `[-1, 1]`; only animals have one.
    pub energy_level: Option<f64>,
    pub antecedents: [Antecedent; CHANNEL_MAX],
}

impl Actor {
    pub fn new(name: Symbol, is_animal: bool) -> Self {
        let level = is_animal.then_some(1.0);
        Actor {
            name,
            subgoals: Vec::new(),
            emotions: Vec::new(),
            friends: Vec::new(),
            appointment_cur: None,
            rest_level: level,
            energy_level: level,
            antecedents: [Antecedent::default(); CHANNEL_MAX],
        }
    }

    /// Subgoal ids, most recently created first.
    pub fn newest_first(&self) -> impl Iterator<Item = SubgoalId> + '_ {
        self.subgoals.iter().rev().copied()
    }

    pub fn find_friend(&self, who: &Symbol) -> Option<&Friend> {
        self.friends.iter().find(|f| &f.actor == who)
    }

    pub fn find_friend_mut(&mut self, who: &Symbol) -> Option<&mut Friend> {
        self.friends.iter_mut().find(|f| &f.actor == who)
    }

    /// Add `who` as a friend unless already one.
    pub fn add_friend(&mut self, who: Symbol) -> &mut Friend {
        let idx = match self.friends.iter().position(|f| f.actor == who) {
            Some(idx) => idx,
            None => {
                self.friends.push(Friend::new(who));
                self.friends.len() - 1
            }
        };
        &mut self.friends[idx]
    }

    pub fn antecedent(&self, channel: usize) -> Option<&Antecedent> {
        self.antecedents.get(channel)
    }

    pub fn antecedent_mut(&mut self, channel: usize) -> Option<&mut Antecedent> {
        self.antecedents.get_mut(channel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn animals_start_rested() {
        let jim = Actor::new(Symbol::new("Jim"), true);
        assert_eq!(jim.rest_level, Some(1.0));
        assert_eq!(jim.energy_level, Some(1.0));
        let robot = Actor::new(Symbol::new("robot1"), false);
        assert!(robot.rest_level.is_none());
    }

    #[test]
    fn antecedent_refresh_and_decay() {
        let mut an = Antecedent::default();
        an.refresh(SyntacticRole::Subject);
        an.refresh(SyntacticRole::Nested);
        assert_eq!(an.salience(), 6);
        an.decay();
        assert_eq!(an.sigweight_major, 2);
        assert_eq!(an.sigweight_subject, 1);
        assert_eq!(an.sigweight_nested, 0);
        for _ in 0..5 {
            an.decay();
        }
        assert_eq!(an.salience(), 0);
    }

    #[test]
    fn friends_are_unique() {
        let mut jim = Actor::new(Symbol::new("Jim"), true);
        jim.add_friend(Symbol::new("Mary")).see_interval = Some(3600);
        jim.add_friend(Symbol::new("Mary"));
        assert_eq!(jim.friends.len(), 1);
        assert_eq!(
            jim.find_friend(&Symbol::new("Mary")).unwrap().see_interval,
            Some(3600)
        );
    }

    #[test]
    fn newest_first_reverses_creation_order() {
        let mut jim = Actor::new(Symbol::new("Jim"), true);
        jim.subgoals = vec![SubgoalId::from_raw(0), SubgoalId::from_raw(1)];
        let order: Vec<_> = jim.newest_first().collect();
        assert_eq!(order, vec![SubgoalId::from_raw(1), SubgoalId::from_raw(0)]);
    }
}
