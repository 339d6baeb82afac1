//! Subgoal states, run modes and goal statuses.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Position of a subgoal in its planning agent's private automaton.
///
/// The reserved states mean the same thing for every goal class. [`Step`]
/// values are private line numbers of one body: low numbers for linear
/// script steps, 100s for "wait for the next event" loop heads, 900s for
/// cleanup, 999 for final housekeeping before SUCCESS.
///
/// [`Step`]: SubgoalState::Step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SubgoalState {
    /// Null transition; asking for it changes nothing.
    Na,
    Begin,
    /// Suspended until a demon fires.
    Waiting,
    Success,
    Failure,
    /// No planning agent matched the objective.
    FailureNoPlan,
    /// Terminal for the purposes of a spin.
    Pop,
    /// Spin flag: descends from the subgoal being spun.
    Spin,
    /// Spin flag: not part of any spin.
    NoSpin,
    Step(u32),
}

impl SubgoalState {
    /// Terminal states. Once reached, a subgoal never leaves them by transition.
    pub fn is_stopped(self) -> bool {
        matches!(
            self,
            SubgoalState::Success | SubgoalState::Failure | SubgoalState::FailureNoPlan
        )
    }

    /// Outcome states carry success or failure causes.
    pub fn is_outcome(self) -> bool {
        self.is_stopped()
    }

    pub fn is_failure(self) -> bool {
        matches!(self, SubgoalState::Failure | SubgoalState::FailureNoPlan)
    }

    /// The private step number, if any.
    pub fn step(self) -> Option<u32> {
        match self {
            SubgoalState::Step(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_label(self) -> String {
        match self {
            Self::Na => "NA".into(),
            Self::Begin => "BEGIN".into(),
            Self::Waiting => "WAITING".into(),
            Self::Success => "SUCCESS".into(),
            Self::Failure => "FAILURE".into(),
            Self::FailureNoPlan => "FAILURE-NO-PLAN".into(),
            Self::Pop => "POP".into(),
            Self::Spin => "SPIN".into(),
            Self::NoSpin => "NO-SPIN".into(),
            Self::Step(n) => n.to_string(),
        }
    }

    /// Parse a label produced by [`as_label`](Self::as_label).
    pub fn from_label(label: &str) -> Option<Self> {
        Some(match label {
            "NA" => Self::Na,
            "BEGIN" => Self::Begin,
            "WAITING" => Self::Waiting,
            "SUCCESS" => Self::Success,
            "FAILURE" => Self::Failure,
            "FAILURE-NO-PLAN" => Self::FailureNoPlan,
            "POP" => Self::Pop,
            "SPIN" => Self::Spin,
            "NO-SPIN" => Self::NoSpin,
            other => Self::Step(other.parse().ok()?),
        })
    }
}

impl fmt::Display for SubgoalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_label())
    }
}

/// How the scheduler runs a context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mode {
    Stopped,
    /// Fast-forwarding one subgoal lineage to a target state.
    Spinning,
    /// Free-running simulation with no external clock.
    Daydreaming,
    /// Paced by the clock and fed by the input channel.
    Performance,
}

impl Mode {
    pub fn as_label(self) -> &'static str {
        match self {
            Mode::Stopped => "stopped",
            Mode::Spinning => "spinning",
            Mode::Daydreaming => "daydreaming",
            Mode::Performance => "performance",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "stopped" => Some(Mode::Stopped),
            "spinning" | "spin" => Some(Mode::Spinning),
            "daydreaming" | "daydream" => Some(Mode::Daydreaming),
            "performance" => Some(Mode::Performance),
            _ => None,
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_label())
    }
}

/// Status of a goal as recorded in the fact store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GoalStatus {
    Active,
    Succeeded,
    Failed,
}

impl GoalStatus {
    /// The relation under which the status is asserted.
    pub fn as_label(self) -> &'static str {
        match self {
            GoalStatus::Active => "active-goal",
            GoalStatus::Succeeded => "succeeded-goal",
            GoalStatus::Failed => "failed-goal",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "active-goal" => Some(GoalStatus::Active),
            "succeeded-goal" => Some(GoalStatus::Succeeded),
            "failed-goal" => Some(GoalStatus::Failed),
            _ => None,
        }
    }

    /// The subgoal state a spin must reach for the goal to have this status.
    pub fn target_state(self) -> SubgoalState {
        match self {
            GoalStatus::Active => SubgoalState::Begin,
            GoalStatus::Succeeded => SubgoalState::Success,
            GoalStatus::Failed => SubgoalState::Failure,
        }
    }
}

impl fmt::Display for GoalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stopped_states() {
        assert!(SubgoalState::Success.is_stopped());
        assert!(SubgoalState::FailureNoPlan.is_stopped());
        assert!(SubgoalState::FailureNoPlan.is_failure());
        assert!(!SubgoalState::Waiting.is_stopped());
        assert!(!SubgoalState::Pop.is_stopped());
        assert!(!SubgoalState::Step(999).is_stopped());
    }

    #[test]
    fn labels_round_trip() {
        for s in [
            SubgoalState::Begin,
            SubgoalState::FailureNoPlan,
            SubgoalState::NoSpin,
            SubgoalState::Step(110),
        ] {
            assert_eq!(SubgoalState::from_label(&s.as_label()), Some(s));
        }
        assert_eq!(SubgoalState::from_label("bogus"), None);
        assert_eq!(Mode::from_label("daydream"), Some(Mode::Daydreaming));
        assert_eq!(GoalStatus::from_label("failed-goal"), Some(GoalStatus::Failed));
    }

    #[test]
    fn status_targets() {
        assert_eq!(GoalStatus::Active.target_state(), SubgoalState::Begin);
        assert_eq!(GoalStatus::Succeeded.target_state(), SubgoalState::Success);
        assert_eq!(GoalStatus::Failed.target_state(), SubgoalState::Failure);
    }
}
