//! Onboarding state machine stages and per-session conversation state.

use serde::{Deserialize, Serialize};

use super::model::Slots;
use crate::llm::ChatMessage;

/// A single stored history entry.
pub type Turn = ChatMessage;

/// The stages of the onboarding conversation.
///
/// Progresses linearly: Greeting → AskUserType → AskGoal → ShowServices →
/// CollectContactName → CollectContactEmail → Summary → Done. `Done` loops
/// on itself for free-form follow-up questions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Stage {
    Greeting,
    AskUserType,
    AskGoal,
    ShowServices,
    CollectContactName,
    CollectContactEmail,
    Summary,
    Done,
}

impl Stage {
    /// Every stage in forward order.
    pub const ALL: [Stage; 8] = [
        Stage::Greeting,
        Stage::AskUserType,
        Stage::AskGoal,
        Stage::ShowServices,
        Stage::CollectContactName,
        Stage::CollectContactEmail,
        Stage::Summary,
        Stage::Done,
    ];

    /// Check if a transition from `self` to `target` is valid.
    ///
    /// Only single forward steps are legal, plus staying put in the stages
    /// that wait for acceptable input.
    pub fn can_transition_to(&self, target: Stage) -> bool {
        if *self == target {
            return self.can_stay();
        }
        self.next() == Some(target)
    }

    /// Whether this stage may keep the conversation in place.
    pub fn can_stay(&self) -> bool {
        matches!(
            self,
            Self::AskUserType | Self::CollectContactName | Self::CollectContactEmail | Self::Done
        )
    }

    /// Whether this stage is terminal (onboarding is done).
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done)
    }

    /// Get the next stage in the linear progression, if any.
    pub fn next(&self) -> Option<Stage> {
        use Stage::*;
        match self {
            Greeting => Some(AskUserType),
            AskUserType => Some(AskGoal),
            AskGoal => Some(ShowServices),
            ShowServices => Some(CollectContactName),
            CollectContactName => Some(CollectContactEmail),
            CollectContactEmail => Some(Summary),
            Summary => Some(Done),
            Done => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Greeting => "GREETING",
            Self::AskUserType => "ASK_USER_TYPE",
            Self::AskGoal => "ASK_GOAL",
            Self::ShowServices => "SHOW_SERVICES",
            Self::CollectContactName => "COLLECT_CONTACT_NAME",
            Self::CollectContactEmail => "COLLECT_CONTACT_EMAIL",
            Self::Summary => "SUMMARY",
            Self::Done => "DONE",
        }
    }
}

impl Default for Stage {
    fn default() -> Self {
        Self::Greeting
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything remembered about one session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationState {
    #[serde(rename = "state")]
    pub stage: Stage,
    #[serde(flatten)]
    pub slots: Slots,
    /// Oldest first.
    pub history: Vec<Turn>,
}

impl ConversationState {
    /// Append a user/assistant pair, then drop the oldest entries beyond `limit`.
    pub fn push_exchange(
        &mut self,
        user: impl Into<String>,
        assistant: impl Into<String>,
        limit: usize,
    ) {
        self.history.push(Turn::user(user));
        self.history.push(Turn::assistant(assistant));
        if self.history.len() > limit {
            let excess = self.history.len() - limit;
            self.history.drain(..excess);
        }
    }

    /// The last `n` history entries, oldest first.
    pub fn recent_history(&self, n: usize) -> &[Turn] {
        let start = self.history.len().saturating_sub(n);
        &self.history[start..]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::Role;

    #[test]
    fn next_walks_all_stages() {
        let mut current = Stage::Greeting;
        for expected in &Stage::ALL[1..] {
            let next = current.next().unwrap();
            assert_eq!(next, *expected);
            current = next;
        }
        assert!(current.next().is_none());
        assert!(current.is_terminal());
    }

    #[test]
    fn forward_order_matches_ord() {
        for pair in Stage::ALL.windows(2) {
            assert!(pair[0] < pair[1]);
        }
    }

    #[test]
    fn invalid_transitions() {
        use Stage::*;
        // Skip stages
        assert!(!Greeting.can_transition_to(AskGoal));
        assert!(!ShowServices.can_transition_to(Summary));
        // Go backward
        assert!(!AskGoal.can_transition_to(AskUserType));
        assert!(!Done.can_transition_to(Greeting));
        // Stages that always advance cannot stay
        assert!(!Greeting.can_transition_to(Greeting));
        assert!(!AskGoal.can_transition_to(AskGoal));
        assert!(!Summary.can_transition_to(Summary));
        // Retry stages and Done can
        assert!(AskUserType.can_transition_to(AskUserType));
        assert!(CollectContactEmail.can_transition_to(CollectContactEmail));
        assert!(Done.can_transition_to(Done));
    }

    #[test]
    fn display_matches_serde() {
        for stage in Stage::ALL {
            let json = serde_json::to_string(&stage).unwrap();
            assert_eq!(format!("\"{stage}\""), json, "mismatch for {stage:?}");
        }
    }

    #[test]
    fn default_state() {
        let state = ConversationState::default();
        assert_eq!(state.stage, Stage::Greeting);
        assert_eq!(state.slots, Slots::default());
        assert!(state.history.is_empty());
    }

    #[test]
    fn history_is_capped_to_most_recent_entries() {
        let mut state = ConversationState::default();
        for i in 0..26 {
            state.push_exchange(format!("u{i}"), format!("a{i}"), 50);
        }
        assert_eq!(state.history.len(), 50);
        // 52 pushed, the first pair (u0, a0) was dropped
        assert_eq!(state.history[0], Turn::user("u1"));
        assert_eq!(state.history[1], Turn::assistant("a1"));
        assert_eq!(state.history[49], Turn::assistant("a25"));
        for (i, turn) in state.history.iter().enumerate() {
            let expected_role = if i % 2 == 0 { Role::User } else { Role::Assistant };
            assert_eq!(turn.role, expected_role);
        }
    }

    #[test]
    fn recent_history_takes_tail() {
        let mut state = ConversationState::default();
        assert!(state.recent_history(12).is_empty());
        for i in 0..10 {
            state.push_exchange(format!("u{i}"), format!("a{i}"), 50);
        }
        let recent = state.recent_history(12);
        assert_eq!(recent.len(), 12);
        assert_eq!(recent[0], Turn::user("u4"));
        assert_eq!(recent[11], Turn::assistant("a9"));
    }

    #[test]
    fn state_serializes_flat() {
        let state = ConversationState::default();
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["state"], "GREETING");
        assert!(json["user_type"].is_null());
        assert!(json["history"].as_array().unwrap().is_empty());
    }
}
