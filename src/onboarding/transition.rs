//! The onboarding transition function.
//!
//! `advance` is pure: the same stage, slots, message, and first-turn flag
//! always produce the same result. Classification misses and invalid emails
//! are not errors; the conversation simply stays in place.

use super::model::{Email, Slots, UserType};
use super::services::Service;
use super::state::Stage;

/// User-type phrases, checked in order. The first three are the canonical
/// names; the rest are synonyms. Each phrase appears once.
const USER_TYPE_PHRASES: &[(&str, UserType)] = &[
    ("individual", UserType::Individual),
    ("small business", UserType::SmallBusiness),
    ("enterprise", UserType::Enterprise),
    ("startup", UserType::SmallBusiness),
    ("company", UserType::Enterprise),
    ("corporate", UserType::Enterprise),
    ("freelancer", UserType::Individual),
    ("personal", UserType::Individual),
];

/// Goal keywords, checked in order; the first hit wins.
const SERVICE_KEYWORDS: &[(&str, Service)] = &[
    ("website", Service::WebDevelopment),
    ("web", Service::WebDevelopment),
    ("cloud", Service::CloudInfrastructure),
    ("devops", Service::CloudInfrastructure),
    ("infrastructure", Service::CloudInfrastructure),
    ("ai", Service::AiAutomation),
    ("automation", Service::AiAutomation),
    ("data", Service::DataAnalytics),
    ("analytics", Service::DataAnalytics),
];

/// Classify a message as a user type by case-insensitive substring match.
pub fn detect_user_type(message: &str) -> Option<UserType> {
    let cleaned = message.trim().to_lowercase();
    USER_TYPE_PHRASES
        .iter()
        .find(|(phrase, _)| cleaned.contains(phrase))
        .map(|(_, user_type)| *user_type)
}

/// Pick a service from the goal text, else from the user type.
pub fn detect_service(goal: &str, user_type: Option<UserType>) -> Option<Service> {
    let goal = goal.to_lowercase();
    SERVICE_KEYWORDS
        .iter()
        .find(|(keyword, _)| goal.contains(keyword))
        .map(|(_, service)| *service)
        .or_else(|| user_type.map(|t| t.default_service()))
}

/// What a transition did, as far as prompting is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Input not accepted; stage unchanged.
    Stayed,
    /// Moved to the next stage (or `Done` looped).
    Advanced,
    /// Moved forward, but the reply should be composed for the given stage.
    AdvancedPromptAs(Stage),
}

/// Result of one step of the state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub stage: Stage,
    pub slots: Slots,
    pub outcome: Outcome,
}

impl Transition {
    fn stay(stage: Stage, slots: &Slots) -> Self {
        Self {
            stage,
            slots: slots.clone(),
            outcome: Outcome::Stayed,
        }
    }

    fn to(stage: Stage, slots: Slots) -> Self {
        Self {
            stage,
            slots,
            outcome: Outcome::Advanced,
        }
    }

    /// Stage whose instruction and fallback reply should be used.
    pub fn prompt_stage(&self) -> Stage {
        match self.outcome {
            Outcome::AdvancedPromptAs(stage) => stage,
            Outcome::Stayed | Outcome::Advanced => self.stage,
        }
    }
}

/// Apply one user message to the conversation.
///
/// `first_turn` is true when the session has no history yet. The very first
/// message leaves `Greeting` like any other, but the reply is still a
/// greeting.
pub fn advance(stage: Stage, slots: &Slots, message: &str, first_turn: bool) -> Transition {
    let message = message.trim();

    match stage {
        Stage::Greeting => {
            let mut transition = Transition::to(Stage::AskUserType, slots.clone());
            if first_turn {
                transition.outcome = Outcome::AdvancedPromptAs(Stage::Greeting);
            }
            transition
        }
        Stage::AskUserType => match detect_user_type(message) {
            Some(user_type) => Transition::to(
                Stage::AskGoal,
                Slots {
                    user_type: Some(user_type),
                    ..slots.clone()
                },
            ),
            None => {
                tracing::debug!(text = %message, "User type not detected");
                Transition::stay(stage, slots)
            }
        },
        Stage::AskGoal => Transition::to(
            Stage::ShowServices,
            Slots {
                goal: Some(message.to_string()),
                selected_service: detect_service(message, slots.user_type),
                ..slots.clone()
            },
        ),
        Stage::ShowServices => Transition::to(Stage::CollectContactName, slots.clone()),
        Stage::CollectContactName => {
            if message.is_empty() {
                return Transition::stay(stage, slots);
            }
            Transition::to(
                Stage::CollectContactEmail,
                Slots {
                    name: Some(message.to_string()),
                    ..slots.clone()
                },
            )
        }
        Stage::CollectContactEmail => match Email::parse(message) {
            Some(email) => Transition::to(
                Stage::Summary,
                Slots {
                    email: Some(email),
                    ..slots.clone()
                },
            ),
            None => {
                tracing::debug!(text = %message, "Invalid email supplied");
                Transition::stay(stage, slots)
            }
        },
        Stage::Summary => Transition::to(Stage::Done, slots.clone()),
        Stage::Done => Transition::to(Stage::Done, slots.clone()),
    }
}
