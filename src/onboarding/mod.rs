//! Customer onboarding chat.
//!
//! A fixed-stage conversation collects who the prospect is, what they need,
//! and how to reach them, recommending a service along the way. Once
//! complete, the same session answers follow-up questions from the
//! knowledge index.

pub mod manager;
pub mod model;
pub mod prompts;
pub mod routes;
pub mod services;
pub mod state;
pub mod transition;

pub use manager::{
    ChatRequest, ChatResponse, ChatSettings, DebugInfo, OnboardingDeps, OnboardingManager,
};
pub use model::{Email, Slots, UserType};
pub use routes::{ChatRouteState, app, chat_routes};
pub use services::Service;
pub use state::{ConversationState, Stage, Turn};
pub use transition::{Outcome, Transition, advance};
