//! Onboarding Chat — knowledge-grounded customer onboarding assistant.

pub mod config;
pub mod error;
pub mod knowledge;
pub mod llm;
pub mod onboarding;
pub mod session;
