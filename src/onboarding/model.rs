//! Structured slots extracted from the onboarding conversation.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::services::Service;

/// Who the prospect is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserType {
    Individual,
    SmallBusiness,
    Enterprise,
}

impl UserType {
    /// Service recommended when the stated goal names none.
    pub fn default_service(&self) -> Service {
        match self {
            Self::Individual => Service::AiAutomation,
            Self::SmallBusiness => Service::WebDevelopment,
            Self::Enterprise => Service::CloudInfrastructure,
        }
    }
}

impl std::fmt::Display for UserType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Individual => write!(f, "individual"),
            Self::SmallBusiness => write!(f, "small_business"),
            Self::Enterprise => write!(f, "enterprise"),
        }
    }
}

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email pattern is valid")
});

/// An email address that passed the shape check. Can only be built through
/// [`Email::parse`], including when deserialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Email(String);

impl Email {
    /// `local@domain.tld` where no part is empty or contains `@` or whitespace.
    pub fn parse(raw: &str) -> Option<Self> {
        EMAIL_RE.is_match(raw).then(|| Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Email {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value).ok_or_else(|| format!("invalid email address: {value}"))
    }
}

impl From<Email> for String {
    fn from(email: Email) -> Self {
        email.0
    }
}

impl std::fmt::Display for Email {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Slots captured so far. All start unset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slots {
    pub user_type: Option<UserType>,
    pub goal: Option<String>,
    pub selected_service: Option<Service>,
    pub name: Option<String>,
    pub email: Option<Email>,
}

impl Slots {
    /// `Label: value` lines for every captured slot, in slot order.
    pub fn detail_lines(&self) -> Vec<(&'static str, String)> {
        let mut lines = Vec::new();
        if let Some(user_type) = self.user_type {
            lines.push(("User type", user_type.to_string()));
        }
        if let Some(goal) = self.goal.as_deref().filter(|g| !g.is_empty()) {
            lines.push(("Goal", goal.to_string()));
        }
        if let Some(service) = self.selected_service {
            lines.push(("Suggested service", service.to_string()));
        }
        if let Some(name) = self.name.as_deref().filter(|n| !n.is_empty()) {
            lines.push(("Name", name.to_string()));
        }
        if let Some(ref email) = self.email {
            lines.push(("Email", email.to_string()));
        }
        lines
    }

    /// Render captured slots for the system prompt.
    pub fn to_prompt_section(&self) -> String {
        let lines = self.detail_lines();
        if lines.is_empty() {
            return "No structured details captured yet.".to_string();
        }
        lines
            .iter()
            .map(|(label, value)| format!("{label}: {value}"))
            .collect::<Vec<_>>()
            .join("\n")
    }
}
