//! Fixed service catalog offered during onboarding.

use serde::{Deserialize, Serialize};

/// One of the four services the assistant can recommend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Service {
    #[serde(rename = "Web Development & Frontend Apps")]
    WebDevelopment,
    #[serde(rename = "Cloud Infrastructure & DevOps")]
    CloudInfrastructure,
    #[serde(rename = "AI Chatbots & Automation")]
    AiAutomation,
    #[serde(rename = "Data Analytics & Insights")]
    DataAnalytics,
}

impl Service {
    /// Catalog order, as presented to users.
    pub const ALL: [Service; 4] = [
        Service::WebDevelopment,
        Service::CloudInfrastructure,
        Service::AiAutomation,
        Service::DataAnalytics,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::WebDevelopment => "Web Development & Frontend Apps",
            Self::CloudInfrastructure => "Cloud Infrastructure & DevOps",
            Self::AiAutomation => "AI Chatbots & Automation",
            Self::DataAnalytics => "Data Analytics & Insights",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::WebDevelopment => {
                "Design and build responsive, accessible web applications with modern stacks tailored to your brand."
            }
            Self::CloudInfrastructure => {
                "Architect, deploy, and operate secure cloud platforms on GCP with automation and observability baked in."
            }
            Self::AiAutomation => {
                "Deliver conversational assistants and workflow automation that integrate with your tools and data."
            }
            Self::DataAnalytics => {
                "Unlock insights with data pipelines, dashboards, and ML models tuned to your KPIs."
            }
        }
    }
}

impl std::fmt::Display for Service {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Render the catalog as `- Name: description` lines.
pub fn format_services_listing() -> String {
    Service::ALL
        .iter()
        .map(|s| format!("- {}: {}", s.name(), s.description()))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listing_has_one_line_per_service_in_order() {
        let listing = format_services_listing();
        let lines: Vec<&str> = listing.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("- Web Development & Frontend Apps: Design"));
        assert!(lines[3].starts_with("- Data Analytics & Insights: "));
    }

    #[test]
    fn display_and_serde_use_catalog_name() {
        for service in Service::ALL {
            let json = serde_json::to_string(&service).unwrap();
            assert_eq!(json, format!("\"{service}\""));
            let parsed: Service = serde_json::from_str(&json).unwrap();
            assert_eq!(parsed, service);
        }
    }

    #[test]
    fn unknown_service_name_is_rejected() {
        assert!(serde_json::from_str::<Service>("\"Quantum Consulting\"").is_err());
    }
}
