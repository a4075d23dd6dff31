//! System prompts and scripted fallback replies for onboarding.
//!
//! Both outputs are built from the same stage and slot snapshot, so the
//! scripted reply used when the model is unreachable says what the model
//! was asked to say.

use super::model::Slots;
use super::services::format_services_listing;
use super::state::Stage;

/// Exact reply for questions the knowledge excerpt cannot answer.
pub const I_DONT_KNOW: &str = "I don't know.";

/// Lines of the matched excerpt quoted by the `Done` fallback.
const FALLBACK_EXCERPT_LINES: usize = 6;

const PREAMBLE: &str = "\
You are Zinovia's customer onboarding assistant. \
You guide prospects through a short discovery flow and recommend services. \
Keep responses friendly, concise, and professional. \
If the user asks unrelated questions, answer them briefly and steer back to the flow.";

/// The "next action" directive for a stage.
pub fn stage_instruction(stage: Stage, slots: &Slots) -> String {
    match stage {
        Stage::Greeting => "\
Greet the user warmly, briefly introduce Zinovia's AI solutions, \
and ask what brings them here today."
            .to_string(),

        Stage::AskUserType => "\
Ask the user to identify themselves as an individual, small business, \
or enterprise. If they already implied one, acknowledge it and confirm \
before moving forward."
            .to_string(),

        Stage::AskGoal => {
            "Ask about their primary goal or challenge. Encourage a concise description."
                .to_string()
        }

        Stage::ShowServices => {
            let suggestion = slots
                .selected_service
                .map(|s| s.name())
                .unwrap_or("the service that best fits them");
            format!(
                "Present the available services with short descriptions. \
                 Highlight {suggestion} as a likely fit based on what you know. \
                 After presenting options, transition by asking for their name."
            )
        }

        Stage::CollectContactName => {
            "Politely ask for their name so we can personalize future communications.".to_string()
        }

        Stage::CollectContactEmail => "\
Ask for their email address. Mention that a professional or best contact email \
is ideal and validate that it includes an '@' symbol."
            .to_string(),

        Stage::Summary => "\
Summarize the collected details (user type, goal, recommended service, name, email). \
Confirm we will follow up soon and invite any final questions."
            .to_string(),

        Stage::Done => "\
The onboarding flow is complete. Answer follow-up questions helpfully using the \
service knowledge while remaining friendly and concise."
            .to_string(),
    }
}

/// Build the system prompt sent ahead of the conversation history.
pub fn system_prompt(stage: Stage, slots: &Slots, excerpt: &str, matched: bool) -> String {
    let excerpt = match excerpt.trim() {
        "" => "No knowledge base excerpt available.",
        text => text,
    };
    let knowledge_notice = if matched {
        "The excerpt above is the best-matching knowledge for the latest user request."
    } else {
        "No specific knowledge entry matched the latest user message. \
         If the user asks for information outside this excerpt, reply exactly with \"I don't know.\""
    };

    format!(
        "{PREAMBLE}\n\n\
         Current onboarding state: {stage}\n\
         Structured details so far:\n{details}\n\n\
         Available services:\n{services}\n\n\
         Next action: {instruction}\n\
         Knowledge base excerpt:\n{excerpt}\n\n\
         Guidelines:\n\
         - Use only the knowledge base excerpt above together with the scripted onboarding instructions.\n\
         - Follow the 'Next action' guidance even if the excerpt does not describe it explicitly.\n\
         - If the user requests information not covered in the excerpt, reply exactly with \"{I_DONT_KNOW}\" \
         Do not fabricate details.\n\
         When presenting services, prefer short paragraphs or bullet lists. \
         Thank the user during summary and reassure that a human will follow up soon.\n\
         {knowledge_notice}",
        details = slots.to_prompt_section(),
        services = format_services_listing(),
        instruction = stage_instruction(stage, slots),
    )
}

/// Scripted reply used verbatim when the model call fails.
pub fn fallback_reply(stage: Stage, slots: &Slots, excerpt: &str, matched: bool) -> String {
    match stage {
        Stage::Greeting => {
            "Hello! I'm Zinovia's onboarding assistant. I'd love to hear what brought you here today."
                .to_string()
        }

        Stage::AskUserType => "\
To tailor our guidance, could you let me know if you're exploring as an individual, \
a small business, or an enterprise team?"
            .to_string(),

        Stage::AskGoal => {
            "Thanks! What's the primary goal or challenge you're hoping Zinovia can help with?"
                .to_string()
        }

        Stage::ShowServices => {
            let suggestion = slots
                .selected_service
                .map(|s| s.name())
                .unwrap_or("the option that best aligns with your goal");
            format!(
                "Here are the core ways we help partners:\n{}\n\n\
                 Based on what you've shared so far, {suggestion} could be a great fit. \
                 What name should we attach to the conversation?",
                format_services_listing()
            )
        }

        Stage::CollectContactName => {
            "Great! Could you share the best name to use when we follow up?".to_string()
        }

        Stage::CollectContactEmail => "\
Thanks! What's the best email address so our specialists can reach you? \
A work or professional email works best."
            .to_string(),

        Stage::Summary => format!(
            "Perfect, here's a quick recap:\n{}\n\n\
             Our team will follow up shortly. Feel free to ask anything else meanwhile!",
            recap(slots)
        ),

        Stage::Done => {
            if !matched {
                return I_DONT_KNOW.to_string();
            }
            let snippet = excerpt
                .trim()
                .lines()
                .take(FALLBACK_EXCERPT_LINES)
                .collect::<Vec<_>>()
                .join("\n");
            format!(
                "Here's a quick summary from our knowledge base that matches your question:\n\
                 {snippet}\n\nLet me know if you'd like to explore another area."
            )
        }
    }
}

/// Bullet recap of captured slots for the summary reply.
fn recap(slots: &Slots) -> String {
    let mut details = Vec::new();
    if let Some(user_type) = slots.user_type {
        details.push(format!("- Type: {user_type}"));
    }
    if let Some(goal) = slots.goal.as_deref().filter(|g| !g.is_empty()) {
        details.push(format!("- Goal: {goal}"));
    }
    if let Some(service) = slots.selected_service {
        details.push(format!("- Recommended service: {service}"));
    }
    if let Some(name) = slots.name.as_deref().filter(|n| !n.is_empty()) {
        details.push(format!("- Contact name: {name}"));
    }
    if let Some(ref email) = slots.email {
        details.push(format!("- Email: {email}"));
    }
    if details.is_empty() {
        return "We captured your preferences successfully.".to_string();
    }
    details.join("\n")
}
