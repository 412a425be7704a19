//! Prompt assembly
//!
//! A chat prompt is always laid out the same way:
//!
//! ```text
//! system     SYSTEM_PROMPT
//! user       <history turn 1>
//! assistant  <history turn 2>
//! ...
//! user       User Dosha / Ayurveda rules / Knowledge context / User question
//! ```
//!
//! The generation service relies on this order; the sections of the final
//! user message must also stay in this order.

use serde::{Deserialize, Serialize};

use crate::rules::RuleSet;
use crate::session::{Turn, TurnRole};

/// Default system instruction for the dietician chat.
pub const SYSTEM_PROMPT: &str = "\
You are an Ayurvedic dietician chatbot.

You converse naturally, but ONLY about:
- food
- diet
- dosha
- digestion
- prakriti
- lifestyle

Rules:
- always keep the user's dosha in mind
- always recommend alternatives
- if a food should be avoided, suggest better options
- keep a conversational tone
- keep answers concise and to the point
- give reasoning in one or two lines only
";

/// System instruction for structured single-food advice.
pub const FOOD_SYSTEM_PROMPT: &str = "\
You are an Ayurvedic dietician.

Rules:
- Only answer diet, dosha, and food questions
- Use the Ayurveda context provided
- Never give medical advice
- Follow the structured format

Response format:

Suitability:
Dosha Impact:
Digestive Effect:
Season Advice:
Recommendation:
";

/// Role of a prompt message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl From<TurnRole> for Role {
    fn from(role: TurnRole) -> Self {
        match role {
            TurnRole::User => Role::User,
            TurnRole::Assistant => Role::Assistant,
        }
    }
}

/// A role-tagged prompt message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

impl From<&Turn> for Message {
    fn from(turn: &Turn) -> Self {
        Self {
            role: turn.role.into(),
            content: turn.content.clone(),
        }
    }
}

/// Build the message sequence for one chat request.
///
/// The result is one system message, every history turn in order, then a
/// single user message carrying the constitution type, rule set, retrieved
/// context and question.
pub fn assemble(
    system_instruction: &str,
    history: &[Turn],
    rule_set: &RuleSet,
    retrieved_context: &str,
    constitution_type: &str,
    question: &str,
) -> Vec<Message> {
    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(Message::system(system_instruction));
    messages.extend(history.iter().map(Message::from));
    messages.push(Message::user(render_question(
        constitution_type,
        rule_set,
        retrieved_context,
        question,
    )));
    messages
}

/// Body of the final user message of a chat prompt.
pub fn render_question(
    constitution_type: &str,
    rule_set: &RuleSet,
    retrieved_context: &str,
    question: &str,
) -> String {
    format!(
        "User Dosha: {constitution_type}\n\n\
         Ayurveda rules:\n{}\n\n\
         Knowledge context:\n{retrieved_context}\n\n\
         User question:\n{question}\n",
        render_rules(rule_set)
    )
}

/// Retrieval query used for single-food advice.
pub fn food_query(food: &str) -> String {
    format!("Ayurveda advice for {food}")
}

/// Build the two-message prompt for structured single-food advice.
pub fn assemble_food_query(
    constitution_type: &str,
    food: &str,
    goal: &str,
    rule_set: &RuleSet,
    retrieved_context: &str,
) -> Vec<Message> {
    let body = format!(
        "User Dosha: {constitution_type}\n\
         Goal: {goal}\n\
         Food: {food}\n\n\
         Rule Data:\n{}\n\n\
         Ayurveda Knowledge:\n{retrieved_context}\n",
        render_rules(rule_set)
    );
    vec![Message::system(FOOD_SYSTEM_PROMPT), Message::user(body)]
}

fn render_rules(rule_set: &RuleSet) -> String {
    serde_json::to_string(rule_set).unwrap_or_else(|_| "{}".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::FoodRules;

    fn pitta_rules() -> RuleSet {
        let mut rules = RuleSet::new();
        rules.insert(
            "Spices".to_string(),
            FoodRules {
                avoid: vec!["Chili pepper".to_string()],
                favor: vec!["Coriander".to_string()],
            },
        );
        rules
    }

    #[test]
    fn test_assemble_without_history() {
        let messages = assemble(SYSTEM_PROMPT, &[], &pitta_rules(), "ctx", "Pitta", "Is chilli ok?");

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0], Message::system(SYSTEM_PROMPT));
        assert_eq!(messages[1].role, Role::User);
        assert!(messages[1].content.contains("Is chilli ok?"));
    }

    #[test]
    fn test_history_between_system_and_question() {
        let history = vec![
            Turn::user("What is my dosha?"),
            Turn::assistant("You told me Pitta."),
        ];
        let messages = assemble("sys", &history, &RuleSet::new(), "", "Pitta", "And mint?");

        let roles: Vec<Role> = messages.iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::System, Role::User, Role::Assistant, Role::User]);
        assert_eq!(messages[1].content, "What is my dosha?");
        assert_eq!(messages[2].content, "You told me Pitta.");
        assert!(messages[3].content.ends_with("And mint?\n"));
        assert_eq!(messages.iter().filter(|m| m.role == Role::System).count(), 1);
    }

    #[test]
    fn test_question_sections_in_order() {
        let body = render_question("Pitta", &pitta_rules(), "Cooling foods help.", "Is chilli ok?");

        let dosha = body.find("User Dosha: Pitta").unwrap();
        let rules = body.find("Chili pepper").unwrap();
        let context = body.find("Cooling foods help.").unwrap();
        let question = body.find("Is chilli ok?").unwrap();
        assert!(dosha < rules && rules < context && context < question);
    }

    #[test]
    fn test_rules_serialized_as_json() {
        let body = render_question("Pitta", &pitta_rules(), "", "q");
        assert!(body.contains(r#"{"Spices":{"avoid":["Chili pepper"],"favor":["Coriander"]}}"#));
    }

    #[test]
    fn test_empty_rule_set_renders_braces() {
        let body = render_question("Unknown", &RuleSet::new(), "", "q");
        assert!(body.contains("Ayurveda rules:\n{}\n"));
    }

    #[test]
    fn test_food_query_prompt() {
        assert_eq!(food_query("mango"), "Ayurveda advice for mango");

        let messages = assemble_food_query("Vata", "mango", "weight gain", &RuleSet::new(), "Mango is sweet.");
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].content, FOOD_SYSTEM_PROMPT);
        assert!(messages[1].content.contains("Goal: weight gain"));
        assert!(messages[1].content.contains("Food: mango"));
        assert!(messages[1].content.contains("Mango is sweet."));
    }
}
