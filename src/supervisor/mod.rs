//! `SupervisorRouter`: classifies an inbound message into one authorized
//! agent or a clarification outcome (spec.md §4.5).
//!
//! Grounded on `services/router.rs`'s classify-then-route shape: a single
//! heuristic/LLM classification step picks a target, falling back to a
//! logged "no suitable target" outcome. Here the classifier is always the
//! tenant's bound LLM rather than a static heuristic, and the target is an
//! agent name rather than a model id.

use diesel::prelude::*;

use crate::db::{models, schema, DbPool};
use crate::error::AppError;
use crate::llm::provider::ChatClient;
use crate::llm::types::{ChatMessage, CompletionRequest};

pub const MULTI_INTENT: &str = "MULTI_INTENT";
pub const UNCLEAR: &str = "UNCLEAR";

const MAX_CLASSIFICATION_HISTORY: usize = 10;

/// Outcome of `SupervisorRouter::route`.
#[derive(Debug, Clone)]
pub enum RouteOutcome {
    /// A single authorized agent was identified.
    Agent(models::AgentSpec),
    /// The message asked for more than one thing at once.
    MultiIntent,
    /// No authorized agent matched and the message was not multi-intent.
    Unclear,
}

pub struct SupervisorRouter {
    pool: DbPool,
}

impl SupervisorRouter {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Loads agents granted to `tenant_id` and enabled, joined with active
    /// `AgentSpec` rows (spec.md §3 invariants, §4.5 "Initialization").
    fn load_authorized_agents(&self, tenant_id: &str) -> Result<Vec<models::AgentSpec>, AppError> {
        let mut conn = self
            .pool
            .get()
            .map_err(|e| AppError::StoreError(e.to_string()))?;

        let agent_ids: Vec<String> = schema::tenant_agent_grants::table
            .filter(schema::tenant_agent_grants::tenant_id.eq(tenant_id))
            .filter(schema::tenant_agent_grants::enabled.eq(1))
            .select(schema::tenant_agent_grants::agent_id)
            .load(&mut conn)
            .map_err(|e| AppError::StoreError(e.to_string()))?;

        if agent_ids.is_empty() {
            return Ok(Vec::new());
        }

        schema::agent_specs::table
            .filter(schema::agent_specs::id.eq_any(agent_ids))
            .filter(schema::agent_specs::active.eq(1))
            .select(models::AgentSpec::as_select())
            .load(&mut conn)
            .map_err(|e| AppError::StoreError(e.to_string()))
    }

    /// Classifies `user_text` against the tenant's authorized agent set and
    /// returns the routing outcome (spec.md §4.5 "Intent classification").
    pub async fn route(
        &self,
        tenant_id: &str,
        client: &dyn ChatClient,
        history: Vec<ChatMessage>,
        user_text: &str,
    ) -> Result<RouteOutcome, AppError> {
        let agents = self.load_authorized_agents(tenant_id)?;
        if agents.is_empty() {
            return Ok(RouteOutcome::Unclear);
        }

        let language = detect_language(user_text);
        let system_prompt = classification_prompt(&agents, &language);

        let bounded_history: Vec<ChatMessage> = history
            .into_iter()
            .rev()
            .take(MAX_CLASSIFICATION_HISTORY)
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect();

        let mut messages = vec![ChatMessage::system(system_prompt)];
        messages.extend(bounded_history);
        messages.push(ChatMessage::user(user_text.to_string()));

        let response = client.complete(CompletionRequest::new(messages)).await?;

        Ok(classify(&response.content, &agents))
    }
}

/// Vietnamese-specific character range test (spec.md §4.5 "Language
/// detection"). Covers Vietnamese letters with diacritics outside plain
/// Latin-1 plus the combining tone marks used in decomposed text.
pub fn detect_language(text: &str) -> String {
    let is_vietnamese_char = |c: char| {
        matches!(c as u32, 0x00C0..=0x1EF9) && !matches!(c as u32, 0x00C0..=0x00FF) || matches!(c as u32, 0x0300..=0x0323)
    };
    if text.chars().any(is_vietnamese_char) {
        "vi".to_string()
    } else {
        "en".to_string()
    }
}

fn classification_prompt(agents: &[models::AgentSpec], language: &str) -> String {
    let mut prompt = String::from(
        "You are a routing classifier. Read the user's message and decide which single \
         agent should handle it. Respond with exactly one of the following agent names, \
         or the literal token MULTI_INTENT if the message asks for more than one distinct \
         thing, or UNCLEAR if no agent applies. Respond with nothing else.\n\nAgents:\n",
    );
    for agent in agents {
        prompt.push_str(&format!("- {} — {}\n", agent.name, first_line(&agent.system_prompt)));
    }
    prompt.push_str(&format!("\nDetected language: {language}."));
    prompt
}

fn first_line(text: &str) -> &str {
    text.lines().next().unwrap_or(text)
}

/// Applies spec.md §4.5's "Tie-breaking" rule: the first line that exactly
/// equals an authorized agent name wins; `MULTI_INTENT` wins verbatim;
/// anything else is `UNCLEAR`.
fn classify(raw_response: &str, agents: &[models::AgentSpec]) -> RouteOutcome {
    for line in raw_response.lines() {
        let candidate = line.trim();
        if candidate == MULTI_INTENT {
            return RouteOutcome::MultiIntent;
        }
        if let Some(agent) = agents.iter().find(|a| a.name == candidate) {
            return RouteOutcome::Agent(agent.clone());
        }
    }
    RouteOutcome::Unclear
}

/// Canned, localized clarification strings (spec.md §9 Open Question:
/// canned, not LLM-phrased).
pub fn multi_intent_message(language: &str) -> String {
    if language == "vi" {
        "Vui lòng hỏi từng việc một. Bạn có thể diễn đạt lại yêu cầu thành một câu hỏi duy nhất không?".to_string()
    } else {
        "Please ask one thing at a time. Could you rephrase your request as a single question?".to_string()
    }
}

pub fn unclear_message(language: &str) -> String {
    if language == "vi" {
        "Xin lỗi, tôi chưa hiểu rõ yêu cầu của bạn. Bạn có thể diễn đạt lại không?".to_string()
    } else {
        "Sorry, I couldn't understand your request. Could you rephrase it?".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn agent(name: &str) -> models::AgentSpec {
        models::AgentSpec {
            id: name.to_string(),
            name: name.to_string(),
            system_prompt: "You help with things.".to_string(),
            llm_model_id: "model-1".to_string(),
            handler_class: "generic".to_string(),
            active: 1,
        }
    }

    #[test]
    fn detects_english_by_default() {
        assert_eq!(detect_language("What is the debt for MST 0123456789012?"), "en");
    }

    #[test]
    fn detects_vietnamese_diacritics() {
        assert_eq!(detect_language("Xin chào, tôi muốn hỏi về công nợ"), "vi");
    }

    #[test]
    fn classify_exact_agent_name_wins() {
        let agents = vec![agent("AgentDebt"), agent("AgentSales")];
        match classify("AgentDebt", &agents) {
            RouteOutcome::Agent(a) => assert_eq!(a.name, "AgentDebt"),
            _ => panic!("expected agent match"),
        }
    }

    #[test]
    fn classify_first_matching_line_wins_over_trailing_noise() {
        let agents = vec![agent("AgentDebt")];
        let raw = "AgentDebt\nI chose this because it matches.";
        match classify(raw, &agents) {
            RouteOutcome::Agent(a) => assert_eq!(a.name, "AgentDebt"),
            _ => panic!("expected agent match"),
        }
    }

    #[test]
    fn classify_multi_intent_token() {
        let agents = vec![agent("AgentDebt")];
        matches!(classify("MULTI_INTENT", &agents), RouteOutcome::MultiIntent);
    }

    #[test]
    fn classify_unrecognized_text_is_unclear() {
        let agents = vec![agent("AgentDebt")];
        matches!(classify("I have no idea", &agents), RouteOutcome::Unclear);
    }
}
