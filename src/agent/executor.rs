//! `DomainAgentExecutor`: the bounded LLM↔tool loop (spec.md §4.4).
//!
//! The direct structural descendant of `agent/loop_.rs`'s `AgentLoop`: the
//! bounded LOOP state machine, tool-error-as-value handling, and sequential
//! per-round tool execution are all carried over. What does not carry over:
//! the approval/event-bus gate and `SecurityPolicy::classify_command_risk`
//! shell-risk logic are teacher-specific (spec.md has no human-in-the-loop
//! concept) and are not reproduced here.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use serde_json::Value;

use super::entities::extract_entities;
use super::handler_registry::{ExecutorDeps, ExecutorStrategy};
use super::{AgentContext, AgentResult};
use crate::error::AppError;
use crate::llm::types::{ChatMessage, CompletionRequest, ToolDescriptor};
use crate::tools::CallableTool;

/// Tool results are truncated before being fed back to the LLM in the next
/// round (spec.md §9 Open Question, resolved as: truncate to 8 KB with an
/// ellipsis marker).
const TOOL_RESULT_TRUNCATE_BYTES: usize = 8 * 1024;

pub struct DomainAgentExecutor;

#[async_trait]
impl ExecutorStrategy for DomainAgentExecutor {
    async fn invoke(&self, ctx: AgentContext<'_>, deps: &ExecutorDeps) -> Result<AgentResult, AppError> {
        let start = Instant::now();

        let client = deps.llm_manager.get_client(&ctx.tenant_id).await?;
        let tools = deps
            .tool_registry
            .load_tools_for_agent(&ctx.agent.id, &ctx.tenant_id)?;

        let history = deps.memory.history(
            &ctx.session_id,
            deps.config.limits.max_history_messages as i64,
            false,
        );

        let entities = extract_entities(
            client.as_ref(),
            &ctx.user_text,
            tools.first().map(|t| t.parameters_schema()),
        )
        .await;

        let loop_result = run_loop(
            client.as_ref(),
            &tools,
            &ctx.agent.system_prompt,
            &ctx.language,
            history,
            &ctx.user_text,
            &ctx.bearer_token,
            deps.config.limits.max_rounds,
        )
        .await?;

        Ok(AgentResult {
            text: loop_result.text,
            tool_calls_made: loop_result.tool_calls_made,
            entities_extracted: entities,
            llm_model: client.model_tag().to_string(),
            duration_ms: start.elapsed().as_millis() as i64,
            overflow: loop_result.overflow,
        })
    }
}

struct LoopResult {
    text: String,
    tool_calls_made: Vec<String>,
    overflow: bool,
}

/// The bounded LLM↔tool loop, isolated from database/cache setup so it can
/// be exercised directly in tests with a mock `ChatClient` and mock tools
/// (spec.md §9 "tests substitute in-memory implementations via constructor
/// injection").
async fn run_loop(
    client: &dyn crate::llm::provider::ChatClient,
    tools: &[Arc<dyn CallableTool>],
    system_prompt_text: &str,
    language: &str,
    history: Vec<ChatMessage>,
    user_text: &str,
    bearer_token: &str,
    max_rounds: u32,
) -> Result<LoopResult, AppError> {
    if tools.is_empty() {
        // DIRECT path (spec.md §4.4 step 3).
        let mut messages = vec![ChatMessage::system(system_prompt(system_prompt_text, language, &[]))];
        messages.extend(history);
        messages.push(ChatMessage::user(user_text.to_string()));

        let response = client.complete(CompletionRequest::new(messages)).await?;
        return Ok(LoopResult { text: response.content, tool_calls_made: Vec::new(), overflow: false });
    }

    let tool_descriptors: Vec<ToolDescriptor> = tools
        .iter()
        .map(|t| ToolDescriptor {
            name: t.name().to_string(),
            description: t.description().to_string(),
            parameters: t.parameters_schema().clone(),
        })
        .collect();

    let mut messages = vec![ChatMessage::system(system_prompt(system_prompt_text, language, &tool_descriptors))];
    messages.extend(history);
    messages.push(ChatMessage::user(user_text.to_string()));

    let mut tool_calls_made = Vec::new();
    let mut overflow = false;
    let mut final_text = String::new();

    for round in 0..max_rounds {
        let request = CompletionRequest::new(messages.clone()).with_tools(tool_descriptors.clone());
        let response = client.complete(request).await?;

        if response.tool_calls.is_empty() {
            final_text = response.content;
            break;
        }

        messages.push(ChatMessage::assistant(response.content.clone()));

        for call in &response.tool_calls {
            tool_calls_made.push(call.name.clone());

            let outcome = match tools.iter().find(|t| t.name() == call.name) {
                Some(tool) => invoke_tool(tool.as_ref(), call.arguments.clone(), bearer_token).await,
                None => serde_json::json!({"error": "unknown_tool", "name": call.name}),
            };

            messages.push(ChatMessage::tool(truncate(&outcome.to_string())));
        }

        if round + 1 == max_rounds {
            overflow = true;
            final_text = response.content;
        }
    }

    Ok(LoopResult { text: final_text, tool_calls_made, overflow })
}

async fn invoke_tool(tool: &dyn CallableTool, arguments: Value, bearer_token: &str) -> Value {
    let outcome = tool.invoke(arguments, bearer_token).await;
    outcome.output
}

fn truncate(text: &str) -> String {
    if text.len() <= TOOL_RESULT_TRUNCATE_BYTES {
        return text.to_string();
    }
    let mut cut = TOOL_RESULT_TRUNCATE_BYTES;
    while !text.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}... [truncated]", &text[..cut])
}

fn system_prompt(base_prompt: &str, language: &str, tools: &[ToolDescriptor]) -> String {
    let mut prompt = base_prompt.to_string();
    prompt.push_str(&format!("\n\nRespond in language: {language}."));
    if !tools.is_empty() {
        prompt.push_str("\n\nAvailable tools:\n");
        for tool in tools {
            prompt.push_str(&format!(
                "- {}: {} (schema: {})\n",
                tool.name, tool.description, tool.parameters
            ));
        }
    }
    prompt
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use serde_json::json;
    use tokio::sync::Mutex;

    use super::*;
    use crate::llm::provider::ChatClient;
    use crate::llm::types::CompletionResponse;

    #[test]
    fn truncates_long_tool_results_with_marker() {
        let long = "a".repeat(TOOL_RESULT_TRUNCATE_BYTES + 100);
        let truncated = truncate(&long);
        assert!(truncated.ends_with("... [truncated]"));
        assert!(truncated.len() < long.len());
    }

    #[test]
    fn short_tool_results_are_untouched() {
        assert_eq!(truncate("hello"), "hello");
    }

    /// Returns a scripted sequence of responses, one per call, and records
    /// every request it was given.
    struct MockChatClient {
        responses: Mutex<Vec<CompletionResponse>>,
        calls: AtomicUsize,
    }

    impl MockChatClient {
        fn scripted(responses: Vec<CompletionResponse>) -> Self {
            Self { responses: Mutex::new(responses), calls: AtomicUsize::new(0) }
        }
    }

    #[async_trait]
    impl ChatClient for MockChatClient {
        async fn complete(&self, _request: CompletionRequest) -> Result<CompletionResponse, AppError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut responses = self.responses.lock().await;
            if responses.is_empty() {
                return Ok(CompletionResponse::default());
            }
            Ok(responses.remove(0))
        }

        fn model_tag(&self) -> &str {
            "mock-model"
        }
    }

    /// A tool that always echoes its arguments back as the output, mirroring
    /// the teacher's `EchoTool` test fixture.
    struct EchoTool {
        schema: Value,
    }

    #[async_trait]
    impl CallableTool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }

        fn description(&self) -> &str {
            "echoes its arguments"
        }

        fn parameters_schema(&self) -> &Value {
            &self.schema
        }

        async fn invoke(&self, arguments: Value, _bearer_token: &str) -> crate::tools::ToolOutcome {
            crate::tools::ToolOutcome::ok(arguments)
        }
    }

    fn echo_tool() -> Arc<dyn CallableTool> {
        Arc::new(EchoTool { schema: json!({"type": "object", "properties": {}}) })
    }

    #[tokio::test]
    async fn direct_path_used_when_no_tools_are_available() {
        let client = MockChatClient::scripted(vec![CompletionResponse {
            content: "hello there".to_string(),
            tool_calls: vec![],
            model: "mock-model".to_string(),
        }]);

        let result = run_loop(&client, &[], "You are helpful.", "en", vec![], "hi", "token", 4)
            .await
            .unwrap();

        assert_eq!(result.text, "hello there");
        assert!(result.tool_calls_made.is_empty());
        assert!(!result.overflow);
        assert_eq!(client.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn resolves_after_one_tool_call_round() {
        let client = MockChatClient::scripted(vec![
            CompletionResponse {
                content: String::new(),
                tool_calls: vec![crate::llm::types::ProposedToolCall {
                    call_id: "call-1".to_string(),
                    name: "echo".to_string(),
                    arguments: json!({"x": 1}),
                }],
                model: "mock-model".to_string(),
            },
            CompletionResponse {
                content: "done".to_string(),
                tool_calls: vec![],
                model: "mock-model".to_string(),
            },
        ]);

        let tools = vec![echo_tool()];
        let result = run_loop(&client, &tools, "You are helpful.", "en", vec![], "run echo", "token", 4)
            .await
            .unwrap();

        assert_eq!(result.text, "done");
        assert_eq!(result.tool_calls_made, vec!["echo".to_string()]);
        assert!(!result.overflow);
        assert_eq!(client.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn unknown_tool_call_is_reported_without_failing_the_loop() {
        let client = MockChatClient::scripted(vec![
            CompletionResponse {
                content: String::new(),
                tool_calls: vec![crate::llm::types::ProposedToolCall {
                    call_id: "call-1".to_string(),
                    name: "does_not_exist".to_string(),
                    arguments: json!({}),
                }],
                model: "mock-model".to_string(),
            },
            CompletionResponse {
                content: "fallback answer".to_string(),
                tool_calls: vec![],
                model: "mock-model".to_string(),
            },
        ]);

        let tools = vec![echo_tool()];
        let result = run_loop(&client, &tools, "You are helpful.", "en", vec![], "call bogus tool", "token", 4)
            .await
            .unwrap();

        assert_eq!(result.text, "fallback answer");
        assert_eq!(result.tool_calls_made, vec!["does_not_exist".to_string()]);
        assert!(!result.overflow);
    }

    #[tokio::test]
    async fn exhausting_max_rounds_sets_overflow() {
        let looping_response = || CompletionResponse {
            content: "still working".to_string(),
            tool_calls: vec![crate::llm::types::ProposedToolCall {
                call_id: "call-1".to_string(),
                name: "echo".to_string(),
                arguments: json!({}),
            }],
            model: "mock-model".to_string(),
        };
        let client = MockChatClient::scripted(vec![
            looping_response(),
            looping_response(),
        ]);

        let tools = vec![echo_tool()];
        let result = run_loop(&client, &tools, "You are helpful.", "en", vec![], "loop forever", "token", 2)
            .await
            .unwrap();

        assert!(result.overflow);
        assert_eq!(result.tool_calls_made.len(), 2);
        assert_eq!(client.calls.load(Ordering::SeqCst), 2);
    }
}
