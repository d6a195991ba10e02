//! Language model decision service
//!
//! The hosted model is an opaque external collaborator: the assistant submits
//! conversation state plus tool descriptors and receives back the next
//! action — a final answer or a tool-call intent. Routing and tool selection
//! happen inside the model, never in this crate.
//!
//! `ChatCompletionsClient` speaks the OpenAI-compatible chat completions
//! shape, which covers every configured provider (openai, nvidia, ollama)
//! with nothing but a different base URL and key.

use crate::config::{AgentModelConfig, Provider};
use crate::error::AssistantError;
use crate::models::{AgentMessage, Role};
use crate::Result;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, error};

/// Tool metadata handed to the model with each request
#[derive(Debug, Clone, Serialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// The model's next-action intent
#[derive(Debug, Clone)]
pub enum Decision {
    /// Final answer text for this turn
    Respond(String),
    /// Invoke a tool with the given JSON arguments
    CallTool { name: String, arguments: Value },
}

#[async_trait::async_trait]
pub trait LanguageModel: Send + Sync {
    async fn decide(
        &self,
        system_prompt: &str,
        transcript: &[AgentMessage],
        tools: &[ToolDescriptor],
    ) -> Result<Decision>;
}

//
// ================= Chat completions client =================
//

pub struct ChatCompletionsClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
    temperature: f32,
}

impl ChatCompletionsClient {
    pub fn new(
        provider: Provider,
        api_key: Option<String>,
        config: &AgentModelConfig,
    ) -> Result<Self> {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(8)
            .timeout(Duration::from_secs(120))
            .build()?;

        Ok(Self {
            client,
            base_url: provider.base_url().to_string(),
            api_key,
            model: config.model.clone(),
            temperature: config.temperature,
        })
    }

    fn wire_messages(
        system_prompt: &str,
        transcript: &[AgentMessage],
    ) -> Vec<WireMessage> {
        let mut messages = Vec::with_capacity(transcript.len() + 1);
        messages.push(WireMessage {
            role: "system".to_string(),
            content: system_prompt.to_string(),
            name: None,
        });

        for message in transcript {
            let (role, content) = match message.role {
                Role::User => ("user", message.content.clone()),
                Role::Assistant if !message.tool_calls.is_empty() => {
                    // Collapse tool-call turns to text so providers without
                    // strict tool-message threading still follow the context.
                    let calls: Vec<String> = message
                        .tool_calls
                        .iter()
                        .map(|c| format!("{}({})", c.name, c.arguments))
                        .collect();
                    ("assistant", format!("[called {}]", calls.join(", ")))
                }
                Role::Assistant => ("assistant", message.content.clone()),
                Role::Tool => (
                    "user",
                    format!("Tool {} returned: {}", message.name, message.content),
                ),
                Role::System => ("system", message.content.clone()),
            };
            messages.push(WireMessage {
                role: role.to_string(),
                content,
                name: Some(message.name.clone()),
            });
        }
        messages
    }
}

#[async_trait::async_trait]
impl LanguageModel for ChatCompletionsClient {
    async fn decide(
        &self,
        system_prompt: &str,
        transcript: &[AgentMessage],
        tools: &[ToolDescriptor],
    ) -> Result<Decision> {
        let url = format!("{}/chat/completions", self.base_url);

        let wire_tools: Vec<WireTool> = tools
            .iter()
            .map(|t| WireTool {
                kind: "function".to_string(),
                function: t.clone(),
            })
            .collect();

        let request = ChatRequest {
            model: &self.model,
            temperature: self.temperature,
            messages: Self::wire_messages(system_prompt, transcript),
            tools: if wire_tools.is_empty() {
                None
            } else {
                Some(wire_tools)
            },
        };

        debug!(model = %self.model, turns = transcript.len(), "Chat completions request");

        let mut builder = self.client.post(&url).json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await.map_err(|e| {
            error!("Chat completions request failed: {}", e);
            AssistantError::Llm(format!("Chat completions request failed: {}", e))
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("Chat completions error response: {}", body);
            return Err(AssistantError::Llm(format!(
                "Provider returned {}: {}",
                status, body
            )));
        }

        let parsed: ChatResponse = response.json().await.map_err(|e| {
            AssistantError::Llm(format!("Failed to parse chat completions response: {}", e))
        })?;

        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| AssistantError::Llm("No choices in response".to_string()))?;

        if let Some(call) = choice.message.tool_calls.and_then(|mut calls| {
            if calls.is_empty() {
                None
            } else {
                Some(calls.remove(0))
            }
        }) {
            let arguments: Value = serde_json::from_str(&call.function.arguments)
                .map_err(|e| {
                    AssistantError::Llm(format!(
                        "Tool call arguments are not valid JSON: {} | raw={}",
                        e, call.function.arguments
                    ))
                })?;
            return Ok(Decision::CallTool {
                name: call.function.name,
                arguments,
            });
        }

        Ok(Decision::Respond(choice.message.content.unwrap_or_default()))
    }
}

//
// ================= Wire types =================
//

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<WireTool>>,
}

#[derive(Debug, Serialize)]
struct WireMessage {
    role: String,
    content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
}

#[derive(Debug, Serialize)]
struct WireTool {
    #[serde(rename = "type")]
    kind: String,
    function: ToolDescriptor,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
    tool_calls: Option<Vec<WireToolCall>>,
}

#[derive(Debug, Deserialize)]
struct WireToolCall {
    function: WireFunctionCall,
}

#[derive(Debug, Deserialize)]
struct WireFunctionCall {
    name: String,
    arguments: String,
}

/// Scripted model for tests: replays a fixed sequence of decisions
#[cfg(test)]
pub mod testing {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    pub struct ScriptedModel {
        decisions: Mutex<VecDeque<Decision>>,
    }

    impl ScriptedModel {
        pub fn new(decisions: Vec<Decision>) -> Self {
            Self {
                decisions: Mutex::new(decisions.into()),
            }
        }
    }

    #[async_trait::async_trait]
    impl LanguageModel for ScriptedModel {
        async fn decide(
            &self,
            _system_prompt: &str,
            _transcript: &[AgentMessage],
            _tools: &[ToolDescriptor],
        ) -> Result<Decision> {
            self.decisions
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| AssistantError::Llm("Scripted decisions exhausted".to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ToolCall;
    use serde_json::json;

    #[test]
    fn test_request_serialization_includes_tools() {
        let request = ChatRequest {
            model: "gpt-4",
            temperature: 0.0,
            messages: vec![WireMessage {
                role: "user".to_string(),
                content: "What is the state of my portfolio?".to_string(),
                name: None,
            }],
            tools: Some(vec![WireTool {
                kind: "function".to_string(),
                function: ToolDescriptor {
                    name: "get_portfolio_state".to_string(),
                    description: "Retrieve the portfolio state".to_string(),
                    parameters: json!({ "type": "object", "properties": {} }),
                },
            }]),
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json.pointer("/tools/0/function/name").and_then(Value::as_str),
            Some("get_portfolio_state")
        );
        assert_eq!(
            json.pointer("/tools/0/type").and_then(Value::as_str),
            Some("function")
        );
    }

    #[test]
    fn test_response_parsing_tool_call() {
        let raw = json!({
            "choices": [{
                "message": {
                    "content": null,
                    "tool_calls": [{
                        "id": "call_1",
                        "type": "function",
                        "function": {
                            "name": "place_order",
                            "arguments": "{\"symbol\":\"AAPL\",\"qty\":10,\"side\":\"buy\"}"
                        }
                    }]
                }
            }]
        });
        let parsed: ChatResponse = serde_json::from_value(raw).unwrap();
        let call = parsed.choices[0]
            .message
            .tool_calls
            .as_ref()
            .unwrap()
            .first()
            .unwrap();
        assert_eq!(call.function.name, "place_order");
        let arguments: Value = serde_json::from_str(&call.function.arguments).unwrap();
        assert_eq!(arguments.get("qty"), Some(&json!(10)));
    }

    #[test]
    fn test_wire_messages_flatten_tool_turns() {
        let transcript = vec![
            AgentMessage::user("sell 5 AAPL"),
            AgentMessage::tool_request(
                "portfolio_manager",
                vec![ToolCall {
                    name: "place_order".to_string(),
                    arguments: json!({ "symbol": "AAPL", "qty": 5, "side": "sell" }),
                }],
            ),
            AgentMessage::tool_result("place_order", "{\"status\":\"success\"}"),
        ];

        let messages = ChatCompletionsClient::wire_messages("prompt", &transcript);
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0].role, "system");
        assert_eq!(messages[2].role, "assistant");
        assert!(messages[2].content.contains("place_order"));
        assert_eq!(messages[3].role, "user");
        assert!(messages[3].content.contains("Tool place_order returned"));
    }
}
