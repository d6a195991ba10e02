//! Specialist agent: a model, a prompt and a bound tool subset
//!
//! The agent owns no routing logic of its own. Each turn it hands the
//! conversation and its tool descriptors to the model and acts on the
//! returned intent: execute a tool and loop, or emit the final answer.

use crate::llm::{Decision, LanguageModel};
use crate::models::{AgentMessage, ToolCall, ToolInput, ToolOutput};
use crate::tools::ToolRegistry;
use crate::Result;
use std::sync::Arc;
use tracing::{debug, warn};

/// Cap on tool invocations per query, so a confused model cannot loop forever
const MAX_TOOL_ITERATIONS: usize = 8;

pub struct Agent {
    name: String,
    prompt: String,
    model: Arc<dyn LanguageModel>,
    tools: ToolRegistry,
}

impl Agent {
    pub fn new(
        name: impl Into<String>,
        prompt: impl Into<String>,
        model: Arc<dyn LanguageModel>,
        tools: ToolRegistry,
    ) -> Self {
        Self {
            name: name.into(),
            prompt: prompt.into(),
            model,
            tools,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tool_names(&self) -> Vec<&str> {
        self.tools.list()
    }

    /// Run the tool-use loop over the shared conversation. Returns the
    /// messages this agent appended: tool requests, tool results and the
    /// final answer.
    pub async fn handle(&self, transcript: &[AgentMessage]) -> Result<Vec<AgentMessage>> {
        let mut conversation = transcript.to_vec();
        let mut produced = Vec::new();
        let descriptors = self.tools.descriptors();

        for _ in 0..MAX_TOOL_ITERATIONS {
            let decision = self
                .model
                .decide(&self.prompt, &conversation, &descriptors)
                .await?;

            match decision {
                Decision::Respond(text) => {
                    debug!(agent = %self.name, "Agent responded");
                    let message = AgentMessage::assistant(&self.name, text);
                    produced.push(message.clone());
                    conversation.push(message);
                    return Ok(produced);
                }
                Decision::CallTool { name, arguments } => {
                    debug!(agent = %self.name, tool = %name, "Agent requested tool");

                    let request = AgentMessage::tool_request(
                        &self.name,
                        vec![ToolCall {
                            name: name.clone(),
                            arguments: arguments.clone(),
                        }],
                    );
                    produced.push(request.clone());
                    conversation.push(request);

                    let output = self.run_tool(&name, arguments).await?;
                    let content = serde_json::to_string(&output.data)?;
                    let result = AgentMessage::tool_result(&name, content);
                    produced.push(result.clone());
                    conversation.push(result);
                }
            }
        }

        Err(crate::error::AssistantError::Agent(format!(
            "{} exceeded {} tool iterations",
            self.name, MAX_TOOL_ITERATIONS
        )))
    }

    /// Execute one tool call. Unknown tools and malformed invocations come
    /// back as error-shaped outputs so the model can correct itself.
    async fn run_tool(&self, name: &str, arguments: serde_json::Value) -> Result<ToolOutput> {
        let tool = match self.tools.get(name) {
            Some(tool) => tool,
            None => {
                warn!(agent = %self.name, tool = %name, "Tool not registered");
                return Ok(ToolOutput::error(format!("Tool not found: {}", name)));
            }
        };

        let input = ToolInput {
            tool_name: name.to_string(),
            parameters: arguments,
        };
        match tool.execute(&input).await {
            Ok(output) => Ok(output),
            Err(e) => {
                warn!(agent = %self.name, tool = %name, error = %e, "Tool rejected invocation");
                Ok(ToolOutput::error(e.to_string()))
            }
        }
    }
}
