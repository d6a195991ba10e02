//! Supervisor workflow
//!
//! Composes the three specialist agents into a single dispatch graph. The
//! supervisor exposes one synthetic handoff tool per agent; which agent (if
//! any) receives the query is decided entirely by the model. Agent answers
//! flow back through the supervisor, which relays the final response.

use crate::agent::Agent;
use crate::broker::Brokerage;
use crate::config::{AgentKind, Credentials, Settings};
use crate::error::AssistantError;
use crate::filings::FilingsDatabase;
use crate::llm::{ChatCompletionsClient, Decision, LanguageModel, ToolDescriptor};
use crate::market::MarketData;
use crate::models::{AgentMessage, ToolCall};
use crate::news::NewsSearch;
use crate::tools::analysis::{
    FundamentalAnalysisTool, PriceTargetsTool, RecommendationsTool, TechnicalAnalysisTool,
};
use crate::tools::portfolio::{PlaceOrderTool, PortfolioStateTool};
use crate::tools::research::{
    BalanceSheetTool, BasicInfoTool, NewsSearchTool, QuarterlyReportTool,
};
use crate::tools::ToolRegistry;
use crate::Result;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info};

const HANDOFF_PREFIX: &str = "transfer_to_";

/// Cap on supervisor dispatches per query
const MAX_HANDOFFS: usize = 4;

pub struct Supervisor {
    model: Arc<dyn LanguageModel>,
    prompt: String,
    agents: Vec<Agent>,
}

impl Supervisor {
    pub fn new(model: Arc<dyn LanguageModel>, prompt: impl Into<String>, agents: Vec<Agent>) -> Self {
        Self {
            model,
            prompt: prompt.into(),
            agents,
        }
    }

    /// One synthetic handoff tool per agent; calling it routes the query
    fn handoff_descriptors(&self) -> Vec<ToolDescriptor> {
        self.agents
            .iter()
            .map(|agent| ToolDescriptor {
                name: format!("{}{}", HANDOFF_PREFIX, agent.name()),
                description: format!("Hand the conversation to the {} agent", agent.name()),
                parameters: json!({ "type": "object", "properties": {} }),
            })
            .collect()
    }

    /// Process a query and return the full message transcript
    pub async fn run(&self, query: &str) -> Result<Vec<AgentMessage>> {
        info!(%query, "Supervisor: processing query");

        let mut transcript = vec![AgentMessage::user(query)];
        let descriptors = self.handoff_descriptors();

        for _ in 0..MAX_HANDOFFS {
            let decision = self
                .model
                .decide(&self.prompt, &transcript, &descriptors)
                .await?;

            match decision {
                Decision::Respond(text) => {
                    transcript.push(AgentMessage::assistant("supervisor", text));
                    return Ok(transcript);
                }
                Decision::CallTool { name, .. } => {
                    let agent_name = name.strip_prefix(HANDOFF_PREFIX).unwrap_or(&name);
                    debug!(agent = %agent_name, "Supervisor handoff");

                    let agent = self
                        .agents
                        .iter()
                        .find(|a| a.name() == agent_name)
                        .ok_or_else(|| {
                            AssistantError::Agent(format!(
                                "No agent registered for handoff {}",
                                name
                            ))
                        })?;

                    transcript.push(AgentMessage::tool_request(
                        "supervisor",
                        vec![ToolCall {
                            name: name.clone(),
                            arguments: json!({}),
                        }],
                    ));

                    let produced = agent.handle(&transcript).await?;
                    transcript.extend(produced);
                }
            }
        }

        Err(AssistantError::Agent(format!(
            "Supervisor exceeded {} handoffs",
            MAX_HANDOFFS
        )))
    }
}

//
// ================= Assembly =================
//

/// Externally constructed provider clients, injected rather than global
#[derive(Clone)]
pub struct ExternalClients {
    pub broker: Arc<dyn Brokerage>,
    pub market: Arc<dyn MarketData>,
    pub news: Arc<dyn NewsSearch>,
    pub filings: Arc<dyn FilingsDatabase>,
}

fn model_for(
    settings: &Settings,
    credentials: &Credentials,
    kind: AgentKind,
) -> Result<Arc<dyn LanguageModel>> {
    let client = ChatCompletionsClient::new(
        settings.provider,
        credentials.llm_api_key.clone(),
        settings.model_config(kind),
    )?;
    Ok(Arc::new(client))
}

/// Bind model instances, prompts and tool subsets into the three specialist
/// agents and compose them under a supervisor
pub fn build_supervisor(
    settings: &Settings,
    credentials: &Credentials,
    clients: ExternalClients,
) -> Result<Supervisor> {
    let mut portfolio_tools = ToolRegistry::new();
    portfolio_tools.register(Arc::new(PlaceOrderTool::new(clients.broker.clone())));
    portfolio_tools.register(Arc::new(PortfolioStateTool::new(clients.broker.clone())));

    let portfolio_manager = Agent::new(
        AgentKind::PortfolioManager.name(),
        settings.prompt_for(AgentKind::PortfolioManager),
        model_for(settings, credentials, AgentKind::PortfolioManager)?,
        portfolio_tools,
    );

    let mut analyst_tools = ToolRegistry::new();
    analyst_tools.register(Arc::new(PriceTargetsTool::new(clients.market.clone())));
    analyst_tools.register(Arc::new(RecommendationsTool::new(clients.market.clone())));
    analyst_tools.register(Arc::new(FundamentalAnalysisTool::new(clients.market.clone())));
    analyst_tools.register(Arc::new(TechnicalAnalysisTool::new(clients.market.clone())));

    let financial_analyst = Agent::new(
        AgentKind::FinancialAnalyst.name(),
        settings.prompt_for(AgentKind::FinancialAnalyst),
        model_for(settings, credentials, AgentKind::FinancialAnalyst)?,
        analyst_tools,
    );

    let mut research_tools = ToolRegistry::new();
    research_tools.register(Arc::new(BasicInfoTool::new(clients.market.clone())));
    research_tools.register(Arc::new(QuarterlyReportTool::new(clients.filings.clone())));
    research_tools.register(Arc::new(NewsSearchTool::new(clients.news.clone())));
    research_tools.register(Arc::new(BalanceSheetTool::new(clients.market.clone())));

    let company_researcher = Agent::new(
        AgentKind::CompanyResearcher.name(),
        settings.prompt_for(AgentKind::CompanyResearcher),
        model_for(settings, credentials, AgentKind::CompanyResearcher)?,
        research_tools,
    );

    Ok(Supervisor::new(
        model_for(settings, credentials, AgentKind::Supervisor)?,
        settings.prompt_for(AgentKind::Supervisor),
        vec![portfolio_manager, company_researcher, financial_analyst],
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::testing::ScriptedModel;
    use crate::models::{Role, ToolInput, ToolOutput};
    use crate::tools::Tool;
    use serde_json::Value;

    struct PortfolioStub;

    #[async_trait::async_trait]
    impl Tool for PortfolioStub {
        fn name(&self) -> &'static str {
            "get_portfolio_state"
        }
        fn description(&self) -> &'static str {
            "Retrieve the portfolio state"
        }
        fn parameters(&self) -> Value {
            json!({ "type": "object", "properties": {} })
        }
        async fn execute(&self, _input: &ToolInput) -> Result<ToolOutput> {
            Ok(ToolOutput::ok(json!({ "cash": "100000.00", "positions": [] })))
        }
    }

    fn specialist(decisions: Vec<Decision>) -> Agent {
        let mut tools = ToolRegistry::new();
        tools.register(Arc::new(PortfolioStub));
        Agent::new(
            "portfolio_manager",
            "You are a portfolio manager.",
            Arc::new(ScriptedModel::new(decisions)),
            tools,
        )
    }

    #[tokio::test]
    async fn test_supervisor_routes_and_relays() {
        let supervisor_model = ScriptedModel::new(vec![
            Decision::CallTool {
                name: "transfer_to_portfolio_manager".to_string(),
                arguments: json!({}),
            },
            Decision::Respond("Your portfolio holds no positions.".to_string()),
        ]);
        let agent = specialist(vec![
            Decision::CallTool {
                name: "get_portfolio_state".to_string(),
                arguments: json!({}),
            },
            Decision::Respond("The portfolio has $100,000 in cash.".to_string()),
        ]);

        let supervisor = Supervisor::new(
            Arc::new(supervisor_model),
            "Route the query.",
            vec![agent],
        );

        let transcript = supervisor.run("What is the state of my portfolio?").await.unwrap();

        // user, handoff, tool request, tool result, agent answer, relay
        assert_eq!(transcript.len(), 6);
        assert_eq!(transcript[0].role, Role::User);
        assert_eq!(transcript[1].name, "supervisor");
        assert_eq!(
            transcript[1].tool_calls[0].name,
            "transfer_to_portfolio_manager"
        );
        assert_eq!(transcript[3].role, Role::Tool);
        assert!(transcript[3].content.contains("100000.00"));
        assert_eq!(transcript[4].name, "portfolio_manager");
        assert_eq!(transcript[5].name, "supervisor");
        assert!(transcript[5].content.contains("no positions"));
    }

    #[tokio::test]
    async fn test_supervisor_answers_ambiguous_query_directly() {
        let supervisor_model = ScriptedModel::new(vec![Decision::Respond(
            "Could you clarify which company you mean?".to_string(),
        )]);
        let supervisor = Supervisor::new(
            Arc::new(supervisor_model),
            "Route the query.",
            vec![specialist(vec![])],
        );

        let transcript = supervisor.run("tell me about it").await.unwrap();
        assert_eq!(transcript.len(), 2);
        assert_eq!(transcript[1].name, "supervisor");
        assert!(transcript[1].content.contains("clarify"));
    }

    #[tokio::test]
    async fn test_supervisor_rejects_unknown_handoff() {
        let supervisor_model = ScriptedModel::new(vec![Decision::CallTool {
            name: "transfer_to_quant_desk".to_string(),
            arguments: json!({}),
        }]);
        let supervisor = Supervisor::new(
            Arc::new(supervisor_model),
            "Route the query.",
            vec![specialist(vec![])],
        );

        assert!(supervisor.run("hello").await.is_err());
    }

    #[tokio::test]
    async fn test_handoff_descriptors_cover_all_agents() {
        let supervisor = Supervisor::new(
            Arc::new(ScriptedModel::new(vec![])),
            "Route the query.",
            vec![
                specialist(vec![]),
            ],
        );
        let descriptors = supervisor.handoff_descriptors();
        assert_eq!(descriptors.len(), 1);
        assert_eq!(descriptors[0].name, "transfer_to_portfolio_manager");
    }
}
