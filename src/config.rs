//! Configuration layer
//!
//! Model/provider selection and prompt text come from a YAML settings file;
//! provider credentials come from the environment. Prompts not present in the
//! file fall back to the built-in constants below.

use crate::error::AssistantError;
use crate::Result;
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::path::Path;

//
// ================= Provider =================
//

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    OpenAi,
    Nvidia,
    Ollama,
}

impl Provider {
    /// Base URL of the provider's OpenAI-compatible chat completions API
    pub fn base_url(&self) -> &'static str {
        match self {
            Provider::OpenAi => "https://api.openai.com/v1",
            Provider::Nvidia => "https://integrate.api.nvidia.com/v1",
            Provider::Ollama => "http://localhost:11434/v1",
        }
    }

    /// Environment variable holding the provider API key, if one is required
    pub fn api_key_var(&self) -> Option<&'static str> {
        match self {
            Provider::OpenAi => Some("OPENAI_API_KEY"),
            Provider::Nvidia => Some("NVIDIA_API_KEY"),
            Provider::Ollama => None,
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Provider::OpenAi => "openai",
            Provider::Nvidia => "nvidia",
            Provider::Ollama => "ollama",
        };
        write!(f, "{}", s)
    }
}

//
// ================= Agents =================
//

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentKind {
    Supervisor,
    PortfolioManager,
    FinancialAnalyst,
    CompanyResearcher,
}

impl AgentKind {
    pub fn name(&self) -> &'static str {
        match self {
            AgentKind::Supervisor => "supervisor",
            AgentKind::PortfolioManager => "portfolio_manager",
            AgentKind::FinancialAnalyst => "financial_analyst",
            AgentKind::CompanyResearcher => "company_researcher",
        }
    }
}

/// Recognized per-agent settings: model name, temperature, optional prompt
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AgentModelConfig {
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Inline prompt override; defaults to the built-in prompt for the agent
    #[serde(default)]
    pub prompt: Option<String>,
}

fn default_temperature() -> f32 {
    0.0
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AgentsConfig {
    pub supervisor: AgentModelConfig,
    pub portfolio_manager: AgentModelConfig,
    pub financial_analyst: AgentModelConfig,
    pub company_researcher: AgentModelConfig,
}

//
// ================= Settings =================
//

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    pub project_name: String,
    pub provider: Provider,
    pub agents: AgentsConfig,
}

impl Settings {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            AssistantError::Config(format!("Cannot read settings file {}: {}", path.display(), e))
        })?;
        Self::from_yaml(&raw)
    }

    pub fn from_yaml(raw: &str) -> Result<Self> {
        let settings: Settings = serde_yaml::from_str(raw)?;
        Ok(settings)
    }

    pub fn model_config(&self, kind: AgentKind) -> &AgentModelConfig {
        match kind {
            AgentKind::Supervisor => &self.agents.supervisor,
            AgentKind::PortfolioManager => &self.agents.portfolio_manager,
            AgentKind::FinancialAnalyst => &self.agents.financial_analyst,
            AgentKind::CompanyResearcher => &self.agents.company_researcher,
        }
    }

    /// Prompt for an agent: the YAML override if present, else the built-in
    pub fn prompt_for(&self, kind: AgentKind) -> &str {
        self.model_config(kind)
            .prompt
            .as_deref()
            .unwrap_or_else(|| default_prompt(kind))
    }
}

//
// ================= Credentials =================
//

/// Provider credentials pulled from the environment once at startup so
/// missing keys fail loudly instead of surfacing mid-call.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub alpaca_key: String,
    pub alpaca_secret: String,
    pub tavily_key: String,
    /// Chat completions API key; `None` for providers that need none (ollama)
    pub llm_api_key: Option<String>,
}

impl Credentials {
    pub fn from_env(provider: Provider) -> Result<Self> {
        let llm_api_key = match provider.api_key_var() {
            Some(var) => Some(require_env(var)?),
            None => None,
        };

        Ok(Self {
            alpaca_key: require_env("ALPACA_API_KEY")?,
            alpaca_secret: require_env("ALPACA_SECRET_KEY")?,
            tavily_key: require_env("TAVILY_API_KEY")?,
            llm_api_key,
        })
    }
}

fn require_env(var: &str) -> Result<String> {
    env::var(var)
        .map_err(|_| AssistantError::Config(format!("Environment variable {} is not set", var)))
}

//
// ================= Built-in prompts =================
//

const PORTFOLIO_MANAGER_PROMPT: &str = "\
You are a portfolio manager. Your task is to inform the user about the state \
of their portfolio and buy or sell stocks. Always use one tool at a time.";

const FINANCIAL_ANALYST_PROMPT: &str = "\
You are a financial analyst agent with expertise in fundamental, technical, and sentiment analysis. Your role is to deliver actionable, data-driven insights on companies.
Capabilities:
1. Fundamental Analysis: Evaluate financial health, business model, management quality, key ratios, and growth potential.
2. Technical Analysis: Analyze price trends, trading volume, support/resistance levels, and technical indicators for short- and medium-term outlooks.
3. Social Sentiment Analysis: Monitor real-time social media sentiment, identify trending topics, and gauge public perception.
4. Competitive Analysis: Assess key competitors, compare market share, evaluate industry positioning, and analyze performance metrics.
Stay objective, current, and focused on delivering insightful financial analysis.";

const COMPANY_RESEARCHER_PROMPT: &str = "\
You are a company research agent specializing in gathering and analyzing fundamental company information. Your role is to provide comprehensive insights about companies based on available data.

Your capabilities include:
1. Basic Company Information: Retrieve and analyze company overview, key statistics, and general business information.
2. Financial Reports: Access and interpret quarterly financial reports to understand company performance.
3. Financial News: Search and analyze relevant financial news to provide context about company developments.
4. Balance Sheet Analysis: Examine and interpret company balance sheets to assess financial health.";

const SUPERVISOR_PROMPT: &str = "\
You are the Supervisor Agent in a multi-agent financial assistant system. Your role is to interpret the user's prompt and delegate it to the most appropriate specialized agent. There are currently three available agents:

1. **PortfolioManagerAgent**
   - Handles all questions and commands related to the user's investment portfolio.
   - Capable of informing the user about the state of the portfolio.
   - Can perform **buy** and **sell** operations.

2. **ResearchAgent**
   - Provides comprehensive company information.
   - Can retrieve basic company information, quarterly reports, financial news, and balance sheets.
   - Focuses on fundamental company data and financial reporting.

3. **FinancialAnalystAgent**
   - Specializes in financial analysis and market insights.
   - Provides analyst price targets, recommendations, technical and fundamental analysis.
   - Offers expert analysis of company performance and market trends.

Your job is to:
- Understand the user's intent.
- Route the prompt to the correct agent.
- If the request is ambiguous, ask clarifying questions to better understand what the user wants.
- If the task doesn't match any agent's capabilities, politely inform the user and suggest an alternative or ask for more details.

Always be helpful, concise, and precise in your routing.";

pub fn default_prompt(kind: AgentKind) -> &'static str {
    match kind {
        AgentKind::Supervisor => SUPERVISOR_PROMPT,
        AgentKind::PortfolioManager => PORTFOLIO_MANAGER_PROMPT,
        AgentKind::FinancialAnalyst => FINANCIAL_ANALYST_PROMPT,
        AgentKind::CompanyResearcher => COMPANY_RESEARCHER_PROMPT,
    }
}
