use ai_investment_assistant::broker::alpaca::AlpacaClient;
use ai_investment_assistant::config::{Credentials, Settings};
use ai_investment_assistant::filings::EdgarClient;
use ai_investment_assistant::market::yahoo::YahooFinanceClient;
use ai_investment_assistant::news::TavilyClient;
use ai_investment_assistant::supervisor::{build_supervisor, ExternalClients};
use clap::Parser;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Multi-agent investment assistant
#[derive(Parser, Debug)]
#[command(name = "assistant", about = "Ask the investment assistant a question")]
struct Args {
    /// The query to process, e.g. "What is the state of my portfolio?"
    query: String,

    /// Path to the YAML settings file
    #[arg(long, default_value = "config.yml")]
    config: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let settings = Settings::from_file(&args.config)?;
    let credentials = Credentials::from_env(settings.provider)?;

    info!(project = %settings.project_name, provider = %settings.provider, "Starting assistant");

    let clients = ExternalClients {
        broker: Arc::new(AlpacaClient::new(
            &credentials.alpaca_key,
            &credentials.alpaca_secret,
        )?),
        market: Arc::new(YahooFinanceClient::new()?),
        news: Arc::new(TavilyClient::new(credentials.tavily_key.clone())?),
        filings: Arc::new(EdgarClient::new(&settings.project_name)?),
    };

    let supervisor = build_supervisor(&settings, &credentials, clients)?;
    let transcript = supervisor.run(&args.query).await?;

    for message in &transcript {
        println!("\n{} {} Message {}\n", "=".repeat(32), message.name, "=".repeat(32));
        println!("{}", message.content);
    }

    Ok(())
}
