//! AI Investment Assistant
//!
//! A supervisor-routed multi-agent assistant for retail investing. A
//! supervisor model dispatches each user query to one of three specialist
//! agents — a portfolio manager bound to a paper-trading brokerage, a
//! financial analyst bound to market data and indicator tooling, and a
//! company researcher bound to profile data, news search and regulatory
//! filings. Every external service sits behind a trait so the agents can be
//! exercised against fakes.

pub mod agent;
pub mod broker;
pub mod config;
pub mod error;
pub mod filings;
pub mod indicators;
pub mod llm;
pub mod market;
pub mod models;
pub mod news;
pub mod supervisor;
pub mod tools;

pub use error::{AssistantError, Result};
pub use models::{AgentMessage, Role, ToolInput, ToolOutput};
