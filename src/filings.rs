//! Filings database seam and EDGAR client
//!
//! Looks up a company's most recent quarterly (10-Q) filing and returns its
//! text content with markup stripped.

use crate::error::AssistantError;
use crate::Result;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

const TICKERS_URL: &str = "https://www.sec.gov/files/company_tickers.json";
const SUBMISSIONS_URL: &str = "https://data.sec.gov/submissions";
const ARCHIVES_URL: &str = "https://www.sec.gov/Archives/edgar/data";

#[async_trait::async_trait]
pub trait FilingsDatabase: Send + Sync {
    /// Text of the company's most recent quarterly (10-Q) filing
    async fn latest_quarterly_filing(&self, symbol: &str) -> Result<String>;
}

pub struct EdgarClient {
    client: Client,
}

impl EdgarClient {
    /// `identity` is the contact string EDGAR requires in the User-Agent
    pub fn new(identity: &str) -> Result<Self> {
        let client = Client::builder()
            .user_agent(identity.to_string())
            .pool_idle_timeout(Duration::from_secs(60))
            .timeout(Duration::from_secs(60))
            .build()?;

        Ok(Self { client })
    }

    async fn get_json(&self, url: &str) -> Result<Value> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| AssistantError::Filings(format!("Request failed for {}: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AssistantError::Filings(format!(
                "EDGAR returned {} for {}",
                status, url
            )));
        }
        response
            .json::<Value>()
            .await
            .map_err(|e| AssistantError::Filings(format!("Invalid JSON response: {}", e)))
    }

    async fn lookup_cik(&self, symbol: &str) -> Result<u64> {
        let table = self.get_json(TICKERS_URL).await?;
        let wanted = symbol.to_uppercase();

        if let Some(entries) = table.as_object() {
            for entry in entries.values() {
                let ticker = entry.get("ticker").and_then(Value::as_str).unwrap_or("");
                if ticker.eq_ignore_ascii_case(&wanted) {
                    if let Some(cik) = entry.get("cik_str").and_then(Value::as_u64) {
                        return Ok(cik);
                    }
                }
            }
        }
        Err(AssistantError::Filings(format!(
            "No CIK found for ticker {}",
            symbol
        )))
    }
}

/// Strip HTML/XBRL markup, decode common entities and collapse whitespace.
/// Block-level section breaks are joined with " \n " so the report reads as
/// one concatenated document.
fn strip_markup(raw: &str) -> String {
    let mut text = String::with_capacity(raw.len() / 2);
    let mut in_tag = false;
    let mut chars = raw.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '<' => {
                in_tag = true;
                // Treat closing block tags as section breaks. Older filings
                // use uppercase markup, so compare case-insensitively.
                let rest: String = chars.clone().take(4).collect::<String>().to_lowercase();
                if rest.starts_with("/p>") || rest.starts_with("/div") || rest.starts_with("/tr>") {
                    text.push_str(" \n ");
                }
            }
            '>' => in_tag = false,
            _ if in_tag => {}
            '&' => {
                let entity: String = chars.clone().take_while(|c| *c != ';').take(6).collect();
                let decoded = match entity.as_str() {
                    "amp" => Some('&'),
                    "lt" => Some('<'),
                    "gt" => Some('>'),
                    "nbsp" => Some(' '),
                    "#8217" | "rsquo" => Some('\''),
                    _ => None,
                };
                if let Some(d) = decoded {
                    for _ in 0..=entity.len() {
                        chars.next();
                    }
                    text.push(d);
                } else {
                    text.push('&');
                }
            }
            _ => text.push(c),
        }
    }

    // Collapse runs of spaces while keeping section breaks readable.
    let mut out = String::with_capacity(text.len());
    let mut last_was_space = false;
    for c in text.chars() {
        if c == ' ' || c == '\t' || c == '\r' {
            if !last_was_space {
                out.push(' ');
            }
            last_was_space = true;
        } else {
            out.push(c);
            last_was_space = false;
        }
    }
    out.trim().to_string()
}

#[async_trait::async_trait]
impl FilingsDatabase for EdgarClient {
    async fn latest_quarterly_filing(&self, symbol: &str) -> Result<String> {
        let cik = self.lookup_cik(symbol).await?;
        debug!(%symbol, cik, "EDGAR filing lookup");

        let submissions = self
            .get_json(&format!("{}/CIK{:010}.json", SUBMISSIONS_URL, cik))
            .await?;
        let recent = submissions.pointer("/filings/recent").ok_or_else(|| {
            AssistantError::Filings(format!("No recent filings for {}", symbol))
        })?;

        let forms = recent.get("form").and_then(Value::as_array);
        let accessions = recent.get("accessionNumber").and_then(Value::as_array);
        let documents = recent.get("primaryDocument").and_then(Value::as_array);

        let (forms, accessions, documents) = match (forms, accessions, documents) {
            (Some(f), Some(a), Some(d)) => (f, a, d),
            _ => {
                return Err(AssistantError::Filings(format!(
                    "Malformed submissions index for {}",
                    symbol
                )))
            }
        };

        // Filings are listed newest-first; take the first 10-Q.
        let index = forms
            .iter()
            .position(|form| form.as_str() == Some("10-Q"))
            .ok_or_else(|| {
                AssistantError::Filings(format!("No 10-Q filing found for {}", symbol))
            })?;

        let accession = accessions
            .get(index)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .replace('-', "");
        let document = documents
            .get(index)
            .and_then(Value::as_str)
            .unwrap_or_default();

        let url = format!("{}/{}/{}/{}", ARCHIVES_URL, cik, accession, document);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| AssistantError::Filings(format!("Request failed for {}: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AssistantError::Filings(format!(
                "EDGAR returned {} for {}",
                status, url
            )));
        }
        let raw = response
            .text()
            .await
            .map_err(|e| AssistantError::Filings(format!("Failed to read filing body: {}", e)))?;

        Ok(strip_markup(&raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_markup_removes_tags() {
        let raw = "<html><body><p>Item 1. Financial Statements</p><p>Revenue grew.</p></body></html>";
        let text = strip_markup(raw);
        assert!(text.contains("Item 1. Financial Statements"));
        assert!(text.contains("Revenue grew."));
        assert!(!text.contains('<'));
        // Closing paragraphs become section breaks.
        assert!(text.contains(" \n "));
    }

    #[test]
    fn test_strip_markup_breaks_uppercase_blocks() {
        let raw = "<P>Item 1. Financial Statements</P><DIV>Revenue grew.</DIV>";
        let text = strip_markup(raw);
        assert!(text.contains("Item 1. Financial Statements"));
        assert!(text.contains(" \n "));
    }

    #[test]
    fn test_strip_markup_decodes_entities() {
        let raw = "Research &amp; Development&nbsp;costs";
        assert_eq!(strip_markup(raw), "Research & Development costs");
    }

    #[test]
    fn test_strip_markup_collapses_spaces() {
        let raw = "Total   assets\t\twere    stable";
        assert_eq!(strip_markup(raw), "Total assets were stable");
    }
}
