//! Natural-language security summary
//!
//! One prompt/response round trip against an OpenAI-compatible chat
//! completions API, retried with backoff on transient failure.

use crate::config::SummaryConfig;
use crate::error::{Error, Result};
use crate::report::SiteReport;
use crate::retry::retry_with_backoff;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fmt::Write;
use std::time::Duration;
use tracing::{debug, info};

const SYSTEM_PROMPT: &str = "You are a WordPress security consultant. \
Write a concise assessment for a site owner. Point out outdated software, \
missing hardening and concrete next steps. Do not invent findings.";

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

fn or_unknown(value: Option<&str>) -> &str {
    value.unwrap_or("unknown")
}

/// Build the user prompt for a report
pub fn build_prompt(report: &SiteReport) -> String {
    let mut prompt = String::new();

    let _ = writeln!(prompt, "Site: {}", report.url);
    let _ = writeln!(
        prompt,
        "WordPress: {}",
        if report.is_wordpress { "yes" } else { "not detected" }
    );
    let core_status = match report.is_wp_up_to_date {
        Some(true) => "up to date",
        Some(false) => "outdated",
        None => "currency unknown",
    };
    let _ = writeln!(
        prompt,
        "Core version: {} ({}, latest {})",
        or_unknown(report.wp_version.as_deref()),
        core_status,
        report.latest_wp_version
    );
    let _ = writeln!(prompt, "PHP version: {}", or_unknown(report.php_version.as_deref()));
    let _ = writeln!(prompt, "Web server: {}", or_unknown(report.web_server.as_deref()));

    match &report.theme {
        Some(theme) => {
            let _ = write!(
                prompt,
                "Theme: {} {}",
                theme.name,
                or_unknown(theme.version.as_deref())
            );
            if let Some(parent) = &theme.parent_theme {
                let _ = write!(prompt, " (child of {parent})");
            }
            prompt.push('\n');
        }
        None => prompt.push_str("Theme: unknown\n"),
    }

    let _ = writeln!(
        prompt,
        "Security plugin installed: {}",
        if report.has_security_plugin { "yes" } else { "no" }
    );

    if report.plugins.is_empty() {
        prompt.push_str("Plugins: none detected\n");
    } else {
        let _ = writeln!(prompt, "Plugins ({}):", report.plugins.len());
        for plugin in &report.plugins {
            let _ = write!(prompt, "- {} {}", plugin.name, plugin.version);
            match (plugin.is_up_to_date, plugin.latest_version.as_deref()) {
                (Some(false), Some(latest)) => {
                    let _ = write!(prompt, " (outdated, latest {latest})");
                }
                (Some(true), _) => prompt.push_str(" (up to date)"),
                _ => {}
            }
            prompt.push('\n');
        }
    }

    prompt.push_str("\nSummarize the security posture of this site and list the most important fixes.");
    prompt
}

/// Language-model client
#[derive(Debug, Clone)]
pub struct Summarizer {
    client: Client,
    config: SummaryConfig,
}

impl Summarizer {
    /// Build a summarizer from its settings
    pub fn new(config: SummaryConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| Error::HttpClient(e.to_string()))?;
        Ok(Self { client, config })
    }

    /// Produce a security summary for `report`
    pub async fn summarize(&self, report: &SiteReport) -> Result<String> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or(Error::MissingApiKey)?;
        let prompt = build_prompt(report);

        let analysis = retry_with_backoff(&self.config.retry, "security summary", || {
            self.complete(api_key, &prompt)
        })
        .await?;

        info!(url = %report.url, chars = analysis.len(), "summary generated");
        Ok(analysis)
    }

    async fn complete(&self, api_key: &str, prompt: &str) -> Result<String> {
        let body = ChatRequest {
            model: &self.config.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
        };

        let response = self
            .client
            .post(&self.config.api_url)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::LanguageModel {
                status: None,
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            debug!(status = status.as_u16(), "completion rejected");
            return Err(Error::LanguageModel {
                status: Some(status.as_u16()),
                message,
            });
        }

        let parsed: ChatResponse = response.json().await.map_err(|e| Error::LanguageModel {
            status: None,
            message: e.to_string(),
        })?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty())
            .ok_or(Error::EmptyCompletion)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{Plugin, Theme};

    fn report() -> SiteReport {
        SiteReport {
            url: "https://example.com/".into(),
            title: None,
            meta_description: None,
            is_wordpress: true,
            wp_version: Some("6.2".into()),
            is_wp_up_to_date: Some(false),
            latest_wp_version: "6.8.3".into(),
            php_version: Some("8.1.2".into()),
            web_server: Some("nginx".into()),
            plugins: vec![
                Plugin {
                    slug: "akismet".into(),
                    name: "Akismet Anti-spam".into(),
                    version: "4.2.1".into(),
                    version_detected: true,
                    latest_version: Some("5.3".into()),
                    is_up_to_date: Some(false),
                },
                Plugin {
                    slug: "wordfence".into(),
                    name: "wordfence".into(),
                    version: "unknown".into(),
                    version_detected: false,
                    latest_version: None,
                    is_up_to_date: None,
                },
            ],
            theme: Some(Theme {
                name: "astra-child".into(),
                version: Some("1.0".into()),
                is_child: true,
                parent_theme: Some("astra".into()),
                latest_version: None,
                is_up_to_date: None,
            }),
            has_security_plugin: true,
        }
    }

    #[test]
    fn prompt_embeds_versions_theme_and_plugins() {
        let prompt = build_prompt(&report());
        assert!(prompt.contains("Core version: 6.2 (outdated, latest 6.8.3)"));
        assert!(prompt.contains("PHP version: 8.1.2"));
        assert!(prompt.contains("Theme: astra-child 1.0 (child of astra)"));
        assert!(prompt.contains("- Akismet Anti-spam 4.2.1 (outdated, latest 5.3)"));
        assert!(prompt.contains("- wordfence unknown\n"));
        assert!(prompt.contains("Security plugin installed: yes"));
    }

    #[test]
    fn prompt_handles_bare_report() {
        let mut bare = report();
        bare.plugins.clear();
        bare.theme = None;
        bare.wp_version = None;
        bare.is_wp_up_to_date = None;
        let prompt = build_prompt(&bare);
        assert!(prompt.contains("Core version: unknown (currency unknown"));
        assert!(prompt.contains("Theme: unknown"));
        assert!(prompt.contains("Plugins: none detected"));
    }

    #[tokio::test]
    async fn missing_key_fails_fast() {
        let summarizer = Summarizer::new(SummaryConfig::default()).unwrap();
        let err = summarizer.summarize(&report()).await.unwrap_err();
        assert!(matches!(err, Error::MissingApiKey));
    }
}
