use std::time::Duration;

use anyhow::{Context as _, anyhow};
use intake_flow::{Backoff, PollPolicy, QuestionPrompt, StepLayout};

const DEFAULT_MODEL: &str = "openai/gpt-4o";
const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const EXPONENTIAL_CAP: u32 = 8;
const MAX_ANALYSIS_TIMEOUT_SECS: u64 = 60 * 60;
const MAX_POLL_INTERVAL_MS: u64 = 60 * 1000;

/// Settings for report generation through an assistant run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssistantConfig {
    pub assistant_id: String,
    pub api_key: Option<String>,
    pub base_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    pub port: u16,
    pub layout: StepLayout,
    pub openrouter_api_key: Option<String>,
    pub question_model: String,
    pub report_model: String,
    pub question_prompt: QuestionPrompt,
    /// Set when `OPENAI_ASSISTANT_ID` is configured; otherwise reports use a chat completion.
    pub assistant: Option<AssistantConfig>,
    pub poll: PollPolicy,
}

impl ServiceConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any variable lookup. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let var = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let port = parse_or(var("PORT"), "PORT", 3000u16)?;

        let layout = match var("INTAKE_VARIANT").as_deref() {
            None | Some("standard") => StepLayout::standard(),
            Some("symptoms-only") => StepLayout::symptoms_only(),
            Some(other) => {
                return Err(anyhow!(
                    "INTAKE_VARIANT must be 'standard' or 'symptoms-only', got '{}'",
                    other
                ));
            }
        };

        let count = parse_or(var("QUESTION_COUNT"), "QUESTION_COUNT", 4usize)?;
        if count == 0 {
            return Err(anyhow!("QUESTION_COUNT must be at least 1"));
        }
        let translation = match var("TRANSLATION_LANGUAGE") {
            None => Some("Somali".to_string()),
            Some(language) if language.eq_ignore_ascii_case("none") => None,
            Some(language) => Some(language),
        };

        let assistant = var("OPENAI_ASSISTANT_ID").map(|assistant_id| AssistantConfig {
            assistant_id,
            api_key: var("OPENAI_API_KEY"),
            base_url: var("OPENAI_BASE_URL")
                .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
        });

        let interval_ms = parse_or(
            var("ANALYSIS_POLL_INTERVAL_MS"),
            "ANALYSIS_POLL_INTERVAL_MS",
            1000u64,
        )?;
        if interval_ms > MAX_POLL_INTERVAL_MS {
            return Err(anyhow!(
                "ANALYSIS_POLL_INTERVAL_MS must be at most {}, got {}",
                MAX_POLL_INTERVAL_MS,
                interval_ms
            ));
        }
        let interval = Duration::from_millis(interval_ms);
        let backoff = match var("ANALYSIS_POLL_BACKOFF").as_deref() {
            None | Some("fixed") => Backoff::Fixed,
            Some("exponential") => Backoff::Exponential {
                max_interval: interval.saturating_mul(EXPONENTIAL_CAP),
            },
            Some(other) => {
                return Err(anyhow!(
                    "ANALYSIS_POLL_BACKOFF must be 'fixed' or 'exponential', got '{}'",
                    other
                ));
            }
        };
        let timeout_secs = parse_or(
            var("ANALYSIS_TIMEOUT_SECS"),
            "ANALYSIS_TIMEOUT_SECS",
            120u64,
        )?;
        if timeout_secs == 0 || timeout_secs > MAX_ANALYSIS_TIMEOUT_SECS {
            return Err(anyhow!(
                "ANALYSIS_TIMEOUT_SECS must be between 1 and {}, got {}",
                MAX_ANALYSIS_TIMEOUT_SECS,
                timeout_secs
            ));
        }
        let poll = PollPolicy {
            interval,
            max_attempts: parse_or(var("ANALYSIS_MAX_POLLS"), "ANALYSIS_MAX_POLLS", 60u32)?,
            timeout: Duration::from_secs(timeout_secs),
            backoff,
        };

        Ok(Self {
            port,
            layout,
            openrouter_api_key: var("OPENROUTER_API_KEY"),
            question_model: var("QUESTION_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            report_model: var("REPORT_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            question_prompt: QuestionPrompt { count, translation },
            assistant,
            poll,
        })
    }

    /// Names of credentials the configured collaborators need but do not have.
    pub fn missing_credentials(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.openrouter_api_key.is_none() {
            missing.push("OPENROUTER_API_KEY");
        }
        if let Some(assistant) = &self.assistant {
            if assistant.api_key.is_none() {
                missing.push("OPENAI_API_KEY");
            }
        }
        missing
    }
}

fn parse_or<T>(value: Option<String>, key: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match value {
        Some(raw) => raw
            .parse()
            .with_context(|| format!("{} has an invalid value '{}'", key, raw)),
        None => Ok(default),
    }
}
