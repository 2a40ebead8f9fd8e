//! Report generation through an OpenAI assistant run: create a thread, post the analysis
//! prompt, start a run, poll its status, then read the assistant's latest reply.

use async_trait::async_trait;
use intake_flow::{
    AnalysisRequest, CollaboratorError, PollPolicy, PollState, ReportGenerator, analysis_prompt,
    poll_until,
};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, error, info};

use crate::config::AssistantConfig;

#[derive(Debug, Deserialize)]
struct Created {
    id: String,
}

#[derive(Debug, Deserialize)]
struct RunStatus {
    status: String,
    #[serde(default)]
    last_error: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct MessageList {
    data: Vec<ThreadMessage>,
}

#[derive(Debug, Deserialize)]
struct ThreadMessage {
    role: String,
    #[serde(default)]
    content: Vec<Value>,
}

pub struct AssistantReportGenerator {
    client: Client,
    config: AssistantConfig,
    poll: PollPolicy,
}

impl AssistantReportGenerator {
    pub fn new(config: AssistantConfig, poll: PollPolicy) -> Self {
        Self {
            client: Client::new(),
            config,
            poll,
        }
    }

    fn request(&self, builder: RequestBuilder, api_key: &str) -> RequestBuilder {
        builder
            .bearer_auth(api_key)
            .header("OpenAI-Beta", "assistants=v2")
    }

    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> anyhow::Result<T> {
        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow::anyhow!("assistant API returned {}: {}", status, body));
        }
        Ok(response.json::<T>().await?)
    }

    async fn post<T: DeserializeOwned>(
        &self,
        api_key: &str,
        path: &str,
        body: Value,
    ) -> anyhow::Result<T> {
        let url = format!("{}{}", self.config.base_url, path);
        self.send(self.request(self.client.post(url), api_key).json(&body))
            .await
    }

    async fn get<T: DeserializeOwned>(&self, api_key: &str, path: &str) -> anyhow::Result<T> {
        let url = format!("{}{}", self.config.base_url, path);
        self.send(self.request(self.client.get(url), api_key)).await
    }

    async fn run_status(
        &self,
        api_key: &str,
        thread_id: &str,
        run_id: &str,
    ) -> anyhow::Result<PollState<()>> {
        let run: RunStatus = self
            .get(api_key, &format!("/threads/{}/runs/{}", thread_id, run_id))
            .await?;
        debug!(run_id = %run_id, status = %run.status, "Assistant run status");

        Ok(match run.status.as_str() {
            "completed" => PollState::Ready(()),
            "failed" | "cancelled" | "expired" | "incomplete" => PollState::Failed(format!(
                "run {} ended with status '{}'{}",
                run_id,
                run.status,
                run.last_error
                    .map(|e| format!(": {}", e))
                    .unwrap_or_default()
            )),
            _ => PollState::Pending,
        })
    }
}

/// Text of the newest assistant message in a list ordered newest first.
fn latest_assistant_text(messages: &MessageList) -> Option<String> {
    messages
        .data
        .iter()
        .filter(|m| m.role == "assistant")
        .find_map(|m| {
            m.content.iter().find_map(|part| {
                (part["type"] == "text")
                    .then(|| part["text"]["value"].as_str().map(str::to_string))
                    .flatten()
            })
        })
}

#[async_trait]
impl ReportGenerator for AssistantReportGenerator {
    async fn generate_report(&self, request: &AnalysisRequest) -> Result<String, CollaboratorError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or_else(|| CollaboratorError::Unavailable("OPENAI_API_KEY not set".to_string()))?;

        let thread: Created = self.post(api_key, "/threads", json!({})).await?;
        info!(thread_id = %thread.id, "Created assistant thread");

        let _message: Created = self
            .post(
                api_key,
                &format!("/threads/{}/messages", thread.id),
                json!({ "role": "user", "content": analysis_prompt(request) }),
            )
            .await?;

        let run: Created = self
            .post(
                api_key,
                &format!("/threads/{}/runs", thread.id),
                json!({ "assistant_id": self.config.assistant_id }),
            )
            .await?;
        info!(thread_id = %thread.id, run_id = %run.id, "Started assistant run");

        poll_until(&self.poll, |_| self.run_status(api_key, &thread.id, &run.id))
            .await
            .map_err(|e| {
                error!(run_id = %run.id, error = %e, "Assistant run did not complete");
                CollaboratorError::from(e)
            })?;

        let messages: MessageList = self
            .get(
                api_key,
                &format!("/threads/{}/messages?order=desc", thread.id),
            )
            .await?;

        latest_assistant_text(&messages)
            .ok_or_else(|| CollaboratorError::Failed("No response from assistant".to_string()))
    }
}
