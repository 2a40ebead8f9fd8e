use intake_flow::CollaboratorError;
use rig::{agent::Agent, client::CompletionClient, providers::openrouter};

/// Sampling settings for one chat-completion agent.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentSettings {
    pub model: String,
    pub temperature: f64,
    pub max_tokens: u64,
}

pub fn get_llm_agent(
    api_key: Option<&str>,
    settings: &AgentSettings,
    preamble: &str,
) -> Result<Agent<openrouter::CompletionModel>, CollaboratorError> {
    let api_key = api_key
        .ok_or_else(|| CollaboratorError::Unavailable("OPENROUTER_API_KEY not set".to_string()))?;
    let client = openrouter::Client::new(api_key);
    let agent = client
        .agent(&settings.model)
        .preamble(preamble)
        .temperature(settings.temperature)
        .max_tokens(settings.max_tokens)
        .build();
    Ok(agent)
}
