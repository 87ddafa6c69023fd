//! services/api/src/adapters/research_llm.rs
//!
//! This module contains the adapter for the research-writing LLM.
//! It implements the `ResearchGenerationService` port from the `core` crate.
//! Gemini is reached through its OpenAI-compatible endpoint, so any
//! OpenAI-style provider works by changing the base URL.

const SYSTEM_INSTRUCTIONS: &str = r#"You are an expert research assistant. Research the given topic in depth and write a detailed, academic-quality report made of:

1. An executive summary of the topic and the key findings.
2. An introduction giving background, context, and why the topic matters.
3. A main body of 3 to 5 sections, each exploring a different aspect of the topic.
4. Findings and insights, with their implications.
5. A conclusion with possible future directions.
6. The sources you relied on, with URLs (aim for 8 to 10 good ones).

Cite sources for factual claims, weigh multiple perspectives, and keep an objective tone.

Respond with a single JSON object of exactly this shape:
{
  "summary": "executive summary, markdown allowed, without an 'Executive Summary' heading",
  "sections": [
    { "title": "section title", "content": "section body in markdown, without repeating the title" }
  ],
  "sources": [
    { "title": "source title", "url": "source URL", "snippet": "what the source covers" }
  ]
}

JSON rules:
- The response must be valid JSON: escape backslashes as \\, quotes as \", and newlines as \n.
- Do not wrap the JSON in code fences and do not add any text before or after it."#;

use async_openai::{
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs,
    },
    Client, error::OpenAIError,
};
use async_trait::async_trait;
use libre_research_core::ports::{PortError, PortResult, ResearchGenerationService};
use std::time::Duration;
use tracing::{debug, info};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `ResearchGenerationService` using an OpenAI-compatible LLM.
#[derive(Clone)]
pub struct GeminiResearchAdapter {
    client: Client<OpenAIConfig>,
    model: String,
    timeout: Duration,
}

impl GeminiResearchAdapter {
    /// Creates a new `GeminiResearchAdapter`.
    pub fn new(client: Client<OpenAIConfig>, model: String, timeout: Duration) -> Self {
        Self {
            client,
            model,
            timeout,
        }
    }

    /// Builds the OpenAI client pointed at the given provider base URL.
    pub fn client_for(api_base: &str, api_key: &str) -> Client<OpenAIConfig> {
        let config = OpenAIConfig::new()
            .with_api_base(api_base)
            .with_api_key(api_key);
        Client::with_config(config)
    }
}

/// The user turn sent alongside the system instructions.
pub fn build_user_prompt(topic: &str, additional_context: Option<&str>) -> String {
    let mut prompt = format!("Topic: {}", topic);
    if let Some(context) = additional_context {
        prompt.push_str(&format!("\nAdditional context: {}", context));
    }
    prompt.push_str(
        "\n\nIMPORTANT: Your response MUST be one valid JSON object with no markdown code fences around it.",
    );
    prompt
}

//=========================================================================================
// `ResearchGenerationService` Trait Implementation
//=========================================================================================

#[async_trait]
impl ResearchGenerationService for GeminiResearchAdapter {
    async fn generate_research(
        &self,
        topic: &str,
        additional_context: Option<&str>,
    ) -> PortResult<String> {
        let messages = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(SYSTEM_INSTRUCTIONS)
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(build_user_prompt(topic, additional_context))
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?
                .into(),
        ];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .temperature(1.0)
            .top_p(0.95)
            .max_tokens(8192u32)
            .n(1)
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        info!(model = %self.model, "Requesting research for '{}'", topic);
        let response = tokio::time::timeout(self.timeout, self.client.chat().create(request))
            .await
            .map_err(|_| {
                PortError::Upstream(format!(
                    "Research model did not answer within {}s",
                    self.timeout.as_secs()
                ))
            })?
            .map_err(|e: OpenAIError| PortError::Upstream(e.to_string()))?;

        // Extract the text content from the first choice in the response.
        let content = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| {
                PortError::Upstream("Research LLM returned no choices in its response.".to_string())
            })?
            .message
            .content
            .ok_or_else(|| {
                PortError::Upstream("Research LLM response contained no text content.".to_string())
            })?;

        let preview: String = content.chars().take(200).collect();
        debug!("Raw research response preview: {}...", preview);
        Ok(content)
    }
}
