//! OpenAI judge model for evalflow
//!
//! Provides [`OpenAIJudge`], the production implementation of
//! [`evalflow::judge::JudgeModel`] backed by the OpenAI chat completions
//! API.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use evalflow::metric::Metric;
//! use evalflow::metrics::AnswerRelevancyMetric;
//! use evalflow::test_case::LLMTestCase;
//! use evalflow_openai::OpenAIJudge;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> evalflow::error::Result<()> {
//!     // Uses the OPENAI_API_KEY env var
//!     let judge = Arc::new(OpenAIJudge::new().with_model("gpt-4o"));
//!     let metric = AnswerRelevancyMetric::new(judge);
//!
//!     let case = LLMTestCase::new("What is Rust?", "Rust is a systems language.");
//!     let result = metric.measure(&case).await?;
//!     println!("{:.3}: {}", result.score, result.reason);
//!     Ok(())
//! }
//! ```

use async_openai::config::OpenAIConfig;
use async_openai::types::{
    ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
};
use async_openai::Client;
use async_trait::async_trait;
use evalflow::error::{EvalError, Result};
use evalflow::judge::JudgeModel;

/// Default judge model. Temperature 0.0 for scoring consistency.
pub const DEFAULT_MODEL: &str = "gpt-4o";

/// OpenAI-backed judge model.
///
/// Transport, auth, and provider failures surface as
/// [`EvalError::Judge`]; response schema enforcement stays with the metric
/// that issued the prompt.
pub struct OpenAIJudge {
    client: Client<OpenAIConfig>,
    config: OpenAIConfig,
    model: String,
    temperature: f32,
}

impl Default for OpenAIJudge {
    fn default() -> Self {
        Self::new()
    }
}

impl OpenAIJudge {
    /// Create a judge using the `OPENAI_API_KEY` environment variable.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(OpenAIConfig::default())
    }

    /// Create a judge with an explicit client configuration.
    #[must_use]
    pub fn with_config(config: OpenAIConfig) -> Self {
        Self {
            client: Client::with_config(config.clone()),
            config,
            model: DEFAULT_MODEL.to_string(),
            temperature: 0.0,
        }
    }

    /// Set the model used for judging.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the sampling temperature. Keep it at 0.0 unless you have a
    /// reason not to; judge consistency matters more than variety.
    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Set the API key.
    #[must_use]
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.config = self.config.with_api_key(api_key);
        self.client = Client::with_config(self.config.clone());
        self
    }

    /// Point the client at a different API base URL (proxy, mock server,
    /// compatible provider).
    #[must_use]
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.config = self.config.with_api_base(api_base);
        self.client = Client::with_config(self.config.clone());
        self
    }

    /// The configured model name.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// The configured temperature.
    #[must_use]
    pub fn temperature(&self) -> f32 {
        self.temperature
    }
}

#[async_trait]
impl JudgeModel for OpenAIJudge {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let message = ChatCompletionRequestUserMessageArgs::default()
            .content(prompt)
            .build()
            .map_err(|e| EvalError::Configuration(format!("invalid judge message: {e}")))?;
        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .temperature(self.temperature)
            .messages([message.into()])
            .build()
            .map_err(|e| EvalError::Configuration(format!("invalid judge request: {e}")))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| EvalError::Judge(e.to_string()))?;

        let content = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .ok_or_else(|| EvalError::Judge("completion contained no content".to_string()))?;

        tracing::debug!(
            model = %self.model,
            completion_len = content.len(),
            "judge completion received"
        );
        Ok(content)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
