//! The `AzureOpenAIClient` struct implements `ClientWrapper` for Azure OpenAI chat
//! completion deployments, capturing the assistant response and the token usage of
//! each call.
//!
//! # Example
//!
//! ```rust,no_run
//! use agentlab::clients::azure_openai::{AzureAuth, AzureOpenAIClient};
//! use agentlab::client_wrapper::{ClientWrapper, Message, Role};
//! use agentlab::AgentLabConfig;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//!     let config = AgentLabConfig::from_env();
//!     let client = AzureOpenAIClient::from_config(&config, AzureAuth::ApiKey("...".into()));
//!
//!     let reply = client
//!         .send_message(&[
//!             Message::new(Role::System, "You are an assistant."),
//!             Message::new(Role::User, "Hello!"),
//!         ])
//!         .await?;
//!     println!("Assistant: {}", reply.content);
//!
//!     if let Some(usage) = client.get_last_usage().await {
//!         println!("tokens: {} in / {} out", usage.input_tokens, usage.output_tokens);
//!     }
//!     Ok(())
//! }
//! ```

use std::error::Error;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::agentlab::auth::{BearerTokenCache, BearerTokenProvider, TokenCredential};
use crate::agentlab::client_wrapper::{ClientWrapper, Message, Role, TokenUsage};
use crate::agentlab::clients::http_pool::{base_url_of, get_or_create_client};
use crate::agentlab::config::AgentLabConfig;

/// How requests to the deployment are authenticated.
#[derive(Clone)]
pub enum AzureAuth {
    /// Static key sent in the `api-key` header.
    ApiKey(String),
    /// Entra ID bearer token for the Cognitive Services scope.
    BearerToken(BearerTokenProvider),
}

impl AzureAuth {
    /// The configured API key when there is one, otherwise bearer tokens for the
    /// Cognitive Services scope issued by `credential`.
    pub fn from_config(config: &AgentLabConfig, credential: Arc<dyn TokenCredential>) -> Self {
        match &config.api_key {
            Some(key) => AzureAuth::ApiKey(key.clone()),
            None => AzureAuth::BearerToken(BearerTokenProvider::new(
                Arc::new(BearerTokenCache::new(credential)),
                config.cognitive_services_scope.clone(),
            )),
        }
    }
}

/// A chat completion request that did not produce a reply.
#[derive(Debug, Clone)]
pub struct AzureOpenAIError {
    /// HTTP status, when the service answered at all.
    pub status: Option<u16>,
    pub message: String,
}

impl fmt::Display for AzureOpenAIError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(status) => write!(f, "Azure OpenAI error ({}): {}", status, self.message),
            None => write!(f, "Azure OpenAI error: {}", self.message),
        }
    }
}

impl Error for AzureOpenAIError {}

#[derive(Serialize)]
struct WireMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    messages: Vec<WireMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct Usage {
    prompt_tokens: usize,
    completion_tokens: usize,
    total_tokens: usize,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
}

/// Client wrapper for one Azure OpenAI chat deployment.
pub struct AzureOpenAIClient {
    endpoint: String,
    deployment: String,
    api_version: String,
    auth: AzureAuth,
    temperature: Option<f32>,
    /// Storage for the token usage returned by the most recent request.
    token_usage: Mutex<Option<TokenUsage>>,
}

impl AzureOpenAIClient {
    pub fn new(endpoint: &str, deployment: &str, api_version: &str, auth: AzureAuth) -> Self {
        AzureOpenAIClient {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            deployment: deployment.to_string(),
            api_version: api_version.to_string(),
            auth,
            temperature: None,
            token_usage: Mutex::new(None),
        }
    }

    pub fn from_config(config: &AgentLabConfig, auth: AzureAuth) -> Self {
        Self::new(
            &config.azure_openai_endpoint,
            &config.deployment_name,
            &config.api_version,
            auth,
        )
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    fn completions_url(&self) -> String {
        format!(
            "{}/openai/deployments/{}/chat/completions?api-version={}",
            self.endpoint, self.deployment, self.api_version
        )
    }

    async fn request(&self, messages: &[Message]) -> Result<Message, AzureOpenAIError> {
        if self.endpoint.is_empty() {
            return Err(AzureOpenAIError {
                status: None,
                message: "endpoint is not configured (AZURE_OPENAI_URL)".to_string(),
            });
        }

        let url = self.completions_url();
        let body = ChatCompletionRequest {
            messages: messages
                .iter()
                .map(|m| WireMessage {
                    role: m.role.as_str(),
                    content: &m.content,
                })
                .collect(),
            temperature: self.temperature,
        };

        let mut request = get_or_create_client(base_url_of(&url)).post(&url).json(&body);
        request = match &self.auth {
            AzureAuth::ApiKey(key) => request.header("api-key", key),
            AzureAuth::BearerToken(provider) => {
                let token = provider.get_token().await.map_err(|e| AzureOpenAIError {
                    status: None,
                    message: e.to_string(),
                })?;
                request.bearer_auth(token)
            }
        };

        let response = request.send().await.map_err(|e| AzureOpenAIError {
            status: None,
            message: e.to_string(),
        })?;
        let status = response.status();
        let text = response.text().await.map_err(|e| AzureOpenAIError {
            status: Some(status.as_u16()),
            message: e.to_string(),
        })?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorEnvelope>(&text)
                .map(|env| env.error.message)
                .unwrap_or(text);
            return Err(AzureOpenAIError {
                status: Some(status.as_u16()),
                message,
            });
        }

        let parsed: ChatCompletionResponse =
            serde_json::from_str(&text).map_err(|e| AzureOpenAIError {
                status: Some(status.as_u16()),
                message: format!("unreadable completion: {}", e),
            })?;

        if let Some(usage) = parsed.usage {
            *self.token_usage.lock().await = Some(TokenUsage {
                input_tokens: usage.prompt_tokens,
                output_tokens: usage.completion_tokens,
                total_tokens: usage.total_tokens,
            });
        }

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| AzureOpenAIError {
                status: Some(status.as_u16()),
                message: "completion carried no choices".to_string(),
            })?;

        Ok(Message::new(Role::Assistant, content))
    }
}

#[async_trait]
impl ClientWrapper for AzureOpenAIClient {
    fn model_name(&self) -> &str {
        &self.deployment
    }

    async fn send_message(
        &self,
        messages: &[Message],
    ) -> Result<Message, Box<dyn Error + Send + Sync>> {
        match self.request(messages).await {
            Ok(reply) => Ok(reply),
            Err(err) => {
                log::error!("AzureOpenAIClient::send_message(...): {}", err);
                Err(Box::new(err))
            }
        }
    }

    fn usage_slot(&self) -> Option<&Mutex<Option<TokenUsage>>> {
        Some(&self.token_usage)
    }
}
