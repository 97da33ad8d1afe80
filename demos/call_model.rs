//! Call an Azure OpenAI chat deployment directly and print the reply with its
//! token usage.
//!
//! ```text
//! AZURE_OPENAI_URL=https://myaoai.openai.azure.com cargo run --example call_model
//! ```

use agentlab::auth::DefaultCredential;
use agentlab::clients::azure_openai::{AzureAuth, AzureOpenAIClient};
use agentlab::{AgentLabConfig, ClientWrapper, Message, Role};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    agentlab::init_logger();

    let config = AgentLabConfig::from_env();
    let auth = AzureAuth::from_config(&config, Arc::new(DefaultCredential::from_env()));
    let client = AzureOpenAIClient::from_config(&config, auth);

    let reply = client
        .send_message(&[
            Message::new(
                Role::System,
                "You are a comedian specialized in telling short story jokes.",
            ),
            Message::new(Role::User, "Tell me a joke"),
        ])
        .await?;

    println!("{}", reply.content);
    if let Some(usage) = client.get_last_usage().await {
        println!(
            "Tokens: input {}, output {}, total {}",
            usage.input_tokens, usage.output_tokens, usage.total_tokens
        );
    }
    Ok(())
}
