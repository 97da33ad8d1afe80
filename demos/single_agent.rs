//! A single agent with a persona, asked twice on the same thread so the second
//! request can build on the first.

use agentlab::auth::DefaultCredential;
use agentlab::clients::azure_openai::{AzureAuth, AzureOpenAIClient};
use agentlab::{Agent, AgentLabConfig, AgentThread};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    agentlab::init_logger();

    let config = AgentLabConfig::from_env();
    let auth = AzureAuth::from_config(&config, Arc::new(DefaultCredential::from_env()));
    let client = Arc::new(AzureOpenAIClient::from_config(&config, auth));

    let chatbot = Agent::new("chatbot", client)
        .with_description("A test chatbot.")
        .with_instructions("You are a comedian specialized in telling short story jokes.");

    let mut thread = AgentThread::new();

    let first = chatbot.get_response(&mut thread, "Tell me a joke").await?;
    println!("Agent's final response: {}", first.content);
    if let Some(usage) = &first.tokens_used {
        println!("Tokens used: {}", usage.total_tokens);
    }

    println!("Now a joke about fruits, on the same thread");
    let second = chatbot
        .get_response(&mut thread, "Tell me another joke, but about fruits.")
        .await?;
    println!("Agent's final response: {}", second.content);
    println!("Thread holds {} messages", thread.len());
    Ok(())
}
