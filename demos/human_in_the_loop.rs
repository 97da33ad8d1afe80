//! An assistant and a human take turns until the human types APPROVE.

use agentlab::auth::DefaultCredential;
use agentlab::clients::azure_openai::{AzureAuth, AzureOpenAIClient};
use agentlab::orchestration::{Participant, RoundRobinGroupChat, TerminationCondition, UserProxy};
use agentlab::{Agent, AgentLabConfig};
use std::sync::Arc;

const TASK: &str = "Write a summary about the biggest news from 2025-02-03 about deepseek, \
if you can't find information just say I cant surf the internet to find this.";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    agentlab::init_logger();

    let config = AgentLabConfig::from_env();
    let auth = AzureAuth::from_config(&config, Arc::new(DefaultCredential::from_env()));
    let client = Arc::new(AzureOpenAIClient::from_config(&config, auth));

    let assistant: Arc<dyn Participant> = Arc::new(Agent::new("assistant", client));
    let user_proxy: Arc<dyn Participant> = Arc::new(UserProxy::stdin("user_proxy"));

    let mut team = RoundRobinGroupChat::new(vec![assistant, user_proxy])?
        .with_termination(TerminationCondition::TextMention("APPROVE".to_string()));

    println!("---------- user ----------\n{}", TASK);
    team.start(TASK);
    while let Some(message) = team.next_message().await? {
        println!("---------- {} ----------\n{}", message.name, message.content);
    }
    println!("Stopped: {}", team.stop_reason().unwrap_or("unknown"));
    Ok(())
}
