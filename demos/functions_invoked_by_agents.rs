//! An agent that answers math and time questions by calling native tools.
//! Type `exit` to quit.

use agentlab::auth::DefaultCredential;
use agentlab::clients::azure_openai::{AzureAuth, AzureOpenAIClient};
use agentlab::tool_protocol::ToolRegistry;
use agentlab::tools::{CalculatorPlugin, TimePlugin};
use agentlab::{Agent, AgentLabConfig, AgentThread};
use std::io::{self, BufRead, Write};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    agentlab::init_logger();

    let config = AgentLabConfig::from_env();
    let auth = AzureAuth::from_config(&config, Arc::new(DefaultCredential::from_env()));
    let client = Arc::new(AzureOpenAIClient::from_config(&config, auth));

    let mut tools = ToolRegistry::empty();
    tools.add_protocol("calculator", Arc::new(CalculatorPlugin)).await?;
    tools.add_protocol("time", Arc::new(TimePlugin)).await?;

    let agent = Agent::new("MathTimeAssistant", client)
        .with_instructions(
            "You are a helpful assistant. For math operations, you always call your 'calculate' function, \
             and to get current time, you call the 'get_time' function. You can't chat about anything else.",
        )
        .with_tools(tools);

    let mut thread = AgentThread::new();
    let stdin = io::stdin();
    loop {
        print!("User: ");
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let user_input = line.trim();
        if user_input.eq_ignore_ascii_case("exit") {
            break;
        }

        let response = agent.get_response(&mut thread, user_input).await?;
        println!("Assistant: {}", response.content);
    }
    Ok(())
}
