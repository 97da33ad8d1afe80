//! Two agents write and run Python in an Azure Container Apps dynamic sessions
//! pool.
//!
//! Needs `AZURE_OPENAI_URL` and `ACA_POOL_MANAGEMENT_ENDPOINT`, plus Azure
//! credentials (service principal variables or `az login`).

use agentlab::auth::{DefaultCredential, TokenCredential};
use agentlab::clients::azure_openai::{AzureAuth, AzureOpenAIClient};
use agentlab::chat::ChatMessage;
use agentlab::coding_session::{CodingSession, SessionOutcome};
use agentlab::{AgentLabConfig, ExecutionResult, RemoteCodeExecutor};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    agentlab::init_logger();

    let config = AgentLabConfig::from_env();
    let credential: Arc<dyn TokenCredential> = Arc::new(DefaultCredential::from_env());
    let client = Arc::new(AzureOpenAIClient::from_config(
        &config,
        AzureAuth::from_config(&config, credential.clone()),
    ));
    let executor = RemoteCodeExecutor::from_config(&config, credential);

    let request = "Write Python code to calculate the 14th Fibonacci number.";
    println!("User: {}", request);
    println!("\n--- Starting remote coding session ---\n");

    let session = CodingSession::new(client, executor)
        .on_message(Box::new(|message: &ChatMessage| {
            println!("\n{}", "-".repeat(80));
            println!("[{}]: {}", message.name, message.content);
        }))
        .on_execution(Box::new(|result: &ExecutionResult| {
            println!("\n{}", "-".repeat(80));
            println!("Remote Execution Result:");
            println!("Exit Code: {}", result.exit_code);
            println!("Output:\n{}", result.output);
        }));

    let report = session.run(request).await?;
    match report.outcome {
        SessionOutcome::Succeeded => println!("\n--- Code executed successfully! ---"),
        SessionOutcome::ExecutionFailed => println!("\n--- Remote execution failed ---"),
        SessionOutcome::NoCodeProduced => println!("\n--- Reached maximum iterations ---"),
    }
    println!("\n--- Remote coding session completed ---\n");
    Ok(())
}
