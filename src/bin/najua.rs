//! Interactive console entry point: reads user text, drives turns, prints
//! assistant replies.

use std::io::{BufRead, Write};
use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use najua::{ConversationState, Graph, LlmInvoker, PgIssueStore, Result};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("najua=info")),
        )
        .init();

    let invoker = Arc::new(LlmInvoker::from_env()?);
    let mut graph = Graph::new(invoker);

    match std::env::var("DATABASE_URL") {
        Ok(url) => {
            let store = PgIssueStore::connect(&url).await?;
            graph = graph.with_repository(Arc::new(store));
            info!("issue store connected");
        }
        Err(_) => {
            info!("DATABASE_URL not set, issues will not be persisted");
        }
    }

    let mut state = ConversationState::new();
    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout();

    println!("Karibu Najua! Describe a non-emergency issue, or type 'exit' to quit.");

    loop {
        print!("> ");
        stdout.flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit") {
            break;
        }

        match graph.run_turn(&mut state, input).await {
            Ok(()) => {
                if let Some(reply) = state.last_assistant_message() {
                    println!("{reply}");
                }
            }
            Err(e) => {
                error!(error = %e, "turn failed");
                println!("Sorry, something went wrong while processing that. Please try again.");
            }
        }
    }

    println!("Kwaheri!");
    Ok(())
}
