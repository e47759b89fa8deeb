use financial_research_assistant::{build_orchestrator, session::APOLOGY, Config, Session};
use std::io::Write;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const GOODBYE: &str = "Thank you for using the Financial Research Assistant. Goodbye!";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logs go to stderr so they never interleave with answers
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    println!("Initializing Financial Research Assistant...");

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let orchestrator = match build_orchestrator(&config).await {
        Ok(orchestrator) => Arc::new(orchestrator),
        Err(e) => {
            eprintln!("Error: failed to initialize: {}", e);
            std::process::exit(1);
        }
    };

    info!(strategy = %config.strategy, fan_out = %config.fan_out, "Assistant ready");

    let mut session = Session::new(orchestrator, config.history_exchanges);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    println!("\n===== Financial Research Assistant =====");
    println!("Ask about stock prices, news, or company information.");
    println!("Type 'exit' to quit.");
    println!("=======================================");

    loop {
        print!("\nWhat would you like to know? ");
        std::io::stdout().flush()?;

        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => None,
        };

        // end of input or Ctrl-C at the prompt
        let Some(line) = line else {
            println!("\n{}", GOODBYE);
            break;
        };

        let query = line.trim();
        if query.eq_ignore_ascii_case("exit") {
            println!("{}", GOODBYE);
            break;
        }
        if query.is_empty() {
            continue;
        }

        println!("\nResearching your question...");

        tokio::select! {
            result = session.ask(query) => match result {
                Ok(outcome) => println!("\nAnswer: {}", outcome.answer),
                Err(e) => {
                    error!(error = %e, "Error processing query");
                    println!("\n{}", APOLOGY);
                }
            },
            _ = tokio::signal::ctrl_c() => {
                println!("\nCancelled.");
            }
        }
    }

    Ok(())
}
