//! jira-search - search JIRA from the terminal.

use std::process::ExitCode;

use clap::Parser;

use jira_search::cli::{self, Cli};
use jira_search::logging;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = logging::init(cli.debug) {
        eprintln!("Warning: logging disabled: {}", e);
    }

    match cli::run(cli).await {
        Ok(()) => {
            tracing::info!("jira-search finished");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!("{}", e);
            eprintln!("Error: {}", e.user_message());
            if let Some(action) = e.suggested_action() {
                eprintln!("{}", action);
            }
            ExitCode::FAILURE
        }
    }
}
