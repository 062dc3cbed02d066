//! Command-line surface and command dispatch.

use std::io::{self, Write};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::{info, warn};

use crate::api::{Auth, HttpTransport};
use crate::config::{resolve_credentials, Config, Settings};
use crate::context::SearchContext;
use crate::error::{AppError, Result};
use crate::search::{
    format_issue_detail, format_issue_line, render_outcome, resolve_sequential, ResolutionResult,
};

/// Search a JIRA server from the terminal.
#[derive(Debug, Parser)]
#[command(name = "jira-search", version, about)]
pub struct Cli {
    /// Log at debug level.
    #[arg(long, global = true)]
    pub debug: bool,

    /// JIRA server URL, overriding the config file.
    #[arg(long, global = true)]
    pub server: Option<String>,

    /// Concurrent issue resolutions, overriding the config file.
    #[arg(long, global = true)]
    pub workers: Option<usize>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run a JQL query and print one line per issue.
    Search {
        /// The JQL query; multiple words are joined with spaces.
        #[arg(required = true, num_args = 1..)]
        jql: Vec<String>,

        /// Resolve issues one at a time instead of concurrently.
        #[arg(long)]
        sequential: bool,
    },
    /// Print the main fields of one issue.
    Show {
        /// The issue key (e.g., "PROJ-123").
        ticket: String,
    },
}

impl Cli {
    /// Apply command-line overrides to the configured settings.
    pub fn apply_overrides(&self, settings: &mut Settings) {
        if let Some(server) = &self.server {
            settings.server = server.clone();
        }
        if let Some(workers) = self.workers {
            settings.workers = workers;
        }
    }
}

/// Run the parsed command to completion.
pub async fn run(cli: Cli) -> Result<()> {
    let config = match Config::load() {
        Ok(config) => Some(config),
        Err(e) => {
            warn!("Could not load config, using defaults: {}", e);
            None
        }
    };

    let mut settings = config
        .as_ref()
        .map(|c| c.settings.clone())
        .unwrap_or_default();
    cli.apply_overrides(&mut settings);
    settings.validate()?;

    let urls = SearchContext::urls_for(&settings);
    let server = urls.server().to_string();
    let credentials = tokio::task::spawn_blocking(move || resolve_credentials(config.as_ref(), &server))
        .await
        .map_err(|e| AppError::Io(io::Error::other(e)))??;

    let auth = Auth::new(&credentials.username, &credentials.password);
    let transport = HttpTransport::connect(&urls, auth, &credentials.password).await?;
    let ctx = SearchContext::new(Arc::new(transport), urls, settings);

    match cli.command {
        Command::Search { jql, sequential } => search(&ctx, &jql.join(" "), sequential).await?,
        Command::Show { ticket } => show(&ctx, &ticket).await?,
    }

    ctx.log_stats();
    Ok(())
}

async fn search(ctx: &SearchContext, jql: &str, sequential: bool) -> Result<()> {
    let views = ctx.search_issues(jql).await?;
    info!("Resolving {} issues", views.len());

    let results = if sequential {
        resolve_sequential(&views, format_issue_line).await
    } else {
        ctx.resolver().resolve_all(&views, format_issue_line).await
    };

    let mut stdout = io::stdout().lock();
    for result in &results {
        writeln!(stdout, "{}", render_outcome(result))?;
    }

    let failed = failure_count(&results);
    if failed > 0 {
        warn!("{} of {} issues could not be resolved", failed, results.len());
        eprintln!("{} of {} issues could not be resolved", failed, results.len());
    }
    Ok(())
}

async fn show(ctx: &SearchContext, ticket: &str) -> Result<()> {
    let view = ctx.issue(ticket);
    let lines = format_issue_detail(&view).await?;

    let mut stdout = io::stdout().lock();
    for line in lines {
        writeln!(stdout, "{}", line)?;
    }
    Ok(())
}

/// Count failures in a result set.
pub fn failure_count(results: &[ResolutionResult]) -> usize {
    results.iter().filter(|r| !r.is_resolved()).count()
}
