//! Fintrack CLI - Personal finance ledger in your terminal

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod output;

use commands::{auth, category, logs, report, tx, user};
use fintrack_core::services::LogEvent;

/// Fintrack - personal finance ledger in your terminal
#[derive(Parser)]
#[command(name = "ft", version, about, long_about = None)]
struct Cli {
    /// Session token from `ft login`
    #[arg(long, global = true, env = "FINTRACK_TOKEN", hide_env_values = true)]
    token: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an account (seeds the default categories)
    Register {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        /// Prompted for when omitted
        #[arg(long)]
        password: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Exchange credentials for a session token
    Login {
        #[arg(long)]
        email: String,
        /// Prompted for when omitted
        #[arg(long)]
        password: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Manage user accounts
    User {
        #[command(subcommand)]
        command: user::UserCommands,
    },

    /// Manage income and expense categories
    Category {
        #[command(subcommand)]
        command: category::CategoryCommands,
    },

    /// Record and browse transactions
    Tx {
        #[command(subcommand)]
        command: tx::TxCommands,
    },

    /// Totals and category rankings
    Report {
        #[command(subcommand)]
        command: report::ReportCommands,
    },

    /// List supported currencies
    Currencies {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Inspect the command event log
    Logs {
        #[command(subcommand)]
        command: logs::LogsCommands,
    },
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Commands::Register { .. } => "register",
            Commands::Login { .. } => "login",
            Commands::User { .. } => "user",
            Commands::Category { .. } => "category",
            Commands::Tx { .. } => "tx",
            Commands::Report { .. } => "report",
            Commands::Currencies { .. } => "currencies",
            Commands::Logs { .. } => "logs",
        }
    }

    /// Entity recorded in the event log
    fn entity(&self) -> Option<&'static str> {
        match self {
            Commands::Register { .. } | Commands::User { .. } => Some("user"),
            Commands::Category { .. } => Some("category"),
            Commands::Tx { .. } | Commands::Report { .. } => Some("transaction"),
            _ => None,
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    let command_name = cli.command.name();
    let entity = cli.command.entity();

    let result = tokio::runtime::Runtime::new()
        .context("Failed to start async runtime")
        .and_then(|runtime| runtime.block_on(run(cli)));

    // The logs command inspects the log itself; don't record it
    if command_name != "logs" {
        let logger = commands::get_logger();
        let mut event = match &result {
            Ok(()) => LogEvent::new("command_executed"),
            Err(e) => LogEvent::new("command_failed")
                .with_error(e.to_string())
                .with_error_details(format!("{:#}", e)),
        }
        .with_command(command_name);
        if let Some(entity) = entity {
            event = event.with_entity(entity);
        }
        commands::log_event(&logger, event);
    }

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output::error(&format!("Error: {:#}", e));
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let token = cli.token.as_deref();
    match cli.command {
        Commands::Register {
            name,
            email,
            password,
            json,
        } => auth::register(name, email, password, json).await,
        Commands::Login {
            email,
            password,
            json,
        } => auth::login(email, password, json).await,
        Commands::User { command } => user::run(command, token).await,
        Commands::Category { command } => category::run(command, token).await,
        Commands::Tx { command } => tx::run(command, token).await,
        Commands::Report { command } => report::run(command, token).await,
        Commands::Currencies { json } => report::currencies(json).await,
        Commands::Logs { command } => logs::run(command),
    }
}
