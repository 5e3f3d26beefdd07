//! Transaction commands - the logged-in user's transaction ledger

use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use clap::Subcommand;
use colored::Colorize;
use dialoguer::Confirm;
use rust_decimal::Decimal;

use fintrack_core::{Currency, DateWindow, NewTransaction, TransactionUpdate};

use super::{get_context, parse_amount, parse_date, parse_end_date, session_user};
use crate::output;

#[derive(Subcommand)]
pub enum TxCommands {
    /// Record a transaction
    Add {
        #[arg(long, value_parser = parse_amount)]
        amount: Decimal,
        /// Category id (must be one of yours)
        #[arg(long)]
        category: i64,
        #[arg(long)]
        description: String,
        #[arg(long, default_value = "USD")]
        currency: Currency,
        /// Event date, defaults to now
        #[arg(long, value_parser = parse_date)]
        date: Option<DateTime<Utc>>,
        #[arg(long)]
        json: bool,
    },
    /// Show one of your transactions
    Show {
        id: i64,
        #[arg(long)]
        json: bool,
    },
    /// List all your transactions
    List {
        #[arg(long)]
        json: bool,
    },
    /// Latest transactions by date
    Recent {
        /// Defaults to ledger.recentLimit
        #[arg(short, long)]
        limit: Option<usize>,
        #[arg(long)]
        json: bool,
    },
    /// Transactions inside a date window (inclusive)
    Window {
        #[arg(long, value_parser = parse_date, requires = "to")]
        from: Option<DateTime<Utc>>,
        #[arg(long, value_parser = parse_end_date, requires = "from")]
        to: Option<DateTime<Utc>>,
        /// Trailing months ending now; defaults to ledger.windowMonths
        #[arg(long, conflicts_with_all = ["from", "to"])]
        months: Option<u32>,
        #[arg(long)]
        json: bool,
    },
    /// Change fields of a transaction; omitted fields stay unchanged
    Update {
        id: i64,
        #[arg(long, value_parser = parse_amount)]
        amount: Option<Decimal>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        currency: Option<Currency>,
        #[arg(long, value_parser = parse_date)]
        date: Option<DateTime<Utc>>,
        #[arg(long)]
        category: Option<i64>,
        #[arg(long)]
        json: bool,
    },
    /// Delete a transaction
    Remove {
        id: i64,
        /// Skip confirmation prompt
        #[arg(long, short)]
        force: bool,
    },
}

pub async fn run(command: TxCommands, token: Option<&str>) -> Result<()> {
    let ctx = get_context()?;
    let user_id = session_user(&ctx, token).await?;

    match command {
        TxCommands::Add {
            amount,
            category,
            description,
            currency,
            date,
            json,
        } => {
            let tx = ctx
                .transaction_service
                .create_transaction(NewTransaction {
                    user_id,
                    category_id: category,
                    amount,
                    currency,
                    description,
                    date: date.unwrap_or_else(Utc::now),
                })
                .await?;
            if json {
                return output::print_json(&tx);
            }
            output::success(&format!("Recorded transaction {}", tx.id));
        }
        TxCommands::Show { id, json } => {
            let tx = ctx.transaction_service.find_by_id(id).await?;
            if tx.user_id != user_id {
                bail!("Transaction with ID {} not found", id);
            }
            if json {
                return output::print_json(&tx);
            }
            let category = ctx
                .category_service
                .find_by_id_and_user(tx.category_id, user_id)
                .await?;
            let entry = fintrack_core::TransactionWithCategory {
                transaction: tx,
                category,
            };
            println!("{}", output::transactions_table(&[entry]));
        }
        TxCommands::List { json } => {
            let entries = ctx.transaction_service.find_by_user(user_id).await?;
            print_entries(&entries, json)?;
        }
        TxCommands::Recent { limit, json } => {
            let limit = limit.unwrap_or(ctx.config.recent_limit);
            let entries = ctx.transaction_service.find_recent(user_id, limit).await?;
            print_entries(&entries, json)?;
        }
        TxCommands::Window {
            from,
            to,
            months,
            json,
        } => {
            let entries = match (from, to) {
                (Some(from), Some(to)) => {
                    let window = DateWindow::new(from, to)?;
                    ctx.transaction_service.find_in_window(user_id, &window).await?
                }
                _ => {
                    let months = months.unwrap_or(ctx.config.window_months);
                    ctx.transaction_service.find_last_months(user_id, months).await?
                }
            };
            print_entries(&entries, json)?;
        }
        TxCommands::Update {
            id,
            amount,
            description,
            currency,
            date,
            category,
            json,
        } => {
            if !ctx.transaction_service.belongs_to_user(user_id, id).await? {
                bail!("Transaction with ID {} not found", id);
            }
            let tx = ctx
                .transaction_service
                .update_transaction(
                    id,
                    TransactionUpdate {
                        amount,
                        description,
                        currency,
                        date,
                        category_id: category,
                        user_id: Some(user_id),
                    },
                )
                .await?;
            if json {
                return output::print_json(&tx);
            }
            output::success(&format!("Updated transaction {}", tx.id));
        }
        TxCommands::Remove { id, force } => {
            if !force
                && !Confirm::new()
                    .with_prompt(format!("Delete transaction {}?", id))
                    .default(false)
                    .interact()?
            {
                println!("{}\n", "Cancelled".dimmed());
                return Ok(());
            }
            ctx.transaction_service.remove_for_user(user_id, id).await?;
            output::success(&format!("Deleted transaction {}", id));
        }
    }

    Ok(())
}

fn print_entries(entries: &[fintrack_core::TransactionWithCategory], json: bool) -> Result<()> {
    if json {
        return output::print_json(entries);
    }
    if entries.is_empty() {
        println!("No transactions found.");
        return Ok(());
    }
    println!("{}", output::transactions_table(entries));
    Ok(())
}
