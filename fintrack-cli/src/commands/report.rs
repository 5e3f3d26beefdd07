//! Report commands - aggregations over the logged-in user's ledger

use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;

use fintrack_core::CategoryType;

use super::{get_context, session_user};
use crate::output;

#[derive(Subcommand)]
pub enum ReportCommands {
    /// Totals per category type and currency (currencies are never converted)
    Totals {
        #[arg(long)]
        json: bool,
    },
    /// Most used categories, income first then expense
    Top {
        /// Per-type cap; defaults to ledger.mostCommonLimit
        #[arg(short, long)]
        limit: Option<usize>,
        /// Only this type (income or expense)
        #[arg(long = "type")]
        category_type: Option<CategoryType>,
        #[arg(long)]
        json: bool,
    },
}

pub async fn run(command: ReportCommands, token: Option<&str>) -> Result<()> {
    let ctx = get_context()?;
    let user_id = session_user(&ctx, token).await?;

    match command {
        ReportCommands::Totals { json } => {
            let totals = ctx.report_service.totals_by_currency_and_type(user_id).await?;
            if json {
                return output::print_json(&totals);
            }
            if totals.is_empty() {
                println!("No transactions found.");
                return Ok(());
            }
            let mut table = output::create_table();
            table.set_header(vec!["Type", "Currency", "Total"]);
            for total in &totals {
                let amount = match total.category_type {
                    CategoryType::Income => total.total_amount.to_string().green(),
                    CategoryType::Expense => total.total_amount.to_string().red(),
                };
                table.add_row(vec![
                    total.category_type.to_string(),
                    total.currency.to_string(),
                    amount.to_string(),
                ]);
            }
            println!("{}", table);
        }
        ReportCommands::Top {
            limit,
            category_type,
            json,
        } => {
            let limit = limit.unwrap_or(ctx.config.most_common_limit);
            let categories = match category_type {
                Some(t) => {
                    ctx.report_service
                        .most_common_categories_by_type(user_id, t, limit)
                        .await?
                }
                None => ctx.report_service.most_common_categories(user_id, limit).await?,
            };
            if json {
                return output::print_json(&categories);
            }
            if categories.is_empty() {
                println!("No categories in use yet.");
                return Ok(());
            }
            println!("{}", output::categories_table(&categories));
        }
    }

    Ok(())
}

/// Print the supported currency catalog
pub async fn currencies(json: bool) -> Result<()> {
    let ctx = get_context()?;
    let currencies = ctx.report_service.list_currencies();
    if json {
        return output::print_json(currencies);
    }
    output::info("Supported currencies");
    for currency in currencies {
        println!("  • {}", currency);
    }
    Ok(())
}
