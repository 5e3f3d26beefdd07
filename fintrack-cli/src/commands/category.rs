//! Category commands - the logged-in user's category ledger

use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;
use dialoguer::Confirm;

use fintrack_core::{CategoryType, CategoryUpdate};

use super::{get_context, session_user};
use crate::output;

#[derive(Subcommand)]
pub enum CategoryCommands {
    /// List your categories
    List {
        /// Only this type (income or expense)
        #[arg(long = "type")]
        category_type: Option<CategoryType>,
        #[arg(long)]
        json: bool,
    },
    /// Show one of your categories
    Show {
        id: i64,
        #[arg(long)]
        json: bool,
    },
    /// Create a category
    Add {
        name: String,
        /// income or expense
        #[arg(long = "type")]
        category_type: CategoryType,
        #[arg(long)]
        json: bool,
    },
    /// Rename a category or change its type
    Update {
        id: i64,
        #[arg(long)]
        name: Option<String>,
        #[arg(long = "type")]
        category_type: Option<CategoryType>,
        #[arg(long)]
        json: bool,
    },
    /// Delete a category that no transaction uses
    Remove {
        id: i64,
        /// Skip confirmation prompt
        #[arg(long, short)]
        force: bool,
    },
}

pub async fn run(command: CategoryCommands, token: Option<&str>) -> Result<()> {
    let ctx = get_context()?;
    let user_id = session_user(&ctx, token).await?;

    match command {
        CategoryCommands::List {
            category_type,
            json,
        } => {
            let mut categories = ctx.category_service.find_by_user(user_id).await?;
            if let Some(t) = category_type {
                categories.retain(|c| c.category_type == t);
            }
            if json {
                return output::print_json(&categories);
            }
            if categories.is_empty() {
                println!("No categories found.");
                return Ok(());
            }
            println!("{}", output::categories_table(&categories));
        }
        CategoryCommands::Show { id, json } => {
            let category = ctx.category_service.find_by_id_and_user(id, user_id).await?;
            if json {
                return output::print_json(&category);
            }
            println!("{}", output::categories_table(&[category]));
        }
        CategoryCommands::Add {
            name,
            category_type,
            json,
        } => {
            let category = ctx
                .category_service
                .create_category(user_id, &name, category_type)
                .await?;
            if json {
                return output::print_json(&category);
            }
            output::success(&format!(
                "Created {} category '{}' (id {})",
                category.category_type, category.name, category.id
            ));
        }
        CategoryCommands::Update {
            id,
            name,
            category_type,
            json,
        } => {
            // Only the owner may touch it
            ctx.category_service.find_by_id_and_user(id, user_id).await?;
            let category = ctx
                .category_service
                .update_category(id, CategoryUpdate { name, category_type })
                .await?;
            if json {
                return output::print_json(&category);
            }
            output::success(&format!("Updated category {}", category.id));
        }
        CategoryCommands::Remove { id, force } => {
            if !force {
                let category = ctx.category_service.find_by_id_and_user(id, user_id).await?;
                if !Confirm::new()
                    .with_prompt(format!("Delete category '{}'?", category.name))
                    .default(false)
                    .interact()?
                {
                    println!("{}\n", "Cancelled".dimmed());
                    return Ok(());
                }
            }
            ctx.category_service.remove_for_user(user_id, id).await?;
            output::success(&format!("Deleted category {}", id));
        }
    }

    Ok(())
}
