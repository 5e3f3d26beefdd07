//! User commands - the identity store

use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;
use dialoguer::Confirm;

use fintrack_core::services::AuthService;
use fintrack_core::{FintrackContext, User, UserUpdate};

use super::{get_context, session_user};
use crate::output;

#[derive(Subcommand)]
pub enum UserCommands {
    /// Show a user (defaults to the logged-in user)
    Show {
        id: Option<i64>,
        #[arg(long)]
        json: bool,
    },
    /// List all users
    List {
        #[arg(long)]
        json: bool,
    },
    /// Update the logged-in user; omitted fields stay unchanged
    Update {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        email: Option<String>,
        /// New password
        #[arg(long)]
        password: Option<String>,
        #[arg(long)]
        json: bool,
    },
    /// Delete the logged-in user with all categories and transactions
    Delete {
        /// Skip confirmation prompt
        #[arg(long, short)]
        force: bool,
    },
}

fn user_table(users: &[User]) -> comfy_table::Table {
    let mut table = output::create_table();
    table.set_header(vec!["ID", "Name", "Email", "Created"]);
    for user in users {
        table.add_row(vec![
            user.id.to_string(),
            user.name.clone(),
            user.email.clone(),
            user.created_at.format("%Y-%m-%d %H:%M").to_string(),
        ]);
    }
    table
}

pub async fn run(command: UserCommands, token: Option<&str>) -> Result<()> {
    let ctx = get_context()?;
    execute(&ctx, command, token).await
}

/// Every user command needs a session, including reads of other users
async fn execute(ctx: &FintrackContext, command: UserCommands, token: Option<&str>) -> Result<()> {
    let user_id = session_user(ctx, token).await?;

    match command {
        UserCommands::Show { id, json } => {
            let id = id.unwrap_or(user_id);
            let user = ctx.user_service.find_by_id(id).await?;
            if json {
                return output::print_json(&user);
            }
            println!("{}", user_table(&[user]));
        }
        UserCommands::List { json } => {
            let users = ctx.user_service.list_users().await?;
            if json {
                return output::print_json(&users);
            }
            if users.is_empty() {
                println!("No users registered.");
                return Ok(());
            }
            println!("{}", user_table(&users));
        }
        UserCommands::Update {
            name,
            email,
            password,
            json,
        } => {
            let password_hash = password
                .as_deref()
                .map(AuthService::hash_password)
                .transpose()?;
            let user = ctx
                .user_service
                .update_user(
                    user_id,
                    UserUpdate {
                        name,
                        email,
                        password_hash,
                    },
                )
                .await?;
            if json {
                return output::print_json(&user);
            }
            output::success(&format!("Updated user {}", user.id));
        }
        UserCommands::Delete { force } => {
            if !force {
                println!(
                    "\n{}",
                    "This deletes your account, all categories and all transactions.".yellow()
                );
                if !Confirm::new()
                    .with_prompt("Are you sure?")
                    .default(false)
                    .interact()?
                {
                    println!("{}\n", "Cancelled".dimmed());
                    return Ok(());
                }
            }
            ctx.user_service.delete_user(user_id).await?;
            output::success(&format!("Deleted user {}", user_id));
        }
    }

    Ok(())
}
