//! Register and login commands

use anyhow::Result;
use colored::Colorize;
use dialoguer::Password;

use fintrack_core::services::AuthService;
use fintrack_core::NewUser;

use super::get_context;
use crate::output;

fn read_password(password: Option<String>, confirm: bool) -> Result<String> {
    if let Some(password) = password {
        output::warning("Passing --password on the command line leaves it in shell history");
        return Ok(password);
    }
    let mut prompt = Password::new().with_prompt("Password");
    if confirm {
        prompt = prompt.with_confirmation("Confirm password", "Passwords do not match");
    }
    Ok(prompt.interact()?)
}

pub async fn register(
    name: String,
    email: String,
    password: Option<String>,
    json: bool,
) -> Result<()> {
    let ctx = get_context()?;
    let password = read_password(password, true)?;
    let hash = AuthService::hash_password(&password)?;

    let user = ctx
        .user_service
        .create_user(NewUser::new(name, email, hash))
        .await?;

    if json {
        return output::print_json(&user);
    }

    output::success(&format!("Registered user {} (id {})", user.email, user.id));
    println!(
        "{}",
        "15 default categories were created. Run `ft login` to start a session.".dimmed()
    );
    Ok(())
}

pub async fn login(email: String, password: Option<String>, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let password = read_password(password, false)?;
    let token = ctx.auth_service.login(&email, &password).await?;

    if json {
        return output::print_json(&token);
    }

    output::success(&format!(
        "Logged in; token valid for {} hours",
        token.expires_in / 3600
    ));
    println!();
    println!("export FINTRACK_TOKEN={}", token.access_token);
    Ok(())
}
