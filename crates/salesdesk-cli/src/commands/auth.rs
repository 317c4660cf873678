use std::io::{self, Write};

use anyhow::{bail, Context, Result};
use chrono::Local;
use serde_json::json;

use super::print_json;
use crate::app::App;

const PASSWORD_ENV: &str = "SALESDESK_PASSWORD";

pub async fn login(app: &mut App, username: Option<String>) -> Result<()> {
    let username = match username {
        Some(u) => u,
        None => prompt_username(app.config.last_username.as_deref())?,
    };
    if username.is_empty() {
        bail!("Username is required");
    }

    let password = match std::env::var(PASSWORD_ENV) {
        Ok(p) if !p.is_empty() => p,
        _ => rpassword::prompt_password("Password: ").context("Failed to read password")?,
    };

    app.client
        .login(&username, &password)
        .await
        .map_err(|e| anyhow::anyhow!(e.message().to_string()))?;
    app.remember_username(&username);

    if app.json {
        print_json(&json!({ "username": username, "authenticated": true }))
    } else {
        println!("Logged in as {}", username);
        Ok(())
    }
}

fn prompt_username(last: Option<&str>) -> Result<String> {
    match last {
        Some(last) => print!("Username [{}]: ", last),
        None => print!("Username: "),
    }
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    let entered = line.trim();
    Ok(match (entered.is_empty(), last) {
        (true, Some(last)) => last.to_string(),
        _ => entered.to_string(),
    })
}

pub fn logout(app: &App) -> Result<()> {
    app.client.logout();
    if !app.json {
        println!("Logged out");
    }
    Ok(())
}

pub fn whoami(app: &App) -> Result<()> {
    let authenticated = app.client.is_authenticated();
    let identity = app.client.identity();

    if app.json {
        return print_json(&json!({
            "authenticated": authenticated,
            "identity": identity,
        }));
    }

    match identity {
        Some(claims) if authenticated => {
            println!("Logged in as {}", claims.display_name());
            if let Some(expires) = claims.expires_at() {
                println!(
                    "Access valid until {}",
                    expires.with_timezone(&Local).format("%Y-%m-%d %H:%M")
                );
            }
        }
        Some(claims) if app.client.session().current_refresh().is_some() => {
            println!(
                "Logged in as {} (access expired, renewed on the next request)",
                claims.display_name()
            );
        }
        _ => println!("Not logged in"),
    }
    Ok(())
}
