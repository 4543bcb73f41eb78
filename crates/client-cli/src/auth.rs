//! Sign-in flows: register, login, claim admin, whoami, logout.
//!
//! Successful sign-ins store the returned token in the config file.

use anyhow::{bail, Result};
use shared::{AuthResponse, Credentials};
use std::io::{self, BufRead, Write};

use crate::api::ApiClient;
use crate::config::Config;

/// Password from the flag, `FLOWSTATE_PASSWORD`, or a prompt on stdin
pub fn resolve_password(flag: Option<String>) -> Result<String> {
    if let Some(password) = flag.or_else(|| std::env::var("FLOWSTATE_PASSWORD").ok()) {
        return Ok(password);
    }

    eprint!("Password: ");
    io::stderr().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    let password = line.trim_end_matches(['\r', '\n']).to_string();
    if password.is_empty() {
        bail!("No password given");
    }
    Ok(password)
}

fn store_token(config: &mut Config, server: &str, auth: &AuthResponse) -> Result<()> {
    config.remote.server = Some(server.to_string());
    config.remote.token = Some(auth.token.clone());
    config.save()
}

fn report(auth: &AuthResponse) {
    println!("\x1b[1;32m✅ Signed in\x1b[0m");
    println!("\x1b[90mUser ID: {}\x1b[0m", auth.user_id);
    if auth.is_admin {
        println!("Role: admin");
    }
}

pub async fn register(client: &ApiClient, config: &mut Config, credentials: Credentials) -> Result<()> {
    let auth = client.register(&credentials).await?;
    store_token(config, client.base(), &auth)?;
    report(&auth);
    Ok(())
}

pub async fn login(client: &ApiClient, config: &mut Config, credentials: Credentials) -> Result<()> {
    let auth = client.login(&credentials).await?;
    store_token(config, client.base(), &auth)?;
    report(&auth);
    Ok(())
}

/// Claims admin for the signed-in user; only the first claim on a server wins
pub async fn claim_admin(client: &ApiClient, config: &mut Config) -> Result<()> {
    let auth = client.claim_admin().await?;
    store_token(config, client.base(), &auth)?;
    println!("\x1b[1;32m✅ You are now the admin\x1b[0m");
    Ok(())
}

/// Logout by clearing the stored token
pub fn logout(config: &mut Config) -> Result<()> {
    config.remote.token = None;
    config.save()?;
    println!("\x1b[32m✅ Logged out successfully\x1b[0m");
    Ok(())
}

/// Show current login status, as the server sees it
pub async fn whoami(client: &ApiClient, config: &Config) -> Result<()> {
    if config.remote.token.is_none() {
        println!("\x1b[33m✗ Not logged in\x1b[0m");
        println!("Run '\x1b[1mflowstate login\x1b[0m' to authenticate");
        return Ok(());
    }

    let me = client.me().await?;
    println!("\x1b[32m✓ Logged in\x1b[0m");
    println!("Server: {}", client.base());
    println!("Email: {}", me.email);
    println!("User ID: {}", me.user_id);
    println!("Admin: {}", if me.is_admin { "yes" } else { "no" });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_flag_wins() {
        assert_eq!(resolve_password(Some("hunter22".into())).unwrap(), "hunter22");
    }
}
