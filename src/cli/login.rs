use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::oauth::token::now_ms;
use crate::oauth::AuthSession;

use super::output::format_expiry;

/// Run the login command: authorize once and persist the token.
pub async fn run_login(config: AuthConfig, force: bool) -> Result<(), AuthError> {
    println!("Gmail MCP Server - Authentication");
    println!("==================================\n");
    println!("Config directory: {}\n", config.config_dir.display());

    let auth = AuthSession::new(config)?;

    if auth.is_authenticated() && !force {
        println!("Already authenticated!");
        println!(
            "To re-authenticate, delete {} and run this command again, or pass --force.",
            auth.store().token_path().display()
        );
        return Ok(());
    }

    if auth.config().headless {
        println!("Running in headless mode (no browser available)\n");
    }

    let session = auth.authorize().await?;
    println!("Authentication successful! Token saved.");
    println!("Token expires: {}", format_expiry(session.expiry_date(), now_ms()));
    println!("\nAuthentication complete! You can now use the Gmail MCP server.");
    Ok(())
}
