//! Authentication commands.
//!
//! Login stores the issued token and flips the shared session flag, then
//! merges the guest cart into the account cart. Logout clears all local
//! session state; the guest cart does not survive a logout.

use secrecy::ExposeSecret;

use super::{CliError, Context};
use pawmart_core::Email;
use pawmart_storefront::session::FlagSlot;

/// Log in, persist the session, and merge the guest cart.
pub async fn login(email: &str, password: &str) -> Result<(), CliError> {
    // Reject structurally broken addresses before any request is made
    let email = Email::parse(email)?;
    let ctx = Context::load()?;

    let profile = ctx.client.login(email.as_str(), password).await?;

    persist_token(&ctx)?;
    FlagSlot::new(ctx.config.session_flag_path()).write(true)?;
    ctx.session.set_authenticated(true);

    // Guest lines merge into the account cart exactly once per session
    ctx.cart.merge_on_login().await;

    println!("Logged in as {}.", profile.email);
    println!("Cart: {} items.", ctx.cart.total_quantity());
    Ok(())
}

/// Create an account. Does not log in.
pub async fn signup(email: &str, password: &str, name: &str) -> Result<(), CliError> {
    let email = Email::parse(email)?;
    let ctx = Context::load()?;
    let profile = ctx.client.signup(email.as_str(), password, name).await?;
    println!("Account created for {}. Log in to continue.", profile.email);
    Ok(())
}

/// Log out and clear local session state.
pub async fn logout() -> Result<(), CliError> {
    let ctx = Context::load()?;

    // Local state is cleared even if the server call fails
    let result = ctx.client.logout().await;
    if let Err(e) = &result {
        tracing::warn!(error = %e, "server-side logout failed, clearing local session anyway");
    }

    remove_token(&ctx)?;
    FlagSlot::new(ctx.config.session_flag_path()).write(false)?;
    ctx.session.set_authenticated(false);
    ctx.cart.handle_logout();

    println!("Logged out.");
    Ok(())
}

/// Show session status.
pub fn status() -> Result<(), CliError> {
    let ctx = Context::load()?;
    if ctx.client.has_token() {
        println!("Logged in ({} items in cart).", ctx.cart.total_quantity());
    } else {
        println!("Not logged in ({} items in cart).", ctx.cart.total_quantity());
    }
    Ok(())
}

fn persist_token(ctx: &Context) -> Result<(), CliError> {
    let path = ctx.config.token_path();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    // The client holds the token it just received at login
    if let Some(token) = ctx.client.token_snapshot() {
        std::fs::write(path, token.expose_secret())?;
    }
    Ok(())
}

fn remove_token(ctx: &Context) -> Result<(), CliError> {
    match std::fs::remove_file(ctx.config.token_path()) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}
