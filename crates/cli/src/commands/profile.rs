//! Profile commands.

use pawmart_storefront::api::types::ProfileUpdate;

use super::{CliError, Context};

/// Show the authenticated user's profile.
pub async fn show() -> Result<(), CliError> {
    let ctx = Context::load()?;
    let profile = ctx.client.get_profile().await?;

    println!("Email:   {}", profile.email);
    if !profile.name.is_empty() {
        println!("Name:    {}", profile.name);
    }
    if !profile.address.is_empty() {
        println!("Address: {}", profile.address);
    }
    if !profile.phone.is_empty() {
        println!("Phone:   {}", profile.phone);
    }
    Ok(())
}

/// Update profile fields; omitted flags are left unchanged.
pub async fn update(
    name: Option<String>,
    address: Option<String>,
    phone: Option<String>,
) -> Result<(), CliError> {
    let ctx = Context::load()?;
    let update = ProfileUpdate {
        name,
        address,
        phone,
    };
    let profile = ctx.client.update_profile(&update).await?;
    println!("Profile updated for {}.", profile.email);
    Ok(())
}
