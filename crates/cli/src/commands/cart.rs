//! Cart commands.
//!
//! Mutations apply optimistically through the cart manager; remote failures
//! resolve inside it (kept, rolled back, or logged) and never abort the
//! command.

use std::sync::Arc;

use pawmart_core::ProductId;
use pawmart_storefront::session::FlagSlot;

use super::{CliError, Context, print_notices, usd};

/// Show the current cart.
pub async fn show() -> Result<(), CliError> {
    let ctx = Context::load()?;
    let lines = ctx.cart.lines();

    if lines.is_empty() {
        println!("Your cart is empty.");
        return Ok(());
    }

    println!("{:>6}  {:<30}  {:>4}  {:>10}", "ID", "NAME", "QTY", "TOTAL");
    for line in &lines {
        println!(
            "{:>6}  {:<30}  {:>4}  {:>10}",
            line.product_id,
            line.name,
            line.quantity,
            usd(line.line_total()).display()
        );
    }
    println!();
    println!("Subtotal: {}", usd(ctx.cart.subtotal()));
    Ok(())
}

/// Add one unit of a product to the cart.
pub async fn add(product_id: i64) -> Result<(), CliError> {
    let ctx = Context::load()?;
    let mut notices = ctx.cart.subscribe();

    // Snapshot the display fields at add time
    let product = ctx.client.get_product(ProductId::new(product_id)).await?;
    ctx.cart.add_item(&product).await;

    print_notices(&mut notices);
    Ok(())
}

/// Remove a product's line from the cart.
pub async fn remove(product_id: i64) -> Result<(), CliError> {
    let ctx = Context::load()?;
    let mut notices = ctx.cart.subscribe();

    ctx.cart.remove_item(ProductId::new(product_id)).await;

    print_notices(&mut notices);
    Ok(())
}

/// Set a line's quantity. Zero or less removes the line.
pub async fn set_quantity(product_id: i64, quantity: i64) -> Result<(), CliError> {
    let ctx = Context::load()?;
    let mut notices = ctx.cart.subscribe();

    ctx.cart
        .update_quantity(ProductId::new(product_id), quantity)
        .await;

    print_notices(&mut notices);
    Ok(())
}

/// Empty the cart.
pub async fn clear() -> Result<(), CliError> {
    let ctx = Context::load()?;
    let mut notices = ctx.cart.subscribe();

    ctx.cart.clear().await;

    print_notices(&mut notices);
    Ok(())
}

/// Pull the authoritative cart from the backend.
pub async fn sync() -> Result<(), CliError> {
    let ctx = Context::load()?;

    if !ctx.client.has_token() {
        println!("Not logged in; the cart is local only.");
        return Ok(());
    }

    ctx.cart.sync_from_remote().await;
    println!("Cart synced ({} items).", ctx.cart.total_quantity());
    Ok(())
}

/// Run the cart in the background: watch session transitions and stream
/// notices until interrupted.
///
/// The flag poll re-probes the shared session slot at the configured
/// interval, so a login or logout performed by another invocation is picked
/// up here and triggers the merge or reset.
pub async fn watch() -> Result<(), CliError> {
    let ctx = Context::load()?;

    let manager = Arc::new(ctx.cart);
    let mut notices = manager.subscribe();
    let watcher = manager.clone().spawn_session_watcher();

    let flag = FlagSlot::new(ctx.config.session_flag_path());
    let poll = ctx
        .session
        .spawn_flag_poll(ctx.config.auth_poll_interval, move || flag.read());

    println!(
        "Watching the session slot every {}s; ctrl-c to stop.",
        ctx.config.auth_poll_interval.as_secs()
    );

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            notice = notices.recv() => {
                if let Ok(notice) = notice {
                    println!("{notice}");
                }
            }
        }
    }

    poll.abort();
    watcher.abort();
    println!("Stopped ({} items in cart).", manager.total_quantity());
    Ok(())
}
