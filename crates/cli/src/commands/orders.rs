//! Order history and checkout commands.

use pawmart_storefront::api::types::CheckoutRequest;

use super::{CliError, Context, print_notices, usd};

/// List the authenticated user's orders.
pub async fn list() -> Result<(), CliError> {
    let ctx = Context::load()?;
    let orders = ctx.client.get_orders().await?;

    if orders.is_empty() {
        println!("No orders yet.");
        return Ok(());
    }

    for order in orders {
        println!(
            "Order #{} - {} - {} ({})",
            order.id,
            order.status,
            usd(order.total),
            order.created_at.format("%Y-%m-%d")
        );
        for item in &order.items {
            println!(
                "    {} x{} @ {}",
                item.product_name,
                item.quantity,
                usd(item.price)
            );
        }
    }
    Ok(())
}

/// Place an order through the mocked payment flow, then empty the cart.
pub async fn checkout(
    card_name: String,
    card_number: String,
    expiry: String,
    cvv: String,
    address: String,
) -> Result<(), CliError> {
    let ctx = Context::load()?;

    if ctx.cart.lines().is_empty() {
        println!("Your cart is empty; nothing to order.");
        return Ok(());
    }

    let request = CheckoutRequest {
        card_name,
        card_number,
        expiry,
        cvv,
        delivery_address: address,
    };
    let receipt = ctx.client.place_order(&request).await?;

    println!("Order #{} placed ({}).", receipt.order_id, receipt.status);
    if !receipt.message.is_empty() {
        println!("{}", receipt.message);
    }

    // The order consumed the cart
    let mut notices = ctx.cart.subscribe();
    ctx.cart.clear().await;
    print_notices(&mut notices);
    Ok(())
}
