//! Delivery tracking commands (staff accounts).

use pawmart_core::OrderStatus;

use super::{CliError, Context, usd};

/// Show the delivery dashboard figures.
pub async fn stats() -> Result<(), CliError> {
    let ctx = Context::load()?;
    let stats = ctx.client.get_delivery_stats().await?;

    println!("Total orders:      {}", stats.total_orders);
    println!("Processing:        {}", stats.processing_orders);
    println!("In transit:        {}", stats.in_transit_orders);
    println!("Delivered:         {}", stats.delivered_orders);
    println!("Today:             {}", stats.today_orders);
    println!("Pending:           {}", stats.pending_deliveries);
    println!("Delivered revenue: {}", usd(stats.delivered_revenue));
    if let Some(days) = stats.avg_delivery_days {
        println!("Avg days:          {days:.1}");
    }
    Ok(())
}

/// List deliveries, optionally filtered by status.
pub async fn orders(status: Option<String>) -> Result<(), CliError> {
    let status = status
        .as_deref()
        .map(str::parse::<OrderStatus>)
        .transpose()
        .map_err(CliError::Argument)?;

    let ctx = Context::load()?;
    let deliveries = ctx.client.get_deliveries(status).await?;

    if deliveries.is_empty() {
        println!("No deliveries.");
        return Ok(());
    }

    for delivery in deliveries {
        let delivered = delivery
            .delivery_date
            .map_or_else(|| "-".to_string(), |d| d.to_string());
        println!(
            "{:<10}  {:<12}  {:>10}  ordered {}  delivered {}  {}",
            delivery.delivery_id,
            delivery.status,
            usd(delivery.total_price).display(),
            delivery.order_date,
            delivered,
            delivery.customer_name
        );
    }
    Ok(())
}

/// Set a delivery's status.
pub async fn set_status(delivery_id: &str, status: &str) -> Result<(), CliError> {
    let status: OrderStatus = status.parse().map_err(CliError::Argument)?;
    let ctx = Context::load()?;

    let delivery = ctx.client.update_delivery_status(delivery_id, status).await?;

    match delivery.delivery_date {
        Some(date) => println!(
            "Delivery {} marked {} (delivered {date}).",
            delivery.delivery_id, delivery.status
        ),
        None => println!(
            "Delivery {} marked {}.",
            delivery.delivery_id, delivery.status
        ),
    }
    Ok(())
}
