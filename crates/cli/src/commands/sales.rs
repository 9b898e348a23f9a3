//! Sales dashboard commands (staff accounts).

use std::str::FromStr;

use rust_decimal::Decimal;

use pawmart_core::{CampaignId, ProductId};

use super::{CliError, Context, usd};

/// Show the sales dashboard figures.
pub async fn stats() -> Result<(), CliError> {
    let ctx = Context::load()?;
    let stats = ctx.client.get_sales_stats().await?;

    println!("Revenue:          {}", usd(stats.total_revenue));
    println!("Orders:           {}", stats.total_orders);
    println!("Active campaigns: {}", stats.active_campaigns);

    if !stats.revenue_chart.is_empty() {
        println!();
        println!("Revenue by day:");
        for point in &stats.revenue_chart {
            println!("    {}  {}", point.date, usd(point.revenue));
        }
    }

    if !stats.top_products.is_empty() {
        println!();
        println!("Top products:");
        for product in &stats.top_products {
            println!(
                "    {:<30}  x{:<5}  {}",
                product.product_name,
                product.total_quantity,
                usd(product.total_revenue)
            );
        }
    }
    Ok(())
}

/// List discount campaigns.
pub async fn campaigns() -> Result<(), CliError> {
    let ctx = Context::load()?;
    let campaigns = ctx.client.get_campaigns().await?;

    if campaigns.is_empty() {
        println!("No campaigns.");
        return Ok(());
    }

    for campaign in campaigns {
        println!(
            "#{} {} - {}% off - {} ({} to {})",
            campaign.id,
            campaign.title,
            campaign.discount_percentage,
            campaign.status,
            campaign.start_date.format("%Y-%m-%d"),
            campaign.end_date.format("%Y-%m-%d")
        );
    }
    Ok(())
}

/// Show a single campaign.
pub async fn show_campaign(id: i64) -> Result<(), CliError> {
    let ctx = Context::load()?;
    let campaign = ctx.client.get_campaign(CampaignId::new(id)).await?;

    println!("Campaign #{}: {}", campaign.id, campaign.title);
    println!("Status:   {}", campaign.status);
    println!("Discount: {}%", campaign.discount_percentage);
    println!(
        "Runs:     {} to {}",
        campaign.start_date.format("%Y-%m-%d"),
        campaign.end_date.format("%Y-%m-%d")
    );
    if !campaign.description.is_empty() {
        println!("{}", campaign.description);
    }
    if !campaign.products.is_empty() {
        let ids: Vec<String> = campaign.products.iter().map(ToString::to_string).collect();
        println!("Products: {}", ids.join(", "));
    }
    Ok(())
}

/// Change a product's list price.
pub async fn set_price(product_id: i64, price: &str) -> Result<(), CliError> {
    let price = Decimal::from_str(price)
        .map_err(|e| CliError::Argument(format!("invalid price {price}: {e}")))?;
    let ctx = Context::load()?;

    ctx.client
        .update_product_price(ProductId::new(product_id), price)
        .await?;

    println!("Price of product {} set to {}.", product_id, usd(price));
    Ok(())
}
