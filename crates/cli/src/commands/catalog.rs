//! Catalog browsing commands.

use pawmart_core::ProductId;

use super::{CliError, Context, usd};

/// List all products.
pub async fn list_products() -> Result<(), CliError> {
    let ctx = Context::load()?;
    let products = ctx.client.get_products().await?;

    if products.is_empty() {
        println!("No products available.");
        return Ok(());
    }

    println!("{:>6}  {:<30}  {:>10}  {}", "ID", "NAME", "PRICE", "STOCK");
    for product in products {
        let stock = product
            .stock
            .map_or_else(|| "-".to_string(), |s| s.to_string());
        println!(
            "{:>6}  {:<30}  {:>10}  {}",
            product.id,
            product.name,
            usd(product.price).display(),
            stock
        );
    }
    Ok(())
}

/// Show a single product in detail.
pub async fn show_product(id: i64) -> Result<(), CliError> {
    let ctx = Context::load()?;
    let product = ctx.client.get_product(ProductId::new(id)).await?;

    println!("{} (#{})", product.name, product.id);
    println!("Price: {}", usd(product.price));
    if let Some(stock) = product.stock {
        println!("Stock: {stock}");
    }
    if !product.description.is_empty() {
        println!();
        println!("{}", product.description);
    }
    Ok(())
}

/// List product categories.
pub async fn list_categories() -> Result<(), CliError> {
    let ctx = Context::load()?;
    let categories = ctx.client.get_categories().await?;

    for category in categories {
        println!("{:>6}  {}", category.id, category.name);
    }
    Ok(())
}
