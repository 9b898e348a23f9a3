//! PawMart CLI - command-line storefront for the pet store backend.
//!
//! # Usage
//!
//! ```bash
//! # Browse the catalog
//! pawmart products list
//! pawmart products show 4
//! pawmart categories
//!
//! # Work the cart (guest carts persist locally and merge on login)
//! pawmart cart add 4
//! pawmart cart set-qty 4 3
//! pawmart cart show
//!
//! # Authenticate
//! pawmart auth login -e user@example.com -p hunter2
//! pawmart auth logout
//!
//! # Order
//! pawmart orders
//! pawmart checkout --card-name "J. Doe" --card-number 4242424242424242 \
//!     --expiry 12/27 --cvv 123 --address "1 Bone Lane"
//!
//! # Stay resident and react to logins made elsewhere
//! pawmart cart watch
//!
//! # Staff surfaces
//! pawmart sales stats
//! pawmart delivery orders --status in-transit
//! pawmart delivery set-status DEL-001 delivered
//! pawmart support show 5
//! ```
//!
//! # Environment Variables
//!
//! - `PAWMART_API_URL` - Base URL of the pet-store backend API (required)
//! - `PAWMART_DATA_DIR` - Local state directory (default: `.pawmart`)
//! - `PAWMART_AUTH_POLL_SECS` - Session flag poll interval for `cart watch`
//!   (default: 2)

#![cfg_attr(not(test), forbid(unsafe_code))]
#![allow(clippy::print_stdout)]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "pawmart")]
#[command(author, version, about = "PawMart pet store CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Browse products
    Products {
        #[command(subcommand)]
        action: ProductAction,
    },
    /// List product categories
    Categories,
    /// Manage the shopping cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Authenticate against the backend
    Auth {
        #[command(subcommand)]
        action: AuthAction,
    },
    /// Show or update the user profile
    Profile {
        #[command(subcommand)]
        action: ProfileAction,
    },
    /// List past orders
    Orders,
    /// Place an order for the current cart (mocked payment)
    Checkout {
        /// Name on the card
        #[arg(long)]
        card_name: String,

        /// Card number (never validated beyond the mock)
        #[arg(long)]
        card_number: String,

        /// Expiry, MM/YY
        #[arg(long)]
        expiry: String,

        /// Card verification value
        #[arg(long)]
        cvv: String,

        /// Delivery address
        #[arg(long)]
        address: String,
    },
    /// Sales dashboard and campaigns (staff)
    Sales {
        #[command(subcommand)]
        action: SalesAction,
    },
    /// Delivery tracking (staff)
    Delivery {
        #[command(subcommand)]
        action: DeliveryAction,
    },
    /// Support conversations
    Support {
        #[command(subcommand)]
        action: SupportAction,
    },
}

#[derive(Subcommand)]
enum SalesAction {
    /// Show revenue and order figures
    Stats,
    /// List discount campaigns
    Campaigns,
    /// Show a single campaign
    Campaign {
        /// Campaign id
        id: i64,
    },
    /// Change a product's list price
    SetPrice {
        /// Product id
        product_id: i64,

        /// New price, e.g. 19.99
        price: String,
    },
}

#[derive(Subcommand)]
enum DeliveryAction {
    /// Show delivery figures
    Stats,
    /// List deliveries
    Orders {
        /// Filter by status (processing, in-transit, delivered, cancelled)
        #[arg(long)]
        status: Option<String>,
    },
    /// Set a delivery's status
    SetStatus {
        /// Delivery id, e.g. DEL-001
        delivery_id: String,

        /// New status (processing, in-transit, delivered)
        status: String,
    },
}

#[derive(Subcommand)]
enum SupportAction {
    /// Open a new conversation
    Start,
    /// Show a conversation and its transcript
    Show {
        /// Conversation id
        id: i64,
    },
    /// Close a conversation
    Close {
        /// Conversation id
        id: i64,
    },
}

#[derive(Subcommand)]
enum ProductAction {
    /// List all products
    List,
    /// Show a single product
    Show {
        /// Product id
        id: i64,
    },
}

#[derive(Subcommand)]
enum CartAction {
    /// Show the current cart
    Show,
    /// Add one unit of a product
    Add {
        /// Product id
        product_id: i64,
    },
    /// Remove a product's line entirely
    Remove {
        /// Product id
        product_id: i64,
    },
    /// Set a line's quantity (zero or less removes the line)
    SetQty {
        /// Product id
        product_id: i64,

        /// New quantity
        quantity: i64,
    },
    /// Empty the cart
    Clear,
    /// Pull the authoritative cart from the backend
    Sync,
    /// Stay resident: watch for session changes and stream cart notices
    Watch,
}

#[derive(Subcommand)]
enum AuthAction {
    /// Log in and merge the guest cart
    Login {
        /// Account email
        #[arg(short, long)]
        email: String,

        /// Account password
        #[arg(short, long)]
        password: String,
    },
    /// Create an account
    Signup {
        /// Account email
        #[arg(short, long)]
        email: String,

        /// Account password
        #[arg(short, long)]
        password: String,

        /// Display name
        #[arg(short, long)]
        name: String,
    },
    /// Log out and clear local session state
    Logout,
    /// Show whether a session is active
    Status,
}

#[derive(Subcommand)]
enum ProfileAction {
    /// Show the authenticated user's profile
    Show,
    /// Update profile fields
    Update {
        /// Display name
        #[arg(long)]
        name: Option<String>,

        /// Delivery address
        #[arg(long)]
        address: Option<String>,

        /// Phone number
        #[arg(long)]
        phone: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), commands::CliError> {
    match cli.command {
        Commands::Products { action } => match action {
            ProductAction::List => commands::catalog::list_products().await?,
            ProductAction::Show { id } => commands::catalog::show_product(id).await?,
        },
        Commands::Categories => commands::catalog::list_categories().await?,
        Commands::Cart { action } => match action {
            CartAction::Show => commands::cart::show().await?,
            CartAction::Add { product_id } => commands::cart::add(product_id).await?,
            CartAction::Remove { product_id } => commands::cart::remove(product_id).await?,
            CartAction::SetQty {
                product_id,
                quantity,
            } => commands::cart::set_quantity(product_id, quantity).await?,
            CartAction::Clear => commands::cart::clear().await?,
            CartAction::Sync => commands::cart::sync().await?,
            CartAction::Watch => commands::cart::watch().await?,
        },
        Commands::Auth { action } => match action {
            AuthAction::Login { email, password } => {
                commands::auth::login(&email, &password).await?;
            }
            AuthAction::Signup {
                email,
                password,
                name,
            } => commands::auth::signup(&email, &password, &name).await?,
            AuthAction::Logout => commands::auth::logout().await?,
            AuthAction::Status => commands::auth::status()?,
        },
        Commands::Profile { action } => match action {
            ProfileAction::Show => commands::profile::show().await?,
            ProfileAction::Update {
                name,
                address,
                phone,
            } => commands::profile::update(name, address, phone).await?,
        },
        Commands::Orders => commands::orders::list().await?,
        Commands::Checkout {
            card_name,
            card_number,
            expiry,
            cvv,
            address,
        } => {
            commands::orders::checkout(card_name, card_number, expiry, cvv, address).await?;
        }
        Commands::Sales { action } => match action {
            SalesAction::Stats => commands::sales::stats().await?,
            SalesAction::Campaigns => commands::sales::campaigns().await?,
            SalesAction::Campaign { id } => commands::sales::show_campaign(id).await?,
            SalesAction::SetPrice { product_id, price } => {
                commands::sales::set_price(product_id, &price).await?;
            }
        },
        Commands::Delivery { action } => match action {
            DeliveryAction::Stats => commands::delivery::stats().await?,
            DeliveryAction::Orders { status } => commands::delivery::orders(status).await?,
            DeliveryAction::SetStatus {
                delivery_id,
                status,
            } => commands::delivery::set_status(&delivery_id, &status).await?,
        },
        Commands::Support { action } => match action {
            SupportAction::Start => commands::support::start().await?,
            SupportAction::Show { id } => commands::support::show(id).await?,
            SupportAction::Close { id } => commands::support::close(id).await?,
        },
    }
    Ok(())
}
