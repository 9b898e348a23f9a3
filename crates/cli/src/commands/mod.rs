//! Command implementations and shared plumbing.
//!
//! Every command builds its state fresh: configuration from the environment,
//! an API client with the stored token restored, and a cart manager over the
//! durable local slot. The session flag file carries authentication state
//! between invocations.

pub mod auth;
pub mod cart;
pub mod catalog;
pub mod delivery;
pub mod orders;
pub mod profile;
pub mod sales;
pub mod support;

use std::io::ErrorKind;

use secrecy::SecretString;
use thiserror::Error;

use pawmart_core::EmailError;

use pawmart_storefront::api::{ApiError, StoreClient};
use pawmart_storefront::cart::CartManager;
use pawmart_storefront::cart::storage::JsonFileStore;
use pawmart_storefront::config::{ClientConfig, ConfigError};
use pawmart_storefront::session::{FlagSlot, SessionMode, SessionProvider};

/// Errors surfaced to the top-level command dispatcher.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Email(#[from] EmailError),

    #[error("{0}")]
    Argument(String),
}

/// Everything a command needs: config, client, session, cart manager.
pub struct Context {
    pub config: ClientConfig,
    pub client: StoreClient,
    pub session: SessionProvider,
    pub cart: CartManager<StoreClient, JsonFileStore>,
}

impl Context {
    /// Build the per-invocation context from the environment and the local
    /// state directory.
    pub fn load() -> Result<Self, CliError> {
        let config = ClientConfig::from_env()?;
        let client = StoreClient::new(&config)?;

        // Restore the stored token, if any
        match std::fs::read_to_string(config.token_path()) {
            Ok(token) if !token.trim().is_empty() => {
                client.set_token(SecretString::from(token.trim().to_string()));
            }
            Ok(_) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        let flag = FlagSlot::new(config.session_flag_path());
        let session = SessionProvider::new(if flag.read() {
            SessionMode::Authenticated
        } else {
            SessionMode::Guest
        });

        let store = JsonFileStore::new(config.cart_store_path());
        let cart = CartManager::new(client.clone(), store, session.subscribe());

        Ok(Self {
            config,
            client,
            session,
            cart,
        })
    }
}

/// Print any notifications the cart emitted during this invocation.
pub fn print_notices(notices: &mut tokio::sync::broadcast::Receiver<pawmart_storefront::cart::Notice>) {
    while let Ok(notice) = notices.try_recv() {
        println!("{notice}");
    }
}

/// The backend quotes all amounts in US dollars.
pub fn usd(amount: rust_decimal::Decimal) -> pawmart_core::Price {
    pawmart_core::Price::new(amount, pawmart_core::CurrencyCode::USD)
}
