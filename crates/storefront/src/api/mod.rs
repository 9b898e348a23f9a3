//! PawMart backend REST API client.
//!
//! # Architecture
//!
//! - The backend is the source of truth for the authenticated cart, the
//!   catalog, and orders; this client is a thin JSON layer over it
//! - Catalog reads are cached in-memory via `moka` (5 minute TTL)
//! - Cart operations are never cached (mutable state); the cart manager
//!   re-fetches after mutations instead of trusting optimistic state
//!
//! # Example
//!
//! ```rust,ignore
//! use pawmart_storefront::api::StoreClient;
//! use pawmart_storefront::config::ClientConfig;
//!
//! let config = ClientConfig::from_env()?;
//! let client = StoreClient::new(&config)?;
//!
//! let products = client.get_products().await?;
//! let profile = client.login("user@example.com", "hunter2!").await?;
//! ```

mod cache;
pub mod types;

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use moka::future::Cache;
use reqwest::{Method, StatusCode, header};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, instrument};
use url::Url;

use pawmart_core::{CampaignId, CartLineId, ConversationId, OrderStatus, ProductId};
use rust_decimal::Decimal;

use crate::cart::CartBackend;
use crate::config::ClientConfig;

use cache::CacheValue;
use types::{
    Campaign, CartPayload, Category, CheckoutReceipt, CheckoutRequest, Conversation, Delivery,
    DeliveryListPayload, DeliveryStats, DeliveryStatusUpdate, LoginRequest, LoginResponse,
    MergeRequest, NewCartLine, Order, PriceUpdate, Product, ProfileUpdate, QuantityUpdate,
    RemoteCartLine, SalesStats, SignupRequest, UserProfile,
};

/// Catalog cache TTL.
const CATALOG_CACHE_TTL: Duration = Duration::from_secs(300);

/// Maximum response body length echoed into logs and error messages.
const MAX_LOGGED_BODY: usize = 500;

/// Errors that can occur when talking to the backend API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP request failed (connect, timeout, transport).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned a non-success status.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Response body could not be parsed.
    #[error("parse error: {0}")]
    Parse(String),

    /// Resource not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Request requires authentication and no valid token was presented.
    #[error("authentication required")]
    Unauthorized,
}

// =============================================================================
// StoreClient
// =============================================================================

/// Client for the PawMart backend API.
///
/// Cheaply cloneable via `Arc`. Holds the bearer token issued at login;
/// requests carry it automatically once set.
#[derive(Clone)]
pub struct StoreClient {
    inner: Arc<StoreClientInner>,
}

struct StoreClientInner {
    http: reqwest::Client,
    base_url: Url,
    token: RwLock<Option<SecretString>>,
    catalog_cache: Cache<String, CacheValue>,
}

impl StoreClient {
    /// Create a new backend API client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build.
    pub fn new(config: &ClientConfig) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .build()?;

        let catalog_cache = Cache::builder()
            .max_capacity(1000)
            .time_to_live(CATALOG_CACHE_TTL)
            .build();

        Ok(Self {
            inner: Arc::new(StoreClientInner {
                http,
                base_url: config.api_url.clone(),
                token: RwLock::new(None),
                catalog_cache,
            }),
        })
    }

    // =========================================================================
    // Token handling
    // =========================================================================

    fn token_read(&self) -> RwLockReadGuard<'_, Option<SecretString>> {
        self.inner.token.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn token_write(&self) -> RwLockWriteGuard<'_, Option<SecretString>> {
        self.inner
            .token
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Install a bearer token (e.g., one restored from disk).
    pub fn set_token(&self, token: SecretString) {
        *self.token_write() = Some(token);
    }

    /// Drop the bearer token; subsequent requests are unauthenticated.
    pub fn clear_token(&self) {
        *self.token_write() = None;
    }

    /// Whether a bearer token is currently installed.
    #[must_use]
    pub fn has_token(&self) -> bool {
        self.token_read().is_some()
    }

    /// Clone of the currently installed token, for persisting across runs.
    #[must_use]
    pub fn token_snapshot(&self) -> Option<SecretString> {
        self.token_read().clone()
    }

    // =========================================================================
    // Request plumbing
    // =========================================================================

    fn request(&self, method: Method, path: &str) -> Result<reqwest::RequestBuilder, ApiError> {
        let url = self
            .inner
            .base_url
            .join(path)
            .map_err(|e| ApiError::Parse(format!("invalid path {path}: {e}")))?;

        let mut builder = self.inner.http.request(method, url);
        if let Some(token) = self.token_read().as_ref() {
            builder = builder.header(
                header::AUTHORIZATION,
                format!("Token {}", token.expose_secret()),
            );
        }
        Ok(builder)
    }

    /// Send a request and parse the JSON response body.
    async fn execute<T: DeserializeOwned>(
        &self,
        builder: reqwest::RequestBuilder,
    ) -> Result<T, ApiError> {
        let text = self.execute_raw(builder).await?;
        serde_json::from_str(&text).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %truncate(&text),
                "failed to parse backend response"
            );
            ApiError::Parse(e.to_string())
        })
    }

    /// Send a request, check the status, and discard the body.
    async fn execute_unit(&self, builder: reqwest::RequestBuilder) -> Result<(), ApiError> {
        self.execute_raw(builder).await.map(|_| ())
    }

    async fn execute_raw(&self, builder: reqwest::RequestBuilder) -> Result<String, ApiError> {
        let response = builder.send().await?;
        let status = response.status();
        let path = response.url().path().to_string();
        let text = response.text().await?;

        match status {
            StatusCode::UNAUTHORIZED => Err(ApiError::Unauthorized),
            StatusCode::NOT_FOUND => Err(ApiError::NotFound(path)),
            s if s.is_success() => Ok(text),
            s => Err(ApiError::Api {
                status: s.as_u16(),
                message: truncate(&text),
            }),
        }
    }

    // =========================================================================
    // Catalog (cached)
    // =========================================================================

    /// Get the full product list.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn get_products(&self) -> Result<Vec<Product>, ApiError> {
        let cache_key = "products".to_string();

        if let Some(CacheValue::Products(products)) =
            self.inner.catalog_cache.get(&cache_key).await
        {
            debug!("Cache hit for products");
            return Ok(products);
        }

        let products: Vec<Product> = self.execute(self.request(Method::GET, "products/")?).await?;

        self.inner
            .catalog_cache
            .insert(cache_key, CacheValue::Products(products.clone()))
            .await;

        Ok(products)
    }

    /// Get a single product by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the product does not exist or the request fails.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn get_product(&self, product_id: ProductId) -> Result<Product, ApiError> {
        let cache_key = format!("product:{product_id}");

        if let Some(CacheValue::Product(product)) = self.inner.catalog_cache.get(&cache_key).await
        {
            debug!("Cache hit for product");
            return Ok(*product);
        }

        let product: Product = self
            .execute(self.request(Method::GET, &format!("products/{product_id}/"))?)
            .await?;

        self.inner
            .catalog_cache
            .insert(cache_key, CacheValue::Product(Box::new(product.clone())))
            .await;

        Ok(product)
    }

    /// Get the category list.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn get_categories(&self) -> Result<Vec<Category>, ApiError> {
        let cache_key = "categories".to_string();

        if let Some(CacheValue::Categories(categories)) =
            self.inner.catalog_cache.get(&cache_key).await
        {
            debug!("Cache hit for categories");
            return Ok(categories);
        }

        let categories: Vec<Category> = self
            .execute(self.request(Method::GET, "categories/")?)
            .await?;

        self.inner
            .catalog_cache
            .insert(cache_key, CacheValue::Categories(categories.clone()))
            .await;

        Ok(categories)
    }

    /// Invalidate all cached catalog data.
    pub async fn invalidate_catalog(&self) {
        self.inner.catalog_cache.invalidate_all();
        self.inner.catalog_cache.run_pending_tasks().await;
    }

    // =========================================================================
    // Auth & profile
    // =========================================================================

    /// Log in with email and password.
    ///
    /// On success the issued token is installed on the client and the
    /// user's profile is returned.
    ///
    /// # Errors
    ///
    /// Returns an error if the credentials are rejected or the request fails.
    #[instrument(skip(self, password), fields(email = %email))]
    pub async fn login(&self, email: &str, password: &str) -> Result<UserProfile, ApiError> {
        let body = LoginRequest { email, password };
        let response: LoginResponse = self
            .execute(self.request(Method::POST, "auth/login/")?.json(&body))
            .await?;

        self.set_token(SecretString::from(response.token));
        Ok(response.user)
    }

    /// Create an account.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the signup or the request fails.
    #[instrument(skip(self, password), fields(email = %email))]
    pub async fn signup(
        &self,
        email: &str,
        password: &str,
        name: &str,
    ) -> Result<UserProfile, ApiError> {
        let body = SignupRequest {
            email,
            password,
            name,
        };
        self.execute(self.request(Method::POST, "auth/signup/")?.json(&body))
            .await
    }

    /// Log out: invalidate the server-side session and drop the local token.
    ///
    /// The local token is dropped even if the server call fails.
    ///
    /// # Errors
    ///
    /// Returns an error if the logout request fails.
    #[instrument(skip(self))]
    pub async fn logout(&self) -> Result<(), ApiError> {
        let result = self
            .execute_unit(self.request(Method::POST, "auth/logout/")?)
            .await;
        self.clear_token();
        result
    }

    /// Get the authenticated user's profile.
    ///
    /// # Errors
    ///
    /// Returns an error if not authenticated or the request fails.
    #[instrument(skip(self))]
    pub async fn get_profile(&self) -> Result<UserProfile, ApiError> {
        self.execute(self.request(Method::GET, "profile/")?).await
    }

    /// Update the authenticated user's profile.
    ///
    /// # Errors
    ///
    /// Returns an error if not authenticated or the request fails.
    #[instrument(skip(self, update))]
    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<UserProfile, ApiError> {
        self.execute(self.request(Method::PATCH, "profile/")?.json(update))
            .await
    }

    // =========================================================================
    // Orders & checkout (mocked payment)
    // =========================================================================

    /// Get the authenticated user's order history.
    ///
    /// # Errors
    ///
    /// Returns an error if not authenticated or the request fails.
    #[instrument(skip(self))]
    pub async fn get_orders(&self) -> Result<Vec<Order>, ApiError> {
        self.execute(self.request(Method::GET, "orders/")?).await
    }

    /// Place an order through the mocked payment flow.
    ///
    /// # Errors
    ///
    /// Returns an error if the checkout is rejected or the request fails.
    #[instrument(skip(self, request))]
    pub async fn place_order(&self, request: &CheckoutRequest) -> Result<CheckoutReceipt, ApiError> {
        self.execute(self.request(Method::POST, "checkout/")?.json(request))
            .await
    }

    // =========================================================================
    // Sales (staff)
    // =========================================================================

    /// Get the sales dashboard figures.
    ///
    /// # Errors
    ///
    /// Returns an error if the caller lacks staff access or the request fails.
    #[instrument(skip(self))]
    pub async fn get_sales_stats(&self) -> Result<SalesStats, ApiError> {
        self.execute(self.request(Method::GET, "sales/dashboard-stats/")?)
            .await
    }

    /// List discount campaigns.
    ///
    /// # Errors
    ///
    /// Returns an error if the caller lacks staff access or the request fails.
    #[instrument(skip(self))]
    pub async fn get_campaigns(&self) -> Result<Vec<Campaign>, ApiError> {
        self.execute(self.request(Method::GET, "sales/campaigns/")?)
            .await
    }

    /// Get a single campaign.
    ///
    /// # Errors
    ///
    /// Returns an error if the campaign does not exist or the request fails.
    #[instrument(skip(self), fields(campaign_id = %campaign_id))]
    pub async fn get_campaign(&self, campaign_id: CampaignId) -> Result<Campaign, ApiError> {
        self.execute(self.request(Method::GET, &format!("sales/campaigns/{campaign_id}/"))?)
            .await
    }

    /// Change a product's list price.
    ///
    /// Invalidates the catalog cache so the next read sees the new price.
    ///
    /// # Errors
    ///
    /// Returns an error if the product does not exist or the request fails.
    #[instrument(skip(self), fields(product_id = %product_id, price = %price))]
    pub async fn update_product_price(
        &self,
        product_id: ProductId,
        price: Decimal,
    ) -> Result<(), ApiError> {
        self.execute_unit(
            self.request(Method::PUT, &format!("sales/products/{product_id}/price/"))?
                .json(&PriceUpdate { price }),
        )
        .await?;
        self.invalidate_catalog().await;
        Ok(())
    }

    // =========================================================================
    // Delivery (staff)
    // =========================================================================

    /// Get the delivery dashboard figures.
    ///
    /// # Errors
    ///
    /// Returns an error if the caller lacks staff access or the request fails.
    #[instrument(skip(self))]
    pub async fn get_delivery_stats(&self) -> Result<DeliveryStats, ApiError> {
        self.execute(self.request(Method::GET, "delivery/stats/")?)
            .await
    }

    /// List deliveries, optionally filtered by status.
    ///
    /// # Errors
    ///
    /// Returns an error if the caller lacks staff access or the request fails.
    #[instrument(skip(self), fields(status = ?status))]
    pub async fn get_deliveries(
        &self,
        status: Option<OrderStatus>,
    ) -> Result<Vec<Delivery>, ApiError> {
        let path = match status {
            Some(status) => format!("delivery/orders/?status={status}"),
            None => "delivery/orders/".to_string(),
        };
        let payload: DeliveryListPayload = self.execute(self.request(Method::GET, &path)?).await?;
        Ok(payload.orders)
    }

    /// Set a delivery's status.
    ///
    /// The backend records the delivery date when a delivery is marked
    /// delivered.
    ///
    /// # Errors
    ///
    /// Returns an error if the delivery id is unknown or the request fails.
    #[instrument(skip(self), fields(delivery_id = %delivery_id, status = %status))]
    pub async fn update_delivery_status(
        &self,
        delivery_id: &str,
        status: OrderStatus,
    ) -> Result<Delivery, ApiError> {
        self.execute(
            self.request(Method::PUT, &format!("delivery/orders/{delivery_id}/status/"))?
                .json(&DeliveryStatusUpdate { status }),
        )
        .await
    }

    // =========================================================================
    // Support (REST surface; the live message transport is elsewhere)
    // =========================================================================

    /// Open a new support conversation.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn start_conversation(&self) -> Result<Conversation, ApiError> {
        self.execute(self.request(Method::POST, "support/conversations/create/")?)
            .await
    }

    /// Fetch a conversation with its message transcript.
    ///
    /// # Errors
    ///
    /// Returns an error if the conversation does not exist or the request
    /// fails.
    #[instrument(skip(self), fields(conversation_id = %conversation_id))]
    pub async fn get_conversation(
        &self,
        conversation_id: ConversationId,
    ) -> Result<Conversation, ApiError> {
        self.execute(self.request(
            Method::GET,
            &format!("support/conversations/{conversation_id}/"),
        )?)
        .await
    }

    /// Close a conversation.
    ///
    /// # Errors
    ///
    /// Returns an error if the conversation does not exist or the request
    /// fails.
    #[instrument(skip(self), fields(conversation_id = %conversation_id))]
    pub async fn close_conversation(
        &self,
        conversation_id: ConversationId,
    ) -> Result<(), ApiError> {
        self.execute_unit(self.request(
            Method::POST,
            &format!("support/conversations/{conversation_id}/close/"),
        )?)
        .await
    }

    // =========================================================================
    // Cart endpoints (not cached - mutable state)
    // =========================================================================

    async fn post_json<B: Serialize + Sync>(&self, path: &str, body: &B) -> Result<(), ApiError> {
        self.execute_unit(self.request(Method::POST, path)?.json(body))
            .await
    }
}

/// Truncate a response body for logs and error messages.
fn truncate(text: &str) -> String {
    text.chars().take(MAX_LOGGED_BODY).collect()
}

#[async_trait::async_trait]
impl CartBackend for StoreClient {
    #[instrument(skip(self))]
    async fn get_cart(&self) -> Result<Vec<RemoteCartLine>, ApiError> {
        let payload: CartPayload = self.execute(self.request(Method::GET, "cart/")?).await?;
        Ok(payload.items)
    }

    #[instrument(skip(self, line), fields(product_id = %line.product_id))]
    async fn add_to_cart(&self, line: NewCartLine) -> Result<(), ApiError> {
        self.post_json("cart/items/", &line).await
    }

    #[instrument(skip(self), fields(line_id = %line_id))]
    async fn remove_from_cart(&self, line_id: CartLineId) -> Result<(), ApiError> {
        self.execute_unit(self.request(Method::DELETE, &format!("cart/items/{line_id}/"))?)
            .await
    }

    #[instrument(skip(self), fields(line_id = %line_id))]
    async fn update_cart_item(&self, line_id: CartLineId, quantity: u32) -> Result<(), ApiError> {
        self.execute_unit(
            self.request(Method::PATCH, &format!("cart/items/{line_id}/"))?
                .json(&QuantityUpdate { quantity }),
        )
        .await
    }

    #[instrument(skip(self))]
    async fn clear_cart(&self) -> Result<(), ApiError> {
        self.execute_unit(self.request(Method::DELETE, "cart/")?)
            .await
    }

    #[instrument(skip(self, lines), fields(line_count = lines.len()))]
    async fn merge_cart(&self, lines: Vec<NewCartLine>) -> Result<Vec<RemoteCartLine>, ApiError> {
        let payload: CartPayload = self
            .execute(
                self.request(Method::POST, "cart/merge/")?
                    .json(&MergeRequest { items: lines }),
            )
            .await?;
        Ok(payload.items)
    }
}
