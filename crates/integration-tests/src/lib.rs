//! Integration tests for PawMart.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p pawmart-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `cart_mutations` - Optimistic cart mutations and rollback behavior
//! - `cart_merge` - Guest-to-account cart merge on login
//! - `cart_persistence` - The durable local cart slot across restarts
//!
//! This crate ships the scriptable [`MockBackend`]: an in-process stand-in
//! for the backend cart endpoints with per-operation failure switches, call
//! recording, and a gate for holding an add in flight.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use rust_decimal::Decimal;
use tokio::sync::Semaphore;

use pawmart_core::{CartLineId, ProductId};
use pawmart_storefront::api::ApiError;
use pawmart_storefront::api::types::{NewCartLine, Product, RemoteCartLine};
use pawmart_storefront::cart::storage::{MemoryStore, StoredCartLine};
use pawmart_storefront::cart::{CartBackend, CartManager};
use pawmart_storefront::session::{SessionMode, SessionProvider};

// =============================================================================
// MockBackend
// =============================================================================

/// One recorded backend call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Call {
    GetCart,
    Add(ProductId),
    Remove(CartLineId),
    Update(CartLineId, u32),
    Clear,
    /// Merge with the given number of posted lines.
    Merge(usize),
}

#[derive(Debug, Default)]
struct MockInner {
    remote: Mutex<Vec<RemoteCartLine>>,
    next_line_id: AtomicI64,
    calls: Mutex<Vec<Call>>,
    fail_get: AtomicBool,
    fail_add: AtomicBool,
    fail_remove: AtomicBool,
    fail_update: AtomicBool,
    fail_clear: AtomicBool,
    fail_merge: AtomicBool,
    add_gate: Mutex<Option<Arc<Semaphore>>>,
}

/// Scriptable in-process stand-in for the backend cart endpoints.
///
/// Keeps a remote cart in memory with the backend's combination semantics:
/// adds and merges sum quantities per product and assign fresh line ids.
/// Cheaply cloneable; clones share state.
#[derive(Debug, Clone, Default)]
pub struct MockBackend {
    inner: Arc<MockInner>,
}

impl MockBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with the given remote cart contents.
    #[must_use]
    pub fn with_remote(lines: Vec<RemoteCartLine>) -> Self {
        let max_id = lines.iter().map(|l| l.id.as_i64()).max().unwrap_or(0);
        let backend = Self::new();
        backend.inner.next_line_id.store(max_id, Ordering::SeqCst);
        *lock(&backend.inner.remote) = lines;
        backend
    }

    pub fn fail_get_cart(&self, fail: bool) {
        self.inner.fail_get.store(fail, Ordering::SeqCst);
    }

    pub fn fail_add(&self, fail: bool) {
        self.inner.fail_add.store(fail, Ordering::SeqCst);
    }

    pub fn fail_remove(&self, fail: bool) {
        self.inner.fail_remove.store(fail, Ordering::SeqCst);
    }

    pub fn fail_update(&self, fail: bool) {
        self.inner.fail_update.store(fail, Ordering::SeqCst);
    }

    pub fn fail_clear(&self, fail: bool) {
        self.inner.fail_clear.store(fail, Ordering::SeqCst);
    }

    pub fn fail_merge(&self, fail: bool) {
        self.inner.fail_merge.store(fail, Ordering::SeqCst);
    }

    /// Hold every subsequent add in flight until a permit is released on the
    /// returned semaphore.
    #[must_use]
    pub fn gate_adds(&self) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        *lock(&self.inner.add_gate) = Some(Arc::clone(&gate));
        gate
    }

    /// All calls recorded so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<Call> {
        lock(&self.inner.calls).clone()
    }

    /// Number of recorded calls matching the predicate.
    #[must_use]
    pub fn call_count(&self, predicate: impl Fn(&Call) -> bool) -> usize {
        lock(&self.inner.calls).iter().filter(|c| predicate(*c)).count()
    }

    /// Snapshot of the simulated remote cart.
    #[must_use]
    pub fn remote_lines(&self) -> Vec<RemoteCartLine> {
        lock(&self.inner.remote).clone()
    }

    fn record(&self, call: Call) {
        lock(&self.inner.calls).push(call);
    }

    fn failure() -> ApiError {
        ApiError::Api {
            status: 500,
            message: "simulated backend failure".to_string(),
        }
    }

    /// Sum the line into the remote cart, assigning a line id if new.
    fn absorb(&self, line: &NewCartLine) {
        let mut remote = lock(&self.inner.remote);
        if let Some(existing) = remote.iter_mut().find(|l| l.product_id == line.product_id) {
            existing.quantity += line.quantity;
        } else {
            let id = self.inner.next_line_id.fetch_add(1, Ordering::SeqCst) + 1;
            remote.push(RemoteCartLine {
                id: CartLineId::new(id),
                product_id: line.product_id,
                product_name: line.product_name.clone(),
                price: line.price,
                quantity: line.quantity,
                image_url: line.image_url.clone(),
                description: line.description.clone(),
            });
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[async_trait]
impl CartBackend for MockBackend {
    async fn get_cart(&self) -> Result<Vec<RemoteCartLine>, ApiError> {
        self.record(Call::GetCart);
        if self.inner.fail_get.load(Ordering::SeqCst) {
            return Err(Self::failure());
        }
        Ok(self.remote_lines())
    }

    async fn add_to_cart(&self, line: NewCartLine) -> Result<(), ApiError> {
        let gate = lock(&self.inner.add_gate).clone();
        if let Some(gate) = gate {
            if let Ok(permit) = gate.acquire().await {
                permit.forget();
            }
        }

        self.record(Call::Add(line.product_id));
        if self.inner.fail_add.load(Ordering::SeqCst) {
            return Err(Self::failure());
        }
        self.absorb(&line);
        Ok(())
    }

    async fn remove_from_cart(&self, line_id: CartLineId) -> Result<(), ApiError> {
        self.record(Call::Remove(line_id));
        if self.inner.fail_remove.load(Ordering::SeqCst) {
            return Err(Self::failure());
        }
        lock(&self.inner.remote).retain(|l| l.id != line_id);
        Ok(())
    }

    async fn update_cart_item(&self, line_id: CartLineId, quantity: u32) -> Result<(), ApiError> {
        self.record(Call::Update(line_id, quantity));
        if self.inner.fail_update.load(Ordering::SeqCst) {
            return Err(Self::failure());
        }
        if let Some(line) = lock(&self.inner.remote).iter_mut().find(|l| l.id == line_id) {
            line.quantity = quantity;
        }
        Ok(())
    }

    async fn clear_cart(&self) -> Result<(), ApiError> {
        self.record(Call::Clear);
        if self.inner.fail_clear.load(Ordering::SeqCst) {
            return Err(Self::failure());
        }
        lock(&self.inner.remote).clear();
        Ok(())
    }

    async fn merge_cart(&self, lines: Vec<NewCartLine>) -> Result<Vec<RemoteCartLine>, ApiError> {
        self.record(Call::Merge(lines.len()));
        if self.inner.fail_merge.load(Ordering::SeqCst) {
            return Err(Self::failure());
        }
        for line in &lines {
            self.absorb(line);
        }
        Ok(self.remote_lines())
    }
}

// =============================================================================
// Harness & fixtures
// =============================================================================

/// A cart manager wired to a [`MockBackend`] and an in-memory slot.
pub struct CartHarness {
    pub backend: MockBackend,
    pub session: SessionProvider,
    pub manager: Arc<CartManager<MockBackend, MemoryStore>>,
}

impl CartHarness {
    /// Build a harness in the given session mode with pre-seeded remote and
    /// locally-persisted carts.
    #[must_use]
    pub fn new(mode: SessionMode, remote: Vec<RemoteCartLine>, stored: Vec<StoredCartLine>) -> Self {
        let backend = MockBackend::with_remote(remote);
        let session = SessionProvider::new(mode);
        let manager = Arc::new(CartManager::new(
            backend.clone(),
            MemoryStore::with_lines(stored),
            session.subscribe(),
        ));
        Self {
            backend,
            session,
            manager,
        }
    }

    #[must_use]
    pub fn guest(stored: Vec<StoredCartLine>) -> Self {
        Self::new(SessionMode::Guest, Vec::new(), stored)
    }

    #[must_use]
    pub fn authenticated(remote: Vec<RemoteCartLine>, stored: Vec<StoredCartLine>) -> Self {
        Self::new(SessionMode::Authenticated, remote, stored)
    }
}

/// Catalog product fixture.
#[must_use]
pub fn product(id: i64, name: &str, price_cents: i64) -> Product {
    Product {
        id: ProductId::new(id),
        name: name.to_string(),
        price: Decimal::new(price_cents, 2),
        image_url: format!("/media/products/{id}.png"),
        description: String::new(),
        category: None,
        stock: Some(10),
    }
}

/// Remote cart line fixture.
#[must_use]
pub fn remote_line(id: i64, product_id: i64, name: &str, price_cents: i64, quantity: u32) -> RemoteCartLine {
    RemoteCartLine {
        id: CartLineId::new(id),
        product_id: ProductId::new(product_id),
        product_name: name.to_string(),
        price: Decimal::new(price_cents, 2),
        quantity,
        image_url: String::new(),
        description: String::new(),
    }
}

/// Locally-persisted cart line fixture.
#[must_use]
pub fn stored_line(product_id: i64, name: &str, price_cents: i64, quantity: u32) -> StoredCartLine {
    StoredCartLine {
        product_id: ProductId::new(product_id),
        product_name: name.to_string(),
        price: Decimal::new(price_cents, 2),
        quantity,
        image_url: String::new(),
        description: String::new(),
    }
}
