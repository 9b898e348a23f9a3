//! Cart synchronization manager.
//!
//! Owns the authoritative client-side view of the cart: a single in-memory
//! line list, a durable local copy, and (when the session is authenticated)
//! a remote copy kept in sync through the backend cart endpoints.
//!
//! # Semantics
//!
//! Every mutation applies locally first (optimistic), persists to the
//! durable slot, and then issues the remote call. What happens on remote
//! failure is deliberately asymmetric:
//!
//! | operation  | on remote failure                         |
//! |------------|-------------------------------------------|
//! | add        | keep the local change, log only           |
//! | remove     | roll back (reinsert the line)             |
//! | update     | roll back (restore the prior quantity)    |
//! | clear      | keep the local empty state                |
//! | merge      | fall back to a plain fetch, else keep state |
//!
//! An add is never silently lost; a removal or quantity change that the
//! backend rejected is undone so local and remote views agree.
//!
//! No failure propagates to callers as an error: operations log and resolve
//! into one of the fallback behaviors above. The only user-visible signal is
//! the transient [`Notice`] stream.

pub mod storage;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use rust_decimal::Decimal;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, instrument, warn};

use pawmart_core::{CartLineId, ProductId};

use crate::api::ApiError;
use crate::api::types::{NewCartLine, Product, RemoteCartLine};
use crate::session::SessionMode;

use storage::{CartStore, StoredCartLine};

/// Capacity of the notice broadcast channel.
const NOTICE_CHANNEL_CAPACITY: usize = 16;

// =============================================================================
// CartBackend
// =============================================================================

/// The backend cart endpoints the manager synchronizes against.
///
/// Implemented by [`crate::api::StoreClient`] and by test doubles.
#[async_trait]
pub trait CartBackend: Send + Sync {
    /// Fetch the authoritative remote cart.
    async fn get_cart(&self) -> Result<Vec<RemoteCartLine>, ApiError>;

    /// Add a line to the remote cart. The caller re-fetches afterwards to
    /// pick up the server-assigned line id.
    async fn add_to_cart(&self, line: NewCartLine) -> Result<(), ApiError>;

    /// Delete a remote line by its backend id.
    async fn remove_from_cart(&self, line_id: CartLineId) -> Result<(), ApiError>;

    /// Set the quantity of a remote line.
    async fn update_cart_item(&self, line_id: CartLineId, quantity: u32) -> Result<(), ApiError>;

    /// Empty the remote cart.
    async fn clear_cart(&self) -> Result<(), ApiError>;

    /// Merge locally-held lines into the remote cart and return the combined
    /// result. The combination policy is owned by the backend.
    async fn merge_cart(&self, lines: Vec<NewCartLine>) -> Result<Vec<RemoteCartLine>, ApiError>;
}

// =============================================================================
// CartLine & Notice
// =============================================================================

/// One line of the in-memory cart.
///
/// Display fields are a snapshot captured at add-time, not re-fetched from
/// the catalog. `remote_id` is present only once the line has been synced
/// server-side.
#[derive(Debug, Clone, PartialEq)]
pub struct CartLine {
    pub product_id: ProductId,
    pub remote_id: Option<CartLineId>,
    pub name: String,
    pub unit_price: Decimal,
    pub quantity: u32,
    pub image_url: String,
    pub description: String,
}

impl CartLine {
    /// Line total (unit price times quantity).
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }

    fn from_product(product: &Product) -> Self {
        Self {
            product_id: product.id,
            remote_id: None,
            name: product.name.clone(),
            unit_price: product.price,
            quantity: 1,
            image_url: product.image_url.clone(),
            description: product.description.clone(),
        }
    }
}

impl From<RemoteCartLine> for CartLine {
    fn from(line: RemoteCartLine) -> Self {
        Self {
            product_id: line.product_id,
            remote_id: Some(line.id),
            name: line.product_name,
            unit_price: line.price,
            quantity: line.quantity,
            image_url: line.image_url,
            description: line.description,
        }
    }
}

impl From<StoredCartLine> for CartLine {
    fn from(line: StoredCartLine) -> Self {
        Self {
            product_id: line.product_id,
            remote_id: None,
            name: line.product_name,
            unit_price: line.price,
            quantity: line.quantity,
            image_url: line.image_url,
            description: line.description,
        }
    }
}

impl From<&CartLine> for StoredCartLine {
    fn from(line: &CartLine) -> Self {
        Self {
            product_id: line.product_id,
            product_name: line.name.clone(),
            price: line.unit_price,
            quantity: line.quantity,
            image_url: line.image_url.clone(),
            description: line.description.clone(),
        }
    }
}

impl From<&CartLine> for NewCartLine {
    fn from(line: &CartLine) -> Self {
        Self {
            product_id: line.product_id,
            product_name: line.name.clone(),
            price: line.unit_price,
            quantity: line.quantity,
            image_url: line.image_url.clone(),
            description: line.description.clone(),
        }
    }
}

impl From<&StoredCartLine> for NewCartLine {
    fn from(line: &StoredCartLine) -> Self {
        Self {
            product_id: line.product_id,
            product_name: line.product_name.clone(),
            price: line.price,
            quantity: line.quantity,
            image_url: line.image_url.clone(),
            description: line.description.clone(),
        }
    }
}

/// Transient user-facing cart notification.
///
/// Emitted per operation regardless of remote outcome; how long it stays on
/// screen is the consumer's concern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Added { name: String },
    Removed { name: String },
    Updated,
    Cleared,
}

impl std::fmt::Display for Notice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Added { name } => write!(f, "{name} is added to your cart."),
            Self::Removed { name } => write!(f, "{name} removed from cart."),
            Self::Updated => write!(f, "Cart quantity updated."),
            Self::Cleared => write!(f, "Cart has been cleared."),
        }
    }
}

// =============================================================================
// CartManager
// =============================================================================

/// Cart synchronization manager.
///
/// Local state mutation always happens-before the corresponding remote call
/// (optimistic-first). The line lock is never held across an await, so a
/// mutation racing a [`Self::sync_from_remote`] interleaves with
/// last-write-wins; the sync-in-flight flag only guards merge/sync overlap.
pub struct CartManager<B, S> {
    backend: B,
    store: S,
    session: watch::Receiver<SessionMode>,
    lines: Mutex<Vec<CartLine>>,
    syncing: AtomicBool,
    merged: AtomicBool,
    notices: broadcast::Sender<Notice>,
}

impl<B, S> CartManager<B, S>
where
    B: CartBackend,
    S: CartStore,
{
    /// Create a manager, restoring the cart from the durable slot.
    ///
    /// A slot that cannot be read yields an empty cart (logged, not fatal).
    pub fn new(backend: B, store: S, session: watch::Receiver<SessionMode>) -> Self {
        let lines = match store.load() {
            Ok(stored) => stored.into_iter().map(CartLine::from).collect(),
            Err(e) => {
                warn!(error = %e, "failed to load persisted cart, starting empty");
                Vec::new()
            }
        };
        let (notices, _) = broadcast::channel(NOTICE_CHANNEL_CAPACITY);

        Self {
            backend,
            store,
            session,
            lines: Mutex::new(lines),
            syncing: AtomicBool::new(false),
            merged: AtomicBool::new(false),
            notices,
        }
    }

    /// Snapshot of the current lines, in insertion order.
    #[must_use]
    pub fn lines(&self) -> Vec<CartLine> {
        self.lines_lock().clone()
    }

    /// Sum of all line totals.
    #[must_use]
    pub fn subtotal(&self) -> Decimal {
        self.lines_lock().iter().map(CartLine::line_total).sum()
    }

    /// Total unit count across all lines.
    #[must_use]
    pub fn total_quantity(&self) -> u32 {
        self.lines_lock().iter().map(|line| line.quantity).sum()
    }

    /// Subscribe to transient cart notifications.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Notice> {
        self.notices.subscribe()
    }

    fn lines_lock(&self) -> MutexGuard<'_, Vec<CartLine>> {
        self.lines.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_authenticated(&self) -> bool {
        *self.session.borrow() == SessionMode::Authenticated
    }

    /// Overwrite the durable slot with the given lines. Persist failures are
    /// logged only; the in-memory state is already authoritative.
    fn persist(&self, lines: &[CartLine]) {
        let stored: Vec<StoredCartLine> = lines.iter().map(StoredCartLine::from).collect();
        if let Err(e) = self.store.save(&stored) {
            warn!(error = %e, "failed to persist cart");
        }
    }

    fn notify(&self, notice: Notice) {
        // Nobody listening is fine
        let _ = self.notices.send(notice);
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Add one unit of `product` to the cart.
    ///
    /// An existing line for the product increments its quantity; otherwise a
    /// new line snapshots the product's display fields. If authenticated, a
    /// remote add is issued and on success the authoritative cart is
    /// re-fetched to pick up the server-assigned line id. A remote failure
    /// keeps the optimistic change.
    #[instrument(skip(self, product), fields(product_id = %product.id))]
    pub async fn add_item(&self, product: &Product) {
        let new_line = {
            let mut lines = self.lines_lock();
            let line = match lines.iter_mut().find(|l| l.product_id == product.id) {
                Some(existing) => {
                    existing.quantity += 1;
                    existing.clone()
                }
                None => {
                    lines.push(CartLine::from_product(product));
                    CartLine::from_product(product)
                }
            };
            self.persist(&lines);
            line
        };

        if self.is_authenticated() {
            // The backend owns increment semantics; always send a single unit
            let payload = NewCartLine {
                quantity: 1,
                ..NewCartLine::from(&new_line)
            };
            match self.backend.add_to_cart(payload).await {
                Ok(()) => self.sync_from_remote().await,
                Err(e) => warn!(error = %e, "failed to sync add to cart"),
            }
        }

        self.notify(Notice::Added {
            name: product.name.clone(),
        });
    }

    /// Remove the line for `product_id` entirely, regardless of quantity.
    ///
    /// A no-op (no notification) if the product is not in the cart. If the
    /// remote delete fails, the line is reinserted locally.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn remove_item(&self, product_id: ProductId) {
        let removed = {
            let mut lines = self.lines_lock();
            let Some(pos) = lines.iter().position(|l| l.product_id == product_id) else {
                return;
            };
            let line = lines.remove(pos);
            self.persist(&lines);
            line
        };

        if self.is_authenticated()
            && let Some(line_id) = removed.remote_id
        {
            if let Err(e) = self.backend.remove_from_cart(line_id).await {
                warn!(error = %e, "failed to sync remove from cart, rolling back");
                let mut lines = self.lines_lock();
                lines.push(removed.clone());
                self.persist(&lines);
            }
        }

        self.notify(Notice::Removed { name: removed.name });
    }

    /// Set the quantity of the line for `product_id`.
    ///
    /// A quantity of zero or less removes the line. If the product is not in
    /// the cart, nothing changes but the update notification is still emitted
    /// (the storefront always acknowledges a quantity edit). If the remote
    /// update fails, the prior quantity is restored.
    #[instrument(skip(self), fields(product_id = %product_id, quantity))]
    pub async fn update_quantity(&self, product_id: ProductId, quantity: i64) {
        if quantity <= 0 {
            return self.remove_item(product_id).await;
        }
        let quantity = u32::try_from(quantity).unwrap_or(u32::MAX);

        let snapshot = {
            let mut lines = self.lines_lock();
            let Some(line) = lines.iter_mut().find(|l| l.product_id == product_id) else {
                drop(lines);
                self.notify(Notice::Updated);
                return;
            };
            let prior = line.quantity;
            line.quantity = quantity;
            let remote_id = line.remote_id;
            self.persist(&lines);
            (prior, remote_id)
        };

        if self.is_authenticated()
            && let (prior, Some(line_id)) = snapshot
        {
            if let Err(e) = self.backend.update_cart_item(line_id, quantity).await {
                warn!(error = %e, "failed to sync quantity update, rolling back");
                let mut lines = self.lines_lock();
                if let Some(line) = lines.iter_mut().find(|l| l.product_id == product_id) {
                    line.quantity = prior;
                }
                self.persist(&lines);
            }
        }

        self.notify(Notice::Updated);
    }

    /// Empty the cart.
    ///
    /// The local empty state wins even if the remote clear fails.
    #[instrument(skip(self))]
    pub async fn clear(&self) {
        {
            let mut lines = self.lines_lock();
            lines.clear();
            self.persist(&lines);
        }

        if self.is_authenticated() {
            if let Err(e) = self.backend.clear_cart().await {
                warn!(error = %e, "failed to sync clear cart");
            }
        }

        self.notify(Notice::Cleared);
    }

    // =========================================================================
    // Synchronization
    // =========================================================================

    /// Read-through sync: replace local state and the durable slot with the
    /// remote cart.
    ///
    /// A no-op while a guest, or while another merge/sync is in flight. A
    /// fetch failure keeps the previous state.
    #[instrument(skip(self))]
    pub async fn sync_from_remote(&self) {
        if !self.is_authenticated() {
            return;
        }
        if self.syncing.swap(true, Ordering::SeqCst) {
            debug!("sync already in flight, skipping");
            return;
        }
        self.fetch_and_replace().await;
        self.syncing.store(false, Ordering::SeqCst);
    }

    /// Merge the locally-persisted guest cart into the remote cart.
    ///
    /// Runs at most once per authenticated session, normally driven by the
    /// session watcher on the guest-to-authenticated transition. A non-empty
    /// local cart is posted to the merge endpoint and the authoritative
    /// result replaces local state; an empty one degrades to a plain fetch.
    /// A merge failure falls back to a fetch; if that also fails local state
    /// is left untouched.
    #[instrument(skip(self))]
    pub async fn merge_on_login(&self) {
        if self.merged.load(Ordering::SeqCst) {
            return;
        }
        if self.syncing.swap(true, Ordering::SeqCst) {
            debug!("sync already in flight, skipping merge");
            return;
        }
        self.merged.store(true, Ordering::SeqCst);

        // The slot holds the pre-login view, which is what the merge sends
        let local = match self.store.load() {
            Ok(lines) => lines,
            Err(e) => {
                warn!(error = %e, "failed to read persisted cart for merge");
                Vec::new()
            }
        };

        if local.is_empty() {
            self.fetch_and_replace().await;
        } else {
            let payload: Vec<NewCartLine> = local.iter().map(NewCartLine::from).collect();
            match self.backend.merge_cart(payload).await {
                Ok(remote) => self.replace_with_remote(remote),
                Err(e) => {
                    warn!(error = %e, "cart merge failed, falling back to fetch");
                    self.fetch_and_replace().await;
                }
            }
        }

        self.syncing.store(false, Ordering::SeqCst);
    }

    /// Reset after a logout transition: the merge guard rearms and the cart
    /// reverts to empty. Guest cart contents are not preserved across logout.
    #[instrument(skip(self))]
    pub fn handle_logout(&self) {
        self.merged.store(false, Ordering::SeqCst);
        let mut lines = self.lines_lock();
        lines.clear();
        self.persist(&lines);
    }

    async fn fetch_and_replace(&self) {
        match self.backend.get_cart().await {
            Ok(remote) => self.replace_with_remote(remote),
            Err(e) => warn!(error = %e, "cart fetch failed, keeping local state"),
        }
    }

    fn replace_with_remote(&self, remote: Vec<RemoteCartLine>) {
        let fresh: Vec<CartLine> = remote.into_iter().map(CartLine::from).collect();
        let mut lines = self.lines_lock();
        *lines = fresh;
        self.persist(&lines);
    }
}

impl<B, S> CartManager<B, S>
where
    B: CartBackend + 'static,
    S: CartStore + 'static,
{
    /// Spawn the background task reacting to session transitions.
    ///
    /// Guest-to-authenticated triggers [`Self::merge_on_login`];
    /// authenticated-to-guest triggers [`Self::handle_logout`]. If the
    /// session is already authenticated at spawn time, the merge runs
    /// immediately (the guard still makes it once-per-session).
    pub fn spawn_session_watcher(self: Arc<Self>) -> JoinHandle<()> {
        let manager = self;
        let mut rx = manager.session.clone();
        tokio::spawn(async move {
            if *rx.borrow_and_update() == SessionMode::Authenticated {
                manager.merge_on_login().await;
            }
            while rx.changed().await.is_ok() {
                let mode = *rx.borrow_and_update();
                match mode {
                    SessionMode::Authenticated => manager.merge_on_login().await,
                    SessionMode::Guest => manager.handle_logout(),
                }
            }
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::session::SessionProvider;
    use storage::MemoryStore;

    /// Backend that must never be reached; every call panics.
    struct UnreachableBackend;

    #[async_trait]
    impl CartBackend for UnreachableBackend {
        async fn get_cart(&self) -> Result<Vec<RemoteCartLine>, ApiError> {
            panic!("guest cart must not touch the backend");
        }
        async fn add_to_cart(&self, _line: NewCartLine) -> Result<(), ApiError> {
            panic!("guest cart must not touch the backend");
        }
        async fn remove_from_cart(&self, _line_id: CartLineId) -> Result<(), ApiError> {
            panic!("guest cart must not touch the backend");
        }
        async fn update_cart_item(
            &self,
            _line_id: CartLineId,
            _quantity: u32,
        ) -> Result<(), ApiError> {
            panic!("guest cart must not touch the backend");
        }
        async fn clear_cart(&self) -> Result<(), ApiError> {
            panic!("guest cart must not touch the backend");
        }
        async fn merge_cart(
            &self,
            _lines: Vec<NewCartLine>,
        ) -> Result<Vec<RemoteCartLine>, ApiError> {
            panic!("guest cart must not touch the backend");
        }
    }

    fn product(id: i64, name: &str, price_cents: i64) -> Product {
        Product {
            id: ProductId::new(id),
            name: name.to_string(),
            price: Decimal::new(price_cents, 2),
            image_url: format!("/media/{id}.png"),
            description: "A fine pet product".to_string(),
            category: None,
            stock: None,
        }
    }

    fn guest_manager() -> CartManager<UnreachableBackend, MemoryStore> {
        let provider = SessionProvider::default();
        CartManager::new(UnreachableBackend, MemoryStore::new(), provider.subscribe())
    }

    #[tokio::test]
    async fn test_add_same_product_increments_quantity() {
        let manager = guest_manager();
        let p1 = product(1, "Squeaky Bone", 10000);

        manager.add_item(&p1).await;
        manager.add_item(&p1).await;

        let lines = manager.lines();
        assert_eq!(lines.len(), 1);
        let line = lines.first().unwrap();
        assert_eq!(line.product_id, ProductId::new(1));
        assert_eq!(line.quantity, 2);
        assert_eq!(line.line_total(), Decimal::new(20000, 2));
        assert_eq!(manager.subtotal(), Decimal::new(20000, 2));
    }

    #[tokio::test]
    async fn test_add_distinct_products_keeps_insertion_order() {
        let manager = guest_manager();
        manager.add_item(&product(2, "Catnip Mouse", 350)).await;
        manager.add_item(&product(1, "Squeaky Bone", 899)).await;

        let ids: Vec<ProductId> = manager.lines().iter().map(|l| l.product_id).collect();
        assert_eq!(ids, vec![ProductId::new(2), ProductId::new(1)]);
        assert_eq!(manager.total_quantity(), 2);
    }

    #[tokio::test]
    async fn test_update_quantity_zero_or_less_removes() {
        let manager = guest_manager();
        manager.add_item(&product(1, "Squeaky Bone", 899)).await;
        manager.add_item(&product(2, "Catnip Mouse", 350)).await;

        manager.update_quantity(ProductId::new(1), 0).await;
        manager.update_quantity(ProductId::new(2), -3).await;

        assert!(manager.lines().is_empty());
    }

    #[tokio::test]
    async fn test_update_quantity_sets_value() {
        let manager = guest_manager();
        manager.add_item(&product(1, "Squeaky Bone", 899)).await;

        manager.update_quantity(ProductId::new(1), 5).await;

        assert_eq!(manager.lines().first().unwrap().quantity, 5);
    }

    #[tokio::test]
    async fn test_update_quantity_absent_product_still_notifies() {
        let manager = guest_manager();
        let mut notices = manager.subscribe();

        manager.update_quantity(ProductId::new(99), 3).await;

        // No line appears, but the acknowledgement still fires.
        assert!(manager.lines().is_empty());
        assert_eq!(notices.try_recv().unwrap(), Notice::Updated);
        assert!(notices.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_remove_absent_product_emits_no_notice() {
        let manager = guest_manager();
        let mut notices = manager.subscribe();

        manager.remove_item(ProductId::new(42)).await;

        assert!(notices.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_notices_match_operations() {
        let manager = guest_manager();
        let mut notices = manager.subscribe();

        let p1 = product(1, "Squeaky Bone", 899);
        manager.add_item(&p1).await;
        manager.update_quantity(p1.id, 2).await;
        manager.remove_item(p1.id).await;
        manager.clear().await;

        assert_eq!(
            notices.try_recv().unwrap(),
            Notice::Added {
                name: "Squeaky Bone".to_string()
            }
        );
        assert_eq!(notices.try_recv().unwrap(), Notice::Updated);
        assert_eq!(
            notices.try_recv().unwrap(),
            Notice::Removed {
                name: "Squeaky Bone".to_string()
            }
        );
        assert_eq!(notices.try_recv().unwrap(), Notice::Cleared);
    }

    #[tokio::test]
    async fn test_notice_messages() {
        let added = Notice::Added {
            name: "Squeaky Bone".to_string(),
        };
        assert_eq!(added.to_string(), "Squeaky Bone is added to your cart.");
        assert_eq!(Notice::Updated.to_string(), "Cart quantity updated.");
        assert_eq!(Notice::Cleared.to_string(), "Cart has been cleared.");
    }

    #[tokio::test]
    async fn test_guest_mutations_persist_to_store() {
        let provider = SessionProvider::default();
        let store = MemoryStore::new();
        let manager = CartManager::new(UnreachableBackend, store, provider.subscribe());

        manager.add_item(&product(1, "Squeaky Bone", 899)).await;
        manager.add_item(&product(1, "Squeaky Bone", 899)).await;

        let stored = manager.store.load().unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored.first().unwrap().quantity, 2);
    }

    #[tokio::test]
    async fn test_restore_from_store_ignores_remote_ids() {
        let stored = vec![StoredCartLine {
            product_id: ProductId::new(3),
            product_name: "Dog Bed".to_string(),
            price: Decimal::new(4500, 2),
            quantity: 1,
            image_url: String::new(),
            description: String::new(),
        }];
        let provider = SessionProvider::default();
        let manager = CartManager::new(
            UnreachableBackend,
            MemoryStore::with_lines(stored),
            provider.subscribe(),
        );

        let lines = manager.lines();
        assert_eq!(lines.len(), 1);
        let line = lines.first().unwrap();
        assert_eq!(line.product_id, ProductId::new(3));
        // Backend line ids are never persisted, so a restored line has none
        assert!(line.remote_id.is_none());
    }

    #[tokio::test]
    async fn test_persist_failure_is_swallowed() {
        let provider = SessionProvider::default();
        let store = MemoryStore::new();
        store.set_fail_saves(true);
        let manager = CartManager::new(UnreachableBackend, store, provider.subscribe());

        // Does not panic or surface the error; in-memory state still updates
        manager.add_item(&product(1, "Squeaky Bone", 899)).await;
        assert_eq!(manager.lines().len(), 1);
    }
}
