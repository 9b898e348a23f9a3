//! Integration tests for the durable local cart slot.
//!
//! The cart survives process restarts through a single JSON file; backend
//! line ids are never persisted and must be re-acquired by syncing.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use pawmart_core::ProductId;
use pawmart_integration_tests::{CartHarness, MockBackend, product, stored_line};
use pawmart_storefront::cart::CartManager;
use pawmart_storefront::cart::storage::{CartStore, JsonFileStore};
use pawmart_storefront::session::SessionProvider;

fn file_manager(path: std::path::PathBuf) -> Arc<CartManager<MockBackend, JsonFileStore>> {
    let session = SessionProvider::default();
    Arc::new(CartManager::new(
        MockBackend::new(),
        JsonFileStore::new(path),
        session.subscribe(),
    ))
}

#[tokio::test]
async fn test_cart_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cart_items.json");

    let manager = file_manager(path.clone());
    manager.add_item(&product(1, "Squeaky Bone", 899)).await;
    manager.add_item(&product(1, "Squeaky Bone", 899)).await;
    manager.add_item(&product(2, "Catnip Mouse", 350)).await;
    drop(manager);

    let restarted = file_manager(path);
    assert_eq!(restarted.total_quantity(), 3);
    let lines = restarted.lines();
    assert_eq!(lines.len(), 2);
    // Restored lines never carry backend ids
    assert!(lines.iter().all(|l| l.remote_id.is_none()));
}

#[tokio::test]
async fn test_removal_is_durable() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cart_items.json");

    let manager = file_manager(path.clone());
    manager.add_item(&product(1, "Squeaky Bone", 899)).await;
    manager.add_item(&product(2, "Catnip Mouse", 350)).await;
    manager.remove_item(ProductId::new(1)).await;
    drop(manager);

    let restarted = file_manager(path);
    let lines = restarted.lines();
    assert_eq!(lines.len(), 1);
    assert_eq!(lines.first().unwrap().product_id, ProductId::new(2));
}

#[tokio::test]
async fn test_corrupt_slot_starts_empty() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cart_items.json");
    std::fs::write(&path, "{definitely not json").unwrap();

    let manager = file_manager(path);
    assert!(manager.lines().is_empty());
}

#[tokio::test]
async fn test_merge_posts_persisted_lines() {
    // The merge payload comes from the durable slot, not transient memory
    let stored = vec![
        stored_line(1, "Squeaky Bone", 899, 2),
        stored_line(2, "Catnip Mouse", 350, 1),
    ];
    let harness = CartHarness::authenticated(Vec::new(), stored);

    harness.manager.merge_on_login().await;

    let remote = harness.backend.remote_lines();
    assert_eq!(remote.len(), 2);
    assert_eq!(
        remote.iter().map(|l| l.quantity).sum::<u32>(),
        3
    );
}

#[tokio::test]
async fn test_slot_written_through_on_sync() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cart_items.json");

    let manager = file_manager(path.clone());
    manager.add_item(&product(1, "Squeaky Bone", 899)).await;

    // The slot mirrors in-memory state after every mutation
    let slot = JsonFileStore::new(path);
    let stored = slot.load().unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored.first().unwrap().quantity, 1);
}
