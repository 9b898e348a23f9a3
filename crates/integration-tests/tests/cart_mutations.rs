//! Integration tests for optimistic cart mutations.
//!
//! Every mutation must land locally before the backend call goes out, and
//! each operation has its own failure resolution: adds and clears keep the
//! optimistic state, removes and quantity updates roll back.

#![allow(clippy::unwrap_used)]

use pawmart_core::ProductId;
use pawmart_integration_tests::{Call, CartHarness, product, remote_line};
use pawmart_storefront::cart::Notice;
use rust_decimal::Decimal;

// =============================================================================
// Optimism
// =============================================================================

#[tokio::test]
async fn test_local_state_updates_before_backend_call_completes() {
    let harness = CartHarness::authenticated(Vec::new(), Vec::new());
    let gate = harness.backend.gate_adds();

    let manager = harness.manager.clone();
    let add = tokio::spawn(async move {
        manager.add_item(&product(1, "Squeaky Bone", 899)).await;
    });

    // Let the add task run up to the gated backend call
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }

    // Local state already reflects the add; the backend has not absorbed it
    assert_eq!(harness.manager.total_quantity(), 1);
    assert!(harness.backend.remote_lines().is_empty());

    gate.add_permits(1);
    add.await.unwrap();

    // The add went through and the follow-up fetch ran
    assert_eq!(harness.backend.call_count(|c| matches!(c, Call::Add(_))), 1);
    assert_eq!(harness.backend.call_count(|c| matches!(c, Call::GetCart)), 1);
}

#[tokio::test]
async fn test_successful_add_adopts_backend_line_ids() {
    let harness = CartHarness::authenticated(Vec::new(), Vec::new());

    harness.manager.add_item(&product(1, "Squeaky Bone", 899)).await;

    let lines = harness.manager.lines();
    assert_eq!(lines.len(), 1);
    // The re-fetch after the add captured the server-assigned line id
    assert!(lines.first().unwrap().remote_id.is_some());
}

// =============================================================================
// Failure resolution per operation
// =============================================================================

#[tokio::test]
async fn test_failed_add_keeps_local_line() {
    let harness = CartHarness::authenticated(Vec::new(), Vec::new());
    harness.backend.fail_add(true);

    harness.manager.add_item(&product(1, "Squeaky Bone", 899)).await;

    // The optimistic add survives; no re-fetch was attempted
    assert_eq!(harness.manager.total_quantity(), 1);
    assert_eq!(harness.backend.call_count(|c| matches!(c, Call::GetCart)), 0);
}

#[tokio::test]
async fn test_failed_remove_rolls_back() {
    let remote = vec![remote_line(10, 1, "Squeaky Bone", 899, 2)];
    let harness = CartHarness::authenticated(remote, Vec::new());
    harness.manager.sync_from_remote().await;
    harness.backend.fail_remove(true);

    harness.manager.remove_item(ProductId::new(1)).await;

    // The line came back after the backend refused the delete
    let lines = harness.manager.lines();
    assert_eq!(lines.len(), 1);
    assert_eq!(lines.first().unwrap().quantity, 2);
    assert_eq!(harness.backend.call_count(|c| matches!(c, Call::Remove(_))), 1);
}

#[tokio::test]
async fn test_failed_update_restores_prior_quantity() {
    let remote = vec![remote_line(10, 1, "Squeaky Bone", 899, 2)];
    let harness = CartHarness::authenticated(remote, Vec::new());
    harness.manager.sync_from_remote().await;
    harness.backend.fail_update(true);

    harness.manager.update_quantity(ProductId::new(1), 5).await;

    assert_eq!(harness.manager.lines().first().unwrap().quantity, 2);
}

#[tokio::test]
async fn test_failed_clear_keeps_local_empty_state() {
    let remote = vec![remote_line(10, 1, "Squeaky Bone", 899, 2)];
    let harness = CartHarness::authenticated(remote, Vec::new());
    harness.manager.sync_from_remote().await;
    harness.backend.fail_clear(true);

    harness.manager.clear().await;

    assert!(harness.manager.lines().is_empty());
}

#[tokio::test]
async fn test_successful_remove_and_update_reach_backend() {
    let remote = vec![
        remote_line(10, 1, "Squeaky Bone", 899, 2),
        remote_line(11, 2, "Catnip Mouse", 350, 1),
    ];
    let harness = CartHarness::authenticated(remote, Vec::new());
    harness.manager.sync_from_remote().await;

    harness.manager.update_quantity(ProductId::new(1), 4).await;
    harness.manager.remove_item(ProductId::new(2)).await;

    let remote = harness.backend.remote_lines();
    assert_eq!(remote.len(), 1);
    assert_eq!(remote.first().unwrap().quantity, 4);
}

// =============================================================================
// Guest isolation
// =============================================================================

#[tokio::test]
async fn test_guest_mutations_never_call_backend() {
    let harness = CartHarness::guest(Vec::new());

    let p1 = product(1, "Squeaky Bone", 899);
    harness.manager.add_item(&p1).await;
    harness.manager.add_item(&p1).await;
    harness.manager.update_quantity(p1.id, 5).await;
    harness.manager.remove_item(p1.id).await;
    harness.manager.clear().await;

    assert!(harness.backend.calls().is_empty());
}

#[tokio::test]
async fn test_guest_cart_arithmetic() {
    let harness = CartHarness::guest(Vec::new());

    harness.manager.add_item(&product(1, "Squeaky Bone", 10000)).await;
    harness.manager.add_item(&product(1, "Squeaky Bone", 10000)).await;
    harness.manager.add_item(&product(2, "Catnip Mouse", 350)).await;

    assert_eq!(harness.manager.lines().len(), 2);
    assert_eq!(harness.manager.total_quantity(), 3);
    assert_eq!(harness.manager.subtotal(), Decimal::new(20350, 2));
}

#[tokio::test]
async fn test_quantity_floor_removes_line() {
    let harness = CartHarness::guest(Vec::new());
    harness.manager.add_item(&product(1, "Squeaky Bone", 899)).await;

    harness.manager.update_quantity(ProductId::new(1), -2).await;

    assert!(harness.manager.lines().is_empty());
}

// =============================================================================
// Notifications
// =============================================================================

#[tokio::test]
async fn test_notices_fire_even_when_backend_fails() {
    let harness = CartHarness::authenticated(Vec::new(), Vec::new());
    harness.backend.fail_add(true);
    let mut notices = harness.manager.subscribe();

    harness.manager.add_item(&product(1, "Squeaky Bone", 899)).await;

    assert_eq!(
        notices.try_recv().unwrap(),
        Notice::Added {
            name: "Squeaky Bone".to_string()
        }
    );
}

#[tokio::test]
async fn test_removing_absent_product_is_silent() {
    let harness = CartHarness::guest(Vec::new());
    let mut notices = harness.manager.subscribe();

    harness.manager.remove_item(ProductId::new(99)).await;

    assert!(harness.manager.lines().is_empty());
    assert!(notices.try_recv().is_err());
}

#[tokio::test]
async fn test_updating_absent_product_still_acknowledges() {
    let harness = CartHarness::guest(Vec::new());
    let mut notices = harness.manager.subscribe();

    harness.manager.update_quantity(ProductId::new(99), 3).await;

    // Unlike remove, a quantity edit is always acknowledged
    assert!(harness.manager.lines().is_empty());
    assert_eq!(notices.try_recv().unwrap(), Notice::Updated);
}
