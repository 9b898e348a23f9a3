//! Durable local cart storage.
//!
//! One string-keyed slot holding the serialized cart: an array of lines with
//! product id, name, price, quantity, image URL, and description. Backend
//! line ids are never persisted locally; they are only valid once synced.

use std::io;
use std::path::PathBuf;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use pawmart_core::ProductId;

/// Errors from the durable cart slot.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Underlying I/O failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The slot contents could not be (de)serialized.
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// A cart line as persisted in the local slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredCartLine {
    pub product_id: ProductId,
    pub product_name: String,
    pub price: Decimal,
    pub quantity: u32,
    #[serde(default)]
    pub image_url: String,
    #[serde(default)]
    pub description: String,
}

/// The durable local copy of the cart.
///
/// Read once at startup and overwritten on every state change; fully owned
/// by the cart manager.
pub trait CartStore: Send + Sync {
    /// Load the persisted lines. An empty slot yields an empty list.
    ///
    /// # Errors
    ///
    /// Returns an error if the slot exists but cannot be read or parsed.
    fn load(&self) -> Result<Vec<StoredCartLine>, StoreError>;

    /// Overwrite the slot with the given lines.
    ///
    /// # Errors
    ///
    /// Returns an error if the slot cannot be written.
    fn save(&self, lines: &[StoredCartLine]) -> Result<(), StoreError>;
}

// =============================================================================
// JsonFileStore
// =============================================================================

/// File-backed cart slot: one JSON document on disk.
///
/// Writes go to a temp file first and are renamed into place, so a crash
/// mid-write never leaves a half-written slot.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    /// Create a store backed by the given file path.
    #[must_use]
    pub const fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl CartStore for JsonFileStore {
    fn load(&self) -> Result<Vec<StoredCartLine>, StoreError> {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        Ok(serde_json::from_str(&text)?)
    }

    fn save(&self, lines: &[StoredCartLine]) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let text = serde_json::to_string(lines)?;
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, text)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

// =============================================================================
// MemoryStore
// =============================================================================

/// In-memory cart slot for tests and embedding.
///
/// `set_fail_saves` makes subsequent saves fail, to exercise the manager's
/// persist-failure logging path.
#[derive(Debug, Default)]
pub struct MemoryStore {
    lines: Mutex<Vec<StoredCartLine>>,
    fail_saves: AtomicBool,
}

impl MemoryStore {
    /// Create an empty in-memory slot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a slot pre-populated with lines.
    #[must_use]
    pub fn with_lines(lines: Vec<StoredCartLine>) -> Self {
        Self {
            lines: Mutex::new(lines),
            fail_saves: AtomicBool::new(false),
        }
    }

    /// Make subsequent saves fail.
    pub fn set_fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }
}

impl CartStore for MemoryStore {
    fn load(&self) -> Result<Vec<StoredCartLine>, StoreError> {
        Ok(self
            .lines
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone())
    }

    fn save(&self, lines: &[StoredCartLine]) -> Result<(), StoreError> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(StoreError::Io(io::Error::other("simulated save failure")));
        }
        *self
            .lines
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = lines.to_vec();
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn sample_lines() -> Vec<StoredCartLine> {
        vec![
            StoredCartLine {
                product_id: ProductId::new(1),
                product_name: "Squeaky Bone".to_string(),
                price: Decimal::new(899, 2),
                quantity: 2,
                image_url: "/media/squeaky-bone.png".to_string(),
                description: "Durable rubber chew toy".to_string(),
            },
            StoredCartLine {
                product_id: ProductId::new(4),
                product_name: "Catnip Mouse".to_string(),
                price: Decimal::new(350, 2),
                quantity: 1,
                image_url: String::new(),
                description: String::new(),
            },
        ]
    }

    #[test]
    fn test_json_file_store_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("cart_items.json"));

        let lines = sample_lines();
        store.save(&lines).unwrap();
        assert_eq!(store.load().unwrap(), lines);
    }

    #[test]
    fn test_json_file_store_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("does-not-exist.json"));
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn test_json_file_store_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("nested/state/cart_items.json"));
        store.save(&sample_lines()).unwrap();
        assert_eq!(store.load().unwrap().len(), 2);
    }

    #[test]
    fn test_json_file_store_corrupt_slot_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cart_items.json");
        std::fs::write(&path, "{not json").unwrap();

        let store = JsonFileStore::new(path);
        assert!(matches!(store.load(), Err(StoreError::Serde(_))));
    }

    #[test]
    fn test_memory_store_fail_switch() {
        let store = MemoryStore::new();
        store.save(&sample_lines()).unwrap();

        store.set_fail_saves(true);
        assert!(store.save(&[]).is_err());
        // Last successful save is still readable
        assert_eq!(store.load().unwrap().len(), 2);

        store.set_fail_saves(false);
        store.save(&[]).unwrap();
        assert!(store.load().unwrap().is_empty());
    }
}
