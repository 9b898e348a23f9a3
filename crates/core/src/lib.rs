//! PawMart Core - Shared types library.
//!
//! This crate provides common types used across all PawMart components:
//! - `storefront` - Client SDK over the pet-store backend API
//! - `cli` - Terminal storefront client
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no HTTP clients, no async.
//! This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, prices, emails, and statuses

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
