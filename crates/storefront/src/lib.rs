//! PawMart storefront client SDK.
//!
//! A thin client layer over the PawMart pet-store REST backend: catalog
//! browsing, authentication, orders with a mocked checkout, and the cart
//! synchronization manager that reconciles a locally-persisted guest cart
//! with the server-side cart across login/logout transitions.
//!
//! # Architecture
//!
//! - [`api::StoreClient`] - REST API client (catalog reads cached via `moka`)
//! - [`cart::CartManager`] - optimistic cart mutations with selective rollback
//! - [`session::SessionProvider`] - login/logout signal the cart manager observes
//! - [`config::ClientConfig`] - environment-driven configuration

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod cart;
pub mod config;
pub mod session;
