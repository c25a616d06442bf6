//! Furnish Core - Shared domain types.
//!
//! This crate provides the types used across all Furnish components:
//! - `storefront` - JSON API for the shop (catalog, cart, checkout, orders)
//! - `cli` - Command-line tools for migrations, seeding and order management
//!
//! # Architecture
//!
//! The core crate contains only types and validation - no I/O, no database
//! access, no HTTP clients. This keeps it lightweight and allows it to be used
//! anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for IDs, prices, emails, postcodes, cards
//!   and order statuses

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
