//! GreenCart storefront client library.
//!
//! - [`storage`] - Key-value persistence for the session, cart and wishlist
//! - [`state`] - Cart and wishlist state with session-gated mutations
//! - [`api`] - HTTP client for the catalog, auth and cart endpoints
//! - [`catalog`] - Client-side filtering and sorting of product listings
//! - [`views`] - View-models and the [`views::Renderer`] trait
//! - [`storefront`] - The facade tying the above together

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod catalog;
pub mod config;
pub mod error;
pub mod models;
pub mod state;
pub mod storage;
pub mod storefront;
pub mod views;

pub use config::StorefrontConfig;
pub use error::StorefrontError;
pub use storefront::Storefront;
