//! Command implementations.
//!
//! Most cart and wishlist commands call the [`Storefront`] directly from
//! `main`; the modules here cover the ones that need input handling or
//! extra output.

pub mod account;
pub mod catalog;
pub mod remote_cart;

use std::io::Stdout;

use greencart_storefront::storage::FileStore;
use greencart_storefront::{Storefront, StorefrontConfig, StorefrontError};
use thiserror::Error;

use crate::terminal::TerminalRenderer;

/// The storefront as the CLI runs it.
pub type Shop = Storefront<FileStore, TerminalRenderer<Stdout>>;

/// Errors from command input handling.
#[derive(Debug, Error)]
pub enum CommandError {
    /// The storefront already showed this one to the user.
    #[error(transparent)]
    Storefront(#[from] StorefrontError),

    /// Reading from stdin failed.
    #[error("Could not read input: {0}")]
    Input(#[from] std::io::Error),

    #[error("Password must not be empty")]
    EmptyPassword,
}

/// Open the storefront over the configured storage directory.
///
/// # Errors
///
/// Returns an error if the storage directory cannot be created or the HTTP
/// client cannot be built.
pub fn open(config: StorefrontConfig) -> Result<Shop, StorefrontError> {
    let store = FileStore::open(&config.storage_dir)?;
    tracing::debug!(dir = %store.dir().display(), "Opened local storage");
    Storefront::new(config, store, TerminalRenderer::new(std::io::stdout()))
}
