// SPDX-License-Identifier: MIT OR Apache-2.0
//! Catalog import and export.
//!
//! The JSON export is by construction a valid import input (the round-trip
//! law in the service contract); CSV and XLIFF 1.2 exports preserve every
//! `(language, key, value)` tuple. Imports are transactional best-effort:
//! items fail independently and the summary enumerates per-item errors.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod export;
mod import;

pub use export::{ExportDocument, KeySpec, LanguageSpec};
pub use import::{ImportItemError, ImportSummary};

use l10n_store::{CatalogStore, StoreError};
use std::sync::Arc;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Failures of a whole import/export run (item-level import failures are
/// reported in the [`ImportSummary`] instead).
#[derive(Debug, thiserror::Error)]
pub enum ExchangeError {
    /// The store failed underneath the run.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// CSV serialization failed.
    #[error("csv serialization failed: {0}")]
    Csv(String),

    /// XLIFF serialization failed.
    #[error("xliff serialization failed: {0}")]
    Xliff(String),
}

// ---------------------------------------------------------------------------
// Exchange
// ---------------------------------------------------------------------------

/// Import/export engine over the store adapter.
pub struct Exchange {
    store: Arc<dyn CatalogStore>,
}

impl Exchange {
    /// Wire the exchange to the store.
    pub fn new(store: Arc<dyn CatalogStore>) -> Self {
        Self { store }
    }

    fn store(&self) -> &Arc<dyn CatalogStore> {
        &self.store
    }
}
