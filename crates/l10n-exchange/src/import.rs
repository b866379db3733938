// SPDX-License-Identifier: MIT OR Apache-2.0
//! Transactional best-effort import.

use crate::export::ExportDocument;
use crate::{Exchange, ExchangeError};
use l10n_store::{NewKey, NewLanguage, StoreError, UpsertLocalization};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Instant;
use tracing::info;

// ---------------------------------------------------------------------------
// Summary
// ---------------------------------------------------------------------------

/// One failed import item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportItemError {
    /// What the item was (e.g. `language:en`, `localization:de/app.welcome`).
    pub item: String,
    /// Why it failed.
    pub reason: String,
}

/// Outcome of an import run. Items fail independently; the run as a whole
/// only errors when the store itself goes away.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportSummary {
    /// Languages created (pre-existing ones are left untouched).
    pub languages_created: u64,
    /// Keys created (pre-existing ones are left untouched).
    pub keys_created: u64,
    /// Localization values written.
    pub localizations_written: u64,
    /// Localization values skipped because they exist and overwrite was
    /// off.
    pub skipped: u64,
    /// Items processed in total.
    pub processed: u64,
    /// Per-item failures.
    pub errors: Vec<ImportItemError>,
    /// Wall-clock duration in milliseconds.
    pub duration_ms: u64,
}

impl ImportSummary {
    /// Number of failed items.
    pub fn failed(&self) -> u64 {
        self.errors.len() as u64
    }
}

// ---------------------------------------------------------------------------
// Import
// ---------------------------------------------------------------------------

impl Exchange {
    /// Apply an import document.
    ///
    /// Languages and keys are created when missing and left untouched when
    /// present. Localization values are written with `approved = false` —
    /// both newly created and overwritten ones re-enter review — and
    /// existing values are only replaced when `overwrite` is set.
    ///
    /// A transient store failure aborts the run with an error; everything
    /// else is an item-level failure recorded in the summary.
    pub async fn import_document(
        &self,
        document: &ExportDocument,
        overwrite: bool,
    ) -> Result<ImportSummary, ExchangeError> {
        let started = Instant::now();
        let mut summary = ImportSummary::default();

        for language in &document.languages {
            summary.processed += 1;
            match self
                .store()
                .create_language(NewLanguage {
                    code: language.code.clone(),
                    name: language.name.clone(),
                    native_name: language.native_name.clone(),
                    is_rtl: language.is_rtl,
                    is_active: language.is_active,
                    is_default: language.is_default,
                })
                .await
            {
                Ok(_) => summary.languages_created += 1,
                Err(StoreError::AlreadyExists { .. }) => {}
                Err(e @ StoreError::Unavailable(_)) => return Err(e.into()),
                Err(e) => summary.errors.push(ImportItemError {
                    item: format!("language:{}", language.code),
                    reason: e.to_string(),
                }),
            }
        }

        for key in &document.keys {
            summary.processed += 1;
            match self
                .store()
                .create_key(NewKey {
                    name: key.name.clone(),
                    category: key.category.clone(),
                    description: key.description.clone(),
                    context: key.context.clone(),
                })
                .await
            {
                Ok(_) => summary.keys_created += 1,
                Err(StoreError::AlreadyExists { .. }) => {}
                Err(e @ StoreError::Unavailable(_)) => return Err(e.into()),
                Err(e) => summary.errors.push(ImportItemError {
                    item: format!("key:{}", key.name),
                    reason: e.to_string(),
                }),
            }
        }

        for (code, catalog) in &document.localizations {
            let language = match self.store().get_language_by_code(code).await {
                Ok(language) => language,
                Err(e @ StoreError::Unavailable(_)) => return Err(e.into()),
                Err(e) => {
                    // The whole language block fails as one item per value.
                    for key_name in catalog.keys() {
                        summary.processed += 1;
                        summary.errors.push(ImportItemError {
                            item: format!("localization:{code}/{key_name}"),
                            reason: e.to_string(),
                        });
                    }
                    continue;
                }
            };

            for (key_name, value) in catalog {
                summary.processed += 1;
                let item = || format!("localization:{code}/{key_name}");

                let key = match self.store().get_key_by_name(key_name).await {
                    Ok(key) => key,
                    Err(e @ StoreError::Unavailable(_)) => return Err(e.into()),
                    Err(e) => {
                        summary.errors.push(ImportItemError {
                            item: item(),
                            reason: e.to_string(),
                        });
                        continue;
                    }
                };

                if !overwrite {
                    match self.store().get_localization_for(key.id, language.id).await {
                        Ok(Some(_)) => {
                            summary.skipped += 1;
                            continue;
                        }
                        Ok(None) => {}
                        Err(e @ StoreError::Unavailable(_)) => return Err(e.into()),
                        Err(e) => {
                            summary.errors.push(ImportItemError {
                                item: item(),
                                reason: e.to_string(),
                            });
                            continue;
                        }
                    }
                }

                match self
                    .store()
                    .upsert_localization(UpsertLocalization {
                        key_id: key.id,
                        language_id: language.id,
                        value: value.clone(),
                        plural_forms: BTreeMap::new(),
                        variables: Vec::new(),
                        approved: false,
                        approved_by: None,
                        expected_version: None,
                    })
                    .await
                {
                    Ok(_) => summary.localizations_written += 1,
                    Err(e @ StoreError::Unavailable(_)) => return Err(e.into()),
                    Err(e) => summary.errors.push(ImportItemError {
                        item: item(),
                        reason: e.to_string(),
                    }),
                }
            }
        }

        summary.duration_ms = started.elapsed().as_millis() as u64;
        info!(
            processed = summary.processed,
            written = summary.localizations_written,
            failed = summary.failed(),
            duration_ms = summary.duration_ms,
            "import finished"
        );
        Ok(summary)
    }
}
