// SPDX-License-Identifier: MIT OR Apache-2.0
//! Export documents: JSON, CSV, XLIFF 1.2.

use crate::{Exchange, ExchangeError};
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ---------------------------------------------------------------------------
// Document shapes
// ---------------------------------------------------------------------------

/// Language attributes carried by an export/import document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageSpec {
    /// Short IETF-like code.
    pub code: String,
    /// English display name.
    pub name: String,
    /// Name in the language itself.
    #[serde(default)]
    pub native_name: String,
    /// Right-to-left flag.
    #[serde(default)]
    pub is_rtl: bool,
    /// Active flag.
    #[serde(default = "default_true")]
    pub is_active: bool,
    /// Default-language flag.
    #[serde(default)]
    pub is_default: bool,
}

fn default_true() -> bool {
    true
}

/// Key attributes carried by an export/import document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeySpec {
    /// Dotted key name.
    pub name: String,
    /// Optional category.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Optional description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Optional context hint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

/// The JSON export document. Feeding it back through import reproduces an
/// equivalent store (approval flags reset, per the import contract).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportDocument {
    /// Every non-deleted language.
    pub languages: Vec<LanguageSpec>,
    /// Every non-deleted key.
    pub keys: Vec<KeySpec>,
    /// `languageCode → keyName → value` over non-deleted localizations.
    pub localizations: BTreeMap<String, BTreeMap<String, String>>,
}

// ---------------------------------------------------------------------------
// Export
// ---------------------------------------------------------------------------

impl Exchange {
    /// Export the full store as a JSON-importable document.
    ///
    /// Unapproved values are included — the export is a backup surface,
    /// not a serving surface.
    pub async fn export_document(&self) -> Result<ExportDocument, ExchangeError> {
        let store = self.store();
        let languages = store.list_languages(false).await?;
        let keys = store.list_keys(None).await?;

        let mut localizations = BTreeMap::new();
        for language in &languages {
            let catalog = store.build_catalog(language.id, None, false).await?;
            if !catalog.is_empty() {
                localizations.insert(language.code.clone(), catalog);
            }
        }

        Ok(ExportDocument {
            languages: languages
                .into_iter()
                .map(|l| LanguageSpec {
                    code: l.code,
                    name: l.name,
                    native_name: l.native_name,
                    is_rtl: l.is_rtl,
                    is_active: l.is_active,
                    is_default: l.is_default,
                })
                .collect(),
            keys: keys
                .into_iter()
                .map(|k| KeySpec {
                    name: k.name,
                    category: k.category,
                    description: k.description,
                    context: k.context,
                })
                .collect(),
            localizations,
        })
    }

    /// Export as CSV: header `Key,Category,Description,Context,{code…}`,
    /// one row per key, empty string for missing translations.
    pub async fn export_csv(&self) -> Result<Vec<u8>, ExchangeError> {
        let document = self.export_document().await?;
        let codes: Vec<&str> = document.languages.iter().map(|l| l.code.as_str()).collect();

        let mut writer = csv::Writer::from_writer(Vec::new());
        let mut header = vec!["Key", "Category", "Description", "Context"];
        header.extend(&codes);
        writer
            .write_record(&header)
            .map_err(|e| ExchangeError::Csv(e.to_string()))?;

        for key in &document.keys {
            let mut record = vec![
                key.name.clone(),
                key.category.clone().unwrap_or_default(),
                key.description.clone().unwrap_or_default(),
                key.context.clone().unwrap_or_default(),
            ];
            for code in &codes {
                let value = document
                    .localizations
                    .get(*code)
                    .and_then(|catalog| catalog.get(&key.name))
                    .cloned()
                    .unwrap_or_default();
                record.push(value);
            }
            writer
                .write_record(&record)
                .map_err(|e| ExchangeError::Csv(e.to_string()))?;
        }

        writer
            .into_inner()
            .map_err(|e| ExchangeError::Csv(e.to_string()))
    }

    /// Export as XLIFF 1.2: one `<file>` per non-empty language with a
    /// `<trans-unit>` per key.
    pub async fn export_xliff(&self) -> Result<Vec<u8>, ExchangeError> {
        let document = self.export_document().await?;
        let source_language = document
            .languages
            .iter()
            .find(|l| l.is_default)
            .map(|l| l.code.clone())
            .unwrap_or_else(|| "en".to_string());

        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
        writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
            .map_err(xml_err)?;

        let mut xliff = BytesStart::new("xliff");
        xliff.push_attribute(("version", "1.2"));
        xliff.push_attribute(("xmlns", "urn:oasis:names:tc:xliff:document:1.2"));
        writer.write_event(Event::Start(xliff)).map_err(xml_err)?;

        for (code, catalog) in &document.localizations {
            if catalog.is_empty() {
                continue;
            }
            let mut file = BytesStart::new("file");
            file.push_attribute(("source-language", source_language.as_str()));
            file.push_attribute(("target-language", code.as_str()));
            file.push_attribute(("datatype", "plaintext"));
            file.push_attribute(("original", "l10n-catalog"));
            writer.write_event(Event::Start(file)).map_err(xml_err)?;
            writer
                .write_event(Event::Start(BytesStart::new("body")))
                .map_err(xml_err)?;

            for (key, value) in catalog {
                let mut unit = BytesStart::new("trans-unit");
                unit.push_attribute(("id", key.as_str()));
                writer.write_event(Event::Start(unit)).map_err(xml_err)?;

                writer
                    .write_event(Event::Start(BytesStart::new("source")))
                    .map_err(xml_err)?;
                writer
                    .write_event(Event::Text(BytesText::new(key)))
                    .map_err(xml_err)?;
                writer
                    .write_event(Event::End(BytesEnd::new("source")))
                    .map_err(xml_err)?;

                writer
                    .write_event(Event::Start(BytesStart::new("target")))
                    .map_err(xml_err)?;
                writer
                    .write_event(Event::Text(BytesText::new(value)))
                    .map_err(xml_err)?;
                writer
                    .write_event(Event::End(BytesEnd::new("target")))
                    .map_err(xml_err)?;

                writer
                    .write_event(Event::End(BytesEnd::new("trans-unit")))
                    .map_err(xml_err)?;
            }

            writer
                .write_event(Event::End(BytesEnd::new("body")))
                .map_err(xml_err)?;
            writer
                .write_event(Event::End(BytesEnd::new("file")))
                .map_err(xml_err)?;
        }

        writer
            .write_event(Event::End(BytesEnd::new("xliff")))
            .map_err(xml_err)?;
        Ok(writer.into_inner())
    }
}

// `Writer::write_event`'s error type differs across quick-xml releases;
// fold any of them into the exchange taxonomy.
fn xml_err<E: std::fmt::Display>(e: E) -> ExchangeError {
    ExchangeError::Xliff(e.to_string())
}
