//! Model catalog: normalization, ordering, and placeholder fallbacks.
//!
//! The catalog never fails visibly. A backend failure is logged and masked
//! with a fixed placeholder list, and an empty catalog becomes a single
//! human-readable placeholder row, so the client always has something to
//! render.

use std::sync::Arc;

use chrono::DateTime;
use tracing::warn;

use crate::models::{ModelEntry, RawModel};
use crate::upstream::ChatBackend;

/// Row shown when the backend reports an empty catalog.
const EMPTY_CATALOG_NAME: &str = "No models available";

/// Rows served when the backend cannot be reached at all.
const OFFLINE_PLACEHOLDER_NAMES: [&str; 2] = ["dummy-model-1", "dummy-model-2"];

/// Requested ordering for the model list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    NameAsc,
    NameDesc,
    DateAsc,
    DateDesc,
    SizeAsc,
    SizeDesc,
}

impl SortKey {
    /// Parse a query value; unknown or absent input falls back to `DateDesc`.
    pub fn parse(value: Option<&str>) -> Self {
        match value {
            Some("name_asc") => Self::NameAsc,
            Some("name_desc") => Self::NameDesc,
            Some("date_asc") => Self::DateAsc,
            Some("date_desc") => Self::DateDesc,
            Some("size_asc") => Self::SizeAsc,
            Some("size_desc") => Self::SizeDesc,
            _ => Self::DateDesc,
        }
    }
}

/// Presentation unit for the `size` field of a [`ModelEntry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SizeUnit {
    /// Megabytes, rounded to two decimals.
    #[default]
    Megabytes,
    /// Raw bytes as reported by the backend.
    Bytes,
}

impl SizeUnit {
    /// Parse a configuration value; anything unrecognized means megabytes.
    pub fn parse(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "bytes" | "b" => Self::Bytes,
            _ => Self::Megabytes,
        }
    }
}

/// Normalized model metadata, used for sorting before presentation.
#[derive(Debug, Clone)]
pub struct ModelInfo {
    pub name: String,
    /// Formatted install timestamp, or empty when unknown.
    pub installed_at: String,
    pub size_bytes: u64,
}

impl ModelInfo {
    fn from_raw(raw: RawModel) -> Self {
        Self {
            name: raw.name,
            installed_at: format_installed(&raw.modified_at),
            size_bytes: raw.size,
        }
    }

    fn into_entry(self, unit: SizeUnit) -> ModelEntry {
        let size = match unit {
            SizeUnit::Megabytes if self.size_bytes > 0 => {
                let mb = self.size_bytes as f64 / (1024.0 * 1024.0);
                (mb * 100.0).round() / 100.0
            }
            SizeUnit::Megabytes => 0.0,
            SizeUnit::Bytes => self.size_bytes as f64,
        };

        ModelEntry {
            name: self.name,
            installed: self.installed_at,
            size,
        }
    }
}

/// Reformat an RFC 3339 install timestamp as `YYYY-MM-DD HH:MM:SS`.
///
/// Unparseable non-empty values pass through unchanged; this sort form is
/// also what date ordering compares, so lexicographic equals chronological.
fn format_installed(raw: &str) -> String {
    if raw.is_empty() {
        return String::new();
    }
    match DateTime::parse_from_rfc3339(raw) {
        Ok(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
        Err(_) => raw.to_string(),
    }
}

/// Stable in-place sort; equal keys keep the backend's original order.
fn sort_models(models: &mut [ModelInfo], key: SortKey) {
    match key {
        SortKey::NameAsc => models.sort_by(|a, b| a.name.cmp(&b.name)),
        SortKey::NameDesc => models.sort_by(|a, b| b.name.cmp(&a.name)),
        SortKey::DateAsc => models.sort_by(|a, b| a.installed_at.cmp(&b.installed_at)),
        SortKey::DateDesc => models.sort_by(|a, b| b.installed_at.cmp(&a.installed_at)),
        SortKey::SizeAsc => models.sort_by_key(|m| m.size_bytes),
        SortKey::SizeDesc => models.sort_by(|a, b| b.size_bytes.cmp(&a.size_bytes)),
    }
}

/// Model listing service for `GET /models`.
pub struct ModelCatalog {
    backend: Arc<dyn ChatBackend>,
    size_unit: SizeUnit,
}

impl ModelCatalog {
    pub fn new(backend: Arc<dyn ChatBackend>, size_unit: SizeUnit) -> Self {
        Self { backend, size_unit }
    }

    /// List models ordered by `sort`.
    ///
    /// Infallible by contract: backend failures are logged and masked with
    /// placeholder data.
    pub async fn list(&self, sort: SortKey) -> Vec<ModelEntry> {
        let raw = match self.backend.list_models().await {
            Ok(raw) => raw,
            Err(e) => {
                warn!("model listing failed, serving placeholders: {e}");
                return offline_placeholders();
            }
        };

        let mut models: Vec<ModelInfo> = raw.into_iter().map(ModelInfo::from_raw).collect();
        sort_models(&mut models, sort);

        if models.is_empty() {
            return vec![ModelEntry {
                name: EMPTY_CATALOG_NAME.to_string(),
                installed: String::new(),
                size: 0.0,
            }];
        }

        models
            .into_iter()
            .map(|m| m.into_entry(self.size_unit))
            .collect()
    }
}

fn offline_placeholders() -> Vec<ModelEntry> {
    OFFLINE_PLACEHOLDER_NAMES
        .iter()
        .map(|name| ModelEntry {
            name: (*name).to_string(),
            installed: String::new(),
            size: 0.0,
        })
        .collect()
}
