use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::shared_types::{FrequencyMap, Tally};

/// An entry of a ranked list. Produced only at reporting time, never
/// persisted.
#[derive(Debug, PartialEq, Eq)]
pub(crate) struct RankedEntry {
    pub(crate) key: String,
    pub(crate) count: u64,
}

#[derive(Debug, Error)]
pub(crate) enum ReportError {
    #[error("unable to load language table: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed language table: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("no display name for language code {0:?}")]
    UnknownLanguage(String),
}

/// Flat language-code to display-name table, keyed by lowercased code.
/// Loaded once by the coordinator, immediately before reporting.
#[derive(Debug, Deserialize)]
#[serde(transparent)]
pub(crate) struct LanguageTable(HashMap<String, String>);

impl LanguageTable {
    pub(crate) fn load(path: &Path) -> Result<Self, ReportError> {
        Ok(serde_json::from_str(&std::fs::read_to_string(path)?)?)
    }

    fn display_name(&self, code: &str) -> Option<&str> {
        self.0.get(code).map(String::as_str)
    }
}

/// Top `k` entries by count, descending. The order among equal counts is
/// whatever the map traversal produced; it carries no meaning.
pub(crate) fn rank_top(map: &FrequencyMap, k: usize) -> Vec<RankedEntry> {
    let mut entries: Vec<RankedEntry> = map
        .iter()
        .map(|(key, &count)| RankedEntry {
            key: key.clone(),
            count,
        })
        .collect();
    entries.sort_by(|a, b| b.count.cmp(&a.count));
    entries.truncate(k);
    entries
}

/// Render both ranked lists. Language codes are lowercased for lookup and
/// display; a code missing from the table is fatal. Every line is built
/// before any is emitted, so a failed lookup produces no partial report.
pub(crate) fn render_report(
    merged: &Tally,
    languages: &LanguageTable,
    top: usize,
) -> Result<Vec<String>, ReportError> {
    let mut lines = Vec::new();

    for (i, entry) in rank_top(&merged.hashtags, top).iter().enumerate() {
        lines.push(format!("{}. #{}, {}", i + 1, entry.key, entry.count));
    }

    for (i, entry) in rank_top(&merged.languages, top).iter().enumerate() {
        let code = entry.key.to_lowercase();
        let name = languages
            .display_name(&code)
            .ok_or_else(|| ReportError::UnknownLanguage(code.clone()))?;
        lines.push(format!("{}. {} ({}), {}", i + 1, name, code, entry.count));
    }

    Ok(lines)
}
