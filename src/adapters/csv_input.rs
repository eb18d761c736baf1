use crate::utils::error::{FetchJobError, Result};
use std::collections::HashSet;
use std::path::Path;
use tracing::info;

/// Reads the `id` column from a CSV file, deduplicated with first-occurrence
/// order preserved. Blank cells are dropped.
pub fn load_identifiers(path: impl AsRef<Path>) -> Result<Vec<String>> {
    let path = path.as_ref();
    let mut reader = csv::Reader::from_path(path)?;

    let headers = reader.headers()?.clone();
    let id_column = headers
        .iter()
        .position(|h| h == "id")
        .ok_or_else(|| FetchJobError::ProcessingError {
            message: format!("no 'id' column in {}", path.display()),
        })?;

    let mut seen = HashSet::new();
    let mut identifiers = Vec::new();
    for row in reader.records() {
        let row = row?;
        let Some(id) = row.get(id_column) else {
            continue;
        };
        let id = id.trim();
        if !id.is_empty() && seen.insert(id.to_string()) {
            identifiers.push(id.to_string());
        }
    }

    info!(
        count = identifiers.len(),
        input = %path.display(),
        "loaded unique identifiers"
    );
    Ok(identifiers)
}
