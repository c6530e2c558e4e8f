//! Input records: raw annotation pairs for one benchmark run.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// One dataset item: a ground-truth and a generated annotation for one image.
///
/// The optional `label` field found in some export formats is carried but
/// ignored by scoring — labels are always re-derived from the boxed markers
/// inside the annotation texts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnotationRecord {
    /// Path of the image the annotations describe.
    pub image_path: String,
    /// Human-authored annotation text.
    pub ground_truth: String,
    /// Machine-generated annotation text.
    pub generated: String,
    /// Label as exported by the labeling tool; not used by the scoring core.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// Load a JSON array of [`AnnotationRecord`]s from a file.
pub fn load_records(path: &Path) -> Result<Vec<AnnotationRecord>> {
    let content = fs::read_to_string(path)?;
    let records: Vec<AnnotationRecord> = serde_json::from_str(&content)
        .map_err(|e| Error::parse(format!("{}: {}", path.display(), e)))?;
    log::info!("loaded {} records from {}", records.len(), path.display());
    Ok(records)
}
