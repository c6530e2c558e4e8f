//! Dataset-level result reporting.
//!
//! The four averages are written as plain `key:value` lines — one artifact
//! file, echoed verbatim to stdout — so downstream tooling can scrape them
//! without a JSON parser. The same summary serializes to JSON for anything
//! that wants structure.

use std::fmt;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::metrics::{ItemMetrics, MetricAccumulator};
use crate::Result;

/// Dataset-level evaluation summary.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DatasetSummary {
    /// Mean label accuracy over scored items.
    pub avg_accuracy: f64,
    /// Mean match score over scored items.
    pub avg_match_score: f64,
    /// Mean richness score over scored items.
    pub avg_richness_score: f64,
    /// Mean hallucination rate over scored items.
    pub avg_hallucination_rate: f64,
    /// Items that contributed to the averages.
    pub scored: usize,
    /// Items excluded (empty ground truth) or skipped (validation failure).
    pub skipped: usize,
}

impl DatasetSummary {
    /// Build a summary from a finished accumulator.
    ///
    /// Returns `None` when no item was scored: averages over an empty set are
    /// undefined and reporting zeros would be misleading.
    #[must_use]
    pub fn from_accumulator(acc: &MetricAccumulator) -> Option<Self> {
        let means: ItemMetrics = acc.means()?;
        Some(Self {
            avg_accuracy: means.accuracy,
            avg_match_score: means.match_score,
            avg_richness_score: means.richness_score,
            avg_hallucination_rate: means.hallucination_rate,
            scored: acc.scored(),
            skipped: acc.skipped(),
        })
    }

    /// Write the `key:value` artifact to `path`.
    pub fn write_artifact(&self, path: &Path) -> Result<()> {
        fs::write(path, self.to_string())?;
        log::info!("wrote results to {}", path.display());
        Ok(())
    }
}

impl fmt::Display for DatasetSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "avg_accuracy:{}", self.avg_accuracy)?;
        writeln!(f, "avg_match_score:{}", self.avg_match_score)?;
        writeln!(f, "avg_richness_score:{}", self.avg_richness_score)?;
        writeln!(f, "avg_hallucination_rate:{}", self.avg_hallucination_rate)
    }
}
