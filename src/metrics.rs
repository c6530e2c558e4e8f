//! Per-item metric rules and dataset-level aggregation.
//!
//! One dataset item yields four scores — label accuracy, match score,
//! richness score, hallucination rate — or is excluded outright. The rules
//! run in a fixed precedence (exclusion, label mismatch, real/real shortcut,
//! full point scoring) so the point-scoring machinery only ever runs for
//! items both sides call AI-generated.

use serde::{Deserialize, Serialize};

use crate::annotation::{Annotation, Label};
use crate::matcher::greedy_match;
use crate::scorers::SimilarityScorer;
use crate::Result;

/// The four per-item scores.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ItemMetrics {
    /// 1.0 when both labels agree, else 0.0.
    pub accuracy: f64,
    /// Mean alignment score over ground-truth points (unmatched count as 0).
    pub match_score: f64,
    /// Fraction of ground-truth points with an adequate (≥ threshold) partner.
    pub richness_score: f64,
    /// Fraction of generated points without an adequate correspondence.
    pub hallucination_rate: f64,
}

impl ItemMetrics {
    /// Scores for a label mismatch: total failure regardless of points.
    const LABEL_MISMATCH: Self = Self {
        accuracy: 0.0,
        match_score: 0.0,
        richness_score: 0.0,
        hallucination_rate: 1.0,
    };

    /// Scores when both sides agree the image is real: points are not scored.
    const BOTH_REAL: Self = Self {
        accuracy: 1.0,
        match_score: 1.0,
        richness_score: 1.0,
        hallucination_rate: 0.0,
    };
}

/// Evaluate one dataset item.
///
/// Returns `Ok(None)` when the ground truth has no error points: such an item
/// cannot be scored for content and is excluded from every aggregate,
/// whatever its labels say.
///
/// A scorer failure does not abort the item: the similarity matrix degrades
/// to all zeros (logged), which bottoms out the three point metrics.
pub fn evaluate_item(
    ground_truth: &Annotation,
    generated: &Annotation,
    scorer: &dyn SimilarityScorer,
    threshold: f64,
) -> Result<Option<ItemMetrics>> {
    if ground_truth.points.is_empty() {
        return Ok(None);
    }

    if ground_truth.label != generated.label {
        return Ok(Some(ItemMetrics::LABEL_MISMATCH));
    }
    if ground_truth.label == Label::Real {
        return Ok(Some(ItemMetrics::BOTH_REAL));
    }

    let m = ground_truth.points.len();
    let n = generated.points.len();

    let matrix = match scorer.score_matrix(&ground_truth.points, &generated.points) {
        Ok(matrix) => matrix,
        Err(e) => {
            log::warn!(
                "{} scorer failed, degrading to zero similarity: {}",
                scorer.name(),
                e
            );
            crate::matrix::SimilarityMatrix::zeros(m, n)
        }
    };

    let outcome = greedy_match(&matrix);
    let adequate = outcome.adequate_count(threshold);

    let hallucination_rate = if n > 0 {
        1.0 - adequate as f64 / n as f64
    } else {
        // A generated annotation with zero points cannot hallucinate.
        0.0
    };

    Ok(Some(ItemMetrics {
        accuracy: 1.0,
        match_score: outcome.mean_score(),
        richness_score: adequate as f64 / m as f64,
        hallucination_rate,
    }))
}

/// Order-independent accumulator for dataset-level means.
///
/// Holds running sums and counts only, so results of parallel per-item
/// evaluation can be folded in any order (and accumulators merged) without
/// changing the reported averages.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MetricAccumulator {
    accuracy_sum: f64,
    match_sum: f64,
    richness_sum: f64,
    hallucination_sum: f64,
    scored: usize,
    skipped: usize,
}

impl MetricAccumulator {
    /// Fresh accumulator with nothing recorded.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one scored item.
    pub fn record(&mut self, metrics: ItemMetrics) {
        self.accuracy_sum += metrics.accuracy;
        self.match_sum += metrics.match_score;
        self.richness_sum += metrics.richness_score;
        self.hallucination_sum += metrics.hallucination_rate;
        self.scored += 1;
    }

    /// Record one item that was excluded or failed validation.
    pub fn record_skipped(&mut self) {
        self.skipped += 1;
    }

    /// Fold another accumulator into this one.
    #[must_use]
    pub fn merge(mut self, other: Self) -> Self {
        self.accuracy_sum += other.accuracy_sum;
        self.match_sum += other.match_sum;
        self.richness_sum += other.richness_sum;
        self.hallucination_sum += other.hallucination_sum;
        self.scored += other.scored;
        self.skipped += other.skipped;
        self
    }

    /// Number of items that contributed to the aggregates.
    #[must_use]
    pub fn scored(&self) -> usize {
        self.scored
    }

    /// Number of items excluded or skipped.
    #[must_use]
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Arithmetic means of the four metrics, unweighted by point counts.
    ///
    /// Returns `None` when no item was scored (means are undefined).
    #[must_use]
    pub fn means(&self) -> Option<ItemMetrics> {
        if self.scored == 0 {
            return None;
        }
        let count = self.scored as f64;
        Some(ItemMetrics {
            accuracy: self.accuracy_sum / count,
            match_score: self.match_sum / count,
            richness_score: self.richness_sum / count,
            hallucination_rate: self.hallucination_sum / count,
        })
    }
}
