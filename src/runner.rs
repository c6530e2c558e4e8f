//! Batch evaluation over a dataset of annotation records.
//!
//! Items share no mutable state, so they are evaluated on independent worker
//! threads (rayon, behind the `eval-parallel` feature) and folded into an
//! order-independent accumulator. One bad item — an annotation whose boxed
//! label is outside the contract — is logged and skipped; it never aborts the
//! batch.

use crate::annotation::parse_annotation;
use crate::dataset::AnnotationRecord;
use crate::metrics::{evaluate_item, ItemMetrics, MetricAccumulator};
use crate::scorers::SimilarityScorer;
use crate::{Error, Result};

/// Evaluates a dataset with one scorer and one match threshold.
pub struct DatasetEvaluator {
    scorer: Box<dyn SimilarityScorer>,
    threshold: f64,
}

impl std::fmt::Debug for DatasetEvaluator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatasetEvaluator")
            .field("scorer", &self.scorer.name())
            .field("threshold", &self.threshold)
            .finish()
    }
}

impl DatasetEvaluator {
    /// Create an evaluator.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] when `threshold` is outside `[0, 1]`.
    pub fn new(scorer: Box<dyn SimilarityScorer>, threshold: f64) -> Result<Self> {
        if !(0.0..=1.0).contains(&threshold) {
            return Err(Error::invalid_input(format!(
                "threshold must be in [0, 1], got {}",
                threshold
            )));
        }
        Ok(Self { scorer, threshold })
    }

    /// The match threshold in use.
    #[must_use]
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Name of the scoring strategy in use.
    #[must_use]
    pub fn scorer_name(&self) -> &'static str {
        self.scorer.name()
    }

    /// Evaluate every record and fold the results.
    ///
    /// Items are scored independently (in parallel with the `eval-parallel`
    /// feature); the fold itself always runs over per-item results in input
    /// order, so a given dataset reproduces bit-identical sums regardless of
    /// thread scheduling.
    #[must_use]
    pub fn evaluate(&self, records: &[AnnotationRecord]) -> MetricAccumulator {
        #[cfg(feature = "eval-parallel")]
        let outcomes: Vec<Option<ItemMetrics>> = {
            use rayon::prelude::*;
            records
                .par_iter()
                .map(|record| self.record_outcome(record))
                .collect()
        };

        #[cfg(not(feature = "eval-parallel"))]
        let outcomes: Vec<Option<ItemMetrics>> = records
            .iter()
            .map(|record| self.record_outcome(record))
            .collect();

        outcomes
            .into_iter()
            .fold(MetricAccumulator::new(), fold_outcome)
    }

    /// Score one record; `None` means the item did not enter the aggregates.
    fn record_outcome(&self, record: &AnnotationRecord) -> Option<ItemMetrics> {
        let ground_truth = match parse_annotation(&record.ground_truth) {
            Ok(annotation) => annotation,
            Err(e) => {
                log::warn!("skipping {} (ground truth): {}", record.image_path, e);
                return None;
            }
        };
        let generated = match parse_annotation(&record.generated) {
            Ok(annotation) => annotation,
            Err(e) => {
                log::warn!("skipping {} (generated): {}", record.image_path, e);
                return None;
            }
        };

        match evaluate_item(&ground_truth, &generated, self.scorer.as_ref(), self.threshold) {
            Ok(Some(metrics)) => {
                log::debug!(
                    "{}: accuracy={} match={:.3} richness={:.3} hallucination={:.3}",
                    record.image_path,
                    metrics.accuracy,
                    metrics.match_score,
                    metrics.richness_score,
                    metrics.hallucination_rate
                );
                Some(metrics)
            }
            Ok(None) => {
                log::debug!("{}: excluded (no ground-truth points)", record.image_path);
                None
            }
            Err(e) => {
                log::warn!("skipping {}: {}", record.image_path, e);
                None
            }
        }
    }
}

fn fold_outcome(mut acc: MetricAccumulator, outcome: Option<ItemMetrics>) -> MetricAccumulator {
    match outcome {
        Some(metrics) => acc.record(metrics),
        None => acc.record_skipped(),
    }
    acc
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scorers::lexical::LexicalScorer;

    fn record(image: &str, ground_truth: &str, generated: &str) -> AnnotationRecord {
        AnnotationRecord {
            image_path: image.to_string(),
            ground_truth: ground_truth.to_string(),
            generated: generated.to_string(),
            label: None,
        }
    }

    fn evaluator() -> DatasetEvaluator {
        DatasetEvaluator::new(Box::new(LexicalScorer::rouge_l()), 0.7).unwrap()
    }

    #[test]
    fn test_threshold_validation() {
        let err = DatasetEvaluator::new(Box::new(LexicalScorer::rouge_l()), 1.5).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
        let err = DatasetEvaluator::new(Box::new(LexicalScorer::rouge_l()), -0.1).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn test_invalid_label_skips_item_not_batch() {
        let records = vec![
            record("bad.png", r"\boxed{maybe} <begin_of_point>x<end_of_point>", "y"),
            record(
                "good.png",
                r"\boxed{real} <begin_of_point>fine<end_of_point>",
                r"\boxed{real} looks fine",
            ),
        ];
        let acc = evaluator().evaluate(&records);
        assert_eq!(acc.scored(), 1);
        assert_eq!(acc.skipped(), 1);
        // The surviving item is a real/real agreement.
        assert_eq!(acc.means().unwrap().accuracy, 1.0);
    }

    #[test]
    fn test_empty_ground_truth_counts_as_skipped() {
        let records = vec![record(
            "empty.png",
            r"\boxed{ai-generated} nothing marked up",
            r"\boxed{ai-generated} <begin_of_point>p<end_of_point>",
        )];
        let acc = evaluator().evaluate(&records);
        assert_eq!(acc.scored(), 0);
        assert_eq!(acc.skipped(), 1);
        assert!(acc.means().is_none());
    }

    #[test]
    fn test_identical_points_score_perfectly() {
        let text = r"\boxed{ai-generated} <begin_of_point>extra finger on the hand<end_of_point>";
        let acc = evaluator().evaluate(&[record("img.png", text, text)]);
        let means = acc.means().unwrap();
        assert_eq!(means.accuracy, 1.0);
        assert!((means.match_score - 1.0).abs() < 1e-9);
        assert!((means.richness_score - 1.0).abs() < 1e-9);
        assert!(means.hallucination_rate.abs() < 1e-9);
    }
}
