//! Invariant tests for the full scoring pipeline.
//!
//! These go through the public API the way a caller would: raw annotation
//! texts in, dataset summary out, with a stub scorer injected where the
//! similarity numbers need to be pinned.

use veracity::prelude::*;

/// Scores a pair by a number smuggled into the generated point ("~0.85").
///
/// Lets tests pin exact matrix values while still exercising the real
/// extraction, matching, and aggregation layers.
struct HintScorer;

impl SimilarityScorer for HintScorer {
    fn score_matrix(&self, reference: &[String], hypothesis: &[String]) -> Result<SimilarityMatrix> {
        Ok(SimilarityMatrix::from_fn(
            reference.len(),
            hypothesis.len(),
            |i, j| {
                hypothesis[j]
                    .split('~')
                    .nth(i + 1)
                    .and_then(|part| part.split_whitespace().next())
                    .and_then(|token| token.parse::<f64>().ok())
                    .unwrap_or(0.0)
            },
        ))
    }

    fn name(&self) -> &'static str {
        "hint"
    }
}

fn record(image: &str, ground_truth: &str, generated: &str) -> AnnotationRecord {
    AnnotationRecord {
        image_path: image.to_string(),
        ground_truth: ground_truth.to_string(),
        generated: generated.to_string(),
        label: None,
    }
}

fn fake_annotation(points: &[&str]) -> String {
    let mut text = String::from("\\boxed{ai-generated} ");
    for point in points {
        text.push_str("<begin_of_point>");
        text.push_str(point);
        text.push_str("<end_of_point>");
    }
    text
}

#[test]
fn reference_scenario_end_to_end() {
    // Matrix [[0.9, 0.1], [0.1, 0.05]]: greedy takes (0,0)=0.9 then (1,1)=0.05.
    let ground_truth = fake_annotation(&["missing finger on left hand", "floating shadow"]);
    let generated = fake_annotation(&["hint ~0.9 ~0.1", "hint ~0.1 ~0.05"]);

    let evaluator = DatasetEvaluator::new(Box::new(HintScorer), 0.7).unwrap();
    let acc = evaluator.evaluate(&[record("img.png", &ground_truth, &generated)]);
    let summary = DatasetSummary::from_accumulator(&acc).unwrap();

    assert_eq!(summary.scored, 1);
    assert_eq!(summary.avg_accuracy, 1.0);
    assert!((summary.avg_match_score - 0.475).abs() < 1e-12);
    assert!((summary.avg_richness_score - 0.5).abs() < 1e-12);
    assert!((summary.avg_hallucination_rate - 0.5).abs() < 1e-12);
}

#[test]
fn label_mismatch_ignores_point_content() {
    let ground_truth = "\\boxed{real} <begin_of_point>perfectly described error<end_of_point>";
    let generated = fake_annotation(&["hint ~1.0"]);

    let evaluator = DatasetEvaluator::new(Box::new(HintScorer), 0.7).unwrap();
    let acc = evaluator.evaluate(&[record("img.png", ground_truth, generated.as_str())]);
    let summary = DatasetSummary::from_accumulator(&acc).unwrap();

    assert_eq!(summary.avg_accuracy, 0.0);
    assert_eq!(summary.avg_match_score, 0.0);
    assert_eq!(summary.avg_richness_score, 0.0);
    assert_eq!(summary.avg_hallucination_rate, 1.0);
}

#[test]
fn both_real_scores_perfectly_without_point_scoring() {
    let ground_truth = "\\boxed{real} <begin_of_point>natural lighting<end_of_point>";
    let generated = "\\boxed{real} totally different commentary, no points at all";

    let evaluator = DatasetEvaluator::new(Box::new(HintScorer), 0.7).unwrap();
    let acc = evaluator.evaluate(&[record("img.png", ground_truth, generated)]);
    let summary = DatasetSummary::from_accumulator(&acc).unwrap();

    assert_eq!(summary.avg_accuracy, 1.0);
    assert_eq!(summary.avg_match_score, 1.0);
    assert_eq!(summary.avg_richness_score, 1.0);
    assert_eq!(summary.avg_hallucination_rate, 0.0);
}

#[test]
fn empty_ground_truth_is_excluded_from_aggregates() {
    let scorable_gt = fake_annotation(&["extra finger"]);
    let scorable_gen = fake_annotation(&["hint ~1.0"]);
    let records = vec![
        record("no-points.png", "\\boxed{ai-generated} nothing marked", "whatever"),
        record("scored.png", &scorable_gt, &scorable_gen),
    ];

    let evaluator = DatasetEvaluator::new(Box::new(HintScorer), 0.7).unwrap();
    let acc = evaluator.evaluate(&records);
    let summary = DatasetSummary::from_accumulator(&acc).unwrap();

    // The excluded item must not drag any average down.
    assert_eq!(summary.scored, 1);
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.avg_match_score, 1.0);
}

#[test]
fn invalid_label_skips_one_item_and_keeps_the_batch() {
    let good_gt = fake_annotation(&["warped text"]);
    let good_gen = fake_annotation(&["hint ~0.8"]);
    let records = vec![
        record("bad.png", "\\boxed{probably-fake} <begin_of_point>x<end_of_point>", "y"),
        record("good.png", &good_gt, &good_gen),
    ];

    let evaluator = DatasetEvaluator::new(Box::new(HintScorer), 0.7).unwrap();
    let acc = evaluator.evaluate(&records);
    let summary = DatasetSummary::from_accumulator(&acc).unwrap();

    assert_eq!(summary.scored, 1);
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.avg_accuracy, 1.0);
}

#[test]
fn aggregation_is_order_independent() {
    let records: Vec<AnnotationRecord> = (0..6)
        .map(|i| {
            let gt = fake_annotation(&["point one", "point two"]);
            let gen = fake_annotation(&[
                &format!("hint ~0.{} ~0.1", i + 3),
                &format!("hint ~0.1 ~0.{}", 9 - i),
            ]);
            record(&format!("img{}.png", i), &gt, &gen)
        })
        .collect();

    let evaluator = DatasetEvaluator::new(Box::new(HintScorer), 0.7).unwrap();
    let forward = DatasetSummary::from_accumulator(&evaluator.evaluate(&records)).unwrap();

    let mut reversed = records.clone();
    reversed.reverse();
    let backward = DatasetSummary::from_accumulator(&evaluator.evaluate(&reversed)).unwrap();

    // Sums over permuted f64 sequences can differ in the last ulp, so the
    // averages are compared with a tolerance; the counts must agree exactly.
    assert_eq!(forward.scored, backward.scored);
    assert_eq!(forward.skipped, backward.skipped);
    for (a, b) in [
        (forward.avg_accuracy, backward.avg_accuracy),
        (forward.avg_match_score, backward.avg_match_score),
        (forward.avg_richness_score, backward.avg_richness_score),
        (forward.avg_hallucination_rate, backward.avg_hallucination_rate),
    ] {
        assert!((a - b).abs() < 1e-12, "{} vs {}", a, b);
    }
}

#[test]
fn deterministic_scorer_reproduces_bit_identical_summaries() {
    let records = vec![
        record(
            "a.png",
            &fake_annotation(&["missing finger on left hand", "floating shadow"]),
            &fake_annotation(&["the hand has an extra finger", "odd shadow floating"]),
        ),
        record(
            "b.png",
            &fake_annotation(&["text on the sign is garbled"]),
            &fake_annotation(&["garbled text on the sign"]),
        ),
    ];

    let run = || {
        let evaluator =
            DatasetEvaluator::new(Box::new(LexicalScorer::rouge_l()), 0.7).unwrap();
        DatasetSummary::from_accumulator(&evaluator.evaluate(&records)).unwrap()
    };

    assert_eq!(run(), run());
}

#[test]
fn summary_artifact_round_trips_through_disk() {
    let gt = fake_annotation(&["extra finger"]);
    let gen = fake_annotation(&["hint ~0.9"]);
    let evaluator = DatasetEvaluator::new(Box::new(HintScorer), 0.7).unwrap();
    let acc = evaluator.evaluate(&[record("img.png", &gt, &gen)]);
    let summary = DatasetSummary::from_accumulator(&acc).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("eval_result.txt");
    summary.write_artifact(&path).unwrap();

    let content = std::fs::read_to_string(&path).unwrap();
    assert_eq!(content, summary.to_string());
    assert!(content.starts_with("avg_accuracy:"));
    assert!(content.contains("avg_hallucination_rate:"));
}

#[test]
fn threshold_is_inclusive() {
    // Score exactly at the threshold counts as adequate.
    let gt = fake_annotation(&["point"]);
    let gen = fake_annotation(&["hint ~0.7"]);
    let evaluator = DatasetEvaluator::new(Box::new(HintScorer), 0.7).unwrap();
    let summary =
        DatasetSummary::from_accumulator(&evaluator.evaluate(&[record("i.png", &gt, &gen)]))
            .unwrap();
    assert_eq!(summary.avg_richness_score, 1.0);
    assert_eq!(summary.avg_hallucination_rate, 0.0);
}
