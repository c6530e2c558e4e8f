//! Judged-scalar similarity: one external model call per pair.
//!
//! Each cell of the matrix is produced by asking a reasoning model to rate
//! the semantic similarity of one ground-truth/generated point pair and
//! pulling the scalar out of a `\boxed{...}` marker in its reply. Calls are
//! non-deterministic and slow, so pairs are fanned out over a bounded worker
//! pool; every failure mode at this layer (transport exhaustion, empty reply,
//! unparseable score) degrades to a 0.0 similarity rather than an error.

use std::sync::Arc;

use crossbeam_channel::bounded;

use crate::annotation::first_boxed;
use crate::matrix::SimilarityMatrix;
use crate::scorers::SimilarityScorer;
use crate::Result;

/// Default number of concurrent judge calls.
pub const DEFAULT_JUDGE_WORKERS: usize = 4;

/// External reasoning-model collaborator used by [`JudgeScorer`].
///
/// `complete` performs one blocking call, handling its own retry/backoff
/// policy; it returns `Ok(None)` once the retry budget is exhausted. An `Err`
/// is reserved for failures that cannot degrade (bad credentials, unusable
/// configuration).
pub trait JudgeEndpoint: Send + Sync {
    /// Send one prompt, returning the raw completion text if any.
    fn complete(&self, prompt: &str) -> Result<Option<String>>;
}

/// Render the pairwise similarity prompt for one point pair.
#[must_use]
pub fn pairwise_prompt(reference: &str, hypothesis: &str) -> String {
    format!(
        "Analyze and compare the semantic similarity between the two sentences \
         provided below. Evaluate their meaning, context, and structure to \
         determine how closely they match. Return a similarity score as a value \
         between 0 and 1, where 0 means no similarity and 1 means identical in \
         meaning. Put your similarity score within the `\\boxed{{}}`.\n\n\
         Sentence 1: \"{}\"\n\
         Sentence 2: \"{}\"\n",
        reference, hypothesis
    )
}

/// Parse a judged similarity out of a completion.
///
/// Takes the first boxed value, parses it as a float, and clamps into
/// `[0, 1]`. Anything unparseable scores 0.0.
#[must_use]
pub fn parse_judged_score(completion: &str) -> f64 {
    first_boxed(completion)
        .and_then(|content| content.trim().parse::<f64>().ok())
        .filter(|score| score.is_finite())
        .map_or(0.0, |score| score.clamp(0.0, 1.0))
}

/// Pairwise scorer backed by an external reasoning model.
pub struct JudgeScorer {
    endpoint: Arc<dyn JudgeEndpoint>,
    workers: usize,
}

impl JudgeScorer {
    /// Create a scorer with the default worker count.
    #[must_use]
    pub fn new(endpoint: Arc<dyn JudgeEndpoint>) -> Self {
        Self::with_workers(endpoint, DEFAULT_JUDGE_WORKERS)
    }

    /// Create a scorer with a specific worker-pool size (minimum 1).
    #[must_use]
    pub fn with_workers(endpoint: Arc<dyn JudgeEndpoint>, workers: usize) -> Self {
        Self {
            endpoint,
            workers: workers.max(1),
        }
    }

    fn pair_score(&self, reference: &str, hypothesis: &str) -> f64 {
        let prompt = pairwise_prompt(reference, hypothesis);
        match self.endpoint.complete(&prompt) {
            Ok(Some(completion)) => parse_judged_score(&completion),
            Ok(None) => 0.0,
            Err(e) => {
                log::warn!("judge call failed, scoring pair as 0.0: {}", e);
                0.0
            }
        }
    }
}

impl SimilarityScorer for JudgeScorer {
    fn score_matrix(
        &self,
        reference: &[String],
        hypothesis: &[String],
    ) -> Result<SimilarityMatrix> {
        let m = reference.len();
        let n = hypothesis.len();
        let mut matrix = SimilarityMatrix::zeros(m, n);
        if m == 0 || n == 0 {
            return Ok(matrix);
        }

        let total = m * n;
        let workers = self.workers.min(total);
        if workers <= 1 {
            for i in 0..m {
                for j in 0..n {
                    matrix.set(i, j, self.pair_score(&reference[i], &hypothesis[j]));
                }
            }
            return Ok(matrix);
        }

        let (job_tx, job_rx) = bounded::<(usize, usize)>(total);
        let (result_tx, result_rx) = bounded::<(usize, usize, f64)>(total);
        for i in 0..m {
            for j in 0..n {
                // Channel capacity is `total`, so this never blocks.
                let _ = job_tx.send((i, j));
            }
        }
        drop(job_tx);

        std::thread::scope(|scope| {
            for _ in 0..workers {
                let job_rx = job_rx.clone();
                let result_tx = result_tx.clone();
                scope.spawn(move || {
                    while let Ok((i, j)) = job_rx.recv() {
                        let score = self.pair_score(&reference[i], &hypothesis[j]);
                        if result_tx.send((i, j, score)).is_err() {
                            break;
                        }
                    }
                });
            }
            drop(result_tx);

            for (i, j, score) in result_rx.iter() {
                matrix.set(i, j, score);
            }
        });

        Ok(matrix)
    }

    fn name(&self) -> &'static str {
        "judge"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Scores pairs by the numeric hint embedded in the hypothesis text.
    struct StubJudge;

    impl JudgeEndpoint for StubJudge {
        fn complete(&self, prompt: &str) -> Result<Option<String>> {
            // The hypothesis line carries a fake score like "score=0.8".
            let score = prompt
                .split("score=")
                .nth(1)
                .and_then(|rest| rest.split('"').next())
                .unwrap_or("0");
            Ok(Some(format!("I rate this \\boxed{{{}}}", score)))
        }
    }

    struct FailingJudge;

    impl JudgeEndpoint for FailingJudge {
        fn complete(&self, _prompt: &str) -> Result<Option<String>> {
            Ok(None)
        }
    }

    #[test]
    fn test_parse_judged_score() {
        assert_eq!(parse_judged_score(r"the score is \boxed{0.85}"), 0.85);
        assert_eq!(parse_judged_score(r"\boxed{ 0.3 }"), 0.3);
        // Clamped into [0, 1].
        assert_eq!(parse_judged_score(r"\boxed{1.7}"), 1.0);
        assert_eq!(parse_judged_score(r"\boxed{-0.2}"), 0.0);
        // Unparseable content degrades to 0.0.
        assert_eq!(parse_judged_score(r"\boxed{high}"), 0.0);
        assert_eq!(parse_judged_score(r"\boxed{NaN}"), 0.0);
        assert_eq!(parse_judged_score("no boxed marker"), 0.0);
        assert_eq!(parse_judged_score(""), 0.0);
    }

    #[test]
    fn test_pairwise_prompt_contains_both_sentences() {
        let prompt = pairwise_prompt("extra finger", "warped hand");
        assert!(prompt.contains("Sentence 1: \"extra finger\""));
        assert!(prompt.contains("Sentence 2: \"warped hand\""));
        assert!(prompt.contains("\\boxed{}"));
    }

    #[test]
    fn test_judge_matrix_sequential() {
        let scorer = JudgeScorer::with_workers(Arc::new(StubJudge), 1);
        let gt = vec!["a".to_string()];
        let gen = vec!["score=0.4".to_string(), "score=0.9".to_string()];
        let matrix = scorer.score_matrix(&gt, &gen).unwrap();
        assert_eq!(matrix.get(0, 0), 0.4);
        assert_eq!(matrix.get(0, 1), 0.9);
    }

    #[test]
    fn test_judge_matrix_parallel_matches_sequential() {
        let gt: Vec<String> = (0..3).map(|i| format!("gt{}", i)).collect();
        let gen: Vec<String> = (1..=4).map(|j| format!("score=0.{}", j)).collect();

        let sequential = JudgeScorer::with_workers(Arc::new(StubJudge), 1)
            .score_matrix(&gt, &gen)
            .unwrap();
        let parallel = JudgeScorer::with_workers(Arc::new(StubJudge), 4)
            .score_matrix(&gt, &gen)
            .unwrap();
        assert_eq!(sequential, parallel);
        assert_eq!(parallel.get(2, 3), 0.4);
    }

    #[test]
    fn test_exhausted_endpoint_scores_zero() {
        let scorer = JudgeScorer::new(Arc::new(FailingJudge));
        let gt = vec!["a".to_string(), "b".to_string()];
        let gen = vec!["c".to_string()];
        let matrix = scorer.score_matrix(&gt, &gen).unwrap();
        assert_eq!(matrix.get(0, 0), 0.0);
        assert_eq!(matrix.get(1, 0), 0.0);
    }

    #[test]
    fn test_empty_lists() {
        let scorer = JudgeScorer::new(Arc::new(StubJudge));
        let matrix = scorer.score_matrix(&[], &["x".to_string()]).unwrap();
        assert!(matrix.is_empty());
    }
}
