//! Greedy alignment between ground-truth and generated points.
//!
//! The matcher is a greedy approximation of maximum-weight bipartite matching:
//! repeatedly take the largest remaining cell of the similarity matrix and
//! retire its row and column. This is intentionally *not* an optimal
//! assignment (no Hungarian algorithm); the iterated-argmax behavior is part
//! of the metric definition and is preserved exactly so results stay
//! comparable with prior runs.
//!
//! Tie-breaking is pinned: cells are scanned row-major and a later cell must
//! be strictly greater to win, so the first occurrence of the maximum is
//! selected. Consumed rows/columns are tracked with masks; the input matrix
//! is never modified.

use crate::matrix::SimilarityMatrix;

/// Result of aligning the two point sets.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchOutcome {
    /// Per-ground-truth-point alignment score, length M.
    ///
    /// Ground-truth points that never got a partner (when M > N) keep 0.0.
    pub scores: Vec<f64>,
    /// Number of assignments made: always `min(M, N)`.
    pub matched: usize,
}

impl MatchOutcome {
    /// Mean of the score vector; 0.0 for an empty vector.
    #[must_use]
    pub fn mean_score(&self) -> f64 {
        if self.scores.is_empty() {
            0.0
        } else {
            self.scores.iter().sum::<f64>() / self.scores.len() as f64
        }
    }

    /// How many ground-truth points scored at or above `threshold`.
    #[must_use]
    pub fn adequate_count(&self, threshold: f64) -> usize {
        self.scores.iter().filter(|&&s| s >= threshold).count()
    }
}

/// Greedily align ground-truth rows to generated columns.
///
/// Runs exactly `min(M, N)` iterations. Each iteration picks the globally
/// maximum unconsumed cell (row-major first occurrence on ties), records its
/// value at the row index, and retires that row and column.
///
/// Cost is O(min(M,N) · M·N) from rescanning the matrix every iteration,
/// which is irrelevant at the point counts this sees in practice (M, N < 20).
#[must_use]
pub fn greedy_match(matrix: &SimilarityMatrix) -> MatchOutcome {
    let m = matrix.rows();
    let n = matrix.cols();
    let mut scores = vec![0.0; m];
    let matched = m.min(n);

    let mut used_row = vec![false; m];
    let mut used_col = vec![false; n];

    for _ in 0..matched {
        let mut best: Option<(usize, usize, f64)> = None;
        for i in 0..m {
            if used_row[i] {
                continue;
            }
            for j in 0..n {
                if used_col[j] {
                    continue;
                }
                let value = matrix.get(i, j);
                // Strict comparison keeps the row-major first occurrence on ties.
                if best.map_or(true, |(_, _, b)| value > b) {
                    best = Some((i, j, value));
                }
            }
        }
        // matched <= min(m, n) guarantees a free cell exists.
        let (i, j, value) = best.expect("free row/column available");
        scores[i] = value;
        used_row[i] = true;
        used_col[j] = true;
    }

    MatchOutcome { scores, matched }
}
