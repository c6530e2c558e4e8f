//! Lexical overlap scorers: BLEU@k, ROUGE-L, METEOR.
//!
//! Each pair is scored independently with the ground-truth point as the
//! reference and the generated point as the hypothesis. Tokenization is
//! lowercased whitespace splitting; scores are deterministic.
//!
//! These are sentence-level formulations: BLEU uses modified n-gram precision
//! with a brevity penalty and no smoothing, ROUGE-L is the LCS F-measure, and
//! METEOR is exact-unigram matching with the standard fragmentation penalty.

use std::collections::HashMap;

use crate::matrix::SimilarityMatrix;
use crate::scorers::SimilarityScorer;
use crate::Result;

/// Which lexical metric a [`LexicalScorer`] computes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LexicalMetric {
    /// BLEU with maximum n-gram order `k` (1–4).
    Bleu(u8),
    /// ROUGE-L F-measure.
    RougeL,
    /// METEOR with exact unigram matching.
    Meteor,
}

/// Deterministic n-gram overlap scorer.
#[derive(Debug, Clone, Copy)]
pub struct LexicalScorer {
    metric: LexicalMetric,
}

impl LexicalScorer {
    /// Create a scorer for the given metric.
    #[must_use]
    pub fn new(metric: LexicalMetric) -> Self {
        Self { metric }
    }

    /// BLEU scorer with maximum n-gram order `order` (clamped to 1–4).
    #[must_use]
    pub fn bleu(order: u8) -> Self {
        Self::new(LexicalMetric::Bleu(order.clamp(1, 4)))
    }

    /// ROUGE-L scorer.
    #[must_use]
    pub fn rouge_l() -> Self {
        Self::new(LexicalMetric::RougeL)
    }

    /// METEOR scorer.
    #[must_use]
    pub fn meteor() -> Self {
        Self::new(LexicalMetric::Meteor)
    }

    fn pair_score(&self, reference: &str, hypothesis: &str) -> f64 {
        match self.metric {
            LexicalMetric::Bleu(order) => bleu_score(reference, hypothesis, order),
            LexicalMetric::RougeL => rouge_l_score(reference, hypothesis),
            LexicalMetric::Meteor => meteor_score(reference, hypothesis),
        }
    }
}

impl SimilarityScorer for LexicalScorer {
    fn score_matrix(
        &self,
        reference: &[String],
        hypothesis: &[String],
    ) -> Result<SimilarityMatrix> {
        Ok(SimilarityMatrix::from_fn(
            reference.len(),
            hypothesis.len(),
            |i, j| self.pair_score(&reference[i], &hypothesis[j]),
        ))
    }

    fn name(&self) -> &'static str {
        match self.metric {
            LexicalMetric::Bleu(1) => "bleu@1",
            LexicalMetric::Bleu(2) => "bleu@2",
            LexicalMetric::Bleu(3) => "bleu@3",
            LexicalMetric::Bleu(_) => "bleu@4",
            LexicalMetric::RougeL => "rouge",
            LexicalMetric::Meteor => "meteor",
        }
    }
}

fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

fn ngram_counts(tokens: &[String], n: usize) -> HashMap<&[String], usize> {
    let mut counts = HashMap::new();
    if tokens.len() >= n {
        for window in tokens.windows(n) {
            *counts.entry(window).or_insert(0) += 1;
        }
    }
    counts
}

/// Sentence-level BLEU of `hypothesis` against `reference`, max order `order`.
///
/// Modified n-gram precision (counts clipped by the reference), geometric
/// mean over orders 1..=`order`, brevity penalty `exp(1 - r/h)` when the
/// hypothesis is shorter than the reference. Any zero precision (including a
/// hypothesis shorter than `order` tokens) zeroes the score; no smoothing.
#[must_use]
pub fn bleu_score(reference: &str, hypothesis: &str, order: u8) -> f64 {
    let order = usize::from(order.clamp(1, 4));
    let ref_tokens = tokenize(reference);
    let hyp_tokens = tokenize(hypothesis);
    if hyp_tokens.is_empty() || ref_tokens.is_empty() {
        return 0.0;
    }

    let mut log_precision_sum = 0.0;
    for n in 1..=order {
        let ref_counts = ngram_counts(&ref_tokens, n);
        let hyp_counts = ngram_counts(&hyp_tokens, n);
        let total: usize = hyp_counts.values().sum();
        let clipped: usize = hyp_counts
            .iter()
            .map(|(gram, &count)| count.min(ref_counts.get(gram).copied().unwrap_or(0)))
            .sum();
        if total == 0 || clipped == 0 {
            return 0.0;
        }
        log_precision_sum += (clipped as f64 / total as f64).ln();
    }
    let geo_mean = (log_precision_sum / order as f64).exp();

    let brevity = if hyp_tokens.len() < ref_tokens.len() {
        (1.0 - ref_tokens.len() as f64 / hyp_tokens.len() as f64).exp()
    } else {
        1.0
    };

    geo_mean * brevity
}

fn lcs_len(a: &[String], b: &[String]) -> usize {
    // Rolling single-row DP.
    let mut prev = vec![0usize; b.len() + 1];
    let mut current = vec![0usize; b.len() + 1];
    for token_a in a {
        for (j, token_b) in b.iter().enumerate() {
            current[j + 1] = if token_a == token_b {
                prev[j] + 1
            } else {
                current[j].max(prev[j + 1])
            };
        }
        std::mem::swap(&mut prev, &mut current);
    }
    prev[b.len()]
}

/// ROUGE-L F-measure of `hypothesis` against `reference`.
#[must_use]
pub fn rouge_l_score(reference: &str, hypothesis: &str) -> f64 {
    let ref_tokens = tokenize(reference);
    let hyp_tokens = tokenize(hypothesis);
    if ref_tokens.is_empty() || hyp_tokens.is_empty() {
        return 0.0;
    }
    let lcs = lcs_len(&ref_tokens, &hyp_tokens) as f64;
    if lcs == 0.0 {
        return 0.0;
    }
    let precision = lcs / hyp_tokens.len() as f64;
    let recall = lcs / ref_tokens.len() as f64;
    2.0 * precision * recall / (precision + recall)
}

/// METEOR score of `hypothesis` against `reference` (exact unigram matching).
///
/// Harmonic mean weighted 9:1 toward recall, times the fragmentation penalty
/// `1 - 0.5 · (chunks / matches)³`.
#[must_use]
pub fn meteor_score(reference: &str, hypothesis: &str) -> f64 {
    let ref_tokens = tokenize(reference);
    let hyp_tokens = tokenize(hypothesis);
    if ref_tokens.is_empty() || hyp_tokens.is_empty() {
        return 0.0;
    }

    // One-to-one alignment: each hypothesis token takes the leftmost unused
    // reference occurrence of the same word.
    let mut ref_used = vec![false; ref_tokens.len()];
    let mut pairs: Vec<(usize, usize)> = Vec::new();
    for (h, token) in hyp_tokens.iter().enumerate() {
        let free = (0..ref_tokens.len()).find(|&r| !ref_used[r] && ref_tokens[r] == *token);
        if let Some(r) = free {
            ref_used[r] = true;
            pairs.push((h, r));
        }
    }

    let matches = pairs.len();
    if matches == 0 {
        return 0.0;
    }

    let precision = matches as f64 / hyp_tokens.len() as f64;
    let recall = matches as f64 / ref_tokens.len() as f64;
    let f_mean = 10.0 * precision * recall / (recall + 9.0 * precision);

    // A chunk is a run of matches contiguous in both sentences.
    let mut chunks = 1;
    for window in pairs.windows(2) {
        let (h0, r0) = window[0];
        let (h1, r1) = window[1];
        if h1 != h0 + 1 || r1 != r0 + 1 {
            chunks += 1;
        }
    }
    let penalty = 0.5 * (chunks as f64 / matches as f64).powi(3);

    f_mean * (1.0 - penalty)
}
