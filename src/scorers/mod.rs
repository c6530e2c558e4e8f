//! Pluggable similarity scoring strategies.
//!
//! A scorer turns two ordered point lists into a [`SimilarityMatrix`]. The
//! matching and aggregation layers are strategy-agnostic: anything that can
//! produce a `[0, 1]` float per string pair, batched into a matrix, plugs in
//! behind [`SimilarityScorer`].
//!
//! | Strategy | Module | Deterministic | External calls |
//! |----------|--------|---------------|----------------|
//! | `embedding` | [`embedding`] | yes (fixed model) | none at score time |
//! | `bleu@1..4`, `rouge`, `meteor` | [`lexical`] | yes | none |
//! | `judge` | [`judge`] | no | one per pair |

pub mod embedding;
pub mod judge;
pub mod lexical;
pub mod openai;

use std::str::FromStr;

use crate::matrix::SimilarityMatrix;
use crate::{Error, Result};

/// Strategy for computing pairwise similarity between point lists.
///
/// Implementations must be `Send + Sync`: dataset items are evaluated on
/// worker threads and share one scorer instance. Any backend state (an
/// embedding model, a judge endpoint) is injected at construction time, never
/// held in module-level globals, so tests can substitute stubs.
pub trait SimilarityScorer: Send + Sync {
    /// Compute the `reference.len() × hypothesis.len()` similarity matrix.
    ///
    /// Row `i` scores `reference[i]` against every hypothesis string. All
    /// cells are in `[0, 1]`.
    fn score_matrix(&self, reference: &[String], hypothesis: &[String])
        -> Result<SimilarityMatrix>;

    /// Short identifier for logs and reports.
    fn name(&self) -> &'static str;
}

/// Metric-strategy selector, as it appears in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Embedding cosine similarity (batch-encoded sentence embeddings).
    Embedding,
    /// BLEU with the given maximum n-gram order (1–4).
    Bleu(u8),
    /// ROUGE-L F-measure.
    Rouge,
    /// METEOR (unigram matching with fragmentation penalty).
    Meteor,
    /// Pairwise scalar judgments from an external reasoning model.
    Judge,
}

impl Strategy {
    /// All selectable strategies, for help text and `info` output.
    pub const ALL: &'static [&'static str] = &[
        "embedding", "bleu@1", "bleu@2", "bleu@3", "bleu@4", "rouge", "meteor", "judge",
    ];

    /// Canonical configuration name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Strategy::Embedding => "embedding",
            Strategy::Bleu(1) => "bleu@1",
            Strategy::Bleu(2) => "bleu@2",
            Strategy::Bleu(3) => "bleu@3",
            Strategy::Bleu(_) => "bleu@4",
            Strategy::Rouge => "rouge",
            Strategy::Meteor => "meteor",
            Strategy::Judge => "judge",
        }
    }

    /// Whether two runs over identical inputs produce identical matrices.
    #[must_use]
    pub const fn is_deterministic(&self) -> bool {
        !matches!(self, Strategy::Judge)
    }
}

impl FromStr for Strategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "embedding" | "sentence-transformer" => Ok(Strategy::Embedding),
            "bleu@1" => Ok(Strategy::Bleu(1)),
            "bleu@2" => Ok(Strategy::Bleu(2)),
            "bleu@3" => Ok(Strategy::Bleu(3)),
            "bleu" | "bleu@4" => Ok(Strategy::Bleu(4)),
            "rouge" => Ok(Strategy::Rouge),
            "meteor" => Ok(Strategy::Meteor),
            "judge" => Ok(Strategy::Judge),
            other => Err(Error::invalid_input(format!(
                "unknown metric {:?} (expected one of: {})",
                other,
                Strategy::ALL.join(", ")
            ))),
        }
    }
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
