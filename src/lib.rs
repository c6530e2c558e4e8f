//! # veracity
//!
//! Matching and scoring engine for image-authenticity annotations.
//!
//! Given a human-authored ground-truth annotation and a machine-generated one
//! for the same image — each a free-text verdict (`\boxed{real}` /
//! `\boxed{ai-generated}`) plus marked-up "error points" — veracity aligns
//! the two point sets under a pluggable similarity strategy and reports four
//! metrics per item, averaged over a dataset:
//!
//! | Metric | Meaning |
//! |--------|---------|
//! | accuracy | labels agree |
//! | match score | mean alignment quality of ground-truth points |
//! | richness score | fraction of ground-truth points adequately covered |
//! | hallucination rate | fraction of generated points matching nothing |
//!
//! ## Pipeline
//!
//! ```text
//! text ──parse──▶ (label, points) ─┐
//! text ──parse──▶ (label, points) ─┴─▶ similarity matrix ─▶ greedy match ─▶ metrics
//! ```
//!
//! ## Scoring strategies
//!
//! | Strategy | Deterministic | Notes |
//! |----------|---------------|-------|
//! | `embedding` | yes | batch sentence embeddings + cosine (`onnx` feature for the real model) |
//! | `bleu@1..4` | yes | modified n-gram precision, brevity penalty |
//! | `rouge` | yes | ROUGE-L F-measure |
//! | `meteor` | yes | unigram matching + fragmentation penalty |
//! | `judge` | no | one reasoning-model call per pair, bounded worker pool |
//!
//! All strategies sit behind the [`SimilarityScorer`] trait; the matcher and
//! aggregator never know which one produced the matrix. Backend state (an
//! embedding model, a judge endpoint) is injected at construction, so tests
//! swap in stubs.
//!
//! ## Quick start
//!
//! ```rust
//! use veracity::prelude::*;
//!
//! let ground_truth = parse_annotation(
//!     r"\boxed{ai-generated} <begin_of_point>missing finger on left hand<end_of_point>",
//! )?;
//! let generated = parse_annotation(
//!     r"\boxed{ai-generated} <begin_of_point>the hand has a missing finger<end_of_point>",
//! )?;
//!
//! let scorer = LexicalScorer::rouge_l();
//! let metrics = evaluate_item(&ground_truth, &generated, &scorer, 0.7)?
//!     .expect("ground truth has points");
//! assert_eq!(metrics.accuracy, 1.0);
//! # Ok::<(), veracity::Error>(())
//! ```
//!
//! ## Matching semantics
//!
//! The matcher is a greedy iterated-argmax, *not* an optimal assignment; the
//! approximation is part of the metric definition (see [`matcher`]). Its
//! tie-break is pinned to row-major first occurrence so reruns and
//! reimplementations agree bit-for-bit with deterministic scorers.

#![warn(missing_docs)]

pub mod annotation;
pub mod cli;
pub mod dataset;
mod error;
pub mod matcher;
pub mod matrix;
pub mod metrics;
pub mod report;
pub mod runner;
pub mod scorers;

pub use annotation::{parse_annotation, Annotation, Label};
pub use dataset::{load_records, AnnotationRecord};
pub use error::{Error, Result};
pub use matcher::{greedy_match, MatchOutcome};
pub use matrix::SimilarityMatrix;
pub use metrics::{evaluate_item, ItemMetrics, MetricAccumulator};
pub use report::DatasetSummary;
pub use runner::DatasetEvaluator;
pub use scorers::{SimilarityScorer, Strategy};

pub mod prelude {
    //! Commonly used items, re-exported for convenience.
    //!
    //! ```rust
    //! use veracity::prelude::*;
    //!
    //! let annotation = parse_annotation(r"\boxed{real} clean image").unwrap();
    //! assert_eq!(annotation.label, Label::Real);
    //! ```
    pub use crate::annotation::{parse_annotation, Annotation, Label};
    pub use crate::dataset::{load_records, AnnotationRecord};
    pub use crate::error::{Error, Result};
    pub use crate::matcher::{greedy_match, MatchOutcome};
    pub use crate::matrix::SimilarityMatrix;
    pub use crate::metrics::{evaluate_item, ItemMetrics, MetricAccumulator};
    pub use crate::report::DatasetSummary;
    pub use crate::runner::DatasetEvaluator;
    pub use crate::scorers::embedding::{EmbeddingScorer, TextEmbedder};
    pub use crate::scorers::judge::{JudgeEndpoint, JudgeScorer};
    pub use crate::scorers::lexical::LexicalScorer;
    pub use crate::scorers::{SimilarityScorer, Strategy};
}
