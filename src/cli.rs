//! Command-line interface for the veracity binary.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};

use crate::dataset::load_records;
use crate::report::DatasetSummary;
use crate::runner::DatasetEvaluator;
use crate::scorers::judge::JudgeScorer;
use crate::scorers::lexical::LexicalScorer;
use crate::scorers::openai::{OpenAiJudge, DEFAULT_JUDGE_MODEL};
use crate::scorers::{SimilarityScorer, Strategy};
use crate::{parse_annotation, Error, Result};

/// Annotation scoring CLI - evaluate generated image-authenticity annotations
#[derive(Parser)]
#[command(name = "veracity")]
#[command(
    author,
    version,
    about = "Evaluate machine-generated image-authenticity annotations against ground truth",
    long_about = r#"
veracity - annotation matching and scoring

Given a JSON array of {image_path, ground_truth, generated} records, veracity
parses each annotation into an authenticity label plus error points, aligns
generated points against ground-truth points under a similarity strategy, and
reports dataset averages of four metrics: accuracy, match score, richness
score, and hallucination rate.

STRATEGIES:
  • embedding   - sentence-embedding cosine (requires the 'onnx' feature)
  • bleu@1..4   - n-gram precision with brevity penalty
  • rouge       - ROUGE-L F-measure
  • meteor      - unigram matching with fragmentation penalty
  • judge       - pairwise scores from an OpenAI-compatible reasoning model

EXAMPLES:
  veracity score -a benchmark.json -m rouge
  veracity score -a benchmark.json -m judge --judge-workers 8
  veracity parse -f annotation.txt
  veracity info
"#
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Score a dataset of annotation pairs
    #[command(visible_alias = "s")]
    Score(ScoreArgs),

    /// Parse one annotation text and dump its label and points
    #[command(visible_alias = "p")]
    Parse(ParseArgs),

    /// Show version, features, and available strategies
    #[command(visible_alias = "i")]
    Info,
}

/// Arguments for `veracity score`.
#[derive(Args)]
pub struct ScoreArgs {
    /// JSON file with the annotation records
    #[arg(short, long)]
    annotations: PathBuf,

    /// Similarity strategy (embedding, bleu@1..4, rouge, meteor, judge)
    #[arg(short, long, default_value = "embedding")]
    metric: String,

    /// Match threshold for an "adequate" pair
    #[arg(short, long, default_value_t = 0.7)]
    threshold: f64,

    /// Results artifact path
    #[arg(short, long, default_value = "eval_result.txt")]
    output: PathBuf,

    /// Chat-completions URL for the judge strategy
    #[arg(long)]
    judge_url: Option<String>,

    /// Model identifier for the judge strategy
    #[arg(long, default_value = DEFAULT_JUDGE_MODEL)]
    judge_model: String,

    /// Concurrent judge calls per item
    #[arg(long, default_value_t = crate::scorers::judge::DEFAULT_JUDGE_WORKERS)]
    judge_workers: usize,

    /// Embedding model for the embedding strategy (requires 'onnx')
    #[arg(long, default_value = crate::scorers::embedding::DEFAULT_EMBEDDING_MODEL)]
    embed_model: String,
}

/// Arguments for `veracity parse`.
#[derive(Args)]
pub struct ParseArgs {
    /// Annotation text to parse
    text: Option<String>,

    /// Read the annotation text from a file instead
    #[arg(short, long, conflicts_with = "text")]
    file: Option<PathBuf>,
}

/// Parse arguments and dispatch.
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Score(args) => cmd_score(&args),
        Commands::Parse(args) => cmd_parse(&args),
        Commands::Info => cmd_info(),
    }
}

fn cmd_score(args: &ScoreArgs) -> Result<()> {
    let strategy: Strategy = args.metric.parse()?;
    let scorer = build_scorer(args, strategy)?;
    let evaluator = DatasetEvaluator::new(scorer, args.threshold)?;

    let records = load_records(&args.annotations)?;
    log::info!(
        "scoring {} records with {} (threshold {})",
        records.len(),
        evaluator.scorer_name(),
        evaluator.threshold()
    );

    let accumulator = evaluator.evaluate(&records);
    let summary = DatasetSummary::from_accumulator(&accumulator).ok_or_else(|| {
        Error::invalid_input(format!(
            "no scorable items among {} records ({} skipped)",
            records.len(),
            accumulator.skipped()
        ))
    })?;

    print!("{}", summary);
    summary.write_artifact(&args.output)?;
    log::info!(
        "{} items scored, {} skipped or excluded",
        summary.scored,
        summary.skipped
    );
    Ok(())
}

fn build_scorer(args: &ScoreArgs, strategy: Strategy) -> Result<Box<dyn SimilarityScorer>> {
    match strategy {
        Strategy::Bleu(order) => Ok(Box::new(LexicalScorer::bleu(order))),
        Strategy::Rouge => Ok(Box::new(LexicalScorer::rouge_l())),
        Strategy::Meteor => Ok(Box::new(LexicalScorer::meteor())),
        Strategy::Judge => {
            let mut endpoint = OpenAiJudge::from_env()?.with_model(args.judge_model.clone());
            if let Some(url) = &args.judge_url {
                endpoint = endpoint.with_url(url.clone());
            }
            Ok(Box::new(JudgeScorer::with_workers(
                Arc::new(endpoint),
                args.judge_workers,
            )))
        }
        Strategy::Embedding => build_embedding_scorer(&args.embed_model),
    }
}

#[cfg(feature = "onnx")]
fn build_embedding_scorer(model: &str) -> Result<Box<dyn SimilarityScorer>> {
    use crate::scorers::embedding::{EmbeddingScorer, MiniLmEmbedder};

    let embedder = MiniLmEmbedder::new(model)?;
    Ok(Box::new(EmbeddingScorer::new(Arc::new(embedder))))
}

#[cfg(not(feature = "onnx"))]
fn build_embedding_scorer(_model: &str) -> Result<Box<dyn SimilarityScorer>> {
    Err(Error::feature_not_available(
        "embedding scoring requires the 'onnx' feature. \
         Build with: cargo build --features onnx",
    ))
}

fn cmd_parse(args: &ParseArgs) -> Result<()> {
    let text = match (&args.text, &args.file) {
        (Some(text), _) => text.clone(),
        (None, Some(path)) => std::fs::read_to_string(path)?,
        (None, None) => {
            return Err(Error::invalid_input(
                "provide annotation text or --file. Run `veracity parse --help` for usage",
            ))
        }
    };

    let annotation = parse_annotation(&text)?;
    println!("label: {}", annotation.label);
    if let Some(preamble) = &annotation.preamble {
        println!("preamble: {}", preamble);
    }
    for (index, point) in annotation.points.iter().enumerate() {
        println!("point {}: {}", index + 1, point);
    }
    if let Some(conclusion) = &annotation.conclusion {
        println!("conclusion: {}", conclusion);
    }
    if annotation.is_empty() {
        println!("(no error points)");
    }
    Ok(())
}

fn cmd_info() -> Result<()> {
    println!("veracity {}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("features:");
    println!("  eval-parallel: {}", cfg!(feature = "eval-parallel"));
    println!("  onnx:          {}", cfg!(feature = "onnx"));
    println!();
    println!("strategies:");
    for name in Strategy::ALL {
        let strategy: Strategy = name.parse().expect("listed strategies parse");
        let deterministic = if strategy.is_deterministic() {
            "deterministic"
        } else {
            "non-deterministic"
        };
        let available = match strategy {
            Strategy::Embedding => cfg!(feature = "onnx"),
            _ => true,
        };
        println!(
            "  {:<10} {} ({})",
            name,
            if available { "✓" } else { "✗" },
            deterministic
        );
    }
    Ok(())
}
