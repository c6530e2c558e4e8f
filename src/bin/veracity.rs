//! veracity - annotation scoring CLI
//!
//! Evaluates machine-generated image-authenticity annotations against
//! human ground truth.
//!
//! # Usage
//!
//! ```bash
//! # Score a benchmark file with a deterministic lexical metric
//! veracity score -a benchmark.json -m rouge
//!
//! # Score with an external judge model, 8 calls in flight
//! OPENAI_API_KEY=... veracity score -a benchmark.json -m judge --judge-workers 8
//!
//! # Inspect how one annotation parses
//! veracity parse -f annotation.txt
//! ```
//!
//! Diagnostics go through the standard `RUST_LOG` filter.

use std::process::ExitCode;

fn main() -> ExitCode {
    env_logger::init();

    match veracity::cli::run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}
