//! # ferropack-output
//!
//! Native bundle destination layout and parallel copy execution.
//!
//! After the chunk graph has been partitioned into local and remote chunks,
//! this crate materializes the file layout the native packaging step expects:
//! the entry bundle at its configured path with the local-chunk manifest
//! prepended, non-entry chunk code and source maps in their
//! platform-conditional directories, and auxiliary media next to the
//! platform's resources. Copies run as an unordered fan-out of independent
//! jobs; failures are collected per job and reported together.
//!
//! ## Quick Start
//!
//! ```no_run
//! use ferropack_graph::{Chunk, ChunkGraph, ChunkMatcher};
//! use ferropack_output::{OutputOptions, OutputPipeline, OutputTargets, Platform};
//! use std::path::Path;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut graph = ChunkGraph::new();
//! let main = graph.add_chunk(
//!     Chunk::new("main", ["index.bundle"]).with_auxiliary(["index.bundle.map"]),
//! );
//! graph.set_entry_group([main]);
//!
//! let targets = OutputTargets::new("/out/main.jsbundle", "/out/App.app");
//! let options = OutputOptions::new(Platform::Ios, targets);
//! let pipeline = OutputPipeline::new(options, ChunkMatcher::none())?;
//!
//! let result = pipeline.run(&graph, Path::new("/tmp/dist")).await?;
//! println!("copied {} files", result.report.copied);
//! # Ok(()) }
//! ```

pub mod copy;
pub mod dest;
pub mod pipeline;

pub use copy::{CopyFailure, CopyJob, CopyReport, OutputCopyProcessor};
pub use dest::{OutputOptions, OutputTargets, Platform, PlatformLayout};
pub use pipeline::{OutputPipeline, PipelineResult};

// Logging utilities (optional, enabled with "logging" feature)
#[cfg(feature = "logging")]
pub mod logging;

#[cfg(feature = "logging")]
pub use logging::{LogLevel, init_logging, init_logging_from_env};

/// Error types for output pipeline operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Error from the chunk graph.
    #[error("Graph error: {0}")]
    Graph(#[from] ferropack_graph::Error),

    /// The entry chunk has no code output file to rewrite.
    #[error("Entry chunk '{chunk}' has no code output file")]
    EntryFileMissing { chunk: String },

    /// A chunk file name resolves outside its destination directory.
    #[error("Chunk file '{file}' resolves outside its destination directory ({destination})")]
    PathEscape { file: String, destination: String },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// I/O error with context message.
    #[error("{message}")]
    IoError {
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// One or more copy jobs failed. Sibling jobs are not rolled back; every
    /// failure encountered is listed.
    #[error("Copy phase failed: {}", format_copy_failures(.failures))]
    CopyPhase {
        copied: usize,
        failures: Vec<copy::CopyFailure>,
    },
}

/// Result type alias for output pipeline operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Format collected copy failures for display.
fn format_copy_failures(failures: &[copy::CopyFailure]) -> String {
    if failures.len() == 1 {
        let f = &failures[0];
        format!("{} -> {}: {}", f.source.display(), f.destination.display(), f.message)
    } else {
        format!(
            "{} jobs failed: {}",
            failures.len(),
            failures
                .iter()
                .map(|f| format!("{} -> {}: {}", f.source.display(), f.destination.display(), f.message))
                .collect::<Vec<_>>()
                .join("; ")
        )
    }
}

impl miette::Diagnostic for Error {
    fn code(&self) -> Option<Box<dyn std::fmt::Display + '_>> {
        Some(Box::new(match self {
            Error::InvalidConfig(_) => "INVALID_CONFIG",
            Error::Graph(_) => "GRAPH_ERROR",
            Error::EntryFileMissing { .. } => "ENTRY_FILE_MISSING",
            Error::PathEscape { .. } => "PATH_ESCAPE",
            Error::Io(_) => "IO_ERROR",
            Error::IoError { .. } => "IO_ERROR",
            Error::CopyPhase { .. } => "COPY_PHASE_FAILED",
        }))
    }

    fn severity(&self) -> Option<miette::Severity> {
        Some(miette::Severity::Error)
    }

    fn help(&self) -> Option<Box<dyn std::fmt::Display + '_>> {
        match self {
            Error::InvalidConfig(msg) => Some(Box::new(format!(
                "Check the output options passed to the pipeline.\nError: {}",
                msg
            ))),
            Error::PathEscape { .. } => Some(Box::new(
                "Chunk and auxiliary file names must stay relative to their output directories."
                    .to_string(),
            )),
            Error::Graph(ferropack_graph::Error::NoEntryChunk) => Some(Box::new(
                "The compiler produced no initial chunk group; an entry point is required."
                    .to_string(),
            )),
            Error::CopyPhase { copied, failures } => Some(Box::new(format!(
                "{} files copied before failure; {} jobs failed. Check disk space and permissions on the destination paths.",
                copied,
                failures.len()
            ))),
            _ => None,
        }
    }
}
