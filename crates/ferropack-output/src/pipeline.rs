//! Pipeline orchestration: partition, rewrite the entry bundle, copy.
//!
//! Ordering is hard: partitioning must complete before any copy work starts,
//! because copy destinations depend on the final local/remote classification.
//! Everything runs within one build invocation; the first fatal error aborts
//! the pipeline and no partial output is treated as valid.

use crate::copy::{CopyReport, OutputCopyProcessor};
use crate::dest::OutputOptions;
use crate::{Error, Result};
use ferropack_graph::{ChunkGraph, ChunkMatcher, Partition, partition, prepend_manifest};
use std::path::Path;

/// Result of one pipeline run.
#[derive(Debug)]
pub struct PipelineResult {
    /// The local/remote classification this run produced.
    pub partition: Partition,

    /// Outcome of the copy phase.
    pub report: CopyReport,
}

/// One build's output pipeline: owns the options and the local-chunk rule,
/// and runs partition -> entry rewrite -> copy as a single invocation.
#[derive(Debug)]
pub struct OutputPipeline {
    options: OutputOptions,
    local_rule: ChunkMatcher,
}

impl OutputPipeline {
    /// Create a pipeline. Configuration errors are fatal here, before any
    /// graph or filesystem work.
    pub fn new(options: OutputOptions, local_rule: ChunkMatcher) -> Result<Self> {
        options.validate()?;
        Ok(Self { options, local_rule })
    }

    /// Run the pipeline over a finalized chunk graph.
    ///
    /// `dist_dir` is the directory the compiler emitted chunk files into;
    /// the pipeline only reads from it. The local-chunk manifest is
    /// prepended to the entry chunk's source in memory and the result is
    /// written straight to `bundleOutputFile`, so running the pipeline again
    /// over the same dist reproduces the same output.
    pub async fn run(&self, graph: &ChunkGraph, dist_dir: &Path) -> Result<PipelineResult> {
        let parts = partition(graph, &self.local_rule)?;

        let entry_code = self.rewritten_entry(graph, &parts, dist_dir).await?;

        let mut processor = OutputCopyProcessor::new(self.options.clone())?;
        processor.enqueue_partition(graph, &parts, dist_dir, entry_code)?;
        let report = processor.run().await?;

        tracing::info!(
            local = parts.local.len(),
            remote = parts.remote.len(),
            copied = report.copied,
            "output pipeline finished"
        );

        Ok(PipelineResult {
            partition: parts,
            report,
        })
    }

    /// The entry chunk's emitted source with the local-chunk manifest
    /// prepended. The emitted file itself is left as the compiler wrote it.
    async fn rewritten_entry(
        &self,
        graph: &ChunkGraph,
        parts: &Partition,
        dist_dir: &Path,
    ) -> Result<String> {
        let entry = graph.chunk(parts.entry)?;
        let file = entry.files.first().ok_or_else(|| Error::EntryFileMissing {
            chunk: entry.name.clone(),
        })?;

        let path = dist_dir.join(file);
        let source = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| Error::IoError {
                message: format!("Failed to read entry bundle: {}", path.display()),
                source: e,
            })?;

        Ok(prepend_manifest(graph, parts, &source)?)
    }
}
