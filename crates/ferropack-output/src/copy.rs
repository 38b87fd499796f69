//! Copy job queues and their parallel execution.
//!
//! Every chunk contributes a handful of `(source, destination)` pairs
//! according to the per-chunk enqueue rules; local and remote profiles fill
//! independent queues. Jobs have no data dependency on each other, so the
//! drain is a flat fan-out: each job creates its missing parent directories
//! (racing creations are fine) and performs a full-file overwrite copy.
//! A failed job surfaces its error without rolling back sibling jobs; all
//! failures are collected and reported together.

use crate::dest::{OutputOptions, OutputTargets, Platform};
use crate::{Error, Result};
use ferropack_graph::{Chunk, ChunkGraph, Partition};
use path_clean::PathClean;
use std::path::{Path, PathBuf};
use tokio::task::JoinSet;

/// One pending source -> destination file copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyJob {
    pub source: PathBuf,
    pub destination: PathBuf,
}

/// One failed copy job, with the failing paths attached.
#[derive(Debug, Clone)]
pub struct CopyFailure {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub message: String,
}

/// Outcome of draining the copy queues.
#[derive(Debug, Clone, Default)]
pub struct CopyReport {
    /// Number of files copied successfully.
    pub copied: usize,
}

/// The entry bundle is not copied: its content (manifest snippet plus the
/// original compiled code) is produced in memory and written to
/// `bundleOutputFile` directly, leaving the compiler's dist directory
/// untouched.
#[derive(Debug)]
struct EntryWrite {
    source: PathBuf,
    destination: PathBuf,
    content: String,
}

/// Builds and drains the copy queues for one build invocation.
///
/// Queues are owned exclusively by the invocation; they are filled after
/// partitioning (destinations depend on the final classification) and
/// drained exactly once.
#[derive(Debug)]
pub struct OutputCopyProcessor {
    options: OutputOptions,
    entry_write: Option<EntryWrite>,
    local_jobs: Vec<CopyJob>,
    remote_jobs: Vec<CopyJob>,
}

impl OutputCopyProcessor {
    /// Create a processor. Configuration errors surface here, before any
    /// graph or filesystem work.
    pub fn new(options: OutputOptions) -> Result<Self> {
        options.validate()?;
        Ok(Self {
            options,
            entry_write: None,
            local_jobs: Vec::new(),
            remote_jobs: Vec::new(),
        })
    }

    /// Enqueue every chunk of the partition. Local chunks fill the local
    /// queue; remote chunks fill the remote queue when a remote profile is
    /// configured, and are skipped otherwise.
    ///
    /// `dist_dir` is the directory the compiler emitted chunk files into;
    /// it is only ever read. `entry_code` is the final entry bundle content
    /// (manifest plus compiled code) and is written to `bundleOutputFile`
    /// in place of a copy of the entry chunk's code file.
    pub fn enqueue_partition(
        &mut self,
        graph: &ChunkGraph,
        partition: &Partition,
        dist_dir: &Path,
        entry_code: String,
    ) -> Result<()> {
        let entry = graph.chunk(partition.entry)?;
        let entry_file = entry.files.first().ok_or_else(|| Error::EntryFileMissing {
            chunk: entry.name.clone(),
        })?;
        self.entry_write = Some(EntryWrite {
            source: dist_dir.join(entry_file),
            destination: self.options.local.bundle_output_file.clone(),
            content: entry_code,
        });

        for &id in &partition.local {
            let chunk = graph.chunk(id)?;
            let is_entry = id == partition.entry;
            enqueue_chunk(
                &mut self.local_jobs,
                chunk,
                dist_dir,
                self.options.platform,
                &self.options.local,
                is_entry,
            )?;
        }

        if let Some(remote) = &self.options.remote {
            for &id in &partition.remote {
                let chunk = graph.chunk(id)?;
                enqueue_chunk(
                    &mut self.remote_jobs,
                    chunk,
                    dist_dir,
                    self.options.platform,
                    remote,
                    false,
                )?;
            }
        } else if !partition.remote.is_empty() {
            tracing::debug!(
                skipped = partition.remote.len(),
                "no remote output profile configured; remote chunks not copied"
            );
        }

        Ok(())
    }

    /// Destination of the pending entry bundle write, once enqueued.
    pub fn entry_destination(&self) -> Option<&Path> {
        self.entry_write.as_ref().map(|w| w.destination.as_path())
    }

    /// The pending local-profile jobs.
    pub fn local_jobs(&self) -> &[CopyJob] {
        &self.local_jobs
    }

    /// The pending remote-profile jobs.
    pub fn remote_jobs(&self) -> &[CopyJob] {
        &self.remote_jobs
    }

    /// Drain both queues as one unordered fan-out and await the join.
    ///
    /// Returns the report when every job succeeded; otherwise
    /// [`Error::CopyPhase`] listing every failure encountered.
    pub async fn run(self) -> Result<CopyReport> {
        let total = self.local_jobs.len()
            + self.remote_jobs.len()
            + usize::from(self.entry_write.is_some());
        let mut set: JoinSet<std::result::Result<(), CopyFailure>> = JoinSet::new();

        if let Some(write) = self.entry_write {
            set.spawn(execute_write(write));
        }
        for job in self.local_jobs.into_iter().chain(self.remote_jobs) {
            set.spawn(execute_job(job));
        }

        let mut copied = 0;
        let mut failures = Vec::new();
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok(Ok(())) => copied += 1,
                Ok(Err(failure)) => failures.push(failure),
                Err(join_err) => failures.push(CopyFailure {
                    source: PathBuf::new(),
                    destination: PathBuf::new(),
                    message: format!("copy task aborted: {}", join_err),
                }),
            }
        }

        tracing::info!(copied, failed = failures.len(), total, "copy phase finished");

        if failures.is_empty() {
            Ok(CopyReport { copied })
        } else {
            Err(Error::CopyPhase { copied, failures })
        }
    }
}

/// Per-chunk enqueue rules.
///
/// - Chunk code: the platform's non-entry code directory. The entry chunk's
///   code file is excluded here - it is written to `bundleOutputFile` with
///   the manifest prepended, never copied.
/// - Source maps (`*.map`): `sourcemapOutputFile` for the entry chunk, the
///   platform's non-entry sourcemap directory otherwise.
/// - Chunk manifests (`*.bundle.json`): the non-entry code directory -
///   manifests accompany code, not media.
/// - Any other auxiliary file: `assetsDestDir` unconditionally - media
///   travels with resources on both platforms.
///
/// Every destination built by joining a chunk file name onto a directory is
/// containment-checked against that directory.
fn enqueue_chunk(
    jobs: &mut Vec<CopyJob>,
    chunk: &Chunk,
    dist_dir: &Path,
    platform: Platform,
    targets: &OutputTargets,
    is_entry: bool,
) -> Result<()> {
    let layout = targets.layout(platform);

    let code_files: &[String] = if is_entry {
        chunk.files.get(1..).unwrap_or_default()
    } else {
        &chunk.files
    };
    for file in code_files {
        let destination = contained_join(layout.non_entry_code_dir, file)?;
        push_job(jobs, dist_dir.join(file), destination, &chunk.name);
    }

    for file in &chunk.auxiliary_files {
        let destination = if file.ends_with(".map") {
            if is_entry {
                targets.sourcemap_output_file.clone()
            } else {
                contained_join(layout.non_entry_sourcemap_dir, file)?
            }
        } else if file.ends_with(".bundle.json") {
            contained_join(layout.non_entry_code_dir, file)?
        } else {
            contained_join(&targets.assets_dest_dir, file)?
        };
        push_job(jobs, dist_dir.join(file), destination, &chunk.name);
    }

    Ok(())
}

/// Join `file` onto `dir` and reject the result if the cleaned path climbs
/// out of `dir`.
fn contained_join(dir: &Path, file: &str) -> Result<PathBuf> {
    let root = dir.clean();
    let destination = root.join(file).clean();
    if destination.starts_with(&root) {
        Ok(destination)
    } else {
        Err(Error::PathEscape {
            file: file.to_string(),
            destination: destination.display().to_string(),
        })
    }
}

fn push_job(jobs: &mut Vec<CopyJob>, source: PathBuf, destination: PathBuf, chunk: &str) {
    tracing::debug!(
        chunk,
        source = %source.display(),
        destination = %destination.display(),
        "enqueued copy job"
    );
    jobs.push(CopyJob { source, destination });
}

/// Execute one copy: create missing parent directories, then a full-file
/// overwrite copy.
async fn execute_job(job: CopyJob) -> std::result::Result<(), CopyFailure> {
    if let Some(parent) = job.destination.parent() {
        // Jobs sharing a destination folder race on creation; an existing
        // directory is not an error.
        tokio::fs::create_dir_all(parent).await.map_err(|e| CopyFailure {
            source: job.source.clone(),
            destination: job.destination.clone(),
            message: format!("failed to create directory '{}': {}", parent.display(), e),
        })?;
    }

    tokio::fs::copy(&job.source, &job.destination)
        .await
        .map(|_| ())
        .map_err(|e| CopyFailure {
            source: job.source.clone(),
            destination: job.destination.clone(),
            message: e.to_string(),
        })
}

/// Write the prepared entry bundle content to its destination.
async fn execute_write(write: EntryWrite) -> std::result::Result<(), CopyFailure> {
    if let Some(parent) = write.destination.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(|e| CopyFailure {
            source: write.source.clone(),
            destination: write.destination.clone(),
            message: format!("failed to create directory '{}': {}", parent.display(), e),
        })?;
    }

    tokio::fs::write(&write.destination, write.content.as_bytes())
        .await
        .map_err(|e| CopyFailure {
            source: write.source.clone(),
            destination: write.destination.clone(),
            message: e.to_string(),
        })
}
