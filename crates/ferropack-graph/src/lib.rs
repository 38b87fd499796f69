//! # ferropack-graph
//!
//! Chunk graph model and local/remote partitioning.
//!
//! The upstream compiler hands this crate a finalized chunk collection: one
//! record per chunk with its output files, auxiliary files, and the set of
//! "initial" chunks that must load before it. Partitioning walks that
//! collection once and classifies every chunk as *local* (shipped inside the
//! native application binary) or *remote* (fetched at runtime), then rewrites
//! the entry chunk's source so the running application knows which is which.
//!
//! ```
//! use ferropack_graph::{Chunk, ChunkGraph, ChunkMatcher, partition};
//!
//! # fn main() -> ferropack_graph::Result<()> {
//! let mut graph = ChunkGraph::new();
//! let main = graph.add_chunk(Chunk::new("main", ["main.bundle"]));
//! let feed = graph.add_chunk(Chunk::new("feed", ["feed.bundle"]));
//! graph.set_entry_group([main]);
//!
//! let partition = partition(&graph, &ChunkMatcher::none())?;
//! assert_eq!(partition.entry, main);
//! assert!(partition.remote.contains(&feed));
//! # Ok(()) }
//! ```

pub mod chunk;
pub mod partition;

pub use chunk::{Chunk, ChunkGraph, ChunkId};
pub use partition::{ChunkMatcher, Classification, Partition, partition, prepend_manifest};

/// Error types for chunk graph operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The build graph has no initial chunk group, so no entry chunk can be
    /// identified and partitioning cannot proceed.
    #[error("No entry chunk: the build graph has no initial chunk group")]
    NoEntryChunk,

    /// A chunk id does not exist in the graph.
    #[error("Unknown chunk id {0:?} in graph of {1} chunks")]
    UnknownChunk(ChunkId, usize),

    /// A local-chunk rule pattern failed to compile.
    #[error("Invalid local-chunk rule pattern '{pattern}': {message}")]
    InvalidRule { pattern: String, message: String },
}

/// Result type alias for chunk graph operations.
pub type Result<T> = std::result::Result<T, Error>;
