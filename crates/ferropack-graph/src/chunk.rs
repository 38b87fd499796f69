//! Arena-backed chunk records with index-based reachability.
//!
//! Chunks are read-only to this subsystem; the arena owns plain records and
//! every relation is expressed through [`ChunkId`] indices, so reachability
//! is an explicit visited-set walk rather than live membership in multiple
//! graphs at once.

use crate::{Error, Result};
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

/// Index of a chunk in its [`ChunkGraph`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ChunkId(pub u32);

/// One unit of compiled output from the upstream bundler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    /// Chunk name, unique within the build.
    pub name: String,

    /// Code output files emitted for this chunk (usually exactly one).
    pub files: Vec<String>,

    /// Auxiliary files: source maps, manifests, media.
    pub auxiliary_files: Vec<String>,

    /// Chunks that must be loaded before this one can execute.
    pub initial: Vec<ChunkId>,
}

impl Chunk {
    /// Create a chunk with the given name and code output files.
    pub fn new<I, S>(name: impl Into<String>, files: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            files: files.into_iter().map(Into::into).collect(),
            auxiliary_files: Vec::new(),
            initial: Vec::new(),
        }
    }

    /// Attach auxiliary files (source maps, manifests, media).
    pub fn with_auxiliary<I, S>(mut self, files: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.auxiliary_files = files.into_iter().map(Into::into).collect();
        self
    }

    /// Set the initial-chunk prerequisites.
    pub fn with_initial<I>(mut self, initial: I) -> Self
    where
        I: IntoIterator<Item = ChunkId>,
    {
        self.initial = initial.into_iter().collect();
        self
    }
}

/// The finalized chunk collection for one build, plus the designated entry
/// group. Supplied by the external bundler; read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct ChunkGraph {
    chunks: Vec<Chunk>,
    entry_group: Vec<ChunkId>,
}

impl ChunkGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a chunk, returning its id.
    pub fn add_chunk(&mut self, chunk: Chunk) -> ChunkId {
        let id = ChunkId(self.chunks.len() as u32);
        self.chunks.push(chunk);
        id
    }

    /// Designate the entry chunk group. Its first chunk is the entry chunk.
    pub fn set_entry_group<I>(&mut self, group: I)
    where
        I: IntoIterator<Item = ChunkId>,
    {
        self.entry_group = group.into_iter().collect();
    }

    /// The entry chunk: the first chunk of the designated entry group.
    pub fn entry_chunk(&self) -> Result<ChunkId> {
        self.entry_group.first().copied().ok_or(Error::NoEntryChunk)
    }

    /// Number of chunks in the graph.
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Whether the graph holds no chunks.
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Look up a chunk record.
    pub fn chunk(&self, id: ChunkId) -> Result<&Chunk> {
        self.chunks
            .get(id.0 as usize)
            .ok_or(Error::UnknownChunk(id, self.chunks.len()))
    }

    /// Iterate all chunk ids.
    pub fn ids(&self) -> impl Iterator<Item = ChunkId> + '_ {
        (0..self.chunks.len() as u32).map(ChunkId)
    }

    /// The transitive initial-chunk set of `id`, excluding `id` itself.
    ///
    /// Explicit visited-set walk over the arena; cycles terminate because a
    /// visited chunk is never expanded twice.
    pub fn transitive_initial(&self, id: ChunkId) -> Result<FxHashSet<ChunkId>> {
        let mut visited = FxHashSet::default();
        let mut stack: Vec<ChunkId> = self.chunk(id)?.initial.clone();

        while let Some(next) = stack.pop() {
            if !visited.insert(next) {
                continue;
            }
            stack.extend(self.chunk(next)?.initial.iter().copied());
        }

        visited.remove(&id);
        Ok(visited)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transitive_initial_walks_prerequisite_chain() {
        let mut graph = ChunkGraph::new();
        let runtime = graph.add_chunk(Chunk::new("runtime", ["runtime.bundle"]));
        let vendor = graph.add_chunk(Chunk::new("vendor", ["vendor.bundle"]).with_initial([runtime]));
        let main = graph.add_chunk(Chunk::new("main", ["main.bundle"]).with_initial([vendor]));

        let reach = graph.transitive_initial(main).unwrap();
        assert!(reach.contains(&vendor));
        assert!(reach.contains(&runtime));
        assert!(!reach.contains(&main));
    }

    #[test]
    fn transitive_initial_tolerates_cycles() {
        let mut graph = ChunkGraph::new();
        let a = graph.add_chunk(Chunk::new("a", ["a.bundle"]).with_initial([ChunkId(1)]));
        let b = graph.add_chunk(Chunk::new("b", ["b.bundle"]).with_initial([a]));

        let reach = graph.transitive_initial(a).unwrap();
        assert!(reach.contains(&b));
        assert!(!reach.contains(&a));
    }

    #[test]
    fn entry_chunk_requires_entry_group() {
        let mut graph = ChunkGraph::new();
        let main = graph.add_chunk(Chunk::new("main", ["main.bundle"]));

        assert!(matches!(graph.entry_chunk(), Err(Error::NoEntryChunk)));

        graph.set_entry_group([main]);
        assert_eq!(graph.entry_chunk().unwrap(), main);
    }

    #[test]
    fn unknown_chunk_id_is_an_error() {
        let graph = ChunkGraph::new();
        assert!(matches!(
            graph.chunk(ChunkId(7)),
            Err(Error::UnknownChunk(ChunkId(7), 0))
        ));
    }
}
