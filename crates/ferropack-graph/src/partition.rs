//! Two-pass local/remote chunk classification.
//!
//! Pass 1 classifies every chunk that is not a prerequisite of another chunk:
//! the entry chunk is local, chunks matching the caller-supplied rule are
//! local, everything else is remote. Chunks appearing in another chunk's
//! transitive initial set are deferred as *shared* and resolved in pass 2:
//! a shared chunk is local if it is a prerequisite of any local chunk or
//! independently matches the rule, otherwise remote. A shared chunk reachable
//! from both a local and a remote chunk is classified local - locality wins,
//! as an explicit rule.
//!
//! Invariants: every chunk ends in exactly one of {local, remote}; the entry
//! chunk is always local; a remote chunk is never a prerequisite of a local
//! chunk in the final classification.

use crate::chunk::{ChunkGraph, ChunkId};
use crate::{Error, Result};
use regex::Regex;
use rustc_hash::FxHashSet;

/// Per-chunk classification state across the two passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Deferred shared chunk, not yet resolved.
    Unclassified,
    /// Ships inside the native application package.
    Local,
    /// Ships separately, fetched at runtime.
    Remote,
}

/// Caller-supplied rule marking chunks as local by name.
#[derive(Debug, Clone, Default)]
pub struct ChunkMatcher {
    names: FxHashSet<String>,
    pattern: Option<Regex>,
}

impl ChunkMatcher {
    /// A rule matching nothing: only the entry chunk (and its prerequisites)
    /// end up local.
    pub fn none() -> Self {
        Self::default()
    }

    /// Match chunks by exact name.
    pub fn names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
            pattern: None,
        }
    }

    /// Add a name pattern to the rule.
    pub fn with_pattern(mut self, pattern: &str) -> Result<Self> {
        let compiled = Regex::new(pattern).map_err(|e| Error::InvalidRule {
            pattern: pattern.to_string(),
            message: e.to_string(),
        })?;
        self.pattern = Some(compiled);
        Ok(self)
    }

    /// Whether `name` matches the rule.
    pub fn matches(&self, name: &str) -> bool {
        self.names.contains(name)
            || self.pattern.as_ref().is_some_and(|p| p.is_match(name))
    }
}

/// The classification result: every chunk in exactly one of {local, remote},
/// with the entry chunk marked and always local.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    /// The chunk containing program start-up code.
    pub entry: ChunkId,

    /// Chunks embedded in the native package, ascending id order.
    pub local: Vec<ChunkId>,

    /// Chunks fetched at runtime, ascending id order.
    pub remote: Vec<ChunkId>,
}

impl Partition {
    /// Whether `id` is classified local.
    pub fn is_local(&self, id: ChunkId) -> bool {
        self.local.binary_search(&id).is_ok()
    }

    /// Names of the local chunks, sorted, for the start-up manifest.
    pub fn local_names(&self, graph: &ChunkGraph) -> Result<Vec<String>> {
        let mut names = Vec::with_capacity(self.local.len());
        for id in &self.local {
            names.push(graph.chunk(*id)?.name.clone());
        }
        names.sort();
        Ok(names)
    }
}

/// Classify every chunk in `graph` as local or remote.
///
/// Fails with [`Error::NoEntryChunk`] when the graph has no entry group.
pub fn partition(graph: &ChunkGraph, local_rule: &ChunkMatcher) -> Result<Partition> {
    let entry = graph.entry_chunk()?;

    let mut states = vec![Classification::Unclassified; graph.len()];

    // Every chunk appearing in another chunk's transitive initial set is
    // shared; its classification is deferred to pass 2.
    let mut shared: FxHashSet<ChunkId> = FxHashSet::default();
    for id in graph.ids() {
        for dep in graph.transitive_initial(id)? {
            shared.insert(dep);
        }
    }

    // Pass 1: direct classification of non-shared chunks.
    for id in graph.ids() {
        if shared.contains(&id) {
            continue;
        }
        let chunk = graph.chunk(id)?;
        states[id.0 as usize] = if id == entry || local_rule.matches(&chunk.name) {
            Classification::Local
        } else {
            Classification::Remote
        };
    }

    // The entry chunk is local even when deferred as shared.
    states[entry.0 as usize] = Classification::Local;

    // Pass 2: shared-chunk propagation. A shared chunk matching the rule is
    // local in its own right; the union of transitive initial sets of all
    // local chunks (including rule-matched shared ones) pulls in the rest.
    // Transitivity of the initial sets makes a single union pass closed.
    for &id in &shared {
        if states[id.0 as usize] == Classification::Unclassified
            && local_rule.matches(&graph.chunk(id)?.name)
        {
            states[id.0 as usize] = Classification::Local;
        }
    }

    let mut reachable_from_local: FxHashSet<ChunkId> = FxHashSet::default();
    for id in graph.ids() {
        if states[id.0 as usize] == Classification::Local {
            for dep in graph.transitive_initial(id)? {
                reachable_from_local.insert(dep);
            }
        }
    }

    for &id in &shared {
        let state = &mut states[id.0 as usize];
        if *state != Classification::Local && reachable_from_local.contains(&id) {
            // Locality wins even when the chunk is also reachable from a
            // remote chunk's initial set.
            *state = Classification::Local;
        } else if *state == Classification::Unclassified {
            *state = Classification::Remote;
        }
    }

    let mut local = Vec::new();
    let mut remote = Vec::new();
    for id in graph.ids() {
        match states[id.0 as usize] {
            Classification::Local => local.push(id),
            Classification::Remote => remote.push(id),
            Classification::Unclassified => unreachable!("chunk left unclassified"),
        }
    }

    tracing::info!(
        local = local.len(),
        remote = remote.len(),
        "partitioned chunk graph"
    );

    Ok(Partition { entry, local, remote })
}

/// Rewrite the entry chunk's source: prepend the local-chunk manifest so the
/// running application can tell bundled chunks from remote ones at start-up.
///
/// The original compiled source follows unmodified.
pub fn prepend_manifest(
    graph: &ChunkGraph,
    partition: &Partition,
    entry_source: &str,
) -> Result<String> {
    let names = partition.local_names(graph)?;
    // serde_json on a Vec<String> cannot fail.
    let manifest = serde_json::to_string(&names).unwrap_or_default();
    Ok(format!("var __LOCAL_CHUNKS__={};\n{}", manifest, entry_source))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::Chunk;

    fn graph_with_entry() -> (ChunkGraph, ChunkId) {
        let mut graph = ChunkGraph::new();
        let main = graph.add_chunk(Chunk::new("main", ["main.bundle"]));
        graph.set_entry_group([main]);
        (graph, main)
    }

    #[test]
    fn entry_chunk_is_always_local() {
        let (mut graph, main) = graph_with_entry();
        let feed = graph.add_chunk(Chunk::new("feed", ["feed.bundle"]));

        let result = partition(&graph, &ChunkMatcher::none()).unwrap();
        assert_eq!(result.entry, main);
        assert!(result.is_local(main));
        assert_eq!(result.remote, vec![feed]);
    }

    #[test]
    fn no_entry_group_is_fatal() {
        let mut graph = ChunkGraph::new();
        graph.add_chunk(Chunk::new("main", ["main.bundle"]));

        assert!(matches!(
            partition(&graph, &ChunkMatcher::none()),
            Err(Error::NoEntryChunk)
        ));
    }

    #[test]
    fn rule_matched_chunks_are_local() {
        let (mut graph, main) = graph_with_entry();
        let settings = graph.add_chunk(Chunk::new("settings", ["settings.bundle"]));
        let feed = graph.add_chunk(Chunk::new("feed", ["feed.bundle"]));

        let rule = ChunkMatcher::names(["settings"]);
        let result = partition(&graph, &rule).unwrap();

        assert!(result.is_local(main));
        assert!(result.is_local(settings));
        assert_eq!(result.remote, vec![feed]);
    }

    #[test]
    fn pattern_rule_matches_by_regex() {
        let (mut graph, _main) = graph_with_entry();
        let a = graph.add_chunk(Chunk::new("vendor~react", ["a.bundle"]));
        let b = graph.add_chunk(Chunk::new("feed", ["b.bundle"]));

        let rule = ChunkMatcher::none().with_pattern("^vendor~").unwrap();
        let result = partition(&graph, &rule).unwrap();

        assert!(result.is_local(a));
        assert!(!result.is_local(b));
    }

    #[test]
    fn invalid_pattern_is_a_config_error() {
        assert!(matches!(
            ChunkMatcher::none().with_pattern("(unclosed"),
            Err(Error::InvalidRule { .. })
        ));
    }

    #[test]
    fn partition_is_total() {
        let mut graph = ChunkGraph::new();
        let shared = graph.add_chunk(Chunk::new("shared", ["shared.bundle"]));
        let main = graph.add_chunk(Chunk::new("main", ["main.bundle"]).with_initial([shared]));
        let feed = graph.add_chunk(Chunk::new("feed", ["feed.bundle"]).with_initial([shared]));
        let lone = graph.add_chunk(Chunk::new("lone", ["lone.bundle"]));
        graph.set_entry_group([main]);

        let result = partition(&graph, &ChunkMatcher::none()).unwrap();

        let mut all: Vec<ChunkId> = result.local.iter().chain(result.remote.iter()).copied().collect();
        all.sort();
        assert_eq!(all, vec![shared, main, feed, lone]);
        for id in &result.local {
            assert!(!result.remote.contains(id));
        }
    }

    #[test]
    fn shared_prerequisite_of_local_chunk_is_local() {
        let mut graph = ChunkGraph::new();
        let runtime = graph.add_chunk(Chunk::new("runtime", ["runtime.bundle"]));
        let vendor = graph.add_chunk(Chunk::new("vendor", ["vendor.bundle"]).with_initial([runtime]));
        let main = graph.add_chunk(Chunk::new("main", ["main.bundle"]).with_initial([vendor]));
        graph.set_entry_group([main]);

        let result = partition(&graph, &ChunkMatcher::none()).unwrap();

        // Locality propagates along the whole prerequisite chain.
        assert!(result.is_local(main));
        assert!(result.is_local(vendor));
        assert!(result.is_local(runtime));
    }

    #[test]
    fn shared_chunk_of_remote_chunks_stays_remote() {
        let mut graph = ChunkGraph::new();
        let common = graph.add_chunk(Chunk::new("common", ["common.bundle"]));
        let main = graph.add_chunk(Chunk::new("main", ["main.bundle"]));
        let feed = graph.add_chunk(Chunk::new("feed", ["feed.bundle"]).with_initial([common]));
        let shop = graph.add_chunk(Chunk::new("shop", ["shop.bundle"]).with_initial([common]));
        graph.set_entry_group([main]);

        let result = partition(&graph, &ChunkMatcher::none()).unwrap();

        assert!(result.is_local(main));
        assert!(!result.is_local(common));
        assert!(!result.is_local(feed));
        assert!(!result.is_local(shop));
    }

    #[test]
    fn locality_wins_for_shared_chunk_reachable_from_both_sides() {
        let mut graph = ChunkGraph::new();
        let common = graph.add_chunk(Chunk::new("common", ["common.bundle"]));
        let main = graph.add_chunk(Chunk::new("main", ["main.bundle"]).with_initial([common]));
        let feed = graph.add_chunk(Chunk::new("feed", ["feed.bundle"]).with_initial([common]));
        graph.set_entry_group([main]);

        let result = partition(&graph, &ChunkMatcher::none()).unwrap();

        assert!(result.is_local(main));
        assert!(result.is_local(common));
        assert!(!result.is_local(feed));
    }

    #[test]
    fn rule_matched_shared_chunk_pulls_in_its_prerequisites() {
        let mut graph = ChunkGraph::new();
        let base = graph.add_chunk(Chunk::new("base", ["base.bundle"]));
        let widgets = graph.add_chunk(Chunk::new("widgets", ["widgets.bundle"]).with_initial([base]));
        let main = graph.add_chunk(Chunk::new("main", ["main.bundle"]));
        let feed = graph.add_chunk(Chunk::new("feed", ["feed.bundle"]).with_initial([widgets]));
        let shop = graph.add_chunk(Chunk::new("shop", ["shop.bundle"]).with_initial([widgets]));
        graph.set_entry_group([main]);

        let rule = ChunkMatcher::names(["widgets"]);
        let result = partition(&graph, &rule).unwrap();

        assert!(result.is_local(widgets));
        assert!(result.is_local(base));
        assert!(!result.is_local(feed));
        assert!(!result.is_local(shop));
    }

    #[test]
    fn monotonicity_holds_for_every_local_chunk() {
        let mut graph = ChunkGraph::new();
        let a = graph.add_chunk(Chunk::new("a", ["a.bundle"]));
        let b = graph.add_chunk(Chunk::new("b", ["b.bundle"]).with_initial([a]));
        let c = graph.add_chunk(Chunk::new("c", ["c.bundle"]).with_initial([b]));
        let main = graph.add_chunk(Chunk::new("main", ["main.bundle"]).with_initial([c]));
        let d = graph.add_chunk(Chunk::new("d", ["d.bundle"]).with_initial([a]));
        graph.set_entry_group([main]);

        let result = partition(&graph, &ChunkMatcher::none()).unwrap();

        for &local_id in &result.local {
            for dep in graph.transitive_initial(local_id).unwrap() {
                assert!(
                    result.is_local(dep),
                    "prerequisite {:?} of local chunk {:?} must be local",
                    dep,
                    local_id
                );
            }
        }
        assert!(!result.is_local(d));
    }

    #[test]
    fn manifest_is_prepended_with_sorted_names() {
        let mut graph = ChunkGraph::new();
        let vendor = graph.add_chunk(Chunk::new("vendor", ["vendor.bundle"]));
        let main = graph.add_chunk(Chunk::new("main", ["main.bundle"]).with_initial([vendor]));
        graph.set_entry_group([main]);

        let result = partition(&graph, &ChunkMatcher::none()).unwrap();
        let rewritten = prepend_manifest(&graph, &result, "console.log('boot');").unwrap();

        assert_eq!(
            rewritten,
            "var __LOCAL_CHUNKS__=[\"main\",\"vendor\"];\nconsole.log('boot');"
        );
    }
}
