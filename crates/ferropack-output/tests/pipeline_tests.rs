use ferropack_graph::{Chunk, ChunkGraph, ChunkMatcher};
use ferropack_output::{Error, OutputOptions, OutputPipeline, OutputTargets, Platform};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Lay out a compiled dist directory for the given chunk files.
fn write_dist(dist: &Path, files: &[(&str, &str)]) {
    for (name, content) in files {
        let path = dist.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create dist subdir");
        }
        fs::write(&path, content).expect("write dist file");
    }
}

#[tokio::test]
async fn ios_entry_chunk_lands_at_configured_paths() {
    let dist = TempDir::new().expect("dist dir");
    let out = TempDir::new().expect("out dir");
    write_dist(
        dist.path(),
        &[
            ("index.bundle", "console.log('boot');"),
            ("index.bundle.map", "{\"version\":3}"),
            ("assets/logo.png", "pngdata"),
        ],
    );

    let mut graph = ChunkGraph::new();
    let main = graph.add_chunk(
        Chunk::new("index.bundle", ["index.bundle"])
            .with_auxiliary(["index.bundle.map", "assets/logo.png"]),
    );
    graph.set_entry_group([main]);

    let bundle_output = out.path().join("main.jsbundle");
    let assets_dest = out.path().join("App.app");
    let options = OutputOptions::new(
        Platform::Ios,
        OutputTargets::new(&bundle_output, &assets_dest),
    );
    let pipeline = OutputPipeline::new(options, ChunkMatcher::none()).expect("pipeline");

    let result = pipeline.run(&graph, dist.path()).await.expect("run");

    assert_eq!(result.report.copied, 3);
    // Entry bundle carries the manifest first, original code after.
    let bundle = fs::read_to_string(&bundle_output).expect("read bundle");
    assert!(bundle.starts_with("var __LOCAL_CHUNKS__=[\"index.bundle\"];\n"));
    assert!(bundle.ends_with("console.log('boot');"));
    // Sourcemap path inferred from the bundle path.
    assert_eq!(
        fs::read_to_string(out.path().join("main.jsbundle.map")).expect("read map"),
        "{\"version\":3}"
    );
    assert_eq!(
        fs::read_to_string(assets_dest.join("assets/logo.png")).expect("read asset"),
        "pngdata"
    );
}

#[tokio::test]
async fn android_non_entry_chunk_keeps_manifest_with_code() {
    let dist = TempDir::new().expect("dist dir");
    let out = TempDir::new().expect("out dir");
    write_dist(
        dist.path(),
        &[
            ("index.bundle", "entry();"),
            ("chunk_a.bundle", "chunkA();"),
            ("chunk_a.bundle.map", "{\"version\":3}"),
            ("chunk_a.bundle.json", "{\"name\":\"chunk_a\"}"),
        ],
    );

    let mut graph = ChunkGraph::new();
    let main = graph.add_chunk(Chunk::new("index.bundle", ["index.bundle"]));
    let chunk_a = graph.add_chunk(
        Chunk::new("chunk_a", ["chunk_a.bundle"])
            .with_auxiliary(["chunk_a.bundle.map", "chunk_a.bundle.json"]),
    );
    graph.set_entry_group([main]);

    let release = out.path().join("release");
    let maps = out.path().join("maps");
    let assets_dest = out.path().join("res");
    let options = OutputOptions::new(
        Platform::Android,
        OutputTargets::new(release.join("index.bundle"), &assets_dest)
            .sourcemap_output_dir(&maps),
    );
    let pipeline =
        OutputPipeline::new(options, ChunkMatcher::names(["chunk_a"])).expect("pipeline");

    let result = pipeline.run(&graph, dist.path()).await.expect("run");

    assert!(result.partition.is_local(chunk_a));
    assert_eq!(result.report.copied, 4);
    assert!(release.join("chunk_a.bundle").exists());
    assert!(release.join("chunk_a.bundle.json").exists());
    assert!(maps.join("chunk_a.bundle.map").exists());
    // Nothing from this chunk lands in assetsDest.
    assert!(!assets_dest.exists() || fs::read_dir(&assets_dest).unwrap().next().is_none());
}

#[tokio::test]
async fn rerun_leaves_dist_untouched_and_reproduces_output() {
    let dist = TempDir::new().expect("dist dir");
    let out = TempDir::new().expect("out dir");
    write_dist(dist.path(), &[("index.bundle", "console.log('boot');")]);

    let mut graph = ChunkGraph::new();
    let main = graph.add_chunk(Chunk::new("index.bundle", ["index.bundle"]));
    graph.set_entry_group([main]);

    let bundle_output = out.path().join("main.jsbundle");
    let options = OutputOptions::new(
        Platform::Ios,
        OutputTargets::new(&bundle_output, out.path().join("App.app")),
    );
    let pipeline = OutputPipeline::new(options, ChunkMatcher::none()).expect("pipeline");

    pipeline.run(&graph, dist.path()).await.expect("first run");
    let first = fs::read_to_string(&bundle_output).expect("first output");

    pipeline.run(&graph, dist.path()).await.expect("second run");
    let second = fs::read_to_string(&bundle_output).expect("second output");

    // The compiler's output is an input: it never changes.
    assert_eq!(
        fs::read_to_string(dist.path().join("index.bundle")).expect("dist entry"),
        "console.log('boot');"
    );
    // Re-running over the same dist reproduces the same bundle, with
    // exactly one manifest line.
    assert_eq!(first, second);
    assert_eq!(second.matches("__LOCAL_CHUNKS__").count(), 1);
    assert!(second.starts_with("var __LOCAL_CHUNKS__=[\"index.bundle\"];\n"));
    assert!(second.ends_with("console.log('boot');"));
}

#[tokio::test]
async fn remote_chunks_copy_under_remote_profile() {
    let dist = TempDir::new().expect("dist dir");
    let out = TempDir::new().expect("out dir");
    write_dist(
        dist.path(),
        &[
            ("index.bundle", "entry();"),
            ("feed.bundle", "feed();"),
            ("feed.bundle.map", "{}"),
        ],
    );

    let mut graph = ChunkGraph::new();
    let main = graph.add_chunk(Chunk::new("index.bundle", ["index.bundle"]));
    let feed = graph.add_chunk(
        Chunk::new("feed", ["feed.bundle"]).with_auxiliary(["feed.bundle.map"]),
    );
    graph.set_entry_group([main]);

    let remote_dir = out.path().join("remote");
    let options = OutputOptions::new(
        Platform::Ios,
        OutputTargets::new(out.path().join("main.jsbundle"), out.path().join("App.app")),
    )
    .remote(OutputTargets::new(
        remote_dir.join("main.jsbundle"),
        &remote_dir,
    ));
    let pipeline = OutputPipeline::new(options, ChunkMatcher::none()).expect("pipeline");

    let result = pipeline.run(&graph, dist.path()).await.expect("run");

    assert!(!result.partition.is_local(feed));
    assert_eq!(result.report.copied, 3);
    assert!(remote_dir.join("feed.bundle").exists());
    assert!(remote_dir.join("feed.bundle.map").exists());
}

#[tokio::test]
async fn copy_failures_are_collected_not_first_only() {
    let dist = TempDir::new().expect("dist dir");
    let out = TempDir::new().expect("out dir");
    // Entry exists; both auxiliary files are missing from dist, so both
    // copy jobs must fail and both must be reported.
    write_dist(dist.path(), &[("index.bundle", "entry();")]);

    let mut graph = ChunkGraph::new();
    let main = graph.add_chunk(
        Chunk::new("index.bundle", ["index.bundle"])
            .with_auxiliary(["assets/a.png", "assets/b.png"]),
    );
    graph.set_entry_group([main]);

    let options = OutputOptions::new(
        Platform::Ios,
        OutputTargets::new(out.path().join("main.jsbundle"), out.path().join("App.app")),
    );
    let pipeline = OutputPipeline::new(options, ChunkMatcher::none()).expect("pipeline");

    match pipeline.run(&graph, dist.path()).await {
        Err(Error::CopyPhase { copied, failures }) => {
            assert_eq!(copied, 1, "the entry bundle itself is still written");
            assert_eq!(failures.len(), 2, "every failed job is reported");
            // Sibling success is not rolled back.
            assert!(out.path().join("main.jsbundle").exists());
        }
        other => panic!("expected CopyPhase error, got {:?}", other.map(|_| ())),
    }
}

#[tokio::test]
async fn missing_entry_group_aborts_before_any_copy() {
    let dist = TempDir::new().expect("dist dir");
    let out = TempDir::new().expect("out dir");
    write_dist(dist.path(), &[("index.bundle", "entry();")]);

    let mut graph = ChunkGraph::new();
    graph.add_chunk(Chunk::new("index.bundle", ["index.bundle"]));
    // No entry group designated.

    let options = OutputOptions::new(
        Platform::Ios,
        OutputTargets::new(out.path().join("main.jsbundle"), out.path().join("App.app")),
    );
    let pipeline = OutputPipeline::new(options, ChunkMatcher::none()).expect("pipeline");

    let result = pipeline.run(&graph, dist.path()).await;
    assert!(matches!(
        result,
        Err(Error::Graph(ferropack_graph::Error::NoEntryChunk))
    ));
    assert!(!out.path().join("main.jsbundle").exists());
}
