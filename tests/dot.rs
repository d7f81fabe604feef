mod common;

use std::fs;

use pixelgraph::dot::{render, DebugSink, FileDotSink};
use pixelgraph::graph::Graph;
use pixelgraph::partition::construct_phases;
use common::{Blend, BounceDemand, Identity, TextureSource};

fn scratch_dir(name: &str) -> std::path::PathBuf {
    let dir = std::env::temp_dir().join(format!("pixelgraph-dot-test-{}-{}", name, std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    dir
}

#[test]
fn file_dot_sink_writes_one_file_per_named_step() {
    let dir = scratch_dir("per-step");

    let mut graph = Graph::new();
    let src = graph.add_input(Box::new(TextureSource::srgb_premultiplied()));
    graph.add_effect(Box::new(Identity), &[src]);

    let mut sink = FileDotSink::new(&dir);
    sink.emit("step0", "start", &graph);
    sink.emit("step1", "rewritten", &graph);

    assert!(dir.join("step0-start.dot").is_file());
    assert!(dir.join("step1-rewritten.dot").is_file());

    let contents = fs::read_to_string(dir.join("step0-start.dot")).unwrap();
    assert!(contents.starts_with("digraph {"));
    assert!(contents.contains("label=\"start\";"));
    assert!(contents.contains("test::TextureSource"));
    assert!(contents.contains("test::Identity"));

    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn render_emits_one_node_and_edge_per_connection() {
    let mut graph = Graph::new();
    let src = graph.add_input(Box::new(TextureSource::srgb_premultiplied()));
    let terminal = graph.add_effect(Box::new(Identity), &[src]);

    let dot = render(&graph, "manual");

    // Two node declarations, one edge between them.
    assert_eq!(dot.matches("[label=").count(), 2);
    assert_eq!(dot.matches(" -> ").count(), 1);
    let _ = terminal;
}

#[test]
fn render_color_codes_nodes_by_containing_phase_once_phases_are_assigned() {
    let mut graph = Graph::new();
    let a = graph.add_input(Box::new(TextureSource::srgb_premultiplied()));
    let b = graph.add_effect(Box::new(Identity), &[a]);
    let c = graph.add_effect(Box::new(BounceDemand), &[a]);
    graph.add_effect(Box::new(Blend), &[b, c]);

    // Before partitioning, no node has a containing phase yet, so no node
    // carries a fillcolor attribute.
    let before = render(&graph, "before");
    assert!(!before.contains("fillcolor"));

    construct_phases(&mut graph);

    let after = render(&graph, "after");
    assert!(after.contains("fillcolor"));
    // Two distinct phases were constructed for this graph (see
    // tests/partition.rs), so at least two distinct palette indices show up.
    assert!(after.contains("/set19/1") || after.contains("/set19/2"));
}
