//! Graphviz DOT debug dump (`spec.md` §9 Design Notes / Open Questions).
//! Grounded on `output_dot`/`get_labels_for_edge`/`output_dot_edge` in
//! the original source, and on the teacher's own `src/frame/dump.rs` /
//! `graphviz.rs`, which write the exact same kind of per-pass debug
//! snapshot through an injectable sink rather than hardcoding a file
//! path — that's the resolution of the spec's open question about
//! where these side effects should go.

use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::PathBuf;

use crate::graph::Graph;

/// Where a `Chain`'s step-by-step DOT dumps go, passed to `finalize` as
/// `Option<&mut dyn DebugSink>`. `step` is the step number's name
/// (`"step0"`, `"step1"`, ...) and `label` is what happened at that step
/// (`"start"`, `"rewritten"`, ...), mirroring the original's
/// `step<N>-<label>.dot` file naming.
pub trait DebugSink {
    fn emit(&mut self, step: &str, label: &str, graph: &Graph);
}

pub struct NullSink;

impl DebugSink for NullSink {
    fn emit(&mut self, _step: &str, _label: &str, _graph: &Graph) {}
}

pub struct FileDotSink {
    dir: PathBuf,
}

impl FileDotSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        FileDotSink { dir: dir.into() }
    }

    fn write(&self, step: &str, label: &str, dot: &str) -> io::Result<()> {
        fs::create_dir_all(&self.dir)?;
        fs::write(self.dir.join(format!("{}-{}.dot", step, label)), dot)
    }
}

impl DebugSink for FileDotSink {
    fn emit(&mut self, step: &str, label: &str, graph: &Graph) {
        let dot = render(graph, label);
        if let Err(err) = self.write(step, label, &dot) {
            log::warn!("failed to write debug dot dump {}-{}: {}", step, label, err);
        }
    }
}

fn edge_label(graph: &Graph, from: crate::graph::NodeId) -> String {
    let node = graph.node(from);
    format!(
        "{:?}/{:?}/{:?}",
        node.output_color_space, node.output_gamma_curve, node.output_alpha_type
    )
}

/// Renders the current graph state as a DOT digraph: one node per graph
/// node (labeled with its effect's type id and current attributes), one
/// edge per connection (labeled with the color space / gamma / alpha
/// state flowing across it), colored by containing phase when phases
/// have been assigned.
pub fn render(graph: &Graph, title: &str) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "digraph {{");
    let _ = writeln!(out, "\tlabel=\"{}\";", title);
    for id in graph.node_ids() {
        let node = graph.node(id);
        if node.disabled {
            continue;
        }
        let phase_attr = match node.containing_phase {
            Some(p) => format!(", style=filled, fillcolor=\"/set19/{}\"", (p % 9) + 1),
            None => String::new(),
        };
        let _ = writeln!(
            out,
            "\tn{} [label=\"{}\\n{}\"{}];",
            id.index(),
            node.effect.effect_type_id(),
            edge_label(graph, id),
            phase_attr
        );
    }
    for id in graph.node_ids() {
        let node = graph.node(id);
        if node.disabled {
            continue;
        }
        for &target in node.outgoing() {
            let _ = writeln!(out, "\tn{} -> n{};", id.index(), target.index());
        }
    }
    let _ = writeln!(out, "}}");
    out
}

/// Convenience wrapper combining `emit` with an `Option<&mut dyn
/// DebugSink>`, matching the `output_dot("step0-start.dot")`-style call
/// sites scattered through `finalize()` in the original.
pub fn dump_step(graph: &Graph, sink: Option<&mut dyn DebugSink>, step: &str, label: &str) {
    if let Some(sink) = sink {
        sink.emit(step, label, graph);
    }
}
