mod common;

use pixelgraph::effect::{Effect, EffectSize};
use pixelgraph::graph::Graph;
use pixelgraph::partition::construct_phases;
use pixelgraph::size::infer_phase_sizes;
use common::{Blend, BounceDemand, Identity};

/// A zero-input effect that reports a fixed intrinsic texture size.
struct FixedSizeSource {
    width: u32,
    height: u32,
}

impl Effect for FixedSizeSource {
    fn effect_type_id(&self) -> &'static str {
        "test::FixedSizeSource"
    }
    fn num_inputs(&self) -> usize {
        0
    }
    fn input_size(&self) -> Option<EffectSize> {
        Some(EffectSize { width: self.width, height: self.height })
    }
    fn output_fragment_shader(&self) -> String {
        "vec4 FUNCNAME(vec2 tc) {\n\treturn texture(PREFIX(tex), tc);\n}\n".to_string()
    }
}

#[test]
fn a_single_phase_inherits_its_only_sources_size() {
    let mut graph = Graph::new();
    let src = graph.add_input(Box::new(FixedSizeSource { width: 200, height: 100 }));
    graph.add_effect(Box::new(Identity), &[src]);

    let mut phases = construct_phases(&mut graph);
    assert_eq!(phases.len(), 1);

    infer_phase_sizes(&mut graph, &mut phases, 1, 1);

    assert_eq!(phases[0].output_width, 200);
    assert_eq!(phases[0].output_height, 100);
    assert_eq!(phases[0].virtual_output_width, 200);
    assert_eq!(phases[0].virtual_output_height, 100);
}

#[test]
fn disagreeing_inputs_are_fit_to_the_aspect_ratio_and_the_larger_taken() {
    // Branch 1 (100x50) merges straight into the final phase; branch 2
    // goes through BounceDemand, which forces *its own input* (the
    // 50x100 source) into a separate phase. The final phase's two real
    // inputs -- the 100x50 zero-input source fused in directly, and the
    // bounced 50x100 phase -- disagree, so size inference must fall back
    // to fitting each to a 1:1 aspect ratio and keeping the larger.
    let mut graph = Graph::new();
    let src1 = graph.add_input(Box::new(FixedSizeSource { width: 100, height: 50 }));
    let src2 = graph.add_input(Box::new(FixedSizeSource { width: 50, height: 100 }));
    let b = graph.add_effect(Box::new(Identity), &[src1]);
    let c = graph.add_effect(Box::new(BounceDemand), &[src2]);
    let d = graph.add_effect(Box::new(Blend), &[b, c]);

    let mut phases = construct_phases(&mut graph);
    assert_eq!(phases.len(), 2);

    let src2_phase = graph.node(src2).containing_phase.unwrap();
    let main_phase = graph.node(d).containing_phase.unwrap();
    assert_ne!(src2_phase, main_phase);

    infer_phase_sizes(&mut graph, &mut phases, 1, 1);

    // Both 100x50 and 50x100, fit to a square aspect ratio and taking the
    // larger side, land on exactly 100x100.
    assert_eq!(phases[src2_phase].output_width, 50);
    assert_eq!(phases[src2_phase].output_height, 100);
    assert_eq!(phases[main_phase].output_width, 100);
    assert_eq!(phases[main_phase].output_height, 100);
}

#[test]
fn a_resizing_effect_is_asked_directly_for_its_output_size() {
    let mut graph = Graph::new();
    let src = graph.add_input(Box::new(FixedSizeSource { width: 640, height: 480 }));
    let resize = graph.add_effect(Box::new(common::Resize { width: 320, height: 240 }), &[src]);

    let mut phases = construct_phases(&mut graph);
    assert_eq!(phases.len(), 1);

    infer_phase_sizes(&mut graph, &mut phases, 1, 1);

    assert_eq!(phases[0].output_width, 320);
    assert_eq!(phases[0].output_height, 240);
    let _ = resize;
}
