//! Per-phase size inference (`spec.md` §4.4, "Size inference per
//! phase"). Unlike the rest of the compile pipeline this runs at
//! execute-time preparation, once concrete texture sizes are known:
//! `finalize` only needs each phase's *shape*, not its pixel
//! dimensions. Grounded on `EffectChain::inform_input_sizes` /
//! `find_output_size` / `size_rectangle_to_fit` in
//! `examples/original_source/effect_chain.cpp`.

use crate::effect::EffectFlags;
use crate::graph::Graph;
use crate::partition::Phase;

/// Propagates concrete sizes through a single phase's effects, in their
/// already-topologically-sorted order. Zero-input effects get their
/// intrinsic size; nodes that are themselves another phase's output get
/// that phase's virtual output size. Everything else inherits its
/// inputs' size if they agree, or 0x0 if they don't — except an effect
/// that `changes_output_size`, which is asked directly.
pub fn inform_input_sizes(graph: &mut Graph, phases: &[Phase], phase: &Phase) {
    for &id in &phase.effects {
        if graph.node(id).effect.num_inputs() == 0 {
            let size = graph.node(id).effect.input_size().expect("zero-input effect must report input_size");
            assert!(size.width != 0 && size.height != 0, "input reports a zero-sized texture");
            graph.node_mut(id).output_width = size.width;
            graph.node_mut(id).output_height = size.height;
        } else {
            graph.node_mut(id).output_width = 0;
            graph.node_mut(id).output_height = 0;
        }
    }

    for &input_phase_index in &phase.inputs {
        let input_phase = &phases[input_phase_index];
        let output_node = input_phase.output_node;
        let node = graph.node_mut(output_node);
        node.output_width = input_phase.virtual_output_width;
        node.output_height = input_phase.virtual_output_height;
        assert!(node.output_width != 0 && node.output_height != 0, "input phase has no output size yet");
    }

    for &id in &phase.effects {
        if graph.node(id).effect.num_inputs() == 0 {
            continue;
        }

        let incoming = graph.node(id).incoming().to_vec();
        let mut this_width = 0;
        let mut this_height = 0;
        let input_sizes: Vec<crate::effect::EffectSize> = incoming
            .iter()
            .enumerate()
            .map(|(j, &input)| {
                let input_node = graph.node(input);
                let size = crate::effect::EffectSize { width: input_node.output_width, height: input_node.output_height };
                graph.node(id).effect.inform_input_size(j, size);
                if j == 0 {
                    this_width = size.width;
                    this_height = size.height;
                } else if size.width != this_width || size.height != this_height {
                    this_width = 0;
                    this_height = 0;
                }
                size
            })
            .collect();

        if graph.node(id).effect.flags().contains(EffectFlags::CHANGES_OUTPUT_SIZE) {
            let size = graph.node(id).effect.output_size(&input_sizes).expect("CHANGES_OUTPUT_SIZE effect must answer output_size");
            graph.node_mut(id).output_width = size.width;
            graph.node_mut(id).output_height = size.height;
        } else {
            graph.node_mut(id).output_width = this_width;
            graph.node_mut(id).output_height = this_height;
        }
    }
}

/// Fits `(width, height)` into the running `(output_width, output_height)`
/// accumulator at the chain's configured aspect ratio, keeping whichever
/// of the two is larger (both dimensions grow together since every
/// candidate shares the same aspect).
fn size_rectangle_to_fit(width: u32, height: u32, aspect_nom: u32, aspect_denom: u32, output_width: &mut u32, output_height: &mut u32) {
    let (scaled_width, scaled_height) = if (width as f64) * (aspect_denom as f64) >= (height as f64) * (aspect_nom as f64) {
        (width, (width as f64 * aspect_denom as f64 / aspect_nom as f64).round() as u32)
    } else {
        ((height as f64 * aspect_nom as f64 / aspect_denom as f64).round() as u32, height)
    };

    assert!(!(scaled_width < *output_width && scaled_height > *output_height));
    assert!(!(scaled_height < *output_height && scaled_width > *output_width));

    if scaled_width >= *output_width && scaled_height >= *output_height {
        *output_width = scaled_width;
        *output_height = scaled_height;
    }
}

/// Call only after `inform_input_sizes` has run on `phase`. If the
/// phase's terminal effect changes output size, defer to it; otherwise
/// if every input phase (and zero-input effect) agrees, use that size;
/// otherwise fit each input's rectangle into the chain's aspect ratio
/// and take the largest.
pub fn find_output_size(graph: &Graph, phases: &[Phase], phase: &mut Phase, aspect_nom: u32, aspect_denom: u32) {
    let output_node = *phase.effects.last().expect("a phase always has at least one effect");
    if graph.node(output_node).effect.flags().contains(EffectFlags::CHANGES_OUTPUT_SIZE) {
        let node = graph.node(output_node);
        phase.output_width = node.output_width;
        phase.output_height = node.output_height;
        phase.virtual_output_width = node.output_width;
        phase.virtual_output_height = node.output_height;
        return;
    }

    let mut output_width = 0;
    let mut output_height = 0;
    let mut all_agree = true;

    for &input_phase_index in &phase.inputs {
        let input_phase = &phases[input_phase_index];
        assert!(input_phase.output_width != 0 && input_phase.output_height != 0);
        if output_width == 0 && output_height == 0 {
            output_width = input_phase.virtual_output_width;
            output_height = input_phase.virtual_output_height;
        } else if output_width != input_phase.virtual_output_width || output_height != input_phase.virtual_output_height {
            all_agree = false;
        }
    }
    for &id in &phase.effects {
        if graph.node(id).effect.num_inputs() != 0 {
            continue;
        }
        let node = graph.node(id);
        if output_width == 0 && output_height == 0 {
            output_width = node.output_width;
            output_height = node.output_height;
        } else if output_width != node.output_width || output_height != node.output_height {
            all_agree = false;
        }
    }

    if all_agree {
        assert!(output_width != 0 && output_height != 0);
        phase.output_width = output_width;
        phase.output_height = output_height;
        phase.virtual_output_width = output_width;
        phase.virtual_output_height = output_height;
        return;
    }

    output_width = 0;
    output_height = 0;
    for &input_phase_index in &phase.inputs {
        let input_phase = &phases[input_phase_index];
        size_rectangle_to_fit(input_phase.output_width, input_phase.output_height, aspect_nom, aspect_denom, &mut output_width, &mut output_height);
    }
    for &id in &phase.effects {
        if graph.node(id).effect.num_inputs() != 0 {
            continue;
        }
        let node = graph.node(id);
        size_rectangle_to_fit(node.output_width, node.output_height, aspect_nom, aspect_denom, &mut output_width, &mut output_height);
    }

    assert!(output_width != 0 && output_height != 0);
    phase.output_width = output_width;
    phase.output_height = output_height;
    phase.virtual_output_width = output_width;
    phase.virtual_output_height = output_height;
}

/// Runs size inference for every phase, in construction order (which is
/// already a valid topological order over the phase-dependency DAG: a
/// phase is only ever pushed after all the phases it depends on).
pub fn infer_phase_sizes(graph: &mut Graph, phases: &mut Vec<Phase>, aspect_nom: u32, aspect_denom: u32) {
    for i in 0..phases.len() {
        inform_input_sizes(graph, phases.as_slice(), &phases[i]);

        let placeholder = Phase {
            effects: Vec::new(),
            inputs: Vec::new(),
            output_node: phases[i].output_node,
            output_width: 0,
            output_height: 0,
            virtual_output_width: 0,
            virtual_output_height: 0,
            input_needs_mipmaps: false,
        };
        let mut phase = std::mem::replace(&mut phases[i], placeholder);
        find_output_size(graph, phases.as_slice(), &mut phase, aspect_nom, aspect_denom);
        phases[i] = phase;
    }
}
