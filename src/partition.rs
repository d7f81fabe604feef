//! The Phase Partitioner (`spec.md` §4.4): splits the finished,
//! fully-repaired graph into a sequence of `Phase`s, each one fused GLSL
//! shader pass. Grounded on `construct_phase` in the original Movit
//! source, which the spec's §9 "depth-first with explicit work stack,
//! memoized by completed-effects map" phrasing describes exactly.

use fxhash::FxHashMap;

use crate::effect::EffectFlags;
use crate::graph::{Graph, NodeId};

/// One fused shader pass: the effects that make up its single fragment
/// shader, the phases that feed it (already-compiled textures it
/// samples), and the node whose output this phase computes.
pub struct Phase {
    /// Effects in this phase, in the order their functions should be
    /// emitted: topologically sorted so each effect's `FUNCNAME` can
    /// call the ones before it.
    pub effects: Vec<NodeId>,
    /// Phases this phase samples from, in first-encountered order.
    /// Deliberately *not* sorted or deduplicated-by-identity beyond
    /// first-seen: the original keeps insertion order here so the same
    /// graph always produces the same phase, which matters for
    /// compiled-program caching downstream (`spec.md` §9).
    pub inputs: Vec<usize>,
    /// The node whose output this phase's shader computes.
    pub output_node: NodeId,
    pub output_width: u32,
    pub output_height: u32,
    /// A phase may declare a virtual output size distinct from its real
    /// one (`SETS_VIRTUAL_OUTPUT_SIZE`), to piggyback on bilinear
    /// sampling for cheap resizes.
    pub virtual_output_width: u32,
    pub virtual_output_height: u32,
    pub input_needs_mipmaps: bool,
}

/// Recursively builds the phase containing `node`, memoizing completed
/// effects so a node reachable through more than one path is only ever
/// assigned to a single phase. Mirrors `construct_phase`'s cut rules
/// exactly: an input `d` of the node currently being processed starts a
/// *new* phase (rather than being fused into the caller's) when any of:
///
/// - the *current* node declares `NEEDS_TEXTURE_BOUNCE` and `d` isn't a
///   single texture and doesn't override that,
/// - it needs mipmaps but an input phase doesn't produce one,
/// - more than one node downstream samples `d` (fan-out bounce — for a
///   single-texture `d` this only cuts if one of those consumers itself
///   needs a bounce, so a shared source isn't split needlessly),
/// - `d` sets a virtual output size,
/// - `d` changes output size and the current node isn't one-to-one
///   sampling.
pub fn construct_phases(graph: &mut Graph) -> Vec<Phase> {
    let mut phases = Vec::new();
    let mut completed: FxHashMap<NodeId, usize> = FxHashMap::default();
    let terminal = graph.find_terminal_node();
    graph.node_mut(terminal).one_to_one_sampling = graph.node(terminal).effect.flags().contains(EffectFlags::ONE_TO_ONE_SAMPLING);
    construct_phase(graph, terminal, &mut completed, &mut phases);
    phases
}

/// Decides whether to cut the phase at `dep`, an input of `node`. `node`
/// is the consumer currently being folded into the phase; `dep` is the
/// producer being considered for fusion into the same phase.
fn starts_new_phase(graph: &Graph, node: NodeId, dep: NodeId) -> bool {
    let node_flags = graph.node(node).effect.flags();
    let dep_flags = graph.node(dep).effect.flags();

    if node_flags.contains(EffectFlags::NEEDS_TEXTURE_BOUNCE)
        && !dep_flags.contains(EffectFlags::IS_SINGLE_TEXTURE)
        && !dep_flags.contains(EffectFlags::OVERRIDE_DISABLE_BOUNCE)
    {
        return true;
    }

    let consumers = graph.node(dep).outgoing();
    if consumers.len() > 1 {
        if !dep_flags.contains(EffectFlags::IS_SINGLE_TEXTURE) {
            // More than one effect samples this non-texture output: bounce
            // it to a texture once rather than re-running its shader code
            // per consumer.
            return true;
        }
        // A shared texture source: only bounce if the decision is
        // unanimous, so the source is sampled the same way everywhere.
        if consumers.iter().any(|&c| graph.node(c).effect.flags().contains(EffectFlags::NEEDS_TEXTURE_BOUNCE)) {
            return true;
        }
    }

    if dep_flags.contains(EffectFlags::SETS_VIRTUAL_OUTPUT_SIZE) {
        return true;
    }
    if dep_flags.contains(EffectFlags::CHANGES_OUTPUT_SIZE) && !graph.node(node).one_to_one_sampling {
        return true;
    }

    false
}

/// Builds (or reuses) the phase whose output is `output_node`, returning
/// its index in `phases`.
fn construct_phase(
    graph: &mut Graph,
    output_node: NodeId,
    completed: &mut FxHashMap<NodeId, usize>,
    phases: &mut Vec<Phase>,
) -> usize {
    if let Some(&phase_index) = completed.get(&output_node) {
        return phase_index;
    }

    let mut effects = Vec::new();
    let mut inputs = Vec::new();

    // Explicit work stack, depth-first: every node reachable from
    // `output_node` without crossing a phase boundary joins this
    // phase's effect set.
    let mut stack = vec![output_node];
    let mut in_phase = fxhash::FxHashSet::default();
    in_phase.insert(output_node);
    while let Some(id) = stack.pop() {
        if graph.node(id).effect.flags().contains(EffectFlags::NEEDS_MIPMAPS) {
            graph.node_mut(id).needs_mipmaps = true;
        }
        let node_needs_mipmaps = graph.node(id).needs_mipmaps;
        let node_one_to_one = graph.node(id).one_to_one_sampling;

        effects.push(id);
        let incoming: Vec<_> = graph.node(id).incoming().to_vec();
        for input in incoming {
            let mut cut = starts_new_phase(graph, id, input);

            // Mipmap need propagates down the dependency chain independent
            // of the other cut rules, breaking the phase if a zero-input
            // source can't supply mipmaps itself.
            if node_needs_mipmaps {
                if graph.node(input).incoming().is_empty() {
                    if !graph.node(input).effect.can_supply_mipmaps() {
                        cut = true;
                    }
                } else {
                    graph.node_mut(input).needs_mipmaps = true;
                }
            }

            if cut {
                let input_phase = construct_phase(graph, input, completed, phases);
                if !inputs.contains(&input_phase) {
                    inputs.push(input_phase);
                }
            } else if in_phase.insert(input) {
                graph.node_mut(input).one_to_one_sampling =
                    node_one_to_one && graph.node(input).effect.flags().contains(EffectFlags::ONE_TO_ONE_SAMPLING);
                stack.push(input);
            }
        }
    }

    let sorted_effects = graph.topological_sort(&effects);

    // Whether this phase needs mipmaps is just "does any effect in it
    // declare NEEDS_MIPMAPS" -- the per-edge propagation above only
    // decided where the phase *boundaries* fall, not this flag. Tell
    // every zero-input effect in the phase so it can actually generate
    // mipmaps (or refuse, if it's not capable -- a programmer-contract
    // violation the cut rule above should have prevented).
    let input_needs_mipmaps = sorted_effects.iter().any(|&id| graph.node(id).effect.flags().contains(EffectFlags::NEEDS_MIPMAPS));
    for &id in &sorted_effects {
        let node = graph.node(id);
        if node.effect.num_inputs() == 0 {
            assert!(
                !input_needs_mipmaps || node.effect.can_supply_mipmaps(),
                "phase needs mipmaps but one of its sources can't supply them"
            );
            node.effect.set_int("needs_mipmaps", input_needs_mipmaps as i32);
        }
    }

    let output = graph.node(output_node);
    let (virtual_output_width, virtual_output_height) =
        if output.effect.flags().contains(EffectFlags::SETS_VIRTUAL_OUTPUT_SIZE) {
            (output.output_width, output.output_height)
        } else {
            (0, 0)
        };

    let phase = Phase {
        effects: sorted_effects,
        inputs,
        output_node,
        output_width: output.output_width,
        output_height: output.output_height,
        virtual_output_width,
        virtual_output_height,
        input_needs_mipmaps,
    };

    let phase_index = phases.len();
    for &id in &phase.effects {
        graph.node_mut(id).containing_phase = Some(phase_index);
    }
    phases.push(phase);
    completed.insert(output_node, phase_index);
    phase_index
}
