//! The Repair Planner (`spec.md` §4.3): walks the graph the propagator
//! left with `Invalid` attributes (or attributes that simply don't match
//! what a downstream effect declared it needs) and inserts conversion
//! nodes to fix them, re-propagating after each insertion until the
//! graph reaches a fixed point.
//!
//! Each repair pass is grounded on a distinct function in the original
//! Movit source (`fix_internal_color_spaces`, `fix_internal_alpha`,
//! `fix_internal_gamma_by_asking_inputs`,
//! `fix_internal_gamma_by_inserting_nodes`, `fix_output_color_space`,
//! `fix_output_alpha`, `fix_output_gamma`). Each is capped at 100
//! iterations; a pass that doesn't reach a fixed point within that is a
//! bug in the graph the caller built (a cycle of conflicting demands),
//! reported as `ChainError::Runaway` rather than looping forever.

use crate::builtin_effects::{
    AlphaDivisionEffect, AlphaMultiplicationEffect, ColorspaceConversionEffect, GammaCompressionEffect,
    GammaExpansionEffect,
};
use crate::effect::EffectFlags;
use crate::error::ChainError;
use crate::format::{AlphaType, ColorSpace, GammaCurve, OutputAlphaFormat};
use crate::graph::{Graph, NodeId};
use crate::propagate;

const MAX_ITERATIONS: u32 = 100;

/// True when a node's output color space is unresolved, or when it
/// declares `NEEDS_SRGB_PRIMARIES` but isn't fed sRGB yet. Grounded on
/// `node_needs_colorspace_fix` (`effect_chain.cpp:1268`): invalid output
/// always needs fixing, and an sRGB-primaries requirement trumps
/// whatever the inputs already agree on.
fn node_needs_colorspace_fix(graph: &Graph, id: NodeId) -> bool {
    let node = graph.node(id);
    if node.disabled || node.incoming().is_empty() {
        return false;
    }
    node.output_color_space == ColorSpace::Invalid
        || (node.effect.flags().contains(EffectFlags::NEEDS_SRGB_PRIMARIES)
            && node.output_color_space != ColorSpace::Srgb)
}

/// Inserts `ColorspaceConversionEffect` nodes until every flagged node's
/// inputs are all sRGB. Grounded on `fix_internal_color_spaces`
/// (`effect_chain.cpp:1298`): every non-sRGB input is converted straight
/// to sRGB, not toward whatever the other inputs happen to agree on.
pub fn fix_internal_color_spaces(graph: &mut Graph) -> Result<(), ChainError> {
    for _ in 0..MAX_ITERATIONS {
        let mut changed = false;
        for id in graph.node_ids().collect::<Vec<_>>() {
            if !node_needs_colorspace_fix(graph, id) {
                continue;
            }
            let incoming: Vec<_> = graph.node(id).incoming().to_vec();
            for input in incoming {
                let source = graph.node(input).output_color_space;
                assert_ne!(source, ColorSpace::Invalid, "colorspace repair reached with an unresolved input");
                if source == ColorSpace::Srgb {
                    continue;
                }
                let conv = graph.add_detached(Box::new(ColorspaceConversionEffect::new(source, ColorSpace::Srgb)));
                graph.node_mut(conv).output_color_space = ColorSpace::Srgb;
                graph.node_mut(conv).output_gamma_curve = graph.node(input).output_gamma_curve;
                graph.node_mut(conv).output_alpha_type = graph.node(input).output_alpha_type;
                graph.insert_between(input, conv, id);
                changed = true;
            }
        }
        if !changed {
            return Ok(());
        }
        propagate::propagate_color_and_gamma(graph);
    }
    Err(ChainError::Runaway { pass: "fix_internal_color_spaces", iterations: MAX_ITERATIONS })
}

/// True when a node's output alpha convention is unresolved. Grounded on
/// `node_needs_alpha_fix` (`effect_chain.cpp:1324`) — disagreement alone
/// isn't the trigger, `propagate_alpha` already folds any disagreement
/// into `Invalid`.
fn node_needs_alpha_fix(graph: &Graph, id: NodeId) -> bool {
    let node = graph.node(id);
    !node.disabled && !node.incoming().is_empty() && node.output_alpha_type == AlphaType::Invalid
}

/// Inserts `AlphaMultiplicationEffect`/`AlphaDivisionEffect` nodes until
/// every flagged node's inputs match its desired alpha convention.
/// Grounded on `fix_internal_alpha` (`effect_chain.cpp:1335`): the
/// desired convention is premultiplied, except a `GammaCompressionEffect`
/// wants postmultiplied (gamma compression must happen after
/// un-premultiplying); every input that's neither the desired convention
/// nor blank gets converted toward it.
pub fn fix_internal_alpha(graph: &mut Graph) -> Result<(), ChainError> {
    for _ in 0..MAX_ITERATIONS {
        let mut changed = false;
        for id in graph.node_ids().collect::<Vec<_>>() {
            if !node_needs_alpha_fix(graph, id) {
                continue;
            }
            let type_id = graph.node(id).effect.effect_type_id();
            assert_ne!(type_id, "GammaExpansionEffect", "premultiplied alpha into nonlinear gamma is meaningless");

            let desired = if type_id == "GammaCompressionEffect" {
                let incoming = graph.node(id).incoming().to_vec();
                assert_eq!(incoming.len(), 1, "GammaCompressionEffect takes exactly one input");
                assert_eq!(
                    graph.node(incoming[0]).output_alpha_type,
                    AlphaType::Premultiplied,
                    "GammaCompressionEffect's input must already be premultiplied"
                );
                AlphaType::Postmultiplied
            } else {
                AlphaType::Premultiplied
            };

            let incoming: Vec<_> = graph.node(id).incoming().to_vec();
            for input in incoming {
                let current = graph.node(input).output_alpha_type;
                assert_ne!(current, AlphaType::Invalid, "alpha repair reached with an unresolved input");
                if current == desired || current == AlphaType::Blank {
                    continue;
                }
                let conv: Box<dyn crate::effect::Effect> = match desired {
                    AlphaType::Premultiplied => Box::new(AlphaMultiplicationEffect),
                    AlphaType::Postmultiplied => Box::new(AlphaDivisionEffect),
                    _ => unreachable!("fix_internal_alpha computed a non-output alpha convention"),
                };
                let conv = graph.add_detached(conv);
                graph.node_mut(conv).output_color_space = graph.node(input).output_color_space;
                graph.node_mut(conv).output_gamma_curve = graph.node(input).output_gamma_curve;
                graph.node_mut(conv).output_alpha_type = desired;
                graph.insert_between(input, conv, id);
                changed = true;
            }
        }
        if !changed {
            return Ok(());
        }
        propagate::propagate_color_and_gamma(graph);
        propagate::propagate_alpha(graph);
    }
    Err(ChainError::Runaway { pass: "fix_internal_alpha", iterations: MAX_ITERATIONS })
}

fn node_needs_linear_light(graph: &Graph, id: NodeId) -> bool {
    let node = graph.node(id);
    !node.disabled && node.effect.flags().contains(EffectFlags::NEEDS_LINEAR_LIGHT)
}

/// First gamma-repair phase: for each input of a node declaring
/// `NEEDS_LINEAR_LIGHT`, if that input is itself a zero-input node that
/// can supply linear output directly (`can_output_linear_gamma`), ask it
/// to switch via `set_int("output_linear_gamma", 1)` instead of
/// inserting a conversion node. Grounded on
/// `fix_internal_gamma_by_asking_inputs`.
pub fn fix_internal_gamma_by_asking_inputs(graph: &mut Graph) -> Result<(), ChainError> {
    for _ in 0..MAX_ITERATIONS {
        let mut changed = false;
        for id in graph.node_ids().collect::<Vec<_>>() {
            if !node_needs_linear_light(graph, id) {
                continue;
            }
            let incoming: Vec<_> = graph.node(id).incoming().to_vec();
            for input in incoming {
                let input_node = graph.node(input);
                if input_node.output_gamma_curve == GammaCurve::Linear {
                    continue;
                }
                if !input_node.incoming().is_empty() || !input_node.effect.can_output_linear_gamma() {
                    continue;
                }
                let asked = graph.node(input).effect.set_int("output_linear_gamma", 1);
                if asked {
                    graph.node_mut(input).output_gamma_curve = GammaCurve::Linear;
                    changed = true;
                }
            }
        }
        if !changed {
            return Ok(());
        }
        propagate::propagate_color_and_gamma(graph);
    }
    Err(ChainError::Runaway { pass: "fix_internal_gamma_by_asking_inputs", iterations: MAX_ITERATIONS })
}

/// Second gamma-repair phase: whatever `NEEDS_LINEAR_LIGHT` inputs are
/// still nonlinear after asking gets a `GammaExpansionEffect` spliced in
/// front of it. Grounded on `fix_internal_gamma_by_inserting_nodes`.
pub fn fix_internal_gamma_by_inserting_nodes(graph: &mut Graph) -> Result<(), ChainError> {
    for _ in 0..MAX_ITERATIONS {
        let mut changed = false;
        for id in graph.node_ids().collect::<Vec<_>>() {
            if !node_needs_linear_light(graph, id) {
                continue;
            }
            let incoming: Vec<_> = graph.node(id).incoming().to_vec();
            for input in incoming {
                let curve = graph.node(input).output_gamma_curve;
                if curve == GammaCurve::Linear {
                    continue;
                }
                assert_ne!(curve, GammaCurve::Invalid, "gamma repair reached with an unresolved input curve");
                let conv = graph.add_detached(Box::new(GammaExpansionEffect::new(curve)));
                graph.node_mut(conv).output_color_space = graph.node(input).output_color_space;
                graph.node_mut(conv).output_gamma_curve = GammaCurve::Linear;
                graph.node_mut(conv).output_alpha_type = graph.node(input).output_alpha_type;
                graph.insert_between(input, conv, id);
                changed = true;
            }
        }
        if !changed {
            return Ok(());
        }
        propagate::propagate_color_and_gamma(graph);
        propagate::propagate_alpha(graph);
    }
    Err(ChainError::Runaway { pass: "fix_internal_gamma_by_inserting_nodes", iterations: MAX_ITERATIONS })
}

/// Converts the terminal node's output to the requested output color
/// space, if it doesn't already match. Grounded on
/// `fix_output_color_space`.
pub fn fix_output_color_space(graph: &mut Graph, output_color_space: ColorSpace) -> NodeId {
    let terminal = graph.find_terminal_node();
    let current = graph.node(terminal).output_color_space;
    if current == output_color_space {
        return terminal;
    }
    let conv = graph.add_detached(Box::new(ColorspaceConversionEffect::new(current, output_color_space)));
    graph.node_mut(conv).output_color_space = output_color_space;
    graph.node_mut(conv).output_gamma_curve = graph.node(terminal).output_gamma_curve;
    graph.node_mut(conv).output_alpha_type = graph.node(terminal).output_alpha_type;
    graph.connect(terminal, conv);
    conv
}

/// Converts the terminal node's output to the requested output alpha
/// convention. Grounded on `fix_output_alpha`.
pub fn fix_output_alpha(graph: &mut Graph, terminal: NodeId, output_alpha: OutputAlphaFormat) -> NodeId {
    let current = graph.node(terminal).output_alpha_type;
    let wants = match output_alpha {
        OutputAlphaFormat::Premultiplied => AlphaType::Premultiplied,
        OutputAlphaFormat::Postmultiplied => AlphaType::Postmultiplied,
    };
    if current == wants || current == AlphaType::Blank {
        return terminal;
    }
    let conv: Box<dyn crate::effect::Effect> = match wants {
        AlphaType::Premultiplied => Box::new(AlphaMultiplicationEffect),
        AlphaType::Postmultiplied => Box::new(AlphaDivisionEffect),
        _ => unreachable!("fix_output_alpha asked for a non-output alpha convention"),
    };
    let conv = graph.add_detached(conv);
    graph.node_mut(conv).output_color_space = graph.node(terminal).output_color_space;
    graph.node_mut(conv).output_gamma_curve = graph.node(terminal).output_gamma_curve;
    graph.node_mut(conv).output_alpha_type = wants;
    graph.connect(terminal, conv);
    conv
}

/// Converts the terminal node's output to the requested output gamma
/// curve, going through postmultiplied alpha first if needed (gamma
/// compression requires it). Grounded on `fix_output_gamma`.
pub fn fix_output_gamma(graph: &mut Graph, terminal: NodeId, output_gamma: GammaCurve) -> NodeId {
    let current = graph.node(terminal).output_gamma_curve;
    if current == output_gamma {
        return terminal;
    }
    assert_eq!(
        graph.node(terminal).output_alpha_type,
        AlphaType::Postmultiplied,
        "fix_output_gamma needs postmultiplied alpha at the point it runs; fix_output_alpha should have run first"
    );
    let conv = graph.add_detached(Box::new(GammaCompressionEffect::new(output_gamma)));
    graph.node_mut(conv).output_color_space = graph.node(terminal).output_color_space;
    graph.node_mut(conv).output_gamma_curve = output_gamma;
    graph.node_mut(conv).output_alpha_type = AlphaType::Postmultiplied;
    graph.connect(terminal, conv);
    conv
}
