//! The Attribute Propagator (`spec.md` §4.2): three independent passes
//! deriving each node's output color space, gamma curve and alpha type
//! from its inputs, leaving `Invalid` wherever inputs disagree or an
//! effect's requirements aren't met yet. The repair planner
//! (`crate::repair`) is what actually resolves `Invalid`s; this module
//! only ever narrows toward them.

use crate::effect::AlphaHandling;
use crate::format::{AlphaType, ColorSpace, GammaCurve};
use crate::graph::Graph;

/// Seeds zero-input (texture-source) nodes' attributes straight from
/// their effect's declared format. Every other pass assumes these are
/// already populated and never `Invalid`.
pub fn seed_input_attributes(graph: &mut Graph) {
    let ids: Vec<_> = graph.node_ids().collect();
    for id in ids {
        let (disabled, num_inputs) = {
            let node = graph.node(id);
            (node.disabled, node.effect.num_inputs())
        };
        if disabled || num_inputs != 0 {
            continue;
        }
        let (color_space, gamma_curve, alpha_handling) = {
            let effect = &graph.node(id).effect;
            (effect.input_color_space(), effect.input_gamma_curve(), effect.alpha_handling())
        };
        let alpha_type = match alpha_handling {
            AlphaHandling::OutputBlankAlpha => AlphaType::Blank,
            AlphaHandling::InputAndOutputPremultiplied => AlphaType::Premultiplied,
            AlphaHandling::OutputPostmultiplied => AlphaType::Postmultiplied,
            other => panic!(
                "zero-input effect declared alpha handling {:?}, which only makes sense for effects with inputs",
                other
            ),
        };
        if alpha_type == AlphaType::Premultiplied {
            assert_eq!(
                gamma_curve,
                GammaCurve::Linear,
                "zero-input effect declared premultiplied alpha with non-linear gamma"
            );
        }

        let node = graph.node_mut(id);
        node.output_color_space = color_space;
        node.output_gamma_curve = gamma_curve;
        node.output_alpha_type = alpha_type;
    }
}

/// Propagates color space and gamma curve as far as possible: where all
/// inputs agree, the node inherits that value; otherwise `Invalid`.
/// `ColorspaceConversionEffect`/`GammaExpansionEffect`/
/// `GammaCompressionEffect` set their own outputs explicitly (during
/// repair insertion) and are skipped by the general rule.
pub fn propagate_color_and_gamma(graph: &mut Graph) {
    let order = graph.topological_sort(&graph.node_ids().collect::<Vec<_>>());
    for id in order {
        let node = graph.node(id);
        if node.disabled {
            continue;
        }
        assert_eq!(node.incoming().len(), node.effect.num_inputs());
        if node.incoming().is_empty() {
            assert_ne!(node.output_color_space, ColorSpace::Invalid);
            assert_ne!(node.output_gamma_curve, GammaCurve::Invalid);
            continue;
        }

        let incoming: Vec<_> = node.incoming().to_vec();
        let mut color_space = graph.node(incoming[0]).output_color_space;
        let mut gamma_curve = graph.node(incoming[0]).output_gamma_curve;
        for &input in &incoming[1..] {
            let input = graph.node(input);
            if input.output_color_space != color_space {
                color_space = ColorSpace::Invalid;
            }
            if input.output_gamma_curve != gamma_curve {
                gamma_curve = GammaCurve::Invalid;
            }
        }

        let type_id = graph.node(id).effect.effect_type_id();
        if type_id != "ColorspaceConversionEffect" {
            graph.node_mut(id).output_color_space = color_space;
        }
        if type_id != "GammaCompressionEffect" && type_id != "GammaExpansionEffect" {
            graph.node_mut(id).output_gamma_curve = gamma_curve;
        }
    }
}

/// Propagates alpha type. `AlphaMultiplicationEffect`/
/// `AlphaDivisionEffect`/the two gamma-conversion effects are special
/// cased; everything else classifies its inputs into
/// {any_invalid, any_premultiplied, any_postmultiplied} (ignoring
/// `Blank`) and derives its output from that plus its own
/// `AlphaHandling`.
pub fn propagate_alpha(graph: &mut Graph) {
    let order = graph.topological_sort(&graph.node_ids().collect::<Vec<_>>());
    for id in order {
        let node = graph.node(id);
        if node.disabled {
            continue;
        }
        assert_eq!(node.incoming().len(), node.effect.num_inputs());
        if node.incoming().is_empty() {
            assert_ne!(node.output_alpha_type, AlphaType::Invalid);
            continue;
        }

        let type_id = node.effect.effect_type_id();

        if type_id == "AlphaMultiplicationEffect" {
            assert_eq!(node.incoming().len(), 1);
            assert_eq!(graph.node(node.incoming()[0]).output_alpha_type, AlphaType::Postmultiplied);
            graph.node_mut(id).output_alpha_type = AlphaType::Premultiplied;
            continue;
        }
        if type_id == "AlphaDivisionEffect" {
            assert_eq!(node.incoming().len(), 1);
            assert_eq!(graph.node(node.incoming()[0]).output_alpha_type, AlphaType::Premultiplied);
            graph.node_mut(id).output_alpha_type = AlphaType::Postmultiplied;
            continue;
        }
        if type_id == "GammaCompressionEffect" || type_id == "GammaExpansionEffect" {
            assert_eq!(node.incoming().len(), 1);
            let input_alpha = graph.node(node.incoming()[0]).output_alpha_type;
            graph.node_mut(id).output_alpha_type = match input_alpha {
                AlphaType::Blank => AlphaType::Blank,
                AlphaType::Postmultiplied => AlphaType::Postmultiplied,
                _ => AlphaType::Invalid,
            };
            continue;
        }

        let alpha_handling = node.effect.alpha_handling();
        assert!(matches!(
            alpha_handling,
            AlphaHandling::InputAndOutputPremultiplied
                | AlphaHandling::InputPremultipliedKeepBlank
                | AlphaHandling::DontCare
        ));

        let incoming: Vec<_> = node.incoming().to_vec();
        let mut any_invalid = false;
        let mut any_premultiplied = false;
        let mut any_postmultiplied = false;
        for &input in &incoming {
            match graph.node(input).output_alpha_type {
                AlphaType::Invalid => any_invalid = true,
                AlphaType::Blank => {}
                AlphaType::Premultiplied => any_premultiplied = true,
                AlphaType::Postmultiplied => any_postmultiplied = true,
            }
        }

        let resolved = if any_invalid {
            AlphaType::Invalid
        } else if any_premultiplied && any_postmultiplied {
            AlphaType::Invalid
        } else if matches!(
            alpha_handling,
            AlphaHandling::InputAndOutputPremultiplied | AlphaHandling::InputPremultipliedKeepBlank
        ) {
            if any_postmultiplied {
                AlphaType::Invalid
            } else if !any_premultiplied && alpha_handling == AlphaHandling::InputPremultipliedKeepBlank {
                AlphaType::Blank
            } else {
                AlphaType::Premultiplied
            }
        } else {
            debug_assert_eq!(alpha_handling, AlphaHandling::DontCare);
            if any_premultiplied {
                AlphaType::Premultiplied
            } else if any_postmultiplied {
                AlphaType::Postmultiplied
            } else {
                AlphaType::Blank
            }
        };

        graph.node_mut(id).output_alpha_type = resolved;
    }
}
