//! The Output Finisher (`spec.md` §4.6): appends the conversion nodes
//! needed to deliver the chain's declared output format, after internal
//! repair has already settled. Grounded on the tail of
//! `EffectChain::finalize()` in the original source: color space, then
//! alpha, then gamma, then optional Y'CbCr, then optional dither, always
//! in that order.

use crate::builtin_effects::{DitherEffect, YCbCrConversionEffect};
use crate::format::{ColorSpace, GammaCurve, OutputAlphaFormat, YCbCrFormat};
use crate::graph::{Graph, NodeId};
use crate::repair;

/// Output-finishing parameters gathered from the chain builder.
pub struct OutputSpec {
    pub color_space: ColorSpace,
    pub gamma_curve: GammaCurve,
    pub alpha_format: OutputAlphaFormat,
    pub ycbcr_format: Option<YCbCrFormat>,
    pub dither_bits: Option<u32>,
}

/// Appends whatever conversion nodes `spec` needs beyond what's already
/// there, returning the new terminal node.
pub fn finish_output(graph: &mut Graph, spec: &OutputSpec) -> NodeId {
    let terminal = repair::fix_output_color_space(graph, spec.color_space);
    let terminal = repair::fix_output_alpha(graph, terminal, spec.alpha_format);
    let terminal = repair::fix_output_gamma(graph, terminal, spec.gamma_curve);

    let terminal = if let Some(ycbcr_format) = spec.ycbcr_format {
        add_ycbcr_conversion(graph, terminal, ycbcr_format)
    } else {
        terminal
    };

    match spec.dither_bits {
        Some(num_bits) if num_bits > 0 => add_dither(graph, terminal, num_bits),
        _ => terminal,
    }
}

fn add_ycbcr_conversion(graph: &mut Graph, terminal: NodeId, format: YCbCrFormat) -> NodeId {
    let conv = graph.add_detached(Box::new(YCbCrConversionEffect::new(format)));
    graph.node_mut(conv).output_color_space = graph.node(terminal).output_color_space;
    graph.node_mut(conv).output_gamma_curve = graph.node(terminal).output_gamma_curve;
    graph.node_mut(conv).output_alpha_type = graph.node(terminal).output_alpha_type;
    graph.connect(terminal, conv);
    conv
}

fn add_dither(graph: &mut Graph, terminal: NodeId, num_bits: u32) -> NodeId {
    let conv = graph.add_detached(Box::new(DitherEffect::new(num_bits)));
    graph.node_mut(conv).output_color_space = graph.node(terminal).output_color_space;
    graph.node_mut(conv).output_gamma_curve = graph.node(terminal).output_gamma_curve;
    graph.node_mut(conv).output_alpha_type = graph.node(terminal).output_alpha_type;
    graph.connect(terminal, conv);
    conv
}
