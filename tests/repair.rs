mod common;

use pixelgraph::format::{AlphaType, ColorSpace, GammaCurve, OutputAlphaFormat};
use pixelgraph::graph::Graph;
use pixelgraph::{propagate, repair};
use common::{
    Blend, FixedNonlinearSource, Identity, LinearCapableSource, NeedsLinearLight, NeedsSrgbPrimaries, TextureSource,
};

#[test]
fn fix_internal_color_spaces_inserts_a_conversion() {
    let mut graph = Graph::new();
    let a = graph.add_input(Box::new(TextureSource::srgb_premultiplied()));
    let b = graph.add_input(Box::new(TextureSource::rec601_525_blank()));
    let blend = graph.add_effect(Box::new(Blend), &[a, b]);

    propagate::seed_input_attributes(&mut graph);
    propagate::propagate_color_and_gamma(&mut graph);
    assert_eq!(graph.node(blend).output_color_space, ColorSpace::Invalid);

    repair::fix_internal_color_spaces(&mut graph).unwrap();

    assert_eq!(graph.node(blend).output_color_space, ColorSpace::Srgb);
    // `a` is already sRGB, so only `b`'s edge gets a conversion node
    // spliced in.
    assert_eq!(graph.node(blend).incoming()[0], a);
    assert_ne!(graph.node(blend).incoming()[1], b);
}

#[test]
fn fix_internal_color_spaces_converts_every_non_srgb_input_to_srgb() {
    // Neither input is sRGB; both must converge on sRGB, not on
    // whichever of the two happens to come first.
    let mut graph = Graph::new();
    let a = graph.add_input(Box::new(TextureSource::rec601_525_blank()));
    let b = graph.add_input(Box::new(TextureSource::rec601_625_blank()));
    let blend = graph.add_effect(Box::new(Blend), &[a, b]);

    propagate::seed_input_attributes(&mut graph);
    propagate::propagate_color_and_gamma(&mut graph);
    assert_eq!(graph.node(blend).output_color_space, ColorSpace::Invalid);

    repair::fix_internal_color_spaces(&mut graph).unwrap();

    assert_eq!(graph.node(blend).output_color_space, ColorSpace::Srgb);
    let converted_a = graph.node(blend).incoming()[0];
    let converted_b = graph.node(blend).incoming()[1];
    assert_ne!(converted_a, a);
    assert_ne!(converted_b, b);
    assert_eq!(graph.node(converted_a).output_color_space, ColorSpace::Srgb);
    assert_eq!(graph.node(converted_b).output_color_space, ColorSpace::Srgb);
}

#[test]
fn fix_internal_color_spaces_converts_for_an_effect_declaring_needs_srgb_primaries() {
    // A single non-sRGB input propagates cleanly (no disagreement), so
    // the node's own output is never `Invalid` — only the
    // `NEEDS_SRGB_PRIMARIES` flag should trigger the fix here.
    let mut graph = Graph::new();
    let src = graph.add_input(Box::new(TextureSource::rec601_525_blank()));
    let node = graph.add_effect(Box::new(NeedsSrgbPrimaries), &[src]);

    propagate::seed_input_attributes(&mut graph);
    propagate::propagate_color_and_gamma(&mut graph);
    assert_eq!(graph.node(node).output_color_space, ColorSpace::Rec601_525);

    repair::fix_internal_color_spaces(&mut graph).unwrap();

    let converted = graph.node(node).incoming()[0];
    assert_ne!(converted, src);
    assert_eq!(graph.node(converted).output_color_space, ColorSpace::Srgb);
    assert_eq!(graph.node(node).output_color_space, ColorSpace::Srgb);
}

#[test]
fn fix_internal_alpha_multiplies_in_a_postmultiplied_input() {
    let mut graph = Graph::new();
    let premultiplied = graph.add_input(Box::new(TextureSource::srgb_premultiplied()));
    let mut postmultiplied_source = TextureSource::srgb_premultiplied();
    postmultiplied_source.alpha_handling = pixelgraph::effect::AlphaHandling::OutputPostmultiplied;
    let postmultiplied = graph.add_input(Box::new(postmultiplied_source));
    let blend = graph.add_effect(Box::new(Blend), &[premultiplied, postmultiplied]);

    propagate::seed_input_attributes(&mut graph);
    propagate::propagate_alpha(&mut graph);
    assert_eq!(graph.node(blend).output_alpha_type, AlphaType::Invalid);

    repair::fix_internal_alpha(&mut graph).unwrap();

    propagate::propagate_alpha(&mut graph);
    assert_eq!(graph.node(blend).output_alpha_type, AlphaType::Premultiplied);
}

#[test]
fn fix_internal_alpha_converts_a_single_postmultiplied_input() {
    // Only one convention is present at all (no disagreement to
    // speak of); `propagate_alpha` still leaves this `Invalid` because
    // `InputAndOutputPremultiplied` demands premultiplied specifically.
    let mut graph = Graph::new();
    let mut postmultiplied_source = TextureSource::srgb_premultiplied();
    postmultiplied_source.alpha_handling = pixelgraph::effect::AlphaHandling::OutputPostmultiplied;
    let src = graph.add_input(Box::new(postmultiplied_source));
    let node = graph.add_effect(Box::new(NeedsLinearLight), &[src]);

    propagate::seed_input_attributes(&mut graph);
    propagate::propagate_alpha(&mut graph);
    assert_eq!(graph.node(node).output_alpha_type, AlphaType::Invalid);

    repair::fix_internal_alpha(&mut graph).unwrap();

    let converted = graph.node(node).incoming()[0];
    assert_ne!(converted, src);
    assert_eq!(graph.node(converted).output_alpha_type, AlphaType::Premultiplied);
    assert_eq!(graph.node(node).output_alpha_type, AlphaType::Premultiplied);
}

#[test]
fn fix_internal_alpha_divides_toward_postmultiplied_ahead_of_gamma_compression() {
    use pixelgraph::builtin_effects::GammaCompressionEffect;

    let mut graph = Graph::new();
    let src = graph.add_input(Box::new(TextureSource::srgb_premultiplied()));
    let node = graph.add_effect(Box::new(GammaCompressionEffect::new(GammaCurve::Srgb)), &[src]);

    propagate::seed_input_attributes(&mut graph);
    propagate::propagate_alpha(&mut graph);
    assert_eq!(graph.node(node).output_alpha_type, AlphaType::Invalid);

    repair::fix_internal_alpha(&mut graph).unwrap();

    let converted = graph.node(node).incoming()[0];
    assert_ne!(converted, src);
    assert_eq!(graph.node(converted).output_alpha_type, AlphaType::Postmultiplied);
}

#[test]
fn gamma_repair_asks_a_capable_input_before_inserting_a_node() {
    let mut graph = Graph::new();
    let src = graph.add_input(Box::new(LinearCapableSource::new(GammaCurve::Srgb)));
    let needs_linear = graph.add_effect(Box::new(NeedsLinearLight), &[src]);

    propagate::seed_input_attributes(&mut graph);
    propagate::propagate_color_and_gamma(&mut graph);

    repair::fix_internal_gamma_by_asking_inputs(&mut graph).unwrap();

    // The source itself switched to linear; no conversion node needed.
    assert_eq!(graph.node(src).output_gamma_curve, GammaCurve::Linear);
    assert_eq!(graph.node(needs_linear).incoming(), &[src]);
}

#[test]
fn gamma_repair_inserts_a_node_when_the_input_cannot_switch() {
    let mut graph = Graph::new();
    let src = graph.add_input(Box::new(FixedNonlinearSource));
    let needs_linear = graph.add_effect(Box::new(NeedsLinearLight), &[src]);

    propagate::seed_input_attributes(&mut graph);
    propagate::propagate_color_and_gamma(&mut graph);

    repair::fix_internal_gamma_by_asking_inputs(&mut graph).unwrap();
    assert_eq!(graph.node(needs_linear).incoming(), &[src], "asking phase shouldn't touch an incapable source");

    repair::fix_internal_gamma_by_inserting_nodes(&mut graph).unwrap();

    assert_ne!(graph.node(needs_linear).incoming()[0], src);
    let inserted = graph.node(needs_linear).incoming()[0];
    assert_eq!(graph.node(inserted).output_gamma_curve, GammaCurve::Linear);
}

#[test]
fn fix_output_color_space_converts_the_terminal_node() {
    let mut graph = Graph::new();
    let src = graph.add_input(Box::new(TextureSource::srgb_premultiplied()));
    let terminal = graph.add_effect(Box::new(Identity), &[src]);

    propagate::seed_input_attributes(&mut graph);
    propagate::propagate_color_and_gamma(&mut graph);

    let new_terminal = repair::fix_output_color_space(&mut graph, ColorSpace::Rec601_625);
    assert_ne!(new_terminal, terminal);
    assert_eq!(graph.node(new_terminal).output_color_space, ColorSpace::Rec601_625);
}

#[test]
fn fix_output_color_space_is_a_no_op_when_already_matching() {
    let mut graph = Graph::new();
    let src = graph.add_input(Box::new(TextureSource::srgb_premultiplied()));
    let terminal = graph.add_effect(Box::new(Identity), &[src]);

    propagate::seed_input_attributes(&mut graph);
    propagate::propagate_color_and_gamma(&mut graph);

    let result = repair::fix_output_color_space(&mut graph, ColorSpace::Srgb);
    assert_eq!(result, terminal);
}

#[test]
fn fix_output_alpha_converts_premultiplied_to_postmultiplied() {
    let mut graph = Graph::new();
    let src = graph.add_input(Box::new(TextureSource::srgb_premultiplied()));
    let terminal = graph.add_effect(Box::new(Identity), &[src]);

    propagate::seed_input_attributes(&mut graph);
    propagate::propagate_alpha(&mut graph);

    let new_terminal = repair::fix_output_alpha(&mut graph, terminal, OutputAlphaFormat::Postmultiplied);
    assert_ne!(new_terminal, terminal);
    assert_eq!(graph.node(new_terminal).output_alpha_type, AlphaType::Postmultiplied);
}
