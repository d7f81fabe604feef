mod common;

use pixelgraph::format::{AlphaType, ColorSpace, GammaCurve};
use pixelgraph::graph::Graph;
use pixelgraph::propagate;
use common::{Blend, Identity, NeedsLinearLight, TextureSource};

#[test]
fn seed_sets_zero_input_node_attributes_from_the_effect() {
    let mut graph = Graph::new();
    let src = graph.add_input(Box::new(TextureSource::srgb_premultiplied()));

    propagate::seed_input_attributes(&mut graph);

    assert_eq!(graph.node(src).output_color_space, ColorSpace::Srgb);
    assert_eq!(graph.node(src).output_gamma_curve, GammaCurve::Linear);
    assert_eq!(graph.node(src).output_alpha_type, AlphaType::Premultiplied);
}

#[test]
fn color_space_propagates_through_agreeing_inputs() {
    let mut graph = Graph::new();
    let src = graph.add_input(Box::new(TextureSource::srgb_premultiplied()));
    let a = graph.add_effect(Box::new(Identity), &[src]);

    propagate::seed_input_attributes(&mut graph);
    propagate::propagate_color_and_gamma(&mut graph);

    assert_eq!(graph.node(a).output_color_space, ColorSpace::Srgb);
    assert_eq!(graph.node(a).output_gamma_curve, GammaCurve::Linear);
}

#[test]
fn color_space_goes_invalid_on_disagreement() {
    let mut graph = Graph::new();
    let a = graph.add_input(Box::new(TextureSource::srgb_premultiplied()));
    let b = graph.add_input(Box::new(TextureSource::rec601_525_blank()));
    let blend = graph.add_effect(Box::new(Blend), &[a, b]);

    propagate::seed_input_attributes(&mut graph);
    propagate::propagate_color_and_gamma(&mut graph);

    assert_eq!(graph.node(blend).output_color_space, ColorSpace::Invalid);
}

#[test]
fn alpha_stays_blank_when_no_input_carries_alpha() {
    let mut graph = Graph::new();
    let src = graph.add_input(Box::new(TextureSource::srgb_nonlinear_blank()));
    let a = graph.add_effect(Box::new(Identity), &[src]);

    propagate::seed_input_attributes(&mut graph);
    propagate::propagate_alpha(&mut graph);

    assert_eq!(graph.node(a).output_alpha_type, AlphaType::Blank);
}

#[test]
fn alpha_goes_invalid_when_premultiplied_meets_postmultiplied() {
    let mut graph = Graph::new();
    let premultiplied = graph.add_input(Box::new(TextureSource::srgb_premultiplied()));
    let mut postmultiplied_source = TextureSource::srgb_premultiplied();
    postmultiplied_source.alpha_handling = pixelgraph::effect::AlphaHandling::OutputPostmultiplied;
    let postmultiplied = graph.add_input(Box::new(postmultiplied_source));
    let blend = graph.add_effect(Box::new(Blend), &[premultiplied, postmultiplied]);

    propagate::seed_input_attributes(&mut graph);
    propagate::propagate_alpha(&mut graph);

    assert_eq!(graph.node(blend).output_alpha_type, AlphaType::Invalid);
}

#[test]
fn needs_linear_light_node_still_just_propagates_whatever_gamma_it_gets() {
    // Propagation itself doesn't know about NEEDS_LINEAR_LIGHT -- that's
    // the repair planner's job. A nonlinear input just propagates
    // through unchanged here.
    let mut graph = Graph::new();
    let src = graph.add_input(Box::new(TextureSource::srgb_nonlinear_blank()));
    let needs_linear = graph.add_effect(Box::new(NeedsLinearLight), &[src]);

    propagate::seed_input_attributes(&mut graph);
    propagate::propagate_color_and_gamma(&mut graph);

    assert_eq!(graph.node(needs_linear).output_gamma_curve, GammaCurve::Srgb);
}
