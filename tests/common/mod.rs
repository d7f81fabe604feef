//! Small mock `Effect` implementations shared by the integration tests:
//! an identity passthrough, a zero-input texture source, an effect that
//! demands linear light, a bounce-demanding effect, a non-one-to-one
//! resize, and a mipmap-needing effect. Mirrors `spec.md` §8's scenario
//! effects.

#![allow(dead_code)]

use std::cell::Cell;

use pixelgraph::effect::{AlphaHandling, Effect, EffectFlags, EffectSize};
use pixelgraph::format::{ColorSpace, GammaCurve};

/// A single-input effect that passes its input straight through,
/// sampling it once per output pixel.
pub struct Identity;

impl Effect for Identity {
    fn effect_type_id(&self) -> &'static str {
        "test::Identity"
    }
    fn num_inputs(&self) -> usize {
        1
    }
    fn flags(&self) -> EffectFlags {
        EffectFlags::ONE_TO_ONE_SAMPLING
    }
    fn output_fragment_shader(&self) -> String {
        "vec4 FUNCNAME(vec2 tc) {\n\treturn INPUT(tc);\n}\n".to_string()
    }
}

/// A zero-input texture source with a fixed declared format.
pub struct TextureSource {
    pub color_space: ColorSpace,
    pub gamma_curve: GammaCurve,
    pub alpha_handling: AlphaHandling,
}

impl TextureSource {
    pub fn srgb_premultiplied() -> Self {
        TextureSource {
            color_space: ColorSpace::Srgb,
            gamma_curve: GammaCurve::Linear,
            alpha_handling: AlphaHandling::InputAndOutputPremultiplied,
        }
    }

    pub fn srgb_nonlinear_blank() -> Self {
        TextureSource {
            color_space: ColorSpace::Srgb,
            gamma_curve: GammaCurve::Srgb,
            alpha_handling: AlphaHandling::OutputBlankAlpha,
        }
    }

    pub fn rec601_525_blank() -> Self {
        TextureSource {
            color_space: ColorSpace::Rec601_525,
            gamma_curve: GammaCurve::Linear,
            alpha_handling: AlphaHandling::OutputBlankAlpha,
        }
    }

    pub fn rec601_625_blank() -> Self {
        TextureSource {
            color_space: ColorSpace::Rec601_625,
            gamma_curve: GammaCurve::Linear,
            alpha_handling: AlphaHandling::OutputBlankAlpha,
        }
    }
}

impl Effect for TextureSource {
    fn effect_type_id(&self) -> &'static str {
        "test::TextureSource"
    }
    fn num_inputs(&self) -> usize {
        0
    }
    fn flags(&self) -> EffectFlags {
        EffectFlags::IS_SINGLE_TEXTURE
    }
    fn alpha_handling(&self) -> AlphaHandling {
        self.alpha_handling
    }
    fn input_color_space(&self) -> ColorSpace {
        self.color_space
    }
    fn input_gamma_curve(&self) -> GammaCurve {
        self.gamma_curve
    }
    fn output_fragment_shader(&self) -> String {
        "vec4 FUNCNAME(vec2 tc) {\n\treturn texture(PREFIX(tex), tc);\n}\n".to_string()
    }
}

/// A single-input effect that requires linear-light input.
pub struct NeedsLinearLight;

impl Effect for NeedsLinearLight {
    fn effect_type_id(&self) -> &'static str {
        "test::NeedsLinearLight"
    }
    fn num_inputs(&self) -> usize {
        1
    }
    fn flags(&self) -> EffectFlags {
        EffectFlags::NEEDS_LINEAR_LIGHT | EffectFlags::ONE_TO_ONE_SAMPLING
    }
    fn alpha_handling(&self) -> AlphaHandling {
        AlphaHandling::InputAndOutputPremultiplied
    }
    fn output_fragment_shader(&self) -> String {
        "vec4 FUNCNAME(vec2 tc) {\n\treturn INPUT(tc) * 0.5;\n}\n".to_string()
    }
}

/// A single-input effect that can't sample its own input inline: that
/// input must be bounced to a texture before this effect reads it.
pub struct BounceDemand;

impl Effect for BounceDemand {
    fn effect_type_id(&self) -> &'static str {
        "test::BounceDemand"
    }
    fn num_inputs(&self) -> usize {
        1
    }
    fn flags(&self) -> EffectFlags {
        EffectFlags::NEEDS_TEXTURE_BOUNCE | EffectFlags::ONE_TO_ONE_SAMPLING
    }
    fn output_fragment_shader(&self) -> String {
        "vec4 FUNCNAME(vec2 tc) {\n\treturn INPUT(tc);\n}\n".to_string()
    }
}

/// A single-input effect that changes output resolution without
/// one-to-one sampling (a real resize, not just a crop).
pub struct Resize {
    pub width: u32,
    pub height: u32,
}

impl Effect for Resize {
    fn effect_type_id(&self) -> &'static str {
        "test::Resize"
    }
    fn num_inputs(&self) -> usize {
        1
    }
    fn flags(&self) -> EffectFlags {
        EffectFlags::CHANGES_OUTPUT_SIZE
    }
    fn output_fragment_shader(&self) -> String {
        "vec4 FUNCNAME(vec2 tc) {\n\treturn INPUT(tc);\n}\n".to_string()
    }
    fn output_size(&self, _input_sizes: &[EffectSize]) -> Option<EffectSize> {
        Some(EffectSize { width: self.width, height: self.height })
    }
}

/// A zero-input source that starts out nonlinear but can be asked to
/// switch to linear output (the "ask inputs first" gamma repair phase).
pub struct LinearCapableSource {
    pub curve: Cell<GammaCurve>,
}

impl LinearCapableSource {
    pub fn new(curve: GammaCurve) -> Self {
        LinearCapableSource { curve: Cell::new(curve) }
    }
}

impl Effect for LinearCapableSource {
    fn effect_type_id(&self) -> &'static str {
        "test::LinearCapableSource"
    }
    fn num_inputs(&self) -> usize {
        0
    }
    fn flags(&self) -> EffectFlags {
        EffectFlags::IS_SINGLE_TEXTURE
    }
    fn alpha_handling(&self) -> AlphaHandling {
        AlphaHandling::OutputBlankAlpha
    }
    fn input_color_space(&self) -> ColorSpace {
        ColorSpace::Srgb
    }
    fn input_gamma_curve(&self) -> GammaCurve {
        self.curve.get()
    }
    fn can_output_linear_gamma(&self) -> bool {
        true
    }
    fn can_supply_mipmaps(&self) -> bool {
        true
    }
    fn output_fragment_shader(&self) -> String {
        "vec4 FUNCNAME(vec2 tc) {\n\treturn texture(PREFIX(tex), tc);\n}\n".to_string()
    }
    fn set_int(&self, key: &str, value: i32) -> bool {
        if key == "output_linear_gamma" && value == 1 {
            self.curve.set(GammaCurve::Linear);
            true
        } else {
            false
        }
    }
}

/// A zero-input source that declares itself nonlinear and refuses to
/// switch (the "ask inputs first" phase should fall through to the
/// "insert nodes" phase for it).
pub struct FixedNonlinearSource;

impl Effect for FixedNonlinearSource {
    fn effect_type_id(&self) -> &'static str {
        "test::FixedNonlinearSource"
    }
    fn num_inputs(&self) -> usize {
        0
    }
    fn alpha_handling(&self) -> AlphaHandling {
        AlphaHandling::OutputBlankAlpha
    }
    fn input_color_space(&self) -> ColorSpace {
        ColorSpace::Srgb
    }
    fn input_gamma_curve(&self) -> GammaCurve {
        GammaCurve::Srgb
    }
    fn output_fragment_shader(&self) -> String {
        "vec4 FUNCNAME(vec2 tc) {\n\treturn texture(PREFIX(tex), tc);\n}\n".to_string()
    }
}

/// A single-input effect that samples more than one texel per output
/// pixel (not one-to-one), but doesn't change resolution and doesn't
/// need mipmaps. Stands in for a generic convolution-style effect.
pub struct Blur;

impl Effect for Blur {
    fn effect_type_id(&self) -> &'static str {
        "test::Blur"
    }
    fn num_inputs(&self) -> usize {
        1
    }
    fn output_fragment_shader(&self) -> String {
        "vec4 FUNCNAME(vec2 tc) {\n\treturn INPUT(tc);\n}\n".to_string()
    }
}

/// A single-input effect that requires mipmaps on its input.
pub struct MipmapEffect;

impl Effect for MipmapEffect {
    fn effect_type_id(&self) -> &'static str {
        "test::MipmapEffect"
    }
    fn num_inputs(&self) -> usize {
        1
    }
    fn flags(&self) -> EffectFlags {
        EffectFlags::NEEDS_MIPMAPS | EffectFlags::ONE_TO_ONE_SAMPLING
    }
    fn output_fragment_shader(&self) -> String {
        "vec4 FUNCNAME(vec2 tc) {\n\treturn INPUT(tc);\n}\n".to_string()
    }
}

/// A two-input effect (e.g. a blend), used to exercise fan-out and
/// multi-input wiring.
pub struct Blend;

impl Effect for Blend {
    fn effect_type_id(&self) -> &'static str {
        "test::Blend"
    }
    fn num_inputs(&self) -> usize {
        2
    }
    fn flags(&self) -> EffectFlags {
        EffectFlags::ONE_TO_ONE_SAMPLING
    }
    fn output_fragment_shader(&self) -> String {
        "vec4 FUNCNAME(vec2 tc) {\n\treturn 0.5 * (INPUT1(tc) + INPUT2(tc));\n}\n".to_string()
    }
}

/// A single-input effect that requires sRGB-primary input, independent
/// of whatever its input's color space happens to propagate to.
pub struct NeedsSrgbPrimaries;

impl Effect for NeedsSrgbPrimaries {
    fn effect_type_id(&self) -> &'static str {
        "test::NeedsSrgbPrimaries"
    }
    fn num_inputs(&self) -> usize {
        1
    }
    fn flags(&self) -> EffectFlags {
        EffectFlags::NEEDS_SRGB_PRIMARIES | EffectFlags::ONE_TO_ONE_SAMPLING
    }
    fn output_fragment_shader(&self) -> String {
        "vec4 FUNCNAME(vec2 tc) {\n\treturn INPUT(tc);\n}\n".to_string()
    }
}
