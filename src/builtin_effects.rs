//! The conversion effects the core recognizes by `effect_type_id()` and
//! inserts itself during repair and output finishing (`spec.md` §4.3,
//! §4.6). These are concrete so the crate is exercisable standalone;
//! every other effect (blur, resample, color grade, ...) is an external
//! collaborator this crate never implements.
//!
//! Grounded on the recognized-task-kind pattern in the teacher's
//! `src/frame/pass/graphics.rs` and `src/frame/pass/present.rs`, which
//! ship small concrete task types alongside the scheduler that
//! recognizes them by kind.

use std::cell::Cell;

use crate::effect::{AlphaHandling, Effect, EffectFlags, Uniform, UniformDeclarations};
use crate::format::{ColorSpace, GammaCurve, YCbCrFormat};

fn colorspace_matrix_name(space: ColorSpace) -> &'static str {
    match space {
        ColorSpace::Srgb => "srgb",
        ColorSpace::Rec601_525 => "rec601_525",
        ColorSpace::Rec601_625 => "rec601_625",
        ColorSpace::Invalid => unreachable!("conversion effect given an invalid color space"),
    }
}

/// Converts between RGB color-space primaries (`spec.md` §4.3 repair
/// insertion). Always converts *to* sRGB in this crate, since that's the
/// only destination the repair planner ever asks for.
pub struct ColorspaceConversionEffect {
    pub source_space: Cell<ColorSpace>,
    pub destination_space: Cell<ColorSpace>,
}

impl ColorspaceConversionEffect {
    pub fn new(source_space: ColorSpace, destination_space: ColorSpace) -> Self {
        ColorspaceConversionEffect {
            source_space: Cell::new(source_space),
            destination_space: Cell::new(destination_space),
        }
    }
}

impl Effect for ColorspaceConversionEffect {
    fn effect_type_id(&self) -> &'static str {
        "ColorspaceConversionEffect"
    }

    fn num_inputs(&self) -> usize {
        1
    }

    fn flags(&self) -> EffectFlags {
        EffectFlags::ONE_TO_ONE_SAMPLING
    }

    fn alpha_handling(&self) -> AlphaHandling {
        AlphaHandling::DontCare
    }

    fn output_fragment_shader(&self) -> String {
        format!(
            "vec4 FUNCNAME(vec2 tc) {{\n\treturn PREFIX(convert_{}_to_{})(INPUT(tc));\n}}\n",
            colorspace_matrix_name(self.source_space.get()),
            colorspace_matrix_name(self.destination_space.get()),
        )
    }

    fn set_int(&self, key: &str, value: i32) -> bool {
        let space = match value {
            0 => ColorSpace::Srgb,
            1 => ColorSpace::Rec601_525,
            2 => ColorSpace::Rec601_625,
            _ => return false,
        };
        match key {
            "source_space" => {
                self.source_space.set(space);
                true
            }
            "destination_space" => {
                self.destination_space.set(space);
                true
            }
            _ => false,
        }
    }
}

/// Converts a nonlinear gamma curve to linear light, inserted before
/// effects that declare `NEEDS_LINEAR_LIGHT` (or after a zero-input
/// terminal node whose gamma doesn't match the requested output).
pub struct GammaExpansionEffect {
    pub source_curve: Cell<GammaCurve>,
}

impl GammaExpansionEffect {
    pub fn new(source_curve: GammaCurve) -> Self {
        GammaExpansionEffect { source_curve: Cell::new(source_curve) }
    }
}

impl Effect for GammaExpansionEffect {
    fn effect_type_id(&self) -> &'static str {
        "GammaExpansionEffect"
    }

    fn num_inputs(&self) -> usize {
        1
    }

    fn flags(&self) -> EffectFlags {
        EffectFlags::ONE_TO_ONE_SAMPLING
    }

    fn alpha_handling(&self) -> AlphaHandling {
        AlphaHandling::InputPremultipliedKeepBlank
    }

    fn output_fragment_shader(&self) -> String {
        let curve = match self.source_curve.get() {
            GammaCurve::Srgb => "srgb",
            GammaCurve::Rec601_709 => "rec601_709",
            GammaCurve::Linear => unreachable!("gamma expansion from already-linear input"),
            GammaCurve::Invalid => unreachable!("gamma expansion given an invalid gamma curve"),
        };
        format!("vec4 FUNCNAME(vec2 tc) {{\n\treturn PREFIX(expand_{})(INPUT(tc));\n}}\n", curve)
    }

    fn set_int(&self, key: &str, value: i32) -> bool {
        if key != "source_curve" {
            return false;
        }
        let curve = match value {
            1 => GammaCurve::Srgb,
            2 => GammaCurve::Rec601_709,
            _ => return false,
        };
        self.source_curve.set(curve);
        true
    }
}

/// Converts linear light to a nonlinear gamma curve, inserted by
/// `fix_output_gamma` right before the requested output format's gamma.
/// Requires postmultiplied alpha input (`spec.md` §4.3).
pub struct GammaCompressionEffect {
    pub destination_curve: Cell<GammaCurve>,
}

impl GammaCompressionEffect {
    pub fn new(destination_curve: GammaCurve) -> Self {
        GammaCompressionEffect { destination_curve: Cell::new(destination_curve) }
    }
}

impl Effect for GammaCompressionEffect {
    fn effect_type_id(&self) -> &'static str {
        "GammaCompressionEffect"
    }

    fn num_inputs(&self) -> usize {
        1
    }

    fn flags(&self) -> EffectFlags {
        EffectFlags::ONE_TO_ONE_SAMPLING
    }

    fn alpha_handling(&self) -> AlphaHandling {
        AlphaHandling::InputPremultipliedKeepBlank
    }

    fn output_fragment_shader(&self) -> String {
        let curve = match self.destination_curve.get() {
            GammaCurve::Srgb => "srgb",
            GammaCurve::Rec601_709 => "rec601_709",
            GammaCurve::Linear => unreachable!("gamma compression to linear makes no sense"),
            GammaCurve::Invalid => unreachable!("gamma compression given an invalid gamma curve"),
        };
        format!("vec4 FUNCNAME(vec2 tc) {{\n\treturn PREFIX(compress_{})(INPUT(tc));\n}}\n", curve)
    }

    fn set_int(&self, key: &str, value: i32) -> bool {
        if key != "destination_curve" {
            return false;
        }
        let curve = match value {
            1 => GammaCurve::Srgb,
            2 => GammaCurve::Rec601_709,
            _ => return false,
        };
        self.destination_curve.set(curve);
        true
    }
}

/// Converts postmultiplied alpha to premultiplied.
pub struct AlphaMultiplicationEffect;

impl Effect for AlphaMultiplicationEffect {
    fn effect_type_id(&self) -> &'static str {
        "AlphaMultiplicationEffect"
    }

    fn num_inputs(&self) -> usize {
        1
    }

    fn flags(&self) -> EffectFlags {
        EffectFlags::ONE_TO_ONE_SAMPLING
    }

    fn output_fragment_shader(&self) -> String {
        "vec4 FUNCNAME(vec2 tc) {\n\tvec4 x = INPUT(tc);\n\treturn vec4(x.rgb * x.a, x.a);\n}\n".to_string()
    }
}

/// Converts premultiplied alpha to postmultiplied.
pub struct AlphaDivisionEffect;

impl Effect for AlphaDivisionEffect {
    fn effect_type_id(&self) -> &'static str {
        "AlphaDivisionEffect"
    }

    fn num_inputs(&self) -> usize {
        1
    }

    fn flags(&self) -> EffectFlags {
        EffectFlags::ONE_TO_ONE_SAMPLING
    }

    fn output_fragment_shader(&self) -> String {
        "vec4 FUNCNAME(vec2 tc) {\n\tvec4 x = INPUT(tc);\n\treturn x.a > 0.0 ? vec4(x.rgb / x.a, x.a) : x;\n}\n".to_string()
    }
}

/// Converts gamma-encoded RGB(A) to Y'CbCr, appended by the output
/// finisher when Y'CbCr output is requested. Chroma subsampling is fixed
/// to 1x1 (`spec.md` Non-goals).
pub struct YCbCrConversionEffect {
    pub format: YCbCrFormat,
}

impl YCbCrConversionEffect {
    pub fn new(format: YCbCrFormat) -> Self {
        YCbCrConversionEffect { format }
    }
}

impl Effect for YCbCrConversionEffect {
    fn effect_type_id(&self) -> &'static str {
        "YCbCrConversionEffect"
    }

    fn num_inputs(&self) -> usize {
        1
    }

    fn flags(&self) -> EffectFlags {
        EffectFlags::ONE_TO_ONE_SAMPLING
    }

    fn output_fragment_shader(&self) -> String {
        "vec4 FUNCNAME(vec2 tc) {\n\treturn PREFIX(rgb_to_ycbcr)(INPUT(tc));\n}\n".to_string()
    }

    fn uniforms(&self) -> UniformDeclarations {
        let mut decl = UniformDeclarations::default();
        decl.bools.push(Uniform::scalar("full_range", self.format.full_range));
        decl.ints.push(Uniform::scalar("num_levels", self.format.num_levels as i32));
        decl
    }
}

/// Adds dither noise right before output; the only effect allowed after
/// gamma compression. Cached by the chain so the executor can push the
/// real output width/height into it at render time (`spec.md` §4.6).
pub struct DitherEffect {
    pub num_bits: Cell<u32>,
    pub width: Cell<u32>,
    pub height: Cell<u32>,
}

impl DitherEffect {
    pub fn new(num_bits: u32) -> Self {
        DitherEffect { num_bits: Cell::new(num_bits), width: Cell::new(0), height: Cell::new(0) }
    }
}

impl Effect for DitherEffect {
    fn effect_type_id(&self) -> &'static str {
        "DitherEffect"
    }

    fn num_inputs(&self) -> usize {
        1
    }

    fn flags(&self) -> EffectFlags {
        EffectFlags::ONE_TO_ONE_SAMPLING
    }

    fn output_fragment_shader(&self) -> String {
        "vec4 FUNCNAME(vec2 tc) {\n\treturn PREFIX(add_dither)(INPUT(tc));\n}\n".to_string()
    }

    fn uniforms(&self) -> UniformDeclarations {
        let mut decl = UniformDeclarations::default();
        decl.ints.push(Uniform::scalar("num_bits", self.num_bits.get() as i32));
        decl
    }

    fn set_int(&self, key: &str, value: i32) -> bool {
        match key {
            "output_width" => {
                self.width.set(value as u32);
                true
            }
            "output_height" => {
                self.height.set(value as u32);
                true
            }
            _ => false,
        }
    }
}
