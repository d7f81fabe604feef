//! The Effect Interface (`spec.md` §4.1): the opaque contract every
//! node's underlying operation satisfies. Concrete effects (blurs, color
//! grades, resamplers, ...) are external collaborators; this crate only
//! consumes `dyn Effect`, plus the handful of conversion effects in
//! [`crate::builtin_effects`] that the core recognizes by
//! `effect_type_id()`.

use bitflags::bitflags;
use smallvec::SmallVec;

use crate::format::{ColorSpace, GammaCurve};
use crate::graph::{Graph, NodeId};

bitflags! {
    /// Capability flags an effect declares about itself. Named after the
    /// predicates `spec.md` §4.1 lists (`needs-texture-bounce`,
    /// `needs-mipmaps`, ...); grouped into a `bitflags!` set the way the
    /// teacher groups renderer capability bits (see
    /// `backend_gl/src/descriptor.rs`'s flag sets).
    #[derive(Default)]
    pub struct EffectFlags: u32 {
        /// This effect cannot sample its own input inline within the
        /// same shader pass (e.g. it needs real texture-filtering
        /// hardware, not just an inlined function call): that input must
        /// already live in a texture, so the phase boundary falls
        /// between this effect and its input rather than after it.
        const NEEDS_TEXTURE_BOUNCE    = 1 << 0;
        /// This effect requires mipmaps on its input(s). Whether an
        /// input can actually supply them is asked for separately,
        /// through `Effect::can_supply_mipmaps` (only meaningful for
        /// zero-input effects).
        const NEEDS_MIPMAPS           = 1 << 1;
        /// A zero-input effect that merely exposes a texture; safe to
        /// sample many times without a bounce.
        const IS_SINGLE_TEXTURE       = 1 << 2;
        /// This effect's output resolution differs from its input(s).
        const CHANGES_OUTPUT_SIZE     = 1 << 3;
        /// This effect declares a virtual (not-really-rendered)
        /// resolution distinct from its actual output, to piggyback on
        /// bilinear sampling. Implies `CHANGES_OUTPUT_SIZE`.
        const SETS_VIRTUAL_OUTPUT_SIZE = 1 << 4;
        /// This effect samples exactly one texel per output pixel at
        /// matching coordinates.
        const ONE_TO_ONE_SAMPLING     = 1 << 5;
        /// This effect requires sRGB-primary inputs.
        const NEEDS_SRGB_PRIMARIES    = 1 << 6;
        /// This effect requires linear-light inputs.
        const NEEDS_LINEAR_LIGHT      = 1 << 7;
        /// A single-texture source that should never be bounced, even
        /// if a consumer asks for a bounce (the source already lives in
        /// a texture; bouncing it would just be a copy).
        const OVERRIDE_DISABLE_BOUNCE = 1 << 8;
    }
}

/// How an effect handles the alpha channel. Only zero-input effects may
/// declare `OutputBlankAlpha` or `OutputPostmultiplied` (`spec.md` §3).
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum AlphaHandling {
    /// Zero-input only: this effect always produces blank alpha.
    OutputBlankAlpha,
    /// Requires premultiplied input(s) and produces premultiplied output.
    InputAndOutputPremultiplied,
    /// Requires premultiplied input but passes blank alpha through
    /// unchanged if the input was blank.
    InputPremultipliedKeepBlank,
    /// Zero-input only: this effect always produces postmultiplied
    /// output.
    OutputPostmultiplied,
    /// Passes whatever alpha convention its input(s) use straight
    /// through (inputs must agree).
    DontCare,
}

/// A single named uniform value of type `T`, as declared by an effect.
/// `values` holds more than one element only for array uniforms.
/// Collected per-phase by the shader emitter and prefixed with the
/// owning effect's generated identifier.
#[derive(Clone, Debug)]
pub struct Uniform<T> {
    pub name: String,
    pub values: SmallVec<[T; 1]>,
}

impl<T> Uniform<T> {
    pub fn scalar(name: impl Into<String>, value: T) -> Self {
        Uniform { name: name.into(), values: SmallVec::from_elem(value, 1) }
    }

    pub fn array(name: impl Into<String>, values: impl IntoIterator<Item = T>) -> Self {
        Uniform { name: name.into(), values: values.into_iter().collect() }
    }

    pub fn is_array(&self) -> bool {
        self.values.len() > 1
    }
}

/// All uniform declarations an effect contributes to a phase's shader,
/// split by GLSL type the way `compile_glsl_program` collects them in
/// the original (`uniforms_bool`, `uniforms_int`, ... in
/// `examples/original_source/effect_chain.cpp`).
#[derive(Clone, Debug, Default)]
pub struct UniformDeclarations {
    pub bools: Vec<Uniform<bool>>,
    pub ints: Vec<Uniform<i32>>,
    pub floats: Vec<Uniform<f32>>,
    pub vec2: Vec<Uniform<[f32; 2]>>,
    pub vec3: Vec<Uniform<[f32; 3]>>,
    pub vec4: Vec<Uniform<[f32; 4]>>,
    pub mat3: Vec<Uniform<[f32; 9]>>,
    /// Sampler uniforms live outside the `MovitUniforms`-style UBO block.
    pub samplers: Vec<Uniform<i32>>,
}

/// The size an effect reports for a given set of input sizes, used by
/// the partitioner's size-inference pass (`spec.md` §4.4).
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct EffectSize {
    pub width: u32,
    pub height: u32,
}

/// The opaque per-node operation every graph node wraps. Implemented by
/// external collaborators (blur, resample, color grade, ...); the core
/// only calls through this trait.
pub trait Effect {
    /// Stable identifier. A handful of values are recognized by the
    /// core: `"ColorspaceConversionEffect"`, `"GammaExpansionEffect"`,
    /// `"GammaCompressionEffect"`, `"AlphaMultiplicationEffect"`,
    /// `"AlphaDivisionEffect"`, `"YCbCrConversionEffect"`, `"DitherEffect"`.
    fn effect_type_id(&self) -> &'static str;

    /// Number of graph inputs this effect consumes. Zero means this is
    /// an input/texture-source effect.
    fn num_inputs(&self) -> usize;

    fn flags(&self) -> EffectFlags {
        EffectFlags::empty()
    }

    fn alpha_handling(&self) -> AlphaHandling {
        AlphaHandling::DontCare
    }

    /// Only meaningful for zero-input effects: the format the input
    /// delivers, used to seed color space / gamma propagation.
    fn input_color_space(&self) -> ColorSpace {
        ColorSpace::Invalid
    }

    fn input_gamma_curve(&self) -> GammaCurve {
        GammaCurve::Invalid
    }

    /// Only meaningful for zero-input effects that can optionally
    /// deliver linear-light output: whether this input is *able* to
    /// (asked by the gamma repair's "ask inputs first" phase).
    fn can_output_linear_gamma(&self) -> bool {
        false
    }

    /// Only meaningful for zero-input effects: whether this input can
    /// supply mipmaps to a consumer that needs them.
    fn can_supply_mipmaps(&self) -> bool {
        false
    }

    /// Only meaningful for zero-input effects: the texture's intrinsic
    /// size, used to seed the size-inference pass (`spec.md` §4.4).
    fn input_size(&self) -> Option<EffectSize> {
        None
    }

    /// Called once per input, in order, during size inference, so an
    /// effect that needs to know an individual input's size (rather than
    /// just the agreed-upon size of all of them) can record it.
    fn inform_input_size(&self, _input_index: usize, _size: EffectSize) {}

    /// Fragment shader fragment text with `PREFIX(name)` call sites and
    /// a function named `FUNCNAME` consuming `INPUT`/`INPUT1..INPUTn`.
    fn output_fragment_shader(&self) -> String;

    /// Uniform declarations for this effect, collected into the owning
    /// phase's shader. May be called again after
    /// `output_fragment_shader` (some effects only know array lengths at
    /// finalize time).
    fn uniforms(&self) -> UniformDeclarations {
        UniformDeclarations::default()
    }

    /// If `flags()` includes `CHANGES_OUTPUT_SIZE`, asks the effect for
    /// its output size given its inputs' sizes.
    fn output_size(&self, _input_sizes: &[EffectSize]) -> Option<EffectSize> {
        None
    }

    /// Per-frame uniform/state update hook, called by the executor
    /// (external collaborator) before a draw call. Default no-op: most
    /// effects in this crate's own test suite are stateless.
    fn set_gl_state(&self) {}

    fn clear_gl_state(&self) {}

    /// Configuration channel used by the core to push derived state back
    /// into an effect (`"needs_mipmaps"`, `"output_linear_gamma"`, and
    /// arbitrary effect-specific keys used by `rewrite_graph`
    /// implementations). Returns `false` if the effect doesn't recognize
    /// the key (a programmer error at the call site, per §7).
    fn set_int(&self, _key: &str, _value: i32) -> bool {
        false
    }

    /// Optional self-expansion hook, run once per node during
    /// `finalize`'s first pipeline step. Most effects don't override
    /// this; note that newly-added nodes are visited in the same pass
    /// (`spec.md` §4.3 step 1).
    fn rewrite_graph(&self, _graph: &mut Graph, _self_id: NodeId) {}
}
