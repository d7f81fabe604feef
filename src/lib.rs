//! Graph compiler and phase partitioner for GPU image-processing
//! pipelines: build a graph of effects, call [`Chain::finalize`], and get
//! back a sequence of fused-shader [`Phase`]s ready to hand to your own
//! GPU backend through [`ResourcePool`].
//!
//! This crate never touches a GPU context itself (see [`pool`]); it only
//! decides *what* to render and in what order.

#[macro_use]
extern crate log;

pub mod builtin_effects;
pub mod dot;
pub mod effect;
pub mod error;
pub mod finish;
pub mod format;
pub mod graph;
pub mod partition;
pub mod pool;
pub mod propagate;
pub mod repair;
pub mod shader;
pub mod size;

pub use effect::Effect;
pub use error::{ChainError, PoolError};
pub use format::{
    AlphaType, ColorSpace, GammaCurve, ImageFormat, OutputAlphaFormat, OutputOrigin, PixelFormat, YCbCrFormat,
};
pub use graph::NodeId;
pub use partition::Phase;
pub use shader::CompiledShader;

use dot::DebugSink;
use graph::Graph;
use pool::ResourcePool;

/// The output format requested of a chain, passed to `finalize`. Y'CbCr
/// output and dither precision are configured separately through
/// `add_ycbcr_output`/`set_dither_bits` since they're optional on top of
/// this required base format.
pub struct OutputFormat {
    pub color_space: ColorSpace,
    pub gamma_curve: GammaCurve,
    pub alpha_format: OutputAlphaFormat,
}

/// A no-op placeholder swapped into a node's effect slot while that
/// node's real effect is temporarily taken out to call
/// `rewrite_graph(&mut Graph, ...)` on it without aliasing the graph it
/// lives in. Never observed by anything outside `Chain::rewrite_effects`.
struct PlaceholderEffect;

impl Effect for PlaceholderEffect {
    fn effect_type_id(&self) -> &'static str {
        "PlaceholderEffect"
    }

    fn num_inputs(&self) -> usize {
        0
    }

    fn output_fragment_shader(&self) -> String {
        String::new()
    }
}

/// The graph compiler. Build it up with `add_input`/`add_effect`, then
/// call `finalize` once; after that, `phases()` holds the fused shader
/// passes to execute in order.
pub struct Chain {
    graph: Graph,
    output_origin: format::OutputOrigin,
    finalized: bool,
    phases: Vec<Phase>,
    shaders: Vec<CompiledShader>,
    dither_bits: Option<u32>,
    ycbcr_output: Option<(YCbCrFormat, format::YCbCrOutputSplitting)>,
    aspect_nom: u32,
    aspect_denom: u32,
}

impl Chain {
    pub fn new() -> Chain {
        Chain {
            graph: Graph::new(),
            output_origin: format::OutputOrigin::BottomLeft,
            finalized: false,
            phases: Vec::new(),
            shaders: Vec::new(),
            dither_bits: None,
            ycbcr_output: None,
            aspect_nom: 1,
            aspect_denom: 1,
        }
    }

    /// Sets the nominal aspect ratio used to reconcile phases whose
    /// inputs disagree on size (`spec.md` §4.4's "fit each input's
    /// rectangle into the configured aspect ratio"). Defaults to 1:1.
    pub fn set_aspect_ratio(&mut self, nom: u32, denom: u32) {
        assert!(!self.finalized, "set_aspect_ratio called after finalize");
        self.aspect_nom = nom;
        self.aspect_denom = denom;
    }

    pub fn set_output_origin(&mut self, origin: format::OutputOrigin) {
        assert!(!self.finalized, "set_output_origin called after finalize");
        self.output_origin = origin;
    }

    /// Requests dithering to `num_bits` of output precision, applied as
    /// the very last step before the image leaves the chain.
    pub fn set_dither_bits(&mut self, num_bits: u32) {
        assert!(!self.finalized, "set_dither_bits called after finalize");
        self.dither_bits = Some(num_bits);
    }

    /// Requests Y'CbCr output instead of RGB(A), applied right before
    /// dithering. `splitting` controls how the final phase's fragment
    /// shader routes the result across output locations (`spec.md` §6):
    /// a single interleaved `FragColor`, `Y`/`Chroma`, or `Y`/`Cb`/`Cr`.
    pub fn add_ycbcr_output(&mut self, format: YCbCrFormat, splitting: format::YCbCrOutputSplitting) {
        assert!(!self.finalized, "add_ycbcr_output called after finalize");
        self.ycbcr_output = Some((format, splitting));
    }

    /// Registers a zero-input (texture-source) node.
    pub fn add_input(&mut self, effect: Box<dyn Effect>) -> NodeId {
        assert!(!self.finalized, "add_input called after finalize");
        self.graph.add_input(effect)
    }

    /// Registers an effect node fed by `parents`, in order.
    pub fn add_effect(&mut self, effect: Box<dyn Effect>, parents: &[NodeId]) -> NodeId {
        assert!(!self.finalized, "add_effect called after finalize");
        self.graph.add_effect(effect, parents)
    }

    pub fn node(&self, id: NodeId) -> &graph::Node {
        self.graph.node(id)
    }

    pub fn phases(&self) -> &[Phase] {
        &self.phases
    }

    pub fn shaders(&self) -> &[CompiledShader] {
        &self.shaders
    }

    /// Runs `rewrite_graph` on every node, including ones added by an
    /// earlier node's own rewrite (`spec.md` §4.3 step 1). Iterates by
    /// position rather than snapshotting the node list up front so
    /// newly-appended nodes are visited in the same pass.
    fn rewrite_effects(&mut self) {
        let mut i = 0;
        loop {
            let id = match self.graph.node_ids().nth(i) {
                Some(id) => id,
                None => break,
            };
            let effect = std::mem::replace(&mut self.graph.node_mut(id).effect, Box::new(PlaceholderEffect));
            effect.rewrite_graph(&mut self.graph, id);
            self.graph.node_mut(id).effect = effect;
            i += 1;
        }
    }

    /// Runs the full compile pipeline: graph self-expansion, attribute
    /// propagation, internal repair, output finishing, and phase
    /// partitioning with shader emission. Mirrors the step order in the
    /// original `EffectChain::finalize()` exactly, dumping a DOT snapshot
    /// through `debug_sink` after every step when one is given.
    pub fn finalize(
        &mut self,
        output: OutputFormat,
        mut debug_sink: Option<&mut dyn DebugSink>,
    ) -> Result<(), error::ChainError> {
        assert!(!self.finalized, "finalize called twice");

        macro_rules! dump {
            ($step:expr, $label:expr) => {
                dot::dump_step(&self.graph, debug_sink.as_deref_mut(), $step, $label);
            };
        }

        dump!("step0", "start");

        self.rewrite_effects();
        dump!("step1", "rewritten");

        propagate::seed_input_attributes(&mut self.graph);
        propagate::propagate_color_and_gamma(&mut self.graph);
        dump!("step2", "color-space");

        propagate::propagate_alpha(&mut self.graph);
        dump!("step3", "alpha");

        propagate::propagate_color_and_gamma(&mut self.graph);
        dump!("step4", "gamma");

        repair::fix_internal_color_spaces(&mut self.graph)?;
        repair::fix_internal_alpha(&mut self.graph)?;

        let terminal = repair::fix_output_color_space(&mut self.graph, output.color_space);
        dump!("step7", "output-color-space");

        let terminal = repair::fix_output_alpha(&mut self.graph, terminal, output.alpha_format);
        dump!("step8", "output-alpha");

        repair::fix_internal_gamma_by_asking_inputs(&mut self.graph)?;
        repair::fix_internal_gamma_by_inserting_nodes(&mut self.graph)?;

        let spec = finish::OutputSpec {
            color_space: output.color_space,
            gamma_curve: output.gamma_curve,
            alpha_format: output.alpha_format,
            ycbcr_format: self.ycbcr_output.map(|(format, _)| format),
            dither_bits: self.dither_bits,
        };
        let _ = terminal;
        finish::finish_output(&mut self.graph, &spec);
        dump!("step11", "output-gamma");

        propagate::propagate_alpha(&mut self.graph);
        repair::fix_internal_alpha(&mut self.graph)?;
        dump!("step14", "alpha-again");

        repair::fix_internal_gamma_by_asking_inputs(&mut self.graph)?;
        repair::fix_internal_gamma_by_inserting_nodes(&mut self.graph)?;

        dump!("step19", "final");

        self.phases = partition::construct_phases(&mut self.graph);
        dump!("step20", "split-to-phases");

        assert!(self.phases[0].inputs.is_empty(), "the first constructed phase must be a source phase");

        let ycbcr_splitting = self.ycbcr_output.map(|(_, splitting)| splitting);
        let flip_origin = self.output_origin == format::OutputOrigin::TopLeft;
        self.shaders = self
            .phases
            .iter()
            .enumerate()
            .map(|(i, phase)| {
                let is_final = self.graph.node(phase.output_node).outgoing().is_empty();
                let final_output = is_final.then(|| shader::FinalPhaseOutput {
                    ycbcr_splitting,
                    also_output_rgba: false,
                    flip_origin,
                });
                shader::compile_phase(&self.graph, phase, i, final_output)
            })
            .collect();

        self.finalized = true;
        Ok(())
    }

    /// Runs the execute-time size-inference pass (`spec.md` §4.4):
    /// propagates concrete texture sizes through every phase and
    /// computes each phase's real and virtual output size. Call once
    /// finalize has produced the phase list and before reading
    /// `Phase::output_width`/`output_height`; re-run per frame if any
    /// input's intrinsic size can change.
    pub fn infer_sizes(&mut self) {
        assert!(self.finalized, "infer_sizes called before finalize");
        size::infer_phase_sizes(&mut self.graph, &mut self.phases, self.aspect_nom, self.aspect_denom);
    }

    /// Compiles every phase's shader into a GPU program through `pool`,
    /// in phase order. Actually executing the draw calls against real
    /// framebuffers/textures is the caller's job: this crate stops at
    /// handing back linked programs plus the `Phase`/`CompiledShader`
    /// metadata describing how to wire their inputs and uniforms
    /// together.
    pub fn render_to_fbo<P: ResourcePool>(&self, pool: &mut P) -> Result<Vec<P::Program>, error::ChainError> {
        assert!(self.finalized, "render_to_fbo called before finalize");
        self.shaders
            .iter()
            .enumerate()
            .map(|(i, shader)| {
                pool.compile_program(i, &shader.fragment_shader, &shader.vertex_shader).map_err(error::ChainError::Pool)
            })
            .collect()
    }
}

impl Default for Chain {
    fn default() -> Chain {
        Chain::new()
    }
}
