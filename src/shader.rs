//! The Shader Emitter (`spec.md` §4.5): turns one `Phase` into a single
//! GLSL fragment shader (plus a small vertex shader patch) by textually
//! composing each effect's `output_fragment_shader()` output. Grounded
//! on `compile_glsl_program` in the original Movit source: the
//! `PREFIX`/`FUNCNAME`/`INPUT` rewriting, the per-effect `#define`
//! scoping, the uniform-collection-into-one-block scheme, the Y'CbCr
//! output-routing `#define`s and the compile-time `FLIP_ORIGIN` patch
//! are all copied from there rather than invented.

use crate::effect::{Uniform, UniformDeclarations};
use crate::format::YCbCrOutputSplitting;
use crate::graph::{Graph, NodeId};
use crate::partition::Phase;

/// A fully emitted phase: fragment shader, vertex shader, and every
/// uniform the phase's effects declared, already prefixed with their
/// owning effect's generated identifier (`eff0_`, `eff1_`, ...).
pub struct CompiledShader {
    pub fragment_shader: String,
    pub vertex_shader: String,
    pub uniforms: UniformDeclarations,
}

/// Output-routing parameters that only apply to the phase with no
/// outgoing edges (`spec.md` §4.5 steps 6 and 9): which extra output
/// locations/macros the fragment shader declares, and whether the
/// vertex shader needs to flip the sampled origin. `None` for every
/// other phase.
///
/// `also_output_rgba` mirrors `output_color_rgba` in the original
/// (`effect_chain.cpp:419`), which lets a chain emit Y'CbCr and RGBA
/// side by side from the same phase. Nothing in this crate's `Chain`
/// API can request that combination today (a chain finalizes into a
/// single `OutputFormat`), so `Chain` always passes `false`; the field
/// stays so a future dual-output entry point doesn't need to touch the
/// emitter.
#[derive(Clone, Copy)]
pub struct FinalPhaseOutput {
    pub ycbcr_splitting: Option<YCbCrOutputSplitting>,
    pub also_output_rgba: bool,
    pub flip_origin: bool,
}

const VERTEX_SHADER_TEMPLATE: &str = "#version 130\n\
#define FLIP_ORIGIN 0\n\
in vec2 position;\n\
in vec2 texcoord;\n\
out vec2 tc0;\n\
void main() {\n\
\tgl_Position = vec4(position, 0.0, 1.0);\n\
#if FLIP_ORIGIN\n\
\ttc0 = vec2(texcoord.x, 1.0 - texcoord.y);\n\
#else\n\
\ttc0 = texcoord;\n\
#endif\n\
}\n";

/// Patches the vertex shader template's `#define FLIP_ORIGIN 0` literal
/// to `1` at compile time. Grounded on the `needle`/`find` patch in
/// `compile_glsl_program` (`effect_chain.cpp:470-476`) rather than a
/// runtime uniform: origin flipping never varies per draw call, only
/// per chain configuration.
fn vertex_shader(flip_origin: bool) -> String {
    if flip_origin {
        VERTEX_SHADER_TEMPLATE.replacen("#define FLIP_ORIGIN 0", "#define FLIP_ORIGIN 1", 1)
    } else {
        VERTEX_SHADER_TEMPLATE.to_string()
    }
}

/// Rewrites every `PREFIX(name)` call site in `source` to `prefixN_name`,
/// by hand-scanning for the balanced parenthesis rather than reaching
/// for a regex (matching the teacher's own hand-written GLSL scanning in
/// `backend_gl/src/shader/preprocessor.rs`). `PREFIX(` can itself appear
/// nested inside the argument of another `PREFIX(` invocation through a
/// macro expansion, so this tracks paren depth rather than just matching
/// up to the next `)`.
fn rewrite_prefix_calls(source: &str, prefix: &str) -> String {
    let bytes = source.as_bytes();
    let mut out = String::with_capacity(source.len());
    let mut i = 0;
    while i < bytes.len() {
        if source[i..].starts_with("PREFIX(") {
            let open = i + "PREFIX(".len() - 1;
            let mut depth = 1;
            let mut j = open + 1;
            while j < bytes.len() && depth > 0 {
                match bytes[j] {
                    b'(' => depth += 1,
                    b')' => depth -= 1,
                    _ => {}
                }
                j += 1;
            }
            let name = &source[open + 1..j - 1];
            out.push_str(prefix);
            out.push('_');
            out.push_str(name);
            i = j;
        } else {
            out.push(bytes[i] as char);
            i += 1;
        }
    }
    out
}

fn uniform_prefix(effect_index: usize) -> String {
    format!("eff{}", effect_index)
}

/// Appends one `uniform <type> name;` (or `name[n];` for arrays) per
/// declaration directly to `out`. Used for samplers, which stay outside
/// the `MovitUniforms` block.
fn push_uniform_decls<T>(decls: &[Uniform<T>], glsl_type: &str, prefix: &str, out: &mut String) {
    for uniform in decls {
        if uniform.is_array() {
            out.push_str(&format!(
                "uniform {} {}_{}[{}];\n",
                glsl_type,
                prefix,
                uniform.name,
                uniform.values.len()
            ));
        } else {
            out.push_str(&format!("uniform {} {}_{};\n", glsl_type, prefix, uniform.name));
        }
    }
}

/// Same shape as `push_uniform_decls`, but without the `uniform` keyword
/// (the caller wraps the whole accumulated block in one `uniform
/// MovitUniforms { ... };`).
fn push_block_member_decls<T>(decls: &[Uniform<T>], glsl_type: &str, prefix: &str, out: &mut String) {
    for uniform in decls {
        if uniform.is_array() {
            out.push_str(&format!("{} {}_{}[{}];\n", glsl_type, prefix, uniform.name, uniform.values.len()));
        } else {
            out.push_str(&format!("{} {}_{};\n", glsl_type, prefix, uniform.name));
        }
    }
}

/// Emits the fragment shader body, sampler functions and uniform
/// declarations for one phase. Grounded on the per-phase loop in
/// `compile_glsl_program`. `final_output` is `Some` only for the phase
/// with no outgoing edges, and carries the Y'CbCr output-routing and
/// origin-flip parameters that only that phase's shader cares about.
pub fn compile_phase(graph: &Graph, phase: &Phase, phase_index: usize, final_output: Option<FinalPhaseOutput>) -> CompiledShader {
    let _ = phase_index;

    let mut header = String::new();
    header.push_str("#version 130\n");
    // Needs to come in the header: not just the output routing below but
    // also YCbCrConversionEffect/DitherEffect's own shader text may test
    // for this macro (`effect_chain.cpp:419-423`).
    if final_output.map_or(false, |f| f.also_output_rgba) {
        header.push_str("#define YCBCR_ALSO_OUTPUT_RGBA 1\n");
    }
    header.push_str("in vec2 tc0;\n");
    push_output_declarations(&mut header, final_output);
    header.push('\n');

    let mut body = String::new();
    // One sampler function per input phase: tex_in<i> is the raw sampler
    // uniform, in<i>(tc) is what effect code actually calls.
    for (i, _input_phase) in phase.inputs.iter().enumerate() {
        body.push_str(&format!("uniform sampler2D tex_in{};\n", i));
        body.push_str(&format!(
            "vec4 in{}(vec2 tc) {{\n\treturn texture(tex_in{}, tc);\n}}\n\n",
            i, i
        ));
    }

    let mut uniforms = UniformDeclarations::default();
    let mut block_members = String::new();
    let mut sampler_decls = String::new();
    let mut last_funcname = String::new();

    for (effect_index, &node_id) in phase.effects.iter().enumerate() {
        let node = graph.node(node_id);
        let prefix = uniform_prefix(effect_index);
        let funcname = format!("eff{}", effect_index);

        let raw = node.effect.output_fragment_shader();
        let rewritten = rewrite_prefix_calls(&raw, &prefix);
        let rewritten = rewritten.replace("FUNCNAME", &funcname);

        // #define INPUT(tc) to whatever this effect's single input
        // resolves to: either the previous effect in the phase, or an
        // input-phase sampler function if this effect has no
        // upstream-in-phase producer.
        let incoming = node.incoming();
        if incoming.len() == 1 {
            let source = input_reference(graph, phase, incoming[0], &last_funcname);
            body.push_str(&format!("#define INPUT {}\n", source));
        } else {
            for (k, &input) in incoming.iter().enumerate() {
                let source = input_reference(graph, phase, input, &last_funcname);
                body.push_str(&format!("#define INPUT{} {}\n", k + 1, source));
            }
        }

        // Collected after output_fragment_shader() runs, even though the
        // declarations precede it in the emitted source, since an effect
        // is allowed to register uniforms only known at this point (e.g.
        // array lengths) (`effect_chain.cpp:429-433`).
        let decl = node.effect.uniforms();
        push_block_member_decls(&decl.bools, "bool", &prefix, &mut block_members);
        push_block_member_decls(&decl.ints, "int", &prefix, &mut block_members);
        push_block_member_decls(&decl.floats, "float", &prefix, &mut block_members);
        push_block_member_decls(&decl.vec2, "vec2", &prefix, &mut block_members);
        push_block_member_decls(&decl.vec3, "vec3", &prefix, &mut block_members);
        push_block_member_decls(&decl.vec4, "vec4", &prefix, &mut block_members);
        push_block_member_decls(&decl.mat3, "mat3", &prefix, &mut block_members);
        push_uniform_decls(&decl.samplers, "sampler2D", &prefix, &mut sampler_decls);
        merge_prefixed(&mut uniforms, &decl, &prefix);

        body.push('\n');
        body.push_str(&rewritten);
        body.push('\n');

        if incoming.len() == 1 {
            body.push_str("#undef INPUT\n");
        } else {
            for k in 0..incoming.len() {
                body.push_str(&format!("#undef INPUT{}\n", k + 1));
            }
        }

        last_funcname = funcname;
    }

    // Samplers must be outside the UBO block (`effect_chain.cpp:456-462`).
    let mut uniform_section = String::new();
    if !block_members.is_empty() {
        uniform_section.push_str("layout(packed) uniform MovitUniforms {\n");
        uniform_section.push_str(&block_members);
        uniform_section.push_str("};\n");
    }
    uniform_section.push_str(&sampler_decls);

    // If this is the final phase and Y'CbCr output was requested, the
    // output-routing #defines go right after the effect bodies and
    // before the dispatch in main() (`effect_chain.cpp:396-426`).
    if let Some(splitting) = final_output.and_then(|f| f.ycbcr_splitting) {
        match splitting {
            YCbCrOutputSplitting::Interleaved => {}
            YCbCrOutputSplitting::SplitYAndCbCr => body.push_str("#define YCBCR_OUTPUT_SPLIT_Y_AND_CBCR 1\n"),
            YCbCrOutputSplitting::Planar => body.push_str("#define YCBCR_OUTPUT_PLANAR 1\n"),
        }
    }

    push_main(&mut body, &last_funcname, final_output);

    let fragment = format!("{}{}{}", header, uniform_section, body);
    let flip_origin = final_output.map_or(false, |f| f.flip_origin);

    CompiledShader { fragment_shader: fragment, vertex_shader: vertex_shader(flip_origin), uniforms }
}

/// Declares the fragment output locations this phase's shader writes to:
/// `FragColor` for any non-final phase or interleaved/no Y'CbCr output,
/// `Y`/`Chroma` or `Y`/`Cb`/`Cr` for the two split Y'CbCr modes,
/// optionally extended with `RGBA`. Grounded on the `frag_shader_outputs`
/// construction in `compile_glsl_program` (`effect_chain.cpp:397-425`).
fn push_output_declarations(out: &mut String, final_output: Option<FinalPhaseOutput>) {
    let also_rgba = final_output.map_or(false, |f| f.also_output_rgba);
    match final_output.and_then(|f| f.ycbcr_splitting) {
        None | Some(YCbCrOutputSplitting::Interleaved) => {
            out.push_str("out vec4 FragColor;\n");
        }
        Some(YCbCrOutputSplitting::SplitYAndCbCr) => {
            out.push_str("out float Y;\n");
            out.push_str("out vec2 Chroma;\n");
        }
        Some(YCbCrOutputSplitting::Planar) => {
            out.push_str("out float Y;\n");
            out.push_str("out float Cb;\n");
            out.push_str("out float Cr;\n");
        }
    }
    if also_rgba && final_output.and_then(|f| f.ycbcr_splitting).is_some() {
        out.push_str("out vec4 RGBA;\n");
    }
}

/// Emits `main()`, dispatching to the last effect's function and routing
/// its result to whichever output locations `push_output_declarations`
/// declared.
fn push_main(out: &mut String, last_funcname: &str, final_output: Option<FinalPhaseOutput>) {
    match final_output.and_then(|f| f.ycbcr_splitting) {
        None | Some(YCbCrOutputSplitting::Interleaved) => {
            out.push_str(&format!("\nvoid main() {{\n\tFragColor = {}(tc0);\n}}\n", last_funcname));
        }
        Some(YCbCrOutputSplitting::SplitYAndCbCr) => {
            out.push_str(&format!(
                "\nvoid main() {{\n\tvec4 color = {}(tc0);\n\tY = color.x;\n\tChroma = color.yz;\n}}\n",
                last_funcname
            ));
        }
        Some(YCbCrOutputSplitting::Planar) => {
            out.push_str(&format!(
                "\nvoid main() {{\n\tvec4 color = {}(tc0);\n\tY = color.x;\n\tCb = color.y;\n\tCr = color.z;\n}}\n",
                last_funcname
            ));
        }
    }
}

/// Resolves what `INPUT`/`INPUTn` should expand to for a given incoming
/// node: the previous effect's function call if it's fused into this
/// same phase, or the matching input-phase sampler function otherwise.
fn input_reference(graph: &Graph, phase: &Phase, input: NodeId, last_funcname: &str) -> String {
    if let Some(pos) = phase.effects.iter().position(|&id| id == input) {
        let funcname = format!("eff{}", pos);
        return format!("{}(tc)", funcname);
    }
    let input_phase_index = graph.node(input).containing_phase.expect("input node has no assigned phase");
    let slot = phase
        .inputs
        .iter()
        .position(|&p| p == input_phase_index)
        .expect("input phase not registered in this phase's inputs");
    let _ = last_funcname;
    format!("in{}(tc)", slot)
}

fn merge_prefixed(into: &mut UniformDeclarations, from: &UniformDeclarations, prefix: &str) {
    for u in &from.bools {
        into.bools.push(Uniform { name: format!("{}_{}", prefix, u.name), values: u.values.clone() });
    }
    for u in &from.ints {
        into.ints.push(Uniform { name: format!("{}_{}", prefix, u.name), values: u.values.clone() });
    }
    for u in &from.floats {
        into.floats.push(Uniform { name: format!("{}_{}", prefix, u.name), values: u.values.clone() });
    }
    for u in &from.vec2 {
        into.vec2.push(Uniform { name: format!("{}_{}", prefix, u.name), values: u.values.clone() });
    }
    for u in &from.vec3 {
        into.vec3.push(Uniform { name: format!("{}_{}", prefix, u.name), values: u.values.clone() });
    }
    for u in &from.vec4 {
        into.vec4.push(Uniform { name: format!("{}_{}", prefix, u.name), values: u.values.clone() });
    }
    for u in &from.mat3 {
        into.mat3.push(Uniform { name: format!("{}_{}", prefix, u.name), values: u.values.clone() });
    }
    for u in &from.samplers {
        into.samplers.push(Uniform { name: format!("{}_{}", prefix, u.name), values: u.values.clone() });
    }
}
