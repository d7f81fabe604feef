//! The external-collaborator boundary (`spec.md` §6): this crate compiles
//! phases down to shader source and uniform layouts, but never touches a
//! GPU context itself. Callers plug in their own program cache and
//! texture pool through these traits. Grounded on `RendererBackend` in
//! the teacher's `renderer/src/traits.rs`, which draws the same line
//! between "decides what to render" and "owns the GPU resources".

use crate::error::PoolError;

/// An opaque handle to a compiled, linked shader program, as returned by
/// a `ResourcePool`. This crate never inspects it; it's handed back
/// verbatim to whichever executor renders the phase.
pub trait CompiledProgram {
    /// Implementation-defined identity check, used only so a chain can
    /// tell whether a cached program handle is still the one it expects.
    fn program_id(&self) -> u64;
}

/// Resource ownership boundary: allocating programs and intermediate
/// textures is the caller's job. Every method can fail (shader
/// compilation, out-of-memory) and returns `PoolError`, which is the
/// only place in this crate's public API a `Result` appears for
/// anything other than the runaway-repair case.
pub trait ResourcePool {
    type Program: CompiledProgram;

    /// Compiles and links `fragment_shader`/`vertex_shader` into a
    /// program, caching by source so repeated `finalize()` runs over an
    /// unchanged graph don't recompile.
    fn compile_program(
        &mut self,
        phase_index: usize,
        fragment_shader: &str,
        vertex_shader: &str,
    ) -> Result<Self::Program, PoolError>;

    /// Allocates (or reuses from a free list) an intermediate texture to
    /// hold one phase's bounced output.
    fn allocate_intermediate(&mut self, width: u32, height: u32) -> Result<u32, PoolError>;

    fn release_intermediate(&mut self, texture: u32);
}
