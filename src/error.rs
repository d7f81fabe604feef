//! Error types for the one real fallible boundary in the crate: the
//! opaque GPU resource pool. Everything else is a programmer-contract
//! violation and panics (see module docs on `graph` and `repair`).

use std::error;
use std::fmt;

/// An error surfaced by the [`crate::pool::ResourcePool`] the chain was
/// compiled/executed against (shader link failure, uniform query
/// failure, allocation failure). The core treats all of these as fatal:
/// there is no partial-failure recovery path once `finalize` or
/// `render_to_fbo` has begun.
#[derive(Debug)]
pub enum PoolError {
    /// Compiling or linking a phase's GLSL program failed.
    ShaderCompile { phase_index: usize, message: String },
    /// A uniform or attribute the shader emitter expected was not found
    /// after linking.
    MissingUniform { phase_index: usize, name: String },
    /// Acquiring a texture, framebuffer or program handle from the pool
    /// failed (e.g. the pool is exhausted or the driver rejected the
    /// request).
    Allocation(String),
}

impl fmt::Display for PoolError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PoolError::ShaderCompile { phase_index, message } => {
                write!(f, "phase {}: shader compile failed: {}", phase_index, message)
            }
            PoolError::MissingUniform { phase_index, name } => {
                write!(f, "phase {}: missing uniform/attribute '{}' after link", phase_index, name)
            }
            PoolError::Allocation(message) => write!(f, "resource pool allocation failed: {}", message),
        }
    }
}

impl error::Error for PoolError {}

/// Top-level error type returned from [`crate::Chain::finalize`] and
/// [`crate::Chain::compile_programs`]. The only variant that isn't a pool
/// error is [`ChainError::Runaway`], the compiler-runaway case in §7:
/// a repair fixed point failed to converge within the iteration cap.
#[derive(Debug)]
pub enum ChainError {
    Pool(PoolError),
    /// A repair fixed point (colorspace, alpha or gamma) did not
    /// converge within the 100-iteration cap. This indicates a
    /// pathological or malformed graph, not a transient condition.
    Runaway { pass: &'static str, iterations: u32 },
}

impl fmt::Display for ChainError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ChainError::Pool(e) => write!(f, "{}", e),
            ChainError::Runaway { pass, iterations } => {
                write!(f, "repair pass '{}' did not converge after {} iterations", pass, iterations)
            }
        }
    }
}

impl error::Error for ChainError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            ChainError::Pool(e) => Some(e),
            ChainError::Runaway { .. } => None,
        }
    }
}

impl From<PoolError> for ChainError {
    fn from(e: PoolError) -> Self {
        ChainError::Pool(e)
    }
}
