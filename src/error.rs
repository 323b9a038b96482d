use thiserror::Error;

use crate::emitter::EmitterHandle;

/// Structural faults reported to callers of the particle system.
///
/// Per-particle numerical problems never surface here; they are clamped
/// or zeroed inside the frame pipeline.
#[derive(Error, Debug)]
pub enum ParticleError {
    #[error("Invalid descriptor: {reason}")]
    InvalidDescriptor { reason: String },

    #[error("Unknown emitter handle {0:?}")]
    UnknownEmitter(EmitterHandle),

    #[error("Force field index {index} out of range (len {len})")]
    ForceFieldOutOfRange { index: usize, len: usize },

    #[error("Collision plane normal is zero-length or not finite")]
    DegeneratePlane,

    #[error("Failed to encode render instances: {0}")]
    Encode(#[from] encase::internal::Error),
}

impl ParticleError {
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidDescriptor {
            reason: reason.into(),
        }
    }
}

pub type Result<T, E = ParticleError> = std::result::Result<T, E>;
