use thiserror::Error;

use crate::animation::AnimState;

/// Failures that can only happen while setting the pet up.
#[derive(Debug, Error)]
pub enum PetError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Config(#[from] ron::error::SpannedError),

    #[error("character dimensions must be positive, got {width}x{height}")]
    InvalidDimensions { width: f32, height: f32 },

    #[error("no sprite frames for state {state:?}")]
    NoFrames { state: AnimState },
}
