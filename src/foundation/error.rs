/// Crate-wide result alias.
pub type BatchAugResult<T> = Result<T, BatchAugError>;

/// Errors produced by the decode and paste stages.
///
/// Per-sample variants carry the index of the sample within its batch so the caller can tell
/// which image failed without inspecting the message.
#[derive(thiserror::Error, Debug)]
pub enum BatchAugError {
    /// Invalid construction-time arguments. Reported before any batch runs.
    #[error("configuration error: {0}")]
    Config(String),

    /// A crop window or paste placement violates its containment bounds.
    #[error("geometry error (sample {sample}): {message}")]
    Geometry {
        /// Index of the offending sample in the batch.
        sample: usize,
        /// Human-readable description of the violated bound.
        message: String,
    },

    /// The compressed bitstream for one sample could not be parsed or decoded.
    #[error("decode error (sample {sample}): {message}")]
    Decode {
        /// Index of the offending sample in the batch.
        sample: usize,
        /// Codec-provided description.
        message: String,
    },

    /// Allocation, transfer, or dispatch failure. Fatal for the current batch.
    #[error("device error: {0}")]
    Device(String),

    /// Foreign error wrapped with context.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl BatchAugError {
    /// Build a [`BatchAugError::Config`].
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Build a [`BatchAugError::Geometry`] for `sample`.
    pub fn geometry(sample: usize, msg: impl Into<String>) -> Self {
        Self::Geometry {
            sample,
            message: msg.into(),
        }
    }

    /// Build a [`BatchAugError::Decode`] for `sample`.
    pub fn decode(sample: usize, msg: impl Into<String>) -> Self {
        Self::Decode {
            sample,
            message: msg.into(),
        }
    }

    /// Build a [`BatchAugError::Device`].
    pub fn device(msg: impl Into<String>) -> Self {
        Self::Device(msg.into())
    }

    /// Sample index for per-sample errors, `None` for batch-wide ones.
    pub fn sample(&self) -> Option<usize> {
        match self {
            Self::Geometry { sample, .. } | Self::Decode { sample, .. } => Some(*sample),
            Self::Config(_) | Self::Device(_) | Self::Other(_) => None,
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
