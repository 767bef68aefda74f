/// Convenience result type used across gefx.
pub type GefxResult<T> = Result<T, GefxError>;

/// Top-level error taxonomy used by engine APIs.
#[derive(thiserror::Error, Debug)]
pub enum GefxError {
    /// Invalid configuration or caller-provided data.
    #[error("validation error: {0}")]
    Validation(String),

    /// The device memory arena could not satisfy an allocation.
    #[error("out of device memory: requested {requested} bytes ({available} available)")]
    OutOfMemory {
        /// Aligned size that was requested.
        requested: usize,
        /// Bytes still available in the arena.
        available: usize,
    },

    /// CPU access to a buffer that an emitted compositing op still references.
    #[error("buffer busy: {0}")]
    BufferBusy(String),

    /// A buffer handle or address does not resolve to a live allocation.
    #[error("invalid buffer: {0}")]
    InvalidBuffer(String),

    /// A compositing op was rejected or failed during execution.
    #[error("invalid compositing op: {0}")]
    InvalidOp(String),

    /// Frame-buffer or graphics-engine device failure.
    #[error("device error: {0}")]
    Device(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl GefxError {
    /// Build a [`GefxError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`GefxError::BufferBusy`] value.
    pub fn busy(msg: impl Into<String>) -> Self {
        Self::BufferBusy(msg.into())
    }

    /// Build a [`GefxError::InvalidBuffer`] value.
    pub fn invalid_buffer(msg: impl Into<String>) -> Self {
        Self::InvalidBuffer(msg.into())
    }

    /// Build a [`GefxError::InvalidOp`] value.
    pub fn invalid_op(msg: impl Into<String>) -> Self {
        Self::InvalidOp(msg.into())
    }

    /// Build a [`GefxError::Device`] value.
    pub fn device(msg: impl Into<String>) -> Self {
        Self::Device(msg.into())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
