use thiserror::Error;

/// Errors produced while building masks or compositing a frame
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ComposeError {
    /// Empty buffer, unsupported channel layout, or malformed sample data
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Mask and source sizes differ while resampling is forbidden
    #[error("mask is {mask_width}x{mask_height} but source is {width}x{height}")]
    DimensionMismatch {
        width: u32,
        height: u32,
        mask_width: u32,
        mask_height: u32,
    },
}

impl ComposeError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }
}
