//! Person segmentation compositing: frames in, RGBA frames out, with alpha
//! taken from a segmentation mask.

pub mod compose;
pub mod output;
pub mod pipeline;
pub mod segmentation;
pub mod source;

pub use compose::{compose, AlphaCompositor, ComposeError, Mask, ResamplePolicy};
pub use pipeline::{
    process_frame, run_pipeline, FrameDisposition, PipelineOptions, PipelineStats, ProcessedFrame,
};
