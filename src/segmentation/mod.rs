mod masks;
mod preprocess;
mod rvm;
pub mod types;

pub use masks::MaskSequence;
pub use preprocess::Preprocessor;
pub use rvm::RobustVideoMatting;
pub use types::{QualityLevel, SegmentationProvider};

use anyhow::Result;
use std::path::Path;

/// Create the default model-backed provider (RVM)
pub fn create_default_model<P: AsRef<Path>>(
    model_path: P,
    quality: QualityLevel,
) -> Result<Box<dyn SegmentationProvider>> {
    let model = RobustVideoMatting::new(model_path, quality)?;
    Ok(Box::new(model))
}
