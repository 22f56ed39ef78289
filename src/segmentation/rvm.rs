use super::preprocess::Preprocessor;
use super::types::{QualityLevel, SegmentationProvider};
use crate::compose::Mask;
use anyhow::{bail, Context, Result};
use image::RgbImage;
use ndarray::Array4;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::{DynValue, Tensor};
use std::path::Path;

/// RobustVideoMatting segmentation model
///
/// This model uses recurrent connections to maintain temporal consistency.
/// Hidden states (r1-r4) are carried between frames for smooth results.
pub struct RobustVideoMatting {
    session: Session,
    preprocessor: Preprocessor,

    // Recurrent hidden states, fed back in on the next frame
    r1: Array4<f32>,
    r2: Array4<f32>,
    r3: Array4<f32>,
    r4: Array4<f32>,

    downsample_ratio: f32,
}

impl RobustVideoMatting {
    /// Create a new RVM model from an ONNX file
    ///
    /// # Arguments
    /// * `model_path` - Path to the ONNX model file
    /// * `quality` - Picks the square input resolution
    ///
    /// Hidden states start as `[1, 1, 1, 1]` zeros; the model broadcasts
    /// them on the first frame and returns full-size states afterwards.
    pub fn new<P: AsRef<Path>>(model_path: P, quality: QualityLevel) -> Result<Self> {
        let path = model_path.as_ref();

        tracing::info!("Loading RVM model from {}", path.display());

        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(4)?
            .commit_from_file(path)
            .with_context(|| format!("Failed to load model from {}", path.display()))?;

        let size = quality.input_size();
        tracing::info!("RVM model loaded, input {}x{} ({:?})", size, size, quality);

        Ok(Self {
            session,
            preprocessor: Preprocessor::new(size, size),
            r1: empty_state(),
            r2: empty_state(),
            r3: empty_state(),
            r4: empty_state(),
            downsample_ratio: 0.25,
        })
    }
}

fn empty_state() -> Array4<f32> {
    Array4::zeros((1, 1, 1, 1))
}

fn to_tensor(array: &Array4<f32>) -> Result<Tensor<f32>> {
    let (n, c, h, w) = array.dim();
    let data: Vec<f32> = array.iter().copied().collect();
    Ok(Tensor::from_array(([n, c, h, w], data))?)
}

fn to_state(value: &DynValue) -> Result<Array4<f32>> {
    let (shape, data) = value.try_extract_tensor::<f32>()?;
    let dims: Vec<usize> = shape.iter().map(|&d| d as usize).collect();
    let [n, c, h, w] = dims[..] else {
        bail!("expected a 4-d recurrent state, got shape {:?}", dims);
    };
    Ok(Array4::from_shape_vec((n, c, h, w), data.to_vec())?)
}

impl SegmentationProvider for RobustVideoMatting {
    fn segment(&mut self, frame: &RgbImage) -> Result<Option<Mask>> {
        let _span = tracing::debug_span!("rvm_segment").entered();

        let src = to_tensor(&self.preprocessor.preprocess(frame))?;
        let ratio = Tensor::from_array(([1usize], vec![self.downsample_ratio]))?;

        let _infer_span = tracing::debug_span!("inference").entered();
        let outputs = self
            .session
            .run(ort::inputs![
                "src" => src,
                "r1i" => to_tensor(&self.r1)?,
                "r2i" => to_tensor(&self.r2)?,
                "r3i" => to_tensor(&self.r3)?,
                "r4i" => to_tensor(&self.r4)?,
                "downsample_ratio" => ratio,
            ])
            .context("Failed to run inference")?;
        drop(_infer_span);

        // Outputs: fgr (foreground), pha (alpha), r1o..r4o (next hidden states).
        // Only the matte and the states are used.
        self.r1 = to_state(&outputs["r1o"])?;
        self.r2 = to_state(&outputs["r2o"])?;
        self.r3 = to_state(&outputs["r3o"])?;
        self.r4 = to_state(&outputs["r4o"])?;

        // Matte shape: [1, 1, H, W]
        let (shape, pha) = outputs["pha"].try_extract_tensor::<f32>()?;
        if shape.len() != 4 {
            bail!("expected a 4-d matte, got {} dimensions", shape.len());
        }
        let (height, width) = (shape[2] as u32, shape[3] as u32);

        let mask = Mask::from_raw(width, height, pha.to_vec()).context("Model returned a malformed matte")?;
        Ok(Some(mask))
    }

    fn reset_state(&mut self) {
        tracing::info!("Resetting RVM hidden states");
        self.r1 = empty_state();
        self.r2 = empty_state();
        self.r3 = empty_state();
        self.r4 = empty_state();
    }

    fn name(&self) -> &str {
        "rvm"
    }
}
