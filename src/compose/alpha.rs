use super::error::ComposeError;
use super::mask::{alpha_from_coverage, Mask};
use super::resample;
use image::{DynamicImage, RgbImage, RgbaImage};
use rayon::prelude::*;
use std::borrow::Cow;

/// What to do when the mask and the source disagree on size
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ResamplePolicy {
    /// Scale the mask to the source with bilinear interpolation
    #[default]
    Bilinear,
    /// Refuse mismatched inputs with `DimensionMismatch`
    Forbid,
}

/// Copies a frame's colour channels and takes alpha from a coverage mask.
///
/// For every pixel: `out.rgb = source.rgb`, `out.a = round(mask * 255)`.
/// The source's own alpha, if any, is never read. Rows are processed in
/// parallel; the result is identical to a sequential pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlphaCompositor {
    policy: ResamplePolicy,
}

impl AlphaCompositor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(policy: ResamplePolicy) -> Self {
        Self { policy }
    }

    /// Compose any RGB or RGBA 8-bit image with `mask`
    pub fn compose(&self, source: &DynamicImage, mask: &Mask) -> Result<RgbaImage, ComposeError> {
        match source {
            DynamicImage::ImageRgb8(rgb) => self.compose_rgb(rgb, mask),
            DynamicImage::ImageRgba8(rgba) => self.compose_rgba(rgba, mask),
            other => Err(ComposeError::invalid(format!(
                "source must be 8-bit RGB or RGBA, got {:?}",
                other.color()
            ))),
        }
    }

    pub fn compose_rgb(&self, source: &RgbImage, mask: &Mask) -> Result<RgbaImage, ComposeError> {
        let (width, height) = source.dimensions();
        self.compose_samples(width, height, source.as_raw(), 3, mask)
    }

    pub fn compose_rgba(&self, source: &RgbaImage, mask: &Mask) -> Result<RgbaImage, ComposeError> {
        let (width, height) = source.dimensions();
        self.compose_samples(width, height, source.as_raw(), 4, mask)
    }

    fn compose_samples(
        &self,
        width: u32,
        height: u32,
        samples: &[u8],
        channels: usize,
        mask: &Mask,
    ) -> Result<RgbaImage, ComposeError> {
        let _span = tracing::debug_span!("compose", width, height).entered();

        if width == 0 || height == 0 {
            return Err(ComposeError::invalid(format!(
                "source image is empty ({width}x{height})"
            )));
        }
        if mask.is_empty() {
            return Err(ComposeError::invalid(format!(
                "mask image is empty ({}x{})",
                mask.width(),
                mask.height()
            )));
        }

        let alpha = self.fit_mask(width, height, mask)?;

        let row_in = width as usize * channels;
        let row_out = width as usize * 4;
        let samples = &samples[..row_in * height as usize];
        let mut out = vec![0u8; row_out * height as usize];

        out.par_chunks_mut(row_out)
            .zip(samples.par_chunks(row_in))
            .zip(alpha.par_chunks(width as usize))
            .for_each(|((dst, src), coverage)| {
                for ((px, sp), &a) in dst
                    .chunks_exact_mut(4)
                    .zip(src.chunks_exact(channels))
                    .zip(coverage)
                {
                    px[..3].copy_from_slice(&sp[..3]);
                    px[3] = alpha_from_coverage(a);
                }
            });

        RgbaImage::from_raw(width, height, out).ok_or_else(|| {
            ComposeError::invalid(format!("could not assemble {width}x{height} output"))
        })
    }

    /// Mask samples at exactly `width` x `height`
    fn fit_mask<'m>(
        &self,
        width: u32,
        height: u32,
        mask: &'m Mask,
    ) -> Result<Cow<'m, [f32]>, ComposeError> {
        if mask.dimensions() == (width, height) {
            return Ok(Cow::Borrowed(mask.values()));
        }

        match self.policy {
            ResamplePolicy::Bilinear => Ok(Cow::Owned(resample::bilinear(
                mask.values(),
                mask.width(),
                mask.height(),
                width,
                height,
            ))),
            ResamplePolicy::Forbid => Err(ComposeError::DimensionMismatch {
                width,
                height,
                mask_width: mask.width(),
                mask_height: mask.height(),
            }),
        }
    }
}

/// Compose with the default bilinear policy
pub fn compose(source: &DynamicImage, mask: &Mask) -> Result<RgbaImage, ComposeError> {
    AlphaCompositor::default().compose(source, mask)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Rgb, Rgba};

    fn gradient(width: u32, height: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x * 17) as u8, (y * 29) as u8, ((x + y) * 7) as u8])
        })
    }

    #[test]
    fn matching_sizes_copy_rgb_and_take_alpha() {
        let source = gradient(5, 3);
        let gray = GrayImage::from_fn(5, 3, |x, y| image::Luma([(x * 50 + y) as u8]));
        let mask = Mask::from_gray(&gray);

        let out = AlphaCompositor::new().compose_rgb(&source, &mask).unwrap();
        assert_eq!(out.dimensions(), (5, 3));
        for (x, y, px) in out.enumerate_pixels() {
            let src = source.get_pixel(x, y);
            assert_eq!(&px.0[..3], &src.0[..]);
            assert_eq!(px[3], gray.get_pixel(x, y)[0]);
        }
    }

    #[test]
    fn source_alpha_is_discarded() {
        let source = RgbaImage::from_pixel(2, 2, Rgba([10, 20, 30, 7]));
        let mask = Mask::filled(2, 2, 1.0).unwrap();
        let out = compose(&DynamicImage::ImageRgba8(source), &mask).unwrap();
        assert!(out.pixels().all(|p| *p == Rgba([10, 20, 30, 255])));
    }

    #[test]
    fn one_by_one_composes() {
        let source = RgbImage::from_pixel(1, 1, Rgb([1, 2, 3]));
        let mask = Mask::filled(1, 1, 0.5).unwrap();
        let out = AlphaCompositor::new().compose_rgb(&source, &mask).unwrap();
        assert_eq!(out.get_pixel(0, 0), &Rgba([1, 2, 3, 128]));
    }

    #[test]
    fn empty_inputs_are_invalid() {
        let compositor = AlphaCompositor::new();
        let empty_mask = Mask::from_raw(0, 0, vec![]).unwrap();
        let source = gradient(2, 2);
        assert!(matches!(
            compositor.compose_rgb(&source, &empty_mask),
            Err(ComposeError::InvalidInput(_))
        ));

        let empty_source = RgbImage::new(0, 0);
        let mask = Mask::filled(2, 2, 1.0).unwrap();
        assert!(matches!(
            compositor.compose_rgb(&empty_source, &mask),
            Err(ComposeError::InvalidInput(_))
        ));
    }

    #[test]
    fn unsupported_source_layout_is_invalid() {
        let gray = DynamicImage::ImageLuma8(GrayImage::new(2, 2));
        let mask = Mask::filled(2, 2, 1.0).unwrap();
        assert!(matches!(
            compose(&gray, &mask),
            Err(ComposeError::InvalidInput(_))
        ));
    }

    #[test]
    fn forbid_policy_reports_mismatch() {
        let compositor = AlphaCompositor::with_policy(ResamplePolicy::Forbid);
        let mask = Mask::filled(2, 2, 1.0).unwrap();
        let err = compositor.compose_rgb(&gradient(4, 3), &mask).unwrap_err();
        assert_eq!(
            err,
            ComposeError::DimensionMismatch {
                width: 4,
                height: 3,
                mask_width: 2,
                mask_height: 2,
            }
        );
        assert!(compositor.compose_rgb(&gradient(2, 2), &mask).is_ok());
    }

    #[test]
    fn non_uniform_scale_keeps_rgb() {
        let source = gradient(9, 4);
        let mask = Mask::from_raw(3, 8, (0..24).map(|i| i as f32 / 23.0).collect()).unwrap();
        let out = AlphaCompositor::new().compose_rgb(&source, &mask).unwrap();
        assert_eq!(out.dimensions(), (9, 4));
        for (x, y, px) in out.enumerate_pixels() {
            assert_eq!(&px.0[..3], &source.get_pixel(x, y).0[..]);
        }
    }

    #[test]
    fn parallel_rows_match_sequential_formula() {
        let source = gradient(31, 47);
        let mask = Mask::from_raw(7, 5, (0..35).map(|i| (i % 6) as f32 / 5.0).collect()).unwrap();
        let out = AlphaCompositor::new().compose_rgb(&source, &mask).unwrap();

        let scaled = mask.resized(31, 47).unwrap();
        for (x, y, px) in out.enumerate_pixels() {
            let expected = alpha_from_coverage(scaled.get(x, y).unwrap());
            assert_eq!(px[3], expected, "alpha at ({x},{y})");
        }
    }
}
