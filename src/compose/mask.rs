use super::error::ComposeError;
use super::resample;
use image::{DynamicImage, GrayImage, Rgba, RgbaImage};

/// Single-channel foreground coverage, 0.0 = background, 1.0 = foreground.
///
/// Values are stored row-major and always lie in `[0, 1]`. A mask may be any
/// resolution; the compositor scales it to the frame it is applied to.
#[derive(Debug, Clone, PartialEq)]
pub struct Mask {
    width: u32,
    height: u32,
    values: Vec<f32>,
}

impl Mask {
    /// Build a mask from normalized row-major samples.
    ///
    /// Samples outside `[0, 1]` are clamped. Non-finite samples and a sample
    /// count that disagrees with the dimensions are rejected.
    pub fn from_raw(width: u32, height: u32, mut values: Vec<f32>) -> Result<Self, ComposeError> {
        let expected = width as usize * height as usize;
        if values.len() != expected {
            return Err(ComposeError::invalid(format!(
                "mask {}x{} needs {} samples, got {}",
                width,
                height,
                expected,
                values.len()
            )));
        }
        if let Some(index) = values.iter().position(|v| !v.is_finite()) {
            return Err(ComposeError::invalid(format!(
                "mask sample {index} is not a finite number"
            )));
        }

        for v in &mut values {
            *v = v.clamp(0.0, 1.0);
        }

        Ok(Self {
            width,
            height,
            values,
        })
    }

    /// 8-bit intensity mapped linearly onto `[0, 1]`
    pub fn from_gray(image: &GrayImage) -> Self {
        let (width, height) = image.dimensions();
        let values = image.pixels().map(|p| f32::from(p[0]) / 255.0).collect();
        Self {
            width,
            height,
            values,
        }
    }

    /// Accept any single-channel intensity image.
    ///
    /// Layouts carrying more than one channel (luma + alpha, colour) have no
    /// single coverage interpretation and are refused.
    pub fn from_dynamic(image: &DynamicImage) -> Result<Self, ComposeError> {
        match image {
            DynamicImage::ImageLuma8(gray) => Ok(Self::from_gray(gray)),
            DynamicImage::ImageLuma16(gray) => {
                let (width, height) = gray.dimensions();
                let values = gray
                    .pixels()
                    .map(|p| f32::from(p[0]) / 65535.0)
                    .collect();
                Ok(Self {
                    width,
                    height,
                    values,
                })
            }
            other => Err(ComposeError::invalid(format!(
                "mask must be single-channel, got {:?}",
                other.color()
            ))),
        }
    }

    /// A mask where every sample has the same coverage
    pub fn filled(width: u32, height: u32, value: f32) -> Result<Self, ComposeError> {
        Self::from_raw(width, height, vec![value; width as usize * height as usize])
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Row-major samples
    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub fn get(&self, x: u32, y: u32) -> Option<f32> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.values
            .get(y as usize * self.width as usize + x as usize)
            .copied()
    }

    /// Bilinear resample to `width` x `height` with independent per-axis
    /// scale factors and edge clamping.
    pub fn resized(&self, width: u32, height: u32) -> Result<Mask, ComposeError> {
        if self.is_empty() {
            return Err(ComposeError::invalid(format!(
                "cannot resample an empty {}x{} mask",
                self.width, self.height
            )));
        }
        if width == 0 || height == 0 {
            return Err(ComposeError::invalid(format!(
                "cannot resample a mask to {width}x{height}"
            )));
        }
        if (width, height) == self.dimensions() {
            return Ok(self.clone());
        }

        let values = resample::bilinear(&self.values, self.width, self.height, width, height);
        Ok(Self {
            width,
            height,
            values,
        })
    }

    /// Opaque grey rendering of the matte, for visual inspection
    pub fn to_preview(&self) -> RgbaImage {
        RgbaImage::from_fn(self.width, self.height, |x, y| {
            let v = alpha_from_coverage(self.values[y as usize * self.width as usize + x as usize]);
            Rgba([v, v, v, 255])
        })
    }
}

/// Map coverage in `[0, 1]` onto an 8-bit alpha channel
#[inline]
pub fn alpha_from_coverage(value: f32) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayAlphaImage, ImageBuffer, Luma, LumaA, Rgb, RgbImage};

    #[test]
    fn from_raw_rejects_wrong_sample_count() {
        let err = Mask::from_raw(2, 2, vec![0.0; 3]).unwrap_err();
        assert!(matches!(err, ComposeError::InvalidInput(_)));
    }

    #[test]
    fn from_raw_rejects_nan() {
        let err = Mask::from_raw(1, 2, vec![0.5, f32::NAN]).unwrap_err();
        assert!(matches!(err, ComposeError::InvalidInput(_)));
    }

    #[test]
    fn from_raw_clamps_out_of_range() {
        let mask = Mask::from_raw(3, 1, vec![-0.5, 0.5, 2.0]).unwrap();
        assert_eq!(mask.values(), &[0.0, 0.5, 1.0]);
    }

    #[test]
    fn gray_maps_full_range() {
        let gray = GrayImage::from_raw(3, 1, vec![0, 51, 255]).unwrap();
        let mask = Mask::from_gray(&gray);
        assert_eq!(mask.get(0, 0), Some(0.0));
        assert_eq!(mask.get(1, 0), Some(0.2));
        assert_eq!(mask.get(2, 0), Some(1.0));
        assert_eq!(mask.get(3, 0), None);
    }

    #[test]
    fn luma16_maps_full_range() {
        let gray: ImageBuffer<Luma<u16>, Vec<u16>> =
            ImageBuffer::from_raw(2, 1, vec![0, 65535]).unwrap();
        let mask = Mask::from_dynamic(&DynamicImage::ImageLuma16(gray)).unwrap();
        assert_eq!(mask.values(), &[0.0, 1.0]);
    }

    #[test]
    fn multi_channel_masks_are_refused() {
        let la: GrayAlphaImage = ImageBuffer::from_pixel(2, 2, LumaA([200, 10]));
        let err = Mask::from_dynamic(&DynamicImage::ImageLumaA8(la)).unwrap_err();
        assert!(matches!(err, ComposeError::InvalidInput(_)));

        let rgb = RgbImage::from_pixel(2, 2, Rgb([1, 2, 3]));
        assert!(Mask::from_dynamic(&DynamicImage::ImageRgb8(rgb)).is_err());
    }

    #[test]
    fn resize_to_same_size_is_identity() {
        let mask = Mask::from_raw(2, 2, vec![0.1, 0.2, 0.3, 0.4]).unwrap();
        assert_eq!(mask.resized(2, 2).unwrap(), mask);
    }

    #[test]
    fn resize_of_empty_mask_fails() {
        let mask = Mask::from_raw(0, 0, vec![]).unwrap();
        assert!(mask.is_empty());
        assert!(mask.resized(4, 4).is_err());

        let mask = Mask::filled(1, 1, 1.0).unwrap();
        assert!(mask.resized(0, 3).is_err());
    }

    #[test]
    fn preview_quantizes_coverage() {
        let mask = Mask::from_raw(2, 1, vec![0.25, 0.75]).unwrap();
        let preview = mask.to_preview();
        assert_eq!(preview.get_pixel(0, 0), &Rgba([64, 64, 64, 255]));
        assert_eq!(preview.get_pixel(1, 0), &Rgba([191, 191, 191, 255]));
    }

    #[test]
    fn alpha_mapping_rounds_and_clamps() {
        assert_eq!(alpha_from_coverage(0.0), 0);
        assert_eq!(alpha_from_coverage(1.0), 255);
        assert_eq!(alpha_from_coverage(0.5), 128);
        assert_eq!(alpha_from_coverage(1.5), 255);
        assert_eq!(alpha_from_coverage(-1.0), 0);
    }
}
