use super::flatten::flatten_over;
use super::PresentationSink;
use anyhow::{bail, Context, Result};
use image::{imageops, Rgb, RgbImage, RgbaImage};
use std::fs::File;
use std::io::Write;
use std::path::Path;
use v4l::video::Output;
use v4l::{Device, Format, FourCC};

/// v4l2loopback virtual camera
///
/// Loopback consumers cannot see alpha, so frames are flattened over a solid
/// background colour before conversion to YUYV.
pub struct V4L2Output {
    // Held open so the negotiated format stays in place
    _device: Device,
    file: File,
    width: u32,
    height: u32,
    background: Rgb<u8>,
}

impl V4L2Output {
    pub fn new<P: AsRef<Path>>(
        device_path: P,
        width: u32,
        height: u32,
        background: Rgb<u8>,
    ) -> Result<Self> {
        let path = device_path.as_ref();
        if width == 0 || height == 0 {
            bail!("Output size {}x{} is empty", width, height);
        }
        tracing::info!(
            "Opening v4l2loopback device at {} ({}x{})",
            path.display(),
            width,
            height
        );

        let device = Device::with_path(path)
            .with_context(|| format!("Failed to open v4l2 device at {}", path.display()))?;

        let requested = Format::new(width, height, yuyv());
        let applied = Output::set_format(&device, &requested)
            .context("Failed to set YUYV output format")?;
        let (width, height) = negotiated_size(&requested, &applied)?;

        // v4l2loopback accepts raw frame data written to the device file
        let file = File::options()
            .write(true)
            .open(path)
            .with_context(|| format!("Failed to open v4l2loopback device at {}", path.display()))?;

        tracing::info!("v4l2loopback device opened successfully");

        Ok(Self {
            _device: device,
            file,
            width,
            height,
            background,
        })
    }
}

fn yuyv() -> FourCC {
    FourCC::new(b"YUYV")
}

/// Frame size to write, taken from what the device actually accepted
fn negotiated_size(requested: &Format, applied: &Format) -> Result<(u32, u32)> {
    if applied.fourcc != yuyv() {
        bail!("Device refused YUYV and chose {}", applied.fourcc);
    }
    if applied.width == 0 || applied.height == 0 {
        bail!("Device negotiated an empty {}x{} format", applied.width, applied.height);
    }
    if (applied.width, applied.height) != (requested.width, requested.height) {
        tracing::warn!(
            "Device accepted {}x{} instead of {}x{}, frames will be scaled to fit",
            applied.width,
            applied.height,
            requested.width,
            requested.height
        );
    }
    Ok((applied.width, applied.height))
}

/// Pack an RGB frame as YUYV 4:2:2, chroma averaged over each pixel pair
pub(crate) fn rgb_to_yuyv(frame: &RgbImage) -> Vec<u8> {
    let (width, height) = frame.dimensions();
    if width == 0 || height == 0 {
        return Vec::new();
    }
    let row_len = width as usize * 3;
    let mut yuyv = Vec::with_capacity(width as usize * height as usize * 2 + 4);

    for row in frame.as_raw().chunks_exact(row_len) {
        for pair in row.chunks(6) {
            let first = &pair[..3];
            // Odd widths repeat the last pixel
            let second = if pair.len() == 6 { &pair[3..] } else { first };

            let (y0, u0, v0) = rgb_to_yuv(first[0], first[1], first[2]);
            let (y1, u1, v1) = rgb_to_yuv(second[0], second[1], second[2]);

            yuyv.extend_from_slice(&[
                y0,
                ((u16::from(u0) + u16::from(u1)) / 2) as u8,
                y1,
                ((u16::from(v0) + u16::from(v1)) / 2) as u8,
            ]);
        }
    }

    yuyv
}

/// BT.601 RGB to YUV
fn rgb_to_yuv(r: u8, g: u8, b: u8) -> (u8, u8, u8) {
    let (r, g, b) = (f32::from(r), f32::from(g), f32::from(b));

    let y = 0.299 * r + 0.587 * g + 0.114 * b;
    let u = -0.147 * r - 0.289 * g + 0.436 * b + 128.0;
    let v = 0.615 * r - 0.515 * g - 0.100 * b + 128.0;

    let q = |c: f32| c.round().clamp(0.0, 255.0) as u8;
    (q(y), q(u), q(v))
}

impl PresentationSink for V4L2Output {
    fn present(&mut self, frame: &RgbaImage) -> Result<()> {
        let flat = flatten_over(frame, self.background);

        let flat = if flat.dimensions() != (self.width, self.height) {
            imageops::resize(
                &flat,
                self.width,
                self.height,
                imageops::FilterType::Triangle,
            )
        } else {
            flat
        };

        self.file
            .write_all(&rgb_to_yuyv(&flat))
            .context("Failed to write frame to v4l2loopback device")?;

        Ok(())
    }

    fn resolution(&self) -> Option<(u32, u32)> {
        Some((self.width, self.height))
    }
}
