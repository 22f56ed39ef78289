use super::{FrameSource, Orientation};
use anyhow::{bail, Context, Result};
use image::{ImageFormat, RgbImage};
use std::path::{Path, PathBuf};

/// Looping playback of a directory of still frames
///
/// Frames are decoded once up front, rotated by the configured orientation,
/// and replayed from the first frame whenever the end is reached.
pub struct ImageSequence {
    frames: Vec<RgbImage>,
    cursor: usize,
    loops: u64,
    restarted: bool,
    width: u32,
    height: u32,
}

impl ImageSequence {
    /// Load every image file in `dir`, ordered by file name
    pub fn open<P: AsRef<Path>>(dir: P, orientation: Orientation) -> Result<Self> {
        let dir = dir.as_ref();
        tracing::info!("Loading frame sequence from {}", dir.display());

        let frames = image_files(dir)?
            .into_iter()
            .map(|path| {
                image::open(&path)
                    .map(|img| img.to_rgb8())
                    .with_context(|| format!("Failed to decode frame {}", path.display()))
            })
            .collect::<Result<Vec<_>>>()?;

        Self::from_frames(frames, orientation)
            .with_context(|| format!("No usable frames in {}", dir.display()))
    }

    pub fn from_frames(frames: Vec<RgbImage>, orientation: Orientation) -> Result<Self> {
        let Some(first) = frames.first() else {
            bail!("frame sequence is empty");
        };

        let (width, height) = first.dimensions();
        if width == 0 || height == 0 {
            bail!("frame sequence starts with an empty {}x{} frame", width, height);
        }
        if let Some(index) = frames.iter().position(|f| f.dimensions() != (width, height)) {
            let (w, h) = frames[index].dimensions();
            bail!(
                "frame {} is {}x{}, expected {}x{} like the first frame",
                index,
                w,
                h,
                width,
                height
            );
        }

        let frames: Vec<RgbImage> = frames.into_iter().map(|f| orientation.apply(f)).collect();
        let (width, height) = orientation.oriented_size((width, height));

        tracing::info!("Frame sequence ready: {} frames at {}x{}", frames.len(), width, height);

        Ok(Self {
            frames,
            cursor: 0,
            loops: 0,
            restarted: false,
            width,
            height,
        })
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// How many times playback has wrapped back to the first frame
    pub fn loops_completed(&self) -> u64 {
        self.loops
    }
}

impl FrameSource for ImageSequence {
    fn next_frame(&mut self) -> Result<RgbImage> {
        self.restarted = self.cursor == 0 && self.loops > 0;
        let frame = self.frames[self.cursor].clone();

        self.cursor += 1;
        if self.cursor == self.frames.len() {
            self.cursor = 0;
            self.loops += 1;
            tracing::debug!("Reached end of sequence, looping (pass {})", self.loops);
        }

        Ok(frame)
    }

    fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn restarted(&self) -> bool {
        self.restarted
    }
}

/// Files in `dir` that the image crate recognises by extension, sorted by name
pub(crate) fn image_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read directory {}", dir.display()))?;

    let mut files = Vec::new();
    for entry in entries {
        let path = entry
            .with_context(|| format!("Failed to list {}", dir.display()))?
            .path();
        if path.is_file() && ImageFormat::from_path(&path).is_ok() {
            files.push(path);
        }
    }
    files.sort();

    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn solid(width: u32, height: u32, value: u8) -> RgbImage {
        RgbImage::from_pixel(width, height, Rgb([value, value, value]))
    }

    #[test]
    fn loops_back_to_first_frame() {
        let mut seq =
            ImageSequence::from_frames(vec![solid(2, 2, 1), solid(2, 2, 2)], Orientation::Up)
                .unwrap();

        let values: Vec<u8> = (0..5)
            .map(|_| seq.next_frame().unwrap().get_pixel(0, 0)[0])
            .collect();
        assert_eq!(values, vec![1, 2, 1, 2, 1]);
        assert_eq!(seq.loops_completed(), 2);
    }

    #[test]
    fn restart_is_flagged_only_on_first_frame_of_a_new_pass() {
        let frames = vec![solid(1, 1, 0), solid(1, 1, 1), solid(1, 1, 2)];
        let mut seq = ImageSequence::from_frames(frames, Orientation::Up).unwrap();

        let flags: Vec<bool> = (0..7)
            .map(|_| {
                seq.next_frame().unwrap();
                seq.restarted()
            })
            .collect();
        assert_eq!(flags, vec![false, false, false, true, false, false, true]);
    }

    #[test]
    fn empty_sequence_is_rejected() {
        assert!(ImageSequence::from_frames(vec![], Orientation::Up).is_err());
        assert!(ImageSequence::from_frames(vec![solid(0, 0, 0)], Orientation::Up).is_err());
    }

    #[test]
    fn mixed_sizes_are_rejected() {
        let frames = vec![solid(2, 2, 0), solid(3, 2, 0)];
        assert!(ImageSequence::from_frames(frames, Orientation::Up).is_err());
    }

    #[test]
    fn orientation_applies_to_resolution_and_frames() {
        let mut seq = ImageSequence::from_frames(vec![solid(4, 2, 9)], Orientation::Right).unwrap();
        assert_eq!(seq.resolution(), (2, 4));
        assert_eq!(seq.next_frame().unwrap().dimensions(), (2, 4));
    }

    #[test]
    fn opens_directory_in_name_order() {
        let dir = std::env::temp_dir().join(format!("segmatte_seq_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        solid(3, 2, 20).save(dir.join("b.png")).unwrap();
        solid(3, 2, 10).save(dir.join("a.png")).unwrap();
        std::fs::write(dir.join("notes.txt"), "not a frame").unwrap();

        let mut seq = ImageSequence::open(&dir, Orientation::Up).unwrap();
        assert_eq!(seq.len(), 2);
        assert_eq!(seq.next_frame().unwrap().get_pixel(0, 0)[0], 10);
        assert_eq!(seq.next_frame().unwrap().get_pixel(0, 0)[0], 20);

        std::fs::remove_dir_all(&dir).ok();
    }
}
