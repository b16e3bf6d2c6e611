//! Still images of the framebuffer
//!
//! Snapshots are written as opaque PNGs through tiny-skia. Every pixel is
//! copied, separator and histogram included, so decoding the file gives back
//! the framebuffer exactly.

use crate::waterfall::Framebuffer;
use crate::waterfall::colors;
use jiff::Zoned;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tiny_skia::Pixmap;

#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("invalid image dimensions {width}x{height}")]
    Dimensions { width: usize, height: usize },
    #[error("failed to encode {path}: {message}")]
    Encode { path: PathBuf, message: String },
    #[error("failed to decode {path}: {message}")]
    Decode { path: PathBuf, message: String },
    #[error("snapshot I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Writes a framebuffer to an image file
pub trait ImageEncoder {
    fn encode(&self, framebuffer: &Framebuffer, path: &Path) -> Result<(), SnapshotError>;

    fn extension(&self) -> &'static str;
}

pub struct PngEncoder;

impl ImageEncoder for PngEncoder {
    fn encode(&self, framebuffer: &Framebuffer, path: &Path) -> Result<(), SnapshotError> {
        write_png(
            framebuffer.width(),
            framebuffer.height(),
            framebuffer.pixels(),
            path,
        )
    }

    fn extension(&self) -> &'static str {
        "png"
    }
}

/// Encode row-major packed `0x00RRGGBB` pixels as an opaque PNG
pub fn write_png(
    width: usize,
    height: usize,
    pixels: &[u32],
    path: &Path,
) -> Result<(), SnapshotError> {
    let dimensions = SnapshotError::Dimensions { width, height };
    if pixels.len() != width * height {
        return Err(dimensions);
    }
    let (Ok(w), Ok(h)) = (u32::try_from(width), u32::try_from(height)) else {
        return Err(dimensions);
    };
    let mut pixmap = Pixmap::new(w, h).ok_or(dimensions)?;

    // Fully opaque, so premultiplied RGBA equals straight RGBA
    for (rgba, &pixel) in pixmap.data_mut().chunks_exact_mut(4).zip(pixels) {
        let (r, g, b) = colors::channels(pixel);
        rgba.copy_from_slice(&[r, g, b, 255]);
    }

    pixmap
        .save_png(path)
        .map_err(|e| SnapshotError::Encode {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
}

/// Read a PNG back into packed pixels: `(width, height, pixels)`
#[cfg(test)]
pub fn read_png(path: &Path) -> Result<(usize, usize, Vec<u32>), SnapshotError> {
    let pixmap = Pixmap::load_png(path).map_err(|e| SnapshotError::Decode {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    let pixels = pixmap
        .data()
        .chunks_exact(4)
        .map(|rgba| colors::rgb(rgba[0], rgba[1], rgba[2]))
        .collect();

    Ok((pixmap.width() as usize, pixmap.height() as usize, pixels))
}

/// Saves timestamped snapshots into a directory
pub struct Snapshotter {
    dir: PathBuf,
    encoder: Box<dyn ImageEncoder>,
}

impl Snapshotter {
    pub fn new(dir: PathBuf, encoder: Box<dyn ImageEncoder>) -> Self {
        Self { dir, encoder }
    }

    pub fn png(dir: PathBuf) -> Self {
        Self::new(dir, Box::new(PngEncoder))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write the framebuffer to `waterfall_<timestamp>.<ext>`, returning the path
    pub fn save(&self, framebuffer: &Framebuffer) -> Result<PathBuf, SnapshotError> {
        fs::create_dir_all(&self.dir)?;

        let path = self.next_path(&Zoned::now().strftime("%Y-%m-%d_%H-%M-%S").to_string());
        self.encoder.encode(framebuffer, &path)?;
        Ok(path)
    }

    /// Timestamps have second resolution; repeated captures within the same
    /// second get a numeric suffix instead of overwriting each other.
    fn next_path(&self, timestamp: &str) -> PathBuf {
        let ext = self.encoder.extension();
        let mut path = self.dir.join(format!("waterfall_{}.{}", timestamp, ext));
        let mut n = 1;
        while path.exists() {
            path = self.dir.join(format!("waterfall_{}-{}.{}", timestamp, n, ext));
            n += 1;
        }
        path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::SampleBlock;
    use crate::waterfall::{MIN_WIDTH, Waterfall};

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "waterfall-snapshot-{}-{}",
            std::process::id(),
            name
        ));
        fs::remove_dir_all(&dir).ok();
        dir
    }

    fn busy_waterfall() -> Waterfall {
        let mut waterfall = Waterfall::new(MIN_WIDTH + 20, 33).unwrap();
        for i in 0..12u8 {
            let column: Vec<u32> = (0..33u8)
                .map(|y| colors::gray(y.wrapping_mul(7) ^ i))
                .collect();
            let block =
                SampleBlock::from_samples((0..64).map(|n| (n % 9) as i16 * i as i16).collect());
            waterfall.full_update(&column, &block);
        }
        waterfall
    }

    #[test]
    fn test_png_roundtrip_is_lossless() {
        let dir = temp_dir("roundtrip");
        let waterfall = busy_waterfall();
        let snapshots = Snapshotter::png(dir.clone());

        let path = snapshots.save(waterfall.framebuffer()).unwrap();
        let (width, height, pixels) = read_png(&path).unwrap();

        let fb = waterfall.framebuffer();
        assert_eq!((width, height), (fb.width(), fb.height()));
        assert_eq!(pixels.as_slice(), fb.pixels());

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_filename_is_timestamped() {
        let dir = temp_dir("name");
        let snapshots = Snapshotter::png(dir.clone());
        let fb = Framebuffer::new(MIN_WIDTH, 4).unwrap();

        let path = snapshots.save(&fb).unwrap();
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        // waterfall_YYYY-mm-dd_HH-MM-SS.png
        assert!(name.starts_with("waterfall_"));
        assert!(name.ends_with(".png"));
        assert_eq!(name.len(), "waterfall_".len() + 19 + ".png".len());

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_same_second_does_not_overwrite() {
        let dir = temp_dir("collide");
        fs::create_dir_all(&dir).unwrap();
        let snapshots = Snapshotter::png(dir.clone());

        let first = snapshots.next_path("2024-01-01_00-00-00");
        fs::write(&first, b"taken").unwrap();
        let second = snapshots.next_path("2024-01-01_00-00-00");

        assert_ne!(first, second);
        assert!(second.to_string_lossy().ends_with("-1.png"));

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_unwritable_directory_is_an_error() {
        let blocker = temp_dir("blocker");
        fs::write(&blocker, b"not a directory").unwrap();
        let snapshots = Snapshotter::png(blocker.join("inside"));

        let fb = Framebuffer::new(MIN_WIDTH, 4).unwrap();
        assert!(snapshots.save(&fb).is_err());

        fs::remove_file(&blocker).ok();
    }

    #[test]
    fn test_write_png_rejects_mismatched_buffer() {
        let path = std::env::temp_dir().join("waterfall-never-written.png");
        assert!(matches!(
            write_png(4, 4, &[0; 3], &path),
            Err(SnapshotError::Dimensions { .. })
        ));
    }
}
