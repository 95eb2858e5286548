// src/raster.rs
//
// Image loading and single-channel rasters. Everything downstream of this
// module works on `Raster` intensities; only the encroachment detector
// keeps the full-colour image.

use crate::error::{AnalysisError, Result};
use crate::types::Channel;
use image::DynamicImage;
use std::fs;
use std::path::Path;
use tracing::debug;

/// One channel of a decoded image, row-major, 0-255.
#[derive(Debug, Clone, PartialEq)]
pub struct Raster {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl Raster {
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Self {
        debug_assert_eq!(pixels.len(), width as usize * height as usize);
        Self {
            width,
            height,
            pixels,
        }
    }

    /// Extract `channel` from an already-decoded image.
    pub fn from_image(img: &DynamicImage, channel: Channel) -> Self {
        let rgb = img.to_rgb8();
        let (width, height) = rgb.dimensions();
        let offset = channel.index();
        let pixels = rgb.as_raw().chunks_exact(3).map(|px| px[offset]).collect();
        Self::new(width, height, pixels)
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn len(&self) -> usize {
        self.pixels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    /// Raw 0-255 samples.
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Samples normalized to [0, 1].
    pub fn normalized(&self) -> impl Iterator<Item = f64> + '_ {
        self.pixels.iter().map(|&v| v as f64 / 255.0)
    }
}

/// Read and decode an image, distinguishing missing, unreadable and
/// undecodable files.
pub fn load_image(path: &Path) -> Result<DynamicImage> {
    if !path.exists() {
        return Err(AnalysisError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let bytes = fs::read(path).map_err(|source| AnalysisError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;

    let img = image::load_from_memory(&bytes).map_err(|source| AnalysisError::ImageDecode {
        path: path.to_path_buf(),
        source,
    })?;

    if img.width() == 0 || img.height() == 0 {
        return Err(AnalysisError::EmptyImage {
            path: path.to_path_buf(),
        });
    }

    debug!(
        "Decoded {} ({}x{})",
        path.display(),
        img.width(),
        img.height()
    );
    Ok(img)
}
