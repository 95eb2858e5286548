// src/vegetation.rs

use crate::raster::Raster;
use serde::Serialize;

/// Aggregate vegetation proxy statistics for one raster.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct VegetationMetrics {
    /// Mean normalized intensity in [0, 1]
    pub mean_intensity: f64,
    pub total_pixels: usize,
}

impl VegetationMetrics {
    pub fn extract(raster: &Raster) -> Self {
        let total_pixels = raster.len();
        let mean_intensity = if total_pixels == 0 {
            0.0
        } else {
            raster.normalized().sum::<f64>() / total_pixels as f64
        };

        Self {
            mean_intensity,
            total_pixels,
        }
    }
}
