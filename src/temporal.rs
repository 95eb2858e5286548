// src/temporal.rs
//
// Pixel-wise comparison of the current and historical vegetation rasters.

use crate::error::{AnalysisError, Result};
use crate::raster::Raster;
use serde::Serialize;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ChangeResult {
    /// Fraction of pixels in [0, 1] whose intensity dropped past the threshold
    pub loss_fraction: f64,
}

impl ChangeResult {
    pub fn loss_percent(&self) -> f64 {
        self.loss_fraction * 100.0
    }
}

pub struct ChangeDetector {
    loss_threshold: f64,
}

impl ChangeDetector {
    pub fn new(loss_threshold: f64) -> Self {
        Self { loss_threshold }
    }

    pub fn detect(&self, current: &Raster, historical: &Raster) -> Result<ChangeResult> {
        if current.dimensions() != historical.dimensions() {
            return Err(AnalysisError::DimensionMismatch {
                current: current.dimensions(),
                historical: historical.dimensions(),
            });
        }

        let total = current.len();
        if total == 0 {
            return Ok(ChangeResult { loss_fraction: 0.0 });
        }

        let lost = current
            .normalized()
            .zip(historical.normalized())
            .filter(|(now, before)| now - before < -self.loss_threshold)
            .count();

        debug!("Vegetation loss: {} of {} pixels", lost, total);

        Ok(ChangeResult {
            loss_fraction: lost as f64 / total as f64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_identical_rasters_have_no_loss() {
        let raster = Raster::new(4, 4, (0..16).map(|v| v * 15).collect());
        let result = ChangeDetector::new(0.15).detect(&raster, &raster).unwrap();
        assert_eq!(result.loss_fraction, 0.0);
    }

    #[test]
    fn test_half_darkened() {
        let historical = Raster::new(4, 2, vec![220; 8]);
        let mut pixels = vec![220; 8];
        pixels[..4].iter_mut().for_each(|p| *p = 30);
        let current = Raster::new(4, 2, pixels);

        let result = ChangeDetector::new(0.15).detect(&current, &historical).unwrap();
        assert_relative_eq!(result.loss_fraction, 0.5);
        assert_relative_eq!(result.loss_percent(), 50.0);
    }

    #[test]
    fn test_small_drop_and_growth_are_not_loss() {
        // 0.1 drop stays under the threshold; gains never count
        let historical = Raster::new(2, 1, vec![200, 100]);
        let current = Raster::new(2, 1, vec![175, 250]);
        let result = ChangeDetector::new(0.15).detect(&current, &historical).unwrap();
        assert_eq!(result.loss_fraction, 0.0);
    }

    #[test]
    fn test_dimension_mismatch() {
        let a = Raster::new(2, 2, vec![0; 4]);
        let b = Raster::new(4, 1, vec![0; 4]);
        let err = ChangeDetector::new(0.15).detect(&a, &b).unwrap_err();
        assert!(matches!(err, AnalysisError::DimensionMismatch { .. }));
    }
}
