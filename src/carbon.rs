// src/carbon.rs

use crate::clustering::DensityComposition;
use crate::error::{AnalysisError, Result};
use crate::types::CarbonConfig;

/// Converts density band composition into standing carbon for a fixed area.
#[derive(Debug, Clone)]
pub struct CarbonEstimator {
    area_hectares: f64,
    dense_tonnes_per_hectare: f64,
    sparse_tonnes_per_hectare: f64,
}

impl CarbonEstimator {
    pub fn new(config: &CarbonConfig) -> Self {
        Self {
            area_hectares: config.area_hectares,
            dense_tonnes_per_hectare: config.dense_tonnes_per_hectare,
            sparse_tonnes_per_hectare: config.sparse_tonnes_per_hectare,
        }
    }

    /// Estimated tonnes, truncated toward zero. Barren land contributes nothing.
    pub fn estimate(&self, composition: &DensityComposition) -> Result<u64> {
        let dense = composition.dense_fraction();
        let sparse = composition.sparse_fraction();
        if !dense.is_finite() || !sparse.is_finite() || dense < 0.0 || sparse < 0.0 {
            return Err(AnalysisError::invalid_config(format!(
                "density fractions must be non-negative, got dense={} sparse={}",
                dense, sparse
            )));
        }

        let tonnes = self.area_hectares
            * (dense * self.dense_tonnes_per_hectare + sparse * self.sparse_tonnes_per_hectare);
        Ok(tonnes as u64)
    }
}
