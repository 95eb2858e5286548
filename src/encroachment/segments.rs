// src/encroachment/segments.rs
//
// Turns a segmentation response into a human-activity risk score.
//
// Response shape: [{"label": str, "score": 0-1, "mask": base64 image}, ...]
// Each mask is a single-channel image at inference resolution where
// non-zero pixels belong to the segment.

use super::EncroachmentResult;
use crate::error::{AnalysisError, Result};
use crate::types::EncroachmentConfig;
use base64::Engine;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

#[derive(Debug, Deserialize)]
struct RawSegment {
    label: String,
    score: f64,
    mask: String,
}

/// A segment seen above the diagnostic score, kept for logging.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentObservation {
    pub label: String,
    pub score: f64,
    pub mask_pixels: usize,
    /// Whether the segment contributed to the activity total
    pub counted: bool,
}

/// Split a 200 body into per-segment JSON values. Only a body that is not a
/// JSON array is an error; individual segments are validated later.
pub fn parse_segments(body: &[u8]) -> Result<Vec<serde_json::Value>> {
    serde_json::from_slice::<Vec<serde_json::Value>>(body)
        .map_err(|e| AnalysisError::Parse(format!("segmentation body is not a list: {}", e)))
}

pub struct SegmentScorer {
    benign_labels: Vec<String>,
    min_score: f64,
    diagnostic_score: f64,
    min_coverage: f64,
    risk_amplification: f64,
    total_pixels: usize,
}

impl SegmentScorer {
    pub fn new(config: &EncroachmentConfig) -> Self {
        let side = config.inference_size as usize;
        Self {
            benign_labels: config
                .benign_labels
                .iter()
                .map(|l| l.to_lowercase())
                .collect(),
            min_score: config.min_score,
            diagnostic_score: config.diagnostic_score,
            min_coverage: config.min_coverage,
            risk_amplification: config.risk_amplification,
            total_pixels: side * side,
        }
    }

    pub fn is_benign(&self, label: &str) -> bool {
        let label = label.to_lowercase();
        self.benign_labels.iter().any(|b| label.contains(b.as_str()))
    }

    pub fn score(&self, segments: &[serde_json::Value]) -> EncroachmentResult {
        let min_pixels = self.total_pixels as f64 * self.min_coverage;
        let mut activity_pixels = 0usize;
        let mut features: Vec<String> = Vec::new();
        let mut observations = Vec::new();

        for (idx, value) in segments.iter().enumerate() {
            let segment = match serde_json::from_value::<RawSegment>(value.clone()) {
                Ok(segment) => segment,
                Err(e) => {
                    debug!("Skipping segment {}: {}", idx, e);
                    continue;
                }
            };

            if segment.score < self.diagnostic_score {
                continue;
            }

            let mask_pixels = match count_mask_pixels(&segment.mask) {
                Ok(n) => n,
                Err(e) => {
                    debug!("Skipping segment {} ({}): {}", idx, segment.label, e);
                    continue;
                }
            };

            let counted = segment.score >= self.min_score
                && !self.is_benign(&segment.label)
                && mask_pixels as f64 > min_pixels;

            debug!(
                "Segment {}: label={} score={:.2} pixels={} counted={}",
                idx, segment.label, segment.score, mask_pixels, counted
            );

            if counted {
                activity_pixels += mask_pixels;
                let feature = segment.label.to_uppercase();
                if !features.contains(&feature) {
                    features.push(feature);
                }
            }

            observations.push(SegmentObservation {
                label: segment.label,
                score: segment.score,
                mask_pixels,
                counted,
            });
        }

        let risk_score = self.risk_score(activity_pixels);
        info!(
            "🛰️ Human activity covers {} px of {} (risk {})",
            activity_pixels, self.total_pixels, risk_score
        );

        EncroachmentResult {
            risk_score,
            features,
            observations,
        }
    }

    /// `min(100, round(coverage% * amplification))`
    pub fn risk_score(&self, activity_pixels: usize) -> u8 {
        if self.total_pixels == 0 {
            return 0;
        }
        let coverage = activity_pixels as f64 / self.total_pixels as f64;
        let risk = (coverage * 100.0 * self.risk_amplification).round();
        risk.clamp(0.0, 100.0) as u8
    }
}

fn count_mask_pixels(encoded: &str) -> Result<usize> {
    // Accept data URLs as well as bare base64
    let payload = match encoded.split_once(";base64,") {
        Some((_, data)) => data,
        None => encoded,
    };

    let bytes = base64::engine::general_purpose::STANDARD
        .decode(payload.trim())
        .map_err(|e| AnalysisError::Parse(format!("mask is not base64: {}", e)))?;
    let mask = image::load_from_memory(&bytes)
        .map_err(|e| AnalysisError::Parse(format!("mask is not an image: {}", e)))?
        .to_luma8();

    Ok(mask.pixels().filter(|p| p.0[0] != 0).count())
}
