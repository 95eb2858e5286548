// src/encroachment/mod.rs
//
// Remote encroachment detection.
//
// The high-resolution image is squeezed to the model's inference size,
// JPEG-encoded and posted to a hosted semantic-segmentation model. Labels
// outside the benign allow-list (vegetation, water, terrain, sky) are
// treated as human activity.
//
// The detector never fails: a missing credential, a rejected request, a
// dead connection or an unreadable response all degrade to a zero-risk
// result carrying one diagnostic label.

pub mod retry;
pub mod segments;
pub mod transport;

pub use retry::{CallOutcome, RetryPolicy, Sleeper, TokioSleeper};
pub use segments::{SegmentObservation, SegmentScorer};
pub use transport::{HttpTransport, SegmentationTransport};

use crate::types::EncroachmentConfig;
use image::imageops::FilterType;
use image::DynamicImage;
use serde::Serialize;
use tracing::{debug, error, info, warn};

pub const API_KEY_MISSING: &str = "API KEY MISSING";
pub const API_ERROR: &str = "API ERROR";
pub const SYSTEM_ERROR: &str = "SYSTEM ERROR";

// ============================================================================
// RESULT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EncroachmentResult {
    /// 0-100
    pub risk_score: u8,
    /// Uppercased non-benign labels in detection order, no duplicates
    pub features: Vec<String>,
    #[serde(skip)]
    pub observations: Vec<SegmentObservation>,
}

impl EncroachmentResult {
    /// Zero-risk result carrying a single diagnostic label.
    pub fn degraded(label: &str) -> Self {
        Self {
            risk_score: 0,
            features: vec![label.to_string()],
            observations: Vec::new(),
        }
    }
}

// ============================================================================
// DETECTOR
// ============================================================================

pub struct EncroachmentDetector<T, S> {
    transport: Option<T>,
    sleeper: S,
    policy: RetryPolicy,
    scorer: SegmentScorer,
    inference_size: u32,
    jpeg_quality: u8,
}

impl<T: SegmentationTransport, S: Sleeper> EncroachmentDetector<T, S> {
    /// `transport` is `None` when no credential is configured.
    pub fn new(config: &EncroachmentConfig, transport: Option<T>, sleeper: S) -> Self {
        Self {
            transport,
            sleeper,
            policy: RetryPolicy::new(
                config.max_attempts,
                config.default_wait_secs,
                config.max_wait_secs,
            ),
            scorer: SegmentScorer::new(config),
            inference_size: config.inference_size,
            jpeg_quality: config.jpeg_quality,
        }
    }

    pub async fn detect(&self, image: &DynamicImage) -> EncroachmentResult {
        let Some(transport) = self.transport.as_ref() else {
            warn!("🔑 No segmentation API key configured, skipping encroachment scan");
            return EncroachmentResult::degraded(API_KEY_MISSING);
        };

        let payload = match encode_for_inference(image, self.inference_size, self.jpeg_quality) {
            Some(bytes) => bytes,
            None => {
                error!("Failed to encode inference image");
                return EncroachmentResult::degraded(SYSTEM_ERROR);
            }
        };

        info!(
            "🛰️ Sending {}x{} inference image ({} bytes) for segmentation",
            self.inference_size,
            self.inference_size,
            payload.len()
        );

        match self.policy.execute(transport, &self.sleeper, &payload).await {
            CallOutcome::Success(body) => match segments::parse_segments(&body) {
                Ok(segments) => {
                    info!("🛰️ Segmentation returned {} segments", segments.len());
                    let result = self.scorer.score(&segments);
                    log_observations(&result.observations);
                    result
                }
                Err(e) => {
                    error!("Unreadable segmentation response: {}", e);
                    EncroachmentResult::degraded(SYSTEM_ERROR)
                }
            },
            CallOutcome::Rejected(status) => {
                error!("Segmentation service rejected the request ({})", status);
                EncroachmentResult::degraded(API_ERROR)
            }
            CallOutcome::Exhausted { attempts } => {
                error!("Segmentation model unavailable after {} attempts", attempts);
                EncroachmentResult::degraded(API_ERROR)
            }
            CallOutcome::TransportFailed(reason) => {
                error!("Segmentation request failed: {}", reason);
                EncroachmentResult::degraded(SYSTEM_ERROR)
            }
        }
    }
}

fn log_observations(observations: &[SegmentObservation]) {
    let counted = observations.iter().filter(|o| o.counted).count();
    debug!(
        "Observed {} segments above diagnostic score, {} counted as activity",
        observations.len(),
        counted
    );
    for o in observations.iter().filter(|o| !o.counted) {
        debug!(
            "  ignored {} (score {:.2}, {} px)",
            o.label, o.score, o.mask_pixels
        );
    }
}

/// Resize to `size`x`size` and JPEG-encode. Returns None on failure.
fn encode_for_inference(image: &DynamicImage, size: u32, quality: u8) -> Option<Vec<u8>> {
    let resized = image::imageops::resize(&image.to_rgb8(), size, size, FilterType::Triangle);

    let mut buf = std::io::Cursor::new(Vec::new());
    let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buf, quality);
    resized.write_with_encoder(encoder).ok()?;

    Some(buf.into_inner())
}
