// src/pipeline.rs
//
// One audit invocation: load the three images, run the raster analysis on a
// blocking worker while the encroachment call is in flight, then combine.

use crate::carbon::CarbonEstimator;
use crate::cli::AuditRequest;
use crate::clustering::{DensityClusterer, DensityComposition};
use crate::decision::{DecisionCombiner, Signals};
use crate::encroachment::{
    EncroachmentDetector, HttpTransport, SegmentationTransport, Sleeper, TokioSleeper,
};
use crate::error::AnalysisError;
use crate::raster::{load_image, Raster};
use crate::report::AnalysisReport;
use crate::temporal::{ChangeDetector, ChangeResult};
use crate::types::Config;
use crate::vegetation::VegetationMetrics;
use anyhow::{Context, Result};
use tracing::info;

/// Everything derived from the current/historical pair.
#[derive(Debug, Clone)]
pub struct VegetationAnalysis {
    pub change: ChangeResult,
    pub composition: DensityComposition,
    pub carbon_tonnes: u64,
}

pub fn analyze_vegetation(
    current: &Raster,
    historical: &Raster,
    config: &Config,
) -> std::result::Result<VegetationAnalysis, AnalysisError> {
    let current_metrics = VegetationMetrics::extract(current);
    let historical_metrics = VegetationMetrics::extract(historical);
    info!(
        "🌲 Mean vegetation intensity: current={:.3} historical={:.3} ({} px)",
        current_metrics.mean_intensity, historical_metrics.mean_intensity, current_metrics.total_pixels
    );

    let change = ChangeDetector::new(config.vegetation.loss_threshold).detect(current, historical)?;
    let composition = DensityClusterer::from_config(&config.clustering).classify(current);
    let carbon_tonnes = CarbonEstimator::new(&config.carbon).estimate(&composition)?;

    Ok(VegetationAnalysis {
        change,
        composition,
        carbon_tonnes,
    })
}

/// Detector backed by the HTTP service, or without transport when no
/// credential is configured.
pub fn build_detector(config: &Config) -> Result<EncroachmentDetector<HttpTransport, TokioSleeper>> {
    let enc = &config.encroachment;
    let transport = match config.api_key() {
        Some(key) => {
            let transport = HttpTransport::new(enc.endpoint.clone(), key, enc.timeout_secs)
                .context("Failed to set up segmentation client")?;
            info!("🔗 Segmentation endpoint: {}", transport.endpoint());
            Some(transport)
        }
        None => None,
    };
    Ok(EncroachmentDetector::new(enc, transport, TokioSleeper))
}

pub async fn run_audit<T, S>(
    request: &AuditRequest,
    config: &Config,
    detector: &EncroachmentDetector<T, S>,
) -> Result<AnalysisReport>
where
    T: SegmentationTransport,
    S: Sleeper,
{
    let current_img = load_image(&request.current)?;
    let historical_img = load_image(&request.historical)?;
    let high_res_img = if request.high_res == request.current {
        current_img.clone()
    } else {
        load_image(&request.high_res)?
    };

    let channel = config.vegetation.channel;
    let current = Raster::from_image(&current_img, channel);
    let historical = Raster::from_image(&historical_img, channel);
    drop(current_img);
    drop(historical_img);

    let raster_config = config.clone();
    let raster_work = tokio::task::spawn_blocking(move || {
        analyze_vegetation(&current, &historical, &raster_config)
    });

    let (vegetation, encroachment) = tokio::join!(raster_work, detector.detect(&high_res_img));
    let vegetation = vegetation.context("Raster analysis task failed")??;

    let decision = DecisionCombiner::new(config.decision.clone()).decide(&Signals {
        precision_score: vegetation.composition.precision_score,
        loss_fraction: vegetation.change.loss_fraction,
        risk_score: encroachment.risk_score,
        features: &encroachment.features,
        carbon_tonnes: vegetation.carbon_tonnes,
    });

    Ok(AnalysisReport::new(
        &vegetation.composition,
        &vegetation.change,
        encroachment,
        vegetation.carbon_tonnes,
        decision,
    ))
}
