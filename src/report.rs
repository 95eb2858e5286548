// src/report.rs
//
// The one line the host reads from stdout. Either a full report or an
// error object, never both and never partial.

use crate::clustering::DensityComposition;
use crate::decision::{AuditStatus, Decision};
use crate::encroachment::EncroachmentResult;
use crate::temporal::ChangeResult;
use anyhow::Result;
use serde::Serialize;
use std::io::Write;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompositionSummary {
    pub dense: f64,
    pub sparse: f64,
    pub barren: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisReport {
    pub biomass_score: f64,
    pub carbon_tonnes: u64,
    pub deforestation_percent: f64,
    pub encroachment_risk: u8,
    pub probable_cause: String,
    pub status: AuditStatus,
    pub detected_features: Vec<String>,
    pub composition: CompositionSummary,
}

impl AnalysisReport {
    pub fn new(
        composition: &DensityComposition,
        change: &ChangeResult,
        encroachment: EncroachmentResult,
        carbon_tonnes: u64,
        decision: Decision,
    ) -> Self {
        Self {
            biomass_score: round_to(composition.precision_score, 2),
            carbon_tonnes,
            deforestation_percent: round_to(change.loss_percent(), 2),
            encroachment_risk: encroachment.risk_score,
            probable_cause: decision.probable_cause,
            status: decision.status,
            detected_features: encroachment.features,
            composition: CompositionSummary {
                dense: round_to(composition.dense_pct, 1),
                sparse: round_to(composition.sparse_pct, 1),
                barren: round_to(composition.barren_pct, 1),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorRecord {
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum OutputRecord {
    Report(AnalysisReport),
    Error(ErrorRecord),
}

impl OutputRecord {
    pub fn error(message: impl Into<String>) -> Self {
        OutputRecord::Error(ErrorRecord {
            error: message.into(),
        })
    }

    /// Write the record as a single JSON line.
    pub fn emit<W: Write>(&self, out: &mut W) -> Result<()> {
        let line = serde_json::to_string(self)?;
        writeln!(out, "{}", line)?;
        out.flush()?;
        Ok(())
    }
}

/// Round half away from zero to `decimals` places.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_report() -> AnalysisReport {
        let composition = DensityComposition {
            dense_pct: 62.349,
            sparse_pct: 25.0,
            barren_pct: 12.651,
            precision_score: 81.23456,
        };
        let decision = Decision {
            status: AuditStatus::Verified,
            probable_cause: "Stable Ecosystem".to_string(),
        };
        AnalysisReport::new(
            &composition,
            &ChangeResult {
                loss_fraction: 0.012345,
            },
            EncroachmentResult::degraded("API KEY MISSING"),
            6233,
            decision,
        )
    }

    #[test]
    fn test_rounding() {
        assert_eq!(round_to(81.23456, 2), 81.23);
        assert_eq!(round_to(62.349, 1), 62.3);
        assert_eq!(round_to(0.0, 2), 0.0);
    }

    #[test]
    fn test_report_fields() {
        let report = sample_report();
        assert_eq!(report.biomass_score, 81.23);
        assert_eq!(report.deforestation_percent, 1.23);
        assert_eq!(report.composition.dense, 62.3);
        assert_eq!(report.composition.barren, 12.7);

        let json: serde_json::Value =
            serde_json::to_value(OutputRecord::Report(report)).unwrap();
        assert_eq!(json["status"], "VERIFIED");
        assert_eq!(json["encroachment_risk"], 0);
        assert_eq!(json["carbon_tonnes"], 6233);
        assert_eq!(json["detected_features"][0], "API KEY MISSING");
        assert_eq!(json["composition"]["sparse"], 25.0);
        assert!(json.get("error").is_none());
    }

    #[test]
    fn test_emits_one_line() {
        let mut out = Vec::new();
        OutputRecord::Report(sample_report()).emit(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.ends_with('\n'));
        assert_eq!(text.trim_end().lines().count(), 1);
    }

    #[test]
    fn test_error_record_has_only_error_key() {
        let mut out = Vec::new();
        OutputRecord::error("Missing image files")
            .emit(&mut out)
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(json, serde_json::json!({ "error": "Missing image files" }));
    }
}
