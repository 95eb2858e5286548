// src/decision.rs
//
// Final verdict. Rules are checked in order and the first match wins:
// encroachment evidence outranks deforestation, which outranks biomass.

use crate::types::DecisionConfig;
use serde::Serialize;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditStatus {
    CriticalEncroachment,
    WarningActivity,
    RejectedDeforestation,
    RejectedLowBiomass,
    Verified,
}

impl AuditStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditStatus::CriticalEncroachment => "CRITICAL_ENCROACHMENT",
            AuditStatus::WarningActivity => "WARNING_ACTIVITY",
            AuditStatus::RejectedDeforestation => "REJECTED_DEFORESTATION",
            AuditStatus::RejectedLowBiomass => "REJECTED_LOW_BIOMASS",
            AuditStatus::Verified => "VERIFIED",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    pub status: AuditStatus,
    pub probable_cause: String,
}

/// Every signal the combiner looks at.
#[derive(Debug, Clone)]
pub struct Signals<'a> {
    /// 0-100
    pub precision_score: f64,
    /// 0-1
    pub loss_fraction: f64,
    /// 0-100
    pub risk_score: u8,
    pub features: &'a [String],
    pub carbon_tonnes: u64,
}

pub struct DecisionCombiner {
    config: DecisionConfig,
}

impl DecisionCombiner {
    pub fn new(config: DecisionConfig) -> Self {
        Self { config }
    }

    pub fn decide(&self, signals: &Signals<'_>) -> Decision {
        let cfg = &self.config;

        let decision = if signals.risk_score > cfg.critical_risk {
            let named: Vec<&str> = signals
                .features
                .iter()
                .take(cfg.max_cause_features)
                .map(String::as_str)
                .collect();
            let probable_cause = if named.is_empty() {
                "Human Activity".to_string()
            } else {
                format!("Human Activity: {}", named.join(", "))
            };
            Decision {
                status: AuditStatus::CriticalEncroachment,
                probable_cause,
            }
        } else if signals.risk_score > cfg.warning_risk {
            Decision {
                status: AuditStatus::WarningActivity,
                probable_cause: "Potential Land Use Detected".to_string(),
            }
        } else if signals.loss_fraction * 100.0 > cfg.deforestation_percent {
            Decision {
                status: AuditStatus::RejectedDeforestation,
                probable_cause: "Deforestation".to_string(),
            }
        } else if signals.precision_score < cfg.min_biomass {
            Decision {
                status: AuditStatus::RejectedLowBiomass,
                probable_cause: "Low Vegetation Density".to_string(),
            }
        } else {
            Decision {
                status: AuditStatus::Verified,
                probable_cause: "Stable Ecosystem".to_string(),
            }
        };

        info!(
            "⚖️ Verdict {} ({}) | biomass={:.2} loss={:.2}% risk={} carbon={}t",
            decision.status.as_str(),
            decision.probable_cause,
            signals.precision_score,
            signals.loss_fraction * 100.0,
            signals.risk_score,
            signals.carbon_tonnes
        );

        decision
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decide(precision: f64, loss: f64, risk: u8, features: &[String]) -> Decision {
        DecisionCombiner::new(DecisionConfig::default()).decide(&Signals {
            precision_score: precision,
            loss_fraction: loss,
            risk_score: risk,
            features,
            carbon_tonnes: 0,
        })
    }

    fn labels(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_encroachment_overrides_everything() {
        let features = labels(&["BUILDING", "ROAD", "CAR"]);
        let decision = decide(10.0, 0.5, 40, &features);
        assert_eq!(decision.status, AuditStatus::CriticalEncroachment);
        assert_eq!(decision.probable_cause, "Human Activity: BUILDING, ROAD");
    }

    #[test]
    fn test_critical_without_labels() {
        let decision = decide(90.0, 0.0, 31, &[]);
        assert_eq!(decision.status, AuditStatus::CriticalEncroachment);
        assert_eq!(decision.probable_cause, "Human Activity");
    }

    #[test]
    fn test_warning_band() {
        let decision = decide(10.0, 0.9, 30, &[]);
        assert_eq!(decision.status, AuditStatus::WarningActivity);
        assert_eq!(decision.probable_cause, "Potential Land Use Detected");

        // thresholds are strict
        assert_eq!(decide(90.0, 0.0, 10, &[]).status, AuditStatus::Verified);
    }

    #[test]
    fn test_deforestation_before_biomass() {
        let decision = decide(10.0, 0.11, 0, &[]);
        assert_eq!(decision.status, AuditStatus::RejectedDeforestation);
        assert_eq!(decision.probable_cause, "Deforestation");

        assert_eq!(decide(90.0, 0.10, 0, &[]).status, AuditStatus::Verified);
    }

    #[test]
    fn test_low_biomass() {
        let decision = decide(64.99, 0.0, 0, &[]);
        assert_eq!(decision.status, AuditStatus::RejectedLowBiomass);
        assert_eq!(decide(65.0, 0.0, 0, &[]).status, AuditStatus::Verified);
    }

    #[test]
    fn test_verified() {
        let decision = decide(100.0, 0.0, 0, &labels(&["API KEY MISSING"]));
        assert_eq!(decision.status, AuditStatus::Verified);
        assert_eq!(decision.probable_cause, "Stable Ecosystem");
    }

    #[test]
    fn test_status_serializes_screaming_snake() {
        let json = serde_json::to_string(&AuditStatus::RejectedLowBiomass).unwrap();
        assert_eq!(json, "\"REJECTED_LOW_BIOMASS\"");
    }
}
