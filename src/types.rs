use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub vegetation: VegetationConfig,
    pub clustering: ClusteringConfig,
    pub carbon: CarbonConfig,
    pub encroachment: EncroachmentConfig,
    pub decision: DecisionConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VegetationConfig {
    /// Image channel used as the vegetation proxy
    pub channel: Channel,
    /// Normalized intensity drop beyond which a pixel counts as lost
    pub loss_threshold: f64,
}

impl Default for VegetationConfig {
    fn default() -> Self {
        Self {
            channel: Channel::Green,
            loss_threshold: 0.15,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusteringConfig {
    pub clusters: usize,
    pub max_iterations: usize,
    /// Center movement (0-255 scale) under which the partition is converged
    pub epsilon: f64,
    pub init: SeedingStrategy,
    pub seed: Option<u64>,
}

impl Default for ClusteringConfig {
    fn default() -> Self {
        Self {
            clusters: 3,
            max_iterations: 10,
            epsilon: 1.0,
            init: SeedingStrategy::Spread,
            seed: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CarbonConfig {
    pub area_hectares: f64,
    pub dense_tonnes_per_hectare: f64,
    pub sparse_tonnes_per_hectare: f64,
}

impl Default for CarbonConfig {
    fn default() -> Self {
        Self {
            area_hectares: 50.0,
            dense_tonnes_per_hectare: 180.0,
            sparse_tonnes_per_hectare: 50.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EncroachmentConfig {
    pub endpoint: String,
    /// Name of the environment variable holding the bearer token
    pub api_key_env: String,
    /// Square side of the image sent for inference
    pub inference_size: u32,
    pub timeout_secs: u64,
    pub max_attempts: u32,
    pub default_wait_secs: f64,
    pub max_wait_secs: f64,
    /// Segments below this score are not counted as activity
    pub min_score: f64,
    /// Segments at or above this score are logged
    pub diagnostic_score: f64,
    /// Fraction of inference pixels a non-benign mask must exceed
    pub min_coverage: f64,
    pub risk_amplification: f64,
    pub jpeg_quality: u8,
    pub benign_labels: Vec<String>,
}

impl Default for EncroachmentConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api-inference.huggingface.co/models/nvidia/segformer-b0-finetuned-ade-512-512"
                .to_string(),
            api_key_env: "SEGMENTATION_API_TOKEN".to_string(),
            inference_size: 512,
            timeout_secs: 30,
            max_attempts: 3,
            default_wait_secs: 10.0,
            max_wait_secs: 120.0,
            min_score: 0.2,
            diagnostic_score: 0.15,
            min_coverage: 0.005,
            risk_amplification: 5.0,
            jpeg_quality: 90,
            benign_labels: [
                "tree", "vegetation", "grass", "plant", "palm", "canopy", "flora", "water",
                "river", "sea", "lake", "ocean", "mountain", "sky", "cloud",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DecisionConfig {
    pub critical_risk: u8,
    pub warning_risk: u8,
    pub deforestation_percent: f64,
    pub min_biomass: f64,
    pub max_cause_features: usize,
}

impl Default for DecisionConfig {
    fn default() -> Self {
        Self {
            critical_risk: 30,
            warning_risk: 10,
            deforestation_percent: 10.0,
            min_biomass: 65.0,
            max_cause_features: 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Red,
    Green,
    Blue,
}

impl Channel {
    /// Offset of this channel within an RGB8 pixel.
    pub fn index(&self) -> usize {
        match self {
            Channel::Red => 0,
            Channel::Green => 1,
            Channel::Blue => 2,
        }
    }
}

/// How the density clusterer picks its starting centers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeedingStrategy {
    Spread,
    Random,
}
