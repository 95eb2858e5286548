// src/cli.rs

use crate::error::{AnalysisError, Result};
use clap::Parser;
use std::path::PathBuf;

/// Positional paths are optional at the clap level so that a short argument
/// list still ends in an error record instead of a usage dump.
#[derive(Parser, Debug)]
#[command(
    name = "forest-audit",
    version,
    about = "Audit a forest parcel for deforestation and human encroachment"
)]
pub struct Cli {
    /// Current image of the parcel
    pub current: Option<PathBuf>,
    /// Historical baseline image, pixel-aligned with the current image
    pub historical: Option<PathBuf>,
    /// High-resolution image for encroachment detection (defaults to current)
    pub high_res: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AuditRequest {
    pub current: PathBuf,
    pub historical: PathBuf,
    pub high_res: PathBuf,
}

impl Cli {
    pub fn into_request(self) -> Result<AuditRequest> {
        match (self.current, self.historical) {
            (Some(current), Some(historical)) => {
                let high_res = self.high_res.unwrap_or_else(|| current.clone());
                Ok(AuditRequest {
                    current,
                    historical,
                    high_res,
                })
            }
            _ => Err(AnalysisError::input("Requires 2 arguments")),
        }
    }
}
