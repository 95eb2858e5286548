// src/error.rs
//
// Failure taxonomy for one audit invocation. Input, file, decode, dimension
// and config errors are terminal and become the `{"error": ...}` record.
// Network and parse errors never leave the encroachment detector.

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, AnalysisError>;

#[derive(Error, Debug)]
pub enum AnalysisError {
    /// Missing or insufficient invocation arguments
    #[error("{0}")]
    Input(String),

    #[error("Missing image file: {}", .path.display())]
    FileNotFound { path: PathBuf },

    #[error("Failed to read {}: {source}", .path.display())]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to decode image {}: {source}", .path.display())]
    ImageDecode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Image {} has no pixels", .path.display())]
    EmptyImage { path: PathBuf },

    #[error(
        "Temporal rasters are not aligned: current {}x{}, historical {}x{}",
        .current.0, .current.1, .historical.0, .historical.1
    )]
    DimensionMismatch {
        current: (u32, u32),
        historical: (u32, u32),
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Transport failure or unexpected HTTP status from the segmentation service
    #[error("network error: {0}")]
    Network(String),

    /// Malformed segmentation response
    #[error("parse error: {0}")]
    Parse(String),
}

impl AnalysisError {
    pub fn input(msg: impl Into<String>) -> Self {
        Self::Input(msg.into())
    }

    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_message_is_verbatim() {
        assert_eq!(
            AnalysisError::input("Requires 2 arguments").to_string(),
            "Requires 2 arguments"
        );
        assert_eq!(
            AnalysisError::Network("timeout".into()).to_string(),
            "network error: timeout"
        );
    }

    #[test]
    fn test_messages_name_the_offending_path() {
        let err = AnalysisError::FileNotFound {
            path: PathBuf::from("/tmp/current.png"),
        };
        assert_eq!(err.to_string(), "Missing image file: /tmp/current.png");

        let err = AnalysisError::DimensionMismatch {
            current: (10, 10),
            historical: (20, 10),
        };
        assert!(err.to_string().contains("10x10"));
        assert!(err.to_string().contains("20x10"));
    }
}
