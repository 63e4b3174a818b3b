//! Core types for challenge-image processing.

use serde::{Deserialize, Serialize};

/// Image normalization applied before an OCR pass.
///
/// Strategies are tried in declaration order; each one targets a different
/// kind of noise commonly found in portal challenge images.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Fixed threshold at mid-gray followed by a 2x2 morphological close.
    BinaryThreshold,
    /// Gaussian-weighted local threshold (block 11, offset 2).
    AdaptiveThreshold,
    /// Blur, Laplacian edge enhancement, then Otsu's global threshold.
    LaplacianOtsu,
}

impl Strategy {
    /// Every strategy, in the order the solver tries them.
    pub const ALL: [Strategy; 3] = [
        Strategy::BinaryThreshold,
        Strategy::AdaptiveThreshold,
        Strategy::LaplacianOtsu,
    ];

    /// Short stable name used in logs.
    pub fn name(self) -> &'static str {
        match self {
            Strategy::BinaryThreshold => "binary_threshold",
            Strategy::AdaptiveThreshold => "adaptive_threshold",
            Strategy::LaplacianOtsu => "laplacian_otsu",
        }
    }
}

/// Errors that can occur while decoding or recognizing a challenge image.
#[derive(thiserror::Error, Debug)]
pub enum VisionError {
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("OCR engine not available: {0}")]
    EngineNotAvailable(String),

    #[error("OCR failed: {0}")]
    Ocr(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Convenience result type.
pub type VisionResult<T> = Result<T, VisionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strategy_order_is_stable() {
        let names: Vec<_> = Strategy::ALL.iter().map(|s| s.name()).collect();
        assert_eq!(
            names,
            vec!["binary_threshold", "adaptive_threshold", "laplacian_otsu"]
        );
    }
}
