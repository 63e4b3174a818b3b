//! Court-vision — challenge-image normalization and OCR for court portals.

pub mod ocr;
pub mod preprocess;
pub mod solve;
pub mod types;

pub use ocr::{OcrEngine, TesseractCli};
pub use preprocess::{encode_png, load_grayscale};
pub use solve::{clean_candidate, solve_image, SolveAttempt, SolveReport};
pub use types::*;
