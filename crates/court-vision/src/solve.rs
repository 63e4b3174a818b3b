//! The strategy ensemble: normalize, recognize, accept or move on.

use serde::Serialize;

use crate::ocr::OcrEngine;
use crate::preprocess::{apply, load_grayscale};
use crate::types::{Strategy, VisionResult};

/// Shortest text accepted as a challenge solution.
pub const MIN_SOLUTION_LEN: usize = 4;

/// Longest text accepted as a challenge solution.
pub const MAX_SOLUTION_LEN: usize = 8;

/// One OCR pass and what it produced.
#[derive(Debug, Clone, Serialize)]
pub struct SolveAttempt {
    pub strategy: Strategy,
    /// Cleaned text, if the engine returned anything usable at all.
    pub text: Option<String>,
    /// Engine error message, if the pass failed outright.
    pub error: Option<String>,
}

/// Result of running every strategy until one is accepted.
#[derive(Debug, Clone, Serialize)]
pub struct SolveReport {
    pub solution: Option<String>,
    pub attempts: Vec<SolveAttempt>,
}

/// Strip everything but ASCII letters and digits and accept the result
/// only if its length looks like a challenge code.
pub fn clean_candidate(raw: &str) -> Option<String> {
    let cleaned: String = raw.chars().filter(|c| c.is_ascii_alphanumeric()).collect();
    if (MIN_SOLUTION_LEN..=MAX_SOLUTION_LEN).contains(&cleaned.len()) {
        Some(cleaned)
    } else {
        None
    }
}

/// Decode `bytes` and try each strategy in turn.
///
/// Fails only when the image cannot be decoded; per-pass OCR failures are
/// recorded in the report and the next strategy is tried.
pub fn solve_image(bytes: &[u8], engine: &dyn OcrEngine) -> VisionResult<SolveReport> {
    let gray = load_grayscale(bytes)?;
    let mut attempts = Vec::with_capacity(Strategy::ALL.len());

    for strategy in Strategy::ALL {
        let normalized = apply(strategy, &gray);
        match engine.recognize(&normalized) {
            Ok(raw) => {
                let accepted = clean_candidate(&raw);
                let cleaned: String = raw.chars().filter(|c| c.is_ascii_alphanumeric()).collect();
                attempts.push(SolveAttempt {
                    strategy,
                    text: (!cleaned.is_empty()).then_some(cleaned),
                    error: None,
                });
                if let Some(solution) = accepted {
                    tracing::debug!(
                        engine = engine.name(),
                        strategy = strategy.name(),
                        "challenge solved"
                    );
                    return Ok(SolveReport {
                        solution: Some(solution),
                        attempts,
                    });
                }
            }
            Err(e) => {
                tracing::debug!(strategy = strategy.name(), "ocr pass failed: {e}");
                attempts.push(SolveAttempt {
                    strategy,
                    text: None,
                    error: Some(e.to_string()),
                });
            }
        }
    }

    Ok(SolveReport {
        solution: None,
        attempts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preprocess::encode_png;
    use crate::types::VisionError;
    use image::{GrayImage, Luma};
    use std::sync::Mutex;

    /// Engine that replays canned answers, one per call.
    struct Scripted {
        answers: Mutex<Vec<VisionResult<String>>>,
        calls: Mutex<usize>,
    }

    impl Scripted {
        fn new(mut answers: Vec<VisionResult<String>>) -> Self {
            answers.reverse();
            Self {
                answers: Mutex::new(answers),
                calls: Mutex::new(0),
            }
        }
    }

    impl OcrEngine for Scripted {
        fn name(&self) -> &str {
            "scripted"
        }

        fn recognize(&self, _image: &GrayImage) -> VisionResult<String> {
            *self.calls.lock().unwrap() += 1;
            self.answers
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| Ok(String::new()))
        }
    }

    fn sample_png() -> Vec<u8> {
        let img = GrayImage::from_fn(40, 16, |x, _| Luma([if x % 5 == 0 { 0 } else { 255 }]));
        encode_png(&img).unwrap()
    }

    #[test]
    fn test_clean_candidate_bounds() {
        assert_eq!(clean_candidate(" a-b 1 2\n").as_deref(), Some("ab12"));
        assert_eq!(clean_candidate("ABCDEFGH").as_deref(), Some("ABCDEFGH"));
        assert_eq!(clean_candidate("abc"), None);
        assert_eq!(clean_candidate("ABCDEFGHI"), None);
        assert_eq!(clean_candidate("!!!"), None);
    }

    #[test]
    fn test_first_acceptable_pass_wins() {
        let engine = Scripted::new(vec![
            Ok("x1".to_string()),
            Ok("x7K9-p\n".to_string()),
            Ok("NEVER".to_string()),
        ]);
        let report = solve_image(&sample_png(), &engine).unwrap();
        assert_eq!(report.solution.as_deref(), Some("x7K9p"));
        assert_eq!(report.attempts.len(), 2);
        assert_eq!(report.attempts[1].strategy, Strategy::AdaptiveThreshold);
        assert_eq!(*engine.calls.lock().unwrap(), 2);
    }

    #[test]
    fn test_engine_errors_fall_through_to_next_strategy() {
        let engine = Scripted::new(vec![
            Err(VisionError::Ocr("crash".to_string())),
            Ok(String::new()),
            Ok("QW12".to_string()),
        ]);
        let report = solve_image(&sample_png(), &engine).unwrap();
        assert_eq!(report.solution.as_deref(), Some("QW12"));
        assert!(report.attempts[0].error.is_some());
        assert_eq!(report.attempts[2].strategy, Strategy::LaplacianOtsu);
    }

    #[test]
    fn test_unsolved_after_all_strategies() {
        let engine = Scripted::new(vec![]);
        let report = solve_image(&sample_png(), &engine).unwrap();
        assert!(report.solution.is_none());
        assert_eq!(report.attempts.len(), 3);
    }

    #[test]
    fn test_undecodable_image_is_an_error() {
        let engine = Scripted::new(vec![]);
        assert!(solve_image(b"<html>not an image</html>", &engine).is_err());
    }
}
