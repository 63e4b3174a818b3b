//! OCR engine seam and the Tesseract command-line backend.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use image::GrayImage;

use crate::preprocess::encode_png;
use crate::types::{VisionError, VisionResult};

/// Page segmentation mode 7: treat the image as a single line of text.
const SINGLE_LINE_PSM: u8 = 7;

/// Anything that can turn a normalized image into text.
pub trait OcrEngine: Send + Sync {
    /// Engine name for logs.
    fn name(&self) -> &str;

    /// Recognize the text in `image`. May return an empty string.
    fn recognize(&self, image: &GrayImage) -> VisionResult<String>;
}

/// OCR via the `tesseract` binary, fed PNG on stdin.
#[derive(Debug, Clone)]
pub struct TesseractCli {
    binary: PathBuf,
    psm: u8,
}

impl TesseractCli {
    /// Use an explicit binary path.
    pub fn with_binary(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            psm: SINGLE_LINE_PSM,
        }
    }

    /// Find tesseract: explicit path first, then `COURT_TESSERACT_PATH`,
    /// then `PATH`.
    pub fn locate(explicit: Option<&Path>) -> VisionResult<Self> {
        if let Some(path) = explicit {
            if path.exists() {
                return Ok(Self::with_binary(path));
            }
            return Err(VisionError::EngineNotAvailable(format!(
                "configured tesseract binary does not exist: {}",
                path.display()
            )));
        }

        if let Ok(p) = std::env::var("COURT_TESSERACT_PATH") {
            let path = PathBuf::from(p.trim());
            if path.exists() {
                return Ok(Self::with_binary(path));
            }
        }

        which::which("tesseract")
            .map(Self::with_binary)
            .map_err(|e| VisionError::EngineNotAvailable(format!("tesseract not found: {e}")))
    }

    /// Override the page segmentation mode.
    pub fn psm(mut self, psm: u8) -> Self {
        self.psm = psm;
        self
    }

    /// Path of the binary this engine runs.
    pub fn binary(&self) -> &Path {
        &self.binary
    }
}

impl OcrEngine for TesseractCli {
    fn name(&self) -> &str {
        "tesseract"
    }

    fn recognize(&self, image: &GrayImage) -> VisionResult<String> {
        let png = encode_png(image)?;

        let mut child = Command::new(&self.binary)
            .arg("stdin")
            .arg("stdout")
            .arg("--psm")
            .arg(self.psm.to_string())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(&png)?;
        }

        let output = child.wait_with_output()?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(VisionError::Ocr(format!(
                "tesseract exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    #[test]
    fn test_locate_rejects_missing_explicit_binary() {
        let err = TesseractCli::locate(Some(Path::new("/nonexistent/tesseract"))).unwrap_err();
        assert!(matches!(err, VisionError::EngineNotAvailable(_)));
    }

    // Both fake binaries are written before either is executed so no
    // write handle is open while a child process starts.
    #[cfg(unix)]
    #[test]
    fn test_recognize_runs_binary_and_reports_failures() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("fake-tesseract");
        let broken = dir.path().join("broken-tesseract");
        std::fs::write(&good, "#!/bin/sh\ncat > /dev/null\necho 'K7 p2Q'\n").unwrap();
        std::fs::write(&broken, "#!/bin/sh\ncat > /dev/null\necho boom >&2\nexit 3\n").unwrap();
        for script in [&good, &broken] {
            std::fs::set_permissions(script, std::fs::Permissions::from_mode(0o755)).unwrap();
        }

        let img = GrayImage::from_pixel(10, 10, Luma([255]));

        let text = TesseractCli::with_binary(&good).recognize(&img).unwrap();
        assert_eq!(text.trim(), "K7 p2Q");

        let err = TesseractCli::with_binary(&broken).recognize(&img).unwrap_err();
        assert!(matches!(err, VisionError::Ocr(msg) if msg.contains("boom")));
    }
}
