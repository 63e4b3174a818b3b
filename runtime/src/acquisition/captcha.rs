//! Challenge detection and best-effort solving.
//!
//! A challenge moves `Detected -> ImageFetched -> {Solved | Unsolved}`;
//! a page without one never produces a [`CaptchaChallenge`] at all. Every
//! failure inside the pipeline ends in [`CaptchaOutcome::Unsolved`].

use std::sync::{Arc, OnceLock};

use base64::Engine as _;
use court_vision::{solve_image, OcrEngine};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::acquisition::http_client::SessionManager;

/// Input name submitted when the page does not reveal one.
const DEFAULT_FIELD_NAME: &str = "captcha";

/// Where a challenge is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptchaState {
    Detected,
    ImageFetched,
    Solved,
    Unsolved,
}

/// One challenge found on one page. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptchaChallenge {
    /// Absolute image URL, or a `data:` URI.
    pub image_url: Option<String>,
    pub input_field_name: String,
    pub image_bytes: Option<Vec<u8>>,
    pub solution: Option<String>,
    pub state: CaptchaState,
}

impl CaptchaChallenge {
    fn detected(image_url: Option<String>, input_field_name: String) -> Self {
        Self {
            image_url,
            input_field_name,
            image_bytes: None,
            solution: None,
            state: CaptchaState::Detected,
        }
    }
}

/// Terminal result of the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptchaOutcome {
    Solved { field_name: String, solution: String },
    Unsolved { reason: String },
}

fn indicator_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)captcha|security.*code|verification.*image|prove.*human")
            .expect("captcha indicator regex is valid")
    })
}

fn selector(css: &'static str) -> Selector {
    Selector::parse(css).expect("static selector is valid")
}

/// Scan `markup` for a challenge. `page_url` resolves relative image paths.
pub fn detect(markup: &str, page_url: Option<&Url>) -> Option<CaptchaChallenge> {
    if !indicator_regex().is_match(markup) {
        return None;
    }

    let doc = Html::parse_document(markup);
    let image_url = find_challenge_image(&doc).map(|src| resolve_image_url(&src, page_url));
    let field = find_challenge_input(&doc).unwrap_or_else(|| DEFAULT_FIELD_NAME.to_string());

    tracing::debug!(image = ?image_url, field = %field, "challenge detected");
    Some(CaptchaChallenge::detected(image_url, field))
}

fn attr_mentions(el: &ElementRef<'_>, attrs: &[&str], needles: &[&str]) -> bool {
    attrs.iter().any(|attr| {
        el.value()
            .attr(attr)
            .map(|v| {
                let v = v.to_ascii_lowercase();
                needles.iter().any(|n| v.contains(n))
            })
            .unwrap_or(false)
    })
}

fn find_challenge_image(doc: &Html) -> Option<String> {
    let img = selector("img");
    doc.select(&img)
        .find(|el| {
            attr_mentions(
                el,
                &["id", "class", "alt", "name", "src"],
                &["captcha", "security"],
            )
        })
        .and_then(|el| el.value().attr("src"))
        .map(|src| src.trim().to_string())
        .filter(|src| !src.is_empty())
}

fn find_challenge_input(doc: &Html) -> Option<String> {
    let input = selector("input");
    let field_name = |el: ElementRef<'_>| {
        el.value()
            .attr("name")
            .or_else(|| el.value().attr("id"))
            .map(str::to_string)
    };

    doc.select(&input)
        .find(|el| attr_mentions(el, &["name", "id"], &["captcha", "security"]))
        .and_then(field_name)
        .or_else(|| {
            doc.select(&input)
                .find(|el| attr_mentions(el, &["name"], &["code", "verify"]))
                .and_then(field_name)
        })
}

fn resolve_image_url(src: &str, page_url: Option<&Url>) -> String {
    if src.starts_with("data:") {
        return src.to_string();
    }
    match page_url.map(|base| base.join(src)) {
        Some(Ok(joined)) => joined.to_string(),
        _ => src.to_string(),
    }
}

/// Decode a base64 `data:` URI payload.
pub fn decode_data_uri(uri: &str) -> Option<Vec<u8>> {
    let rest = uri.strip_prefix("data:")?;
    let (header, payload) = rest.split_once(',')?;
    if !header.to_ascii_lowercase().ends_with(";base64") {
        return None;
    }
    let compact: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
    base64::engine::general_purpose::STANDARD.decode(compact).ok()
}

/// Fetches challenge images and runs them through OCR.
#[derive(Clone, Default)]
pub struct CaptchaPipeline {
    engine: Option<Arc<dyn OcrEngine>>,
}

impl CaptchaPipeline {
    pub fn new(engine: Option<Arc<dyn OcrEngine>>) -> Self {
        Self { engine }
    }

    pub fn has_engine(&self) -> bool {
        self.engine.is_some()
    }

    /// Drive `challenge` to a terminal state. Never fails.
    pub async fn solve(
        &self,
        session: &SessionManager,
        challenge: &mut CaptchaChallenge,
    ) -> CaptchaOutcome {
        let outcome = self.try_solve(session, challenge).await;
        match &outcome {
            Ok(solution) => {
                challenge.solution = Some(solution.clone());
                challenge.state = CaptchaState::Solved;
                CaptchaOutcome::Solved {
                    field_name: challenge.input_field_name.clone(),
                    solution: solution.clone(),
                }
            }
            Err(reason) => {
                tracing::warn!("challenge unsolved: {reason}");
                challenge.state = CaptchaState::Unsolved;
                CaptchaOutcome::Unsolved {
                    reason: reason.clone(),
                }
            }
        }
    }

    async fn try_solve(
        &self,
        session: &SessionManager,
        challenge: &mut CaptchaChallenge,
    ) -> Result<String, String> {
        let engine = self
            .engine
            .clone()
            .ok_or_else(|| "no OCR engine available".to_string())?;
        let image_url = challenge
            .image_url
            .clone()
            .ok_or_else(|| "challenge image not found in page".to_string())?;

        let bytes = if image_url.starts_with("data:") {
            decode_data_uri(&image_url).ok_or_else(|| "undecodable data URI".to_string())?
        } else {
            let (status, bytes) = session
                .fetch_bytes(&image_url)
                .await
                .map_err(|e| e.to_string())?;
            if !(200..300).contains(&status) {
                return Err(format!("challenge image returned HTTP {status}"));
            }
            bytes
        };
        challenge.image_bytes = Some(bytes.clone());
        challenge.state = CaptchaState::ImageFetched;

        let report = tokio::task::spawn_blocking(move || solve_image(&bytes, engine.as_ref()))
            .await
            .map_err(|e| format!("OCR task failed: {e}"))?
            .map_err(|e| e.to_string())?;

        report.solution.ok_or_else(|| {
            format!(
                "no strategy produced a {}-{} character answer ({} passes)",
                court_vision::solve::MIN_SOLUTION_LEN,
                court_vision::solve::MAX_SOLUTION_LEN,
                report.attempts.len()
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use court_vision::VisionResult;
    use image::{GrayImage, ImageFormat, Luma};
    use std::io::Cursor;

    struct Fixed(&'static str);

    impl OcrEngine for Fixed {
        fn name(&self) -> &str {
            "fixed"
        }
        fn recognize(&self, _image: &GrayImage) -> VisionResult<String> {
            Ok(self.0.to_string())
        }
    }

    fn png_data_uri() -> String {
        let img = GrayImage::from_fn(40, 16, |x, _| if x % 5 == 0 { Luma([0]) } else { Luma([255]) });
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, ImageFormat::Png).unwrap();
        format!(
            "data:image/png;base64,{}",
            base64::engine::general_purpose::STANDARD.encode(buf.into_inner())
        )
    }

    fn session() -> SessionManager {
        SessionManager::new(&EngineConfig::default()).unwrap()
    }

    #[test]
    fn test_plain_page_has_no_challenge() {
        let page = "<html><body><table><tr><td>Petitioner</td><td>Ram</td></tr></table></body></html>";
        assert_eq!(detect(page, None), None);
    }

    #[test]
    fn test_text_only_challenge_has_no_image() {
        let page = "<html><body><p>Please enter the CAPTCHA shown</p></body></html>";
        let challenge = detect(page, None).unwrap();
        assert_eq!(challenge.state, CaptchaState::Detected);
        assert_eq!(challenge.image_url, None);
        assert_eq!(challenge.input_field_name, "captcha");
    }

    #[test]
    fn test_image_and_field_are_found() {
        let base = Url::parse("https://portal.example/hc/main.php").unwrap();
        let page = r#"
            <form>
              <img src="/images/logo.png" alt="logo">
              <img id="captcha_image" src="securimage/show.php?x=1">
              <input name="case_no">
              <input name="fcaptcha_code" type="text">
            </form>"#;
        let challenge = detect(page, Some(&base)).unwrap();
        assert_eq!(
            challenge.image_url.as_deref(),
            Some("https://portal.example/hc/securimage/show.php?x=1")
        );
        assert_eq!(challenge.input_field_name, "fcaptcha_code");
    }

    #[test]
    fn test_field_falls_back_to_code_names() {
        let page = r#"<p>Security Code</p><img class="SecurityImg" src="img.png"><input name="verify_code">"#;
        let challenge = detect(page, None).unwrap();
        assert_eq!(challenge.image_url.as_deref(), Some("img.png"));
        assert_eq!(challenge.input_field_name, "verify_code");
    }

    #[test]
    fn test_data_uri_decoding() {
        assert_eq!(decode_data_uri("data:text/plain;base64,QUJD"), Some(b"ABC".to_vec()));
        assert_eq!(decode_data_uri("data:text/plain,ABC"), None);
        assert_eq!(decode_data_uri("https://x/y.png"), None);
    }

    #[tokio::test]
    async fn test_missing_engine_is_unsolved() {
        let mut challenge = CaptchaChallenge::detected(Some(png_data_uri()), "captcha".into());
        let outcome = CaptchaPipeline::default().solve(&session(), &mut challenge).await;
        assert!(matches!(outcome, CaptchaOutcome::Unsolved { .. }));
        assert_eq!(challenge.state, CaptchaState::Unsolved);
    }

    #[tokio::test]
    async fn test_missing_image_is_unsolved() {
        let pipeline = CaptchaPipeline::new(Some(Arc::new(Fixed("AB12"))));
        let mut challenge = CaptchaChallenge::detected(None, "captcha".into());
        let outcome = pipeline.solve(&session(), &mut challenge).await;
        assert!(matches!(outcome, CaptchaOutcome::Unsolved { .. }));
    }

    #[tokio::test]
    async fn test_inline_image_is_solved() {
        let pipeline = CaptchaPipeline::new(Some(Arc::new(Fixed(" a-b 1 2 "))));
        let mut challenge = CaptchaChallenge::detected(Some(png_data_uri()), "cap".into());
        let outcome = pipeline.solve(&session(), &mut challenge).await;
        assert_eq!(
            outcome,
            CaptchaOutcome::Solved {
                field_name: "cap".into(),
                solution: "ab12".into(),
            }
        );
        assert_eq!(challenge.state, CaptchaState::Solved);
        assert!(challenge.image_bytes.is_some());
    }

    #[tokio::test]
    async fn test_implausible_answers_are_unsolved() {
        let pipeline = CaptchaPipeline::new(Some(Arc::new(Fixed("x"))));
        let mut challenge = CaptchaChallenge::detected(Some(png_data_uri()), "cap".into());
        let outcome = pipeline.solve(&session(), &mut challenge).await;
        assert!(matches!(outcome, CaptchaOutcome::Unsolved { .. }));
        assert_eq!(challenge.state, CaptchaState::Unsolved);
    }
}
