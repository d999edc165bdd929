//! The visual verification loop: render candidate markup, compare it
//! against a reference screenshot, and apply correction hints until the
//! candidate converges or the iteration budget runs out.
//!
//! Mirrors the external-API retry shape used by
//! [`crate::external::http_client`] — bounded attempts, no panics, every
//! failure folded into a typed result rather than propagated — but the
//! budget here is a quality threshold instead of a circuit breaker.

pub mod comparator;
pub mod correction;

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::external::{Cie76, ColorDistance, Renderer};

pub use comparator::{compare, ComparisonReport, RegionBreakdown};
pub use correction::{apply_corrections, suggest_corrections, CorrectionHint};

#[derive(Debug, Clone, Copy)]
pub struct VerifyConfig {
    /// `human_ssim` at or above this is a pass.
    pub target_score: f32,
    pub max_iterations: u32,
    pub viewport: (u32, u32),
}

impl Default for VerifyConfig {
    fn default() -> Self {
        Self {
            target_score: 0.99,
            max_iterations: 5,
            viewport: (375, 812),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct IterationRecord {
    pub step: u32,
    pub ssim: f64,
    pub delta_e: f64,
    pub human_ssim: f64,
    pub html_path: Option<PathBuf>,
    pub png_path: Option<PathBuf>,
    pub corrections_this_step: Vec<CorrectionHint>,
}

#[derive(Debug, Clone, Serialize)]
pub struct VerificationResult {
    pub passed: bool,
    pub iterations: u32,
    pub final_html: Option<String>,
    pub trace: Vec<IterationRecord>,
    pub corrections_applied: Vec<CorrectionHint>,
}

/// Drives render/compare/correct against a fixed reference raster.
///
/// Generic over [`Renderer`] so tests can substitute a fake that returns
/// canned PNG bytes instead of shelling out to a headless browser.
pub struct VerificationLoop<R: Renderer> {
    renderer: R,
    color_distance: Box<dyn ColorDistance>,
    run_dir: Option<PathBuf>,
}

impl<R: Renderer> VerificationLoop<R> {
    pub fn new(renderer: R) -> Self {
        Self {
            renderer,
            color_distance: Box::new(Cie76),
            run_dir: None,
        }
    }

    pub fn with_color_distance(mut self, color_distance: Box<dyn ColorDistance>) -> Self {
        self.color_distance = color_distance;
        self
    }

    /// Persists each iteration's markup and raster under `dir` for
    /// inspection. Without this, the loop keeps everything in memory.
    pub fn with_run_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.run_dir = Some(dir.into());
        self
    }

    /// Runs the loop to convergence or exhaustion. Never returns an error:
    /// a renderer or decode failure ends the run early with `passed: false`
    /// and whatever trace was collected so far.
    pub async fn run(
        &self,
        reference_png: &[u8],
        markup_html: String,
        config: &VerifyConfig,
    ) -> VerificationResult {
        let reference_image = match image::load_from_memory(reference_png) {
            Ok(img) => img,
            Err(_) => {
                return VerificationResult {
                    passed: false,
                    iterations: 0,
                    final_html: Some(markup_html),
                    trace: Vec::new(),
                    corrections_applied: Vec::new(),
                };
            }
        };

        let mut markup_html = markup_html;
        let mut trace = Vec::new();
        let mut corrections_applied = Vec::new();

        for step in 1..=config.max_iterations {
            let candidate_bytes = match self.renderer.render(&markup_html, config.viewport).await {
                Ok(bytes) => bytes,
                Err(_) => {
                    return VerificationResult {
                        passed: false,
                        iterations: step - 1,
                        final_html: Some(markup_html),
                        trace,
                        corrections_applied,
                    };
                }
            };

            let candidate_image = match image::load_from_memory(&candidate_bytes) {
                Ok(img) => img,
                Err(_) => {
                    return VerificationResult {
                        passed: false,
                        iterations: step - 1,
                        final_html: Some(markup_html),
                        trace,
                        corrections_applied,
                    };
                }
            };

            let report = compare(&reference_image, &candidate_image, self.color_distance.as_ref());
            let human_ssim = report.human_ssim();
            let (html_path, png_path) = self.persist(step, &markup_html, &candidate_bytes);

            if human_ssim >= config.target_score as f64 {
                trace.push(IterationRecord {
                    step,
                    ssim: report.ssim,
                    delta_e: report.delta_e,
                    human_ssim,
                    html_path,
                    png_path,
                    corrections_this_step: Vec::new(),
                });
                return VerificationResult {
                    passed: true,
                    iterations: step,
                    final_html: Some(markup_html),
                    trace,
                    corrections_applied,
                };
            }

            let hints = suggest_corrections(report.ssim, &report.regions);
            trace.push(IterationRecord {
                step,
                ssim: report.ssim,
                delta_e: report.delta_e,
                human_ssim,
                html_path,
                png_path,
                corrections_this_step: hints.clone(),
            });
            corrections_applied.extend(hints.iter().cloned());
            markup_html = apply_corrections(&markup_html, &hints);
        }

        VerificationResult {
            passed: false,
            iterations: config.max_iterations,
            final_html: Some(markup_html),
            trace,
            corrections_applied,
        }
    }

    fn persist(&self, step: u32, html: &str, png: &[u8]) -> (Option<PathBuf>, Option<PathBuf>) {
        let Some(dir) = &self.run_dir else {
            return (None, None);
        };
        if std::fs::create_dir_all(dir).is_err() {
            return (None, None);
        }
        let html_path = dir.join(format!("step-{step}.html"));
        let png_path = dir.join(format!("step-{step}.png"));
        let html_written = std::fs::write(&html_path, html).is_ok();
        let png_written = std::fs::write(&png_path, png).is_ok();
        (
            html_written.then_some(html_path),
            png_written.then_some(png_path),
        )
    }
}

/// Loads a reference PNG from disk. Thin wrapper kept alongside the loop so
/// callers don't need to reach for `std::fs` directly in the common case.
pub fn load_reference_png(path: impl AsRef<Path>) -> crate::Result<Vec<u8>> {
    std::fs::read(path).map_err(crate::NodeBridgeError::Io)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageEncoder, Rgba, RgbaImage};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn encode_png(w: u32, h: u32, color: [u8; 4]) -> Vec<u8> {
        let image = RgbaImage::from_fn(w, h, |_, _| Rgba(color));
        let mut buf = Vec::new();
        image::codecs::png::PngEncoder::new(&mut buf)
            .write_image(image.as_raw(), w, h, image::ExtendedColorType::Rgba8)
            .unwrap();
        buf
    }

    struct FixedRenderer {
        png: Vec<u8>,
        calls: Arc<AtomicU32>,
    }

    impl Renderer for FixedRenderer {
        async fn render(&self, _html: &str, _viewport: (u32, u32)) -> crate::Result<Vec<u8>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.png.clone())
        }
    }

    struct FailingRenderer;

    impl Renderer for FailingRenderer {
        async fn render(&self, _html: &str, _viewport: (u32, u32)) -> crate::Result<Vec<u8>> {
            Err(crate::NodeBridgeError::Unknown {
                code: 1,
                body: "renderer crashed".into(),
            })
        }
    }

    #[tokio::test]
    async fn converges_immediately_when_candidate_matches_reference() {
        let reference = encode_png(16, 16, [10, 20, 30, 255]);
        let calls = Arc::new(AtomicU32::new(0));
        let renderer = FixedRenderer {
            png: reference.clone(),
            calls: calls.clone(),
        };
        let loop_runner = VerificationLoop::new(renderer);
        let config = VerifyConfig::default();
        let result = loop_runner
            .run(&reference, "<div></div>".to_string(), &config)
            .await;

        assert!(result.passed);
        assert_eq!(result.iterations, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(result.trace.len(), 1);
    }

    #[tokio::test]
    async fn exhausts_budget_without_converging_on_a_stuck_renderer() {
        let reference = encode_png(16, 16, [0, 0, 0, 255]);
        let candidate = encode_png(16, 16, [255, 255, 255, 255]);
        let renderer = FixedRenderer {
            png: candidate,
            calls: Arc::new(AtomicU32::new(0)),
        };
        let config = VerifyConfig {
            target_score: 0.99,
            max_iterations: 3,
            viewport: (16, 16),
        };
        let loop_runner = VerificationLoop::new(renderer);
        let result = loop_runner
            .run(&reference, r#"<div style="padding:8px;">"#.to_string(), &config)
            .await;

        assert!(!result.passed);
        assert_eq!(result.iterations, 3);
        assert_eq!(result.trace.len(), 3);
    }

    #[tokio::test]
    async fn renderer_failure_ends_the_run_without_panicking() {
        let reference = encode_png(8, 8, [1, 2, 3, 255]);
        let loop_runner = VerificationLoop::new(FailingRenderer);
        let config = VerifyConfig::default();
        let result = loop_runner
            .run(&reference, "<div></div>".to_string(), &config)
            .await;

        assert!(!result.passed);
        assert_eq!(result.iterations, 0);
        assert!(result.trace.is_empty());
    }

    #[tokio::test]
    async fn corrupt_reference_bytes_fail_without_panicking() {
        let renderer = FixedRenderer {
            png: encode_png(8, 8, [1, 2, 3, 255]),
            calls: Arc::new(AtomicU32::new(0)),
        };
        let loop_runner = VerificationLoop::new(renderer);
        let config = VerifyConfig::default();
        let result = loop_runner
            .run(b"not a png", "<div></div>".to_string(), &config)
            .await;

        assert!(!result.passed);
        assert_eq!(result.iterations, 0);
    }
}
