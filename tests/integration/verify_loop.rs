#![allow(missing_docs)]

use image::{ImageEncoder, Rgba, RgbaImage};
use nodebridge::error::Result;
use nodebridge::verify::correction::{suggest_corrections, CorrectionHint};
use nodebridge::verify::{RegionBreakdown, VerificationLoop, VerifyConfig};

fn encode_png(w: u32, h: u32, mut paint: impl FnMut(u32, u32) -> [u8; 4]) -> Vec<u8> {
    let image = RgbaImage::from_fn(w, h, |x, y| Rgba(paint(x, y)));
    let mut buf = Vec::new();
    image::codecs::png::PngEncoder::new(&mut buf)
        .write_image(image.as_raw(), w, h, image::ExtendedColorType::Rgba8)
        .unwrap();
    buf
}

fn solid(w: u32, h: u32, color: [u8; 4]) -> Vec<u8> {
    encode_png(w, h, |_, _| color)
}

/// A black square centered in a white canvas — used by both the identical
/// and offset renderer fakes below, matching spec §8 scenario 6.
fn black_square_on_white(size: u32, square: u32, offset_x: i32, offset_y: i32) -> Vec<u8> {
    let half = square as i32 / 2;
    let center = size as i32 / 2;
    encode_png(size, size, |x, y| {
        let x = x as i32 - offset_x;
        let y = y as i32 - offset_y;
        if (x - center).abs() <= half && (y - center).abs() <= half {
            [0, 0, 0, 255]
        } else {
            [255, 255, 255, 255]
        }
    })
}

struct FakeRenderer {
    png: Vec<u8>,
}

impl nodebridge::external::Renderer for FakeRenderer {
    async fn render(&self, _html: &str, _viewport: (u32, u32)) -> Result<Vec<u8>> {
        Ok(self.png.clone())
    }
}

#[tokio::test]
async fn identical_solid_gray_images_pass_on_the_first_iteration() {
    // spec §8 scenario 5: reference image 64x64 solid gray, candidate markup
    // identical -> iterations=1, passed=true, ssim>=0.99, human_ssim>=0.99.
    let reference = solid(64, 64, [128, 128, 128, 255]);
    let renderer = FakeRenderer { png: reference.clone() };
    let loop_runner = VerificationLoop::new(renderer);
    let config = VerifyConfig {
        target_score: 0.99,
        max_iterations: 5,
        viewport: (64, 64),
    };

    let result = loop_runner.run(&reference, "<div></div>".to_string(), &config).await;

    assert!(result.passed);
    assert_eq!(result.iterations, 1);
    assert_eq!(result.trace.len(), 1);
    assert!(result.trace[0].ssim >= 0.99);
    assert!(result.trace[0].human_ssim >= 0.99);
}

#[tokio::test]
async fn an_offset_square_never_converges_and_still_applies_padding_corrections() {
    // spec §8 scenario 6: reference 100x100 black square centered in 200x200
    // white, candidate offset by 10px -> passed=false after max_iterations=5
    // with a nonzero cumulative padding adjustment on the offset side.
    let reference = black_square_on_white(200, 100, 0, 0);
    let candidate = black_square_on_white(200, 100, 10, 0);
    let renderer = FakeRenderer { png: candidate };
    let loop_runner = VerificationLoop::new(renderer);
    let config = VerifyConfig {
        target_score: 0.99,
        max_iterations: 5,
        viewport: (200, 200),
    };

    let result = loop_runner.run(&reference, "<div style=\"padding: 0px;\">".to_string(), &config).await;

    assert!(!result.passed);
    assert_eq!(result.iterations, 5);
    assert_eq!(result.trace.len(), 5);
    assert!(
        !result.corrections_applied.is_empty(),
        "a persistent offset must drive at least one correction hint"
    );
    let has_padding_adjustment = result.corrections_applied.iter().any(|hint| {
        matches!(
            hint,
            CorrectionHint::AdjustPadding { right: Some(r), .. } if *r > 0.0
        ) || matches!(
            hint,
            CorrectionHint::AdjustPadding { left: Some(l), .. } if *l > 0.0
        )
    });
    assert!(has_padding_adjustment, "offset along x should nudge left/right padding");
}

#[tokio::test]
async fn loop_never_exceeds_max_iterations_and_trace_length_matches() {
    let reference = solid(32, 32, [10, 10, 10, 255]);
    let candidate = solid(32, 32, [250, 250, 250, 255]);
    let renderer = FakeRenderer { png: candidate };
    let loop_runner = VerificationLoop::new(renderer);
    let config = VerifyConfig {
        target_score: 0.999,
        max_iterations: 4,
        viewport: (32, 32),
    };

    let result = loop_runner.run(&reference, "<div></div>".to_string(), &config).await;

    assert!(result.iterations <= config.max_iterations);
    assert_eq!(result.trace.len() as u32, result.iterations);
}

#[test]
fn suggest_corrections_is_a_pure_function_of_its_inputs() {
    // spec §8 "region hint determinism": same (ssim, region_breakdown) in,
    // same hints out, every time.
    let regions = RegionBreakdown {
        quadrants: [0.02, 0.12, 0.01, 0.03],
        strips: [0.01, 0.02, 0.01],
        edges: [0.06, 0.01, 0.01, 0.01],
    };
    let first = suggest_corrections(0.8, &regions);
    let second = suggest_corrections(0.8, &regions);
    assert_eq!(first, second);
}

#[test]
fn suggest_corrections_falls_back_to_ssim_banded_padding_when_regions_are_quiet() {
    let quiet = RegionBreakdown {
        quadrants: [0.0; 4],
        strips: [0.0; 3],
        edges: [0.0; 4],
    };
    let hints = suggest_corrections(0.85, &quiet);
    assert!(!hints.is_empty(), "a low score with no region signal must still fall back to a blanket nudge");
}
