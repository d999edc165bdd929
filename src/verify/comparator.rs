//! Candidate-vs-reference raster comparison.
//!
//! SSIM runs on grayscale luma over fixed, non-overlapping 8x8 windows —
//! simpler than the sliding-Gaussian-window form most SSIM implementations
//! use, and accurate enough to drive a correction loop rather than score a
//! final deliverable. ΔE runs per-pixel through the crate's swappable
//! [`ColorDistance`] and is averaged over the overlap region.

use image::{DynamicImage, GenericImageView, RgbaImage};

use crate::external::ColorDistance;

/// Diff-pixel fraction broken down by screen region, feeding the
/// correction-hint rules in [`crate::verify::correction`].
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct RegionBreakdown {
    /// `[top-left, top-right, bottom-left, bottom-right]`.
    pub quadrants: [f64; 4],
    /// `[top third, middle third, bottom third]`, split horizontally.
    pub strips: [f64; 3],
    /// `[top, right, bottom, left]` bands, each 10% of the relevant dimension.
    pub edges: [f64; 4],
}

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct ComparisonReport {
    pub ssim: f64,
    pub mse: f64,
    pub psnr: f64,
    pub delta_e: f64,
    pub diff_pixel_count: u64,
    pub overlap_width: u32,
    pub overlap_height: u32,
    pub regions: RegionBreakdown,
}

impl ComparisonReport {
    /// `ssim` penalized by color drift: identical structure with wildly
    /// different colors should not read as a pass.
    pub fn human_ssim(&self) -> f64 {
        self.ssim * (1.0 - (self.delta_e / 50.0).min(1.0))
    }
}

/// A per-channel difference above this (on a 0-255 scale) marks a pixel as
/// "differing" for region-breakdown purposes.
const DIFF_THRESHOLD: u8 = 10;

const SSIM_WINDOW: u32 = 8;

pub fn compare(
    reference: &DynamicImage,
    candidate: &DynamicImage,
    color_distance: &dyn ColorDistance,
) -> ComparisonReport {
    let (rw, rh) = reference.dimensions();
    let (cw, ch) = candidate.dimensions();
    let w = rw.min(cw);
    let h = rh.min(ch);

    let reference = reference.to_rgba8();
    let candidate = candidate.to_rgba8();

    if w == 0 || h == 0 {
        return ComparisonReport {
            ssim: 0.0,
            mse: f64::INFINITY,
            psnr: 0.0,
            delta_e: 100.0,
            diff_pixel_count: 0,
            overlap_width: 0,
            overlap_height: 0,
            regions: RegionBreakdown {
                quadrants: [0.0; 4],
                strips: [0.0; 3],
                edges: [0.0; 4],
            },
        };
    }

    let mut se_sum = 0.0f64;
    let mut delta_e_sum = 0.0f64;
    let mut diff_count: u64 = 0;
    let mut diff_mask = vec![false; (w * h) as usize];

    for y in 0..h {
        for x in 0..w {
            let rp = reference.get_pixel(x, y);
            let cp = candidate.get_pixel(x, y);

            let mut se = 0.0f64;
            let mut differs = false;
            for c in 0..3 {
                let d = rp[c] as f64 - cp[c] as f64;
                se += d * d;
                if (rp[c] as i32 - cp[c] as i32).unsigned_abs() as u8 > DIFF_THRESHOLD {
                    differs = true;
                }
            }
            se_sum += se / 3.0;
            if differs {
                diff_count += 1;
                diff_mask[(y * w + x) as usize] = true;
            }

            let a = [rp[0] as f32 / 255.0, rp[1] as f32 / 255.0, rp[2] as f32 / 255.0];
            let b = [cp[0] as f32 / 255.0, cp[1] as f32 / 255.0, cp[2] as f32 / 255.0];
            delta_e_sum += color_distance.distance(a, b) as f64;
        }
    }

    let total_px = (w as u64 * h as u64) as f64;
    let mse = se_sum / total_px;
    let psnr = if mse <= 0.0 {
        f64::INFINITY
    } else {
        10.0 * (255.0 * 255.0 / mse).log10()
    };
    let delta_e = delta_e_sum / total_px;
    let ssim = luma_ssim(&reference, &candidate, w, h);
    let regions = region_breakdown(&diff_mask, w, h);

    ComparisonReport {
        ssim,
        mse,
        psnr,
        delta_e,
        diff_pixel_count: diff_count,
        overlap_width: w,
        overlap_height: h,
        regions,
    }
}

fn luma(image: &RgbaImage, x: u32, y: u32) -> f64 {
    let p = image.get_pixel(x, y);
    0.299 * p[0] as f64 + 0.587 * p[1] as f64 + 0.114 * p[2] as f64
}

fn luma_ssim(reference: &RgbaImage, candidate: &RgbaImage, w: u32, h: u32) -> f64 {
    const C1: f64 = 0.01 * 255.0 * 0.01 * 255.0;
    const C2: f64 = 0.03 * 255.0 * 0.03 * 255.0;

    let mut weighted_sum = 0.0f64;
    let mut weight_total = 0.0f64;

    let mut by = 0;
    while by < h {
        let bh = SSIM_WINDOW.min(h - by);
        let mut bx = 0;
        while bx < w {
            let bw = SSIM_WINDOW.min(w - bx);
            let n = (bw * bh) as f64;

            let mut sum_r = 0.0f64;
            let mut sum_c = 0.0f64;
            for y in by..by + bh {
                for x in bx..bx + bw {
                    sum_r += luma(reference, x, y);
                    sum_c += luma(candidate, x, y);
                }
            }
            let mean_r = sum_r / n;
            let mean_c = sum_c / n;

            let mut var_r = 0.0f64;
            let mut var_c = 0.0f64;
            let mut covar = 0.0f64;
            for y in by..by + bh {
                for x in bx..bx + bw {
                    let lr = luma(reference, x, y) - mean_r;
                    let lc = luma(candidate, x, y) - mean_c;
                    var_r += lr * lr;
                    var_c += lc * lc;
                    covar += lr * lc;
                }
            }
            var_r /= n;
            var_c /= n;
            covar /= n;

            let numerator = (2.0 * mean_r * mean_c + C1) * (2.0 * covar + C2);
            let denominator = (mean_r * mean_r + mean_c * mean_c + C1) * (var_r + var_c + C2);
            let block_ssim = if denominator.abs() < 1e-12 {
                1.0
            } else {
                numerator / denominator
            };

            weighted_sum += block_ssim * n;
            weight_total += n;
            bx += SSIM_WINDOW;
        }
        by += SSIM_WINDOW;
    }

    if weight_total <= 0.0 {
        1.0
    } else {
        weighted_sum / weight_total
    }
}

fn region_breakdown(diff_mask: &[bool], w: u32, h: u32) -> RegionBreakdown {
    let mid_x = w / 2;
    let mid_y = h / 2;
    let third_y1 = h / 3;
    let third_y2 = 2 * h / 3;
    let edge_w = (((w as f64) * 0.1).round() as u32).max(1).min(w);
    let edge_h = (((h as f64) * 0.1).round() as u32).max(1).min(h);

    let mut quad_hits = [0u64; 4];
    let mut quad_total = [0u64; 4];
    let mut strip_hits = [0u64; 3];
    let mut strip_total = [0u64; 3];
    let mut edge_hits = [0u64; 4];
    let mut edge_total = [0u64; 4];

    for y in 0..h {
        for x in 0..w {
            let hit = diff_mask[(y * w + x) as usize];

            let qi = match (x < mid_x, y < mid_y) {
                (true, true) => 0,
                (false, true) => 1,
                (true, false) => 2,
                (false, false) => 3,
            };
            quad_total[qi] += 1;
            if hit {
                quad_hits[qi] += 1;
            }

            let si = if y < third_y1 {
                0
            } else if y < third_y2 {
                1
            } else {
                2
            };
            strip_total[si] += 1;
            if hit {
                strip_hits[si] += 1;
            }

            if y < edge_h {
                edge_total[0] += 1;
                if hit {
                    edge_hits[0] += 1;
                }
            }
            if x >= w.saturating_sub(edge_w) {
                edge_total[1] += 1;
                if hit {
                    edge_hits[1] += 1;
                }
            }
            if y >= h.saturating_sub(edge_h) {
                edge_total[2] += 1;
                if hit {
                    edge_hits[2] += 1;
                }
            }
            if x < edge_w {
                edge_total[3] += 1;
                if hit {
                    edge_hits[3] += 1;
                }
            }
        }
    }

    let frac = |hits: u64, total: u64| if total == 0 { 0.0 } else { hits as f64 / total as f64 };

    RegionBreakdown {
        quadrants: [
            frac(quad_hits[0], quad_total[0]),
            frac(quad_hits[1], quad_total[1]),
            frac(quad_hits[2], quad_total[2]),
            frac(quad_hits[3], quad_total[3]),
        ],
        strips: [
            frac(strip_hits[0], strip_total[0]),
            frac(strip_hits[1], strip_total[1]),
            frac(strip_hits[2], strip_total[2]),
        ],
        edges: [
            frac(edge_hits[0], edge_total[0]),
            frac(edge_hits[1], edge_total[1]),
            frac(edge_hits[2], edge_total[2]),
            frac(edge_hits[3], edge_total[3]),
        ],
    }
}
