//! Perceptual color distance, swappable behind a trait.
//!
//! CIE76 (plain Euclidean distance in CIE L*a*b*) is the default: cheap,
//! no dependencies, and accurate enough to drive correction thresholds even
//! though CIE94/CIEDE2000 are perceptually tighter. A harsher metric can be
//! swapped in later without touching the verification loop.

/// Computes perceptual distance (ΔE) between two sRGB colors in `[0, 1]`
/// per channel. Implementations return a non-negative value; `0` means
/// identical, and values above roughly `50` are considered unmistakably
/// different by the verification loop's `human_ssim` formula.
pub trait ColorDistance: Send + Sync {
    fn distance(&self, a: [f32; 3], b: [f32; 3]) -> f32;
}

/// CIE76: Euclidean distance in CIE L*a*b* space.
#[derive(Debug, Default, Clone, Copy)]
pub struct Cie76;

impl ColorDistance for Cie76 {
    fn distance(&self, a: [f32; 3], b: [f32; 3]) -> f32 {
        let lab_a = srgb_to_lab(a);
        let lab_b = srgb_to_lab(b);
        let dl = lab_a[0] - lab_b[0];
        let da = lab_a[1] - lab_b[1];
        let db = lab_a[2] - lab_b[2];
        (dl * dl + da * da + db * db).sqrt()
    }
}

fn srgb_channel_to_linear(c: f32) -> f32 {
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

fn srgb_to_xyz(rgb: [f32; 3]) -> [f32; 3] {
    let [r, g, b] = rgb.map(srgb_channel_to_linear);
    [
        r * 0.4124 + g * 0.3576 + b * 0.1805,
        r * 0.2126 + g * 0.7152 + b * 0.0722,
        r * 0.0193 + g * 0.1192 + b * 0.9505,
    ]
}

fn xyz_to_lab(xyz: [f32; 3]) -> [f32; 3] {
    const WHITE: [f32; 3] = [0.95047, 1.0, 1.08883];
    let f = |t: f32| {
        if t > 0.008856 {
            t.cbrt()
        } else {
            7.787 * t + 16.0 / 116.0
        }
    };
    let fx = f(xyz[0] / WHITE[0]);
    let fy = f(xyz[1] / WHITE[1]);
    let fz = f(xyz[2] / WHITE[2]);
    [116.0 * fy - 16.0, 500.0 * (fx - fy), 200.0 * (fy - fz)]
}

fn srgb_to_lab(rgb: [f32; 3]) -> [f32; 3] {
    xyz_to_lab(srgb_to_xyz(rgb))
}
