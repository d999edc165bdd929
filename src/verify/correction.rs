//! Region-diff-driven correction hints and their CSS application.
//!
//! Hint generation is a pure function of an [`SsimScore`] and a
//! [`RegionBreakdown`] — same inputs, same hints, every time, so the loop's
//! convergence is reproducible in tests. Applying a hint is a pure string
//! rewrite over the candidate markup's inline styles; nothing here touches
//! the node model, so a hint that doesn't match any declaration is a no-op
//! rather than an error.

use crate::verify::comparator::RegionBreakdown;

/// Diff-fraction above which an edge band is considered a padding mismatch.
const EDGE_THRESHOLD: f64 = 0.05;
/// Diff-fraction above which a horizontal strip adds an extra padding nudge.
const STRIP_THRESHOLD: f64 = 0.08;
/// Spread between the busiest and quietest quadrant that implies a gap mismatch.
const QUADRANT_SPREAD_THRESHOLD: f64 = 0.05;
/// Diff-fraction above which a single quadrant implies a size mismatch.
const QUADRANT_THRESHOLD: f64 = 0.10;

const NUDGE_PX: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum CorrectionHint {
    AdjustPadding {
        top: Option<f64>,
        right: Option<f64>,
        bottom: Option<f64>,
        left: Option<f64>,
    },
    AdjustGap(f64),
    AdjustSize {
        width: f64,
        height: f64,
    },
}

/// Derives correction hints from a comparison's region breakdown. Falls
/// back to a blanket nudge scaled by `ssim` when the regions themselves
/// don't localize a mismatch but the score is still short of target.
pub fn suggest_corrections(ssim: f64, regions: &RegionBreakdown) -> Vec<CorrectionHint> {
    let mut hints = Vec::new();

    let mut pad = [0.0f64; 4]; // top, right, bottom, left
    let mut any_edge = false;
    for (i, &diff) in regions.edges.iter().enumerate() {
        if diff > EDGE_THRESHOLD {
            pad[i] += NUDGE_PX;
            any_edge = true;
        }
    }
    if regions.strips[0] > STRIP_THRESHOLD {
        pad[0] += NUDGE_PX;
        any_edge = true;
    }
    if regions.strips[2] > STRIP_THRESHOLD {
        pad[2] += NUDGE_PX;
        any_edge = true;
    }
    if any_edge {
        hints.push(CorrectionHint::AdjustPadding {
            top: non_zero(pad[0]),
            right: non_zero(pad[1]),
            bottom: non_zero(pad[2]),
            left: non_zero(pad[3]),
        });
    }

    let quad_max = regions.quadrants.iter().cloned().fold(f64::MIN, f64::max);
    let quad_min = regions.quadrants.iter().cloned().fold(f64::MAX, f64::min);
    if quad_max - quad_min > QUADRANT_SPREAD_THRESHOLD {
        hints.push(CorrectionHint::AdjustGap(NUDGE_PX));
    }
    if regions.quadrants.iter().any(|&q| q > QUADRANT_THRESHOLD) {
        hints.push(CorrectionHint::AdjustSize {
            width: NUDGE_PX,
            height: NUDGE_PX,
        });
    }

    if hints.is_empty() && ssim < 0.99 {
        let nudge = if ssim < 0.90 {
            1.0
        } else if ssim < 0.95 {
            0.5
        } else {
            0.2
        };
        hints.push(CorrectionHint::AdjustPadding {
            top: Some(nudge),
            right: Some(nudge),
            bottom: Some(nudge),
            left: Some(nudge),
        });
        if ssim < 0.90 {
            hints.push(CorrectionHint::AdjustGap(nudge));
        }
    }

    hints
}

fn non_zero(v: f64) -> Option<f64> {
    if v == 0.0 {
        None
    } else {
        Some(v)
    }
}

/// Applies hints to `html` in a fixed order — padding, then gap, then size —
/// so repeated runs over the same markup are deterministic regardless of
/// the order hints were generated in.
pub fn apply_corrections(html: &str, hints: &[CorrectionHint]) -> String {
    let mut out = html.to_string();

    for hint in hints {
        if let CorrectionHint::AdjustPadding {
            top,
            right,
            bottom,
            left,
        } = hint
        {
            out = rewrite_padding(&out, *top, *right, *bottom, *left);
        }
    }
    for hint in hints {
        if let CorrectionHint::AdjustGap(delta) = hint {
            out = rewrite_scalar_px(&out, "gap", *delta);
        }
    }
    for hint in hints {
        if let CorrectionHint::AdjustSize { width, height } = hint {
            out = rewrite_scalar_px(&out, "width", *width);
            out = rewrite_scalar_px(&out, "height", *height);
        }
    }

    out
}

fn parse_px(token: &str) -> Option<f64> {
    token.trim().strip_suffix("px")?.trim().parse::<f64>().ok()
}

/// Rewrites every `property:Npx;` declaration found in `html`, adding
/// `delta` and clamping the result at 0. Declarations that don't parse as a
/// bare px value are left untouched.
fn rewrite_scalar_px(html: &str, property: &str, delta: f64) -> String {
    rewrite_declarations(html, property, |value| match parse_px(value) {
        Some(n) => format!("{}px", (n + delta).max(0.0)),
        None => value.to_string(),
    })
}

/// Rewrites `padding:...;` declarations. A single bare value gets the mean
/// of the four side deltas; a four-value shorthand gets each side's own
/// delta applied independently.
fn rewrite_padding(
    html: &str,
    top: Option<f64>,
    right: Option<f64>,
    bottom: Option<f64>,
    left: Option<f64>,
) -> String {
    let deltas = [
        top.unwrap_or(0.0),
        right.unwrap_or(0.0),
        bottom.unwrap_or(0.0),
        left.unwrap_or(0.0),
    ];
    let mean_delta = deltas.iter().sum::<f64>() / 4.0;

    rewrite_declarations(html, "padding", |value| {
        let parts: Vec<&str> = value.split_whitespace().collect();
        if parts.len() == 4 {
            let parsed: Option<Vec<f64>> = parts.iter().map(|p| parse_px(p)).collect();
            if let Some(values) = parsed {
                return values
                    .iter()
                    .zip(deltas.iter())
                    .map(|(v, d)| format!("{}px", (v + d).max(0.0)))
                    .collect::<Vec<_>>()
                    .join(" ");
            }
        } else if let Some(n) = parse_px(value) {
            return format!("{}px", (n + mean_delta).max(0.0));
        }
        value.to_string()
    })
}

/// Finds every `{property}:{value};` occurrence (whitespace-tolerant around
/// the colon) and replaces `value` with `rewrite(value)`.
fn rewrite_declarations(html: &str, property: &str, rewrite: impl Fn(&str) -> String) -> String {
    let mut out = String::with_capacity(html.len());
    let mut rest = html;
    let needle_owned = format!("{}:", property);
    let needle = needle_owned.as_str();

    loop {
        let Some(pos) = rest.find(needle) else {
            out.push_str(rest);
            break;
        };

        // Reject matches that are actually a longer property name sharing
        // this suffix, e.g. "padding-top:" when looking for "padding:".
        let prefix_ok = pos == 0
            || !rest.as_bytes()[pos - 1].is_ascii_alphabetic() && rest.as_bytes()[pos - 1] != b'-';
        let (before, after_needle) = rest.split_at(pos);
        let after_needle = &after_needle[needle.len()..];

        if !prefix_ok {
            out.push_str(before);
            out.push_str(needle);
            rest = after_needle;
            continue;
        }

        let value_end = after_needle.find(';').unwrap_or(after_needle.len());
        let value = &after_needle[..value_end];
        out.push_str(before);
        out.push_str(needle);
        out.push_str(&rewrite(value));
        if value_end < after_needle.len() {
            out.push(';');
            rest = &after_needle[value_end + 1..];
        } else {
            rest = &after_needle[value_end..];
        }
    }

    out
}
