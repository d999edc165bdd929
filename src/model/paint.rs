//! Fill/stroke paints and post-processing effects.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaintKind {
    Solid,
    GradientLinear,
    GradientRadial,
    GradientAngular,
    GradientDiamond,
    Image,
    Emoji,
}

/// One stop in a gradient: position in `[0, 1]` plus an RGBA color.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GradientStop {
    pub position: f32,
    pub color: [f32; 4],
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paint {
    pub kind: PaintKind,
    pub visible: bool,
    pub opacity: f32,
    /// Present for [`PaintKind::Solid`].
    pub color: Option<[f32; 4]>,
    /// Present for gradient kinds.
    pub gradient_stops: Vec<GradientStop>,
    /// Present for [`PaintKind::Image`].
    pub image_ref: Option<String>,
    pub scale_mode: Option<String>,
}

impl Paint {
    pub fn solid(color: [f32; 4]) -> Self {
        Self {
            kind: PaintKind::Solid,
            visible: true,
            opacity: 1.0,
            color: Some(color),
            gradient_stops: Vec::new(),
            image_ref: None,
            scale_mode: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectKind {
    DropShadow,
    InnerShadow,
    LayerBlur,
    BackgroundBlur,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Effect {
    pub kind: EffectKind,
    pub visible: bool,
    pub radius: f32,
    pub color: Option<[f32; 4]>,
    pub offset: Option<(f32, f32)>,
    pub spread: Option<f32>,
}
