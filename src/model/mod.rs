//! The parsed-node data model.
//!
//! [`ParsedNode`] is the lingua franca every downstream consumer — the
//! binary codec, the task planner, the DSL emitters — operates on. It is a
//! flattened, typed projection of whatever the external design API returns
//! as JSON; nothing in this crate parses that JSON directly except the
//! (out-of-scope) HTTP client adapter that produces a `ParsedNode` tree at
//! the boundary.
//!
//! # Example
//!
//! ```rust
//! use nodebridge::model::{ParsedNode, NodeKind, BoundingBox};
//!
//! let mut root = ParsedNode::new("1:2", "Screen", NodeKind::Frame);
//! root.bbox = Some(BoundingBox { x: 0.0, y: 0.0, w: 375.0, h: 812.0 });
//! root.children.push(ParsedNode::new("1:3", "Title", NodeKind::Text));
//! assert_eq!(root.children.len(), 1);
//! ```

mod paint;
pub use paint::{Effect, EffectKind, GradientStop, Paint, PaintKind};

pub mod normalize;

use serde::{Deserialize, Serialize};

/// Absolute canvas-space bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

/// The tagged variant of node types a design file can contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum NodeKind {
    Frame,
    Group,
    Canvas,
    Document,
    Text,
    Rectangle,
    Vector,
    Line,
    Star,
    Ellipse,
    RegularPolygon,
    Component,
    ComponentSet,
    Instance,
    BooleanOp,
    Section,
    Slice,
    Sticky,
    Unknown,
}

/// Auto-layout direction. `None` means the node does not participate in
/// auto layout (children are positioned absolutely).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum LayoutMode {
    #[default]
    None,
    Horizontal,
    Vertical,
}

/// Alignment along an auto-layout axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AxisAlign {
    Min,
    Center,
    Max,
    SpaceBetween,
    Baseline,
}

/// Sizing behavior along one axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sizing {
    Fixed,
    Hug,
    Fill,
}

/// Edge insets, in the order top/right/bottom/left.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Padding {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

/// Text styling, present only on nodes carrying text content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Typography {
    pub font_family: String,
    pub font_size: f64,
    pub font_weight: u32,
    pub line_height: Option<f64>,
    pub letter_spacing: Option<f64>,
    pub text_align: Option<String>,
}

/// Axis alignment for both the layout-flow axis and the cross axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AxisAlignPair {
    pub primary: AxisAlign,
    pub counter: AxisAlign,
}

/// Fixed/hug/fill sizing for both axes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SizingPair {
    pub horizontal: Sizing,
    pub vertical: Sizing,
}

/// Per-corner radii, used only when corners aren't uniform.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CornerRadii {
    pub top_left: f64,
    pub top_right: f64,
    pub bottom_right: f64,
    pub bottom_left: f64,
}

/// A single node in a parsed design tree.
///
/// Children are ordered — z-order matters for rendering — and bounding
/// boxes are always absolute canvas coordinates. A tree built by
/// [`normalize::truncate_to_depth`] never exceeds the configured maximum
/// depth; deeper subtrees are truncated, not cycled, because the source
/// graph is a tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedNode {
    pub id: String,
    pub name: String,
    pub kind: NodeKind,

    pub bbox: Option<BoundingBox>,
    pub rotation: Option<f64>,

    pub fills: Vec<Paint>,
    pub strokes: Vec<Paint>,
    pub stroke_weight: Option<f64>,
    pub effects: Vec<Effect>,

    pub opacity: f64,
    pub corner_radius: Option<f64>,
    pub corner_radii: Option<CornerRadii>,

    pub layout_mode: LayoutMode,
    pub padding: Padding,
    pub gap: f64,
    pub axis_align: Option<AxisAlignPair>,
    pub sizing: Option<SizingPair>,

    pub text_content: Option<String>,
    pub typography: Option<Typography>,

    pub component_id: Option<String>,
    pub children: Vec<ParsedNode>,
}

impl ParsedNode {
    /// Builds a bare node with every optional field empty/default.
    pub fn new(id: impl Into<String>, name: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind,
            bbox: None,
            rotation: None,
            fills: Vec::new(),
            strokes: Vec::new(),
            stroke_weight: None,
            effects: Vec::new(),
            opacity: 1.0,
            corner_radius: None,
            corner_radii: None,
            layout_mode: LayoutMode::None,
            padding: Padding::default(),
            gap: 0.0,
            axis_align: None,
            sizing: None,
            text_content: None,
            typography: None,
            component_id: None,
            children: Vec::new(),
        }
    }

    pub fn has_layout(&self) -> bool {
        self.layout_mode != LayoutMode::None
    }

    pub fn has_effects(&self) -> bool {
        !self.effects.is_empty()
    }

    pub fn has_radius(&self) -> bool {
        self.corner_radius.map(|r| r > 0.0).unwrap_or(false) || self.corner_radii.is_some()
    }

    pub fn has_typography(&self) -> bool {
        self.typography.is_some()
    }

    /// First solid fill color, if any — used by the task planner's
    /// `semantic_dsl` summary.
    pub fn first_solid_fill(&self) -> Option<[f32; 4]> {
        self.fills.iter().find_map(|p| match &p.kind {
            PaintKind::Solid => p.color,
            _ => None,
        })
    }

    /// Counts this node plus every descendant.
    pub fn subtree_size(&self) -> usize {
        1 + self.children.iter().map(ParsedNode::subtree_size).sum::<usize>()
    }

    /// Yields `(node, depth)` pairs in pre-order (root first).
    pub fn preorder(&self) -> Vec<(&ParsedNode, u32)> {
        let mut out = Vec::new();
        fn walk<'a>(node: &'a ParsedNode, depth: u32, out: &mut Vec<(&'a ParsedNode, u32)>) {
            out.push((node, depth));
            for child in &node.children {
                walk(child, depth + 1, out);
            }
        }
        walk(self, 0, &mut out);
        out
    }
}
