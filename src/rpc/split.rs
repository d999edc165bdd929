//! Splits a node subtree into `Style`/`Layout`/`Content` chunk streams.
//!
//! Grouping a node's fields by concern lets a client subscribe only to
//! what it needs — a layout-only consumer never pays to deserialize paint
//! and typography it'll discard.

use crate::codec::messages::{ChunkPayload, Color, ContentChunk, LayoutChunk, SplitChunk, StyleChunk};
use crate::model::{AxisAlign, LayoutMode, ParsedNode};

use super::walker::{walk_preorder, WalkBounds};

pub struct SplitOptions {
    pub depth: u32,
    pub include_styles: bool,
    pub include_layouts: bool,
    pub include_contents: bool,
}

fn paint_to_color(color: [f32; 4]) -> Color {
    Color { r: color[0], g: color[1], b: color[2], a: color[3] }
}

fn axis_align_str(a: AxisAlign) -> &'static str {
    match a {
        AxisAlign::Min => "min",
        AxisAlign::Center => "center",
        AxisAlign::Max => "max",
        AxisAlign::SpaceBetween => "space_between",
        AxisAlign::Baseline => "baseline",
    }
}

fn layout_mode_str(m: LayoutMode) -> &'static str {
    match m {
        LayoutMode::None => "none",
        LayoutMode::Horizontal => "horizontal",
        LayoutMode::Vertical => "vertical",
    }
}

fn style_chunk(node: &ParsedNode) -> StyleChunk {
    StyleChunk {
        fill_colors: node
            .fills
            .iter()
            .filter_map(|p| p.color)
            .map(paint_to_color)
            .collect(),
        stroke_colors: node
            .strokes
            .iter()
            .filter_map(|p| p.color)
            .map(paint_to_color)
            .collect(),
        typography: node.typography.as_ref().map(|t| t.font_family.clone()),
        opacity: node.opacity as f32,
        corner_radius: node.corner_radius.unwrap_or(0.0),
        stroke_weight: node.stroke_weight.unwrap_or(0.0),
    }
}

fn layout_chunk(node: &ParsedNode) -> LayoutChunk {
    let bbox = node.bbox.unwrap_or(crate::model::BoundingBox { x: 0.0, y: 0.0, w: 0.0, h: 0.0 });
    let (primary_align, counter_align) = node
        .axis_align
        .map(|a| (axis_align_str(a.primary), axis_align_str(a.counter)))
        .unwrap_or(("min", "min"));
    LayoutChunk {
        x: bbox.x,
        y: bbox.y,
        w: bbox.w,
        h: bbox.h,
        constraints: None,
        layout_mode: layout_mode_str(node.layout_mode).to_string(),
        primary_align: primary_align.to_string(),
        counter_align: counter_align.to_string(),
        item_spacing: node.gap,
        padding_top: node.padding.top,
        padding_right: node.padding.right,
        padding_bottom: node.padding.bottom,
        padding_left: node.padding.left,
        clips_content: false,
    }
}

fn content_chunk(node: &ParsedNode) -> ContentChunk {
    ContentChunk {
        node_type: format!("{:?}", node.kind),
        name: node.name.clone(),
        text_content: node.text_content.clone(),
        image_ref: node.fills.iter().find_map(|p| p.image_ref.clone()),
    }
}

/// Produces the ordered chunk stream for `root` under `options`. Sequence
/// numbers and `total_chunks` are assigned once the full list is known, so
/// a client mid-stream can always tell how much more is coming.
pub fn split_node(root: &ParsedNode, options: &SplitOptions) -> Vec<SplitChunk> {
    let bounds = WalkBounds { max_depth: options.depth, max_nodes: u32::MAX };
    let entries = walk_preorder(root, &bounds);

    let mut payloads: Vec<(String, ChunkPayload)> = Vec::new();
    for entry in &entries {
        if options.include_styles {
            payloads.push((entry.node.id.clone(), ChunkPayload::Style(style_chunk(entry.node))));
        }
        if options.include_layouts {
            payloads.push((entry.node.id.clone(), ChunkPayload::Layout(layout_chunk(entry.node))));
        }
        if options.include_contents {
            payloads.push((entry.node.id.clone(), ChunkPayload::Content(content_chunk(entry.node))));
        }
    }

    let total = payloads.len() as u64;
    payloads
        .into_iter()
        .enumerate()
        .map(|(i, (node_id, payload))| SplitChunk {
            sequence: i as u64,
            total_chunks: total,
            node_id,
            payload,
        })
        .collect()
}
