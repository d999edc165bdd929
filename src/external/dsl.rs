//! DSL emitters: different serializations of a [`ParsedNode`] tree aimed at
//! different consumers — a compact token-frugal form for the streaming
//! node service, a fuller form for the fidelity loop, and an HTML/CSS form
//! the renderer collaborator actually draws.

use crate::model::{LayoutMode, NodeKind, ParsedNode};

pub trait DslEmitter: Send + Sync {
    fn emit(&self, node: &ParsedNode) -> String;
    fn format_name(&self) -> &'static str;
}

/// Compact single-node summary: kind, geometry, first fill color, text.
/// This is what `FigmaNode::dsl` and `Task::semantic_dsl` carry — cheap to
/// produce per node during a streamed walk.
#[derive(Debug, Default, Clone, Copy)]
pub struct RawDslEmitter;

impl DslEmitter for RawDslEmitter {
    fn format_name(&self) -> &'static str {
        "raw"
    }

    fn emit(&self, node: &ParsedNode) -> String {
        let mut parts = vec![format!("{:?}", node.kind)];
        if let Some(bbox) = node.bbox {
            parts.push(format!("{}x{}", bbox.w as i64, bbox.h as i64));
        }
        if let Some(color) = node.first_solid_fill() {
            parts.push(format!(
                "fill(#{:02x}{:02x}{:02x})",
                (color[0] * 255.0) as u8,
                (color[1] * 255.0) as u8,
                (color[2] * 255.0) as u8
            ));
        }
        if let Some(text) = &node.text_content {
            let truncated: String = text.chars().take(40).collect();
            parts.push(format!("text(\"{truncated}\")"));
        }
        parts.join(" ")
    }
}

/// Recursive, fuller form for the fidelity loop: includes layout and
/// effect summaries and walks children.
#[derive(Debug, Default, Clone, Copy)]
pub struct FidelityDslEmitter;

impl DslEmitter for FidelityDslEmitter {
    fn format_name(&self) -> &'static str {
        "fidelity"
    }

    fn emit(&self, node: &ParsedNode) -> String {
        let mut out = String::new();
        emit_recursive(node, 0, &mut out);
        out
    }
}

fn emit_recursive(node: &ParsedNode, depth: u32, out: &mut String) {
    let indent = "  ".repeat(depth as usize);
    out.push_str(&indent);
    out.push_str(&format!("{:?} \"{}\"", node.kind, node.name));
    if let Some(bbox) = node.bbox {
        out.push_str(&format!(" [{:.0},{:.0} {:.0}x{:.0}]", bbox.x, bbox.y, bbox.w, bbox.h));
    }
    if node.has_layout() {
        out.push_str(&format!(" layout={:?} gap={}", node.layout_mode, node.gap));
    }
    if node.has_effects() {
        out.push_str(&format!(" effects={}", node.effects.len()));
    }
    out.push('\n');
    for child in &node.children {
        emit_recursive(child, depth + 1, out);
    }
}

/// Renders a node tree to the HTML/CSS markup the renderer collaborator
/// actually draws. Deliberately simple: absolutely-positioned `div`s with
/// inline styles, not a faithful browser layout engine — good enough to
/// drive the verification loop's render/compare cycle.
#[derive(Debug, Default, Clone, Copy)]
pub struct HtmlDslEmitter;

impl DslEmitter for HtmlDslEmitter {
    fn format_name(&self) -> &'static str {
        "html"
    }

    fn emit(&self, node: &ParsedNode) -> String {
        let mut body = String::new();
        emit_html_recursive(node, &mut body);
        format!(
            "<!DOCTYPE html><html><body style=\"margin:0\">{body}</body></html>"
        )
    }
}

fn emit_html_recursive(node: &ParsedNode, out: &mut String) {
    let bbox = node.bbox.unwrap_or(crate::model::BoundingBox { x: 0.0, y: 0.0, w: 0.0, h: 0.0 });
    let mut style = format!(
        "position:absolute;left:{}px;top:{}px;width:{}px;height:{}px;opacity:{};",
        bbox.x, bbox.y, bbox.w, bbox.h, node.opacity
    );
    if let Some(color) = node.first_solid_fill() {
        style.push_str(&format!(
            "background-color:rgba({},{},{},{});",
            (color[0] * 255.0) as u8,
            (color[1] * 255.0) as u8,
            (color[2] * 255.0) as u8,
            color[3]
        ));
    }
    if let Some(radius) = node.corner_radius {
        style.push_str(&format!("border-radius:{radius}px;"));
    }
    if node.has_layout() {
        let direction = match node.layout_mode {
            LayoutMode::Horizontal => "row",
            LayoutMode::Vertical => "column",
            LayoutMode::None => "row",
        };
        style.push_str(&format!(
            "display:flex;flex-direction:{direction};gap:{}px;padding:{}px {}px {}px {}px;",
            node.gap, node.padding.top, node.padding.right, node.padding.bottom, node.padding.left
        ));
    }

    match node.kind {
        NodeKind::Text => {
            let text = node.text_content.as_deref().unwrap_or_default();
            if let Some(typo) = &node.typography {
                style.push_str(&format!(
                    "font-family:{};font-size:{}px;font-weight:{};",
                    typo.font_family, typo.font_size, typo.font_weight
                ));
            }
            out.push_str(&format!("<div style=\"{style}\">{}</div>", html_escape(text)));
        }
        _ => {
            out.push_str(&format!("<div style=\"{style}\">"));
            for child in &node.children {
                emit_html_recursive(child, out);
            }
            out.push_str("</div>");
        }
    }
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
