//! The design API collaborator: fetches node subtrees and file metadata
//! over HTTP, with retry, exponential backoff, and a circuit breaker
//! layered on top per the error taxonomy's retry policy.

use std::time::Duration;

use serde_json::Value;
use tracing::warn;

use crate::codec::messages::FileMetaResponse;
use crate::error::{NodeBridgeError, Result};
use crate::model::{
    AxisAlign, AxisAlignPair, BoundingBox, CornerRadii, LayoutMode, NodeKind, Padding, ParsedNode,
    Paint, PaintKind, Sizing, SizingPair, Typography,
};

use super::circuit_breaker::{backoff_delay, CircuitBreaker};

pub trait DesignApiClient: Send + Sync {
    fn fetch_node(
        &self,
        file_key: &str,
        node_id: &str,
        token: &str,
    ) -> impl std::future::Future<Output = Result<ParsedNode>> + Send;

    /// Fetches a single node with the API-side traversal capped at `depth`,
    /// for recursive `GetNodeStream`'s one-node-at-a-time walk. Unlike
    /// [`Self::fetch_node`], the caller cannot assume `children` is the
    /// node's full subtree — only what the API returned within `depth`.
    fn fetch_node_shallow(
        &self,
        file_key: &str,
        node_id: &str,
        token: &str,
        depth: u64,
    ) -> impl std::future::Future<Output = Result<ParsedNode>> + Send;

    fn fetch_file_meta(
        &self,
        file_key: &str,
        token: &str,
    ) -> impl std::future::Future<Output = Result<FileMetaResponse>> + Send;
}

pub struct HttpClientConfig {
    pub base_url: String,
    pub timeout: Duration,
    pub max_retry_attempts: u32,
    pub retry_base_delay: Duration,
    pub circuit_breaker_threshold: u32,
    pub circuit_breaker_cooldown: Duration,
}

pub struct HttpDesignApiClient {
    client: reqwest::Client,
    config: HttpClientConfig,
    breaker: CircuitBreaker,
}

impl HttpDesignApiClient {
    pub fn new(config: HttpClientConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| NodeBridgeError::Network(e.to_string()))?;
        let breaker = CircuitBreaker::new(config.circuit_breaker_threshold, config.circuit_breaker_cooldown);
        Ok(Self { client, config, breaker })
    }

    pub fn breaker_state(&self) -> &'static str {
        self.breaker.state().as_str()
    }

    async fn get_json(&self, url: &str, token: &str) -> Result<Value> {
        for attempt in 0..=self.config.max_retry_attempts {
            if !self.breaker.allow() {
                return Err(NodeBridgeError::Network("circuit breaker open".into()));
            }

            let result = self.send_once(url, token).await;
            match result {
                Ok(value) => {
                    self.breaker.record_success();
                    return Ok(value);
                }
                Err(err) if err.is_retryable() && attempt < self.config.max_retry_attempts => {
                    self.breaker.record_failure();
                    let delay = backoff_delay(self.config.retry_base_delay, attempt, Duration::from_secs(30));
                    warn!(attempt, ?delay, error = %err, "retrying design API call");
                    tokio::time::sleep(delay).await;
                }
                Err(err) => {
                    self.breaker.record_failure();
                    return Err(err);
                }
            }
        }
        unreachable!("loop always returns before exhausting its bound")
    }

    async fn send_once(&self, url: &str, token: &str) -> Result<Value> {
        let response = self
            .client
            .get(url)
            .header("X-Figma-Token", token)
            .send()
            .await
            .map_err(classify_reqwest_error)?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(NodeBridgeError::Auth(format!("status {status}")));
        }
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(NodeBridgeError::NotFound(url.to_string()));
        }
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok());
            return Err(NodeBridgeError::RateLimited { retry_after_secs });
        }
        if !status.is_success() {
            return Err(NodeBridgeError::Unknown {
                code: status.as_u16() as i32,
                body: response.text().await.unwrap_or_default(),
            });
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| NodeBridgeError::Parse(format!("invalid JSON response: {e}")))
    }
}

fn classify_reqwest_error(e: reqwest::Error) -> NodeBridgeError {
    if e.is_timeout() {
        NodeBridgeError::Timeout(Duration::from_secs(0))
    } else {
        NodeBridgeError::Network(e.to_string())
    }
}

impl DesignApiClient for HttpDesignApiClient {
    async fn fetch_node(&self, file_key: &str, node_id: &str, token: &str) -> Result<ParsedNode> {
        let url = format!(
            "{}/v1/files/{file_key}/nodes?ids={node_id}",
            self.config.base_url
        );
        let body = self.get_json(&url, token).await?;
        let node_json = body
            .get("nodes")
            .and_then(|n| n.get(node_id))
            .and_then(|n| n.get("document"))
            .ok_or_else(|| NodeBridgeError::Parse("response missing nodes.<id>.document".into()))?;
        parse_node_json(node_json)
    }

    async fn fetch_node_shallow(&self, file_key: &str, node_id: &str, token: &str, depth: u64) -> Result<ParsedNode> {
        let url = format!(
            "{}/v1/files/{file_key}/nodes?ids={node_id}&depth={depth}",
            self.config.base_url
        );
        let body = self.get_json(&url, token).await?;
        let node_json = body
            .get("nodes")
            .and_then(|n| n.get(node_id))
            .and_then(|n| n.get("document"))
            .ok_or_else(|| NodeBridgeError::Parse("response missing nodes.<id>.document".into()))?;
        parse_node_json(node_json)
    }

    async fn fetch_file_meta(&self, file_key: &str, token: &str) -> Result<FileMetaResponse> {
        let url = format!("{}/v1/files/{file_key}?depth=1", self.config.base_url);
        let body = self.get_json(&url, token).await?;
        Ok(FileMetaResponse {
            name: string_field(&body, "name"),
            last_modified: string_field(&body, "lastModified"),
            thumbnail_url: string_field(&body, "thumbnailUrl"),
            version: string_field(&body, "version"),
            role: string_field(&body, "role"),
            component_count: body.get("components").and_then(|c| c.as_object()).map(|m| m.len() as u64),
            style_count: body.get("styles").and_then(|c| c.as_object()).map(|m| m.len() as u64),
        })
    }
}

fn string_field(v: &Value, key: &str) -> String {
    v.get(key).and_then(|x| x.as_str()).unwrap_or_default().to_string()
}

fn f64_field(v: &Value, key: &str) -> Option<f64> {
    v.get(key).and_then(|x| x.as_f64())
}

/// Parses one node (and recursively its children) from the external API's
/// JSON shape into a [`ParsedNode`]. The exact field names mirror the
/// conventional design-tool REST response; anything this doesn't recognize
/// is simply left at its default.
fn parse_node_json(v: &Value) -> Result<ParsedNode> {
    let id = v
        .get("id")
        .and_then(|x| x.as_str())
        .ok_or_else(|| NodeBridgeError::Parse("node missing id".into()))?;
    let name = v.get("name").and_then(|x| x.as_str()).unwrap_or_default();
    let kind = parse_node_kind(v.get("type").and_then(|x| x.as_str()).unwrap_or("UNKNOWN"));

    let mut node = ParsedNode::new(id, name, kind);

    if let Some(bbox) = v.get("absoluteBoundingBox") {
        node.bbox = Some(BoundingBox {
            x: f64_field(bbox, "x").unwrap_or(0.0),
            y: f64_field(bbox, "y").unwrap_or(0.0),
            w: f64_field(bbox, "width").unwrap_or(0.0),
            h: f64_field(bbox, "height").unwrap_or(0.0),
        });
    }
    node.rotation = f64_field(v, "rotation");
    node.opacity = f64_field(v, "opacity").unwrap_or(1.0);
    node.corner_radius = f64_field(v, "cornerRadius");
    if let Some(radii) = v.get("rectangleCornerRadii").and_then(|r| r.as_array()) {
        if radii.len() == 4 {
            node.corner_radii = Some(CornerRadii {
                top_left: radii[0].as_f64().unwrap_or(0.0),
                top_right: radii[1].as_f64().unwrap_or(0.0),
                bottom_right: radii[2].as_f64().unwrap_or(0.0),
                bottom_left: radii[3].as_f64().unwrap_or(0.0),
            });
        }
    }

    if let Some(fills) = v.get("fills").and_then(|f| f.as_array()) {
        node.fills = fills.iter().filter_map(parse_paint).collect();
    }
    if let Some(strokes) = v.get("strokes").and_then(|f| f.as_array()) {
        node.strokes = strokes.iter().filter_map(parse_paint).collect();
    }
    node.stroke_weight = f64_field(v, "strokeWeight");

    if let Some(mode) = v.get("layoutMode").and_then(|x| x.as_str()) {
        node.layout_mode = match mode {
            "HORIZONTAL" => LayoutMode::Horizontal,
            "VERTICAL" => LayoutMode::Vertical,
            _ => LayoutMode::None,
        };
    }
    node.padding = Padding {
        top: f64_field(v, "paddingTop").unwrap_or(0.0),
        right: f64_field(v, "paddingRight").unwrap_or(0.0),
        bottom: f64_field(v, "paddingBottom").unwrap_or(0.0),
        left: f64_field(v, "paddingLeft").unwrap_or(0.0),
    };
    node.gap = f64_field(v, "itemSpacing").unwrap_or(0.0);
    if node.has_layout() {
        node.axis_align = Some(AxisAlignPair {
            primary: parse_axis_align(v.get("primaryAxisAlignItems").and_then(|x| x.as_str())),
            counter: parse_axis_align(v.get("counterAxisAlignItems").and_then(|x| x.as_str())),
        });
        node.sizing = Some(SizingPair {
            horizontal: parse_sizing(v.get("layoutSizingHorizontal").and_then(|x| x.as_str())),
            vertical: parse_sizing(v.get("layoutSizingVertical").and_then(|x| x.as_str())),
        });
    }

    if kind == NodeKind::Text {
        node.text_content = v.get("characters").and_then(|x| x.as_str()).map(str::to_string);
        if let Some(style) = v.get("style") {
            node.typography = Some(Typography {
                font_family: string_field(style, "fontFamily"),
                font_size: f64_field(style, "fontSize").unwrap_or(16.0),
                font_weight: style.get("fontWeight").and_then(|x| x.as_u64()).unwrap_or(400) as u32,
                line_height: f64_field(style, "lineHeightPx"),
                letter_spacing: f64_field(style, "letterSpacing"),
                text_align: style.get("textAlignHorizontal").and_then(|x| x.as_str()).map(str::to_string),
            });
        }
    }

    node.component_id = v.get("componentId").and_then(|x| x.as_str()).map(str::to_string);

    if let Some(children) = v.get("children").and_then(|c| c.as_array()) {
        node.children = children
            .iter()
            .map(parse_node_json)
            .collect::<Result<Vec<_>>>()?;
    }

    Ok(node)
}

fn parse_node_kind(raw: &str) -> NodeKind {
    match raw {
        "FRAME" => NodeKind::Frame,
        "GROUP" => NodeKind::Group,
        "CANVAS" => NodeKind::Canvas,
        "DOCUMENT" => NodeKind::Document,
        "TEXT" => NodeKind::Text,
        "RECTANGLE" => NodeKind::Rectangle,
        "VECTOR" => NodeKind::Vector,
        "LINE" => NodeKind::Line,
        "STAR" => NodeKind::Star,
        "ELLIPSE" => NodeKind::Ellipse,
        "REGULAR_POLYGON" => NodeKind::RegularPolygon,
        "COMPONENT" => NodeKind::Component,
        "COMPONENT_SET" => NodeKind::ComponentSet,
        "INSTANCE" => NodeKind::Instance,
        "BOOLEAN_OPERATION" => NodeKind::BooleanOp,
        "SECTION" => NodeKind::Section,
        "SLICE" => NodeKind::Slice,
        "STICKY" => NodeKind::Sticky,
        _ => NodeKind::Unknown,
    }
}

fn parse_axis_align(raw: Option<&str>) -> AxisAlign {
    match raw {
        Some("CENTER") => AxisAlign::Center,
        Some("MAX") => AxisAlign::Max,
        Some("SPACE_BETWEEN") => AxisAlign::SpaceBetween,
        Some("BASELINE") => AxisAlign::Baseline,
        _ => AxisAlign::Min,
    }
}

fn parse_sizing(raw: Option<&str>) -> Sizing {
    match raw {
        Some("HUG") => Sizing::Hug,
        Some("FILL") => Sizing::Fill,
        _ => Sizing::Fixed,
    }
}

fn parse_paint(v: &Value) -> Option<Paint> {
    let kind = match v.get("type").and_then(|x| x.as_str())? {
        "SOLID" => PaintKind::Solid,
        "GRADIENT_LINEAR" => PaintKind::GradientLinear,
        "GRADIENT_RADIAL" => PaintKind::GradientRadial,
        "GRADIENT_ANGULAR" => PaintKind::GradientAngular,
        "GRADIENT_DIAMOND" => PaintKind::GradientDiamond,
        "IMAGE" => PaintKind::Image,
        "EMOJI" => PaintKind::Emoji,
        _ => return None,
    };
    let visible = v.get("visible").and_then(|x| x.as_bool()).unwrap_or(true);
    let opacity = v.get("opacity").and_then(|x| x.as_f64()).unwrap_or(1.0) as f32;
    let color = v.get("color").map(|c| {
        [
            c.get("r").and_then(|x| x.as_f64()).unwrap_or(0.0) as f32,
            c.get("g").and_then(|x| x.as_f64()).unwrap_or(0.0) as f32,
            c.get("b").and_then(|x| x.as_f64()).unwrap_or(0.0) as f32,
            c.get("a").and_then(|x| x.as_f64()).unwrap_or(1.0) as f32,
        ]
    });
    Some(Paint {
        kind,
        visible,
        opacity,
        color,
        gradient_stops: Vec::new(),
        image_ref: v.get("imageRef").and_then(|x| x.as_str()).map(str::to_string),
        scale_mode: v.get("scaleMode").and_then(|x| x.as_str()).map(str::to_string),
    })
}
