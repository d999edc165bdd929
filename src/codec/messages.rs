//! Typed RPC messages and their field-number contracts (spec §6).
//!
//! Each message exposes `encode(&self) -> Vec<u8>` and
//! `decode(bytes: &[u8]) -> Result<Self>`. Decoding applies "last occurrence
//! wins" for scalar fields and "all occurrences" for repeated fields, and
//! silently ignores field numbers it doesn't recognize.

use crate::codec::{decode_fields, RawField, Writer};
use crate::error::{NodeBridgeError, Result};

fn missing(field: &'static str) -> NodeBridgeError {
    NodeBridgeError::MissingField(field)
}

// ---------------------------------------------------------------- GetNodeRequest

#[derive(Debug, Clone, PartialEq)]
pub struct GetNodeRequest {
    pub file_key: String,
    pub node_id: String,
    pub token: String,
    pub depth_start: Option<u64>,
    pub depth_end: Option<u64>,
    pub format: String,
    pub geometry: bool,
    pub plugin_data: bool,
    pub version: Option<String>,
    pub recursive: bool,
    pub recursive_max_depth: Option<u64>,
    pub recursive_max_nodes: Option<u64>,
    pub recursive_depth_per_call: Option<u64>,
}

impl GetNodeRequest {
    pub fn encode(&self) -> Vec<u8> {
        let mut w = Writer::new();
        w.write_string_field(1, &self.file_key);
        w.write_string_field(2, &self.node_id);
        w.write_string_field(3, &self.token);
        if let Some(v) = self.depth_start {
            w.write_varint_field(4, v);
        }
        if let Some(v) = self.depth_end {
            w.write_varint_field(5, v);
        }
        w.write_string_field(6, &self.format);
        w.write_bool_field(7, self.geometry);
        w.write_bool_field(8, self.plugin_data);
        if let Some(v) = &self.version {
            w.write_string_field(10, v);
        }
        w.write_bool_field(11, self.recursive);
        if let Some(v) = self.recursive_max_depth {
            w.write_varint_field(12, v);
        }
        if let Some(v) = self.recursive_max_nodes {
            w.write_varint_field(13, v);
        }
        if let Some(v) = self.recursive_depth_per_call {
            w.write_varint_field(14, v);
        }
        w.into_bytes()
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let fields = decode_fields(bytes)?;
        let mut file_key = None;
        let mut node_id = None;
        let mut token = None;
        let mut depth_start = None;
        let mut depth_end = None;
        let mut format = None;
        let mut geometry = false;
        let mut plugin_data = false;
        let mut version = None;
        let mut recursive = false;
        let mut recursive_max_depth = None;
        let mut recursive_max_nodes = None;
        let mut recursive_depth_per_call = None;

        for (num, val) in &fields {
            match num {
                1 => file_key = Some(string_field(val)?),
                2 => node_id = Some(string_field(val)?),
                3 => token = Some(string_field(val)?),
                4 => depth_start = val.as_varint(),
                5 => depth_end = val.as_varint(),
                6 => format = Some(string_field(val)?),
                7 => geometry = val.as_bool().unwrap_or(false),
                8 => plugin_data = val.as_bool().unwrap_or(false),
                10 => version = Some(string_field(val)?),
                11 => recursive = val.as_bool().unwrap_or(false),
                12 => recursive_max_depth = val.as_varint(),
                13 => recursive_max_nodes = val.as_varint(),
                14 => recursive_depth_per_call = val.as_varint(),
                _ => {}
            }
        }

        Ok(Self {
            file_key: file_key.ok_or_else(|| missing("file_key"))?,
            node_id: node_id.ok_or_else(|| missing("node_id"))?,
            token: token.unwrap_or_default(),
            depth_start,
            depth_end,
            format: format.unwrap_or_else(|| "raw".to_string()),
            geometry,
            plugin_data,
            version,
            recursive,
            recursive_max_depth,
            recursive_max_nodes,
            recursive_depth_per_call,
        })
    }
}

fn string_field(val: &RawField) -> Result<String> {
    val.as_string()
        .ok_or_else(|| NodeBridgeError::Parse("expected a length-delimited string field".into()))?
}

// ---------------------------------------------------------------- FigmaNode

#[derive(Debug, Clone, PartialEq)]
pub struct FigmaNode {
    pub id: String,
    pub name: String,
    pub depth: u64,
    pub parent_id: String,
    pub child_count: u64,
    pub dsl: Vec<u8>,
    pub node_index: u64,
    pub total_nodes: u64,
}

impl FigmaNode {
    pub fn encode(&self) -> Vec<u8> {
        let mut header = Writer::new();
        header.write_string_field(1, &self.id);
        header.write_string_field(2, &self.name);

        let mut w = Writer::new();
        w.write_message_field(1, &header.into_bytes());
        w.write_varint_field(10, self.depth);
        w.write_string_field(11, &self.parent_id);
        w.write_varint_field(12, self.child_count);
        w.write_bytes_field(20, &self.dsl);
        w.write_varint_field(30, self.node_index);
        w.write_varint_field(31, self.total_nodes);
        w.into_bytes()
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let fields = decode_fields(bytes)?;
        let mut id = None;
        let mut name = None;
        let mut depth = 0;
        let mut parent_id = String::new();
        let mut child_count = 0;
        let mut dsl = Vec::new();
        let mut node_index = 0;
        let mut total_nodes = 0;

        for (num, val) in &fields {
            match num {
                1 => {
                    let header_bytes = val
                        .as_bytes()
                        .ok_or_else(|| NodeBridgeError::Parse("bad header submessage".into()))?;
                    for (hnum, hval) in decode_fields(header_bytes)? {
                        match hnum {
                            1 => id = Some(string_field(&hval)?),
                            2 => name = Some(string_field(&hval)?),
                            _ => {}
                        }
                    }
                }
                10 => depth = val.as_varint().unwrap_or(0),
                11 => parent_id = string_field(val)?,
                12 => child_count = val.as_varint().unwrap_or(0),
                20 => dsl = val.as_bytes().unwrap_or_default().to_vec(),
                30 => node_index = val.as_varint().unwrap_or(0),
                31 => total_nodes = val.as_varint().unwrap_or(0),
                _ => {}
            }
        }

        Ok(Self {
            id: id.ok_or_else(|| missing("header.id"))?,
            name: name.unwrap_or_default(),
            depth,
            parent_id,
            child_count,
            dsl,
            node_index,
            total_nodes,
        })
    }
}

// ---------------------------------------------------------------- FidelityLoopRequest / FidelityProgress

#[derive(Debug, Clone, PartialEq)]
pub struct FidelityLoopRequest {
    pub file_key: String,
    pub node_id: String,
    pub token: String,
    pub target_score: f32,
    pub start_depth: u64,
    pub max_depth: u64,
    pub depth_step: u64,
    pub include_meta: bool,
    pub include_variables: bool,
    pub include_image_fills: bool,
}

impl FidelityLoopRequest {
    pub fn encode(&self) -> Vec<u8> {
        let mut w = Writer::new();
        w.write_string_field(1, &self.file_key);
        w.write_string_field(2, &self.node_id);
        w.write_string_field(3, &self.token);
        w.write_fixed32_field(4, self.target_score);
        w.write_varint_field(5, self.start_depth);
        w.write_varint_field(6, self.max_depth);
        w.write_varint_field(7, self.depth_step);
        w.write_bool_field(10, self.include_meta);
        w.write_bool_field(11, self.include_variables);
        w.write_bool_field(12, self.include_image_fills);
        w.into_bytes()
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let fields = decode_fields(bytes)?;
        let mut file_key = None;
        let mut node_id = None;
        let mut token = None;
        let mut target_score = 0.99f32;
        let mut start_depth = 1;
        let mut max_depth = 5;
        let mut depth_step = 1;
        let mut include_meta = false;
        let mut include_variables = false;
        let mut include_image_fills = false;

        for (num, val) in &fields {
            match num {
                1 => file_key = Some(string_field(val)?),
                2 => node_id = Some(string_field(val)?),
                3 => token = Some(string_field(val)?),
                4 => target_score = val.as_f32().unwrap_or(0.99),
                5 => start_depth = val.as_varint().unwrap_or(1),
                6 => max_depth = val.as_varint().unwrap_or(5),
                7 => depth_step = val.as_varint().unwrap_or(1),
                10 => include_meta = val.as_bool().unwrap_or(false),
                11 => include_variables = val.as_bool().unwrap_or(false),
                12 => include_image_fills = val.as_bool().unwrap_or(false),
                _ => {}
            }
        }

        Ok(Self {
            file_key: file_key.ok_or_else(|| missing("file_key"))?,
            node_id: node_id.ok_or_else(|| missing("node_id"))?,
            token: token.unwrap_or_default(),
            target_score,
            start_depth,
            max_depth,
            depth_step,
            include_meta,
            include_variables,
            include_image_fills,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct FidelityProgress {
    pub attempt: u64,
    pub current_depth: u64,
    pub current_score: f32,
    pub dsl: Option<Vec<u8>>,
    pub done: bool,
    pub success: bool,
    pub final_dsl: Option<Vec<u8>>,
    pub error: Option<String>,
    pub node_count: Option<u64>,
    pub raw_size: Option<u64>,
    pub compressed_size: Option<u64>,
}

impl FidelityProgress {
    pub fn encode(&self) -> Vec<u8> {
        let mut w = Writer::new();
        w.write_varint_field(1, self.attempt);
        w.write_varint_field(2, self.current_depth);
        w.write_fixed32_field(3, self.current_score);
        if let Some(dsl) = &self.dsl {
            w.write_bytes_field(10, dsl);
        }
        w.write_bool_field(20, self.done);
        w.write_bool_field(21, self.success);
        if let Some(dsl) = &self.final_dsl {
            w.write_bytes_field(22, dsl);
        }
        if let Some(e) = &self.error {
            w.write_string_field(23, e);
        }
        if let Some(v) = self.node_count {
            w.write_varint_field(30, v);
        }
        if let Some(v) = self.raw_size {
            w.write_varint_field(31, v);
        }
        if let Some(v) = self.compressed_size {
            w.write_varint_field(32, v);
        }
        w.into_bytes()
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let fields = decode_fields(bytes)?;
        let mut out = Self::default();
        for (num, val) in &fields {
            match num {
                1 => out.attempt = val.as_varint().unwrap_or(0),
                2 => out.current_depth = val.as_varint().unwrap_or(0),
                3 => out.current_score = val.as_f32().unwrap_or(0.0),
                10 => out.dsl = Some(val.as_bytes().unwrap_or_default().to_vec()),
                20 => out.done = val.as_bool().unwrap_or(false),
                21 => out.success = val.as_bool().unwrap_or(false),
                22 => out.final_dsl = Some(val.as_bytes().unwrap_or_default().to_vec()),
                23 => out.error = Some(string_field(val)?),
                30 => out.node_count = val.as_varint(),
                31 => out.raw_size = val.as_varint(),
                32 => out.compressed_size = val.as_varint(),
                _ => {}
            }
        }
        Ok(out)
    }
}

// ---------------------------------------------------------------- SplitStreamRequest / SplitChunk

#[derive(Debug, Clone, PartialEq)]
pub struct SplitStreamRequest {
    pub file_key: String,
    pub node_id: String,
    pub token: String,
    pub depth: u64,
    pub include_styles: bool,
    pub include_layouts: bool,
    pub include_contents: bool,
}

impl SplitStreamRequest {
    pub fn encode(&self) -> Vec<u8> {
        let mut w = Writer::new();
        w.write_string_field(1, &self.file_key);
        w.write_string_field(2, &self.node_id);
        w.write_string_field(3, &self.token);
        w.write_varint_field(4, self.depth);
        w.write_bool_field(10, self.include_styles);
        w.write_bool_field(11, self.include_layouts);
        w.write_bool_field(12, self.include_contents);
        w.into_bytes()
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let fields = decode_fields(bytes)?;
        let mut file_key = None;
        let mut node_id = None;
        let mut token = None;
        let mut depth = 0;
        let mut include_styles = true;
        let mut include_layouts = true;
        let mut include_contents = true;

        for (num, val) in &fields {
            match num {
                1 => file_key = Some(string_field(val)?),
                2 => node_id = Some(string_field(val)?),
                3 => token = Some(string_field(val)?),
                4 => depth = val.as_varint().unwrap_or(0),
                10 => include_styles = val.as_bool().unwrap_or(true),
                11 => include_layouts = val.as_bool().unwrap_or(true),
                12 => include_contents = val.as_bool().unwrap_or(true),
                _ => {}
            }
        }

        Ok(Self {
            file_key: file_key.ok_or_else(|| missing("file_key"))?,
            node_id: node_id.ok_or_else(|| missing("node_id"))?,
            token: token.unwrap_or_default(),
            depth,
            include_styles,
            include_layouts,
            include_contents,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    fn encode(&self) -> Vec<u8> {
        let mut w = Writer::new();
        w.write_fixed32_field(1, self.r);
        w.write_fixed32_field(2, self.g);
        w.write_fixed32_field(3, self.b);
        w.write_fixed32_field(4, self.a);
        w.into_bytes()
    }

    fn decode(bytes: &[u8]) -> Result<Self> {
        let fields = decode_fields(bytes)?;
        let mut c = Color::default();
        for (num, val) in &fields {
            match num {
                1 => c.r = val.as_f32().unwrap_or(0.0),
                2 => c.g = val.as_f32().unwrap_or(0.0),
                3 => c.b = val.as_f32().unwrap_or(0.0),
                4 => c.a = val.as_f32().unwrap_or(0.0),
                _ => {}
            }
        }
        Ok(c)
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct StyleChunk {
    pub fill_colors: Vec<Color>,
    pub stroke_colors: Vec<Color>,
    pub typography: Option<String>,
    pub opacity: f32,
    pub corner_radius: f64,
    pub stroke_weight: f64,
}

impl StyleChunk {
    fn encode(&self) -> Vec<u8> {
        let mut w = Writer::new();
        for c in &self.fill_colors {
            w.write_message_field(1, &c.encode());
        }
        for c in &self.stroke_colors {
            w.write_message_field(2, &c.encode());
        }
        if let Some(t) = &self.typography {
            w.write_string_field(3, t);
        }
        w.write_fixed32_field(4, self.opacity);
        w.write_fixed64_field(5, self.corner_radius);
        w.write_fixed64_field(6, self.stroke_weight);
        w.into_bytes()
    }

    fn decode(bytes: &[u8]) -> Result<Self> {
        let fields = decode_fields(bytes)?;
        let mut out = Self::default();
        for (num, val) in &fields {
            match num {
                1 => out
                    .fill_colors
                    .push(Color::decode(val.as_bytes().unwrap_or_default())?),
                2 => out
                    .stroke_colors
                    .push(Color::decode(val.as_bytes().unwrap_or_default())?),
                3 => out.typography = Some(string_field(val)?),
                4 => out.opacity = val.as_f32().unwrap_or(0.0),
                5 => out.corner_radius = val.as_f64().unwrap_or(0.0),
                6 => out.stroke_weight = val.as_f64().unwrap_or(0.0),
                _ => {}
            }
        }
        Ok(out)
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct LayoutChunk {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
    pub constraints: Option<String>,
    pub layout_mode: String,
    pub primary_align: String,
    pub counter_align: String,
    pub item_spacing: f64,
    pub padding_top: f64,
    pub padding_right: f64,
    pub padding_bottom: f64,
    pub padding_left: f64,
    pub clips_content: bool,
}

impl LayoutChunk {
    fn encode(&self) -> Vec<u8> {
        let mut w = Writer::new();
        w.write_fixed64_field(1, self.x);
        w.write_fixed64_field(2, self.y);
        w.write_fixed64_field(3, self.w);
        w.write_fixed64_field(4, self.h);
        if let Some(c) = &self.constraints {
            w.write_string_field(5, c);
        }
        w.write_string_field(6, &self.layout_mode);
        w.write_string_field(7, &self.primary_align);
        w.write_string_field(8, &self.counter_align);
        w.write_fixed64_field(9, self.item_spacing);
        w.write_fixed64_field(10, self.padding_top);
        w.write_fixed64_field(11, self.padding_right);
        w.write_fixed64_field(12, self.padding_bottom);
        w.write_fixed64_field(13, self.padding_left);
        w.write_bool_field(14, self.clips_content);
        w.into_bytes()
    }

    fn decode(bytes: &[u8]) -> Result<Self> {
        let fields = decode_fields(bytes)?;
        let mut out = Self::default();
        for (num, val) in &fields {
            match num {
                1 => out.x = val.as_f64().unwrap_or(0.0),
                2 => out.y = val.as_f64().unwrap_or(0.0),
                3 => out.w = val.as_f64().unwrap_or(0.0),
                4 => out.h = val.as_f64().unwrap_or(0.0),
                5 => out.constraints = Some(string_field(val)?),
                6 => out.layout_mode = string_field(val)?,
                7 => out.primary_align = string_field(val)?,
                8 => out.counter_align = string_field(val)?,
                9 => out.item_spacing = val.as_f64().unwrap_or(0.0),
                10 => out.padding_top = val.as_f64().unwrap_or(0.0),
                11 => out.padding_right = val.as_f64().unwrap_or(0.0),
                12 => out.padding_bottom = val.as_f64().unwrap_or(0.0),
                13 => out.padding_left = val.as_f64().unwrap_or(0.0),
                14 => out.clips_content = val.as_bool().unwrap_or(false),
                _ => {}
            }
        }
        Ok(out)
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ContentChunk {
    pub node_type: String,
    pub name: String,
    pub text_content: Option<String>,
    pub image_ref: Option<String>,
}

impl ContentChunk {
    fn encode(&self) -> Vec<u8> {
        let mut w = Writer::new();
        w.write_string_field(1, &self.node_type);
        w.write_string_field(2, &self.name);
        if let Some(t) = &self.text_content {
            w.write_string_field(3, t);
        }
        if let Some(i) = &self.image_ref {
            w.write_string_field(4, i);
        }
        w.into_bytes()
    }

    fn decode(bytes: &[u8]) -> Result<Self> {
        let fields = decode_fields(bytes)?;
        let mut out = Self::default();
        for (num, val) in &fields {
            match num {
                1 => out.node_type = string_field(val)?,
                2 => out.name = string_field(val)?,
                3 => out.text_content = Some(string_field(val)?),
                4 => out.image_ref = Some(string_field(val)?),
                _ => {}
            }
        }
        Ok(out)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChunkPayload {
    Style(StyleChunk),
    Layout(LayoutChunk),
    Content(ContentChunk),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SplitChunk {
    pub sequence: u64,
    pub total_chunks: u64,
    pub node_id: String,
    pub payload: ChunkPayload,
}

impl SplitChunk {
    pub fn encode(&self) -> Vec<u8> {
        let mut w = Writer::new();
        w.write_varint_field(1, self.sequence);
        w.write_varint_field(2, self.total_chunks);
        w.write_string_field(3, &self.node_id);
        match &self.payload {
            ChunkPayload::Style(s) => w.write_message_field(10, &s.encode()),
            ChunkPayload::Layout(l) => w.write_message_field(11, &l.encode()),
            ChunkPayload::Content(c) => w.write_message_field(12, &c.encode()),
        }
        w.into_bytes()
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let fields = decode_fields(bytes)?;
        let mut sequence = 0;
        let mut total_chunks = 0;
        let mut node_id = String::new();
        let mut payload = None;

        for (num, val) in &fields {
            match num {
                1 => sequence = val.as_varint().unwrap_or(0),
                2 => total_chunks = val.as_varint().unwrap_or(0),
                3 => node_id = string_field(val)?,
                10 => payload = Some(ChunkPayload::Style(StyleChunk::decode(
                    val.as_bytes().unwrap_or_default(),
                )?)),
                11 => payload = Some(ChunkPayload::Layout(LayoutChunk::decode(
                    val.as_bytes().unwrap_or_default(),
                )?)),
                12 => payload = Some(ChunkPayload::Content(ContentChunk::decode(
                    val.as_bytes().unwrap_or_default(),
                )?)),
                _ => {}
            }
        }

        Ok(Self {
            sequence,
            total_chunks,
            node_id,
            payload: payload.ok_or_else(|| missing("style|layout|content"))?,
        })
    }
}

// ---------------------------------------------------------------- PlanTasksRequest / Task / PlanTasksResponse

#[derive(Debug, Clone, PartialEq)]
pub struct PlanTasksRequest {
    pub file_key: String,
    pub node_id: String,
    pub token: String,
    pub depth: u64,
    pub max_tasks: Option<u64>,
    pub recursive: bool,
    pub recursive_max_depth: Option<u64>,
    pub recursive_max_nodes: Option<u64>,
    pub recursive_depth_per_call: Option<u64>,
}

impl PlanTasksRequest {
    pub fn encode(&self) -> Vec<u8> {
        let mut w = Writer::new();
        w.write_string_field(1, &self.file_key);
        w.write_string_field(2, &self.node_id);
        w.write_string_field(3, &self.token);
        w.write_varint_field(4, self.depth);
        if let Some(v) = self.max_tasks {
            w.write_varint_field(5, v);
        }
        w.write_bool_field(10, self.recursive);
        if let Some(v) = self.recursive_max_depth {
            w.write_varint_field(11, v);
        }
        if let Some(v) = self.recursive_max_nodes {
            w.write_varint_field(12, v);
        }
        if let Some(v) = self.recursive_depth_per_call {
            w.write_varint_field(13, v);
        }
        w.into_bytes()
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let fields = decode_fields(bytes)?;
        let mut file_key = None;
        let mut node_id = None;
        let mut token = None;
        let mut depth = 0;
        let mut max_tasks = None;
        let mut recursive = false;
        let mut recursive_max_depth = None;
        let mut recursive_max_nodes = None;
        let mut recursive_depth_per_call = None;

        for (num, val) in &fields {
            match num {
                1 => file_key = Some(string_field(val)?),
                2 => node_id = Some(string_field(val)?),
                3 => token = Some(string_field(val)?),
                4 => depth = val.as_varint().unwrap_or(0),
                5 => max_tasks = val.as_varint(),
                10 => recursive = val.as_bool().unwrap_or(false),
                11 => recursive_max_depth = val.as_varint(),
                12 => recursive_max_nodes = val.as_varint(),
                13 => recursive_depth_per_call = val.as_varint(),
                _ => {}
            }
        }

        Ok(Self {
            file_key: file_key.ok_or_else(|| missing("file_key"))?,
            node_id: node_id.ok_or_else(|| missing("node_id"))?,
            token: token.unwrap_or_default(),
            depth,
            max_tasks,
            recursive,
            recursive_max_depth,
            recursive_max_nodes,
            recursive_depth_per_call,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskPriority {
    P1Layout = 0,
    P2Style = 1,
    P3Text = 2,
    P4Specialist = 3,
}

impl TaskPriority {
    fn from_u64(v: u64) -> Result<Self> {
        match v {
            0 => Ok(TaskPriority::P1Layout),
            1 => Ok(TaskPriority::P2Style),
            2 => Ok(TaskPriority::P3Text),
            3 => Ok(TaskPriority::P4Specialist),
            other => Err(NodeBridgeError::Parse(format!("invalid priority {other}"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Task {
    pub id: String,
    pub node_id: String,
    pub node_name: String,
    pub node_type: String,
    pub priority: TaskPriority,
    pub dependencies: Vec<String>,
    pub estimated_tokens: u64,
    pub semantic_dsl: String,
    pub hints: Vec<String>,
}

impl Task {
    pub fn encode(&self) -> Vec<u8> {
        let mut w = Writer::new();
        w.write_string_field(1, &self.id);
        w.write_string_field(2, &self.node_id);
        w.write_string_field(3, &self.node_name);
        w.write_string_field(4, &self.node_type);
        w.write_varint_field(5, self.priority as u64);
        for dep in &self.dependencies {
            w.write_string_field(6, dep);
        }
        w.write_varint_field(7, self.estimated_tokens);
        w.write_string_field(8, &self.semantic_dsl);
        for hint in &self.hints {
            w.write_string_field(9, hint);
        }
        w.into_bytes()
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let fields = decode_fields(bytes)?;
        let mut id = None;
        let mut node_id = None;
        let mut node_name = String::new();
        let mut node_type = String::new();
        let mut priority = TaskPriority::P4Specialist;
        let mut dependencies = Vec::new();
        let mut estimated_tokens = 0;
        let mut semantic_dsl = String::new();
        let mut hints = Vec::new();

        for (num, val) in &fields {
            match num {
                1 => id = Some(string_field(val)?),
                2 => node_id = Some(string_field(val)?),
                3 => node_name = string_field(val)?,
                4 => node_type = string_field(val)?,
                5 => priority = TaskPriority::from_u64(val.as_varint().unwrap_or(3))?,
                6 => dependencies.push(string_field(val)?),
                7 => estimated_tokens = val.as_varint().unwrap_or(0),
                8 => semantic_dsl = string_field(val)?,
                9 => hints.push(string_field(val)?),
                _ => {}
            }
        }

        Ok(Self {
            id: id.ok_or_else(|| missing("id"))?,
            node_id: node_id.ok_or_else(|| missing("node_id"))?,
            node_name,
            node_type,
            priority,
            dependencies,
            estimated_tokens,
            semantic_dsl,
            hints,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct PlanTasksResponse {
    pub tasks: Vec<Task>,
    pub total_estimated_tokens: u64,
    pub root_node_id: String,
    pub summary: Option<String>,
    pub requirements_json: Option<String>,
}

impl PlanTasksResponse {
    pub fn encode(&self) -> Vec<u8> {
        let mut w = Writer::new();
        for t in &self.tasks {
            w.write_message_field(1, &t.encode());
        }
        w.write_varint_field(2, self.total_estimated_tokens);
        w.write_string_field(3, &self.root_node_id);
        if let Some(s) = &self.summary {
            w.write_string_field(4, s);
        }
        if let Some(r) = &self.requirements_json {
            w.write_string_field(5, r);
        }
        w.into_bytes()
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let fields = decode_fields(bytes)?;
        let mut out = Self::default();
        for (num, val) in &fields {
            match num {
                1 => out.tasks.push(Task::decode(val.as_bytes().unwrap_or_default())?),
                2 => out.total_estimated_tokens = val.as_varint().unwrap_or(0),
                3 => out.root_node_id = string_field(val)?,
                4 => out.summary = Some(string_field(val)?),
                5 => out.requirements_json = Some(string_field(val)?),
                _ => {}
            }
        }
        Ok(out)
    }
}

// ---------------------------------------------------------------- FileMetaResponse

#[derive(Debug, Clone, PartialEq, Default)]
pub struct FileMetaResponse {
    pub name: String,
    pub last_modified: String,
    pub thumbnail_url: String,
    pub version: String,
    pub role: String,
    pub component_count: Option<u64>,
    pub style_count: Option<u64>,
}

impl FileMetaResponse {
    pub fn encode(&self) -> Vec<u8> {
        let mut w = Writer::new();
        w.write_string_field(1, &self.name);
        w.write_string_field(2, &self.last_modified);
        w.write_string_field(3, &self.thumbnail_url);
        w.write_string_field(4, &self.version);
        w.write_string_field(5, &self.role);
        if let Some(v) = self.component_count {
            w.write_varint_field(6, v);
        }
        if let Some(v) = self.style_count {
            w.write_varint_field(7, v);
        }
        w.into_bytes()
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let fields = decode_fields(bytes)?;
        let mut out = Self::default();
        for (num, val) in &fields {
            match num {
                1 => out.name = string_field(val)?,
                2 => out.last_modified = string_field(val)?,
                3 => out.thumbnail_url = string_field(val)?,
                4 => out.version = string_field(val)?,
                5 => out.role = string_field(val)?,
                6 => out.component_count = val.as_varint(),
                7 => out.style_count = val.as_varint(),
                _ => {}
            }
        }
        Ok(out)
    }
}
