//! Node id normalization and design-URL parsing.
//!
//! Public URLs encode node ids with `-` as the segment separator; the
//! external API and every cache key require `:`. Normalization is applied
//! at every ingress point — a request's `node_id` field, and any id
//! recovered from a `url` field.

use crate::error::{NodeBridgeError, Result};
use crate::model::ParsedNode;

/// Truncates a tree to `max_depth` by dropping children past that depth.
/// The root is depth 0. Leaves within the bound are left untouched — this
/// never introduces cycles since the source is already a tree.
pub fn truncate_to_depth(node: &ParsedNode, max_depth: u32) -> ParsedNode {
    fn walk(node: &ParsedNode, depth: u32, max_depth: u32) -> ParsedNode {
        let mut copy = node.clone();
        copy.children.clear();
        if depth < max_depth {
            copy.children = node
                .children
                .iter()
                .map(|c| walk(c, depth + 1, max_depth))
                .collect();
        }
        copy
    }
    walk(node, 0, max_depth)
}

/// Rewrites `-` to `:`. Idempotent: `normalize(normalize(x)) == normalize(x)`
/// for all inputs, since the output never contains a `-` for the parser to
/// find again.
pub fn normalize_node_id(id: &str) -> String {
    id.replace('-', ":")
}

/// `{file_key, node_id}` recovered from a design URL or supplied directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileNodeRef {
    pub file_key: String,
    pub node_id: String,
}

/// Parses a design file URL of the shape
/// `.../file/<file_key>/...?node-id=<node_id>` (or `/design/<file_key>/...`),
/// recovering and normalizing both components. This is one of the few
/// places a real design-tool URL format leaks into the service; everything
/// downstream only ever sees `{file_key, node_id}`.
pub fn parse_design_url(url: &str) -> Result<FileNodeRef> {
    let parsed = url::Url::parse(url)
        .map_err(|e| NodeBridgeError::Parse(format!("invalid design URL: {e}")))?;

    let file_key = parsed
        .path_segments()
        .and_then(|mut segs| {
            while let Some(seg) = segs.next() {
                if seg == "file" || seg == "design" || seg == "proto" {
                    return segs.next().map(str::to_string);
                }
            }
            None
        })
        .ok_or_else(|| NodeBridgeError::Parse("design URL missing file key segment".into()))?;

    let node_id = parsed
        .query_pairs()
        .find(|(k, _)| k == "node-id" || k == "node_id")
        .map(|(_, v)| normalize_node_id(&v))
        .ok_or_else(|| NodeBridgeError::Parse("design URL missing node-id query param".into()))?;

    Ok(FileNodeRef { file_key, node_id })
}

/// Resolves a `{file_key, node_id}` pair from a request that may supply
/// either an explicit pair or a `url`. An explicit pair always wins when
/// both are given, per spec.
pub fn resolve_file_node(
    explicit_file_key: Option<&str>,
    explicit_node_id: Option<&str>,
    url: Option<&str>,
) -> Result<FileNodeRef> {
    if let (Some(fk), Some(nid)) = (explicit_file_key, explicit_node_id) {
        return Ok(FileNodeRef {
            file_key: fk.to_string(),
            node_id: normalize_node_id(nid),
        });
    }
    if let Some(u) = url {
        return parse_design_url(u);
    }
    Err(NodeBridgeError::MissingField("file_key/node_id or url"))
}
