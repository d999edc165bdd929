//! Decodes one length-prefixed wire frame into a typed request, resolving
//! `{file_key, node_id}` from either an explicit pair or a design URL and
//! normalizing the node id at this single ingress point.

use crate::codec::messages::{FidelityLoopRequest, GetNodeRequest, PlanTasksRequest, SplitStreamRequest};
use crate::error::Result;
use crate::model::normalize::normalize_node_id;

/// Normalizes `req.node_id` in place. Called once per request at the RPC
/// boundary so every downstream consumer can assume ids already use `:`.
pub fn normalize_get_node_request(mut req: GetNodeRequest) -> GetNodeRequest {
    req.node_id = normalize_node_id(&req.node_id);
    req
}

pub fn normalize_fidelity_request(mut req: FidelityLoopRequest) -> FidelityLoopRequest {
    req.node_id = normalize_node_id(&req.node_id);
    req
}

pub fn normalize_split_request(mut req: SplitStreamRequest) -> SplitStreamRequest {
    req.node_id = normalize_node_id(&req.node_id);
    req
}

pub fn normalize_plan_request(mut req: PlanTasksRequest) -> PlanTasksRequest {
    req.node_id = normalize_node_id(&req.node_id);
    req
}

/// Decodes a single framed message (length-prefix already stripped) into a
/// `GetNodeRequest`. Kept as a thin wrapper so the decode-then-normalize
/// pairing is impossible to forget at call sites.
pub fn decode_get_node_request(payload: &[u8]) -> Result<GetNodeRequest> {
    Ok(normalize_get_node_request(GetNodeRequest::decode(payload)?))
}

pub fn decode_fidelity_request(payload: &[u8]) -> Result<FidelityLoopRequest> {
    Ok(normalize_fidelity_request(FidelityLoopRequest::decode(payload)?))
}

pub fn decode_split_request(payload: &[u8]) -> Result<SplitStreamRequest> {
    Ok(normalize_split_request(SplitStreamRequest::decode(payload)?))
}

pub fn decode_plan_request(payload: &[u8]) -> Result<PlanTasksRequest> {
    Ok(normalize_plan_request(PlanTasksRequest::decode(payload)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_normalizes_dashed_node_ids() {
        let req = GetNodeRequest {
            file_key: "F1".into(),
            node_id: "1-2".into(),
            token: "t".into(),
            depth_start: None,
            depth_end: None,
            format: "raw".into(),
            geometry: false,
            plugin_data: false,
            version: None,
            recursive: false,
            recursive_max_depth: None,
            recursive_max_nodes: None,
            recursive_depth_per_call: None,
        };
        let decoded = decode_get_node_request(&req.encode()).unwrap();
        assert_eq!(decoded.node_id, "1:2");
    }
}
