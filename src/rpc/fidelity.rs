//! The fidelity loop: progressively deepen a tree truncation until a
//! coverage score target is met or the depth budget runs out.
//!
//! The design API returns a node's full subtree in a single call, so
//! "fetching deeper" here means truncating less of what's already in hand
//! rather than issuing another network round trip — this keeps the loop a
//! pure function over a tree, which is what makes it testable without a
//! live client.

use crate::codec::messages::FidelityProgress;
use crate::external::DslEmitter;
use crate::model::normalize::truncate_to_depth;
use crate::model::ParsedNode;

pub struct FidelityLoopConfig {
    pub target_score: f32,
    pub start_depth: u32,
    pub max_depth: u32,
    pub depth_step: u32,
}

/// Fraction of the full tree's nodes captured at `depth`. `1.0` once the
/// truncation depth reaches or exceeds the tree's actual depth.
fn coverage_score(root: &ParsedNode, depth: u32) -> f32 {
    let total = root.subtree_size().max(1);
    let captured = truncate_to_depth(root, depth).subtree_size();
    (captured as f32 / total as f32).min(1.0)
}

/// Runs the loop and returns its full progress trace, ending with a `done`
/// entry — either `success` once `target_score` is reached, or a failure
/// once `max_depth` is exhausted first.
pub fn run_fidelity_loop(
    root: &ParsedNode,
    config: &FidelityLoopConfig,
    emitter: &dyn DslEmitter,
) -> Vec<FidelityProgress> {
    let mut trace = Vec::new();
    let mut depth = config.start_depth;
    let mut attempt = 0u64;
    let step = config.depth_step.max(1);

    loop {
        attempt += 1;
        let score = coverage_score(root, depth);
        let truncated = truncate_to_depth(root, depth);
        let dsl = emitter.emit(&truncated).into_bytes();

        if score >= config.target_score {
            trace.push(FidelityProgress {
                attempt,
                current_depth: depth as u64,
                current_score: score,
                dsl: Some(dsl.clone()),
                done: true,
                success: true,
                final_dsl: Some(dsl),
                error: None,
                node_count: Some(truncated.subtree_size() as u64),
                raw_size: None,
                compressed_size: None,
            });
            return trace;
        }

        if depth >= config.max_depth {
            trace.push(FidelityProgress {
                attempt,
                current_depth: depth as u64,
                current_score: score,
                dsl: Some(dsl),
                done: true,
                success: false,
                final_dsl: None,
                error: Some(format!(
                    "reached max depth {} with score {score:.3} below target {}",
                    config.max_depth, config.target_score
                )),
                node_count: Some(truncated.subtree_size() as u64),
                raw_size: None,
                compressed_size: None,
            });
            return trace;
        }

        trace.push(FidelityProgress {
            attempt,
            current_depth: depth as u64,
            current_score: score,
            dsl: Some(dsl),
            done: false,
            success: false,
            final_dsl: None,
            error: None,
            node_count: Some(truncated.subtree_size() as u64),
            raw_size: None,
            compressed_size: None,
        });

        depth = (depth + step).min(config.max_depth);
    }
}
