//! The task planner: turns a parsed node tree into an ROI-tiered list of
//! implementation tasks an LLM-driven builder can work through in order.

use crate::codec::messages::{PlanTasksResponse, Task, TaskPriority};
use crate::model::{NodeKind, ParsedNode};
use crate::rpc::walker::{walk_preorder, WalkBounds};

/// Bounds and knobs the planner needs beyond the tree itself.
pub struct PlannerConfig {
    pub max_depth: u32,
    pub max_tasks: Option<u32>,
}

/// Assigns a node's natural tier from its structural role, before any
/// promotion/floor rule runs.
fn natural_tier(node: &ParsedNode) -> TaskPriority {
    match node.kind {
        NodeKind::Frame | NodeKind::Group | NodeKind::Section | NodeKind::Canvas | NodeKind::Document => {
            TaskPriority::P1Layout
        }
        NodeKind::Text => TaskPriority::P3Text,
        NodeKind::Vector | NodeKind::BooleanOp | NodeKind::Star | NodeKind::RegularPolygon => {
            TaskPriority::P4Specialist
        }
        NodeKind::Rectangle | NodeKind::Ellipse | NodeKind::Line => TaskPriority::P2Style,
        NodeKind::Component | NodeKind::ComponentSet | NodeKind::Instance => TaskPriority::P4Specialist,
        NodeKind::Slice | NodeKind::Sticky | NodeKind::Unknown => TaskPriority::P2Style,
    }
}

/// Promotion/flooring rules: a node with auto-layout always counts as
/// structural (P1) regardless of its natural kind-based tier, since
/// getting layout right gates everything nested inside it; a node with
/// effects or a corner radius but no other distinguishing feature is
/// floored at P2 rather than demoted to P3/P4, since both are cheap to
/// misapply but visually glaring when wrong.
fn resolve_tier(node: &ParsedNode) -> TaskPriority {
    if node.has_layout() {
        return TaskPriority::P1Layout;
    }
    let natural = natural_tier(node);
    if (node.has_effects() || node.has_radius()) && matches!(natural, TaskPriority::P3Text | TaskPriority::P4Specialist) {
        return TaskPriority::P2Style;
    }
    natural
}

fn estimated_tokens(node: &ParsedNode) -> u64 {
    let mut tokens = 50;
    if node.has_layout() {
        tokens += 30;
    }
    tokens += node.fills.len() as u64 * 10;
    tokens += node.effects.len() as u64 * 20;
    if node.has_typography() {
        tokens += 40;
    }
    tokens += node.children.len() as u64 * 20;
    tokens
}

fn semantic_dsl(node: &ParsedNode) -> String {
    crate::external::RawDslEmitter.emit(node)
}

fn hints_for(node: &ParsedNode, priority: TaskPriority) -> Vec<String> {
    let mut hints = Vec::new();
    match priority {
        TaskPriority::P1Layout => hints.push("structural container".to_string()),
        TaskPriority::P2Style => hints.push("visual styling".to_string()),
        TaskPriority::P3Text => hints.push("text content".to_string()),
        TaskPriority::P4Specialist => hints.push("specialist geometry".to_string()),
    }
    if node.has_layout() {
        hints.push(format!("auto-layout: {:?}", node.layout_mode));
    }
    if node.component_id.is_some() {
        hints.push("component instance".to_string());
    }
    hints
}

/// Builds the ordered task list for `root`. Ordering is stable pre-order
/// within a tier — iteration order ties are broken by document order, not
/// by id or name, so re-running the planner on the same tree is
/// deterministic.
pub fn plan_tasks(root: &ParsedNode, config: &PlannerConfig) -> PlanTasksResponse {
    let bounds = WalkBounds { max_depth: config.max_depth, max_nodes: u32::MAX };
    let entries = walk_preorder(root, &bounds);

    let mut tasks: Vec<Task> = entries
        .iter()
        .map(|entry| {
            let priority = resolve_tier(entry.node);
            Task {
                id: format!("task-{}", entry.node.id),
                node_id: entry.node.id.clone(),
                node_name: entry.node.name.clone(),
                node_type: format!("{:?}", entry.node.kind),
                priority,
                dependencies: if entry.parent_id.is_empty() {
                    Vec::new()
                } else {
                    vec![format!("task-{}", entry.parent_id)]
                },
                estimated_tokens: estimated_tokens(entry.node),
                semantic_dsl: semantic_dsl(entry.node),
                hints: hints_for(entry.node, priority),
            }
        })
        .collect();

    // Stable sort by tier, preserving the pre-order position within a tier.
    tasks.sort_by_key(|t| t.priority as u8);

    if let Some(max) = config.max_tasks {
        tasks.truncate(max as usize);
    }

    let total_estimated_tokens = tasks.iter().map(|t| t.estimated_tokens).sum();
    let summary = Some(format!("{} task(s) planned for {}", tasks.len(), root.id));

    PlanTasksResponse {
        tasks,
        total_estimated_tokens,
        root_node_id: root.id.clone(),
        summary,
        requirements_json: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{LayoutMode, ParsedNode};

    fn layout_frame() -> ParsedNode {
        let mut root = ParsedNode::new("1:1", "Screen", NodeKind::Frame);
        root.layout_mode = LayoutMode::Vertical;
        let mut text = ParsedNode::new("1:2", "Title", NodeKind::Text);
        text.text_content = Some("Hello".to_string());
        root.children.push(text);
        root.children.push(ParsedNode::new("1:3", "Box", NodeKind::Rectangle));
        root
    }

    #[test]
    fn layout_nodes_are_promoted_to_p1_regardless_of_kind() {
        let mut group = ParsedNode::new("1:1", "g", NodeKind::Group);
        group.layout_mode = LayoutMode::Horizontal;
        assert_eq!(resolve_tier(&group), TaskPriority::P1Layout);
    }

    #[test]
    fn a_vector_with_a_corner_radius_is_floored_at_p2_instead_of_staying_p4() {
        let mut vector = ParsedNode::new("1:6", "RoundedBlob", NodeKind::Vector);
        vector.corner_radius = Some(4.0);
        assert_eq!(resolve_tier(&vector), TaskPriority::P2Style);
    }

    #[test]
    fn tiers_are_sorted_p1_before_p2_before_p3() {
        let root = layout_frame();
        let response = plan_tasks(&root, &PlannerConfig { max_depth: 10, max_tasks: None });
        let tiers: Vec<TaskPriority> = response.tasks.iter().map(|t| t.priority).collect();
        let mut sorted = tiers.clone();
        sorted.sort_by_key(|p| *p as u8);
        assert_eq!(tiers, sorted);
    }

    #[test]
    fn max_tasks_truncates_the_list() {
        let root = layout_frame();
        let response = plan_tasks(&root, &PlannerConfig { max_depth: 10, max_tasks: Some(1) });
        assert_eq!(response.tasks.len(), 1);
    }

    #[test]
    fn total_estimated_tokens_is_the_sum_of_task_estimates() {
        let root = layout_frame();
        let response = plan_tasks(&root, &PlannerConfig { max_depth: 10, max_tasks: None });
        let sum: u64 = response.tasks.iter().map(|t| t.estimated_tokens).sum();
        assert_eq!(response.total_estimated_tokens, sum);
    }

    #[test]
    fn child_tasks_depend_on_their_parent_task() {
        let root = layout_frame();
        let response = plan_tasks(&root, &PlannerConfig { max_depth: 10, max_tasks: None });
        let child = response.tasks.iter().find(|t| t.node_id == "1:2").unwrap();
        assert_eq!(child.dependencies, vec!["task-1:1".to_string()]);
    }
}
