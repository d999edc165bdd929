#![allow(missing_docs)]

use nodebridge::codec::messages::TaskPriority;
use nodebridge::model::{Effect, EffectKind, LayoutMode, NodeKind, ParsedNode, Typography};
use nodebridge::planner::{plan_tasks, PlannerConfig};

fn screen_with_one_of_every_tier() -> ParsedNode {
    let mut root = ParsedNode::new("1:1", "Screen", NodeKind::Frame);
    root.layout_mode = LayoutMode::Vertical;

    let mut styled_rect = ParsedNode::new("1:2", "Card", NodeKind::Rectangle);
    styled_rect.corner_radius = Some(8.0);

    let mut text = ParsedNode::new("1:3", "Title", NodeKind::Text);
    text.text_content = Some("Hello".to_string());
    text.typography = Some(Typography {
        font_family: "Inter".into(),
        font_size: 16.0,
        font_weight: 400,
        line_height: None,
        letter_spacing: None,
        text_align: None,
    });

    let specialist = ParsedNode::new("1:4", "Icon", NodeKind::Vector);

    root.children.push(styled_rect);
    root.children.push(text);
    root.children.push(specialist);
    root
}

#[test]
fn every_structural_container_lands_in_p1() {
    let root = screen_with_one_of_every_tier();
    let response = plan_tasks(&root, &PlannerConfig { max_depth: 10, max_tasks: None });
    let root_task = response.tasks.iter().find(|t| t.node_id == "1:1").unwrap();
    assert_eq!(root_task.priority, TaskPriority::P1Layout);
}

#[test]
fn a_node_with_layout_mode_is_promoted_to_p1_even_if_its_kind_would_say_otherwise() {
    let mut group = ParsedNode::new("1:9", "AutoLayoutGroup", NodeKind::Group);
    group.layout_mode = LayoutMode::Horizontal;
    let response = plan_tasks(&group, &PlannerConfig { max_depth: 10, max_tasks: None });
    let task = response.tasks.iter().find(|t| t.node_id == "1:9").unwrap();
    assert_eq!(task.priority, TaskPriority::P1Layout);
}

#[test]
fn styled_rectangle_lands_in_p2() {
    let root = screen_with_one_of_every_tier();
    let response = plan_tasks(&root, &PlannerConfig { max_depth: 10, max_tasks: None });
    let card = response.tasks.iter().find(|t| t.node_id == "1:2").unwrap();
    assert_eq!(card.priority, TaskPriority::P2Style);
}

#[test]
fn text_node_lands_in_p3() {
    let root = screen_with_one_of_every_tier();
    let response = plan_tasks(&root, &PlannerConfig { max_depth: 10, max_tasks: None });
    let title = response.tasks.iter().find(|t| t.node_id == "1:3").unwrap();
    assert_eq!(title.priority, TaskPriority::P3Text);
}

#[test]
fn vector_node_lands_in_p4() {
    let root = screen_with_one_of_every_tier();
    let response = plan_tasks(&root, &PlannerConfig { max_depth: 10, max_tasks: None });
    let icon = response.tasks.iter().find(|t| t.node_id == "1:4").unwrap();
    assert_eq!(icon.priority, TaskPriority::P4Specialist);
}

#[test]
fn a_vector_with_a_drop_shadow_is_floored_at_p2_instead_of_staying_p4() {
    let mut vector = ParsedNode::new("1:5", "Blob", NodeKind::Vector);
    vector.effects.push(Effect {
        kind: EffectKind::DropShadow,
        visible: true,
        radius: 4.0,
        color: None,
        offset: None,
        spread: None,
    });
    let response = plan_tasks(&vector, &PlannerConfig { max_depth: 10, max_tasks: None });
    let task = response.tasks.iter().find(|t| t.node_id == "1:5").unwrap();
    assert_eq!(task.priority, TaskPriority::P2Style);
}

#[test]
fn output_order_is_sorted_by_tier_with_p1_before_p2_before_p3_before_p4() {
    let root = screen_with_one_of_every_tier();
    let response = plan_tasks(&root, &PlannerConfig { max_depth: 10, max_tasks: None });
    let priorities: Vec<u8> = response.tasks.iter().map(|t| t.priority as u8).collect();
    let mut sorted = priorities.clone();
    sorted.sort_unstable();
    assert_eq!(priorities, sorted);
}

#[test]
fn every_non_root_task_depends_on_its_parents_task_id() {
    let root = screen_with_one_of_every_tier();
    let response = plan_tasks(&root, &PlannerConfig { max_depth: 10, max_tasks: None });
    for task in &response.tasks {
        if task.node_id == "1:1" {
            assert!(task.dependencies.is_empty());
        } else {
            assert_eq!(task.dependencies, vec!["task-1:1".to_string()]);
        }
    }
}

#[test]
fn estimated_tokens_grows_with_typography_fills_and_effects() {
    let mut plain = ParsedNode::new("1:1", "plain", NodeKind::Text);
    plain.text_content = Some("hi".into());
    let bare_response = plan_tasks(&plain, &PlannerConfig { max_depth: 10, max_tasks: None });
    let bare_tokens = bare_response.tasks[0].estimated_tokens;

    let mut rich = ParsedNode::new("1:1", "rich", NodeKind::Text);
    rich.text_content = Some("hi".into());
    rich.typography = Some(Typography {
        font_family: "Inter".into(),
        font_size: 14.0,
        font_weight: 700,
        line_height: None,
        letter_spacing: None,
        text_align: None,
    });
    let rich_response = plan_tasks(&rich, &PlannerConfig { max_depth: 10, max_tasks: None });
    let rich_tokens = rich_response.tasks[0].estimated_tokens;

    assert!(rich_tokens > bare_tokens);
}

#[test]
fn total_estimated_tokens_matches_the_sum_across_tiers() {
    let root = screen_with_one_of_every_tier();
    let response = plan_tasks(&root, &PlannerConfig { max_depth: 10, max_tasks: None });
    let sum: u64 = response.tasks.iter().map(|t| t.estimated_tokens).sum();
    assert_eq!(response.total_estimated_tokens, sum);
}
