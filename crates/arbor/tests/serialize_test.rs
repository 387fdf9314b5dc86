//! Serializer behavior on whole diagrams.

use arbor::{
    ArborError,
    assets::PassthroughResolver,
    color::Color,
    config::AppConfig,
    dot,
    model::{Diagram, Edge, Group, LayoutSettings, Node, RankDirection, StructuralError},
    style::{LinePattern, StyleSet},
};
use proptest::prelude::*;

fn serialize(diagram: &Diagram) -> Result<String, ArborError> {
    dot::serialize(diagram, &AppConfig::default(), &PassthroughResolver)
}

fn color(value: &str) -> Color {
    Color::new(value).unwrap()
}

/// Returns the lines of the block opened by `header`, excluding the header.
fn block<'a>(dot: &'a str, header: &str) -> Vec<&'a str> {
    let mut lines = dot.lines().skip_while(|line| !line.trim().starts_with(header));
    let Some(first) = lines.next() else {
        return Vec::new();
    };
    let indent = first.len() - first.trim_start().len();
    lines
        .take_while(|line| line.len() - line.trim_start().len() > indent)
        .collect()
}

#[test]
fn test_nested_group_scenario() {
    let mut diagram = Diagram::new().with_title("R");
    let root = diagram.root();
    let a = diagram.add_node(root, Node::new("A")).unwrap();
    let g = diagram.add_group(root, Group::new("G")).unwrap();
    let b = diagram.add_node(g, Node::new("B")).unwrap();
    diagram.connect(
        Edge::new(a, b).with_style(StyleSet::new().with_pattern(LinePattern::Dashed)),
    );

    let dot = serialize(&diagram).unwrap();

    let cluster = block(&dot, "subgraph cluster_0");
    assert!(cluster.iter().any(|line| line.contains("label=\"G\"")));
    assert!(cluster.iter().any(|line| line.trim().starts_with("n1 [label=\"B\"")));
    assert!(!cluster.iter().any(|line| line.contains("label=\"A\"")));

    assert!(
        dot.lines()
            .any(|line| line.starts_with("\tn0 [label=\"A\""))
    );

    let edges: Vec<&str> = dot.lines().filter(|line| line.contains("->")).collect();
    assert_eq!(edges.len(), 1);
    assert!(edges[0].trim().starts_with("n0 -> n1 [dir=forward style=dashed"));
}

#[test]
fn test_multi_edges_stay_distinct() {
    let mut diagram = Diagram::new();
    let root = diagram.root();
    let a = diagram.add_node(root, Node::new("a")).unwrap();
    let b = diagram.add_node(root, Node::new("b")).unwrap();
    diagram.connect(Edge::new(a, b));
    diagram.connect(
        Edge::new(a, b).with_style(StyleSet::new().with_pattern(LinePattern::Dotted)),
    );

    let dot = serialize(&diagram).unwrap();
    let edges: Vec<&str> = dot.lines().filter(|line| line.contains("n0 -> n1")).collect();

    assert_eq!(edges.len(), 2);
    assert!(!edges[0].contains("style=dotted"));
    assert!(edges[1].contains("style=dotted"));
}

#[test]
fn test_dangling_reference_fails() {
    let mut diagram = Diagram::new();
    let root = diagram.root();
    let a = diagram.add_node(root, Node::new("a")).unwrap();
    let outsider = Node::new("never added");
    let missing = outsider.id();
    let edge = diagram.connect(Edge::new(a, missing));

    match serialize(&diagram) {
        Err(ArborError::DanglingReference { edge: e, missing: m }) => {
            assert_eq!(e, edge.to_string());
            assert_eq!(m, missing.to_string());
        }
        other => panic!("Expected DanglingReference, got {other:?}"),
    }
}

#[test]
fn test_detached_subtree_is_dangling() {
    let mut diagram = Diagram::new();
    let root = diagram.root();
    let a = diagram.add_node(root, Node::new("a")).unwrap();
    let loose = diagram.insert_group(Group::new("loose")).unwrap();
    let inner = diagram.add_node(loose, Node::new("inner")).unwrap();
    diagram.connect(Edge::new(inner, a));

    assert!(matches!(
        serialize(&diagram),
        Err(ArborError::DanglingReference { .. })
    ));
}

#[test]
fn test_cycle_fails_before_serialization() {
    let mut diagram = Diagram::new();
    let root = diagram.root();
    let outer = diagram.add_group(root, Group::new("outer")).unwrap();
    let inner = diagram.add_group(outer, Group::new("inner")).unwrap();

    let err = diagram.attach(inner, outer).unwrap_err();
    assert!(matches!(
        err,
        StructuralError::Cycle { .. } | StructuralError::AlreadyAttached { .. }
    ));

    let loose = diagram.insert_group(Group::new("loose")).unwrap();
    let child = diagram.add_group(loose, Group::new("child")).unwrap();
    assert!(matches!(
        diagram.attach(child, loose),
        Err(StructuralError::Cycle { .. })
    ));

    // The tree is unchanged and still serializes.
    assert!(serialize(&diagram).is_ok());
}

#[test]
fn test_inheritable_style_comes_from_nearest_group() {
    let mut diagram = Diagram::new();
    let root = diagram.root();
    let outer = diagram
        .add_group(
            root,
            Group::new("outer").with_style(
                StyleSet::new()
                    .with_font_color(color("red"))
                    .with_fill_color(color("white")),
            ),
        )
        .unwrap();
    let inner = diagram
        .add_group(
            outer,
            Group::new("inner").with_style(StyleSet::new().with_font_color(color("blue"))),
        )
        .unwrap();
    diagram.add_node(inner, Node::new("nested")).unwrap();
    diagram.add_node(outer, Node::new("direct")).unwrap();
    diagram.add_node(root, Node::new("plain")).unwrap();

    let dot = serialize(&diagram).unwrap();
    let line = |label: &str| {
        dot.lines()
            .find(|line| line.contains(&format!("[label=\"{label}\"")))
            .unwrap()
            .to_string()
    };

    assert!(line("nested").contains("fontcolor=\"#0000ff\""));
    assert!(line("direct").contains("fontcolor=\"#ff0000\""));
    // Engine default when no ancestor sets the key.
    assert!(line("plain").contains("fontcolor=\"#2d3436\""));
    // Fill color is not inherited by nodes.
    assert!(!line("direct").contains("fillcolor"));
}

#[test]
fn test_cluster_fill_cycles_by_depth() {
    let mut diagram = Diagram::new();
    let mut parent = diagram.root();
    for depth in 0..5 {
        parent = diagram
            .add_group(parent, Group::new(format!("level {depth}")))
            .unwrap();
    }

    let dot = serialize(&diagram).unwrap();
    let fills: Vec<&str> = dot
        .lines()
        .filter(|line| line.contains("labeljust=l"))
        .map(|line| {
            let start = line.find("bgcolor=\"").unwrap() + "bgcolor=\"".len();
            &line[start..start + 7]
        })
        .collect();

    assert_eq!(
        fills,
        vec!["#e5f5fd", "#ebf3e7", "#ece8f6", "#fdf7e3", "#e5f5fd"]
    );
}

#[test]
fn test_explicit_fill_overrides_palette() {
    let mut diagram = Diagram::new();
    let root = diagram.root();
    diagram
        .add_group(
            root,
            Group::new("VPC").with_style(StyleSet::new().with_fill_color(color("lightblue"))),
        )
        .unwrap();

    let dot = serialize(&diagram).unwrap();
    assert!(dot.contains("bgcolor=\"#add8e6\""));
}

#[test]
fn test_diagram_layout_overrides_config() {
    let diagram = Diagram::new().with_layout(LayoutSettings {
        direction: Some(RankDirection::LeftToRight),
        rank_sep: Some(1.5),
        ..LayoutSettings::default()
    });

    let dot = serialize(&diagram).unwrap();
    assert!(dot.contains("rankdir=LR"));
    assert!(dot.contains("ranksep=1.5"));
    assert!(dot.contains("splines=ortho"));
}

#[test]
fn test_edge_style_default_applies_to_edges() {
    let mut diagram =
        Diagram::new().with_edge_style(StyleSet::new().with_font_size(16.0).unwrap());
    let root = diagram.root();
    let a = diagram.add_node(root, Node::new("a")).unwrap();
    let b = diagram.add_node(root, Node::new("b")).unwrap();
    diagram.connect(Edge::new(a, b).with_label("calls"));

    let dot = serialize(&diagram).unwrap();
    let edge = dot.lines().find(|line| line.contains("->")).unwrap();
    assert!(edge.contains("label=\"calls\""));
    assert!(edge.contains("fontsize=16"));
    assert!(edge.contains("color=\"#7b8894\""));
}

/// A construction plan: each element names the index of an earlier group
/// (or the root) as its parent.
#[derive(Debug, Clone)]
struct Plan {
    elements: Vec<(bool, usize, String)>,
    edges: Vec<(usize, usize, bool)>,
}

fn plan_strategy() -> impl Strategy<Value = Plan> {
    (
        prop::collection::vec((any::<bool>(), any::<usize>(), "[A-Za-z ]{1,10}"), 1..24),
        prop::collection::vec((any::<usize>(), any::<usize>(), any::<bool>()), 0..16),
    )
        .prop_map(|(elements, edges)| Plan { elements, edges })
}

fn build(plan: &Plan) -> Diagram {
    let mut diagram = Diagram::new().with_title("generated");
    let mut groups = vec![diagram.root()];
    let mut all = Vec::new();

    for (is_group, parent, label) in &plan.elements {
        let parent = groups[parent % groups.len()];
        let id = if *is_group {
            let id = diagram.add_group(parent, Group::new(label.as_str())).unwrap();
            groups.push(id);
            id
        } else {
            diagram.add_node(parent, Node::new(label.as_str())).unwrap()
        };
        all.push(id);
    }

    for (source, target, dashed) in &plan.edges {
        let mut edge = Edge::new(all[source % all.len()], all[target % all.len()]);
        if *dashed {
            edge = edge.with_style(StyleSet::new().with_pattern(LinePattern::Dashed));
        }
        diagram.connect(edge);
    }
    diagram
}

proptest! {
    #[test]
    fn serialization_is_deterministic(plan in plan_strategy()) {
        let first = serialize(&build(&plan)).unwrap();
        let second = serialize(&build(&plan)).unwrap();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn every_edge_is_emitted_once(plan in plan_strategy()) {
        let dot = serialize(&build(&plan)).unwrap();
        let edges = dot.lines().filter(|line| line.contains(" -> ")).count();
        prop_assert_eq!(edges, plan.edges.len());
    }
}
