//! Integration tests for the DiagramRenderer API
//!
//! These tests build diagrams through the public API and check the DOT text
//! the renderer produces.

use std::path::PathBuf;

use arbor::{
    ArborError, DiagramRenderer,
    assets::AssetResolver,
    config::AppConfig,
    declaration::DiagramDeclaration,
    model::{Diagram, Edge, EdgeDirection, Group, Node},
    style::{LinePattern, StyleSet},
};

/// Resolves every icon into a fixed directory without touching the disk.
struct PrefixResolver;

impl AssetResolver for PrefixResolver {
    fn resolve(&self, icon_ref: &str) -> Result<PathBuf, ArborError> {
        Ok(PathBuf::from("/icons").join(format!("{icon_ref}.png")))
    }
}

#[test]
fn test_renderer_default() {
    let renderer = DiagramRenderer::default();
    assert_eq!(renderer.config().engine().program(), "dot");
}

#[test]
fn test_serialize_simple_diagram() {
    let mut diagram = Diagram::new().with_title("Web Service");
    let root = diagram.root();
    let users = diagram.add_node(root, Node::new("Users")).unwrap();
    let api = diagram.add_node(root, Node::new("API")).unwrap();
    diagram.connect(Edge::new(users, api).with_direction(EdgeDirection::Both));

    let dot = DiagramRenderer::default().serialize(&diagram).unwrap();

    assert!(dot.starts_with("digraph \"Web Service\" {"));
    assert!(dot.contains("n0 [label=\"Users\""));
    assert!(dot.contains("n1 [label=\"API\""));
    assert!(dot.contains("n0 -> n1 [dir=both"));
}

#[test]
fn test_custom_resolver_is_used() {
    let mut diagram = Diagram::new();
    let root = diagram.root();
    diagram
        .add_node(root, Node::new("Lambda").with_icon("aws/compute/lambda"))
        .unwrap();

    let dot = DiagramRenderer::default()
        .with_resolver(PrefixResolver)
        .serialize(&diagram)
        .unwrap();

    assert!(dot.contains("image=\"/icons/aws/compute/lambda.png\""));
}

#[test]
fn test_missing_icon_fails_serialization() {
    let dir = tempfile::tempdir().unwrap();
    let config: AppConfig = toml::from_str(&format!(
        "[assets]\nsearch_paths = [{:?}]\n",
        dir.path().display().to_string()
    ))
    .unwrap();

    let mut diagram = Diagram::new();
    let root = diagram.root();
    diagram
        .add_node(root, Node::new("Lambda").with_icon("aws/compute/lambda"))
        .unwrap();

    let err = DiagramRenderer::new(config).serialize(&diagram).unwrap_err();
    assert!(matches!(err, ArborError::AssetNotFound { .. }));
}

#[test]
fn test_declaration_matches_builder() {
    let declaration: DiagramDeclaration = toml::from_str(
        r#"
        title = "Pair"

        [[nodes]]
        key = "a"

        [[groups]]
        label = "G"

        [[groups.nodes]]
        key = "b"

        [[edges]]
        from = "a"
        to = "b"
        style = { pattern = "dashed" }
        "#,
    )
    .unwrap();
    let declared = declaration.build().unwrap();

    let mut built = Diagram::new().with_title("Pair");
    let root = built.root();
    let a = built.add_node(root, Node::new("a")).unwrap();
    let g = built.add_group(root, Group::new("G")).unwrap();
    let b = built.add_node(g, Node::new("b")).unwrap();
    built.connect(
        Edge::new(a, b).with_style(StyleSet::new().with_pattern(LinePattern::Dashed)),
    );

    let renderer = DiagramRenderer::default();
    assert_eq!(
        renderer.serialize(&declared).unwrap(),
        renderer.serialize(&built).unwrap()
    );
}
