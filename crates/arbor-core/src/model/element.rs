//! Diagram element types: nodes, groups and edges.

use std::{fmt, str::FromStr};

use serde::Deserialize;

use crate::{identifier::Id, style::StyleSet};

/// A leaf vertex of the diagram.
///
/// Nodes are immutable once built. An enclosing group only affects a node
/// through style inheritance when the diagram is serialized.
///
/// # Examples
///
/// ```
/// use arbor_core::model::Node;
/// use arbor_core::style::{LinePattern, StyleSet};
///
/// let lambda = Node::new("Game Logic\nLambda")
///     .with_icon("aws/compute/lambda")
///     .with_style(StyleSet::new().with_pattern(LinePattern::Bold));
/// assert_eq!(lambda.icon(), Some("aws/compute/lambda"));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    id: Id,
    label: String,
    icon: Option<String>,
    style: StyleSet,
}

impl Node {
    /// Creates a node with a fresh identifier.
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            id: Id::generate(),
            label: label.into(),
            icon: None,
            style: StyleSet::new(),
        }
    }

    /// Sets the icon reference passed to the asset resolver.
    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    pub fn with_style(mut self, style: StyleSet) -> Self {
        self.style = style;
        self
    }

    pub fn id(&self) -> Id {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn icon(&self) -> Option<&str> {
        self.icon.as_deref()
    }

    pub fn style(&self) -> &StyleSet {
        &self.style
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node `{}` ({})", self.label, self.id.short())
    }
}

/// A named container rendered as a bounding region around its children.
///
/// Children are kept in insertion order. They can only be added through
/// [`Diagram::attach`](crate::model::Diagram::attach) and its helpers, which
/// enforce the single-parent and acyclicity rules.
#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    id: Id,
    label: Option<String>,
    style: StyleSet,
    children: Vec<Id>,
}

impl Group {
    /// Creates a labeled group with a fresh identifier.
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: Some(label.into()),
            ..Self::unlabeled()
        }
    }

    /// Creates a group without a label.
    pub fn unlabeled() -> Self {
        Self {
            id: Id::generate(),
            label: None,
            style: StyleSet::new(),
            children: Vec::new(),
        }
    }

    pub fn with_style(mut self, style: StyleSet) -> Self {
        self.style = style;
        self
    }

    pub fn id(&self) -> Id {
        self.id
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn style(&self) -> &StyleSet {
        &self.style
    }

    /// Direct children in insertion order.
    pub fn children(&self) -> &[Id] {
        &self.children
    }

    pub(crate) fn push_child(&mut self, child: Id) {
        self.children.push(child);
    }

    pub(crate) fn set_style(&mut self, style: StyleSet) {
        self.style = style;
    }
}

impl fmt::Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.label {
            Some(label) => write!(f, "group `{}` ({})", label, self.id.short()),
            None => write!(f, "group ({})", self.id.short()),
        }
    }
}

/// Arrowhead placement of an edge.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeDirection {
    /// Arrow at the target (default)
    #[default]
    Forward,
    /// Arrow at the source
    Reverse,
    /// Arrows at both ends
    Both,
    /// No arrowheads
    None,
}

impl EdgeDirection {
    /// Returns the Graphviz `dir` value.
    pub fn as_dot(self) -> &'static str {
        match self {
            Self::Forward => "forward",
            Self::Reverse => "back",
            Self::Both => "both",
            Self::None => "none",
        }
    }
}

impl FromStr for EdgeDirection {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "forward" | "->" => Ok(Self::Forward),
            "reverse" | "back" | "<-" => Ok(Self::Reverse),
            "both" | "<->" => Ok(Self::Both),
            "none" | "-" => Ok(Self::None),
            _ => Err("Invalid edge direction"),
        }
    }
}

/// A styled relation between two nodes or groups.
///
/// Endpoints are not checked when the edge is built; the diagram verifies
/// them when it is serialized. Any number of edges may connect the same
/// pair of elements and each is kept distinct.
#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    id: Id,
    source: Id,
    target: Id,
    style: StyleSet,
    direction: EdgeDirection,
}

impl Edge {
    /// Creates a forward edge from `source` to `target`.
    pub fn new(source: Id, target: Id) -> Self {
        Self {
            id: Id::generate(),
            source,
            target,
            style: StyleSet::new(),
            direction: EdgeDirection::Forward,
        }
    }

    pub fn with_direction(mut self, direction: EdgeDirection) -> Self {
        self.direction = direction;
        self
    }

    pub fn with_style(mut self, style: StyleSet) -> Self {
        self.style = style;
        self
    }

    /// Sets the edge label, keeping the rest of the style.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.style = self.style.with_label(label);
        self
    }

    pub fn id(&self) -> Id {
        self.id
    }

    pub fn source(&self) -> Id {
        self.source
    }

    pub fn target(&self) -> Id {
        self.target
    }

    pub fn style(&self) -> &StyleSet {
        &self.style
    }

    pub fn direction(&self) -> EdgeDirection {
        self.direction
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::{LinePattern, StyleKey, StyleValue};

    #[test]
    fn test_node_builder() {
        let node = Node::new("API Gateway")
            .with_icon("aws/network/api-gateway")
            .with_style(StyleSet::new().with_pattern(LinePattern::Dotted));

        assert_eq!(node.label(), "API Gateway");
        assert_eq!(node.icon(), Some("aws/network/api-gateway"));
        assert!(node.style().contains(StyleKey::LinePattern));
    }

    #[test]
    fn test_each_element_gets_own_id() {
        let a = Node::new("a");
        let b = Node::new("a");
        let g = Group::new("g");
        let e = Edge::new(a.id(), b.id());

        assert_ne!(a.id(), b.id());
        assert_ne!(g.id(), a.id());
        assert_ne!(e.id(), a.id());
    }

    #[test]
    fn test_group_labels() {
        assert_eq!(Group::new("VPC").label(), Some("VPC"));
        assert_eq!(Group::unlabeled().label(), None);
        assert!(Group::new("VPC").children().is_empty());
    }

    #[test]
    fn test_edge_defaults_to_forward() {
        let edge = Edge::new(Id::generate(), Id::generate());
        assert_eq!(edge.direction(), EdgeDirection::Forward);
        assert!(edge.style().is_empty());
    }

    #[test]
    fn test_edge_label_keeps_style() {
        let edge = Edge::new(Id::generate(), Id::generate())
            .with_style(StyleSet::new().with_pattern(LinePattern::Dashed))
            .with_label("response");

        assert_eq!(
            edge.style().get(StyleKey::LinePattern),
            Some(&StyleValue::Pattern(LinePattern::Dashed))
        );
        assert_eq!(
            edge.style().get(StyleKey::Label),
            Some(&StyleValue::Text("response".to_string()))
        );
    }

    #[test]
    fn test_edge_direction_from_str() {
        assert_eq!("forward".parse(), Ok(EdgeDirection::Forward));
        assert_eq!("<-".parse(), Ok(EdgeDirection::Reverse));
        assert_eq!("both".parse(), Ok(EdgeDirection::Both));
        assert_eq!("none".parse(), Ok(EdgeDirection::None));
        assert!("sideways".parse::<EdgeDirection>().is_err());
    }

    #[test]
    fn test_edge_direction_dot_values() {
        assert_eq!(EdgeDirection::Forward.as_dot(), "forward");
        assert_eq!(EdgeDirection::Reverse.as_dot(), "back");
        assert_eq!(EdgeDirection::Both.as_dot(), "both");
        assert_eq!(EdgeDirection::None.as_dot(), "none");
    }
}
