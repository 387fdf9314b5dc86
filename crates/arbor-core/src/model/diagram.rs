//! The diagram aggregate and its containment rules.
//!
//! A [`Diagram`] owns every node and group in an arena keyed by [`Id`], plus
//! the ordered list of edges. Containment is recorded as a parent map next to
//! each group's ordered child list, which makes the two structural checks
//! cheap: an element has at most one parent, and no group can be attached
//! beneath itself.

use std::{collections::HashMap, fmt, str::FromStr};

use indexmap::IndexMap;
use log::{debug, trace};
use serde::Deserialize;
use thiserror::Error;

use crate::{
    identifier::Id,
    model::element::{Edge, Group, Node},
    style::StyleSet,
};

/// Errors raised when the containment tree would become invalid.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StructuralError {
    #[error("attaching {child} under {parent} would create a cycle")]
    Cycle { parent: String, child: String },

    #[error("{child} is already attached under {parent}")]
    AlreadyAttached { child: String, parent: String },

    #[error("the diagram root cannot be attached as a child")]
    RootNotAttachable,

    #[error("{id} is a node and cannot contain children")]
    NotAGroup { id: String },

    #[error("element {id} is not part of this diagram")]
    UnknownElement { id: String },

    #[error("element {id} is already registered in this diagram")]
    DuplicateId { id: String },

    #[error("{id} already has children; groups must be inserted empty")]
    NonEmptyGroup { id: String },
}

/// A node or group stored in the diagram arena.
#[derive(Debug, Clone, PartialEq)]
pub enum Element {
    Node(Node),
    Group(Group),
}

impl Element {
    pub fn id(&self) -> Id {
        match self {
            Self::Node(node) => node.id(),
            Self::Group(group) => group.id(),
        }
    }

    pub fn style(&self) -> &StyleSet {
        match self {
            Self::Node(node) => node.style(),
            Self::Group(group) => group.style(),
        }
    }

    pub fn as_group(&self) -> Option<&Group> {
        match self {
            Self::Group(group) => Some(group),
            Self::Node(_) => None,
        }
    }

    pub fn as_node(&self) -> Option<&Node> {
        match self {
            Self::Node(node) => Some(node),
            Self::Group(_) => None,
        }
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Node(node) => fmt::Display::fmt(node, f),
            Self::Group(group) => fmt::Display::fmt(group, f),
        }
    }
}

/// Direction in which ranks are laid out.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
pub enum RankDirection {
    /// Top to bottom (default)
    #[default]
    #[serde(rename = "TB", alias = "tb")]
    TopToBottom,
    #[serde(rename = "BT", alias = "bt")]
    BottomToTop,
    #[serde(rename = "LR", alias = "lr")]
    LeftToRight,
    #[serde(rename = "RL", alias = "rl")]
    RightToLeft,
}

impl RankDirection {
    /// Returns the Graphviz `rankdir` value.
    pub fn as_dot(self) -> &'static str {
        match self {
            Self::TopToBottom => "TB",
            Self::BottomToTop => "BT",
            Self::LeftToRight => "LR",
            Self::RightToLeft => "RL",
        }
    }
}

impl FromStr for RankDirection {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "TB" | "tb" => Ok(Self::TopToBottom),
            "BT" | "bt" => Ok(Self::BottomToTop),
            "LR" | "lr" => Ok(Self::LeftToRight),
            "RL" | "rl" => Ok(Self::RightToLeft),
            _ => Err("Unsupported direction, expected one of TB, BT, LR, RL"),
        }
    }
}

/// Edge routing style.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Splines {
    /// Axis-aligned segments (default)
    #[default]
    Ortho,
    Spline,
    Polyline,
    Curved,
    Line,
}

impl Splines {
    pub fn as_dot(self) -> &'static str {
        match self {
            Self::Ortho => "ortho",
            Self::Spline => "spline",
            Self::Polyline => "polyline",
            Self::Curved => "curved",
            Self::Line => "line",
        }
    }
}

/// Graph-wide layout settings.
///
/// Every field is optional; unset fields fall back to the renderer's
/// configured defaults.
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LayoutSettings {
    pub direction: Option<RankDirection>,
    /// Separation between ranks, in inches.
    pub rank_sep: Option<f32>,
    /// Separation between nodes of the same rank, in inches.
    pub node_sep: Option<f32>,
    pub splines: Option<Splines>,
    /// Padding around the drawing, in inches.
    pub pad: Option<f32>,
}

impl LayoutSettings {
    /// Overlays `other` on top of `self`; set fields in `other` win.
    pub fn overlay(self, other: LayoutSettings) -> LayoutSettings {
        LayoutSettings {
            direction: other.direction.or(self.direction),
            rank_sep: other.rank_sep.or(self.rank_sep),
            node_sep: other.node_sep.or(self.node_sep),
            splines: other.splines.or(self.splines),
            pad: other.pad.or(self.pad),
        }
    }
}

/// The root aggregate of a diagram.
///
/// # Examples
///
/// ```
/// use arbor_core::model::{Diagram, Edge, Group, Node};
///
/// let mut diagram = Diagram::new().with_title("Web Service");
/// let root = diagram.root();
///
/// let users = diagram.add_node(root, Node::new("Users")).unwrap();
/// let vpc = diagram.add_group(root, Group::new("VPC")).unwrap();
/// let api = diagram.add_node(vpc, Node::new("API")).unwrap();
///
/// diagram.connect(Edge::new(users, api));
/// assert_eq!(diagram.edges().len(), 1);
/// assert_eq!(diagram.parent(api), Some(vpc));
/// ```
#[derive(Debug, Clone)]
pub struct Diagram {
    title: Option<String>,
    root: Id,
    elements: IndexMap<Id, Element>,
    parents: HashMap<Id, Id>,
    edges: Vec<Edge>,
    edge_style: StyleSet,
    layout: LayoutSettings,
}

impl Default for Diagram {
    fn default() -> Self {
        Self::new()
    }
}

impl Diagram {
    /// Creates an empty diagram with an unlabeled root group.
    pub fn new() -> Self {
        let root = Group::unlabeled();
        let root_id = root.id();
        let mut elements = IndexMap::new();
        elements.insert(root_id, Element::Group(root));

        Self {
            title: None,
            root: root_id,
            elements,
            parents: HashMap::new(),
            edges: Vec::new(),
            edge_style: StyleSet::new(),
            layout: LayoutSettings::default(),
        }
    }

    /// Sets the title drawn as the diagram label.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Sets the style of the root group, inherited by every element.
    pub fn with_root_style(mut self, style: StyleSet) -> Self {
        if let Some(Element::Group(root)) = self.elements.get_mut(&self.root) {
            root.set_style(style);
        }
        self
    }

    /// Sets the default style every edge resolves against.
    pub fn with_edge_style(mut self, style: StyleSet) -> Self {
        self.edge_style = style;
        self
    }

    pub fn with_layout(mut self, layout: LayoutSettings) -> Self {
        self.layout = layout;
        self
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    /// Id of the root group.
    pub fn root(&self) -> Id {
        self.root
    }

    /// The root group.
    pub fn root_group(&self) -> &Group {
        self.group(self.root)
            .expect("the root group is created with the diagram and never removed")
    }

    pub fn edge_style(&self) -> &StyleSet {
        &self.edge_style
    }

    pub fn layout(&self) -> LayoutSettings {
        self.layout
    }

    /// Registers a detached node. Attach it with [`Diagram::attach`].
    ///
    /// # Errors
    ///
    /// Returns [`StructuralError::DuplicateId`] if the node is already registered.
    pub fn insert_node(&mut self, node: Node) -> Result<Id, StructuralError> {
        self.insert(Element::Node(node))
    }

    /// Registers a detached, empty group. Attach it with [`Diagram::attach`].
    ///
    /// # Errors
    ///
    /// Returns [`StructuralError::DuplicateId`] if the group is already
    /// registered, or [`StructuralError::NonEmptyGroup`] if it carries children.
    pub fn insert_group(&mut self, group: Group) -> Result<Id, StructuralError> {
        if !group.children().is_empty() {
            return Err(StructuralError::NonEmptyGroup {
                id: group.to_string(),
            });
        }
        self.insert(Element::Group(group))
    }

    /// Inserts `node` and attaches it under `parent`.
    ///
    /// Nothing is registered if attaching fails.
    ///
    /// # Errors
    ///
    /// See [`Diagram::insert_node`] and [`Diagram::attach`].
    pub fn add_node(&mut self, parent: Id, node: Node) -> Result<Id, StructuralError> {
        let id = self.insert_node(node)?;
        self.attach_or_discard(parent, id)
    }

    /// Inserts `group` and attaches it under `parent`.
    ///
    /// Nothing is registered if attaching fails.
    ///
    /// # Errors
    ///
    /// See [`Diagram::insert_group`] and [`Diagram::attach`].
    pub fn add_group(&mut self, parent: Id, group: Group) -> Result<Id, StructuralError> {
        let id = self.insert_group(group)?;
        self.attach_or_discard(parent, id)
    }

    /// Appends `child` to the ordered children of `parent`.
    ///
    /// # Errors
    ///
    /// - [`StructuralError::UnknownElement`] if either id is not registered
    /// - [`StructuralError::NotAGroup`] if `parent` is a node
    /// - [`StructuralError::RootNotAttachable`] if `child` is the root
    /// - [`StructuralError::AlreadyAttached`] if `child` already has a parent
    /// - [`StructuralError::Cycle`] if `child` is `parent` or one of its ancestors
    pub fn attach(&mut self, parent: Id, child: Id) -> Result<(), StructuralError> {
        let parent_element = self.element_or_err(parent)?;
        let child_element = self.element_or_err(child)?;

        if parent_element.as_group().is_none() {
            return Err(StructuralError::NotAGroup {
                id: parent_element.to_string(),
            });
        }
        if child == self.root {
            return Err(StructuralError::RootNotAttachable);
        }
        if let Some(current) = self.parents.get(&child) {
            return Err(StructuralError::AlreadyAttached {
                child: child_element.to_string(),
                parent: self.describe(*current),
            });
        }
        if child == parent || self.ancestors(parent).any(|ancestor| ancestor == child) {
            return Err(StructuralError::Cycle {
                parent: parent_element.to_string(),
                child: child_element.to_string(),
            });
        }

        trace!(parent = parent.short(), child = child.short(); "Attaching element");
        self.parents.insert(child, parent);
        if let Some(Element::Group(group)) = self.elements.get_mut(&parent) {
            group.push_child(child);
        }
        Ok(())
    }

    /// Appends an edge and returns its id.
    ///
    /// Endpoints are validated during serialization, so edges may be declared
    /// before the elements they connect.
    pub fn connect(&mut self, edge: Edge) -> Id {
        let id = edge.id();
        debug!(
            edge = id.short(),
            source = edge.source().short(),
            target = edge.target().short();
            "Adding edge"
        );
        self.edges.push(edge);
        id
    }

    /// Edges in declaration order.
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn element(&self, id: Id) -> Option<&Element> {
        self.elements.get(&id)
    }

    pub fn node(&self, id: Id) -> Option<&Node> {
        self.element(id).and_then(Element::as_node)
    }

    pub fn group(&self, id: Id) -> Option<&Group> {
        self.element(id).and_then(Element::as_group)
    }

    /// Number of registered nodes and groups, including the root.
    pub fn elements_count(&self) -> usize {
        self.elements.len()
    }

    pub fn parent(&self, id: Id) -> Option<Id> {
        self.parents.get(&id).copied()
    }

    /// Iterates over the enclosing groups of `id`, nearest first.
    pub fn ancestors(&self, id: Id) -> impl Iterator<Item = Id> + '_ {
        let mut current = id;
        std::iter::from_fn(move || {
            let parent = self.parents.get(&current).copied()?;
            current = parent;
            Some(parent)
        })
    }

    /// Returns true if `id` is the root or one of its transitive descendants.
    pub fn is_in_tree(&self, id: Id) -> bool {
        id == self.root || self.ancestors(id).any(|ancestor| ancestor == self.root)
    }

    fn insert(&mut self, element: Element) -> Result<Id, StructuralError> {
        let id = element.id();
        if self.elements.contains_key(&id) {
            return Err(StructuralError::DuplicateId {
                id: element.to_string(),
            });
        }
        trace!(element = element.to_string(); "Registering element");
        self.elements.insert(id, element);
        Ok(id)
    }

    fn attach_or_discard(&mut self, parent: Id, id: Id) -> Result<Id, StructuralError> {
        if let Err(err) = self.attach(parent, id) {
            self.elements.shift_remove(&id);
            return Err(err);
        }
        Ok(id)
    }

    fn element_or_err(&self, id: Id) -> Result<&Element, StructuralError> {
        self.elements
            .get(&id)
            .ok_or_else(|| StructuralError::UnknownElement { id: id.short() })
    }

    fn describe(&self, id: Id) -> String {
        self.elements
            .get(&id)
            .map(ToString::to_string)
            .unwrap_or_else(|| id.short())
    }
}
