//! Declarative diagram descriptions.
//!
//! A [`DiagramDeclaration`] is the serde form of a diagram: nested groups and
//! nodes addressed by local keys, plus edges that refer to those keys. It is
//! what the command line front end reads from TOML.
//!
//! ```toml
//! title = "Web Service"
//!
//! [layout]
//! direction = "LR"
//!
//! [[nodes]]
//! key = "users"
//! label = "Users"
//!
//! [[groups]]
//! key = "vpc"
//! label = "VPC"
//! style = { fill_color = "lightblue" }
//!
//! [[groups.nodes]]
//! key = "api"
//! label = "API Gateway"
//! icon = "aws/network/api-gateway"
//!
//! [[edges]]
//! from = "users"
//! to = "api"
//! ```
//!
//! [`DiagramDeclaration::build`] produces the same [`Diagram`] as the
//! equivalent builder calls: children keep declaration order and edges are
//! connected in the order they are listed.

use std::collections::HashMap;

use log::debug;
use serde::Deserialize;

use arbor_core::{
    identifier::Id,
    model::{Diagram, Edge, EdgeDirection, Group, LayoutSettings, Node},
    style::StyleSet,
};

use crate::ArborError;

/// Top-level declaration of a diagram.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DiagramDeclaration {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub layout: LayoutSettings,
    /// Style of the root group, inherited by every element.
    #[serde(default)]
    pub style: StyleSet,
    /// Default style every edge resolves against.
    #[serde(default)]
    pub edge_style: StyleSet,
    #[serde(default)]
    pub nodes: Vec<NodeDeclaration>,
    #[serde(default)]
    pub groups: Vec<GroupDeclaration>,
    #[serde(default)]
    pub edges: Vec<EdgeDeclaration>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NodeDeclaration {
    /// Local key used by edges. Also the label when no label is given.
    pub key: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub style: StyleSet,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GroupDeclaration {
    /// Local key, only needed when edges point at the group itself.
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub style: StyleSet,
    #[serde(default)]
    pub nodes: Vec<NodeDeclaration>,
    #[serde(default)]
    pub groups: Vec<GroupDeclaration>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EdgeDeclaration {
    pub from: String,
    pub to: String,
    #[serde(default)]
    pub direction: EdgeDirection,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub style: StyleSet,
}

impl DiagramDeclaration {
    /// Builds the diagram described by this declaration.
    ///
    /// # Errors
    ///
    /// Returns [`ArborError::Declaration`] when a key is declared twice or an
    /// edge refers to an undeclared key.
    pub fn build(&self) -> Result<Diagram, ArborError> {
        let mut diagram = Diagram::new()
            .with_layout(self.layout)
            .with_root_style(self.style.clone())
            .with_edge_style(self.edge_style.clone());
        if let Some(title) = &self.title {
            diagram = diagram.with_title(title.clone());
        }

        let mut keys = HashMap::new();
        let root = diagram.root();
        add_members(&mut diagram, &mut keys, root, &self.nodes, &self.groups)?;

        for (index, edge) in self.edges.iter().enumerate() {
            let source = lookup(&keys, index, &edge.from)?;
            let target = lookup(&keys, index, &edge.to)?;
            let mut built = Edge::new(source, target)
                .with_direction(edge.direction)
                .with_style(edge.style.clone());
            if let Some(label) = &edge.label {
                built = built.with_label(label.clone());
            }
            diagram.connect(built);
        }

        debug!(
            keys = keys.len(),
            edges = self.edges.len();
            "Built diagram from declaration"
        );
        Ok(diagram)
    }
}

fn add_members(
    diagram: &mut Diagram,
    keys: &mut HashMap<String, Id>,
    parent: Id,
    nodes: &[NodeDeclaration],
    groups: &[GroupDeclaration],
) -> Result<(), ArborError> {
    for node in nodes {
        let label = node.label.as_deref().unwrap_or(&node.key);
        let mut built = Node::new(label).with_style(node.style.clone());
        if let Some(icon) = &node.icon {
            built = built.with_icon(icon.clone());
        }
        let id = diagram.add_node(parent, built)?;
        register(keys, &node.key, id)?;
    }

    for group in groups {
        let built = match &group.label {
            Some(label) => Group::new(label.clone()),
            None => Group::unlabeled(),
        }
        .with_style(group.style.clone());
        let id = diagram.add_group(parent, built)?;
        if let Some(key) = &group.key {
            register(keys, key, id)?;
        }
        add_members(diagram, keys, id, &group.nodes, &group.groups)?;
    }
    Ok(())
}

fn register(keys: &mut HashMap<String, Id>, key: &str, id: Id) -> Result<(), ArborError> {
    if keys.insert(key.to_string(), id).is_some() {
        return Err(ArborError::Declaration(format!(
            "key `{key}` is declared more than once"
        )));
    }
    Ok(())
}

fn lookup(keys: &HashMap<String, Id>, edge: usize, key: &str) -> Result<Id, ArborError> {
    keys.get(key).copied().ok_or_else(|| {
        ArborError::Declaration(format!("edge #{} refers to unknown key `{key}`", edge + 1))
    })
}
