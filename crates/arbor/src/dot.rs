//! Graphviz DOT serialization.
//!
//! [`serialize`] turns a [`Diagram`] into DOT text in three steps:
//!
//! 1. Every element reachable from the root gets a name in traversal order:
//!    `n0, n1, ...` for nodes and `cluster_0, cluster_1, ...` for groups.
//!    Random ids never leak into the output, so the same construction code
//!    always produces the same text.
//! 2. Every edge endpoint is looked up. An endpoint outside the tree aborts
//!    with [`ArborError::DanglingReference`] before anything is written.
//! 3. The tree is written depth first (direct nodes, then nested groups) and
//!    followed by the edges in declaration order. Each statement carries
//!    fully resolved attributes in a fixed order; no `node [...]` or
//!    `edge [...]` default statements are emitted.
//!
//! Edges that touch a group are anchored on the first node of the group's
//! subtree and clipped to the cluster border with `lhead`/`ltail`. A group
//! whose subtree holds no node gets an invisible point to anchor on.

mod writer;

use std::{collections::HashMap, fmt};

use log::{debug, info, trace, warn};

use arbor_core::{
    color::Color,
    identifier::Id,
    model::{Diagram, Edge, Element, Group, LayoutSettings, Node},
    style::{LabelPosition, StyleKey, StyleSet, StyleValue},
};

use crate::{ArborError, assets::AssetResolver, config::AppConfig};

use writer::{AttrList, DotWriter, escape};

/// Width and height of a plain node, in inches.
const NODE_SIZE: f32 = 1.4;
/// Height of an icon node with a single-line label, in inches.
const ICON_NODE_HEIGHT: f32 = 1.9;
/// Extra height per additional label line on icon nodes.
const LABEL_LINE_HEIGHT: f32 = 0.4;

const ROOT_ANCHOR: &str = "root_anchor";

/// Serializes `diagram` to DOT text.
///
/// Icons are resolved through `resolver`; engine defaults come from `config`.
///
/// # Errors
///
/// - [`ArborError::DanglingReference`] if an edge endpoint is not in the tree
/// - [`ArborError::AssetNotFound`] if a node icon cannot be resolved
/// - [`ArborError::Config`] if the configured cluster palette is invalid
///
/// No text is returned unless the whole diagram serialized.
pub fn serialize(
    diagram: &Diagram,
    config: &AppConfig,
    resolver: &dyn AssetResolver,
) -> Result<String, ArborError> {
    Serializer::new(diagram, config, resolver)?.run()
}

/// Where an edge attaches in the DOT graph.
#[derive(Debug, Clone)]
struct Endpoint {
    /// Node statement the edge is drawn to.
    node: String,
    /// Cluster the edge is clipped to, if the endpoint is a group.
    cluster: Option<String>,
}

struct Serializer<'a> {
    diagram: &'a Diagram,
    config: &'a AppConfig,
    resolver: &'a dyn AssetResolver,
    names: HashMap<Id, String>,
    depths: HashMap<Id, usize>,
    /// Groups that need an invisible anchor, with the anchor's name.
    anchors: HashMap<Id, String>,
    palette: Vec<Color>,
    node_defaults: StyleSet,
    cluster_defaults: StyleSet,
    edge_defaults: StyleSet,
}

impl<'a> Serializer<'a> {
    fn new(
        diagram: &'a Diagram,
        config: &'a AppConfig,
        resolver: &'a dyn AssetResolver,
    ) -> Result<Self, ArborError> {
        let style = config.style();
        let palette = style.cluster_palette().map_err(ArborError::Config)?;

        Ok(Self {
            diagram,
            config,
            resolver,
            names: HashMap::new(),
            depths: HashMap::new(),
            anchors: HashMap::new(),
            palette,
            node_defaults: style.node(),
            cluster_defaults: style.cluster(),
            edge_defaults: style.edge(),
        })
    }

    fn run(mut self) -> Result<String, ArborError> {
        let diagram = self.diagram;
        let mut counters = (0, 0);
        self.assign_names(diagram.root_group(), 0, &mut counters);
        let (nodes, clusters) = counters;
        debug!(nodes, clusters; "Assigned element names");

        let endpoints = diagram
            .edges()
            .iter()
            .map(|edge| {
                let source = self.endpoint(edge, edge.source())?;
                let target = self.endpoint(edge, edge.target())?;
                Ok((edge, source, target))
            })
            .collect::<Result<Vec<_>, ArborError>>()?;

        let compound = endpoints
            .iter()
            .any(|(_, source, target)| source.cluster.is_some() || target.cluster.is_some());

        let mut writer = DotWriter::new();
        match diagram.title() {
            Some(title) => writer.open(&format!("digraph \"{}\"", escape(title))),
            None => writer.open("digraph"),
        }
        writer.graph_attrs(&self.graph_attrs(compound));

        let root = diagram.root_group();
        self.write_contents(&mut writer, root)?;
        if let Some(anchor) = self.anchors.get(&root.id()) {
            writer.node(anchor, &anchor_attrs());
        }

        for (edge, source, target) in &endpoints {
            writer.edge(&source.node, &target.node, &self.edge_attrs(edge, source, target));
        }
        writer.close();

        info!(nodes, clusters, edges = endpoints.len(); "Diagram serialized");
        Ok(writer.finish())
    }

    /// Names the children of `group` in the order they are written.
    fn assign_names(&mut self, group: &'a Group, depth: usize, counters: &mut (usize, usize)) {
        let diagram = self.diagram;
        for child in group.children() {
            if diagram.node(*child).is_some() {
                self.names.insert(*child, format!("n{}", counters.0));
                counters.0 += 1;
            }
        }
        for child in group.children() {
            if let Some(nested) = diagram.group(*child) {
                self.names.insert(*child, format!("cluster_{}", counters.1));
                self.depths.insert(*child, depth + 1);
                counters.1 += 1;
                self.assign_names(nested, depth + 1, counters);
            }
        }
    }

    fn endpoint(&mut self, edge: &Edge, id: Id) -> Result<Endpoint, ArborError> {
        let diagram = self.diagram;
        if id == diagram.root() {
            let node = self.anchor_for(diagram.root_group(), ROOT_ANCHOR.to_string());
            return Ok(Endpoint {
                node,
                cluster: None,
            });
        }

        let Some(name) = self.names.get(&id).cloned() else {
            return Err(ArborError::DanglingReference {
                edge: edge.id().to_string(),
                missing: id.to_string(),
            });
        };

        match diagram.element(id) {
            Some(Element::Group(group)) => {
                let node = self.anchor_for(group, format!("{name}_anchor"));
                Ok(Endpoint {
                    node,
                    cluster: Some(name),
                })
            }
            _ => Ok(Endpoint {
                node: name,
                cluster: None,
            }),
        }
    }

    /// Returns the first node in the subtree of `group`, or registers an
    /// invisible anchor named `fallback` inside it.
    fn anchor_for(&mut self, group: &Group, fallback: String) -> String {
        if let Some(first) = self.first_node(group) {
            if let Some(name) = self.names.get(&first) {
                return name.clone();
            }
        }
        self.anchors.entry(group.id()).or_insert(fallback).clone()
    }

    fn first_node(&self, group: &Group) -> Option<Id> {
        let diagram = self.diagram;
        group
            .children()
            .iter()
            .copied()
            .find(|child| diagram.node(*child).is_some())
            .or_else(|| {
                group
                    .children()
                    .iter()
                    .filter_map(|child| diagram.group(*child))
                    .find_map(|nested| self.first_node(nested))
            })
    }

    fn write_contents(&self, writer: &mut DotWriter, group: &Group) -> Result<(), ArborError> {
        let diagram = self.diagram;
        for child in group.children() {
            if let Some(node) = diagram.node(*child) {
                let name = self.name(node.id());
                trace!(name, node = node.to_string(); "Writing node");
                writer.node(name, &self.node_attrs(node)?);
            }
        }
        for child in group.children() {
            if let Some(nested) = diagram.group(*child) {
                let name = self.name(nested.id());
                writer.open(&format!("subgraph {name}"));
                writer.graph_attrs(&self.cluster_attrs(nested));
                self.write_contents(writer, nested)?;
                if let Some(anchor) = self.anchors.get(&nested.id()) {
                    writer.node(anchor, &anchor_attrs());
                }
                writer.close();
            }
        }
        Ok(())
    }

    fn name(&self, id: Id) -> &str {
        self.names.get(&id).map(String::as_str).unwrap_or_default()
    }

    /// Styles of the groups enclosing `id`, nearest first.
    fn ancestor_styles(&self, id: Id) -> Vec<&'a StyleSet> {
        let diagram = self.diagram;
        diagram
            .ancestors(id)
            .filter_map(|ancestor| diagram.element(ancestor))
            .map(Element::style)
            .collect()
    }

    fn graph_attrs(&self, compound: bool) -> AttrList {
        let root = self.diagram.root_group();
        let style = StyleSet::merge(&self.config.style().graph(), root.style());
        warn_not_applicable(root, root.style(), &[StyleKey::Weight, StyleKey::Rank]);

        let mut attrs = AttrList::new();
        let title = self.diagram.title().or_else(|| text(&style, StyleKey::Label));
        if let Some(title) = title {
            attrs.quoted("label", title);
        }
        attrs.quoted("fontname", self.config.style().font_name());
        set_number(&mut attrs, "fontsize", &style, StyleKey::FontSize);
        set_color(&mut attrs, "fontcolor", &style, StyleKey::FontColor);
        set_color(&mut attrs, "bgcolor", &style, StyleKey::FillColor);
        set_labelloc(&mut attrs, root, &style);

        let layout: LayoutSettings = self.config.layout().overlay(self.diagram.layout());
        if let Some(direction) = layout.direction {
            attrs.raw("rankdir", direction.as_dot());
        }
        if let Some(rank_sep) = layout.rank_sep {
            attrs.raw("ranksep", number(rank_sep));
        }
        if let Some(node_sep) = layout.node_sep {
            attrs.raw("nodesep", number(node_sep));
        }
        if let Some(splines) = layout.splines {
            attrs.raw("splines", splines.as_dot());
        }
        if let Some(pad) = layout.pad {
            attrs.raw("pad", number(pad));
        }
        if compound {
            attrs.raw("compound", "true");
        }
        attrs
    }

    fn cluster_attrs(&self, group: &Group) -> AttrList {
        let own = group.style();
        let style = StyleSet::merge(
            &self.cluster_defaults,
            &own.resolve(&self.ancestor_styles(group.id())),
        );
        warn_not_applicable(group, own, &[StyleKey::Weight]);

        let mut attrs = AttrList::new();
        if let Some(label) = text(&style, StyleKey::Label).or(group.label()) {
            attrs.quoted("label", label);
        }
        attrs.raw("labeljust", "l");
        let mut line_style = vec!["rounded"];
        if let Some(StyleValue::Pattern(pattern)) = style.get(StyleKey::LinePattern) {
            line_style.push(pattern.as_dot());
        }
        attrs.quoted("style", line_style.join(","));
        set_color(&mut attrs, "pencolor", &style, StyleKey::Color);

        match style.get(StyleKey::FillColor) {
            Some(StyleValue::Color(fill)) => {
                attrs.quoted("bgcolor", fill.to_hex());
            }
            _ => {
                let depth = self.depths.get(&group.id()).copied().unwrap_or(1);
                if !self.palette.is_empty() {
                    let fill = &self.palette[(depth.max(1) - 1) % self.palette.len()];
                    attrs.quoted("bgcolor", fill.to_hex());
                }
            }
        }

        attrs.quoted("fontname", self.config.style().font_name());
        set_number(&mut attrs, "fontsize", &style, StyleKey::FontSize);
        set_color(&mut attrs, "fontcolor", &style, StyleKey::FontColor);
        set_number(&mut attrs, "penwidth", &style, StyleKey::PenWidth);
        if let Some(StyleValue::Rank(rank)) = style.get(StyleKey::Rank) {
            attrs.raw("rank", rank.as_dot());
        }
        set_labelloc(&mut attrs, group, &style);
        attrs
    }

    fn node_attrs(&self, node: &Node) -> Result<AttrList, ArborError> {
        let own = node.style();
        let style = StyleSet::merge(
            &self.node_defaults,
            &own.resolve(&self.ancestor_styles(node.id())),
        );
        warn_not_applicable(node, own, &[StyleKey::Weight, StyleKey::Rank]);

        let label = text(&style, StyleKey::Label).unwrap_or(node.label());
        let mut attrs = AttrList::new();
        attrs.quoted("label", label);

        let pattern = match style.get(StyleKey::LinePattern) {
            Some(StyleValue::Pattern(pattern)) => Some(pattern.as_dot()),
            _ => None,
        };
        let filled = style.contains(StyleKey::FillColor);

        match node.icon() {
            Some(icon) => {
                let image = self.resolver.resolve(icon)?;
                trace!(icon, image = image.display().to_string(); "Resolved icon");
                let lines = label.lines().count().max(1);
                let height = ICON_NODE_HEIGHT + LABEL_LINE_HEIGHT * (lines - 1) as f32;

                attrs.raw("shape", "none");
                let line_style: Vec<&str> =
                    pattern.into_iter().chain(filled.then_some("filled")).collect();
                if !line_style.is_empty() {
                    attrs.quoted("style", line_style.join(","));
                }
                attrs.quoted("image", image.to_string_lossy());
                attrs.raw("imagescale", "true");
                attrs.raw("fixedsize", "true");
                attrs.raw("width", number(NODE_SIZE));
                attrs.raw("height", number(height));
            }
            None => {
                let line_style: Vec<&str> = std::iter::once("rounded")
                    .chain(pattern)
                    .chain(filled.then_some("filled"))
                    .collect();
                attrs.raw("shape", "box");
                attrs.quoted("style", line_style.join(","));
                attrs.raw("fixedsize", "true");
                attrs.raw("width", number(NODE_SIZE));
                attrs.raw("height", number(NODE_SIZE));
            }
        }

        set_labelloc(&mut attrs, node, &style);
        attrs.quoted("fontname", self.config.style().font_name());
        set_number(&mut attrs, "fontsize", &style, StyleKey::FontSize);
        set_color(&mut attrs, "fontcolor", &style, StyleKey::FontColor);
        set_color(&mut attrs, "color", &style, StyleKey::Color);
        set_color(&mut attrs, "fillcolor", &style, StyleKey::FillColor);
        set_number(&mut attrs, "penwidth", &style, StyleKey::PenWidth);
        Ok(attrs)
    }

    fn edge_attrs(&self, edge: &Edge, source: &Endpoint, target: &Endpoint) -> AttrList {
        let own = edge.style();
        let style = StyleSet::merge(
            &self.edge_defaults,
            &own.resolve(&[self.diagram.edge_style()]),
        );
        warn_not_applicable(
            &format!("edge {}", edge.id().short()),
            own,
            &[StyleKey::FillColor, StyleKey::Rank],
        );

        let mut attrs = AttrList::new();
        attrs.raw("dir", edge.direction().as_dot());
        if let Some(StyleValue::Pattern(pattern)) = style.get(StyleKey::LinePattern) {
            attrs.raw("style", pattern.as_dot());
        }
        set_color(&mut attrs, "color", &style, StyleKey::Color);

        if let Some(label) = text(&style, StyleKey::Label) {
            let key = match style.get(StyleKey::LabelPosition) {
                Some(StyleValue::Position(LabelPosition::Head)) => "headlabel",
                Some(StyleValue::Position(LabelPosition::Tail)) => "taillabel",
                _ => "label",
            };
            attrs.quoted(key, label);
        }

        attrs.quoted("fontname", self.config.style().font_name());
        set_number(&mut attrs, "fontsize", &style, StyleKey::FontSize);
        set_color(&mut attrs, "fontcolor", &style, StyleKey::FontColor);
        set_number(&mut attrs, "penwidth", &style, StyleKey::PenWidth);
        if let Some(StyleValue::Integer(weight)) = style.get(StyleKey::Weight) {
            attrs.raw("weight", weight);
        }
        if let Some(cluster) = &target.cluster {
            attrs.raw("lhead", cluster);
        }
        if let Some(cluster) = &source.cluster {
            attrs.raw("ltail", cluster);
        }
        attrs
    }
}

fn anchor_attrs() -> AttrList {
    let mut attrs = AttrList::new();
    attrs
        .quoted("label", "")
        .raw("shape", "point")
        .raw("style", "invis")
        .raw("width", 0);
    attrs
}

/// Formats a length or size with at most two decimals.
fn number(value: f32) -> String {
    let formatted = format!("{value:.2}");
    formatted
        .trim_end_matches('0')
        .trim_end_matches('.')
        .to_string()
}

fn text(style: &StyleSet, key: StyleKey) -> Option<&str> {
    match style.get(key) {
        Some(StyleValue::Text(text)) => Some(text.as_str()),
        _ => None,
    }
}

fn set_color(attrs: &mut AttrList, name: &'static str, style: &StyleSet, key: StyleKey) {
    if let Some(StyleValue::Color(color)) = style.get(key) {
        attrs.quoted(name, color.to_hex());
    }
}

fn set_number(attrs: &mut AttrList, name: &'static str, style: &StyleSet, key: StyleKey) {
    if let Some(StyleValue::Number(value)) = style.get(key) {
        attrs.raw(name, number(*value));
    }
}

fn set_labelloc(attrs: &mut AttrList, element: &dyn fmt::Display, style: &StyleSet) {
    if let Some(StyleValue::Position(position)) = style.get(StyleKey::LabelPosition) {
        match position.as_labelloc() {
            Some(loc) => {
                attrs.raw("labelloc", loc);
            }
            None => warn!(
                element = element.to_string(),
                position = position.name();
                "Label position only applies to edges, ignoring"
            ),
        }
    }
}

fn warn_not_applicable(element: &dyn fmt::Display, own: &StyleSet, keys: &[StyleKey]) {
    for key in keys {
        if own.contains(*key) {
            warn!(element = element.to_string(), key = key.name(); "Style key does not apply, ignoring");
        }
    }
}
