//! Arbor Core Types and Definitions
//!
//! This crate provides the foundational types for Arbor diagrams. It includes:
//!
//! - **Identifiers**: Process-unique element identities ([`identifier::Id`])
//! - **Colors**: CSS color parsing with Graphviz output ([`color::Color`])
//! - **Style**: Validated style attributes and inheritance ([`style`] module)
//! - **Model**: Nodes, groups, edges and the diagram aggregate ([`model`] module)

pub mod color;
pub mod identifier;
pub mod model;
pub mod style;
