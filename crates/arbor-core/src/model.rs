//! Diagram model types.
//!
//! This module contains the in-memory representation of a diagram before it
//! is serialized for the layout engine.
//!
//! # Pipeline Position
//!
//! ```text
//! Content code
//!     ↓ build (this module)
//! Diagram Model - nodes, nested groups, edges
//!     ↓ serialize
//! DOT description
//!     ↓ render (external layout engine)
//! Image
//! ```
//!
//! # Organization
//!
//! - [`element`] - Element types: [`Node`], [`Group`], [`Edge`], [`EdgeDirection`]
//! - [`diagram`] - The [`Diagram`] aggregate, containment rules and [`LayoutSettings`]

pub mod diagram;
pub mod element;

pub use diagram::*;
pub use element::*;
