//! Arbor - architecture diagrams as code.
//!
//! Diagrams are built programmatically from nodes, nested groups and styled
//! edges (see [`model`]), serialized deterministically to Graphviz DOT
//! ([`dot`]) and rendered to an image by the external `dot` executable
//! ([`render`]).

pub mod assets;
pub mod config;
pub mod declaration;
pub mod dot;
pub mod render;

mod error;

pub use arbor_core::{color, identifier, model, style};

pub use error::ArborError;

use std::path::{Path, PathBuf};

use log::{debug, info};

use assets::{AssetResolver, DirectoryResolver, PassthroughResolver};
use config::AppConfig;
use model::Diagram;
use render::{RenderDriver, RenderOutput};

/// Serializes and renders diagrams with a shared configuration.
///
/// # Examples
///
/// ```rust,no_run
/// use arbor::{DiagramRenderer, config::AppConfig, model::{Diagram, Edge, Node}};
///
/// let mut diagram = Diagram::new().with_title("Web Service");
/// let root = diagram.root();
/// let users = diagram.add_node(root, Node::new("Users")).unwrap();
/// let api = diagram.add_node(root, Node::new("API")).unwrap();
/// diagram.connect(Edge::new(users, api));
///
/// let renderer = DiagramRenderer::new(AppConfig::default());
///
/// // DOT text only
/// let dot = renderer.serialize(&diagram).expect("Failed to serialize");
///
/// // Image on disk, named after the title: web_service.png
/// let output = renderer.render(&diagram, None).expect("Failed to render");
/// println!("{}", output.path().display());
/// # let _ = dot;
/// ```
pub struct DiagramRenderer {
    config: AppConfig,
    resolver: Box<dyn AssetResolver>,
}

impl Default for DiagramRenderer {
    fn default() -> Self {
        Self::new(AppConfig::default())
    }
}

impl DiagramRenderer {
    /// Creates a renderer for `config`.
    ///
    /// Icons are looked up in the configured search paths, or used as plain
    /// paths when none are configured.
    pub fn new(config: AppConfig) -> Self {
        let resolver: Box<dyn AssetResolver> = if config.assets().search_paths().is_empty() {
            Box::new(PassthroughResolver)
        } else {
            Box::new(DirectoryResolver::from_config(config.assets()))
        };
        Self { config, resolver }
    }

    /// Replaces the icon resolver.
    pub fn with_resolver(mut self, resolver: impl AssetResolver + 'static) -> Self {
        self.resolver = Box::new(resolver);
        self
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Serializes `diagram` to DOT text.
    ///
    /// # Errors
    ///
    /// See [`dot::serialize`].
    pub fn serialize(&self, diagram: &Diagram) -> Result<String, ArborError> {
        info!(
            title = diagram.title().unwrap_or_default(),
            elements = diagram.elements_count(),
            edges = diagram.edges().len();
            "Serializing diagram"
        );
        dot::serialize(diagram, &self.config, self.resolver.as_ref())
    }

    /// Serializes `diagram` and renders it with the configured engine.
    ///
    /// Without an `output` path the file is named after the diagram title in
    /// the current directory. The format is the configured one.
    ///
    /// # Errors
    ///
    /// Any serialization error, or the errors of [`RenderDriver::render`].
    pub fn render(
        &self,
        diagram: &Diagram,
        output: Option<&Path>,
    ) -> Result<RenderOutput, ArborError> {
        let description = self.serialize(diagram)?;
        let format = self.config.engine().format();
        let output = match output {
            Some(path) => path.to_path_buf(),
            None => PathBuf::from(render::default_file_name(diagram.title(), format)),
        };
        debug!(output = output.display().to_string(), format = format.extension(); "Rendering");

        RenderDriver::from_config(self.config.engine()).render(&description, &output, format)
    }
}
