//! Configuration types for Arbor diagram rendering.
//!
//! This module provides configuration structures that control how diagrams
//! are serialized and rendered. All types implement [`serde::Deserialize`] for
//! flexible loading from external sources.
//!
//! # Overview
//!
//! - [`AppConfig`] - Top-level configuration combining every section.
//! - [`EngineConfig`] - Which layout engine executable runs and how.
//! - [`StyleConfig`] - Engine default attributes per element kind.
//! - [`AssetConfig`] - Where icon references are looked up.
//!
//! Layout defaults use [`LayoutSettings`] from the core model; they are
//! overlaid on [`AppConfig::default_layout`] and a diagram's own settings
//! are overlaid on top of that.
//!
//! # Example
//!
//! ```
//! # use arbor::config::AppConfig;
//! let config = AppConfig::default();
//! assert_eq!(config.engine().program(), "dot");
//! assert!(config.style().cluster_palette().is_ok());
//! ```

use std::{path::PathBuf, time::Duration};

use serde::{Deserialize, Deserializer};

use arbor_core::{
    color::Color,
    model::{LayoutSettings, RankDirection, Splines},
    style::{LabelPosition, StyleSet},
};

use crate::render::OutputFormat;

/// Top-level application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Layout engine section.
    #[serde(default)]
    engine: EngineConfig,

    /// Layout defaults section.
    #[serde(default)]
    layout: LayoutSettings,

    /// Style defaults section.
    #[serde(default)]
    style: StyleConfig,

    /// Asset lookup section.
    #[serde(default)]
    assets: AssetConfig,
}

impl AppConfig {
    /// Creates a new [`AppConfig`] from its sections.
    pub fn new(
        engine: EngineConfig,
        layout: LayoutSettings,
        style: StyleConfig,
        assets: AssetConfig,
    ) -> Self {
        Self {
            engine,
            layout,
            style,
            assets,
        }
    }

    pub fn engine(&self) -> &EngineConfig {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut EngineConfig {
        &mut self.engine
    }

    pub fn style(&self) -> &StyleConfig {
        &self.style
    }

    pub fn assets(&self) -> &AssetConfig {
        &self.assets
    }

    /// Built-in layout used when neither the configuration nor the diagram
    /// set a value.
    pub fn default_layout() -> LayoutSettings {
        LayoutSettings {
            direction: Some(RankDirection::TopToBottom),
            rank_sep: Some(0.75),
            node_sep: Some(0.6),
            splines: Some(Splines::Ortho),
            pad: Some(2.0),
        }
    }

    /// Built-in layout with the configured layout section overlaid.
    pub fn layout(&self) -> LayoutSettings {
        Self::default_layout().overlay(self.layout)
    }
}

/// Layout engine configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Executable to run.
    program: String,

    /// Graphviz layout algorithm passed with `-K`.
    layout: String,

    /// Time before the engine process is killed. No limit when unset.
    #[serde(rename = "timeout_secs", deserialize_with = "deserialize_seconds")]
    timeout: Option<Duration>,

    /// Default output format.
    format: OutputFormat,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            program: "dot".to_string(),
            layout: "dot".to_string(),
            timeout: None,
            format: OutputFormat::default(),
        }
    }
}

impl EngineConfig {
    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn layout(&self) -> &str {
        &self.layout
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    pub fn set_program(&mut self, program: impl Into<String>) {
        self.program = program.into();
    }

    pub fn set_timeout(&mut self, timeout: Option<Duration>) {
        self.timeout = timeout;
    }

    pub fn set_format(&mut self, format: OutputFormat) {
        self.format = format;
    }
}

fn deserialize_seconds<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<u64>::deserialize(deserializer)?.map(Duration::from_secs))
}

/// Engine default attributes for each element kind.
///
/// Configured style sets are merged over the built-in ones, so a
/// configuration only needs to name the keys it changes.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StyleConfig {
    font_name: Option<String>,
    graph: StyleSet,
    node: StyleSet,
    edge: StyleSet,
    cluster: StyleSet,
    cluster_palette: Option<Vec<String>>,
}

const DEFAULT_FONT_NAME: &str = "Sans-Serif";
const DEFAULT_FONT_COLOR: &str = "#2D3436";
const DEFAULT_EDGE_COLOR: &str = "#7B8894";
const DEFAULT_CLUSTER_PEN_COLOR: &str = "#AEB6BE";
const DEFAULT_CLUSTER_PALETTE: [&str; 4] = ["#E5F5FD", "#EBF3E7", "#ECE8F6", "#FDF7E3"];

fn builtin_color(value: &str) -> Color {
    Color::new(value).expect("built-in colors are valid CSS colors")
}

fn builtin_size(style: StyleSet, size: f32) -> StyleSet {
    style
        .with_font_size(size)
        .expect("built-in font sizes are positive")
}

impl StyleConfig {
    /// Font family used for every label.
    pub fn font_name(&self) -> &str {
        self.font_name.as_deref().unwrap_or(DEFAULT_FONT_NAME)
    }

    /// Defaults for the top-level graph (title and background).
    pub fn graph(&self) -> StyleSet {
        let builtin = builtin_size(
            StyleSet::new().with_font_color(builtin_color(DEFAULT_FONT_COLOR)),
            15.0,
        );
        StyleSet::merge(&builtin, &self.graph)
    }

    /// Defaults for nodes.
    pub fn node(&self) -> StyleSet {
        let builtin = builtin_size(
            StyleSet::new()
                .with_font_color(builtin_color(DEFAULT_FONT_COLOR))
                .with_label_position(LabelPosition::Bottom),
            13.0,
        );
        StyleSet::merge(&builtin, &self.node)
    }

    /// Defaults for edges.
    pub fn edge(&self) -> StyleSet {
        let builtin = StyleSet::new().with_color(builtin_color(DEFAULT_EDGE_COLOR));
        StyleSet::merge(&builtin, &self.edge)
    }

    /// Defaults for groups. Fill colors come from [`StyleConfig::cluster_palette`].
    pub fn cluster(&self) -> StyleSet {
        let builtin = builtin_size(
            StyleSet::new()
                .with_color(builtin_color(DEFAULT_CLUSTER_PEN_COLOR))
                .with_font_color(builtin_color(DEFAULT_FONT_COLOR)),
            12.0,
        );
        StyleSet::merge(&builtin, &self.cluster)
    }

    /// Fill colors assigned to groups by nesting depth, cycling when groups
    /// nest deeper than the palette is long.
    ///
    /// # Errors
    ///
    /// Returns an error if a configured color cannot be parsed.
    pub fn cluster_palette(&self) -> Result<Vec<Color>, String> {
        match &self.cluster_palette {
            Some(palette) => palette
                .iter()
                .map(|color| Color::new(color))
                .collect::<Result<Vec<_>, _>>()
                .map_err(|err| format!("Invalid cluster palette in config: {err}")),
            None => Ok(DEFAULT_CLUSTER_PALETTE
                .iter()
                .map(|color| builtin_color(color))
                .collect()),
        }
    }
}

/// Icon lookup configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AssetConfig {
    /// Directories searched in order for icon files.
    search_paths: Vec<PathBuf>,

    /// Extension appended to icon references that have none.
    extension: Option<String>,
}

impl AssetConfig {
    pub fn new(search_paths: Vec<PathBuf>, extension: Option<String>) -> Self {
        Self {
            search_paths,
            extension,
        }
    }

    pub fn search_paths(&self) -> &[PathBuf] {
        &self.search_paths
    }

    /// Extension appended to bare icon references; `png` unless configured.
    pub fn extension(&self) -> &str {
        self.extension.as_deref().unwrap_or("png")
    }
}

#[cfg(test)]
mod tests {
    use arbor_core::style::{StyleKey, StyleValue};

    use super::*;

    #[test]
    fn test_default_engine() {
        let config = AppConfig::default();
        assert_eq!(config.engine().program(), "dot");
        assert_eq!(config.engine().layout(), "dot");
        assert_eq!(config.engine().timeout(), None);
        assert_eq!(config.engine().format(), OutputFormat::Png);
    }

    #[test]
    fn test_set_timeout_keeps_precision() {
        let mut config = AppConfig::default();
        config
            .engine_mut()
            .set_timeout(Some(Duration::from_millis(1500)));
        assert_eq!(config.engine().timeout(), Some(Duration::from_millis(1500)));

        config
            .engine_mut()
            .set_timeout(Some(Duration::from_millis(200)));
        let driver = crate::render::RenderDriver::from_config(config.engine());
        assert_eq!(driver.timeout(), Some(Duration::from_millis(200)));
    }

    #[test]
    fn test_default_layout() {
        let layout = AppConfig::default().layout();
        assert_eq!(layout.direction, Some(RankDirection::TopToBottom));
        assert_eq!(layout.splines, Some(Splines::Ortho));
        assert_eq!(layout.rank_sep, Some(0.75));
    }

    #[test]
    fn test_partial_toml_overlays_defaults() {
        let config: AppConfig = toml::from_str(
            r##"
            [engine]
            program = "/usr/local/bin/dot"
            timeout_secs = 30
            format = "svg"

            [layout]
            direction = "LR"

            [style]
            edge = { color = "red", fontsize = 16 }
            cluster_palette = ["white", "#eeeeee"]
            "##,
        )
        .unwrap();

        assert_eq!(config.engine().program(), "/usr/local/bin/dot");
        assert_eq!(config.engine().layout(), "dot");
        assert_eq!(config.engine().timeout(), Some(Duration::from_secs(30)));
        assert_eq!(config.engine().format(), OutputFormat::Svg);

        let layout = config.layout();
        assert_eq!(layout.direction, Some(RankDirection::LeftToRight));
        assert_eq!(layout.rank_sep, Some(0.75));

        let edge = config.style().edge();
        assert_eq!(
            edge.get(StyleKey::Color),
            Some(&StyleValue::Color(Color::new("red").unwrap()))
        );
        assert_eq!(edge.get(StyleKey::FontSize), Some(&StyleValue::Number(16.0)));
        assert_eq!(config.style().cluster_palette().unwrap().len(), 2);
    }

    #[test]
    fn test_unknown_style_key_in_config_is_rejected() {
        let result: Result<AppConfig, _> = toml::from_str(
            r#"
            [style]
            node = { colour = "red" }
            "#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_palette_is_reported() {
        let config: AppConfig = toml::from_str(
            r#"
            [style]
            cluster_palette = ["nope"]
            "#,
        )
        .unwrap();
        assert!(config.style().cluster_palette().is_err());
    }

    #[test]
    fn test_asset_defaults() {
        let assets = AssetConfig::default();
        assert!(assets.search_paths().is_empty());
        assert_eq!(assets.extension(), "png");
    }
}
