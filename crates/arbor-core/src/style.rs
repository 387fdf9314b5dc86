//! Style attributes for nodes, groups and edges.
//!
//! # Overview
//!
//! Exported types:
//! - [`StyleKey`]: The closed set of recognized style keys
//! - [`StyleValue`]: A typed value for one key
//! - [`StyleSet`]: A mapping from keys to values attached to an element
//! - [`LinePattern`], [`LabelPosition`], [`Rank`]: Enumerated value types
//!
//! # Inheritance
//!
//! Keys are either *inheritable* or not. When a style set is resolved against
//! its ancestors (nearest enclosing group first), every inheritable key that
//! is unset locally takes the first explicit value found up the chain.
//! Non-inheritable keys such as [`StyleKey::Label`] only ever come from the
//! element itself.
//!
//! | Key | Names | Inheritable |
//! |-----|-------|-------------|
//! | [`StyleKey::LinePattern`] | `pattern`, `style` | yes |
//! | [`StyleKey::Color`] | `color` | yes |
//! | [`StyleKey::FontColor`] | `font_color`, `fontcolor` | yes |
//! | [`StyleKey::FontSize`] | `font_size`, `fontsize` | yes |
//! | [`StyleKey::PenWidth`] | `pen_width`, `penwidth` | yes |
//! | [`StyleKey::FillColor`] | `fill_color`, `bgcolor` | no |
//! | [`StyleKey::Label`] | `label` | no |
//! | [`StyleKey::LabelPosition`] | `label_position`, `labelloc` | no |
//! | [`StyleKey::Weight`] | `weight` | no |
//! | [`StyleKey::Rank`] | `rank` | no |
//!
//! # Quick Start
//!
//! ```
//! use arbor_core::style::{LinePattern, StyleKey, StyleSet};
//!
//! // Typed construction
//! let dashed = StyleSet::new().with_pattern(LinePattern::Dashed);
//!
//! // String construction rejects typos
//! let style = StyleSet::parse([("style", "dashed"), ("color", "red")]).unwrap();
//! assert!(StyleSet::parse([("colour", "red")]).is_err());
//!
//! // Inheritance
//! let group = StyleSet::parse([("color", "blue"), ("label", "VPC")]).unwrap();
//! let resolved = dashed.resolve(&[&group]);
//! assert!(resolved.get(StyleKey::Color).is_some());
//! assert!(resolved.get(StyleKey::Label).is_none());
//! # let _ = style;
//! ```

use std::{collections::BTreeMap, fmt, str::FromStr};

use serde::Deserialize;
use thiserror::Error;

use crate::color::Color;

/// Smallest accepted font size or pen width. DOT output keeps two decimals.
pub const MIN_NUMBER: f32 = 0.01;

// =============================================================================
// Errors
// =============================================================================

/// Errors raised while building a [`StyleSet`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StyleError {
    #[error("unrecognized style key `{key}`")]
    UnknownKey { key: String },

    #[error("invalid value `{value}` for style key `{key}`: {reason}")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error("style key `{key}` is set more than once")]
    ConflictingKey { key: &'static str },
}

// =============================================================================
// Value types
// =============================================================================

/// Line pattern for edges and element borders.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinePattern {
    /// Solid continuous line (default)
    #[default]
    Solid,
    Dashed,
    Dotted,
    Bold,
    /// Drawn but not visible; still takes part in layout
    Invisible,
}

impl LinePattern {
    /// Returns the Graphviz `style` value for this pattern.
    pub fn as_dot(self) -> &'static str {
        match self {
            Self::Solid => "solid",
            Self::Dashed => "dashed",
            Self::Dotted => "dotted",
            Self::Bold => "bold",
            Self::Invisible => "invis",
        }
    }
}

impl FromStr for LinePattern {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "solid" => Ok(Self::Solid),
            "dashed" => Ok(Self::Dashed),
            "dotted" => Ok(Self::Dotted),
            "bold" => Ok(Self::Bold),
            "invisible" | "invis" => Ok(Self::Invisible),
            _ => Err("valid values: solid, dashed, dotted, bold, invisible".to_string()),
        }
    }
}

/// Where a label is placed relative to its element.
///
/// `Top`, `Center` and `Bottom` apply to nodes and groups. `Head` and `Tail`
/// apply to edges and attach the label to the corresponding endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LabelPosition {
    Top,
    Center,
    Bottom,
    Head,
    Tail,
}

impl LabelPosition {
    pub fn name(self) -> &'static str {
        match self {
            Self::Top => "top",
            Self::Center => "center",
            Self::Bottom => "bottom",
            Self::Head => "head",
            Self::Tail => "tail",
        }
    }

    /// Returns the Graphviz `labelloc` value, if this position has one.
    pub fn as_labelloc(self) -> Option<&'static str> {
        match self {
            Self::Top => Some("t"),
            Self::Center => Some("c"),
            Self::Bottom => Some("b"),
            Self::Head | Self::Tail => None,
        }
    }
}

impl FromStr for LabelPosition {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "top" | "t" => Ok(Self::Top),
            "center" | "c" => Ok(Self::Center),
            "bottom" | "b" => Ok(Self::Bottom),
            "head" => Ok(Self::Head),
            "tail" => Ok(Self::Tail),
            _ => Err("valid values: top, center, bottom, head, tail".to_string()),
        }
    }
}

/// Rank constraint applied to the members of a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rank {
    Same,
    Min,
    Max,
    Source,
    Sink,
}

impl Rank {
    /// Returns the Graphviz `rank` value.
    pub fn as_dot(self) -> &'static str {
        match self {
            Self::Same => "same",
            Self::Min => "min",
            Self::Max => "max",
            Self::Source => "source",
            Self::Sink => "sink",
        }
    }
}

impl FromStr for Rank {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "same" => Ok(Self::Same),
            "min" => Ok(Self::Min),
            "max" => Ok(Self::Max),
            "source" => Ok(Self::Source),
            "sink" => Ok(Self::Sink),
            _ => Err("valid values: same, min, max, source, sink".to_string()),
        }
    }
}

/// A typed style value.
#[derive(Debug, Clone, PartialEq)]
pub enum StyleValue {
    Pattern(LinePattern),
    Color(Color),
    Number(f32),
    Integer(u32),
    Text(String),
    Position(LabelPosition),
    Rank(Rank),
}

impl fmt::Display for StyleValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pattern(pattern) => f.write_str(pattern.as_dot()),
            Self::Color(color) => write!(f, "{color}"),
            Self::Number(number) => write!(f, "{number}"),
            Self::Integer(integer) => write!(f, "{integer}"),
            Self::Text(text) => f.write_str(text),
            Self::Position(position) => f.write_str(position.name()),
            Self::Rank(rank) => f.write_str(rank.as_dot()),
        }
    }
}

// =============================================================================
// Keys
// =============================================================================

/// The closed set of recognized style keys.
///
/// The declaration order is the order in which keys are iterated and
/// serialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StyleKey {
    LinePattern,
    Color,
    FontColor,
    FontSize,
    PenWidth,
    FillColor,
    Label,
    LabelPosition,
    Weight,
    Rank,
}

impl StyleKey {
    /// Every recognized key, in iteration order.
    pub const ALL: [StyleKey; 10] = [
        Self::LinePattern,
        Self::Color,
        Self::FontColor,
        Self::FontSize,
        Self::PenWidth,
        Self::FillColor,
        Self::Label,
        Self::LabelPosition,
        Self::Weight,
        Self::Rank,
    ];

    /// Canonical name of the key.
    pub fn name(self) -> &'static str {
        match self {
            Self::LinePattern => "pattern",
            Self::Color => "color",
            Self::FontColor => "font_color",
            Self::FontSize => "font_size",
            Self::PenWidth => "pen_width",
            Self::FillColor => "fill_color",
            Self::Label => "label",
            Self::LabelPosition => "label_position",
            Self::Weight => "weight",
            Self::Rank => "rank",
        }
    }

    /// Whether an unset value is taken from the nearest enclosing group.
    pub fn is_inheritable(self) -> bool {
        matches!(
            self,
            Self::LinePattern | Self::Color | Self::FontColor | Self::FontSize | Self::PenWidth
        )
    }

    /// Parses a raw value for this key.
    ///
    /// # Errors
    ///
    /// Returns [`StyleError::InvalidValue`] if `raw` is not valid for the key.
    pub fn parse_value(self, raw: &str) -> Result<StyleValue, StyleError> {
        let invalid = |reason: String| StyleError::InvalidValue {
            key: self.name(),
            value: raw.to_string(),
            reason,
        };

        match self {
            Self::LinePattern => raw.parse().map(StyleValue::Pattern).map_err(invalid),
            Self::Color | Self::FontColor | Self::FillColor => {
                Color::new(raw).map(StyleValue::Color).map_err(invalid)
            }
            Self::FontSize | Self::PenWidth => {
                let number: f32 = raw
                    .trim()
                    .parse()
                    .map_err(|_| invalid("expected a number".to_string()))?;
                if !number.is_finite() || number < MIN_NUMBER {
                    return Err(invalid(format!("expected a number of at least {MIN_NUMBER}")));
                }
                Ok(StyleValue::Number(number))
            }
            Self::Weight => raw
                .trim()
                .parse()
                .map(StyleValue::Integer)
                .map_err(|_| invalid("expected a non-negative integer".to_string())),
            Self::Label => Ok(StyleValue::Text(raw.to_string())),
            Self::LabelPosition => raw.parse().map(StyleValue::Position).map_err(invalid),
            Self::Rank => raw.parse().map(StyleValue::Rank).map_err(invalid),
        }
    }
}

impl FromStr for StyleKey {
    type Err = StyleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pattern" | "style" => Ok(Self::LinePattern),
            "color" => Ok(Self::Color),
            "font_color" | "fontcolor" => Ok(Self::FontColor),
            "font_size" | "fontsize" => Ok(Self::FontSize),
            "pen_width" | "penwidth" => Ok(Self::PenWidth),
            "fill_color" | "bgcolor" => Ok(Self::FillColor),
            "label" => Ok(Self::Label),
            "label_position" | "labelloc" => Ok(Self::LabelPosition),
            "weight" => Ok(Self::Weight),
            "rank" => Ok(Self::Rank),
            _ => Err(StyleError::UnknownKey { key: s.to_string() }),
        }
    }
}

impl fmt::Display for StyleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// StyleSet
// =============================================================================

/// A set of explicitly assigned style values.
///
/// Keys are stored in [`StyleKey`] order, so iteration is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(try_from = "BTreeMap<String, RawStyleValue>")]
pub struct StyleSet {
    values: BTreeMap<StyleKey, StyleValue>,
}

impl StyleSet {
    /// Creates an empty style set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a style set from `(key, value)` string pairs.
    ///
    /// # Errors
    ///
    /// Returns [`StyleError::UnknownKey`] for an unrecognized key,
    /// [`StyleError::InvalidValue`] for a value that does not parse, and
    /// [`StyleError::ConflictingKey`] when two names map to the same key.
    pub fn parse<'a>(
        pairs: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Result<Self, StyleError> {
        let mut style = Self::new();
        for (key, value) in pairs {
            let key: StyleKey = key.parse()?;
            if style.values.contains_key(&key) {
                return Err(StyleError::ConflictingKey { key: key.name() });
            }
            style.values.insert(key, key.parse_value(value)?);
        }
        Ok(style)
    }

    /// Sets a key from its string name and raw value, replacing any previous value.
    ///
    /// # Errors
    ///
    /// See [`StyleSet::parse`].
    pub fn set(&mut self, key: &str, value: &str) -> Result<&mut Self, StyleError> {
        let key: StyleKey = key.parse()?;
        let value = key.parse_value(value)?;
        self.values.insert(key, value);
        Ok(self)
    }

    /// Returns the explicit value for `key`, if any.
    pub fn get(&self, key: StyleKey) -> Option<&StyleValue> {
        self.values.get(&key)
    }

    /// Returns true if `key` has an explicit value.
    pub fn contains(&self, key: StyleKey) -> bool {
        self.values.contains_key(&key)
    }

    /// Iterates over explicit values in key order.
    pub fn iter(&self) -> impl Iterator<Item = (StyleKey, &StyleValue)> {
        self.values.iter().map(|(key, value)| (*key, value))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Combines two style sets; values in `override_style` win.
    pub fn merge(base: &StyleSet, override_style: &StyleSet) -> StyleSet {
        let mut values = base.values.clone();
        values.extend(
            override_style
                .values
                .iter()
                .map(|(key, value)| (*key, value.clone())),
        );
        StyleSet { values }
    }

    /// Fills unset inheritable keys from `ancestors`, nearest first.
    ///
    /// Non-inheritable keys are never taken from ancestors.
    pub fn resolve(&self, ancestors: &[&StyleSet]) -> StyleSet {
        let mut resolved = self.clone();
        for key in StyleKey::ALL {
            if !key.is_inheritable() || resolved.contains(key) {
                continue;
            }
            if let Some(value) = ancestors.iter().find_map(|ancestor| ancestor.get(key)) {
                resolved.values.insert(key, value.clone());
            }
        }
        resolved
    }

    fn with_value(mut self, key: StyleKey, value: StyleValue) -> Self {
        self.values.insert(key, value);
        self
    }

    pub fn with_pattern(self, pattern: LinePattern) -> Self {
        self.with_value(StyleKey::LinePattern, StyleValue::Pattern(pattern))
    }

    pub fn with_color(self, color: Color) -> Self {
        self.with_value(StyleKey::Color, StyleValue::Color(color))
    }

    pub fn with_font_color(self, color: Color) -> Self {
        self.with_value(StyleKey::FontColor, StyleValue::Color(color))
    }

    pub fn with_fill_color(self, color: Color) -> Self {
        self.with_value(StyleKey::FillColor, StyleValue::Color(color))
    }

    pub fn with_label(self, label: impl Into<String>) -> Self {
        self.with_value(StyleKey::Label, StyleValue::Text(label.into()))
    }

    pub fn with_label_position(self, position: LabelPosition) -> Self {
        self.with_value(StyleKey::LabelPosition, StyleValue::Position(position))
    }

    pub fn with_weight(self, weight: u32) -> Self {
        self.with_value(StyleKey::Weight, StyleValue::Integer(weight))
    }

    pub fn with_rank(self, rank: Rank) -> Self {
        self.with_value(StyleKey::Rank, StyleValue::Rank(rank))
    }

    /// Sets the font size.
    ///
    /// # Errors
    ///
    /// Returns [`StyleError::InvalidValue`] unless `size` is finite and at least [`MIN_NUMBER`].
    pub fn with_font_size(self, size: f32) -> Result<Self, StyleError> {
        let value = StyleKey::FontSize.parse_value(&size.to_string())?;
        Ok(self.with_value(StyleKey::FontSize, value))
    }

    /// Sets the pen width.
    ///
    /// # Errors
    ///
    /// Returns [`StyleError::InvalidValue`] unless `width` is finite and at least [`MIN_NUMBER`].
    pub fn with_pen_width(self, width: f32) -> Result<Self, StyleError> {
        let value = StyleKey::PenWidth.parse_value(&width.to_string())?;
        Ok(self.with_value(StyleKey::PenWidth, value))
    }
}

/// Raw value as written in a declaration or configuration file.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawStyleValue {
    Text(String),
    Integer(i64),
    Float(f64),
}

impl fmt::Display for RawStyleValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.write_str(text),
            Self::Integer(integer) => write!(f, "{integer}"),
            Self::Float(float) => write!(f, "{float}"),
        }
    }
}

impl TryFrom<BTreeMap<String, RawStyleValue>> for StyleSet {
    type Error = StyleError;

    fn try_from(raw: BTreeMap<String, RawStyleValue>) -> Result<Self, Self::Error> {
        let rendered: Vec<(String, String)> = raw
            .into_iter()
            .map(|(key, value)| (key, value.to_string()))
            .collect();
        Self::parse(
            rendered
                .iter()
                .map(|(key, value)| (key.as_str(), value.as_str())),
        )
    }
}
