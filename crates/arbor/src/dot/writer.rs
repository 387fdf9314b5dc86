//! Low-level DOT text output.
//!
//! [`DotWriter`] handles indentation and statement syntax, [`AttrList`]
//! keeps attributes in insertion order so that the same sequence of calls
//! always produces the same text.

use std::fmt::Write;

use indexmap::IndexMap;

/// A single attribute value.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum AttrValue {
    /// Written between double quotes with DOT escaping applied.
    Quoted(String),
    /// Written as-is; only used for identifiers, keywords and numbers.
    Raw(String),
}

impl AttrValue {
    fn write_to(&self, out: &mut String) {
        match self {
            Self::Quoted(text) => {
                out.push('"');
                out.push_str(&escape(text));
                out.push('"');
            }
            Self::Raw(text) => out.push_str(text),
        }
    }
}

/// Ordered attribute list rendered as `[key=value key=value]`.
#[derive(Debug, Clone, Default)]
pub(crate) struct AttrList {
    attrs: IndexMap<&'static str, AttrValue>,
}

impl AttrList {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Sets a quoted attribute. Setting a key again keeps its original position.
    pub(crate) fn quoted(&mut self, key: &'static str, value: impl Into<String>) -> &mut Self {
        self.attrs.insert(key, AttrValue::Quoted(value.into()));
        self
    }

    /// Sets an unquoted attribute.
    pub(crate) fn raw(&mut self, key: &'static str, value: impl ToString) -> &mut Self {
        self.attrs.insert(key, AttrValue::Raw(value.to_string()));
        self
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.attrs.is_empty()
    }

    fn write_to(&self, out: &mut String) {
        out.push('[');
        for (index, (key, value)) in self.attrs.iter().enumerate() {
            if index > 0 {
                out.push(' ');
            }
            out.push_str(key);
            out.push('=');
            value.write_to(out);
        }
        out.push(']');
    }
}

/// Escapes text for use inside a quoted DOT string.
///
/// Line breaks become `\n` escapes, which Graphviz renders as centered lines.
pub(crate) fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '"' => escaped.push_str("\\\""),
            '\\' => escaped.push_str("\\\\"),
            '\n' => escaped.push_str("\\n"),
            '\r' => {}
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Indented DOT text builder.
#[derive(Debug, Default)]
pub(crate) struct DotWriter {
    out: String,
    depth: usize,
}

impl DotWriter {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn indent(&mut self) {
        for _ in 0..self.depth {
            self.out.push('\t');
        }
    }

    /// Opens a block such as `digraph "title" {` or `subgraph cluster_0 {`.
    pub(crate) fn open(&mut self, header: &str) {
        self.indent();
        self.out.push_str(header);
        self.out.push_str(" {\n");
        self.depth += 1;
    }

    pub(crate) fn close(&mut self) {
        self.depth = self.depth.saturating_sub(1);
        self.indent();
        self.out.push_str("}\n");
    }

    /// Writes a `graph [...]` attribute statement; skipped when empty.
    pub(crate) fn graph_attrs(&mut self, attrs: &AttrList) {
        if attrs.is_empty() {
            return;
        }
        self.indent();
        self.out.push_str("graph ");
        attrs.write_to(&mut self.out);
        self.out.push('\n');
    }

    /// Writes a node statement.
    pub(crate) fn node(&mut self, name: &str, attrs: &AttrList) {
        self.indent();
        self.out.push_str(name);
        self.out.push(' ');
        attrs.write_to(&mut self.out);
        self.out.push('\n');
    }

    /// Writes a directed edge statement.
    pub(crate) fn edge(&mut self, source: &str, target: &str, attrs: &AttrList) {
        self.indent();
        // Writing to a String cannot fail.
        let _ = write!(self.out, "{source} -> {target} ");
        attrs.write_to(&mut self.out);
        self.out.push('\n');
    }

    pub(crate) fn finish(self) -> String {
        self.out
    }
}
