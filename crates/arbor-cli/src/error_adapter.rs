//! Error adapter for converting CLI errors to miette diagnostics.
//!
//! This module provides the bridge between the library's standard error types
//! and miette's rich diagnostic formatting used in the CLI. Syntax errors in
//! TOML files are shown with the offending source snippet; library errors get
//! a stable code and, where a common fix exists, a help line.

use std::{fmt, ops::Range, path::Path};

use miette::{Diagnostic as MietteDiagnostic, LabeledSpan, SourceSpan};

use arbor::ArborError;

use crate::CliError;

/// Adapter for a TOML syntax error with its source.
pub struct SyntaxAdapter<'a> {
    message: &'a str,
    span: Option<&'a Range<usize>>,
    path: &'a Path,
    src: &'a String,
}

impl fmt::Debug for SyntaxAdapter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyntaxAdapter")
            .field("message", &self.message)
            .field("path", &self.path)
            .finish()
    }
}

impl fmt::Display for SyntaxAdapter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path.display(), self.message)
    }
}

impl std::error::Error for SyntaxAdapter<'_> {}

impl MietteDiagnostic for SyntaxAdapter<'_> {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        Some(Box::new("arbor::syntax"))
    }

    fn source_code(&self) -> Option<&dyn miette::SourceCode> {
        Some(self.src as &dyn miette::SourceCode)
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        let span = self.span?;
        let span = SourceSpan::new(span.start.into(), span.len());
        Some(Box::new(std::iter::once(
            LabeledSpan::new_primary_with_span(Some(self.message.to_string()), span),
        )))
    }
}

/// Adapter for [`ArborError`] variants.
pub struct ErrorAdapter<'a>(pub &'a ArborError);

impl fmt::Debug for ErrorAdapter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}

impl fmt::Display for ErrorAdapter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl std::error::Error for ErrorAdapter<'_> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.0.source()
    }
}

impl MietteDiagnostic for ErrorAdapter<'_> {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        let code = match &self.0 {
            ArborError::Io(_) => "arbor::io",
            ArborError::Style(_) => "arbor::style",
            ArborError::Structural(_) => "arbor::structural",
            ArborError::DanglingReference { .. } => "arbor::dangling_reference",
            ArborError::AssetNotFound { .. } => "arbor::asset_not_found",
            ArborError::LayoutEngine { .. } => "arbor::layout_engine",
            ArborError::LayoutEngineTimeout { .. } => "arbor::layout_engine_timeout",
            ArborError::LayoutEngineUnavailable { .. } => "arbor::layout_engine_unavailable",
            ArborError::Config(_) => "arbor::config",
            ArborError::Declaration(_) => "arbor::declaration",
        };
        Some(Box::new(code))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        let help: Box<dyn fmt::Display + 'a> = match &self.0 {
            ArborError::AssetNotFound { searched, .. } if searched.is_empty() => {
                Box::new("add icon directories to `assets.search_paths` in the configuration")
            }
            ArborError::AssetNotFound { searched, .. } => Box::new(format!(
                "looked for: {}",
                searched
                    .iter()
                    .map(|path| path.display().to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            )),
            ArborError::LayoutEngineUnavailable { .. } => Box::new(
                "install Graphviz or point `engine.program` in the configuration at the `dot` executable",
            ),
            ArborError::LayoutEngineTimeout { .. } => {
                Box::new("raise the limit with `--timeout` or `engine.timeout_secs`")
            }
            ArborError::DanglingReference { .. } => {
                Box::new("attach both endpoints to the diagram before serializing it")
            }
            _ => return None,
        };
        Some(help)
    }
}

/// A reportable error that can be rendered by miette.
#[derive(Debug)]
pub enum Reportable<'a> {
    /// A syntax error with source location information.
    Syntax(SyntaxAdapter<'a>),
    /// A library error without source location.
    Error(ErrorAdapter<'a>),
}

impl fmt::Display for Reportable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reportable::Syntax(s) => fmt::Display::fmt(s, f),
            Reportable::Error(e) => fmt::Display::fmt(e, f),
        }
    }
}

impl std::error::Error for Reportable<'_> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Reportable::Syntax(_) => None,
            Reportable::Error(e) => e.source(),
        }
    }
}

impl MietteDiagnostic for Reportable<'_> {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        match self {
            Reportable::Syntax(s) => s.code(),
            Reportable::Error(e) => e.code(),
        }
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        match self {
            Reportable::Syntax(s) => s.help(),
            Reportable::Error(e) => e.help(),
        }
    }

    fn source_code(&self) -> Option<&dyn miette::SourceCode> {
        match self {
            Reportable::Syntax(s) => s.source_code(),
            Reportable::Error(e) => e.source_code(),
        }
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        match self {
            Reportable::Syntax(s) => s.labels(),
            Reportable::Error(e) => e.labels(),
        }
    }
}

/// Convert a [`CliError`] into a list of reportable errors.
pub fn to_reportables(err: &CliError) -> Vec<Reportable<'_>> {
    match err {
        CliError::Syntax {
            message,
            span,
            path,
            src,
        } => vec![Reportable::Syntax(SyntaxAdapter {
            message,
            span: span.as_ref(),
            path,
            src,
        })],
        CliError::Arbor(err) => vec![Reportable::Error(ErrorAdapter(err))],
    }
}
