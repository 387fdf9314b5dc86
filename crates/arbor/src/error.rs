//! Error types for Arbor operations.
//!
//! This module provides the main error type [`ArborError`] which wraps
//! every failure that can occur while building, serializing or rendering a
//! diagram.

use std::{io, path::PathBuf, time::Duration};

use thiserror::Error;

use arbor_core::{model::StructuralError, style::StyleError};

/// The main error type for Arbor operations.
///
/// # Phases
///
/// - Construction: `Style`, `Structural`, `Declaration`
/// - Serialization: `DanglingReference`, `AssetNotFound`
/// - Rendering: `LayoutEngine`, `LayoutEngineTimeout`, `LayoutEngineUnavailable`, `Io`
///
/// None of them are retried. A failed render never leaves a partial artifact.
#[derive(Debug, Error)]
pub enum ArborError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Style error: {0}")]
    Style(#[from] StyleError),

    #[error("Structural error: {0}")]
    Structural(#[from] StructuralError),

    #[error("edge {edge} references element {missing}, which is not part of the diagram")]
    DanglingReference { edge: String, missing: String },

    #[error("icon `{icon_ref}` could not be resolved")]
    AssetNotFound {
        icon_ref: String,
        searched: Vec<PathBuf>,
    },

    #[error("layout engine failed ({}):\n{diagnostics}", describe_status(.status))]
    LayoutEngine {
        status: Option<i32>,
        diagnostics: String,
    },

    #[error("layout engine did not finish within {timeout:?}")]
    LayoutEngineTimeout { timeout: Duration },

    #[error("layout engine `{program}` could not be started: {source}")]
    LayoutEngineUnavailable { program: String, source: io::Error },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Declaration error: {0}")]
    Declaration(String),
}

fn describe_status(status: &Option<i32>) -> String {
    match status {
        Some(code) => format!("exit status {code}"),
        None => "terminated by signal".to_string(),
    }
}
