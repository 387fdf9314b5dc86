//! CLI logic for the Arbor diagram tool.
//!
//! Reads a TOML diagram declaration, builds the diagram and either renders
//! it through the layout engine or writes its DOT description.

pub mod error_adapter;

mod args;
mod config;

pub use args::Args;

use std::{
    fs,
    ops::Range,
    path::{Path, PathBuf},
    time::Duration,
};

use log::{debug, info};
use thiserror::Error;

use arbor::{ArborError, DiagramRenderer, declaration::DiagramDeclaration, render::OutputFormat};

/// Errors reported by the CLI.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Arbor(#[from] ArborError),

    /// A TOML file that could not be read as a declaration or configuration.
    #[error("{message}")]
    Syntax {
        message: String,
        span: Option<Range<usize>>,
        path: PathBuf,
        src: String,
    },
}

impl CliError {
    fn syntax(err: toml::de::Error, path: &Path, src: String) -> Self {
        CliError::Syntax {
            message: err.message().to_string(),
            span: err.span(),
            path: path.to_path_buf(),
            src,
        }
    }
}

/// Run the Arbor CLI application
///
/// This function loads the declaration in `args.input`, then renders it to
/// the output file or, with `--emit-dot`, writes the DOT text instead.
///
/// # Errors
///
/// Returns `CliError` for:
/// - File I/O errors
/// - Configuration loading errors
/// - Declaration syntax and reference errors
/// - Serialization errors
/// - Layout engine errors
pub fn run(args: &Args) -> Result<(), CliError> {
    info!(
        input_path = args.input,
        output_path:? = args.output;
        "Processing diagram"
    );

    let mut app_config = config::load_config(args.config.as_ref())?;

    let output = args.output.as_deref().map(Path::new);
    let format = args.format.or_else(|| {
        output
            .and_then(|path| path.extension())
            .and_then(|ext| ext.to_str())
            .and_then(|ext| ext.parse::<OutputFormat>().ok())
    });
    if let Some(format) = format {
        app_config.engine_mut().set_format(format);
    }
    if let Some(secs) = args.timeout {
        app_config.engine_mut().set_timeout(Some(Duration::from_secs(secs)));
    }
    debug!(format:? = app_config.engine().format(); "Resolved output format");

    let input = Path::new(&args.input);
    let source = fs::read_to_string(input).map_err(ArborError::from)?;
    let declaration: DiagramDeclaration =
        toml::from_str(&source).map_err(|err| CliError::syntax(err, input, source.clone()))?;
    let diagram = declaration.build()?;

    let renderer = DiagramRenderer::new(app_config);

    if args.emit_dot {
        let dot = renderer.serialize(&diagram)?;
        match output {
            Some(path) => {
                fs::write(path, dot).map_err(ArborError::from)?;
                info!(output_file = path.display().to_string(); "DOT written successfully");
            }
            None => print!("{dot}"),
        }
        return Ok(());
    }

    let rendered = renderer.render(&diagram, output)?;
    info!(
        output_file = rendered.path().display().to_string(),
        bytes = rendered.bytes();
        "Diagram rendered successfully"
    );

    Ok(())
}
