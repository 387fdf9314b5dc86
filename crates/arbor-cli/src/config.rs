//! Locating and reading the CLI configuration file.

use std::{
    fmt, fs,
    path::{Path, PathBuf},
};

use directories::ProjectDirs;
use log::{debug, info};

use arbor::{ArborError, config::AppConfig};

use crate::CliError;

/// Project configuration, relative to the working directory.
const PROJECT_CONFIG: &str = "arbor/config.toml";

/// Where a configuration file was found.
#[derive(Debug, Clone, PartialEq, Eq)]
enum ConfigSource {
    /// Given with `--config`; must exist.
    Explicit(PathBuf),
    /// `arbor/config.toml` under the working directory.
    Project(PathBuf),
    /// The platform configuration directory.
    User(PathBuf),
}

impl ConfigSource {
    fn path(&self) -> &Path {
        match self {
            Self::Explicit(path) | Self::Project(path) | Self::User(path) => path,
        }
    }
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self {
            Self::Explicit(_) => "explicit",
            Self::Project(_) => "project",
            Self::User(_) => "user",
        };
        write!(f, "{kind} configuration {}", self.path().display())
    }
}

/// Candidate locations, most specific first.
///
/// An explicit path shadows every other location.
fn candidates(explicit: Option<&Path>) -> Vec<ConfigSource> {
    if let Some(path) = explicit {
        return vec![ConfigSource::Explicit(path.to_path_buf())];
    }

    let mut sources = vec![ConfigSource::Project(PathBuf::from(PROJECT_CONFIG))];
    match ProjectDirs::from("com", "arbor", "arbor") {
        Some(dirs) => sources.push(ConfigSource::User(dirs.config_dir().join("config.toml"))),
        None => debug!("No platform configuration directory"),
    }
    sources
}

/// Loads the first configuration file found, or the built-in defaults.
///
/// # Errors
///
/// Fails when an explicit path does not exist, when the chosen file cannot
/// be read, or when it is not a valid configuration. Syntax errors keep the
/// offending span.
pub fn load_config(explicit: Option<impl AsRef<Path>>) -> Result<AppConfig, CliError> {
    let explicit: Option<&Path> = explicit.as_ref().map(|path| path.as_ref());

    for source in candidates(explicit) {
        let path = source.path();
        if path.is_file() {
            info!(source = source.to_string(); "Loading configuration");
            return read(path);
        }
        if let ConfigSource::Explicit(path) = &source {
            return Err(ArborError::Config(format!(
                "configuration file {} does not exist",
                path.display()
            ))
            .into());
        }
        debug!(source = source.to_string(); "Configuration not present");
    }

    debug!("Using default configuration");
    Ok(AppConfig::default())
}

fn read(path: &Path) -> Result<AppConfig, CliError> {
    let content = fs::read_to_string(path).map_err(ArborError::from)?;
    toml::from_str(&content).map_err(|err| CliError::syntax(err, path, content))
}
