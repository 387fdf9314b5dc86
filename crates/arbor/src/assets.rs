//! Icon resolution.
//!
//! Nodes carry a logical icon reference such as `aws/compute/lambda`. An
//! [`AssetResolver`] turns it into a file path the layout engine can load.
//! Icon files are never opened or validated here; only their location is.

use std::path::{Path, PathBuf};

use log::trace;

use crate::{ArborError, config::AssetConfig};

/// Maps icon references to image paths.
pub trait AssetResolver {
    /// Resolves `icon_ref` to a path passed through to the layout engine.
    ///
    /// # Errors
    ///
    /// Returns [`ArborError::AssetNotFound`] when the reference cannot be resolved.
    fn resolve(&self, icon_ref: &str) -> Result<PathBuf, ArborError>;
}

/// Uses icon references as paths without checking them.
#[derive(Debug, Default, Clone, Copy)]
pub struct PassthroughResolver;

impl AssetResolver for PassthroughResolver {
    fn resolve(&self, icon_ref: &str) -> Result<PathBuf, ArborError> {
        Ok(PathBuf::from(icon_ref))
    }
}

/// Looks icon references up in a list of directories.
///
/// A reference without an extension gets the configured one appended, so
/// `aws/compute/lambda` matches `<root>/aws/compute/lambda.png`. Absolute
/// references are accepted when the file exists. The first match wins.
#[derive(Debug, Clone)]
pub struct DirectoryResolver {
    search_paths: Vec<PathBuf>,
    extension: String,
}

impl DirectoryResolver {
    pub fn new(search_paths: Vec<PathBuf>, extension: impl Into<String>) -> Self {
        Self {
            search_paths,
            extension: extension.into(),
        }
    }

    pub fn from_config(config: &AssetConfig) -> Self {
        Self::new(config.search_paths().to_vec(), config.extension())
    }

    fn candidate(&self, root: &Path, icon_ref: &str) -> PathBuf {
        let path = root.join(icon_ref);
        if path.extension().is_none() && !self.extension.is_empty() {
            path.with_extension(&self.extension)
        } else {
            path
        }
    }
}

impl AssetResolver for DirectoryResolver {
    fn resolve(&self, icon_ref: &str) -> Result<PathBuf, ArborError> {
        let direct = Path::new(icon_ref);
        if direct.is_absolute() && direct.is_file() {
            return Ok(direct.to_path_buf());
        }

        let mut searched = Vec::with_capacity(self.search_paths.len());
        for root in &self.search_paths {
            let candidate = self.candidate(root, icon_ref);
            trace!(icon_ref, candidate = candidate.display().to_string(); "Looking up icon");
            if candidate.is_file() {
                return Ok(candidate);
            }
            searched.push(candidate);
        }

        Err(ArborError::AssetNotFound {
            icon_ref: icon_ref.to_string(),
            searched,
        })
    }
}
