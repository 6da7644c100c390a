//! Catalog configuration, loaded from TOML.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ProviderError, Result};
use crate::io::resolver::FsSchemaResolver;
use crate::types::Format;

/// Settings shared by everything that talks to the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Directories searched, in order, for `resource:` schema URIs.
    #[serde(default = "default_resource_roots")]
    pub resource_roots: Vec<PathBuf>,

    /// Namespace used when a command does not name one.
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Format for descriptors that do not set one.
    #[serde(default)]
    pub default_format: Format,

    /// Create external tables by default.
    #[serde(default)]
    pub external: bool,
}

fn default_resource_roots() -> Vec<PathBuf> {
    vec![PathBuf::from("resources")]
}

fn default_namespace() -> String {
    "default".to_string()
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            resource_roots: default_resource_roots(),
            namespace: default_namespace(),
            default_format: Format::default(),
            external: false,
        }
    }
}

impl CatalogConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| ProviderError::Config(e.to_string()).into())
    }

    /// Load from a file. Relative resource roots are resolved against the
    /// file's directory.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ProviderError::Config(format!("{}: {e}", path.display())))?;
        let mut config = Self::from_toml_str(&content)?;
        if let Some(base) = path.parent() {
            for root in &mut config.resource_roots {
                if root.is_relative() {
                    *root = base.join(&*root);
                }
            }
        }
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| ProviderError::Config(e.to_string()).into())
    }

    /// A filesystem resolver over the configured resource roots.
    pub fn resolver(&self) -> FsSchemaResolver {
        FsSchemaResolver::new(self.resource_roots.clone())
    }
}
