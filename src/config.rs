//! Model declarations loaded from a JSON file.
//!
//! ```json
//! {
//!   "database_path": "/tmp/docenum.db",
//!   "models": [
//!     {
//!       "name": "Build",
//!       "enumerables": [
//!         { "field": "status", "values": ["completed", "running", "failed", "waiting"],
//!           "default": "waiting", "prefix": "build_" }
//!       ]
//!     },
//!     { "name": "NightlyBuild", "parent": "Build" }
//!   ]
//! }
//! ```
//!
//! Hooks are code and cannot be declared here; attach them through the
//! library API.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::enumerable::{Enumerable, ScopeNaming};
use crate::models::{Model, ModelRegistry};

const APP_NAME: &str = "docenum";
const CONFIG_FILE: &str = "config.json";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Overrides the platform data directory for the document database.
    #[serde(default)]
    pub database_path: Option<PathBuf>,
    #[serde(default)]
    pub models: Vec<ModelConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    pub name: String,
    /// Defaults to the snake-cased plural of `name`, or the parent's collection.
    #[serde(default)]
    pub collection: Option<String>,
    /// A previously declared model this one derives from.
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default)]
    pub enumerables: Vec<EnumerableConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnumerableConfig {
    pub field: String,
    pub values: Vec<String>,
    #[serde(default)]
    pub default: Option<String>,
    #[serde(default)]
    pub prefix: Option<String>,
    #[serde(default)]
    pub scope_naming: ScopeNaming,
}

impl EnumerableConfig {
    pub fn to_declaration(&self) -> Enumerable {
        let mut declaration =
            Enumerable::new(&self.field, &self.values).scope_naming(self.scope_naming);
        if let Some(default) = &self.default {
            declaration = declaration.default_value(default);
        }
        if let Some(prefix) = &self.prefix {
            declaration = declaration.prefix(prefix.as_str());
        }
        declaration
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        serde_json::from_str(content).context("Failed to parse config file")
    }

    /// Load from the user's config directory. A missing file is an empty config.
    pub fn load_default() -> Result<Self> {
        let path = default_config_path()?;
        if !path.exists() {
            tracing::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        Self::load(&path)
    }

    /// Build every declared model. Parents must be declared before their subclasses.
    pub fn build_registry(&self) -> Result<ModelRegistry> {
        let mut registry = ModelRegistry::new();

        for model_config in &self.models {
            let mut model = match &model_config.parent {
                Some(parent) => registry
                    .require(parent)
                    .with_context(|| format!("Invalid parent for model {}", model_config.name))?
                    .subclass(model_config.name.as_str()),
                None => Model::new(model_config.name.as_str()),
            };
            if let Some(collection) = &model_config.collection {
                model = model.with_collection(collection.as_str());
            }

            for enumerable in &model_config.enumerables {
                model
                    .enumerable(enumerable.to_declaration())
                    .with_context(|| {
                        format!(
                            "Invalid enumerable {}.{}",
                            model_config.name, enumerable.field
                        )
                    })?;
            }

            registry.register(model)?;
        }

        Ok(registry)
    }
}

pub fn default_config_path() -> Result<PathBuf> {
    let dirs = directories::ProjectDirs::from("", "", APP_NAME)
        .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
    Ok(dirs.config_dir().join(CONFIG_FILE))
}
