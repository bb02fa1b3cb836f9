//! Application Catalog
//!
//! The scheduler does not know how applications get onto the device. It
//! consumes an [`AppCatalog`] that can list what is installed and build a
//! fresh instance on demand. The terminal host ships a [`StaticCatalog`] of
//! compiled-in applications; a plugin loader would be another implementation
//! of the same trait.
//!
//! Every entry carries an [`AppManifest`], the JSON metadata file shipped
//! next to an application:
//!
//! ```json
//! { "name": "Timer", "author": "MatrixOS", "version": "1.0.0",
//!   "description": "Countdown timer" }
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::app::Application;

/// Errors raised by catalogs
#[derive(Debug, Error)]
pub enum CatalogError {
    /// No application with this ID is installed
    #[error("Unknown application: {0}")]
    UnknownApp(String),

    /// The application's factory failed
    #[error("Failed to start {id}: {source:#}")]
    Instantiate {
        /// Catalog ID
        id: String,
        /// Factory error
        source: anyhow::Error,
    },

    /// The manifest could not be parsed
    #[error("Invalid app manifest: {0}")]
    Manifest(#[from] serde_json::Error),

    /// Two entries share an ID
    #[error("Duplicate application id: {0}")]
    Duplicate(String),
}

fn default_author() -> String {
    "Unknown".to_string()
}

fn default_version() -> String {
    "1.0.0".to_string()
}

/// Application metadata
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppManifest {
    /// Display name
    pub name: String,
    /// Author
    #[serde(default = "default_author")]
    pub author: String,
    /// Version string
    #[serde(default = "default_version")]
    pub version: String,
    /// One-line description
    #[serde(default)]
    pub description: String,
}

impl AppManifest {
    /// Manifest with only a name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            author: default_author(),
            version: default_version(),
            description: String::new(),
        }
    }

    /// Parse a manifest from JSON
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or has no `name`.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        Ok(serde_json::from_str(json)?)
    }
}

/// A catalog entry as shown to launchers
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppDescriptor {
    /// Stable catalog ID (used with [`AppCatalog::instantiate`])
    pub id: String,
    /// Metadata
    pub manifest: AppManifest,
}

/// Source of installable applications
pub trait AppCatalog {
    /// Everything that can be launched, in display order
    fn list_available(&self) -> Vec<AppDescriptor>;

    /// Build a new instance of `id`
    ///
    /// # Errors
    ///
    /// Returns an error if `id` is unknown or the application fails to start.
    fn instantiate(&self, id: &str) -> Result<Box<dyn Application>, CatalogError>;
}

type Factory = Box<dyn Fn() -> anyhow::Result<Box<dyn Application>>>;

struct CatalogEntry {
    descriptor: AppDescriptor,
    factory: Factory,
}

/// Catalog of compiled-in applications
#[derive(Default)]
pub struct StaticCatalog {
    entries: Vec<CatalogEntry>,
}

impl StaticCatalog {
    /// Create an empty catalog
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an application
    ///
    /// # Errors
    ///
    /// Returns an error if `id` is already taken.
    pub fn register<F>(&mut self, id: impl Into<String>, manifest: AppManifest, factory: F) -> Result<(), CatalogError>
    where
        F: Fn() -> anyhow::Result<Box<dyn Application>> + 'static,
    {
        let id = id.into();
        if self.entries.iter().any(|e| e.descriptor.id == id) {
            return Err(CatalogError::Duplicate(id));
        }
        tracing::debug!(app = %id, name = %manifest.name, "Catalog entry added");
        self.entries.push(CatalogEntry {
            descriptor: AppDescriptor { id, manifest },
            factory: Box::new(factory),
        });
        Ok(())
    }

    /// Add an application described by a JSON manifest
    ///
    /// # Errors
    ///
    /// Returns an error if the manifest is invalid or `id` is taken.
    pub fn register_json<F>(&mut self, id: impl Into<String>, manifest_json: &str, factory: F) -> Result<(), CatalogError>
    where
        F: Fn() -> anyhow::Result<Box<dyn Application>> + 'static,
    {
        let manifest = AppManifest::from_json(manifest_json)?;
        self.register(id, manifest, factory)
    }

    /// Number of entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the catalog is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl AppCatalog for StaticCatalog {
    fn list_available(&self) -> Vec<AppDescriptor> {
        self.entries.iter().map(|e| e.descriptor.clone()).collect()
    }

    fn instantiate(&self, id: &str) -> Result<Box<dyn Application>, CatalogError> {
        let entry = self
            .entries
            .iter()
            .find(|e| e.descriptor.id == id)
            .ok_or_else(|| CatalogError::UnknownApp(id.to_string()))?;

        (entry.factory)().map_err(|source| CatalogError::Instantiate {
            id: id.to_string(),
            source,
        })
    }
}
