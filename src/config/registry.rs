//! Registry of schema writers, keyed by schema name
//!
//! Owned by the application and populated explicitly during setup. Writers
//! produce `<dir>/<name>.schema.json` on demand.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};
use tracing::debug;

use crate::config::error::SchemaSaveError;
use crate::config::schema::{write_schema, ConfigSchema};

pub type SchemaWriter = Box<dyn Fn(&Path) -> Result<PathBuf, SchemaSaveError> + Send + Sync>;

#[derive(Default)]
pub struct SchemaRegistry {
    writers: RwLock<BTreeMap<String, SchemaWriter>>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `T` under its schema name. Returns `false` if the name was
    /// already registered, in which case the existing writer is kept.
    pub fn register<T: ConfigSchema + 'static>(&self) -> bool {
        self.register_writer(T::config_name(), Box::new(|dir: &Path| write_schema::<T>(dir)))
    }

    /// Register a writer under `name`; the first registration wins.
    pub fn register_writer(&self, name: impl Into<String>, writer: SchemaWriter) -> bool {
        let name = name.into();
        let mut writers = self.writers.write().unwrap_or_else(PoisonError::into_inner);

        if writers.contains_key(&name) {
            debug!(schema = %name, "Schema already registered");
            return false;
        }

        debug!(schema = %name, "Registering schema");
        writers.insert(name, writer);
        true
    }

    pub fn contains(&self, name: &str) -> bool {
        self.writers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }

    /// Registered schema names, sorted
    pub fn names(&self) -> Vec<String> {
        self.writers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.writers.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Write the schema registered as `name` into `dir`
    pub fn write_named(&self, dir: &Path, name: &str) -> Result<PathBuf, SchemaSaveError> {
        let writers = self.writers.read().unwrap_or_else(PoisonError::into_inner);
        let writer = writers.get(name).ok_or_else(|| SchemaSaveError::UnknownSchema {
            name: name.to_string(),
        })?;
        writer(dir)
    }

    /// Write every registered schema into `dir`, creating it first
    pub fn write_all(&self, dir: &Path) -> Result<Vec<PathBuf>, SchemaSaveError> {
        fs::create_dir_all(dir).map_err(|source| SchemaSaveError::Io {
            path: dir.to_path_buf(),
            source,
        })?;

        let writers = self.writers.read().unwrap_or_else(PoisonError::into_inner);
        writers.values().map(|writer| writer(dir)).collect()
    }
}

impl fmt::Debug for SchemaRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaRegistry")
            .field("schemas", &self.names())
            .finish()
    }
}
