//! Named Table Registry
//!
//! Tables are created and looked up by name. Creation checks and inserts under
//! a single write lock, so two racing creators of the same name cannot both
//! succeed.

use crate::config::TableConfig;
use crate::error::{Result, TableError};
use crate::storage::table::Table;
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::sync::Arc;
use tracing::info;

static GLOBAL: Lazy<Registry> = Lazy::new(Registry::new);

/// Returns the process-wide registry.
pub fn global() -> &'static Registry {
    &GLOBAL
}

/// A set of tables addressed by name.
#[derive(Debug, Default)]
pub struct Registry {
    tables: RwLock<FxHashMap<String, Arc<Table>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a table with the default configuration.
    ///
    /// Fails with [`TableError::AlreadyExists`] if the name is taken.
    pub fn create(&self, name: &str, key_position: usize) -> Result<Arc<Table>> {
        self.create_with_config(name, key_position, TableConfig::default())
    }

    /// Creates a table with a custom configuration.
    pub fn create_with_config(
        &self,
        name: &str,
        key_position: usize,
        config: TableConfig,
    ) -> Result<Arc<Table>> {
        config.validate()?;

        let mut tables = self.tables.write();
        if tables.contains_key(name) {
            return Err(TableError::AlreadyExists(name.to_string()));
        }
        let table = Arc::new(Table::with_config(name, key_position, config)?);
        tables.insert(name.to_string(), Arc::clone(&table));
        Ok(table)
    }

    /// Looks up a table by name.
    pub fn get(&self, name: &str) -> Result<Arc<Table>> {
        self.tables
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| TableError::NotFound(name.to_string()))
    }

    /// Forgets a table. Its threads stop once the last handle is dropped.
    pub fn remove(&self, name: &str) -> Result<Arc<Table>> {
        let table = self
            .tables
            .write()
            .remove(name)
            .ok_or_else(|| TableError::NotFound(name.to_string()))?;
        info!(table = %name, "Table removed from registry");
        Ok(table)
    }

    /// Names of all registered tables, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tables.read().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.tables.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.read().is_empty()
    }
}
