//! Migration discovery.
//!
//! Migrations for a dialect live in `<root>/<dialect>/` (`mysql`, `postgresql`,
//! `sqlite`). Only `.json` and `.toml` files are candidates; anything else in
//! the directory (`*.toml.example`, READMEs) is ignored. Migrations built in
//! code can be registered alongside the files and are sorted, validated and
//! executed the same way.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::dialect::Dialect;
use crate::error::{MigrateError, MigrateResult};
use crate::migration::{self, Migration, MigrationFormat};

/// The set of migrations available to one dialect.
#[derive(Debug, Clone)]
pub struct Catalog {
    dialect: Dialect,
    root: Option<PathBuf>,
    registered: HashMap<String, Migration>,
}

impl Catalog {
    /// A catalog backed by the migrations root directory.
    pub fn new(root: impl Into<PathBuf>, dialect: Dialect) -> Self {
        Self {
            dialect,
            root: Some(root.into()),
            registered: HashMap::new(),
        }
    }

    /// A catalog with no directory; only registered migrations exist.
    pub fn in_memory(dialect: Dialect) -> Self {
        Self {
            dialect,
            root: None,
            registered: HashMap::new(),
        }
    }

    /// Register an in-code migration.
    pub fn register(mut self, migration: Migration) -> Self {
        self.registered.insert(migration.id().to_string(), migration);
        self
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// `<root>/<dialect>`, when backed by a directory.
    pub fn directory(&self) -> Option<PathBuf> {
        self.root
            .as_ref()
            .map(|root| root.join(self.dialect.directory_name()))
    }

    /// All migration identifiers, ascending.
    ///
    /// Every identifier is checked against the naming convention before any is
    /// returned. A missing directory yields no file migrations; it is created
    /// when `create_missing` is set.
    pub fn discover(&self, create_missing: bool) -> MigrateResult<Vec<String>> {
        let mut ids: Vec<String> = self.registered.keys().cloned().collect();

        if let Some(dir) = self.directory() {
            if dir.is_dir() {
                for id in list_candidates(&dir)? {
                    if self.registered.contains_key(&id) {
                        return Err(MigrateError::Configuration(format!(
                            "Migration '{}' is registered in code and also exists in {}",
                            id,
                            dir.display()
                        )));
                    }
                    ids.push(id);
                }
            } else if create_missing {
                fs::create_dir_all(&dir)?;
                tracing::info!(directory = %dir.display(), "created migration directory");
            }
        }

        ids.sort();

        if let Some(bad) = ids.iter().find(|id| !migration::is_valid_name(id)) {
            return Err(MigrateError::NamingConvention { file: bad.clone() });
        }

        Ok(ids)
    }

    /// Load one migration by identifier.
    pub fn load(&self, id: &str) -> MigrateResult<Migration> {
        if let Some(migration) = self.registered.get(id) {
            return Ok(migration.clone());
        }

        match self.directory() {
            Some(dir) if dir.join(id).is_file() => Migration::load(&dir.join(id)),
            _ => Err(MigrateError::MissingMigration(id.to_string())),
        }
    }
}

fn list_candidates(dir: &Path) -> MigrateResult<Vec<String>> {
    let mut ids = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let Some(name) = entry.file_name().to_str().map(str::to_string) else {
            continue;
        };
        if MigrationFormat::from_file_name(&name).is_some() {
            ids.push(name);
        }
    }
    Ok(ids)
}
