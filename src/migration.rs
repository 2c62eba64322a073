//! Migrations and migration files.
//!
//! A migration is an ordered list of operations for `up` and for `down`.
//! Files are JSON or TOML:
//!
//! ```toml
//! [[up]]
//! createTable = { name = "users", columns = { id = "increments", email = "string:unique" } }
//!
//! [[down]]
//! dropTable = "users"
//! ```
//!
//! Migrations can also be built in code with [`Migrator`], which records
//! `raw` / `create_table` / `drop_table` calls into the same representation.

use std::fs;
use std::path::Path;

use chrono::{DateTime, TimeZone};
use serde::Deserialize;

use crate::error::{MigrateError, MigrateResult};
use crate::operation::{one_or_many, Columns, CreateTable, DropTable, Operation, Raw, SqlParam, TableOptions};

/// Required prefix of every migration identifier.
pub const PREFIX: &str = "lipgrade_";

/// Timestamp layout used in generated file names.
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

/// On-disk encoding of a migration file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationFormat {
    Json,
    Toml,
}

impl MigrationFormat {
    /// Format for a file name, by extension. `None` for files that are not migrations.
    pub fn from_file_name(name: &str) -> Option<Self> {
        let (_, ext) = name.rsplit_once('.')?;
        match ext {
            "json" => Some(Self::Json),
            "toml" => Some(Self::Toml),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Toml => "toml",
        }
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct MigrationFile {
    #[serde(deserialize_with = "one_or_many")]
    up: Vec<Operation>,
    #[serde(default, deserialize_with = "one_or_many")]
    down: Vec<Operation>,
}

/// A versioned schema change.
#[derive(Debug, Clone, PartialEq)]
pub struct Migration {
    id: String,
    up: Vec<Operation>,
    down: Vec<Operation>,
}

impl Migration {
    pub fn new(id: impl Into<String>, up: Vec<Operation>, down: Vec<Operation>) -> Self {
        Self {
            id: id.into(),
            up,
            down,
        }
    }

    /// Build a migration by recording calls against a [`Migrator`].
    ///
    /// ```
    /// use lipgrate::migration::Migration;
    /// use lipgrate::operation::TableOptions;
    ///
    /// let m = Migration::from_fn(
    ///     "lipgrade_20240101000000_users.rs",
    ///     |m| {
    ///         m.create_table("users", [("id", "increments")], TableOptions::default());
    ///     },
    ///     |m| {
    ///         m.drop_table("users");
    ///     },
    /// );
    /// assert_eq!(m.up().len(), 1);
    /// ```
    pub fn from_fn(
        id: impl Into<String>,
        up: impl FnOnce(&mut Migrator),
        down: impl FnOnce(&mut Migrator),
    ) -> Self {
        let mut up_rec = Migrator::default();
        up(&mut up_rec);
        let mut down_rec = Migrator::default();
        down(&mut down_rec);
        Self::new(id, up_rec.into_operations(), down_rec.into_operations())
    }

    /// Load a migration file. The identifier is the file name.
    pub fn load(path: &Path) -> MigrateResult<Self> {
        let id = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| MigrateError::MigrationLoad {
                file: path.display().to_string(),
                message: "file name is not valid UTF-8".to_string(),
            })?;

        let format = MigrationFormat::from_file_name(id).ok_or_else(|| MigrateError::MigrationLoad {
            file: id.to_string(),
            message: "expected a .json or .toml file".to_string(),
        })?;

        let source = fs::read_to_string(path).map_err(|e| MigrateError::MigrationLoad {
            file: id.to_string(),
            message: e.to_string(),
        })?;

        Self::parse(id, &source, format)
    }

    /// Parse migration source text.
    pub fn parse(id: &str, source: &str, format: MigrationFormat) -> MigrateResult<Self> {
        let load_error = |message: String| MigrateError::MigrationLoad {
            file: id.to_string(),
            message,
        };

        let file: MigrationFile = match format {
            MigrationFormat::Json => serde_json::from_str(source).map_err(|e| load_error(e.to_string()))?,
            MigrationFormat::Toml => toml::from_str(source).map_err(|e| load_error(e.to_string()))?,
        };

        Ok(Self::new(id, file.up, file.down))
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn up(&self) -> &[Operation] {
        &self.up
    }

    pub fn down(&self) -> &[Operation] {
        &self.down
    }

    /// Whether the identifier carries the required prefix.
    pub fn has_valid_name(&self) -> bool {
        is_valid_name(&self.id)
    }
}

pub fn is_valid_name(id: &str) -> bool {
    id.starts_with(PREFIX)
}

/// File name for a new migration: `lipgrade_<YYYYMMDDHHMMSS>_<name>.<ext>`.
pub fn file_name<Tz: TimeZone>(name: &str, at: &DateTime<Tz>, format: MigrationFormat) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format!(
        "{}{}_{}.{}",
        PREFIX,
        at.format(TIMESTAMP_FORMAT),
        name,
        format.extension()
    )
}

/// Records imperative migration calls as operations.
#[derive(Debug, Default)]
pub struct Migrator {
    operations: Vec<Operation>,
}

impl Migrator {
    /// Execute raw SQL with bound parameters.
    pub fn raw(&mut self, sql: impl Into<String>, params: Vec<SqlParam>) -> &mut Self {
        self.operation(Operation::Raw(Raw {
            sql: Some(sql.into()),
            params,
        }))
    }

    pub fn create_table<N, D>(
        &mut self,
        name: impl Into<String>,
        columns: impl IntoIterator<Item = (N, D)>,
        options: TableOptions,
    ) -> &mut Self
    where
        N: Into<String>,
        D: Into<String>,
    {
        self.operation(Operation::CreateTable(CreateTable {
            name: Some(name.into()),
            columns: columns.into_iter().collect::<Columns>(),
            options,
        }))
    }

    pub fn drop_table(&mut self, name: impl Into<String>) -> &mut Self {
        self.operation(Operation::DropTable(DropTable {
            name: Some(name.into()),
        }))
    }

    /// Record any declarative operation.
    pub fn operation(&mut self, op: Operation) -> &mut Self {
        self.operations.push(op);
        self
    }

    pub fn into_operations(self) -> Vec<Operation> {
        self.operations
    }
}
