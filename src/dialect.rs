//! Supported database dialects.

use std::fmt;
use std::str::FromStr;

use crate::error::MigrateError;

/// A target database's SQL variant.
///
/// Selected once per run from configuration; decides which translator and
/// which adapter are active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dialect {
    MySql,
    Postgres,
    Sqlite,
}

impl Dialect {
    pub const ALL: [Dialect; 3] = [Dialect::MySql, Dialect::Postgres, Dialect::Sqlite];

    /// Canonical client name, also used as the migrations subdirectory.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MySql => "mysql",
            Self::Postgres => "postgresql",
            Self::Sqlite => "sqlite",
        }
    }

    /// Human readable product name.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::MySql => "MySQL",
            Self::Postgres => "PostgreSQL",
            Self::Sqlite => "SQLite",
        }
    }

    /// Name of the per-dialect subdirectory under the migrations root.
    pub fn directory_name(&self) -> &'static str {
        self.as_str()
    }

    /// Positional parameter placeholder (1-based).
    pub fn placeholder(&self, index: usize) -> String {
        match self {
            Self::Postgres => format!("${}", index),
            Self::MySql | Self::Sqlite => "?".to_string(),
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Dialect {
    type Err = MigrateError;

    /// Accepts canonical names and the driver-style aliases (`pg`, `mysql2`, `sqlite3`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mysql" | "mysql2" => Ok(Self::MySql),
            "postgresql" | "postgres" | "pg" => Ok(Self::Postgres),
            "sqlite" | "sqlite3" => Ok(Self::Sqlite),
            other => Err(MigrateError::Configuration(format!(
                "Database client '{}' is not supported. Expected one of: mysql, postgresql, sqlite",
                other
            ))),
        }
    }
}
