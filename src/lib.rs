//! # lipgrate
//!
//! Declarative, dialect-aware schema migrations for PostgreSQL, MySQL and
//! SQLite.
//!
//! Migrations are JSON or TOML files holding an ordered list of operations
//! for `up` and `down`. Columns are described with a compact
//! `type:modifier:modifier` mini-language that each dialect translates to its
//! own DDL.
//!
//! ## Quick Example
//!
//! ```
//! use lipgrate::prelude::*;
//!
//! let op: Operation = serde_json::from_str(
//!     r#"{"createTable": {"name": "users", "columns": {"id": "increments", "email": "string:notNullable:unique"}}}"#,
//! ).unwrap();
//!
//! let sql = lipgrate::translate(&op, Dialect::Sqlite).unwrap();
//! assert_eq!(
//!     sql,
//!     "CREATE TABLE IF NOT EXISTS users (id INTEGER PRIMARY KEY AUTOINCREMENT, email TEXT NOT NULL UNIQUE);"
//! );
//! ```
//!
//! ## Running migrations
//!
//! ```rust,ignore
//! let mut adapter = lipgrate::adapter::connect(Dialect::Postgres, &url).await?;
//! let catalog = Catalog::new("./migrations", Dialect::Postgres);
//! Runner::new(adapter.as_mut(), catalog).migrate().await?;
//! ```

pub mod adapter;
pub mod catalog;
pub mod column;
pub mod config;
pub mod describe;
pub mod dialect;
pub mod error;
pub mod ledger;
pub mod logger;
pub mod migration;
pub mod operation;
pub mod runner;
pub mod scaffold;
pub mod translator;

pub mod prelude {
    pub use crate::adapter::{Adapter, QueryOptions, QueryOutput};
    pub use crate::catalog::Catalog;
    pub use crate::config::{Config, MigrationsConfig};
    pub use crate::describe::describe;
    pub use crate::dialect::Dialect;
    pub use crate::error::*;
    pub use crate::migration::{Migration, Migrator};
    pub use crate::operation::{Operation, SqlParam};
    pub use crate::runner::{
        MigrateOutcome, MigrationStatus, RollbackOutcome, RunState, Runner, StatusEntry, StatusReport,
    };
    pub use crate::translator::{Statement, Translator};
}

/// Translate one operation into SQL for a dialect.
pub fn translate(op: &operation::Operation, dialect: dialect::Dialect) -> error::MigrateResult<String> {
    translator::translate(op, dialect)
}
