//! Ledger SQL.
//!
//! The ledger is a one-column table holding the identifiers of applied
//! migrations. The identifier is the primary key, so it appears at most once.

use crate::dialect::Dialect;

/// Name of the ledger table.
pub const TABLE: &str = "lipgrate_migrations";

/// Name of the identifier column.
pub const COLUMN: &str = "migration";

/// Idempotent `CREATE TABLE` for the ledger.
pub fn create_table_sql(dialect: Dialect) -> String {
    let column_type = match dialect {
        Dialect::MySql | Dialect::Postgres => "VARCHAR(255)",
        Dialect::Sqlite => "TEXT",
    };
    format!(
        "CREATE TABLE IF NOT EXISTS {} ({} {} PRIMARY KEY)",
        TABLE, COLUMN, column_type
    )
}

/// Applied identifiers, ascending.
pub fn select_sql() -> String {
    format!("SELECT {} FROM {} ORDER BY {} ASC", COLUMN, TABLE, COLUMN)
}

pub fn insert_sql(dialect: Dialect) -> String {
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        TABLE,
        COLUMN,
        dialect.placeholder(1)
    )
}

pub fn delete_sql(dialect: Dialect) -> String {
    format!("DELETE FROM {} WHERE {} = {}", TABLE, COLUMN, dialect.placeholder(1))
}
