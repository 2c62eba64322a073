//! SQLite translator.
//!
//! SQLite stores values by type affinity, so every known type name collapses
//! to one of `INTEGER`, `TEXT`, `BLOB`, `REAL` or `NUMERIC`. Names outside the
//! table are rejected with a suggestion, as in MySQL.

use super::{Required, Translator, TypeMapping, apply_modifiers, unknown_type};
use crate::column::{parse_column, ColumnDef};
use crate::dialect::Dialect;
use crate::error::{MigrateError, MigrateResult};
use crate::operation::*;

use TypeMapping::Literal;

/// Canonical type names. Lookup is case-insensitive.
const TYPES: &[(&str, TypeMapping)] = &[
    ("increments", Literal("INTEGER PRIMARY KEY AUTOINCREMENT")),
    ("integer", Literal("INTEGER")),
    ("int", Literal("INTEGER")),
    ("bigint", Literal("INTEGER")),
    ("smallint", Literal("INTEGER")),
    ("tinyint", Literal("INTEGER")),
    ("string", Literal("TEXT")),
    ("text", Literal("TEXT")),
    ("varchar", Literal("TEXT")),
    ("char", Literal("TEXT")),
    ("clob", Literal("TEXT")),
    ("json", Literal("TEXT")),
    ("uuid", Literal("TEXT")),
    ("timestamp", Literal("TEXT")),
    ("blob", Literal("BLOB")),
    ("binary", Literal("BLOB")),
    ("real", Literal("REAL")),
    ("float", Literal("REAL")),
    ("double", Literal("REAL")),
    ("numeric", Literal("NUMERIC")),
    ("decimal", Literal("NUMERIC")),
    ("boolean", Literal("NUMERIC")),
    ("date", Literal("NUMERIC")),
    ("datetime", Literal("NUMERIC")),
    ("enum", Literal("TEXT")),
];

const FOREIGN_KEY_REASON: &str = "Foreign keys must be defined during table creation.";
const DROP_FOREIGN_KEY_REASON: &str = "To drop a foreign key, you must recreate the table.";
const ALTER_COLUMN_REASON: &str = "Please create a new migration to manage column changes.";

pub struct SqliteTranslator;

impl SqliteTranslator {
    fn unsupported_because(&self, operation: &str, reason: &'static str) -> MigrateError {
        MigrateError::UnsupportedOperation {
            operation: operation.to_string(),
            dialect: Dialect::Sqlite,
            reason: Some(reason),
        }
    }
}

impl Translator for SqliteTranslator {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    fn resolve_type(&self, column: &ColumnDef<'_>) -> MigrateResult<String> {
        TYPES
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(column.type_name))
            .map(|(_, mapping)| mapping.render(&[]))
            .ok_or_else(|| unknown_type(column.type_name, TYPES))
    }

    fn timestamp_columns(&self) -> [&'static str; 2] {
        [
            "created_at TEXT DEFAULT (datetime('now', 'localtime'))",
            "updated_at TEXT DEFAULT (datetime('now', 'localtime'))",
        ]
    }

    /// Enums become `TEXT` with a trailing `CHECK(col IN (...))`.
    fn column_sql(&self, name: &str, definition: &str) -> MigrateResult<String> {
        let column = parse_column(definition)?;
        let base = self.resolve_type(&column)?;
        let mut sql = apply_modifiers(base, &column.modifiers, Dialect::Sqlite);

        if column.type_name.eq_ignore_ascii_case("enum") {
            if let Some(values) = column.type_args {
                sql.push_str(&format!(" CHECK({} IN ({}))", name, values));
            }
        }
        Ok(sql)
    }

    fn rename_column(&self, op: &RenameColumn) -> MigrateResult<String> {
        let mut required = Required::new("renameColumn");
        let table = required.field("table", &op.table);
        let from = required.field("from", &op.from);
        let to = required.field("to", &op.to);
        required.check()?;
        Ok(format!("ALTER TABLE {} RENAME COLUMN {} TO {};", table, from, to))
    }

    fn alter_column(&self, _op: &AlterColumn) -> MigrateResult<String> {
        Err(self.unsupported_because("alterColumn", ALTER_COLUMN_REASON))
    }

    fn drop_index(&self, op: &DropIndex) -> MigrateResult<String> {
        let mut required = Required::new("dropIndex");
        let name = required.field("name", &op.name);
        required.check()?;
        Ok(format!("DROP INDEX IF EXISTS {};", name))
    }

    fn add_foreign_key(&self, _op: &AddForeignKey) -> MigrateResult<String> {
        Err(self.unsupported_because("addForeignKey", FOREIGN_KEY_REASON))
    }

    fn drop_foreign_key(&self, _op: &DropForeignKey) -> MigrateResult<String> {
        Err(self.unsupported_because("dropForeignKey", DROP_FOREIGN_KEY_REASON))
    }
}
