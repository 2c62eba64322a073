//! MySQL translator.

use super::{Required, Translator, TypeMapping, foreign_key_parts, referential_actions, unknown_type};
use crate::column::ColumnDef;
use crate::dialect::Dialect;
use crate::error::MigrateResult;
use crate::operation::*;

use TypeMapping::Literal;

/// Types whose parenthesized arguments are kept exactly as declared.
const TYPES_WITH_ARGS: &[&str] = &[
    "enum", "set", "char", "varchar", "decimal", "float", "double", "real", "bit", "binary",
    "varbinary",
];

/// Canonical type names. Lookup is case-sensitive.
const TYPES: &[(&str, TypeMapping)] = &[
    // Numeric
    ("increments", Literal("INT AUTO_INCREMENT PRIMARY KEY")),
    ("integer", Literal("INT")),
    ("bigInteger", Literal("BIGINT")),
    ("mediumInteger", Literal("MEDIUMINT")),
    ("smallInteger", Literal("SMALLINT")),
    ("tinyInteger", Literal("TINYINT")),
    ("decimal", Literal("DECIMAL")),
    ("float", Literal("FLOAT")),
    ("double", Literal("DOUBLE")),
    ("real", Literal("REAL")),
    ("bit", Literal("BIT")),
    ("boolean", Literal("TINYINT(1)")),
    ("serial", Literal("BIGINT UNSIGNED NOT NULL AUTO_INCREMENT UNIQUE")),
    // String
    ("string", Literal("VARCHAR(255)")),
    ("char", Literal("CHAR")),
    ("text", Literal("TEXT")),
    ("tinyText", Literal("TINYTEXT")),
    ("mediumText", Literal("MEDIUMTEXT")),
    ("longText", Literal("LONGTEXT")),
    ("set", Literal("SET")),
    // Date & time
    ("date", Literal("DATE")),
    ("time", Literal("TIME")),
    ("datetime", Literal("DATETIME")),
    ("timestamp", Literal("TIMESTAMP")),
    ("year", Literal("YEAR")),
    // Binary
    ("binary", Literal("BINARY")),
    ("varbinary", Literal("VARBINARY")),
    ("tinyBlob", Literal("TINYBLOB")),
    ("blob", Literal("BLOB")),
    ("mediumBlob", Literal("MEDIUMBLOB")),
    ("longBlob", Literal("LONGBLOB")),
    // JSON & UUID
    ("json", Literal("JSON")),
    ("uuid", Literal("CHAR(36)")),
];

pub struct MySqlTranslator;

impl Translator for MySqlTranslator {
    fn dialect(&self) -> Dialect {
        Dialect::MySql
    }

    fn resolve_type(&self, column: &ColumnDef<'_>) -> MigrateResult<String> {
        let lower = column.type_name.to_lowercase();
        if column.has_args() && TYPES_WITH_ARGS.contains(&lower.as_str()) {
            return Ok(column.type_def.to_string());
        }

        TYPES
            .iter()
            .find(|(name, _)| *name == column.type_name)
            .map(|(_, mapping)| mapping.render(&column.args()))
            .ok_or_else(|| unknown_type(column.type_name, TYPES))
    }

    fn timestamp_columns(&self) -> [&'static str; 2] {
        [
            "created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP",
            "updated_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP ON UPDATE CURRENT_TIMESTAMP",
        ]
    }

    fn rename_column(&self, op: &RenameColumn) -> MigrateResult<String> {
        let mut required = Required::new("renameColumn");
        let table = required.field("table", &op.table);
        let from = required.field("from", &op.from);
        let to = required.field("to", &op.to);
        let definition = required.field("definition", &op.definition);
        required.check()?;

        Ok(format!(
            "ALTER TABLE {} CHANGE COLUMN {} {} {};",
            table,
            from,
            to,
            self.column_sql(to, definition)?
        ))
    }

    fn alter_column(&self, op: &AlterColumn) -> MigrateResult<String> {
        let mut required = Required::new("alterColumn");
        let table = required.field("table", &op.table);
        let column = required.field("column", &op.column);
        let definition = required.field("definition", &op.definition);
        required.check()?;

        Ok(format!(
            "ALTER TABLE {} MODIFY COLUMN {} {};",
            table,
            column,
            self.column_sql(column, definition)?
        ))
    }

    fn drop_index(&self, op: &DropIndex) -> MigrateResult<String> {
        let mut required = Required::new("dropIndex");
        let table = required.field("table", &op.table);
        let name = required.field("name", &op.name);
        required.check()?;
        Ok(format!("DROP INDEX {} ON {};", name, table))
    }

    fn add_foreign_key(&self, op: &AddForeignKey) -> MigrateResult<String> {
        let fk = foreign_key_parts(op)?;
        Ok(format!(
            "ALTER TABLE {} ADD CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {}({}){};",
            fk.table,
            fk.name,
            fk.columns.join(", "),
            fk.ref_table,
            fk.ref_columns.join(", "),
            referential_actions(op)
        ))
    }

    fn drop_foreign_key(&self, op: &DropForeignKey) -> MigrateResult<String> {
        let mut required = Required::new("dropForeignKey");
        let table = required.field("table", &op.table);
        let name = required.field("name", &op.name);
        required.check()?;
        Ok(format!("ALTER TABLE {} DROP FOREIGN KEY {};", table, name))
    }
}
