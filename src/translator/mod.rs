//! Operation to SQL translation.
//!
//! Each dialect implements [`Translator`]. The trait carries the statement
//! shapes the dialects share as default methods; a dialect overrides the ones
//! it spells differently and the ones it cannot express at all.

mod mysql;
mod postgres;
mod sqlite;

pub use mysql::MySqlTranslator;
pub use postgres::PostgresTranslator;
pub use sqlite::SqliteTranslator;

use strsim::levenshtein;

use crate::column::{parse_column, ColumnDef, DefaultValue, Modifiers};
use crate::dialect::Dialect;
use crate::error::{MigrateError, MigrateResult};
use crate::operation::*;

/// A translated statement ready for an adapter.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<SqlParam>,
}

/// How a canonical type name maps to SQL.
#[derive(Clone, Copy)]
pub enum TypeMapping {
    /// A fixed SQL fragment.
    Literal(&'static str),
    /// Built from the declared type arguments.
    Build(fn(&[&str]) -> String),
}

impl TypeMapping {
    fn render(&self, args: &[&str]) -> String {
        match self {
            Self::Literal(sql) => sql.to_string(),
            Self::Build(build) => build(args),
        }
    }
}

/// Maximum edit distance for a "Did you mean" suggestion.
const SUGGESTION_DISTANCE: usize = 3;

/// Closest candidate to `type_name` by case-insensitive edit distance.
///
/// Ties keep the earliest candidate.
pub fn suggest<'a>(type_name: &str, candidates: impl IntoIterator<Item = &'a str>) -> Option<String> {
    let wanted = type_name.to_lowercase();
    let mut best: Option<(&str, usize)> = None;

    for candidate in candidates {
        let distance = levenshtein(&wanted, &candidate.to_lowercase());
        if best.is_none_or(|(_, min)| distance < min) {
            best = Some((candidate, distance));
        }
    }

    best.filter(|(_, distance)| *distance <= SUGGESTION_DISTANCE)
        .map(|(candidate, _)| candidate.to_string())
}

/// The error for a type name a dialect does not know.
pub(crate) fn unknown_type(type_name: &str, table: &[(&'static str, TypeMapping)]) -> MigrateError {
    MigrateError::UnknownType {
        type_name: type_name.to_string(),
        suggestion: suggest(type_name, table.iter().map(|(name, _)| *name)),
    }
}

/// Collects missing required fields for one operation.
pub(crate) struct Required {
    operation: &'static str,
    missing: Vec<&'static str>,
}

impl Required {
    pub fn new(operation: &'static str) -> Self {
        Self {
            operation,
            missing: Vec::new(),
        }
    }

    /// A required text field; empty counts as missing.
    pub fn field<'a>(&mut self, name: &'static str, value: &'a Option<String>) -> &'a str {
        match value.as_deref() {
            Some(v) if !v.trim().is_empty() => v,
            _ => {
                self.missing.push(name);
                ""
            }
        }
    }

    /// A required non-empty list.
    pub fn list<'a>(&mut self, name: &'static str, values: &'a [String]) -> &'a [String] {
        if values.is_empty() {
            self.missing.push(name);
        }
        values
    }

    pub fn check(self) -> MigrateResult<()> {
        if self.missing.is_empty() {
            Ok(())
        } else {
            Err(MigrateError::schema(self.operation, self.missing))
        }
    }
}

/// Append modifiers in the fixed order `NOT NULL`, `UNIQUE`, `PRIMARY KEY`, `DEFAULT`.
///
/// `PRIMARY KEY` is not repeated when the base type already carries it.
pub(crate) fn apply_modifiers(mut sql: String, modifiers: &Modifiers<'_>, dialect: Dialect) -> String {
    if modifiers.not_nullable {
        sql.push_str(" NOT NULL");
    }
    if modifiers.unique {
        sql.push_str(" UNIQUE");
    }
    if modifiers.primary && !sql.contains("PRIMARY KEY") {
        sql.push_str(" PRIMARY KEY");
    }
    if let Some(default) = &modifiers.default {
        sql.push_str(" DEFAULT ");
        sql.push_str(&default_literal(default, dialect));
    }
    sql
}

fn default_literal(default: &DefaultValue<'_>, dialect: Dialect) -> String {
    match (dialect, default) {
        (Dialect::Sqlite, DefaultValue::Boolean(true, _)) => "1".to_string(),
        (Dialect::Sqlite, DefaultValue::Boolean(false, _)) => "0".to_string(),
        _ => default.to_sql(),
    }
}

/// `ON DELETE` / `ON UPDATE` clauses, upper-cased.
pub(crate) fn referential_actions(fk: &AddForeignKey) -> String {
    let mut sql = String::new();
    if let Some(action) = fk.on_delete.as_deref().filter(|a| !a.is_empty()) {
        sql.push_str(" ON DELETE ");
        sql.push_str(&action.to_uppercase());
    }
    if let Some(action) = fk.on_update.as_deref().filter(|a| !a.is_empty()) {
        sql.push_str(" ON UPDATE ");
        sql.push_str(&action.to_uppercase());
    }
    sql
}

/// Trait for converting operations to one dialect's SQL.
///
/// Implementations are stateless.
pub trait Translator: Send + Sync {
    fn dialect(&self) -> Dialect;

    /// Resolve the SQL type for a parsed column, without modifiers.
    fn resolve_type(&self, column: &ColumnDef<'_>) -> MigrateResult<String>;

    /// The two columns appended by `options.timestamps`.
    fn timestamp_columns(&self) -> [&'static str; 2];

    /// SQL for one column definition (type plus modifiers).
    fn column_sql(&self, _name: &str, definition: &str) -> MigrateResult<String> {
        let column = parse_column(definition)?;
        let base = self.resolve_type(&column)?;
        Ok(apply_modifiers(base, &column.modifiers, self.dialect()))
    }

    fn unsupported(&self, operation: &str) -> MigrateError {
        MigrateError::unsupported(operation, self.dialect())
    }

    fn create_table(&self, op: &CreateTable) -> MigrateResult<String> {
        let mut required = Required::new("createTable");
        let name = required.field("name", &op.name);
        if op.columns.is_empty() {
            required.missing.push("columns");
        }
        required.check()?;

        let mut columns = op
            .columns
            .iter()
            .map(|(column, definition)| -> MigrateResult<String> {
                Ok(format!("{} {}", column, self.column_sql(column, definition)?))
            })
            .collect::<MigrateResult<Vec<String>>>()?;

        if op.options.timestamps {
            columns.extend(self.timestamp_columns().iter().map(|c| c.to_string()));
        }

        Ok(format!("CREATE TABLE IF NOT EXISTS {} ({});", name, columns.join(", ")))
    }

    fn drop_table(&self, op: &DropTable) -> MigrateResult<String> {
        let mut required = Required::new("dropTable");
        let name = required.field("name", &op.name);
        required.check()?;
        Ok(format!("DROP TABLE IF EXISTS {};", name))
    }

    fn rename_table(&self, op: &RenameTable) -> MigrateResult<String> {
        let mut required = Required::new("renameTable");
        let from = required.field("from", &op.from);
        let to = required.field("to", &op.to);
        required.check()?;
        Ok(format!("ALTER TABLE {} RENAME TO {};", from, to))
    }

    fn add_column(&self, op: &AddColumn) -> MigrateResult<String> {
        let mut required = Required::new("addColumn");
        let table = required.field("table", &op.table);
        let column = required.field("column", &op.column);
        let definition = required.field("definition", &op.definition);
        required.check()?;
        Ok(format!(
            "ALTER TABLE {} ADD COLUMN {} {};",
            table,
            column,
            self.column_sql(column, definition)?
        ))
    }

    fn drop_column(&self, op: &DropColumn) -> MigrateResult<String> {
        let mut required = Required::new("dropColumn");
        let table = required.field("table", &op.table);
        let column = required.field("column", &op.column);
        required.check()?;
        Ok(format!("ALTER TABLE {} DROP COLUMN {};", table, column))
    }

    fn rename_column(&self, op: &RenameColumn) -> MigrateResult<String>;

    fn alter_column(&self, _op: &AlterColumn) -> MigrateResult<String> {
        Err(self.unsupported("alterColumn"))
    }

    fn add_index(&self, op: &AddIndex) -> MigrateResult<String> {
        let mut required = Required::new("addIndex");
        let table = required.field("table", &op.table);
        let columns = required.list("columns", &op.columns);
        let name = required.field("name", &op.name);
        required.check()?;

        let unique = if op.is_unique() { "UNIQUE " } else { "" };
        Ok(format!(
            "CREATE {}INDEX {} ON {} ({});",
            unique,
            name,
            table,
            columns.join(", ")
        ))
    }

    fn drop_index(&self, op: &DropIndex) -> MigrateResult<String>;

    fn add_foreign_key(&self, _op: &AddForeignKey) -> MigrateResult<String> {
        Err(self.unsupported("addForeignKey"))
    }

    fn drop_foreign_key(&self, _op: &DropForeignKey) -> MigrateResult<String> {
        Err(self.unsupported("dropForeignKey"))
    }

    fn raw(&self, op: &Raw) -> MigrateResult<String> {
        let mut required = Required::new("raw");
        let sql = required.field("sql", &op.sql);
        required.check()?;
        Ok(sql.to_string())
    }

    /// Translate one operation into one SQL statement.
    fn translate(&self, op: &Operation) -> MigrateResult<String> {
        match op {
            Operation::CreateTable(op) => self.create_table(op),
            Operation::DropTable(op) => self.drop_table(op),
            Operation::RenameTable(op) => self.rename_table(op),
            Operation::AddColumn(op) => self.add_column(op),
            Operation::DropColumn(op) => self.drop_column(op),
            Operation::RenameColumn(op) => self.rename_column(op),
            Operation::AlterColumn(op) => self.alter_column(op),
            Operation::AddIndex(op) => self.add_index(op),
            Operation::DropIndex(op) => self.drop_index(op),
            Operation::AddForeignKey(op) => self.add_foreign_key(op),
            Operation::DropForeignKey(op) => self.drop_foreign_key(op),
            Operation::Raw(op) => self.raw(op),
            Operation::Unknown(name) => Err(self.unsupported(name)),
        }
    }
}

/// Foreign-key fields every dialect requires.
pub(crate) struct ForeignKeyParts<'a> {
    pub table: &'a str,
    pub name: &'a str,
    pub columns: &'a [String],
    pub ref_table: &'a str,
    pub ref_columns: &'a [String],
}

pub(crate) fn foreign_key_parts(op: &AddForeignKey) -> MigrateResult<ForeignKeyParts<'_>> {
    let mut required = Required::new("addForeignKey");
    let table = required.field("table", &op.table);
    let columns = required.list("columns", &op.columns);
    let name = required.field("name", &op.name);
    let (ref_table, ref_columns): (&str, &[String]) = match &op.references {
        Some(references) => (
            required.field("references.table", &references.table),
            required.list("references.columns", &references.columns),
        ),
        None => {
            required.missing.push("references.table");
            required.missing.push("references.columns");
            ("", &[])
        }
    };
    required.check()?;

    Ok(ForeignKeyParts {
        table,
        name,
        columns,
        ref_table,
        ref_columns,
    })
}

/// The translator for a dialect.
pub fn translator(dialect: Dialect) -> &'static dyn Translator {
    match dialect {
        Dialect::MySql => &MySqlTranslator,
        Dialect::Postgres => &PostgresTranslator,
        Dialect::Sqlite => &SqliteTranslator,
    }
}

/// Translate an operation for the given dialect.
pub fn translate(op: &Operation, dialect: Dialect) -> MigrateResult<String> {
    translator(dialect).translate(op)
}

/// Translate an operation into a statement, carrying raw parameters along.
pub fn statement(op: &Operation, dialect: Dialect) -> MigrateResult<Statement> {
    let sql = translate(op, dialect)?;
    let params = match op {
        Operation::Raw(raw) => raw.params.clone(),
        _ => Vec::new(),
    };
    Ok(Statement { sql, params })
}
