//! PostgreSQL translator.
//!
//! Type names missing from the table are passed through upper-cased, so any
//! native PostgreSQL type (`citext`, `int4range`, ...) can be declared.

use super::{Required, Translator, TypeMapping, foreign_key_parts, referential_actions};
use crate::column::ColumnDef;
use crate::dialect::Dialect;
use crate::error::MigrateResult;
use crate::operation::*;

use TypeMapping::{Build, Literal};

fn arg<'a>(args: &[&'a str], index: usize) -> Option<&'a str> {
    args.get(index).copied().filter(|a| !a.is_empty())
}

/// `NAME(n)` when an argument is given, `NAME` otherwise.
fn sized(name: &str, args: &[&str]) -> String {
    match arg(args, 0) {
        Some(n) => format!("{}({})", name, n),
        None => name.to_string(),
    }
}

/// `NAME(p)` / `NAME(p) WITH TIME ZONE`.
fn with_precision(name: &str, args: &[&str], tz: bool) -> String {
    let base = sized(name, args);
    if tz {
        format!("{} WITH TIME ZONE", base)
    } else {
        base
    }
}

fn exact(name: &str, args: &[&str]) -> String {
    format!(
        "{}({},{})",
        name,
        arg(args, 0).unwrap_or("10"),
        arg(args, 1).unwrap_or("2")
    )
}

const TYPES: &[(&str, TypeMapping)] = &[
    // Shorthands
    ("increments", Literal("SERIAL PRIMARY KEY")),
    ("string", Build(|args| format!("VARCHAR({})", arg(args, 0).unwrap_or("255")))),
    ("binary", Literal("BYTEA")),
    ("datetime", Literal("TIMESTAMP")),
    // Numeric
    ("smallint", Literal("SMALLINT")),
    ("int2", Literal("SMALLINT")),
    ("integer", Literal("INTEGER")),
    ("int", Literal("INTEGER")),
    ("int4", Literal("INTEGER")),
    ("bigint", Literal("BIGINT")),
    ("int8", Literal("BIGINT")),
    ("decimal", Build(|args| exact("DECIMAL", args))),
    ("numeric", Build(|args| exact("NUMERIC", args))),
    ("real", Literal("REAL")),
    ("float4", Literal("REAL")),
    ("double", Literal("DOUBLE PRECISION")),
    ("float8", Literal("DOUBLE PRECISION")),
    ("smallserial", Literal("SMALLSERIAL")),
    ("serial2", Literal("SMALLSERIAL")),
    ("serial", Literal("SERIAL")),
    ("serial4", Literal("SERIAL")),
    ("bigserial", Literal("BIGSERIAL")),
    ("serial8", Literal("BIGSERIAL")),
    ("money", Literal("MONEY")),
    // Character
    ("varchar", Build(|args| sized("VARCHAR", args))),
    ("char", Build(|args| sized("CHAR", args))),
    ("text", Literal("TEXT")),
    ("bytea", Literal("BYTEA")),
    // Date & time
    ("timestamp", Build(|args| with_precision("TIMESTAMP", args, false))),
    ("timestamptz", Build(|args| with_precision("TIMESTAMP", args, true))),
    ("date", Literal("DATE")),
    ("time", Build(|args| with_precision("TIME", args, false))),
    ("timetz", Build(|args| with_precision("TIME", args, true))),
    ("interval", Literal("INTERVAL")),
    ("boolean", Literal("BOOLEAN")),
    ("bool", Literal("BOOLEAN")),
    // Bit strings
    ("bit", Build(|args| sized("BIT", args))),
    ("varbit", Build(|args| sized("VARBIT", args))),
    // Text search
    ("tsvector", Literal("TSVECTOR")),
    ("tsquery", Literal("TSQUERY")),
    ("uuid", Literal("UUID")),
    ("xml", Literal("XML")),
    ("json", Literal("JSON")),
    ("jsonb", Literal("JSONB")),
    // Geometric
    ("point", Literal("POINT")),
    ("line", Literal("LINE")),
    ("lseg", Literal("LSEG")),
    ("box", Literal("BOX")),
    ("path", Literal("PATH")),
    ("polygon", Literal("POLYGON")),
    ("circle", Literal("CIRCLE")),
    // Network
    ("cidr", Literal("CIDR")),
    ("inet", Literal("INET")),
    ("macaddr", Literal("MACADDR")),
    ("macaddr8", Literal("MACADDR8")),
    ("pg_lsn", Literal("PG_LSN")),
    ("pg_snapshot", Literal("PG_SNAPSHOT")),
    ("txid_snapshot", Literal("TXID_SNAPSHOT")),
];

/// Double-quote an identifier.
fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn quote_list(names: &[String]) -> String {
    names.iter().map(|n| quote_ident(n)).collect::<Vec<_>>().join(", ")
}

pub struct PostgresTranslator;

impl Translator for PostgresTranslator {
    fn dialect(&self) -> Dialect {
        Dialect::Postgres
    }

    fn resolve_type(&self, column: &ColumnDef<'_>) -> MigrateResult<String> {
        Ok(TYPES
            .iter()
            .find(|(name, _)| *name == column.type_name)
            .map(|(_, mapping)| mapping.render(&column.args()))
            .unwrap_or_else(|| column.type_def.to_uppercase()))
    }

    fn timestamp_columns(&self) -> [&'static str; 2] {
        [
            "created_at TIMESTAMPTZ DEFAULT CURRENT_TIMESTAMP",
            "updated_at TIMESTAMPTZ DEFAULT CURRENT_TIMESTAMP",
        ]
    }

    fn rename_column(&self, op: &RenameColumn) -> MigrateResult<String> {
        let mut required = Required::new("renameColumn");
        let table = required.field("table", &op.table);
        let from = required.field("from", &op.from);
        let to = required.field("to", &op.to);
        required.check()?;

        Ok(format!(
            "ALTER TABLE {} RENAME COLUMN {} TO {};",
            quote_ident(table),
            quote_ident(from),
            quote_ident(to)
        ))
    }

    /// Changes the column type only; modifiers in the definition are not applied.
    fn alter_column(&self, op: &AlterColumn) -> MigrateResult<String> {
        let mut required = Required::new("alterColumn");
        let table = required.field("table", &op.table);
        let column = required.field("column", &op.column);
        let definition = required.field("definition", &op.definition);
        required.check()?;

        let parsed = crate::column::parse_column(definition)?;
        let new_type = self.resolve_type(&parsed)?;
        let column = quote_ident(column);

        Ok(format!(
            "ALTER TABLE {} ALTER COLUMN {} TYPE {} USING {}::{};",
            quote_ident(table),
            column,
            new_type,
            column,
            new_type
        ))
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
            quote_ident(name),
            quote_ident(table),
            quote_list(columns)
        ))
    }

    fn drop_index(&self, op: &DropIndex) -> MigrateResult<String> {
        let mut required = Required::new("dropIndex");
        let name = required.field("name", &op.name);
        required.check()?;
        Ok(format!("DROP INDEX IF EXISTS {};", quote_ident(name)))
    }

    fn add_foreign_key(&self, op: &AddForeignKey) -> MigrateResult<String> {
        let fk = foreign_key_parts(op)?;
        Ok(format!(
            "ALTER TABLE {} ADD CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({}){};",
            quote_ident(fk.table),
            quote_ident(fk.name),
            quote_list(fk.columns),
            quote_ident(fk.ref_table),
            quote_list(fk.ref_columns),
            referential_actions(op)
        ))
    }

    fn drop_foreign_key(&self, op: &DropForeignKey) -> MigrateResult<String> {
        let mut required = Required::new("dropForeignKey");
        let table = required.field("table", &op.table);
        let name = required.field("name", &op.name);
        required.check()?;
        Ok(format!(
            "ALTER TABLE {} DROP CONSTRAINT IF EXISTS {};",
            quote_ident(table),
            quote_ident(name)
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn t(op: Operation) -> String {
        PostgresTranslator.translate(&op).unwrap()
    }

    fn column(definition: &str) -> String {
        PostgresTranslator.column_sql("c", definition).unwrap()
    }

    #[test]
    fn test_users_table() {
        let sql = t(Operation::CreateTable(CreateTable {
            name: Some("users".into()),
            columns: [("id", "serial:primary"), ("email", "varchar(255):notNullable:unique")]
                .into_iter()
                .collect(),
            options: TableOptions::default(),
        }));
        assert_eq!(
            sql,
            "CREATE TABLE IF NOT EXISTS users (id SERIAL PRIMARY KEY, email VARCHAR(255) NOT NULL UNIQUE);"
        );
    }

    #[test]
    fn test_timestamps() {
        let sql = t(Operation::CreateTable(CreateTable {
            name: Some("posts".into()),
            columns: [("id", "increments")].into_iter().collect(),
            options: TableOptions { timestamps: true },
        }));
        assert_eq!(
            sql,
            "CREATE TABLE IF NOT EXISTS posts (id SERIAL PRIMARY KEY, \
             created_at TIMESTAMPTZ DEFAULT CURRENT_TIMESTAMP, \
             updated_at TIMESTAMPTZ DEFAULT CURRENT_TIMESTAMP);"
        );
    }

    #[test]
    fn test_type_builders() {
        assert_eq!(column("decimal"), "DECIMAL(10,2)");
        assert_eq!(column("decimal(12, 4)"), "DECIMAL(12,4)");
        assert_eq!(column("numeric(8)"), "NUMERIC(8,2)");
        assert_eq!(column("string"), "VARCHAR(255)");
        assert_eq!(column("string(64)"), "VARCHAR(64)");
        assert_eq!(column("timestamptz(3)"), "TIMESTAMP(3) WITH TIME ZONE");
        assert_eq!(column("timetz"), "TIME WITH TIME ZONE");
        assert_eq!(column("double"), "DOUBLE PRECISION");
    }

    #[test]
    fn test_unknown_type_passes_through() {
        assert_eq!(column("citext:notNullable"), "CITEXT NOT NULL");
        assert_eq!(column("int4range"), "INT4RANGE");
    }

    #[test]
    fn test_multi_word_type_passes_through() {
        assert_eq!(
            column("timestamp with time zone:notNullable"),
            "TIMESTAMP WITH TIME ZONE NOT NULL"
        );
        assert_eq!(column("double precision"), "DOUBLE PRECISION");
        assert!(PostgresTranslator.column_sql("c", "integer)").is_err());
    }

    #[test]
    fn test_defaults() {
        assert_eq!(column("boolean:default(false)"), "BOOLEAN DEFAULT false");
        assert_eq!(column("timestamptz:default(now())"), "TIMESTAMP WITH TIME ZONE DEFAULT now()");
        assert_eq!(column("text:default(it's)"), "TEXT DEFAULT 'it''s'");
        assert_eq!(column("integer:default(-5)"), "INTEGER DEFAULT -5");
    }

    #[test]
    fn test_rename_and_alter_column() {
        assert_eq!(
            t(Operation::RenameColumn(RenameColumn {
                table: Some("users".into()),
                from: Some("mail".into()),
                to: Some("email".into()),
                definition: None,
            })),
            r#"ALTER TABLE "users" RENAME COLUMN "mail" TO "email";"#
        );
        assert_eq!(
            t(Operation::AlterColumn(AlterColumn {
                table: Some("items".into()),
                column: Some("weight".into()),
                definition: Some("double:notNullable".into()),
            })),
            r#"ALTER TABLE "items" ALTER COLUMN "weight" TYPE DOUBLE PRECISION USING "weight"::DOUBLE PRECISION;"#
        );
    }

    #[test]
    fn test_indexes() {
        assert_eq!(
            t(Operation::AddIndex(AddIndex {
                table: Some("users".into()),
                columns: vec!["first".into(), "last".into()],
                name: Some("idx_name".into()),
                index_type: None,
            })),
            r#"CREATE INDEX "idx_name" ON "users" ("first", "last");"#
        );
        assert_eq!(
            t(Operation::DropIndex(DropIndex {
                table: None,
                name: Some("idx_name".into()),
            })),
            r#"DROP INDEX IF EXISTS "idx_name";"#
        );
    }

    #[test]
    fn test_index_requires_name() {
        let err = PostgresTranslator
            .translate(&Operation::AddIndex(AddIndex {
                table: Some("users".into()),
                columns: vec!["email".into()],
                name: None,
                index_type: None,
            }))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid schema for addIndex: missing required field(s): name"
        );
    }

    #[test]
    fn test_foreign_keys() {
        assert_eq!(
            t(Operation::AddForeignKey(AddForeignKey {
                table: Some("posts".into()),
                columns: vec!["user_id".into()],
                references: Some(References {
                    table: Some("users".into()),
                    columns: vec!["id".into()],
                }),
                name: Some("posts_user_fkey".into()),
                on_delete: Some("cascade".into()),
                on_update: None,
            })),
            r#"ALTER TABLE "posts" ADD CONSTRAINT "posts_user_fkey" FOREIGN KEY ("user_id") REFERENCES "users" ("id") ON DELETE CASCADE;"#
        );
        assert_eq!(
            t(Operation::DropForeignKey(DropForeignKey {
                table: Some("posts".into()),
                name: Some("posts_user_fkey".into()),
            })),
            r#"ALTER TABLE "posts" DROP CONSTRAINT IF EXISTS "posts_user_fkey";"#
        );
    }
}
