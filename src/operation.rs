//! Operation model.
//!
//! An [`Operation`] is one schema-change primitive in dialect-agnostic form.
//! Migration files spell operations in the externally tagged camelCase form:
//!
//! ```json
//! { "createTable": { "name": "users", "columns": { "id": "increments" } } }
//! { "dropTable": "users" }
//! ```
//!
//! Payload fields are optional here; the translator reports missing ones as
//! schema-validation errors naming the fields.

use std::fmt;
use std::marker::PhantomData;

use serde::de::{self, Deserializer, MapAccess, SeqAccess, Visitor};
use serde::Deserialize;

/// One schema-change primitive.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    CreateTable(CreateTable),
    DropTable(DropTable),
    RenameTable(RenameTable),
    AddColumn(AddColumn),
    DropColumn(DropColumn),
    RenameColumn(RenameColumn),
    AlterColumn(AlterColumn),
    AddIndex(AddIndex),
    DropIndex(DropIndex),
    AddForeignKey(AddForeignKey),
    DropForeignKey(DropForeignKey),
    /// Verbatim SQL with optional bound parameters.
    Raw(Raw),
    /// An operation key that is not part of the vocabulary.
    Unknown(String),
}

impl Operation {
    /// The camelCase operation name as written in migration files.
    pub fn kind(&self) -> &str {
        match self {
            Self::CreateTable(_) => "createTable",
            Self::DropTable(_) => "dropTable",
            Self::RenameTable(_) => "renameTable",
            Self::AddColumn(_) => "addColumn",
            Self::DropColumn(_) => "dropColumn",
            Self::RenameColumn(_) => "renameColumn",
            Self::AlterColumn(_) => "alterColumn",
            Self::AddIndex(_) => "addIndex",
            Self::DropIndex(_) => "dropIndex",
            Self::AddForeignKey(_) => "addForeignKey",
            Self::DropForeignKey(_) => "dropForeignKey",
            Self::Raw(_) => "raw",
            Self::Unknown(name) => name,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTable {
    pub name: Option<String>,
    #[serde(default)]
    pub columns: Columns,
    #[serde(default)]
    pub options: TableOptions,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableOptions {
    /// Append `created_at` / `updated_at` columns.
    #[serde(default)]
    pub timestamps: bool,
}

/// `dropTable` accepts either a bare table name or `{ "name": ... }`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(from = "DropTableForm")]
pub struct DropTable {
    pub name: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum DropTableForm {
    Name(String),
    Table { name: Option<String> },
}

impl From<DropTableForm> for DropTable {
    fn from(form: DropTableForm) -> Self {
        match form {
            DropTableForm::Name(name) => Self { name: Some(name) },
            DropTableForm::Table { name } => Self { name },
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenameTable {
    pub from: Option<String>,
    pub to: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddColumn {
    pub table: Option<String>,
    pub column: Option<String>,
    pub definition: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DropColumn {
    pub table: Option<String>,
    pub column: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenameColumn {
    pub table: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
    /// Full column definition; MySQL's `CHANGE COLUMN` needs it.
    pub definition: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlterColumn {
    pub table: Option<String>,
    pub column: Option<String>,
    pub definition: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddIndex {
    pub table: Option<String>,
    #[serde(default, deserialize_with = "one_or_many")]
    pub columns: Vec<String>,
    pub name: Option<String>,
    /// `"unique"` for a unique index.
    #[serde(rename = "type")]
    pub index_type: Option<String>,
}

impl AddIndex {
    pub fn is_unique(&self) -> bool {
        self.index_type
            .as_deref()
            .is_some_and(|t| t.eq_ignore_ascii_case("unique"))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DropIndex {
    pub table: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddForeignKey {
    pub table: Option<String>,
    #[serde(default, deserialize_with = "one_or_many")]
    pub columns: Vec<String>,
    pub references: Option<References>,
    pub name: Option<String>,
    pub on_delete: Option<String>,
    pub on_update: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct References {
    pub table: Option<String>,
    #[serde(default, deserialize_with = "one_or_many")]
    pub columns: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DropForeignKey {
    pub table: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Raw {
    pub sql: Option<String>,
    #[serde(default)]
    pub params: Vec<SqlParam>,
}

impl<'de> Deserialize<'de> for Operation {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(OperationVisitor)
    }
}

struct OperationVisitor;

impl<'de> Visitor<'de> for OperationVisitor {
    type Value = Operation;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a map with a single operation key such as `createTable`")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Operation, A::Error> {
        let key: String = map
            .next_key()?
            .ok_or_else(|| de::Error::custom("empty operation; expected a single operation key"))?;

        let op = match key.as_str() {
            "createTable" => Operation::CreateTable(map.next_value()?),
            "dropTable" => Operation::DropTable(map.next_value()?),
            "renameTable" => Operation::RenameTable(map.next_value()?),
            "addColumn" => Operation::AddColumn(map.next_value()?),
            "dropColumn" => Operation::DropColumn(map.next_value()?),
            "renameColumn" => Operation::RenameColumn(map.next_value()?),
            "alterColumn" => Operation::AlterColumn(map.next_value()?),
            "addIndex" => Operation::AddIndex(map.next_value()?),
            "dropIndex" => Operation::DropIndex(map.next_value()?),
            "addForeignKey" => Operation::AddForeignKey(map.next_value()?),
            "dropForeignKey" => Operation::DropForeignKey(map.next_value()?),
            "raw" => Operation::Raw(map.next_value()?),
            _ => {
                map.next_value::<de::IgnoredAny>()?;
                Operation::Unknown(key)
            }
        };

        if let Some(extra) = map.next_key::<String>()? {
            return Err(de::Error::custom(format!(
                "operation '{}' has a second key '{}'; write one operation per entry",
                op.kind(),
                extra
            )));
        }

        Ok(op)
    }
}

/// Column name to column definition, in declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Columns(pub Vec<(String, String)>);

impl Columns {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(name, def)| (name.as_str(), def.as_str()))
    }
}

impl<N: Into<String>, D: Into<String>> FromIterator<(N, D)> for Columns {
    fn from_iter<I: IntoIterator<Item = (N, D)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(n, d)| (n.into(), d.into())).collect())
    }
}

impl<'de> Deserialize<'de> for Columns {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ColumnsVisitor;

        impl<'de> Visitor<'de> for ColumnsVisitor {
            type Value = Columns;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of column names to column definitions")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Columns, A::Error> {
                let mut columns = Vec::new();
                while let Some((name, definition)) = map.next_entry::<String, String>()? {
                    columns.push((name, definition));
                }
                Ok(Columns(columns))
            }
        }

        deserializer.deserialize_map(ColumnsVisitor)
    }
}

/// Deserialize either a single value or a sequence of values.
pub fn one_or_many<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    deserializer.deserialize_any(OneOrMany(PhantomData))
}

struct OneOrMany<T>(PhantomData<T>);

impl<'de, T: Deserialize<'de>> Visitor<'de> for OneOrMany<T> {
    type Value = Vec<T>;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a single value or a list")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Vec<T>, E> {
        T::deserialize(de::value::StrDeserializer::<E>::new(v)).map(|one| vec![one])
    }

    fn visit_map<A: MapAccess<'de>>(self, map: A) -> Result<Vec<T>, A::Error> {
        T::deserialize(de::value::MapAccessDeserializer::new(map)).map(|one| vec![one])
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Vec<T>, A::Error> {
        let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(item) = seq.next_element()? {
            items.push(item);
        }
        Ok(items)
    }
}

/// Dynamic value bound to a raw statement's placeholders.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlParam {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl SqlParam {
    /// Render as an inline SQL literal, for dry-run output.
    pub fn to_sql_literal(&self) -> String {
        match self {
            Self::Null => "NULL".to_string(),
            Self::Bool(v) => v.to_string(),
            Self::Int(v) => v.to_string(),
            Self::Float(v) => v.to_string(),
            Self::Text(v) => crate::column::quote_literal(v),
        }
    }
}

impl From<bool> for SqlParam {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i32> for SqlParam {
    fn from(v: i32) -> Self {
        Self::Int(v as i64)
    }
}

impl From<i64> for SqlParam {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for SqlParam {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for SqlParam {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for SqlParam {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl<T: Into<SqlParam>> From<Option<T>> for SqlParam {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Self::Null)
    }
}

impl<'de> Deserialize<'de> for SqlParam {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ParamVisitor;

        impl<'de> Visitor<'de> for ParamVisitor {
            type Value = SqlParam;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("null, a boolean, a number or a string")
            }

            fn visit_unit<E: de::Error>(self) -> Result<SqlParam, E> {
                Ok(SqlParam::Null)
            }

            fn visit_none<E: de::Error>(self) -> Result<SqlParam, E> {
                Ok(SqlParam::Null)
            }

            fn visit_bool<E: de::Error>(self, v: bool) -> Result<SqlParam, E> {
                Ok(SqlParam::Bool(v))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<SqlParam, E> {
                Ok(SqlParam::Int(v))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<SqlParam, E> {
                Ok(i64::try_from(v)
                    .map(SqlParam::Int)
                    .unwrap_or(SqlParam::Float(v as f64)))
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> Result<SqlParam, E> {
                Ok(SqlParam::Float(v))
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<SqlParam, E> {
                Ok(SqlParam::Text(v.to_string()))
            }
        }

        deserializer.deserialize_any(ParamVisitor)
    }
}
