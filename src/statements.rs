//! Statement builders for the storage collaborator.
//!
//! Every builder is a pure function of its typed arguments. Values always
//! travel as [`Param`]s bound to `?` placeholders; only identifiers (table
//! and column names) are written into the SQL text, double-quoted with any
//! embedded quote doubled.

use std::{borrow::Cow, fmt};

use heck::ToSnakeCase;
use itertools::Itertools;
use sha2::{Digest, Sha256};

use crate::{classify::TypeTag, codec::JsonObject, schema::Schema};

/// Catalog of uploaded tables: display name, internal name and creator.
pub const CATALOG_TABLE: &str = "main.Files";

const INTERNAL_NAME_MAX: usize = 64;
const INTERNAL_NAME_HASH_DIGITS: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatementKind {
    BootstrapCatalog,
    CreateTable,
    RegisterTable,
    InsertRow,
    ListTables,
    ListColumns,
    CountRows,
    SelectView,
    UpdateRow,
    AppendRow,
    DropTable,
    DeregisterTable,
}

impl fmt::Display for StatementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            StatementKind::BootstrapCatalog => "bootstrap-catalog",
            StatementKind::CreateTable => "create-table",
            StatementKind::RegisterTable => "register-table",
            StatementKind::InsertRow => "insert-row",
            StatementKind::ListTables => "list-tables",
            StatementKind::ListColumns => "list-columns",
            StatementKind::CountRows => "count-rows",
            StatementKind::SelectView => "select-view",
            StatementKind::UpdateRow => "update-row",
            StatementKind::AppendRow => "append-row",
            StatementKind::DropTable => "drop-table",
            StatementKind::DeregisterTable => "deregister-table",
        };
        f.write_str(label)
    }
}

/// A value bound to one `?` placeholder.
#[derive(Debug, Clone, PartialEq)]
pub enum Param<'a> {
    Null,
    Int(i64),
    Float(f64),
    Text(Cow<'a, str>),
}

impl<'a> Param<'a> {
    pub fn text(value: impl Into<Cow<'a, str>>) -> Self {
        Param::Text(value.into())
    }

    /// Binds a raw field according to its column's tag. Empty fields are
    /// `Null`; a field that does not parse as its column's numeric type is
    /// passed on as text and left to the store's type affinity.
    pub fn for_field(field: &'a str, tag: TypeTag) -> Self {
        if field.is_empty() {
            return Param::Null;
        }
        match tag {
            TypeTag::Int => field
                .parse::<i64>()
                .map(Param::Int)
                .unwrap_or(Param::Text(Cow::Borrowed(field))),
            TypeTag::Float => field
                .parse::<f64>()
                .map(Param::Float)
                .unwrap_or(Param::Text(Cow::Borrowed(field))),
            TypeTag::String => Param::Text(Cow::Borrowed(field)),
        }
    }

    /// SQL literal form, with single quotes in text doubled.
    pub fn to_literal(&self) -> String {
        match self {
            Param::Null => "NULL".to_string(),
            Param::Int(value) => value.to_string(),
            Param::Float(value) => value.to_string(),
            Param::Text(value) => format!("'{}'", value.replace('\'', "''")),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Statement<'a> {
    pub kind: StatementKind,
    pub sql: String,
    pub params: Vec<Param<'a>>,
}

impl<'a> Statement<'a> {
    fn new(kind: StatementKind, sql: String) -> Self {
        Self {
            kind,
            sql,
            params: Vec::new(),
        }
    }

    fn with_params(mut self, params: Vec<Param<'a>>) -> Self {
        self.params = params;
        self
    }

    pub fn placeholder_count(&self) -> usize {
        placeholder_positions(&self.sql).len()
    }

    /// The SQL text with every placeholder replaced by its parameter's
    /// literal. Meant for scripts and logs; executing storage binds
    /// [`Statement::params`] instead.
    pub fn render_inline(&self) -> String {
        let mut rendered = String::with_capacity(self.sql.len() + self.params.len() * 8);
        let mut last = 0;
        let mut params = self.params.iter();
        for position in placeholder_positions(&self.sql) {
            rendered.push_str(&self.sql[last..position]);
            match params.next() {
                Some(param) => rendered.push_str(&param.to_literal()),
                None => rendered.push('?'),
            }
            last = position + 1;
        }
        rendered.push_str(&self.sql[last..]);
        rendered
    }
}

/// Byte offsets of `?` outside quoted identifiers.
fn placeholder_positions(sql: &str) -> Vec<usize> {
    let mut quoted = false;
    let mut positions = Vec::new();
    for (idx, byte) in sql.bytes().enumerate() {
        match byte {
            b'"' => quoted = !quoted,
            b'?' if !quoted => positions.push(idx),
            _ => {}
        }
    }
    positions
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

impl SortOrder {
    fn keyword(self) -> &'static str {
        match self {
            SortOrder::Ascending => "ASC",
            SortOrder::Descending => "DESC",
        }
    }
}

/// Inclusive rowid window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowRange {
    pub from: u32,
    pub to: u32,
}

impl Default for RowRange {
    fn default() -> Self {
        Self { from: 0, to: 100 }
    }
}

pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn qualified(table: &str) -> String {
    format!("main.{}", quote_ident(table))
}

fn placeholders(count: usize) -> String {
    std::iter::repeat_n("?", count).join(", ")
}

/// Storage-safe name recorded next to the display name in the catalog:
/// the snake-cased name plus a short digest of the original, so that names
/// differing only in punctuation or case stay distinct.
pub fn internal_name(table: &str) -> String {
    let digest = Sha256::digest(table.as_bytes());
    let hash = digest
        .iter()
        .map(|byte| format!("{byte:02x}"))
        .collect::<String>();
    let stem_limit = INTERNAL_NAME_MAX - INTERNAL_NAME_HASH_DIGITS - 1;
    let stem = table.to_snake_case().chars().take(stem_limit).collect::<String>();
    format!("{stem}_{}", &hash[..INTERNAL_NAME_HASH_DIGITS])
}

pub fn bootstrap_catalog() -> Statement<'static> {
    Statement::new(
        StatementKind::BootstrapCatalog,
        format!(
            "CREATE TABLE IF NOT EXISTS {CATALOG_TABLE} (name varchar(30) NOT NULL, internal_name varchar(64) NOT NULL, creator_id INTEGER NOT NULL);"
        ),
    )
}

pub fn create_table(table: &str, schema: &Schema, text_capacity: usize) -> Statement<'static> {
    let columns = schema
        .columns
        .iter()
        .map(|column| {
            format!(
                "{} {}",
                quote_ident(&column.name),
                column.storage_type(text_capacity)
            )
        })
        .join(", ");
    Statement::new(
        StatementKind::CreateTable,
        format!("CREATE TABLE {} ({columns});", qualified(table)),
    )
}

pub fn register_table(table: &str, creator_id: i64) -> Statement<'_> {
    Statement::new(
        StatementKind::RegisterTable,
        format!("INSERT INTO {CATALOG_TABLE} (name, internal_name, creator_id) VALUES (?, ?, ?);"),
    )
    .with_params(vec![
        Param::text(table),
        Param::text(internal_name(table)),
        Param::Int(creator_id),
    ])
}

/// One row insert. `fields` pair positionally with the schema's columns.
pub fn insert_row<'a>(table: &str, schema: &Schema, fields: &[&'a str]) -> Statement<'a> {
    let params = fields
        .iter()
        .copied()
        .zip(&schema.columns)
        .map(|(field, column)| Param::for_field(field, column.tag))
        .collect::<Vec<_>>();
    Statement::new(
        StatementKind::InsertRow,
        format!(
            "INSERT INTO {} VALUES ({});",
            qualified(table),
            placeholders(params.len())
        ),
    )
    .with_params(params)
}

pub fn list_tables() -> Statement<'static> {
    Statement::new(
        StatementKind::ListTables,
        format!("SELECT name FROM {CATALOG_TABLE};"),
    )
}

pub fn list_columns(table: &str) -> Statement<'_> {
    Statement::new(
        StatementKind::ListColumns,
        "SELECT name FROM pragma_table_info(?);".to_string(),
    )
    .with_params(vec![Param::text(table)])
}

pub fn count_rows(table: &str) -> Statement<'static> {
    Statement::new(
        StatementKind::CountRows,
        format!("SELECT count(*) FROM {};", qualified(table)),
    )
}

/// Projection of `columns` (all columns when empty) over a rowid window,
/// ordered by `sorts` in the given sequence.
pub fn select_view(
    table: &str,
    columns: &[String],
    sorts: &[(String, SortOrder)],
    range: RowRange,
) -> Statement<'static> {
    let projection = if columns.is_empty() {
        "*".to_string()
    } else {
        columns.iter().map(|c| quote_ident(c)).join(", ")
    };
    let mut sql = format!(
        "SELECT {projection} FROM {} WHERE rowid >= ? AND rowid <= ?",
        qualified(table)
    );
    if !sorts.is_empty() {
        let order = sorts
            .iter()
            .map(|(column, order)| format!("{} {}", quote_ident(column), order.keyword()))
            .join(", ");
        sql.push_str(" ORDER BY ");
        sql.push_str(&order);
    }
    sql.push(';');
    Statement::new(StatementKind::SelectView, sql).with_params(vec![
        Param::Int(i64::from(range.from)),
        Param::Int(i64::from(range.to)),
    ])
}

pub fn update_row<'a>(table: &str, values: &'a JsonObject, rowid: u32) -> Statement<'a> {
    let assignments = values
        .keys()
        .map(|column| format!("{} = ?", quote_ident(column)))
        .join(", ");
    let mut params = values
        .values()
        .map(|value| Param::text(value.as_str()))
        .collect::<Vec<_>>();
    params.push(Param::Int(i64::from(rowid)));
    Statement::new(
        StatementKind::UpdateRow,
        format!(
            "UPDATE {} SET {assignments} WHERE rowid = ?;",
            qualified(table)
        ),
    )
    .with_params(params)
}

pub fn append_row<'a>(table: &str, values: &'a JsonObject) -> Statement<'a> {
    let columns = values.keys().map(|column| quote_ident(column)).join(", ");
    let params = values
        .values()
        .map(|value| Param::text(value.as_str()))
        .collect::<Vec<_>>();
    Statement::new(
        StatementKind::AppendRow,
        format!(
            "INSERT INTO {} ({columns}) VALUES ({});",
            qualified(table),
            placeholders(params.len())
        ),
    )
    .with_params(params)
}

pub fn drop_table(table: &str) -> Statement<'static> {
    Statement::new(
        StatementKind::DropTable,
        format!("DROP TABLE IF EXISTS {};", qualified(table)),
    )
}

pub fn deregister_table(table: &str) -> Statement<'_> {
    Statement::new(
        StatementKind::DeregisterTable,
        format!("DELETE FROM {CATALOG_TABLE} WHERE name = ?;"),
    )
    .with_params(vec![Param::text(table)])
}
