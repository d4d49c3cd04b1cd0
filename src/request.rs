//! Request-level validation in front of the planner and the store.
//!
//! Transport is not handled here: callers hand over already-extracted
//! parameters and bodies, and get back either a statement to run or a
//! [`ValidationError`] / [`StructuralError`] explaining the refusal. Problems
//! that do not invalidate a request (a bad column index in a view, say) are
//! collected as issues and reported alongside the result.

use log::debug;

use crate::{
    classify,
    codec::{self, JsonObject},
    error::{Error, StructuralError, ValidationError},
    plan::{IngestionPlan, PlanOptions, plan_ingestion},
    sample,
    statements::{self, RowRange, SortOrder, Statement},
};

/// Parses a non-negative integer request parameter.
pub fn parse_index(param: &str, value: &str) -> Result<u32, ValidationError> {
    let trimmed = value.trim();
    let invalid = || ValidationError::NotAnInteger {
        param: param.to_string(),
        value: value.to_string(),
    };
    if !classify::is_integer_param(trimmed) || trimmed.starts_with('-') {
        return Err(invalid());
    }
    trimmed.parse::<u32>().map_err(|_| invalid())
}

fn find_param<'p, P: AsRef<str>>(params: &'p [(P, P)], key: &str) -> Option<&'p str> {
    params
        .iter()
        .find(|(k, _)| k.as_ref() == key)
        .map(|(_, v)| v.as_ref())
}

fn ensure_known_table(table: &str, known_tables: &[String]) -> Result<(), ValidationError> {
    if known_tables.iter().any(|known| known == table) {
        Ok(())
    } else {
        Err(ValidationError::UnknownTable(table.to_string()))
    }
}

/// An uploaded file awaiting ingestion.
#[derive(Debug, Clone, Copy)]
pub struct UploadRequest<'a> {
    /// Requested table name; may be empty.
    pub name: &'a str,
    /// Name of the uploaded file, used when `name` is empty.
    pub file_name: &'a str,
    pub content: &'a str,
}

#[derive(Debug)]
pub struct PreparedUpload<'a> {
    pub plan: IngestionPlan<'a>,
    pub issues: Vec<String>,
}

impl<'a> UploadRequest<'a> {
    /// Shape-checks the content with `samples` random draws and plans its
    /// ingestion.
    pub fn prepare(&self, options: PlanOptions, samples: usize) -> Result<PreparedUpload<'a>, Error> {
        let mut issues = Vec::new();
        let name = if self.name.trim().is_empty() {
            issues.push("Empty name field, using filename as fallback.".to_string());
            self.file_name
        } else {
            self.name
        };
        if !sample::looks_like_csv(self.content, options.separator, samples) {
            return Err(StructuralError::ShapeSample.into());
        }
        let plan = plan_ingestion(self.content, name, options)?;
        Ok(PreparedUpload { plan, issues })
    }
}

/// A validated view request over one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedView {
    pub table: String,
    pub columns: Vec<String>,
    pub sorts: Vec<(String, SortOrder)>,
    pub range: RowRange,
    pub issues: Vec<String>,
}

impl ResolvedView {
    /// Resolves `name`, repeated `col`/`asc`/`desc` column indices and the
    /// optional `from`/`to` rowid bounds against the table's `columns`.
    ///
    /// An unknown table rejects the request. Bad indices and bounds are
    /// dropped and reported as issues.
    pub fn resolve<P: AsRef<str>>(
        params: &[(P, P)],
        known_tables: &[String],
        columns: &[String],
    ) -> Result<Self, ValidationError> {
        let table = find_param(params, "name")
            .ok_or_else(|| ValidationError::MissingParam("name".to_string()))?;
        ensure_known_table(table, known_tables)?;

        let mut issues = Vec::new();
        let mut selected = Vec::new();
        let mut sorts: Vec<(String, SortOrder)> = Vec::new();

        for (key, value) in params {
            let order = match key.as_ref() {
                "col" => None,
                "asc" => Some(SortOrder::Ascending),
                "desc" => Some(SortOrder::Descending),
                _ => continue,
            };
            let Some(column) = resolve_column(key.as_ref(), value.as_ref(), columns, &mut issues)
            else {
                continue;
            };
            match order {
                None => selected.push(column),
                Some(order) => {
                    sorts.retain(|(existing, _)| *existing != column);
                    sorts.push((column, order));
                }
            }
        }

        let defaults = RowRange::default();
        let range = RowRange {
            from: resolve_bound(params, "from", defaults.from, &mut issues),
            to: resolve_bound(params, "to", defaults.to, &mut issues),
        };
        debug!("Resolved view of '{table}' with {} issue(s)", issues.len());

        Ok(Self {
            table: table.to_string(),
            columns: selected,
            sorts,
            range,
            issues,
        })
    }

    pub fn statement(&self) -> Statement<'static> {
        statements::select_view(&self.table, &self.columns, &self.sorts, self.range)
    }
}

fn resolve_column(
    param: &str,
    value: &str,
    columns: &[String],
    issues: &mut Vec<String>,
) -> Option<String> {
    let index = match parse_index(param, value) {
        Ok(index) => index,
        Err(err) => {
            issues.push(format!("Invalid indexing: {err}"));
            return None;
        }
    };
    match columns.get(index as usize) {
        Some(column) => Some(column.clone()),
        None => {
            let err = ValidationError::ColumnOutOfRange {
                index,
                count: columns.len(),
            };
            issues.push(err.to_string());
            None
        }
    }
}

fn resolve_bound<P: AsRef<str>>(
    params: &[(P, P)],
    key: &str,
    default: u32,
    issues: &mut Vec<String>,
) -> u32 {
    match find_param(params, key) {
        None => default,
        Some(value) if value.trim().is_empty() => default,
        Some(value) => parse_index(key, value).unwrap_or_else(|err| {
            issues.push(err.to_string());
            default
        }),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowWrite {
    Update { rowid: u32 },
    Append,
}

/// A validated single-row write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowUpdate {
    pub table: String,
    pub values: JsonObject,
    pub write: RowWrite,
}

impl RowUpdate {
    /// Validates a row write. `body` is a restricted JSON object mapping
    /// column names to values. A `rowid` beyond `table_size` appends a new
    /// row; otherwise the row with that id is updated.
    pub fn resolve(
        table: &str,
        rowid: Option<&str>,
        body: Option<&str>,
        known_tables: &[String],
        columns: &[String],
        table_size: u32,
    ) -> Result<Self, Error> {
        ensure_known_table(table, known_tables)?;
        let rowid = rowid.ok_or_else(|| ValidationError::MissingParam("rowid".to_string()))?;
        let rowid = parse_index("rowid", rowid)?;
        let body = body.ok_or_else(|| ValidationError::MissingParam("row_desc".to_string()))?;
        let values = codec::try_decode(body)?;
        if values.is_empty() {
            return Err(ValidationError::EmptyRow.into());
        }
        if let Some(unknown) = values.keys().find(|key| !columns.contains(key)) {
            return Err(ValidationError::UnknownColumn {
                table: table.to_string(),
                column: unknown.clone(),
            }
            .into());
        }
        let write = if rowid > table_size {
            RowWrite::Append
        } else {
            RowWrite::Update { rowid }
        };
        Ok(Self {
            table: table.to_string(),
            values,
            write,
        })
    }

    pub fn statement(&self) -> Statement<'_> {
        match self.write {
            RowWrite::Append => statements::append_row(&self.table, &self.values),
            RowWrite::Update { rowid } => statements::update_row(&self.table, &self.values, rowid),
        }
    }
}

/// `["issue one","issue two"]`
pub fn issues_body(issues: &[String]) -> String {
    codec::encode_array(issues.iter().map(|issue| codec::quote(issue)))
}

/// `{"tables":[{"t1":["c1","c2"]},...]}`
pub fn listing_body(tables: &[(String, Vec<String>)]) -> String {
    let entries = tables.iter().map(|(table, columns)| {
        let columns = codec::encode_array(columns.iter().map(|c| codec::quote(c)));
        codec::encode_members([(codec::escape(table), columns)])
    });
    codec::encode_members([("tables", codec::encode_array(entries))])
}

/// `{"contents":[{row},...],"issues":[...]}`
pub fn view_body(rows: &[JsonObject], issues: &[String]) -> String {
    let contents = codec::encode_array(rows.iter().map(codec::encode_object_escaped));
    codec::encode_members([("contents", contents), ("issues", issues_body(issues))])
}
