//! Ingestion planning: from raw delimited text to a schema and the ordered
//! statements that create, register and fill a table.
//!
//! The first line decides the [`HeaderLayout`]. If every field on it reads as
//! text it is taken as a header; a single numeric-looking field makes it a
//! data row instead. Column types for a named header come from the first
//! non-blank line after it, not from a scan of the whole content.
//!
//! Planning performs no I/O. Rows are not copied: the plan holds views into
//! the caller's buffer and yields them lazily.

use std::collections::HashSet;

use log::{debug, info};

use crate::{
    classify::{self, TypeTag},
    error::ValidationError,
    schema::{Column, DEFAULT_TEXT_CAPACITY, HeaderLayout, Schema},
    split::{self, Substring},
    statements::{self, Statement},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlanOptions {
    /// Field separator. Records are always separated by `\n`.
    pub separator: u8,
    /// Capacity of the bounded text column type.
    pub text_capacity: usize,
    /// Catalog id of the user the table is registered to.
    pub creator_id: i64,
}

impl Default for PlanOptions {
    fn default() -> Self {
        Self {
            separator: b',',
            text_capacity: DEFAULT_TEXT_CAPACITY,
            creator_id: 1,
        }
    }
}

/// One data line of the content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Row<'a> {
    /// 0-based line index within the content.
    pub line: usize,
    pub view: Substring<'a>,
}

impl<'a> Row<'a> {
    pub fn as_str(&self) -> &'a str {
        self.view.as_str()
    }

    pub fn fields(&self, separator: u8) -> Vec<&'a str> {
        split::views(self.view.as_str(), separator)
            .map(|field| field.as_str())
            .collect()
    }
}

/// Picks the layout for a first line. `has_more_lines` tells whether any
/// line follows it.
pub fn detect_layout(first_line: &str, has_more_lines: bool, separator: u8) -> HeaderLayout {
    let header_types = classify::classify_row(first_line, separator);
    let named = header_types.iter().all(|tag| *tag == TypeTag::String);
    match (named, has_more_lines) {
        (true, false) => HeaderLayout::DeclarationOnly,
        (true, true) => HeaderLayout::Named,
        (false, _) => HeaderLayout::Headerless,
    }
}

#[derive(Debug, Clone)]
pub struct IngestionPlan<'a> {
    table_name: &'a str,
    content: &'a str,
    layout: HeaderLayout,
    schema: Schema,
    options: PlanOptions,
}

/// Builds the plan for loading `content` into `table_name`.
pub fn plan_ingestion<'a>(
    content: &'a str,
    table_name: &'a str,
    options: PlanOptions,
) -> Result<IngestionPlan<'a>, ValidationError> {
    if table_name.trim().is_empty() {
        return Err(ValidationError::EmptyTableName);
    }
    let separator = options.separator;
    let mut lines = split::views(content, b'\n').map(Substring::without_carriage_return);
    let first_line = lines.next().ok_or(ValidationError::EmptyContent)?.as_str();
    let second_line = lines.find(|view| !view.is_empty()).map(|view| view.as_str());

    let header_types = classify::classify_row(first_line, separator);
    if header_types.is_empty() {
        return Err(ValidationError::NoColumns);
    }
    let layout = detect_layout(first_line, second_line.is_some(), separator);
    debug!("First line {first_line:?} classified as {header_types:?} -> {layout}");

    let columns = match layout {
        HeaderLayout::DeclarationOnly => split::views(first_line, separator)
            .map(|name| Column::new(name.as_str(), TypeTag::String))
            .collect::<Vec<_>>(),
        HeaderLayout::Named => {
            let data_types = classify::classify_row(second_line.unwrap_or(""), separator);
            split::views(first_line, separator)
                .enumerate()
                .map(|(idx, name)| {
                    let tag = data_types.get(idx).copied().unwrap_or(TypeTag::String);
                    Column::new(name.as_str(), tag)
                })
                .collect()
        }
        HeaderLayout::Headerless => header_types
            .iter()
            .enumerate()
            .map(|(idx, tag)| Column::new((idx + 1).to_string(), *tag))
            .collect(),
    };
    ensure_unique_names(&columns)?;

    let schema = Schema::new(columns);
    info!(
        "Planned '{}' with {} column(s) ({layout})",
        table_name,
        schema.width()
    );
    Ok(IngestionPlan {
        table_name,
        content,
        layout,
        schema,
        options,
    })
}

fn ensure_unique_names(columns: &[Column]) -> Result<(), ValidationError> {
    let mut seen = HashSet::with_capacity(columns.len());
    for column in columns {
        if !seen.insert(column.name.as_str()) {
            return Err(ValidationError::DuplicateColumn(column.name.clone()));
        }
    }
    Ok(())
}

impl<'a> IngestionPlan<'a> {
    pub fn table_name(&self) -> &'a str {
        self.table_name
    }

    pub fn layout(&self) -> HeaderLayout {
        self.layout
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn options(&self) -> &PlanOptions {
        &self.options
    }

    pub fn data_start_line(&self) -> usize {
        self.layout.data_start_line()
    }

    /// Data rows in content order. Blank lines are skipped.
    pub fn rows(&self) -> impl Iterator<Item = Row<'a>> + use<'a> {
        let skip = if self.layout.has_rows() {
            self.data_start_line()
        } else {
            usize::MAX
        };
        split::views(self.content, b'\n')
            .map(Substring::without_carriage_return)
            .enumerate()
            .skip(skip)
            .filter(|(_, view)| !view.is_empty())
            .map(|(line, view)| Row { line, view })
    }

    pub fn create_statement(&self) -> Statement<'static> {
        statements::create_table(self.table_name, &self.schema, self.options.text_capacity)
    }

    pub fn register_statement(&self) -> Statement<'a> {
        statements::register_table(self.table_name, self.options.creator_id)
    }

    /// The insert for one row, or a width error if its field count differs
    /// from the schema.
    pub fn insert_statement(&self, row: &Row<'a>) -> Result<Statement<'a>, ValidationError> {
        let fields = row.fields(self.options.separator);
        if fields.len() != self.schema.width() {
            return Err(ValidationError::RowWidth {
                line_number: row.line + 1,
                expected: self.schema.width(),
                found: fields.len(),
            });
        }
        Ok(statements::insert_row(self.table_name, &self.schema, &fields))
    }

    /// Checks every row's field count against the schema, reporting the
    /// first row that differs.
    pub fn check_row_widths(&self) -> Result<(), ValidationError> {
        let width = self.schema.width();
        self.rows().try_for_each(|row| {
            let found = split::views(row.as_str(), self.options.separator).count();
            if found == width {
                Ok(())
            } else {
                Err(ValidationError::RowWidth {
                    line_number: row.line + 1,
                    expected: width,
                    found,
                })
            }
        })
    }

    /// Create, register, then one insert per row, in execution order.
    pub fn statements(&self) -> impl Iterator<Item = Result<Statement<'a>, ValidationError>> + '_ {
        [Ok(self.create_statement()), Ok(self.register_statement())]
            .into_iter()
            .chain(self.rows().map(|row| self.insert_statement(&row)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::statements::{Param, StatementKind};

    fn plan(content: &str) -> IngestionPlan<'_> {
        plan_ingestion(content, "people", PlanOptions::default()).expect("plan")
    }

    #[test]
    fn header_only_content_declares_text_columns() {
        let plan = plan("name,age");
        assert_eq!(plan.layout(), HeaderLayout::DeclarationOnly);
        assert_eq!(
            plan.schema().columns,
            vec![
                Column::new("name", TypeTag::String),
                Column::new("age", TypeTag::String)
            ]
        );
        assert_eq!(plan.rows().count(), 0);
        assert_eq!(plan.statements().count(), 2);
    }

    #[test]
    fn header_with_trailing_newline_is_still_declaration_only() {
        assert_eq!(plan("name,age\n").layout(), HeaderLayout::DeclarationOnly);
    }

    #[test]
    fn named_header_takes_types_from_second_line() {
        let plan = plan("name,age\nAlice,30\n");
        assert_eq!(plan.layout(), HeaderLayout::Named);
        assert_eq!(plan.data_start_line(), 1);
        assert_eq!(
            plan.schema().columns,
            vec![
                Column::new("name", TypeTag::String),
                Column::new("age", TypeTag::Int)
            ]
        );
        let rows: Vec<&str> = plan.rows().map(|row| row.as_str()).collect();
        assert_eq!(rows, vec!["Alice,30"]);
    }

    #[test]
    fn numeric_first_line_is_data_with_numbered_columns() {
        let plan = plan("Alice,30\nBob,40\n");
        assert_eq!(plan.layout(), HeaderLayout::Headerless);
        assert_eq!(plan.data_start_line(), 0);
        assert_eq!(
            plan.schema().columns,
            vec![
                Column::new("1", TypeTag::String),
                Column::new("2", TypeTag::Int)
            ]
        );
        let rows: Vec<&str> = plan.rows().map(|row| row.as_str()).collect();
        assert_eq!(rows, vec!["Alice,30", "Bob,40"]);
    }

    #[test]
    fn layout_detection_is_independent_of_content() {
        assert_eq!(detect_layout("a,b", false, b','), HeaderLayout::DeclarationOnly);
        assert_eq!(detect_layout("a,b", true, b','), HeaderLayout::Named);
        assert_eq!(detect_layout("a,1", true, b','), HeaderLayout::Headerless);
        assert_eq!(detect_layout("1.5", false, b','), HeaderLayout::Headerless);
    }

    #[test]
    fn statements_run_create_register_then_inserts() {
        let plan = plan("name,age\nAlice,30\nBob,40");
        let kinds = plan
            .statements()
            .map(|s| s.expect("statement").kind)
            .collect::<Vec<_>>();
        assert_eq!(
            kinds,
            vec![
                StatementKind::CreateTable,
                StatementKind::RegisterTable,
                StatementKind::InsertRow,
                StatementKind::InsertRow
            ]
        );
    }

    #[test]
    fn row_text_is_bound_not_interpolated() {
        let plan = plan("name,note\nAlice,it's \"fine\"); DROP TABLE x;--\n");
        let insert = plan.statements().nth(2).unwrap().unwrap();
        assert_eq!(insert.sql, r#"INSERT INTO main."people" VALUES (?, ?);"#);
        assert_eq!(
            insert.params[1],
            Param::text("it's \"fine\"); DROP TABLE x;--")
        );
    }

    #[test]
    fn crlf_lines_are_trimmed() {
        let plan = plan("name,age\r\nAlice,30\r\n");
        assert_eq!(plan.schema().columns[1], Column::new("age", TypeTag::Int));
        let insert = plan.statements().nth(2).unwrap().unwrap();
        assert_eq!(insert.params[1], Param::Int(30));
    }

    #[test]
    fn ragged_rows_fail_their_own_insert() {
        let plan = plan("a,b\n1,2\n3\n4,5");
        let results = plan.statements().collect::<Vec<_>>();
        assert!(results[2].is_ok());
        assert_eq!(
            results[3].clone().unwrap_err(),
            ValidationError::RowWidth {
                line_number: 3,
                expected: 2,
                found: 1
            }
        );
        assert!(results[4].is_ok());
    }

    #[test]
    fn blank_line_after_header_does_not_decide_types() {
        let plan = plan("name,age\n\nAlice,30\n");
        assert_eq!(plan.layout(), HeaderLayout::Named);
        assert_eq!(plan.schema().tags(), vec![TypeTag::String, TypeTag::Int]);
        let rows: Vec<&str> = plan.rows().map(|row| row.as_str()).collect();
        assert_eq!(rows, vec!["Alice,30"]);
    }

    #[test]
    fn header_followed_only_by_blank_lines_is_declaration_only() {
        let plan = plan("name,age\n\n\r\n");
        assert_eq!(plan.layout(), HeaderLayout::DeclarationOnly);
        assert_eq!(plan.rows().count(), 0);
    }

    #[test]
    fn width_check_reports_first_ragged_row() {
        assert_eq!(plan("a,b\n1,2\n3,4\n").check_row_widths(), Ok(()));
        assert_eq!(
            plan("a,b\n1,2\n3,4\n5\n6,7,8\n").check_row_widths(),
            Err(ValidationError::RowWidth {
                line_number: 4,
                expected: 2,
                found: 1
            })
        );
    }

    #[test]
    fn blank_lines_are_not_rows() {
        let plan = plan("a,b\n1,2\n\n3,4\n");
        let lines: Vec<usize> = plan.rows().map(|row| row.line).collect();
        assert_eq!(lines, vec![1, 3]);
    }

    #[test]
    fn rejects_empty_inputs() {
        let options = PlanOptions::default();
        assert_eq!(
            plan_ingestion("", "t", options).unwrap_err(),
            ValidationError::EmptyContent
        );
        assert_eq!(
            plan_ingestion("a,b", " ", options).unwrap_err(),
            ValidationError::EmptyTableName
        );
        assert_eq!(
            plan_ingestion("\nx", "t", options).unwrap_err(),
            ValidationError::NoColumns
        );
    }

    #[test]
    fn rejects_duplicate_header_names() {
        assert_eq!(
            plan_ingestion("id,id\n1,2", "t", PlanOptions::default()).unwrap_err(),
            ValidationError::DuplicateColumn("id".to_string())
        );
    }

    #[test]
    fn missing_second_line_types_default_to_text() {
        let plan = plan("a,b,c\n1,2");
        assert_eq!(
            plan.schema().tags(),
            vec![TypeTag::Int, TypeTag::Int, TypeTag::String]
        );
    }

    #[test]
    fn honours_custom_separator_and_capacity() {
        let options = PlanOptions {
            separator: b';',
            text_capacity: 64,
            creator_id: 7,
        };
        let plan = plan_ingestion("city;pop\nOslo;709000", "cities", options).unwrap();
        assert_eq!(
            plan.create_statement().sql,
            r#"CREATE TABLE main."cities" ("city" varchar(64), "pop" int);"#
        );
        assert_eq!(plan.register_statement().params[2], Param::Int(7));
    }
}
