//! The seam between planning and the relational store.
//!
//! The store itself lives outside this crate; it only has to execute
//! [`Statement`]s in the order it receives them. [`apply_plan`] feeds a plan
//! to a store and stops at the first failure, so a failed `CREATE TABLE`
//! never leaves a catalog entry or rows behind it.

use std::io::Write;

use log::{debug, info, warn};

use crate::{
    error::{Error, StorageError},
    plan::IngestionPlan,
    schema::HeaderLayout,
    statements::{Statement, StatementKind},
};

pub trait Storage {
    fn execute(&mut self, statement: &Statement<'_>) -> Result<(), StorageError>;
}

impl<S: Storage + ?Sized> Storage for &mut S {
    fn execute(&mut self, statement: &Statement<'_>) -> Result<(), StorageError> {
        (**self).execute(statement)
    }
}

/// Outcome of a fully applied plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestReport {
    pub table_name: String,
    pub layout: HeaderLayout,
    pub columns: usize,
    pub rows_inserted: usize,
}

/// Executes every statement of `plan` in order.
///
/// Row widths are checked before the first statement, so a ragged row means
/// nothing is executed. A statement the store rejects ends the run; nothing
/// after it is executed.
pub fn apply_plan<S>(storage: &mut S, plan: &IngestionPlan<'_>) -> Result<IngestReport, Error>
where
    S: Storage + ?Sized,
{
    plan.check_row_widths().inspect_err(|err| {
        warn!("Refusing to load '{}': {err}", plan.table_name());
    })?;
    let mut rows_inserted = 0usize;
    for (position, statement) in plan.statements().enumerate() {
        let statement = statement?;
        debug!("Executing {} statement #{position}", statement.kind);
        storage.execute(&statement).map_err(|source| {
            warn!(
                "{} statement #{position} for '{}' failed: {source}",
                statement.kind,
                plan.table_name()
            );
            Error::Storage {
                position,
                kind: statement.kind,
                source,
            }
        })?;
        if statement.kind == StatementKind::InsertRow {
            rows_inserted += 1;
        }
    }
    info!(
        "Loaded {rows_inserted} row(s) into '{}' ({})",
        plan.table_name(),
        plan.layout()
    );
    Ok(IngestReport {
        table_name: plan.table_name().to_string(),
        layout: plan.layout(),
        columns: plan.schema().width(),
        rows_inserted,
    })
}

/// A store that writes each statement as one line of SQL, parameters inlined
/// as escaped literals.
pub struct SqlScript<W: Write> {
    writer: W,
    statements: usize,
}

impl<W: Write> SqlScript<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            statements: 0,
        }
    }

    pub fn statements_written(&self) -> usize {
        self.statements
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    pub fn flush(&mut self) -> Result<(), StorageError> {
        self.writer.flush().map_err(StorageError::from)
    }
}

impl<W: Write> Storage for SqlScript<W> {
    fn execute(&mut self, statement: &Statement<'_>) -> Result<(), StorageError> {
        writeln!(self.writer, "{}", statement.render_inline())?;
        self.statements += 1;
        Ok(())
    }
}
