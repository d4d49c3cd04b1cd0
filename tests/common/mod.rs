#![allow(dead_code)]

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use csv_loader::{
    Storage, StorageError,
    statements::{Statement, StatementKind},
};
use tempfile::{TempDir, tempdir};

/// Returns the absolute path to a fixture under `tests/data`.
pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("data")
        .join(name)
}

/// Scratch directory helper that cleans up files automatically on drop.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Writes `contents` into a file under the workspace and returns the path.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        let mut file = File::create(&path).expect("create temp file");
        file.write_all(contents.as_bytes())
            .expect("write temp file contents");
        path
    }
}

/// In-memory store that records what it executes and can be told to reject
/// one kind of statement.
#[derive(Debug, Default)]
pub struct RecordingStore {
    pub executed: Vec<(StatementKind, String)>,
    pub reject: Option<StatementKind>,
}

impl RecordingStore {
    pub fn rejecting(kind: StatementKind) -> Self {
        Self {
            reject: Some(kind),
            ..Self::default()
        }
    }

    pub fn kinds(&self) -> Vec<StatementKind> {
        self.executed.iter().map(|(kind, _)| *kind).collect()
    }

    pub fn sql(&self) -> Vec<&str> {
        self.executed.iter().map(|(_, sql)| sql.as_str()).collect()
    }
}

impl Storage for RecordingStore {
    fn execute(&mut self, statement: &Statement<'_>) -> Result<(), StorageError> {
        if self.reject == Some(statement.kind) {
            return Err(StorageError::new(format!("{} rejected", statement.kind)));
        }
        self.executed
            .push((statement.kind, statement.render_inline()));
        Ok(())
    }
}
