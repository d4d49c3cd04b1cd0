//! Inferred table schema and its persisted form.
//!
//! A [`Schema`] is produced once per ingestion call by the planner. It can be
//! written out as YAML or JSON so that an inferred layout can be reviewed
//! before anything reaches storage.

use std::{
    fmt,
    fs::File,
    io::{BufReader, BufWriter},
    path::Path,
};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::classify::TypeTag;

/// Capacity of the bounded text type when none is configured.
pub const DEFAULT_TEXT_CAPACITY: usize = 255;

/// How the first line of the content was interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HeaderLayout {
    /// Only a header line: columns are declared, all as text, and no rows follow.
    DeclarationOnly,
    /// A header line names the columns; types come from the line after it.
    Named,
    /// No header: columns are numbered from 1 and the first line is data.
    Headerless,
}

impl HeaderLayout {
    /// Index of the first data line within the content.
    pub fn data_start_line(self) -> usize {
        match self {
            HeaderLayout::Headerless => 0,
            HeaderLayout::Named | HeaderLayout::DeclarationOnly => 1,
        }
    }

    pub fn has_rows(self) -> bool {
        !matches!(self, HeaderLayout::DeclarationOnly)
    }
}

impl fmt::Display for HeaderLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            HeaderLayout::DeclarationOnly => "declaration-only",
            HeaderLayout::Named => "named header",
            HeaderLayout::Headerless => "headerless",
        };
        f.write_str(label)
    }
}

/// Column type as the relational store spells it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageType {
    Integer,
    Float,
    Text(usize),
}

impl StorageType {
    pub fn for_tag(tag: TypeTag, text_capacity: usize) -> Self {
        match tag {
            TypeTag::Int => StorageType::Integer,
            TypeTag::Float => StorageType::Float,
            TypeTag::String => StorageType::Text(text_capacity),
        }
    }
}

impl fmt::Display for StorageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageType::Integer => f.write_str("int"),
            StorageType::Float => f.write_str("float"),
            StorageType::Text(capacity) => write!(f, "varchar({capacity})"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    #[serde(rename = "type")]
    pub tag: TypeTag,
}

impl Column {
    pub fn new(name: impl Into<String>, tag: TypeTag) -> Self {
        Self {
            name: name.into(),
            tag,
        }
    }

    pub fn storage_type(&self, text_capacity: usize) -> StorageType {
        StorageType::for_tag(self.tag, text_capacity)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaFormat {
    Yaml,
    Json,
}

impl SchemaFormat {
    /// `.json` selects JSON; anything else is YAML.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => SchemaFormat::Json,
            _ => SchemaFormat::Yaml,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    pub columns: Vec<Column>,
}

impl Schema {
    pub fn new(columns: Vec<Column>) -> Self {
        Self { columns }
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn tags(&self) -> Vec<TypeTag> {
        self.columns.iter().map(|c| c.tag).collect()
    }

    pub fn to_yaml_string(&self) -> Result<String> {
        serde_yaml::to_string(self).context("Serializing schema to YAML")
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let file = File::create(path).with_context(|| format!("Creating schema file {path:?}"))?;
        let writer = BufWriter::new(file);
        match SchemaFormat::from_path(path) {
            SchemaFormat::Json => {
                serde_json::to_writer_pretty(writer, self).context("Writing schema JSON")
            }
            SchemaFormat::Yaml => {
                serde_yaml::to_writer(writer, self).context("Writing schema YAML")
            }
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("Opening schema file {path:?}"))?;
        let reader = BufReader::new(file);
        let schema = match SchemaFormat::from_path(path) {
            SchemaFormat::Json => serde_json::from_reader(reader).context("Parsing schema JSON")?,
            SchemaFormat::Yaml => serde_yaml::from_reader(reader).context("Parsing schema YAML")?,
        };
        Ok(schema)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample_schema() -> Schema {
        Schema::new(vec![
            Column::new("name", TypeTag::String),
            Column::new("age", TypeTag::Int),
            Column::new("score", TypeTag::Float),
        ])
    }

    #[test]
    fn storage_types_render_as_sql() {
        assert_eq!(StorageType::for_tag(TypeTag::Int, 255).to_string(), "int");
        assert_eq!(StorageType::for_tag(TypeTag::Float, 255).to_string(), "float");
        assert_eq!(
            StorageType::for_tag(TypeTag::String, 64).to_string(),
            "varchar(64)"
        );
    }

    #[test]
    fn layouts_know_where_rows_start() {
        assert_eq!(HeaderLayout::Headerless.data_start_line(), 0);
        assert_eq!(HeaderLayout::Named.data_start_line(), 1);
        assert!(!HeaderLayout::DeclarationOnly.has_rows());
    }

    #[test]
    fn column_lookup_by_name() {
        let schema = sample_schema();
        assert_eq!(schema.width(), 3);
        assert_eq!(schema.column_index("age"), Some(1));
        assert_eq!(schema.column_index("missing"), None);
        assert_eq!(schema.column_names(), vec!["name", "age", "score"]);
    }

    #[test]
    fn schema_round_trips_through_yaml_and_json() {
        let dir = tempdir().expect("temp dir");
        let schema = sample_schema();
        for file_name in ["schema.yml", "schema.json"] {
            let path = dir.path().join(file_name);
            schema.save(&path).expect("save schema");
            let loaded = Schema::load(&path).expect("load schema");
            assert_eq!(loaded, schema);
        }
    }

    #[test]
    fn yaml_uses_type_key() {
        let yaml = sample_schema().to_yaml_string().expect("yaml");
        assert!(yaml.contains("type: Int"));
        assert!(yaml.contains("name: score"));
    }
}
