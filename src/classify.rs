//! Per-field numeric type classification.
//!
//! Classification is deliberately shallow: it only looks at the characters of
//! a field. There is no range or overflow check, no exponent notation and no
//! locale-specific decimal separator.

use std::{fmt, str::FromStr};

use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::split;

/// Inferred primitive column type. Variants are declared in widening order,
/// so `Int < Float < String`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TypeTag {
    Int,
    Float,
    String,
}

impl TypeTag {
    /// The narrowest tag able to hold values of both `self` and `other`.
    pub fn widen(self, other: TypeTag) -> TypeTag {
        self.max(other)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TypeTag::Int => "Int",
            TypeTag::Float => "Float",
            TypeTag::String => "String",
        }
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TypeTag {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "int" | "integer" => Ok(TypeTag::Int),
            "float" | "double" | "real" => Ok(TypeTag::Float),
            "string" | "text" => Ok(TypeTag::String),
            other => Err(anyhow!("Unknown type tag '{other}'")),
        }
    }
}

/// Classifies a single field.
///
/// A leading `-` is accepted, each `.` counts as one defect, and any other
/// non-digit makes the field text. Zero defects is `Int`, one is `Float`.
/// An empty field is `String`: it carries no numeric evidence.
pub fn classify(field: &str) -> TypeTag {
    if field.is_empty() {
        return TypeTag::String;
    }
    let mut dots = 0usize;
    for (idx, ch) in field.char_indices() {
        match ch {
            '-' if idx == 0 => continue,
            '.' => dots += 1,
            c if c.is_ascii_digit() => continue,
            _ => return TypeTag::String,
        }
    }
    match dots {
        0 => TypeTag::Int,
        1 => TypeTag::Float,
        _ => TypeTag::String,
    }
}

/// Classifies every field of `row`, in order. An empty row yields no tags.
pub fn classify_row(row: &str, separator: u8) -> Vec<TypeTag> {
    split::views(row, separator)
        .map(|field| classify(field.as_str()))
        .collect()
}

/// True when `value` is a single field that classifies as [`TypeTag::Int`].
///
/// Used to vet request parameters such as row ids, column indices and ports
/// before they are parsed.
pub fn is_integer_param(value: &str) -> bool {
    !value.contains(',') && classify(value) == TypeTag::Int
}
