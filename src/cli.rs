use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::{sample::DEFAULT_SAMPLES, schema::DEFAULT_TEXT_CAPACITY};

#[derive(Debug, Parser)]
#[command(author, version, about = "Sniff delimited text and plan its loading into a table", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Detect the header layout and column types of a file
    Sniff(SniffArgs),
    /// Check that every line of a file has the same number of fields
    Check(CheckArgs),
    /// Write the SQL statements that load a file into a table
    Plan(PlanArgs),
    /// Decode a flat JSON object and print it as a sorted mapping
    Decode(DecodeArgs),
}

#[derive(Debug, Args)]
pub struct InputArgs {
    /// Input file (`-` reads stdin)
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// Field delimiter (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of the input file (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
}

#[derive(Debug, Args)]
pub struct SniffArgs {
    #[command(flatten)]
    pub source: InputArgs,
    /// Write the detected schema to this file (.yaml or .json)
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct CheckArgs {
    #[command(flatten)]
    pub source: InputArgs,
    /// Number of randomly drawn lines compared with the first line
    #[arg(long, default_value_t = DEFAULT_SAMPLES)]
    pub samples: usize,
    /// Compare every line instead of sampling
    #[arg(long = "full-scan")]
    pub full_scan: bool,
}

#[derive(Debug, Args)]
pub struct PlanArgs {
    #[command(flatten)]
    pub source: InputArgs,
    /// Target table name (defaults to the input file stem)
    #[arg(short = 't', long = "table")]
    pub table: Option<String>,
    /// Destination script (defaults to stdout)
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
    /// Prefix the script with the catalog bootstrap statement
    #[arg(long)]
    pub bootstrap: bool,
    /// Capacity of text columns
    #[arg(long = "text-capacity", default_value_t = DEFAULT_TEXT_CAPACITY)]
    pub text_capacity: usize,
    /// Catalog id of the user the table is registered to
    #[arg(long = "creator-id", default_value_t = 1)]
    pub creator_id: i64,
    /// Number of randomly drawn lines checked before planning (0 skips the check)
    #[arg(long, default_value_t = DEFAULT_SAMPLES)]
    pub samples: usize,
}

#[derive(Debug, Args)]
pub struct DecodeArgs {
    /// File holding the object (`-` reads stdin)
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
}

pub fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "tab" | "\t" => Ok(b'\t'),
        "comma" | "," => Ok(b','),
        "|" | "pipe" => Ok(b'|'),
        ";" | "semicolon" => Ok(b';'),
        other => {
            let mut chars = other.chars();
            let first = chars
                .next()
                .ok_or_else(|| "Delimiter cannot be empty".to_string())?;
            if chars.next().is_some() {
                return Err("Delimiter must be a single character".to_string());
            }
            if !first.is_ascii() {
                return Err("Delimiter must be ASCII".to_string());
            }
            if first == '\n' {
                return Err("Newline separates records and cannot be a delimiter".to_string());
            }
            Ok(first as u8)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_named_and_literal_delimiters() {
        assert_eq!(parse_delimiter("tab"), Ok(b'\t'));
        assert_eq!(parse_delimiter("pipe"), Ok(b'|'));
        assert_eq!(parse_delimiter(":"), Ok(b':'));
    }

    #[test]
    fn rejects_unusable_delimiters() {
        assert!(parse_delimiter("").is_err());
        assert!(parse_delimiter("::").is_err());
        assert!(parse_delimiter("§").is_err());
        assert!(parse_delimiter("\n").is_err());
    }

    #[test]
    fn plan_defaults_match_library_defaults() {
        let cli = Cli::try_parse_from(["csv-loader", "plan", "-i", "people.csv"]).expect("parse");
        match cli.command {
            Commands::Plan(args) => {
                assert_eq!(args.text_capacity, DEFAULT_TEXT_CAPACITY);
                assert_eq!(args.creator_id, 1);
                assert_eq!(args.samples, DEFAULT_SAMPLES);
                assert!(args.table.is_none());
                assert!(!args.bootstrap);
            }
            other => panic!("Expected plan command, got {other:?}"),
        }
    }
}
