pub mod classify;
pub mod cli;
pub mod codec;
pub mod error;
pub mod io_utils;
pub mod plan;
pub mod request;
pub mod sample;
pub mod schema;
pub mod split;
pub mod statements;
pub mod storage;

pub use classify::{TypeTag, classify, classify_row};
pub use error::{Error, StorageError, StructuralError, ValidationError};
pub use plan::{IngestionPlan, PlanOptions, plan_ingestion};
pub use schema::{Column, HeaderLayout, Schema};
pub use split::{Substring, split_views};
pub use storage::{IngestReport, SqlScript, Storage, apply_plan};

use std::{env, io::Write, path::Path, sync::OnceLock};

use anyhow::{Context, Result};
use clap::Parser;
use log::{LevelFilter, debug, info, warn};
use serde::Serialize;

use crate::{
    cli::{Cli, Commands},
    request::UploadRequest,
};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("csv_loader", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Sniff(args) => handle_sniff(&args),
        Commands::Check(args) => handle_check(&args),
        Commands::Plan(args) => handle_plan(&args),
        Commands::Decode(args) => handle_decode(&args),
    }
}

struct Source {
    content: String,
    delimiter: u8,
}

fn load_source(args: &cli::InputArgs) -> Result<Source> {
    let delimiter = io_utils::resolve_input_delimiter(&args.input, args.delimiter);
    let encoding = io_utils::resolve_encoding(args.input_encoding.as_deref())?;
    debug!(
        "Reading '{}' as {} with delimiter '{}'",
        args.input.display(),
        encoding.name(),
        printable_delimiter(delimiter)
    );
    let content = io_utils::read_input(&args.input, encoding)?;
    Ok(Source { content, delimiter })
}

fn fallback_table_name(input: &Path) -> String {
    let stem = io_utils::file_stem(input);
    if stem.is_empty() { "stdin".to_string() } else { stem }
}

#[derive(Serialize)]
struct SniffReport<'a> {
    layout: HeaderLayout,
    #[serde(flatten)]
    schema: &'a Schema,
}

fn handle_sniff(args: &cli::SniffArgs) -> Result<()> {
    let source = load_source(&args.source)?;
    let table = fallback_table_name(&args.source.input);
    let options = PlanOptions {
        separator: source.delimiter,
        ..PlanOptions::default()
    };
    let plan = plan_ingestion(&source.content, &table, options)
        .with_context(|| format!("Sniffing {:?}", args.source.input))?;
    info!(
        "Detected {} layout with {} column(s) in '{}'",
        plan.layout(),
        plan.schema().width(),
        args.source.input.display()
    );
    if let Some(path) = &args.output {
        plan.schema()
            .save(path)
            .with_context(|| format!("Writing schema to {path:?}"))?;
        info!("Schema written to {path:?}");
    }
    let report = SniffReport {
        layout: plan.layout(),
        schema: plan.schema(),
    };
    let yaml = serde_yaml::to_string(&report).context("Serializing sniff report")?;
    print!("{yaml}");
    Ok(())
}

fn handle_check(args: &cli::CheckArgs) -> Result<()> {
    let source = load_source(&args.source)?;
    let lines = split::views(&source.content, b'\n').count();
    if args.full_scan {
        if let Some(mismatch) = sample::first_shape_mismatch(&source.content, source.delimiter) {
            return Err(StructuralError::from(mismatch))
                .with_context(|| format!("Checking {:?}", args.source.input));
        }
    } else if !sample::looks_like_csv(&source.content, source.delimiter, args.samples) {
        return Err(StructuralError::ShapeSample)
            .with_context(|| format!("Checking {:?}", args.source.input));
    }
    let mode = if args.full_scan {
        "full scan".to_string()
    } else {
        format!("{} sample(s)", args.samples)
    };
    info!("{lines} line(s) passed the shape check ({mode})");
    println!("{}: consistent ({lines} line(s), {mode})", args.source.input.display());
    Ok(())
}

fn handle_plan(args: &cli::PlanArgs) -> Result<()> {
    let source = load_source(&args.source)?;
    let file_name = fallback_table_name(&args.source.input);
    let upload = UploadRequest {
        name: args.table.as_deref().unwrap_or(""),
        file_name: &file_name,
        content: &source.content,
    };
    let options = PlanOptions {
        separator: source.delimiter,
        text_capacity: args.text_capacity,
        creator_id: args.creator_id,
    };
    let prepared = upload
        .prepare(options, args.samples)
        .with_context(|| format!("Planning {:?}", args.source.input))?;
    for issue in &prepared.issues {
        warn!("{issue}");
    }

    let writer = io_utils::open_output(args.output.as_deref())?;
    let mut script = SqlScript::new(writer);
    if args.bootstrap {
        script
            .execute(&statements::bootstrap_catalog())
            .context("Writing catalog bootstrap")?;
    }
    let report = apply_plan(&mut script, &prepared.plan)
        .with_context(|| format!("Writing statements for '{}'", prepared.plan.table_name()))?;
    script.flush().context("Flushing script")?;
    info!(
        "Planned {} statement(s) for '{}': {} column(s), {} row(s)",
        script.statements_written(),
        report.table_name,
        report.columns,
        report.rows_inserted
    );
    Ok(())
}

fn handle_decode(args: &cli::DecodeArgs) -> Result<()> {
    let text = io_utils::read_input(&args.input, encoding_rs::UTF_8)?;
    let object = codec::try_decode(&text)
        .with_context(|| format!("Decoding object from {:?}", args.input))?;
    debug!("Decoded {} pair(s)", object.len());
    let mut stdout = std::io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, &object).context("Writing decoded object")?;
    writeln!(stdout)?;
    Ok(())
}

pub(crate) fn printable_delimiter(delimiter: u8) -> String {
    match delimiter {
        b',' => ",".to_string(),
        b'\t' => "\\t".to_string(),
        other => (other as char).to_string(),
    }
}
