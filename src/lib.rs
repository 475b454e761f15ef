//! Schema unification and streaming reads across heterogeneous tabular sources.
//!
//! The engine (type hierarchy, resolver, spec merge, transformation, index
//! mapping, row keys and the read decorator pipeline) is generic over the
//! type identity `T` and the raw value `V`. The `csv-unify` binary plugs CSV
//! files in as string-valued sources typed by [`column_type::ColumnType`].

pub mod cli;
pub mod column_type;
pub mod config;
pub mod data;
pub mod decorate;
pub mod error;
pub mod guess;
pub mod hierarchy;
pub mod index_mapper;
pub mod io_utils;
pub mod multi_read;
pub mod preview;
pub mod probe;
pub mod raw_spec;
pub mod read;
pub mod resolver;
pub mod row_key;
pub mod settings;
pub mod table;
pub mod transformation;
pub mod typed_spec;
pub mod unify;

use std::{env, sync::Arc, sync::OnceLock};

use anyhow::{Context, Result};
use clap::Parser;
use log::{LevelFilter, debug, warn};

use crate::{
    cli::{Cli, Commands, ShapeArgs, SourceArgs},
    column_type::ColumnType,
    config::TableReadConfig,
    io_utils::CsvSource,
    multi_read::{MultiTableReader, MultiTableSpec},
    transformation::{ColumnFilterMode, TableTransformation},
};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("csv_unify", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Probe(args) => probe::execute(&args),
        Commands::Unify(args) => unify::execute(&args),
        Commands::Preview(args) => preview::execute(&args),
    }
}

/// Loads `--config` when given and applies the flag overrides on top.
pub(crate) fn read_config(args: &SourceArgs) -> Result<TableReadConfig> {
    let mut config = match &args.config {
        Some(path) => settings::load_read_config(path)
            .with_context(|| format!("Loading read config from {path:?}"))?,
        None => TableReadConfig::default(),
    };
    if args.no_header {
        config = config.with_column_header_idx(None);
    }
    if let Some(row) = args.header_row {
        config = config.with_column_header_idx(Some(row));
    }
    if let Some(column) = args.row_id_column {
        config = config.with_row_id_idx(Some(column));
    }
    if let Some(tag) = &args.prefix_source {
        config = config
            .with_prepend_source_idx_to_row_id(true)
            .with_source_prefix_for_row_ids(tag.clone());
    }
    if let Some(prefix) = &args.row_prefix {
        config = config.with_prefix_for_generated_row_ids(prefix.clone());
    }
    if let Some(rows) = args.skip_rows {
        config = config.with_rows_to_skip(Some(rows));
    }
    if let Some(limit) = args.limit {
        config = config.with_max_rows(Some(limit));
    }
    if let Some(skip) = args.skip_empty_rows {
        config = config.with_skip_empty_rows(skip);
    }
    if args.allow_short_rows {
        config = config.with_allow_short_rows(true);
    }
    if let Some(rows) = args.sample_rows {
        config = config.with_max_rows_for_spec((rows > 0).then_some(rows));
    }
    if config.use_column_header_idx() && config.effective_column_header_idx().is_none() {
        warn!(
            "Header row {:?} lies inside the {} skipped row(s); columns stay unnamed",
            config.column_header_idx(),
            config.num_rows_to_skip()
        );
    }
    debug!("Effective read config: {config:?}");
    Ok(config)
}

pub(crate) fn open_sources(args: &SourceArgs) -> Result<Vec<CsvSource>> {
    let encoding = io_utils::resolve_encoding(args.input_encoding.as_deref())?;
    if args.inputs.iter().filter(|path| io_utils::is_dash(path)).count() > 1 {
        anyhow::bail!("stdin ('-') can only be used as one input");
    }
    args.inputs
        .iter()
        .map(|path| {
            CsvSource::new(path, args.delimiter, encoding)
                .with_context(|| format!("Preparing input {path:?}"))
        })
        .collect()
}

pub(crate) fn string_reader(config: TableReadConfig) -> MultiTableReader<ColumnType, String> {
    MultiTableReader::new(
        ColumnType::hierarchy(),
        config,
        Arc::new(|value: &String| value.trim().to_string()),
    )
}

/// The saved transformation (or the default one for `spec`) with the shaping
/// flags applied.
pub(crate) fn shape_transformation(
    spec: &MultiTableSpec<ColumnType>,
    args: &ShapeArgs,
) -> Result<TableTransformation<ColumnType>> {
    let mut transformation = match &args.transformation {
        Some(path) => settings::load_transformation(path)
            .with_context(|| format!("Loading transformation from {path:?}"))?,
        None => TableTransformation::derive_default(spec.raw_spec().clone()),
    };
    if args.intersection {
        transformation = transformation.with_filter_mode(ColumnFilterMode::Intersection);
    }
    if args.drop_unknown_columns {
        transformation = transformation.with_keep_unknown_columns(false);
    }
    if args.enforce_types {
        transformation = transformation.with_enforce_types(true);
    }
    if args.skip_empty_columns {
        transformation = transformation.with_skip_empty_columns(true);
    }
    let selected = clean_names(&args.columns);
    if !selected.is_empty() {
        transformation
            .select(&selected)
            .context("Selecting output columns")?;
        transformation = transformation.with_keep_unknown_columns(false);
    }
    for name in clean_names(&args.exclude_columns) {
        transformation
            .set_keep(&name, false)
            .context("Excluding output columns")?;
    }
    Ok(transformation)
}

fn clean_names(names: &[String]) -> Vec<String> {
    names
        .iter()
        .map(|name| name.trim())
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

pub(crate) fn printable_delimiter(delimiter: u8) -> String {
    match delimiter {
        b'\t' => "\\t".to_string(),
        other => (other as char).to_string(),
    }
}
