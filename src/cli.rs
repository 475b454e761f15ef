use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(author, version, about = "Unify CSV files with differing layouts into one typed table", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Infer column types across the inputs and print the merged layout
    Probe(ProbeArgs),
    /// Write the unified table of all inputs as CSV
    Unify(UnifyArgs),
    /// Preview the first unified rows in a formatted table
    Preview(PreviewArgs),
}

#[derive(Debug, Args)]
pub struct SourceArgs {
    /// Input files, read in the given order ('-' reads stdin)
    #[arg(short = 'i', long = "input", required = true, action = clap::ArgAction::Append)]
    pub inputs: Vec<PathBuf>,
    /// YAML read configuration; flags below override its values
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// CSV delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of the inputs (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
    /// Treat every row as data; columns are named Column0, Column1, ...
    #[arg(long = "no-header", conflicts_with = "header_row")]
    pub no_header: bool,
    /// Zero-based row holding the column names
    #[arg(long = "header-row")]
    pub header_row: Option<u64>,
    /// Zero-based column holding the row keys
    #[arg(long = "row-id-column")]
    pub row_id_column: Option<usize>,
    /// Prefix extracted row keys with a source tag and the source's position
    #[arg(
        long = "prefix-source",
        value_name = "TAG",
        num_args = 0..=1,
        default_missing_value = crate::config::DEFAULT_SOURCE_PREFIX
    )]
    pub prefix_source: Option<String>,
    /// Prefix of generated row keys
    #[arg(long = "row-prefix")]
    pub row_prefix: Option<String>,
    /// Number of leading rows to skip in every input
    #[arg(long = "skip-rows")]
    pub skip_rows: Option<u64>,
    /// Maximum number of rows read from every input
    #[arg(long)]
    pub limit: Option<u64>,
    /// Whether rows without values are dropped
    #[arg(long = "skip-empty-rows", value_name = "BOOL")]
    pub skip_empty_rows: Option<bool>,
    /// Accept rows narrower than earlier rows
    #[arg(long = "allow-short-rows")]
    pub allow_short_rows: bool,
    /// Number of rows per input sampled for type inference (0 means full scan)
    #[arg(long = "sample-rows")]
    pub sample_rows: Option<u64>,
}

#[derive(Debug, Args)]
pub struct ShapeArgs {
    /// Saved transformation to apply (see `probe --transformation`)
    #[arg(long)]
    pub transformation: Option<PathBuf>,
    /// Restrict output to this comma-separated list of columns, in order
    #[arg(short = 'C', long = "columns", value_delimiter = ',', action = clap::ArgAction::Append)]
    pub columns: Vec<String>,
    /// Exclude this comma-separated list of columns from output
    #[arg(long = "exclude-columns", value_delimiter = ',', action = clap::ArgAction::Append)]
    pub exclude_columns: Vec<String>,
    /// Drop columns the transformation was not configured with
    #[arg(long = "drop-unknown-columns")]
    pub drop_unknown_columns: bool,
    /// Only output columns present in every input
    #[arg(long)]
    pub intersection: bool,
    /// Use the configured column types instead of the freshly inferred ones
    #[arg(long = "enforce-types")]
    pub enforce_types: bool,
    /// Leave out columns without a single value
    #[arg(long = "skip-empty-columns")]
    pub skip_empty_columns: bool,
}

#[derive(Debug, Args)]
pub struct ProbeArgs {
    #[command(flatten)]
    pub source: SourceArgs,
    /// Write the default transformation for the probed inputs to this YAML file
    #[arg(long)]
    pub transformation: Option<PathBuf>,
    /// Write the effective read configuration to this YAML file
    #[arg(long = "save-config")]
    pub save_config: Option<PathBuf>,
    /// Print the merged layout as JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct UnifyArgs {
    #[command(flatten)]
    pub source: SourceArgs,
    #[command(flatten)]
    pub shape: ShapeArgs,
    /// Output CSV file (stdout if omitted)
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
    /// Delimiter to use for output (defaults by extension, then ',')
    #[arg(long = "output-delimiter", value_parser = parse_delimiter)]
    pub output_delimiter: Option<u8>,
    /// Header of the leading row key column
    #[arg(long = "key-header", default_value = "key")]
    pub key_header: String,
    /// Write values as read instead of normalizing them to their column type
    #[arg(long)]
    pub raw: bool,
}

#[derive(Debug, Args)]
pub struct PreviewArgs {
    #[command(flatten)]
    pub source: SourceArgs,
    #[command(flatten)]
    pub shape: ShapeArgs,
    /// Number of unified rows to display
    #[arg(long, default_value_t = 10)]
    pub rows: usize,
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
            Ok(first as u8)
        }
    }
}
