//! CSV files as row sources, plus the writer used for unified output.
//!
//! [`CsvRead`] turns a delimited file into a [`Read`] of decoded strings:
//! records are read with a flexible, headerless `csv` reader so header
//! handling and ragged rows stay with the decorator pipeline. Blank fields
//! are reported as missing values and a record consisting of a single blank
//! field is an empty row.
//!
//! The `-` path reads standard input. It is buffered once so the two reading
//! passes see the same bytes.

use std::{
    fs::File,
    io::{self, BufReader, BufWriter, Cursor, Read as _, Write},
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{Context, anyhow};
use csv::QuoteStyle;
use encoding_rs::{Encoding, UTF_8};
use log::debug;

use crate::{
    error::Result,
    multi_read::ReadSource,
    read::{Read, Row},
};

pub const DEFAULT_CSV_DELIMITER: u8 = b',';
pub const DEFAULT_TSV_DELIMITER: u8 = b'\t';

pub fn is_dash(path: &Path) -> bool {
    path == Path::new("-")
}

pub fn resolve_encoding(label: Option<&str>) -> anyhow::Result<&'static Encoding> {
    match label {
        Some(value) => Encoding::for_label(value.trim().as_bytes())
            .ok_or_else(|| anyhow!("Unknown encoding '{value}'")),
        None => Ok(UTF_8),
    }
}

/// `.tsv` files default to tabs, everything else to commas.
pub fn resolve_input_delimiter(path: &Path, provided: Option<u8>) -> u8 {
    provided.unwrap_or_else(|| match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("tsv") => DEFAULT_TSV_DELIMITER,
        _ => DEFAULT_CSV_DELIMITER,
    })
}

pub fn resolve_output_delimiter(path: Option<&Path>, provided: Option<u8>) -> u8 {
    match (provided, path) {
        (Some(delimiter), _) => delimiter,
        (None, Some(path)) if !is_dash(path) => resolve_input_delimiter(path, None),
        _ => DEFAULT_CSV_DELIMITER,
    }
}

pub fn decode_field(bytes: &[u8], encoding: &'static Encoding) -> anyhow::Result<String> {
    let (text, _, had_errors) = encoding.decode(bytes);
    if had_errors {
        return Err(anyhow!(
            "Failed to decode text with encoding {}",
            encoding.name()
        ));
    }
    Ok(text.into_owned())
}

pub fn open_csv_writer(path: Option<&Path>, delimiter: u8) -> anyhow::Result<csv::Writer<Box<dyn Write>>> {
    let sink: Box<dyn Write> = match path {
        Some(p) if !is_dash(p) => Box::new(BufWriter::new(
            File::create(p).with_context(|| format!("Creating output file {p:?}"))?,
        )),
        _ => Box::new(io::stdout()),
    };
    let mut builder = csv::WriterBuilder::new();
    builder
        .delimiter(delimiter)
        .quote_style(QuoteStyle::Necessary)
        .double_quote(true);
    Ok(builder.from_writer(sink))
}

/// One open CSV file. The underlying reader is dropped on `close()`.
pub struct CsvRead {
    label: String,
    reader: Option<csv::Reader<Box<dyn io::Read>>>,
    record: csv::ByteRecord,
    encoding: &'static Encoding,
    size: Option<u64>,
    position: u64,
}

impl CsvRead {
    pub fn from_reader(
        label: impl Into<String>,
        reader: Box<dyn io::Read>,
        delimiter: u8,
        encoding: &'static Encoding,
        size: Option<u64>,
    ) -> Self {
        let reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .delimiter(delimiter)
            .double_quote(true)
            .from_reader(reader);
        Self {
            label: label.into(),
            reader: Some(reader),
            record: csv::ByteRecord::new(),
            encoding,
            size,
            position: 0,
        }
    }

    pub fn open(path: &Path, delimiter: u8, encoding: &'static Encoding) -> anyhow::Result<Self> {
        let file = File::open(path).with_context(|| format!("Opening input file {path:?}"))?;
        let size = file.metadata().ok().map(|metadata| metadata.len());
        Ok(Self::from_reader(
            path.display().to_string(),
            Box::new(BufReader::new(file)),
            delimiter,
            encoding,
            size,
        ))
    }

    pub fn is_closed(&self) -> bool {
        self.reader.is_none()
    }
}

impl Read<String> for CsvRead {
    fn next(&mut self) -> Result<Option<Row<String>>> {
        let Some(reader) = self.reader.as_mut() else {
            return Ok(None);
        };
        let has_record = reader
            .read_byte_record(&mut self.record)
            .with_context(|| format!("Reading {}", self.label))?;
        self.position = reader.position().byte();
        if !has_record {
            return Ok(None);
        }
        let line = self.record.position().map(|p| p.line()).unwrap_or_default();
        if self.record.len() == 1 && self.record[0].iter().all(u8::is_ascii_whitespace) {
            return Ok(Some(Row::empty()));
        }
        let values = self
            .record
            .iter()
            .map(|field| {
                let text = decode_field(field, self.encoding)
                    .with_context(|| format!("Decoding line {line} of {}", self.label))?;
                Ok((!text.trim().is_empty()).then_some(text))
            })
            .collect::<anyhow::Result<Vec<_>>>()?;
        Ok(Some(Row::new(values)))
    }

    fn progress(&self) -> u64 {
        self.position
    }

    fn max_progress(&self) -> Option<u64> {
        self.size
    }

    fn estimated_size_in_bytes(&self) -> Option<u64> {
        self.size
    }

    fn close(&mut self) -> Result<()> {
        if self.reader.take().is_some() {
            debug!("Closed {} after {} byte(s)", self.label, self.position);
        }
        Ok(())
    }
}

/// A CSV input that can be opened once per reading pass.
#[derive(Debug, Clone)]
pub struct CsvSource {
    path: PathBuf,
    label: String,
    delimiter: u8,
    encoding: &'static Encoding,
    buffered: Option<Arc<[u8]>>,
}

impl CsvSource {
    pub fn new(path: &Path, delimiter: Option<u8>, encoding: &'static Encoding) -> anyhow::Result<Self> {
        let buffered = if is_dash(path) {
            let mut bytes = Vec::new();
            io::stdin()
                .lock()
                .read_to_end(&mut bytes)
                .context("Reading CSV from stdin")?;
            Some(Arc::from(bytes))
        } else {
            None
        };
        let label = if is_dash(path) {
            "<stdin>".to_string()
        } else {
            path.display().to_string()
        };
        Ok(Self {
            path: path.to_path_buf(),
            label,
            delimiter: resolve_input_delimiter(path, delimiter),
            encoding,
            buffered,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn delimiter(&self) -> u8 {
        self.delimiter
    }
}

impl ReadSource<String> for CsvSource {
    fn label(&self) -> &str {
        &self.label
    }

    fn open(&self) -> Result<Box<dyn Read<String>>> {
        let read = match &self.buffered {
            Some(bytes) => CsvRead::from_reader(
                self.label.clone(),
                Box::new(Cursor::new(Arc::clone(bytes))),
                self.delimiter,
                self.encoding,
                Some(bytes.len() as u64),
            ),
            None => CsvRead::open(&self.path, self.delimiter, self.encoding)?,
        };
        Ok(Box::new(read))
    }
}
