//! Row key strategies: extract from a column or count.

use std::{
    collections::HashSet,
    fmt,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

use crate::{
    config::TableReadConfig,
    error::{Result, UnifyError},
    read::Row,
};

/// Prefix of the key assigned when the key column is missing from a row.
pub const MISSING_ROW_KEY_PREFIX: &str = "?";

/// Converts a raw value into its key text.
pub type ValueExtractor<V> = Arc<dyn Fn(&V) -> String + Send + Sync>;

/// Per-read factory of per-source key generators.
pub enum RowKeyGeneratorContext<V> {
    Extracting {
        column: usize,
        source_prefix: Option<String>,
        extractor: ValueExtractor<V>,
    },
    Counting {
        prefix: String,
        counter: Arc<AtomicU64>,
    },
}

impl<V> RowKeyGeneratorContext<V> {
    /// Extracts keys from the configured row-ID column, otherwise counts.
    pub fn from_config(config: &TableReadConfig, extractor: ValueExtractor<V>) -> Self {
        match config.row_id_idx() {
            Some(column) => Self::Extracting {
                column,
                source_prefix: config
                    .prepend_source_idx_to_row_id()
                    .then(|| config.source_prefix_for_row_ids().to_string()),
                extractor,
            },
            None => Self::counting(config.prefix_for_generated_row_ids()),
        }
    }

    pub fn counting(prefix: impl Into<String>) -> Self {
        Self::Counting {
            prefix: prefix.into(),
            counter: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn create_key_generator(&self, source_ordinal: usize) -> RowKeyGenerator<V> {
        match self {
            Self::Extracting {
                column,
                source_prefix,
                extractor,
            } => RowKeyGenerator::Extracting {
                column: *column,
                prefix: source_prefix
                    .as_deref()
                    .map(|tag| format!("{tag}_{source_ordinal}_"))
                    .unwrap_or_default(),
                extractor: Arc::clone(extractor),
                rows: 0,
            },
            Self::Counting { prefix, counter } => RowKeyGenerator::Counting {
                prefix: prefix.clone(),
                counter: Arc::clone(counter),
            },
        }
    }
}

impl<V> fmt::Debug for RowKeyGeneratorContext<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Extracting {
                column,
                source_prefix,
                ..
            } => f
                .debug_struct("Extracting")
                .field("column", column)
                .field("source_prefix", source_prefix)
                .finish_non_exhaustive(),
            Self::Counting { prefix, counter } => f
                .debug_struct("Counting")
                .field("prefix", prefix)
                .field("next", &counter.load(Ordering::Relaxed))
                .finish(),
        }
    }
}

/// A generated key and where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowKey {
    /// Read from the row-ID column.
    Extracted(String),
    /// Placeholder for a row without a row-ID value.
    Missing(String),
    Counted(String),
}

impl RowKey {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Extracted(key) | Self::Missing(key) | Self::Counted(key) => key,
        }
    }

    pub fn into_string(self) -> String {
        match self {
            Self::Extracted(key) | Self::Missing(key) | Self::Counted(key) => key,
        }
    }
}

/// Keys handed out by one extracting read.
///
/// Two equal extracted keys are an error, as is an extracted key equal to a
/// placeholder already handed out. A placeholder that clashes with an issued
/// key gets a `#n` suffix instead.
#[derive(Debug, Default)]
pub struct IssuedKeys {
    extracted: HashSet<String>,
    placeholders: HashSet<String>,
}

impl IssuedKeys {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issue(&mut self, key: RowKey) -> Result<String> {
        match key {
            RowKey::Extracted(key) => {
                if self.placeholders.contains(&key) || !self.extracted.insert(key.clone()) {
                    return Err(UnifyError::DuplicateRowKey(key));
                }
                Ok(key)
            }
            RowKey::Missing(base) => {
                let mut key = base.clone();
                let mut suffix = 1u64;
                while self.extracted.contains(&key) || self.placeholders.contains(&key) {
                    key = format!("{base}#{suffix}");
                    suffix += 1;
                }
                self.placeholders.insert(key.clone());
                Ok(key)
            }
            RowKey::Counted(key) => Ok(key),
        }
    }
}

/// Produces one key per row of a single source without touching the row.
pub enum RowKeyGenerator<V> {
    Extracting {
        column: usize,
        prefix: String,
        extractor: ValueExtractor<V>,
        rows: u64,
    },
    Counting {
        prefix: String,
        counter: Arc<AtomicU64>,
    },
}

impl<V> RowKeyGenerator<V> {
    pub fn create_key(&mut self, row: &Row<V>) -> RowKey {
        match self {
            Self::Extracting {
                column,
                prefix,
                extractor,
                rows,
            } => {
                let row_index = *rows;
                *rows += 1;
                match row.get(*column) {
                    Some(value) => RowKey::Extracted(format!("{prefix}{}", extractor(value))),
                    None => RowKey::Missing(format!("{prefix}{MISSING_ROW_KEY_PREFIX}{row_index}")),
                }
            }
            Self::Counting { prefix, counter } => {
                let n = counter.fetch_add(1, Ordering::Relaxed);
                RowKey::Counted(format!("{prefix}{n}"))
            }
        }
    }
}
