//! Declarative per-read configuration supplied by the format collaborator.

use serde::{Deserialize, Serialize};

pub const DEFAULT_ROW_ID_PREFIX: &str = "Row";
pub const DEFAULT_SOURCE_PREFIX: &str = "File";

/// How rows of every source are selected, keyed and shaped.
///
/// Row indices (`column_header_idx`, `rows_to_skip`) are absolute positions in
/// the raw stream of each source. The header row does not count towards
/// `max_rows`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableReadConfig {
    row_id_idx: Option<usize>,
    column_header_idx: Option<u64>,
    rows_to_skip: Option<u64>,
    max_rows: Option<u64>,
    max_rows_for_spec: Option<u64>,
    skip_empty_rows: bool,
    allow_short_rows: bool,
    prepend_source_idx_to_row_id: bool,
    source_prefix_for_row_ids: String,
    prefix_for_generated_row_ids: String,
}

impl Default for TableReadConfig {
    fn default() -> Self {
        Self {
            row_id_idx: None,
            column_header_idx: Some(0),
            rows_to_skip: None,
            max_rows: None,
            max_rows_for_spec: None,
            skip_empty_rows: true,
            allow_short_rows: false,
            prepend_source_idx_to_row_id: false,
            source_prefix_for_row_ids: DEFAULT_SOURCE_PREFIX.to_string(),
            prefix_for_generated_row_ids: DEFAULT_ROW_ID_PREFIX.to_string(),
        }
    }
}

impl TableReadConfig {
    pub fn use_row_id_idx(&self) -> bool {
        self.row_id_idx.is_some()
    }

    pub fn row_id_idx(&self) -> Option<usize> {
        self.row_id_idx
    }

    pub fn use_column_header_idx(&self) -> bool {
        self.column_header_idx.is_some()
    }

    pub fn column_header_idx(&self) -> Option<u64> {
        self.column_header_idx
    }

    pub fn skip_rows(&self) -> bool {
        self.rows_to_skip.is_some_and(|n| n > 0)
    }

    pub fn num_rows_to_skip(&self) -> u64 {
        self.rows_to_skip.unwrap_or(0)
    }

    pub fn limit_rows(&self) -> bool {
        self.max_rows.is_some()
    }

    pub fn max_rows(&self) -> Option<u64> {
        self.max_rows
    }

    /// Upper bound on rows sampled per source while guessing its spec.
    pub fn max_rows_for_spec(&self) -> Option<u64> {
        self.max_rows_for_spec
    }

    pub fn skip_empty_rows(&self) -> bool {
        self.skip_empty_rows
    }

    pub fn allow_short_rows(&self) -> bool {
        self.allow_short_rows
    }

    pub fn prepend_source_idx_to_row_id(&self) -> bool {
        self.prepend_source_idx_to_row_id
    }

    pub fn source_prefix_for_row_ids(&self) -> &str {
        &self.source_prefix_for_row_ids
    }

    pub fn prefix_for_generated_row_ids(&self) -> &str {
        &self.prefix_for_generated_row_ids
    }

    /// The header row index, if a header is configured and is not part of the
    /// skipped prefix.
    pub fn effective_column_header_idx(&self) -> Option<u64> {
        self.column_header_idx
            .filter(|&header| header >= self.num_rows_to_skip())
    }

    pub fn with_row_id_idx(mut self, row_id_idx: Option<usize>) -> Self {
        self.row_id_idx = row_id_idx;
        self
    }

    pub fn with_column_header_idx(mut self, column_header_idx: Option<u64>) -> Self {
        self.column_header_idx = column_header_idx;
        self
    }

    pub fn with_rows_to_skip(mut self, rows_to_skip: Option<u64>) -> Self {
        self.rows_to_skip = rows_to_skip;
        self
    }

    pub fn with_max_rows(mut self, max_rows: Option<u64>) -> Self {
        self.max_rows = max_rows;
        self
    }

    pub fn with_max_rows_for_spec(mut self, max_rows_for_spec: Option<u64>) -> Self {
        self.max_rows_for_spec = max_rows_for_spec;
        self
    }

    pub fn with_skip_empty_rows(mut self, skip_empty_rows: bool) -> Self {
        self.skip_empty_rows = skip_empty_rows;
        self
    }

    pub fn with_allow_short_rows(mut self, allow_short_rows: bool) -> Self {
        self.allow_short_rows = allow_short_rows;
        self
    }

    pub fn with_prepend_source_idx_to_row_id(mut self, prepend: bool) -> Self {
        self.prepend_source_idx_to_row_id = prepend;
        self
    }

    pub fn with_source_prefix_for_row_ids(mut self, prefix: impl Into<String>) -> Self {
        self.source_prefix_for_row_ids = prefix.into();
        self
    }

    pub fn with_prefix_for_generated_row_ids(mut self, prefix: impl Into<String>) -> Self {
        self.prefix_for_generated_row_ids = prefix.into();
        self
    }
}
