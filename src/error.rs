//! Error type shared by the unification engine.

use std::io;

#[derive(Debug, thiserror::Error)]
pub enum UnifyError {
    #[error("Type '{0}' is already registered in the type hierarchy")]
    DuplicateType(String),
    #[error("Parent type '{parent}' of '{child}' is not registered in the type hierarchy")]
    UnknownParentType { parent: String, child: String },
    #[error("Output column {index} has no mapping in this source")]
    UnmappedColumn { index: usize },
    #[error(
        "Row {row} has {width} field(s) but a previous row had {expected}; enable short rows to read it"
    )]
    ShortRow {
        row: u64,
        width: usize,
        expected: usize,
    },
    #[error("Unknown column '{0}'")]
    UnknownColumn(String),
    #[error("Row key '{0}' is not unique")]
    DuplicateRowKey(String),
    #[error("Spec was created for {expected} source(s) but {actual} were provided")]
    SourceCountMismatch { expected: usize, actual: usize },
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Source(#[from] anyhow::Error),
}

pub type Result<T, E = UnifyError> = std::result::Result<T, E>;
