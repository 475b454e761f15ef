//! Forward-only row streams.
//!
//! A [`Read`] is what the format collaborator hands to the engine: a finite,
//! non-restartable sequence of [`Row`]s that must be closed once consumed.
//! [`with_read`] scopes a read so it is closed on every exit path.

use std::collections::VecDeque;

use log::warn;

use crate::error::Result;

/// One raw row. Missing values and positions past the end both read as `None`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Row<V> {
    values: Vec<Option<V>>,
}

impl<V> Row<V> {
    pub fn new(values: Vec<Option<V>>) -> Self {
        Self { values }
    }

    pub fn empty() -> Self {
        Self { values: Vec::new() }
    }

    pub fn size(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&V> {
        self.values.get(index).and_then(Option::as_ref)
    }

    pub fn iter(&self) -> impl Iterator<Item = Option<&V>> + '_ {
        self.values.iter().map(Option::as_ref)
    }

    pub fn into_values(self) -> Vec<Option<V>> {
        self.values
    }
}

impl<V> From<Vec<Option<V>>> for Row<V> {
    fn from(values: Vec<Option<V>>) -> Self {
        Self::new(values)
    }
}

impl<V> FromIterator<Option<V>> for Row<V> {
    fn from_iter<I: IntoIterator<Item = Option<V>>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// Sequential source of rows.
pub trait Read<V> {
    /// Returns the next row or `None` once the stream is exhausted.
    fn next(&mut self) -> Result<Option<Row<V>>>;

    /// Work done so far, in the unit of [`Read::max_progress`].
    fn progress(&self) -> u64 {
        0
    }

    fn max_progress(&self) -> Option<u64> {
        None
    }

    fn estimated_size_in_bytes(&self) -> Option<u64> {
        None
    }

    /// Header row captured by a header-extracting decorator, if any.
    fn column_header(&self) -> Option<&Row<V>> {
        None
    }

    fn close(&mut self) -> Result<()>;
}

impl<V, R> Read<V> for Box<R>
where
    R: Read<V> + ?Sized,
{
    fn next(&mut self) -> Result<Option<Row<V>>> {
        (**self).next()
    }

    fn progress(&self) -> u64 {
        (**self).progress()
    }

    fn max_progress(&self) -> Option<u64> {
        (**self).max_progress()
    }

    fn estimated_size_in_bytes(&self) -> Option<u64> {
        (**self).estimated_size_in_bytes()
    }

    fn column_header(&self) -> Option<&Row<V>> {
        (**self).column_header()
    }

    fn close(&mut self) -> Result<()> {
        (**self).close()
    }
}

/// Runs `body` against `read` and closes the read afterwards, also when
/// `body` fails. A close failure after a failed body is logged and the body's
/// error is returned.
pub fn with_read<V, R, F, O>(mut read: R, body: F) -> Result<O>
where
    R: Read<V>,
    F: FnOnce(&mut R) -> Result<O>,
{
    match body(&mut read) {
        Ok(output) => {
            read.close()?;
            Ok(output)
        }
        Err(err) => {
            if let Err(close_err) = read.close() {
                warn!("Failed to close read after error: {close_err}");
            }
            Err(err)
        }
    }
}

/// A [`Read`] over rows already held in memory.
#[derive(Debug, Clone)]
pub struct InMemoryRead<V> {
    rows: VecDeque<Row<V>>,
    total: u64,
    consumed: u64,
    closed: bool,
}

impl<V> InMemoryRead<V> {
    pub fn new(rows: Vec<Row<V>>) -> Self {
        let total = rows.len() as u64;
        Self {
            rows: rows.into(),
            total,
            consumed: 0,
            closed: false,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl<V> FromIterator<Row<V>> for InMemoryRead<V> {
    fn from_iter<I: IntoIterator<Item = Row<V>>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<V> Read<V> for InMemoryRead<V> {
    fn next(&mut self) -> Result<Option<Row<V>>> {
        let row = self.rows.pop_front();
        if row.is_some() {
            self.consumed += 1;
        }
        Ok(row)
    }

    fn progress(&self) -> u64 {
        self.consumed
    }

    fn max_progress(&self) -> Option<u64> {
        Some(self.total)
    }

    fn close(&mut self) -> Result<()> {
        self.closed = true;
        self.rows.clear();
        Ok(())
    }
}
