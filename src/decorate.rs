//! Composable row-stream decorators.
//!
//! Each [`DecoratedRead`] wraps another [`Read`] and adds exactly one
//! normalization from a closed set: header extraction, skipping, limiting,
//! empty-row filtering or short-row rejection. Decorators never alter row
//! content and delegate progress, size, header and `close()` queries to the
//! stream they wrap.
//!
//! Two presets build the configured chain, innermost first:
//!
//! 1. header extraction, when the header lies outside the skipped prefix
//! 2. skip, limit, or both as a `[from, to)` range
//! 3. empty-row filtering
//! 4. short-row rejection
//!
//! [`decorate_for_reading`] applies the full chain. [`decorate_for_spec_guessing`]
//! leaves out row-count limiting so type inference sees an untruncated sample.

use std::collections::VecDeque;

use log::debug;

use crate::{
    config::TableReadConfig,
    error::{Result, UnifyError},
    read::{Read, Row},
};

enum Decoration<V> {
    ColumnHeader {
        index: u64,
        primed: bool,
        pending: VecDeque<Row<V>>,
        header: Option<Row<V>>,
    },
    Skip {
        remaining: u64,
    },
    Limit {
        remaining: u64,
    },
    SkipEmpty,
    RejectShort {
        widest: usize,
        rows: u64,
    },
}

pub struct DecoratedRead<'a, V> {
    source: Box<dyn Read<V> + 'a>,
    decoration: Decoration<V>,
}

impl<'a, V: 'a> DecoratedRead<'a, V> {
    fn wrap(source: impl Read<V> + 'a, decoration: Decoration<V>) -> Self {
        Self {
            source: Box::new(source),
            decoration,
        }
    }
}

impl<V> Read<V> for DecoratedRead<'_, V> {
    fn next(&mut self) -> Result<Option<Row<V>>> {
        match &mut self.decoration {
            Decoration::ColumnHeader {
                index,
                primed,
                pending,
                header,
            } => {
                if !*primed {
                    *primed = true;
                    for position in 0..=*index {
                        let Some(row) = self.source.next()? else {
                            break;
                        };
                        if position == *index {
                            *header = Some(row);
                        } else {
                            pending.push_back(row);
                        }
                    }
                }
                match pending.pop_front() {
                    Some(row) => Ok(Some(row)),
                    None => self.source.next(),
                }
            }
            Decoration::Skip { remaining } => {
                while *remaining > 0 {
                    *remaining -= 1;
                    if self.source.next()?.is_none() {
                        *remaining = 0;
                        return Ok(None);
                    }
                }
                self.source.next()
            }
            Decoration::Limit { remaining } => {
                if *remaining == 0 {
                    return Ok(None);
                }
                let row = self.source.next()?;
                *remaining = if row.is_some() { *remaining - 1 } else { 0 };
                Ok(row)
            }
            Decoration::SkipEmpty => loop {
                match self.source.next()? {
                    Some(row) if row.is_empty() => continue,
                    other => return Ok(other),
                }
            },
            Decoration::RejectShort { widest, rows } => {
                let Some(row) = self.source.next()? else {
                    return Ok(None);
                };
                let current = *rows;
                *rows += 1;
                // empty rows are governed by the empty-row policy
                if !row.is_empty() && row.size() < *widest {
                    return Err(UnifyError::ShortRow {
                        row: current,
                        width: row.size(),
                        expected: *widest,
                    });
                }
                *widest = (*widest).max(row.size());
                Ok(Some(row))
            }
        }
    }

    fn progress(&self) -> u64 {
        self.source.progress()
    }

    fn max_progress(&self) -> Option<u64> {
        self.source.max_progress()
    }

    fn estimated_size_in_bytes(&self) -> Option<u64> {
        self.source.estimated_size_in_bytes()
    }

    fn column_header(&self) -> Option<&Row<V>> {
        match &self.decoration {
            Decoration::ColumnHeader {
                header: Some(header),
                ..
            } => Some(header),
            _ => self.source.column_header(),
        }
    }

    fn close(&mut self) -> Result<()> {
        self.source.close()
    }
}

/// Returns at most `max_rows` rows and never pulls from the source afterwards.
pub fn limit<'a, V: 'a>(read: impl Read<V> + 'a, max_rows: u64) -> DecoratedRead<'a, V> {
    DecoratedRead::wrap(
        read,
        Decoration::Limit {
            remaining: max_rows,
        },
    )
}

/// Discards the first `rows` rows, pulling them on the first call to `next`.
pub fn skip<'a, V: 'a>(read: impl Read<V> + 'a, rows: u64) -> DecoratedRead<'a, V> {
    DecoratedRead::wrap(read, Decoration::Skip { remaining: rows })
}

/// Rows `[from, to)`: `skip(from)` followed by `limit(to - from)`.
pub fn range<'a, V: 'a>(read: impl Read<V> + 'a, from: u64, to: u64) -> DecoratedRead<'a, V> {
    limit(skip(read, from), to.saturating_sub(from))
}

pub fn skip_empty_rows<'a, V: 'a>(read: impl Read<V> + 'a) -> DecoratedRead<'a, V> {
    DecoratedRead::wrap(read, Decoration::SkipEmpty)
}

/// Fails with [`UnifyError::ShortRow`] on a non-empty row narrower than an
/// earlier one.
pub fn reject_short_rows<'a, V: 'a>(read: impl Read<V> + 'a) -> DecoratedRead<'a, V> {
    DecoratedRead::wrap(read, Decoration::RejectShort { widest: 0, rows: 0 })
}

/// Removes the row at absolute position `index` from the stream and exposes it
/// through [`Read::column_header`]. The first call to `next` reads ahead to the
/// header and buffers the rows in front of it, so the header is known as soon
/// as any row has been returned.
pub fn extract_column_header<'a, V: 'a>(read: impl Read<V> + 'a, index: u64) -> DecoratedRead<'a, V> {
    DecoratedRead::wrap(
        read,
        Decoration::ColumnHeader {
            index,
            primed: false,
            pending: VecDeque::new(),
            header: None,
        },
    )
}

pub fn decorate_for_reading<'a, V: 'a>(
    read: impl Read<V> + 'a,
    config: &TableReadConfig,
) -> Box<dyn Read<V> + 'a> {
    decorate(read, config, true)
}

pub fn decorate_for_spec_guessing<'a, V: 'a>(
    read: impl Read<V> + 'a,
    config: &TableReadConfig,
) -> Box<dyn Read<V> + 'a> {
    decorate(read, config, false)
}

fn decorate<'a, V: 'a>(
    read: impl Read<V> + 'a,
    config: &TableReadConfig,
    apply_limit: bool,
) -> Box<dyn Read<V> + 'a> {
    let mut decorated: Box<dyn Read<V> + 'a> = Box::new(read);
    if let Some(header) = config.effective_column_header_idx() {
        decorated = Box::new(extract_column_header(decorated, header));
    }
    let max_rows = config.max_rows().filter(|_| apply_limit);
    let skipped = config.num_rows_to_skip();
    match (config.skip_rows(), max_rows) {
        (true, Some(max)) => {
            decorated = Box::new(range(decorated, skipped, skipped.saturating_add(max)));
        }
        (true, None) => decorated = Box::new(skip(decorated, skipped)),
        (false, Some(max)) => decorated = Box::new(limit(decorated, max)),
        (false, None) => {}
    }
    if config.skip_empty_rows() {
        decorated = Box::new(skip_empty_rows(decorated));
    }
    if !config.allow_short_rows() {
        decorated = Box::new(reject_short_rows(decorated));
    }
    debug!(
        "Decorated read: header={:?} skip={} limit={:?} skip_empty={} allow_short={}",
        config.effective_column_header_idx(),
        skipped,
        max_rows,
        config.skip_empty_rows(),
        config.allow_short_rows()
    );
    decorated
}
