//! Type inference over one source's rows.

use std::{fmt, hash::Hash};

use log::debug;

use crate::{
    config::TableReadConfig,
    error::Result,
    hierarchy::TypeHierarchy,
    read::Read,
    resolver::TypeResolver,
    row_key::ValueExtractor,
    typed_spec::{TypedReaderColumnSpec, TypedReaderTableSpec},
};

/// Guesses a [`TypedReaderTableSpec`] for a single source by resolving every
/// column's values against a value hierarchy.
pub struct SpecGuesser<'h, T, V> {
    hierarchy: &'h TypeHierarchy<T, V>,
    extractor: ValueExtractor<V>,
}

impl<'h, T, V> SpecGuesser<'h, T, V>
where
    T: Clone + Eq + Hash + fmt::Debug,
{
    /// `extractor` turns header values into column names.
    pub fn new(hierarchy: &'h TypeHierarchy<T, V>, extractor: ValueExtractor<V>) -> Self {
        Self {
            hierarchy,
            extractor,
        }
    }

    /// Consumes up to `max_rows_for_spec` rows of `read`. The row-ID column is
    /// left out of the table spec, so positions behind it are one less than the
    /// raw row positions.
    pub fn guess_spec<R>(&self, read: &mut R, config: &TableReadConfig) -> Result<TypedReaderTableSpec<T>>
    where
        R: Read<V> + ?Sized,
    {
        let row_id = config.row_id_idx();
        let mut resolvers: Vec<TypeResolver<'h, T, V>> = Vec::new();
        let mut sampled = 0u64;
        while config.max_rows_for_spec().is_none_or(|max| sampled < max) {
            let Some(row) = read.next()? else {
                break;
            };
            sampled += 1;
            if resolvers.len() < row.size() {
                resolvers.resize_with(row.size(), || self.hierarchy.create_resolver());
            }
            for (idx, value) in row.iter().enumerate() {
                if Some(idx) == row_id {
                    continue;
                }
                if let Some(value) = value {
                    resolvers[idx].accept(value);
                }
            }
        }

        let header = read.column_header();
        let width = resolvers
            .len()
            .max(header.map(|header| header.size()).unwrap_or(0));
        let columns: TypedReaderTableSpec<T> = (0..width)
            .filter(|idx| Some(*idx) != row_id)
            .map(|idx| {
                let name = header
                    .and_then(|header| header.get(idx))
                    .map(|value| (self.extractor)(value).trim().to_string())
                    .filter(|name| !name.is_empty());
                match resolvers.get(idx) {
                    Some(resolver) => TypedReaderColumnSpec::new(
                        name,
                        resolver.most_specific_type().clone(),
                        resolver.has_type(),
                    ),
                    None => TypedReaderColumnSpec::new(name, self.hierarchy.root_type().clone(), false),
                }
            })
            .collect();
        debug!(
            "Guessed {} column(s) from {} sampled row(s){}",
            columns.len(),
            sampled,
            if header.is_some() { " with header" } else { "" }
        );
        Ok(columns)
    }
}
