//! Union of every source's typed spec into one raw spec.

use std::{collections::HashMap, fmt, hash::Hash};

use log::debug;
use serde::{Deserialize, Serialize};

use crate::{
    hierarchy::TypeHierarchy,
    resolver::TypeResolver,
    typed_spec::{TypedReaderColumnSpec, TypedReaderTableSpec},
};

/// All columns seen across the sources, each with its globally resolved type.
///
/// `union` lists every column in order of first appearance; `intersection`
/// keeps, in the same order, only the columns every source reported.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RawSpec<T> {
    union: TypedReaderTableSpec<T>,
    intersection: TypedReaderTableSpec<T>,
}

struct MergedColumn<'h, T> {
    name: String,
    resolver: TypeResolver<'h, T, T>,
    occurrences: usize,
}

impl<T> RawSpec<T>
where
    T: Clone + Eq + Hash + fmt::Debug,
{
    /// Merges per-source specs. `type_hierarchy` is the type-focused view of
    /// the value hierarchy (see [`TypeHierarchy::create_type_focused_hierarchy`]),
    /// so each column's global type generalizes over the per-source types.
    pub fn merge(specs: &[TypedReaderTableSpec<T>], type_hierarchy: &TypeHierarchy<T, T>) -> Self {
        let mut merged: Vec<MergedColumn<'_, T>> = Vec::new();
        let mut positions: HashMap<String, usize> = HashMap::new();

        for spec in specs {
            let named = spec.assign_names_if_missing();
            for column in named.iter() {
                let Some(name) = column.name() else {
                    continue;
                };
                let position = *positions.entry(name.to_string()).or_insert_with(|| {
                    merged.push(MergedColumn {
                        name: name.to_string(),
                        resolver: type_hierarchy.create_resolver(),
                        occurrences: 0,
                    });
                    merged.len() - 1
                });
                let entry = &mut merged[position];
                entry.occurrences += 1;
                if column.has_type {
                    entry.resolver.accept(&column.column_type);
                }
            }
        }

        let source_count = specs.len();
        let mut union = Vec::with_capacity(merged.len());
        let mut intersection = Vec::new();
        for column in merged {
            let spec = TypedReaderColumnSpec::named(
                column.name,
                column.resolver.most_specific_type().clone(),
                column.resolver.has_type(),
            );
            if column.occurrences == source_count {
                intersection.push(spec.clone());
            }
            union.push(spec);
        }
        debug!(
            "Merged {} source spec(s) into {} column(s), {} shared by all",
            source_count,
            union.len(),
            intersection.len()
        );
        Self {
            union: TypedReaderTableSpec::new(union),
            intersection: TypedReaderTableSpec::new(intersection),
        }
    }
}

impl<T> RawSpec<T> {
    pub fn union(&self) -> &TypedReaderTableSpec<T> {
        &self.union
    }

    pub fn intersection(&self) -> &TypedReaderTableSpec<T> {
        &self.intersection
    }
}
