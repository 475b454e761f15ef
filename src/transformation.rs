//! User or derived mapping from the raw spec to the output spec.
//!
//! A [`TableTransformation`] records, for every column of the raw spec it was
//! configured against, whether the column is kept, where it goes, what it is
//! called and whether its type is pinned. Applying it to a (possibly newer)
//! raw spec yields the [`OutputSpec`]. Columns the configured raw spec did not
//! know are handled by one table-level policy: dropped, or inserted at a fixed
//! position.

use std::{collections::HashSet, fmt, hash::Hash};

use log::debug;
use serde::{Deserialize, Serialize};

use crate::{
    error::{Result, UnifyError},
    raw_spec::RawSpec,
    typed_spec::{TypedReaderTableSpec, make_unique},
};

/// Which raw columns take part in the output at all.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnFilterMode {
    /// Every column seen in any source.
    #[default]
    Union,
    /// Only columns present in every source.
    Intersection,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColumnTransformation<T> {
    /// Name in the raw spec.
    pub name: String,
    pub output_name: String,
    pub column_type: T,
    #[serde(default)]
    pub enforce_type: bool,
    #[serde(default = "default_keep")]
    pub keep: bool,
    pub position: usize,
}

fn default_keep() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TableTransformation<T> {
    raw_spec: RawSpec<T>,
    columns: Vec<ColumnTransformation<T>>,
    #[serde(default)]
    filter_mode: ColumnFilterMode,
    #[serde(default = "default_keep")]
    keep_unknown_columns: bool,
    unknown_columns_position: usize,
    #[serde(default)]
    enforce_types: bool,
    #[serde(default)]
    skip_empty_columns: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OutputColumn<T> {
    pub raw_name: String,
    pub name: String,
    pub column_type: T,
}

/// The final column layout of the unified table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OutputSpec<T> {
    columns: Vec<OutputColumn<T>>,
}

impl<T> OutputSpec<T> {
    pub fn columns(&self) -> &[OutputColumn<T>] {
        &self.columns
    }

    pub fn column(&self, index: usize) -> Option<&OutputColumn<T>> {
        self.columns.get(index)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.columns.iter().map(|column| column.name.as_str())
    }

    /// Raw names in output order, the input of an index mapper factory.
    pub fn raw_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.columns.iter().map(|column| column.raw_name.as_str())
    }
}

impl<T> TableTransformation<T>
where
    T: Clone + Eq + Hash + fmt::Debug,
{
    /// Keeps every column in raw order with loose types; unknown columns are
    /// kept and appended at the end.
    pub fn derive_default(raw_spec: RawSpec<T>) -> Self {
        let columns: Vec<_> = raw_spec
            .union()
            .assign_names_if_missing()
            .iter()
            .enumerate()
            .filter_map(|(position, column)| {
                let name = column.name()?.to_string();
                Some(ColumnTransformation {
                    output_name: name.clone(),
                    name,
                    column_type: column.column_type.clone(),
                    enforce_type: false,
                    keep: true,
                    position,
                })
            })
            .collect();
        let unknown_columns_position = columns.len();
        Self {
            raw_spec,
            columns,
            filter_mode: ColumnFilterMode::Union,
            keep_unknown_columns: true,
            unknown_columns_position,
            enforce_types: false,
            skip_empty_columns: false,
        }
    }

    pub fn raw_spec(&self) -> &RawSpec<T> {
        &self.raw_spec
    }

    pub fn columns(&self) -> &[ColumnTransformation<T>] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&ColumnTransformation<T>> {
        self.columns.iter().find(|column| column.name == name)
    }

    pub fn filter_mode(&self) -> ColumnFilterMode {
        self.filter_mode
    }

    pub fn keep_unknown_columns(&self) -> bool {
        self.keep_unknown_columns
    }

    pub fn unknown_columns_position(&self) -> usize {
        self.unknown_columns_position
    }

    pub fn enforce_types(&self) -> bool {
        self.enforce_types
    }

    pub fn skip_empty_columns(&self) -> bool {
        self.skip_empty_columns
    }

    pub fn with_filter_mode(mut self, filter_mode: ColumnFilterMode) -> Self {
        self.filter_mode = filter_mode;
        self
    }

    pub fn with_keep_unknown_columns(mut self, keep: bool) -> Self {
        self.keep_unknown_columns = keep;
        self
    }

    pub fn with_unknown_columns_position(mut self, position: usize) -> Self {
        self.unknown_columns_position = position;
        self
    }

    pub fn with_enforce_types(mut self, enforce: bool) -> Self {
        self.enforce_types = enforce;
        self
    }

    pub fn with_skip_empty_columns(mut self, skip: bool) -> Self {
        self.skip_empty_columns = skip;
        self
    }

    pub fn set_keep(&mut self, name: &str, keep: bool) -> Result<()> {
        self.column_mut(name)?.keep = keep;
        Ok(())
    }

    pub fn rename(&mut self, name: &str, output_name: impl Into<String>) -> Result<()> {
        self.column_mut(name)?.output_name = output_name.into();
        Ok(())
    }

    /// Pins the column to `column_type` regardless of later inference.
    pub fn enforce_type(&mut self, name: &str, column_type: T) -> Result<()> {
        let column = self.column_mut(name)?;
        column.column_type = column_type;
        column.enforce_type = true;
        Ok(())
    }

    pub fn loosen_type(&mut self, name: &str) -> Result<()> {
        self.column_mut(name)?.enforce_type = false;
        Ok(())
    }

    /// Moves a column to `position` in the configured order, shifting the
    /// columns behind it.
    pub fn move_to(&mut self, name: &str, position: usize) -> Result<()> {
        let mut ordered = self.ordered_names();
        let current = ordered
            .iter()
            .position(|candidate| candidate == name)
            .ok_or_else(|| UnifyError::UnknownColumn(name.to_string()))?;
        let moved = ordered.remove(current);
        ordered.insert(position.min(ordered.len()), moved);
        self.renumber(&ordered);
        Ok(())
    }

    /// Keeps exactly `names`, in that order, in front of the excluded columns.
    pub fn select<S: AsRef<str>>(&mut self, names: &[S]) -> Result<()> {
        let mut ordered: Vec<String> = Vec::with_capacity(self.columns.len());
        for name in names {
            let name = name.as_ref();
            if self.column(name).is_none() {
                return Err(UnifyError::UnknownColumn(name.to_string()));
            }
            if !ordered.iter().any(|existing| existing == name) {
                ordered.push(name.to_string());
            }
        }
        let selected: HashSet<String> = ordered.iter().cloned().collect();
        for column in &mut self.columns {
            column.keep = selected.contains(&column.name);
        }
        ordered.extend(
            self.ordered_names()
                .into_iter()
                .filter(|name| !selected.contains(name)),
        );
        self.renumber(&ordered);
        Ok(())
    }

    /// Produces the output spec for `current`, the raw spec of the sources
    /// being read now.
    pub fn apply(&self, current: &RawSpec<T>) -> OutputSpec<T> {
        let candidates: TypedReaderTableSpec<T> = match self.filter_mode {
            ColumnFilterMode::Union => current.union().assign_names_if_missing(),
            ColumnFilterMode::Intersection => current.intersection().assign_names_if_missing(),
        };

        let mut known: Vec<(usize, OutputColumn<T>)> = Vec::new();
        let mut unknown: Vec<OutputColumn<T>> = Vec::new();
        for column in candidates.iter() {
            if self.skip_empty_columns && !column.has_type {
                continue;
            }
            let Some(raw_name) = column.name() else {
                continue;
            };
            match self.column(raw_name) {
                Some(configured) if configured.keep => {
                    let column_type = if configured.enforce_type || self.enforce_types {
                        configured.column_type.clone()
                    } else {
                        column.column_type.clone()
                    };
                    known.push((
                        configured.position,
                        OutputColumn {
                            raw_name: raw_name.to_string(),
                            name: configured.output_name.clone(),
                            column_type,
                        },
                    ));
                }
                Some(_) => {}
                None if self.keep_unknown_columns => unknown.push(OutputColumn {
                    raw_name: raw_name.to_string(),
                    name: raw_name.to_string(),
                    column_type: column.column_type.clone(),
                }),
                None => {}
            }
        }

        known.sort_by_key(|(position, _)| *position);
        let insert_at = known
            .iter()
            .take_while(|(position, _)| *position < self.unknown_columns_position)
            .count();
        let unknown_count = unknown.len();
        let mut columns: Vec<OutputColumn<T>> = known.into_iter().map(|(_, c)| c).collect();
        columns.splice(insert_at..insert_at, unknown);

        let mut taken: HashSet<String> = columns.iter().map(|c| c.name.clone()).collect();
        let mut seen = HashSet::new();
        for column in &mut columns {
            if !seen.insert(column.name.clone()) {
                column.name = make_unique(&column.name, &mut taken);
            }
        }
        debug!(
            "Transformation produced {} output column(s), {} of them unknown at configuration time",
            columns.len(),
            unknown_count
        );
        OutputSpec { columns }
    }

    fn column_mut(&mut self, name: &str) -> Result<&mut ColumnTransformation<T>> {
        self.columns
            .iter_mut()
            .find(|column| column.name == name)
            .ok_or_else(|| UnifyError::UnknownColumn(name.to_string()))
    }

    fn ordered_names(&self) -> Vec<String> {
        let mut ordered: Vec<&ColumnTransformation<T>> = self.columns.iter().collect();
        ordered.sort_by_key(|column| column.position);
        ordered.into_iter().map(|column| column.name.clone()).collect()
    }

    fn renumber(&mut self, ordered: &[String]) {
        for column in &mut self.columns {
            if let Some(position) = ordered.iter().position(|name| *name == column.name) {
                column.position = position;
            }
        }
    }
}
