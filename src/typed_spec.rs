//! Per-source column specs produced by local type inference.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

const POSITIONAL_NAME_PREFIX: &str = "Column";

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypedReaderColumnSpec<T> {
    pub name: Option<String>,
    pub column_type: T,
    pub has_type: bool,
}

impl<T> TypedReaderColumnSpec<T> {
    pub fn new(name: Option<String>, column_type: T, has_type: bool) -> Self {
        Self {
            name,
            column_type,
            has_type,
        }
    }

    pub fn named(name: impl Into<String>, column_type: T, has_type: bool) -> Self {
        Self::new(Some(name.into()), column_type, has_type)
    }

    pub fn has_name(&self) -> bool {
        self.name.is_some()
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypedReaderTableSpec<T> {
    columns: Vec<TypedReaderColumnSpec<T>>,
}

impl<T> TypedReaderTableSpec<T> {
    pub fn new(columns: Vec<TypedReaderColumnSpec<T>>) -> Self {
        Self { columns }
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn columns(&self) -> &[TypedReaderColumnSpec<T>] {
        &self.columns
    }

    pub fn column(&self, index: usize) -> Option<&TypedReaderColumnSpec<T>> {
        self.columns.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TypedReaderColumnSpec<T>> {
        self.columns.iter()
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|column| column.name() == Some(name))
    }

    /// Gives every unnamed column the positional name `Column<index>` and
    /// disambiguates repeated names with a ` (#n)` suffix.
    ///
    /// Applying it to an already named spec returns an equal spec.
    pub fn assign_names_if_missing(&self) -> Self
    where
        T: Clone,
    {
        let mut taken: HashSet<String> = self
            .columns
            .iter()
            .filter_map(|column| column.name.clone())
            .collect();
        let mut seen = HashSet::new();
        let columns = self
            .columns
            .iter()
            .enumerate()
            .map(|(idx, column)| {
                let name = match column.name.as_deref() {
                    Some(name) if seen.insert(name.to_string()) => name.to_string(),
                    Some(name) => make_unique(name, &mut taken),
                    None => {
                        let positional = format!("{POSITIONAL_NAME_PREFIX}{idx}");
                        if taken.insert(positional.clone()) {
                            seen.insert(positional.clone());
                            positional
                        } else {
                            make_unique(&positional, &mut taken)
                        }
                    }
                };
                TypedReaderColumnSpec::new(Some(name), column.column_type.clone(), column.has_type)
            })
            .collect();
        Self { columns }
    }
}

pub(crate) fn make_unique(name: &str, taken: &mut HashSet<String>) -> String {
    let mut counter = 1usize;
    loop {
        let candidate = format!("{name} (#{counter})");
        if taken.insert(candidate.clone()) {
            return candidate;
        }
        counter += 1;
    }
}

impl<T> FromIterator<TypedReaderColumnSpec<T>> for TypedReaderTableSpec<T> {
    fn from_iter<I: IntoIterator<Item = TypedReaderColumnSpec<T>>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<'a, T> IntoIterator for &'a TypedReaderTableSpec<T> {
    type Item = &'a TypedReaderColumnSpec<T>;
    type IntoIter = std::slice::Iter<'a, TypedReaderColumnSpec<T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.columns.iter()
    }
}
