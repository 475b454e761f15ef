//! Mapping from unified output columns to positions in one source's raw rows.

use std::collections::HashMap;

use crate::{
    config::TableReadConfig,
    error::{Result, UnifyError},
    typed_spec::TypedReaderTableSpec,
};

/// For every output column: the position of its value in this source's raw
/// rows, or `None` when the source does not provide the column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexMapper {
    mapping: Vec<Option<usize>>,
    row_id_idx: Option<usize>,
}

impl IndexMapper {
    pub fn has_mapping(&self, index: usize) -> bool {
        self.local_index(index).is_some()
    }

    /// Fails with [`UnifyError::UnmappedColumn`] if the source lacks the column.
    pub fn map(&self, index: usize) -> Result<usize> {
        self.local_index(index)
            .ok_or(UnifyError::UnmappedColumn { index })
    }

    pub fn local_index(&self, index: usize) -> Option<usize> {
        self.mapping.get(index).copied().flatten()
    }

    pub fn len(&self) -> usize {
        self.mapping.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mapping.is_empty()
    }

    /// Raw row position holding the row key, when keys are extracted.
    pub fn row_id_index(&self) -> Option<usize> {
        self.row_id_idx
    }
}

/// Builds one [`IndexMapper`] per source against a fixed output column order.
#[derive(Debug, Clone)]
pub struct IndexMapperFactory {
    global_positions: HashMap<String, usize>,
    width: usize,
    row_id_idx: Option<usize>,
}

impl IndexMapperFactory {
    /// `global_names` are the raw (pre-rename) names of the output columns in
    /// output order.
    pub fn new<I, S>(global_names: I, config: &TableReadConfig) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut global_positions = HashMap::new();
        let mut width = 0;
        for (idx, name) in global_names.into_iter().enumerate() {
            global_positions.entry(name.into()).or_insert(idx);
            width = idx + 1;
        }
        Self {
            global_positions,
            width,
            row_id_idx: config.row_id_idx(),
        }
    }

    /// Local spec positions at or after the row-ID column are shifted by one,
    /// since the local table spec excludes that column but the raw row still
    /// carries it.
    pub fn create<T: Clone>(&self, local_spec: &TypedReaderTableSpec<T>) -> IndexMapper {
        let named = local_spec.assign_names_if_missing();
        let mut mapping = vec![None; self.width];
        for (spec_idx, column) in named.iter().enumerate() {
            let Some(global) = column.name().and_then(|n| self.global_positions.get(n)) else {
                continue;
            };
            let local = match self.row_id_idx {
                Some(row_id) if spec_idx >= row_id => spec_idx + 1,
                _ => spec_idx,
            };
            mapping[*global] = Some(local);
        }
        IndexMapper {
            mapping,
            row_id_idx: self.row_id_idx,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::typed_spec::TypedReaderColumnSpec;

    fn spec(names: &[&str]) -> TypedReaderTableSpec<u8> {
        names
            .iter()
            .map(|name| TypedReaderColumnSpec::named(*name, 0u8, true))
            .collect()
    }

    #[test]
    fn maps_around_the_row_id_slot() {
        let config = TableReadConfig::default().with_row_id_idx(Some(1));
        let factory = IndexMapperFactory::new(["foo", "bar", "foobar"], &config);
        let mapper = factory.create(&spec(&["bar", "notInGlobal", "foo"]));

        assert_eq!(mapper.map(0).unwrap(), 3);
        assert_eq!(mapper.map(1).unwrap(), 0);
        assert!(!mapper.has_mapping(2));
        assert!(matches!(
            mapper.map(2),
            Err(UnifyError::UnmappedColumn { index: 2 })
        ));
        assert_eq!(mapper.row_id_index(), Some(1));
    }

    #[test]
    fn maps_directly_without_row_id() {
        let config = TableReadConfig::default();
        let factory = IndexMapperFactory::new(["a", "b"], &config);
        let mapper = factory.create(&spec(&["b", "a"]));
        assert_eq!(mapper.map(0).unwrap(), 1);
        assert_eq!(mapper.map(1).unwrap(), 0);
        assert!(!mapper.has_mapping(7));
    }

    #[test]
    fn unnamed_local_columns_map_positionally() {
        let config = TableReadConfig::default();
        let factory = IndexMapperFactory::new(["Column1", "Column0"], &config);
        let local: TypedReaderTableSpec<u8> = vec![
            TypedReaderColumnSpec::new(None, 0u8, true),
            TypedReaderColumnSpec::new(None, 0u8, true),
        ]
        .into_iter()
        .collect();
        let mapper = factory.create(&local);
        assert_eq!(mapper.map(0).unwrap(), 1);
        assert_eq!(mapper.map(1).unwrap(), 0);
    }
}
