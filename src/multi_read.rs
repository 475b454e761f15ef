//! Two-pass reads over several sources.
//!
//! Pass one ([`MultiTableReader::create_spec`]) guesses a spec per source and
//! merges them into a [`RawSpec`]. Pass two ([`MultiTableReader::create_read`])
//! re-opens the sources one after another and streams [`UnifiedRow`]s laid out
//! by the [`OutputSpec`] a [`TableTransformation`] derives from that raw spec.

use std::{fmt, hash::Hash};

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::{
    config::TableReadConfig,
    decorate::{decorate_for_reading, decorate_for_spec_guessing},
    error::{Result, UnifyError},
    guess::SpecGuesser,
    hierarchy::TypeHierarchy,
    index_mapper::{IndexMapper, IndexMapperFactory},
    raw_spec::RawSpec,
    read::{InMemoryRead, Read, Row, with_read},
    row_key::{IssuedKeys, RowKeyGenerator, RowKeyGeneratorContext, ValueExtractor},
    transformation::{OutputSpec, TableTransformation},
    typed_spec::TypedReaderTableSpec,
};

/// Something that can be opened for reading more than once.
pub trait ReadSource<V> {
    /// Human-readable name used in logs.
    fn label(&self) -> &str;

    fn open(&self) -> Result<Box<dyn Read<V>>>;
}

/// Rows held in memory, re-read from the start on every `open`.
#[derive(Debug, Clone)]
pub struct InMemorySource<V> {
    label: String,
    rows: Vec<Row<V>>,
}

impl<V> InMemorySource<V> {
    pub fn new(label: impl Into<String>, rows: Vec<Row<V>>) -> Self {
        Self {
            label: label.into(),
            rows,
        }
    }
}

impl<V: Clone + 'static> ReadSource<V> for InMemorySource<V> {
    fn label(&self) -> &str {
        &self.label
    }

    fn open(&self) -> Result<Box<dyn Read<V>>> {
        Ok(Box::new(InMemoryRead::new(self.rows.clone())))
    }
}

/// The merged raw spec together with the spec guessed for each source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultiTableSpec<T> {
    raw_spec: RawSpec<T>,
    individual_specs: Vec<TypedReaderTableSpec<T>>,
}

impl<T> MultiTableSpec<T> {
    pub fn raw_spec(&self) -> &RawSpec<T> {
        &self.raw_spec
    }

    pub fn individual_specs(&self) -> &[TypedReaderTableSpec<T>] {
        &self.individual_specs
    }

    pub fn source_count(&self) -> usize {
        self.individual_specs.len()
    }
}

/// One output row: its key and its values in output column order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnifiedRow<V> {
    pub key: String,
    pub values: Vec<Option<V>>,
}

pub struct MultiTableReader<T, V> {
    hierarchy: TypeHierarchy<T, V>,
    type_hierarchy: TypeHierarchy<T, T>,
    config: TableReadConfig,
    extractor: ValueExtractor<V>,
}

impl<T, V> MultiTableReader<T, V>
where
    T: Clone + Eq + Hash + fmt::Debug + Send + Sync + 'static,
    V: 'static,
{
    /// `extractor` converts values into header names and row keys.
    pub fn new(hierarchy: TypeHierarchy<T, V>, config: TableReadConfig, extractor: ValueExtractor<V>) -> Self {
        let type_hierarchy = hierarchy.create_type_focused_hierarchy();
        Self {
            hierarchy,
            type_hierarchy,
            config,
            extractor,
        }
    }

    pub fn config(&self) -> &TableReadConfig {
        &self.config
    }

    pub fn hierarchy(&self) -> &TypeHierarchy<T, V> {
        &self.hierarchy
    }

    /// Guesses every source's spec and merges them. Each source is closed
    /// before the next one is opened.
    pub fn create_spec<S>(&self, sources: &[S]) -> Result<MultiTableSpec<T>>
    where
        S: ReadSource<V>,
    {
        let guesser = SpecGuesser::new(&self.hierarchy, self.extractor.clone());
        let mut individual_specs = Vec::with_capacity(sources.len());
        for source in sources {
            let read = decorate_for_spec_guessing(source.open()?, &self.config);
            let spec = with_read(read, |read| guesser.guess_spec(read, &self.config))?;
            debug!("Source '{}' reports {} column(s)", source.label(), spec.len());
            individual_specs.push(spec);
        }
        let raw_spec = RawSpec::merge(&individual_specs, &self.type_hierarchy);
        Ok(MultiTableSpec {
            raw_spec,
            individual_specs,
        })
    }

    /// `sources` must be the sources `spec` was created from, in the same
    /// order.
    pub fn create_read<'s, S>(
        &self,
        sources: &'s [S],
        spec: &MultiTableSpec<T>,
        transformation: &TableTransformation<T>,
    ) -> Result<UnifiedRead<'s, T, V>>
    where
        S: ReadSource<V>,
    {
        if sources.len() != spec.source_count() {
            return Err(UnifyError::SourceCountMismatch {
                expected: spec.source_count(),
                actual: sources.len(),
            });
        }
        let output = transformation.apply(spec.raw_spec());
        let factory = IndexMapperFactory::new(output.raw_names(), &self.config);
        let mappers = spec
            .individual_specs()
            .iter()
            .map(|local| factory.create(local))
            .collect();
        let keys = RowKeyGeneratorContext::from_config(&self.config, self.extractor.clone());
        // counted keys are unique without bookkeeping
        let issued = matches!(keys, RowKeyGeneratorContext::Extracting { .. }).then(IssuedKeys::new);
        Ok(UnifiedRead {
            output,
            sources: sources.iter().map(|s| s as &dyn ReadSource<V>).collect(),
            mappers,
            keys,
            config: self.config.clone(),
            current: None,
            next_source: 0,
            issued,
            rows: 0,
        })
    }
}

struct ActiveSource<V> {
    ordinal: usize,
    read: Box<dyn Read<V>>,
    mapper: IndexMapper,
    keys: RowKeyGenerator<V>,
    rows: u64,
}

/// Streams unified rows from every source in order. The source being read is
/// closed once exhausted, after an error and when the read is dropped.
pub struct UnifiedRead<'s, T, V> {
    output: OutputSpec<T>,
    sources: Vec<&'s dyn ReadSource<V>>,
    mappers: Vec<IndexMapper>,
    keys: RowKeyGeneratorContext<V>,
    config: TableReadConfig,
    current: Option<ActiveSource<V>>,
    next_source: usize,
    issued: Option<IssuedKeys>,
    rows: u64,
}

impl<T, V: 'static> UnifiedRead<'_, T, V> {
    pub fn output_spec(&self) -> &OutputSpec<T> {
        &self.output
    }

    /// Rows returned so far.
    pub fn rows_read(&self) -> u64 {
        self.rows
    }

    pub fn next_row(&mut self) -> Result<Option<UnifiedRow<V>>> {
        loop {
            let Some(active) = self.current.as_mut() else {
                if self.next_source >= self.sources.len() {
                    return Ok(None);
                }
                self.open_next()?;
                continue;
            };
            match active.read.next() {
                Ok(Some(row)) => {
                    active.rows += 1;
                    let key = active.keys.create_key(&row);
                    let key = match self.issued.as_mut() {
                        Some(issued) => issued.issue(key),
                        None => Ok(key.into_string()),
                    };
                    let key = match key {
                        Ok(key) => key,
                        Err(err) => {
                            self.abort();
                            return Err(err);
                        }
                    };
                    let mut raw = row.into_values();
                    let values = (0..self.output.len())
                        .map(|idx| {
                            active
                                .mapper
                                .local_index(idx)
                                .and_then(|local| raw.get_mut(local))
                                .and_then(Option::take)
                        })
                        .collect();
                    self.rows += 1;
                    return Ok(Some(UnifiedRow { key, values }));
                }
                Ok(None) => self.finish_current()?,
                Err(err) => {
                    self.abort();
                    return Err(err);
                }
            }
        }
    }

    /// Closes the source being read and ends the stream.
    pub fn close(&mut self) -> Result<()> {
        self.next_source = self.sources.len();
        self.finish_current()
    }

    fn open_next(&mut self) -> Result<()> {
        let ordinal = self.next_source;
        self.next_source += 1;
        let source = self.sources[ordinal];
        let read = match source.open() {
            Ok(read) => read,
            Err(err) => {
                self.next_source = self.sources.len();
                return Err(err);
            }
        };
        debug!("Reading source {ordinal} '{}'", source.label());
        self.current = Some(ActiveSource {
            ordinal,
            read: decorate_for_reading(read, &self.config),
            mapper: self.mappers[ordinal].clone(),
            keys: self.keys.create_key_generator(ordinal),
            rows: 0,
        });
        Ok(())
    }

    fn finish_current(&mut self) -> Result<()> {
        if let Some(mut active) = self.current.take() {
            debug!(
                "Finished source {} '{}' after {} row(s)",
                active.ordinal,
                self.sources[active.ordinal].label(),
                active.rows
            );
            active.read.close()?;
        }
        Ok(())
    }

    fn abort(&mut self) {
        self.next_source = self.sources.len();
        if let Some(mut active) = self.current.take() {
            if let Err(err) = active.read.close() {
                warn!(
                    "Failed to close source '{}' after error: {err}",
                    self.sources[active.ordinal].label()
                );
            }
        }
    }
}

impl<T, V: 'static> Iterator for UnifiedRead<'_, T, V> {
    type Item = Result<UnifiedRow<V>>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_row().transpose()
    }
}

impl<T, V> Drop for UnifiedRead<'_, T, V> {
    fn drop(&mut self) {
        if let Some(mut active) = self.current.take() {
            if let Err(err) = active.read.close() {
                warn!(
                    "Failed to close source '{}' on drop: {err}",
                    self.sources[active.ordinal].label()
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{column_type::ColumnType, transformation::TableTransformation};
    use std::{cell::Cell, rc::Rc, sync::Arc};

    fn row(values: &[&str]) -> Row<String> {
        values
            .iter()
            .map(|v| (!v.is_empty()).then(|| v.to_string()))
            .collect()
    }

    fn source(label: &str, lines: &[&[&str]]) -> InMemorySource<String> {
        InMemorySource::new(label, lines.iter().map(|line| row(line)).collect())
    }

    fn reader(config: TableReadConfig) -> MultiTableReader<ColumnType, String> {
        MultiTableReader::new(ColumnType::hierarchy(), config, Arc::new(|v: &String| v.clone()))
    }

    fn collect<T>(read: UnifiedRead<'_, T, String>) -> Vec<(String, Vec<Option<String>>)> {
        read.map(|row| {
            let row = row.expect("row");
            (row.key, row.values)
        })
        .collect()
    }

    fn some(values: &[&str]) -> Vec<Option<String>> {
        values
            .iter()
            .map(|v| (!v.is_empty()).then(|| v.to_string()))
            .collect()
    }

    #[test]
    fn aligns_sources_with_different_layouts() {
        let sources = [
            source("a", &[&["id", "amount"], &["1", "10"], &["2", "11"]]),
            source("b", &[&["amount", "note", "id"], &["1.5", "x", "3"]]),
        ];
        let reader = reader(TableReadConfig::default());
        let spec = reader.create_spec(&sources).unwrap();
        let union: Vec<_> = spec
            .raw_spec()
            .union()
            .iter()
            .map(|c| (c.name().unwrap().to_string(), c.column_type))
            .collect();
        assert_eq!(
            union,
            vec![
                ("id".to_string(), ColumnType::Integer),
                ("amount".to_string(), ColumnType::Float),
                ("note".to_string(), ColumnType::String),
            ]
        );

        let transformation = TableTransformation::derive_default(spec.raw_spec().clone());
        let read = reader.create_read(&sources, &spec, &transformation).unwrap();
        assert_eq!(
            read.output_spec().names().collect::<Vec<_>>(),
            vec!["id", "amount", "note"]
        );
        assert_eq!(
            collect(read),
            vec![
                ("Row0".to_string(), some(&["1", "10", ""])),
                ("Row1".to_string(), some(&["2", "11", ""])),
                ("Row2".to_string(), some(&["3", "1.5", "x"])),
            ]
        );
    }

    #[test]
    fn extracted_keys_are_prefixed_per_source() {
        let sources = [
            source("a", &[&["key", "v"], &["k1", "1"]]),
            source("b", &[&["key", "v"], &["k1", "2"]]),
        ];
        let config = TableReadConfig::default()
            .with_row_id_idx(Some(0))
            .with_prepend_source_idx_to_row_id(true);
        let reader = reader(config);
        let spec = reader.create_spec(&sources).unwrap();
        let transformation = TableTransformation::derive_default(spec.raw_spec().clone());
        let read = reader.create_read(&sources, &spec, &transformation).unwrap();
        assert_eq!(
            collect(read),
            vec![
                ("File_0_k1".to_string(), some(&["1"])),
                ("File_1_k1".to_string(), some(&["2"])),
            ]
        );
    }

    #[test]
    fn duplicate_keys_fail_the_read() {
        let sources = [
            source("a", &[&["key", "v"], &["k1", "1"]]),
            source("b", &[&["key", "v"], &["k1", "2"]]),
        ];
        let reader = reader(TableReadConfig::default().with_row_id_idx(Some(0)));
        let spec = reader.create_spec(&sources).unwrap();
        let transformation = TableTransformation::derive_default(spec.raw_spec().clone());
        let mut read = reader.create_read(&sources, &spec, &transformation).unwrap();
        assert!(read.next_row().unwrap().is_some());
        assert!(matches!(
            read.next_row(),
            Err(UnifyError::DuplicateRowKey(key)) if key == "k1"
        ));
        assert!(read.next_row().unwrap().is_none());
    }

    #[test]
    fn missing_keys_never_clash_with_real_ones() {
        let sources = [source("a", &[&["id", "v"], &["?1", "a"], &["", "b"]])];
        let reader = reader(TableReadConfig::default().with_row_id_idx(Some(0)));
        let spec = reader.create_spec(&sources).unwrap();
        let transformation = TableTransformation::derive_default(spec.raw_spec().clone());
        let read = reader.create_read(&sources, &spec, &transformation).unwrap();
        assert_eq!(
            collect(read),
            vec![
                ("?1".to_string(), some(&["a"])),
                ("?1#1".to_string(), some(&["b"])),
            ]
        );
    }

    #[test]
    fn counted_keys_are_not_tracked() {
        let sources = [source("a", &[&["v"], &["1"], &["2"]])];
        let reader = reader(TableReadConfig::default());
        let spec = reader.create_spec(&sources).unwrap();
        let transformation = TableTransformation::derive_default(spec.raw_spec().clone());
        let mut read = reader.create_read(&sources, &spec, &transformation).unwrap();
        assert!(read.issued.is_none());
        while read.next_row().unwrap().is_some() {}
        assert_eq!(read.rows_read(), 2);

        let keyed = MultiTableReader::new(
            ColumnType::hierarchy(),
            TableReadConfig::default().with_row_id_idx(Some(0)),
            Arc::new(|v: &String| v.clone()),
        );
        let read = keyed.create_read(&sources, &spec, &transformation).unwrap();
        assert!(read.issued.is_some());
    }

    #[test]
    fn header_after_the_sampled_rows_names_the_columns() {
        let sources = [source("a", &[&["1"], &["2"], &["3"], &["name"], &["4"]])];
        let config = TableReadConfig::default()
            .with_column_header_idx(Some(3))
            .with_max_rows_for_spec(Some(2));
        let reader = reader(config);
        let spec = reader.create_spec(&sources).unwrap();
        let transformation = TableTransformation::derive_default(spec.raw_spec().clone());
        let read = reader.create_read(&sources, &spec, &transformation).unwrap();
        assert_eq!(read.output_spec().names().collect::<Vec<_>>(), vec!["name"]);
        let values: Vec<_> = collect(read).into_iter().map(|(_, values)| values).collect();
        assert_eq!(values, vec![some(&["1"]), some(&["2"]), some(&["3"]), some(&["4"])]);
    }

    #[test]
    fn transformation_shapes_the_output() {
        let sources = [source("a", &[&["a", "b", "c"], &["1", "2", "3"]])];
        let reader = reader(TableReadConfig::default());
        let spec = reader.create_spec(&sources).unwrap();
        let mut transformation = TableTransformation::derive_default(spec.raw_spec().clone());
        transformation.set_keep("b", false).unwrap();
        transformation.rename("c", "see").unwrap();
        transformation.move_to("c", 0).unwrap();
        let read = reader.create_read(&sources, &spec, &transformation).unwrap();
        assert_eq!(read.output_spec().names().collect::<Vec<_>>(), vec!["see", "a"]);
        assert_eq!(collect(read), vec![("Row0".to_string(), some(&["3", "1"]))]);
    }

    #[test]
    fn rejects_a_different_number_of_sources() {
        let sources = [source("a", &[&["x"], &["1"]])];
        let reader = reader(TableReadConfig::default());
        let spec = reader.create_spec(&sources).unwrap();
        let transformation = TableTransformation::derive_default(spec.raw_spec().clone());
        let doubled = [sources[0].clone(), sources[0].clone()];
        assert!(matches!(
            reader.create_read(&doubled, &spec, &transformation),
            Err(UnifyError::SourceCountMismatch {
                expected: 1,
                actual: 2
            })
        ));
    }

    struct TrackedRead {
        inner: InMemoryRead<String>,
        closes: Rc<Cell<usize>>,
    }

    impl Read<String> for TrackedRead {
        fn next(&mut self) -> Result<Option<Row<String>>> {
            self.inner.next()
        }

        fn close(&mut self) -> Result<()> {
            self.closes.set(self.closes.get() + 1);
            self.inner.close()
        }
    }

    struct TrackedSource {
        rows: Vec<Row<String>>,
        opens: Rc<Cell<usize>>,
        closes: Rc<Cell<usize>>,
    }

    impl ReadSource<String> for TrackedSource {
        fn label(&self) -> &str {
            "tracked"
        }

        fn open(&self) -> Result<Box<dyn Read<String>>> {
            self.opens.set(self.opens.get() + 1);
            Ok(Box::new(TrackedRead {
                inner: InMemoryRead::new(self.rows.clone()),
                closes: Rc::clone(&self.closes),
            }))
        }
    }

    #[test]
    fn every_opened_source_is_closed() {
        let opens = Rc::new(Cell::new(0));
        let closes = Rc::new(Cell::new(0));
        let sources: Vec<_> = (0..2)
            .map(|_| TrackedSource {
                rows: vec![row(&["n"]), row(&["1"]), row(&["2"])],
                opens: Rc::clone(&opens),
                closes: Rc::clone(&closes),
            })
            .collect();
        let reader = reader(TableReadConfig::default());
        let spec = reader.create_spec(&sources).unwrap();
        assert_eq!((opens.get(), closes.get()), (2, 2));

        let transformation = TableTransformation::derive_default(spec.raw_spec().clone());
        let read = reader.create_read(&sources, &spec, &transformation).unwrap();
        assert_eq!(collect(read).len(), 4);
        assert_eq!((opens.get(), closes.get()), (4, 4));

        let mut partial = reader.create_read(&sources, &spec, &transformation).unwrap();
        assert!(partial.next_row().unwrap().is_some());
        drop(partial);
        assert_eq!((opens.get(), closes.get()), (5, 5));
    }
}
