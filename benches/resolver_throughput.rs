use std::fs::File;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use criterion::{BatchSize, Criterion, criterion_group, criterion_main};
use csv_unify::column_type::ColumnType;
use csv_unify::config::TableReadConfig;
use csv_unify::io_utils::CsvSource;
use csv_unify::multi_read::MultiTableReader;
use csv_unify::transformation::TableTransformation;
use encoding_rs::UTF_8;
use tempfile::TempDir;

fn sample_values(count: usize) -> Vec<String> {
    (0..count)
        .map(|i| match i % 4 {
            0 => format!("{i}"),
            1 => format!("{i}.5"),
            2 => "2024-01-02".to_string(),
            _ => "yes".to_string(),
        })
        .collect()
}

fn generate_orders(dir: &TempDir, name: &str, rows: usize, extra: bool) -> PathBuf {
    let path = dir.path().join(name);
    let mut file = File::create(&path).expect("create csv");
    if extra {
        writeln!(file, "id,ordered_at,amount,status,channel").expect("header");
    } else {
        writeln!(file, "id,ordered_at,amount,status").expect("header");
    }
    for i in 0..rows {
        let day = (i % 28) + 1;
        let status = if i % 2 == 0 { "shipped" } else { "pending" };
        if extra {
            writeln!(file, "{i},2024-01-{day:02},{}.25,{status},web", i % 100).expect("row");
        } else {
            writeln!(file, "{i},2024-01-{day:02},{},{status}", i % 100).expect("row");
        }
    }
    path
}

fn resolver_benchmarks(c: &mut Criterion) {
    let hierarchy = ColumnType::hierarchy();

    let integers: Vec<String> = (0..10_000).map(|i| i.to_string()).collect();
    c.bench_function("resolve_stable_integers", |b| {
        b.iter(|| {
            let mut resolver = hierarchy.create_resolver();
            for value in &integers {
                resolver.accept(value);
            }
            *resolver.most_specific_type()
        })
    });

    let mixed = sample_values(10_000);
    c.bench_function("resolve_mixed_values", |b| {
        b.iter(|| {
            let mut resolver = hierarchy.create_resolver();
            for value in &mixed {
                resolver.accept(value);
            }
            *resolver.most_specific_type()
        })
    });
}

fn unified_read_benchmark(c: &mut Criterion) {
    let dir = tempfile::tempdir().expect("temp dir");
    let paths = [
        generate_orders(&dir, "a.csv", 5_000, false),
        generate_orders(&dir, "b.csv", 5_000, true),
    ];
    let sources: Vec<CsvSource> = paths
        .iter()
        .map(|path| CsvSource::new(path, None, UTF_8).expect("source"))
        .collect();
    let reader = MultiTableReader::new(
        ColumnType::hierarchy(),
        TableReadConfig::default(),
        Arc::new(|value: &String| value.clone()),
    );

    c.bench_function("create_spec_two_sources", |b| {
        b.iter(|| reader.create_spec(&sources).expect("spec"))
    });

    let spec = reader.create_spec(&sources).expect("spec");
    let transformation = TableTransformation::derive_default(spec.raw_spec().clone());
    c.bench_function("unified_read_two_sources", |b| {
        b.iter_batched(
            || reader.create_read(&sources, &spec, &transformation).expect("read"),
            |read| read.map(|row| row.expect("row").values.len()).sum::<usize>(),
            BatchSize::SmallInput,
        )
    });
}

criterion_group!(benches, resolver_benchmarks, unified_read_benchmark);
criterion_main!(benches);
