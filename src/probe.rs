use anyhow::{Context, Result};
use itertools::Itertools;
use log::info;
use serde::Serialize;

use crate::{
    cli::ProbeArgs,
    column_type::ColumnType,
    multi_read::{MultiTableSpec, ReadSource},
    settings, table,
    transformation::TableTransformation,
};

#[derive(Debug, Serialize)]
struct ProbeReport {
    sources: Vec<String>,
    columns: Vec<ProbeColumn>,
}

#[derive(Debug, Serialize)]
struct ProbeColumn {
    name: String,
    column_type: ColumnType,
    has_values: bool,
    present_in: usize,
    in_every_source: bool,
}

pub fn execute(args: &ProbeArgs) -> Result<()> {
    let config = crate::read_config(&args.source)?;
    let sources = crate::open_sources(&args.source)?;
    info!(
        "Probing {} input(s): {}",
        sources.len(),
        sources
            .iter()
            .map(|source| format!(
                "{} ('{}')",
                source.label(),
                crate::printable_delimiter(source.delimiter())
            ))
            .join(", ")
    );
    let reader = crate::string_reader(config);
    let spec = reader
        .create_spec(&sources)
        .context("Inferring column types")?;
    let report = build_report(
        &spec,
        sources.iter().map(|source| source.label().to_string()).collect(),
    );

    if args.json {
        let json = serde_json::to_string_pretty(&report).context("Serializing probe report")?;
        println!("{json}");
    } else {
        let headers = ["column", "type", "has values", "sources"].map(str::to_string);
        let rows: Vec<Vec<String>> = report
            .columns
            .iter()
            .map(|column| {
                vec![
                    column.name.clone(),
                    column.column_type.to_string(),
                    if column.has_values { "yes" } else { "no" }.to_string(),
                    format!("{}/{}", column.present_in, report.sources.len()),
                ]
            })
            .collect();
        table::print_table(&headers, &rows);
    }

    if let Some(path) = &args.transformation {
        let transformation = TableTransformation::derive_default(spec.raw_spec().clone());
        settings::save_transformation(path, &transformation)
            .with_context(|| format!("Writing transformation to {path:?}"))?;
        info!(
            "Default transformation for {} column(s) written to {path:?}",
            transformation.columns().len()
        );
    }
    if let Some(path) = &args.save_config {
        settings::save_read_config(path, reader.config())
            .with_context(|| format!("Writing read config to {path:?}"))?;
        info!("Read config written to {path:?}");
    }
    Ok(())
}

fn build_report(spec: &MultiTableSpec<ColumnType>, sources: Vec<String>) -> ProbeReport {
    let named: Vec<_> = spec
        .individual_specs()
        .iter()
        .map(|local| local.assign_names_if_missing())
        .collect();
    let columns = spec
        .raw_spec()
        .union()
        .iter()
        .filter_map(|column| {
            let name = column.name()?;
            let present_in = named
                .iter()
                .filter(|local| local.position(name).is_some())
                .count();
            Some(ProbeColumn {
                name: name.to_string(),
                column_type: column.column_type,
                has_values: column.has_type,
                present_in,
                in_every_source: spec.raw_spec().intersection().position(name).is_some(),
            })
        })
        .collect();
    ProbeReport { sources, columns }
}
