use anyhow::{Context, Result};
use log::info;

use crate::{
    cli::UnifyArgs,
    column_type::ColumnType,
    data::parse_typed_value,
    io_utils,
    multi_read::UnifiedRow,
    transformation::OutputSpec,
};

pub fn execute(args: &UnifyArgs) -> Result<()> {
    let config = crate::read_config(&args.source)?;
    let sources = crate::open_sources(&args.source)?;
    let reader = crate::string_reader(config);
    let spec = reader
        .create_spec(&sources)
        .context("Inferring column types")?;
    let transformation = crate::shape_transformation(&spec, &args.shape)?;
    let mut read = reader
        .create_read(&sources, &spec, &transformation)
        .context("Preparing unified read")?;

    let delimiter = io_utils::resolve_output_delimiter(args.output.as_deref(), args.output_delimiter);
    let mut writer = io_utils::open_csv_writer(args.output.as_deref(), delimiter)?;
    let mut header = vec![args.key_header.clone()];
    header.extend(read.output_spec().names().map(str::to_string));
    writer.write_record(&header).context("Writing output headers")?;

    let mut written = 0u64;
    while let Some(row) = read.next_row().context("Reading unified rows")? {
        let record = format_row(&row, read.output_spec(), args.raw)?;
        writer
            .write_record(&record)
            .with_context(|| format!("Writing row {}", row.key))?;
        written += 1;
    }
    writer.flush().context("Flushing output")?;
    info!(
        "Unified {} row(s) from {} input(s) into {} column(s)",
        written,
        sources.len(),
        read.output_spec().len()
    );
    Ok(())
}

/// Key first, then every value normalized to its output column type.
pub(crate) fn format_row(row: &UnifiedRow<String>, output: &OutputSpec<ColumnType>, raw: bool) -> Result<Vec<String>> {
    let mut record = Vec::with_capacity(row.values.len() + 1);
    record.push(row.key.clone());
    for (value, column) in row.values.iter().zip(output.columns()) {
        let Some(value) = value else {
            record.push(String::new());
            continue;
        };
        if raw {
            record.push(value.clone());
            continue;
        }
        let typed = parse_typed_value(value, &column.column_type)
            .with_context(|| format!("Row {} column '{}'", row.key, column.name))?;
        record.push(typed.map(|typed| typed.as_display()).unwrap_or_default());
    }
    Ok(record)
}
