use anyhow::{Context, Result};
use log::info;

use crate::{cli::PreviewArgs, table, unify::format_row};

pub fn execute(args: &PreviewArgs) -> Result<()> {
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

    let mut headers = vec!["key".to_string()];
    headers.extend(
        read.output_spec()
            .columns()
            .iter()
            .map(|column| format!("{} ({})", column.name, column.column_type)),
    );
    let mut rows = Vec::with_capacity(args.rows);
    while rows.len() < args.rows {
        let Some(row) = read.next_row().context("Reading unified rows")? else {
            break;
        };
        rows.push(format_row(&row, read.output_spec(), false)?);
    }
    read.close().context("Closing inputs")?;

    table::print_table(&headers, &rows);
    info!("Displayed {} unified row(s)", rows.len());
    Ok(())
}
