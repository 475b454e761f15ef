//! YAML persistence for the read configuration and table transformations.

use std::{
    fs::File,
    io::{BufReader, BufWriter, Write},
    path::Path,
};

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::{column_type::ColumnType, config::TableReadConfig, transformation::TableTransformation};

pub const TRANSFORMATION_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct TransformationFile {
    format_version: u32,
    transformation: TableTransformation<ColumnType>,
}

pub fn load_read_config(path: &Path) -> Result<TableReadConfig> {
    load_yaml(path, "read config")
}

pub fn save_read_config(path: &Path, config: &TableReadConfig) -> Result<()> {
    save_yaml(path, config, "read config")
}

pub fn load_transformation(path: &Path) -> Result<TableTransformation<ColumnType>> {
    let file: TransformationFile = load_yaml(path, "transformation")?;
    if file.format_version != TRANSFORMATION_FORMAT_VERSION {
        bail!(
            "Transformation {path:?} has format version {}, expected {}",
            file.format_version,
            TRANSFORMATION_FORMAT_VERSION
        );
    }
    Ok(file.transformation)
}

pub fn save_transformation(path: &Path, transformation: &TableTransformation<ColumnType>) -> Result<()> {
    let file = TransformationFile {
        format_version: TRANSFORMATION_FORMAT_VERSION,
        transformation: transformation.clone(),
    };
    save_yaml(path, &file, "transformation")
}

fn load_yaml<T: DeserializeOwned>(path: &Path, what: &str) -> Result<T> {
    let file = File::open(path).with_context(|| format!("Opening {what} file {path:?}"))?;
    serde_yaml::from_reader(BufReader::new(file)).with_context(|| format!("Parsing {what} YAML from {path:?}"))
}

fn save_yaml<T: Serialize>(path: &Path, value: &T, what: &str) -> Result<()> {
    let file = File::create(path).with_context(|| format!("Creating {what} file {path:?}"))?;
    let mut writer = BufWriter::new(file);
    serde_yaml::to_writer(&mut writer, value).with_context(|| format!("Writing {what} YAML"))?;
    writer.flush().with_context(|| format!("Flushing {what} file {path:?}"))
}
