//! Column types for string-valued sources and their default hierarchy.
//!
//! ```text
//! string
//! ├── float
//! │   └── integer
//! ├── boolean
//! ├── datetime
//! ├── date
//! ├── time
//! └── guid
//! ```

use std::{fmt, str::FromStr};

use anyhow::anyhow;
use serde::{Deserialize, Deserializer, Serialize, Serializer, de};

use crate::{
    data::{is_boolean_token, parse_float, parse_guid, parse_naive_date, parse_naive_datetime, parse_naive_time},
    hierarchy::{TypeHierarchy, TypeTester},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ColumnType {
    String,
    Float,
    Integer,
    Boolean,
    DateTime,
    Date,
    Time,
    Guid,
}

impl ColumnType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnType::String => "string",
            ColumnType::Float => "float",
            ColumnType::Integer => "integer",
            ColumnType::Boolean => "boolean",
            ColumnType::DateTime => "datetime",
            ColumnType::Date => "date",
            ColumnType::Time => "time",
            ColumnType::Guid => "guid",
        }
    }

    pub fn variants() -> &'static [&'static str] {
        &[
            "string", "float", "integer", "boolean", "datetime", "date", "time", "guid",
        ]
    }

    /// The default hierarchy over trimmed, non-empty string values.
    pub fn hierarchy() -> TypeHierarchy<ColumnType, String> {
        let builder = TypeHierarchy::builder(TypeTester::accept_all(ColumnType::String));
        let built = builder
            .add_type(
                &ColumnType::String,
                TypeTester::new(ColumnType::Float, |v: &String| parse_float(v).is_ok()),
            )
            .and_then(|b| {
                b.add_type(
                    &ColumnType::Float,
                    TypeTester::new(ColumnType::Integer, |v: &String| {
                        v.trim().parse::<i64>().is_ok()
                    }),
                )
            })
            .and_then(|b| {
                b.add_type(
                    &ColumnType::String,
                    TypeTester::new(ColumnType::Boolean, |v: &String| is_boolean_token(v)),
                )
            })
            .and_then(|b| {
                b.add_type(
                    &ColumnType::String,
                    TypeTester::new(ColumnType::DateTime, |v: &String| {
                        parse_naive_datetime(v.trim()).is_ok()
                    }),
                )
            })
            .and_then(|b| {
                b.add_type(
                    &ColumnType::String,
                    TypeTester::new(ColumnType::Date, |v: &String| {
                        parse_naive_date(v.trim()).is_ok()
                    }),
                )
            })
            .and_then(|b| {
                b.add_type(
                    &ColumnType::String,
                    TypeTester::new(ColumnType::Time, |v: &String| {
                        parse_naive_time(v.trim()).is_ok()
                    }),
                )
            })
            .and_then(|b| {
                b.add_type(
                    &ColumnType::String,
                    TypeTester::new(ColumnType::Guid, |v: &String| parse_guid(v).is_ok()),
                )
            });
        match built {
            Ok(builder) => builder.build(),
            // Every parent above is registered before its children.
            Err(err) => unreachable!("default column type hierarchy is malformed: {err}"),
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ColumnType {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "string" => Ok(ColumnType::String),
            "float" | "double" => Ok(ColumnType::Float),
            "integer" | "int" => Ok(ColumnType::Integer),
            "boolean" | "bool" => Ok(ColumnType::Boolean),
            "datetime" | "date-time" | "timestamp" => Ok(ColumnType::DateTime),
            "date" => Ok(ColumnType::Date),
            "time" => Ok(ColumnType::Time),
            "guid" | "uuid" => Ok(ColumnType::Guid),
            _ => Err(anyhow!(
                "Unknown column type '{value}'. Supported types: {}",
                ColumnType::variants().join(", ")
            )),
        }
    }
}

impl Serialize for ColumnType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ColumnType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let token = String::deserialize(deserializer)?;
        ColumnType::from_str(&token).map_err(|err| de::Error::custom(err.to_string()))
    }
}
