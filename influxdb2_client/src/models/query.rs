//! Query

use chrono::{DateTime, FixedOffset, SecondsFormat};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fmt};

/// Query influx using the Flux language
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Query {
    /// Query Script
    pub query: String,
    /// The type of query. Must be "flux".
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub r#type: Option<String>,
    /// Options for the CSV response
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dialect: Option<Dialect>,
    /// Specifies the time that should be reported as "now" in the query.
    /// Default is the server's now time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub now: Option<String>,
}

impl Query {
    /// A Flux query asking for fully annotated CSV, which is what
    /// [`Client::query`](crate::Client::query) knows how to decode.
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            r#type: Some("flux".to_string()),
            dialect: Some(Dialect::annotated()),
            now: None,
        }
    }
}

/// Dialect are options to change the default CSV output format;
/// <https://www.w3.org/TR/2015/REC-tabular-metadata-20151217/#dialect-descriptions>
#[derive(Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dialect {
    /// If true, the results will contain a header row
    #[serde(skip_serializing_if = "Option::is_none")]
    pub header: Option<bool>,
    /// Separator between cells; the default is ,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delimiter: Option<String>,
    /// <https://www.w3.org/TR/2015/REC-tabular-data-model-20151217/#columns>
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annotations: Option<Vec<Annotations>>,
    /// Format of timestamps
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_time_format: Option<DateTimeFormat>,
}

impl Dialect {
    /// Header row, comma delimited, every annotation and nanosecond timestamps.
    pub fn annotated() -> Self {
        Self {
            header: Some(true),
            delimiter: Some(",".to_string()),
            annotations: Some(vec![
                Annotations::Datatype,
                Annotations::Group,
                Annotations::Default,
            ]),
            date_time_format: Some(DateTimeFormat::Rfc3339Nano),
        }
    }
}

/// <https://www.w3.org/TR/2015/REC-tabular-data-model-20151217/#columns>
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Annotations {
    /// Group Annotation
    Group,
    /// Datatype Annotation
    Datatype,
    /// Default Annotation
    Default,
}

/// Timestamp Format
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub enum DateTimeFormat {
    /// RFC3339
    #[serde(rename = "RFC3339")]
    Rfc3339,
    /// RFC3339Nano
    #[serde(rename = "RFC3339Nano")]
    Rfc3339Nano,
}

/// A single typed cell of a Flux result table
#[derive(Clone, Debug, PartialEq)]
pub enum FluxValue {
    /// An empty cell with no default
    Null,
    /// `boolean`
    Bool(bool),
    /// `long`
    Long(i64),
    /// `unsignedLong`
    UnsignedLong(u64),
    /// `double`
    Double(f64),
    /// `string`, and any datatype without a dedicated variant
    String(String),
    /// `dateTime:RFC3339` and `dateTime:RFC3339Nano`
    Time(DateTime<FixedOffset>),
}

impl FluxValue {
    /// The value as a string slice, if it is a string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for FluxValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Long(v) => write!(f, "{v}"),
            Self::UnsignedLong(v) => write!(f, "{v}"),
            Self::Double(v) => write!(f, "{v}"),
            Self::String(v) => f.write_str(v),
            Self::Time(v) => f.write_str(&v.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
        }
    }
}

/// One row of a Flux result table, keyed by column name
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FluxRecord {
    /// The index of the table this record belongs to
    pub table: i64,
    /// Column name to value
    pub values: BTreeMap<String, FluxValue>,
}

impl FluxRecord {
    /// The `_measurement` column
    pub fn measurement(&self) -> Option<&str> {
        self.string("_measurement")
    }

    /// The `_field` column
    pub fn field(&self) -> Option<&str> {
        self.string("_field")
    }

    /// The `_value` column
    pub fn value(&self) -> Option<&FluxValue> {
        self.values.get("_value")
    }

    /// The `_time` column
    pub fn time(&self) -> Option<DateTime<FixedOffset>> {
        match self.values.get("_time") {
            Some(FluxValue::Time(t)) => Some(*t),
            _ => None,
        }
    }

    fn string(&self, column: &str) -> Option<&str> {
        self.values.get(column).and_then(FluxValue::as_str)
    }
}
