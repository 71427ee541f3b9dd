//! InfluxDB Models
//!
//! Roughly follows the OpenAPI specification

pub mod bucket;
pub use self::bucket::{Bucket, Buckets};
pub mod data_point;
pub use self::data_point::{
    DataPoint, DataPointBuilder, DataPointError, FieldValue, WriteDataPoint,
};
pub mod delete;
pub use self::delete::DeletePredicateRequest;
pub mod organization;
pub use self::organization::{Organization, Organizations};
pub mod query;
pub use self::query::{Annotations, DateTimeFormat, Dialect, FluxRecord, FluxValue, Query};
