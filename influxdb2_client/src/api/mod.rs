//! InfluxDB v2.0 Client API

pub mod buckets;
pub mod delete;
pub mod organization;
pub mod query;
pub mod write;
