use std::time::Duration;

use clap::Parser;
use influxdb2_client::{
    Client, FluxValue, RequestError, api::query::parse_annotated_csv, models::Query,
};
use tokio::time::Instant;
use tracing::debug;

use super::common::{InfluxDb2Config, create_client};
use crate::format_elapsed;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("read: query: {0}")]
    Query(#[source] RequestError),

    #[error("read: res err: {0}")]
    Results(#[source] RequestError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Parser)]
pub struct Config {
    /// Common InfluxDB 2 config
    #[clap(flatten)]
    influxdb2_config: InfluxDb2Config,

    /// The measurement to read back
    #[clap(long = "measurement", default_value = "stat0")]
    measurement: String,

    /// The field to read back
    #[clap(long = "field", default_value = "log")]
    field: String,

    /// How far back from now to read, e.g. `1h`, `30m`
    #[clap(long = "range", default_value = "1h")]
    range: humantime::Duration,

    /// Only print the summary, not every value read
    #[clap(short = 'q', long = "quiet", default_value_t = false)]
    quiet: bool,
}

/// Flux reading `field` of `measurement` over the trailing `range`.
pub fn flux_query(bucket: &str, measurement: &str, field: &str, range: Duration) -> String {
    format!(
        r#"from(bucket: "{bucket}")
  |> range(start: -{range}s)
  |> filter(fn: (r) => r._measurement == "{measurement}")
  |> filter(fn: (r) => r._field == "{field}")"#,
        range = range.as_secs().max(1)
    )
}

/// What a read returned.
#[derive(Debug, Clone, PartialEq)]
pub struct ReadSummary {
    /// Every record of every table
    pub count: usize,
    /// Values of the records whose field is the one asked for
    pub values: Vec<FluxValue>,
}

/// Run the read query and collect its results.
pub async fn read(
    client: &Client,
    org: &str,
    bucket: &str,
    measurement: &str,
    field: &str,
    range: Duration,
) -> Result<ReadSummary> {
    let flux = flux_query(bucket, measurement, field, range);
    debug!(%flux, "querying");

    let body = client
        .query_raw(org, &Query::new(flux))
        .await
        .map_err(Error::Query)?;
    let records = parse_annotated_csv(&body).map_err(Error::Results)?;

    let values = records
        .iter()
        .filter(|r| r.field() == Some(field))
        .filter_map(|r| r.value().cloned())
        .collect();

    Ok(ReadSummary {
        count: records.len(),
        values,
    })
}

pub async fn command(config: Config) -> Result<()> {
    let InfluxDb2Config {
        host_url,
        auth_token,
        org,
        bucket,
    } = config.influxdb2_config;
    let client = create_client(&host_url, auth_token.as_ref());

    println!("Reading records");
    let start = Instant::now();

    let summary = read(
        &client,
        &org,
        &bucket,
        &config.measurement,
        &config.field,
        config.range.into(),
    )
    .await?;

    if !config.quiet {
        for value in &summary.values {
            println!("> {value}");
        }
    }
    println!(
        "Read {} records in {}",
        summary.count,
        format_elapsed(start.elapsed())
    );

    Ok(())
}
