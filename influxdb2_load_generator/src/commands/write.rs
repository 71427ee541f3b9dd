use std::{num::NonZeroUsize, sync::Arc};

use async_trait::async_trait;
use chrono::{TimeDelta, Utc};
use clap::Parser;
use influxdb2_client::{Client, RequestError};
use secrecy::Secret;
use tokio::time::Instant;
use tracing::{debug, info};
use url::Url;

use super::common::{InfluxDb2Config, create_client};
use crate::{
    aggregator::{self, Aggregator},
    dispatcher::{Dispatch, PointSink, WriteError, WriteOptions, dispatch, write_plan},
    format_elapsed,
    generator::SyntheticPoint,
};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("delete: {0}")]
    Delete(#[from] DeleteError),

    #[error(transparent)]
    Aggregate(#[from] aggregator::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors clearing a measurement before it is rewritten.
#[derive(Debug, thiserror::Error)]
pub enum DeleteError {
    #[error("find bucket: {0}")]
    FindBucket(#[source] RequestError),

    #[error("get orgs: {0}")]
    GetOrgs(#[source] RequestError),

    #[error(transparent)]
    Delete(#[from] RequestError),
}

#[derive(Debug, Parser)]
pub struct Config {
    /// Common InfluxDB 2 config
    #[clap(flatten)]
    influxdb2_config: InfluxDb2Config,

    /// Number of points written per series
    #[clap(long = "points", default_value_t = 3600)]
    num_points: usize,

    /// Size in bytes of the `blob` field of every point
    #[clap(long = "blobsize", default_value_t = 16 * 1024)]
    blob_size: usize,

    /// Number of measurements, named `<prefix>0`, `<prefix>1`, ...
    #[clap(long = "measurements", default_value_t = 1)]
    num_measurements: usize,

    /// Number of points per write request
    #[clap(long = "batch", default_value = "1000")]
    batch_size: NonZeroUsize,

    /// Number of series per measurement, tagged `series=series-<n>`
    #[clap(long = "series", default_value_t = 1)]
    num_series: usize,

    /// Prefix of the generated measurement names
    #[clap(long = "measurement-prefix", default_value = "stat")]
    measurement_prefix: String,

    /// Maximum number of write tasks running at once. Unbounded if not set.
    #[clap(long = "concurrency")]
    concurrency: Option<NonZeroUsize>,

    /// Write without first deleting the last 24 hours of each measurement
    #[clap(long = "skip-delete", default_value_t = false)]
    skip_delete: bool,
}

/// Run configuration, fixed at startup and shared by every write task.
#[derive(Debug)]
pub struct WriteConfig {
    pub host_url: Url,
    pub auth_token: Option<Secret<String>>,
    pub org: String,
    pub bucket: String,
    pub num_points: usize,
    pub blob_size: usize,
    pub num_measurements: usize,
    pub batch_size: NonZeroUsize,
    pub num_series: usize,
    pub measurement_prefix: String,
    pub concurrency: Option<NonZeroUsize>,
    pub skip_delete: bool,
}

impl From<Config> for WriteConfig {
    fn from(config: Config) -> Self {
        let InfluxDb2Config {
            host_url,
            auth_token,
            org,
            bucket,
        } = config.influxdb2_config;

        Self {
            host_url,
            auth_token,
            org,
            bucket,
            num_points: config.num_points,
            blob_size: config.blob_size,
            num_measurements: config.num_measurements,
            batch_size: config.batch_size,
            num_series: config.num_series,
            measurement_prefix: config.measurement_prefix,
            concurrency: config.concurrency,
            skip_delete: config.skip_delete,
        }
    }
}

impl WriteConfig {
    fn measurements(&self) -> impl Iterator<Item = String> + '_ {
        (0..self.num_measurements).map(|m| format!("{}{m}", self.measurement_prefix))
    }

    fn client(&self) -> Client {
        create_client(&self.host_url, self.auth_token.as_ref())
    }
}

/// Writes each task's points through its own gzip client in batches.
#[derive(Debug)]
pub struct InfluxDb2Sink {
    config: Arc<WriteConfig>,
}

impl InfluxDb2Sink {
    pub fn new(config: Arc<WriteConfig>) -> Self {
        Self { config }
    }
}

#[async_trait]
impl PointSink for InfluxDb2Sink {
    async fn write_points(
        &self,
        opts: &WriteOptions,
        points: Vec<SyntheticPoint>,
    ) -> Result<(), WriteError> {
        let client = self.config.client();
        let mut writer =
            client.batch_writer(&self.config.org, &opts.bucket, self.config.batch_size);

        writer
            .write_points(&points)
            .await
            .map_err(|e| WriteError::WritePoints(Box::new(e)))?;
        writer
            .flush()
            .await
            .map_err(|e| WriteError::Flush(Box::new(e)))?;

        debug!(
            measurement = %opts.measurement,
            points = writer.points_sent(),
            "write task finished"
        );
        Ok(())
    }
}

/// Delete the trailing 24 hours of `measurement` from `bucket`.
pub async fn delete_measurement(
    client: &Client,
    org: &str,
    bucket: &str,
    measurement: &str,
) -> Result<(), DeleteError> {
    let bucket = client
        .find_bucket_by_name(bucket)
        .await
        .map_err(DeleteError::FindBucket)?;
    let org = client
        .find_organization_by_name(org)
        .await
        .map_err(DeleteError::GetOrgs)?;

    let stop = Utc::now();
    let start = stop - TimeDelta::hours(24);
    client
        .delete(
            &org.id,
            &bucket.id,
            start,
            stop,
            Some(format!(r#"_measurement="{measurement}""#)),
        )
        .await?;

    info!(%measurement, "deleted trailing 24h");
    Ok(())
}

pub async fn command(config: Config) -> Result<()> {
    let config = Arc::new(WriteConfig::from(config));

    println!("Preparing for writes...");
    if config.skip_delete {
        info!("skipping delete");
    } else {
        let client = config.client();
        for measurement in config.measurements() {
            delete_measurement(&client, &config.org, &config.bucket, &measurement).await?;
        }
    }

    println!("Writing...");
    let start = Instant::now();

    let plan = write_plan(
        &config.bucket,
        &config.measurement_prefix,
        config.num_measurements,
        config.num_series,
        config.num_points,
    );
    let Dispatch {
        tasks,
        mut results,
        expected,
    } = dispatch(
        Arc::new(InfluxDb2Sink::new(Arc::clone(&config))),
        plan,
        config.blob_size,
        config.concurrency,
    );

    let mut aggregator = Aggregator::new(expected);
    let outcome = aggregator.collect(&mut results).await;
    // aborts anything still running after a failure
    drop(tasks);
    outcome?;

    println!(
        "{} writes in {}",
        aggregator.total_points(),
        format_elapsed(start.elapsed())
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::generate_points;
    use mockito::{Matcher, Server, ServerGuard};
    use pretty_assertions::assert_eq;

    fn parse(args: &[&str]) -> WriteConfig {
        let config =
            Config::try_parse_from(std::iter::once("write").chain(args.iter().copied())).unwrap();
        WriteConfig::from(config)
    }

    fn opts(measurement: &str, num_points: usize) -> WriteOptions {
        WriteOptions {
            bucket: "data".to_string(),
            measurement: measurement.to_string(),
            num_points,
            tags: [("series".to_string(), "series-0".to_string())].into(),
        }
    }

    async fn mock_lookups(server: &mut ServerGuard) {
        server
            .mock("GET", "/api/v2/buckets")
            .match_query(Matcher::UrlEncoded("name".into(), "data".into()))
            .with_body(r#"{"buckets":[{"id":"b1","name":"data","orgID":"o1"}]}"#)
            .create_async()
            .await;
        server
            .mock("GET", "/api/v2/orgs")
            .match_query(Matcher::UrlEncoded("org".into(), "ngrok".into()))
            .with_body(r#"{"orgs":[{"id":"o1","name":"ngrok"}]}"#)
            .create_async()
            .await;
    }

    #[test]
    fn flag_defaults() {
        let config = parse(&[]);

        assert_eq!(config.num_points, 3600);
        assert_eq!(config.blob_size, 16384);
        assert_eq!(config.num_measurements, 1);
        assert_eq!(config.batch_size.get(), 1000);
        assert_eq!(config.num_series, 1);
        assert_eq!(config.concurrency, None);
        assert!(!config.skip_delete);
        assert_eq!(config.measurements().collect::<Vec<_>>(), ["stat0"]);
    }

    #[test]
    fn flags() {
        let config = parse(&[
            "--points",
            "10",
            "--blobsize",
            "3",
            "--measurements",
            "3",
            "--batch",
            "2",
            "--series",
            "4",
            "--measurement-prefix",
            "load",
            "--concurrency",
            "8",
            "--skip-delete",
        ]);

        assert_eq!(config.num_points, 10);
        assert_eq!(config.blob_size, 3);
        assert_eq!(config.batch_size.get(), 2);
        assert_eq!(config.num_series, 4);
        assert_eq!(config.concurrency.map(NonZeroUsize::get), Some(8));
        assert!(config.skip_delete);
        assert_eq!(
            config.measurements().collect::<Vec<_>>(),
            ["load0", "load1", "load2"]
        );
    }

    #[test]
    fn zero_batch_is_rejected() {
        assert!(Config::try_parse_from(["write", "--batch", "0"]).is_err());
    }

    #[test_log::test(tokio::test)]
    async fn delete_uses_looked_up_ids() {
        let mut server = Server::new_async().await;
        mock_lookups(&mut server).await;
        let delete = server
            .mock("POST", "/api/v2/delete")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("orgID".into(), "o1".into()),
                Matcher::UrlEncoded("bucketID".into(), "b1".into()),
            ]))
            .match_body(Matcher::PartialJson(serde_json::json!({
                "predicate": "_measurement=\"stat0\"",
            })))
            .with_status(204)
            .create_async()
            .await;

        let client = Client::new(server.url(), "token");
        delete_measurement(&client, "ngrok", "data", "stat0")
            .await
            .unwrap();

        delete.assert_async().await;
    }

    #[test_log::test(tokio::test)]
    async fn delete_errors_are_tagged() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/api/v2/buckets")
            .match_query(Matcher::Any)
            .with_body(r#"{"buckets":[]}"#)
            .create_async()
            .await;

        let client = Client::new(server.url(), "token");
        let err = delete_measurement(&client, "ngrok", "data", "stat0")
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "find bucket: no bucket named `data` was found");
        assert_eq!(
            Error::from(err).to_string(),
            "delete: find bucket: no bucket named `data` was found"
        );
    }

    #[test_log::test(tokio::test)]
    async fn missing_org_is_a_get_orgs_error() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/api/v2/buckets")
            .match_query(Matcher::Any)
            .with_body(r#"{"buckets":[{"id":"b1","name":"data"}]}"#)
            .create_async()
            .await;
        server
            .mock("GET", "/api/v2/orgs")
            .match_query(Matcher::Any)
            .with_status(401)
            .with_body("unauthorized access")
            .create_async()
            .await;

        let client = Client::new(server.url(), "bad-token");
        let err = delete_measurement(&client, "ngrok", "data", "stat0")
            .await
            .unwrap_err();

        assert_eq!(
            err.to_string(),
            "get orgs: HTTP request returned an error: 401 Unauthorized, `unauthorized access`"
        );
    }

    #[test_log::test(tokio::test)]
    async fn sink_writes_in_batches() {
        let mut server = Server::new_async().await;
        let writes = server
            .mock("POST", "/api/v2/write")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("org".into(), "ngrok".into()),
                Matcher::UrlEncoded("bucket".into(), "data".into()),
            ]))
            .match_header("Content-Encoding", "gzip")
            .with_status(204)
            .expect(3)
            .create_async()
            .await;

        let url = server.url();
        let config = parse(&["--url", url.as_str(), "--batch", "2"]);
        let sink = InfluxDb2Sink::new(Arc::new(config));

        let points = generate_points("stat0", 5, &opts("stat0", 5).tags, 8);
        sink.write_points(&opts("stat0", 5), points).await.unwrap();

        writes.assert_async().await;
    }

    #[test_log::test(tokio::test)]
    async fn sink_tags_write_and_flush_failures() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/api/v2/write")
            .match_query(Matcher::Any)
            .with_status(500)
            .with_body("boom")
            .create_async()
            .await;

        let url = server.url();
        let config = Arc::new(parse(&["--url", url.as_str(), "--batch", "10"]));
        let sink = InfluxDb2Sink::new(Arc::clone(&config));

        // fewer points than a batch only hit the server on flush
        let points = generate_points("stat0", 3, &opts("stat0", 3).tags, 1);
        let err = sink.write_points(&opts("stat0", 3), points).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "flush: HTTP request returned an error: 500 Internal Server Error, `boom`"
        );

        let points = generate_points("stat0", 10, &opts("stat0", 10).tags, 1);
        let err = sink.write_points(&opts("stat0", 10), points).await.unwrap_err();
        assert!(matches!(err, WriteError::WritePoints(_)));
    }
}
