//! Synthetic point generation.
//!
//! Every point carries two correlated integer fields, `max` and `avg`, a
//! `log` string naming its index, and a `blob` string of a fixed size. The
//! blob is allocated once per generator and shared by all of its points.

use std::{collections::BTreeMap, io, sync::Arc};

use chrono::{DateTime, Utc};
use influxdb2_client::{
    FieldValue, WriteDataPoint,
    models::data_point::{EscapedFieldValueString, EscapedMeasurement, EscapedTagKey},
};
use rand::Rng;

/// Tag set of a series, kept sorted so line protocol output is stable.
pub type Tags = BTreeMap<String, String>;

/// Tags present on every generated point unless overridden.
pub const BASE_TAGS: [(&str, &str); 2] = [("unit", "temperature"), ("client", "unknown")];

const NANOS_PER_SECOND: i64 = 1_000_000_000;

/// Merge `overrides` over `base`; on a key collision the override wins.
pub fn merge_tags(base: &Tags, overrides: &Tags) -> Tags {
    let mut merged = base.clone();
    merged.extend(overrides.iter().map(|(k, v)| (k.clone(), v.clone())));
    merged
}

/// [`BASE_TAGS`] as an owned tag set.
pub fn base_tags() -> Tags {
    BASE_TAGS
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// A single generated point.
#[derive(Debug, Clone)]
pub struct SyntheticPoint {
    series_key: Arc<str>,
    tags: Arc<Tags>,
    /// Always at least 1
    pub max: i64,
    /// Always in `0..max`
    pub avg: i64,
    /// `Something happened [<index>]`
    pub log: String,
    blob: Arc<str>,
    /// Nanoseconds since the UNIX epoch
    pub timestamp: i64,
}

impl SyntheticPoint {
    /// Merged tags of this point's series
    pub fn tags(&self) -> &Tags {
        &self.tags
    }

    /// The shared blob payload
    pub fn blob(&self) -> &Arc<str> {
        &self.blob
    }
}

impl WriteDataPoint for SyntheticPoint {
    fn write_data_point_to<W>(&self, mut w: W) -> io::Result<()>
    where
        W: io::Write,
    {
        // fields in key order: avg, blob, log, max
        let blob = EscapedFieldValueString::from(Arc::clone(&self.blob));
        writeln!(
            w,
            r#"{} avg={},blob="{}",log={},max={} {}"#,
            self.series_key,
            FieldValue::I64(self.avg),
            blob,
            FieldValue::from(self.log.as_str()),
            FieldValue::I64(self.max),
            self.timestamp,
        )
    }
}

/// Generates batches of points for one series.
#[derive(Debug, Clone)]
pub struct PointGenerator {
    series_key: Arc<str>,
    tags: Arc<Tags>,
    blob: Arc<str>,
}

impl PointGenerator {
    /// A generator for `measurement` whose tags are [`BASE_TAGS`] merged with
    /// `overrides`, and whose blob is `blob_size` bytes long.
    pub fn new(measurement: &str, overrides: &Tags, blob_size: usize) -> Self {
        let tags = merge_tags(&base_tags(), overrides);

        let series_key: String = std::iter::once(EscapedMeasurement::from(measurement).to_string())
            .chain(tags.iter().map(|(k, v)| {
                format!(
                    ",{}={}",
                    EscapedTagKey::from(k.as_str()),
                    EscapedTagKey::from(v.as_str())
                )
            }))
            .collect();

        Self {
            series_key: series_key.into(),
            tags: Arc::new(tags),
            blob: "x".repeat(blob_size).into(),
        }
    }

    /// Generate `num_points` points ending at `now` truncated to the second,
    /// one second apart.
    pub fn generate(
        &self,
        num_points: usize,
        now: DateTime<Utc>,
        rng: &mut impl Rng,
    ) -> Vec<SyntheticPoint> {
        let last = now.timestamp();
        let n = num_points as i64;

        (0..num_points)
            .map(|i| {
                let max = 1 + rng.gen_range(0..100_i64);
                let avg = rng.gen_range(0..max);
                let seconds = last - (n - 1 - i as i64);

                SyntheticPoint {
                    series_key: Arc::clone(&self.series_key),
                    tags: Arc::clone(&self.tags),
                    max,
                    avg,
                    log: format!("Something happened [{i}]"),
                    blob: Arc::clone(&self.blob),
                    timestamp: seconds * NANOS_PER_SECOND,
                }
            })
            .collect()
    }
}

/// Generate `num_points` points for `measurement` ending at the current time.
pub fn generate_points(
    measurement: &str,
    num_points: usize,
    tags: &Tags,
    blob_size: usize,
) -> Vec<SyntheticPoint> {
    PointGenerator::new(measurement, tags, blob_size).generate(
        num_points,
        Utc::now(),
        &mut rand::thread_rng(),
    )
}
