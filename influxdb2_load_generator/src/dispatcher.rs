//! Fans write work out to one task per (measurement, series) pair.
//!
//! Every task reports exactly one [`TaskResult`] on a channel with room for
//! all of them, so a task never waits on the aggregator. Tasks live in a
//! [`JoinSet`]: dropping it aborts whatever is still running.

use std::{fmt::Debug, num::NonZeroUsize, sync::Arc, time::Duration};

use async_trait::async_trait;
use chrono::Utc;
use rand::{SeedableRng, rngs::StdRng};
use tokio::{
    sync::{Semaphore, mpsc},
    task::JoinSet,
    time::Instant,
};
use tracing::{debug, info};

use crate::generator::{PointGenerator, SyntheticPoint, Tags};

/// Boxed error from the store, kept opaque so any sink can report through it.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// What a single write task writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteOptions {
    /// Bucket the points go to
    pub bucket: String,
    /// Measurement name of every point
    pub measurement: String,
    /// Number of points to generate and write
    pub num_points: usize,
    /// Tags merged over the base tags
    pub tags: Tags,
}

impl WriteOptions {
    /// The override tags as `k=v` pairs joined by commas.
    pub fn tags_display(&self) -> String {
        self.tags
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// Errors a write task can report.
#[derive(Debug, thiserror::Error)]
pub enum WriteError {
    /// Submitting points, including sending every full batch, failed
    #[error("write points: {0}")]
    WritePoints(#[source] BoxError),

    /// Sending the final partial batch failed
    #[error("flush: {0}")]
    Flush(#[source] BoxError),
}

/// The outcome of one write task.
#[derive(Debug)]
pub struct TaskResult {
    /// What the task was asked to write
    pub opts: WriteOptions,
    /// Whether the write and flush succeeded
    pub result: Result<(), WriteError>,
    /// Wall time from task start to completion
    pub duration: Duration,
}

/// Where write tasks send their points.
#[async_trait]
pub trait PointSink: Debug + Send + Sync + 'static {
    /// Write all `points` as described by `opts`, flushing before returning.
    async fn write_points(
        &self,
        opts: &WriteOptions,
        points: Vec<SyntheticPoint>,
    ) -> Result<(), WriteError>;
}

/// One [`WriteOptions`] per (measurement, series) pair, measurement major.
///
/// Measurements are named `<prefix><i>`, series tags are `series-<t>`.
pub fn write_plan(
    bucket: &str,
    measurement_prefix: &str,
    num_measurements: usize,
    num_series: usize,
    num_points: usize,
) -> Vec<WriteOptions> {
    (0..num_measurements)
        .flat_map(|m| {
            (0..num_series).map(move |t| WriteOptions {
                bucket: bucket.to_string(),
                measurement: format!("{measurement_prefix}{m}"),
                num_points,
                tags: [("series".to_string(), format!("series-{t}"))].into(),
            })
        })
        .collect()
}

/// Running write tasks and the receiving end of their results.
#[derive(Debug)]
pub struct Dispatch {
    /// Dropping this aborts every task still running
    pub tasks: JoinSet<()>,
    /// Yields one result per task, in completion order
    pub results: mpsc::Receiver<TaskResult>,
    /// Number of tasks launched
    pub expected: usize,
}

/// Launch one task per entry of `plan`.
///
/// Each task generates its batch with a `blob_size` byte blob, hands it to
/// `sink`, and reports the result. With `concurrency` set, at most that many
/// tasks generate and write at once.
pub fn dispatch<S>(
    sink: Arc<S>,
    plan: Vec<WriteOptions>,
    blob_size: usize,
    concurrency: Option<NonZeroUsize>,
) -> Dispatch
where
    S: PointSink + ?Sized,
{
    let expected = plan.len();
    let (tx, results) = mpsc::channel(expected.max(1));
    let permits = concurrency.map(|n| Arc::new(Semaphore::new(n.get())));

    let mut tasks = JoinSet::new();
    for opts in plan {
        let sink = Arc::clone(&sink);
        let tx = tx.clone();
        let permits = permits.as_ref().map(Arc::clone);

        tasks.spawn(async move {
            // the semaphore is never closed
            let _permit = match &permits {
                Some(semaphore) => semaphore.acquire().await.ok(),
                None => None,
            };

            let start = Instant::now();
            let generator = PointGenerator::new(&opts.measurement, &opts.tags, blob_size);
            let points =
                generator.generate(opts.num_points, Utc::now(), &mut StdRng::from_entropy());

            debug!(
                measurement = %opts.measurement,
                tags = %opts.tags_display(),
                points = points.len(),
                "write task started"
            );
            let result = sink.write_points(&opts, points).await;
            let duration = start.elapsed();

            let report = TaskResult {
                opts,
                result,
                duration,
            };
            if tx.send(report).await.is_err() {
                info!("results receiver gone, dropping task result");
            }
        });
    }

    Dispatch {
        tasks,
        results,
        expected,
    }
}
