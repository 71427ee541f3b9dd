//! Drains write task results and reports on them.

use std::{fmt, time::Duration};

use tokio::sync::mpsc;
use tracing::warn;

use crate::{
    dispatcher::{TaskResult, WriteError, WriteOptions},
    format_elapsed,
};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The first task failure, unchanged
    #[error(transparent)]
    Task(#[from] WriteError),

    #[error("results channel closed after {received} of {expected} write tasks reported")]
    ChannelClosed { received: usize, expected: usize },
}

/// A successful write task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskSummary {
    pub opts: WriteOptions,
    pub duration: Duration,
}

impl fmt::Display for TaskSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} writes to {} [{}] completed in {}",
            self.opts.num_points,
            self.opts.measurement,
            self.opts.tags_display(),
            format_elapsed(self.duration)
        )
    }
}

/// Consumes exactly the number of results it was told to expect, stopping
/// at the first failure.
#[derive(Debug)]
pub struct Aggregator {
    expected: usize,
    received: usize,
    total_points: usize,
    summaries: Vec<TaskSummary>,
}

impl Aggregator {
    pub fn new(expected: usize) -> Self {
        Self {
            expected,
            received: 0,
            total_points: 0,
            summaries: Vec::with_capacity(expected),
        }
    }

    /// Receive results in arrival order, printing one line per successful
    /// task. Returns the first task error as is.
    pub async fn collect(
        &mut self,
        results: &mut mpsc::Receiver<TaskResult>,
    ) -> Result<(), Error> {
        while self.received < self.expected {
            let Some(result) = results.recv().await else {
                warn!(
                    received = self.received,
                    expected = self.expected,
                    "write tasks ended without reporting"
                );
                return Err(Error::ChannelClosed {
                    received: self.received,
                    expected: self.expected,
                });
            };
            self.received += 1;

            let summary = self.record(result)?;
            println!("{summary}");
        }

        Ok(())
    }

    fn record(&mut self, result: TaskResult) -> Result<&TaskSummary, WriteError> {
        let TaskResult {
            opts,
            result,
            duration,
        } = result;
        result?;

        self.total_points += opts.num_points;
        self.summaries.push(TaskSummary { opts, duration });
        Ok(&self.summaries[self.summaries.len() - 1])
    }

    /// Points written by the tasks aggregated so far
    pub fn total_points(&self) -> usize {
        self.total_points
    }

    /// Results received so far, including a failing one
    pub fn received(&self) -> usize {
        self.received
    }

    pub fn summaries(&self) -> &[TaskSummary] {
        &self.summaries
    }
}
