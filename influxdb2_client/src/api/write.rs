//! Write API

use crate::models::WriteDataPoint;
use crate::{
    Client, CompressingSnafu, EncodingSnafu, HttpSnafu, RequestError, ReqwestProcessingSnafu,
};
use bytes::Bytes;
use flate2::{Compression, write::GzEncoder};
use reqwest::{
    Method,
    header::{CONTENT_ENCODING, CONTENT_TYPE},
};
use snafu::ResultExt;
use std::{io::Write, num::NonZeroUsize};
use tracing::debug;

impl Client {
    /// Write line protocol data to the specified organization and bucket.
    ///
    /// The body is gzip compressed first if the client was built
    /// [`with_gzip`](Client::with_gzip).
    pub async fn write_line_protocol(
        &self,
        org: &str,
        bucket: &str,
        body: impl Into<Bytes> + Send,
    ) -> Result<(), RequestError> {
        let body = body.into();
        let write_url = format!("{}/api/v2/write", self.url);

        let mut request = self
            .request(Method::POST, &write_url)
            .query(&[("bucket", bucket), ("org", org), ("precision", "ns")])
            .header(CONTENT_TYPE, "text/plain; charset=utf-8");

        request = if self.gzip {
            let compressed = gzip(&body).context(CompressingSnafu)?;
            debug!(
                uncompressed_bytes = body.len(),
                compressed_bytes = compressed.len(),
                "writing gzip line protocol"
            );
            request.header(CONTENT_ENCODING, "gzip").body(compressed)
        } else {
            request.body(body)
        };

        let response = request.send().await.context(ReqwestProcessingSnafu)?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.context(ReqwestProcessingSnafu)?;
            HttpSnafu { status, text }.fail()?;
        }

        Ok(())
    }

    /// Write all `points` to the specified organization and bucket in a
    /// single request.
    pub async fn write<P>(
        &self,
        org: &str,
        bucket: &str,
        points: impl IntoIterator<Item = P> + Send,
    ) -> Result<(), RequestError>
    where
        P: WriteDataPoint,
    {
        let mut buffer = Vec::new();
        for point in points {
            point
                .write_data_point_to(&mut buffer)
                .context(EncodingSnafu)?;
        }

        self.write_line_protocol(org, bucket, buffer).await
    }

    /// Create a [`BatchWriter`] that sends one request per `batch_size`
    /// points written to it.
    pub fn batch_writer(
        &self,
        org: impl Into<String>,
        bucket: impl Into<String>,
        batch_size: NonZeroUsize,
    ) -> BatchWriter<'_> {
        BatchWriter {
            client: self,
            org: org.into(),
            bucket: bucket.into(),
            batch_size,
            buffer: Vec::new(),
            pending: 0,
            points_sent: 0,
        }
    }
}

/// Buffers line protocol and sends it in batches of a fixed number of points.
///
/// Points that do not fill a whole batch stay buffered until
/// [`flush`](BatchWriter::flush) is called. Dropping the writer discards them.
#[derive(Debug)]
pub struct BatchWriter<'a> {
    client: &'a Client,
    org: String,
    bucket: String,
    batch_size: NonZeroUsize,
    buffer: Vec<u8>,
    pending: usize,
    points_sent: usize,
}

impl BatchWriter<'_> {
    /// Buffer `points`, sending every full batch as it fills up.
    pub async fn write_points<P>(
        &mut self,
        points: impl IntoIterator<Item = P> + Send,
    ) -> Result<(), RequestError>
    where
        P: WriteDataPoint,
    {
        for point in points {
            point
                .write_data_point_to(&mut self.buffer)
                .context(EncodingSnafu)?;
            self.pending += 1;

            if self.pending >= self.batch_size.get() {
                self.send_pending().await?;
            }
        }

        Ok(())
    }

    /// Send any buffered points that did not fill a whole batch.
    pub async fn flush(&mut self) -> Result<(), RequestError> {
        if self.pending > 0 {
            self.send_pending().await?;
        }
        Ok(())
    }

    /// Number of points the server has acknowledged so far.
    pub fn points_sent(&self) -> usize {
        self.points_sent
    }

    /// Number of points buffered and not yet sent.
    pub fn points_pending(&self) -> usize {
        self.pending
    }

    async fn send_pending(&mut self) -> Result<(), RequestError> {
        let body = std::mem::take(&mut self.buffer);
        let points = std::mem::take(&mut self.pending);

        self.client
            .write_line_protocol(&self.org, &self.bucket, body)
            .await?;
        self.points_sent += points;

        Ok(())
    }
}

fn gzip(body: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::with_capacity(body.len() / 4), Compression::default());
    encoder.write_all(body)?;
    encoder.finish()
}
