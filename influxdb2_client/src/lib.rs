#![deny(rust_2018_idioms)]
#![warn(
    missing_copy_implementations,
    missing_debug_implementations,
    missing_docs,
    clippy::explicit_iter_loop,
    clippy::use_self
)]

//! # influxdb2_client
//!
//! This is a Rust client to InfluxDB using the [2.0 API][2api].
//!
//! [2api]: https://v2.docs.influxdata.com/v2.0/reference/api/
//!
//! Only the parts of the API needed to drive write and read load against a
//! server are covered:
//!
//! - Organizations and buckets lookup by name
//! - Delete with a time range and predicate
//! - Line protocol writes, optionally gzip compressed and batched
//! - Flux queries returning annotated CSV
//!
//! ## Example
//!
//! ```no_run
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! use influxdb2_client::{Client, models::DataPoint};
//!
//! let client = Client::new("http://localhost:8086", "some-token").with_gzip(true);
//!
//! let points = vec![
//!     DataPoint::builder("cpu")
//!         .tag("host", "server01")
//!         .field("usage", 0.5)
//!         .build()?,
//! ];
//!
//! client.write("some-org", "some-bucket", points).await?;
//! # Ok(())
//! # }
//! ```

use reqwest::{Method, header::AUTHORIZATION};
use secrecy::{ExposeSecret, Secret};
use snafu::Snafu;

/// Errors that occur while making requests to the InfluxDB 2 API.
#[derive(Debug, Snafu)]
pub enum RequestError {
    /// While making a request to the server, the underlying `reqwest` library
    /// returned an error that was not an HTTP 400 or 500.
    #[snafu(display("Error while processing the HTTP request: {}", source))]
    ReqwestProcessing {
        /// The underlying error object from `reqwest`.
        source: reqwest::Error,
    },

    /// The underlying `reqwest` library returned an HTTP error with code 400
    /// (meaning a client error) or 500 (meaning a server error).
    #[snafu(display("HTTP request returned an error: {}, `{}`", status, text))]
    Http {
        /// The `StatusCode` returned from the request
        status: reqwest::StatusCode,
        /// Any text data returned from the request
        text: String,
    },

    /// While serializing data as JSON to send in a request, the underlying
    /// `serde_json` library returned an error.
    #[snafu(display("Error while serializing to JSON: {}", source))]
    Serializing {
        /// The underlying error object from `serde_json`.
        source: serde_json::Error,
    },

    /// Rendering a data point as line protocol failed.
    #[snafu(display("Error while encoding line protocol: {}", source))]
    Encoding {
        /// The underlying IO error.
        source: std::io::Error,
    },

    /// Gzip compression of a request body failed.
    #[snafu(display("Error while compressing the request body: {}", source))]
    Compressing {
        /// The underlying IO error from `flate2`.
        source: std::io::Error,
    },

    /// A lookup by name matched nothing on the server.
    #[snafu(display("no {} named `{}` was found", kind, name))]
    NotFound {
        /// The kind of resource, e.g. `bucket`
        kind: &'static str,
        /// The name that was looked up
        name: String,
    },

    /// The CSV reader failed on a query response.
    #[snafu(display("Error while reading the CSV response: {}", source))]
    Csv {
        /// The underlying error object from `csv`.
        source: csv::Error,
    },

    /// The query response was not valid annotated CSV.
    #[snafu(display("Malformed annotated CSV response: {}", message))]
    AnnotatedCsv {
        /// What was wrong with the response
        message: String,
    },

    /// The server reported an error inside a successful query response.
    #[snafu(display("Query failed: {}", message))]
    QueryFailed {
        /// The error message reported in the response table
        message: String,
        /// The optional error reference code
        reference: Option<String>,
    },
}

/// Client to a server supporting the InfluxData 2.0 API.
#[derive(Debug, Clone)]
pub struct Client {
    /// The base URL this client sends requests to
    pub url: String,
    auth_header: Option<Secret<String>>,
    gzip: bool,
    reqwest: reqwest::Client,
}

impl Client {
    /// Create a new client pointing to the URL specified in
    /// `protocol://server:port` format and using the specified token for
    /// authorization. An empty token sends no `Authorization` header.
    ///
    /// # Example
    ///
    /// ```
    /// let client = influxdb2_client::Client::new("http://localhost:8888", "my-token");
    /// ```
    pub fn new(url: impl Into<String>, auth_token: impl Into<String>) -> Self {
        let token = auth_token.into();
        let auth_header = if token.is_empty() {
            None
        } else {
            Some(Secret::new(format!("Token {token}")))
        };

        let url: String = url.into();
        Self {
            url: url.trim_end_matches('/').to_string(),
            auth_header,
            gzip: false,
            reqwest: reqwest::Client::new(),
        }
    }

    /// Compress write request bodies with gzip.
    pub fn with_gzip(mut self, gzip: bool) -> Self {
        self.gzip = gzip;
        self
    }

    /// Whether write request bodies are gzip compressed.
    pub fn gzip(&self) -> bool {
        self.gzip
    }

    /// Consolidate common request building code
    fn request(&self, method: Method, url: &str) -> reqwest::RequestBuilder {
        let mut req = self.reqwest.request(method, url);

        if let Some(auth) = &self.auth_header {
            req = req.header(AUTHORIZATION, auth.expose_secret());
        }

        req
    }
}

pub mod api;
pub mod models;

pub use api::write::BatchWriter;
pub use models::{DataPoint, FieldValue, FluxRecord, FluxValue, WriteDataPoint};
