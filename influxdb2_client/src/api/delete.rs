//! Delete API

use crate::models::DeletePredicateRequest;
use crate::{Client, HttpSnafu, RequestError, ReqwestProcessingSnafu, SerializingSnafu};
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::{Method, StatusCode};
use snafu::ResultExt;
use tracing::debug;

impl Client {
    /// Delete data from the bucket `bucket_id` of the organization `org_id`
    /// in the time range `[start, stop]` that matches `predicate`, e.g.
    /// `_measurement="cpu"`.
    pub async fn delete(
        &self,
        org_id: &str,
        bucket_id: &str,
        start: DateTime<Utc>,
        stop: DateTime<Utc>,
        predicate: Option<String>,
    ) -> Result<(), RequestError> {
        let delete_url = format!("{}/api/v2/delete", self.url);

        let body = DeletePredicateRequest {
            start: start.to_rfc3339_opts(SecondsFormat::Nanos, true),
            stop: stop.to_rfc3339_opts(SecondsFormat::Nanos, true),
            predicate,
        };
        debug!(org_id, bucket_id, ?body, "deleting");

        let response = self
            .request(Method::POST, &delete_url)
            .query(&[("orgID", org_id), ("bucketID", bucket_id)])
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(serde_json::to_string(&body).context(SerializingSnafu)?)
            .send()
            .await
            .context(ReqwestProcessingSnafu)?;

        match response.status() {
            StatusCode::NO_CONTENT | StatusCode::OK => Ok(()),
            status => {
                let text = response.text().await.context(ReqwestProcessingSnafu)?;
                HttpSnafu { status, text }.fail()?
            }
        }
    }
}
