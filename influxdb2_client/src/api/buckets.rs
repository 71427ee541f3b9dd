//! Buckets API

use crate::models::{Bucket, Buckets};
use crate::{Client, HttpSnafu, NotFoundSnafu, RequestError, ReqwestProcessingSnafu};
use reqwest::{Method, StatusCode};
use snafu::ResultExt;

impl Client {
    /// List buckets with the given name, optionally restricted to one
    /// organization
    pub async fn list_buckets(
        &self,
        name: &str,
        org: Option<&str>,
    ) -> Result<Buckets, RequestError> {
        let buckets_url = format!("{}/api/v2/buckets", self.url);

        let mut request = self
            .request(Method::GET, &buckets_url)
            .query(&[("name", name)]);
        if let Some(org) = org {
            request = request.query(&[("org", org)]);
        }

        let response = request.send().await.context(ReqwestProcessingSnafu)?;

        match response.status() {
            StatusCode::OK => Ok(response
                .json::<Buckets>()
                .await
                .context(ReqwestProcessingSnafu)?),
            status => {
                let text = response.text().await.context(ReqwestProcessingSnafu)?;
                HttpSnafu { status, text }.fail()?
            }
        }
    }

    /// Find the bucket with the given name
    pub async fn find_bucket_by_name(&self, name: &str) -> Result<Bucket, RequestError> {
        self.list_buckets(name, None)
            .await?
            .buckets
            .into_iter()
            .find(|bucket| bucket.name == name)
            .ok_or_else(|| {
                NotFoundSnafu {
                    kind: "bucket",
                    name,
                }
                .build()
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};

    #[tokio::test]
    async fn find_bucket_by_name() {
        let token = "some-token";

        let mut mock_server = Server::new_async().await;
        let mock = mock_server
            .mock("GET", "/api/v2/buckets")
            .match_query(Matcher::UrlEncoded("name".into(), "data".into()))
            .match_header("Authorization", format!("Token {token}").as_str())
            .with_body(
                r#"{"buckets":[{"id":"b1","name":"data","orgID":"o1","type":"user"}]}"#,
            )
            .create_async()
            .await;

        let client = Client::new(mock_server.url(), token);

        let bucket = client.find_bucket_by_name("data").await.unwrap();

        mock.assert_async().await;
        assert_eq!(bucket.id, "b1");
        assert_eq!(bucket.org_id.as_deref(), Some("o1"));
        assert_eq!(bucket.kind.as_deref(), Some("user"));
    }

    #[tokio::test]
    async fn find_missing_bucket() {
        let mut mock_server = Server::new_async().await;
        let _mock = mock_server
            .mock("GET", "/api/v2/buckets")
            .match_query(Matcher::Any)
            .with_body(r#"{"buckets":[]}"#)
            .create_async()
            .await;

        let client = Client::new(mock_server.url(), "some-token");

        let err = client.find_bucket_by_name("data").await.unwrap_err();

        assert_eq!(err.to_string(), "no bucket named `data` was found");
    }
}
