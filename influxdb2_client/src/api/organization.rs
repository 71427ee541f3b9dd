//! Organizations

use crate::models::{Organization, Organizations};
use crate::{Client, HttpSnafu, NotFoundSnafu, RequestError, ReqwestProcessingSnafu};
use reqwest::{Method, StatusCode};
use snafu::ResultExt;

impl Client {
    /// List organizations, optionally filtered by name
    pub async fn list_organizations(
        &self,
        org: Option<&str>,
    ) -> Result<Organizations, RequestError> {
        let orgs_url = format!("{}/api/v2/orgs", self.url);

        let mut request = self.request(Method::GET, &orgs_url);
        if let Some(org) = org {
            request = request.query(&[("org", org)]);
        }

        let response = request.send().await.context(ReqwestProcessingSnafu)?;

        match response.status() {
            StatusCode::OK => Ok(response
                .json::<Organizations>()
                .await
                .context(ReqwestProcessingSnafu)?),
            status => {
                let text = response.text().await.context(ReqwestProcessingSnafu)?;
                HttpSnafu { status, text }.fail()?
            }
        }
    }

    /// Find the first organization with the given name
    pub async fn find_organization_by_name(
        &self,
        name: &str,
    ) -> Result<Organization, RequestError> {
        self.list_organizations(Some(name))
            .await?
            .orgs
            .into_iter()
            .next()
            .ok_or_else(|| {
                NotFoundSnafu {
                    kind: "organization",
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

    type Error = Box<dyn std::error::Error>;
    type Result<T = (), E = Error> = std::result::Result<T, E>;

    #[tokio::test]
    async fn list_organizations_by_name() -> Result {
        let token = "some-token";

        let mut mock_server = Server::new_async().await;
        let mock = mock_server
            .mock("GET", "/api/v2/orgs")
            .match_query(Matcher::UrlEncoded("org".into(), "ngrok".into()))
            .match_header("Authorization", format!("Token {token}").as_str())
            .with_body(r#"{"orgs":[{"id":"0123","name":"ngrok","status":"active"}]}"#)
            .create_async()
            .await;

        let client = Client::new(mock_server.url(), token);

        let orgs = client.list_organizations(Some("ngrok")).await?;

        mock.assert_async().await;
        assert_eq!(orgs.orgs.len(), 1);
        assert_eq!(orgs.orgs[0].id, "0123");
        Ok(())
    }

    #[tokio::test]
    async fn missing_organization_is_not_found() {
        let mut mock_server = Server::new_async().await;
        let _mock = mock_server
            .mock("GET", "/api/v2/orgs")
            .match_query(Matcher::Any)
            .with_body(r#"{"orgs":[]}"#)
            .create_async()
            .await;

        let client = Client::new(mock_server.url(), "some-token");

        let err = client.find_organization_by_name("ngrok").await.unwrap_err();

        assert!(matches!(
            err,
            RequestError::NotFound {
                kind: "organization",
                ..
            }
        ));
        assert_eq!(err.to_string(), "no organization named `ngrok` was found");
    }

    #[tokio::test]
    async fn unauthorized_is_an_http_error() {
        let mut mock_server = Server::new_async().await;
        let _mock = mock_server
            .mock("GET", "/api/v2/orgs")
            .match_query(Matcher::Any)
            .with_status(401)
            .with_body(r#"{"code":"unauthorized","message":"unauthorized access"}"#)
            .create_async()
            .await;

        let client = Client::new(mock_server.url(), "bad-token");

        let err = client.list_organizations(Some("ngrok")).await.unwrap_err();

        assert!(matches!(
            err,
            RequestError::Http {
                status: StatusCode::UNAUTHORIZED,
                ..
            }
        ));
    }
}
