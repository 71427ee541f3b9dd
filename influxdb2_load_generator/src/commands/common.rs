use clap::Parser;
use influxdb2_client::Client;
use secrecy::{ExposeSecret, Secret};
use url::Url;

#[derive(Debug, Clone, Parser)]
pub struct InfluxDb2Config {
    /// The URL of the running InfluxDB 2 server
    #[clap(
        long = "url",
        env = "INFLUXDB2_URL",
        default_value = "http://localhost:8086"
    )]
    pub host_url: Url,

    /// The token for authentication with the InfluxDB 2 server
    #[clap(long = "token", env = "TOKEN")]
    pub auth_token: Option<Secret<String>>,

    /// The organization owning the bucket
    #[clap(long = "org", env = "INFLUXDB2_ORG", default_value = "ngrok")]
    pub org: String,

    /// The bucket to write to or read from
    #[clap(long = "bucket", env = "INFLUXDB2_BUCKET", default_value = "data")]
    pub bucket: String,
}

/// A gzip-enabled client for `host_url`. Without a token no
/// `Authorization` header is sent.
pub fn create_client(host_url: &Url, auth_token: Option<&Secret<String>>) -> Client {
    let token = auth_token
        .map(|t| t.expose_secret().clone())
        .unwrap_or_default();
    Client::new(host_url.as_str(), token).with_gzip(true)
}
