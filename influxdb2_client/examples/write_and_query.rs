//! Write two points to a local server and read them back.
//!
//! Run against an InfluxDB 2 server with `INFLUX_TOKEN` set.

use influxdb2_client::{Client, DataPoint, models::Query};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let org = "ngrok";
    let bucket = "data";
    let token = std::env::var("INFLUX_TOKEN").unwrap_or_default();

    let client = Client::new("http://localhost:8086", token).with_gzip(true);

    let points = vec![
        DataPoint::builder("cpu_load_short")
            .tag("host", "server01")
            .tag("region", "us-west")
            .field("value", 0.64)
            .build()?,
        DataPoint::builder("cpu_load_short")
            .tag("host", "server01")
            .field("value", 27.99)
            .build()?,
    ];

    client.write(org, bucket, &points).await?;

    let flux = format!(
        r#"from(bucket: "{bucket}") |> range(start: -1h) |> filter(fn: (r) => r._measurement == "cpu_load_short")"#
    );
    for record in client.query(org, &Query::new(flux)).await? {
        println!("{:?} {:?}", record.time(), record.value());
    }

    Ok(())
}
