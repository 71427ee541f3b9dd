//! Entrypoint of the influxdb2_load_write binary
#![deny(rustdoc::broken_intra_doc_links, rustdoc::bare_urls, rust_2018_idioms)]
#![warn(
    missing_debug_implementations,
    clippy::explicit_iter_loop,
    clippy::use_self,
    clippy::clone_on_ref_ptr,
    clippy::future_not_send
)]

use influxdb2_load_generator::{
    commands::write,
    logging::LoggingConfig,
    process::{ReturnCode, load_dotenv, runtime},
};
use tracing::error;

#[derive(Debug, clap::Parser)]
#[clap(
    name = "influxdb2_load_write",
    about = "Generate synthetic points and write them to an InfluxDB 2 server",
    long_about = r#"Generate synthetic points and write them to an InfluxDB 2 server

Each measurement gets the trailing 24 hours deleted, then one task per
(measurement, series) pair writes its points and reports how long it took.

Examples:
    # Write one hour of points to stat0 on a local server
    TOKEN=my-token influxdb2_load_write

    # Four measurements of ten series each, 100 points per request
    influxdb2_load_write --measurements 4 --series 10 --batch 100

    # Same, with debug logging
    LOG_FILTER=debug influxdb2_load_write --measurements 4 --series 10
"#
)]
struct Cli {
    #[clap(flatten)]
    logging_config: LoggingConfig,

    #[clap(flatten)]
    write_config: write::Config,
}

fn main() -> Result<(), std::io::Error> {
    // load all environment variables from .env before doing anything
    load_dotenv();

    let config: Cli = clap::Parser::parse();

    if let Err(e) = config.logging_config.install_global_subscriber() {
        eprintln!("Initializing logs failed: {e}");
        std::process::exit(ReturnCode::Failure as _);
    }

    let tokio_runtime = runtime()?;

    tokio_runtime.block_on(async move {
        if let Err(e) = write::command(config.write_config).await {
            error!(%e, "write failed");
            eprintln!("Write command failed: {e}");
            std::process::exit(ReturnCode::Failure as _)
        }
    });

    Ok(())
}
