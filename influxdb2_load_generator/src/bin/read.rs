//! Entrypoint of the influxdb2_load_read binary
#![deny(rustdoc::broken_intra_doc_links, rustdoc::bare_urls, rust_2018_idioms)]
#![warn(
    missing_debug_implementations,
    clippy::explicit_iter_loop,
    clippy::use_self,
    clippy::clone_on_ref_ptr,
    clippy::future_not_send
)]

use influxdb2_load_generator::{
    commands::read,
    logging::LoggingConfig,
    process::{ReturnCode, load_dotenv, runtime},
};
use tracing::error;

#[derive(Debug, clap::Parser)]
#[clap(
    name = "influxdb2_load_read",
    about = "Read back the points written by influxdb2_load_write",
    long_about = r#"Read back the points written by influxdb2_load_write

Runs one Flux range query for a measurement and field, prints every value
read and how many records came back.

Examples:
    # Read the log field of stat0 over the last hour
    TOKEN=my-token influxdb2_load_read

    # Only count the max field of stat3 over the last 10 minutes
    influxdb2_load_read --measurement stat3 --field max --range 10m --quiet
"#
)]
struct Cli {
    #[clap(flatten)]
    logging_config: LoggingConfig,

    #[clap(flatten)]
    read_config: read::Config,
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
        if let Err(e) = read::command(config.read_config).await {
            error!(%e, "read failed");
            eprintln!("Read command failed: {e}");
            std::process::exit(ReturnCode::Failure as _)
        }
    });

    Ok(())
}
