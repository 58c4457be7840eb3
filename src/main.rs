//! `clc` - command-line client for the CenturyLink Cloud v2 API.

use clap::Parser;
use std::process::ExitCode;
use tracing::{debug, error, info, Level};
use tracing_subscriber::FmtSubscriber;

use clc_sdk::cli;
use clc_sdk::config::{Args, Config};
use clc_sdk::error::Result;
use clc_sdk::metrics::Timer;
use clc_sdk::sdk::{resolve_credentials, ApiClient};
use clc_sdk::VERSION;

#[tokio::main]
async fn main() -> ExitCode {
    // A missing .env file is not an error
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    // Initialize logging
    let log_level = if args.debug { Level::DEBUG } else { Level::INFO };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .finish();

    if tracing::subscriber::set_global_default(subscriber).is_err() {
        eprintln!("Failed to set tracing subscriber");
    }

    match run(args).await {
        Ok(code) => code,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<ExitCode> {
    let config = Config::from(&args);
    debug!("clc v{} against {}", VERSION, config.endpoint);

    // Missing credentials only matter once a call needs a token
    let credentials = resolve_credentials(config.username.as_deref(), config.password.as_deref())
        .await
        .ok();
    let client = ApiClient::new(config.client_options(credentials))?;

    let timer = Timer::start();
    let result = cli::run(&client, &config, args.command).await;

    if config.metrics {
        let snapshot = client.metrics().snapshot();
        info!(
            "API calls: {}, errors: {}, logins: {}, status polls: {}, elapsed: {}ms",
            snapshot.api_calls,
            snapshot.api_errors,
            snapshot.logins,
            snapshot.status_polls,
            timer.elapsed_ms()
        );
    }

    result
}
