mod cli;

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::Cli;

/// `EX_CONFIG` from sysexits.h
const EXIT_CONFIG: u8 = 78;

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cppdoc=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let cli = Cli::parse();

    match cli::run(&cli) {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) if e.is_config() => {
            tracing::error!("{}", e);
            ExitCode::from(EXIT_CONFIG)
        }
        Err(e) => {
            let e = anyhow::Error::new(e).context("documentation build failed");
            tracing::error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}
