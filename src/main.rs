use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use metadump::{DumpArgs, MetadataDumper};

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = DumpArgs::parse();
    match MetadataDumper.run(&args).await {
        Ok(None) => ExitCode::SUCCESS,
        Ok(Some(report)) => {
            report.print();
            if report.failed_required > 0 {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            }
        }
        Err(error) => {
            eprintln!("metadump: {error}");
            ExitCode::from(2)
        }
    }
}
