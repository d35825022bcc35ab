use std::process::ExitCode;

use client::{ClientError, UploadParams, ViewParams};
use tracing_subscriber::EnvFilter;

pub async fn upload(params: UploadParams) -> ExitCode {
    init_logging();
    report(client::upload_file(params).await)
}

pub async fn list(uri: &str) -> ExitCode {
    init_logging();
    report(client::list_files(uri).await)
}

pub async fn view(params: ViewParams) -> ExitCode {
    init_logging();
    report(client::view_file(params).await)
}

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("client=warn")),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn report(result: Result<(), ClientError>) -> ExitCode {
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}
