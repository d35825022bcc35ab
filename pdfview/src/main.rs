use std::process::ExitCode;

use clap::{Command, arg, command, crate_name};
use client::{UploadParams, ViewParams};

mod cli;

#[tokio::main]
async fn main() -> ExitCode {
    let uri_arg = || arg!(-u --uri <URI>).required(true).help("API base URI");

    let cli = command!(crate_name!())
        .version(clap::crate_version!())
        .about(clap::crate_description!())
        .subcommand(Command::new(cli::VERSION_SUBCOMMAND).about(cli::VERSION_DESCRIPTION))
        .subcommand(Command::new(cli::BUGREPORT_SUBCOMMAND).about(cli::BUGREPORT_DESCRIPTION))
        .subcommand(Command::new(cli::SERVER_SUBCOMMAND).about(cli::SERVER_DESCRIPTION))
        .subcommand(
            Command::new(cli::UPLOAD_SUBCOMMAND)
                .about(cli::UPLOAD_DESCRIPTION)
                .arg(uri_arg())
                .arg(
                    arg!(-f --file <FILE>)
                        .required(true)
                        .help("Path to PDF file to upload"),
                ),
        )
        .subcommand(
            Command::new(cli::LIST_SUBCOMMAND)
                .about(cli::LIST_DESCRIPTION)
                .arg(uri_arg()),
        )
        .subcommand(
            Command::new(cli::VIEW_SUBCOMMAND)
                .about(cli::VIEW_DESCRIPTION)
                .arg(uri_arg())
                .arg(arg!(-i --id <ID>).required(true).help("File id as listed"))
                .arg(
                    arg!(-o --output <OUTPUT>)
                        .required(true)
                        .help("Where to save the document"),
                ),
        )
        .arg_required_else_help(true)
        .disable_version_flag(true)
        .get_matches();

    if cli.subcommand_matches(cli::VERSION_SUBCOMMAND).is_some() {
        cli::version::run();
        ExitCode::SUCCESS
    } else if cli.subcommand_matches(cli::BUGREPORT_SUBCOMMAND).is_some() {
        cli::bugreport::run();
        ExitCode::SUCCESS
    } else if cli.subcommand_matches(cli::SERVER_SUBCOMMAND).is_some() {
        cli::server::run().await
    } else if let Some(upload_matches) = cli.subcommand_matches(cli::UPLOAD_SUBCOMMAND) {
        let params = UploadParams {
            uri: required(upload_matches, "uri"),
            file: required(upload_matches, "file"),
        };
        cli::client::upload(params).await
    } else if let Some(list_matches) = cli.subcommand_matches(cli::LIST_SUBCOMMAND) {
        cli::client::list(&required(list_matches, "uri")).await
    } else if let Some(view_matches) = cli.subcommand_matches(cli::VIEW_SUBCOMMAND) {
        let params = ViewParams {
            uri: required(view_matches, "uri"),
            id: required(view_matches, "id"),
            output: required(view_matches, "output"),
        };
        cli::client::view(params).await
    } else {
        ExitCode::SUCCESS
    }
}

fn required(matches: &clap::ArgMatches, name: &str) -> String {
    matches.get_one::<String>(name).cloned().unwrap_or_default()
}
