// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod config;
mod headless;
mod logging;
mod runtime;

use anyhow::{Context, Result, anyhow, bail};
use config::Config;
use runtime::ServiceRuntime;
use sheetsage_app::{Session, UploadTarget};
use sheetsage_client::Client;
use std::env;
use std::path::PathBuf;
use tracing::info;

fn main() {
    if let Err(error) = run() {
        eprintln!("{error:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let options = parse_cli_args(env::args().skip(1), Config::default_path()?)?;
    if options.show_help {
        print_help();
        return Ok(());
    }

    if options.print_config_path {
        println!("{}", options.config_path.display());
        return Ok(());
    }

    if options.print_example {
        print!("{}", Config::example_config(&options.config_path));
        return Ok(());
    }

    let config = Config::load(&options.config_path).with_context(|| {
        format!(
            "load config {}; run `sheetsage --print-example-config` to generate a v1 template",
            options.config_path.display()
        )
    })?;

    let base_url = config.resolve_base_url(options.api_base_url.as_deref());
    let client = Client::new(&base_url, config.api_timeout()?).with_context(|| {
        format!(
            "invalid [api] config in {}; fix base_url/timeout or pass --api-base-url",
            options.config_path.display()
        )
    })?;

    logging::init(config.log_path().as_deref(), config.log_level())?;
    info!(base_url = client.base_url(), "starting sheetsage");

    if options.check_only {
        return Ok(());
    }

    let accept = config.accepted_extensions();
    if let Some(request) = options.headless {
        let target = UploadTarget::from_path(&request.file, &accept)?;
        let mut session = Session::default();
        let mut client = client;
        let transcript = headless::run_once(&mut session, &mut client, target, &request.question);
        print!("{transcript}");
        if !session.error_message().is_empty() {
            bail!("Error! {}", session.error_message());
        }
        return Ok(());
    }

    let mut session = Session::default();
    let mut runtime = ServiceRuntime::new(client, accept);
    sheetsage_tui::run_app(&mut session, &mut runtime)
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct HeadlessRequest {
    file: PathBuf,
    question: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CliOptions {
    config_path: PathBuf,
    api_base_url: Option<String>,
    print_config_path: bool,
    print_example: bool,
    check_only: bool,
    headless: Option<HeadlessRequest>,
    show_help: bool,
}

fn parse_cli_args<I, S>(args: I, default_config_path: PathBuf) -> Result<CliOptions>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut options = CliOptions {
        config_path: default_config_path,
        api_base_url: None,
        print_config_path: false,
        print_example: false,
        check_only: false,
        headless: None,
        show_help: false,
    };
    let mut file = None;
    let mut question = None;

    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        match arg.as_ref() {
            "--config" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("--config requires a file path"))?;
                options.config_path = PathBuf::from(value.as_ref());
            }
            "--api-base-url" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("--api-base-url requires a URL"))?;
                options.api_base_url = Some(value.as_ref().to_owned());
            }
            "--file" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("--file requires a spreadsheet path"))?;
                file = Some(PathBuf::from(value.as_ref()));
            }
            "--ask" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("--ask requires a question"))?;
                question = Some(value.as_ref().to_owned());
            }
            "--print-config-path" => {
                options.print_config_path = true;
            }
            "--print-example-config" => {
                options.print_example = true;
            }
            "--check" => {
                options.check_only = true;
            }
            "--help" | "-h" => {
                options.show_help = true;
            }
            unknown => {
                bail!("unknown argument {unknown:?}; run with --help to see supported options");
            }
        }
    }

    options.headless = match (file, question) {
        (Some(file), Some(question)) => Some(HeadlessRequest { file, question }),
        (None, None) => None,
        _ => bail!("--file and --ask must be used together"),
    };
    Ok(options)
}

fn print_help() {
    println!("sheetsage: ask questions about an Excel workbook");
    println!("  --config <path>          Use a specific config path");
    println!("  --api-base-url <url>     Analysis service address (overrides config)");
    println!("  --print-config-path      Print resolved config path");
    println!("  --print-example-config   Print a v1 config template");
    println!("  --check                  Validate config and exit");
    println!("  --file <path> --ask <q>  Upload, ask once, print the answer and exit");
    println!("  --help                   Show this help");
}
