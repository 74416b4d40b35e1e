// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod config;
mod logging;
mod runtime;

use anyhow::{Context, Result, anyhow, bail};
use config::Config;
use doit_app::{AppState, Reply};
use runtime::RemoteRuntime;
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
            "load config {}; run `doit --print-example-config` to generate a template",
            options.config_path.display()
        )
    })?;

    if let Some(log_path) = config.log_path()
        && let Err(error) = logging::init_logging(&log_path)
    {
        eprintln!("warning: logging disabled: {error:#}");
    }

    let client = config.client().with_context(|| {
        format!(
            "invalid [server] config in {}; fix protocol/url/port/username values",
            options.config_path.display()
        )
    })?;
    let features = config.features();
    info!(
        server = client.base_url(),
        tags = features.tags,
        notes = features.notes,
        commit = features.commit.as_str(),
        "starting doit"
    );

    let tasks = match client.list().context("fetch initial task list")? {
        Reply::Accepted(tasks) => tasks,
        Reply::Rejected(status) => bail!(
            "task server at {} rejected /list with status {status}; check server.username and server.password",
            client.base_url()
        ),
    };

    if options.check_only {
        println!("{}: {} task(s)", client.base_url(), tasks.len());
        return Ok(());
    }

    let mut state = AppState::new(features, tasks);
    let mut runtime = RemoteRuntime::new(&client);
    doit_tui::run_app(&mut state, &mut runtime)
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CliOptions {
    config_path: PathBuf,
    print_config_path: bool,
    print_example: bool,
    check_only: bool,
    show_help: bool,
}

fn parse_cli_args<I, S>(args: I, default_config_path: PathBuf) -> Result<CliOptions>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut options = CliOptions {
        config_path: default_config_path,
        print_config_path: false,
        print_example: false,
        check_only: false,
        show_help: false,
    };

    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        match arg.as_ref() {
            "--config" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("--config requires a file path"))?;
                options.config_path = PathBuf::from(value.as_ref());
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
                return Err(anyhow!(
                    "unknown argument {unknown:?}; run with --help to see supported options"
                ));
            }
        }
    }

    Ok(options)
}

fn print_help() {
    println!("doit - terminal client for a remote task list");
    println!("  --config <path>          Use a specific config path");
    println!("  --print-config-path      Print resolved config path");
    println!("  --print-example-config   Print a config template");
    println!("  --check                  Validate config and fetch the task list once");
    println!("  --help                   Show this help");
    println!();
    println!("Set {}=debug for verbose logs.", logging::LOG_ENV);
}
