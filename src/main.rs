use log::debug;
use sqlctl::configuration::Config;
use sqlctl::controller::{parse_args, Console, Controller, Invocation};
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    let console = Console::new();

    let cli = match parse_args(std::env::args_os()) {
        Invocation::Run(cli) => cli,
        Invocation::Help(text) => {
            console.print(&text);
            return ExitCode::SUCCESS;
        }
        Invocation::Usage(text) => {
            console.print(&text);
            return ExitCode::FAILURE;
        }
    };

    // https://docs.rs/env_logger/latest/env_logger/
    env_logger::Builder::from_default_env()
        .filter_level(if cli.verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        })
        .format_target(false)
        .init();

    let config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            console.error(&format!("Unable to load configuration: {}", e));
            return ExitCode::FAILURE;
        }
    };
    debug!(
        "Using container {} ({}) via {}",
        config.container_name, config.image, config.runtime
    );

    let Some(action) = cli.command else {
        return ExitCode::SUCCESS;
    };

    let controller = Controller::new(config, console);
    match controller.run(action).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            console.error(&e.to_string());
            ExitCode::FAILURE
        }
    }
}
