use clap::Parser;
use log::LevelFilter;
use std::process::ExitCode;
use tidyfold::cli::{Cli, run_cli};
use tidyfold::output::OutputFormatter;

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run_cli(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            OutputFormatter::error(&e.to_string());
            ExitCode::FAILURE
        }
    }
}

/// `warn` by default, `info` with `-v`, `debug` with `-vv` or more. `RUST_LOG`
/// takes precedence when set.
fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format_timestamp(None)
        .init();
}
