use std::process::ExitCode;

use clap::Parser;
use feedhub::adapter::inbound::cli::command::Cli;
use feedhub::adapter::inbound::cli::output::{self, OutputConfig};
use feedhub::adapter::inbound::cli::run;
use feedhub::infrastructure::config::logging::LoggingConfig;
use feedhub::infrastructure::operator::Operator;

fn main() -> ExitCode {
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    output::configure(OutputConfig::new(cli.json, cli.quiet));
    LoggingConfig::with_level(cli.log_level()).init();

    match run::execute(&cli, &Operator) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output::error(&e.to_string());
            ExitCode::FAILURE
        }
    }
}
