//! Command dispatch.

use crate::error::Result;
use crate::port::inbound::operator::DiagnosticOperator;

use super::command::{Cli, Commands};
use super::{check, provider};

/// Run the parsed command against `operator`.
pub fn execute(cli: &Cli, operator: &dyn DiagnosticOperator) -> Result<()> {
    match &cli.command {
        Commands::Check => check::execute(operator, &cli.config),
        Commands::Resolve(args) => provider::execute_resolve(operator, &cli.config, &args.exchange),
        Commands::Mapping(args) => {
            provider::execute_mapping(operator, &cli.config, &args.exchanges)
        }
    }
}
