// Ripple CLI entry point

use clap::Parser;
use ripple_cli::{logging, Cli, CommandRouter};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let level = match logging::resolve_level(cli.log_level.as_deref(), cli.verbose, cli.quiet) {
        Ok(level) => level,
        Err(e) => {
            eprintln!("{}", e.user_message());
            std::process::exit(e.exit_code());
        }
    };
    logging::init_logging(level);

    if let Err(e) = CommandRouter::execute(&cli).await {
        tracing::debug!(details = %e.technical_details(), "Command failed");
        eprintln!("{}", e.user_message());
        std::process::exit(e.exit_code());
    }
}
