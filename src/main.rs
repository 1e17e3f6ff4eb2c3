use ab_report::app::{handle_fatal_error, init_logging, AppConfig};
use ab_report::cli::{execute_command, Cli};
use clap::Parser;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let app_config = AppConfig::new(cli.verbose);
    init_logging(&app_config);

    if let Err(e) = execute_command(cli.command, cli.config.as_deref()).await {
        handle_fatal_error(e, cli.verbose);
    }
}
