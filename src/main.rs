use clap::Parser;
use std::process;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tasksync::cli;
use tasksync::cli::commands::{Cli, Commands};

fn main() {
    // Diagnostics go to stderr so JSON output on stdout stays parseable.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli_args = Cli::parse();
    let json_output = cli_args.json;
    let user = cli_args.user.clone();

    let exit_code = match cli_args.command {
        Commands::Init { seed } => cli::init::run(seed, json_output, &user),
        Commands::Category(cmd) => cli::category::run(cmd, json_output, &user),
        Commands::Task(cmd) => cli::task::run(cmd, json_output, &user),
        Commands::Show => cli::show::run_board(json_output, &user),
        Commands::Comments => cli::show::run_comments(json_output, &user),
        Commands::Watch { interval_ms } => cli::watch::run(interval_ms, json_output, &user),
    };

    process::exit(exit_code);
}
