mod cli;
mod handlers;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Apply { archives, source, target } => handlers::apply(&archives, &source, &target),
        Commands::Create { source, target, out, zstd_level } => handlers::create(&source, &target, &out, zstd_level),
        Commands::List { archive } => handlers::list(&archive),
        Commands::Verify { archive, source } => handlers::verify(&archive, &source),
    };

    match result {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("diffkit: error[{}]: {e}", e.code());
            std::process::ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
