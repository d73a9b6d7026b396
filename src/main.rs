use clap::Parser;
use tracing_subscriber::EnvFilter;

use tasklens::cli::commands::Cli;
use tasklens::cli::handlers;

fn main() {
    // RUST_LOG overrides; warnings surface by default
    let filter = EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into());
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .try_init();

    let cli = Cli::parse();
    if let Err(e) = handlers::dispatch(cli) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}
