mod aggregate;
mod baseline;
mod cli;
mod dates;
mod error;
mod filter;
mod fmt;
mod loader;
mod models;
mod pipeline;
mod settings;
#[cfg(feature = "tui")]
mod tui;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env)
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let data_dir = cli.data_dir.as_deref();

    let result = match cli.command {
        Commands::Init { encoding } => cli::init::run(data_dir, encoding),
        Commands::Series {
            by,
            values,
            from,
            to,
            baseline,
            json,
        } => cli::series::run(
            data_dir,
            by,
            &values,
            from.as_deref(),
            to.as_deref(),
            baseline.as_deref(),
            json,
        ),
        Commands::Table {
            genders,
            from_year,
            to_year,
            relative,
            json,
        } => cli::table::run(data_dir, &genders, from_year, to_year, relative, json),
        Commands::Values { by } => cli::values::run(data_dir, by),
        #[cfg(feature = "tui")]
        Commands::Dashboard { demo_latency } => cli::dashboard::run(data_dir, demo_latency),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
