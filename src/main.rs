use clap::Parser;
use mips_sim::config::{Cli, SimConfig};
use mips_sim::run_wrapper;

fn main() {
    let cli = Cli::parse();
    let verbose = cli.verbose;
    let config = SimConfig::from(cli);

    let filter = if verbose { "trace" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .with_target(false)
        .init();

    if let Err(err) = run_wrapper::run_simulation(&config) {
        eprintln!("mips-pipeline-sim: {err}");
        std::process::exit(1);
    }
}
