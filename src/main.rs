//! nprobe - multi-protocol network probe
//!
//! Sweeps a target space with protocol probes and reports which endpoints
//! answered.

use clap::Parser;
use net_probe_engine::{app::App, cli::Cli, error::ErrorReporter};
use std::process;

#[tokio::main]
async fn main() {
    std::panic::set_hook(Box::new(|panic_info| {
        // Unwinding continues so the sweep can still print its report
        eprintln!("Application panic: {}", panic_info);
    }));

    let cli = Cli::parse();
    let reporter = ErrorReporter::new(cli.use_colors(), cli.verbose);

    if let Err(e) = App::new(cli).run().await {
        reporter.report_error(&e);
        process::exit(e.exit_code());
    }
}
