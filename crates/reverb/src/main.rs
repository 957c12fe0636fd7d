//! `reverb` binary entry point.

use clap::Parser;
use reverb::ReverbConfig;
use reverb::cli::{Cli, run};
use reverb_core::observability::{init_logging, summarize_error};

#[tokio::main]
async fn main() {
    // A missing .env file is the normal case.
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let verbose = cli.verbose;
    init_logging(verbose);

    let result = match ReverbConfig::load(cli.config.as_deref()) {
        Ok(config) => run(cli, config).await,
        Err(e) => Err(e.into()),
    };

    if let Err(e) = result {
        eprintln!("{}", summarize_error(&format!("{:#}", e), verbose));
        std::process::exit(1);
    }
}
