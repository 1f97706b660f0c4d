mod cli;
mod render;

use std::process::ExitCode;

use clap::Parser;
use cli::Cli;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // A missing .env file is fine; the environment may be set directly.
    let _ = dotenvy::dotenv();
    erpsales_observability::init();

    let cli = Cli::parse();
    match cli.run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => cli::report_failure(&err),
    }
}
