//! Binary entrypoint for the mcpdeck CLI.

use std::process;

#[tokio::main]
async fn main() {
    let exit_code = mcpdeck_cli::run().await;
    process::exit(exit_code);
}
