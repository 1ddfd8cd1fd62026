//! CLI entry point: render one photo across every universe and build the album

use clap::Parser;
use multiverse::io::cli::{BatchRunner, Cli};
use multiverse::io::logging;

#[tokio::main]
async fn main() -> multiverse::Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbosity());

    let mut runner = BatchRunner::new(cli);
    if let Err(error) = runner.run().await {
        tracing::error!("{error}");
        return Err(error);
    }
    Ok(())
}
