use anyhow::Result;
use tracing::{info, error};

use listing_extractor::cli;
use listing_extractor::utils::{default_log_file, init_logging};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let args = cli::parse_args();

    // Initialize logging
    let log_file = args
        .log_file
        .clone()
        .or_else(|| args.log_to_file.then(default_log_file));
    init_logging(args.verbose, log_file)?;

    info!("Starting Listing Extractor v{}", env!("CARGO_PKG_VERSION"));

    // Process commands
    match cli::process_command(args).await {
        Ok(_) => {
            info!("Command completed successfully");
            Ok(())
        }
        Err(e) => {
            error!("Command failed: {}", e);
            Err(e)
        }
    }
}
