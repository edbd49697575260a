pub mod commands;
pub mod config;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;

use crate::model::FilterCriteria;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Write logs to this file as well
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    /// Write logs to the default log file location
    #[arg(long, global = true)]
    pub log_to_file: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract a structured listing from one rendered HTML document
    Extract {
        /// Path to the rendered HTML file
        #[arg(required = true)]
        file: PathBuf,

        /// URL the document was rendered from, used for relative-URL resolution
        #[arg(short, long)]
        source_url: String,

        /// Configuration profile to use
        #[arg(short, long)]
        profile: Option<String>,

        /// Output file path (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Extract every .html document in a directory
    Batch {
        /// Directory containing rendered HTML files
        #[arg(required = true)]
        dir: PathBuf,

        /// URL prefix the documents were rendered from
        #[arg(long)]
        source_root: Option<String>,

        /// Number of documents to process concurrently
        #[arg(short, long)]
        concurrency: Option<usize>,

        /// Directory to write per-document result JSON into
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Configuration profile to use
        #[arg(short, long)]
        profile: Option<String>,
    },

    /// Filter stored listing records by search criteria
    Filter {
        /// Path to a JSON array of listing records
        #[arg(required = true)]
        records: PathBuf,

        /// Brands to match (repeatable)
        #[arg(long)]
        brand: Vec<String>,

        /// Cities to match (repeatable)
        #[arg(long)]
        city: Vec<String>,

        /// Fuel types to match (repeatable)
        #[arg(long)]
        fuel: Vec<String>,

        /// Transmissions to match (repeatable)
        #[arg(long)]
        transmission: Vec<String>,

        /// Minimum price in rupees
        #[arg(long)]
        min_price: Option<u64>,

        /// Maximum price in rupees
        #[arg(long)]
        max_price: Option<u64>,

        /// Minimum purchase year
        #[arg(long)]
        min_year: Option<i32>,

        /// Maximum purchase year
        #[arg(long)]
        max_year: Option<i32>,

        /// Free-text query over brand, model and city
        #[arg(short, long)]
        query: Option<String>,

        /// Emit matched records as JSON instead of a summary table
        #[arg(long)]
        json: bool,
    },

    /// Manage configuration profiles
    Config {
        /// Profile name to manage
        #[arg(required = false)]
        profile: Option<String>,

        /// List all available profiles
        #[arg(short, long)]
        list: bool,
    },
}

/// Parse command line arguments
pub fn parse_args() -> Cli {
    Cli::parse()
}

/// Process the command
pub async fn process_command(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Extract { file, source_url, profile, output } => {
            info!("Extracting listing from {}", file.display());
            commands::extract(file, source_url, profile, output).await
        },
        Commands::Batch { dir, source_root, concurrency, output, profile } => {
            info!("Running batch extraction over {}", dir.display());
            commands::batch(dir, source_root, concurrency, output, profile).await
        },
        Commands::Filter {
            records,
            brand,
            city,
            fuel,
            transmission,
            min_price,
            max_price,
            min_year,
            max_year,
            query,
            json,
        } => {
            let criteria = FilterCriteria {
                brands: brand,
                cities: city,
                fuel_types: fuel,
                transmissions: transmission,
                min_price,
                max_price,
                min_year,
                max_year,
                query,
            };
            commands::filter(records, criteria, json).await
        },
        Commands::Config { profile, list } => {
            if list {
                info!("Listing all configuration profiles");
                commands::list_profiles().await
            } else if let Some(profile_name) = profile {
                info!("Managing configuration profile: {}", profile_name);
                commands::manage_profile(profile_name).await
            } else {
                info!("Showing current configuration");
                commands::show_config().await
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert()
    }
}
