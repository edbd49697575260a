use anyhow::{Result, Context};
use futures::stream::{self, StreamExt};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::cli::config::ExtractorConfig;
use crate::display::{format_inr, mask_owner_name};
use crate::model::{ExtractionResult, FilterCriteria, RawDocument};
use crate::pipeline;
use crate::query::filter_listings;
use crate::utils::MetricsCollector;

/// Extract one rendered-HTML file into a listing record
pub async fn extract(
    file: PathBuf,
    source_url: String,
    profile: Option<String>,
    output: Option<PathBuf>,
) -> Result<()> {
    let config = load_config(profile.as_deref())?;

    let markup = tokio::fs::read_to_string(&file)
        .await
        .context(format!("Failed to read document: {}", file.display()))?;

    let doc = RawDocument::new(source_url, markup);
    let result = pipeline::assemble_with_filter(&doc, &config.image_filter());

    if !result.success {
        warn!(
            "Extraction failed for {}: {}",
            file.display(),
            result.error.as_ref().map(|e| e.to_string()).unwrap_or_default()
        );
    }

    let json = serialize_result(&result, config.output.pretty)?;

    match output {
        Some(path) => {
            tokio::fs::write(&path, json)
                .await
                .context(format!("Failed to write result: {}", path.display()))?;
            info!("Result written to: {}", path.display());
        }
        None => println!("{}", json),
    }

    Ok(())
}

/// Extract every .html file in a directory with bounded concurrency
pub async fn batch(
    dir: PathBuf,
    source_root: Option<String>,
    concurrency: Option<usize>,
    output_dir: Option<PathBuf>,
    profile: Option<String>,
) -> Result<()> {
    let config = load_config(profile.as_deref())?;
    let concurrency = concurrency.unwrap_or(config.batch.concurrency).max(1);

    let mut documents = Vec::new();
    let mut entries = tokio::fs::read_dir(&dir)
        .await
        .context(format!("Failed to read directory: {}", dir.display()))?;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().map_or(false, |ext| ext == "html") {
            documents.push(path);
        }
    }
    documents.sort();

    if documents.is_empty() {
        warn!("No .html documents found in {}", dir.display());
        return Ok(());
    }

    info!("Extracting {} documents with concurrency {}", documents.len(), concurrency);

    if let Some(out) = &output_dir {
        tokio::fs::create_dir_all(out)
            .await
            .context(format!("Failed to create output directory: {}", out.display()))?;
    }

    let metrics = MetricsCollector::new();
    let filter = config.image_filter();
    let pretty = config.output.pretty;

    let results: Vec<Result<()>> = stream::iter(documents)
        .map(|path| {
            let metrics = metrics.clone();
            let filter = filter.clone();
            let source_root = source_root.clone();
            let output_dir = output_dir.clone();

            async move {
                let markup = tokio::fs::read_to_string(&path)
                    .await
                    .context(format!("Failed to read document: {}", path.display()))?;

                let source_url = source_url_for(&path, source_root.as_deref());
                let doc = RawDocument::new(source_url, markup);

                let timer = metrics.start_timer();
                let result = pipeline::assemble_with_filter(&doc, &filter);
                let duration_ms = timer.end();

                let images = result.data.as_ref().map(|d| d.images.len()).unwrap_or(0);
                let error_kind = result.error.as_ref().map(|e| e.kind());
                metrics
                    .record_extraction(
                        &path.display().to_string(),
                        result.success,
                        error_kind,
                        images,
                        duration_ms,
                    )
                    .await;

                if let Some(out) = &output_dir {
                    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("result");
                    let target = out.join(format!("{}.json", stem));
                    let json = serialize_result(&result, pretty)?;
                    tokio::fs::write(&target, json)
                        .await
                        .context(format!("Failed to write result: {}", target.display()))?;
                }

                Ok(())
            }
        })
        .buffer_unordered(concurrency)
        .collect()
        .await;

    for outcome in results {
        if let Err(e) = outcome {
            warn!("Batch item failed: {:#}", e);
        }
    }

    let summary = metrics.get_metrics().await;
    println!("Documents processed: {}", summary.documents_processed);
    println!("Successful: {}", summary.successful_extractions);
    println!("Failed: {}", summary.failed_extractions);
    for (kind, count) in &summary.failures_by_kind {
        println!("  {}: {}", kind, count);
    }

    Ok(())
}

/// Filter stored listing records with the given criteria
pub async fn filter(records_path: PathBuf, criteria: FilterCriteria, as_json: bool) -> Result<()> {
    let contents = tokio::fs::read_to_string(&records_path)
        .await
        .context(format!("Failed to read records: {}", records_path.display()))?;

    let records: Vec<crate::model::ExtractedListing> = serde_json::from_str(&contents)
        .context("Failed to parse records JSON")?;

    let matched = filter_listings(&records, &criteria);
    info!("Matched {}/{} listings", matched.len(), records.len());

    if as_json {
        println!("{}", serde_json::to_string_pretty(&matched)?);
        return Ok(());
    }

    for listing in &matched {
        let owner = listing
            .owner_name
            .as_deref()
            .map(mask_owner_name)
            .unwrap_or_default();
        println!(
            "{} | {} | {} | {}",
            listing.car_name,
            format_inr(listing.price),
            listing.city.as_deref().unwrap_or("-"),
            if owner.is_empty() { "-".to_string() } else { owner },
        );
    }
    println!("{} of {} listings matched", matched.len(), records.len());

    Ok(())
}

/// List all available configuration profiles
pub async fn list_profiles() -> Result<()> {
    let profiles = ExtractorConfig::list_profiles()?;

    println!("Available configuration profiles:");
    for profile in profiles {
        println!("  - {}", profile);
    }

    Ok(())
}

/// Manage a specific configuration profile
pub async fn manage_profile(profile_name: String) -> Result<()> {
    // Load the profile if it exists
    match ExtractorConfig::load_profile(&profile_name) {
        Ok(config) => {
            // Display the configuration
            println!("Profile: {}", profile_name);
            println!("{:#?}", config);
        },
        Err(_) => {
            // Profile doesn't exist, create a new one
            warn!("Profile '{}' does not exist. Creating a default profile.", profile_name);
            let config = ExtractorConfig::default();
            config.save_as_profile(&profile_name)?;
            println!("Created default profile: {}", profile_name);
        }
    }

    Ok(())
}

/// Show the current configuration
pub async fn show_config() -> Result<()> {
    let config = ExtractorConfig::load_default()?;
    println!("Current configuration:");
    println!("{:#?}", config);

    Ok(())
}

fn load_config(profile: Option<&str>) -> Result<ExtractorConfig> {
    match profile {
        Some(name) => ExtractorConfig::load_profile(name)
            .context(format!("Failed to load profile: {}", name)),
        None => ExtractorConfig::load_default(),
    }
}

fn serialize_result(result: &ExtractionResult, pretty: bool) -> Result<String> {
    let json = if pretty {
        serde_json::to_string_pretty(result)?
    } else {
        serde_json::to_string(result)?
    };
    Ok(json)
}

fn source_url_for(path: &Path, source_root: Option<&str>) -> String {
    match source_root {
        Some(root) => {
            let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("");
            format!("{}/{}", root.trim_end_matches('/'), stem)
        }
        None => format!("file://{}", path.display()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_url_for_with_root() {
        let path = PathBuf::from("/tmp/docs/compass-1234.html");
        assert_eq!(
            source_url_for(&path, Some("https://example.com/buy/")),
            "https://example.com/buy/compass-1234"
        );
    }

    #[test]
    fn test_source_url_for_without_root_falls_back_to_file() {
        let path = PathBuf::from("/tmp/docs/compass-1234.html");
        assert_eq!(source_url_for(&path, None), "file:///tmp/docs/compass-1234.html");
    }
}
