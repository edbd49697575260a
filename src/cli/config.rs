use anyhow::{Result, Context};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::fs;
use tracing::{info, debug, error};

use crate::pipeline::images::{ImageFilter, DEFAULT_ALLOW_KEYWORDS, DEFAULT_DENY_SUBSTRINGS, MAX_IMAGES};

/// Main configuration structure
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ExtractorConfig {
    pub images: ImageSettings,
    pub batch: BatchSettings,
    pub output: OutputSettings,
}

/// Image screening settings; per-platform profiles extend the tables
/// instead of changing code
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ImageSettings {
    pub deny_substrings: Vec<String>,
    pub allow_keywords: Vec<String>,
    pub max_images: usize,
}

/// Batch extraction settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct BatchSettings {
    /// Concurrent documents processed at once
    pub concurrency: usize,
}

/// Output settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct OutputSettings {
    /// Pretty-print emitted JSON
    pub pretty: bool,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            images: ImageSettings {
                deny_substrings: DEFAULT_DENY_SUBSTRINGS.iter().map(|s| s.to_string()).collect(),
                allow_keywords: DEFAULT_ALLOW_KEYWORDS.iter().map(|s| s.to_string()).collect(),
                max_images: MAX_IMAGES,
            },
            batch: BatchSettings { concurrency: 4 },
            output: OutputSettings { pretty: true },
        }
    }
}

impl ExtractorConfig {
    /// Build the image filter from the configured tables
    pub fn image_filter(&self) -> ImageFilter {
        ImageFilter::new(
            self.images.deny_substrings.clone(),
            self.images.allow_keywords.clone(),
            self.images.max_images,
        )
    }

    /// Get the path to the config directory
    fn config_dir() -> PathBuf {
        let mut path = if let Some(proj_dirs) = directories::ProjectDirs::from("com", "listing-extractor", "listing-extractor") {
            proj_dirs.config_dir().to_path_buf()
        } else {
            PathBuf::from("./config")
        };

        // Create the profiles directory if it doesn't exist
        path.push("profiles");
        if !path.exists() {
            if let Err(e) = fs::create_dir_all(&path) {
                error!("Failed to create config directory: {}", e);
            }
        }

        // Move back up to the config directory
        path.pop();
        path
    }

    /// Load the default configuration
    pub fn load_default() -> Result<Self> {
        let config_dir = Self::config_dir();
        let config_path = config_dir.join("default.yaml");

        if config_path.exists() {
            Self::load_from_file(&config_path)
        } else {
            // Create and save the default configuration
            info!("Default configuration not found. Creating...");
            let config = Self::default();
            config.save_as_default()?;
            Ok(config)
        }
    }

    /// Load a configuration profile
    pub fn load_profile(profile: &str) -> Result<Self> {
        let config_dir = Self::config_dir();
        let profile_path = config_dir.join("profiles").join(format!("{}.yaml", profile));

        if profile_path.exists() {
            Self::load_from_file(&profile_path)
        } else {
            anyhow::bail!("Profile '{}' not found", profile)
        }
    }

    /// Load configuration from a file
    fn load_from_file(path: &Path) -> Result<Self> {
        debug!("Loading configuration from: {}", path.display());
        let contents = fs::read_to_string(path)
            .context(format!("Failed to read configuration file: {}", path.display()))?;

        let config: Self = serde_yaml::from_str(&contents)
            .context(format!("Failed to parse configuration file: {}", path.display()))?;

        Ok(config)
    }

    /// Save the configuration as the default
    pub fn save_as_default(&self) -> Result<()> {
        let config_dir = Self::config_dir();
        let config_path = config_dir.join("default.yaml");

        self.save_to_file(&config_path)
    }

    /// Save the configuration as a profile
    pub fn save_as_profile(&self, profile: &str) -> Result<()> {
        let config_dir = Self::config_dir();
        let profiles_dir = config_dir.join("profiles");

        // Create the profiles directory if it doesn't exist
        if !profiles_dir.exists() {
            fs::create_dir_all(&profiles_dir)
                .context(format!("Failed to create profiles directory: {}", profiles_dir.display()))?;
        }

        let profile_path = profiles_dir.join(format!("{}.yaml", profile));
        self.save_to_file(&profile_path)
    }

    /// Save the configuration to a file
    fn save_to_file(&self, path: &Path) -> Result<()> {
        debug!("Saving configuration to: {}", path.display());

        // Create parent directory if it doesn't exist
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent)
                    .context(format!("Failed to create directory: {}", parent.display()))?;
            }
        }

        let contents = serde_yaml::to_string(self)
            .context("Failed to serialize configuration")?;

        fs::write(path, contents)
            .context(format!("Failed to write configuration file: {}", path.display()))?;

        Ok(())
    }

    /// List all available profiles
    pub fn list_profiles() -> Result<Vec<String>> {
        let config_dir = Self::config_dir();
        let profiles_dir = config_dir.join("profiles");

        if !profiles_dir.exists() {
            return Ok(vec![]);
        }

        let mut profiles = Vec::new();

        for entry in fs::read_dir(profiles_dir)? {
            let entry = entry?;
            let path = entry.path();

            if path.is_file() && path.extension().map_or(false, |ext| ext == "yaml") {
                if let Some(stem) = path.file_stem() {
                    if let Some(name) = stem.to_str() {
                        profiles.push(name.to_string());
                    }
                }
            }
        }

        Ok(profiles)
    }
}
