use crate::*;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use tracing::{debug, info, instrument};

#[instrument(skip(path))]
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<GexConfig> {
    let path = path.as_ref();
    info!("Loading configuration from: {:?}", path);

    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    debug!("Config file content length: {} bytes", content.len());

    let config = parse_config(&content)?;

    info!("Configuration loaded successfully");
    Ok(config)
}

/// Parse YAML text after environment substitution.
pub fn parse_config(content: &str) -> Result<GexConfig> {
    let substituted = substitution::substitute_env_vars(content)?;

    // An empty document deserializes as unit, not as an empty map
    if substituted.trim().is_empty() {
        return Ok(GexConfig::default());
    }

    serde_yaml::from_str(&substituted).with_context(|| "Failed to parse YAML configuration")
}

#[instrument]
pub fn generate_default_config() -> GexConfig {
    GexConfig {
        service: ServiceConfig::default(),
        server: ServerSection::default(),
        upstream: UpstreamConfig::default(),
        engine: EngineSection::default(),
        history: HistorySection::default(),
        metrics: MetricsSection::default(),
    }
}

#[instrument]
pub fn save_config<P: AsRef<Path> + std::fmt::Debug>(config: &GexConfig, path: P) -> Result<()> {
    let path = path.as_ref();
    info!("Saving configuration to: {:?}", path);

    let yaml = serde_yaml::to_string(config)
        .with_context(|| "Failed to serialize configuration to YAML")?;

    fs::write(path, yaml)
        .with_context(|| format!("Failed to write config file: {:?}", path))?;

    info!("Configuration saved successfully");
    Ok(())
}
