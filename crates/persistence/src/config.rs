// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! JSON configuration files.

use std::fs;
use std::path::Path;

use gpnvm::NvmConfig;

use crate::error::Result;

/// Reads and validates a configuration. A file that parses but describes an
/// invalid layout is rejected here rather than at engine start.
pub fn load_config(path: impl AsRef<Path>) -> Result<NvmConfig> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)?;
    let config: NvmConfig = serde_json::from_str(&text)?;
    let layout = config.validate()?;
    tracing::debug!(
        "Loaded configuration from {:?}: {} attributes on {}",
        path,
        layout.map.len(),
        layout.geometry
    );
    Ok(config)
}

pub fn save_config(path: impl AsRef<Path>, config: &NvmConfig) -> Result<()> {
    let text = serde_json::to_string_pretty(config)?;
    fs::write(path, text)?;
    Ok(())
}
