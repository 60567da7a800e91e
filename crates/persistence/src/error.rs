// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use gpnvm::ConfigError;
use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
    #[error("Invalid flash dump at line {line}: {reason}")]
    InvalidFormat { line: usize, reason: String },
    #[error("Invalid configuration file: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Configuration rejected: {0}")]
    Config(#[from] ConfigError),
}

pub type Result<T> = std::result::Result<T, PersistenceError>;
