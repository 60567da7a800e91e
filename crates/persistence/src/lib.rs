// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Host-side persistence for gpnvm: flash images on disk, JSON configuration
//! and log setup.

pub mod config;
pub mod dump;
pub mod error;
pub mod file_flash;
pub mod telemetry;

pub use config::{load_config, save_config};
pub use error::{PersistenceError, Result};
pub use file_flash::FileFlash;
