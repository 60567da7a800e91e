// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
#![no_std]

//! gpnvm: a no_std attribute store on erase-before-write flash, with
//! page-wise Hamming ECC and a shadow page for power-loss recovery.

extern crate alloc;

#[cfg(test)]
#[macro_use]
extern crate std;

pub mod config;
pub mod ecc;
pub mod engine;
pub mod error;
pub mod flash;
pub mod recovery;
pub mod shadow;
pub mod storage;
pub mod sync;
pub mod types;

pub use config::{Layout, NvmConfig};
pub use engine::{NvmEngine, WritePhase};
pub use error::{ConfigError, FlashError, NvmError, Result, Status};
pub use flash::{FlashDevice, RamFlash};
pub use recovery::RecoveryOutcome;
pub use storage::AttributeDescriptor;
pub use sync::SharedNvm;
pub use types::{AttrId, FlashAddress, FlashGeometry, PageIndex, Region};

#[cfg(test)]
pub mod tests;
