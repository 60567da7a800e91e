// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Shared fixtures: engines over the reference layout and a flash wrapper
//! that loses power at a chosen mutating operation.

use crate::config::NvmConfig;
use crate::engine::NvmEngine;
use crate::error::FlashError;
use crate::flash::{FlashDevice, RamFlash};
use crate::types::{FlashAddress, FlashGeometry};

pub fn fresh_flash() -> RamFlash {
    RamFlash::new(NvmConfig::default().geometry).unwrap()
}

pub fn fresh_engine() -> NvmEngine<RamFlash> {
    NvmEngine::open(&NvmConfig::default(), fresh_flash()).unwrap()
}

/// Counts erase and write calls and fails the armed one without touching
/// storage. `arm` models power loss (every later call fails too), `arm_once`
/// a transient fault the caller keeps running after.
pub struct FaultyFlash {
    pub inner: RamFlash,
    pub attempts: u64,
    fail_at: Option<u64>,
    one_shot: bool,
}

impl FaultyFlash {
    pub fn new(inner: RamFlash) -> Self {
        Self {
            inner,
            attempts: 0,
            fail_at: None,
            one_shot: false,
        }
    }

    /// Fails the `nth` mutating call from now (1-based).
    pub fn arm(&mut self, nth: u64) {
        self.fail_at = Some(self.attempts + nth);
        self.one_shot = false;
    }

    /// Fails only the `nth` mutating call from now.
    pub fn arm_once(&mut self, nth: u64) {
        self.fail_at = Some(self.attempts + nth);
        self.one_shot = true;
    }

    fn attempt(&mut self) -> Result<(), FlashError> {
        self.attempts += 1;
        let Some(n) = self.fail_at else {
            return Ok(());
        };
        if self.attempts < n {
            return Ok(());
        }
        if self.one_shot {
            self.fail_at = None;
        }
        Err(FlashError::ParamErr("power lost"))
    }
}

impl FlashDevice for FaultyFlash {
    fn geometry(&self) -> FlashGeometry {
        self.inner.geometry()
    }

    fn erase(&mut self, page: FlashAddress) -> Result<(), FlashError> {
        self.attempt()?;
        self.inner.erase(page)
    }

    fn write(&mut self, addr: FlashAddress, data: &[u8]) -> Result<(), FlashError> {
        self.attempt()?;
        self.inner.write(addr, data)
    }

    fn read(&mut self, addr: FlashAddress, buf: &mut [u8]) -> Result<(), FlashError> {
        self.inner.read(addr, buf)
    }
}
