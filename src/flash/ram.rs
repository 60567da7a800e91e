// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! RAM-backed flash device.
//!
//! Simulates erase-before-write flash entirely in memory: a fresh device is
//! fully erased, writes only land on erased bytes, erase resets whole pages.
//! Used by the engine's tests and as the in-memory image behind host-side
//! file persistence.

use alloc::vec;
use alloc::vec::Vec;

use crate::error::{ConfigError, FlashError};
use crate::flash::{FlashDevice, ERASED};
use crate::types::{FlashAddress, FlashGeometry};

pub struct RamFlash {
    geometry: FlashGeometry,
    data: Vec<u8>,
    erase_count: u64,
    write_count: u64,
}

impl RamFlash {
    /// Creates a fully erased device.
    pub fn new(geometry: FlashGeometry) -> Result<Self, ConfigError> {
        geometry.validate()?;
        Ok(Self {
            geometry,
            data: vec![ERASED; geometry.size() as usize],
            erase_count: 0,
            write_count: 0,
        })
    }

    /// Creates a device over an existing image (e.g. loaded from disk).
    pub fn from_image(geometry: FlashGeometry, image: Vec<u8>) -> Result<Self, ConfigError> {
        geometry.validate()?;
        if image.len() != geometry.size() as usize {
            return Err(ConfigError::InvalidGeometry(
                "image size does not match the flash size",
            ));
        }
        Ok(Self {
            geometry,
            data: image,
            erase_count: 0,
            write_count: 0,
        })
    }

    /// How many page erases were performed.
    pub fn erase_count(&self) -> u64 {
        self.erase_count
    }

    /// How many write calls succeeded.
    pub fn write_count(&self) -> u64 {
        self.write_count
    }

    /// Whole backing image, indexed from the flash base.
    pub fn raw(&self) -> &[u8] {
        &self.data
    }

    /// Direct access to the backing image, bypassing every flash rule.
    /// Used to inject bit rot.
    pub fn raw_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Flips bit `bit` (0 = LSB) of the byte at `addr`, bypassing every flash rule.
    pub fn flip_bit(&mut self, addr: FlashAddress, bit: u8) -> Result<(), FlashError> {
        if bit > 7 {
            return Err(FlashError::ParamErr("bit index above 7"));
        }
        let span = self.geometry.span(addr, 1)?;
        self.data[span.start] ^= 1 << bit;
        Ok(())
    }

    pub fn into_image(self) -> Vec<u8> {
        self.data
    }
}

impl FlashDevice for RamFlash {
    fn geometry(&self) -> FlashGeometry {
        self.geometry
    }

    fn erase(&mut self, page: FlashAddress) -> Result<(), FlashError> {
        self.geometry.span(page, 1)?;
        if !self.geometry.is_page_aligned(page) {
            return Err(FlashError::ParamErr("erase address is not page aligned"));
        }

        let span = self.geometry.span(page, self.geometry.page_size() as usize)?;
        self.data[span].fill(ERASED);
        self.erase_count += 1;
        Ok(())
    }

    fn write(&mut self, addr: FlashAddress, data: &[u8]) -> Result<(), FlashError> {
        if data.is_empty() {
            return Err(FlashError::ParamErr("empty write"));
        }
        let span = self.geometry.span(addr, data.len())?;

        if let Some(pos) = self.data[span.clone()].iter().position(|&b| b != ERASED) {
            return Err(FlashError::PageNotErased {
                addr: FlashAddress(addr.0 + pos as u32),
            });
        }

        self.data[span].copy_from_slice(data);
        self.write_count += 1;
        Ok(())
    }

    fn read(&mut self, addr: FlashAddress, buf: &mut [u8]) -> Result<(), FlashError> {
        if buf.is_empty() {
            return Err(FlashError::ParamErr("empty read"));
        }
        let span = self.geometry.span(addr, buf.len())?;
        buf.copy_from_slice(&self.data[span]);
        Ok(())
    }
}
