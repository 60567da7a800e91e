// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Flash device contract.
//!
//! Abstracts erase-before-write flash so the engine can run against a real
//! controller, the RAM-backed `RamFlash`, or a file-backed image on a host.

pub mod ram;

pub use ram::RamFlash;

use crate::error::FlashError;
use crate::types::{FlashAddress, FlashGeometry};

/// Value of every byte of an erased page.
pub const ERASED: u8 = 0xFF;

/// Byte-addressed flash window with page-granularity erase.
///
/// Implementations check every precondition before touching storage: a call
/// that returns `Err` has not modified any byte.
pub trait FlashDevice {
    fn geometry(&self) -> FlashGeometry;

    /// Resets the page starting at `page` to `ERASED`.
    ///
    /// `OutOfBounds` outside the window, `ParamErr` if `page` is not page aligned.
    fn erase(&mut self, page: FlashAddress) -> Result<(), FlashError>;

    /// Programs `data` at `addr`.
    ///
    /// `ParamErr` for empty `data`, `OutOfBounds` if any byte escapes the
    /// window, `PageNotErased` if any target byte is not `ERASED`.
    fn write(&mut self, addr: FlashAddress, data: &[u8]) -> Result<(), FlashError>;

    /// Copies `buf.len()` bytes at `addr` into `buf`, erased bytes included.
    ///
    /// `ParamErr` for empty `buf`, `OutOfBounds` if any byte escapes the window.
    fn read(&mut self, addr: FlashAddress, buf: &mut [u8]) -> Result<(), FlashError>;
}

impl<F: FlashDevice + ?Sized> FlashDevice for &mut F {
    fn geometry(&self) -> FlashGeometry {
        (**self).geometry()
    }

    fn erase(&mut self, page: FlashAddress) -> Result<(), FlashError> {
        (**self).erase(page)
    }

    fn write(&mut self, addr: FlashAddress, data: &[u8]) -> Result<(), FlashError> {
        (**self).write(addr, data)
    }

    fn read(&mut self, addr: FlashAddress, buf: &mut [u8]) -> Result<(), FlashError> {
        (**self).read(addr, buf)
    }
}

pub fn is_erased(bytes: &[u8]) -> bool {
    bytes.iter().all(|&b| b == ERASED)
}
