// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Page-wise ECC: the Hamming codec and the placement of parity records.

pub mod hamming;
pub mod parity;

pub use hamming::{Correction, HammingCodec};
pub use parity::{is_erased_record, ParityBits};

use crate::error::ConfigError;
use crate::types::{FlashAddress, FlashGeometry, PageIndex, Region};

/// Largest record any supported page size needs (`P <= 28`, plus the marker bit).
pub const MAX_RECORD_LEN: usize = 4;

/// Where parity records live and how they are computed.
///
/// Records are indexed by page number: the record of page `n` starts at
/// `region.start + n * record_len`. The region must fit inside a single page
/// (the "ECC host page"), which is rewritten as a whole on every parity
/// update and therefore cannot carry attributes of its own.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EccLayout {
    region: Region,
    codec: HammingCodec,
    host_page: PageIndex,
}

impl EccLayout {
    pub fn new(geometry: &FlashGeometry, region: Region) -> Result<Self, ConfigError> {
        if region.len == 0 {
            return Err(ConfigError::InvalidEccRegion("region is empty"));
        }
        if !geometry.contains(&region) {
            return Err(ConfigError::InvalidEccRegion("region lies outside the flash window"));
        }
        let host_page = geometry
            .page_of(region.start)
            .ok_or(ConfigError::InvalidEccRegion("region lies outside the flash window"))?;
        if !geometry.page_region(host_page).contains(&region) {
            return Err(ConfigError::InvalidEccRegion("region crosses a page boundary"));
        }

        let codec = HammingCodec::for_page(geometry.page_size());
        let needed = geometry.page_count() as u64 * codec.record_len() as u64;
        if needed > region.len as u64 {
            return Err(ConfigError::EccRegionTooSmall {
                needed: needed.min(u32::MAX as u64) as u32,
                available: region.len,
            });
        }

        Ok(Self {
            region,
            codec,
            host_page,
        })
    }

    pub fn region(&self) -> Region {
        self.region
    }

    pub fn codec(&self) -> &HammingCodec {
        &self.codec
    }

    pub fn host_page(&self) -> PageIndex {
        self.host_page
    }

    pub fn record_len(&self) -> usize {
        self.codec.record_len()
    }

    pub fn record_address(&self, page: PageIndex) -> FlashAddress {
        FlashAddress(self.region.start.0 + page.0 * self.codec.record_len() as u32)
    }
}
