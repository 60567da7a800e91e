// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Shadow page: the pre-erase backup of a data page.
//!
//! Before a data page is erased, the bytes of every attribute on it are
//! copied to the shadow page together with a checksummed header. The shadow
//! page is erased again once the rewritten page and its parity are on flash.
//! A non-erased shadow page at startup therefore means a rewrite was cut
//! short, and the record names the page to roll back.
//!
//! Record layout (little-endian):
//! `[MAGIC:4][PAGE:4][LEN:4][CRC64:8][PAYLOAD:LEN]`
//! where the CRC covers PAGE, LEN and PAYLOAD and the payload is the
//! concatenation of the page's attribute ranges in id order.

use byteorder::{ByteOrder, LittleEndian};
use crc64fast::Digest;
use thiserror::Error;

use crate::error::ConfigError;
use crate::types::{FlashAddress, FlashGeometry, PageIndex, Region};

pub const SHADOW_MAGIC: u32 = 0x5744_4853; // "SHDW"
pub const HEADER_LEN: usize = 4 + 4 + 4 + 8; // 20 bytes

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShadowError {
    #[error("Invalid shadow magic {0:#010x}")]
    BadMagic(u32),
    #[error("Shadow payload length {len} exceeds the {capacity} bytes available")]
    BadLength { len: usize, capacity: usize },
    #[error("Shadow checksum mismatch: expected {expected:#018x}, found {found:#018x}")]
    ChecksumMismatch { expected: u64, found: u64 },
}

/// Placement of the shadow page.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ShadowPage {
    address: FlashAddress,
    page: PageIndex,
    capacity: usize,
}

impl ShadowPage {
    pub fn new(geometry: &FlashGeometry, address: FlashAddress) -> Result<Self, ConfigError> {
        let page = geometry
            .page_of(address)
            .ok_or(ConfigError::InvalidShadowPage("address lies outside the flash window"))?;
        if !geometry.is_page_aligned(address) {
            return Err(ConfigError::InvalidShadowPage("address is not page aligned"));
        }
        Ok(Self {
            address,
            page,
            capacity: geometry.page_size() as usize,
        })
    }

    pub fn address(&self) -> FlashAddress {
        self.address
    }

    pub fn page(&self) -> PageIndex {
        self.page
    }

    pub fn region(&self) -> Region {
        Region {
            start: self.address,
            len: self.capacity as u32,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ShadowRecord<'a> {
    pub page: PageIndex,
    pub payload: &'a [u8],
}

impl<'a> ShadowRecord<'a> {
    pub fn encoded_len(&self) -> usize {
        HEADER_LEN + self.payload.len()
    }

    /// Fills `header` (at least `HEADER_LEN` bytes) for `payload`.
    pub fn write_header(header: &mut [u8], page: PageIndex, payload: &[u8]) {
        LittleEndian::write_u32(&mut header[0..4], SHADOW_MAGIC);
        LittleEndian::write_u32(&mut header[4..8], page.0);
        LittleEndian::write_u32(&mut header[8..12], payload.len() as u32);
        LittleEndian::write_u64(&mut header[12..20], checksum(page, payload));
    }

    /// Parses a record from the start of `buf` (the raw shadow page).
    pub fn decode(buf: &'a [u8]) -> Result<Self, ShadowError> {
        if buf.len() < HEADER_LEN {
            return Err(ShadowError::BadLength {
                len: HEADER_LEN,
                capacity: buf.len(),
            });
        }

        let magic = LittleEndian::read_u32(&buf[0..4]);
        if magic != SHADOW_MAGIC {
            return Err(ShadowError::BadMagic(magic));
        }

        let page = PageIndex(LittleEndian::read_u32(&buf[4..8]));
        let len = LittleEndian::read_u32(&buf[8..12]) as usize;
        let capacity = buf.len() - HEADER_LEN;
        if len > capacity {
            return Err(ShadowError::BadLength { len, capacity });
        }

        let expected = LittleEndian::read_u64(&buf[12..20]);
        let payload = &buf[HEADER_LEN..HEADER_LEN + len];
        let found = checksum(page, payload);
        if expected != found {
            return Err(ShadowError::ChecksumMismatch { expected, found });
        }

        Ok(Self { page, payload })
    }
}

fn checksum(page: PageIndex, payload: &[u8]) -> u64 {
    let mut digest = Digest::new();
    digest.write(&page.0.to_le_bytes());
    digest.write(&(payload.len() as u32).to_le_bytes());
    digest.write(payload);
    digest.sum64()
}
