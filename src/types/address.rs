// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Flash addresses, regions and device geometry.
//!
//! A `FlashAddress` is a location in the device's own address space (the
//! reference part maps its flash at `0x80000`). It is never a machine pointer:
//! the only way to turn it into a storage offset is `FlashGeometry::span`,
//! which performs the bounds check.

use core::fmt;
use core::ops::Range;

use crate::error::{ConfigError, FlashError};

/// Upper bound on the page size so that every bit position of a page fits
/// the codec's `u32` syndrome.
pub const MAX_PAGE_SIZE: u32 = 1 << 24;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
#[repr(transparent)]
pub struct FlashAddress(pub u32);

impl FlashAddress {
    /// Distance in bytes from `origin` to `self`. `None` if `self` is below `origin`.
    pub fn offset_from(self, origin: FlashAddress) -> Option<u32> {
        self.0.checked_sub(origin.0)
    }
}

impl fmt::Display for FlashAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#07x}", self.0)
    }
}

/// Page number: `(address - base) / page_size`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(transparent)]
pub struct PageIndex(pub u32);

impl fmt::Display for PageIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Half-open byte range `[start, start + len)` of the flash address space.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Region {
    pub start: FlashAddress,
    pub len: u32,
}

impl Region {
    pub const fn new(start: u32, len: u32) -> Self {
        Self { start: FlashAddress(start), len }
    }

    /// Exclusive end, widened so a region touching the top of the 32-bit
    /// address space does not overflow.
    pub fn end(&self) -> u64 {
        self.start.0 as u64 + self.len as u64
    }

    pub fn overlaps(&self, other: &Region) -> bool {
        self.len > 0
            && other.len > 0
            && (self.start.0 as u64) < other.end()
            && (other.start.0 as u64) < self.end()
    }

    pub fn contains(&self, other: &Region) -> bool {
        other.start.0 >= self.start.0 && other.end() <= self.end()
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{:#07x}", self.start, self.end())
    }
}

/// Shape of the flash window: where it starts, how big it is and how big an
/// erase unit is.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FlashGeometry {
    base: FlashAddress,
    size: u32,
    page_size: u32,
}

impl FlashGeometry {
    /// Builds a geometry without checking it. `validate` runs before any
    /// device or engine uses it.
    pub const fn new(base: u32, size: u32, page_size: u32) -> Self {
        Self {
            base: FlashAddress(base),
            size,
            page_size,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.page_size == 0 {
            return Err(ConfigError::InvalidGeometry("page size is zero"));
        }
        if self.page_size > MAX_PAGE_SIZE {
            return Err(ConfigError::InvalidGeometry("page size exceeds 16 MiB"));
        }
        if self.size == 0 {
            return Err(ConfigError::InvalidGeometry("flash size is zero"));
        }
        if self.size % self.page_size != 0 {
            return Err(ConfigError::InvalidGeometry(
                "flash size is not a whole number of pages",
            ));
        }
        if self.base.0 % self.page_size != 0 {
            return Err(ConfigError::InvalidGeometry("base address is not page aligned"));
        }
        if self.end() > u32::MAX as u64 + 1 {
            return Err(ConfigError::InvalidGeometry(
                "flash window exceeds the 32-bit address space",
            ));
        }
        Ok(())
    }

    pub fn base(&self) -> FlashAddress {
        self.base
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn end(&self) -> u64 {
        self.base.0 as u64 + self.size as u64
    }

    pub fn page_count(&self) -> u32 {
        self.size / self.page_size
    }

    pub fn window(&self) -> Region {
        Region {
            start: self.base,
            len: self.size,
        }
    }

    pub fn contains(&self, region: &Region) -> bool {
        self.window().contains(region)
    }

    /// Converts `len` bytes at `addr` into an offset range of the backing
    /// storage. This is the single place where flash addresses become indices.
    pub fn span(&self, addr: FlashAddress, len: usize) -> Result<Range<usize>, FlashError> {
        let out_of_bounds = FlashError::OutOfBounds { addr, len };
        let start = addr.offset_from(self.base).ok_or(out_of_bounds)? as usize;
        let end = start.checked_add(len).ok_or(out_of_bounds)?;
        if end > self.size as usize {
            return Err(out_of_bounds);
        }
        Ok(start..end)
    }

    pub fn page_of(&self, addr: FlashAddress) -> Option<PageIndex> {
        let offset = addr.offset_from(self.base)?;
        if offset >= self.size {
            return None;
        }
        Some(PageIndex(offset / self.page_size))
    }

    pub fn page_start(&self, page: PageIndex) -> FlashAddress {
        FlashAddress(self.base.0 + page.0 * self.page_size)
    }

    pub fn page_region(&self, page: PageIndex) -> Region {
        Region {
            start: self.page_start(page),
            len: self.page_size,
        }
    }

    /// Offset of `addr` from the start of its page.
    pub fn page_offset(&self, addr: FlashAddress) -> usize {
        (addr.0.wrapping_sub(self.base.0) % self.page_size) as usize
    }

    pub fn is_page_aligned(&self, addr: FlashAddress) -> bool {
        addr.0.wrapping_sub(self.base.0) % self.page_size == 0
    }
}

impl fmt::Display for FlashGeometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} +{:#x} ({} pages of {:#x})",
            self.base,
            self.size,
            self.page_count(),
            self.page_size
        )
    }
}
