// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Static block map.
//!
//! Maps an `AttrId` to its descriptor. The id IS the table position: inserting
//! or reordering entries silently re-keys every attribute after the change, so
//! tables must only ever be appended to once devices are in the field.
//!
//! Every invariant is checked once in `BlockMap::new`. After that the map is
//! immutable and lookups never re-validate.

use alloc::vec::Vec;

use crate::error::{ConfigError, NvmError, Result};
use crate::storage::descriptor::AttributeDescriptor;
use crate::types::{AttrId, FlashGeometry, PageIndex, Region};

/// Maximum number of attributes addressable by a `u8` id.
pub const MAX_ATTRIBUTES: usize = 256;

/// A flash region owned by the engine rather than by an attribute.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Reserved {
    pub name: &'static str,
    pub region: Region,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockMap {
    descriptors: Vec<AttributeDescriptor>,
    pages: Vec<PageIndex>,
    data_pages: Vec<PageIndex>,
}

impl BlockMap {
    /// Validates `descriptors` against the geometry and the reserved regions.
    ///
    /// Rejects: empty descriptors, descriptors outside the window or across a
    /// page boundary, descriptors touching a reserved region or its page, and
    /// any pair of overlapping descriptors.
    pub fn new(
        geometry: &FlashGeometry,
        descriptors: Vec<AttributeDescriptor>,
        reserved: &[Reserved],
    ) -> core::result::Result<Self, ConfigError> {
        if descriptors.len() > MAX_ATTRIBUTES {
            return Err(ConfigError::TooManyAttributes(descriptors.len()));
        }

        let mut pages = Vec::with_capacity(descriptors.len());
        for (i, desc) in descriptors.iter().enumerate() {
            let id = AttrId(i as u8);
            if desc.is_empty() {
                return Err(ConfigError::EmptyAttribute(id));
            }

            let region = desc.region();
            if !geometry.contains(&region) {
                return Err(ConfigError::AttributeOutOfFlash(id));
            }
            let page = geometry
                .page_of(desc.start)
                .ok_or(ConfigError::AttributeOutOfFlash(id))?;
            if !geometry.page_region(page).contains(&region) {
                return Err(ConfigError::AttributeCrossesPage(id));
            }

            for r in reserved {
                if r.region.overlaps(&region) {
                    return Err(ConfigError::ReservedOverlap { id, region: r.name });
                }
            }
            for r in reserved {
                if geometry.page_of(r.region.start) == Some(page) {
                    return Err(ConfigError::AttributeOnReservedPage { id, region: r.name });
                }
            }

            pages.push(page);
        }

        for (i, a) in descriptors.iter().enumerate() {
            for (j, b) in descriptors.iter().enumerate().skip(i + 1) {
                if a.region().overlaps(&b.region()) {
                    return Err(ConfigError::AttributeOverlap {
                        first: AttrId(i as u8),
                        second: AttrId(j as u8),
                    });
                }
            }
        }

        let mut data_pages = pages.clone();
        data_pages.sort_unstable();
        data_pages.dedup();

        Ok(Self {
            descriptors,
            pages,
            data_pages,
        })
    }

    pub fn lookup(&self, id: AttrId) -> Result<&AttributeDescriptor> {
        self.descriptors
            .get(id.index())
            .ok_or(NvmError::IncorrectId(id))
    }

    /// Page that owns attribute `id`.
    pub fn page_of(&self, id: AttrId) -> Result<PageIndex> {
        self.pages
            .get(id.index())
            .copied()
            .ok_or(NvmError::IncorrectId(id))
    }

    /// Descriptors living on `page`, in id order.
    pub fn on_page(&self, page: PageIndex) -> impl Iterator<Item = &AttributeDescriptor> + '_ {
        self.descriptors
            .iter()
            .zip(self.pages.iter())
            .filter(move |(_, p)| **p == page)
            .map(|(d, _)| d)
    }

    /// Total attribute bytes on `page`.
    pub fn payload_len(&self, page: PageIndex) -> usize {
        self.on_page(page).map(|d| d.len()).sum()
    }

    /// Distinct pages holding at least one attribute, ascending.
    pub fn data_pages(&self) -> &[PageIndex] {
        &self.data_pages
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}
