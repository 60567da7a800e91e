// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Configuration surface.
//!
//! `NvmConfig` is plain data (optionally deserialized from a file by the host).
//! `NvmConfig::validate` turns it into a `Layout`, the only form the engine
//! accepts, so an invalid table is rejected before the first Get/Set.

use alloc::vec;
use alloc::vec::Vec;

use crate::ecc::EccLayout;
use crate::error::ConfigError;
use crate::shadow::{ShadowPage, HEADER_LEN};
use crate::storage::{AttributeDescriptor, BlockMap, Reserved};
use crate::types::{FlashAddress, FlashGeometry, Region};

/// Reference part: 8 KiB of flash mapped at `0x80000`, 2 KiB pages.
pub const FLASH_START: u32 = 0x8_0000;
pub const FLASH_SIZE: u32 = 0x2000;
pub const PAGE_SIZE: u32 = 0x800;

/// The last 0x100 bytes of flash hold the parity records.
pub const ECC_REGION_LEN: u32 = 0x100;

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NvmConfig {
    pub geometry: FlashGeometry,
    /// Attribute table. Position in this list is the attribute id.
    pub blocks: Vec<AttributeDescriptor>,
    /// Parity record region. `None` disables ECC.
    pub ecc: Option<Region>,
    /// Page used for pre-erase backups. `None` leaves page rewrites
    /// unprotected against power loss.
    pub shadow_page: Option<FlashAddress>,
}

impl Default for NvmConfig {
    fn default() -> Self {
        Self {
            geometry: FlashGeometry::new(FLASH_START, FLASH_SIZE, PAGE_SIZE),
            blocks: vec![
                AttributeDescriptor::new(0x8_0000, 0xA0),
                AttributeDescriptor::new(0x8_0100, 0xFF),
                AttributeDescriptor::new(0x8_0800, 0x80),
            ],
            ecc: Some(Region::new(FLASH_START + FLASH_SIZE - ECC_REGION_LEN, ECC_REGION_LEN)),
            shadow_page: Some(FlashAddress(FLASH_START + 2 * PAGE_SIZE)),
        }
    }
}

/// A configuration that passed every check.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Layout {
    pub geometry: FlashGeometry,
    pub map: BlockMap,
    pub ecc: Option<EccLayout>,
    pub shadow: Option<ShadowPage>,
}

impl NvmConfig {
    pub fn without_ecc(mut self) -> Self {
        self.ecc = None;
        self
    }

    pub fn without_shadow(mut self) -> Self {
        self.shadow_page = None;
        self
    }

    pub fn validate(&self) -> Result<Layout, ConfigError> {
        let geometry = self.geometry;
        geometry.validate()?;

        let ecc = self
            .ecc
            .map(|region| EccLayout::new(&geometry, region))
            .transpose()?;
        let shadow = self
            .shadow_page
            .map(|addr| ShadowPage::new(&geometry, addr))
            .transpose()?;

        if let (Some(ecc), Some(shadow)) = (&ecc, &shadow) {
            if ecc.host_page() == shadow.page() {
                return Err(ConfigError::InvalidShadowPage(
                    "shadow page also hosts the ECC region",
                ));
            }
        }

        let mut reserved = Vec::new();
        if let Some(ecc) = &ecc {
            reserved.push(Reserved {
                name: "ECC region",
                region: ecc.region(),
            });
        }
        if let Some(shadow) = &shadow {
            reserved.push(Reserved {
                name: "shadow page",
                region: shadow.region(),
            });
        }

        let map = BlockMap::new(&geometry, self.blocks.clone(), &reserved)?;

        if let Some(shadow) = &shadow {
            for &page in map.data_pages() {
                let needed = HEADER_LEN + map.payload_len(page);
                if needed > shadow.region().len as usize {
                    return Err(ConfigError::ShadowTooSmall {
                        page,
                        needed,
                        available: shadow.region().len as usize,
                    });
                }
            }
        }

        Ok(Layout {
            geometry,
            map,
            ecc,
            shadow,
        })
    }
}
