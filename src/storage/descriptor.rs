// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Attribute descriptor definition.

use crate::types::{FlashAddress, Region};

/// The flash byte range backing one attribute.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AttributeDescriptor {
    pub start: FlashAddress,
    pub length: u8,
}

impl AttributeDescriptor {
    pub const fn new(start: u32, length: u8) -> Self {
        Self {
            start: FlashAddress(start),
            length,
        }
    }

    pub fn len(&self) -> usize {
        self.length as usize
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    pub fn region(&self) -> Region {
        Region {
            start: self.start,
            len: self.length as u32,
        }
    }
}
