// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Identity types.

use core::fmt;

/// Attribute identifier: the position of the descriptor in the block map.
///
/// Reordering the block map table changes which attribute an id refers to.
/// There is no stable name behind an id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
#[repr(transparent)]
pub struct AttrId(pub u8);

impl AttrId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl From<u8> for AttrId {
    fn from(v: u8) -> Self {
        AttrId(v)
    }
}

impl fmt::Display for AttrId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
