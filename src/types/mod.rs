// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Identity and addressing types.

pub mod address;
pub mod id;

pub use address::{FlashAddress, FlashGeometry, PageIndex, Region};
pub use id::AttrId;
