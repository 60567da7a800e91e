// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Attribute descriptors and the validated block map.

pub mod block_map;
pub mod descriptor;

pub use block_map::{BlockMap, Reserved};
pub use descriptor::AttributeDescriptor;
