// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Error types and the status codes they map to.

use thiserror::Error;

use crate::types::{AttrId, FlashAddress, FlashGeometry, PageIndex};

/// Numeric result code shared by the engine and the flash contract.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Status {
    Ok = 0,
    PageNotErased = 1,
    ParamErr = 2,
    OutOfBounds = 3,
    IncorrectId = 4,
    UncorrectableEcc = 5,
}

impl Status {
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(Status::Ok),
            1 => Some(Status::PageNotErased),
            2 => Some(Status::ParamErr),
            3 => Some(Status::OutOfBounds),
            4 => Some(Status::IncorrectId),
            5 => Some(Status::UncorrectableEcc),
            _ => None,
        }
    }

    /// Status code of any engine call result.
    pub fn of<T>(result: &Result<T>) -> Status {
        match result {
            Ok(_) => Status::Ok,
            Err(e) => e.status(),
        }
    }
}

/// Precondition failures reported by a `FlashDevice`.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlashError {
    #[error("Region at {addr} is not erased")]
    PageNotErased { addr: FlashAddress },

    #[error("Invalid flash argument: {0}")]
    ParamErr(&'static str),

    #[error("{len} bytes at {addr} escape the flash window")]
    OutOfBounds { addr: FlashAddress, len: usize },
}

impl FlashError {
    pub fn status(&self) -> Status {
        match self {
            FlashError::PageNotErased { .. } => Status::PageNotErased,
            FlashError::ParamErr(_) => Status::ParamErr,
            FlashError::OutOfBounds { .. } => Status::OutOfBounds,
        }
    }
}

/// Decoder outcome that does not name a single data bit.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum EccError {
    #[error("Syndrome {syndrome} does not name a data bit")]
    Uncorrectable { syndrome: u32 },
}

/// A configuration that must be rejected before the engine serves any call.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid flash geometry: {0}")]
    InvalidGeometry(&'static str),

    #[error("Device geometry {found} does not match configured {expected}")]
    GeometryMismatch {
        expected: FlashGeometry,
        found: FlashGeometry,
    },

    #[error("Block map holds {0} attributes, ids are limited to 256")]
    TooManyAttributes(usize),

    #[error("Attribute {0} has zero length")]
    EmptyAttribute(AttrId),

    #[error("Attribute {0} lies outside the flash window")]
    AttributeOutOfFlash(AttrId),

    #[error("Attribute {0} crosses a page boundary")]
    AttributeCrossesPage(AttrId),

    #[error("Attributes {first} and {second} overlap")]
    AttributeOverlap { first: AttrId, second: AttrId },

    #[error("Attribute {id} overlaps the {region}")]
    ReservedOverlap { id: AttrId, region: &'static str },

    #[error("Attribute {id} sits on the page reserved for the {region}")]
    AttributeOnReservedPage { id: AttrId, region: &'static str },

    #[error("Invalid ECC region: {0}")]
    InvalidEccRegion(&'static str),

    #[error("ECC region holds {available} bytes, {needed} are required")]
    EccRegionTooSmall { needed: u32, available: u32 },

    #[error("Invalid shadow page: {0}")]
    InvalidShadowPage(&'static str),

    #[error("Shadow record for page {page} needs {needed} bytes, the shadow page holds {available}")]
    ShadowTooSmall {
        page: PageIndex,
        needed: usize,
        available: usize,
    },
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum NvmError {
    #[error("Invalid parameter: {0}")]
    ParamErr(&'static str),

    #[error("Attribute id {0} is not in the block map")]
    IncorrectId(AttrId),

    #[error("Uncorrectable ECC error on page {page} (syndrome {syndrome})")]
    UncorrectableEcc { page: PageIndex, syndrome: u32 },

    #[error("Flash error: {0}")]
    Flash(#[from] FlashError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl NvmError {
    pub fn status(&self) -> Status {
        match self {
            NvmError::ParamErr(_) => Status::ParamErr,
            NvmError::IncorrectId(_) => Status::IncorrectId,
            NvmError::UncorrectableEcc { .. } => Status::UncorrectableEcc,
            NvmError::Flash(e) => e.status(),
            NvmError::Config(_) => Status::ParamErr,
        }
    }
}

pub type Result<T> = core::result::Result<T, NvmError>;
