// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Shared handle for multi-context callers.
//!
//! `NvmEngine` needs `&mut self` for every operation. When several tasks or
//! threads share one store, wrap it in `SharedNvm`: each call holds a spin
//! lock for the full read-modify-write cycle, so Gets and Sets on the same
//! page are serialized and never observe a half-rewritten page.

use alloc::vec::Vec;

use spin::Mutex;

use crate::engine::NvmEngine;
use crate::error::Result;
use crate::flash::FlashDevice;
use crate::types::AttrId;

pub struct SharedNvm<F: FlashDevice> {
    inner: Mutex<NvmEngine<F>>,
}

impl<F: FlashDevice> SharedNvm<F> {
    pub fn new(engine: NvmEngine<F>) -> Self {
        Self {
            inner: Mutex::new(engine),
        }
    }

    pub fn get_attribute(&self, id: AttrId, out: &mut [u8]) -> Result<u8> {
        self.inner.lock().get_attribute(id, out)
    }

    pub fn read_attribute(&self, id: AttrId) -> Result<Vec<u8>> {
        self.inner.lock().read_attribute(id)
    }

    pub fn set_attribute(&self, id: AttrId, data: &[u8]) -> Result<()> {
        self.inner.lock().set_attribute(id, data)
    }

    /// Runs `f` with the lock held.
    pub fn with_engine<R>(&self, f: impl FnOnce(&mut NvmEngine<F>) -> R) -> R {
        f(&mut self.inner.lock())
    }

    pub fn into_inner(self) -> NvmEngine<F> {
        self.inner.into_inner()
    }
}
