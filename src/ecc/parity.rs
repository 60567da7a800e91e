// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Parity record encoding.
//!
//! Record layout: parity bit `i` lives in byte `i / 8`, bit `i % 8`. Bit `P`
//! is a marker and every bit from `P` up is written as zero, so a programmed
//! record never reads back as all-`0xFF`, whatever the parity value.

use crate::flash;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct ParityBits(pub u32);

impl ParityBits {
    pub fn bit(&self, i: u32) -> bool {
        i < 32 && (self.0 >> i) & 1 == 1
    }

    pub fn encode(self, out: &mut [u8]) {
        for (i, byte) in out.iter_mut().enumerate() {
            *byte = self.0.checked_shr(8 * i as u32).unwrap_or(0) as u8;
        }
    }

    pub fn decode(bytes: &[u8]) -> Self {
        let mut value = 0u32;
        for (i, &byte) in bytes.iter().enumerate().take(4) {
            value |= (byte as u32) << (8 * i);
        }
        ParityBits(value)
    }
}

/// A record that was never programmed. The page it belongs to carries no
/// protection yet.
pub fn is_erased_record(bytes: &[u8]) -> bool {
    flash::is_erased(bytes)
}
