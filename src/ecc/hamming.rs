// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Hamming single-error-correcting code over one flash page.
//!
//! Data bits are numbered from 1. Parity bit `i` covers every data bit whose
//! position has bit `i` set: runs of `2^i` covered positions alternating with
//! runs of `2^i` skipped ones, starting at position `2^i`. The parity bits are
//! stored out of band, so every page bit is a data bit.
//!
//! Accuracy limits of a plain SEC code (there is no overall parity bit):
//! - two flips whose positions XOR to a valid position are "corrected" at
//!   that third position, and two equal-syndrome patterns cancel to `Clean`;
//! - a flip inside the stored parity record at bit `i` reads as a data error
//!   at position `2^i`.
//!
//! The decoder reports what the syndrome says. It cannot do better.

use crate::ecc::parity::ParityBits;
use crate::error::EccError;

/// Result of a decode pass that did not fail.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Correction {
    /// Stored and recomputed parity agree.
    Clean,
    /// The data bit at 1-based `position` was flipped back in place.
    Corrected { position: u32 },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HammingCodec {
    data_bits: u32,
    parity_bits: u32,
}

impl HammingCodec {
    /// Codec for pages of `page_size` bytes, using the smallest parity count
    /// `P` with `2^P - 1 >= page_size * 8`.
    pub fn for_page(page_size: u32) -> Self {
        let data_bits = page_size * 8;
        let mut parity_bits = 1;
        while (1u64 << parity_bits) - 1 < data_bits as u64 {
            parity_bits += 1;
        }
        Self {
            data_bits,
            parity_bits,
        }
    }

    pub fn data_bits(&self) -> u32 {
        self.data_bits
    }

    pub fn parity_bits(&self) -> u32 {
        self.parity_bits
    }

    /// Bytes occupied by one stored parity record: the `P` parity bits plus
    /// a marker bit at position `P` that is always written as zero.
    pub fn record_len(&self) -> usize {
        (self.parity_bits + 1).div_ceil(8) as usize
    }

    fn mask(&self) -> u32 {
        u32::MAX >> (32 - self.parity_bits)
    }

    /// Parity over `page`.
    ///
    /// Equivalent to XOR-ing the 1-based positions of all set bits: bit `i` of
    /// the accumulator flips exactly once per set data bit covered by parity
    /// group `i`.
    pub fn calculate_parity(&self, page: &[u8]) -> ParityBits {
        debug_assert_eq!(page.len() as u64 * 8, self.data_bits as u64);

        let mut acc = 0u32;
        for (byte_idx, &byte) in page.iter().enumerate() {
            let mut bits = byte;
            while bits != 0 {
                let bit = bits.trailing_zeros();
                acc ^= (byte_idx as u32) * 8 + bit + 1;
                bits &= bits - 1;
            }
        }
        ParityBits(acc & self.mask())
    }

    /// Verifies `page` against `stored` and repairs a single flipped bit in place.
    ///
    /// Bits of `stored` above `P` are ignored.
    pub fn decode_and_correct(
        &self,
        page: &mut [u8],
        stored: ParityBits,
    ) -> Result<Correction, EccError> {
        let syndrome = (self.calculate_parity(page).0 ^ stored.0) & self.mask();

        if syndrome == 0 {
            return Ok(Correction::Clean);
        }
        if syndrome > self.data_bits {
            return Err(EccError::Uncorrectable { syndrome });
        }

        let bit = syndrome - 1;
        page[(bit / 8) as usize] ^= 1 << (bit % 8);
        Ok(Correction::Corrected { position: syndrome })
    }
}
