// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use crate::ecc::{is_erased_record, Correction, HammingCodec, ParityBits};
use crate::error::EccError;
use std::vec;

#[test]
fn test_codec_sizing() {
    let codec = HammingCodec::for_page(0x800);
    assert_eq!(codec.data_bits(), 16384);
    assert_eq!(codec.parity_bits(), 15);
    assert_eq!(codec.record_len(), 2);

    // 8 data bits: 2^3 - 1 = 7 is one short
    let tiny = HammingCodec::for_page(1);
    assert_eq!(tiny.parity_bits(), 4);
    assert_eq!(tiny.record_len(), 1);

    let small = HammingCodec::for_page(16);
    assert_eq!(small.parity_bits(), 8);
    assert_eq!(small.record_len(), 2);

    // 4 KiB pages: 16 parity bits and the marker need a third byte
    let large = HammingCodec::for_page(0x1000);
    assert_eq!(large.parity_bits(), 16);
    assert_eq!(large.record_len(), 3);
}

#[test]
fn test_parity_is_position_xor() {
    let codec = HammingCodec::for_page(0x800);
    let mut page = vec![0u8; 0x800];
    assert_eq!(codec.calculate_parity(&page), ParityBits(0));

    page[0] = 0b0000_0001; // position 1
    assert_eq!(codec.calculate_parity(&page), ParityBits(1));

    page[0x10A] = 0b0000_0001; // position 0x10A * 8 + 1 = 2129
    assert_eq!(codec.calculate_parity(&page), ParityBits(1 ^ 2129));

    page[0x7FF] = 0b1000_0000; // position 16384
    assert_eq!(codec.calculate_parity(&page), ParityBits(1 ^ 2129 ^ 16384));
}

#[test]
fn test_parity_group_coverage() {
    // Parity bit 1 covers positions 2,3 then skips 4,5 then covers 6,7
    let codec = HammingCodec::for_page(1);
    for position in 1..=8u32 {
        let page = [1u8 << (position - 1)];
        let parity = codec.calculate_parity(&page);
        assert_eq!(parity.bit(1), position & 0b10 != 0, "position {}", position);
        assert_eq!(parity.bit(3), position == 8, "position {}", position);
    }
}

#[test]
fn test_parity_matches_run_length_coverage_on_full_page() {
    let codec = HammingCodec::for_page(0x800);
    let mut seed = 0x2545_F491u32;
    let page: std::vec::Vec<u8> = (0..0x800)
        .map(|_| {
            seed ^= seed << 13;
            seed ^= seed >> 17;
            seed ^= seed << 5;
            seed as u8
        })
        .collect();
    let parity = codec.calculate_parity(&page);
    let data_bit = |idx: u32| (page[(idx / 8) as usize] >> (idx % 8)) & 1 == 1;

    for i in 0..codec.parity_bits() {
        // Skip 2^i - 1 bits, then alternate covered and skipped runs of 2^i
        let group = 1u32 << i;
        let mut expected = false;
        for idx in (group - 1)..codec.data_bits() {
            if ((idx - (group - 1)) / group) % 2 == 0 && data_bit(idx) {
                expected = !expected;
            }
        }
        assert_eq!(parity.bit(i), expected, "parity bit {}", i);
    }
}

#[test]
fn test_corrects_every_single_bit_flip() {
    let codec = HammingCodec::for_page(16);
    let original: std::vec::Vec<u8> = (0..16u8).map(|i| i.wrapping_mul(37) ^ 0x5A).collect();
    let stored = codec.calculate_parity(&original);

    for bit in 0..128u32 {
        let mut page = original.clone();
        page[(bit / 8) as usize] ^= 1 << (bit % 8);

        let result = codec.decode_and_correct(&mut page, stored);
        assert_eq!(result, Ok(Correction::Corrected { position: bit + 1 }));
        assert_eq!(page, original, "bit {} not restored", bit);
    }
}

#[test]
fn test_clean_page_untouched() {
    let codec = HammingCodec::for_page(16);
    let mut page = [0xA5u8; 16];
    let stored = codec.calculate_parity(&page);
    assert_eq!(codec.decode_and_correct(&mut page, stored), Ok(Correction::Clean));
    assert_eq!(page, [0xA5u8; 16]);
}

#[test]
fn test_out_of_range_syndrome_is_uncorrectable() {
    let codec = HammingCodec::for_page(16);
    let original = [0u8; 16];
    let stored = codec.calculate_parity(&original);

    // Positions 1 and 128 give syndrome 129, past the last data bit
    let mut page = original;
    page[0] ^= 0b0000_0001;
    page[15] ^= 0b1000_0000;

    let result = codec.decode_and_correct(&mut page, stored);
    assert_eq!(result, Err(EccError::Uncorrectable { syndrome: 129 }));
    // Left as read
    assert_eq!(page[0], 0b0000_0001);
    assert_eq!(page[15], 0b1000_0000);
}

#[test]
fn test_double_flip_miscorrects() {
    // A plain SEC code cannot see two flips: positions 1 and 2 alias position 3
    let codec = HammingCodec::for_page(16);
    let original = [0u8; 16];
    let stored = codec.calculate_parity(&original);

    let mut page = original;
    page[0] = 0b0000_0011;
    assert_eq!(
        codec.decode_and_correct(&mut page, stored),
        Ok(Correction::Corrected { position: 3 })
    );
    assert_eq!(page[0], 0b0000_0111);
}

#[test]
fn test_flipped_parity_bit_miscorrects_data() {
    // Bit 3 of the stored record reads as a data error at position 8
    let codec = HammingCodec::for_page(16);
    let original = [0x3Cu8; 16];
    let stored = ParityBits(codec.calculate_parity(&original).0 ^ (1 << 3));

    let mut page = original;
    assert_eq!(
        codec.decode_and_correct(&mut page, stored),
        Ok(Correction::Corrected { position: 8 })
    );
    assert_eq!(page[0], original[0] ^ 0b1000_0000);
    assert_eq!(page[1..], original[1..]);
}

#[test]
fn test_parity_record_encoding() {
    let mut record = [0u8; 2];
    ParityBits(0x1234).encode(&mut record);
    assert_eq!(record, [0x34, 0x12]);
    assert_eq!(ParityBits::decode(&record), ParityBits(0x1234));

    // 15-bit parity never fills the padding bit
    ParityBits(0x7FFF).encode(&mut record);
    assert_eq!(record, [0xFF, 0x7F]);
    assert!(!is_erased_record(&record));
    assert!(is_erased_record(&[0xFF, 0xFF]));

    // All-ones 16-bit parity keeps the marker byte clear
    let mut wide = [0u8; 3];
    ParityBits(0xFFFF).encode(&mut wide);
    assert_eq!(wide, [0xFF, 0xFF, 0x00]);
    assert!(!is_erased_record(&wide));
    assert_eq!(ParityBits::decode(&wide), ParityBits(0xFFFF));
}
