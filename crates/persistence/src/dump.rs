// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Hex dump text format for flash images.
//!
//! One line per 16 bytes: the flash address of the first byte, then the
//! bytes, all `0x`-prefixed and space separated:
//!
//! ```text
//! 0x80000 0xFF 0xFF 0xFF 0xFF 0xFF 0xFF 0xFF 0xFF 0xFF 0xFF 0xFF 0xFF 0xFF 0xFF 0xFF 0xFF
//! ```
//!
//! Lines may appear in any order and may hold fewer than 16 bytes. Bytes that
//! no line mentions load as erased.

use std::io::{self, BufRead, Write};

use gpnvm::flash::ERASED;
use gpnvm::{FlashAddress, FlashGeometry};

use crate::error::{PersistenceError, Result};

pub const BYTES_PER_LINE: usize = 16;

pub fn write_dump<W: Write>(mut out: W, geometry: &FlashGeometry, image: &[u8]) -> io::Result<()> {
    for (i, chunk) in image.chunks(BYTES_PER_LINE).enumerate() {
        write!(out, "0x{:04x} ", geometry.base().0 as usize + i * BYTES_PER_LINE)?;
        for byte in chunk {
            write!(out, "0x{:02X} ", byte)?;
        }
        writeln!(out)?;
    }
    Ok(())
}

pub fn parse_dump<R: BufRead>(input: R, geometry: &FlashGeometry) -> Result<Vec<u8>> {
    let mut image = vec![ERASED; geometry.size() as usize];

    for (idx, line) in input.lines().enumerate() {
        let line = line?;
        let line_no = idx + 1;
        let mut fields = line.split_whitespace();
        let Some(addr_field) = fields.next() else {
            continue;
        };

        let addr = parse_hex(addr_field)
            .and_then(|v| u32::try_from(v).ok())
            .ok_or_else(|| invalid(line_no, format!("bad address {:?}", addr_field)))?;

        let mut bytes = Vec::with_capacity(BYTES_PER_LINE);
        for field in fields {
            let byte = parse_hex(field)
                .and_then(|v| u8::try_from(v).ok())
                .ok_or_else(|| invalid(line_no, format!("bad byte {:?}", field)))?;
            bytes.push(byte);
        }
        if bytes.len() > BYTES_PER_LINE {
            return Err(invalid(line_no, format!("{} bytes on one line", bytes.len())));
        }

        let span = geometry
            .span(FlashAddress(addr), bytes.len())
            .map_err(|e| invalid(line_no, e.to_string()))?;
        image[span].copy_from_slice(&bytes);
    }

    Ok(image)
}

fn parse_hex(field: &str) -> Option<u64> {
    let digits = field
        .strip_prefix("0x")
        .or_else(|| field.strip_prefix("0X"))?;
    u64::from_str_radix(digits, 16).ok()
}

fn invalid(line: usize, reason: String) -> PersistenceError {
    PersistenceError::InvalidFormat { line, reason }
}
