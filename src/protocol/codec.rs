//! Primitive binary helpers shared by the frame codec and the packet model.
//!
//! Everything here is stateless except [`Checksum`], which accumulates
//! a running sum so it can be fed block by block.

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{Error, FrameError, Result};

/// Escape byte used in API escaped mode.
pub const ESCAPE: u8 = 0x7D;

/// Value XORed with an escaped byte.
pub const ESCAPE_XOR: u8 = 0x20;

/// Software flow control: XON.
pub const XON: u8 = 0x11;

/// Software flow control: XOFF.
pub const XOFF: u8 = 0x13;

/// Encodes a `u16` as 2 big-endian bytes.
#[must_use]
pub const fn u16_to_bytes(value: u16) -> [u8; 2] {
    value.to_be_bytes()
}

/// Encodes a `u32` as 4 big-endian bytes.
#[must_use]
pub const fn u32_to_bytes(value: u32) -> [u8; 4] {
    value.to_be_bytes()
}

/// Encodes a `u64` as 8 big-endian bytes.
#[must_use]
pub const fn u64_to_bytes(value: u64) -> [u8; 8] {
    value.to_be_bytes()
}

/// Decodes up to `width` big-endian bytes, zero-padding on the left.
fn be_uint(bytes: &[u8], width: usize) -> Result<u64> {
    if bytes.len() > width {
        return Err(Error::InvalidArgument {
            reason: format!("{} bytes do not fit in {width} bytes", bytes.len()),
        });
    }
    Ok(bytes
        .iter()
        .fold(0u64, |acc, &b| (acc << 8) | u64::from(b)))
}

/// Decodes a big-endian `u16` from at most 2 bytes.
///
/// Shorter input is treated as if zero-padded on the left, so AT command
/// values (which the module trims of leading zeros) decode directly.
pub fn bytes_to_u16(bytes: &[u8]) -> Result<u16> {
    be_uint(bytes, 2).map(|v| v as u16)
}

/// Decodes a big-endian `u32` from at most 4 bytes.
pub fn bytes_to_u32(bytes: &[u8]) -> Result<u32> {
    be_uint(bytes, 4).map(|v| v as u32)
}

/// Decodes a big-endian `u64` from at most 8 bytes.
pub fn bytes_to_u64(bytes: &[u8]) -> Result<u64> {
    be_uint(bytes, 8)
}

/// Encodes an integer with leading zero bytes removed (at least one byte).
///
/// This is how the module expects numeric AT parameters.
#[must_use]
pub fn trimmed_be(value: u64) -> Bytes {
    let bytes = value.to_be_bytes();
    let first = bytes.iter().position(|&b| b != 0).unwrap_or(bytes.len() - 1);
    Bytes::copy_from_slice(&bytes[first..])
}

/// Extracts `len` bits starting at bit `offset` (bit 0 = LSB) of a byte.
#[must_use]
pub const fn bit_field(byte: u8, offset: u8, len: u8) -> u8 {
    bit_field16(byte as u16, offset, len) as u8
}

/// Extracts `len` bits starting at bit `offset` (bit 0 = LSB) of a `u16`.
#[must_use]
pub const fn bit_field16(value: u16, offset: u8, len: u8) -> u16 {
    if len == 0 || offset >= 16 {
        return 0;
    }
    let shifted = value >> offset;
    if len >= 16 {
        shifted
    } else {
        shifted & ((1u16 << len) - 1)
    }
}

/// Writes `len` bits of `field` at bit `offset` (bit 0 = LSB) into a byte.
///
/// Bits of `field` beyond `len` are ignored.
#[must_use]
pub const fn set_bit_field(byte: u8, offset: u8, len: u8, field: u8) -> u8 {
    if len == 0 || offset >= 8 {
        return byte;
    }
    let mask: u8 = if len >= 8 { 0xFF } else { (1u8 << len) - 1 };
    let mask = mask << offset;
    (byte & !mask) | ((field << offset) & mask)
}

/// Reads a string up to the first NUL byte.
///
/// Returns the string and the number of bytes consumed, including the
/// terminator when one was found.
#[must_use]
pub fn terminated_str(data: &[u8]) -> (String, usize) {
    match data.iter().position(|&b| b == 0) {
        Some(end) => (String::from_utf8_lossy(&data[..end]).into_owned(), end + 1),
        None => (String::from_utf8_lossy(data).into_owned(), data.len()),
    }
}

/// Running checksum over API frame bytes.
///
/// The transmitted checksum is `0xFF - (sum & 0xFF)`; a received block is
/// valid when the sum of its bytes plus the checksum ends in `0xFF`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Checksum {
    sum: u8,
}

impl Checksum {
    /// Creates an empty accumulator.
    #[must_use]
    pub const fn new() -> Self {
        Self { sum: 0 }
    }

    /// Adds one byte.
    pub const fn add(&mut self, byte: u8) {
        self.sum = self.sum.wrapping_add(byte);
    }

    /// Adds a block of bytes.
    pub fn add_slice(&mut self, data: &[u8]) {
        self.sum = data.iter().fold(self.sum, |acc, &b| acc.wrapping_add(b));
    }

    /// Returns the checksum byte for the bytes added so far.
    #[must_use]
    pub const fn value(&self) -> u8 {
        0xFF - self.sum
    }

    /// Returns true if `received` is the correct checksum for the bytes added so far.
    #[must_use]
    pub const fn is_valid(&self, received: u8) -> bool {
        self.sum.wrapping_add(received) == 0xFF
    }

    /// Computes the checksum of a block in one go.
    #[must_use]
    pub fn of(data: &[u8]) -> u8 {
        let mut checksum = Self::new();
        checksum.add_slice(data);
        checksum.value()
    }
}

/// Returns true if the byte must be escaped in API escaped mode.
#[must_use]
pub const fn needs_escape(byte: u8) -> bool {
    matches!(byte, super::frame::START_DELIMITER | ESCAPE | XON | XOFF)
}

/// Escapes bytes into `out` (the start delimiter itself is never passed here).
pub fn escape_into(data: &[u8], out: &mut BytesMut) {
    for &b in data {
        if needs_escape(b) {
            out.put_u8(ESCAPE);
            out.put_u8(b ^ ESCAPE_XOR);
        } else {
            out.put_u8(b);
        }
    }
}

/// Escapes a byte sequence.
#[must_use]
pub fn escape(data: &[u8]) -> Bytes {
    let mut out = BytesMut::with_capacity(data.len() * 2);
    escape_into(data, &mut out);
    out.freeze()
}

/// Reverses [`escape`].
///
/// A trailing escape byte with nothing after it is an incomplete frame.
pub fn unescape(data: &[u8]) -> std::result::Result<Bytes, FrameError> {
    let mut out = BytesMut::with_capacity(data.len());
    let mut iter = data.iter();
    while let Some(&b) = iter.next() {
        if b == ESCAPE {
            let Some(&next) = iter.next() else {
                return Err(FrameError::Incomplete {
                    expected: data.len() + 1,
                    got: data.len(),
                });
            };
            out.put_u8(next ^ ESCAPE_XOR);
        } else {
            out.put_u8(b);
        }
    }
    Ok(out.freeze())
}
