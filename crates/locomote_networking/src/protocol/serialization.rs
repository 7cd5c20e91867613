//! # Message Serialization
//!
//! Primitive readers and writers for movement messages.
//!
//! ## Design
//!
//! - Writer uses a pre-allocated MTU-sized buffer (no heap allocations while
//!   encoding)
//! - Little-endian fixed-width fields
//! - LEB128 varints for flags and counts, zigzag for signed values
//! - IEEE half floats for force parameters

use half::f16;
use locomote_shared::MAX_MESSAGE_SIZE;

use super::error::{CodecError, CodecResult};

/// Longest LEB128 encoding of a `u32`.
const MAX_VARINT_BYTES: usize = 5;

/// Message writer - writes fields into a pre-allocated buffer.
///
/// Reuse one writer across messages to avoid allocations.
pub struct MessageWriter {
    buffer: [u8; MAX_MESSAGE_SIZE],
    position: usize,
}

impl MessageWriter {
    /// Creates a new writer with a fresh buffer.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            buffer: [0u8; MAX_MESSAGE_SIZE],
            position: 0,
        }
    }

    /// Resets the writer for reuse.
    #[inline]
    pub fn reset(&mut self) {
        self.position = 0;
    }

    /// Returns the number of bytes written.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.position
    }

    /// Returns true if no bytes have been written.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.position == 0
    }

    /// Returns a slice of the written data.
    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.buffer[..self.position]
    }

    /// Copies the written data out.
    #[must_use]
    pub fn to_vec(&self) -> Vec<u8> {
        self.as_slice().to_vec()
    }

    #[inline]
    fn write_bytes(&mut self, bytes: &[u8]) -> CodecResult<()> {
        let end = self.position + bytes.len();
        if end > MAX_MESSAGE_SIZE {
            return Err(CodecError::BufferFull {
                capacity: MAX_MESSAGE_SIZE,
            });
        }
        self.buffer[self.position..end].copy_from_slice(bytes);
        self.position = end;
        Ok(())
    }

    /// Writes a single byte.
    #[inline]
    pub fn write_u8(&mut self, value: u8) -> CodecResult<()> {
        self.write_bytes(&[value])
    }

    /// Writes an f32 in little-endian format.
    #[inline]
    pub fn write_f32(&mut self, value: f32) -> CodecResult<()> {
        self.write_bytes(&value.to_le_bytes())
    }

    /// Writes an f32 as an IEEE half float.
    #[inline]
    pub fn write_half(&mut self, value: f32) -> CodecResult<()> {
        self.write_bytes(&f16::from_f32(value).to_bits().to_le_bytes())
    }

    /// Writes an unsigned LEB128 varint.
    pub fn write_varint(&mut self, mut value: u32) -> CodecResult<()> {
        let mut scratch = [0u8; MAX_VARINT_BYTES];
        let mut len = 0;
        loop {
            let byte = (value & 0x7F) as u8;
            value >>= 7;
            if value == 0 {
                scratch[len] = byte;
                len += 1;
                break;
            }
            scratch[len] = byte | 0x80;
            len += 1;
        }
        self.write_bytes(&scratch[..len])
    }

    /// Writes a zigzag-encoded signed varint.
    #[inline]
    pub fn write_signed_varint(&mut self, value: i32) -> CodecResult<()> {
        self.write_varint(zigzag_encode(value))
    }
}

impl Default for MessageWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// Message reader - reads fields from a received payload.
pub struct MessageReader<'a> {
    data: &'a [u8],
    position: usize,
}

impl<'a> MessageReader<'a> {
    /// Creates a reader over a payload.
    #[must_use]
    pub const fn new(data: &'a [u8]) -> Self {
        Self { data, position: 0 }
    }

    /// Returns bytes remaining.
    #[inline]
    #[must_use]
    pub const fn remaining(&self) -> usize {
        self.data.len() - self.position
    }

    /// Returns the read position.
    #[inline]
    #[must_use]
    pub const fn position(&self) -> usize {
        self.position
    }

    #[inline]
    fn read_array<const N: usize>(&mut self) -> CodecResult<[u8; N]> {
        let end = self.position + N;
        let bytes = self
            .data
            .get(self.position..end)
            .ok_or(CodecError::UnexpectedEnd {
                position: self.position,
            })?;
        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        self.position = end;
        Ok(out)
    }

    /// Reads a single byte.
    #[inline]
    pub fn read_u8(&mut self) -> CodecResult<u8> {
        let [byte] = self.read_array::<1>()?;
        Ok(byte)
    }

    /// Reads a little-endian f32.
    #[inline]
    pub fn read_f32(&mut self) -> CodecResult<f32> {
        Ok(f32::from_le_bytes(self.read_array()?))
    }

    /// Reads an IEEE half float.
    #[inline]
    pub fn read_half(&mut self) -> CodecResult<f32> {
        Ok(f16::from_bits(u16::from_le_bytes(self.read_array()?)).to_f32())
    }

    /// Reads an unsigned LEB128 varint.
    pub fn read_varint(&mut self) -> CodecResult<u32> {
        let mut value: u32 = 0;
        for i in 0..MAX_VARINT_BYTES {
            let byte = self.read_u8()?;
            let payload = u32::from(byte & 0x7F);
            // fifth byte may only carry the top four bits
            if i == MAX_VARINT_BYTES - 1 && payload > 0x0F {
                return Err(CodecError::VarintOverflow);
            }
            value |= payload << (7 * i);
            if byte & 0x80 == 0 {
                return Ok(value);
            }
        }
        Err(CodecError::VarintOverflow)
    }

    /// Reads a zigzag-encoded signed varint.
    #[inline]
    pub fn read_signed_varint(&mut self) -> CodecResult<i32> {
        Ok(zigzag_decode(self.read_varint()?))
    }
}

/// Maps signed to unsigned so small magnitudes stay short.
#[inline]
#[must_use]
pub const fn zigzag_encode(value: i32) -> u32 {
    ((value << 1) ^ (value >> 31)) as u32
}

/// Inverse of [`zigzag_encode`].
#[inline]
#[must_use]
pub const fn zigzag_decode(value: u32) -> i32 {
    ((value >> 1) as i32) ^ -((value & 1) as i32)
}
