//! Persisted address records.
//!
//! # Layout
//! ```text
//! [family:int32]
//!   PF_INET:  [hostname:string][raw:bytes(4)][port:int32]
//!   PF_INET6: [hostname:string][raw:bytes(16)][port:int32][scope_id:int32]
//! ```
//!
//! The serialization framework itself is external; it is reached through
//! [`SerializationWriter`] and [`SerializationReader`]. [`BinaryWriter`] and
//! [`BinaryReader`] are a reference encoding of those primitives.

use thiserror::Error;

use super::{Address, AddressError};
use crate::protocol::Family;

/// Errors while reading a persisted record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// Family code with no record layout. Fatal to the whole read.
    #[error("unsupported address family: {0}")]
    UnsupportedFamily(i32),

    #[error("record truncated: needed {needed} more bytes, {remaining} left")]
    Truncated { needed: usize, remaining: usize },

    #[error("record string is not valid UTF-8")]
    InvalidUtf8,

    #[error("negative length prefix: {0}")]
    NegativeLength(i32),

    /// Block too long for its int32 length prefix.
    #[error("block of {0} bytes exceeds the length prefix range")]
    Oversized(usize),

    #[error("{family} record carries {actual} address bytes, expected {expected}")]
    RawLength {
        family: Family,
        expected: usize,
        actual: usize,
    },

    #[error("port out of range: {0}")]
    PortOutOfRange(i32),

    #[error(transparent)]
    Address(#[from] AddressError),
}

/// Write side of the serialization primitives.
pub trait SerializationWriter {
    fn write_i32(&mut self, value: i32) -> Result<(), CodecError>;
    fn write_str(&mut self, value: &str) -> Result<(), CodecError>;
    fn write_bytes(&mut self, value: &[u8]) -> Result<(), CodecError>;
}

/// Read side of the serialization primitives.
pub trait SerializationReader {
    fn read_i32(&mut self) -> Result<i32, CodecError>;
    fn read_str(&mut self) -> Result<String, CodecError>;
    fn read_bytes(&mut self) -> Result<Vec<u8>, CodecError>;
}

/// Write `address` as one record.
///
/// A hostname too long for its length prefix fails with
/// [`CodecError::Oversized`]; the writer may then hold a partial record.
pub fn serialize_address<W: SerializationWriter + ?Sized>(
    address: &Address,
    writer: &mut W,
) -> Result<(), CodecError> {
    writer.write_i32(address.family().code())?;
    writer.write_str(address.hostname().unwrap_or(""))?;
    writer.write_bytes(address.octets())?;
    writer.write_i32(i32::from(address.port()))?;
    if address.family() == Family::Inet6 {
        // Scope ids are interface indexes; the record keeps the bit pattern.
        writer.write_i32(address.scope_id().unwrap_or(0) as i32)?;
    }
    Ok(())
}

/// Read one record written by [`serialize_address`].
pub fn deserialize_address<R: SerializationReader + ?Sized>(
    reader: &mut R,
) -> Result<Address, CodecError> {
    let code = reader.read_i32()?;
    let family = match Family::try_from(code) {
        Ok(family @ (Family::Inet | Family::Inet6)) => family,
        _ => return Err(CodecError::UnsupportedFamily(code)),
    };

    let hostname = reader.read_str()?;
    let raw = reader.read_bytes()?;
    let expected = if family == Family::Inet { 4 } else { 16 };
    if raw.len() != expected {
        return Err(CodecError::RawLength {
            family,
            expected,
            actual: raw.len(),
        });
    }

    let port = reader.read_i32()?;
    let port = u16::try_from(port).map_err(|_| CodecError::PortOutOfRange(port))?;

    let scope_id = if family == Family::Inet6 {
        Some(reader.read_i32()? as u32)
    } else {
        None
    };

    Ok(Address::from_bytes(family, &raw, port, scope_id)?.with_hostname(hostname))
}

/// Reference encoding: little-endian int32, length-prefixed strings and blocks.
#[derive(Debug, Default, Clone)]
pub struct BinaryWriter {
    buf: Vec<u8>,
}

impl BinaryWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

impl SerializationWriter for BinaryWriter {
    fn write_i32(&mut self, value: i32) -> Result<(), CodecError> {
        self.buf.extend_from_slice(&value.to_le_bytes());
        Ok(())
    }

    fn write_str(&mut self, value: &str) -> Result<(), CodecError> {
        self.write_bytes(value.as_bytes())
    }

    fn write_bytes(&mut self, value: &[u8]) -> Result<(), CodecError> {
        self.write_i32(length_prefix(value.len())?)?;
        self.buf.extend_from_slice(value);
        Ok(())
    }
}

fn length_prefix(len: usize) -> Result<i32, CodecError> {
    i32::try_from(len).map_err(|_| CodecError::Oversized(len))
}

/// Cursor over bytes produced by [`BinaryWriter`].
#[derive(Debug, Clone)]
pub struct BinaryReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> BinaryReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Bytes not yet consumed.
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], CodecError> {
        if self.remaining() < n {
            return Err(CodecError::Truncated {
                needed: n,
                remaining: self.remaining(),
            });
        }
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn read_len(&mut self) -> Result<usize, CodecError> {
        let len = self.read_i32()?;
        usize::try_from(len).map_err(|_| CodecError::NegativeLength(len))
    }
}

impl SerializationReader for BinaryReader<'_> {
    fn read_i32(&mut self) -> Result<i32, CodecError> {
        let bytes = self.take(4)?;
        Ok(i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn read_str(&mut self) -> Result<String, CodecError> {
        let bytes = self.read_bytes()?;
        String::from_utf8(bytes).map_err(|_| CodecError::InvalidUtf8)
    }

    fn read_bytes(&mut self) -> Result<Vec<u8>, CodecError> {
        let len = self.read_len()?;
        Ok(self.take(len)?.to_vec())
    }
}
