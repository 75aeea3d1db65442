//! Numeric element views of a raw address.
//!
//! Elements are packed big-endian, so `2001:db8::1` as uint16 elements is
//! `[0x2001, 0x0db8, 0, 0, 0, 0, 0, 1]`.

use std::fmt;

use super::{Address, AddressError};
use crate::protocol::Family;

/// Element width of an address buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementWidth {
    U8,
    U16,
    U32,
    U64,
}

impl ElementWidth {
    pub const fn bytes(self) -> usize {
        match self {
            ElementWidth::U8 => 1,
            ElementWidth::U16 => 2,
            ElementWidth::U32 => 4,
            ElementWidth::U64 => 8,
        }
    }

    /// Width from a bit count (8, 16, 32 or 64).
    pub fn from_bits(bits: u32) -> Option<Self> {
        match bits {
            8 => Some(ElementWidth::U8),
            16 => Some(ElementWidth::U16),
            32 => Some(ElementWidth::U32),
            64 => Some(ElementWidth::U64),
            _ => None,
        }
    }
}

impl fmt::Display for ElementWidth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "uint{}", self.bytes() * 8)
    }
}

/// A raw address as an array of unsigned elements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddressBuffer {
    U8(Vec<u8>),
    U16(Vec<u16>),
    U32(Vec<u32>),
    U64(Vec<u64>),
}

impl AddressBuffer {
    pub fn width(&self) -> ElementWidth {
        match self {
            AddressBuffer::U8(_) => ElementWidth::U8,
            AddressBuffer::U16(_) => ElementWidth::U16,
            AddressBuffer::U32(_) => ElementWidth::U32,
            AddressBuffer::U64(_) => ElementWidth::U64,
        }
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        match self {
            AddressBuffer::U8(v) => v.len(),
            AddressBuffer::U16(v) => v.len(),
            AddressBuffer::U32(v) => v.len(),
            AddressBuffer::U64(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn pack(octets: &[u8], width: ElementWidth) -> Self {
        match width {
            ElementWidth::U8 => AddressBuffer::U8(octets.to_vec()),
            ElementWidth::U16 => AddressBuffer::U16(
                octets
                    .chunks_exact(2)
                    .map(|c| u16::from_be_bytes([c[0], c[1]]))
                    .collect(),
            ),
            ElementWidth::U32 => AddressBuffer::U32(
                octets
                    .chunks_exact(4)
                    .map(|c| u32::from_be_bytes([c[0], c[1], c[2], c[3]]))
                    .collect(),
            ),
            ElementWidth::U64 => AddressBuffer::U64(
                octets
                    .chunks_exact(8)
                    .map(|c| {
                        let mut word = [0u8; 8];
                        word.copy_from_slice(c);
                        u64::from_be_bytes(word)
                    })
                    .collect(),
            ),
        }
    }

    fn unpack(&self) -> Vec<u8> {
        match self {
            AddressBuffer::U8(v) => v.clone(),
            AddressBuffer::U16(v) => v.iter().flat_map(|e| e.to_be_bytes()).collect(),
            AddressBuffer::U32(v) => v.iter().flat_map(|e| e.to_be_bytes()).collect(),
            AddressBuffer::U64(v) => v.iter().flat_map(|e| e.to_be_bytes()).collect(),
        }
    }
}

fn check_width(family: Family, octets: usize, width: ElementWidth) -> Result<usize, AddressError> {
    if octets % width.bytes() != 0 {
        return Err(AddressError::Width { family, width });
    }
    Ok(octets / width.bytes())
}

impl Address {
    /// Re-pack the raw address into elements of `width`.
    ///
    /// PF_INET yields 4/2/1 elements of 8/16/32 bits; PF_INET6 yields
    /// 16/8/4/2 elements of 8/16/32/64 bits.
    pub fn to_buffer(&self, width: ElementWidth) -> Result<AddressBuffer, AddressError> {
        check_width(self.family(), self.octets().len(), width)?;
        Ok(AddressBuffer::pack(self.octets(), width))
    }

    /// Inverse of [`Address::to_buffer`].
    pub fn from_buffer(
        family: Family,
        buffer: &AddressBuffer,
        port: u16,
        scope_id: Option<u32>,
    ) -> Result<Self, AddressError> {
        let layout = super::layout(family).ok_or(AddressError::UnsupportedFamily(family))?;
        let width = buffer.width();
        let expected = check_width(family, layout.octets, width)?;
        if buffer.len() != expected {
            return Err(AddressError::Length {
                family,
                width,
                expected,
                actual: buffer.len(),
            });
        }
        Self::from_bytes(family, &buffer.unpack(), port, scope_id)
    }
}
