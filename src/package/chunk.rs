//! Primitives for the resource table format.
//!
//! A table is a sequence of little-endian chunks. Every chunk starts with a
//! type, a header size and a total size.
use thiserror::Error;

pub const RES_STRING_POOL_TYPE: u16 = 0x0001;
pub const RES_TABLE_TYPE: u16 = 0x0002;
pub const RES_TABLE_PACKAGE_TYPE: u16 = 0x0200;
pub const RES_TABLE_TYPE_TYPE: u16 = 0x0201;

pub const TYPE_REFERENCE: u8 = 0x01;
pub const TYPE_STRING: u8 = 0x03;

/// Marks a string pool as UTF-8 encoded rather than UTF-16.
const UTF8_FLAG: u32 = 1 << 8;
const CHUNK_HEADER_SIZE: usize = 8;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FormatError {
    #[error("unexpected end of data at offset {0}")]
    Truncated(usize),

    #[error(
        "expected chunk type {expected:#06x} at offset {offset} but found {found:#06x}"
    )]
    UnexpectedChunk {
        offset: usize,
        expected: u16,
        found: u16,
    },

    #[error("invalid chunk size {size} at offset {offset}")]
    InvalidChunkSize { offset: usize, size: u32 },

    #[error("string index {0} out of range")]
    StringIndex(u32),

    #[error("missing {0}")]
    Missing(&'static str),
}

pub type FormatResult<T> = std::result::Result<T, FormatError>;

fn bytes(data: &[u8], offset: usize, len: usize) -> FormatResult<&[u8]> {
    offset
        .checked_add(len)
        .and_then(|end| data.get(offset..end))
        .ok_or(FormatError::Truncated(offset))
}

pub fn read_u8(data: &[u8], offset: usize) -> FormatResult<u8> {
    Ok(bytes(data, offset, 1)?[0])
}

pub fn read_u16(data: &[u8], offset: usize) -> FormatResult<u16> {
    let b = bytes(data, offset, 2)?;
    Ok(u16::from_le_bytes([b[0], b[1]]))
}

pub fn read_u32(data: &[u8], offset: usize) -> FormatResult<u32> {
    let b = bytes(data, offset, 4)?;
    Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkHeader {
    pub kind: u16,
    pub header_size: usize,
    pub size: usize,
}

impl ChunkHeader {
    /// Read the chunk header at `offset`, rejecting sizes that cannot hold
    /// the header or that run past the end of `data`.
    pub fn read(data: &[u8], offset: usize) -> FormatResult<Self> {
        let kind = read_u16(data, offset)?;
        let header_size = read_u16(data, offset + 2)? as usize;
        let size = read_u32(data, offset + 4)?;

        if (size as usize) < CHUNK_HEADER_SIZE
            || header_size < CHUNK_HEADER_SIZE
            || header_size > size as usize
            || offset + size as usize > data.len()
        {
            return Err(FormatError::InvalidChunkSize { offset, size });
        }

        Ok(Self {
            kind,
            header_size,
            size: size as usize,
        })
    }

    /// Read the chunk header at `offset` and require it to be `expected`.
    pub fn expect(
        data: &[u8],
        offset: usize,
        expected: u16,
    ) -> FormatResult<Self> {
        let header = Self::read(data, offset)?;
        if header.kind != expected {
            return Err(FormatError::UnexpectedChunk {
                offset,
                expected,
                found: header.kind,
            });
        }
        Ok(header)
    }
}

/// Iterate over the chunks laid out back to back in `start..end`.
pub fn chunks(
    data: &[u8],
    start: usize,
    end: usize,
) -> impl Iterator<Item = FormatResult<(usize, ChunkHeader)>> + '_ {
    let mut offset = start;
    let mut failed = false;

    std::iter::from_fn(move || {
        if failed || offset + CHUNK_HEADER_SIZE > end {
            return None;
        }

        match ChunkHeader::read(data, offset) {
            Ok(header) => {
                let current = offset;
                offset += header.size;
                Some(Ok((current, header)))
            }
            Err(err) => {
                failed = true;
                Some(Err(err))
            }
        }
    })
}

/// A typed value (`Res_value`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResValue {
    pub data_type: u8,
    pub data: u32,
}

impl ResValue {
    pub fn read(data: &[u8], offset: usize) -> FormatResult<Self> {
        Ok(Self {
            data_type: read_u8(data, offset + 3)?,
            data: read_u32(data, offset + 4)?,
        })
    }
}

/// Decoded strings of a string pool chunk.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct StringPool {
    strings: Vec<String>,
}

impl StringPool {
    pub fn parse(data: &[u8], offset: usize) -> FormatResult<Self> {
        let header = ChunkHeader::expect(data, offset, RES_STRING_POOL_TYPE)?;
        let count = read_u32(data, offset + 8)? as usize;
        let flags = read_u32(data, offset + 16)?;
        let strings_start = offset + read_u32(data, offset + 20)? as usize;
        let utf8 = flags & UTF8_FLAG != 0;

        let index_start = offset + header.header_size;
        let mut strings = vec![];

        for i in 0..count {
            let position =
                strings_start + read_u32(data, index_start + i * 4)? as usize;
            let string = if utf8 {
                decode_utf8(data, position)?
            } else {
                decode_utf16(data, position)?
            };
            strings.push(string);
        }

        Ok(Self { strings })
    }

    pub fn get(&self, index: u32) -> FormatResult<&str> {
        self.strings
            .get(index as usize)
            .map(String::as_str)
            .ok_or(FormatError::StringIndex(index))
    }

    #[allow(unused)]
    pub fn len(&self) -> usize {
        self.strings.len()
    }
}

fn decode_utf8(data: &[u8], offset: usize) -> FormatResult<String> {
    // character count, then byte count, each one or two bytes long
    let mut position = offset;
    if read_u8(data, position)? & 0x80 != 0 {
        position += 2;
    } else {
        position += 1;
    }

    let first = read_u8(data, position)? as usize;
    let len = if first & 0x80 != 0 {
        let second = read_u8(data, position + 1)? as usize;
        position += 2;
        ((first & 0x7f) << 8) | second
    } else {
        position += 1;
        first
    };

    Ok(String::from_utf8_lossy(bytes(data, position, len)?).into_owned())
}

fn decode_utf16(data: &[u8], offset: usize) -> FormatResult<String> {
    let first = read_u16(data, offset)? as usize;
    let (len, position) = if first & 0x8000 != 0 {
        let second = read_u16(data, offset + 2)? as usize;
        ((((first & 0x7fff) << 16) | second), offset + 4)
    } else {
        (first, offset + 2)
    };

    let units = bytes(data, position, len * 2)?
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect::<Vec<u16>>();

    Ok(String::from_utf16_lossy(&units))
}
