//! Resource table (`resources.arsc`) lookup for string resources.
use std::collections::HashMap;

use super::chunk::{
    ChunkHeader, FormatError, FormatResult, RES_STRING_POOL_TYPE,
    RES_TABLE_PACKAGE_TYPE, RES_TABLE_TYPE, RES_TABLE_TYPE_TYPE, ResValue,
    StringPool, TYPE_REFERENCE, TYPE_STRING, chunks, read_u8, read_u16,
    read_u32,
};

const FLAG_SPARSE: u8 = 0x01;
const FLAG_OFFSET16: u8 = 0x02;
const ENTRY_FLAG_COMPLEX: u16 = 0x0001;
const ENTRY_FLAG_COMPACT: u16 = 0x0008;
const NO_ENTRY: u32 = 0xffff_ffff;
const NO_ENTRY16: u16 = 0xffff;
/// Reference chains longer than this are treated as cycles.
const MAX_REFERENCE_DEPTH: usize = 8;

#[derive(Debug, Clone, Copy)]
struct Candidate {
    default_config: bool,
    value: ResValue,
}

/// Simple (non-bag) values of a resource table, keyed by resource id.
#[derive(Debug, Default)]
pub struct ResourceTable {
    strings: StringPool,
    values: HashMap<u32, Vec<Candidate>>,
}

impl ResourceTable {
    pub fn parse(data: &[u8]) -> FormatResult<Self> {
        let header = ChunkHeader::expect(data, 0, RES_TABLE_TYPE)?;
        let mut table = Self::default();

        for chunk in chunks(data, header.header_size, header.size) {
            let (offset, chunk) = chunk?;
            match chunk.kind {
                RES_STRING_POOL_TYPE => {
                    table.strings = StringPool::parse(data, offset)?;
                }
                RES_TABLE_PACKAGE_TYPE => {
                    table.parse_package(data, offset, chunk)?;
                }
                _ => {}
            }
        }

        Ok(table)
    }

    fn parse_package(
        &mut self,
        data: &[u8],
        offset: usize,
        chunk: ChunkHeader,
    ) -> FormatResult<()> {
        let package_id = read_u32(data, offset + 8)?;
        let start = offset + chunk.header_size;
        let end = offset + chunk.size;

        for inner in chunks(data, start, end) {
            let (inner_offset, inner) = inner?;
            if inner.kind == RES_TABLE_TYPE_TYPE {
                self.parse_type(data, inner_offset, inner, package_id)?;
            }
        }

        Ok(())
    }

    fn parse_type(
        &mut self,
        data: &[u8],
        offset: usize,
        chunk: ChunkHeader,
        package_id: u32,
    ) -> FormatResult<()> {
        let type_id = read_u8(data, offset + 8)? as u32;
        let flags = read_u8(data, offset + 9)?;
        let entry_count = read_u32(data, offset + 12)? as usize;
        let entries_start = offset + read_u32(data, offset + 16)? as usize;

        // ResTable_config: size, imsi, then language and country
        let config = offset + 20;
        let default_config =
            read_u16(data, config + 8)? == 0 && read_u16(data, config + 10)? == 0;

        let index_start = offset + chunk.header_size;

        for i in 0..entry_count {
            let slot = if flags & FLAG_SPARSE != 0 {
                let at = index_start + i * 4;
                let index = read_u16(data, at)? as u32;
                let entry_offset = read_u16(data, at + 2)? as usize * 4;
                Some((index, entry_offset))
            } else if flags & FLAG_OFFSET16 != 0 {
                let entry_offset = read_u16(data, index_start + i * 2)?;
                (entry_offset != NO_ENTRY16)
                    .then_some((i as u32, entry_offset as usize * 4))
            } else {
                let entry_offset = read_u32(data, index_start + i * 4)?;
                (entry_offset != NO_ENTRY)
                    .then_some((i as u32, entry_offset as usize))
            };

            let Some((index, entry_offset)) = slot else {
                continue;
            };

            if let Some(value) = read_entry(data, entries_start + entry_offset)? {
                let id = (package_id << 24) | (type_id << 16) | index;
                self.values.entry(id).or_default().push(Candidate {
                    default_config,
                    value,
                });
            }
        }

        Ok(())
    }

    /// Resolve `id` to a string, following references and preferring the
    /// default configuration. Returns `None` for non-string resources.
    pub fn resolve_string(&self, id: u32) -> FormatResult<Option<String>> {
        let mut id = id;

        for _ in 0..MAX_REFERENCE_DEPTH {
            let Some(candidates) = self.values.get(&id) else {
                return Ok(None);
            };

            let candidate = candidates
                .iter()
                .find(|c| c.default_config)
                .or_else(|| candidates.first())
                .ok_or(FormatError::Missing("resource value"))?;

            match candidate.value.data_type {
                TYPE_STRING => {
                    return Ok(Some(
                        self.strings.get(candidate.value.data)?.to_string(),
                    ));
                }
                TYPE_REFERENCE => id = candidate.value.data,
                _ => return Ok(None),
            }
        }

        Ok(None)
    }
}

/// Read the value of the entry at `offset`; bag entries yield `None`.
fn read_entry(data: &[u8], offset: usize) -> FormatResult<Option<ResValue>> {
    let size = read_u16(data, offset)? as usize;
    let flags = read_u16(data, offset + 2)?;

    if flags & ENTRY_FLAG_COMPACT != 0 {
        // compact entries keep the data type in the high byte of the flags
        return Ok(Some(ResValue {
            data_type: (flags >> 8) as u8,
            data: read_u32(data, offset + 4)?,
        }));
    }

    if flags & ENTRY_FLAG_COMPLEX != 0 {
        return Ok(None);
    }

    Ok(Some(ResValue::read(data, offset + size)?))
}
