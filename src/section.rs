/*
 * Copyright (c) 2026 Jonathan Perkin <jonathan@perkin.org.uk>
 *
 * Permission to use, copy, modify, and distribute this software for any
 * purpose with or without fee is hereby granted, provided that the above
 * copyright notice and this permission notice appear in all copies.
 *
 * THE SOFTWARE IS PROVIDED "AS IS" AND THE AUTHOR DISCLAIMS ALL WARRANTIES
 * WITH REGARD TO THIS SOFTWARE INCLUDING ALL IMPLIED WARRANTIES OF
 * MERCHANTABILITY AND FITNESS. IN NO EVENT SHALL THE AUTHOR BE LIABLE FOR
 * ANY SPECIAL, DIRECT, INDIRECT, OR CONSEQUENTIAL DAMAGES OR ANY DAMAGES
 * WHATSOEVER RESULTING FROM LOSS OF USE, DATA OR PROFITS, WHETHER IN AN
 * ACTION OF CONTRACT, NEGLIGENCE OR OTHER TORTIOUS ACTION, ARISING OUT OF
 * OR IN CONNECTION WITH THE USE OR PERFORMANCE OF THIS SOFTWARE.
 */

/*!
 * Serialise and deserialise the RPM "header structure".
 *
 * On disk a section is a 16-byte preamble (magic, reserved, entry count,
 * data length), an array of 16-byte index entries, and a data store whose
 * items sit at type-dictated alignments.  When a store carries a region
 * marker, its 16-byte trailer record is written at the end of the data store
 * but indexed first; the trailer's offset field is the negative distance
 * from the end of the index back to its start.
 */

use crate::binio::{pad8, pad_to, ReadBinary, WriteBinary};
use crate::store::{Region, TagStore, Value};
use crate::tags::TagType;
use crate::{Error, Result};
use std::io::Read;

/// Magic bytes opening every header structure.
pub const SECTION_MAGIC: [u8; 4] = [0x8e, 0xad, 0xe8, 0x01];

/// Size of the section preamble.
pub const PREAMBLE_SIZE: usize = 16;

/// Size of one index entry.
pub const INDEX_ENTRY_SIZE: usize = 16;

/// Byte length of the region trailer record.
const REGION_TRAILER_SIZE: u32 = 16;

/// Upper bound on index entries accepted from untrusted input.
const MAX_ENTRIES: u32 = 0xffff;
/// Upper bound on the data store size accepted from untrusted input.
const MAX_DATA_LEN: u32 = 0x0fff_ffff;

/// Zero bytes required after a signature section so the next section starts
/// on an 8-byte boundary.  The main header section takes no trailing pad.
#[must_use]
pub fn signature_padding(len: usize) -> usize {
    pad8(len)
}

fn append_value(data: &mut Vec<u8>, value: &Value) {
    match value {
        Value::Null => (),
        Value::Char(v) | Value::Int8(v) | Value::Binary(v) => data.extend_from_slice(v),
        Value::Int16(v) => {
            for n in v {
                data.extend_from_slice(&n.to_be_bytes());
            }
        }
        Value::Int32(v) => {
            for n in v {
                data.extend_from_slice(&n.to_be_bytes());
            }
        }
        Value::Int64(v) => {
            for n in v {
                data.extend_from_slice(&n.to_be_bytes());
            }
        }
        Value::String(s) => {
            data.extend_from_slice(s.as_bytes());
            data.push(0);
        }
        Value::StringArray(v) | Value::I18nString(v) => {
            for s in v {
                data.extend_from_slice(s.as_bytes());
                data.push(0);
            }
        }
    }
}

struct IndexEntry {
    tag: u32,
    ty: u32,
    offset: u32,
    count: u32,
}

/// Serialise a store to section bytes.
pub fn encode(store: &TagStore) -> Result<Vec<u8>> {
    let mut data: Vec<u8> = Vec::new();
    let mut index: Vec<IndexEntry> = Vec::with_capacity(store.len() + 1);

    for (tag, value) in store.iter() {
        let ty = value.tag_type();
        let pad = pad_to(data.len(), ty.alignment());
        data.resize(data.len() + pad, 0);
        index.push(IndexEntry {
            tag,
            ty: ty.code(),
            offset: data.len() as u32,
            count: value.count(),
        });
        append_value(&mut data, value);
    }

    if let Some(region) = store.region() {
        // Written last, indexed first.  The offset field holds the negative
        // distance from the end of the index back to the first entry.
        let entries = (index.len() + 1) as i32;
        let offset = data.len() as u32;
        data.extend_from_slice(&region.code().to_be_bytes());
        data.extend_from_slice(&TagType::Binary.code().to_be_bytes());
        data.extend_from_slice(&(-(entries * INDEX_ENTRY_SIZE as i32)).to_be_bytes());
        data.extend_from_slice(&REGION_TRAILER_SIZE.to_be_bytes());
        index.insert(
            0,
            IndexEntry {
                tag: region.code(),
                ty: TagType::Binary.code(),
                offset,
                count: REGION_TRAILER_SIZE,
            },
        );
    }

    if data.len() as u64 > u64::from(MAX_DATA_LEN) {
        return Err(Error::InvalidField(format!(
            "section data store too large: {} bytes",
            data.len()
        )));
    }

    let mut out = Vec::with_capacity(PREAMBLE_SIZE + index.len() * INDEX_ENTRY_SIZE + data.len());
    out.extend_from_slice(&SECTION_MAGIC);
    out.write_be_u32(0)?;
    out.write_be_u32(index.len() as u32)?;
    out.write_be_u32(data.len() as u32)?;
    for entry in &index {
        out.write_be_u32(entry.tag)?;
        out.write_be_u32(entry.ty)?;
        out.write_be_u32(entry.offset)?;
        out.write_be_u32(entry.count)?;
    }
    out.extend_from_slice(&data);
    Ok(out)
}

/// Read one complete section off a stream, returning its raw bytes.
///
/// The preamble states the index and data-store sizes, so exactly one
/// section is consumed; any trailing padding is left in the stream.
pub fn read_raw<R: Read>(reader: &mut R) -> Result<Vec<u8>> {
    let mut preamble = [0u8; PREAMBLE_SIZE];
    reader.read_exact(&mut preamble)?;
    if preamble[..4] != SECTION_MAGIC {
        return Err(Error::InvalidFormat(format!(
            "bad section magic: {:02x?}",
            &preamble[..4]
        )));
    }
    let count = u32::from_be_bytes([preamble[8], preamble[9], preamble[10], preamble[11]]);
    let data_len = u32::from_be_bytes([preamble[12], preamble[13], preamble[14], preamble[15]]);
    if count > MAX_ENTRIES || data_len > MAX_DATA_LEN {
        return Err(Error::InvalidFormat(format!(
            "unreasonable section size: {} entries, {} data bytes",
            count, data_len
        )));
    }

    let body_len = count as usize * INDEX_ENTRY_SIZE + data_len as usize;
    let mut out = Vec::with_capacity(PREAMBLE_SIZE + body_len);
    out.extend_from_slice(&preamble);
    out.resize(PREAMBLE_SIZE + body_len, 0);
    reader.read_exact(&mut out[PREAMBLE_SIZE..])?;
    Ok(out)
}

fn data_slice(data: &[u8], offset: u32, len: usize, tag: u32) -> Result<&[u8]> {
    let start = offset as usize;
    let end = start.checked_add(len).ok_or_else(|| {
        Error::InvalidFormat(format!("tag {} extent overflows", tag))
    })?;
    data.get(start..end).ok_or_else(|| {
        Error::InvalidFormat(format!(
            "tag {} data [{}, {}) exceeds store of {} bytes",
            tag, start, end, data.len()
        ))
    })
}

fn read_nul_string(data: &[u8], pos: &mut usize, tag: u32) -> Result<String> {
    let rest = &data[*pos..];
    let nul = rest.iter().position(|&b| b == 0).ok_or_else(|| {
        Error::InvalidFormat(format!("tag {} string is not NUL-terminated", tag))
    })?;
    let s = std::str::from_utf8(&rest[..nul])
        .map_err(|_| Error::InvalidFormat(format!("tag {} string is not UTF-8", tag)))?;
    *pos += nul + 1;
    Ok(s.to_string())
}

fn decode_value(data: &[u8], ty: TagType, offset: u32, count: u32, tag: u32) -> Result<Value> {
    let n = count as usize;
    match ty {
        TagType::Null => Ok(Value::Null),
        TagType::Char => Ok(Value::Char(data_slice(data, offset, n, tag)?.to_vec())),
        TagType::Int8 => Ok(Value::Int8(data_slice(data, offset, n, tag)?.to_vec())),
        TagType::Int16 => {
            let raw = data_slice(data, offset, n * 2, tag)?;
            Ok(Value::Int16(
                raw.chunks_exact(2)
                    .map(|c| u16::from_be_bytes([c[0], c[1]]))
                    .collect(),
            ))
        }
        TagType::Int32 => {
            let raw = data_slice(data, offset, n * 4, tag)?;
            Ok(Value::Int32(
                raw.chunks_exact(4)
                    .map(|c| u32::from_be_bytes([c[0], c[1], c[2], c[3]]))
                    .collect(),
            ))
        }
        TagType::Int64 => {
            let raw = data_slice(data, offset, n * 8, tag)?;
            Ok(Value::Int64(
                raw.chunks_exact(8)
                    .map(|c| {
                        u64::from_be_bytes([c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]])
                    })
                    .collect(),
            ))
        }
        TagType::String => {
            if count != 1 {
                return Err(Error::InvalidFormat(format!(
                    "tag {} string count {} is not 1",
                    tag, count
                )));
            }
            if offset as usize > data.len() {
                return Err(Error::InvalidFormat(format!(
                    "tag {} offset {} exceeds store",
                    tag, offset
                )));
            }
            let mut pos = offset as usize;
            Ok(Value::String(read_nul_string(data, &mut pos, tag)?))
        }
        TagType::Binary => Ok(Value::Binary(data_slice(data, offset, n, tag)?.to_vec())),
        TagType::StringArray | TagType::I18nString => {
            if offset as usize > data.len() {
                return Err(Error::InvalidFormat(format!(
                    "tag {} offset {} exceeds store",
                    tag, offset
                )));
            }
            let mut pos = offset as usize;
            let mut strings = Vec::with_capacity(n);
            for _ in 0..n {
                strings.push(read_nul_string(data, &mut pos, tag)?);
            }
            Ok(match ty {
                TagType::StringArray => Value::StringArray(strings),
                _ => Value::I18nString(strings),
            })
        }
    }
}

/// Deserialise section bytes into a store.
///
/// Unknown tag codes decode by their stated type and are preserved so a
/// round-trip reproduces them.  The region back-reference, when present, is
/// checked to point exactly at the first index entry.
pub fn decode(bytes: &[u8]) -> Result<TagStore> {
    let mut reader = bytes;
    let mut magic = [0u8; 4];
    reader.read_exact(&mut magic)?;
    if magic != SECTION_MAGIC {
        return Err(Error::InvalidFormat(format!(
            "bad section magic: {:02x?}",
            magic
        )));
    }
    let _reserved = reader.read_be_u32()?;
    let count = reader.read_be_u32()?;
    let data_len = reader.read_be_u32()?;
    if count > MAX_ENTRIES || data_len > MAX_DATA_LEN {
        return Err(Error::InvalidFormat(format!(
            "unreasonable section size: {} entries, {} data bytes",
            count, data_len
        )));
    }

    let index_len = count as usize * INDEX_ENTRY_SIZE;
    let body = reader;
    if body.len() < index_len + data_len as usize {
        return Err(Error::InvalidFormat(format!(
            "section truncated: {} bytes left, {} required",
            body.len(),
            index_len + data_len as usize
        )));
    }
    let (index, data) = body.split_at(index_len);
    let data = &data[..data_len as usize];

    let mut store = TagStore::new();
    for (i, raw) in index.chunks_exact(INDEX_ENTRY_SIZE).enumerate() {
        let tag = u32::from_be_bytes([raw[0], raw[1], raw[2], raw[3]]);
        let ty_code = u32::from_be_bytes([raw[4], raw[5], raw[6], raw[7]]);
        let offset = u32::from_be_bytes([raw[8], raw[9], raw[10], raw[11]]);
        let elems = u32::from_be_bytes([raw[12], raw[13], raw[14], raw[15]]);

        if i == 0 {
            if let Some(region) = Region::from_code(tag) {
                if ty_code != TagType::Binary.code() || elems != REGION_TRAILER_SIZE {
                    return Err(Error::InvalidFormat(format!(
                        "malformed region entry for tag {}",
                        tag
                    )));
                }
                let trailer = data_slice(data, offset, REGION_TRAILER_SIZE as usize, tag)?;
                let back = i32::from_be_bytes([trailer[8], trailer[9], trailer[10], trailer[11]]);
                if back != -((count as i32) * INDEX_ENTRY_SIZE as i32) {
                    return Err(Error::InvalidFormat(format!(
                        "region back-reference {} does not point at the first index entry",
                        back
                    )));
                }
                store.set_region(region);
                continue;
            }
        }

        let ty = TagType::from_code(ty_code).ok_or_else(|| {
            Error::InvalidFormat(format!("tag {} has unknown type code {}", tag, ty_code))
        })?;
        store.set_raw(tag, decode_value(data, ty, offset, elems, tag)?);
    }

    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tags::{SigTag, Tag};

    fn sample_store() -> TagStore {
        let mut store = TagStore::new();
        store.set_region(Region::HeaderImmutable);
        store
            .set(Tag::HeaderI18nTable, Value::StringArray(vec!["C".into()]))
            .unwrap();
        store.set(Tag::Name, Value::String("sample".into())).unwrap();
        store
            .set(Tag::Summary, Value::I18nString(vec!["A sample".into()]))
            .unwrap();
        store
            .set(Tag::FileModes, Value::Int16(vec![0o644, 0o755]))
            .unwrap();
        store
            .set(Tag::FileSizes, Value::Int32(vec![1, 2, 3]))
            .unwrap();
        store
            .set(Tag::SourcePkgId, Value::Binary(vec![0xaa, 0xbb, 0xcc]))
            .unwrap();
        store
    }

    #[test]
    fn roundtrip_preserves_entries() -> crate::Result<()> {
        let store = sample_store();
        let bytes = encode(&store)?;
        let decoded = decode(&bytes)?;
        assert_eq!(decoded, store);
        Ok(())
    }

    #[test]
    fn roundtrip_is_stable() -> crate::Result<()> {
        let store = sample_store();
        let bytes = encode(&store)?;
        let again = encode(&decode(&bytes)?)?;
        assert_eq!(bytes, again);
        Ok(())
    }

    #[test]
    fn region_entry_is_first_and_backrefs_index() -> crate::Result<()> {
        let store = sample_store();
        let bytes = encode(&store)?;

        let count =
            u32::from_be_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]) as usize;
        assert_eq!(count, store.len() + 1);

        // First index entry is the region pseudo-tag.
        let tag = u32::from_be_bytes([bytes[16], bytes[17], bytes[18], bytes[19]]);
        assert_eq!(tag, 63);

        // Its data payload holds the negative index distance.
        let offset =
            u32::from_be_bytes([bytes[24], bytes[25], bytes[26], bytes[27]]) as usize;
        let data_start = PREAMBLE_SIZE + count * INDEX_ENTRY_SIZE;
        let trailer = &bytes[data_start + offset..data_start + offset + 16];
        let back = i32::from_be_bytes([trailer[8], trailer[9], trailer[10], trailer[11]]);
        assert_eq!(back, -((count * INDEX_ENTRY_SIZE) as i32));
        Ok(())
    }

    #[test]
    fn int_offsets_are_aligned() -> crate::Result<()> {
        let mut store = TagStore::new();
        store.set(Tag::Name, Value::String("x".into()))?;
        store.set(Tag::FileModes, Value::Int16(vec![1]))?;
        store.set(Tag::Release, Value::String("y".into()))?;
        store.set(Tag::FileSizes, Value::Int32(vec![2]))?;
        let bytes = encode(&store)?;

        let count = u32::from_be_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]) as usize;
        for i in 0..count {
            let entry = &bytes[PREAMBLE_SIZE + i * INDEX_ENTRY_SIZE..];
            let ty = u32::from_be_bytes([entry[4], entry[5], entry[6], entry[7]]);
            let offset = u32::from_be_bytes([entry[8], entry[9], entry[10], entry[11]]);
            let align = TagType::from_code(ty).unwrap().alignment() as u32;
            assert_eq!(offset % align, 0, "type {} offset {}", ty, offset);
        }
        Ok(())
    }

    #[test]
    fn signature_store_roundtrip() -> crate::Result<()> {
        let mut store = TagStore::new();
        store.set_region(Region::Signatures);
        store.set(SigTag::Sha1, Value::String("0011".into()))?;
        store.set(SigTag::Size, Value::Int32(vec![1234]))?;
        store.set(SigTag::Md5, Value::Binary(vec![0u8; 16]))?;
        let bytes = encode(&store)?;
        let decoded = decode(&bytes)?;
        assert_eq!(decoded.region(), Some(Region::Signatures));
        assert_eq!(decoded, store);
        Ok(())
    }

    #[test]
    fn unknown_tags_roundtrip() -> crate::Result<()> {
        let mut store = TagStore::new();
        store.set_raw(54321, Value::Int32(vec![7]));
        store.set_raw(54322, Value::String("opaque".into()));
        let bytes = encode(&store)?;
        assert_eq!(decode(&bytes)?, store);
        Ok(())
    }

    #[test]
    fn rejects_bad_magic() {
        let mut bytes = encode(&sample_store()).unwrap();
        bytes[0] = 0;
        assert!(matches!(decode(&bytes), Err(Error::InvalidFormat(_))));
    }

    #[test]
    fn rejects_truncated_data() {
        let bytes = encode(&sample_store()).unwrap();
        assert!(decode(&bytes[..bytes.len() - 4]).is_err());
    }

    #[test]
    fn signature_padding_to_eight() {
        assert_eq!(signature_padding(0), 0);
        assert_eq!(signature_padding(8), 0);
        assert_eq!(signature_padding(9), 7);
        assert_eq!(signature_padding(15), 1);
    }
}
