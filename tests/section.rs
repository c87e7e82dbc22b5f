use rpmpack::section::{self, INDEX_ENTRY_SIZE, PREAMBLE_SIZE, SECTION_MAGIC};
use rpmpack::{Region, SigTag, Tag, TagStore, TagType, Value};

fn be32(bytes: &[u8], at: usize) -> u32 {
    u32::from_be_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}

fn rich_store() -> TagStore {
    let mut store = TagStore::new();
    store.set_region(Region::HeaderImmutable);
    store
        .set(Tag::HeaderI18nTable, Value::StringArray(vec!["C".into()]))
        .unwrap();
    store.set(Tag::Name, Value::String("pkg".into())).unwrap();
    store
        .set(Tag::Summary, Value::I18nString(vec!["summary".into()]))
        .unwrap();
    store
        .set(Tag::BuildTime, Value::Int32(vec![1700000000]))
        .unwrap();
    store
        .set(Tag::FileModes, Value::Int16(vec![0o644, 0o755, 0o600]))
        .unwrap();
    store
        .set(Tag::FileSizes, Value::Int32(vec![1, 22, 333]))
        .unwrap();
    store
        .set(
            Tag::FileDigests,
            Value::StringArray(vec!["aa".into(), String::new(), "cc".into()]),
        )
        .unwrap();
    store
        .set(Tag::SourcePkgId, Value::Binary(vec![1, 2, 3, 4, 5]))
        .unwrap();
    store
}

/// Encode/decode reproduces the store element for element, in order.
#[test]
fn roundtrip_element_for_element() -> rpmpack::Result<()> {
    let store = rich_store();
    let bytes = section::encode(&store)?;
    let decoded = section::decode(&bytes)?;

    assert_eq!(decoded.region(), store.region());
    let original: Vec<_> = store.iter().map(|(c, v)| (c, v.clone())).collect();
    let recovered: Vec<_> = decoded.iter().map(|(c, v)| (c, v.clone())).collect();
    assert_eq!(recovered, original);
    Ok(())
}

/// The region back-reference points exactly at the first index entry.
#[test]
fn region_backref_points_at_first_entry() -> rpmpack::Result<()> {
    let bytes = section::encode(&rich_store())?;

    assert_eq!(&bytes[..4], &SECTION_MAGIC);
    let count = be32(&bytes, 8) as usize;
    let data_len = be32(&bytes, 12) as usize;

    let first = PREAMBLE_SIZE;
    assert_eq!(be32(&bytes, first), 63, "region tag leads the index");
    assert_eq!(be32(&bytes, first + 4), TagType::Binary.code());
    assert_eq!(be32(&bytes, first + 12), 16);

    let trailer_offset = be32(&bytes, first + 8) as usize;
    let data_start = PREAMBLE_SIZE + count * INDEX_ENTRY_SIZE;
    assert_eq!(trailer_offset + 16, data_len, "trailer closes the data store");

    let trailer = &bytes[data_start + trailer_offset..data_start + trailer_offset + 16];
    let back = i32::from_be_bytes([trailer[8], trailer[9], trailer[10], trailer[11]]);
    assert_eq!(back, -((count * INDEX_ENTRY_SIZE) as i32));
    Ok(())
}

/// Every array tag's data extent is element_count times element_size, and
/// every extent lies inside the data store.
#[test]
fn array_extents_match_counts() -> rpmpack::Result<()> {
    let bytes = section::encode(&rich_store())?;
    let count = be32(&bytes, 8) as usize;
    let data_len = be32(&bytes, 12) as usize;
    let data_start = PREAMBLE_SIZE + count * INDEX_ENTRY_SIZE;
    let data = &bytes[data_start..data_start + data_len];

    for i in 0..count {
        let at = PREAMBLE_SIZE + i * INDEX_ENTRY_SIZE;
        let ty = be32(&bytes, at + 4);
        let offset = be32(&bytes, at + 8) as usize;
        let elems = be32(&bytes, at + 12) as usize;

        let elem_size = match TagType::from_code(ty).unwrap() {
            TagType::Int16 => Some(2),
            TagType::Int32 => Some(4),
            TagType::Int64 => Some(8),
            TagType::Char | TagType::Int8 | TagType::Binary => Some(1),
            _ => None,
        };
        if let Some(elem_size) = elem_size {
            assert!(
                offset + elems * elem_size <= data_len,
                "tag at index {} overruns the data store",
                i
            );
        } else if ty == TagType::String.code()
            || ty == TagType::StringArray.code()
            || ty == TagType::I18nString.code()
        {
            // String extents end at their final NUL.
            let mut pos = offset;
            for _ in 0..elems {
                let nul = data[pos..].iter().position(|&b| b == 0).expect("NUL");
                pos += nul + 1;
            }
            assert!(pos <= data_len);
        }
    }
    Ok(())
}

/// A store without a region marker has no synthetic first entry.
#[test]
fn no_region_no_extra_entry() -> rpmpack::Result<()> {
    let mut store = TagStore::new();
    store.set(SigTag::Sha1, Value::String("00ff".into()))?;
    let bytes = section::encode(&store)?;
    assert_eq!(be32(&bytes, 8), 1);
    let decoded = section::decode(&bytes)?;
    assert!(decoded.region().is_none());
    assert_eq!(decoded.get(SigTag::Sha1).unwrap().as_str(), Some("00ff"));
    Ok(())
}

/// Unknown tag codes survive a round trip unchanged.
#[test]
fn unknown_tags_are_preserved() -> rpmpack::Result<()> {
    let mut store = TagStore::new();
    store.set_raw(60000, Value::Binary(vec![9, 9, 9]));
    store.set_raw(60001, Value::Int64(vec![u64::MAX]));
    let bytes = section::encode(&store)?;
    let decoded = section::decode(&bytes)?;
    assert_eq!(decoded.get_code(60000).unwrap().as_binary(), Some(&[9, 9, 9][..]));
    assert_eq!(decoded, store);
    Ok(())
}

/// Corrupting the back-reference is caught on decode.
#[test]
fn corrupt_backref_is_rejected() {
    let mut bytes = section::encode(&rich_store()).unwrap();
    let count = be32(&bytes, 8) as usize;
    let data_len = be32(&bytes, 12) as usize;
    let data_start = PREAMBLE_SIZE + count * INDEX_ENTRY_SIZE;
    // Flip a bit in the trailer's offset field.
    bytes[data_start + data_len - 5] ^= 0x01;
    assert!(section::decode(&bytes).is_err());
}
