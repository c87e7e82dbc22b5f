use rpmpack::Digest;
use std::str::FromStr;

#[test]
fn test_digest_bytes() -> rpmpack::Result<()> {
    let data = b"The quick brown fox jumps over the lazy dog";

    let d = Digest::from_str("MD5")?;
    let h = d.hash_bytes(data);
    assert_eq!(h, "9e107d9d372bb6826bd81d3542a419d6");

    let d = Digest::from_str("SHA1")?;
    let h = d.hash_bytes(data);
    assert_eq!(h, "2fd4e1c67a2d28fced849ee1bb76e7391b93eb12");

    let d = Digest::from_str("SHA256")?;
    let h = d.hash_bytes(data);
    assert_eq!(
        h,
        "d7a8fbb307d7809469ca9abcb0082e4f8d5651e46d3cdb762d02d0bf37c9e592"
    );

    Ok(())
}

#[test]
fn test_digest_reader() -> rpmpack::Result<()> {
    let data = vec![0x5au8; 128 * 1024];

    let d = Digest::from_str("sha256")?;
    let mut reader = data.as_slice();
    let h = d.hash_reader(&mut reader)?;
    assert_eq!(h, d.hash_bytes(&data));

    Ok(())
}

#[test]
fn test_digest_raw_matches_hex() -> rpmpack::Result<()> {
    let d = Digest::from_str("md5")?;
    let raw = d.digest_bytes(b"abc");
    let hex: String = raw.iter().map(|b| format!("{:02x}", b)).collect();
    assert_eq!(hex, d.hash_bytes(b"abc"));
    assert_eq!(raw.len(), 16);
    Ok(())
}
