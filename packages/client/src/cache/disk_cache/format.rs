//! On-disk record codec
//!
//! Layout, all integers little-endian:
//!
//! ```text
//! u32   magic 0x20150306
//! str   key
//! str   etag ("" when absent)
//! i64   server_date
//! i64   last_modified
//! i64   ttl
//! i64   soft_ttl
//! u32   header count, then count x (str name, str value)
//! ..    body bytes to end of file
//! ```
//!
//! `str` is an 8-byte length followed by that many UTF-8 bytes.

use std::collections::BTreeMap;
use std::io::{self, Read, Write};
use std::string::FromUtf8Error;

use bytes::Bytes;

use crate::cache::CacheEntry;

pub const CACHE_MAGIC: u32 = 0x2015_0306;

/// Reasons a persisted record could not be decoded
#[derive(Debug, thiserror::Error)]
pub enum CacheFormatError {
    #[error("bad magic number {0:#010x}")]
    BadMagic(u32),
    #[error("record ends before the declared content")]
    Truncated,
    #[error("stored string is not valid UTF-8")]
    InvalidUtf8(#[from] FromUtf8Error),
    #[error("declared length {0} exceeds the record")]
    LengthOverflow(u64),
    #[error("record i/o failed")]
    Io(#[source] io::Error),
}

impl From<io::Error> for CacheFormatError {
    fn from(e: io::Error) -> Self {
        if e.kind() == io::ErrorKind::UnexpectedEof {
            CacheFormatError::Truncated
        } else {
            CacheFormatError::Io(e)
        }
    }
}

/// Everything in a record except the body, plus the record's total size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheHeader {
    pub key: String,
    pub etag: Option<String>,
    pub server_date: i64,
    pub last_modified: i64,
    pub ttl: i64,
    pub soft_ttl: i64,
    pub response_headers: BTreeMap<String, String>,
    /// Bytes the record occupies on disk. Not serialized.
    pub size: u64,
}

impl CacheHeader {
    pub fn from_entry(key: &str, entry: &CacheEntry) -> Self {
        let mut header = Self {
            key: key.to_string(),
            etag: entry.etag.clone(),
            server_date: entry.server_date,
            last_modified: entry.last_modified,
            ttl: entry.ttl,
            soft_ttl: entry.soft_ttl,
            response_headers: entry.response_headers.clone(),
            size: 0,
        };
        header.size = header.encoded_len() + entry.data.len() as u64;
        header
    }

    pub fn into_entry(self, data: Bytes) -> CacheEntry {
        CacheEntry {
            data,
            etag: self.etag,
            server_date: self.server_date,
            last_modified: self.last_modified,
            ttl: self.ttl,
            soft_ttl: self.soft_ttl,
            response_headers: self.response_headers,
        }
    }

    /// Serialized length of the header section.
    pub fn encoded_len(&self) -> u64 {
        let str_len = |s: &str| 8 + s.len() as u64;
        4 + str_len(&self.key)
            + str_len(self.etag.as_deref().unwrap_or(""))
            + 4 * 8
            + 4
            + self
                .response_headers
                .iter()
                .map(|(k, v)| str_len(k) + str_len(v))
                .sum::<u64>()
    }

    pub fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_all(&CACHE_MAGIC.to_le_bytes())?;
        write_string(w, &self.key)?;
        write_string(w, self.etag.as_deref().unwrap_or(""))?;
        for value in [self.server_date, self.last_modified, self.ttl, self.soft_ttl] {
            w.write_all(&value.to_le_bytes())?;
        }
        write_string_map(w, &self.response_headers)
    }

    /// Decode a header section. `size` is left at 0 for the caller to set.
    pub fn read_from<R: Read>(r: &mut CountingReader<R>) -> Result<Self, CacheFormatError> {
        let magic = read_u32(r)?;
        if magic != CACHE_MAGIC {
            return Err(CacheFormatError::BadMagic(magic));
        }
        let key = read_string(r)?;
        let etag = Some(read_string(r)?).filter(|etag| !etag.is_empty());
        let server_date = read_i64(r)?;
        let last_modified = read_i64(r)?;
        let ttl = read_i64(r)?;
        let soft_ttl = read_i64(r)?;
        let response_headers = read_string_map(r)?;

        Ok(Self {
            key,
            etag,
            server_date,
            last_modified,
            ttl,
            soft_ttl,
            response_headers,
            size: 0,
        })
    }
}

/// Reader that knows how many bytes of the record are left, so declared
/// lengths can be checked before allocating.
pub struct CountingReader<R> {
    inner: R,
    length: u64,
    read: u64,
}

impl<R: Read> CountingReader<R> {
    pub fn new(inner: R, length: u64) -> Self {
        Self {
            inner,
            length,
            read: 0,
        }
    }

    pub fn bytes_read(&self) -> u64 {
        self.read
    }

    pub fn remaining(&self) -> u64 {
        self.length.saturating_sub(self.read)
    }

    /// Read everything up to the declared record length.
    pub fn read_remaining(&mut self) -> Result<Bytes, CacheFormatError> {
        let remaining = self.remaining();
        let mut buf = vec![0u8; usize::try_from(remaining)
            .map_err(|_| CacheFormatError::LengthOverflow(remaining))?];
        self.read_exact(&mut buf)?;
        Ok(Bytes::from(buf))
    }
}

impl<R: Read> Read for CountingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.read += n as u64;
        Ok(n)
    }
}

fn write_string<W: Write>(w: &mut W, s: &str) -> io::Result<()> {
    w.write_all(&(s.len() as u64).to_le_bytes())?;
    w.write_all(s.as_bytes())
}

fn write_string_map<W: Write>(w: &mut W, map: &BTreeMap<String, String>) -> io::Result<()> {
    let count = u32::try_from(map.len())
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "too many headers"))?;
    w.write_all(&count.to_le_bytes())?;
    for (name, value) in map {
        write_string(w, name)?;
        write_string(w, value)?;
    }
    Ok(())
}

fn read_u32<R: Read>(r: &mut R) -> Result<u32, CacheFormatError> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

fn read_i64<R: Read>(r: &mut R) -> Result<i64, CacheFormatError> {
    let mut buf = [0u8; 8];
    r.read_exact(&mut buf)?;
    Ok(i64::from_le_bytes(buf))
}

fn read_string<R: Read>(r: &mut CountingReader<R>) -> Result<String, CacheFormatError> {
    let mut buf = [0u8; 8];
    r.read_exact(&mut buf)?;
    let len = u64::from_le_bytes(buf);
    if len > r.remaining() {
        return Err(CacheFormatError::LengthOverflow(len));
    }
    let mut bytes = vec![0u8; len as usize];
    r.read_exact(&mut bytes)?;
    Ok(String::from_utf8(bytes)?)
}

fn read_string_map<R: Read>(
    r: &mut CountingReader<R>,
) -> Result<BTreeMap<String, String>, CacheFormatError> {
    let count = read_u32(r)?;
    // Each pair needs at least two length prefixes.
    if u64::from(count) * 16 > r.remaining() {
        return Err(CacheFormatError::LengthOverflow(u64::from(count)));
    }
    let mut map = BTreeMap::new();
    for _ in 0..count {
        let name = read_string(r)?;
        let value = read_string(r)?;
        map.insert(name, value);
    }
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_entry() -> CacheEntry {
        let mut response_headers = BTreeMap::new();
        response_headers.insert("Content-Type".to_string(), "text/plain".to_string());
        CacheEntry {
            data: Bytes::from_static(b"hello"),
            etag: Some("\"abc\"".to_string()),
            server_date: 1,
            last_modified: 2,
            ttl: 3,
            soft_ttl: 4,
            response_headers,
        }
    }

    fn encode(header: &CacheHeader, data: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        header.write_to(&mut out).unwrap();
        out.extend_from_slice(data);
        out
    }

    #[test]
    fn test_exact_byte_layout() {
        let header = CacheHeader::from_entry(
            "k",
            &CacheEntry {
                data: Bytes::from_static(b"Z"),
                ttl: -1,
                ..CacheEntry::default()
            },
        );
        let bytes = encode(&header, b"Z");

        let mut expected = vec![0x06, 0x03, 0x15, 0x20];
        expected.extend_from_slice(&1u64.to_le_bytes());
        expected.push(b'k');
        expected.extend_from_slice(&0u64.to_le_bytes());
        expected.extend_from_slice(&0i64.to_le_bytes());
        expected.extend_from_slice(&0i64.to_le_bytes());
        expected.extend_from_slice(&(-1i64).to_le_bytes());
        expected.extend_from_slice(&0i64.to_le_bytes());
        expected.extend_from_slice(&0u32.to_le_bytes());
        expected.push(b'Z');

        assert_eq!(bytes, expected);
        assert_eq!(header.size, bytes.len() as u64);
    }

    #[test]
    fn test_decode_restores_every_field() {
        let entry = sample_entry();
        let header = CacheHeader::from_entry("key", &entry);
        let bytes = encode(&header, &entry.data);

        let mut reader = CountingReader::new(bytes.as_slice(), bytes.len() as u64);
        let decoded = CacheHeader::read_from(&mut reader).unwrap();
        assert_eq!(reader.bytes_read(), header.encoded_len());
        let data = reader.read_remaining().unwrap();

        assert_eq!(decoded.key, "key");
        assert_eq!(decoded.into_entry(data), entry);
    }

    #[test]
    fn test_empty_etag_reads_as_none() {
        let header = CacheHeader::from_entry("key", &CacheEntry::default());
        let bytes = encode(&header, b"");
        let mut reader = CountingReader::new(bytes.as_slice(), bytes.len() as u64);
        assert_eq!(CacheHeader::read_from(&mut reader).unwrap().etag, None);
    }

    #[test]
    fn test_bad_magic_rejected() {
        let bytes = [0xde, 0xad, 0xbe, 0xef, 0, 0, 0, 0];
        let mut reader = CountingReader::new(&bytes[..], bytes.len() as u64);
        assert!(matches!(
            CacheHeader::read_from(&mut reader),
            Err(CacheFormatError::BadMagic(0xefbe_adde))
        ));
    }

    #[test]
    fn test_truncated_and_oversized_lengths() {
        let entry = sample_entry();
        let bytes = encode(&CacheHeader::from_entry("key", &entry), &entry.data);

        let cut = &bytes[..10];
        let mut reader = CountingReader::new(cut, cut.len() as u64);
        assert!(matches!(
            CacheHeader::read_from(&mut reader),
            Err(CacheFormatError::Truncated | CacheFormatError::LengthOverflow(_))
        ));

        let mut forged = CACHE_MAGIC.to_le_bytes().to_vec();
        forged.extend_from_slice(&u64::MAX.to_le_bytes());
        let mut reader = CountingReader::new(forged.as_slice(), forged.len() as u64);
        assert!(matches!(
            CacheHeader::read_from(&mut reader),
            Err(CacheFormatError::LengthOverflow(u64::MAX))
        ));
    }
}
