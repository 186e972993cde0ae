//! Compact binary snapshot encoding.
//!
//! Layout, all integers little-endian:
//!
//! ```text
//! offset 0:  u32 magic = 0x4E474341 ("NGCA")
//! offset 4:  u32 version
//! offset 8:  i64 timestamp
//! offset 16: u32 entry count
//! repeated:  u32 key_len, key bytes, u32 value_len, value bytes
//! ```

use crate::error::SnapshotError;
use crate::persistence::{SnapshotDocument, SnapshotRecord, SNAPSHOT_VERSION};

/// Magic number opening every binary snapshot
pub const MAGIC: u32 = 0x4E47_4341;

const HEADER_LEN: usize = 20;

/// Encodes a document in the binary layout.
pub fn encode(document: &SnapshotDocument) -> Result<Vec<u8>, SnapshotError> {
    let body: usize = document
        .entries
        .iter()
        .map(|record| 8 + record.key.len() + record.value.len())
        .sum();
    let mut out = Vec::with_capacity(HEADER_LEN + body);

    out.extend_from_slice(&MAGIC.to_le_bytes());
    out.extend_from_slice(&document.version.to_le_bytes());
    out.extend_from_slice(&document.timestamp.to_le_bytes());
    out.extend_from_slice(&length_prefix(document.entries.len(), "entry count")?.to_le_bytes());

    for record in &document.entries {
        out.extend_from_slice(&length_prefix(record.key.len(), "key")?.to_le_bytes());
        out.extend_from_slice(record.key.as_bytes());
        out.extend_from_slice(&length_prefix(record.value.len(), "value")?.to_le_bytes());
        out.extend_from_slice(&record.value);
    }

    Ok(out)
}

/// Decodes a binary snapshot.
///
/// Magic and version are validated before any entry is read; a record cut
/// short fails with [`SnapshotError::Truncated`].
pub fn decode(bytes: &[u8]) -> Result<SnapshotDocument, SnapshotError> {
    let mut reader = Reader::new(bytes);

    let magic = reader.read_u32("magic")?;
    if magic != MAGIC {
        return Err(SnapshotError::BadMagic(magic));
    }

    let version = reader.read_u32("version")?;
    if version != SNAPSHOT_VERSION {
        return Err(SnapshotError::UnsupportedVersion {
            expected: SNAPSHOT_VERSION,
            found: version,
        });
    }

    let timestamp = reader.read_i64("timestamp")?;
    let count = reader.read_u32("entry count")? as usize;

    // Every record needs at least its two length prefixes
    let mut entries = Vec::with_capacity(count.min(reader.remaining() / 8));
    for _ in 0..count {
        let key_len = reader.read_u32("key length")? as usize;
        let key = reader.take(key_len, "key")?;
        let key = std::str::from_utf8(key)
            .map_err(|e| SnapshotError::Malformed(format!("key is not UTF-8: {}", e)))?
            .to_owned();

        let value_len = reader.read_u32("value length")? as usize;
        let value = reader.take(value_len, "value")?.to_vec();

        entries.push(SnapshotRecord { key, value });
    }

    if reader.remaining() > 0 {
        return Err(SnapshotError::Malformed(format!(
            "{} trailing bytes after last entry",
            reader.remaining()
        )));
    }

    Ok(SnapshotDocument {
        version,
        timestamp,
        entries,
    })
}

fn length_prefix(len: usize, field: &str) -> Result<u32, SnapshotError> {
    u32::try_from(len)
        .map_err(|_| SnapshotError::Malformed(format!("{} length {} exceeds u32", field, len)))
}

// == Reader ==
/// Cursor over the input that reports which field ran out of bytes.
struct Reader<'a> {
    buf: &'a [u8],
}

impl<'a> Reader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf }
    }

    fn remaining(&self) -> usize {
        self.buf.len()
    }

    fn take(&mut self, n: usize, field: &'static str) -> Result<&'a [u8], SnapshotError> {
        if self.buf.len() < n {
            return Err(SnapshotError::Truncated(field));
        }
        let (head, tail) = self.buf.split_at(n);
        self.buf = tail;
        Ok(head)
    }

    fn read_array<const N: usize>(
        &mut self,
        field: &'static str,
    ) -> Result<[u8; N], SnapshotError> {
        let bytes = self.take(N, field)?;
        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        Ok(out)
    }

    fn read_u32(&mut self, field: &'static str) -> Result<u32, SnapshotError> {
        self.read_array(field).map(u32::from_le_bytes)
    }

    fn read_i64(&mut self, field: &'static str) -> Result<i64, SnapshotError> {
        self.read_array(field).map(i64::from_le_bytes)
    }
}
