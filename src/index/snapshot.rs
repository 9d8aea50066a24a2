//! Binary snapshot codec for the applied index state.
//!
//! Stream layout, little endian:
//! - magic `MGNT`, version u32
//! - posting section: term_count u64, then per term
//!   `term_id u64, posting_len u32, (doc_id u64, weight f32) * posting_len`
//! - expire section: count u64, then
//!   `(term_id u64, doc_id u64, expire_time u32) * count`
//! - crc32 u32 over everything above
//!
//! Terms, postings, and expire records are ascending by primary key, so
//! dumping the same state twice yields byte-identical output.

use crc32fast::Hasher;
use std::io::{Read, Write};
use std::sync::Arc;

use crate::error::{MagnetarError, Result};
use crate::index::expire_table::ExpireEntry;
use crate::index::posting::PostingList;
use crate::index::{DocId, ExpireTime, TermId, Weight};

pub const SNAPSHOT_MAGIC: [u8; 4] = *b"MGNT";
pub const SNAPSHOT_VERSION: u32 = 1;

/// Decoded snapshot contents
#[derive(Debug, Default, PartialEq)]
pub struct SnapshotData {
    pub postings: Vec<(TermId, Vec<(DocId, Weight)>)>,
    pub expires: Vec<ExpireEntry>,
}

impl SnapshotData {
    pub fn posting_count(&self) -> usize {
        self.postings.iter().map(|(_, entries)| entries.len()).sum()
    }
}

/// Write target that feeds the checksum while counting bytes
struct CrcWriter<W: Write> {
    inner: W,
    hasher: Hasher,
    written: u64,
}

impl<W: Write> CrcWriter<W> {
    fn new(inner: W) -> Self {
        Self {
            inner,
            hasher: Hasher::new(),
            written: 0,
        }
    }

    fn put(&mut self, bytes: &[u8]) -> Result<()> {
        self.inner.write_all(bytes)?;
        self.hasher.update(bytes);
        self.written += bytes.len() as u64;
        Ok(())
    }
}

/// Serialize postings and expire records to `writer`.
/// Both slices must already be ascending by primary key.
pub fn write_snapshot<W: Write>(
    writer: W,
    postings: &[(TermId, Arc<PostingList>)],
    expires: &[ExpireEntry],
) -> Result<u64> {
    debug_assert!(postings.windows(2).all(|w| w[0].0 < w[1].0));
    debug_assert!(expires
        .windows(2)
        .all(|w| (w[0].term_id, w[0].doc_id) < (w[1].term_id, w[1].doc_id)));

    let mut out = CrcWriter::new(writer);
    out.put(&SNAPSHOT_MAGIC)?;
    out.put(&SNAPSHOT_VERSION.to_le_bytes())?;

    out.put(&(postings.len() as u64).to_le_bytes())?;
    for (term_id, list) in postings {
        out.put(&term_id.to_le_bytes())?;
        out.put(&(list.len() as u32).to_le_bytes())?;
        for &(doc_id, weight) in list.iter() {
            out.put(&doc_id.to_le_bytes())?;
            out.put(&weight.to_le_bytes())?;
        }
    }

    out.put(&(expires.len() as u64).to_le_bytes())?;
    for entry in expires {
        out.put(&entry.term_id.to_le_bytes())?;
        out.put(&entry.doc_id.to_le_bytes())?;
        out.put(&entry.expire_time.to_le_bytes())?;
    }

    let crc = out.hasher.finalize();
    let mut inner = out.inner;
    inner.write_all(&crc.to_le_bytes())?;
    inner.flush()?;
    Ok(out.written + 4)
}

/// Read and validate a snapshot stream
pub fn read_snapshot<R: Read>(mut reader: R) -> Result<SnapshotData> {
    let mut data = Vec::new();
    reader.read_to_end(&mut data)?;

    if data.len() < SNAPSHOT_MAGIC.len() + 8 {
        return Err(MagnetarError::CorruptSnapshot(
            "stream shorter than header".to_string(),
        ));
    }

    let (payload, trailer) = data.split_at(data.len() - 4);
    let stored_crc = u32::from_le_bytes([trailer[0], trailer[1], trailer[2], trailer[3]]);
    let mut hasher = Hasher::new();
    hasher.update(payload);
    if hasher.finalize() != stored_crc {
        return Err(MagnetarError::CorruptSnapshot(
            "checksum mismatch".to_string(),
        ));
    }

    let mut pos = 0usize;
    if take_bytes::<4>(payload, &mut pos)? != SNAPSHOT_MAGIC {
        return Err(MagnetarError::CorruptSnapshot("bad magic".to_string()));
    }
    let version = u32::from_le_bytes(take_bytes::<4>(payload, &mut pos)?);
    if version > SNAPSHOT_VERSION {
        return Err(MagnetarError::IncompatibleSnapshot {
            expected: SNAPSHOT_VERSION,
            actual: version,
        });
    }

    let term_count = u64::from_le_bytes(take_bytes::<8>(payload, &mut pos)?);
    let mut postings = Vec::with_capacity(term_count.min(1 << 20) as usize);
    let mut last_term: Option<TermId> = None;
    for _ in 0..term_count {
        let term_id = u64::from_le_bytes(take_bytes::<8>(payload, &mut pos)?);
        if last_term.is_some_and(|last| last >= term_id) {
            return Err(MagnetarError::CorruptSnapshot(
                "posting terms out of order".to_string(),
            ));
        }
        last_term = Some(term_id);

        let posting_len = u32::from_le_bytes(take_bytes::<4>(payload, &mut pos)?);
        let mut entries = Vec::with_capacity(posting_len.min(1 << 20) as usize);
        let mut last_doc: Option<DocId> = None;
        for _ in 0..posting_len {
            let doc_id = u64::from_le_bytes(take_bytes::<8>(payload, &mut pos)?);
            let weight = f32::from_le_bytes(take_bytes::<4>(payload, &mut pos)?);
            if last_doc.is_some_and(|last| last >= doc_id) {
                return Err(MagnetarError::CorruptSnapshot(
                    "posting docs out of order".to_string(),
                ));
            }
            last_doc = Some(doc_id);
            entries.push((doc_id, weight));
        }
        postings.push((term_id, entries));
    }

    let expire_count = u64::from_le_bytes(take_bytes::<8>(payload, &mut pos)?);
    let mut expires = Vec::with_capacity(expire_count.min(1 << 20) as usize);
    let mut last_key: Option<(TermId, DocId)> = None;
    for _ in 0..expire_count {
        let term_id = u64::from_le_bytes(take_bytes::<8>(payload, &mut pos)?);
        let doc_id = u64::from_le_bytes(take_bytes::<8>(payload, &mut pos)?);
        let expire_time =
            ExpireTime::from_le_bytes(take_bytes::<4>(payload, &mut pos)?);
        if last_key.is_some_and(|last| last >= (term_id, doc_id)) {
            return Err(MagnetarError::CorruptSnapshot(
                "expire records out of order".to_string(),
            ));
        }
        last_key = Some((term_id, doc_id));
        expires.push(ExpireEntry {
            term_id,
            doc_id,
            expire_time,
        });
    }

    if pos != payload.len() {
        return Err(MagnetarError::CorruptSnapshot(
            "trailing bytes after expire section".to_string(),
        ));
    }

    Ok(SnapshotData { postings, expires })
}

fn take_bytes<const N: usize>(data: &[u8], pos: &mut usize) -> Result<[u8; N]> {
    let end = pos
        .checked_add(N)
        .filter(|&end| end <= data.len())
        .ok_or_else(|| MagnetarError::CorruptSnapshot("truncated record".to_string()))?;
    let mut bytes = [0u8; N];
    bytes.copy_from_slice(&data[*pos..end]);
    *pos = end;
    Ok(bytes)
}
