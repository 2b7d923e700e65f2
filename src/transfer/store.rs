use std::collections::HashMap;
use std::io::Write;
use std::sync::Mutex;

use tracing::{debug, warn};

use crate::chunk::{verify_chunk, Chunk, FileMetadata, Framer, Progress};
use crate::error::{Error, Result};

// Received-chunk table
//------------------------------------------------------------------------------

/// Outcome of recording one captured frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recorded {
    Metadata,
    /// Metadata frame seen again after the first; nothing changed.
    MetadataDuplicate,
    Chunk {
        index: u32,
        copies: usize,
    },
}

#[derive(Debug, Default)]
struct StoreInner {
    metadata: Option<FileMetadata>,
    chunks: HashMap<u32, Vec<Chunk>>,
}

/// The one piece of state shared between the capture loop and file assembly.
/// Both sides go through this guard; neither ever holds a raw reference into
/// the table. The table grows monotonically; copies are appended, never
/// removed.
#[derive(Debug, Default)]
pub struct ChunkStore {
    inner: Mutex<StoreInner>,
}

impl ChunkStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Verifies and files one captured frame.
    ///
    /// A frame is classified as the metadata frame structurally: index 0, a
    /// payload that parses as a metadata document, and a frame total one past
    /// the document's own chunk count. Transmission order alone is not
    /// trusted, since the receiver polls and may see frames repeated or out of
    /// order.
    pub fn record_frame(&self, chunk: Chunk) -> Result<Recorded> {
        if !verify_chunk(&chunk) {
            return Err(Error::ChecksumMismatch);
        }

        let mut inner = self.inner.lock().unwrap();

        if chunk.index == 0 {
            if let Ok(metadata) = Framer::default().deserialize_metadata(&chunk.data) {
                if metadata.total_chunks + 1 == chunk.total {
                    if inner.metadata.is_some() {
                        return Ok(Recorded::MetadataDuplicate);
                    }
                    debug!(filename = %metadata.filename, chunks = metadata.total_chunks, "metadata captured");
                    inner.metadata = Some(metadata);
                    return Ok(Recorded::Metadata);
                }
            }
        }

        let index = chunk.index;
        let copies = inner.chunks.entry(index).or_default();
        copies.push(chunk);
        Ok(Recorded::Chunk { index, copies: copies.len() })
    }

    /// Consistent copy of the table for assembly; the capture loop keeps
    /// writing to the live store while the caller works on the snapshot.
    pub fn snapshot(&self) -> StoreSnapshot {
        let inner = self.inner.lock().unwrap();
        StoreSnapshot { metadata: inner.metadata.clone(), chunks: inner.chunks.clone() }
    }

    pub fn metadata(&self) -> Option<FileMetadata> {
        self.inner.lock().unwrap().metadata.clone()
    }

    pub fn progress(&self) -> Progress {
        let inner = self.inner.lock().unwrap();
        let (total, file_size) = match &inner.metadata {
            Some(m) => (m.total_chunks, m.file_size),
            None => (0, 0),
        };
        let received = inner.chunks.len() as u32;
        let bytes: u64 = inner
            .chunks
            .values()
            .filter_map(|copies| copies.first())
            .map(|c| c.data.len() as u64)
            .sum();
        Progress::calculate(received, total, bytes, file_size)
    }
}

// Assembly
//------------------------------------------------------------------------------

/// Immutable view of the store taken under the lock.
#[derive(Debug, Clone)]
pub struct StoreSnapshot {
    pub metadata: Option<FileMetadata>,
    chunks: HashMap<u32, Vec<Chunk>>,
}

impl StoreSnapshot {
    pub fn copies(&self, index: u32) -> &[Chunk] {
        self.chunks.get(&index).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Writes every recoverable chunk in index order. Indices with no valid
    /// copy are skipped and reported as missing, a warning-grade outcome,
    /// not a failure; whatever was written stays written. With nothing
    /// missing, the whole-file digest is checked against the metadata.
    pub fn assemble<W: Write>(&self, writer: &mut W) -> Result<AssemblyReport> {
        let metadata =
            self.metadata.as_ref().ok_or_else(|| Error::Metadata("no metadata captured".into()))?;

        let mut missing = Vec::new();
        let mut bytes_written = 0u64;
        let mut hasher = blake3::Hasher::new();

        for index in 0..metadata.total_chunks {
            let copies = self.copies(index);
            // Redundant copies share payloads; any verified copy will do,
            // and a corrupted one is never chosen while a valid one exists
            match copies.iter().find(|c| verify_chunk(c)) {
                Some(chunk) => {
                    writer.write_all(&chunk.data)?;
                    hasher.update(&chunk.data);
                    bytes_written += chunk.data.len() as u64;
                }
                None => missing.push(index),
            }
        }

        let file_checksum_ok = if missing.is_empty() {
            Some(*hasher.finalize().as_bytes() == metadata.checksum)
        } else {
            warn!(missing = missing.len(), "assembled file has missing chunks");
            None
        };

        Ok(AssemblyReport { missing, bytes_written, file_checksum_ok })
    }
}

/// What assembly managed to reconstruct.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssemblyReport {
    /// Indices with no usable copy, in ascending order.
    pub missing: Vec<u32>,
    pub bytes_written: u64,
    /// Whole-file digest comparison; `None` while chunks are missing.
    pub file_checksum_ok: Option<bool>,
}

impl AssemblyReport {
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }
}
