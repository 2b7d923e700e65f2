use std::io::{ErrorKind, Read};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

// Wire frame layout
//------------------------------------------------------------------------------

/// Fixed header: index, total and payload length, 4 bytes each, big-endian.
pub const HEADER_LEN: usize = 12;
/// Width of the blake3 digest carried after the payload.
pub const CHECKSUM_LEN: usize = blake3::OUT_LEN;
/// Big-endian nanosecond timestamp trailing the frame.
pub const TIMESTAMP_LEN: usize = 8;
/// Smallest well-formed frame: empty payload plus header and footer.
pub const MIN_FRAME_LEN: usize = HEADER_LEN + CHECKSUM_LEN + TIMESTAMP_LEN;

// Chunk
//------------------------------------------------------------------------------

/// One transmission unit. Immutable once created; redundant copies of the
/// same index share payload and checksum but carry distinct timestamps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub index: u32,
    pub total: u32,
    pub data: Vec<u8>,
    pub checksum: [u8; CHECKSUM_LEN],
    pub timestamp: u64,
}

/// Recomputes the payload digest and compares it against the carried checksum.
pub fn verify_chunk(chunk: &Chunk) -> bool {
    *blake3::hash(&chunk.data).as_bytes() == chunk.checksum
}

// File metadata
//------------------------------------------------------------------------------

/// Describes the file under transfer. Built once when the file is selected
/// and transmitted as the first frame, ahead of every data chunk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMetadata {
    pub filename: String,
    pub file_size: u64,
    pub chunk_size: u32,
    pub total_chunks: u32,
    pub checksum: [u8; CHECKSUM_LEN],
    pub timestamp: u64,
    pub redundancy: u8,
}

impl FileMetadata {
    /// Metadata for an in-memory file image, including the whole-file digest.
    pub fn describe(filename: &str, contents: &[u8], chunk_size: u32, redundancy: u8) -> Self {
        let total_chunks = (contents.len() as u64).div_ceil(chunk_size as u64) as u32;
        Self {
            filename: filename.to_owned(),
            file_size: contents.len() as u64,
            chunk_size,
            total_chunks,
            checksum: *blake3::hash(contents).as_bytes(),
            timestamp: unix_nanos(),
            redundancy,
        }
    }
}

fn unix_nanos() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_nanos() as u64).unwrap_or(0)
}

// Progress
//------------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Progress {
    pub received_chunks: u32,
    pub total_chunks: u32,
    pub bytes_received: u64,
    pub percent_complete: f64,
}

impl Progress {
    pub fn calculate(received: u32, total: u32, bytes_received: u64, file_size: u64) -> Self {
        let percent_complete = if file_size > 0 {
            bytes_received as f64 / file_size as f64 * 100.0
        } else {
            0.0
        };
        Self { received_chunks: received, total_chunks: total, bytes_received, percent_complete }
    }
}

// Framer
//------------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FramerConfig {
    /// Payload bytes per chunk; the final chunk may be shorter.
    pub chunk_size: usize,
    /// Extra copies of every chunk beyond the primary.
    pub redundancy: u8,
}

impl Default for FramerConfig {
    fn default() -> Self {
        Self { chunk_size: 100, redundancy: 1 }
    }
}

/// Splits a byte source into checksummed chunks and maps chunks to and from
/// their wire frames.
#[derive(Debug, Clone, Copy, Default)]
pub struct Framer {
    config: FramerConfig,
}

impl Framer {
    pub fn new(config: FramerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> FramerConfig {
        self.config
    }

    /// Lazily reads `reader` in chunk-size windows, yielding one group per
    /// chunk: the primary followed by `redundancy` copies whose timestamps
    /// are offset by the copy number.
    pub fn chunk_groups<R: Read>(&self, reader: R, metadata: &FileMetadata) -> ChunkGroups<R> {
        ChunkGroups {
            reader,
            chunk_size: self.config.chunk_size,
            redundancy: self.config.redundancy,
            total: metadata.total_chunks,
            base_timestamp: metadata.timestamp,
            index: 0,
            done: false,
        }
    }

    /// Fixed-layout wire frame: header, payload, digest, timestamp.
    pub fn serialize_chunk(&self, chunk: &Chunk) -> Vec<u8> {
        let mut frame = Vec::with_capacity(MIN_FRAME_LEN + chunk.data.len());
        frame.extend_from_slice(&chunk.index.to_be_bytes());
        frame.extend_from_slice(&chunk.total.to_be_bytes());
        frame.extend_from_slice(&(chunk.data.len() as u32).to_be_bytes());
        frame.extend_from_slice(&chunk.data);
        frame.extend_from_slice(&chunk.checksum);
        frame.extend_from_slice(&chunk.timestamp.to_be_bytes());
        frame
    }

    /// Inverse of [`serialize_chunk`](Self::serialize_chunk). Trailing bytes
    /// beyond the declared frame are ignored, which lets callers hand over
    /// grid buffers that still carry cell padding.
    pub fn deserialize_chunk(&self, bytes: &[u8]) -> Result<Chunk> {
        if bytes.len() < MIN_FRAME_LEN {
            return Err(Error::ShortBuffer);
        }

        let index = u32::from_be_bytes(bytes[0..4].try_into().unwrap());
        let total = u32::from_be_bytes(bytes[4..8].try_into().unwrap());
        let payload_len = u32::from_be_bytes(bytes[8..12].try_into().unwrap()) as usize;

        let expected = HEADER_LEN + payload_len + CHECKSUM_LEN + TIMESTAMP_LEN;
        if bytes.len() < expected {
            return Err(Error::ShortBuffer);
        }

        let data = bytes[HEADER_LEN..HEADER_LEN + payload_len].to_vec();
        let checksum_end = HEADER_LEN + payload_len + CHECKSUM_LEN;
        let checksum = bytes[HEADER_LEN + payload_len..checksum_end].try_into().unwrap();
        let timestamp =
            u64::from_be_bytes(bytes[checksum_end..checksum_end + TIMESTAMP_LEN].try_into().unwrap());

        Ok(Chunk { index, total, data, checksum, timestamp })
    }

    /// Self-describing key-value document; round-trips exactly.
    pub fn serialize_metadata(&self, metadata: &FileMetadata) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(metadata)?)
    }

    pub fn deserialize_metadata(&self, bytes: &[u8]) -> Result<FileMetadata> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// The metadata frame transmitted ahead of the data chunks: index 0 and
    /// a total one past the data chunk count, which together with the
    /// self-describing payload distinguishes it from data chunk 0.
    pub fn metadata_chunk(&self, metadata: &FileMetadata) -> Result<Chunk> {
        let payload = self.serialize_metadata(metadata)?;
        let checksum = *blake3::hash(&payload).as_bytes();
        Ok(Chunk {
            index: 0,
            total: metadata.total_chunks + 1,
            data: payload,
            checksum,
            timestamp: metadata.timestamp,
        })
    }
}

// Chunk group iterator
//------------------------------------------------------------------------------

pub struct ChunkGroups<R> {
    reader: R,
    chunk_size: usize,
    redundancy: u8,
    total: u32,
    base_timestamp: u64,
    index: u32,
    done: bool,
}

impl<R: Read> ChunkGroups<R> {
    // Reads until the window is full or the source ends
    fn fill_window(&mut self, buf: &mut Vec<u8>) -> Result<usize> {
        let mut filled = 0;
        while filled < self.chunk_size {
            match self.reader.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Ok(filled)
    }
}

impl<R: Read> Iterator for ChunkGroups<R> {
    type Item = Result<Vec<Chunk>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let mut buf = vec![0u8; self.chunk_size];
        let filled = match self.fill_window(&mut buf) {
            Ok(n) => n,
            Err(e) => {
                self.done = true;
                return Some(Err(e));
            }
        };
        if filled == 0 {
            self.done = true;
            return None;
        }
        buf.truncate(filled);

        let checksum = *blake3::hash(&buf).as_bytes();
        let group: Vec<Chunk> = (0..=self.redundancy as u64)
            .map(|copy| Chunk {
                index: self.index,
                total: self.total,
                data: buf.clone(),
                checksum,
                timestamp: self.base_timestamp + copy,
            })
            .collect();

        self.index += 1;
        Some(Ok(group))
    }
}
