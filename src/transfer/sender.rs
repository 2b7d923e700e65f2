use std::io::Cursor;
use std::thread;

use image::RgbImage;
use tracing::{debug, info};

use super::{CancelFlag, FrameDisplay, TransferConfig};
use crate::chunk::{Chunk, FileMetadata, Framer, FramerConfig};
use crate::ec::{ReedSolomon, TRANSFER_SYMBOL_SIZE};
use crate::error::Result;
use crate::grid::{optimal_grid_size, GridConfig, GridEncoder};

// Sender
//------------------------------------------------------------------------------

/// Turns a file into a timed sequence of color-grid frames: the metadata
/// frame first, then every chunk group's copies in order. The display loop is
/// a plain loop with a cooperative stop flag: one frame in flight, one sleep
/// per frame.
pub struct Sender {
    config: TransferConfig,
    framer: Framer,
    metadata: FileMetadata,
    groups: Vec<Vec<Chunk>>,
    rs: Option<ReedSolomon>,
    cancel: CancelFlag,
}

impl Sender {
    /// Prepares a transfer for an in-memory file image.
    pub fn from_bytes(filename: &str, contents: &[u8], config: TransferConfig) -> Result<Self> {
        let framer = Framer::new(FramerConfig {
            chunk_size: config.chunk_size,
            redundancy: config.redundancy,
        });
        let metadata = FileMetadata::describe(
            filename,
            contents,
            config.chunk_size as u32,
            config.redundancy,
        );
        let groups = framer
            .chunk_groups(Cursor::new(contents), &metadata)
            .collect::<Result<Vec<_>>>()?;
        let rs = config.parity.map(|r| ReedSolomon::new(TRANSFER_SYMBOL_SIZE, 1, 1, r));

        Ok(Self { config, framer, metadata, groups, rs, cancel: CancelFlag::new() })
    }

    pub fn metadata(&self) -> &FileMetadata {
        &self.metadata
    }

    /// Handle for stopping a running display loop from another thread.
    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    /// Frames in the full sequence, redundant copies included.
    pub fn frame_count(&self) -> usize {
        1 + self.groups.iter().map(Vec::len).sum::<usize>()
    }

    /// Wire bytes for frame `seq`: the metadata frame at 0, chunk copies
    /// after, with the error correction layer applied when configured.
    pub fn frame_bytes(&self, seq: usize) -> Result<Vec<u8>> {
        let chunk = if seq == 0 {
            self.framer.metadata_chunk(&self.metadata)?
        } else {
            let copies = self.groups[0].len();
            let group = (seq - 1) / copies;
            let copy = (seq - 1) % copies;
            self.groups[group][copy].clone()
        };

        let frame = self.framer.serialize_chunk(&chunk);
        match &self.rs {
            None => Ok(frame),
            // Full-length codewords only; the frame's own length fields make
            // the block padding invisible downstream
            Some(rs) => rs.encode_blocks(&frame),
        }
    }

    /// Renders frame `seq` onto the configured canvas, sizing the grid to
    /// fit the frame bytes.
    pub fn frame_image(&self, seq: usize) -> Result<RgbImage> {
        let bytes = self.frame_bytes(seq)?;
        let (w, h) = optimal_grid_size(bytes.len());
        let grid = GridConfig::new(w, h, self.config.border_size, self.config.error_level);
        let encoder = GridEncoder::new(grid);
        let blocks = encoder.encode(&bytes)?;
        Ok(encoder.create_image(&blocks, self.config.canvas_size, self.config.canvas_size))
    }

    /// Displays the whole frame sequence, sleeping the refresh interval
    /// between frames and checking the stop flag before each one. A
    /// serialization failure stops the loop and surfaces the error.
    pub fn run<D: FrameDisplay>(&self, display: &mut D) -> Result<()> {
        let total = self.frame_count();
        info!(
            filename = %self.metadata.filename,
            frames = total,
            chunks = self.metadata.total_chunks,
            "transfer starting"
        );

        for seq in 0..total {
            if self.cancel.is_cancelled() {
                info!(frame = seq, "transfer cancelled");
                return Ok(());
            }
            let image = self.frame_image(seq)?;
            display.show(&image);
            debug!(frame = seq, total, "frame displayed");
            thread::sleep(self.config.refresh_interval);
        }

        info!("transfer complete");
        Ok(())
    }
}
