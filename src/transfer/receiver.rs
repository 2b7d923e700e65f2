use std::sync::Arc;
use std::thread;

use image::RgbImage;
use imageproc::rect::Rect;
use tracing::{debug, info, trace};

use super::{CancelFlag, ChunkStore, Recorded, ScreenCapture, TransferConfig};
use crate::chunk::Framer;
use crate::ec::{ReedSolomon, TRANSFER_SYMBOL_SIZE};
use crate::error::{Error, Result};
use crate::grid::{GridConfig, GridDecoder};
use crate::locator::estimate_grid_size;

// Receiver
//------------------------------------------------------------------------------

/// Polls the capture collaborator and funnels every decodable frame into the
/// shared chunk store. Each iteration is independent: any failure along the
/// capture, locate, decode and verify pipeline skips the frame and waits for
/// the next cycle. Nothing is retried synchronously and nothing blocks
/// indefinitely.
pub struct Receiver<C: ScreenCapture> {
    config: TransferConfig,
    store: Arc<ChunkStore>,
    capture: C,
    target_region: Option<Rect>,
    framer: Framer,
    rs: Option<ReedSolomon>,
    cancel: CancelFlag,
}

impl<C: ScreenCapture> Receiver<C> {
    pub fn new(capture: C, store: Arc<ChunkStore>, config: TransferConfig) -> Self {
        let rs = config.parity.map(|r| ReedSolomon::new(TRANSFER_SYMBOL_SIZE, 1, 1, r));
        Self {
            config,
            store,
            capture,
            target_region: None,
            framer: Framer::default(),
            rs,
            cancel: CancelFlag::new(),
        }
    }

    /// Restricts capture to a known screen region instead of the full screen.
    pub fn set_target_region(&mut self, region: Option<Rect>) {
        self.target_region = region;
    }

    pub fn store(&self) -> &Arc<ChunkStore> {
        &self.store
    }

    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    /// Capture loop: one grab and one decode attempt per cycle, then sleep.
    pub fn run(&mut self) {
        info!("capture loop starting");
        while !self.cancel.is_cancelled() {
            let frame = match self.target_region {
                Some(region) => self.capture.capture_region(region),
                None => self.capture.capture_full_screen(),
            };

            match frame {
                None => trace!("no frame this cycle"),
                Some(image) => match self.process_image(&image) {
                    Ok(Recorded::Metadata) => info!("metadata frame captured"),
                    Ok(Recorded::MetadataDuplicate) => trace!("metadata frame repeated"),
                    Ok(Recorded::Chunk { index, copies }) => {
                        debug!(index, copies, "chunk captured");
                    }
                    Err(err) => trace!(%err, "frame skipped"),
                },
            }

            thread::sleep(self.config.capture_interval);
        }
        info!("capture loop stopped");
    }

    /// One frame through the whole receive pipeline: locate the grid, sample
    /// it, undo the error correction layer, deserialize, verify, record.
    pub fn process_image(&self, image: &RgbImage) -> Result<Recorded> {
        let (grid_w, grid_h) = estimate_grid_size(image, self.config.assumed_cell_size)
            .ok_or(Error::NoGridDetected)?;

        let grid = GridConfig::new(
            grid_w as usize,
            grid_h as usize,
            self.config.border_size,
            self.config.error_level,
        );
        let decoder = GridDecoder::new(grid);
        let blocks = decoder.decode(image)?;
        let mut bytes = decoder.blocks_to_data(&blocks);

        if let Some(rs) = &self.rs {
            bytes.truncate(bytes.len() - bytes.len() % rs.total_size());
            bytes = rs.decode_blocks(&bytes)?;
        }

        let chunk = self.framer.deserialize_chunk(&bytes)?;
        self.store.record_frame(chunk)
    }
}
