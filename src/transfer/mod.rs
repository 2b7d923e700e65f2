mod receiver;
mod sender;
mod store;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use image::RgbImage;
use imageproc::rect::Rect;

pub use receiver::Receiver;
pub use sender::Sender;
pub use store::{AssemblyReport, ChunkStore, Recorded, StoreSnapshot};

use crate::grid::ErrorLevel;

// Collaborator interfaces
//------------------------------------------------------------------------------

/// Sender-side display surface; typically a UI image widget.
pub trait FrameDisplay {
    fn show(&mut self, frame: &RgbImage);
}

/// Receiver-side screen grab. `None` means no frame this cycle; the capture
/// loop treats any failure that way and simply polls again.
pub trait ScreenCapture {
    fn capture_region(&mut self, region: Rect) -> Option<RgbImage>;
    fn capture_full_screen(&mut self) -> Option<RgbImage>;
}

// Configuration
//------------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferConfig {
    /// Payload bytes per chunk.
    pub chunk_size: usize,
    /// Extra copies transmitted per chunk.
    pub redundancy: u8,
    /// Sender dwell time per displayed frame.
    pub refresh_interval: Duration,
    /// Receiver poll period.
    pub capture_interval: Duration,
    /// Square canvas edge, in pixels.
    pub canvas_size: u32,
    /// White border around the grid, in cells.
    pub border_size: usize,
    pub error_level: ErrorLevel,
    /// Cell size the locator assumes when it has to fall back.
    pub assumed_cell_size: u32,
    /// Reed-Solomon parity symbols per frame; `None` transmits bare frames.
    pub parity: Option<usize>,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            chunk_size: 100,
            redundancy: 1,
            refresh_interval: Duration::from_secs(2),
            capture_interval: Duration::from_millis(500),
            canvas_size: 400,
            border_size: 1,
            error_level: ErrorLevel::Low,
            assumed_cell_size: 20,
            parity: None,
        }
    }
}

// Cancellation
//------------------------------------------------------------------------------

/// Cooperative stop flag shared between a transfer loop and its controller.
/// Loops check it once per iteration; an in-progress sleep is not interrupted,
/// so stop latency is bounded by the loop interval.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}
