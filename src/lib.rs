//! # chromaport
//!
//! A Rust library for moving files across an air gap: the sender turns file
//! bytes into a sequence of color-block images shown on a screen, and the
//! receiver recovers them from captures of that screen. No cable, no network,
//! no cooperation between the two machines beyond pointing a capture at a
//! display.
//!
//! ## Features
//!
//! - **Chunk framing**: files split into checksummed, position-tagged chunks
//!   with redundant copies to survive missed captures
//! - **Color-grid codec**: bytes packed three per cell into quantized RGB
//!   grids, with bit depth traded against capture noise
//! - **Reed-Solomon error correction**: optional parity layer that corrects
//!   symbol errors introduced by the capture channel
//! - **Grid locating**: heuristics that find and size the grid inside a
//!   noisy captured frame without any sender-side signalling
//!
//! ## Encoding and decoding a grid
//!
//! ```rust
//! use chromaport::{optimal_grid_size, ErrorLevel, GridConfig, GridDecoder, GridEncoder};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let data = b"hello across the air gap".to_vec();
//! let (w, h) = optimal_grid_size(data.len());
//! let config = GridConfig::new(w, h, 1, ErrorLevel::Low);
//!
//! let encoder = GridEncoder::new(config);
//! let blocks = encoder.encode(&data)?;
//! let img = encoder.create_image(&blocks, 400, 400);
//!
//! let decoder = GridDecoder::new(config);
//! let mut bytes = decoder.blocks_to_data(&decoder.decode(&img)?);
//! bytes.truncate(data.len());
//! assert_eq!(bytes, data);
//! # Ok(())
//! # }
//! ```
//!
//! ## Correcting capture errors
//!
//! ```rust
//! use chromaport::ReedSolomon;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let rs = ReedSolomon::new(8, 1, 1, 16);
//! let mut received = rs.encode(b"message")?;
//! received[3] ^= 0x5a;
//! assert_eq!(rs.decode(&received, &[])?, b"message");
//! # Ok(())
//! # }
//! ```
//!
//! ## Driving a transfer
//!
//! ```rust
//! use chromaport::{Sender, TransferConfig};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let sender = Sender::from_bytes("notes.txt", b"file contents", TransferConfig::default())?;
//! for seq in 0..sender.frame_count() {
//!     let image = sender.frame_image(seq)?;
//!     // hand `image` to the display surface
//! }
//! # Ok(())
//! # }
//! ```
//!
//! The receiving side runs [`Receiver::run`] against a [`ScreenCapture`]
//! implementation; every captured frame that survives the locate, decode and
//! verify pipeline lands in a shared [`ChunkStore`], and
//! [`StoreSnapshot::assemble`] writes the reconstructed file whenever the
//! user asks, reporting any still-missing chunks.

pub mod chunk;
pub mod ec;
pub mod error;
pub mod grid;
pub mod locator;
pub mod transfer;

pub use chunk::{verify_chunk, Chunk, FileMetadata, Framer, FramerConfig, Progress};
pub use ec::ReedSolomon;
pub use error::{Error, Result};
pub use grid::{optimal_grid_size, Block, ErrorLevel, GridConfig, GridDecoder, GridEncoder};
pub use locator::{detect_region, estimate_grid_size, find_grid_lines};
pub use transfer::{
    AssemblyReport, CancelFlag, ChunkStore, FrameDisplay, Receiver, Recorded, ScreenCapture,
    Sender, StoreSnapshot, TransferConfig,
};
