mod render;

use image::RgbImage;

use crate::error::{Error, Result};

// Error correction level
//------------------------------------------------------------------------------

/// Bit depth traded against capture noise: fewer bits per channel spread the
/// quantization levels further apart and survive a noisier channel.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum ErrorLevel {
    /// 8 bits per channel; lossless round-trip.
    #[default]
    Low,
    /// 6 bits per channel.
    Medium,
    /// 4 bits per channel.
    High,
}

impl ErrorLevel {
    pub fn bits_per_channel(self) -> u32 {
        match self {
            Self::Low => 8,
            Self::Medium => 6,
            Self::High => 4,
        }
    }

    fn mask(self) -> u32 {
        (1 << self.bits_per_channel()) - 1
    }
}

// Block
//------------------------------------------------------------------------------

/// One grid cell's quantized color sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Block {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

// Grid configuration
//------------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridConfig {
    /// Data cells per row.
    pub width: usize,
    /// Data cell rows.
    pub height: usize,
    /// White frame around the data cells, in cells.
    pub border_size: usize,
    pub error_level: ErrorLevel,
}

impl GridConfig {
    pub fn new(width: usize, height: usize, border_size: usize, error_level: ErrorLevel) -> Self {
        Self { width, height, border_size, error_level }
    }

    /// Bytes the grid can carry: three channels per cell.
    pub fn capacity(&self) -> usize {
        self.width * self.height * 3
    }
}

/// Smallest odd square grid able to carry `data_size` bytes. The odd side
/// gives the rendered grid a symmetric center the locator heuristics can key
/// on. Both dimensions are always equal.
pub fn optimal_grid_size(data_size: usize) -> (usize, usize) {
    let cells = data_size.div_ceil(3);
    let mut side = (cells as f64).sqrt() as usize;
    while side * side < cells {
        side += 1;
    }
    if side % 2 == 0 {
        side += 1;
    }
    (side, side)
}

// Quantization
//------------------------------------------------------------------------------

// Truncate to the configured depth, then rescale across the full 0-255 range
// so adjacent levels sit as far apart as the depth allows
fn quantize(value: u8, level: ErrorLevel) -> u8 {
    let bits = level.bits_per_channel();
    let q = (value as u32) >> (8 - bits);
    (q * 255 / level.mask()) as u8
}

// Invert the rescale. Rounding (rather than flooring) keeps a cleanly
// captured level from landing one step low; the top level clamps to 255
fn dequantize(value: u8, level: ErrorLevel) -> u8 {
    let bits = level.bits_per_channel();
    let mask = level.mask();
    let q = (value as u32 * mask + 127) / 255;
    if q >= mask {
        255
    } else {
        (q << (8 - bits)) as u8
    }
}

// Encoder
//------------------------------------------------------------------------------

/// Packs a byte stream into a grid of quantized color cells, three bytes per
/// cell in R, G, B order.
#[derive(Debug, Clone, Copy)]
pub struct GridEncoder {
    config: GridConfig,
}

impl GridEncoder {
    pub fn new(config: GridConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> GridConfig {
        self.config
    }

    /// Cells beyond the data length are zero-filled.
    pub fn encode(&self, data: &[u8]) -> Result<Vec<Block>> {
        if data.len() > self.config.capacity() {
            return Err(Error::GridOverflow);
        }

        let level = self.config.error_level;
        let cells = self.config.width * self.config.height;
        let mut blocks = Vec::with_capacity(cells);
        for cell in 0..cells {
            let channel = |offset: usize| data.get(cell * 3 + offset).copied().unwrap_or(0);
            blocks.push(Block {
                r: quantize(channel(0), level),
                g: quantize(channel(1), level),
                b: quantize(channel(2), level),
            });
        }
        Ok(blocks)
    }
}

// Decoder
//------------------------------------------------------------------------------

/// Samples a captured grid image back into cell blocks and flattens them to
/// bytes.
#[derive(Debug, Clone, Copy)]
pub struct GridDecoder {
    config: GridConfig,
}

impl GridDecoder {
    pub fn new(config: GridConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> GridConfig {
        self.config
    }

    /// Samples each expected cell at its center pixel, which tolerates minor
    /// misalignment at the cell edges, and undoes the encoder's rescale.
    pub fn decode(&self, img: &RgbImage) -> Result<Vec<Block>> {
        let cfg = self.config;
        let span = (cfg.width + 2 * cfg.border_size) as u32;
        let cell_px = img.width() / span;
        if cell_px == 0 {
            return Err(Error::NoGridDetected);
        }

        let level = cfg.error_level;
        let mut blocks = Vec::with_capacity(cfg.width * cfg.height);
        for y in 0..cfg.height {
            for x in 0..cfg.width {
                let cx = ((x + cfg.border_size) as u32 * cell_px + cell_px / 2).min(img.width() - 1);
                let cy =
                    ((y + cfg.border_size) as u32 * cell_px + cell_px / 2).min(img.height() - 1);
                let pixel = img.get_pixel(cx, cy);
                blocks.push(Block {
                    r: dequantize(pixel[0], level),
                    g: dequantize(pixel[1], level),
                    b: dequantize(pixel[2], level),
                });
            }
        }
        Ok(blocks)
    }

    /// Flattens every cell's channels back into a byte sequence, padding
    /// included; the caller trims to the known payload length.
    pub fn blocks_to_data(&self, blocks: &[Block]) -> Vec<u8> {
        let mut data = Vec::with_capacity(blocks.len() * 3);
        for block in blocks {
            data.push(block.r);
            data.push(block.g);
            data.push(block.b);
        }
        data
    }
}
