use image::{Rgb, RgbImage};
use imageproc::drawing::draw_filled_rect_mut;
use imageproc::rect::Rect;

use super::{Block, GridEncoder};

const WHITE: Rgb<u8> = Rgb([255, 255, 255]);

// Rasterization
//------------------------------------------------------------------------------

impl GridEncoder {
    /// Rasterizes the blocks onto a fixed canvas: each cell becomes a solid
    /// square of `width / (grid_width + 2 * border)` pixels, and the border
    /// band around the data cells is left white so a locator can separate
    /// grid from background.
    pub fn create_image(&self, blocks: &[Block], width: u32, height: u32) -> RgbImage {
        let cfg = self.config();
        debug_assert_eq!(blocks.len(), cfg.width * cfg.height, "block count mismatch");

        let span = (cfg.width + 2 * cfg.border_size) as u32;
        let cell_px = width / span;
        assert!(cell_px > 0, "canvas too small for the configured grid");

        let mut img = RgbImage::from_pixel(width, height, WHITE);
        for y in 0..cfg.height {
            for x in 0..cfg.width {
                let block = blocks[y * cfg.width + x];
                let sx = (x + cfg.border_size) as i32 * cell_px as i32;
                let sy = (y + cfg.border_size) as i32 * cell_px as i32;
                draw_filled_rect_mut(
                    &mut img,
                    Rect::at(sx, sy).of_size(cell_px, cell_px),
                    Rgb([block.r, block.g, block.b]),
                );
            }
        }
        img
    }
}
