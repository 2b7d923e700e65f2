use image::{Rgb, RgbImage};
use imageproc::rect::Rect;

// Grid locator heuristics
//------------------------------------------------------------------------------
//
// Estimates where a color grid sits inside a captured frame and how many
// cells it spans, with no cooperative signalling from the sender. Everything
// here is best-effort: a caller that gets nothing usable skips the frame and
// waits for the next capture.

// Coarse sampling stride for region detection
const SAMPLE_STRIDE: u32 = 10;
// A channel below this is "measurably below full intensity"
const WHITE_FLOOR: u8 = 250;
// Minimum fraction of sampled pixels that must be non-white
const MIN_COVERAGE: f64 = 0.1;
// Padding added around the detected bounding box, in pixels
const REGION_PADDING: u32 = 20;
// Luminance gradient between adjacent pixels that counts as an edge
const EDGE_THRESHOLD: i32 = 128;

/// Bounding region of non-white content, grown by a fixed padding margin and
/// clamped to the image. `None` when fewer than 10% of the sampled pixels are
/// non-white, which reads as "no grid present".
pub fn detect_region(img: &RgbImage) -> Option<Rect> {
    let (w, h) = img.dimensions();

    let mut min_x = w;
    let mut min_y = h;
    let mut max_x = 0u32;
    let mut max_y = 0u32;
    let mut non_white = 0u64;
    let mut total = 0u64;

    for y in (0..h).step_by(SAMPLE_STRIDE as usize) {
        for x in (0..w).step_by(SAMPLE_STRIDE as usize) {
            total += 1;
            let px = img.get_pixel(x, y);
            if px.0.iter().any(|&c| c < WHITE_FLOOR) {
                non_white += 1;
                min_x = min_x.min(x);
                min_y = min_y.min(y);
                max_x = max_x.max(x);
                max_y = max_y.max(y);
            }
        }
    }

    if total == 0 || non_white == 0 || (non_white as f64 / total as f64) < MIN_COVERAGE {
        return None;
    }

    let x0 = min_x.saturating_sub(REGION_PADDING);
    let y0 = min_y.saturating_sub(REGION_PADDING);
    let x1 = (max_x + REGION_PADDING).min(w - 1);
    let y1 = (max_y + REGION_PADDING).min(h - 1);
    Some(Rect::at(x0 as i32, y0 as i32).of_size(x1 - x0 + 1, y1 - y0 + 1))
}

/// Counts rows and columns that look like grid lines: scanlines where the
/// number of strong luminance edges between adjacent pixels exceeds a quarter
/// of the scanned span.
pub fn find_grid_lines(img: &RgbImage) -> (u32, u32) {
    let (w, h) = img.dimensions();
    let mut rows = 0u32;
    let mut cols = 0u32;

    for y in 0..h {
        let mut edges = 0u32;
        for x in 0..w.saturating_sub(1) {
            if luminance_step(img.get_pixel(x, y), img.get_pixel(x + 1, y)) > EDGE_THRESHOLD {
                edges += 1;
            }
        }
        if edges > w / 4 {
            rows += 1;
        }
    }

    for x in 0..w {
        let mut edges = 0u32;
        for y in 0..h.saturating_sub(1) {
            if luminance_step(img.get_pixel(x, y), img.get_pixel(x, y + 1)) > EDGE_THRESHOLD {
                edges += 1;
            }
        }
        if edges > h / 4 {
            cols += 1;
        }
    }

    (rows, cols)
}

fn luminance_step(a: &Rgb<u8>, b: &Rgb<u8>) -> i32 {
    let la = (a[0] as i32 + a[1] as i32 + a[2] as i32) / 3;
    let lb = (b[0] as i32 + b[1] as i32 + b[2] as i32) / 3;
    (la - lb).abs()
}

/// Estimates the grid dimensions as `(width, height)` in cells. Region
/// detection runs first; without a region the whole frame divided by the
/// assumed cell size is the estimate, and without usable grid lines the
/// detected region divided by the assumed cell size is. Both dimensions are
/// forced odd to match the encoder's sizing convention. `None` means no
/// usable signal at all and the caller should skip this frame.
pub fn estimate_grid_size(img: &RgbImage, assumed_cell_size: u32) -> Option<(u32, u32)> {
    debug_assert!(assumed_cell_size > 0, "assumed cell size must be positive");
    let (w, h) = img.dimensions();

    let (mut cols, mut rows) = match detect_region(img) {
        None => (w / assumed_cell_size, h / assumed_cell_size),
        Some(region) => {
            let (line_rows, line_cols) = find_grid_lines(img);
            if line_rows == 0 || line_cols == 0 {
                (region.width() / assumed_cell_size, region.height() / assumed_cell_size)
            } else {
                (line_cols, line_rows)
            }
        }
    };

    if cols == 0 || rows == 0 {
        return None;
    }
    if cols % 2 == 0 {
        cols += 1;
    }
    if rows % 2 == 0 {
        rows += 1;
    }
    Some((cols, rows))
}
