// Geometry engine - Pixel deltas to grid cells and bounds-safe layouts
use crate::domain::layout::GridLayout;

/// Convert a pointer delta to a whole number of cells, rounding to nearest
/// so that moves under half a cell snap back to the origin.
pub fn pixels_to_cells(delta_px: f64, cell_size_px: f64) -> i64 {
    if !delta_px.is_finite() || !cell_size_px.is_finite() || cell_size_px <= 0.0 {
        return 0;
    }
    (delta_px / cell_size_px).round() as i64
}

/// Horizontal pitch of one column including the gap after it.
pub fn cell_size(container_width_px: f64, cols: u32, gap_px: f64) -> f64 {
    let cols = cols.max(1) as f64;
    let usable = (container_width_px - gap_px * (cols - 1.0)).max(0.0);
    usable / cols + gap_px
}

/// Translate a layout by (dx, dy) cells, keeping it inside the grid.
pub fn clamp_move(orig: GridLayout, dx: i64, dy: i64, grid_cols: u32) -> GridLayout {
    let base = normalize(orig, grid_cols);
    let max_x = (grid_cols.max(1) - base.w) as i64;
    GridLayout {
        x: (base.x as i64).saturating_add(dx).clamp(0, max_x) as u32,
        y: to_cells((base.y as i64).saturating_add(dy), 0),
        ..base
    }
}

/// Grow or shrink a layout by (dw, dh) cells, anchored at its top-left corner.
/// The origin only moves when it lies outside the grid.
pub fn clamp_resize(orig: GridLayout, dw: i64, dh: i64, grid_cols: u32) -> GridLayout {
    let cols = grid_cols.max(1);
    let x = orig.x.min(cols - 1);
    let max_w = (cols - x) as i64;
    GridLayout {
        x,
        y: orig.y,
        w: (orig.w as i64).saturating_add(dw).clamp(1, max_w) as u32,
        h: to_cells((orig.h as i64).saturating_add(dh), 1),
    }
}

fn to_cells(value: i64, min: i64) -> u32 {
    value.clamp(min, u32::MAX as i64) as u32
}

/// Force an arbitrary (e.g. persisted) layout to satisfy the grid invariant.
/// Width is capped first, then x is pulled left until the widget fits.
pub fn normalize(layout: GridLayout, grid_cols: u32) -> GridLayout {
    let cols = grid_cols.max(1);
    let w = layout.w.clamp(1, cols);
    GridLayout {
        x: layout.x.min(cols - w),
        y: layout.y,
        w,
        h: layout.h.max(1),
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelRect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

/// Pixel pitches for the current container size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridMetrics {
    pub cols: u32,
    pub gap_px: f64,
    pub col_step_px: f64,
    pub row_step_px: f64,
}

impl GridMetrics {
    pub fn new(container_width_px: f64, cols: u32, gap_px: f64, row_height_px: f64) -> Self {
        Self {
            cols: cols.max(1),
            gap_px,
            col_step_px: cell_size(container_width_px, cols, gap_px),
            row_step_px: row_height_px + gap_px,
        }
    }

    /// Pointer delta in pixels to a cell delta on both axes.
    pub fn delta_cells(&self, dx_px: f64, dy_px: f64) -> (i64, i64) {
        (
            pixels_to_cells(dx_px, self.col_step_px),
            pixels_to_cells(dy_px, self.row_step_px),
        )
    }

    pub fn to_pixels(&self, layout: GridLayout) -> PixelRect {
        PixelRect {
            left: layout.x as f64 * self.col_step_px,
            top: layout.y as f64 * self.row_step_px,
            width: (layout.w as f64 * self.col_step_px - self.gap_px).max(0.0),
            height: (layout.h as f64 * self.row_step_px - self.gap_px).max(0.0),
        }
    }
}
