// Grid layout domain model
use serde::{Deserialize, Serialize};

pub const DEFAULT_GRID_COLS: u32 = 12;

/// Position and size of a widget in grid cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridLayout {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

impl GridLayout {
    pub fn new(x: u32, y: u32, w: u32, h: u32) -> Self {
        Self { x, y, w, h }
    }

    /// Row index just below this layout.
    pub fn bottom(&self) -> u32 {
        self.y.saturating_add(self.h)
    }

    /// Whether the layout satisfies `w >= 1, h >= 1, x + w <= grid_cols`.
    pub fn fits(&self, grid_cols: u32) -> bool {
        self.w >= 1 && self.h >= 1 && self.x.saturating_add(self.w) <= grid_cols
    }
}

impl Default for GridLayout {
    fn default() -> Self {
        Self::new(0, 0, 4, 3)
    }
}
