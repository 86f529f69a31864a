//! Display-dependent geometry: plot rectangle and band count.

use crate::util::audio::power_to_db;

pub const DEFAULT_SURFACE: (u32, u32) = (1280, 720);

pub const BAR_PIXEL_WIDTH: u32 = 4;
pub const BAR_GAP: u32 = 1;
pub const MIN_BANDS: usize = 2;

const MARGIN_LEFT: u32 = 60;
const MARGIN_RIGHT: u32 = 20;
const MARGIN_TOP: u32 = 64;
const MARGIN_BOTTOM: u32 = 48;
const MIN_PLOT_EXTENT: u32 = 10;

pub const DB_TOP: f32 = 0.0;
pub const DB_BOTTOM: f32 = -60.0;
pub const DB_OFFSET: f32 = 16.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlotRect {
    pub left: u32,
    pub top: u32,
    pub width: u32,
    pub height: u32,
}

impl PlotRect {
    /// Plot area inside a drawing surface of the given size, after margins.
    pub fn for_surface(width: u32, height: u32) -> Self {
        Self {
            left: MARGIN_LEFT,
            top: MARGIN_TOP,
            width: width
                .saturating_sub(MARGIN_LEFT + MARGIN_RIGHT)
                .max(MIN_PLOT_EXTENT),
            height: height
                .saturating_sub(MARGIN_TOP + MARGIN_BOTTOM)
                .max(MIN_PLOT_EXTENT),
        }
    }

    pub fn band_count(&self) -> usize {
        band_count_for_width(self.width)
    }
}

pub fn band_count_for_width(width: u32) -> usize {
    ((width / (BAR_PIXEL_WIDTH + BAR_GAP)) as usize).max(MIN_BANDS)
}

/// Bar height as a fraction of the plot for a band power.
pub fn display_fraction(power: f32) -> f32 {
    let db = (power_to_db(power, DB_BOTTOM - DB_OFFSET) + DB_OFFSET).clamp(DB_BOTTOM, DB_TOP);
    (db - DB_BOTTOM) / (DB_TOP - DB_BOTTOM)
}
