use scenario_datatypes::raster::{ClassCode, Grid2D, GridIdx2D, GridShape2D};
use snafu::ensure;

use crate::error;
use crate::util::Result;

/// Repeats a rectangular pattern like wallpaper.
///
/// The pattern is anchored so that its pixel (0, 0) lies at offset (0, 0). A window at any other
/// offset sees the pattern shifted by `offset mod pattern shape`, so tiling adjacent windows
/// separately yields the same pixels as tiling their union.
#[derive(Debug, Clone)]
pub struct WallpaperTiler {
    pattern: Grid2D<ClassCode>,
}

impl WallpaperTiler {
    pub fn new(pattern: Grid2D<ClassCode>) -> Result<Self> {
        ensure!(pattern.shape.number_of_elements() > 0, error::EmptyPatternSnafu);

        Ok(Self { pattern })
    }

    pub fn pattern(&self) -> &Grid2D<ClassCode> {
        &self.pattern
    }

    /// Tiles a window of `shape` that starts `offset` (y, x) pixels from the pattern anchor.
    pub fn tile(&self, offset: GridIdx2D, shape: GridShape2D) -> Grid2D<ClassCode> {
        let pattern_y = self.pattern.axis_size_y();
        let pattern_x = self.pattern.axis_size_x();

        let phase_y = offset.y().rem_euclid(pattern_y as isize) as usize;
        let phase_x = offset.x().rem_euclid(pattern_x as isize) as usize;

        let mut data = Vec::with_capacity(shape.number_of_elements());
        for y in 0..shape.axis_size_y() {
            let pattern_row = self.pattern.row((phase_y + y) % pattern_y);
            data.extend((0..shape.axis_size_x()).map(|x| pattern_row[(phase_x + x) % pattern_x]));
        }

        Grid2D { shape, data }
    }
}
