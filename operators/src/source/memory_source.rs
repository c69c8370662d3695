use scenario_datatypes::raster::{ClassCode, Grid2D, PixelWindow, RasterGridSpec};
use snafu::ensure;

use super::RasterSource;
use crate::error;
use crate::util::Result;

/// A raster that is completely held in memory, e.g., a fixture grid or a freshly generated
/// scenario.
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryRasterSource {
    grid_spec: RasterGridSpec,
    grid: Grid2D<ClassCode>,
}

impl MemoryRasterSource {
    pub fn new(grid_spec: RasterGridSpec, grid: Grid2D<ClassCode>) -> Result<Self> {
        ensure!(
            grid.axis_size_x() == grid_spec.size_x && grid.axis_size_y() == grid_spec.size_y,
            error::WindowOutOfRasterSnafu {
                window: PixelWindow::of_raster(grid.axis_size_x(), grid.axis_size_y()),
                size_x: grid_spec.size_x,
                size_y: grid_spec.size_y,
            }
        );

        Ok(Self { grid_spec, grid })
    }

    /// A raster where every pixel has the same value
    pub fn new_filled(grid_spec: RasterGridSpec, value: ClassCode) -> Self {
        let grid = Grid2D::new_filled([grid_spec.size_y, grid_spec.size_x].into(), value);
        Self { grid_spec, grid }
    }

    pub fn grid(&self) -> &Grid2D<ClassCode> {
        &self.grid
    }

    pub fn into_grid(self) -> Grid2D<ClassCode> {
        self.grid
    }
}

impl RasterSource for MemoryRasterSource {
    fn grid_spec(&self) -> &RasterGridSpec {
        &self.grid_spec
    }

    fn read_window(&self, window: &PixelWindow) -> Result<Grid2D<ClassCode>> {
        Ok(self
            .grid
            .sub_grid(window.start(), window.shape(), self.fill_value()))
    }
}
