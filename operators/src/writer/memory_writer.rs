use scenario_datatypes::raster::{ClassCode, Grid2D, PixelWindow, RasterGridSpec};

use super::{RasterWriter, ensure_window_in_raster};
use crate::source::MemoryRasterSource;
use crate::util::Result;

/// Collects the written blocks in memory.
#[derive(Debug, Clone)]
pub struct MemoryRasterWriter {
    grid_spec: RasterGridSpec,
    grid: Grid2D<ClassCode>,
    overviews_built: bool,
}

impl MemoryRasterWriter {
    /// Creates a writer whose pixels are initialized with the nodata value (or zero)
    pub fn new(grid_spec: RasterGridSpec) -> Self {
        let fill_value = grid_spec
            .no_data_value
            .map_or(0, |no_data| no_data as ClassCode);
        let grid = Grid2D::new_filled([grid_spec.size_y, grid_spec.size_x].into(), fill_value);

        Self {
            grid_spec,
            grid,
            overviews_built: false,
        }
    }

    pub fn overviews_built(&self) -> bool {
        self.overviews_built
    }

    pub fn into_source(self) -> Result<MemoryRasterSource> {
        MemoryRasterSource::new(self.grid_spec, self.grid)
    }
}

impl RasterWriter for MemoryRasterWriter {
    fn grid_spec(&self) -> &RasterGridSpec {
        &self.grid_spec
    }

    fn write_window(&mut self, window: &PixelWindow, data: &Grid2D<ClassCode>) -> Result<()> {
        ensure_window_in_raster(&self.grid_spec, window)?;
        self.grid.blit_from(data, window.start());
        Ok(())
    }

    fn build_overviews(&mut self) -> Result<()> {
        self.overviews_built = true;
        Ok(())
    }
}
