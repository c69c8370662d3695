mod geotiff;
mod memory_writer;

pub use self::geotiff::{GEOTIFF_BLOCK_SIZE, GeoTiffRasterWriter, OVERVIEW_LEVELS};
pub use self::memory_writer::MemoryRasterWriter;

use scenario_datatypes::raster::{ClassCode, Grid2D, PixelWindow, RasterGridSpec};
use snafu::ensure;

use crate::error;
use crate::util::Result;

/// Receives the blocks of a raster that is generated window by window.
pub trait RasterWriter {
    fn grid_spec(&self) -> &RasterGridSpec;

    /// Writes `data` into `window`, which is given in the pixel space of the output raster and
    /// must lie completely inside of it.
    fn write_window(&mut self, window: &PixelWindow, data: &Grid2D<ClassCode>) -> Result<()>;

    /// Builds reduced resolution versions of the raster, if the format supports it.
    fn build_overviews(&mut self) -> Result<()>;
}

pub(crate) fn ensure_window_in_raster(
    grid_spec: &RasterGridSpec,
    window: &PixelWindow,
) -> Result<()> {
    ensure!(
        grid_spec.full_window().contains(window),
        error::WindowOutOfRasterSnafu {
            window: *window,
            size_x: grid_spec.size_x,
            size_y: grid_spec.size_y,
        }
    );
    Ok(())
}
