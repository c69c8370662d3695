mod gdal_source;
mod memory_source;

pub use self::gdal_source::GdalRasterSource;
pub use self::memory_source::MemoryRasterSource;

use scenario_datatypes::raster::{ClassCode, Grid2D, PixelWindow, RasterGridSpec};

use crate::util::Result;

/// A single band land-cover raster that can be read window by window.
pub trait RasterSource {
    fn grid_spec(&self) -> &RasterGridSpec;

    /// Reads the pixels of `window` (in the raster's pixel space). Pixels of the window that lie
    /// outside of the raster are filled with [`RasterSource::fill_value`].
    fn read_window(&self, window: &PixelWindow) -> Result<Grid2D<ClassCode>>;

    /// The value for pixels without data, i.e., the nodata value or zero if there is none.
    fn fill_value(&self) -> ClassCode {
        self.grid_spec()
            .no_data_value
            .map_or(0, |no_data| no_data as ClassCode)
    }
}

impl<S> RasterSource for &S
where
    S: RasterSource + ?Sized,
{
    fn grid_spec(&self) -> &RasterGridSpec {
        (**self).grid_spec()
    }

    fn read_window(&self, window: &PixelWindow) -> Result<Grid2D<ClassCode>> {
        (**self).read_window(window)
    }
}
