use std::path::{Path, PathBuf};

use gdal::Dataset;
use scenario_datatypes::raster::{ClassCode, GeoTransform, Grid2D, PixelWindow, RasterGridSpec};
use tracing::{debug, instrument};

use super::RasterSource;
use crate::util::Result;
use crate::util::gdal::{
    gdal_open_dataset, gdal_path_from_location, raster_data_type_from_gdal,
    spatial_reference_from_dataset,
};

const RASTERBAND_INDEX: usize = 1;

/// A land-cover raster in a file GDAL can read. Only the first band is used.
pub struct GdalRasterSource {
    path: PathBuf,
    dataset: Dataset,
    grid_spec: RasterGridSpec,
}

impl GdalRasterSource {
    #[instrument]
    pub fn open(path: &Path) -> Result<Self> {
        let dataset = gdal_open_dataset(path)?;

        let geo_transform = GeoTransform::from(dataset.geo_transform()?);
        geo_transform.validate()?;

        let (size_x, size_y) = dataset.raster_size();
        let rasterband = dataset.rasterband(RASTERBAND_INDEX)?;

        let grid_spec = RasterGridSpec {
            geo_transform,
            size_x,
            size_y,
            spatial_reference: spatial_reference_from_dataset(&dataset)?,
            no_data_value: rasterband.no_data_value(),
            data_type: raster_data_type_from_gdal(rasterband.band_type())?,
        };

        debug!(?grid_spec, "opened raster");

        Ok(Self {
            path: path.to_owned(),
            dataset,
            grid_spec,
        })
    }

    /// Opens a raster by a location as used by the web service, i.e., a path or an http(s) url.
    pub fn open_location(location: &str) -> Result<Self> {
        Self::open(&gdal_path_from_location(location))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// This method reads the data of a window that lies completely within the dataset.
    fn read_inner_window(&self, window: &PixelWindow) -> Result<Grid2D<ClassCode>> {
        let rasterband = self.dataset.rasterband(RASTERBAND_INDEX)?;

        let buffer = rasterband.read_as::<ClassCode>(
            window.gdal_window_start(), // pixelspace origin
            window.gdal_window_size(),  // pixelspace size
            window.gdal_window_size(),  // requested raster size
            None,                       // sampling mode
        )?;
        let (_, buffer_data) = buffer.into_shape_and_vec();

        Ok(Grid2D::new(window.shape(), buffer_data)?)
    }
}

impl RasterSource for GdalRasterSource {
    fn grid_spec(&self) -> &RasterGridSpec {
        &self.grid_spec
    }

    fn read_window(&self, window: &PixelWindow) -> Result<Grid2D<ClassCode>> {
        let raster_window = self.grid_spec.full_window();

        let Some(inner_window) = window.intersection(&raster_window) else {
            return Ok(Grid2D::new_filled(window.shape(), self.fill_value()));
        };

        let inner_grid = self.read_inner_window(&inner_window)?;

        if inner_window == *window {
            return Ok(inner_grid);
        }

        let mut grid = Grid2D::new_filled(window.shape(), self.fill_value());
        grid.blit_from(&inner_grid, inner_window.offset_in(window));
        Ok(grid)
    }
}
