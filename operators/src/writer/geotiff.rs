use std::path::{Path, PathBuf};

use gdal::raster::{Buffer, RasterCreationOptions};
use gdal::{Dataset, DriverManager};
use scenario_datatypes::raster::{ClassCode, GdalGeoTransform, Grid2D, PixelWindow, RasterDataType, RasterGridSpec};
use tracing::debug;

use super::{RasterWriter, ensure_window_in_raster};
use crate::util::Result;
use crate::util::gdal::gdal_spatial_ref;

/// Internal tile size of the written GeoTIFFs and the block size in which scenarios are
/// generated.
pub const GEOTIFF_BLOCK_SIZE: usize = 256;

pub const OVERVIEW_LEVELS: [i32; 4] = [2, 4, 8, 16];

const COMPRESSION_FORMAT: &str = "LZW";
const RASTERBAND_INDEX: usize = 1;

/// Writes a single band, tiled and compressed GeoTIFF.
pub struct GeoTiffRasterWriter {
    dataset: Dataset,
    grid_spec: RasterGridSpec,
    output_file_path: PathBuf,
}

impl GeoTiffRasterWriter {
    pub fn create(output_file_path: &Path, grid_spec: RasterGridSpec) -> Result<Self> {
        let driver = DriverManager::get_driver_by_name("GTiff")?;
        let options = create_gdal_tiff_options()?;

        let (width, height) = (grid_spec.size_x, grid_spec.size_y);
        let dataset = match grid_spec.data_type {
            RasterDataType::U8 => driver.create_with_band_type_with_options::<u8, _>(
                output_file_path,
                width,
                height,
                1,
                &options,
            )?,
            RasterDataType::U16 => driver.create_with_band_type_with_options::<u16, _>(
                output_file_path,
                width,
                height,
                1,
                &options,
            )?,
            RasterDataType::U32 => driver.create_with_band_type_with_options::<u32, _>(
                output_file_path,
                width,
                height,
                1,
                &options,
            )?,
            RasterDataType::I16 => driver.create_with_band_type_with_options::<i16, _>(
                output_file_path,
                width,
                height,
                1,
                &options,
            )?,
            RasterDataType::I32 => driver.create_with_band_type_with_options::<i32, _>(
                output_file_path,
                width,
                height,
                1,
                &options,
            )?,
        };

        let mut dataset = dataset;
        dataset.set_spatial_ref(&gdal_spatial_ref(&grid_spec.spatial_reference)?)?;
        dataset.set_geo_transform(&GdalGeoTransform::from(grid_spec.geo_transform))?;

        let mut band = dataset.rasterband(RASTERBAND_INDEX)?;
        band.set_no_data_value(grid_spec.no_data_value)?;

        debug!(path = %output_file_path.display(), "created GeoTIFF");

        Ok(Self {
            dataset,
            grid_spec,
            output_file_path: output_file_path.to_owned(),
        })
    }

    /// Closes the dataset, which flushes all blocks to disk, and returns the file path.
    pub fn finish(self) -> PathBuf {
        drop(self.dataset);
        self.output_file_path
    }
}

impl RasterWriter for GeoTiffRasterWriter {
    fn grid_spec(&self) -> &RasterGridSpec {
        &self.grid_spec
    }

    fn write_window(&mut self, window: &PixelWindow, data: &Grid2D<ClassCode>) -> Result<()> {
        ensure_window_in_raster(&self.grid_spec, window)?;

        let mut buffer = Buffer::new(window.gdal_window_size(), data.data.clone());

        self.dataset.rasterband(RASTERBAND_INDEX)?.write(
            window.gdal_window_start(),
            window.gdal_window_size(),
            &mut buffer,
        )?;

        Ok(())
    }

    fn build_overviews(&mut self) -> Result<()> {
        self.dataset
            .build_overviews("NEAREST", &OVERVIEW_LEVELS, &[])?;
        Ok(())
    }
}

fn create_gdal_tiff_options() -> Result<RasterCreationOptions> {
    let block_size = GEOTIFF_BLOCK_SIZE.to_string();

    let mut options = RasterCreationOptions::new();
    options.set_name_value("TILED", "YES")?;
    options.set_name_value("BIGTIFF", "YES")?;
    options.set_name_value("COMPRESS", COMPRESSION_FORMAT)?;
    options.set_name_value("BLOCKXSIZE", &block_size)?;
    options.set_name_value("BLOCKYSIZE", &block_size)?;
    Ok(options)
}
