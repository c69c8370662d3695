use std::path::{Path, PathBuf};

use gdal::raster::GdalDataType;
use gdal::spatial_ref::SpatialRef;
use gdal::{Dataset, DatasetOptions, GdalOpenFlags};
use scenario_datatypes::raster::RasterDataType;
use scenario_datatypes::spatial_reference::SpatialReference;
use snafu::ResultExt;

use crate::error::{self, Error};
use crate::util::Result;

/// Opens a Gdal Dataset with the given `path`.
/// Other crates should use this method for Gdal Dataset access as a workaround to avoid strange errors.
pub fn gdal_open_dataset(path: &Path) -> Result<Dataset> {
    gdal_open_dataset_ex(
        path,
        DatasetOptions {
            open_flags: GdalOpenFlags::GDAL_OF_RASTER | GdalOpenFlags::GDAL_OF_READONLY,
            ..DatasetOptions::default()
        },
    )
}

/// Opens a Gdal Dataset with the given `path` and `dataset_options`.
/// Other crates should use this method for Gdal Dataset access as a workaround to avoid strange errors.
pub fn gdal_open_dataset_ex(path: &Path, dataset_options: DatasetOptions) -> Result<Dataset> {
    #[cfg(debug_assertions)]
    let dataset_options = {
        let mut dataset_options = dataset_options;
        dataset_options.open_flags |= GdalOpenFlags::GDAL_OF_VERBOSE_ERROR;
        dataset_options
    };

    Dataset::open_ex(path, dataset_options).context(error::CouldNotOpenGdalDatasetSnafu {
        file_path: path.to_string_lossy(),
    })
}

/// Maps a raster location as it is sent by the web service to a path GDAL can open.
/// Remote rasters are read through the `/vsicurl/` file system.
pub fn gdal_path_from_location(location: &str) -> PathBuf {
    if location.starts_with("http://") || location.starts_with("https://") {
        PathBuf::from(format!("/vsicurl/{location}"))
    } else {
        PathBuf::from(location)
    }
}

pub fn raster_data_type_from_gdal(gdal_data_type: GdalDataType) -> Result<RasterDataType> {
    match gdal_data_type {
        GdalDataType::UInt8 => Ok(RasterDataType::U8),
        GdalDataType::UInt16 => Ok(RasterDataType::U16),
        GdalDataType::UInt32 => Ok(RasterDataType::U32),
        GdalDataType::Int16 => Ok(RasterDataType::I16),
        GdalDataType::Int32 => Ok(RasterDataType::I32),
        other => Err(Error::GdalRasterDataTypeNotSupported {
            data_type: format!("{other:?}"),
        }),
    }
}

/// Reads the spatial reference of a dataset as `AUTHORITY:CODE` if possible and as proj string
/// otherwise.
pub fn spatial_reference_from_dataset(dataset: &Dataset) -> Result<SpatialReference> {
    let spatial_ref = dataset
        .spatial_ref()
        .map_err(|_| Error::MissingSpatialReference)?;

    let definition = match (spatial_ref.auth_name(), spatial_ref.auth_code()) {
        (Some(authority), Ok(code)) => format!("{authority}:{code}"),
        _ => spatial_ref.to_proj4()?,
    };

    Ok(definition.parse()?)
}

pub fn gdal_spatial_ref(spatial_reference: &SpatialReference) -> Result<SpatialRef> {
    Ok(SpatialRef::from_definition(spatial_reference.srs_string())?)
}
