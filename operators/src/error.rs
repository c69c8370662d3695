use scenario_datatypes::raster::PixelWindow;
use scenario_datatypes::spatial_reference::SpatialReference;
use snafu::Snafu;
use std::path::PathBuf;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    #[snafu(display("DataTypeError: {}", source))]
    DataType {
        source: scenario_datatypes::error::Error,
    },

    #[snafu(display("Cannot create a projection from {from} to {to}: {source}"))]
    ProjCreation {
        from: SpatialReference,
        to: SpatialReference,
        source: proj::ProjCreateError,
    },

    #[snafu(display("Projection from {from} to {to} failed: {source}"))]
    ProjConversion {
        from: SpatialReference,
        to: SpatialReference,
        source: proj::ProjError,
    },

    #[snafu(display("Projection from {from} to {to} did not change the geometry"))]
    UnchangedProjection {
        from: SpatialReference,
        to: SpatialReference,
    },

    #[snafu(display("Raster is not aligned with the base grid: {reason}"))]
    RasterAlignment { reason: String },

    #[snafu(display("Class {class} cannot be stored in a {data_type} raster"))]
    InvalidClassCode {
        class: i64,
        data_type: scenario_datatypes::raster::RasterDataType,
    },

    #[snafu(display("Pattern tile must not be empty"))]
    EmptyPattern,

    #[snafu(display(
        "Block {window:?} does not fit the output raster of size ({size_x}, {size_y})"
    ))]
    WindowOutOfRaster {
        window: PixelWindow,
        size_x: usize,
        size_y: usize,
    },

    #[snafu(display("GdalError: {}", source))]
    Gdal { source: gdal::errors::GdalError },

    #[snafu(display("Could not open gdal dataset for file path {:?}: {}", file_path, source))]
    CouldNotOpenGdalDataset {
        file_path: String,
        source: gdal::errors::GdalError,
    },

    #[snafu(display("Raster data type {data_type} is not supported for land-cover rasters"))]
    GdalRasterDataTypeNotSupported { data_type: String },

    #[snafu(display("Raster has no spatial reference with a usable definition"))]
    MissingSpatialReference,

    #[snafu(display("Io error: {}", source))]
    Io { source: std::io::Error },

    #[snafu(display("Cannot create working directory {}: {}", path.display(), source))]
    WorkspaceCreation {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("Invalid color {color:?}, expected #rrggbb"))]
    InvalidColor { color: String },

    #[snafu(display("Cannot encode image: {}", source))]
    ImageEncoding { source: image::ImageError },
}

impl From<scenario_datatypes::error::Error> for Error {
    fn from(datatype_error: scenario_datatypes::error::Error) -> Self {
        Self::DataType {
            source: datatype_error,
        }
    }
}

impl From<gdal::errors::GdalError> for Error {
    fn from(gdal_error: gdal::errors::GdalError) -> Self {
        Self::Gdal { source: gdal_error }
    }
}

impl From<std::io::Error> for Error {
    fn from(io_error: std::io::Error) -> Self {
        Self::Io { source: io_error }
    }
}
