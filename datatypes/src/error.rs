use snafu::Snafu;

use crate::primitives::Coordinate2D;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    #[snafu(display(
        "The conditions ll.x <= ur.x && ll.y <= ur.y are not met by ll:{} ur:{}",
        lower_left_coordinate,
        upper_right_coordinate
    ))]
    InvalidBoundingBox {
        lower_left_coordinate: Coordinate2D,
        upper_right_coordinate: Coordinate2D,
    },

    #[snafu(display("Cannot parse WKT: {reason}"))]
    InvalidWkt { reason: String },

    #[snafu(display("The geometry is empty"))]
    EmptyGeometry,

    #[snafu(display("Expected a Polygon or MultiPolygon, found {geometry_type}"))]
    UnsupportedGeometryType { geometry_type: &'static str },

    #[snafu(display("Invalid geometry: {reason}"))]
    InvalidGeometry { reason: &'static str },

    #[snafu(display("Buffer distance must not be negative, got {distance}"))]
    NegativeBufferDistance { distance: f64 },

    #[snafu(display(
        "Dimension capacity  ≠ data capacity ({} ≠ {})",
        dimension_cap,
        data_cap
    ))]
    DimensionCapacityDoesNotMatchDataCapacity {
        dimension_cap: usize,
        data_cap: usize,
    },

    #[snafu(display(
        "Pixel sizes must be finite and non-zero, got ({x_pixel_size}, {y_pixel_size})"
    ))]
    InvalidPixelSize { x_pixel_size: f64, y_pixel_size: f64 },

    #[snafu(display("InvalidSpatialReferenceString: {}", spatial_reference_string))]
    InvalidSpatialReferenceString { spatial_reference_string: String },

    #[snafu(display("ParseU32: {}", source))]
    ParseU32 {
        source: <u32 as std::str::FromStr>::Err,
    },

    #[snafu(display("Unsupported raster data type: {data_type}"))]
    UnsupportedRasterDataType { data_type: String },
}
