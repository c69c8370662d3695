use serde::{Deserialize, Serialize};

use super::{GeoTransform, PixelWindow, RasterDataType};
use crate::primitives::BoundingBox2D;
use crate::spatial_reference::SpatialReference;

/// Describes the pixel grid of a single band raster: where its pixels lie, how many there are
/// and how they are encoded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RasterGridSpec {
    pub geo_transform: GeoTransform,
    pub size_x: usize,
    pub size_y: usize,
    pub spatial_reference: SpatialReference,
    pub no_data_value: Option<f64>,
    pub data_type: RasterDataType,
}

impl RasterGridSpec {
    /// The window covering the whole raster
    pub fn full_window(&self) -> PixelWindow {
        PixelWindow::of_raster(self.size_x, self.size_y)
    }

    pub fn bounds(&self) -> BoundingBox2D {
        self.geo_transform.window_bounds(&self.full_window())
    }

    /// Returns the grid spec of a window of this raster, e.g., for writing a cut-out.
    #[must_use]
    pub fn with_window(&self, window: &PixelWindow) -> Self {
        Self {
            geo_transform: self.geo_transform.window_geo_transform(window),
            size_x: window.size_x,
            size_y: window.size_y,
            ..self.clone()
        }
    }

    /// Tests whether `other` lies on the same pixel grid as `self`, i.e., same spatial reference,
    /// same pixel size and an origin that is offset by a whole number of pixels.
    ///
    /// Returns the pixel offset `(dx, dy)` of `other`'s origin in `self`'s pixel space.
    pub fn pixel_offset_of(&self, other: &Self) -> Option<(isize, isize)> {
        const TOLERANCE: f64 = 1e-6;

        if self.spatial_reference != other.spatial_reference {
            return None;
        }

        let same_pixel_size = (self.geo_transform.x_pixel_size - other.geo_transform.x_pixel_size)
            .abs()
            < TOLERANCE * self.geo_transform.x_pixel_size.abs()
            && (self.geo_transform.y_pixel_size - other.geo_transform.y_pixel_size).abs()
                < TOLERANCE * self.geo_transform.y_pixel_size.abs();
        if !same_pixel_size {
            return None;
        }

        let (fx, fy) = self
            .geo_transform
            .coordinate_to_fractional_pixel(other.geo_transform.origin_coordinate);
        let (dx, dy) = (fx.round(), fy.round());

        if (fx - dx).abs() > TOLERANCE || (fy - dy).abs() > TOLERANCE {
            return None;
        }

        Some((dx as isize, dy as isize))
    }
}
