use crate::error;
use crate::primitives::{BoundingBox2D, Coordinate2D};
use crate::util::Result;
use serde::{Deserialize, Serialize};
use snafu::ensure;

use super::{GridIdx2D, PixelWindow};

/// This is a typedef for the `GDAL GeoTransform`. It represents an affine transformation matrix.
pub type GdalGeoTransform = [f64; 6];

/// The `GeoTransform` is a more user friendly representation of the `GDAL GeoTransform` affine transformation matrix.
/// Rotation terms are not supported.
#[derive(Copy, Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct GeoTransform {
    pub origin_coordinate: Coordinate2D,
    pub x_pixel_size: f64,
    pub y_pixel_size: f64,
}

impl GeoTransform {
    /// Generates a new `GeoTransform`
    ///
    /// # Examples
    ///
    /// ```
    /// use scenario_datatypes::raster::GeoTransform;
    ///
    /// let geo_transform = GeoTransform::new((0.0, 0.0).into(), 1.0, -1.0);
    /// ```
    ///
    pub fn new(origin_coordinate: Coordinate2D, x_pixel_size: f64, y_pixel_size: f64) -> Self {
        Self {
            origin_coordinate,
            x_pixel_size,
            y_pixel_size,
        }
    }

    /// Generates a new `GeoTransform` with explicit x, y values of the upper left edge
    pub fn new_with_coordinate_x_y(
        origin_coordinate_x: f64,
        x_pixel_size: f64,
        origin_coordinate_y: f64,
        y_pixel_size: f64,
    ) -> Self {
        Self {
            origin_coordinate: (origin_coordinate_x, origin_coordinate_y).into(),
            x_pixel_size,
            y_pixel_size,
        }
    }

    /// Ensures that both pixel sizes are usable for pixel arithmetic.
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.x_pixel_size.is_finite()
                && self.y_pixel_size.is_finite()
                && self.x_pixel_size != 0.0
                && self.y_pixel_size != 0.0,
            error::InvalidPixelSizeSnafu {
                x_pixel_size: self.x_pixel_size,
                y_pixel_size: self.y_pixel_size,
            }
        );
        Ok(())
    }

    /// Transforms a grid coordinate (row, column) ~ (y, x) into a SRS coordinate (x,y).
    /// The result is the upper left corner of the pixel.
    ///
    /// # Examples
    ///
    /// ```
    /// use scenario_datatypes::raster::GeoTransform;
    ///
    /// let geo_transform = GeoTransform::new_with_coordinate_x_y(0.0, 1.0, 0.0, -1.0);
    /// assert_eq!(geo_transform.grid_idx_to_coordinate_2d([0, 0].into()), (0.0, 0.0).into())
    /// ```
    ///
    pub fn grid_idx_to_coordinate_2d(&self, grid_index: GridIdx2D) -> Coordinate2D {
        let coord_x = self.origin_coordinate.x + (grid_index.x() as f64) * self.x_pixel_size;
        let coord_y = self.origin_coordinate.y + (grid_index.y() as f64) * self.y_pixel_size;
        Coordinate2D::new(coord_x, coord_y)
    }

    /// Transforms an SRS coordinate (x,y) into a fractional pixel position (x, y), i.e., the
    /// inverse geotransform.
    pub fn coordinate_to_fractional_pixel(&self, coord: Coordinate2D) -> (f64, f64) {
        (
            (coord.x - self.origin_coordinate.x) / self.x_pixel_size,
            (coord.y - self.origin_coordinate.y) / self.y_pixel_size,
        )
    }

    /// Transforms an SRS coordinate (x,y) into the grid coordinate (row, column) ~ (y, x) of the
    /// pixel that contains it.
    pub fn coordinate_to_grid_idx_2d(&self, coord: Coordinate2D) -> GridIdx2D {
        let (x, y) = self.coordinate_to_fractional_pixel(coord);
        [y.floor() as isize, x.floor() as isize].into()
    }

    /// The area covered by a single pixel
    pub fn pixel_bounds(&self, grid_index: GridIdx2D) -> BoundingBox2D {
        let a = self.grid_idx_to_coordinate_2d(grid_index);
        let b = self.grid_idx_to_coordinate_2d([grid_index.y() + 1, grid_index.x() + 1].into());
        BoundingBox2D::new_unchecked(a.min_elements(b), a.max_elements(b))
    }

    /// The area covered by a pixel window
    pub fn window_bounds(&self, window: &PixelWindow) -> BoundingBox2D {
        let a = self.grid_idx_to_coordinate_2d(window.start());
        let b = self.grid_idx_to_coordinate_2d(window.end());
        BoundingBox2D::new_unchecked(a.min_elements(b), a.max_elements(b))
    }

    /// A `GeoTransform` whose origin is the upper left corner of `window`
    #[must_use]
    pub fn window_geo_transform(&self, window: &PixelWindow) -> Self {
        Self::new(
            self.grid_idx_to_coordinate_2d(window.start()),
            self.x_pixel_size,
            self.y_pixel_size,
        )
    }
}

impl Default for GeoTransform {
    fn default() -> Self {
        GeoTransform::new_with_coordinate_x_y(0.0, 1.0, 0.0, -1.0)
    }
}

impl From<GdalGeoTransform> for GeoTransform {
    fn from(gdal_geo_transform: GdalGeoTransform) -> Self {
        Self::new_with_coordinate_x_y(
            gdal_geo_transform[0],
            gdal_geo_transform[1],
            // gdal_geo_transform[2],
            gdal_geo_transform[3],
            // gdal_geo_transform[4],
            gdal_geo_transform[5],
        )
    }
}

impl From<GeoTransform> for GdalGeoTransform {
    fn from(geo_transform: GeoTransform) -> GdalGeoTransform {
        [
            geo_transform.origin_coordinate.x,
            geo_transform.x_pixel_size,
            0.0, // self.x_rotation,
            geo_transform.origin_coordinate.y,
            0.0, // self.y_rotation,
            geo_transform.y_pixel_size,
        ]
    }
}
