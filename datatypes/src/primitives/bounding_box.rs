use super::Coordinate2D;
use crate::error;
use crate::util::Result;
use serde::{Deserialize, Serialize};
use snafu::ensure;

#[derive(Copy, Clone, Serialize, Deserialize, PartialEq, Debug)]
#[repr(C)]
/// An axis-aligned extent.
/// Note: may degenerate to a point!
pub struct BoundingBox2D {
    lower_left_coordinate: Coordinate2D,
    upper_right_coordinate: Coordinate2D,
}

impl BoundingBox2D {
    /// Creates a new bounding box
    ///
    /// # Examples
    ///
    /// ```
    /// use scenario_datatypes::primitives::{Coordinate2D, BoundingBox2D};
    ///
    /// let ll = Coordinate2D::new(1.0, 1.0);
    /// let ur = Coordinate2D::new(2.0, 2.0);
    /// let bbox = BoundingBox2D::new(ll, ur).unwrap();
    /// ```
    ///
    /// # Errors
    ///
    /// This constructor fails if the coordinate's values are not in order
    ///
    pub fn new(
        lower_left_coordinate: Coordinate2D,
        upper_right_coordinate: Coordinate2D,
    ) -> Result<Self> {
        ensure!(
            lower_left_coordinate.x <= upper_right_coordinate.x
                && lower_left_coordinate.y <= upper_right_coordinate.y,
            error::InvalidBoundingBoxSnafu {
                lower_left_coordinate,
                upper_right_coordinate
            }
        );
        Ok(Self {
            lower_left_coordinate,
            upper_right_coordinate,
        })
    }

    pub fn new_unchecked(
        lower_left_coordinate: Coordinate2D,
        upper_right_coordinate: Coordinate2D,
    ) -> Self {
        Self {
            lower_left_coordinate,
            upper_right_coordinate,
        }
    }

    /// Creates a new bounding box with `upper_left` and `lower_right` coordinates
    /// This is usually used with raster data and matches with the gdal geotransform
    pub fn new_upper_left_lower_right(
        upper_left_coordinate: Coordinate2D,
        lower_right_coordinate: Coordinate2D,
    ) -> Result<Self> {
        let lower_left_coordinate = (upper_left_coordinate.x, lower_right_coordinate.y).into();
        let upper_right_coordinate = (lower_right_coordinate.x, upper_left_coordinate.y).into();
        BoundingBox2D::new(lower_left_coordinate, upper_right_coordinate)
    }

    pub fn lower_left(&self) -> Coordinate2D {
        self.lower_left_coordinate
    }

    pub fn upper_right(&self) -> Coordinate2D {
        self.upper_right_coordinate
    }

    pub fn upper_left(&self) -> Coordinate2D {
        (self.lower_left_coordinate.x, self.upper_right_coordinate.y).into()
    }

    pub fn lower_right(&self) -> Coordinate2D {
        (self.upper_right_coordinate.x, self.lower_left_coordinate.y).into()
    }

    pub fn min_x(&self) -> f64 {
        self.lower_left_coordinate.x
    }

    pub fn min_y(&self) -> f64 {
        self.lower_left_coordinate.y
    }

    pub fn max_x(&self) -> f64 {
        self.upper_right_coordinate.x
    }

    pub fn max_y(&self) -> f64 {
        self.upper_right_coordinate.y
    }

    /// Returns the width of the bounding box
    pub fn size_x(&self) -> f64 {
        self.upper_right_coordinate.x - self.lower_left_coordinate.x
    }

    /// Returns the height of the bounding box
    pub fn size_y(&self) -> f64 {
        self.upper_right_coordinate.y - self.lower_left_coordinate.y
    }

    /// Checks if a coordinate is located inside the bounding box
    ///
    /// # Examples
    ///
    /// ```
    /// use scenario_datatypes::primitives::{Coordinate2D, BoundingBox2D};
    ///
    /// let ll = Coordinate2D::new(1.0, 1.0);
    /// let ur = Coordinate2D::new(2.0, 2.0);
    /// let bbox = BoundingBox2D::new(ll, ur).unwrap();
    ///
    /// assert!(bbox.contains_coordinate(&(1.5, 1.5).into()));
    /// ```
    ///
    pub fn contains_coordinate(&self, coordinate: &Coordinate2D) -> bool {
        coordinate.x >= self.lower_left_coordinate.x
            && coordinate.y >= self.lower_left_coordinate.y
            && coordinate.x <= self.upper_right_coordinate.x
            && coordinate.y <= self.upper_right_coordinate.y
    }

    /// Checks if the bounding box contains another bounding box (boundaries included)
    pub fn contains_bbox(&self, other_bbox: &Self) -> bool {
        self.contains_coordinate(&other_bbox.lower_left_coordinate)
            && self.contains_coordinate(&other_bbox.upper_right_coordinate)
    }

    pub fn intersects_bbox(&self, other_bbox: &Self) -> bool {
        self.lower_left_coordinate.x <= other_bbox.upper_right_coordinate.x
            && other_bbox.lower_left_coordinate.x <= self.upper_right_coordinate.x
            && self.lower_left_coordinate.y <= other_bbox.upper_right_coordinate.y
            && other_bbox.lower_left_coordinate.y <= self.upper_right_coordinate.y
    }

    /// Returns `Some(intersection)` with `other_bbox` or `None` if they do not intersect
    ///
    /// # Examples
    ///
    /// ```
    /// use scenario_datatypes::primitives::{Coordinate2D, BoundingBox2D};
    ///
    /// let bbox = BoundingBox2D::new((0.0, 0.0).into(), (10.0, 10.0).into()).unwrap();
    /// let bbox2 = BoundingBox2D::new((5.0, 5.0).into(), (15.0, 15.0).into()).unwrap();
    ///
    /// let intersection = BoundingBox2D::new((5.0, 5.0).into(), (10.0, 10.0).into()).unwrap();
    ///
    /// assert_eq!(bbox.intersection(&bbox2), Some(intersection));
    /// ```
    ///
    pub fn intersection(&self, other_bbox: &Self) -> Option<Self> {
        if !self.intersects_bbox(other_bbox) {
            return None;
        }

        Some(BoundingBox2D::new_unchecked(
            self.lower_left_coordinate
                .max_elements(other_bbox.lower_left_coordinate),
            self.upper_right_coordinate
                .min_elements(other_bbox.upper_right_coordinate),
        ))
    }

    /// Grows the box by `distance` on every side.
    ///
    /// For a round buffer of a geometry by `distance`, this is exactly the bounding box of the
    /// buffered geometry.
    ///
    /// # Errors
    ///
    /// Fails if `distance` is negative or not finite.
    ///
    pub fn buffer(&self, distance: f64) -> Result<Self> {
        ensure!(
            distance >= 0.0 && distance.is_finite(),
            error::NegativeBufferDistanceSnafu { distance }
        );

        Ok(BoundingBox2D::new_unchecked(
            (
                self.lower_left_coordinate.x - distance,
                self.lower_left_coordinate.y - distance,
            )
                .into(),
            (
                self.upper_right_coordinate.x + distance,
                self.upper_right_coordinate.y + distance,
            )
                .into(),
        ))
    }
}

impl From<BoundingBox2D> for geo::Rect<f64> {
    fn from(bbox: BoundingBox2D) -> geo::Rect<f64> {
        geo::Rect::new(
            geo::Coord::from(bbox.lower_left_coordinate),
            geo::Coord::from(bbox.upper_right_coordinate),
        )
    }
}

impl From<geo::Rect<f64>> for BoundingBox2D {
    fn from(rect: geo::Rect<f64>) -> BoundingBox2D {
        // `geo::Rect` normalizes its corners on construction
        BoundingBox2D::new_unchecked(rect.min().into(), rect.max().into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounding_box_new() {
        let ll = Coordinate2D::new(1.0, 1.0);
        let ur = Coordinate2D::new(2.0, 2.0);
        BoundingBox2D::new(ll, ur).unwrap();

        assert!(BoundingBox2D::new(ur, ll).is_err());
    }

    #[test]
    fn invalid_bounding_box_message() {
        let error = BoundingBox2D::new((2.0, 2.0).into(), (1.0, 1.0).into()).unwrap_err();

        assert_eq!(
            error.to_string(),
            "The conditions ll.x <= ur.x && ll.y <= ur.y are not met by ll:(2, 2) ur:(1, 1)"
        );
    }

    #[test]
    fn bounding_box_corners() {
        let bbox =
            BoundingBox2D::new_upper_left_lower_right((1.0, 4.0).into(), (3.0, 2.0).into())
                .unwrap();

        assert_eq!(bbox.lower_left(), (1.0, 2.0).into());
        assert_eq!(bbox.upper_right(), (3.0, 4.0).into());
        assert_eq!(bbox.upper_left(), (1.0, 4.0).into());
        assert_eq!(bbox.lower_right(), (3.0, 2.0).into());
        assert_eq!(bbox.size_x(), 2.0);
        assert_eq!(bbox.size_y(), 2.0);
    }

    #[test]
    fn bounding_box_contains_bbox() {
        let outer = BoundingBox2D::new((0.0, 0.0).into(), (10.0, 10.0).into()).unwrap();
        let inner = BoundingBox2D::new((2.0, 2.0).into(), (10.0, 5.0).into()).unwrap();
        let overlapping = BoundingBox2D::new((5.0, 5.0).into(), (15.0, 15.0).into()).unwrap();

        assert!(outer.contains_bbox(&inner));
        assert!(outer.contains_bbox(&outer));
        assert!(!outer.contains_bbox(&overlapping));
        assert!(!inner.contains_bbox(&outer));
    }

    #[test]
    fn bounding_box_intersection_separate() {
        let a = BoundingBox2D::new((0.0, 0.0).into(), (1.0, 1.0).into()).unwrap();
        let b = BoundingBox2D::new((2.0, 2.0).into(), (3.0, 3.0).into()).unwrap();

        assert_eq!(a.intersection(&b), None);
    }

    #[test]
    fn buffer_grows_every_side() {
        let bbox = BoundingBox2D::new((0.0, 0.0).into(), (1.0, 2.0).into()).unwrap();

        assert_eq!(
            bbox.buffer(10.0).unwrap(),
            BoundingBox2D::new((-10.0, -10.0).into(), (11.0, 12.0).into()).unwrap()
        );
        assert_eq!(bbox.buffer(0.0).unwrap(), bbox);
    }

    #[test]
    fn buffer_rejects_negative_distance() {
        let bbox = BoundingBox2D::new((0.0, 0.0).into(), (1.0, 2.0).into()).unwrap();

        assert!(matches!(
            bbox.buffer(-1.0),
            Err(crate::error::Error::NegativeBufferDistance { .. })
        ));
    }
}
