use scenario_datatypes::primitives::{BoundingBox2D, Parcel};
use scenario_datatypes::raster::{GeoTransform, PixelWindow};
use tracing::debug;

use crate::projection::CoordinateTransformer;
use crate::util::Result;

/// The largest search radius of any ecosystem service model (2 x the 800 m urban nature
/// access radius). Scenarios cover the parcel buffered by this distance.
pub const LARGEST_SERVICESHED: f64 = 1600.0;

/// Fractional pixel positions closer than this to a pixel edge are treated as on the edge.
const PIXEL_EDGE_TOLERANCE: f64 = 1e-9;

/// A bounding box whose edges lie on pixel edges of a grid together with the pixel window it
/// covers on that grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlignedExtent {
    pub bounds: BoundingBox2D,
    pub window: PixelWindow,
}

/// Snaps bounding boxes outward to whole pixels of a grid.
#[derive(Debug, Clone, Copy)]
pub struct GridAligner {
    geo_transform: GeoTransform,
}

impl GridAligner {
    pub fn new(geo_transform: GeoTransform) -> Self {
        Self { geo_transform }
    }

    /// Computes the smallest pixel aligned extent that contains `bbox`.
    pub fn align(&self, bbox: &BoundingBox2D) -> AlignedExtent {
        let (ax, ay) = self
            .geo_transform
            .coordinate_to_fractional_pixel(bbox.upper_left());
        let (bx, by) = self
            .geo_transform
            .coordinate_to_fractional_pixel(bbox.lower_right());

        let start_x = floor_to_pixel(ax.min(bx));
        let start_y = floor_to_pixel(ay.min(by));
        let end_x = ceil_to_pixel(ax.max(bx));
        let end_y = ceil_to_pixel(ay.max(by));

        let window = PixelWindow::new(
            start_x,
            start_y,
            (end_x - start_x) as usize,
            (end_y - start_y) as usize,
        );

        AlignedExtent {
            bounds: self.geo_transform.window_bounds(&window),
            window,
        }
    }
}

fn floor_to_pixel(fractional: f64) -> isize {
    let rounded = fractional.round();
    if (fractional - rounded).abs() < PIXEL_EDGE_TOLERANCE {
        rounded as isize
    } else {
        fractional.floor() as isize
    }
}

fn ceil_to_pixel(fractional: f64) -> isize {
    let rounded = fractional.round();
    if (fractional - rounded).abs() < PIXEL_EDGE_TOLERANCE {
        rounded as isize
    } else {
        fractional.ceil() as isize
    }
}

/// Computes the area a scenario raster has to cover around a parcel.
pub struct ServiceshedExtentBuilder<'a> {
    transformer: &'a CoordinateTransformer,
    aligner: GridAligner,
}

impl<'a> ServiceshedExtentBuilder<'a> {
    pub fn new(transformer: &'a CoordinateTransformer, geo_transform: GeoTransform) -> Self {
        Self {
            transformer,
            aligner: GridAligner::new(geo_transform),
        }
    }

    /// Buffers the parcel (given in display projection) by `buffer_distance` in the native
    /// projection and aligns the result to the grid.
    ///
    /// The bounding box of a round buffer of distance `r` is the bounding box of the
    /// parcel grown by `r` on every side.
    pub fn build_extent(&self, parcel: &Parcel, buffer_distance: f64) -> Result<AlignedExtent> {
        let native = self.transformer.to_native(parcel)?;
        self.build_native_extent(&native, buffer_distance)
    }

    /// Same as [`Self::build_extent`] for a parcel that is already in the native projection.
    pub fn build_native_extent(
        &self,
        native_parcel: &Parcel,
        buffer_distance: f64,
    ) -> Result<AlignedExtent> {
        let buffered = native_parcel.bounding_box().buffer(buffer_distance)?;
        let extent = self.aligner.align(&buffered);

        debug!(window = ?extent.window, buffer_distance, "built serviceshed extent");

        Ok(extent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use scenario_datatypes::spatial_reference::SpatialReference;

    fn geo_transform() -> GeoTransform {
        GeoTransform::new((-1000., 2000.).into(), 30., -30.)
    }

    fn bbox(ll: (f64, f64), ur: (f64, f64)) -> BoundingBox2D {
        BoundingBox2D::new(ll.into(), ur.into()).unwrap()
    }

    #[test]
    fn snaps_outward() {
        let aligned = GridAligner::new(geo_transform()).align(&bbox((-985., 1950.), (-901., 1999.)));

        assert_eq!(aligned.bounds, bbox((-1000., 1940.), (-880., 2000.)));
        assert_eq!(aligned.window, PixelWindow::new(0, 0, 4, 2));
    }

    #[test]
    fn aligned_edges_are_not_padded() {
        let aligned = GridAligner::new(geo_transform()).align(&bbox((-940., 1880.), (-880., 1970.)));

        assert_eq!(aligned.bounds, bbox((-940., 1880.), (-880., 1970.)));
        assert_eq!(aligned.window, PixelWindow::new(2, 1, 2, 3));
    }

    #[test]
    fn alignment_is_idempotent() {
        let aligner = GridAligner::new(GeoTransform::new((0.1, 0.7).into(), 29.7, -29.7));

        for raw in [
            bbox((-1234.5, -987.25), (4321.125, 17.5)),
            bbox((3.3, 3.3), (3.4, 3.4)),
            bbox((-0.0001, 1e6), (1e5, 2e6)),
        ] {
            let once = aligner.align(&raw);
            let twice = aligner.align(&once.bounds);

            assert_eq!(once.window, twice.window);
            assert!(once.bounds.contains_bbox(&raw));
        }
    }

    #[test]
    fn extent_is_outside_of_grid() {
        let aligned = GridAligner::new(geo_transform()).align(&bbox((-1100., 2010.), (-1040., 2050.)));

        assert_eq!(aligned.window.start_x, -4);
        assert_eq!(aligned.window.start_y, -2);
    }

    #[test]
    fn serviceshed_contains_buffered_parcel() {
        let transformer =
            CoordinateTransformer::new(SpatialReference::web_mercator(), SpatialReference::web_mercator())
                .unwrap();
        let builder = ServiceshedExtentBuilder::new(&transformer, geo_transform());
        let parcel =
            Parcel::from_wkt("POLYGON ((10 10, 100 10, 100 95, 10 95, 10 10))").unwrap();

        for distance in [0., 1., 45., LARGEST_SERVICESHED] {
            let extent = builder.build_extent(&parcel, distance).unwrap();
            let buffered = parcel.bounding_box().buffer(distance).unwrap();

            assert!(extent.bounds.contains_bbox(&buffered));
            assert!(extent.bounds.size_x() < buffered.size_x() + 2. * 30. + 1e-6);
        }
    }

    #[test]
    fn negative_distance_is_rejected() {
        let transformer =
            CoordinateTransformer::new(SpatialReference::web_mercator(), SpatialReference::web_mercator())
                .unwrap();
        let builder = ServiceshedExtentBuilder::new(&transformer, geo_transform());
        let parcel =
            Parcel::from_wkt("POLYGON ((10 10, 100 10, 100 95, 10 95, 10 10))").unwrap();

        assert!(matches!(
            builder.build_extent(&parcel, -1.),
            Err(Error::DataType { .. })
        ));
    }
}
