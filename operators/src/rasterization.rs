use geo::{MultiPolygon, Rect, Relate};
use scenario_datatypes::raster::{GeoTransform, Grid2D, PixelWindow};

/// Burns polygons into a mask of `window` with the all touched rule, i.e., a pixel is set to 1 if
/// the geometry covers any part of its area and 0 otherwise.
///
/// Pixels that only share an edge or a corner with the geometry are not touched.
///
/// `window` is given in the pixel space of `geo_transform` and the geometry has to be in the
/// same spatial reference.
pub fn rasterize_all_touched(
    geometry: &MultiPolygon<f64>,
    geo_transform: &GeoTransform,
    window: &PixelWindow,
) -> Grid2D<u8> {
    let mut mask = Grid2D::new_filled(window.shape(), 0);

    if window.is_empty() {
        return mask;
    }

    for polygon in geometry {
        let Some(candidates) = candidate_pixels(polygon, geo_transform, window) else {
            continue;
        };

        for row in candidates.start_y..candidates.end_y() {
            for col in candidates.start_x..candidates.end_x() {
                let mask_y = (row - window.start_y) as usize;
                let mask_x = (col - window.start_x) as usize;

                if mask.get(mask_y, mask_x) == Some(1) {
                    continue;
                }

                let pixel: Rect<f64> = geo_transform.pixel_bounds([row, col].into()).into();
                let relation = polygon.relate(&pixel.to_polygon());
                if relation.is_intersects() && !relation.is_touches() {
                    mask.set(mask_y, mask_x, 1);
                }
            }
        }
    }

    mask
}

/// The pixels of `window` that may touch the bounding box of `polygon`
fn candidate_pixels(
    polygon: &geo::Polygon<f64>,
    geo_transform: &GeoTransform,
    window: &PixelWindow,
) -> Option<PixelWindow> {
    use geo::BoundingRect;

    let bounds = polygon.bounding_rect()?;
    let (ax, ay) = geo_transform.coordinate_to_fractional_pixel(bounds.min().into());
    let (bx, by) = geo_transform.coordinate_to_fractional_pixel(bounds.max().into());

    // one pixel of margin absorbs rounding of bounds lying on pixel edges
    let start_x = ax.min(bx).floor() as isize - 1;
    let start_y = ay.min(by).floor() as isize - 1;
    let end_x = ax.max(bx).floor() as isize + 1;
    let end_y = ay.max(by).floor() as isize + 1;

    PixelWindow::new(
        start_x,
        start_y,
        (end_x - start_x) as usize,
        (end_y - start_y) as usize,
    )
    .intersection(window)
}

/// Number of pixels set in a mask
pub fn mask_count(mask: &Grid2D<u8>) -> usize {
    mask.data.iter().filter(|&&value| value == 1).count()
}
