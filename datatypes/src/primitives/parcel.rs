use std::str::FromStr;

use geo::{Area, BoundingRect, CoordsIter, MultiPolygon, Polygon};
use snafu::ensure;
use wkt::ToWkt;

use super::BoundingBox2D;
use crate::error::{self, Error};
use crate::util::Result;

/// A user-drawn area, i.e., a (multi-)polygon that is checked to be non-empty and non-degenerate.
///
/// The parcel does not know its projection. Callers keep track of whether it is expressed in the
/// display or in the native projection.
#[derive(Debug, Clone, PartialEq)]
pub struct Parcel {
    geometry: MultiPolygon<f64>,
    bounding_box: BoundingBox2D,
}

impl Parcel {
    /// Parses a `POLYGON` or `MULTIPOLYGON` WKT string.
    ///
    /// # Errors
    ///
    /// Fails with `InvalidWkt` if the string cannot be parsed, `UnsupportedGeometryType` for
    /// other geometry types, and `EmptyGeometry`/`InvalidGeometry` if the polygon is unusable.
    ///
    pub fn from_wkt(wkt_str: &str) -> Result<Self> {
        let wkt = wkt::Wkt::<f64>::from_str(wkt_str).map_err(|reason| Error::InvalidWkt {
            reason: reason.to_string(),
        })?;

        let geometry = geo::Geometry::<f64>::try_from(wkt).map_err(|e| Error::InvalidWkt {
            reason: e.to_string(),
        })?;

        let multi_polygon = match geometry {
            geo::Geometry::Polygon(polygon) => MultiPolygon::new(vec![polygon]),
            geo::Geometry::MultiPolygon(multi_polygon) => multi_polygon,
            other => {
                return Err(Error::UnsupportedGeometryType {
                    geometry_type: geometry_type_name(&other),
                });
            }
        };

        Self::new(multi_polygon)
    }

    /// # Errors
    ///
    /// Fails if the geometry has no polygons, rings with less than four coordinates,
    /// non-finite coordinates or no area.
    ///
    pub fn new(geometry: MultiPolygon<f64>) -> Result<Self> {
        ensure!(
            !geometry.0.is_empty() && geometry.0.iter().all(|p| !p.exterior().0.is_empty()),
            error::EmptyGeometrySnafu
        );

        for polygon in &geometry.0 {
            ensure!(
                polygon.exterior().0.len() >= 4,
                error::InvalidGeometrySnafu {
                    reason: "polygon rings need at least four coordinates"
                }
            );
            ensure!(
                polygon.interiors().iter().all(|ring| ring.0.len() >= 4),
                error::InvalidGeometrySnafu {
                    reason: "polygon rings need at least four coordinates"
                }
            );
        }

        ensure!(
            geometry
                .coords_iter()
                .all(|c| c.x.is_finite() && c.y.is_finite()),
            error::InvalidGeometrySnafu {
                reason: "coordinates must be finite"
            }
        );

        ensure!(
            geometry.unsigned_area() > 0.0,
            error::InvalidGeometrySnafu {
                reason: "polygon has no area"
            }
        );

        let bounding_box = geometry
            .bounding_rect()
            .map(BoundingBox2D::from)
            .ok_or(Error::EmptyGeometry)?;

        Ok(Self {
            geometry,
            bounding_box,
        })
    }

    pub fn geometry(&self) -> &MultiPolygon<f64> {
        &self.geometry
    }

    pub fn into_inner(self) -> MultiPolygon<f64> {
        self.geometry
    }

    pub fn polygons(&self) -> &[Polygon<f64>] {
        &self.geometry.0
    }

    pub fn bounding_box(&self) -> BoundingBox2D {
        self.bounding_box
    }

    /// WKT representation. Single polygons are written as `POLYGON`.
    pub fn to_wkt(&self) -> String {
        if let [polygon] = self.geometry.0.as_slice() {
            polygon.wkt_string()
        } else {
            self.geometry.wkt_string()
        }
    }
}

fn geometry_type_name(geometry: &geo::Geometry<f64>) -> &'static str {
    match geometry {
        geo::Geometry::Point(_) => "Point",
        geo::Geometry::Line(_) => "Line",
        geo::Geometry::LineString(_) => "LineString",
        geo::Geometry::Polygon(_) => "Polygon",
        geo::Geometry::MultiPoint(_) => "MultiPoint",
        geo::Geometry::MultiLineString(_) => "MultiLineString",
        geo::Geometry::MultiPolygon(_) => "MultiPolygon",
        geo::Geometry::GeometryCollection(_) => "GeometryCollection",
        geo::Geometry::Rect(_) => "Rect",
        geo::Geometry::Triangle(_) => "Triangle",
    }
}
