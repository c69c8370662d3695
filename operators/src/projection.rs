use geo::{Coord, MapCoords, MultiPolygon};
use proj::Proj;
use scenario_datatypes::primitives::Parcel;
use scenario_datatypes::spatial_reference::SpatialReference;
use snafu::{ResultExt, ensure};
use tracing::instrument;

use crate::error;
use crate::util::Result;

/// Projects parcels between the display projection in which they are drawn and the native
/// projection of the rasters they are burned into.
///
/// If both projections are equal the transformer is the identity and PROJ is never called.
pub struct CoordinateTransformer {
    display: SpatialReference,
    native: SpatialReference,
    projections: Option<ProjPair>,
}

struct ProjPair {
    to_native: Proj,
    to_display: Proj,
}

impl CoordinateTransformer {
    #[instrument(skip(display_reference), fields(display = ?display_reference))]
    pub fn new(display_reference: SpatialReference, native: SpatialReference) -> Result<Self> {
        let display = display_reference;
        let projections = if display == native {
            None
        } else {
            Some(ProjPair {
                to_native: create_proj(&display, &native)?,
                to_display: create_proj(&native, &display)?,
            })
        };

        Ok(Self {
            display,
            native,
            projections,
        })
    }

    pub fn display(&self) -> &SpatialReference {
        &self.display
    }

    pub fn native(&self) -> &SpatialReference {
        &self.native
    }

    pub fn is_identity(&self) -> bool {
        self.projections.is_none()
    }

    pub fn to_native(&self, parcel: &Parcel) -> Result<Parcel> {
        match &self.projections {
            Some(projections) => {
                project_parcel(parcel, &projections.to_native, &self.display, &self.native)
            }
            None => Ok(parcel.clone()),
        }
    }

    pub fn to_display(&self, parcel: &Parcel) -> Result<Parcel> {
        match &self.projections {
            Some(projections) => {
                project_parcel(parcel, &projections.to_display, &self.native, &self.display)
            }
            None => Ok(parcel.clone()),
        }
    }
}

fn create_proj(from: &SpatialReference, to: &SpatialReference) -> Result<Proj> {
    Proj::new_known_crs(from.srs_string(), to.srs_string(), None).context(
        error::ProjCreationSnafu {
            from: from.clone(),
            to: to.clone(),
        },
    )
}

fn project_parcel(
    parcel: &Parcel,
    proj: &Proj,
    from: &SpatialReference,
    to: &SpatialReference,
) -> Result<Parcel> {
    let projected: MultiPolygon<f64> = parcel
        .geometry()
        .try_map_coords(|coord| {
            proj.convert((coord.x, coord.y))
                .map(|(x, y)| Coord { x, y })
        })
        .context(error::ProjConversionSnafu {
            from: from.clone(),
            to: to.clone(),
        })?;

    let projected = Parcel::new(projected)?;

    // PROJ silently passes coordinates through for some broken definitions
    ensure!(
        projected.to_wkt() != parcel.to_wkt(),
        error::UnchangedProjectionSnafu {
            from: from.clone(),
            to: to.clone(),
        }
    );

    Ok(projected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn identity_does_not_touch_proj() {
        let transformer =
            CoordinateTransformer::new(SpatialReference::web_mercator(), SpatialReference::web_mercator())
                .unwrap();
        let parcel = Parcel::from_wkt("POLYGON ((0 0, 10 0, 10 10, 0 10, 0 0))").unwrap();

        assert!(transformer.is_identity());
        assert_eq!(transformer.to_native(&parcel).unwrap(), parcel);
        assert_eq!(transformer.to_display(&parcel).unwrap(), parcel);
    }

    #[test]
    fn round_trip_to_albers() {
        let albers: SpatialReference =
            "+proj=aea +lat_0=23 +lon_0=-96 +lat_1=29.5 +lat_2=45.5 +x_0=0 +y_0=0 +datum=WGS84 +units=m +no_defs"
                .parse()
                .unwrap();
        let transformer =
            CoordinateTransformer::new(SpatialReference::web_mercator(), albers).unwrap();

        let parcel = Parcel::from_wkt(
            "POLYGON ((-10963000 3429000, -10962000 3429000, -10962000 3430000, -10963000 3430000, -10963000 3429000))",
        )
        .unwrap();

        let native = transformer.to_native(&parcel).unwrap();
        assert_ne!(native.to_wkt(), parcel.to_wkt());

        let display = transformer.to_display(&native).unwrap();
        let expected = parcel.bounding_box();
        let actual = display.bounding_box();
        approx::assert_abs_diff_eq!(actual.min_x(), expected.min_x(), epsilon = 1e-3);
        approx::assert_abs_diff_eq!(actual.max_y(), expected.max_y(), epsilon = 1e-3);
    }

    #[test]
    fn invalid_definition() {
        let broken: SpatialReference = "+proj=doesnotexist".parse().unwrap();

        assert!(matches!(
            CoordinateTransformer::new(SpatialReference::web_mercator(), broken),
            Err(Error::ProjCreation { .. })
        ));
    }
}
