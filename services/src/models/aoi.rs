use std::path::Path;

use geo::Buffer;
use geojson::{Feature, FeatureCollection, Geometry, JsonObject};
use scenario_datatypes::primitives::Parcel;
use scenario_datatypes::spatial_reference::SpatialReference;
use serde_json::json;
use snafu::ResultExt;
use tracing::debug;

use crate::error::{self, Result};

/// Buffers the study area by `distance` and writes it as GeoJSON with a named `crs`.
///
/// `study_area` must be in `spatial_reference`, which must be a metric projection.
pub fn write_aoi(
    study_area: &Parcel,
    distance: f64,
    spatial_reference: &SpatialReference,
    path: &Path,
) -> Result<()> {
    if distance < 0. {
        return Err(scenario_datatypes::error::Error::NegativeBufferDistance { distance }.into());
    }

    let area_of_interest = study_area.geometry().buffer(distance);

    let mut foreign_members = JsonObject::new();
    foreign_members.insert(
        "crs".to_owned(),
        json!({"type": "name", "properties": {"name": spatial_reference.srs_string()}}),
    );

    let collection = FeatureCollection {
        bbox: None,
        features: vec![Feature {
            geometry: Some(Geometry::new(geojson::Value::from(&area_of_interest))),
            ..Default::default()
        }],
        foreign_members: Some(foreign_members),
    };

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).context(error::WorkspaceCreationSnafu {
            path: parent.to_path_buf(),
        })?;
    }
    std::fs::write(path, collection.to_string())?;

    debug!(path = %path.display(), distance, "wrote area of interest");

    Ok(())
}
