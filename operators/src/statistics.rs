use std::collections::BTreeMap;

use scenario_datatypes::primitives::Parcel;
use scenario_datatypes::spatial_reference::SpatialReference;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::extent::GridAligner;
use crate::projection::CoordinateTransformer;
use crate::rasterization::rasterize_all_touched;
use crate::source::RasterSource;
use crate::util::Result;

/// Number of pixels per land-cover class. Only classes that occur are contained.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PixelCounts(BTreeMap<i64, u64>);

impl PixelCounts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, class: i64) {
        *self.0.entry(class).or_insert(0) += 1;
    }

    pub fn get(&self, class: i64) -> Option<u64> {
        self.0.get(&class).copied()
    }

    pub fn total(&self) -> u64 {
        self.0.values().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (i64, u64)> + '_ {
        self.0.iter().map(|(&class, &count)| (class, count))
    }

    /// The share of each class in the total count, rounded to 4 decimals.
    pub fn fractions(&self) -> BTreeMap<i64, f64> {
        let total = self.total() as f64;

        self.0
            .iter()
            .map(|(&class, &count)| (class, (count as f64 / total * 1e4).round() / 1e4))
            .collect()
    }
}

impl FromIterator<(i64, u64)> for PixelCounts {
    fn from_iter<T: IntoIterator<Item = (i64, u64)>>(iter: T) -> Self {
        Self(iter.into_iter().filter(|&(_, count)| count > 0).collect())
    }
}

/// Counts the land-cover classes of a raster under a polygon.
pub struct PixelStatsAggregator {
    display_projection: SpatialReference,
}

impl PixelStatsAggregator {
    pub fn new(display_projection: SpatialReference) -> Self {
        Self { display_projection }
    }

    /// Counts the pixels of `source` touched by `parcel` (in display projection) per value.
    ///
    /// Pixels with the nodata value are counted like any other value.
    pub fn counts_under_polygon<S: RasterSource + ?Sized>(
        &self,
        parcel: &Parcel,
        source: &S,
    ) -> Result<PixelCounts> {
        let grid_spec = source.grid_spec();

        let transformer = CoordinateTransformer::new(
            self.display_projection.clone(),
            grid_spec.spatial_reference.clone(),
        )?;
        let native = transformer.to_native(parcel)?;

        let mut counts = PixelCounts::new();

        let window = GridAligner::new(grid_spec.geo_transform)
            .align(&native.bounding_box())
            .window;
        let Some(window) = window.intersection(&grid_spec.full_window()) else {
            debug!("polygon does not intersect the raster");
            return Ok(counts);
        };

        let values = source.read_window(&window)?;
        let mask = rasterize_all_touched(native.geometry(), &grid_spec.geo_transform, &window);

        for (&value, &is_masked) in values.data.iter().zip(&mask.data) {
            if is_masked == 1 {
                counts.add(i64::from(value));
            }
        }

        debug!(pixels = counts.total(), "counted pixels under polygon");

        Ok(counts)
    }
}
