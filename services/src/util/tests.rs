//! Fixtures for tests of the worker and its users.

use std::f64::consts::PI;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use scenario_datatypes::raster::{ClassCode, GeoTransform, Grid2D, RasterDataType, RasterGridSpec};
use scenario_datatypes::spatial_reference::SpatialReference;
use scenario_operators::source::{MemoryRasterSource, RasterSource};
use scenario_operators::writer::{GeoTiffRasterWriter, RasterWriter};
use serde_json::{Map, Value};

use crate::context::{BaseLulc, OutputDirectories, WorkerContext};
use crate::error::{Error, Result};
use crate::models::{InvestModel, ModelExecutor};

pub const FIXTURE_NO_DATA: ClassCode = 255;

/// A 40 x 40 grid of 34 m pixels in web mercator around the origin.
pub fn fixture_grid_spec() -> RasterGridSpec {
    RasterGridSpec {
        geo_transform: GeoTransform::new((-680., 680.).into(), 34., -34.),
        size_x: 40,
        size_y: 40,
        spatial_reference: SpatialReference::web_mercator(),
        no_data_value: Some(f64::from(FIXTURE_NO_DATA)),
        data_type: RasterDataType::U8,
    }
}

/// A base land-cover on the fixture grid where every pixel is `class`
pub fn fixture_base_lulc(class: ClassCode) -> BaseLulc {
    BaseLulc::Memory(MemoryRasterSource::new_filled(fixture_grid_spec(), class))
}

/// A raster on the fixture grid where every pixel has the class `row % 7 + col % 3`
pub fn striped_source() -> Result<MemoryRasterSource> {
    let spec = fixture_grid_spec();
    let data = (0..spec.size_y)
        .flat_map(|row| (0..spec.size_x).map(move |col| (row % 7 + col % 3) as ClassCode))
        .collect();
    let grid = Grid2D::new([spec.size_y, spec.size_x].into(), data)?;

    Ok(MemoryRasterSource::new(spec, grid)?)
}

/// Writes a raster as GeoTIFF, e.g., as source of wallpaper or statistics jobs.
pub fn write_geotiff(path: &Path, source: &MemoryRasterSource) -> Result<PathBuf> {
    let mut writer = GeoTiffRasterWriter::create(path, source.grid_spec().clone())?;
    writer.write_window(&source.grid_spec().full_window(), source.grid())?;
    Ok(writer.finish())
}

/// A regular polygon with `vertices` corners approximating a circle
pub fn circle_wkt(center: (f64, f64), radius: f64, vertices: usize) -> String {
    let ring = (0..=vertices)
        .map(|i| {
            let angle = 2. * PI * (i % vertices) as f64 / vertices as f64;
            format!(
                "{} {}",
                center.0 + radius * angle.cos(),
                center.1 + radius * angle.sin()
            )
        })
        .collect::<Vec<_>>();

    format!("POLYGON (({}))", ring.join(", "))
}

/// A 100 m circle that touches exactly 40 pixels of [`fixture_grid_spec`]
pub fn fixture_parcel_wkt() -> String {
    circle_wkt((3.5, 12.5), 100., 64)
}

/// A worker context on the fixture grid that writes to `outputs` and never runs real models.
pub fn fixture_context(base_lulc: BaseLulc, outputs: &Path) -> Result<WorkerContext> {
    fixture_context_with_executor(base_lulc, outputs, Arc::new(FakeModelExecutor::default()))
}

pub fn fixture_context_with_executor(
    base_lulc: BaseLulc,
    outputs: &Path,
    model_executor: Arc<dyn ModelExecutor>,
) -> Result<WorkerContext> {
    let outputs = OutputDirectories::new(outputs);
    outputs.prepare()?;

    WorkerContext::new(
        base_lulc,
        SpatialReference::web_mercator(),
        outputs,
        model_executor,
    )
}

/// Records model runs and reports `<workspace>/result` as their result.
#[derive(Debug, Default)]
pub struct FakeModelExecutor {
    runs: Mutex<Vec<(InvestModel, Map<String, Value>)>>,
    fail: bool,
}

impl FakeModelExecutor {
    pub fn failing() -> Self {
        Self {
            runs: Mutex::default(),
            fail: true,
        }
    }

    pub fn runs(&self) -> Vec<(InvestModel, Map<String, Value>)> {
        self.runs
            .lock()
            .map(|runs| runs.clone())
            .unwrap_or_default()
    }
}

impl ModelExecutor for FakeModelExecutor {
    fn execute(
        &self,
        model: InvestModel,
        args: &Map<String, Value>,
        workspace: &Path,
    ) -> Result<PathBuf> {
        if let Ok(mut runs) = self.runs.lock() {
            runs.push((model, args.clone()));
        }

        if self.fail {
            return Err(Error::ModelExecution {
                model: model.to_string(),
                reason: "fake failure".to_owned(),
            });
        }

        Ok(workspace.join("result"))
    }
}
