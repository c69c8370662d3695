use std::path::{Path, PathBuf};
use std::sync::Arc;

use scenario_datatypes::raster::RasterGridSpec;
use scenario_datatypes::spatial_reference::SpatialReference;
use scenario_operators::projection::CoordinateTransformer;
use scenario_operators::source::{GdalRasterSource, MemoryRasterSource, RasterSource};
use scenario_operators::thumbnail::DEFAULT_THUMBNAIL_SCALE_FACTOR;
use scenario_operators::writer::GEOTIFF_BLOCK_SIZE;
use snafu::{ResultExt, ensure};
use tracing::info;

use crate::config;
use crate::error::{self, Result};
use crate::jobs::ResourceId;
use crate::models::{CommandModelExecutor, InvestModel, ModelExecutor};

/// The read-only land-cover raster that all scenarios are derived from.
///
/// A GDAL dataset cannot be shared between threads, so file based rasters are opened per job.
#[derive(Debug)]
pub enum BaseLulc {
    Gdal {
        path: PathBuf,
        grid_spec: RasterGridSpec,
    },
    Memory(MemoryRasterSource),
}

impl BaseLulc {
    /// Opens the raster once to read its grid.
    pub fn open_gdal(path: &Path) -> Result<Self> {
        let source = GdalRasterSource::open(path)?;

        Ok(Self::Gdal {
            path: path.to_owned(),
            grid_spec: source.grid_spec().clone(),
        })
    }

    pub fn grid_spec(&self) -> &RasterGridSpec {
        match self {
            BaseLulc::Gdal { grid_spec, .. } => grid_spec,
            BaseLulc::Memory(source) => source.grid_spec(),
        }
    }

    pub fn spatial_reference(&self) -> &SpatialReference {
        &self.grid_spec().spatial_reference
    }

    /// Fails if `expected` is given and the raster is in another spatial reference.
    pub fn ensure_projection(&self, expected: Option<&SpatialReference>) -> Result<()> {
        if let Some(expected) = expected {
            ensure!(
                expected == self.spatial_reference(),
                error::BaseLulcProjectionMismatchSnafu {
                    configured: expected.to_string(),
                    actual: self.spatial_reference().to_string(),
                }
            );
        }
        Ok(())
    }

    /// Calls `f` with a readable source of the raster.
    pub fn with_source<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&dyn RasterSource) -> Result<T>,
    {
        match self {
            BaseLulc::Gdal { path, .. } => f(&GdalRasterSource::open(path)?),
            BaseLulc::Memory(source) => f(source),
        }
    }
}

/// The layout of the output directory.
#[derive(Debug, Clone)]
pub struct OutputDirectories {
    root: PathBuf,
}

impl OutputDirectories {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Creates the directories for scenarios, model outputs and pattern thumbnails.
    pub fn prepare(&self) -> Result<()> {
        for dir in [self.scenarios(), self.model_outputs(), self.patterns()] {
            std::fs::create_dir_all(&dir)
                .context(error::WorkspaceCreationSnafu { path: dir.clone() })?;
        }
        Ok(())
    }

    pub fn scenarios(&self) -> PathBuf {
        self.root.join("scenarios")
    }

    pub fn model_outputs(&self) -> PathBuf {
        self.root.join("model_outputs")
    }

    pub fn patterns(&self) -> PathBuf {
        self.root.join("patterns")
    }

    /// `scenarios/<id>/<id>_<tag>.tif`
    pub fn scenario_raster(&self, scenario_id: &ResourceId, tag: &str) -> PathBuf {
        self.scenarios()
            .join(scenario_id.as_str())
            .join(format!("{scenario_id}_{tag}.tif"))
    }

    /// `model_outputs/<model>-<scenario id>`
    pub fn model_workspace(&self, model: InvestModel, scenario_id: &ResourceId) -> PathBuf {
        self.model_outputs().join(format!("{model}-{scenario_id}"))
    }

    /// `patterns/<id>.png`
    pub fn pattern_thumbnail(&self, pattern_id: &ResourceId) -> PathBuf {
        self.patterns().join(format!("{pattern_id}.png"))
    }
}

/// Everything a job needs besides its own arguments.
pub struct WorkerContext {
    pub base_lulc: BaseLulc,
    pub transformer: CoordinateTransformer,
    pub outputs: OutputDirectories,
    pub wallpaper_block_size: usize,
    pub thumbnail_scale_factor: u32,
    /// biophysical tables and auxiliary rasters of the models
    pub model_data_directory: PathBuf,
    pub model_executor: Arc<dyn ModelExecutor>,
}

impl WorkerContext {
    /// A context with default settings. Parcels are exchanged in `display_projection` and
    /// projected into the spatial reference of the base raster.
    pub fn new(
        base_lulc: BaseLulc,
        display_projection: SpatialReference,
        outputs: OutputDirectories,
        model_executor: Arc<dyn ModelExecutor>,
    ) -> Result<Self> {
        let transformer =
            CoordinateTransformer::new(display_projection, base_lulc.spatial_reference().clone())?;

        Ok(Self {
            base_lulc,
            transformer,
            outputs,
            wallpaper_block_size: GEOTIFF_BLOCK_SIZE,
            thumbnail_scale_factor: DEFAULT_THUMBNAIL_SCALE_FACTOR,
            model_data_directory: PathBuf::from("."),
            model_executor,
        })
    }

    /// Builds the context from the settings and opens the base raster.
    pub fn from_config() -> Result<Self> {
        let base_config: config::BaseLulc = config::get_config_element()?;
        let projection: config::Projection = config::get_config_element()?;
        let outputs: config::Outputs = config::get_config_element()?;
        let wallpaper: config::Wallpaper = config::get_config_element()?;
        let thumbnail: config::Thumbnail = config::get_config_element()?;
        let models: config::Models = config::get_config_element()?;

        let base_lulc = BaseLulc::open_gdal(Path::new(&base_config.path))?;
        base_lulc.ensure_projection(base_config.native_projection.as_ref())?;

        info!(
            path = %base_config.path,
            spatial_reference = %base_lulc.spatial_reference(),
            "opened base land-cover"
        );

        let mut context = Self::new(
            base_lulc,
            projection.display,
            OutputDirectories::new(outputs.directory),
            Arc::new(CommandModelExecutor::new(&models.invest_command)),
        )?;
        context.wallpaper_block_size = wallpaper.block_size;
        context.thumbnail_scale_factor = thumbnail.scale_factor;
        context.model_data_directory = models.data_directory;

        Ok(context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::tests::{FakeModelExecutor, fixture_base_lulc};

    #[test]
    fn output_layout() {
        let outputs = OutputDirectories::new("/outputs");
        let scenario_id = ResourceId::from(7_u64);

        assert_eq!(
            outputs.scenario_raster(&scenario_id, "lulc_fill"),
            PathBuf::from("/outputs/scenarios/7/7_lulc_fill.tif")
        );
        assert_eq!(
            outputs.model_workspace(InvestModel::UrbanNatureAccess, &scenario_id),
            PathBuf::from("/outputs/model_outputs/urban_nature_access-7")
        );
        assert_eq!(
            outputs.pattern_thumbnail(&ResourceId::from("p1")),
            PathBuf::from("/outputs/patterns/p1.png")
        );
    }

    #[test]
    fn prepares_directories() {
        let dir = tempfile::tempdir().unwrap();
        let outputs = OutputDirectories::new(dir.path().join("out"));

        outputs.prepare().unwrap();
        // twice is fine
        outputs.prepare().unwrap();

        assert!(outputs.scenarios().is_dir());
        assert!(outputs.model_outputs().is_dir());
        assert!(outputs.patterns().is_dir());
    }

    #[test]
    fn checks_base_projection() {
        let base = fixture_base_lulc(255);

        assert!(base.ensure_projection(None).is_ok());
        assert!(
            base.ensure_projection(Some(&SpatialReference::web_mercator()))
                .is_ok()
        );
        assert!(matches!(
            base.ensure_projection(Some(&SpatialReference::epsg(5070))),
            Err(error::Error::BaseLulcProjectionMismatch { .. })
        ));
    }

    #[test]
    fn context_projects_into_base_projection() {
        let context = WorkerContext::new(
            fixture_base_lulc(255),
            SpatialReference::web_mercator(),
            OutputDirectories::new("/outputs"),
            Arc::new(FakeModelExecutor::default()),
        )
        .unwrap();

        assert!(context.transformer.is_identity());
        assert_eq!(context.wallpaper_block_size, 256);
    }
}
