use std::path::Path;
use std::sync::Arc;

use scenario_datatypes::primitives::Parcel;
use scenario_operators::projection::CoordinateTransformer;
use scenario_operators::scenario::{ParcelRasterOperations, write_geotiff_atomically};
use scenario_operators::source::{GdalRasterSource, RasterSource};
use scenario_operators::statistics::{PixelCounts, PixelStatsAggregator};
use scenario_operators::thumbnail::{LulcColors, render_pattern_thumbnail, save_png};
use scenario_operators::util::gdal::gdal_path_from_location;
use serde_json::{Value, json};
use snafu::{Report, ResultExt};
use tracing::{error, info, instrument};

use crate::context::WorkerContext;
use crate::error::{self, Result};
use crate::jobs::{
    Job, JobEnvelope, JobLifecycle, JobState, JobType, ModelRunArgs, PatternThumbnailArgs,
    ResourceId, ResultPayload, WallpaperArgs,
};
use crate::models::{ModelInputs, write_aoi};

/// The payload of a finished job and the endpoint it is posted to.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchOutcome {
    /// `None` if the job type is unknown and the payload goes to the queue root
    pub endpoint: Option<&'static str>,
    pub payload: ResultPayload,
    pub lifecycle: JobLifecycle,
}

impl DispatchOutcome {
    pub fn succeeded(&self) -> bool {
        self.lifecycle.current() == JobState::Succeeded
    }
}

enum ScenarioOperation<'a> {
    Crop,
    Fill(i64),
    Wallpaper(&'a WallpaperArgs),
}

/// Runs jobs against the shared worker context and turns their outcome into result payloads.
#[derive(Clone)]
pub struct JobDispatcher {
    context: Arc<WorkerContext>,
}

impl JobDispatcher {
    pub fn new(context: Arc<WorkerContext>) -> Self {
        Self { context }
    }

    pub fn context(&self) -> &WorkerContext {
        &self.context
    }

    /// Runs a job to completion. Every error ends up as failure payload.
    #[instrument(skip_all, fields(job_type = %envelope.job_type, job_id = ?envelope.job_id()))]
    pub fn dispatch(&self, envelope: JobEnvelope) -> DispatchOutcome {
        let mut lifecycle = JobLifecycle::default();
        let endpoint = envelope.job_type().ok().map(JobType::endpoint);

        let job = match Job::try_from(&envelope) {
            Ok(job) => job,
            Err(rejection) => {
                error!("Rejected job: {}", Report::from_error(rejection));
                lifecycle.transition(JobState::Failed);
                return DispatchOutcome {
                    endpoint,
                    payload: ResultPayload::failed(envelope.server_attrs),
                    lifecycle,
                };
            }
        };

        lifecycle.transition(JobState::Running);
        info!("Starting job");

        let payload = match self.run(&job) {
            Ok(result) => {
                lifecycle.transition(JobState::Succeeded);
                ResultPayload::success(result, envelope.server_attrs)
            }
            Err(failure) => {
                error!("Job failed: {}", Report::from_error(failure));
                lifecycle.transition(JobState::Failed);
                ResultPayload::failed(envelope.server_attrs)
            }
        };

        info!(status = %payload.status, "Finished job");

        DispatchOutcome {
            endpoint,
            payload,
            lifecycle,
        }
    }

    /// Runs the operations of a job and returns its `result`.
    pub fn run(&self, job: &Job) -> Result<Value> {
        match job {
            Job::Crop { scenario_id, args } => self.scenario(
                job.job_type(),
                scenario_id,
                &args.target_parcel_wkt,
                &ScenarioOperation::Crop,
            ),
            Job::Fill { scenario_id, args } => self.scenario(
                job.job_type(),
                scenario_id,
                &args.target_parcel_wkt,
                &ScenarioOperation::Fill(args.lulc_class),
            ),
            Job::Wallpaper { scenario_id, args } => self.scenario(
                job.job_type(),
                scenario_id,
                &args.target_parcel_wkt,
                &ScenarioOperation::Wallpaper(args),
            ),
            Job::ParcelStats(args) => {
                let parcel = Parcel::from_wkt(&args.target_parcel_wkt)?;
                let source = GdalRasterSource::open_location(&args.lulc_source_url)?;
                let counts = self.counts_under_parcel(&parcel, &source)?;

                Ok(json!({ "lulc_stats": { "base": counts } }))
            }
            Job::PatternThumbnail { pattern_id, args } => self.pattern_thumbnail(pattern_id, args),
            Job::ModelRun(args) => self.model_run(args),
        }
    }

    fn scenario(
        &self,
        job_type: JobType,
        scenario_id: &ResourceId,
        parcel_wkt: &str,
        operation: &ScenarioOperation,
    ) -> Result<Value> {
        let parcel = Parcel::from_wkt(parcel_wkt)?;
        let target_path = self
            .context
            .outputs
            .scenario_raster(scenario_id, job_type.tag());

        let counts = self.context.base_lulc.with_source(|base| {
            let operations = ParcelRasterOperations::new(base, &self.context.transformer)?
                .with_block_size(self.context.wallpaper_block_size);
            let plan = operations.plan(&parcel)?;
            let aggregator = PixelStatsAggregator::new(self.context.transformer.display().clone());
            let counts_in_output = |written: &Path| {
                aggregator.counts_under_polygon(&parcel, &GdalRasterSource::open(written)?)
            };

            let counts = match operation {
                ScenarioOperation::Crop => write_geotiff_atomically(
                    &target_path,
                    &plan.grid_spec,
                    |writer| operations.crop(&plan, writer),
                    counts_in_output,
                ),
                ScenarioOperation::Fill(class) => write_geotiff_atomically(
                    &target_path,
                    &plan.grid_spec,
                    |writer| operations.fill(&plan, *class, writer),
                    counts_in_output,
                ),
                ScenarioOperation::Wallpaper(args) => {
                    let pattern = Parcel::from_wkt(&args.pattern_bbox_wkt)?;
                    let source = GdalRasterSource::open_location(&args.lulc_source_url)?;

                    write_geotiff_atomically(
                        &target_path,
                        &plan.grid_spec,
                        |writer| operations.wallpaper(&plan, &pattern, &source, writer),
                        counts_in_output,
                    )
                }
            }?;

            Ok(counts)
        })?;

        Ok(json!({
            "lulc_path": target_path.to_string_lossy(),
            "lulc_stats": counts,
        }))
    }

    fn counts_under_parcel<S: RasterSource + ?Sized>(
        &self,
        parcel: &Parcel,
        source: &S,
    ) -> Result<PixelCounts> {
        Ok(PixelStatsAggregator::new(self.context.transformer.display().clone())
            .counts_under_polygon(parcel, source)?)
    }

    fn pattern_thumbnail(
        &self,
        pattern_id: &ResourceId,
        args: &PatternThumbnailArgs,
    ) -> Result<Value> {
        let pattern = Parcel::from_wkt(&args.pattern_bbox_wkt)?;
        let colors = LulcColors::from_hex_colors(
            args.lulc_colors
                .iter()
                .map(|(class, color)| (*class, color.as_str())),
        )?;

        let thumbnail = self.context.base_lulc.with_source(|base| {
            Ok(render_pattern_thumbnail(
                &pattern,
                base,
                &self.context.transformer,
                &colors,
                self.context.thumbnail_scale_factor,
            )?)
        })?;

        let thumbnail_path = self.context.outputs.pattern_thumbnail(pattern_id);
        save_png(&thumbnail, &thumbnail_path)?;

        info!(path = %thumbnail_path.display(), "wrote pattern thumbnail");

        Ok(json!({ "thumbnail_path": thumbnail_path.to_string_lossy() }))
    }

    fn model_run(&self, args: &ModelRunArgs) -> Result<Value> {
        let model = args.invest_model;
        let study_area = Parcel::from_wkt(&args.study_area_wkt)?;

        let workspace = self
            .context
            .outputs
            .model_workspace(model, &args.scenario_id);
        std::fs::create_dir_all(&workspace).context(error::WorkspaceCreationSnafu {
            path: workspace.clone(),
        })?;

        let lulc_path = gdal_path_from_location(&args.lulc_source_url);
        let lulc_path = lulc_path.to_string_lossy();
        let inputs = ModelInputs {
            lulc_path: &lulc_path,
            workspace: &workspace,
            data_directory: &self.context.model_data_directory,
        };

        let serviceshed = match model.serviceshed_distance() {
            Some(distance) => {
                self.write_area_of_interest(&study_area, &args.lulc_source_url, distance, &inputs.aoi_path())?;
                inputs.aoi_path().to_string_lossy().into_owned()
            }
            None => String::new(),
        };

        let model_args = model.build_args(&inputs);
        info!(%model, ?model_args, "Running model");

        let result_path = self
            .context
            .model_executor
            .execute(model, &model_args, &workspace)?;

        Ok(json!({
            "invest-result": result_path.to_string_lossy(),
            "model": model,
            "serviceshed": serviceshed,
        }))
    }

    /// The area of interest is written in the projection of the land-cover raster of the run.
    fn write_area_of_interest(
        &self,
        study_area: &Parcel,
        lulc_location: &str,
        distance: f64,
        aoi_path: &Path,
    ) -> Result<()> {
        let lulc = GdalRasterSource::open_location(lulc_location)?;
        let spatial_reference = &lulc.grid_spec().spatial_reference;

        let transformer = CoordinateTransformer::new(
            self.context.transformer.display().clone(),
            spatial_reference.clone(),
        )?;

        write_aoi(
            &transformer.to_native(study_area)?,
            distance,
            spatial_reference,
            aoi_path,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::JobStatus;
    use crate::models::InvestModel;
    use crate::util::tests::{
        FIXTURE_NO_DATA, FakeModelExecutor, fixture_base_lulc, fixture_context,
        fixture_context_with_executor, fixture_parcel_wkt, striped_source, write_geotiff,
    };
    use pretty_assertions::assert_eq;
    use serde_json::Map;
    use std::path::PathBuf;

    fn dispatcher(base_class: i32, outputs: &Path) -> JobDispatcher {
        JobDispatcher::new(Arc::new(
            fixture_context(fixture_base_lulc(base_class), outputs).unwrap(),
        ))
    }

    fn envelope(value: Value) -> JobEnvelope {
        JobEnvelope::from_value(value).unwrap().unwrap()
    }

    fn server_attrs(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected an object"),
        }
    }

    /// a raster source on the base grid written to `dir`
    fn striped_geotiff(dir: &Path) -> PathBuf {
        write_geotiff(&dir.join("source.tif"), &striped_source().unwrap()).unwrap()
    }

    #[test]
    fn fill_job() {
        let dir = tempfile::tempdir().unwrap();
        let dispatcher = dispatcher(FIXTURE_NO_DATA, dir.path());

        let outcome = dispatcher.dispatch(envelope(json!({
            "job_type": "lulc_fill",
            "server_attrs": {"job_id": 1, "scenario_id": 3},
            "job_args": {"target_parcel_wkt": fixture_parcel_wkt(), "lulc_class": 15}
        })));

        let expected_path = dir.path().join("scenarios/3/3_lulc_fill.tif");

        assert_eq!(outcome.endpoint, Some("scenario"));
        assert_eq!(
            outcome.lifecycle.states(),
            [JobState::Received, JobState::Running, JobState::Succeeded]
        );
        assert_eq!(
            outcome.payload,
            ResultPayload::success(
                json!({
                    "lulc_path": expected_path.to_string_lossy(),
                    "lulc_stats": {"15": 40}
                }),
                server_attrs(json!({"job_id": 1, "scenario_id": 3}))
            )
        );
        assert!(expected_path.exists());
        assert_eq!(std::fs::read_dir(dir.path().join("scenarios/3")).unwrap().count(), 1);
    }

    #[test]
    fn fill_keeps_no_data_outside_of_parcel() {
        let dir = tempfile::tempdir().unwrap();
        let dispatcher = dispatcher(FIXTURE_NO_DATA, dir.path());

        let outcome = dispatcher.dispatch(envelope(json!({
            "job_type": "lulc_fill",
            "server_attrs": {"job_id": 1, "scenario_id": 3},
            "job_args": {"target_parcel_wkt": fixture_parcel_wkt(), "lulc_class": 15}
        })));
        assert!(outcome.succeeded());

        let scenario =
            GdalRasterSource::open(&dir.path().join("scenarios/3/3_lulc_fill.tif")).unwrap();
        let grid = scenario
            .read_window(&scenario.grid_spec().full_window())
            .unwrap();

        let filled = grid.data.iter().filter(|&&value| value == 15).count();
        let sum: i64 = grid
            .data
            .iter()
            .filter(|&&value| value != FIXTURE_NO_DATA)
            .map(|&value| i64::from(value))
            .sum();

        assert_eq!(filled, 40);
        assert_eq!(sum, 600);
    }

    #[test]
    fn crop_job() {
        let dir = tempfile::tempdir().unwrap();
        let dispatcher = dispatcher(5, dir.path());

        let outcome = dispatcher.dispatch(envelope(json!({
            "job_type": "lulc_crop",
            "server_attrs": {"job_id": 2, "scenario_id": "s"},
            "job_args": {"target_parcel_wkt": fixture_parcel_wkt()}
        })));

        assert!(outcome.succeeded());
        assert_eq!(outcome.payload.result["lulc_stats"], json!({"5": 40}));
        assert!(dir.path().join("scenarios/s/s_lulc_crop.tif").exists());
    }

    #[test]
    fn wallpaper_job() {
        let dir = tempfile::tempdir().unwrap();
        let source = striped_geotiff(dir.path());
        let dispatcher = dispatcher(FIXTURE_NO_DATA, dir.path());

        let outcome = dispatcher.dispatch(envelope(json!({
            "job_type": "wallpaper",
            "server_attrs": {"job_id": 3, "scenario_id": 4},
            "job_args": {
                "target_parcel_wkt": fixture_parcel_wkt(),
                // the top left 3 x 2 pixels
                "pattern_bbox_wkt": "POLYGON ((-670 670, -590 670, -590 620, -670 620, -670 670))",
                "lulc_source_url": source.to_string_lossy(),
            }
        })));

        assert!(outcome.succeeded());

        let stats: PixelCounts =
            serde_json::from_value(outcome.payload.result["lulc_stats"].clone()).unwrap();
        assert_eq!(stats.total(), 40);
        // the pattern only contains the classes 0 to 3
        assert!(stats.iter().all(|(class, _)| (0..=3).contains(&class)));
    }

    #[test]
    fn wallpaper_job_with_missing_source_fails() {
        let dir = tempfile::tempdir().unwrap();
        let dispatcher = dispatcher(FIXTURE_NO_DATA, dir.path());

        let outcome = dispatcher.dispatch(envelope(json!({
            "job_type": "wallpaper",
            "server_attrs": {"job_id": 3, "scenario_id": 4},
            "job_args": {
                "target_parcel_wkt": fixture_parcel_wkt(),
                "pattern_bbox_wkt": "POLYGON ((-670 670, -590 670, -590 620, -670 620, -670 670))",
                "lulc_source_url": dir.path().join("missing.tif").to_string_lossy(),
            }
        })));

        assert_eq!(outcome.payload.status, JobStatus::Failed);
        assert!(!dir.path().join("scenarios/4/4_wallpaper.tif").exists());
    }

    #[test]
    fn parcel_stats_job() {
        let dir = tempfile::tempdir().unwrap();
        let source = striped_geotiff(dir.path());
        let dispatcher = dispatcher(FIXTURE_NO_DATA, dir.path());

        let outcome = dispatcher.dispatch(envelope(json!({
            "job_type": "stats_under_parcel",
            "server_attrs": {"job_id": 4},
            "job_args": {
                "target_parcel_wkt": fixture_parcel_wkt(),
                "lulc_source_url": source.to_string_lossy(),
            }
        })));

        assert_eq!(outcome.endpoint, Some("parcel_stats"));
        assert!(outcome.succeeded());

        let stats: PixelCounts =
            serde_json::from_value(outcome.payload.result["lulc_stats"]["base"].clone()).unwrap();
        assert_eq!(stats.total(), 40);
        assert!(stats.iter().all(|(_, count)| count > 0));
    }

    #[test]
    fn pattern_thumbnail_job() {
        let dir = tempfile::tempdir().unwrap();
        let dispatcher = dispatcher(11, dir.path());

        let outcome = dispatcher.dispatch(envelope(json!({
            "job_type": "pattern_thumbnail",
            "server_attrs": {"job_id": 5, "pattern_id": 8},
            "job_args": {
                "pattern_bbox_wkt": "POLYGON ((-670 670, -590 670, -590 620, -670 620, -670 670))",
                "lulc_colors": {"11": "#102030"}
            }
        })));

        let thumbnail_path = dir.path().join("patterns/8.png");

        assert_eq!(outcome.endpoint, Some("pattern"));
        assert_eq!(
            outcome.payload.result,
            json!({"thumbnail_path": thumbnail_path.to_string_lossy()})
        );
        assert!(thumbnail_path.exists());
    }

    #[test]
    fn carbon_model_run() {
        let dir = tempfile::tempdir().unwrap();
        let executor = Arc::new(FakeModelExecutor::default());
        let dispatcher = JobDispatcher::new(Arc::new(
            fixture_context_with_executor(
                fixture_base_lulc(FIXTURE_NO_DATA),
                dir.path(),
                executor.clone(),
            )
            .unwrap(),
        ));

        let outcome = dispatcher.dispatch(envelope(json!({
            "job_type": "invest",
            "server_attrs": {"job_id": 6},
            "job_args": {
                "invest_model": "carbon",
                "scenario_id": 3,
                "lulc_source_url": "/outputs/scenarios/3/3_lulc_fill.tif",
                "study_area_wkt": fixture_parcel_wkt(),
            }
        })));

        let workspace = dir.path().join("model_outputs/carbon-3");

        assert_eq!(outcome.endpoint, Some("invest"));
        assert_eq!(
            outcome.payload.result,
            json!({
                "invest-result": workspace.join("result").to_string_lossy(),
                "model": "carbon",
                "serviceshed": "",
            })
        );

        let runs = executor.runs();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].0, InvestModel::Carbon);
        assert_eq!(
            runs[0].1["lulc_cur_path"],
            json!("/outputs/scenarios/3/3_lulc_fill.tif")
        );
    }

    #[test]
    fn urban_cooling_model_run_writes_area_of_interest() {
        let dir = tempfile::tempdir().unwrap();
        let source = striped_geotiff(dir.path());
        let dispatcher = dispatcher(FIXTURE_NO_DATA, dir.path());

        let outcome = dispatcher.dispatch(envelope(json!({
            "job_type": "invest",
            "server_attrs": {"job_id": 7},
            "job_args": {
                "invest_model": "urban_cooling_model",
                "scenario_id": 3,
                "lulc_source_url": source.to_string_lossy(),
                "study_area_wkt": fixture_parcel_wkt(),
            }
        })));

        let aoi_path = dir
            .path()
            .join("model_outputs/urban_cooling_model-3/aoi.geojson");

        assert!(outcome.succeeded());
        assert_eq!(
            outcome.payload.result["serviceshed"],
            json!(aoi_path.to_string_lossy())
        );
        assert!(aoi_path.exists());
    }

    #[test]
    fn failing_model_run() {
        let dir = tempfile::tempdir().unwrap();
        let dispatcher = JobDispatcher::new(Arc::new(
            fixture_context_with_executor(
                fixture_base_lulc(FIXTURE_NO_DATA),
                dir.path(),
                Arc::new(FakeModelExecutor::failing()),
            )
            .unwrap(),
        ));

        let outcome = dispatcher.dispatch(envelope(json!({
            "job_type": "invest",
            "server_attrs": {"job_id": 8},
            "job_args": {
                "invest_model": "carbon",
                "scenario_id": 3,
                "lulc_source_url": "/lulc.tif",
                "study_area_wkt": fixture_parcel_wkt(),
            }
        })));

        assert_eq!(
            outcome.payload,
            ResultPayload::failed(server_attrs(json!({"job_id": 8})))
        );
        assert_eq!(
            outcome.lifecycle.states(),
            [JobState::Received, JobState::Running, JobState::Failed]
        );
    }

    #[test]
    fn unknown_job_never_runs() {
        let dir = tempfile::tempdir().unwrap();
        let dispatcher = dispatcher(FIXTURE_NO_DATA, dir.path());

        let outcome = dispatcher.dispatch(envelope(json!({
            "job_type": "teleport",
            "server_attrs": {"job_id": 9},
            "job_args": {}
        })));

        assert_eq!(outcome.endpoint, None);
        assert_eq!(
            outcome.lifecycle.states(),
            [JobState::Received, JobState::Failed]
        );
        assert_eq!(
            serde_json::to_value(&outcome.payload).unwrap(),
            json!({"result": "failed", "server_attrs": {"job_id": 9}, "status": "failed"})
        );
    }

    #[test]
    fn malformed_job_never_runs() {
        let dir = tempfile::tempdir().unwrap();
        let dispatcher = dispatcher(FIXTURE_NO_DATA, dir.path());

        let outcome = dispatcher.dispatch(envelope(json!({
            "job_type": "lulc_fill",
            "server_attrs": {"job_id": 10, "scenario_id": 1},
            "job_args": {"target_parcel_wkt": fixture_parcel_wkt()}
        })));

        assert_eq!(outcome.endpoint, Some("scenario"));
        assert_eq!(
            outcome.lifecycle.states(),
            [JobState::Received, JobState::Failed]
        );
    }

    #[test]
    fn invalid_geometry_fails_while_running() {
        let dir = tempfile::tempdir().unwrap();
        let dispatcher = dispatcher(FIXTURE_NO_DATA, dir.path());

        let outcome = dispatcher.dispatch(envelope(json!({
            "job_type": "lulc_crop",
            "server_attrs": {"job_id": 11, "scenario_id": 1},
            "job_args": {"target_parcel_wkt": "POLYGON EMPTY"}
        })));

        assert_eq!(
            outcome.lifecycle.states(),
            [JobState::Received, JobState::Running, JobState::Failed]
        );
        assert_eq!(outcome.payload.result, json!("failed"));
    }

    #[test]
    fn class_code_out_of_data_type_fails() {
        let dir = tempfile::tempdir().unwrap();
        let dispatcher = dispatcher(FIXTURE_NO_DATA, dir.path());

        let outcome = dispatcher.dispatch(envelope(json!({
            "job_type": "lulc_fill",
            "server_attrs": {"job_id": 12, "scenario_id": 1},
            "job_args": {"target_parcel_wkt": fixture_parcel_wkt(), "lulc_class": 300}
        })));

        assert_eq!(outcome.payload.status, JobStatus::Failed);
        assert!(!dir.path().join("scenarios/1/1_lulc_fill.tif").exists());
    }
}
