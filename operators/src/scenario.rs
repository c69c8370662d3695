use std::path::Path;

use scenario_datatypes::primitives::Parcel;
use scenario_datatypes::raster::{ClassCode, Grid2D, GridShape2D, PixelWindow, RasterGridSpec};
use snafu::{ResultExt, ensure};
use tracing::{debug, info};

use crate::error::{self, Error};
use crate::extent::{AlignedExtent, GridAligner, LARGEST_SERVICESHED, ServiceshedExtentBuilder};
use crate::projection::CoordinateTransformer;
use crate::rasterization::rasterize_all_touched;
use crate::source::RasterSource;
use crate::tiler::WallpaperTiler;
use crate::util::Result;
use crate::writer::{GEOTIFF_BLOCK_SIZE, GeoTiffRasterWriter, RasterWriter};

/// Everything that is needed to generate a scenario raster for a parcel.
#[derive(Debug, Clone)]
pub struct ScenarioPlan {
    /// the parcel in the projection of the base raster
    pub native_parcel: Parcel,
    /// the serviceshed around the parcel on the base grid
    pub extent: AlignedExtent,
    /// the grid of the output raster
    pub grid_spec: RasterGridSpec,
}

/// Generates scenario rasters by modifying the base land-cover under a parcel.
///
/// All outputs lie on the base grid and cover the serviceshed of the parcel.
pub struct ParcelRasterOperations<'a, S: ?Sized> {
    base: &'a S,
    transformer: &'a CoordinateTransformer,
    block_shape: GridShape2D,
    buffer_distance: f64,
}

enum Burn<'t> {
    Nothing,
    Class(ClassCode),
    Pattern(&'t WallpaperTiler),
}

impl<'a, S> ParcelRasterOperations<'a, S>
where
    S: RasterSource + ?Sized,
{
    /// `transformer` must project into the spatial reference of `base`.
    pub fn new(base: &'a S, transformer: &'a CoordinateTransformer) -> Result<Self> {
        ensure!(
            transformer.native() == &base.grid_spec().spatial_reference,
            error::RasterAlignmentSnafu {
                reason: format!(
                    "base raster is in {} but parcels are projected to {}",
                    base.grid_spec().spatial_reference,
                    transformer.native()
                ),
            }
        );

        Ok(Self {
            base,
            transformer,
            block_shape: [GEOTIFF_BLOCK_SIZE, GEOTIFF_BLOCK_SIZE].into(),
            buffer_distance: LARGEST_SERVICESHED,
        })
    }

    #[must_use]
    pub fn with_block_size(mut self, block_size: usize) -> Self {
        self.block_shape = [block_size.max(1), block_size.max(1)].into();
        self
    }

    #[must_use]
    pub fn with_buffer_distance(mut self, buffer_distance: f64) -> Self {
        self.buffer_distance = buffer_distance;
        self
    }

    /// Projects the parcel (in display projection) and computes the output grid around it.
    pub fn plan(&self, parcel: &Parcel) -> Result<ScenarioPlan> {
        let native_parcel = self.transformer.to_native(parcel)?;

        let extent = ServiceshedExtentBuilder::new(self.transformer, self.base.grid_spec().geo_transform)
            .build_native_extent(&native_parcel, self.buffer_distance)?;

        let grid_spec = self.base.grid_spec().with_window(&extent.window);

        Ok(ScenarioPlan {
            native_parcel,
            extent,
            grid_spec,
        })
    }

    /// Copies the base pixels of the serviceshed.
    pub fn crop<W: RasterWriter>(&self, plan: &ScenarioPlan, writer: &mut W) -> Result<()> {
        self.generate(plan, self.base, (0, 0), &Burn::Nothing, writer)
    }

    /// Copies the base pixels of the serviceshed and sets all pixels touched by the parcel to
    /// `class`.
    pub fn fill<W: RasterWriter>(
        &self,
        plan: &ScenarioPlan,
        class: i64,
        writer: &mut W,
    ) -> Result<()> {
        let data_type = self.base.grid_spec().data_type;
        ensure!(
            data_type.is_valid(class),
            error::InvalidClassCodeSnafu { class, data_type }
        );

        self.generate(
            plan,
            self.base,
            (0, 0),
            &Burn::Class(class as ClassCode),
            writer,
        )
    }

    /// Copies the pixels of `source` in the serviceshed and repeats the land-cover of `source`
    /// under the bounding box of `pattern` (in display projection) over the parcel.
    ///
    /// `source` must lie on the base grid.
    pub fn wallpaper<P, W>(
        &self,
        plan: &ScenarioPlan,
        pattern: &Parcel,
        source: &P,
        writer: &mut W,
    ) -> Result<()>
    where
        P: RasterSource + ?Sized,
        W: RasterWriter,
    {
        let base_spec = self.base.grid_spec();
        let source_offset = base_spec
            .pixel_offset_of(source.grid_spec())
            .ok_or_else(|| Error::RasterAlignment {
                reason: format!(
                    "wallpaper source grid {:?} does not share the pixel grid of the base raster {:?}",
                    source.grid_spec().geo_transform,
                    base_spec.geo_transform
                ),
            })?;

        let native_pattern = self.transformer.to_native(pattern)?;
        let pattern_window = GridAligner::new(base_spec.geo_transform)
            .align(&native_pattern.bounding_box())
            .window;
        let tile = source.read_window(&pattern_window.translated(-source_offset.0, -source_offset.1))?;
        let tiler = WallpaperTiler::new(tile)?;

        debug!(?pattern_window, "extracted wallpaper pattern");

        self.generate(plan, source, source_offset, &Burn::Pattern(&tiler), writer)?;

        writer.build_overviews()
    }

    /// Writes the output raster block by block. Pixels are read from `source` whose origin lies
    /// at `source_offset` in the base pixel space.
    fn generate<P, W>(
        &self,
        plan: &ScenarioPlan,
        source: &P,
        source_offset: (isize, isize),
        burn: &Burn<'_>,
        writer: &mut W,
    ) -> Result<()>
    where
        P: RasterSource + ?Sized,
        W: RasterWriter,
    {
        ensure!(
            writer.grid_spec() == &plan.grid_spec,
            error::RasterAlignmentSnafu {
                reason: "output raster does not match the planned scenario grid",
            }
        );

        let base_geo_transform = self.base.grid_spec().geo_transform;
        let source_raster = source.grid_spec().full_window();
        let output_raster = PixelWindow::of_raster(plan.grid_spec.size_x, plan.grid_spec.size_y);

        for block in output_raster.blocks(self.block_shape) {
            let base_block = block.translated(plan.extent.window.start_x, plan.extent.window.start_y);
            let source_block = base_block.translated(-source_offset.0, -source_offset.1);

            let mut data = source.read_window(&source_block)?;

            let replacement = match burn {
                Burn::Nothing => None,
                Burn::Class(class) => Some(Grid2D::new_filled(block.shape(), *class)),
                Burn::Pattern(tiler) => Some(tiler.tile(base_block.start(), block.shape())),
            };

            if let Some(replacement) = replacement {
                let mask = rasterize_all_touched(
                    plan.native_parcel.geometry(),
                    &base_geo_transform,
                    &base_block,
                );
                burn_masked(&mut data, &replacement, &mask, &source_block, &source_raster);
            }

            writer.write_window(&block, &data)?;
        }

        Ok(())
    }
}

/// Replaces the pixels under the mask that lie inside of the source raster.
fn burn_masked(
    data: &mut Grid2D<ClassCode>,
    replacement: &Grid2D<ClassCode>,
    mask: &Grid2D<u8>,
    block: &PixelWindow,
    raster: &PixelWindow,
) {
    for y in 0..block.size_y {
        let row = block.start_y + y as isize;
        if row < raster.start_y || row >= raster.end_y() {
            continue;
        }

        for x in 0..block.size_x {
            let col = block.start_x + x as isize;
            if col < raster.start_x || col >= raster.end_x() || mask.get(y, x) != Some(1) {
                continue;
            }

            if let Some(value) = replacement.get(y, x) {
                data.set(y, x, value);
            }
        }
    }
}

/// Writes a GeoTIFF into a temporary directory next to `target_path` and moves it to
/// `target_path` only if `generate` and `inspect` succeed. `inspect` reads the finished raster
/// before it is moved. The temporary directory is always removed.
pub fn write_geotiff_atomically<F, I, T>(
    target_path: &Path,
    grid_spec: &RasterGridSpec,
    generate: F,
    inspect: I,
) -> Result<T>
where
    F: FnOnce(&mut GeoTiffRasterWriter) -> Result<()>,
    I: FnOnce(&Path) -> Result<T>,
{
    let target_dir = target_path.parent().unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(target_dir).context(error::WorkspaceCreationSnafu {
        path: target_dir.to_path_buf(),
    })?;

    let working_dir = tempfile::Builder::new()
        .prefix("scenario-")
        .tempdir_in(target_dir)
        .context(error::WorkspaceCreationSnafu {
            path: target_dir.to_path_buf(),
        })?;

    let file_name = target_path
        .file_name()
        .unwrap_or_else(|| std::ffi::OsStr::new("scenario.tif"));
    let mut writer = GeoTiffRasterWriter::create(&working_dir.path().join(file_name), grid_spec.clone())?;

    generate(&mut writer)?;

    let written = writer.finish();
    let inspected = inspect(&written)?;

    std::fs::rename(&written, target_path)?;

    info!(path = %target_path.display(), "wrote scenario raster");

    Ok(inspected)
}
