use std::collections::HashMap;
use std::path::Path;

use image::imageops::{self, FilterType};
use image::{ImageFormat, Rgb, RgbImage};
use scenario_datatypes::primitives::Parcel;
use scenario_datatypes::raster::ClassCode;
use snafu::{ResultExt, ensure};

use crate::error;
use crate::extent::GridAligner;
use crate::projection::CoordinateTransformer;
use crate::source::RasterSource;
use crate::util::Result;

/// Default upscaling of thumbnail pixels, i.e., one thumbnail pixel per meter of a 30 m raster.
pub const DEFAULT_THUMBNAIL_SCALE_FACTOR: u32 = 30;

const UNKNOWN_CLASS_COLOR: Rgb<u8> = Rgb([0, 0, 0]);

/// Maps land-cover classes to colors. Classes without a color are drawn black.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LulcColors(HashMap<ClassCode, Rgb<u8>>);

impl LulcColors {
    /// Parses a map of class codes to `#rrggbb` colors.
    pub fn from_hex_colors<'c, I>(colors: I) -> Result<Self>
    where
        I: IntoIterator<Item = (ClassCode, &'c str)>,
    {
        colors
            .into_iter()
            .map(|(class, hex)| Ok((class, parse_hex_color(hex)?)))
            .collect::<Result<_>>()
            .map(Self)
    }

    pub fn color(&self, class: ClassCode) -> Rgb<u8> {
        self.0.get(&class).copied().unwrap_or(UNKNOWN_CLASS_COLOR)
    }
}

fn parse_hex_color(hex: &str) -> Result<Rgb<u8>> {
    let invalid = || error::InvalidColorSnafu { color: hex };

    let digits = hex.strip_prefix('#').ok_or_else(|| invalid().build())?;
    ensure!(
        digits.len() == 6 && digits.is_ascii(),
        error::InvalidColorSnafu { color: hex }
    );

    let channel = |i: usize| u8::from_str_radix(&digits[i..i + 2], 16).map_err(|_| invalid().build());

    Ok(Rgb([channel(0)?, channel(2)?, channel(4)?]))
}

/// Renders the land-cover under the bounding box of a pattern (in display projection) with a
/// little context around it.
pub fn render_pattern_thumbnail<S: RasterSource + ?Sized>(
    pattern: &Parcel,
    source: &S,
    transformer: &CoordinateTransformer,
    colors: &LulcColors,
    scale_factor: u32,
) -> Result<RgbImage> {
    let geo_transform = source.grid_spec().geo_transform;

    let native = transformer.to_native(pattern)?;
    // half a pixel of context on every side
    let bounds = native
        .bounding_box()
        .buffer(geo_transform.x_pixel_size.abs() / 2.)?;
    let window = GridAligner::new(geo_transform).align(&bounds).window;

    let grid = source.read_window(&window)?;

    let image = RgbImage::from_fn(window.size_x as u32, window.size_y as u32, |x, y| {
        grid.get(y as usize, x as usize)
            .map_or(UNKNOWN_CLASS_COLOR, |class| colors.color(class))
    });

    let scale_factor = scale_factor.max(1);
    Ok(imageops::resize(
        &image,
        image.width() * scale_factor,
        image.height() * scale_factor,
        FilterType::Nearest,
    ))
}

pub fn save_png(image: &RgbImage, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).context(error::WorkspaceCreationSnafu {
            path: parent.to_path_buf(),
        })?;
    }

    image
        .save_with_format(path, ImageFormat::Png)
        .context(error::ImageEncodingSnafu)
}
