mod data_type;
mod geo_transform;
mod grid;
mod grid_spec;
mod pixel_window;

pub use self::data_type::{ClassCode, RasterDataType};
pub use self::geo_transform::{GdalGeoTransform, GeoTransform};
pub use self::grid::{Grid2D, GridIdx2D, GridShape2D};
pub use self::grid_spec::RasterGridSpec;
pub use self::pixel_window::{BlockIter, PixelWindow};
