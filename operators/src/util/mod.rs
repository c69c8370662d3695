pub mod gdal;
mod result;

pub use result::Result;
