pub mod error;
pub mod extent;
pub mod projection;
pub mod rasterization;
pub mod scenario;
pub mod source;
pub mod statistics;
pub mod thumbnail;
pub mod tiler;
pub mod util;
pub mod writer;
