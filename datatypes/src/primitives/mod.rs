mod bounding_box;
mod coordinate;
mod parcel;

pub use bounding_box::BoundingBox2D;
pub use coordinate::Coordinate2D;
pub use parcel::Parcel;
