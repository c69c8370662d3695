use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Land-cover classes are integer codes. Every supported raster data type fits into it.
pub type ClassCode = i32;

/// The integer pixel types a land-use/land-cover raster may be stored in.
#[derive(
    Debug, Ord, PartialOrd, Eq, PartialEq, Hash, Deserialize, Serialize, Copy, Clone, Display, EnumString,
)]
pub enum RasterDataType {
    U8,
    U16,
    U32,
    I16,
    I32,
}

impl RasterDataType {
    /// Returns true if the given `value` is valid for the `RasterDataType` variant,
    /// i.e. it can be represented by a variable of the corresponding primitive data type
    #[allow(clippy::cast_lossless)]
    pub fn is_valid(self, value: i64) -> bool {
        match self {
            RasterDataType::U8 => u8::try_from(value).is_ok(),
            RasterDataType::U16 => u16::try_from(value).is_ok(),
            RasterDataType::U32 => u32::try_from(value).is_ok(),
            RasterDataType::I16 => i16::try_from(value).is_ok(),
            RasterDataType::I32 => i32::try_from(value).is_ok(),
        }
    }
}
