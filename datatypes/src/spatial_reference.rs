use crate::error;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::str::FromStr;

/// A spatial reference definition that PROJ and GDAL understand, e.g., `EPSG:3857` or a proj
/// string like `+proj=aea +lat_0=23 ...`.
///
/// Two references are considered equal if their normalized definitions are equal. Raster
/// sources normalize their reference to `AUTHORITY:CODE` whenever the raster carries one.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct SpatialReference {
    definition: String,
}

impl SpatialReference {
    /// the web mercator spatial reference system that all geometries are exchanged in
    pub fn web_mercator() -> Self {
        Self::epsg(3857)
    }

    pub fn epsg(code: u32) -> Self {
        Self {
            definition: format!("EPSG:{code}"),
        }
    }

    pub fn srs_string(&self) -> &str {
        &self.definition
    }

    /// Returns the EPSG code if the definition is of the form `EPSG:<code>`
    pub fn epsg_code(&self) -> Option<u32> {
        self.definition
            .strip_prefix("EPSG:")
            .and_then(|code| code.parse().ok())
    }
}

impl std::fmt::Display for SpatialReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.definition)
    }
}

impl FromStr for SpatialReference {
    type Err = error::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let definition = s.split_whitespace().collect::<Vec<_>>().join(" ");

        if definition.is_empty() {
            return Err(error::Error::InvalidSpatialReferenceString {
                spatial_reference_string: s.into(),
            });
        }

        if let Some((authority, code)) = definition.split_once(':') {
            if !authority.starts_with('+') && !definition.contains(' ') {
                let code = code
                    .parse::<u32>()
                    .map_err(|source| error::Error::ParseU32 { source })?;
                return Ok(Self {
                    definition: format!("{}:{code}", authority.to_uppercase()),
                });
            }
        }

        Ok(Self { definition })
    }
}

impl Serialize for SpatialReference {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.definition)
    }
}

impl<'de> Deserialize<'de> for SpatialReference {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
