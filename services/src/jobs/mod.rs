mod envelope;
mod result;

pub use self::envelope::JobEnvelope;
pub use self::result::{FAILED_MARKER, JobLifecycle, JobState, JobStatus, ResultPayload};

use std::collections::BTreeMap;
use std::fmt;

use scenario_datatypes::raster::ClassCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use snafu::ResultExt;
use strum::{Display, EnumString, IntoStaticStr};

use crate::error::{self, Error, Result};
use crate::models::InvestModel;

/// The job types the queue hands out, named by their tag on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum JobType {
    LulcCrop,
    LulcFill,
    Wallpaper,
    StatsUnderParcel,
    PatternThumbnail,
    Invest,
}

impl JobType {
    /// The queue endpoint (relative to `jobsqueue/`) that receives the result of a job.
    pub fn endpoint(self) -> &'static str {
        match self {
            JobType::LulcCrop | JobType::LulcFill | JobType::Wallpaper => "scenario",
            JobType::StatsUnderParcel => "parcel_stats",
            JobType::PatternThumbnail => "pattern",
            JobType::Invest => "invest",
        }
    }

    /// The suffix of the scenario raster file name, i.e., the tag itself.
    pub fn tag(self) -> &'static str {
        self.into()
    }
}

/// An identifier of the web service, which is a number for most resources but passed through
/// as text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "serde_json::Value", into = "String")]
pub struct ResourceId(String);

impl ResourceId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ResourceId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

impl From<u64> for ResourceId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

impl From<ResourceId> for String {
    fn from(id: ResourceId) -> Self {
        id.0
    }
}

impl TryFrom<serde_json::Value> for ResourceId {
    type Error = String;

    fn try_from(value: serde_json::Value) -> std::result::Result<Self, Self::Error> {
        match value {
            serde_json::Value::Number(number) => Ok(Self(number.to_string())),
            serde_json::Value::String(string) if !string.is_empty() => Ok(Self(string)),
            other => Err(format!("expected a number or a non-empty string, got {other}")),
        }
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CropArgs {
    pub target_parcel_wkt: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FillArgs {
    pub target_parcel_wkt: String,
    pub lulc_class: i64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WallpaperArgs {
    pub target_parcel_wkt: String,
    pub pattern_bbox_wkt: String,
    pub lulc_source_url: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ParcelStatsArgs {
    pub target_parcel_wkt: String,
    pub lulc_source_url: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PatternThumbnailArgs {
    pub pattern_bbox_wkt: String,
    /// class code to `#rrggbb`
    pub lulc_colors: BTreeMap<ClassCode, String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ModelRunArgs {
    pub invest_model: InvestModel,
    pub scenario_id: ResourceId,
    pub lulc_source_url: String,
    pub study_area_wkt: String,
}

/// A job with its arguments, validated against its job type.
#[derive(Debug, Clone, PartialEq)]
pub enum Job {
    Crop {
        scenario_id: ResourceId,
        args: CropArgs,
    },
    Fill {
        scenario_id: ResourceId,
        args: FillArgs,
    },
    Wallpaper {
        scenario_id: ResourceId,
        args: WallpaperArgs,
    },
    ParcelStats(ParcelStatsArgs),
    PatternThumbnail {
        pattern_id: ResourceId,
        args: PatternThumbnailArgs,
    },
    ModelRun(ModelRunArgs),
}

impl Job {
    pub fn job_type(&self) -> JobType {
        match self {
            Job::Crop { .. } => JobType::LulcCrop,
            Job::Fill { .. } => JobType::LulcFill,
            Job::Wallpaper { .. } => JobType::Wallpaper,
            Job::ParcelStats(_) => JobType::StatsUnderParcel,
            Job::PatternThumbnail { .. } => JobType::PatternThumbnail,
            Job::ModelRun(_) => JobType::Invest,
        }
    }
}

impl TryFrom<&JobEnvelope> for Job {
    type Error = Error;

    fn try_from(envelope: &JobEnvelope) -> Result<Self> {
        let job_type = envelope.job_type()?;

        Ok(match job_type {
            JobType::LulcCrop => Job::Crop {
                scenario_id: server_attr(envelope, job_type, "scenario_id")?,
                args: job_args(envelope, job_type)?,
            },
            JobType::LulcFill => Job::Fill {
                scenario_id: server_attr(envelope, job_type, "scenario_id")?,
                args: job_args(envelope, job_type)?,
            },
            JobType::Wallpaper => Job::Wallpaper {
                scenario_id: server_attr(envelope, job_type, "scenario_id")?,
                args: job_args(envelope, job_type)?,
            },
            JobType::StatsUnderParcel => Job::ParcelStats(job_args(envelope, job_type)?),
            JobType::PatternThumbnail => Job::PatternThumbnail {
                pattern_id: server_attr(envelope, job_type, "pattern_id")?,
                args: job_args(envelope, job_type)?,
            },
            JobType::Invest => Job::ModelRun(job_args(envelope, job_type)?),
        })
    }
}

fn job_args<T: DeserializeOwned>(envelope: &JobEnvelope, job_type: JobType) -> Result<T> {
    serde_json::from_value(envelope.job_args.clone()).context(error::MalformedJobSnafu {
        job_type: job_type.to_string(),
    })
}

fn server_attr<T: DeserializeOwned>(
    envelope: &JobEnvelope,
    job_type: JobType,
    attribute: &'static str,
) -> Result<T> {
    let value = envelope
        .server_attrs
        .get(attribute)
        .filter(|value| !value.is_null())
        .ok_or_else(|| Error::MissingServerAttribute {
            job_type: job_type.to_string(),
            attribute,
        })?;

    serde_json::from_value(value.clone()).context(error::MalformedJobSnafu {
        job_type: job_type.to_string(),
    })
}
