use crate::error::{self, Result};
use config::{Config, Environment, File};
use scenario_datatypes::spatial_reference::SpatialReference;
use serde::Deserialize;
use snafu::ResultExt;
use std::path::PathBuf;
use std::sync::{LazyLock, RwLock};
use std::time::Duration;
use url::Url;

static SETTINGS: LazyLock<RwLock<Config>> = LazyLock::new(init_settings);

fn init_settings() -> RwLock<Config> {
    let mut settings = Config::builder();

    #[cfg(test)]
    let files = ["Settings-default.toml", "Settings-test.toml"];

    #[cfg(not(test))]
    let files = ["Settings-default.toml", "Settings.toml"];

    if let Ok(dir) = retrieve_settings_dir() {
        let files: Vec<File<_, _>> = files
            .iter()
            .map(|f| dir.join(f))
            .filter(|p| p.exists())
            .map(File::from)
            .collect();

        settings = settings.add_source(files);
    }

    // Override config with environment variables that start with `SCENARIO_WORKER__`,
    // e.g. `SCENARIO_WORKER__LOGGING__LOG_SPEC=debug`
    settings = settings.add_source(Environment::with_prefix("scenario_worker").separator("__"));

    let settings = settings.build().unwrap_or_else(|error| {
        tracing::error!("Cannot load the settings, falling back to empty settings: {error}");
        Config::default()
    });

    RwLock::new(settings)
}

/// test may run in subdirectory
#[cfg(test)]
fn retrieve_settings_dir() -> Result<PathBuf> {
    use crate::error::Error;

    const MAX_PARENT_DIRS: usize = 1;

    let mut settings_dir = std::env::current_dir().context(error::MissingWorkingDirectorySnafu)?;

    for _ in 0..=MAX_PARENT_DIRS {
        if settings_dir.join("Settings-default.toml").exists() {
            return Ok(settings_dir);
        }

        // go to parent directory
        if !settings_dir.pop() {
            break;
        }
    }

    Err(Error::MissingSettingsDirectory)
}

#[cfg(not(test))]
fn retrieve_settings_dir() -> Result<PathBuf> {
    std::env::current_dir().context(error::MissingWorkingDirectorySnafu)
}

/// Overrides a single config value, e.g. from command line arguments.
pub fn set_config<T>(key: &str, value: T) -> Result<()>
where
    T: Into<config::Value>,
{
    let mut settings = SETTINGS
        .write()
        .map_err(|_error| error::Error::ConfigLockFailed)?;

    let builder = Config::builder()
        .add_source(settings.clone())
        .set_override(key, value)
        .context(error::ConfigSnafu)?;

    *settings = builder.build().context(error::ConfigSnafu)?;
    Ok(())
}

pub fn get_config<'a, T>(key: &str) -> Result<T>
where
    T: Deserialize<'a>,
{
    SETTINGS
        .read()
        .map_err(|_error| error::Error::ConfigLockFailed)?
        .get::<T>(key)
        .context(error::ConfigSnafu)
}

pub fn get_config_element<'a, T>() -> Result<T>
where
    T: ConfigElement + Deserialize<'a>,
{
    get_config(T::KEY)
}

pub trait ConfigElement {
    const KEY: &'static str;
}

#[derive(Debug, Deserialize)]
pub struct Queue {
    /// Address of the web service, the queue lives under `jobsqueue/` relative to it.
    pub base_url: Url,
    pub polling_interval_seconds: u64,
    pub request_timeout_seconds: u64,
}

impl Queue {
    pub fn polling_interval(&self) -> Duration {
        Duration::from_secs(self.polling_interval_seconds)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}

impl ConfigElement for Queue {
    const KEY: &'static str = "queue";
}

#[derive(Debug, Deserialize)]
pub struct Outputs {
    pub directory: PathBuf,
}

impl ConfigElement for Outputs {
    const KEY: &'static str = "outputs";
}

#[derive(Debug, Deserialize)]
pub struct BaseLulc {
    pub path: String,
    /// If set, the base raster must be in this projection.
    pub native_projection: Option<SpatialReference>,
}

impl ConfigElement for BaseLulc {
    const KEY: &'static str = "base_lulc";
}

#[derive(Debug, Deserialize)]
pub struct Projection {
    pub display: SpatialReference,
}

impl ConfigElement for Projection {
    const KEY: &'static str = "projection";
}

#[derive(Debug, Deserialize)]
pub struct Wallpaper {
    pub block_size: usize,
}

impl ConfigElement for Wallpaper {
    const KEY: &'static str = "wallpaper";
}

#[derive(Debug, Deserialize)]
pub struct Models {
    pub invest_command: String,
    /// Directory holding the biophysical tables and auxiliary rasters of the models.
    pub data_directory: PathBuf,
}

impl ConfigElement for Models {
    const KEY: &'static str = "models";
}

#[derive(Debug, Deserialize)]
pub struct Thumbnail {
    pub scale_factor: u32,
}

impl ConfigElement for Thumbnail {
    const KEY: &'static str = "thumbnail";
}

#[derive(Debug, Deserialize)]
pub struct Logging {
    pub log_spec: String,
    pub log_to_file: bool,
    pub filename_prefix: String,
    pub log_directory: Option<String>,
}

impl ConfigElement for Logging {
    const KEY: &'static str = "logging";
}
