use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use scenario_worker::config::{self, get_config_element, set_config};
use scenario_worker::context::WorkerContext;
use scenario_worker::dispatcher::JobDispatcher;
use scenario_worker::error::{self, Result};
use scenario_worker::poller::JobPoller;
use scenario_worker::queue::HttpJobQueue;
use snafu::{Report, ResultExt};
use tracing::{Subscriber, error, info};
use tracing_appender::{
    non_blocking::WorkerGuard,
    rolling::{RollingFileAppender, Rotation},
};
use tracing_subscriber::{
    EnvFilter, Layer,
    field::RecordFields,
    fmt::{
        FormatFields,
        format::{DefaultFields, Writer},
    },
    layer::Filter,
    prelude::*,
    registry::LookupSpan,
};

/// Worker that turns land parcels into land-cover scenarios and statistics
#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
struct Args {
    /// Host of the web service with the job queue, overrides `queue.base_url`
    queue_host: Option<String>,

    /// Port of the web service with the job queue
    queue_port: Option<u16>,

    /// Directory for scenario rasters, model outputs and pattern thumbnails
    output_dir: Option<PathBuf>,
}

impl Args {
    fn apply_to_config(&self) -> Result<()> {
        if let Some(host) = &self.queue_host {
            let queue: config::Queue = get_config_element()?;
            let port = self
                .queue_port
                .or_else(|| queue.base_url.port_or_known_default())
                .unwrap_or(80);

            let base_url = url::Url::parse(&format!("http://{host}:{port}/"))
                .context(error::InvalidQueueUrlSnafu)?;
            set_config("queue.base_url", base_url.to_string())?;
        }

        if let Some(output_dir) = &self.output_dir {
            set_config("outputs.directory", output_dir.to_string_lossy().into_owned())?;
        }

        Ok(())
    }
}

async fn start_worker(args: Args) -> Result<()> {
    args.apply_to_config()?;

    reroute_gdal_logging();
    let logging_config: config::Logging = get_config_element()?;
    let _writer_drop_guard = init_logging(&logging_config)?;

    let context = WorkerContext::from_config()?;
    context.outputs.prepare()?;

    let queue = HttpJobQueue::from_config()?;
    let queue_config: config::Queue = get_config_element()?;

    info!(
        queue = %queue.queue_url(),
        outputs = %context.outputs.root().display(),
        "Starting worker"
    );

    let poller = JobPoller::new(
        queue,
        JobDispatcher::new(Arc::new(context)),
        queue_config.polling_interval(),
    );

    poller.run_until(shutdown_signal()).await;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(signal_error) = tokio::signal::ctrl_c().await {
        error!("Cannot listen for the shutdown signal: {signal_error}");
        std::future::pending::<()>().await;
    }

    info!("Received shutdown signal, finishing the current job");
}

/// Installs the console layer and, if configured, the file layer as global subscriber.
/// The returned guard must be kept alive for the file layer to write.
fn init_logging(logging_config: &config::Logging) -> Result<Option<WorkerGuard>> {
    // get a new tracing subscriber registry to add all log layers to
    let registry = tracing_subscriber::Registry::default();

    let console_filter =
        EnvFilter::try_new(&logging_config.log_spec).context(error::LogSpecSnafu)?;
    let registry = registry.with(console_layer_with_filter(console_filter));

    // the console filter is not clonable, so the file layer gets its own one
    let (file_layer, writer_drop_guard) = if logging_config.log_to_file {
        let file_filter =
            EnvFilter::try_new(&logging_config.log_spec).context(error::LogSpecSnafu)?;
        let (file_layer, writer_drop_guard) = file_layer_with_filter(
            &logging_config.filename_prefix,
            logging_config.log_directory.as_deref(),
            file_filter,
        )?;
        (Some(file_layer), Some(writer_drop_guard))
    } else {
        (None, None)
    };

    registry.with(file_layer).init();

    Ok(writer_drop_guard)
}

fn console_layer_with_filter<S, F: Filter<S> + 'static>(filter: F) -> impl Layer<S>
where
    S: Subscriber,
    for<'a> S: LookupSpan<'a>,
{
    tracing_subscriber::fmt::layer()
        .pretty()
        .with_file(false)
        .with_target(true)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(filter)
}

// there are still format flags within spans even when `with_ansi` is false: https://github.com/tokio-rs/tracing/issues/1817
struct FileFormatterWorkaround(DefaultFields);

impl<'writer> FormatFields<'writer> for FileFormatterWorkaround {
    fn format_fields<R: RecordFields>(
        &self,
        writer: Writer<'writer>,
        fields: R,
    ) -> core::fmt::Result {
        self.0.format_fields(writer, fields)
    }
}

fn file_layer_with_filter<S, F: Filter<S> + 'static>(
    filename_prefix: &str,
    log_directory: Option<&str>,
    filter: F,
) -> Result<(impl Layer<S> + use<S, F>, WorkerGuard)>
where
    S: Subscriber,
    for<'a> S: LookupSpan<'a>,
{
    let file_appender = RollingFileAppender::builder()
        .max_log_files(7)
        .filename_prefix(filename_prefix)
        .filename_suffix("log")
        .rotation(Rotation::DAILY)
        .build(log_directory.unwrap_or("./"))
        .context(error::LogFileSnafu)?;

    let (non_blocking_writer, guard) = tracing_appender::non_blocking(file_appender);

    let layer = tracing_subscriber::fmt::layer()
        .with_file(false)
        .with_target(true)
        .fmt_fields(FileFormatterWorkaround(DefaultFields::default()))
        .with_ansi(false)
        .with_writer(non_blocking_writer)
        .with_filter(filter);
    Ok((layer, guard))
}

/// We install a GDAL error handler that logs all messages with our log macros.
fn reroute_gdal_logging() {
    gdal::config::set_error_handler(|error_type, error_num, error_msg| {
        const LOG_TARGET: &str = "GDAL";
        match error_type {
            gdal::errors::CplErrType::None => {
                // should never log anything
                tracing::info!(target: LOG_TARGET, "GDAL None {error_num}: {error_msg}");
            }
            gdal::errors::CplErrType::Debug => {
                tracing::debug!(target: LOG_TARGET, "GDAL Debug {error_num}: {error_msg}");
            }
            gdal::errors::CplErrType::Warning => {
                tracing::warn!(target: LOG_TARGET, "GDAL Warning {error_num}: {error_msg}");
            }
            gdal::errors::CplErrType::Failure => {
                tracing::error!(target: LOG_TARGET, "GDAL Failure {error_num}: {error_msg}");
            }
            gdal::errors::CplErrType::Fatal => {
                tracing::error!(target: LOG_TARGET, "GDAL Fatal {error_num}: {error_msg}");
            }
        }
    });
}

#[tokio::main]
#[allow(clippy::print_stderr)]
async fn main() {
    let args = Args::parse();

    if let Err(err) = start_worker(args).await {
        eprintln!("Error: {}", Report::from_error(err));
        std::process::exit(1);
    }
}
