use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use snafu::ResultExt;
use tracing::debug;
use url::Url;

use crate::config::{self, get_config_element};
use crate::error::{self, Result};
use crate::jobs::ResultPayload;

/// The path of the job queue relative to the web service.
pub const JOBS_QUEUE_PATH: &str = "jobsqueue/";

/// The queue that hands out jobs and receives their results.
#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Takes the next job from the queue. `null` means that there is no work.
    async fn fetch_job(&self) -> Result<Value>;

    /// Posts the result of a job to `endpoint`, or to the queue itself if there is none.
    async fn post_result(&self, endpoint: Option<&str>, payload: &ResultPayload) -> Result<()>;
}

/// The job queue of the web service, reached over HTTP.
#[derive(Debug, Clone)]
pub struct HttpJobQueue {
    client: reqwest::Client,
    queue_url: Url,
}

impl HttpJobQueue {
    pub fn new(base_url: &Url, request_timeout: Duration) -> Result<Self> {
        let mut base_url = base_url.clone();
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let queue_url = base_url
            .join(JOBS_QUEUE_PATH)
            .context(error::InvalidQueueUrlSnafu)?;

        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .context(error::QueueRequestSnafu {
                url: queue_url.to_string(),
            })?;

        Ok(Self { client, queue_url })
    }

    pub fn from_config() -> Result<Self> {
        let queue: config::Queue = get_config_element()?;
        Self::new(&queue.base_url, queue.request_timeout())
    }

    pub fn queue_url(&self) -> &Url {
        &self.queue_url
    }

    pub fn endpoint_url(&self, endpoint: Option<&str>) -> Result<Url> {
        match endpoint {
            Some(endpoint) => self
                .queue_url
                .join(endpoint)
                .context(error::InvalidQueueUrlSnafu),
            None => Ok(self.queue_url.clone()),
        }
    }
}

#[async_trait]
impl JobQueue for HttpJobQueue {
    async fn fetch_job(&self) -> Result<Value> {
        let url = self.queue_url.as_str();

        self.client
            .get(self.queue_url.clone())
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .context(error::QueueRequestSnafu { url })?
            .json::<Value>()
            .await
            .context(error::QueueRequestSnafu { url })
    }

    async fn post_result(&self, endpoint: Option<&str>, payload: &ResultPayload) -> Result<()> {
        let url = self.endpoint_url(endpoint)?;

        debug!(%url, status = %payload.status, "posting job result");

        self.client
            .post(url.clone())
            .json(payload)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .context(error::QueueRequestSnafu {
                url: url.to_string(),
            })?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queue_urls() {
        let queue = HttpJobQueue::new(
            &Url::parse("http://localhost:8000").unwrap(),
            Duration::from_secs(1),
        )
        .unwrap();

        assert_eq!(queue.queue_url().as_str(), "http://localhost:8000/jobsqueue/");
        assert_eq!(
            queue.endpoint_url(Some("parcel_stats")).unwrap().as_str(),
            "http://localhost:8000/jobsqueue/parcel_stats"
        );
        assert_eq!(
            queue.endpoint_url(None).unwrap().as_str(),
            "http://localhost:8000/jobsqueue/"
        );
    }

    #[test]
    fn queue_below_a_path() {
        let queue = HttpJobQueue::new(
            &Url::parse("http://example.com/api").unwrap(),
            Duration::from_secs(1),
        )
        .unwrap();

        assert_eq!(
            queue.endpoint_url(Some("scenario")).unwrap().as_str(),
            "http://example.com/api/jobsqueue/scenario"
        );
    }
}
