use std::future::Future;
use std::time::Duration;

use snafu::Report;
use tracing::{error, info, warn};

use crate::dispatcher::{DispatchOutcome, JobDispatcher};
use crate::jobs::{JobEnvelope, JobLifecycle, JobState, JobStatus, JobType, ResultPayload};
use crate::queue::JobQueue;

/// What happened in one iteration of the worker loop.
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    /// The queue had no work.
    Idle,
    /// A job was run and its result was posted, if `posted` is set.
    Processed {
        endpoint: Option<&'static str>,
        status: JobStatus,
        lifecycle: JobLifecycle,
        posted: bool,
    },
    /// The queue answered with something that is not a job object.
    Discarded,
    /// The queue could not be reached.
    QueueError,
}

/// Takes jobs from the queue one at a time, runs them and posts their results.
pub struct JobPoller<Q> {
    queue: Q,
    dispatcher: JobDispatcher,
    polling_interval: Duration,
}

impl<Q: JobQueue> JobPoller<Q> {
    pub fn new(queue: Q, dispatcher: JobDispatcher, polling_interval: Duration) -> Self {
        Self {
            queue,
            dispatcher,
            polling_interval,
        }
    }

    pub fn queue(&self) -> &Q {
        &self.queue
    }

    /// Fetches at most one job and runs it to completion.
    pub async fn poll_once(&self) -> PollOutcome {
        let response = match self.queue.fetch_job().await {
            Ok(response) => response,
            Err(queue_error) => {
                warn!("Cannot fetch a job: {}", Report::from_error(queue_error));
                return PollOutcome::QueueError;
            }
        };

        let envelope = match JobEnvelope::from_value(response) {
            Ok(Some(envelope)) => envelope,
            Ok(None) => return PollOutcome::Idle,
            Err(malformed) => {
                error!("Discarded queue response: {}", Report::from_error(malformed));
                return PollOutcome::Discarded;
            }
        };

        info!(job_type = %envelope.job_type, "Response received, loading job details");

        let outcome = self.dispatch(envelope).await;

        let posted = match self
            .queue
            .post_result(outcome.endpoint, &outcome.payload)
            .await
        {
            Ok(()) => true,
            Err(queue_error) => {
                warn!("Cannot post the job result: {}", Report::from_error(queue_error));
                false
            }
        };

        PollOutcome::Processed {
            endpoint: outcome.endpoint,
            status: outcome.payload.status,
            lifecycle: outcome.lifecycle,
            posted,
        }
    }

    /// Runs the job on the blocking thread pool. A panicking job fails like any other.
    async fn dispatch(&self, envelope: JobEnvelope) -> DispatchOutcome {
        let endpoint = envelope.job_type().ok().map(JobType::endpoint);
        let server_attrs = envelope.server_attrs.clone();

        let dispatcher = self.dispatcher.clone();
        match crate::util::spawn_blocking(move || dispatcher.dispatch(envelope)).await {
            Ok(outcome) => outcome,
            Err(join_error) => {
                error!("Job aborted: {}", Report::from_error(join_error));

                let mut lifecycle = JobLifecycle::default();
                lifecycle.transition(JobState::Failed);

                DispatchOutcome {
                    endpoint,
                    payload: ResultPayload::failed(server_attrs),
                    lifecycle,
                }
            }
        }
    }

    /// Polls until `shutdown` completes. Shutdown is only checked between jobs. After a job the
    /// next one is fetched immediately, otherwise the poller waits for the polling interval.
    pub async fn run_until<F>(&self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        info!(
            "Polling the queue every {}s if there is no work",
            self.polling_interval.as_secs_f64()
        );

        loop {
            let pause = match self.poll_once().await {
                PollOutcome::Processed { .. } => Duration::ZERO,
                PollOutcome::Idle | PollOutcome::Discarded | PollOutcome::QueueError => {
                    self.polling_interval
                }
            };

            tokio::select! {
                biased;
                () = &mut shutdown => break,
                () = tokio::time::sleep(pause) => {}
            }
        }

        info!("Stopped polling the queue");
    }
}
