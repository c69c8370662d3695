pub mod config;
pub mod context;
pub mod dispatcher;
pub mod error;
pub mod jobs;
pub mod models;
pub mod poller;
pub mod queue;
pub mod util;
