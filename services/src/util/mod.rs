use tokio::task::JoinHandle;
use tracing::Span;

pub mod tests;

/// A wrapper around `tokio::task::spawn_blocking` that runs the function inside the
/// current `Span` from `tracing`.
#[inline]
pub fn spawn_blocking<F, R>(f: F) -> JoinHandle<R>
where
    F: FnOnce() -> R + Send + 'static,
    R: Send + 'static,
{
    let current_span = Span::current();

    tokio::task::spawn_blocking(move || {
        let _entered_span = current_span.enter();

        f()
    })
}
