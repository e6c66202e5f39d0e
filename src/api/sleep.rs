//! Injectable sleeping so retry and polling loops run instantly in tests.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

/// Future returned by [`Sleeper::sleep`].
pub type SleepFuture<'a> = Pin<Box<dyn Future<Output = ()> + Send + 'a>>;

/// Source of delays for the client's wait loops.
pub trait Sleeper {
    /// Completes once `duration` has elapsed.
    fn sleep(&self, duration: Duration) -> SleepFuture<'_>;
}

/// Real-time sleeper backed by the tokio timer.
#[derive(Clone, Copy, Debug, Default)]
pub struct TokioSleeper;

impl Sleeper for TokioSleeper {
    fn sleep(&self, duration: Duration) -> SleepFuture<'_> {
        Box::pin(tokio::time::sleep(duration))
    }
}
