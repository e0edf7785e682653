use core::time::Duration;

/// A trait that abstracts over how to sleep for a given [`Duration`] in async
/// contexts.
///
/// The poller waits through this trait between attempts so tests can replace
/// wall-clock delays with something instantaneous or recorded.
pub trait SleepProvider {
    /// We require `Send` so that the future can be safely moved across threads
    type Sleep: Future<Output = ()> + Send;

    fn sleep_for(&self, dur: Duration) -> Self::Sleep;
}

impl<S: SleepProvider + ?Sized> SleepProvider for &S {
    type Sleep = S::Sleep;

    fn sleep_for(&self, dur: Duration) -> Self::Sleep {
        (**self).sleep_for(dur)
    }
}

/// An implementation of [`SleepProvider`] using Tokio's timer.
///
/// This is the default provider. It respects `tokio::time::pause`, so tests
/// running on a paused clock advance virtual time instead of waiting.
#[derive(Clone, Copy, Debug, Default)]
pub struct TokioSleep;
impl SleepProvider for TokioSleep {
    type Sleep = tokio::time::Sleep;

    fn sleep_for(&self, dur: Duration) -> Self::Sleep {
        tokio::time::sleep(dur)
    }
}

/// A [`SleepProvider`] that never waits.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoSleep;
impl SleepProvider for NoSleep {
    type Sleep = core::future::Ready<()>;

    fn sleep_for(&self, _dur: Duration) -> Self::Sleep {
        core::future::ready(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::Instant;

    #[tokio::test(start_paused = true)]
    async fn tokio_sleep_advances_virtual_time() {
        let start = Instant::now();
        TokioSleep.sleep_for(Duration::from_secs(3)).await;
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(3));
        assert!(elapsed < Duration::from_millis(3_010));
    }

    #[tokio::test(start_paused = true)]
    async fn no_sleep_does_not_advance_time() {
        let start = Instant::now();
        NoSleep.sleep_for(Duration::from_secs(3)).await;
        assert_eq!(start.elapsed(), Duration::ZERO);
    }
}
