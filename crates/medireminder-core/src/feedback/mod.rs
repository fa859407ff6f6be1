//! Repeating haptic/audio pulse while a dose prompt is showing.
//!
//! The pulse runs as a tokio task owning a [`CancellationToken`]. Dropping
//! the [`PulseHandle`] cancels it, so whoever holds the handle cannot leak
//! the timer past the prompt.

use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Device feedback (vibration, bell). `n` counts from 1.
pub trait FeedbackSink: Send + Sync {
    fn pulse(&self, n: u32);
}

/// Sink for hosts without feedback hardware.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoFeedback;

impl FeedbackSink for NoFeedback {
    fn pulse(&self, _n: u32) {}
}

pub struct PulseLoop;

impl PulseLoop {
    /// Pulse immediately, then every `interval`, `max_pulses` times in total.
    ///
    /// Returns `None` when called outside a tokio runtime or with a zero cap.
    pub fn start(
        sink: Arc<dyn FeedbackSink>,
        interval: Duration,
        max_pulses: u32,
    ) -> Option<PulseHandle> {
        if max_pulses == 0 {
            return None;
        }
        let runtime = match Handle::try_current() {
            Ok(runtime) => runtime,
            Err(_) => {
                tracing::warn!("no async runtime, skipping feedback pulse");
                return None;
            }
        };

        let token = CancellationToken::new();
        let cancelled = token.clone();
        let task = runtime.spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            for n in 1..=max_pulses {
                tokio::select! {
                    biased;
                    _ = cancelled.cancelled() => {
                        tracing::debug!(pulses = n - 1, "feedback pulse stopped");
                        return;
                    }
                    _ = ticker.tick() => sink.pulse(n),
                }
            }
            tracing::debug!(pulses = max_pulses, "feedback pulse cap reached");
        });

        Some(PulseHandle { token, task })
    }
}

/// Owner of a running pulse. Cancels on [`stop`](PulseHandle::stop) and on drop.
pub struct PulseHandle {
    token: CancellationToken,
    task: JoinHandle<()>,
}

impl PulseHandle {
    pub fn stop(&self) {
        self.token.cancel();
    }

    /// True once the task stopped or hit its cap.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for PulseHandle {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    #[derive(Default)]
    struct Counter(AtomicU32);

    impl FeedbackSink for Counter {
        fn pulse(&self, _n: u32) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn pulses_immediately_then_on_interval() {
        let counter = Arc::new(Counter::default());
        let _handle = PulseLoop::start(counter.clone(), Duration::from_secs(2), 30).unwrap();

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(counter.0.load(Ordering::SeqCst), 2);

        tokio::time::sleep(Duration::from_secs(6)).await;
        assert_eq!(counter.0.load(Ordering::SeqCst), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn stops_at_cap() {
        let counter = Arc::new(Counter::default());
        let handle = PulseLoop::start(counter.clone(), Duration::from_secs(2), 3).unwrap();

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(counter.0.load(Ordering::SeqCst), 3);
        assert!(handle.is_finished());
    }

    #[tokio::test(start_paused = true)]
    async fn stop_cancels() {
        let counter = Arc::new(Counter::default());
        let handle = PulseLoop::start(counter.clone(), Duration::from_secs(2), 30).unwrap();

        tokio::time::sleep(Duration::from_secs(3)).await;
        handle.stop();
        tokio::time::sleep(Duration::from_secs(20)).await;
        assert_eq!(counter.0.load(Ordering::SeqCst), 2);
        assert!(handle.is_finished());
    }

    #[tokio::test(start_paused = true)]
    async fn drop_cancels() {
        let counter = Arc::new(Counter::default());
        let handle = PulseLoop::start(counter.clone(), Duration::from_secs(2), 30).unwrap();

        tokio::time::sleep(Duration::from_secs(1)).await;
        drop(handle);
        tokio::time::sleep(Duration::from_secs(20)).await;
        assert_eq!(counter.0.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn without_runtime_is_skipped() {
        assert!(PulseLoop::start(Arc::new(NoFeedback), Duration::from_secs(2), 30).is_none());
    }
}
