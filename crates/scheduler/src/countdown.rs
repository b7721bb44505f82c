use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Countdown that reports remaining ticks and runs an action on expiry,
/// unless cancelled first. Cancellation is final: once cancelled, the
/// action never runs.
pub struct Countdown;

pub struct CountdownHandle {
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl Countdown {
    pub fn start<T, F, Fut>(
        total: Duration,
        tick: Duration,
        on_tick: T,
        on_fire: F,
    ) -> CountdownHandle
    where
        T: Fn(u64) + Send + Sync + 'static,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let task = tokio::spawn(async move {
            let tick = tick.max(Duration::from_millis(1));
            let mut remaining = total.as_millis().div_ceil(tick.as_millis()) as u64;
            loop {
                on_tick(remaining);
                if remaining == 0 {
                    break;
                }
                tokio::select! {
                    _ = token.cancelled() => {
                        debug!("countdown cancelled");
                        return;
                    }
                    _ = tokio::time::sleep(tick) => {
                        remaining -= 1;
                    }
                }
            }
            on_fire().await;
        });
        CountdownHandle {
            cancel,
            task: Some(task),
        }
    }
}

impl CountdownHandle {
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Wait for the countdown task to finish, whether it fired or was
    /// cancelled.
    pub async fn join(mut self) {
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}
