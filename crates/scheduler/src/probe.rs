use std::future::Future;
use std::time::Duration;

/// Poll `probe` up to `attempts` times, `interval` apart, returning the
/// first hit. This is the only retry loop in the pipeline; everything else
/// fails once and reports.
pub async fn bounded_probe<F, Fut, T>(attempts: u32, interval: Duration, mut probe: F) -> Option<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Option<T>>,
{
    for attempt in 0..attempts {
        if let Some(found) = probe().await {
            return Some(found);
        }
        if attempt + 1 < attempts {
            tokio::time::sleep(interval).await;
        }
    }
    None
}
