//! Scheduled-task primitives with cancel semantics.
//!
//! Debounce coalescing, the auto-submit countdown and the bounded
//! submit-control probe are all timers with slightly different shapes; this
//! crate is the one place they are built, so cancellation behaves the same
//! way everywhere.

mod countdown;
mod debounce;
mod probe;

use std::time::Duration;

use rand::Rng;

pub use crate::countdown::{Countdown, CountdownHandle};
pub use crate::debounce::Debouncer;
pub use crate::probe::bounded_probe;

/// Uniform random duration in `[min, max]`. Degenerate bounds collapse to
/// `min`.
pub fn random_delay(min: Duration, max: Duration) -> Duration {
    if max <= min {
        return min;
    }
    let span = (max - min).as_millis() as u64;
    min + Duration::from_millis(rand::thread_rng().gen_range(0..=span))
}
