//! Exponentially weighted moving average of a per-second rate.

use std::time::Duration;

const NANOS_PER_SEC: f64 = 1e9;
const LN2: f64 = std::f64::consts::LN_2;

/// A smoothed per-second rate.
///
/// Values are accumulated into a cumulative counter; once at least one
/// second has elapsed since the last smoothing step, the accumulated
/// per-second rate is folded into the average with
/// `alpha = 1 − exp(−elapsed / window)`.
#[derive(Debug, Clone)]
pub struct Rate {
    /// Time constant in seconds.
    tau: f64,
    last_ns: Option<i64>,
    cumulative: f64,
    value: f64,
}

impl Rate {
    /// A rate with a plain time-constant window.
    pub fn new(window: Duration) -> Self {
        Self {
            tau: window.as_secs_f64(),
            last_ns: None,
            cumulative: 0.0,
            value: 0.0,
        }
    }

    /// A rate where `window` is the half-life: the time for a step
    /// change in input to reach ~50% of the smoothed value.
    pub fn with_half_life(window: Duration) -> Self {
        Self {
            tau: window.as_secs_f64() / LN2,
            ..Self::new(window)
        }
    }

    /// Seeds the smoothed value, used when warm starting from a
    /// persisted snapshot.
    pub fn seeded(mut self, value: f64, now_ns: i64) -> Self {
        self.value = value;
        self.last_ns = Some(now_ns);
        self
    }

    /// Record `v` observed at `now_ns`.
    ///
    /// A clock that runs backwards is ignored for smoothing purposes:
    /// the value still accumulates, the window does not advance.
    pub fn add(&mut self, v: f64, now_ns: i64) {
        let last = *self.last_ns.get_or_insert(now_ns);
        let elapsed = (now_ns - last) as f64 / NANOS_PER_SEC;
        if elapsed >= 1.0 {
            let alpha = 1.0 - (-elapsed / self.tau).exp();
            self.value = alpha * (self.cumulative / elapsed) + (1.0 - alpha) * self.value;
            self.cumulative = 0.0;
            self.last_ns = Some(now_ns);
        }
        self.cumulative += v;
    }

    /// The current smoothed per-second rate.
    pub fn value(&self) -> f64 {
        self.value
    }
}
