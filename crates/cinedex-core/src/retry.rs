//! Retry policy with jittered exponential backoff.
//!
//! The wait before retry `n` (1-based) is drawn from a window whose upper
//! edge is `base_delay * multiplier^(n-1)`, capped at `max_delay`:
//!
//! ```text
//! retry   window (defaults: 1s base, x2, 120s cap, full jitter)
//!   1     [0s,   1s]
//!   2     [0s,   2s]
//!   3     [0s,   4s]
//!   ...
//!   8+    [0s, 120s]
//! ```
//!
//! Attempts are bounded by `max_attempts`. Tests use
//! [`RetryPolicy::immediate`] to keep the attempt budget without sleeping.

use std::str::FromStr;
use std::time::Duration;

use rand::Rng;

use crate::AppError;

/// How randomness is applied on top of the exponential window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Jitter {
    /// Always wait the full window.
    None,
    /// Uniform in `[0, window]`.
    Full,
    /// Uniform in `[window * (1 - ratio), window * (1 + ratio)]`, still capped.
    Proportional(f64),
}

impl FromStr for Jitter {
    type Err = AppError;

    /// Parses `none`, `full`, or a ratio in `(0, 1]` for proportional jitter.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(Jitter::None),
            "full" => Ok(Jitter::Full),
            other => match other.parse::<f64>() {
                Ok(ratio) if ratio > 0.0 && ratio <= 1.0 => Ok(Jitter::Proportional(ratio)),
                _ => Err(AppError::ConfigError(format!(
                    "jitter must be 'none', 'full' or a ratio in (0, 1], got '{}'",
                    s
                ))),
            },
        }
    }
}

/// Configuration for annotation retries.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Window for the first retry.
    pub base_delay: Duration,
    /// Growth factor applied per retry.
    pub multiplier: f64,
    /// No single wait exceeds this.
    pub max_delay: Duration,
    /// Total oracle attempts per item, first call included.
    pub max_attempts: u32,
    pub jitter: Jitter,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_secs(1),
            multiplier: 2.0,
            max_delay: Duration::from_secs(120),
            max_attempts: 8,
            jitter: Jitter::Full,
        }
    }
}

impl RetryPolicy {
    /// A policy that never sleeps between attempts.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            max_attempts: max_attempts.max(1),
            jitter: Jitter::None,
            ..Self::default()
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier.max(1.0);
        self
    }

    pub fn with_jitter(mut self, jitter: Jitter) -> Self {
        self.jitter = jitter;
        self
    }

    /// Returns true if another attempt is allowed after `attempts` calls.
    pub fn allows_another(&self, attempts: u32) -> bool {
        attempts < self.max_attempts
    }

    /// Upper edge of the backoff window for retry `retry` (1-based), before jitter.
    pub fn window_for_retry(&self, retry: u32) -> Duration {
        if retry == 0 || self.base_delay.is_zero() {
            return Duration::ZERO;
        }

        let exp = retry.saturating_sub(1).min(i32::MAX as u32) as i32;
        let scaled = self.base_delay.as_secs_f64() * self.multiplier.powi(exp);
        let capped = scaled.min(self.max_delay.as_secs_f64());
        if capped.is_finite() && capped > 0.0 {
            Duration::from_secs_f64(capped)
        } else {
            Duration::ZERO
        }
    }

    /// Jittered wait before retry `retry`, drawn from `rng`.
    pub fn delay_for_retry(&self, retry: u32, rng: &mut impl Rng) -> Duration {
        let window = self.window_for_retry(retry).as_secs_f64();
        if window <= 0.0 {
            return Duration::ZERO;
        }

        let secs = match self.jitter {
            Jitter::None => window,
            Jitter::Full => rng.random_range(0.0..=window),
            Jitter::Proportional(ratio) => {
                let cap = self.max_delay.as_secs_f64();
                let spread = window * ratio.clamp(0.0, 1.0);
                let lower = (window - spread).max(0.0);
                let upper = (window + spread).min(cap).max(lower);
                rng.random_range(lower..=upper)
            }
        };
        Duration::from_secs_f64(secs)
    }

    /// Jittered wait before retry `retry`, using the thread-local generator.
    pub fn next_delay(&self, retry: u32) -> Duration {
        self.delay_for_retry(retry, &mut rand::rng())
    }
}
