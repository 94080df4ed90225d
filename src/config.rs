//! # Scheduler configuration.
//!
//! Provides [`SchedulerConfig`] centralized settings for the scheduler runtime.
//!
//! Config is used in two ways:
//! 1. **Scheduler creation**: `Scheduler::builder(config)`
//! 2. **Job defaults**: steps / guidance scale / seed a [`JobSpec`](crate::JobSpec) leaves unset
//!
//! ## Sentinel values
//! - `default_seed = None` → a random seed is drawn once per scheduler
//! - `idle_wait = 0s` → every stream read times out immediately (only useful in tests)
//!
//! # Example
//! ```
//! use std::time::Duration;
//! use genvisor::{RestartPolicy, SchedulerConfig};
//!
//! let mut cfg = SchedulerConfig::default();
//! cfg.idle_wait = Duration::from_secs(30);
//! cfg.restart = RestartPolicy::Never;
//!
//! assert_eq!(cfg.liveness_poll, Duration::from_secs(3));
//! ```

use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;
use crate::policies::{BackoffPolicy, RestartPolicy};

/// Number of sampling steps when a job does not specify one.
pub const DEFAULT_STEPS: u32 = 50;
/// Classifier-free guidance scale when a job does not specify one.
pub const DEFAULT_GUIDANCE_SCALE: f32 = 7.5;

/// Global configuration for the scheduler runtime.
///
/// ## Field semantics
/// - `idle_wait`: longest a status stream read waits before failing with `Timeout`
/// - `liveness_poll`: how often the router checks worker liveness while idle
/// - `progress_throttle`: minimum spacing of non-terminal progress updates per job
/// - `default_seed`: seed for jobs without one (`None` = random, fixed per scheduler)
/// - `default_steps` / `default_guidance_scale`: generation defaults
/// - `bus_capacity`: runtime event bus ring buffer size (min 1; clamped by Bus)
/// - `restart`: what to do when the worker dies
/// - `backoff`: delay before each restart
#[derive(Clone, Debug)]
pub struct SchedulerConfig {
    /// Maximum wait for a single status stream read.
    ///
    /// Exceeding it fails the read with `SchedulerError::Timeout`; the job keeps running.
    pub idle_wait: Duration,

    /// Interval at which the router re-checks worker liveness while no messages arrive.
    ///
    /// Also the upper bound on crash detection latency.
    pub liveness_poll: Duration,

    /// Minimum interval between two progress updates of the same job.
    ///
    /// The first progress update and the terminal status are never suppressed.
    pub progress_throttle: Duration,

    /// Seed used for jobs submitted without one.
    pub default_seed: Option<u64>,

    /// Sampling steps used for jobs submitted without an explicit count.
    pub default_steps: u32,

    /// Guidance scale used for jobs submitted without an explicit value.
    pub default_guidance_scale: f32,

    /// Capacity of the runtime event bus.
    ///
    /// Slow receivers lagging more than `bus_capacity` events skip older items.
    pub bus_capacity: usize,

    /// Restart policy applied when the worker exits unexpectedly.
    pub restart: RestartPolicy,

    /// Backoff between consecutive worker restarts.
    pub backoff: BackoffPolicy,
}

impl SchedulerConfig {
    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }

    /// Loads configuration from process environment variables.
    ///
    /// Unset variables keep their defaults. Recognised variables:
    /// - `GENVISOR_IDLE_WAIT_SECS` (must be non-zero)
    /// - `GENVISOR_LIVENESS_POLL_MS` (must be non-zero)
    /// - `GENVISOR_PROGRESS_THROTTLE_MS`
    /// - `DEFAULT_SEED`
    /// - `DEFAULT_STEPS`
    /// - `DEFAULT_SCALE`
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) but reads values through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();

        if let Some(secs) = parse_nonzero(&lookup, "GENVISOR_IDLE_WAIT_SECS")? {
            cfg.idle_wait = Duration::from_secs(secs);
        }
        if let Some(ms) = parse_nonzero(&lookup, "GENVISOR_LIVENESS_POLL_MS")? {
            cfg.liveness_poll = Duration::from_millis(ms);
        }
        if let Some(ms) = parse::<u64, _>(&lookup, "GENVISOR_PROGRESS_THROTTLE_MS")? {
            cfg.progress_throttle = Duration::from_millis(ms);
        }
        if let Some(seed) = parse::<u64, _>(&lookup, "DEFAULT_SEED")? {
            cfg.default_seed = Some(seed);
        }
        if let Some(steps) = parse::<u32, _>(&lookup, "DEFAULT_STEPS")? {
            cfg.default_steps = steps;
        }
        if let Some(scale) = parse::<f32, _>(&lookup, "DEFAULT_SCALE")? {
            cfg.default_guidance_scale = scale;
        }
        Ok(cfg)
    }
}

/// Like [`parse`], but `0` is rejected: a zero idle wait ends every stream at once and a
/// zero liveness poll spins the router.
fn parse_nonzero<F>(lookup: &F, var: &'static str) -> Result<Option<u64>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match parse::<u64, _>(lookup, var)? {
        Some(0) => Err(ConfigError::Invalid {
            var,
            value: lookup(var).unwrap_or_default(),
        }),
        other => Ok(other),
    }
}

fn parse<T, F>(lookup: &F, var: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(var) {
        None => Ok(None),
        Some(raw) if raw.trim().is_empty() => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigError::Invalid { var, value: raw }),
    }
}

impl Default for SchedulerConfig {
    /// Default configuration:
    ///
    /// - `idle_wait = 120s`
    /// - `liveness_poll = 3s`
    /// - `progress_throttle = 3s`
    /// - `default_seed = None` (random per scheduler)
    /// - `default_steps = 50`, `default_guidance_scale = 7.5`
    /// - `bus_capacity = 1024`
    /// - `restart = RestartPolicy::OnFailure`
    /// - `backoff = BackoffPolicy::default()` (constant 100ms)
    fn default() -> Self {
        Self {
            idle_wait: Duration::from_secs(120),
            liveness_poll: Duration::from_secs(3),
            progress_throttle: Duration::from_secs(3),
            default_seed: None,
            default_steps: DEFAULT_STEPS,
            default_guidance_scale: DEFAULT_GUIDANCE_SCALE,
            bus_capacity: 1024,
            restart: RestartPolicy::default(),
            backoff: BackoffPolicy::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_match_documented_tunables() {
        let cfg = SchedulerConfig::default();
        assert_eq!(cfg.idle_wait, Duration::from_secs(120));
        assert_eq!(cfg.liveness_poll, Duration::from_secs(3));
        assert_eq!(cfg.progress_throttle, Duration::from_secs(3));
        assert_eq!(cfg.default_steps, 50);
        assert_eq!(cfg.default_seed, None);
    }

    #[test]
    fn test_empty_lookup_keeps_defaults() {
        let cfg = SchedulerConfig::from_lookup(|_| None).unwrap();
        assert_eq!(cfg.idle_wait, Duration::from_secs(120));
        assert_eq!(cfg.default_guidance_scale, 7.5);
    }

    #[test]
    fn test_lookup_overrides() {
        let cfg = SchedulerConfig::from_lookup(lookup_from(&[
            ("GENVISOR_IDLE_WAIT_SECS", "30"),
            ("GENVISOR_LIVENESS_POLL_MS", "250"),
            ("GENVISOR_PROGRESS_THROTTLE_MS", "1000"),
            ("DEFAULT_SEED", "42"),
            ("DEFAULT_STEPS", " 25 "),
            ("DEFAULT_SCALE", "9.0"),
        ]))
        .unwrap();

        assert_eq!(cfg.idle_wait, Duration::from_secs(30));
        assert_eq!(cfg.liveness_poll, Duration::from_millis(250));
        assert_eq!(cfg.progress_throttle, Duration::from_secs(1));
        assert_eq!(cfg.default_seed, Some(42));
        assert_eq!(cfg.default_steps, 25);
        assert_eq!(cfg.default_guidance_scale, 9.0);
    }

    #[test]
    fn test_blank_value_is_ignored() {
        let cfg = SchedulerConfig::from_lookup(lookup_from(&[("DEFAULT_SEED", "  ")])).unwrap();
        assert_eq!(cfg.default_seed, None);
    }

    #[test]
    fn test_invalid_value_is_reported() {
        let err = SchedulerConfig::from_lookup(lookup_from(&[("DEFAULT_STEPS", "many")]))
            .unwrap_err();
        assert_eq!(
            err,
            ConfigError::Invalid {
                var: "DEFAULT_STEPS",
                value: "many".into()
            }
        );
        assert_eq!(err.as_label(), "config_invalid");
    }

    #[test]
    fn test_zero_intervals_are_rejected() {
        for var in ["GENVISOR_IDLE_WAIT_SECS", "GENVISOR_LIVENESS_POLL_MS"] {
            let err = SchedulerConfig::from_lookup(lookup_from(&[(var, "0")])).unwrap_err();
            assert_eq!(
                err,
                ConfigError::Invalid {
                    var,
                    value: "0".into()
                }
            );
        }

        // A zero throttle is meaningful: every step is forwarded.
        let cfg =
            SchedulerConfig::from_lookup(lookup_from(&[("GENVISOR_PROGRESS_THROTTLE_MS", "0")]))
                .unwrap();
        assert_eq!(cfg.progress_throttle, Duration::ZERO);
    }
}
