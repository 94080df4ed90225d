//! # Jobs and their identifiers.
//!
//! A [`JobSpec`] is assembled by the caller; [`Scheduler::submit`](crate::Scheduler::submit)
//! turns it into a `Job` by assigning a fresh [`JobId`] and filling unset generation
//! parameters from [`SchedulerConfig`]. Jobs are immutable from then on.
//!
//! ## Example
//! ```rust
//! use genvisor::JobSpec;
//!
//! let spec = JobSpec::new("a lighthouse at dusk")
//!     .with_size(768, 512)
//!     .with_seed(7)
//!     .with_samples(2);
//!
//! assert_eq!(spec.width, 768);
//! assert!(spec.safety_enabled);
//! ```

use std::fmt;

use uuid::Uuid;

use crate::config::SchedulerConfig;

/// Opaque, unique job identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JobId(Uuid);

impl JobId {
    pub(crate) fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Caller-side description of a generation job.
///
/// Width and height must be positive and divisible by 8; validating that is the
/// caller's job. `steps` and `guidance_scale` fall back to the scheduler's defaults.
#[derive(Clone, Debug, PartialEq)]
pub struct JobSpec {
    /// Description of the output to generate.
    pub prompt: String,
    /// Output width in pixels.
    pub width: u32,
    /// Output height in pixels.
    pub height: u32,
    /// RNG seed (`None` = worker default).
    pub seed: Option<u64>,
    /// Run the safety filter on the output.
    pub safety_enabled: bool,
    /// Number of artifacts to produce in one run.
    pub samples: u32,
    /// Sampling steps (`None` = scheduler default).
    pub steps: Option<u32>,
    /// Classifier-free guidance scale (`None` = scheduler default).
    pub guidance_scale: Option<f32>,
}

impl JobSpec {
    /// Creates a 512x512, single-sample, safety-filtered spec for `prompt`.
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            width: 512,
            height: 512,
            seed: None,
            safety_enabled: true,
            samples: 1,
            steps: None,
            guidance_scale: None,
        }
    }

    /// Returns a new spec with the given output size.
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Returns a new spec with a fixed seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Returns a new spec with the safety filter enabled or bypassed.
    pub fn with_safety(mut self, enabled: bool) -> Self {
        self.safety_enabled = enabled;
        self
    }

    /// Returns a new spec producing `samples` artifacts.
    pub fn with_samples(mut self, samples: u32) -> Self {
        self.samples = samples;
        self
    }

    /// Returns a new spec with an explicit step count.
    pub fn with_steps(mut self, steps: u32) -> Self {
        self.steps = Some(steps);
        self
    }

    /// Returns a new spec with an explicit guidance scale.
    pub fn with_guidance_scale(mut self, scale: f32) -> Self {
        self.guidance_scale = Some(scale);
        self
    }
}

/// One submitted unit of generation work.
///
/// Only the scheduler builds these; callers describe work with [`JobSpec`].
///
/// ```compile_fail
/// use genvisor::Job;
/// ```
#[derive(Clone, Debug)]
pub(crate) struct Job {
    id: JobId,
    prompt: String,
    width: u32,
    height: u32,
    seed: Option<u64>,
    safety_enabled: bool,
    samples: u32,
    steps: u32,
    guidance_scale: f32,
}

impl Job {
    /// Builds a job from `spec` with a fresh id; unset parameters come from `cfg`.
    pub(crate) fn from_spec(spec: JobSpec, cfg: &SchedulerConfig) -> Self {
        Self {
            id: JobId::new(),
            prompt: spec.prompt,
            width: spec.width,
            height: spec.height,
            seed: spec.seed,
            safety_enabled: spec.safety_enabled,
            samples: spec.samples.max(1),
            steps: spec.steps.unwrap_or(cfg.default_steps).max(1),
            guidance_scale: spec.guidance_scale.unwrap_or(cfg.default_guidance_scale),
        }
    }

    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Explicit seed, if the caller provided one.
    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    pub fn safety_enabled(&self) -> bool {
        self.safety_enabled
    }

    pub fn samples(&self) -> u32 {
        self.samples
    }

    /// Sampling steps (always at least 1).
    pub fn steps(&self) -> u32 {
        self.steps
    }

    pub fn guidance_scale(&self) -> f32 {
        self.guidance_scale
    }
}

impl fmt::Display for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, prompt: {}", self.id, self.prompt)
    }
}
