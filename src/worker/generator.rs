//! # Generation backend abstraction.
//!
//! A [`GeneratorFactory`] is shared by every worker instance the supervisor starts; each
//! instance calls [`GeneratorFactory::load`] once on its own thread and then feeds jobs to
//! the loaded [`Generator`]. Because loading happens on the worker thread, a `Generator`
//! does not need to be `Send` (device handles rarely are).
//!
//! Failure contract:
//! - `Err(GenerateError::Failed)` from `generate` → the job fails, the generator is reused
//! - `Err(GenerateError::Fatal)` or a panic → the worker exits and is replaced
//! - `Err(_)` from `load` → the worker exits and is replaced after backoff
//!
//! # Example
//! ```
//! use genvisor::{Artifact, GenerateError, GenerationRequest, Generator};
//!
//! struct Noise;
//!
//! impl Generator for Noise {
//!     fn generate(
//!         &mut self,
//!         request: &GenerationRequest<'_>,
//!         on_step: &mut dyn FnMut(u32),
//!     ) -> Result<Vec<Artifact>, GenerateError> {
//!         for step in 0..request.steps {
//!             on_step(step);
//!         }
//!         let pixels = (request.width * request.height) as usize;
//!         Ok(vec![Artifact::new(vec![1u8; pixels]); request.samples as usize])
//!     }
//! }
//! ```

use std::sync::Arc;

use crate::error::GenerateError;
use crate::jobs::{Artifact, Job};

/// Resource-checking behavior selected per job at dispatch.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SafetyMode {
    /// Run the safety checker on the output (default).
    #[default]
    Filtered,
    /// Skip the safety checker.
    Bypass,
}

impl SafetyMode {
    pub(crate) fn for_job(job: &Job) -> Self {
        if job.safety_enabled() {
            SafetyMode::Filtered
        } else {
            SafetyMode::Bypass
        }
    }
}

/// Parameters of one generation call.
///
/// The safety mode travels with the request instead of living on the generator, so a
/// generator never has to be reconfigured between jobs.
#[derive(Clone, Copy, Debug)]
pub struct GenerationRequest<'a> {
    pub prompt: &'a str,
    pub width: u32,
    pub height: u32,
    /// Job seed, or the worker default when the job has none.
    pub seed: u64,
    pub samples: u32,
    pub steps: u32,
    pub guidance_scale: f32,
    pub safety: SafetyMode,
}

impl<'a> GenerationRequest<'a> {
    pub(crate) fn for_job(job: &'a Job, default_seed: u64) -> Self {
        Self {
            prompt: job.prompt(),
            width: job.width(),
            height: job.height(),
            seed: job.seed().unwrap_or(default_seed),
            samples: job.samples(),
            steps: job.steps(),
            guidance_scale: job.guidance_scale(),
            safety: SafetyMode::for_job(job),
        }
    }
}

/// A loaded generation backend.
pub trait Generator {
    /// Runs one job to completion.
    ///
    /// Call `on_step(step)` after each processing step (`0..request.steps`); the worker
    /// turns it into throttled progress updates.
    fn generate(
        &mut self,
        request: &GenerationRequest<'_>,
        on_step: &mut dyn FnMut(u32),
    ) -> Result<Vec<Artifact>, GenerateError>;
}

/// Performs the expensive generator initialization.
///
/// Must be idempotent: every worker instance, including replacements after a crash,
/// calls `load` and must end up with an equivalent generator.
pub trait GeneratorFactory: Send + Sync + 'static {
    /// Returns a stable, human-readable backend name.
    fn name(&self) -> &str;

    /// Loads a generator. Runs on the worker thread.
    fn load(&self) -> Result<Box<dyn Generator>, GenerateError>;
}

/// Shared handle to a generator factory.
pub type GeneratorRef = Arc<dyn GeneratorFactory>;
