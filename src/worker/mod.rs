//! # Generation worker.
//!
//! The worker is the isolated unit that owns the expensive generator state and runs one
//! job at a time on a dedicated OS thread:
//! - [`Generator`] - the opaque generation backend (one loaded instance)
//! - [`GeneratorFactory`] - performs the expensive load; called once per worker instance
//! - [`GeneratorFn`] - closure-backed factory
//! - [`GenerationRequest`] / [`SafetyMode`] - what one generation call receives
//!
//! Internal pieces: the worker loop (`runner`), inbound/outbound message types
//! (`message`) and the per-job progress throttle (`throttle`).

mod generator;
mod generator_fn;
pub(crate) mod message;
pub(crate) mod runner;
mod throttle;

pub use generator::{GenerationRequest, Generator, GeneratorFactory, GeneratorRef, SafetyMode};
pub use generator_fn::GeneratorFn;
