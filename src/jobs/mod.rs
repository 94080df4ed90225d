//! # Job and status records.
//!
//! Plain data with no behavior beyond construction and rendering:
//! - [`JobSpec`] - what a caller asks for
//! - `Job` - an immutable, identified unit of work built from a spec at submission (crate-internal)
//! - [`JobId`] - opaque unique id, never reused
//! - [`Status`] - progress / result / error snapshot for one job
//! - [`Artifact`] - opaque generated output

mod job;
mod status;

pub(crate) use job::Job;
pub use job::{JobId, JobSpec};
pub use status::{Artifact, Status};
