//! # Status snapshots.
//!
//! A [`Status`] describes one moment of a job's life:
//! ```text
//! queued     position=Some(n)  progress=0.0   result=None      errored=false
//! running    position=None     progress=0..1  result=None      errored=false
//! completed  position=None     progress=1.0   result=Some(..)  errored=false   (terminal)
//! failed     position=None     progress=0.0   result=None      errored=true    (terminal)
//! ```
//! The constructors are the only way to build a `Status`, so a result and the error flag
//! can never be set together.

use std::fmt;

use crate::jobs::JobId;

const PROGRESS_BAR_LENGTH: usize = 20;

/// Opaque generated output (e.g. encoded image bytes).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Artifact {
    data: Vec<u8>,
}

impl Artifact {
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        Self { data: data.into() }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    /// Empty or all-zero output, which is what a safety filter leaves behind.
    pub fn is_blank(&self) -> bool {
        self.data.iter().all(|b| *b == 0)
    }
}

/// Progress/result/error snapshot for one job.
#[derive(Clone, Debug, PartialEq)]
pub struct Status {
    job_id: JobId,
    position: Option<usize>,
    progress: f32,
    result: Option<Vec<Artifact>>,
    errored: bool,
}

impl Status {
    /// Waiting in the queue with `position` jobs ahead.
    pub fn queued(job_id: JobId, position: usize) -> Self {
        Self {
            job_id,
            position: Some(position),
            progress: 0.0,
            result: None,
            errored: false,
        }
    }

    /// Running; `progress` is clamped to `[0.0, 1.0]`.
    pub fn progress(job_id: JobId, progress: f32) -> Self {
        Self {
            job_id,
            position: None,
            progress: clamp_fraction(progress),
            result: None,
            errored: false,
        }
    }

    /// Finished with `artifacts` (terminal).
    pub fn completed(job_id: JobId, artifacts: Vec<Artifact>) -> Self {
        Self {
            job_id,
            position: None,
            progress: 1.0,
            result: Some(artifacts),
            errored: false,
        }
    }

    /// Failed (terminal).
    pub fn failed(job_id: JobId) -> Self {
        Self {
            job_id,
            position: None,
            progress: 0.0,
            result: None,
            errored: true,
        }
    }

    pub fn job_id(&self) -> JobId {
        self.job_id
    }

    /// Jobs ahead in the queue; `None` once dispatched.
    pub fn position(&self) -> Option<usize> {
        self.position
    }

    pub fn progress_fraction(&self) -> f32 {
        self.progress
    }

    pub fn result(&self) -> Option<&[Artifact]> {
        self.result.as_deref()
    }

    /// Takes the artifacts out of a completed status.
    pub fn into_result(self) -> Option<Vec<Artifact>> {
        self.result
    }

    pub fn is_errored(&self) -> bool {
        self.errored
    }

    /// A result or an error: nothing follows this status for the job.
    pub fn is_terminal(&self) -> bool {
        self.result.is_some() || self.errored
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.errored {
            return f.write_str("An error has occurred, this message will be deleted shortly.");
        }
        if let Some(pos) = self.position.filter(|p| *p > 0) {
            return write!(f, "Queued ({pos} ahead)");
        }
        let filled = ((self.progress * PROGRESS_BAR_LENGTH as f32).round() as usize)
            .clamp(1, PROGRESS_BAR_LENGTH);
        for _ in 0..filled {
            f.write_str("▰")?;
        }
        for _ in filled..PROGRESS_BAR_LENGTH {
            f.write_str("▱")?;
        }
        Ok(())
    }
}

fn clamp_fraction(v: f32) -> f32 {
    if v.is_nan() { 0.0 } else { v.clamp(0.0, 1.0) }
}
