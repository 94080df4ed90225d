//! # Function-backed generator factory (`GeneratorFn`)
//!
//! [`GeneratorFn`] wraps a closure `F: Fn() -> Result<G, GenerateError>` that builds a
//! fresh generator each time a worker instance starts. Shared state between instances
//! (download caches, counters) has to be captured explicitly, e.g. behind an `Arc`.
//!
//! ## Example
//! ```rust
//! use genvisor::{Artifact, GenerateError, GenerationRequest, Generator, GeneratorFn, GeneratorRef};
//!
//! struct Echo;
//!
//! impl Generator for Echo {
//!     fn generate(
//!         &mut self,
//!         request: &GenerationRequest<'_>,
//!         _on_step: &mut dyn FnMut(u32),
//!     ) -> Result<Vec<Artifact>, GenerateError> {
//!         Ok(vec![Artifact::new(request.prompt.as_bytes().to_vec())])
//!     }
//! }
//!
//! let factory: GeneratorRef = GeneratorFn::arc("echo", || Ok::<_, GenerateError>(Echo));
//! assert_eq!(factory.name(), "echo");
//! ```

use std::borrow::Cow;
use std::sync::Arc;

use crate::error::GenerateError;
use crate::worker::generator::{Generator, GeneratorFactory};

/// Function-backed generator factory.
pub struct GeneratorFn<F> {
    name: Cow<'static, str>,
    f: F,
}

impl<F> GeneratorFn<F> {
    /// Creates a new function-backed factory.
    pub fn new(name: impl Into<Cow<'static, str>>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }

    /// Creates the factory and returns it as a shared handle.
    pub fn arc(name: impl Into<Cow<'static, str>>, f: F) -> Arc<Self> {
        Arc::new(Self::new(name, f))
    }
}

impl<F, G> GeneratorFactory for GeneratorFn<F>
where
    F: Fn() -> Result<G, GenerateError> + Send + Sync + 'static,
    G: Generator + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn load(&self) -> Result<Box<dyn Generator>, GenerateError> {
        let generator = (self.f)()?;
        Ok(Box::new(generator))
    }
}
