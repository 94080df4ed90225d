//! Runs a handful of jobs against a fake generator and prints their status lines.
//!
//! ```text
//! RUST_LOG=genvisor=debug cargo run --example generate
//! ```
//!
//! Settings come from the environment (or a `.env` file), e.g. `DEFAULT_STEPS=20`,
//! `GENVISOR_PROGRESS_THROTTLE_MS=200`. The prompt `crash` makes the backend panic
//! halfway through, so the restart path shows up in the log.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use genvisor::{
    Artifact, GenerateError, GenerationRequest, Generator, GeneratorFn, JobSpec, LogWriter,
    SafetyMode, Scheduler, SchedulerConfig, Subscribe,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Produces a gradient; pretends each step takes a while.
struct Gradient {
    step_time: Duration,
}

impl Generator for Gradient {
    fn generate(
        &mut self,
        request: &GenerationRequest<'_>,
        on_step: &mut dyn FnMut(u32),
    ) -> Result<Vec<Artifact>, GenerateError> {
        if request.prompt.trim().is_empty() {
            return Err(GenerateError::failed("empty prompt"));
        }
        for step in 0..request.steps {
            on_step(step);
            if request.prompt == "crash" && step == request.steps / 2 {
                panic!("device lost");
            }
            std::thread::sleep(self.step_time);
        }

        let pixels = (request.width * request.height) as usize;
        let samples = (0..request.samples)
            .map(|i| {
                // The safety checker blanks flagged output; this one flags every other sample.
                if request.safety == SafetyMode::Filtered && i % 2 == 1 {
                    Artifact::new(vec![0u8; pixels])
                } else {
                    let seed = request.seed.wrapping_add(u64::from(i));
                    Artifact::new((0..pixels).map(|p| (p as u64 ^ seed) as u8).collect::<Vec<_>>())
                }
            })
            .collect();
        Ok(samples)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "genvisor=info,generate=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut cfg = SchedulerConfig::from_env()?;
    cfg.default_steps = cfg.default_steps.min(20);
    cfg.progress_throttle = cfg.progress_throttle.min(Duration::from_millis(300));
    cfg.liveness_poll = cfg.liveness_poll.min(Duration::from_millis(500));
    cfg.idle_wait = cfg.idle_wait.min(Duration::from_secs(10));

    let factory = GeneratorFn::arc("gradient", || {
        tracing::info!("loading gradient weights");
        std::thread::sleep(Duration::from_millis(300));
        Ok::<_, GenerateError>(Gradient {
            step_time: Duration::from_millis(50),
        })
    });
    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];
    let scheduler = Scheduler::builder(cfg).with_subscribers(subs).build(factory)?;

    let prompts = [
        JobSpec::new("a lighthouse at dusk").with_size(64, 64),
        JobSpec::new("crash"),
        JobSpec::new("three foxes").with_samples(2).with_seed(7),
        JobSpec::new("unfiltered fox").with_samples(2).with_safety(false),
        JobSpec::new(" "),
    ];

    let mut clients = Vec::new();
    for spec in prompts {
        let prompt = spec.prompt.clone();
        let stream = scheduler.submit(spec).await?;
        clients.push(tokio::spawn(async move {
            let mut statuses = std::pin::pin!(stream.into_stream());
            while let Some(item) = statuses.next().await {
                match item {
                    Ok(status) => match status.result() {
                        Some(images) => {
                            println!("[{prompt}] done, {} image(s)", images.len())
                        }
                        None => println!("[{prompt}] {status}"),
                    },
                    Err(e) => println!("[{prompt}] stream ended: {e}"),
                }
            }
        }));
    }

    for client in clients {
        client.await?;
    }
    scheduler.shutdown().await;
    Ok(())
}
