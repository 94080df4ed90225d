//! End-to-end behavior of the scheduler with a scripted generator.
//!
//! Prompts drive the fake backend:
//! - `hold`  → waits until the test opens the gate
//! - `crash` → panics mid-job
//! - `fatal` → returns `GenerateError::Fatal`
//! - `fail`  → returns `GenerateError::Failed`
//! - `slow`  → sleeps 10 ms per step
//! - anything else completes right away

use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use genvisor::{
    Artifact, Event, EventKind, GenerateError, GenerationRequest, Generator, GeneratorFn,
    GeneratorRef, JobSpec, RestartPolicy, SafetyMode, Scheduler, SchedulerConfig,
    SchedulerError, Status, StatusStream, Subscribe,
};
use tokio::sync::broadcast;

#[derive(Default)]
struct Gate {
    open: Mutex<bool>,
    cv: Condvar,
}

impl Gate {
    fn wait(&self) {
        let mut open = self.open.lock().unwrap();
        while !*open {
            open = self.cv.wait(open).unwrap();
        }
    }

    fn open(&self) {
        *self.open.lock().unwrap() = true;
        self.cv.notify_all();
    }
}

#[derive(Default)]
struct Script {
    gate: Gate,
    seen: Mutex<Vec<(String, SafetyMode)>>,
}

struct Scripted(Arc<Script>);

impl Generator for Scripted {
    fn generate(
        &mut self,
        request: &GenerationRequest<'_>,
        on_step: &mut dyn FnMut(u32),
    ) -> Result<Vec<Artifact>, GenerateError> {
        self.0
            .seen
            .lock()
            .unwrap()
            .push((request.prompt.to_string(), request.safety));

        for step in 0..request.steps {
            on_step(step);
            match request.prompt {
                "hold" if step == 0 => self.0.gate.wait(),
                "crash" if step == 1 => panic!("simulated device fault"),
                "fatal" if step == 1 => return Err(GenerateError::fatal("illegal memory access")),
                "slow" => std::thread::sleep(Duration::from_millis(10)),
                _ => {}
            }
        }

        match request.prompt {
            "fail" => Err(GenerateError::failed("prompt rejected")),
            _ => Ok(vec![Artifact::new(vec![1u8; 4])]),
        }
    }
}

fn factory(script: &Arc<Script>) -> GeneratorRef {
    let script = script.clone();
    GeneratorFn::arc("scripted", move || {
        Ok::<_, GenerateError>(Scripted(script.clone()))
    })
}

fn fast_config() -> SchedulerConfig {
    let mut cfg = SchedulerConfig::default();
    cfg.idle_wait = Duration::from_secs(5);
    cfg.liveness_poll = Duration::from_millis(50);
    cfg.progress_throttle = Duration::ZERO;
    cfg.backoff.first = Duration::from_millis(10);
    cfg.default_steps = 4;
    cfg
}

fn start(cfg: SchedulerConfig) -> (Scheduler, Arc<Script>) {
    let script = Arc::new(Script::default());
    let scheduler = Scheduler::builder(cfg).build(factory(&script)).unwrap();
    (scheduler, script)
}

/// Reads until the stream ends; returns every status and the closing error, if any.
async fn collect(stream: &mut StatusStream) -> (Vec<Status>, Option<SchedulerError>) {
    let mut out = Vec::new();
    loop {
        match stream.next().await {
            Ok(Some(s)) => out.push(s),
            Ok(None) => return (out, None),
            Err(e) => return (out, Some(e)),
        }
    }
}

async fn wait_for(rx: &mut broadcast::Receiver<Event>, kind: EventKind) -> Event {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            match rx.recv().await {
                Ok(ev) if ev.kind == kind => return ev,
                Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => panic!("bus closed"),
            }
        }
    })
    .await
    .unwrap_or_else(|_| panic!("no {kind:?} event"))
}

#[tokio::test(flavor = "multi_thread")]
async fn test_initial_positions_follow_submission_order() {
    let (scheduler, script) = start(fast_config());

    let mut streams = Vec::new();
    for _ in 0..4 {
        streams.push(scheduler.submit(JobSpec::new("hold")).await.unwrap());
    }
    for (k, stream) in streams.iter_mut().enumerate() {
        let first = stream.next().await.unwrap().unwrap();
        assert_eq!(first.position(), Some(k));
        assert_eq!(first.progress_fraction(), 0.0);
    }
    assert_eq!(scheduler.queue_depth().await, 4);

    script.gate.open();
    for stream in &mut streams {
        let (statuses, err) = collect(stream).await;
        assert!(err.is_none());
        assert!(statuses.last().unwrap().result().is_some());
    }
    assert_eq!(scheduler.queue_depth().await, 0);
    scheduler.shutdown().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_terminal_status_advances_every_other_stream_by_one() {
    let (scheduler, script) = start(fast_config());

    let mut a = scheduler.submit(JobSpec::new("hold")).await.unwrap();
    let mut b = scheduler.submit(JobSpec::new("hold")).await.unwrap();
    let mut c = scheduler.submit(JobSpec::new("hold")).await.unwrap();
    assert_eq!(a.next().await.unwrap().unwrap().position(), Some(0));
    assert_eq!(b.next().await.unwrap().unwrap().position(), Some(1));
    assert_eq!(c.next().await.unwrap().unwrap().position(), Some(2));

    script.gate.open();
    let (a_statuses, _) = collect(&mut a).await;
    assert!(a_statuses.last().unwrap().is_terminal());

    let b_next = b.next().await.unwrap().unwrap();
    assert_eq!(b_next.position(), Some(0));
    assert_eq!(b_next.progress_fraction(), 0.0);

    let c_next = c.next().await.unwrap().unwrap();
    assert_eq!(c_next.position(), Some(1));

    collect(&mut b).await;
    let (c_rest, _) = collect(&mut c).await;
    assert_eq!(c_rest[0].position(), Some(0));
    assert_eq!(
        c_rest.iter().filter(|s| s.position().is_some()).count(),
        1,
        "exactly one advance per finished job ahead"
    );
    scheduler.shutdown().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_second_job_starts_at_one_and_drops_to_zero() {
    let (scheduler, script) = start(fast_config());

    let mut a = scheduler.submit(JobSpec::new("hold")).await.unwrap();
    a.next().await.unwrap();
    // A is running once its first progress shows up.
    let running = a.next().await.unwrap().unwrap();
    assert_eq!(running.position(), None);

    let mut b = scheduler.submit(JobSpec::new("next")).await.unwrap();
    let first = b.next().await.unwrap().unwrap();
    assert_eq!(first.position(), Some(1));
    assert_eq!(first.to_string(), "Queued (1 ahead)");

    script.gate.open();
    let second = b.next().await.unwrap().unwrap();
    assert_eq!(second.position(), Some(0));
    assert_eq!(second.progress_fraction(), 0.0);

    scheduler.shutdown().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_progress_is_monotonic_and_throttled() {
    let mut cfg = fast_config();
    cfg.progress_throttle = Duration::from_millis(60);
    let (scheduler, _script) = start(cfg);

    let started = std::time::Instant::now();
    let mut stream = scheduler
        .submit(JobSpec::new("slow").with_steps(30))
        .await
        .unwrap();
    let (statuses, err) = collect(&mut stream).await;
    let elapsed = started.elapsed();
    assert!(err.is_none());

    let progress: Vec<f32> = statuses
        .iter()
        .filter(|s| s.position().is_none() && !s.is_terminal())
        .map(Status::progress_fraction)
        .collect();
    assert!(!progress.is_empty());
    assert_eq!(progress[0], 0.0);
    assert!(progress.windows(2).all(|w| w[0] <= w[1]));

    let max_updates = (elapsed.as_millis() / 60) as usize + 1;
    assert!(
        progress.len() <= max_updates,
        "{} updates in {elapsed:?}",
        progress.len()
    );
    assert!(progress.len() < 30);
    assert!(statuses.last().unwrap().is_terminal());
    scheduler.shutdown().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_crash_mid_job_restarts_worker_and_orphans_stream() {
    let mut cfg = fast_config();
    cfg.idle_wait = Duration::from_millis(500);
    let poll = cfg.liveness_poll;
    let (scheduler, _script) = start(cfg);
    let mut events = scheduler.subscribe_events();

    let mut doomed = scheduler.submit(JobSpec::new("crash")).await.unwrap();
    let mut next = scheduler.submit(JobSpec::new("after")).await.unwrap();

    let dispatched = wait_for(&mut events, EventKind::JobDispatched).await;
    let crashed = wait_for(&mut events, EventKind::WorkerCrashed).await;
    assert!(crashed.reason.as_deref().unwrap().contains("simulated device fault"));
    let noticed_after = crashed.at.duration_since(dispatched.at).unwrap_or_default();
    assert!(
        noticed_after <= poll + Duration::from_millis(250),
        "crash noticed after {noticed_after:?}, poll is {poll:?}"
    );
    let abandoned = wait_for(&mut events, EventKind::JobAbandoned).await;
    assert_eq!(abandoned.job, Some(doomed.job_id()));
    wait_for(&mut events, EventKind::RestartScheduled).await;

    let (next_statuses, err) = collect(&mut next).await;
    assert!(err.is_none());
    assert_eq!(next_statuses[0].position(), Some(1));
    assert_eq!(next_statuses[1].position(), Some(0));
    assert!(next_statuses.last().unwrap().result().is_some());

    let (doomed_statuses, err) = collect(&mut doomed).await;
    assert!(doomed_statuses.iter().all(|s| !s.is_terminal()));
    assert!(matches!(err, Some(SchedulerError::Timeout { .. })));

    assert!(scheduler.is_worker_alive());
    assert_eq!(scheduler.queue_depth().await, 0);
    assert_eq!(scheduler.subscriber_count().await, 1, "orphan stays registered");
    scheduler.shutdown().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_fatal_error_replaces_worker_without_terminal_status() {
    let mut cfg = fast_config();
    cfg.idle_wait = Duration::from_millis(400);
    let (scheduler, _script) = start(cfg);
    let mut events = scheduler.subscribe_events();

    let mut doomed = scheduler.submit(JobSpec::new("fatal")).await.unwrap();
    let crashed = wait_for(&mut events, EventKind::WorkerCrashed).await;
    assert!(crashed.reason.as_deref().unwrap().contains("illegal memory access"));

    let (statuses, err) = collect(&mut doomed).await;
    assert!(statuses.iter().all(|s| !s.is_terminal()));
    assert!(matches!(err, Some(SchedulerError::Timeout { .. })));

    let mut next = scheduler.submit(JobSpec::new("after")).await.unwrap();
    let (statuses, _) = collect(&mut next).await;
    assert!(statuses.last().unwrap().result().is_some());
    scheduler.shutdown().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_contained_failure_keeps_worker() {
    let (scheduler, _script) = start(fast_config());
    let mut events = scheduler.subscribe_events();

    let mut failing = scheduler.submit(JobSpec::new("fail")).await.unwrap();
    let mut next = scheduler.submit(JobSpec::new("after")).await.unwrap();

    let (statuses, err) = collect(&mut failing).await;
    assert!(err.is_none());
    let last = statuses.last().unwrap();
    assert!(last.is_errored());
    assert_eq!(
        last.to_string(),
        "An error has occurred, this message will be deleted shortly."
    );

    let (statuses, _) = collect(&mut next).await;
    assert!(statuses.last().unwrap().result().is_some());

    scheduler.shutdown().await;
    let kinds: Vec<EventKind> = std::iter::from_fn(|| events.try_recv().ok())
        .map(|ev| ev.kind)
        .collect();
    assert!(kinds.contains(&EventKind::JobFailed));
    assert!(!kinds.contains(&EventKind::WorkerCrashed));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_abandoned_stream_does_not_block_others() {
    let (scheduler, _script) = start(fast_config());

    let dropped = scheduler.submit(JobSpec::new("slow")).await.unwrap();
    drop(dropped);
    let mut kept = scheduler.submit(JobSpec::new("after")).await.unwrap();

    let (statuses, err) = tokio::time::timeout(Duration::from_secs(2), collect(&mut kept))
        .await
        .unwrap();
    assert!(err.is_none());
    assert!(statuses.last().unwrap().result().is_some());
    assert_eq!(scheduler.subscriber_count().await, 0);
    scheduler.shutdown().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_shutdown_finishes_running_job_then_stops_everything() {
    let (scheduler, script) = start(fast_config());
    let scheduler = Arc::new(scheduler);

    let mut running = scheduler.submit(JobSpec::new("hold")).await.unwrap();
    running.next().await.unwrap();
    running.next().await.unwrap();

    let stopper = {
        let scheduler = scheduler.clone();
        tokio::spawn(async move { scheduler.shutdown().await })
    };
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(!stopper.is_finished(), "shutdown waits for the running job");
    assert!(matches!(
        scheduler.submit(JobSpec::new("late")).await,
        Err(SchedulerError::ShuttingDown)
    ));

    script.gate.open();
    stopper.await.unwrap();

    let (statuses, _) = collect(&mut running).await;
    assert!(statuses.last().unwrap().result().is_some());
    assert!(!scheduler.is_worker_alive());
    assert!(!scheduler.is_router_running());
    assert!(script.seen.lock().unwrap().iter().all(|(p, _)| p != "late"));

    scheduler.shutdown().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_shutdown_runs_jobs_queued_before_it() {
    let (scheduler, script) = start(fast_config());
    let scheduler = Arc::new(scheduler);

    let mut running = scheduler.submit(JobSpec::new("hold")).await.unwrap();
    let mut queued = scheduler.submit(JobSpec::new("queued")).await.unwrap();
    assert_eq!(running.next().await.unwrap().unwrap().position(), Some(0));
    assert_eq!(queued.next().await.unwrap().unwrap().position(), Some(1));

    let stopper = {
        let scheduler = scheduler.clone();
        tokio::spawn(async move { scheduler.shutdown().await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!stopper.is_finished());

    script.gate.open();
    stopper.await.unwrap();

    let (statuses, err) = collect(&mut queued).await;
    assert!(err.is_none(), "queued job was cut off: {err:?}");
    assert!(statuses.last().unwrap().result().is_some());
    collect(&mut running).await;

    let prompts: Vec<String> = script
        .seen
        .lock()
        .unwrap()
        .iter()
        .map(|(p, _)| p.clone())
        .collect();
    assert_eq!(prompts, ["hold", "queued"]);
    assert!(!scheduler.is_worker_alive());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_finish_events_name_the_worker() {
    let (scheduler, _script) = start(fast_config());
    let mut events = scheduler.subscribe_events();

    let mut ok = scheduler.submit(JobSpec::new("cat")).await.unwrap();
    let mut bad = scheduler.submit(JobSpec::new("fail")).await.unwrap();
    collect(&mut ok).await;
    collect(&mut bad).await;

    let dispatched = wait_for(&mut events, EventKind::JobDispatched).await;
    let completed = wait_for(&mut events, EventKind::JobCompleted).await;
    let failed = wait_for(&mut events, EventKind::JobFailed).await;
    assert!(dispatched.worker.is_some());
    assert_eq!(completed.job, Some(ok.job_id()));
    assert_eq!(completed.worker, dispatched.worker);
    assert_eq!(failed.job, Some(bad.job_id()));
    assert_eq!(failed.worker, dispatched.worker);
    scheduler.shutdown().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_never_policy_leaves_worker_down() {
    let mut cfg = fast_config();
    cfg.restart = RestartPolicy::Never;
    let (scheduler, _script) = start(cfg);
    let mut events = scheduler.subscribe_events();

    let _doomed = scheduler.submit(JobSpec::new("crash")).await.unwrap();
    wait_for(&mut events, EventKind::WorkerExhausted).await;

    assert!(!scheduler.is_worker_alive());
    assert!(scheduler.is_router_running());
    scheduler.shutdown().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_safety_mode_is_chosen_per_job() {
    let (scheduler, script) = start(fast_config());

    let mut a = scheduler
        .submit(JobSpec::new("unfiltered").with_safety(false))
        .await
        .unwrap();
    let mut b = scheduler.submit(JobSpec::new("filtered")).await.unwrap();
    collect(&mut a).await;
    collect(&mut b).await;

    assert_eq!(
        *script.seen.lock().unwrap(),
        vec![
            ("unfiltered".to_string(), SafetyMode::Bypass),
            ("filtered".to_string(), SafetyMode::Filtered),
        ]
    );
    scheduler.shutdown().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_dropping_scheduler_closes_streams() {
    let (scheduler, script) = start(fast_config());

    let mut a = scheduler.submit(JobSpec::new("hold")).await.unwrap();
    let mut b = scheduler.submit(JobSpec::new("queued")).await.unwrap();
    a.next().await.unwrap();
    b.next().await.unwrap();

    drop(scheduler);
    let res = tokio::time::timeout(Duration::from_secs(2), b.next())
        .await
        .unwrap();
    assert!(matches!(res, Err(SchedulerError::Closed)));

    script.gate.open();
}

#[derive(Default)]
struct Recorder {
    kinds: Mutex<Vec<EventKind>>,
}

#[async_trait]
impl Subscribe for Recorder {
    async fn on_event(&self, event: &Event) {
        self.kinds.lock().unwrap().push(event.kind);
    }

    fn name(&self) -> &'static str {
        "recorder"
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn test_subscribers_see_lifecycle_through_shutdown() {
    let script = Arc::new(Script::default());
    let recorder = Arc::new(Recorder::default());
    let scheduler = Scheduler::builder(fast_config())
        .with_subscribers(vec![recorder.clone() as Arc<dyn Subscribe>])
        .build(factory(&script))
        .unwrap();

    let mut stream = scheduler.submit(JobSpec::new("cat")).await.unwrap();
    collect(&mut stream).await;
    scheduler.shutdown().await;

    let kinds = recorder.kinds.lock().unwrap().clone();
    for expected in [
        EventKind::WorkerStarting,
        EventKind::JobQueued,
        EventKind::JobDispatched,
        EventKind::JobCompleted,
        EventKind::ShutdownRequested,
        EventKind::WorkerStopped,
        EventKind::RouterStopped,
    ] {
        assert!(kinds.contains(&expected), "missing {expected:?} in {kinds:?}");
    }
    let stopped = kinds.iter().position(|k| *k == EventKind::WorkerStopped);
    let router = kinds.iter().position(|k| *k == EventKind::RouterStopped);
    assert!(stopped < router);
}
