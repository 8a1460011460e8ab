//! Drives a [`QuantOrchestrator`] against real collaborators.
//!
//! The orchestrator decides; the session executes. Each command runs as a
//! spawned task whose outcome comes back over an mpsc channel as an event
//! tagged with the originating run id. Persists go through one queue so
//! the store sees snapshots in the order they were produced.

use crate::baseline::BaselineSource;
use crate::compute::QuantCompute;
use crate::error::{ServiceError, ServiceResult};
use crate::store::SnapshotStore;
use minescope_core::orchestrator::OrchestratorStatus;
use minescope_core::{AnalysisResult, Command, Event, QuantOrchestrator, QuantitativeSnapshot, RunId};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::mpsc;

pub struct QuantSession {
    analysis_id: String,
    orchestrator: QuantOrchestrator,
    baseline: Option<Arc<Value>>,
    baseline_source: Arc<dyn BaselineSource>,
    compute: Arc<dyn QuantCompute>,
    store: Arc<dyn SnapshotStore>,
    tx: mpsc::UnboundedSender<Event>,
    rx: mpsc::UnboundedReceiver<Event>,
    persist_queue: Option<mpsc::UnboundedSender<(RunId, QuantitativeSnapshot)>>,
}

impl QuantSession {
    pub fn new(
        analysis_id: impl Into<String>,
        baseline_source: Arc<dyn BaselineSource>,
        compute: Arc<dyn QuantCompute>,
        store: Arc<dyn SnapshotStore>,
    ) -> Self {
        let analysis_id = analysis_id.into();
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            orchestrator: QuantOrchestrator::new(analysis_id.clone()),
            analysis_id,
            baseline: None,
            baseline_source,
            compute,
            store,
            tx,
            rx,
            persist_queue: None,
        }
    }

    pub fn with_auto_compute(mut self, enabled: bool) -> Self {
        self.orchestrator = self.orchestrator.with_auto_compute(enabled);
        self
    }

    /// Fetch the baseline and any stored snapshot, then hand both to the
    /// orchestrator. A store read failure only costs the cached snapshot.
    pub async fn load_baseline(&mut self) -> ServiceResult<AnalysisResult> {
        let raw = self.baseline_source.fetch(&self.analysis_id).await?;
        let persisted = match self.store.load(&self.analysis_id).await {
            Ok(snapshot) => snapshot,
            Err(err) => {
                log::warn!("Could not read stored snapshot for {}: {}", self.analysis_id, err);
                None
            }
        };
        let result = AnalysisResult::from_json(&raw);
        self.baseline = Some(Arc::new(raw));
        let commands = self.orchestrator.handle(Event::BaselineLoaded { persisted });
        self.dispatch(commands);
        Ok(result)
    }

    pub fn request_recompute(&mut self) {
        let commands = self.orchestrator.handle(Event::RecomputeRequested);
        self.dispatch(commands);
    }

    /// Process results until no compute or persist is outstanding.
    pub async fn run_until_settled(&mut self) -> ServiceResult<OrchestratorStatus> {
        while !self.orchestrator.is_settled() {
            let event = self.rx.recv().await.ok_or(ServiceError::Closed)?;
            let commands = self.orchestrator.handle(event);
            self.dispatch(commands);
        }
        Ok(self.orchestrator.status())
    }

    /// Abandon the session. Calls already in flight finish on their own but
    /// their results are discarded.
    pub fn cancel(&mut self) {
        self.orchestrator.handle(Event::TornDown);
    }

    pub fn orchestrator(&self) -> &QuantOrchestrator {
        &self.orchestrator
    }

    /// Raw baseline as fetched, for history recording.
    pub fn baseline(&self) -> Option<&Value> {
        self.baseline.as_deref()
    }

    pub fn snapshot(&self) -> Option<&QuantitativeSnapshot> {
        self.orchestrator.snapshot()
    }

    pub fn status(&self) -> OrchestratorStatus {
        self.orchestrator.status()
    }

    fn dispatch(&mut self, commands: Vec<Command>) {
        for command in commands {
            match command {
                Command::StartCompute { run } => {
                    let Some(baseline) = self.baseline.clone() else {
                        log::error!("Compute {} requested before a baseline was loaded", run);
                        continue;
                    };
                    let compute = Arc::clone(&self.compute);
                    let tx = self.tx.clone();
                    let analysis_id = self.analysis_id.clone();
                    tokio::spawn(async move {
                        let event = match compute.compute(&analysis_id, &baseline).await {
                            Ok(response) => {
                                let mut snapshot = QuantitativeSnapshot::from_response(&response);
                                if snapshot.analysis_id.is_none() {
                                    snapshot.analysis_id = Some(analysis_id);
                                }
                                Event::ComputeSucceeded { run, snapshot }
                            }
                            Err(err) => Event::ComputeFailed { run, message: err.to_string() },
                        };
                        // A closed channel means the session is gone.
                        let _ = tx.send(event);
                    });
                }
                Command::Persist { run, snapshot } => {
                    if self.persist_queue.is_none() {
                        let worker = spawn_persist_worker(self.analysis_id.clone(), Arc::clone(&self.store), self.tx.clone());
                        self.persist_queue = Some(worker);
                    }
                    let queued = self
                        .persist_queue
                        .as_ref()
                        .is_some_and(|queue| queue.send((run, snapshot)).is_ok());
                    if !queued {
                        log::error!("Persist worker for {} is gone; dropping snapshot {}", self.analysis_id, run);
                    }
                }
            }
        }
    }
}

/// Single consumer of persist requests. Writes happen one at a time, in
/// request order, and each outcome is reported back as an event.
fn spawn_persist_worker(
    analysis_id: String,
    store: Arc<dyn SnapshotStore>,
    events: mpsc::UnboundedSender<Event>,
) -> mpsc::UnboundedSender<(RunId, QuantitativeSnapshot)> {
    let (queue, mut requests) = mpsc::unbounded_channel::<(RunId, QuantitativeSnapshot)>();
    tokio::spawn(async move {
        while let Some((run, snapshot)) = requests.recv().await {
            let event = match store.persist(&analysis_id, &snapshot).await {
                Ok(()) => Event::PersistSucceeded { run },
                Err(err) => Event::PersistFailed { run, message: err.to_string() },
            };
            if events.send(event).is_err() {
                break;
            }
        }
    });
    queue
}
