//! State machine deciding when quantitative metrics are (re)computed and
//! persisted for one analysis.
//!
//! The machine is pure: callers feed it [`Event`]s and execute the
//! [`Command`]s it returns. Every asynchronous result carries the [`RunId`]
//! of the command that produced it, so late or superseded results are
//! recognised and dropped without touching state.

use crate::snapshot::QuantitativeSnapshot;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    NoBaseline,
    NeedsCompute,
    Computing,
    Ready,
    Error,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::NoBaseline => "no-baseline",
            Phase::NeedsCompute => "needs-compute",
            Phase::Computing => "computing",
            Phase::Ready => "ready",
            Phase::Error => "error",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PersistState {
    Idle,
    Saving,
    Saved,
    Error(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RunId(pub u64);

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone)]
pub enum Event {
    /// The detection baseline is available, together with whatever snapshot
    /// the store already holds for this analysis.
    BaselineLoaded { persisted: Option<QuantitativeSnapshot> },
    RecomputeRequested,
    ComputeSucceeded { run: RunId, snapshot: QuantitativeSnapshot },
    ComputeFailed { run: RunId, message: String },
    PersistSucceeded { run: RunId },
    PersistFailed { run: RunId, message: String },
    /// The owner went away (another analysis was selected or the view closed).
    TornDown,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    StartCompute { run: RunId },
    Persist { run: RunId, snapshot: QuantitativeSnapshot },
}

/// Serializable view of the machine for reporting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrchestratorStatus {
    pub analysis_id: String,
    pub phase: Phase,
    pub stale: bool,
    pub persisted: bool,
    pub persist: PersistState,
    pub error: Option<String>,
    pub block_count: usize,
}

#[derive(Debug, Clone)]
pub struct QuantOrchestrator {
    analysis_id: String,
    auto_compute: bool,
    phase: Phase,
    snapshot: Option<QuantitativeSnapshot>,
    snapshot_run: Option<RunId>,
    stale: bool,
    persist: PersistState,
    error: Option<String>,
    in_flight: Option<RunId>,
    next_run: u64,
    auto_triggered: bool,
    stale_latch: bool,
    alive: bool,
}

impl QuantOrchestrator {
    pub fn new(analysis_id: impl Into<String>) -> Self {
        Self {
            analysis_id: analysis_id.into(),
            auto_compute: true,
            phase: Phase::NoBaseline,
            snapshot: None,
            snapshot_run: None,
            stale: false,
            persist: PersistState::Idle,
            error: None,
            in_flight: None,
            next_run: 1,
            auto_triggered: false,
            stale_latch: false,
            alive: true,
        }
    }

    /// Disable the automatic compute after a baseline load. Staleness
    /// re-triggers still apply once a compute has run.
    pub fn with_auto_compute(mut self, enabled: bool) -> Self {
        self.auto_compute = enabled;
        self
    }

    pub fn handle(&mut self, event: Event) -> Vec<Command> {
        if !self.alive {
            log::debug!("{}: dropping {:?} after teardown", self.analysis_id, EventKind::of(&event));
            return Vec::new();
        }

        match event {
            Event::BaselineLoaded { persisted } => self.on_baseline(persisted),
            Event::RecomputeRequested => self.trigger("manual"),
            Event::ComputeSucceeded { run, snapshot } => self.on_compute_succeeded(run, snapshot),
            Event::ComputeFailed { run, message } => {
                if self.accept_result(run) {
                    log::warn!("{}: compute {} failed: {}", self.analysis_id, run, message);
                    self.phase = Phase::Error;
                    self.error = Some(message);
                }
                Vec::new()
            }
            Event::PersistSucceeded { run } => {
                if self.snapshot_run == Some(run) {
                    if let Some(snapshot) = self.snapshot.as_mut() {
                        snapshot.persisted = true;
                    }
                    self.persist = PersistState::Saved;
                    log::info!("{}: snapshot from compute {} persisted", self.analysis_id, run);
                } else {
                    log::debug!("{}: ignoring persist result for superseded compute {}", self.analysis_id, run);
                }
                Vec::new()
            }
            Event::PersistFailed { run, message } => {
                if self.snapshot_run == Some(run) {
                    log::warn!("{}: persisting snapshot failed: {}", self.analysis_id, message);
                    self.persist = PersistState::Error(message);
                }
                Vec::new()
            }
            Event::TornDown => {
                if let Some(run) = self.in_flight.take() {
                    log::debug!("{}: torn down with compute {} in flight", self.analysis_id, run);
                }
                self.alive = false;
                Vec::new()
            }
        }
    }

    fn on_baseline(&mut self, persisted: Option<QuantitativeSnapshot>) -> Vec<Command> {
        if self.phase == Phase::Computing {
            log::warn!("{}: baseline reloaded while computing; keeping current run", self.analysis_id);
            return Vec::new();
        }
        self.auto_triggered = false;
        self.error = None;

        match persisted {
            Some(mut snapshot) if snapshot.is_fresh() => {
                log::info!(
                    "{}: using persisted snapshot with {} blocks",
                    self.analysis_id,
                    snapshot.blocks.len()
                );
                snapshot.persisted = true;
                self.snapshot = Some(snapshot);
                self.snapshot_run = None;
                self.phase = Phase::Ready;
                self.stale = false;
                self.stale_latch = false;
                self.persist = PersistState::Saved;
                Vec::new()
            }
            other => {
                if let Some(mut snapshot) = other {
                    log::info!("{}: persisted snapshot is incomplete, recompute needed", self.analysis_id);
                    snapshot.persisted = true;
                    self.snapshot = Some(snapshot);
                    self.snapshot_run = None;
                    self.stale = true;
                }
                self.phase = Phase::NeedsCompute;
                if self.auto_compute && !self.auto_triggered {
                    self.auto_triggered = true;
                    self.trigger("baseline")
                } else {
                    Vec::new()
                }
            }
        }
    }

    fn trigger(&mut self, reason: &str) -> Vec<Command> {
        match self.phase {
            Phase::NoBaseline => {
                log::debug!("{}: {} trigger ignored, no baseline yet", self.analysis_id, reason);
                Vec::new()
            }
            Phase::Computing => {
                log::debug!("{}: {} trigger ignored, compute already in flight", self.analysis_id, reason);
                Vec::new()
            }
            _ => {
                let run = RunId(self.next_run);
                self.next_run += 1;
                self.in_flight = Some(run);
                self.phase = Phase::Computing;
                self.error = None;
                log::info!("{}: starting compute {} ({})", self.analysis_id, run, reason);
                vec![Command::StartCompute { run }]
            }
        }
    }

    fn accept_result(&mut self, run: RunId) -> bool {
        if self.in_flight != Some(run) {
            log::debug!("{}: dropping result of superseded compute {}", self.analysis_id, run);
            return false;
        }
        self.in_flight = None;
        true
    }

    fn on_compute_succeeded(&mut self, run: RunId, mut snapshot: QuantitativeSnapshot) -> Vec<Command> {
        if !self.accept_result(run) {
            return Vec::new();
        }
        snapshot.persisted = false;
        let fresh = snapshot.is_fresh();
        self.snapshot = Some(snapshot);
        self.snapshot_run = Some(run);
        self.phase = Phase::Ready;
        self.persist = PersistState::Idle;

        let mut commands = self.persist_command(run);
        if fresh {
            self.stale = false;
            self.stale_latch = false;
            return commands;
        }

        self.stale = true;
        if self.stale_latch {
            log::warn!(
                "{}: compute {} is still incomplete; not retriggering again",
                self.analysis_id,
                run
            );
            return commands;
        }
        self.stale_latch = true;
        log::info!("{}: compute {} lacks DEM or grid data, recomputing once", self.analysis_id, run);
        commands.extend(self.trigger("stale"));
        commands
    }

    fn persist_command(&mut self, run: RunId) -> Vec<Command> {
        match &self.snapshot {
            Some(snapshot) if !snapshot.persisted => {
                self.persist = PersistState::Saving;
                vec![Command::Persist { run, snapshot: snapshot.clone() }]
            }
            _ => Vec::new(),
        }
    }

    pub fn analysis_id(&self) -> &str {
        &self.analysis_id
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_stale(&self) -> bool {
        self.stale
    }

    pub fn persist_state(&self) -> &PersistState {
        &self.persist
    }

    /// Latest snapshot; retained across failed or in-flight recomputes.
    pub fn snapshot(&self) -> Option<&QuantitativeSnapshot> {
        self.snapshot.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn in_flight(&self) -> Option<RunId> {
        self.in_flight
    }

    pub fn is_alive(&self) -> bool {
        self.alive
    }

    /// True once nothing further will happen without outside input.
    pub fn is_settled(&self) -> bool {
        !self.alive || (self.in_flight.is_none() && self.persist != PersistState::Saving)
    }

    pub fn status(&self) -> OrchestratorStatus {
        OrchestratorStatus {
            analysis_id: self.analysis_id.clone(),
            phase: self.phase,
            stale: self.stale,
            persisted: self.snapshot.as_ref().is_some_and(|s| s.persisted),
            persist: self.persist.clone(),
            error: self.error.clone(),
            block_count: self.snapshot.as_ref().map_or(0, |s| s.blocks.len()),
        }
    }
}

/// Event name without its payload, for logging.
#[derive(Debug)]
enum EventKind {
    BaselineLoaded,
    RecomputeRequested,
    ComputeSucceeded,
    ComputeFailed,
    PersistSucceeded,
    PersistFailed,
    TornDown,
}

impl EventKind {
    fn of(event: &Event) -> Self {
        match event {
            Event::BaselineLoaded { .. } => Self::BaselineLoaded,
            Event::RecomputeRequested => Self::RecomputeRequested,
            Event::ComputeSucceeded { .. } => Self::ComputeSucceeded,
            Event::ComputeFailed { .. } => Self::ComputeFailed,
            Event::PersistSucceeded { .. } => Self::PersistSucceeded,
            Event::PersistFailed { .. } => Self::PersistFailed,
            Event::TornDown => Self::TornDown,
        }
    }
}
