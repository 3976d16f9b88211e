//! NDJSON streaming events for traj-cluster agent integration.
//!
//! Emits progress events to stderr so stdout stays free for results.
//!
//! Event types:
//!   - cluster_started: run configuration
//!   - phase_started: sieve, distance matrix, clustering, sieve restore, finalize
//!   - phase_complete: phase finished with timing
//!   - cluster_complete: final result envelope
//!   - error: run aborted

use std::time::Duration;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClusterPhase {
    Sieve,
    DistanceMatrix,
    Clustering,
    SieveRestore,
    Finalize,
}

impl ClusterPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sieve => "sieve",
            Self::DistanceMatrix => "distance_matrix",
            Self::Clustering => "clustering",
            Self::SieveRestore => "sieve_restore",
            Self::Finalize => "finalize",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum StreamEvent {
    ClusterStarted {
        method: String,
        total_frames: usize,
        sieve: usize,
        min_points: usize,
        epsilon: f64,
    },
    PhaseStarted {
        phase: ClusterPhase,
        work_items: Option<usize>,
    },
    PhaseComplete {
        phase: ClusterPhase,
        elapsed_ms: u64,
    },
    ClusterComplete {
        total_frames: usize,
        n_clusters: usize,
        noise_frames: usize,
        largest_cluster: Option<usize>,
        elapsed_ms: u64,
    },
    Error {
        code: String,
        message: String,
    },
}

impl StreamEvent {
    pub fn to_json(&self) -> String {
        serde_json::to_string(self)
            .unwrap_or_else(|_| r#"{"event":"error","code":"serialize","message":""}"#.to_string())
    }
}

/// Streaming emitter for NDJSON events.
#[derive(Debug, Clone, Copy)]
pub struct StreamEmitter {
    enabled: bool,
}

impl StreamEmitter {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    pub fn disabled() -> Self {
        Self { enabled: false }
    }

    pub fn enabled() -> Self {
        Self { enabled: true }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn emit(&self, event: &StreamEvent) {
        if self.enabled {
            eprintln!("{}", event.to_json());
        }
    }

    pub fn emit_phase_started(&self, phase: ClusterPhase, work_items: Option<usize>) {
        self.emit(&StreamEvent::PhaseStarted { phase, work_items });
    }

    pub fn emit_phase_complete(&self, phase: ClusterPhase, elapsed: Duration) {
        self.emit(&StreamEvent::PhaseComplete {
            phase,
            elapsed_ms: duration_ms(elapsed),
        });
    }

    pub fn emit_error(&self, code: &str, message: &str) {
        self.emit(&StreamEvent::Error {
            code: code.to_string(),
            message: message.to_string(),
        });
    }
}

pub(crate) fn duration_ms(d: Duration) -> u64 {
    d.as_millis().try_into().unwrap_or(u64::MAX)
}
