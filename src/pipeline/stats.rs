//! Pipeline counters shared between the coordinator and the worker

use std::sync::atomic::{AtomicU64, Ordering};

use crossbeam::utils::CachePadded;

#[derive(Default)]
struct Counters {
    frames_displayed: AtomicU64,
    render_failures: AtomicU64,
    frames_persisted: AtomicU64,
    persist_failures: AtomicU64,
}

/// Counters are mirrored to the `metrics` facade as they are bumped
#[derive(Default)]
pub struct PipelineStats {
    counters: CachePadded<Counters>,
}

/// Point-in-time copy of [`PipelineStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub frames_displayed: u64,
    pub render_failures: u64,
    pub frames_persisted: u64,
    pub persist_failures: u64,
}

impl PipelineStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_displayed(&self) {
        self.counters.frames_displayed.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("frames_displayed").increment(1);
    }

    pub fn record_render_failure(&self) {
        self.counters.render_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_persisted(&self) {
        self.counters.frames_persisted.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("frames_persisted").increment(1);
    }

    pub fn record_persist_failure(&self) {
        self.counters.persist_failures.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("persist_failures").increment(1);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            frames_displayed: self.counters.frames_displayed.load(Ordering::Relaxed),
            render_failures: self.counters.render_failures.load(Ordering::Relaxed),
            frames_persisted: self.counters.frames_persisted.load(Ordering::Relaxed),
            persist_failures: self.counters.persist_failures.load(Ordering::Relaxed),
        }
    }
}
