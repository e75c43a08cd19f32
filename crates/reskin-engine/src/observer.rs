//! Mutation batching
//!
//! Coalesces host mutations into at most one scheduled reconciliation per
//! frame. Records written by the engine never arm the batcher; host records
//! that arrive while a pass is running set a follow-up bit that schedules
//! exactly one more pass when the pass ends.

use parking_lot::Mutex;
use reskin_dom::{Document, MutationRecord, NodeId};
use std::sync::Arc;

/// Scheduling phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BatchPhase {
    /// Nothing pending
    #[default]
    Idle,
    /// A pass will run on the next frame
    Scheduled,
}

#[derive(Debug, Default)]
struct BatchState {
    phase: BatchPhase,
    depth: u32,
    follow_up: bool,
    passes: u64,
    host_records: u64,
    dropped_engine_records: u64,
}

/// Batching counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BatchStats {
    /// Scheduled passes handed out by [`MutationBatcher::take_scheduled`]
    pub passes: u64,
    /// Host records observed
    pub host_records: u64,
    /// Engine records ignored
    pub dropped_engine_records: u64,
}

/// Reentrancy-guarded frame scheduler
#[derive(Debug, Clone, Default)]
pub struct MutationBatcher {
    inner: Arc<Mutex<BatchState>>,
}

impl MutationBatcher {
    /// Create an idle batcher
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed records. Returns whether this call moved the batcher to `Scheduled`.
    pub fn observe(&self, records: &[MutationRecord]) -> bool {
        let mut state = self.inner.lock();
        let mut armed = false;
        for record in records {
            if record.is_engine() {
                state.dropped_engine_records += 1;
                continue;
            }
            state.host_records += 1;
            if state.depth > 0 {
                state.follow_up = true;
            } else if state.phase == BatchPhase::Idle {
                state.phase = BatchPhase::Scheduled;
                armed = true;
            }
        }
        armed
    }

    /// Feed only records whose target lies inside `scope`
    pub fn observe_in(&self, doc: &Document, scope: NodeId, records: &[MutationRecord]) -> bool {
        let in_scope: Vec<MutationRecord> = records
            .iter()
            .filter(|r| doc.contains(scope, r.target))
            .cloned()
            .collect();
        self.observe(&in_scope)
    }

    /// Ask for a pass without a mutation (store changes, startup)
    pub fn request(&self) {
        let mut state = self.inner.lock();
        if state.depth > 0 {
            state.follow_up = true;
        } else {
            state.phase = BatchPhase::Scheduled;
        }
    }

    /// Frame callback: `Scheduled -> Idle`. Returns whether a pass should run.
    pub fn take_scheduled(&self) -> bool {
        let mut state = self.inner.lock();
        if state.phase != BatchPhase::Scheduled || state.depth > 0 {
            return false;
        }
        state.phase = BatchPhase::Idle;
        state.passes += 1;
        true
    }

    /// Mark the DOM as being written by the engine until the guard drops
    #[must_use = "the reconciling flag clears when the guard drops"]
    pub fn enter(&self) -> ReconcileGuard {
        self.inner.lock().depth += 1;
        ReconcileGuard {
            batcher: self.clone(),
        }
    }

    /// Current phase
    #[must_use]
    pub fn phase(&self) -> BatchPhase {
        self.inner.lock().phase
    }

    /// Whether a guard is held
    #[must_use]
    pub fn is_reconciling(&self) -> bool {
        self.inner.lock().depth > 0
    }

    /// Counters
    #[must_use]
    pub fn stats(&self) -> BatchStats {
        let state = self.inner.lock();
        BatchStats {
            passes: state.passes,
            host_records: state.host_records,
            dropped_engine_records: state.dropped_engine_records,
        }
    }

    fn leave(&self) {
        let mut state = self.inner.lock();
        state.depth = state.depth.saturating_sub(1);
        if state.depth == 0 && std::mem::take(&mut state.follow_up) {
            tracing::debug!("host mutated during pass, scheduling follow-up");
            state.phase = BatchPhase::Scheduled;
        }
    }
}

/// Held for the duration of an engine write
#[derive(Debug)]
pub struct ReconcileGuard {
    batcher: MutationBatcher,
}

impl Drop for ReconcileGuard {
    fn drop(&mut self) {
        self.batcher.leave();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reskin_dom::{MutationKind, MutationOrigin};

    fn record(origin: MutationOrigin) -> MutationRecord {
        MutationRecord {
            target: NodeId::from_raw(1),
            kind: MutationKind::Text,
            origin,
        }
    }

    #[test]
    fn burst_schedules_once() {
        let batcher = MutationBatcher::new();
        let burst = vec![record(MutationOrigin::Host); 25];
        assert!(batcher.observe(&burst));
        assert!(!batcher.observe(&burst));
        assert!(batcher.take_scheduled());
        assert!(!batcher.take_scheduled());
        assert_eq!(batcher.stats().passes, 1);
    }

    #[test]
    fn engine_records_never_arm() {
        let batcher = MutationBatcher::new();
        assert!(!batcher.observe(&vec![record(MutationOrigin::Engine); 3]));
        assert_eq!(batcher.phase(), BatchPhase::Idle);
        assert_eq!(batcher.stats().dropped_engine_records, 3);
    }

    #[test]
    fn host_writes_during_pass_yield_one_follow_up() {
        let batcher = MutationBatcher::new();
        batcher.request();
        assert!(batcher.take_scheduled());
        {
            let _guard = batcher.enter();
            assert!(batcher.is_reconciling());
            for _ in 0..5 {
                batcher.observe(&[record(MutationOrigin::Host)]);
            }
            assert_eq!(batcher.phase(), BatchPhase::Idle);
            assert!(!batcher.take_scheduled());
        }
        assert_eq!(batcher.phase(), BatchPhase::Scheduled);
        assert!(batcher.take_scheduled());
        assert!(!batcher.take_scheduled());
    }

    #[test]
    fn quiet_pass_schedules_nothing() {
        let batcher = MutationBatcher::new();
        drop(batcher.enter());
        assert_eq!(batcher.phase(), BatchPhase::Idle);
    }

    #[test]
    fn nested_guards_release_at_outermost() {
        let batcher = MutationBatcher::new();
        let outer = batcher.enter();
        {
            let _inner = batcher.enter();
            batcher.observe(&[record(MutationOrigin::Host)]);
        }
        assert!(batcher.is_reconciling());
        assert_eq!(batcher.phase(), BatchPhase::Idle);
        drop(outer);
        assert_eq!(batcher.phase(), BatchPhase::Scheduled);
    }
}
