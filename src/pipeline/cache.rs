//! Time-indexed cache of one pipeline output.
//!
//! The cache holds the most recent completed state together with its
//! validity interval, plus at most one evaluation in flight. Every
//! invalidation bumps a generation counter; a result that arrives for an
//! older generation is dropped instead of overwriting newer contents.

use super::flow_state::PipelineFlowState;
use super::future::SharedFuture;
use crate::animation::TimePoint;

struct InFlight {
    time: TimePoint,
    future: SharedFuture<PipelineFlowState>,
    generation: u64,
}

#[derive(Default)]
pub struct PipelineCache {
    state: PipelineFlowState,
    stale: PipelineFlowState,
    in_flight: Option<InFlight>,
    generation: u64,
}

impl PipelineCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// True if a completed state valid at `time` is cached.
    pub fn contains(&self, time: TimePoint) -> bool {
        let validity = self.state.state_validity();
        !validity.is_empty() && validity.contains(time)
    }

    /// The cached state valid at `time`.
    pub fn state_at(&self, time: TimePoint) -> Option<&PipelineFlowState> {
        self.contains(time).then_some(&self.state)
    }

    /// A resolved future of the cached state valid at `time`.
    pub fn get_at(&self, time: TimePoint) -> Option<SharedFuture<PipelineFlowState>> {
        self.state_at(time).cloned().map(SharedFuture::ready)
    }

    /// The evaluation already running for `time`, if it belongs to the
    /// current generation.
    pub fn in_flight(&self, time: TimePoint) -> Option<SharedFuture<PipelineFlowState>> {
        self.in_flight
            .as_ref()
            .filter(|f| f.time == time && f.generation == self.generation && !f.future.is_canceled())
            .map(|f| f.future.clone())
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Registers a running evaluation for `time` and returns the generation
    /// its result must be inserted with.
    pub fn insert_future(&mut self, time: TimePoint, future: SharedFuture<PipelineFlowState>) -> u64 {
        self.in_flight = Some(InFlight {
            time,
            future,
            generation: self.generation,
        });
        self.generation
    }

    /// Stores `state` computed for `generation`. Returns true if the cached
    /// contents changed. Results of a superseded generation are discarded.
    pub fn insert(&mut self, state: PipelineFlowState, generation: u64) -> bool {
        if generation != self.generation {
            tracing::debug!(
                "Discarding result of generation {} (cache is at {})",
                generation,
                self.generation
            );
            return false;
        }
        let validity = state.state_validity();
        if let Some(f) = &self.in_flight {
            if validity.contains(f.time) {
                self.in_flight = None;
            }
        }
        let changed = self.state.object_keys() != state.object_keys()
            || self.state.state_validity() != validity
            || self.state.status() != state.status();
        self.state = state;
        changed
    }

    /// Drops the cached state. With `keep_stale`, the state is retained as
    /// stale contents that the next evaluation may reuse.
    pub fn invalidate(&mut self, keep_stale: bool) {
        self.generation += 1;
        self.in_flight = None;
        let previous = std::mem::take(&mut self.state);
        if keep_stale {
            if !previous.is_empty() {
                self.stale = previous;
            }
        } else {
            self.stale.reset();
        }
    }

    /// State kept across the last soft invalidation.
    pub fn stale_contents(&self) -> &PipelineFlowState {
        &self.stale
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::TimeInterval;
    use crate::data::{into_ref, DataCollection, SimulationCellObject};
    use crate::pipeline::{Promise, PipelineStatus};

    fn state(validity: TimeInterval) -> PipelineFlowState {
        let coll =
            DataCollection::from_objects([into_ref(SimulationCellObject::orthogonal(1.0, 1.0, 1.0))])
                .unwrap();
        PipelineFlowState::with_shared_data(coll, PipelineStatus::success(), validity)
    }

    #[test]
    fn test_contains_respects_validity() {
        let mut cache = PipelineCache::new();
        assert!(!cache.contains(0));
        let gen = cache.generation();
        assert!(cache.insert(state(TimeInterval::new(0, 10)), gen));
        assert!(cache.contains(5));
        assert!(!cache.contains(11));
        assert!(cache.get_at(10).is_some());
        assert!(cache.get_at(-1).is_none());
    }

    #[test]
    fn test_superseded_generation_is_discarded() {
        let mut cache = PipelineCache::new();
        let (_promise, fut) = Promise::new();
        let gen = cache.insert_future(0, fut);
        assert!(cache.in_flight(0).is_some());
        assert!(cache.in_flight(1).is_none());

        cache.invalidate(false);
        assert!(cache.in_flight(0).is_none());
        assert!(!cache.insert(state(TimeInterval::infinite()), gen));
        assert!(!cache.contains(0));
    }

    #[test]
    fn test_reinsert_same_contents_is_unchanged() {
        let mut cache = PipelineCache::new();
        let s = state(TimeInterval::infinite());
        assert!(cache.insert(s.clone(), 0));
        assert!(!cache.insert(s, 0));
    }

    #[test]
    fn test_soft_invalidation_keeps_stale() {
        let mut cache = PipelineCache::new();
        cache.insert(state(TimeInterval::infinite()), 0);
        cache.invalidate(true);
        assert!(!cache.contains(0));
        assert!(!cache.stale_contents().is_empty());
        cache.invalidate(false);
        assert!(cache.stale_contents().is_empty());
    }
}
