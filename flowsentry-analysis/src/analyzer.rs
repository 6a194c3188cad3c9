//! Traffic analyzer: the owner of the shared flow table.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use flowsentry_core::events::PacketRecord;

use crate::flow::{FeatureSnapshot, FlowKey, FlowState};

/// Consumes packet records, accumulates per-flow statistics, and emits a
/// feature snapshot for every observation.
///
/// The flow table is owned here; no other component reads or mutates flow
/// state directly. The mutex exists for the idle-flow eviction sweep, which
/// runs on a timer task off the packet path and shares the table through a
/// cloned handle.
#[derive(Clone, Default)]
pub struct TrafficAnalyzer {
    flows: Arc<Mutex<HashMap<FlowKey, FlowState>>>,
}

impl TrafficAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Processes one packet: looks up or creates the flow, folds the packet
    /// into it, and returns features computed from the just-updated state.
    ///
    /// Accepts any well-formed record; malformed input is filtered at the
    /// capture boundary before this point.
    pub fn observe(&self, record: &PacketRecord) -> FeatureSnapshot {
        let key = FlowKey::from_record(record);
        let mut flows = self.flows.lock();
        let state = flows
            .entry(key)
            .and_modify(|state| state.update(record))
            .or_insert_with(|| FlowState::new(record));
        FeatureSnapshot::from_state(state, record)
    }

    /// Removes flows whose last activity is older than `idle_timeout_ns`
    /// relative to `now_ns`. Returns the number of evicted flows.
    pub fn evict_idle(&self, now_ns: u64, idle_timeout_ns: u64) -> usize {
        let mut flows = self.flows.lock();
        let before = flows.len();
        flows.retain(|_, state| now_ns.saturating_sub(state.last_seen_ns) < idle_timeout_ns);
        let evicted = before - flows.len();
        if evicted > 0 {
            debug!(evicted, remaining = flows.len(), "idle flow sweep");
        }
        evicted
    }

    /// Number of flows currently tracked.
    pub fn flow_count(&self) -> usize {
        self.flows.lock().len()
    }
}
