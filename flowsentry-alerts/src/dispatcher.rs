//! Alert dispatcher: severity classification, repeat suppression, and
//! best-effort forwarding to the sink.

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use parking_lot::Mutex;
use tracing::{error, info, warn};

use flowsentry_detection::{Threat, ThreatKind};

use crate::alert::{Alert, Severity};
use crate::sink::AlertSink;

/// Throttle map entries beyond this are pruned opportunistically so a scan
/// across many endpoints cannot grow the map without bound.
const THROTTLE_MAP_LIMIT: usize = 4096;

#[derive(Clone, PartialEq, Eq, Hash)]
struct ThrottleKey {
    kind: ThreatKind,
    id: String,
    src: (IpAddr, u16),
    dst: (IpAddr, u16),
}

impl ThrottleKey {
    fn from_threat(threat: &Threat) -> Self {
        Self {
            kind: threat.kind,
            id: threat.id.clone(),
            src: (threat.src_ip, threat.src_port),
            dst: (threat.dst_ip, threat.dst_port),
        }
    }
}

/// Converts threats into alerts and forwards them to the injected sink.
///
/// A hot flow matching a signature produces one threat per packet; repeats
/// of the same (kind, id, endpoints) within the throttle window are
/// suppressed after the first. Sink failures are logged and never crash or
/// block the consumer.
pub struct AlertDispatcher {
    sink: Arc<dyn AlertSink>,
    throttle_window: Duration,
    recent: Mutex<HashMap<ThrottleKey, Instant>>,
    suppressed: Mutex<u64>,
}

impl AlertDispatcher {
    /// A zero `throttle_window` disables suppression.
    pub fn new(sink: Arc<dyn AlertSink>, throttle_window: Duration) -> Self {
        Self {
            sink,
            throttle_window,
            recent: Mutex::new(HashMap::new()),
            suppressed: Mutex::new(0),
        }
    }

    /// Classifies, throttles, timestamps, logs, and forwards one threat.
    /// Returns `None` when the threat was suppressed by the throttle window.
    pub fn dispatch(&self, threat: &Threat) -> Option<Alert> {
        if self.is_throttled(threat) {
            *self.suppressed.lock() += 1;
            return None;
        }

        let alert = Alert::from_threat(threat, Utc::now());
        match serde_json::to_string(&alert) {
            Ok(line) => match alert.severity {
                Severity::Critical => error!(target: "flowsentry::alerts", "{line}"),
                Severity::Warning => warn!(target: "flowsentry::alerts", "{line}"),
                Severity::Info => info!(target: "flowsentry::alerts", "{line}"),
            },
            Err(e) => warn!("alert log serialization failed: {e}"),
        }

        if let Err(e) = self.sink.write_alert(&alert) {
            // Best-effort delivery: surface to the operator, keep consuming.
            error!("alert sink write failed: {e}");
        }

        Some(alert)
    }

    /// Number of threats suppressed by the throttle window so far.
    pub fn suppressed_count(&self) -> u64 {
        *self.suppressed.lock()
    }

    /// Flushes the sink; called on shutdown after the queue is drained.
    pub fn flush(&self) {
        if let Err(e) = self.sink.flush() {
            error!("alert sink flush failed: {e}");
        }
    }

    fn is_throttled(&self, threat: &Threat) -> bool {
        if self.throttle_window.is_zero() {
            return false;
        }

        let key = ThrottleKey::from_threat(threat);
        let now = Instant::now();
        let mut recent = self.recent.lock();

        if let Some(last) = recent.get(&key) {
            if now.duration_since(*last) < self.throttle_window {
                return true;
            }
        }

        if recent.len() >= THROTTLE_MAP_LIMIT {
            let window = self.throttle_window;
            recent.retain(|_, last| now.duration_since(*last) < window);
        }

        recent.insert(key, now);
        false
    }
}
