use serde::{Deserialize, Serialize};

use crate::db::ConnectionTracker;

/// `/health` が返す JSON。DB には触れず、プロセス内のカウンタだけを報告する。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: String,
    pub open_connections: usize,
    pub probes: u64,
}

impl HealthReport {
    pub fn from_tracker(tracker: &ConnectionTracker) -> Self {
        HealthReport {
            status: "ok".to_string(),
            open_connections: tracker.open_connections(),
            probes: tracker.probes_started(),
        }
    }
}
