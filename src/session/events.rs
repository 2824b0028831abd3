use serde::Serialize;

use super::state::{FinishedSession, PausedSession, RunningSession};

/// Broadcast to subscribers after every committed transition so views can
/// refresh without polling.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SessionEvent {
    Started { session: RunningSession },
    Paused { session: PausedSession },
    Resumed { session: RunningSession },
    Finished { session: FinishedSession },
    Cancelled { session_id: String },
}
