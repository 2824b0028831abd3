use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::SessionError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum SessionStatus {
    Running,
    Paused,
    Finished,
    Cancelled,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Running => "running",
            SessionStatus::Paused => "paused",
            SessionStatus::Finished => "finished",
            SessionStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionStatus::Finished | SessionStatus::Cancelled)
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A session that is currently accruing time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RunningSession {
    pub id: String,
    pub project_id: Option<i64>,
    pub started_at: DateTime<Utc>,
}

/// A session whose clock is stopped. `paused_at` doubles as the effective end
/// time if the session is finalized without resuming.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PausedSession {
    pub id: String,
    pub project_id: Option<i64>,
    pub started_at: DateTime<Utc>,
    pub paused_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FinishedSession {
    pub id: String,
    pub project_id: Option<i64>,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub description: String,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CancelledSession {
    pub id: String,
}

impl RunningSession {
    pub fn start(project_id: Option<i64>, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            project_id,
            started_at: now,
        }
    }

    pub fn pause(self, now: DateTime<Utc>) -> PausedSession {
        PausedSession {
            id: self.id,
            project_id: self.project_id,
            started_at: self.started_at,
            paused_at: now,
        }
    }

    pub fn cancel(self) -> CancelledSession {
        CancelledSession { id: self.id }
    }
}

impl PausedSession {
    /// Shifts the start forward by the pause length so elapsed time keeps
    /// reading from a single anchor, with no separate accumulator.
    pub fn resume(self, now: DateTime<Utc>) -> RunningSession {
        let paused_for = (now - self.paused_at).max(Duration::zero());
        RunningSession {
            id: self.id,
            project_id: self.project_id,
            started_at: self.started_at + paused_for,
        }
    }

    pub fn finalize(
        self,
        description: String,
        tags: Vec<String>,
    ) -> Result<FinishedSession, SessionError> {
        if description.trim().is_empty() {
            return Err(SessionError::InvalidInput {
                reason: "description must not be empty",
            });
        }
        if tags.is_empty() {
            return Err(SessionError::InvalidInput {
                reason: "at least one tag is required",
            });
        }

        Ok(FinishedSession {
            id: self.id,
            project_id: self.project_id,
            started_at: self.started_at,
            ended_at: self.paused_at,
            description,
            tags,
        })
    }

    pub fn cancel(self) -> CancelledSession {
        CancelledSession { id: self.id }
    }
}

/// One work session in whichever lifecycle state it currently occupies. Each
/// variant carries exactly the fields that are legal in that state, so a
/// running session with a pause timestamp is unrepresentable.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum WorkSession {
    Running(RunningSession),
    Paused(PausedSession),
    Finished(FinishedSession),
    Cancelled(CancelledSession),
}

impl WorkSession {
    pub fn start(project_id: Option<i64>, now: DateTime<Utc>) -> Self {
        WorkSession::Running(RunningSession::start(project_id, now))
    }

    pub fn id(&self) -> &str {
        match self {
            WorkSession::Running(s) => &s.id,
            WorkSession::Paused(s) => &s.id,
            WorkSession::Finished(s) => &s.id,
            WorkSession::Cancelled(s) => &s.id,
        }
    }

    pub fn status(&self) -> SessionStatus {
        match self {
            WorkSession::Running(_) => SessionStatus::Running,
            WorkSession::Paused(_) => SessionStatus::Paused,
            WorkSession::Finished(_) => SessionStatus::Finished,
            WorkSession::Cancelled(_) => SessionStatus::Cancelled,
        }
    }

    pub fn pause(&self, now: DateTime<Utc>) -> Result<WorkSession, SessionError> {
        match self {
            WorkSession::Running(running) => Ok(WorkSession::Paused(running.clone().pause(now))),
            other => Err(SessionError::invalid_transition("pause", other.status())),
        }
    }

    pub fn resume(&self, now: DateTime<Utc>) -> Result<WorkSession, SessionError> {
        match self {
            WorkSession::Paused(paused) => Ok(WorkSession::Running(paused.clone().resume(now))),
            other => Err(SessionError::invalid_transition("resume", other.status())),
        }
    }

    pub fn finalize(
        &self,
        description: &str,
        tags: &[String],
    ) -> Result<FinishedSession, SessionError> {
        match self {
            WorkSession::Paused(paused) => paused
                .clone()
                .finalize(description.to_string(), tags.to_vec()),
            other => Err(SessionError::invalid_transition("finalize", other.status())),
        }
    }

    pub fn cancel(&self) -> Result<CancelledSession, SessionError> {
        match self {
            WorkSession::Running(running) => Ok(running.clone().cancel()),
            WorkSession::Paused(paused) => Ok(paused.clone().cancel()),
            other => Err(SessionError::invalid_transition("cancel", other.status())),
        }
    }

    /// Wall-clock time this session has spent running. Paused intervals are
    /// excluded by construction (`resume` shifts `started_at`). Never
    /// negative: a skewed clock reading earlier than `started_at` clamps to
    /// zero instead.
    pub fn elapsed(&self, now: DateTime<Utc>) -> Duration {
        let raw = match self {
            WorkSession::Running(s) => now - s.started_at,
            WorkSession::Paused(s) => s.paused_at - s.started_at,
            WorkSession::Finished(s) => s.ended_at - s.started_at,
            WorkSession::Cancelled(_) => Duration::zero(),
        };
        raw.max(Duration::zero())
    }
}
