use std::sync::Arc;

use anyhow::{anyhow, bail, Result};
use log::info;
use serde::Serialize;
use tokio::sync::{broadcast, Mutex};

use crate::clock::{Clock, SystemClock};
use crate::db::Database;

use super::{
    config::SessionPolicy,
    events::SessionEvent,
    state::{FinishedSession, RunningSession, WorkSession},
};

const EVENT_CHANNEL_CAPACITY: usize = 32;

/// Current session plus its elapsed time at the moment of the query, ready
/// for display.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub session: WorkSession,
    pub elapsed_ms: u64,
}

/// Owns the authoritative in-process session state. All transitions go
/// through the pure [`WorkSession`] machine, are persisted before returning,
/// and are announced to subscribers. The store remains the source of truth
/// across restarts; `restore` reconciles against it.
#[derive(Clone)]
pub struct SessionController {
    state: Arc<Mutex<Option<WorkSession>>>,
    db: Database,
    clock: Arc<dyn Clock>,
    policy: SessionPolicy,
    events: broadcast::Sender<SessionEvent>,
}

impl SessionController {
    pub fn new(db: Database) -> Self {
        Self::with_policy(db, SessionPolicy::default(), Arc::new(SystemClock))
    }

    pub fn with_policy(db: Database, policy: SessionPolicy, clock: Arc<dyn Clock>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            state: Arc::new(Mutex::new(None)),
            db,
            clock,
            policy,
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Adopt the active session recorded in the store, if any. Call once at
    /// startup, after deciding what to do with abandoned sessions
    /// ([`Database::cancel_abandoned_sessions`]).
    pub async fn restore(&self) -> Result<Option<SessionSnapshot>> {
        let restored = self.db.get_active_session().await?;
        let mut state = self.state.lock().await;
        *state = restored;
        if let Some(session) = state.as_ref() {
            info!("Restored {} session {}", session.status(), session.id());
        }
        Ok(state.as_ref().map(|session| self.snapshot_of(session)))
    }

    pub async fn start(&self, project_id: Option<i64>) -> Result<SessionSnapshot> {
        {
            let state = self.state.lock().await;
            if let Some(session) = state.as_ref() {
                bail!("a session is already active ({})", session.id());
            }
        }

        let running = RunningSession::start(project_id, self.clock.now());
        self.db.insert_session(&running).await?;

        let session = WorkSession::Running(running.clone());
        {
            let mut state = self.state.lock().await;
            *state = Some(session.clone());
        }

        info!("Started session {}", running.id);
        self.emit(SessionEvent::Started { session: running });
        Ok(self.snapshot_of(&session))
    }

    pub async fn pause(&self) -> Result<SessionSnapshot> {
        let now = self.clock.now();
        let paused = {
            let mut state = self.state.lock().await;
            let current = state
                .as_ref()
                .ok_or_else(|| anyhow!("no active session to pause"))?;
            let next = current.pause(now)?;
            *state = Some(next.clone());
            next
        };

        if let WorkSession::Paused(session) = &paused {
            self.db.mark_session_paused(session).await?;
            self.emit(SessionEvent::Paused {
                session: session.clone(),
            });
        }
        Ok(self.snapshot_of(&paused))
    }

    pub async fn resume(&self) -> Result<SessionSnapshot> {
        let now = self.clock.now();
        let resumed = {
            let mut state = self.state.lock().await;
            let current = state
                .as_ref()
                .ok_or_else(|| anyhow!("no active session to resume"))?;
            let next = current.resume(now)?;
            *state = Some(next.clone());
            next
        };

        if let WorkSession::Running(session) = &resumed {
            self.db.mark_session_resumed(session).await?;
            self.emit(SessionEvent::Resumed {
                session: session.clone(),
            });
        }
        Ok(self.snapshot_of(&resumed))
    }

    pub async fn finalize(&self, description: &str, tags: &[String]) -> Result<FinishedSession> {
        let now = self.clock.now();
        let finished = {
            let mut state = self.state.lock().await;
            let current = state
                .as_ref()
                .ok_or_else(|| anyhow!("no active session to finalize"))?;

            let candidate = match current {
                WorkSession::Running(running) if self.policy.finalize_from_running => {
                    WorkSession::Paused(running.clone().pause(now))
                }
                other => other.clone(),
            };

            let finished = candidate.finalize(description, tags)?;
            *state = None;
            finished
        };

        self.db.finalize_session(&finished).await?;
        info!("Finished session {}", finished.id);
        self.emit(SessionEvent::Finished {
            session: finished.clone(),
        });
        Ok(finished)
    }

    pub async fn cancel(&self) -> Result<()> {
        let cancelled = {
            let mut state = self.state.lock().await;
            let current = state
                .as_ref()
                .ok_or_else(|| anyhow!("no active session to cancel"))?;
            let cancelled = current.cancel()?;
            *state = None;
            cancelled
        };

        self.db.cancel_session(&cancelled.id).await?;
        info!("Cancelled session {}", cancelled.id);
        self.emit(SessionEvent::Cancelled {
            session_id: cancelled.id,
        });
        Ok(())
    }

    /// Pure query; invoking it at any cadence yields consistent results, so
    /// display refresh timers belong to the caller.
    pub async fn snapshot(&self) -> Option<SessionSnapshot> {
        let state = self.state.lock().await;
        state.as_ref().map(|session| self.snapshot_of(session))
    }

    fn snapshot_of(&self, session: &WorkSession) -> SessionSnapshot {
        let elapsed = session.elapsed(self.clock.now());
        SessionSnapshot {
            session: session.clone(),
            elapsed_ms: elapsed.num_milliseconds().max(0) as u64,
        }
    }

    fn emit(&self, event: SessionEvent) {
        // Nobody listening is fine; views subscribe when they mount.
        let _ = self.events.send(event);
    }
}
