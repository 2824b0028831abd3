use anyhow::{anyhow, bail, Result};
use chrono::Utc;
use rusqlite::{params, Row};

use crate::db::{
    connection::Database,
    helpers::{parse_datetime, parse_optional_datetime, parse_status},
};
use crate::session::{
    FinishedSession, PausedSession, RunningSession, SessionStatus, WorkSession,
};

fn row_to_active_session(row: &Row) -> Result<WorkSession> {
    let id: String = row.get("id")?;
    let project_id: Option<i64> = row.get("project_id")?;
    let started_at: String = row.get("started_at")?;
    let ended_at: Option<String> = row.get("ended_at")?;
    let status: String = row.get("status")?;

    let started_at = parse_datetime(&started_at, "started_at")?;
    match parse_status(&status)? {
        SessionStatus::Running => Ok(WorkSession::Running(RunningSession {
            id,
            project_id,
            started_at,
        })),
        SessionStatus::Paused => {
            let paused_at = parse_optional_datetime(ended_at, "ended_at")?
                .ok_or_else(|| anyhow!("paused session {id} has no pause timestamp"))?;
            Ok(WorkSession::Paused(PausedSession {
                id,
                project_id,
                started_at,
                paused_at,
            }))
        }
        other => bail!("session {id} is not active (status {other})"),
    }
}

fn row_to_finished_session(row: &Row) -> Result<FinishedSession> {
    let id: String = row.get("id")?;
    let project_id: Option<i64> = row.get("project_id")?;
    let started_at: String = row.get("started_at")?;
    let ended_at: Option<String> = row.get("ended_at")?;
    let description: Option<String> = row.get("description")?;

    Ok(FinishedSession {
        project_id,
        started_at: parse_datetime(&started_at, "started_at")?,
        ended_at: parse_optional_datetime(ended_at, "ended_at")?
            .ok_or_else(|| anyhow!("finished session {id} has no end time"))?,
        description: description
            .ok_or_else(|| anyhow!("finished session {id} has no description"))?,
        tags: Vec::new(),
        id,
    })
}

impl Database {
    /// Record a freshly started session. At most one session may be active;
    /// the check runs inside the DB task so two callers cannot both pass it.
    pub async fn insert_session(&self, session: &RunningSession) -> Result<()> {
        let record = session.clone();
        self.execute(move |conn| {
            let active: i64 = conn.query_row(
                "SELECT COUNT(*) FROM sessions WHERE status IN ('running', 'paused')",
                [],
                |row| row.get(0),
            )?;
            if active > 0 {
                bail!("a session is already active");
            }

            conn.execute(
                "INSERT INTO sessions (id, project_id, started_at, ended_at, description, status, created_at, updated_at)
                 VALUES (?1, ?2, ?3, NULL, NULL, ?4, ?5, ?6)",
                params![
                    record.id,
                    record.project_id,
                    record.started_at.to_rfc3339(),
                    SessionStatus::Running.as_str(),
                    record.started_at.to_rfc3339(),
                    record.started_at.to_rfc3339(),
                ],
            )?;
            Ok(())
        })
        .await
    }

    /// The one session currently in `running` or `paused` state, if any.
    pub async fn get_active_session(&self) -> Result<Option<WorkSession>> {
        self.execute(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, project_id, started_at, ended_at, status
                 FROM sessions
                 WHERE status IN ('running', 'paused')
                 ORDER BY started_at DESC
                 LIMIT 1",
            )?;

            let mut rows = stmt.query([])?;
            let session = match rows.next()? {
                Some(row) => Some(row_to_active_session(row)?),
                None => None,
            };
            Ok(session)
        })
        .await
    }

    /// The pause timestamp lands in `ended_at`; it is cleared again on resume.
    pub async fn mark_session_paused(&self, session: &PausedSession) -> Result<()> {
        let record = session.clone();
        self.execute(move |conn| {
            let rows_affected = conn.execute(
                "UPDATE sessions
                 SET status = ?1,
                     ended_at = ?2,
                     updated_at = ?3
                 WHERE id = ?4",
                params![
                    SessionStatus::Paused.as_str(),
                    record.paused_at.to_rfc3339(),
                    Utc::now().to_rfc3339(),
                    record.id,
                ],
            )?;

            if rows_affected == 0 {
                bail!("session {} not found", record.id);
            }
            Ok(())
        })
        .await
    }

    /// Persists the shifted start the resume produced.
    pub async fn mark_session_resumed(&self, session: &RunningSession) -> Result<()> {
        let record = session.clone();
        self.execute(move |conn| {
            let rows_affected = conn.execute(
                "UPDATE sessions
                 SET status = ?1,
                     started_at = ?2,
                     ended_at = NULL,
                     updated_at = ?3
                 WHERE id = ?4",
                params![
                    SessionStatus::Running.as_str(),
                    record.started_at.to_rfc3339(),
                    Utc::now().to_rfc3339(),
                    record.id,
                ],
            )?;

            if rows_affected == 0 {
                bail!("session {} not found", record.id);
            }
            Ok(())
        })
        .await
    }

    /// Commits description, tags and end time in one transaction. Input is
    /// re-validated here so a malformed caller cannot write an empty finished
    /// session.
    pub async fn finalize_session(&self, session: &FinishedSession) -> Result<()> {
        let record = session.clone();
        self.execute(move |conn| {
            if record.description.trim().is_empty() {
                bail!("description must not be empty");
            }
            if record.tags.is_empty() {
                bail!("at least one tag is required");
            }

            let tx = conn.transaction()?;

            let rows_affected = tx.execute(
                "UPDATE sessions
                 SET status = ?1,
                     ended_at = ?2,
                     description = ?3,
                     updated_at = ?4
                 WHERE id = ?5",
                params![
                    SessionStatus::Finished.as_str(),
                    record.ended_at.to_rfc3339(),
                    record.description,
                    Utc::now().to_rfc3339(),
                    record.id,
                ],
            )?;
            if rows_affected == 0 {
                bail!("session {} not found", record.id);
            }

            tx.execute(
                "DELETE FROM session_tags WHERE session_id = ?1",
                params![record.id],
            )?;
            for tag in &record.tags {
                tx.execute(
                    "INSERT OR IGNORE INTO session_tags (session_id, tag) VALUES (?1, ?2)",
                    params![record.id, tag],
                )?;
            }

            tx.commit()?;
            Ok(())
        })
        .await
    }

    pub async fn cancel_session(&self, session_id: &str) -> Result<()> {
        let session_id = session_id.to_string();
        self.execute(move |conn| {
            let rows_affected = conn.execute(
                "UPDATE sessions
                 SET status = ?1,
                     updated_at = ?2
                 WHERE id = ?3",
                params![
                    SessionStatus::Cancelled.as_str(),
                    Utc::now().to_rfc3339(),
                    session_id,
                ],
            )?;

            if rows_affected == 0 {
                bail!("session {session_id} not found");
            }
            Ok(())
        })
        .await
    }

    /// Finished sessions with their tags, newest first.
    pub async fn get_finished_sessions(&self) -> Result<Vec<FinishedSession>> {
        self.execute(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, project_id, started_at, ended_at, description
                 FROM sessions
                 WHERE status = 'finished'
                 ORDER BY started_at DESC",
            )?;
            let mut tag_stmt = conn.prepare(
                "SELECT tag FROM session_tags WHERE session_id = ?1 ORDER BY rowid",
            )?;

            let mut rows = stmt.query([])?;
            let mut sessions = Vec::new();
            while let Some(row) = rows.next()? {
                let mut session = row_to_finished_session(row)?;

                let mut tag_rows = tag_stmt.query(params![session.id])?;
                while let Some(tag_row) = tag_rows.next()? {
                    session.tags.push(tag_row.get(0)?);
                }

                sessions.push(session);
            }

            Ok(sessions)
        })
        .await
    }

    /// Startup recovery: sessions left `running`/`paused` by a previous
    /// process are cancelled. Returns how many rows were affected.
    pub async fn cancel_abandoned_sessions(&self) -> Result<usize> {
        self.execute(|conn| {
            let rows_affected = conn.execute(
                "UPDATE sessions
                 SET status = ?1,
                     updated_at = ?2
                 WHERE status IN ('running', 'paused')",
                params![SessionStatus::Cancelled.as_str(), Utc::now().to_rfc3339()],
            )?;
            Ok(rows_affected)
        })
        .await
    }
}
