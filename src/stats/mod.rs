//! Aggregate statistics over finished sessions. Pure functions, no I/O;
//! callers load sessions through [`crate::Database::get_finished_sessions`].

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};

use crate::session::FinishedSession;

fn session_duration(session: &FinishedSession) -> Duration {
    (session.ended_at - session.started_at).max(Duration::zero())
}

/// Sessions started within the last `days` days, counted back from `now`.
pub fn sessions_in_last_days(
    sessions: &[FinishedSession],
    days: i64,
    now: DateTime<Utc>,
) -> Vec<FinishedSession> {
    let limit = now - Duration::days(days);
    sessions
        .iter()
        .filter(|s| s.started_at >= limit)
        .cloned()
        .collect()
}

pub fn total_duration(sessions: &[FinishedSession]) -> Duration {
    sessions
        .iter()
        .fold(Duration::zero(), |acc, s| acc + session_duration(s))
}

/// Per-tag totals. A session counts fully toward each of its tags.
pub fn duration_by_tag(sessions: &[FinishedSession]) -> HashMap<String, Duration> {
    let mut result: HashMap<String, Duration> = HashMap::new();

    for session in sessions {
        let duration = session_duration(session);
        for tag in &session.tags {
            let entry = result.entry(tag.clone()).or_insert_with(Duration::zero);
            *entry = *entry + duration;
        }
    }

    result
}

/// Per-project totals; sessions without a project are grouped under `None`.
pub fn duration_by_project(sessions: &[FinishedSession]) -> HashMap<Option<i64>, Duration> {
    let mut result: HashMap<Option<i64>, Duration> = HashMap::new();

    for session in sessions {
        let entry = result
            .entry(session.project_id)
            .or_insert_with(Duration::zero);
        *entry = *entry + session_duration(session);
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    fn finished(
        id: &str,
        project_id: Option<i64>,
        started: i64,
        ended: i64,
        tags: &[&str],
    ) -> FinishedSession {
        FinishedSession {
            id: id.to_string(),
            project_id,
            started_at: ts(started),
            ended_at: ts(ended),
            description: format!("session {id}"),
            tags: tags.iter().map(|t| t.to_string()).collect(),
        }
    }

    #[test]
    fn test_window_keeps_recent_sessions() {
        const DAY: i64 = 24 * 60 * 60;
        let now = ts(30 * DAY);
        let sessions = vec![
            finished("old", None, 2 * DAY, 2 * DAY + 600, &["writing"]),
            finished("edge", None, 23 * DAY, 23 * DAY + 600, &["writing"]),
            finished("recent", None, 29 * DAY, 29 * DAY + 600, &["writing"]),
        ];

        let week = sessions_in_last_days(&sessions, 7, now);
        assert_eq!(
            week.iter().map(|s| s.id.as_str()).collect::<Vec<_>>(),
            vec!["edge", "recent"]
        );
        assert!(sessions_in_last_days(&sessions, 1, now).is_empty());
    }

    #[test]
    fn test_total_duration_sums_all_sessions() {
        let sessions = vec![
            finished("a", None, 0, 600, &["writing"]),
            finished("b", None, 1_000, 1_300, &["review"]),
        ];
        assert_eq!(total_duration(&sessions), Duration::seconds(900));
        assert_eq!(total_duration(&[]), Duration::zero());
    }

    #[test]
    fn test_duration_by_tag_counts_sessions_toward_each_tag() {
        let sessions = vec![
            finished("a", None, 0, 600, &["writing", "deep-work"]),
            finished("b", None, 1_000, 1_300, &["writing"]),
        ];

        let by_tag = duration_by_tag(&sessions);
        assert_eq!(by_tag["writing"], Duration::seconds(900));
        assert_eq!(by_tag["deep-work"], Duration::seconds(600));
        assert_eq!(by_tag.len(), 2);
    }

    #[test]
    fn test_duration_by_project_groups_unscoped_under_none() {
        let sessions = vec![
            finished("a", Some(1), 0, 600, &["writing"]),
            finished("b", Some(1), 1_000, 1_200, &["review"]),
            finished("c", None, 2_000, 2_050, &["email"]),
        ];

        let by_project = duration_by_project(&sessions);
        assert_eq!(by_project[&Some(1)], Duration::seconds(800));
        assert_eq!(by_project[&None], Duration::seconds(50));
    }

    #[test]
    fn test_inverted_interval_counts_as_zero() {
        let sessions = vec![finished("skewed", None, 1_000, 500, &["writing"])];
        assert_eq!(total_duration(&sessions), Duration::zero());
        assert_eq!(duration_by_tag(&sessions)["writing"], Duration::zero());
    }
}
