//! SQLite-backed persistence for class-session records.
//! The in-memory registry stays authoritative at runtime; this store makes
//! records survive restarts. Nested data (subscribers, record links,
//! external refs) is kept as JSON TEXT columns.

use std::path::Path;

use chrono::{DateTime, Utc};
use studyhall_core::error::{Result, StudyHallError};
use studyhall_core::types::{AudienceTrack, Cohort, ExternalRefs, Place, SessionStatus};

use crate::session::ClassSession;

/// SQLite persistence store for the class registry.
pub struct RegistryDb {
    conn: rusqlite::Connection,
}

impl RegistryDb {
    /// Open or create the registry database.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let conn = rusqlite::Connection::open(path)
            .map_err(|e| StudyHallError::storage(format!("db open: {e}")))?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    /// Run migrations to create tables.
    fn migrate(&self) -> Result<()> {
        self.conn
            .execute_batch(
                "
            CREATE TABLE IF NOT EXISTS class_sessions (
                id TEXT PRIMARY KEY,
                guild TEXT NOT NULL,
                subject_code TEXT NOT NULL,
                subject_name TEXT NOT NULL,
                topic TEXT NOT NULL,
                cohort TEXT NOT NULL,
                audience TEXT,
                professor TEXT NOT NULL,
                start TEXT NOT NULL,
                duration_secs INTEGER NOT NULL,
                place TEXT NOT NULL,
                place_info TEXT,
                is_recorded INTEGER NOT NULL DEFAULT 0,
                record_links TEXT NOT NULL DEFAULT '[]',   -- JSON array
                status TEXT NOT NULL DEFAULT 'planned',
                subscribers TEXT NOT NULL DEFAULT '[]',    -- JSON array
                reminder_sent INTEGER NOT NULL DEFAULT 0,
                external_refs TEXT NOT NULL DEFAULT '{}',  -- JSON object
                created_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_class_sessions_status
                ON class_sessions(status);
            CREATE INDEX IF NOT EXISTS idx_class_sessions_start
                ON class_sessions(start);
         ",
            )
            .map_err(|e| StudyHallError::storage(format!("migration: {e}")))?;
        Ok(())
    }

    /// Save (insert or replace) one session record.
    pub fn save_session(&self, session: &ClassSession) -> Result<()> {
        self.conn
            .execute(
                "INSERT OR REPLACE INTO class_sessions
                 (id, guild, subject_code, subject_name, topic, cohort, audience, professor,
                  start, duration_secs, place, place_info, is_recorded, record_links, status,
                  subscribers, reminder_sent, external_refs, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19)",
                rusqlite::params![
                    session.id,
                    session.guild,
                    session.subject_code,
                    session.subject_name,
                    session.topic,
                    session.cohort.as_str(),
                    session.audience.map(|a| a.as_str()),
                    session.professor,
                    session.start.to_rfc3339(),
                    session.duration_secs,
                    session.place.as_str(),
                    session.place_info,
                    session.is_recorded as i32,
                    serde_json::to_string(&session.record_links)?,
                    session.status.as_str(),
                    serde_json::to_string(&session.subscribers)?,
                    session.reminder_sent as i32,
                    serde_json::to_string(&session.external_refs)?,
                    session.created_at.to_rfc3339(),
                ],
            )
            .map_err(|e| StudyHallError::storage(format!("save session: {e}")))?;
        Ok(())
    }

    /// Load all session records. Unparseable rows are skipped.
    pub fn load_sessions(&self) -> Vec<ClassSession> {
        let mut stmt = match self.conn.prepare(
            "SELECT id, guild, subject_code, subject_name, topic, cohort, audience, professor,
                    start, duration_secs, place, place_info, is_recorded, record_links, status,
                    subscribers, reminder_sent, external_refs, created_at
             FROM class_sessions ORDER BY start",
        ) {
            Ok(s) => s,
            Err(_) => return Vec::new(),
        };

        let rows = stmt
            .query_map([], |row| {
                let cohort_str: String = row.get(5)?;
                let audience_str: Option<String> = row.get(6)?;
                let start_str: String = row.get(8)?;
                let place_str: String = row.get(10)?;
                let record_links_str: String = row.get(13)?;
                let status_str: String = row.get(14)?;
                let subscribers_str: String = row.get(15)?;
                let external_refs_str: String = row.get(17)?;
                let created_at_str: String = row.get(18)?;

                Ok(ClassSession {
                    id: row.get(0)?,
                    guild: row.get(1)?,
                    subject_code: row.get(2)?,
                    subject_name: row.get(3)?,
                    topic: row.get(4)?,
                    cohort: Cohort::from_str(&cohort_str).unwrap_or(Cohort::L1),
                    audience: audience_str.as_deref().and_then(AudienceTrack::from_str),
                    professor: row.get(7)?,
                    start: parse_ts(&start_str),
                    duration_secs: row.get(9)?,
                    place: Place::from_str(&place_str).unwrap_or(Place::Other),
                    place_info: row.get(11)?,
                    is_recorded: row.get::<_, i32>(12)? != 0,
                    record_links: serde_json::from_str(&record_links_str).unwrap_or_default(),
                    status: SessionStatus::from_str(&status_str)
                        .unwrap_or(SessionStatus::Planned),
                    subscribers: serde_json::from_str(&subscribers_str).unwrap_or_default(),
                    reminder_sent: row.get::<_, i32>(16)? != 0,
                    external_refs: serde_json::from_str::<ExternalRefs>(&external_refs_str)
                        .unwrap_or_default(),
                    created_at: parse_ts(&created_at_str),
                })
            })
            .ok();

        rows.map(|r| r.filter_map(|s| s.ok()).collect())
            .unwrap_or_default()
    }
}

fn parse_ts(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|d| d.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::tests::params;
    use studyhall_core::types::ExternalRef;

    #[test]
    fn test_open_and_migrate() {
        let dir = std::env::temp_dir().join("studyhall-registry-db-test");
        std::fs::create_dir_all(&dir).ok();
        let db = RegistryDb::open(&dir.join("test.db")).unwrap();
        assert!(db.load_sessions().is_empty());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = std::env::temp_dir().join("studyhall-registry-db-test2");
        std::fs::create_dir_all(&dir).ok();
        let db = RegistryDb::open(&dir.join("test2.db")).unwrap();

        let mut session = ClassSession::from_params(params("Graphs", "prof-1", Utc::now()));
        session.subscribers.push("alice".into());
        session.record_links.push("https://rec.example/1".into());
        session.reminder_sent = true;
        session.external_refs.announcement = Some(ExternalRef::new("msg-1"));
        db.save_session(&session).unwrap();

        let loaded = db.load_sessions();
        assert_eq!(loaded.len(), 1);
        let back = &loaded[0];
        assert_eq!(back.id, session.id);
        assert_eq!(back.topic, "Graphs");
        assert_eq!(back.subscribers, vec!["alice"]);
        assert_eq!(back.record_links, vec!["https://rec.example/1"]);
        assert!(back.reminder_sent);
        assert_eq!(
            back.external_refs.announcement,
            Some(ExternalRef::new("msg-1"))
        );
        assert_eq!(back.duration_secs, session.duration_secs);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_replace_updates_row() {
        let dir = std::env::temp_dir().join("studyhall-registry-db-test3");
        std::fs::create_dir_all(&dir).ok();
        let db = RegistryDb::open(&dir.join("test3.db")).unwrap();

        let mut session = ClassSession::from_params(params("Graphs", "prof-1", Utc::now()));
        db.save_session(&session).unwrap();
        session.status = SessionStatus::InProgress;
        db.save_session(&session).unwrap();

        let loaded = db.load_sessions();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].status, SessionStatus::InProgress);
        std::fs::remove_dir_all(&dir).ok();
    }
}
