use anyhow::{Context, Result, anyhow};
use rusqlite::{Connection, params, params_from_iter, types::Value};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::duplicates::{ApplicationScan, ScanFilter};
use crate::models::{ApplicationRecord, ApplicationUpdate, Insight, Milestone, NewApplication};

const APPLICATION_COLUMNS: &str = "application_id, company, role, job_url, resume_url, did_cover_letter,
     notes, date_applied, date_screening, date_interview, date_accepted, date_rejected,
     created_at, updated_at";

pub struct Database {
    conn: Connection,
    path: PathBuf,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database at {}", path.display()))?;
        Ok(Self {
            conn,
            path: path.to_path_buf(),
        })
    }

    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            conn,
            path: PathBuf::from(":memory:"),
        })
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    pub fn init(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS applications (
                application_id TEXT PRIMARY KEY,
                company TEXT NOT NULL,
                role TEXT NOT NULL,
                job_url TEXT NOT NULL,
                resume_url TEXT,
                did_cover_letter INTEGER NOT NULL DEFAULT 0,
                notes TEXT,
                date_applied TEXT,
                date_screening TEXT,
                date_interview TEXT,
                date_accepted TEXT,
                date_rejected TEXT,
                created_at TEXT NOT NULL DEFAULT (datetime('now')),
                updated_at TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE IF NOT EXISTS insights (
                insight_id TEXT PRIMARY KEY,
                company TEXT NOT NULL,
                role TEXT NOT NULL,
                summary TEXT NOT NULL,
                created_at TEXT NOT NULL DEFAULT (datetime('now'))
            );
            "#,
        )?;
        info!(path = %self.path.display(), "database initialized");
        Ok(())
    }

    pub fn ensure_initialized(&self) -> Result<()> {
        let tables: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='applications'",
            [],
            |row| row.get(0),
        )?;
        if tables == 0 {
            return Err(anyhow!("Database not initialized. Run 'beacon init' first."));
        }
        Ok(())
    }

    // --- Application operations ---

    pub fn insert_application(&self, app: &NewApplication) -> Result<String> {
        let application_id = uuid::Uuid::new_v4().to_string();
        let date_applied = app
            .date_applied
            .clone()
            .unwrap_or_else(|| chrono::Local::now().format("%Y-%m-%d").to_string());

        self.conn.execute(
            "INSERT INTO applications
                (application_id, company, role, job_url, did_cover_letter, notes, date_applied)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                application_id,
                app.company,
                app.role,
                app.job_url,
                app.did_cover_letter,
                app.notes,
                date_applied
            ],
        )?;

        debug!(%application_id, company = %app.company, role = %app.role, "application inserted");
        Ok(application_id)
    }

    pub fn get_application(&self, id: &str) -> Result<Option<ApplicationRecord>> {
        let sql = format!(
            "SELECT {} FROM applications WHERE application_id = ?1",
            APPLICATION_COLUMNS
        );
        let result = self.conn.query_row(&sql, [id], Self::row_to_application);
        match result {
            Ok(app) => Ok(Some(app)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn list_applications(&self, company: Option<&str>) -> Result<Vec<ApplicationRecord>> {
        let mut sql = format!("SELECT {} FROM applications", APPLICATION_COLUMNS);
        if company.is_some() {
            sql.push_str(" WHERE LOWER(company) = LOWER(?1)");
        }
        sql.push_str(" ORDER BY date_applied DESC, created_at DESC");

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = if let Some(c) = company {
            stmt.query_map([c], Self::row_to_application)?
        } else {
            stmt.query_map([], Self::row_to_application)?
        };

        rows.collect::<Result<Vec<_>, _>>()
            .context("Failed to list applications")
    }

    /// Overwrites the given fields in place. Returns false if no such record.
    pub fn update_application(&self, id: &str, update: &ApplicationUpdate) -> Result<bool> {
        let mut assignments: Vec<String> = Vec::new();
        let mut values: Vec<Value> = Vec::new();

        let required = [
            ("company", &update.company),
            ("role", &update.role),
            ("job_url", &update.job_url),
        ];
        for (column, value) in required {
            if let Some(v) = value {
                if v.trim().is_empty() {
                    return Err(anyhow!("{} cannot be empty", column));
                }
                values.push(Value::Text(v.clone()));
                assignments.push(format!("{} = ?{}", column, values.len()));
            }
        }

        if let Some(flag) = update.did_cover_letter {
            values.push(Value::Integer(flag as i64));
            assignments.push(format!("did_cover_letter = ?{}", values.len()));
        }

        // Empty string clears an optional field
        let optional = [
            ("notes", &update.notes),
            ("date_applied", &update.date_applied),
            ("date_screening", &update.date_screening),
            ("date_interview", &update.date_interview),
            ("date_accepted", &update.date_accepted),
            ("date_rejected", &update.date_rejected),
        ];
        for (column, value) in optional {
            if let Some(v) = value {
                values.push(if v.is_empty() {
                    Value::Null
                } else {
                    Value::Text(v.clone())
                });
                assignments.push(format!("{} = ?{}", column, values.len()));
            }
        }

        if assignments.is_empty() {
            return Ok(self.get_application(id)?.is_some());
        }

        values.push(Value::Text(id.to_string()));
        let sql = format!(
            "UPDATE applications SET {}, updated_at = datetime('now') WHERE application_id = ?{}",
            assignments.join(", "),
            values.len()
        );

        let changed = self.conn.execute(&sql, params_from_iter(values))?;
        debug!(application_id = id, fields = assignments.len(), changed, "application updated");
        Ok(changed > 0)
    }

    pub fn set_milestone(&self, id: &str, milestone: Milestone, date: &str) -> Result<bool> {
        let sql = format!(
            "UPDATE applications SET {} = ?1, updated_at = datetime('now') WHERE application_id = ?2",
            milestone.column()
        );
        let changed = self.conn.execute(&sql, params![date, id])?;
        Ok(changed > 0)
    }

    pub fn set_resume_url(&self, id: &str, url: &str) -> Result<bool> {
        let changed = self.conn.execute(
            "UPDATE applications SET resume_url = ?1, updated_at = datetime('now') WHERE application_id = ?2",
            params![url, id],
        )?;
        Ok(changed > 0)
    }

    pub fn delete_application(&self, id: &str) -> Result<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM applications WHERE application_id = ?1", [id])?;
        Ok(changed > 0)
    }

    fn row_to_application(row: &rusqlite::Row) -> rusqlite::Result<ApplicationRecord> {
        Ok(ApplicationRecord {
            application_id: row.get(0)?,
            company: row.get(1)?,
            role: row.get(2)?,
            job_url: row.get(3)?,
            resume_url: row.get(4)?,
            did_cover_letter: row.get(5)?,
            notes: row.get(6)?,
            date_applied: row.get(7)?,
            date_screening: row.get(8)?,
            date_interview: row.get(9)?,
            date_accepted: row.get(10)?,
            date_rejected: row.get(11)?,
            created_at: row.get(12)?,
            updated_at: row.get(13)?,
        })
    }

    // --- Insight operations ---

    pub fn add_insight(&self, company: &str, role: &str, summary: &str) -> Result<Insight> {
        if company.trim().is_empty() || role.trim().is_empty() || summary.trim().is_empty() {
            return Err(anyhow!("company, role, and summary are required"));
        }

        let insight_id = format!("insight-{}", uuid::Uuid::new_v4());
        self.conn.execute(
            "INSERT INTO insights (insight_id, company, role, summary) VALUES (?1, ?2, ?3, ?4)",
            params![insight_id, company, role, summary],
        )?;

        self.conn
            .query_row(
                "SELECT insight_id, company, role, summary, created_at FROM insights WHERE insight_id = ?1",
                [&insight_id],
                Self::row_to_insight,
            )
            .context("Failed to read back insight")
    }

    pub fn list_insights(&self) -> Result<Vec<Insight>> {
        let mut stmt = self.conn.prepare(
            "SELECT insight_id, company, role, summary, created_at FROM insights ORDER BY created_at DESC",
        )?;
        let rows = stmt.query_map([], Self::row_to_insight)?;
        rows.collect::<Result<Vec<_>, _>>()
            .context("Failed to list insights")
    }

    fn row_to_insight(row: &rusqlite::Row) -> rusqlite::Result<Insight> {
        Ok(Insight {
            insight_id: row.get(0)?,
            company: row.get(1)?,
            role: row.get(2)?,
            summary: row.get(3)?,
            created_at: row.get(4)?,
        })
    }
}

impl ApplicationScan for Database {
    fn scan(&self, filter: &ScanFilter) -> Result<Vec<ApplicationRecord>> {
        let (clause, values): (&str, Vec<&str>) = match filter {
            ScanFilter::JobUrl(url) => ("job_url = ?1", vec![url.as_str()]),
            ScanFilter::RoleCompanyAppliedBetween {
                role,
                company,
                from,
                to,
            } => (
                "role = ?1 AND company = ?2 AND date_applied >= ?3 AND date_applied <= ?4",
                vec![role.as_str(), company.as_str(), from.as_str(), to.as_str()],
            ),
        };

        let sql = format!(
            "SELECT {} FROM applications WHERE {} ORDER BY created_at",
            APPLICATION_COLUMNS, clause
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(values), Self::row_to_application)?;
        rows.collect::<Result<Vec<_>, _>>()
            .context("Failed to scan applications")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn db() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.init().unwrap();
        db
    }

    fn new_app(role: &str, company: &str, url: &str, applied: &str) -> NewApplication {
        NewApplication {
            company: company.to_string(),
            role: role.to_string(),
            job_url: url.to_string(),
            did_cover_letter: true,
            notes: Some("referral".to_string()),
            date_applied: Some(applied.to_string()),
        }
    }

    #[test]
    fn test_ensure_initialized_requires_init() {
        let db = Database::open_in_memory().unwrap();
        let err = db.ensure_initialized().unwrap_err();
        assert!(err.to_string().contains("beacon init"));
        db.init().unwrap();
        assert!(db.ensure_initialized().is_ok());
    }

    #[test]
    fn test_insert_and_get_application() {
        let db = db();
        let id = db
            .insert_application(&new_app("Engineer", "Acme", "https://acme.com/jobs/1", "2025-10-02"))
            .unwrap();

        let app = db.get_application(&id).unwrap().unwrap();
        assert_eq!(app.application_id, id);
        assert_eq!(app.company, "Acme");
        assert_eq!(app.role, "Engineer");
        assert!(app.did_cover_letter);
        assert_eq!(app.notes.as_deref(), Some("referral"));
        assert_eq!(app.date_applied.as_deref(), Some("2025-10-02"));
        assert!(app.date_screening.is_none());
        assert!(app.resume_url.is_none());

        assert!(db.get_application("missing").unwrap().is_none());
    }

    #[test]
    fn test_insert_defaults_date_applied_to_today() {
        let db = db();
        let mut app = new_app("Engineer", "Acme", "https://acme.com/jobs/1", "");
        app.date_applied = None;
        let id = db.insert_application(&app).unwrap();
        let today = chrono::Local::now().format("%Y-%m-%d").to_string();
        assert_eq!(db.get_application(&id).unwrap().unwrap().date_applied, Some(today));
    }

    #[test]
    fn test_list_applications_filters_by_company() {
        let db = db();
        db.insert_application(&new_app("Engineer", "Acme", "https://acme.com/jobs/1", "2025-10-01"))
            .unwrap();
        db.insert_application(&new_app("Analyst", "Globex", "https://globex.com/jobs/2", "2025-10-03"))
            .unwrap();

        let all = db.list_applications(None).unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].company, "Globex"); // newest first

        let acme = db.list_applications(Some("acme")).unwrap();
        assert_eq!(acme.len(), 1);
        assert_eq!(acme[0].role, "Engineer");
    }

    #[test]
    fn test_update_application_overwrites_and_clears() {
        let db = db();
        let id = db
            .insert_application(&new_app("Engineer", "Acme", "https://acme.com/jobs/1", "2025-10-01"))
            .unwrap();

        let update = ApplicationUpdate {
            role: Some("Senior Engineer".to_string()),
            did_cover_letter: Some(false),
            notes: Some(String::new()),
            date_interview: Some("2025-10-09".to_string()),
            ..Default::default()
        };
        assert!(db.update_application(&id, &update).unwrap());

        let app = db.get_application(&id).unwrap().unwrap();
        assert_eq!(app.role, "Senior Engineer");
        assert_eq!(app.company, "Acme");
        assert!(!app.did_cover_letter);
        assert!(app.notes.is_none());
        assert_eq!(app.date_interview.as_deref(), Some("2025-10-09"));
    }

    #[test]
    fn test_update_rejects_empty_required_field() {
        let db = db();
        let id = db
            .insert_application(&new_app("Engineer", "Acme", "https://acme.com/jobs/1", "2025-10-01"))
            .unwrap();
        let update = ApplicationUpdate {
            company: Some("  ".to_string()),
            ..Default::default()
        };
        assert!(db.update_application(&id, &update).is_err());
    }

    #[test]
    fn test_update_missing_record() {
        let db = db();
        let update = ApplicationUpdate {
            notes: Some("x".to_string()),
            ..Default::default()
        };
        assert!(!db.update_application("missing", &update).unwrap());
        assert!(!db.update_application("missing", &ApplicationUpdate::default()).unwrap());
    }

    #[test]
    fn test_set_milestone_allows_both_final_dates() {
        let db = db();
        let id = db
            .insert_application(&new_app("Engineer", "Acme", "https://acme.com/jobs/1", "2025-10-01"))
            .unwrap();
        assert!(db.set_milestone(&id, Milestone::Accepted, "2025-10-20").unwrap());
        assert!(db.set_milestone(&id, Milestone::Rejected, "2025-10-21").unwrap());

        let app = db.get_application(&id).unwrap().unwrap();
        assert_eq!(app.date_accepted.as_deref(), Some("2025-10-20"));
        assert_eq!(app.date_rejected.as_deref(), Some("2025-10-21"));
        assert!(!db.set_milestone("missing", Milestone::Screening, "2025-10-20").unwrap());
    }

    #[test]
    fn test_set_resume_url_and_delete() {
        let db = db();
        let id = db
            .insert_application(&new_app("Engineer", "Acme", "https://acme.com/jobs/1", "2025-10-01"))
            .unwrap();
        assert!(db.set_resume_url(&id, "store://bucket/key.pdf").unwrap());
        assert_eq!(
            db.get_application(&id).unwrap().unwrap().resume_url.as_deref(),
            Some("store://bucket/key.pdf")
        );

        assert!(db.delete_application(&id).unwrap());
        assert!(!db.delete_application(&id).unwrap());
        assert!(db.get_application(&id).unwrap().is_none());
    }

    #[test]
    fn test_scan_filters() {
        let db = db();
        db.insert_application(&new_app("Engineer", "Acme", "https://acme.com/jobs/1", "2025-10-01"))
            .unwrap();
        db.insert_application(&new_app("Engineer", "Acme", "https://acme.com/jobs/2", "2025-09-30"))
            .unwrap();

        let by_url = db
            .scan(&ScanFilter::JobUrl("https://acme.com/jobs/2".to_string()))
            .unwrap();
        assert_eq!(by_url.len(), 1);
        assert_eq!(by_url[0].date_applied.as_deref(), Some("2025-09-30"));

        let in_october = db
            .scan(&ScanFilter::RoleCompanyAppliedBetween {
                role: "Engineer".to_string(),
                company: "Acme".to_string(),
                from: "2025-10-01".to_string(),
                to: "2025-10-31".to_string(),
            })
            .unwrap();
        assert_eq!(in_october.len(), 1);
        assert_eq!(in_october[0].job_url, "https://acme.com/jobs/1");
    }

    #[test]
    fn test_insights() {
        let db = db();
        assert!(db.add_insight("Acme", "", "summary").is_err());

        let insight = db.add_insight("Acme", "Engineer", "Lead with Rust experience.").unwrap();
        assert!(insight.insight_id.starts_with("insight-"));
        assert_eq!(insight.summary, "Lead with Rust experience.");

        let all = db.list_insights().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].company, "Acme");
    }
}
