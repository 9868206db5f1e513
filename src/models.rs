use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ApplicationRecord {
    #[serde(rename = "ApplicationID")]
    pub application_id: String,
    pub company: String,
    pub role: String,
    #[serde(rename = "JobURL")]
    pub job_url: String,
    #[serde(rename = "ResumeURL")]
    pub resume_url: Option<String>,
    #[serde(rename = "DidCL")]
    pub did_cover_letter: bool,
    pub notes: Option<String>,
    // Milestone dates are ISO YYYY-MM-DD strings
    pub date_applied: Option<String>,
    pub date_screening: Option<String>,
    pub date_interview: Option<String>,
    pub date_accepted: Option<String>,
    pub date_rejected: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl ApplicationRecord {
    /// Furthest stage reached. Rejected wins over accepted when both are set,
    /// since nothing prevents a record from carrying both.
    pub fn stage(&self) -> Stage {
        if self.date_rejected.is_some() {
            Stage::Rejected
        } else if self.date_accepted.is_some() {
            Stage::Accepted
        } else if self.date_interview.is_some() {
            Stage::Interview
        } else if self.date_screening.is_some() {
            Stage::Screening
        } else {
            Stage::Applied
        }
    }

    pub fn milestone_date(&self, milestone: Milestone) -> Option<&str> {
        match milestone {
            Milestone::Screening => self.date_screening.as_deref(),
            Milestone::Interview => self.date_interview.as_deref(),
            Milestone::Accepted => self.date_accepted.as_deref(),
            Milestone::Rejected => self.date_rejected.as_deref(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Applied,
    Screening,
    Interview,
    Accepted,
    Rejected,
}

impl Stage {
    pub fn label(&self) -> &'static str {
        match self {
            Stage::Applied => "applied",
            Stage::Screening => "screening",
            Stage::Interview => "interview",
            Stage::Accepted => "accepted",
            Stage::Rejected => "rejected",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Milestone {
    Screening,
    Interview,
    Accepted,
    Rejected,
}

impl Milestone {
    pub fn column(&self) -> &'static str {
        match self {
            Milestone::Screening => "date_screening",
            Milestone::Interview => "date_interview",
            Milestone::Accepted => "date_accepted",
            Milestone::Rejected => "date_rejected",
        }
    }
}

/// Submission payload from `beacon add`.
#[derive(Debug, Clone, Default)]
pub struct NewApplication {
    pub company: String,
    pub role: String,
    pub job_url: String,
    pub did_cover_letter: bool,
    pub notes: Option<String>,
    pub date_applied: Option<String>,
}

/// Partial overwrite of an application. `None` leaves a field untouched;
/// `Some("")` clears an optional field.
#[derive(Debug, Clone, Default)]
pub struct ApplicationUpdate {
    pub company: Option<String>,
    pub role: Option<String>,
    pub job_url: Option<String>,
    pub did_cover_letter: Option<bool>,
    pub notes: Option<String>,
    pub date_applied: Option<String>,
    pub date_screening: Option<String>,
    pub date_interview: Option<String>,
    pub date_accepted: Option<String>,
    pub date_rejected: Option<String>,
}

impl ApplicationUpdate {
    pub fn is_empty(&self) -> bool {
        self.company.is_none()
            && self.role.is_none()
            && self.job_url.is_none()
            && self.did_cover_letter.is_none()
            && self.notes.is_none()
            && self.date_applied.is_none()
            && self.date_screening.is_none()
            && self.date_interview.is_none()
            && self.date_accepted.is_none()
            && self.date_rejected.is_none()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Insight {
    #[serde(rename = "InsightID")]
    pub insight_id: String,
    pub company: String,
    pub role: String,
    pub summary: String,
    pub created_at: String,
}

#[cfg(test)]
pub(crate) fn sample_record(id: &str, role: &str, company: &str, url: &str, applied: &str) -> ApplicationRecord {
    ApplicationRecord {
        application_id: id.to_string(),
        company: company.to_string(),
        role: role.to_string(),
        job_url: url.to_string(),
        resume_url: None,
        did_cover_letter: false,
        notes: None,
        date_applied: Some(applied.to_string()),
        date_screening: None,
        date_interview: None,
        date_accepted: None,
        date_rejected: None,
        created_at: format!("{} 12:00:00", applied),
        updated_at: format!("{} 12:00:00", applied),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_prefers_rejected_when_both_final_dates_set() {
        let mut record = sample_record("a", "Engineer", "Acme", "https://acme.com/jobs/1", "2025-10-01");
        assert_eq!(record.stage(), Stage::Applied);

        record.date_interview = Some("2025-10-05".to_string());
        assert_eq!(record.stage(), Stage::Interview);

        record.date_accepted = Some("2025-10-10".to_string());
        assert_eq!(record.stage(), Stage::Accepted);

        record.date_rejected = Some("2025-10-11".to_string());
        assert_eq!(record.stage(), Stage::Rejected);
    }

    #[test]
    fn test_record_serializes_with_dashboard_field_names() {
        let record = sample_record("abc", "Engineer", "Acme", "https://acme.com/jobs/1", "2025-10-01");
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["ApplicationID"], "abc");
        assert_eq!(json["JobURL"], "https://acme.com/jobs/1");
        assert_eq!(json["DidCL"], false);
        assert_eq!(json["DateApplied"], "2025-10-01");
    }

    #[test]
    fn test_empty_update() {
        assert!(ApplicationUpdate::default().is_empty());
        let update = ApplicationUpdate {
            notes: Some(String::new()),
            ..Default::default()
        };
        assert!(!update.is_empty());
    }
}
