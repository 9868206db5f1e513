//! Duplicate application matching.
//!
//! A candidate is a duplicate if some stored record has exactly the same job
//! URL, or failing that, the same role and company with an application date
//! inside the current calendar month. Comparisons are strict string equality.

use anyhow::{Result, anyhow};
use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use tracing::{debug, warn};

use crate::models::ApplicationRecord;

/// Predicates the record store must be able to scan by.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanFilter {
    JobUrl(String),
    /// Inclusive ISO `YYYY-MM-DD` bounds, compared as strings.
    RoleCompanyAppliedBetween {
        role: String,
        company: String,
        from: String,
        to: String,
    },
}

impl ScanFilter {
    pub fn matches(&self, record: &ApplicationRecord) -> bool {
        match self {
            ScanFilter::JobUrl(url) => record.job_url == *url,
            ScanFilter::RoleCompanyAppliedBetween {
                role,
                company,
                from,
                to,
            } => {
                record.role == *role
                    && record.company == *company
                    && record
                        .date_applied
                        .as_deref()
                        .is_some_and(|d| d >= from.as_str() && d <= to.as_str())
            }
        }
    }
}

pub trait ApplicationScan {
    fn scan(&self, filter: &ScanFilter) -> Result<Vec<ApplicationRecord>>;
}

impl ApplicationScan for [ApplicationRecord] {
    fn scan(&self, filter: &ScanFilter) -> Result<Vec<ApplicationRecord>> {
        Ok(self.iter().filter(|r| filter.matches(r)).cloned().collect())
    }
}

#[derive(Debug, Clone, Default)]
pub struct DuplicateCandidate {
    pub job_url: Option<String>,
    pub role: Option<String>,
    pub company: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MatchType {
    #[serde(rename = "url")]
    Url,
    #[serde(rename = "role_month")]
    RoleMonth,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExistingApplication {
    pub application_id: String,
    pub role: String,
    pub company: String,
    pub date_applied: Option<String>,
}

impl From<&ApplicationRecord> for ExistingApplication {
    fn from(record: &ApplicationRecord) -> Self {
        Self {
            application_id: record.application_id.clone(),
            role: record.role.clone(),
            company: record.company.clone(),
            date_applied: record.date_applied.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateCheck {
    pub is_duplicate: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub match_type: Option<MatchType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub existing_application: Option<ExistingApplication>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DuplicateCheck {
    fn none() -> Self {
        Self {
            is_duplicate: false,
            match_type: None,
            existing_application: None,
            error: None,
        }
    }

    fn found(match_type: MatchType, record: &ApplicationRecord) -> Self {
        Self {
            is_duplicate: true,
            match_type: Some(match_type),
            existing_application: Some(record.into()),
            error: None,
        }
    }
}

/// First and last calendar day of the month containing `today`.
pub fn month_bounds(today: NaiveDate) -> Result<(String, String)> {
    let first = today
        .with_day(1)
        .ok_or_else(|| anyhow!("No first day for {}", today))?;
    let (next_year, next_month) = if today.month() == 12 {
        (today.year() + 1, 1)
    } else {
        (today.year(), today.month() + 1)
    };
    let last = NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|d| d.pred_opt())
        .ok_or_else(|| anyhow!("No last day for {}", today))?;

    Ok((
        first.format("%Y-%m-%d").to_string(),
        last.format("%Y-%m-%d").to_string(),
    ))
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

pub fn find_duplicate<S>(store: &S, candidate: &DuplicateCandidate, today: NaiveDate) -> Result<DuplicateCheck>
where
    S: ApplicationScan + ?Sized,
{
    let Some(job_url) = non_blank(&candidate.job_url) else {
        debug!("no job URL, skipping duplicate check");
        return Ok(DuplicateCheck::none());
    };

    let by_url = store.scan(&ScanFilter::JobUrl(job_url.to_string()))?;
    if let Some(record) = by_url.first() {
        debug!(application_id = %record.application_id, "duplicate by URL");
        return Ok(DuplicateCheck::found(MatchType::Url, record));
    }

    let (Some(role), Some(company)) = (non_blank(&candidate.role), non_blank(&candidate.company)) else {
        return Ok(DuplicateCheck::none());
    };

    let (from, to) = month_bounds(today)?;
    let filter = ScanFilter::RoleCompanyAppliedBetween {
        role: role.to_string(),
        company: company.to_string(),
        from,
        to,
    };
    if let Some(record) = store.scan(&filter)?.first() {
        debug!(application_id = %record.application_id, "duplicate by role and company this month");
        return Ok(DuplicateCheck::found(MatchType::RoleMonth, record));
    }

    Ok(DuplicateCheck::none())
}

/// Fail-open wrapper: a storage error reports "no duplicate" plus the error,
/// so a broken check never blocks saving a new application.
pub fn check_duplicate<S>(store: &S, candidate: &DuplicateCandidate, today: NaiveDate) -> DuplicateCheck
where
    S: ApplicationScan + ?Sized,
{
    match find_duplicate(store, candidate, today) {
        Ok(check) => check,
        Err(e) => {
            warn!(error = %e, "duplicate check failed");
            DuplicateCheck {
                error: Some(format!("{:#}", e)),
                ..DuplicateCheck::none()
            }
        }
    }
}
