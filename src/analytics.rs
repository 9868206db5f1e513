//! Pipeline statistics and follow-up reminders over stored applications.

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::Serialize;

use crate::models::ApplicationRecord;

const TOP_COMPANIES: usize = 10;

/// Percentages of a cohort that reached each milestone.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct MilestoneRates {
    pub screening: f64,
    pub interview: f64,
    pub offer: f64,
}

impl MilestoneRates {
    fn for_cohort<'a>(cohort: impl Iterator<Item = &'a ApplicationRecord>) -> Self {
        let (mut total, mut screening, mut interview, mut offer) = (0usize, 0usize, 0usize, 0usize);
        for record in cohort {
            total += 1;
            screening += record.date_screening.is_some() as usize;
            interview += record.date_interview.is_some() as usize;
            offer += record.date_accepted.is_some() as usize;
        }
        Self {
            screening: percent(screening, total),
            interview: percent(interview, total),
            offer: percent(offer, total),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PipelineStats {
    pub total: usize,
    pub with_cover_letter: usize,
    pub without_cover_letter: usize,
    pub screening: usize,
    pub interviews: usize,
    pub offers: usize,
    pub rejections: usize,
    pub pending: usize,
    pub cover_letter_rates: MilestoneRates,
    pub no_cover_letter_rates: MilestoneRates,
    pub top_companies: Vec<(String, usize)>,
    pub avg_days_to_screening: Option<f64>,
    pub avg_days_to_interview: Option<f64>,
}

fn percent(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 * 100.0 / whole as f64
    }
}

fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()
}

/// Mean whole days between application and a later milestone, over records
/// where both dates parse.
fn average_days<F>(records: &[ApplicationRecord], milestone: F) -> Option<f64>
where
    F: Fn(&ApplicationRecord) -> Option<&str>,
{
    let gaps: Vec<i64> = records
        .iter()
        .filter_map(|r| {
            let applied = parse_date(r.date_applied.as_deref()?)?;
            let reached = parse_date(milestone(r)?)?;
            Some((reached - applied).num_days())
        })
        .collect();

    if gaps.is_empty() {
        None
    } else {
        Some(gaps.iter().sum::<i64>() as f64 / gaps.len() as f64)
    }
}

impl PipelineStats {
    pub fn from_records(records: &[ApplicationRecord]) -> Self {
        let total = records.len();
        let with_cover_letter = records.iter().filter(|r| r.did_cover_letter).count();
        let count = |f: &dyn Fn(&ApplicationRecord) -> bool| records.iter().filter(|r| f(r)).count();

        let pending = count(&|r| {
            r.date_screening.is_none()
                && r.date_interview.is_none()
                && r.date_accepted.is_none()
                && r.date_rejected.is_none()
        });

        let mut by_company: HashMap<&str, usize> = HashMap::new();
        for record in records {
            *by_company.entry(record.company.as_str()).or_insert(0) += 1;
        }
        let mut top_companies: Vec<(String, usize)> = by_company
            .into_iter()
            .map(|(company, n)| (company.to_string(), n))
            .collect();
        top_companies.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        top_companies.truncate(TOP_COMPANIES);

        Self {
            total,
            with_cover_letter,
            without_cover_letter: total - with_cover_letter,
            screening: count(&|r| r.date_screening.is_some()),
            interviews: count(&|r| r.date_interview.is_some()),
            offers: count(&|r| r.date_accepted.is_some()),
            rejections: count(&|r| r.date_rejected.is_some()),
            pending,
            cover_letter_rates: MilestoneRates::for_cohort(records.iter().filter(|r| r.did_cover_letter)),
            no_cover_letter_rates: MilestoneRates::for_cohort(records.iter().filter(|r| !r.did_cover_letter)),
            top_companies,
            avg_days_to_screening: average_days(records, |r| r.date_screening.as_deref()),
            avg_days_to_interview: average_days(records, |r| r.date_interview.as_deref()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FollowUp {
    pub application_id: String,
    pub company: String,
    pub role: String,
    /// "Interview", "Screening" or "Applied".
    pub last_event: &'static str,
    pub last_event_date: Option<String>,
}

/// Open applications, each labelled by its most recent milestone.
pub fn pending_follow_ups(records: &[ApplicationRecord]) -> Vec<FollowUp> {
    records
        .iter()
        .filter(|r| r.date_accepted.is_none() && r.date_rejected.is_none())
        .map(|r| {
            let (last_event, date) = if let Some(d) = &r.date_interview {
                ("Interview", Some(d))
            } else if let Some(d) = &r.date_screening {
                ("Screening", Some(d))
            } else {
                ("Applied", r.date_applied.as_ref())
            };
            FollowUp {
                application_id: r.application_id.clone(),
                company: r.company.clone(),
                role: r.role.clone(),
                last_event,
                last_event_date: date.cloned(),
            }
        })
        .collect()
}
