use anyhow::{Context, Result, anyhow};

use crate::models::ApplicationRecord;
use crate::storage::StoredObject;

pub fn extract_text(object: &StoredObject) -> Result<String> {
    match object.content_type.as_str() {
        "application/pdf" => pdf_extract::extract_text_from_mem(&object.bytes)
            .map_err(|e| anyhow!("PDF extraction error for {}: {}", object.key, e)),
        "text/plain" | "application/octet-stream" => String::from_utf8(object.bytes.clone())
            .with_context(|| format!("{} is not valid UTF-8 text", object.key)),
        other => Err(anyhow!(
            "Cannot extract text from {} ({}); upload a PDF or .txt resume",
            object.key,
            other
        )),
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResumeDiff {
    pub added: Vec<String>,
    pub removed: Vec<String>,
}

/// Lines present in only one version. Blank lines are ignored and each side
/// is capped at `limit` entries.
pub fn line_diff(old: &str, new: &str, limit: usize) -> ResumeDiff {
    let lines = |text: &str| -> Vec<String> {
        text.lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect()
    };
    let old_lines = lines(old);
    let new_lines = lines(new);

    let added = new_lines
        .iter()
        .filter(|l| !old_lines.contains(l))
        .take(limit)
        .cloned()
        .collect();
    let removed = old_lines
        .iter()
        .filter(|l| !new_lines.contains(l))
        .take(limit)
        .cloned()
        .collect();

    ResumeDiff { added, removed }
}

fn applied_on(record: &ApplicationRecord) -> &str {
    record.date_applied.as_deref().unwrap_or("an unknown date")
}

pub fn comparison_prompt(
    from: &ApplicationRecord,
    to: &ApplicationRecord,
    old_text: &str,
    new_text: &str,
) -> String {
    let header = format!(
        "Resume 1: Applied for {} at {} on {}\n\
         Resume 2: Applied for {} at {} on {}",
        from.role,
        from.company,
        applied_on(from),
        to.role,
        to.company,
        applied_on(to)
    );

    let questions = if to.job_url.is_empty() {
        format!(
            "I'm comparing two resume versions. Please analyze the differences between these two resumes:\n\n\
             {header}\n\n\
             Please provide insights on:\n\
             1. What specific changes were made (skills, experience, formatting, content modifications)\n\
             2. How these changes might impact the effectiveness of the resume\n\
             3. Whether the changes align better with the specific role and company\n\
             4. Specific suggestions for improvement"
        )
    } else {
        format!(
            "I'm comparing two resume versions for a specific job application. Please consider the job posting at the URL provided, then compare these two resumes:\n\n\
             {header}\n\
             Job Posting URL: {url}\n\n\
             Please provide insights on:\n\
             1. What specific changes were made between the two resumes (skills, experience, formatting, content modifications)\n\
             2. How well the changes align with the job description and requirements from the job posting\n\
             3. What strengths from the resume match the job requirements\n\
             4. What improvements could be made to better match the job description\n\
             5. Specific, actionable suggestions for optimization",
            url = to.job_url
        )
    };

    format!(
        "{questions}\n\n\
         Address the candidate directly (\"you can improve ...\"). Keep the response \
         well-structured, about 200-250 words, and specific to these resumes, the company, \
         and the job function. Do not use asterisk characters.\n\n\
         === RESUME 1 ===\n{old_text}\n\n\
         === RESUME 2 ===\n{new_text}\n"
    )
}
