//! Declarative ruleset for job posting detection.
//!
//! URL rules are evaluated in table order. Exclusions always run before
//! inclusions, so a search or listing URL can never be rescued by a
//! posting-shaped path. Within a kind the first matching rule wins.
//! Bump `RULESET_VERSION` whenever a pattern changes.
//!
//! `bare_jobs_index` does not apply to a URL whose query names a single
//! posting (see `POSTING_ID_PARAMS`). Boards embedded on a careers index
//! page address each posting that way.

use anyhow::{Context, Result};
use regex::Regex;
use tracing::debug;

pub const RULESET_VERSION: u32 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleKind {
    Exclusion,
    Inclusion,
}

#[derive(Debug, Clone, Copy)]
pub struct UrlRule {
    pub name: &'static str,
    pub kind: RuleKind,
    pub pattern: &'static str,
}

pub const URL_RULES: &[UrlRule] = &[
    // --- Exclusions: search engines and listing pages ---
    UrlRule {
        name: "search_engine",
        kind: RuleKind::Exclusion,
        pattern: r"^https?://(?:www\.|search\.)?(?:google|bing|duckduckgo|yahoo|baidu|yandex)\.[a-z]{2,}(?:\.[a-z]{2})?(?:[/?#:]|$)",
    },
    UrlRule {
        name: "bare_jobs_index",
        kind: RuleKind::Exclusion,
        pattern: r"^https?://[^/?#]+(?:/[^/?#]+)*?/(?:jobs|careers)/?(?:[?#]|$)",
    },
    UrlRule {
        name: "search_path",
        kind: RuleKind::Exclusion,
        pattern: r"/search(?:[/?#.]|$)",
    },
    UrlRule {
        name: "results_path",
        kind: RuleKind::Exclusion,
        pattern: r"/results(?:[/?#.]|$)",
    },
    UrlRule {
        name: "browse_path",
        kind: RuleKind::Exclusion,
        pattern: r"/browse(?:[/?#.]|$)",
    },
    UrlRule {
        name: "explore_path",
        kind: RuleKind::Exclusion,
        pattern: r"/explore(?:[/?#.]|$)",
    },
    // --- Inclusions: specific posting shapes ---
    UrlRule {
        name: "greenhouse",
        kind: RuleKind::Inclusion,
        pattern: r"greenhouse\.io/[^/?#]+/jobs/\d+",
    },
    UrlRule {
        name: "greenhouse_embed",
        kind: RuleKind::Inclusion,
        pattern: r"[?&]gh_jid=\d+",
    },
    UrlRule {
        name: "lever",
        kind: RuleKind::Inclusion,
        pattern: r"lever\.co/[^/?#]+/[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}",
    },
    UrlRule {
        name: "workday",
        kind: RuleKind::Inclusion,
        pattern: r"(?:myworkdayjobs|myworkdaysite|workday)\.com/(?:[^?#]*/)?job/",
    },
    UrlRule {
        name: "linkedin_view",
        kind: RuleKind::Inclusion,
        pattern: r"linkedin\.com/(?:comm/)?jobs/view/\d+",
    },
    UrlRule {
        name: "indeed_viewjob",
        kind: RuleKind::Inclusion,
        pattern: r"indeed\.[a-z.]+/(?:m/)?viewjob",
    },
    UrlRule {
        name: "glassdoor_listing",
        kind: RuleKind::Inclusion,
        pattern: r"glassdoor\.[a-z.]+/job-listing/",
    },
    UrlRule {
        name: "sap_careers",
        kind: RuleKind::Inclusion,
        pattern: r"(?:jobs|careers)\.sap\.com/(?:[^?#]*/)?job/",
    },
    UrlRule {
        name: "job_detail_path",
        kind: RuleKind::Inclusion,
        pattern: r"/[^?#]*job[-_]?details?",
    },
    UrlRule {
        name: "requisition_id",
        kind: RuleKind::Inclusion,
        pattern: r"(?:requisition|req)[-_]?id[=/:][a-z0-9]",
    },
    // Catch-all, keep last among inclusions
    UrlRule {
        name: "generic_posting_path",
        kind: RuleKind::Inclusion,
        pattern: r"/(?:jobs?|careers?|apply|positions?|opportunities)/(?:[^/?#]*\d[^/?#]*|[a-z0-9]+(?:-[a-z0-9]+)+)",
    },
];

/// Query parameters that identify one posting on an index-shaped URL.
pub const POSTING_ID_PARAMS: &[&str] = &["gh_jid", "jk", "reqId"];

/// Elements that carry the posting title, after the first `<h1>`.
pub const TITLE_SELECTORS: &[&str] = &[
    "[class*='job-title']",
    "[id*='job-title']",
    "[class*='position-title']",
    "[id*='position-title']",
    "[class*='jobTitle']",
    "[id*='jobTitle']",
    "[data-testid*='job-title']",
    "[data-automation-id*='jobTitle']",
];

/// Meta tags that may carry the posting title.
pub const TITLE_META_SELECTORS: &[&str] = &["meta[property='og:title']", "meta[name='title']"];

/// Company indicators, in extraction priority order.
pub const COMPANY_SELECTORS: &[&str] = &[
    "[class*='company-name']",
    "[class*='companyName']",
    "[class*='employer-name']",
    "[class*='hiring-company']",
    "[data-testid*='company']",
    "[id*='company']",
    "[itemprop='hiringOrganization']",
    "meta[property='og:site_name']",
    "[class*='organization-name']",
];

/// Elements that might be an apply control.
pub const APPLY_CANDIDATE_SELECTOR: &str =
    "button, a, input[type='submit'], input[type='button'], [role='button']";

/// A requisition or job id mentioned in page text, e.g. "Req ID: 4821".
pub const REQUISITION_TEXT_PATTERN: &str = r"(?i)\b(?:requisition(?:\s*(?:id|#|number|no\.?))?|req(?:uisition)?\.?\s*(?:id|#)|job\s*(?:id|#|number|no\.))\s*[:#]?\s*[a-z]{0,4}[-_]?\d{2,}";

pub struct CompiledRule {
    pub name: &'static str,
    pub kind: RuleKind,
    regex: Regex,
}

pub struct CompiledRuleset {
    rules: Vec<CompiledRule>,
}

impl CompiledRuleset {
    pub fn compile() -> Result<Self> {
        let rules = URL_RULES
            .iter()
            .map(|rule| {
                let regex = Regex::new(&format!("(?i){}", rule.pattern))
                    .with_context(|| format!("Invalid URL rule '{}'", rule.name))?;
                Ok(CompiledRule {
                    name: rule.name,
                    kind: rule.kind,
                    regex,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        debug!(version = RULESET_VERSION, rules = rules.len(), "URL ruleset compiled");
        Ok(Self { rules })
    }

    pub fn first_exclusion(&self, url: &str) -> Option<&'static str> {
        let names_posting = has_posting_id(url);
        self.rules
            .iter()
            .filter(|rule| rule.kind == RuleKind::Exclusion)
            .filter(|rule| !(names_posting && rule.name == "bare_jobs_index"))
            .find(|rule| rule.regex.is_match(url))
            .map(|rule| rule.name)
    }

    pub fn first_inclusion(&self, url: &str) -> Option<&'static str> {
        self.rules
            .iter()
            .filter(|rule| rule.kind == RuleKind::Inclusion)
            .find(|rule| rule.regex.is_match(url))
            .map(|rule| rule.name)
    }
}

/// True when the query string carries a non-empty `POSTING_ID_PARAMS` value.
fn has_posting_id(url: &str) -> bool {
    let Some((_, query)) = url.split_once('?') else {
        return false;
    };
    let query = query.split('#').next().unwrap_or_default();
    query.split('&').any(|pair| match pair.split_once('=') {
        Some((key, value)) => {
            !value.is_empty() && POSTING_ID_PARAMS.iter().any(|p| p.eq_ignore_ascii_case(key))
        }
        None => false,
    })
}
