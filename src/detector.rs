//! Job posting detection over a snapshot of page state.
//!
//! Classification runs in three passes (URL exclusion, URL inclusion, DOM
//! confirmation) and only then extracts role and company. Every pass can
//! short-circuit to "not a job page".

use anyhow::{Context, Result, anyhow};
use regex::Regex;
use reqwest::Url;
use scraper::{ElementRef, Html, Selector};
use serde::Serialize;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::rules::{
    APPLY_CANDIDATE_SELECTOR, COMPANY_SELECTORS, CompiledRuleset, REQUISITION_TEXT_PATTERN,
    TITLE_META_SELECTORS, TITLE_SELECTORS,
};

pub const UNKNOWN_POSITION: &str = "Unknown Position";
pub const UNKNOWN_COMPANY: &str = "Unknown Company";

const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Page state as seen by the host at the moment of detection.
#[derive(Debug, Clone)]
pub struct PageSnapshot {
    pub url: String,
    pub title: String,
    pub html: String,
}

impl PageSnapshot {
    pub fn from_html(url: impl Into<String>, html: impl Into<String>) -> Self {
        let html = html.into();
        let title = document_title(&Html::parse_document(&html));
        Self {
            url: url.into(),
            title,
            html,
        }
    }

    pub fn from_file(path: &Path, url: &str) -> Result<Self> {
        let html = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read page file: {}", path.display()))?;
        Ok(Self::from_html(url, html))
    }
}

fn document_title(document: &Html) -> String {
    Selector::parse("title")
        .ok()
        .and_then(|sel| document.select(&sel).next().map(element_text))
        .unwrap_or_default()
}

pub fn fetch_page(url: &str, timeout_secs: u64) -> Result<PageSnapshot> {
    info!(url, "fetching page");

    let client = reqwest::blocking::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .context("Failed to build HTTP client")?;

    let response = client
        .get(url)
        .send()
        .with_context(|| format!("Failed to fetch {}", url))?;

    if !response.status().is_success() {
        return Err(anyhow!("Fetching {} failed with status {}", url, response.status()));
    }

    // Detection runs against where we landed, not where we started
    let final_url = response.url().to_string();
    let html = response.text().context("Failed to read page body")?;
    debug!(url = %final_url, bytes = html.len(), "page fetched");

    Ok(PageSnapshot::from_html(final_url, html))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobPageDetection {
    pub is_job_page: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub is_beacon_dashboard: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_rule: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl JobPageDetection {
    fn not_job(matched_rule: Option<&str>) -> Self {
        Self {
            is_job_page: false,
            role: None,
            company: None,
            url: None,
            is_beacon_dashboard: false,
            matched_rule: matched_rule.map(str::to_string),
            error: None,
        }
    }

    fn dashboard() -> Self {
        Self {
            is_beacon_dashboard: true,
            ..Self::not_job(None)
        }
    }

    fn failed(message: String) -> Self {
        Self {
            error: Some(message),
            ..Self::not_job(None)
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct DetectorConfig {
    /// Hosts serving the user's own dashboard; never classified as postings.
    pub dashboard_hosts: Vec<String>,
}

impl From<&Config> for DetectorConfig {
    fn from(config: &Config) -> Self {
        Self {
            dashboard_hosts: config.dashboard_hosts.clone(),
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct Signals {
    title: bool,
    company: bool,
    apply: bool,
    requisition: bool,
}

impl Signals {
    fn confirmed(&self) -> bool {
        self.title && (self.company || self.apply || self.requisition)
    }
}

pub struct Detector {
    rules: CompiledRuleset,
    dashboard_hosts: Vec<String>,
    h1: Selector,
    body: Selector,
    org_name: Selector,
    title_selectors: Vec<Selector>,
    title_meta_selectors: Vec<Selector>,
    company_selectors: Vec<Selector>,
    apply_candidates: Selector,
    requisition_text: Regex,
}

fn parse_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|e| anyhow!("Invalid selector '{}': {:?}", selector, e))
}

fn parse_selectors(selectors: &[&str]) -> Result<Vec<Selector>> {
    selectors.iter().map(|s| parse_selector(s)).collect()
}

impl Detector {
    pub fn new(config: &DetectorConfig) -> Result<Self> {
        Ok(Self {
            rules: CompiledRuleset::compile()?,
            dashboard_hosts: config
                .dashboard_hosts
                .iter()
                .map(|h| h.to_lowercase())
                .collect(),
            h1: parse_selector("h1")?,
            body: parse_selector("body")?,
            org_name: parse_selector("[itemprop='name']")?,
            title_selectors: parse_selectors(TITLE_SELECTORS)?,
            title_meta_selectors: parse_selectors(TITLE_META_SELECTORS)?,
            company_selectors: parse_selectors(COMPANY_SELECTORS)?,
            apply_candidates: parse_selector(APPLY_CANDIDATE_SELECTOR)?,
            requisition_text: Regex::new(REQUISITION_TEXT_PATTERN)
                .context("Invalid requisition text pattern")?,
        })
    }

    /// Never fails: inspection errors degrade to "not a job page".
    pub fn classify(&self, page: &PageSnapshot) -> JobPageDetection {
        match self.detect(page) {
            Ok(detection) => detection,
            Err(e) => {
                warn!(url = %page.url, error = %e, "job page detection failed");
                JobPageDetection::failed(format!("{:#}", e))
            }
        }
    }

    pub fn detect(&self, page: &PageSnapshot) -> Result<JobPageDetection> {
        let url = Url::parse(page.url.trim())
            .with_context(|| format!("Invalid page URL '{}'", page.url))?;
        let href = url.as_str();

        if let Some(host) = url.host_str() {
            if self.dashboard_hosts.iter().any(|h| h == &host.to_lowercase()) {
                debug!(host, "page is the beacon dashboard");
                return Ok(JobPageDetection::dashboard());
            }
        }

        if let Some(rule) = self.rules.first_exclusion(href) {
            debug!(rule, url = href, "excluded by URL rule");
            return Ok(JobPageDetection::not_job(Some(rule)));
        }

        let Some(rule) = self.rules.first_inclusion(href) else {
            debug!(url = href, "no posting URL rule matched");
            return Ok(JobPageDetection::not_job(None));
        };

        let document = Html::parse_document(&page.html);
        let signals = self.collect_signals(&document);
        debug!(
            rule,
            title = signals.title,
            company = signals.company,
            apply = signals.apply,
            requisition = signals.requisition,
            "DOM signals"
        );

        if !signals.confirmed() {
            return Ok(JobPageDetection::not_job(Some(rule)));
        }

        let role = self
            .extract_role(&document, &page.title)
            .unwrap_or_else(|| UNKNOWN_POSITION.to_string());
        let company = self
            .extract_company(&document)
            .or_else(|| company_from_url(&url))
            .unwrap_or_else(|| UNKNOWN_COMPANY.to_string());

        Ok(JobPageDetection {
            is_job_page: true,
            role: Some(role),
            company: Some(company),
            url: Some(page.url.clone()),
            is_beacon_dashboard: false,
            matched_rule: Some(rule.to_string()),
            error: None,
        })
    }

    fn collect_signals(&self, document: &Html) -> Signals {
        let title = self.first_value(document, std::slice::from_ref(&self.h1)).is_some()
            || self.first_value(document, &self.title_selectors).is_some();

        let company = self.extract_company(document).is_some();

        let apply = document.select(&self.apply_candidates).any(|el| {
            let text = element_text(el);
            ["class", "id", "value", "aria-label"]
                .iter()
                .filter_map(|a| el.value().attr(a))
                .chain(std::iter::once(text.as_str()))
                .any(|v| v.to_lowercase().contains("apply"))
        });

        let page_text = document
            .select(&self.body)
            .next()
            .map(element_text)
            .unwrap_or_else(|| element_text(document.root_element()));
        let requisition = self.requisition_text.is_match(&page_text);

        Signals {
            title,
            company,
            apply,
            requisition,
        }
    }

    fn extract_role(&self, document: &Html, page_title: &str) -> Option<String> {
        self.first_value(document, std::slice::from_ref(&self.h1))
            .or_else(|| self.first_value(document, &self.title_meta_selectors))
            .or_else(|| self.first_value(document, &self.title_selectors))
            .or_else(|| non_empty(page_title.trim()))
    }

    fn extract_company(&self, document: &Html) -> Option<String> {
        for selector in &self.company_selectors {
            for el in document.select(selector) {
                // Microdata containers also hold address and logo text
                if el.value().attr("itemprop") == Some("hiringOrganization") {
                    if let Some(name) = el.select(&self.org_name).find_map(element_value) {
                        return Some(name);
                    }
                }
                if let Some(value) = element_value(el) {
                    return Some(value);
                }
            }
        }
        None
    }

    fn first_value(&self, document: &Html, selectors: &[Selector]) -> Option<String> {
        selectors
            .iter()
            .find_map(|sel| document.select(sel).find_map(element_value))
    }
}

fn element_text(el: ElementRef) -> String {
    el.text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Meta tags yield their `content`, everything else its visible text.
fn element_value(el: ElementRef) -> Option<String> {
    if el.value().name() == "meta" {
        return el.value().attr("content").and_then(|c| non_empty(c.trim()));
    }
    non_empty(&element_text(el))
}

fn non_empty(s: &str) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

/// Company guess from the URL when the page names none.
pub fn company_from_url(url: &Url) -> Option<String> {
    let host = url.host_str()?.to_lowercase();
    let host = host.strip_prefix("www.").unwrap_or(&host);

    if host_is(host, "sap.com") {
        return Some("SAP".to_string());
    }

    // Hosted ATS boards put the company slug first in the path
    let slug = if host_is(host, "greenhouse.io") || host_is(host, "lever.co") {
        url.path_segments()
            .and_then(|mut segments| segments.find(|s| !s.is_empty()))
            .map(str::to_string)
    } else {
        None
    };

    let raw = slug.or_else(|| host.split('.').next().map(str::to_string))?;
    if raw.is_empty() {
        None
    } else {
        Some(capitalize_first(&raw))
    }
}

fn host_is(host: &str, domain: &str) -> bool {
    host == domain || host.ends_with(&format!(".{}", domain))
}

fn capitalize_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detector() -> Detector {
        Detector::new(&DetectorConfig {
            dashboard_hosts: vec!["localhost".to_string()],
        })
        .unwrap()
    }

    fn page(url: &str, body: &str) -> PageSnapshot {
        PageSnapshot::from_html(
            url,
            format!("<html><head><title>Careers</title></head><body>{}</body></html>", body),
        )
    }

    const FULL_POSTING: &str = r#"
        <h1>Senior Engineer</h1>
        <div class="company-name">Acme</div>
        <button class="apply-button">Apply now</button>
    "#;

    #[test]
    fn test_detects_posting_with_company_element() {
        let result = detector().detect(&page("https://acme.com/jobs/123", FULL_POSTING)).unwrap();
        assert!(result.is_job_page);
        assert_eq!(result.role.as_deref(), Some("Senior Engineer"));
        assert_eq!(result.company.as_deref(), Some("Acme"));
        assert_eq!(result.url.as_deref(), Some("https://acme.com/jobs/123"));
        assert_eq!(result.matched_rule.as_deref(), Some("generic_posting_path"));
    }

    #[test]
    fn test_exclusion_wins_regardless_of_dom() {
        let d = detector();
        for url in [
            "https://www.google.com/search?q=senior+engineer",
            "https://acme.com/jobs",
            "https://www.linkedin.com/jobs/search/?keywords=rust",
            "https://acme.com/careers/results?page=2",
            "https://acme.com/browse/jobs/123",
            "https://acme.com/explore/roles-42",
        ] {
            let result = d.detect(&page(url, FULL_POSTING)).unwrap();
            assert!(!result.is_job_page, "{} should be excluded", url);
            assert!(result.matched_rule.is_some());
        }
    }

    #[test]
    fn test_unrecognized_url_is_not_a_job_page() {
        let result = detector()
            .detect(&page("https://acme.com/about-us", FULL_POSTING))
            .unwrap();
        assert!(!result.is_job_page);
        assert!(result.matched_rule.is_none());
    }

    #[test]
    fn test_requires_title_signal() {
        let body = r#"<div class="company-name">Acme</div><button>Apply</button>"#;
        let result = detector().detect(&page("https://acme.com/jobs/123", body)).unwrap();
        assert!(!result.is_job_page);
    }

    #[test]
    fn test_title_alone_is_not_enough() {
        let body = "<h1>Senior Engineer</h1><p>We build rockets.</p>";
        let result = detector().detect(&page("https://acme.com/jobs/123", body)).unwrap();
        assert!(!result.is_job_page);
    }

    #[test]
    fn test_apply_control_confirms() {
        let body = r#"<h1>Data Analyst</h1><a href="/submit" id="applyLink">Submit</a>"#;
        let result = detector()
            .detect(&page("https://www.indeed.com/viewjob?jk=abc123", body))
            .unwrap();
        assert!(result.is_job_page);
        assert_eq!(result.role.as_deref(), Some("Data Analyst"));
        assert_eq!(result.company.as_deref(), Some("Indeed"));
    }

    #[test]
    fn test_requisition_text_confirms() {
        let body = r#"<div class="job-title">Platform Engineer</div><p>Req ID: 48213</p>"#;
        let result = detector()
            .detect(&page("https://hr.example.net/JobDetail?id=77", body))
            .unwrap();
        assert!(result.is_job_page);
        assert_eq!(result.role.as_deref(), Some("Platform Engineer"));
        assert_eq!(result.company.as_deref(), Some("Hr"));
    }

    #[test]
    fn test_greenhouse_company_from_path_slug() {
        let body = "<h1>Backend Engineer</h1><button>Apply for this job</button>";
        let result = detector()
            .detect(&page("https://www.greenhouse.io/acme/jobs/55", body))
            .unwrap();
        assert!(result.is_job_page);
        assert_eq!(result.company.as_deref(), Some("Acme"));
    }

    #[test]
    fn test_company_from_url_fallbacks() {
        let cases = [
            ("https://www.greenhouse.io/acme/jobs/55", "Acme"),
            ("https://boards.greenhouse.io/widgets/jobs/1", "Widgets"),
            ("https://jobs.lever.co/hooli/0b7c5e4a-1f2d-4c3b-9a8e-123456789abc", "Hooli"),
            ("https://jobs.sap.com/job/Walldorf/1234/", "SAP"),
            ("https://www.sap.com/careers/detail/99", "SAP"),
            ("https://www.initech.com/careers/tps-analyst", "Initech"),
            ("https://careers.example.org/jobs/12", "Careers"),
        ];
        for (raw, expected) in cases {
            let url = Url::parse(raw).unwrap();
            assert_eq!(company_from_url(&url).as_deref(), Some(expected), "{}", raw);
        }
    }

    #[test]
    fn test_company_meta_and_microdata() {
        let body = r#"
            <h1>Designer</h1>
            <div itemprop="hiringOrganization"><meta itemprop="name" content="Globex"></div>
        "#;
        let result = detector()
            .detect(&page("https://acme.com/careers/product-designer", body))
            .unwrap();
        assert!(result.is_job_page);
        assert_eq!(result.company.as_deref(), Some("Globex"));

        let html = r#"<html><head><meta property="og:site_name" content="Umbrella Corp"></head>
            <body><h1>Chemist</h1></body></html>"#;
        let result = detector()
            .detect(&PageSnapshot::from_html("https://umbrella.com/jobs/7", html))
            .unwrap();
        assert!(result.is_job_page);
        assert_eq!(result.company.as_deref(), Some("Umbrella Corp"));
    }

    #[test]
    fn test_company_from_microdata_name_beside_address() {
        let body = r#"
            <h1>Product Designer</h1>
            <div itemprop="hiringOrganization">
                <span itemprop="name">Globex</span>
                <span itemprop="address">Berlin, Germany</span>
            </div>
        "#;
        let result = detector()
            .detect(&page("https://acme.com/careers/product-designer", body))
            .unwrap();
        assert!(result.is_job_page);
        assert_eq!(result.company.as_deref(), Some("Globex"));
    }

    #[test]
    fn test_organization_layout_wrapper_is_not_a_company() {
        let body = r#"
            <nav class="organization-menu">Products Solutions Pricing</nav>
            <h1>Support Engineer</h1>
            <button>Apply</button>
        "#;
        let result = detector()
            .detect(&page("https://www.initech.com/jobs/12", body))
            .unwrap();
        assert!(result.is_job_page);
        assert_eq!(result.company.as_deref(), Some("Initech"));
    }

    #[test]
    fn test_careers_index_with_embedded_posting_id() {
        let result = detector()
            .detect(&page("https://acme.com/careers?gh_jid=4455667", FULL_POSTING))
            .unwrap();
        assert!(result.is_job_page);
        assert_eq!(result.matched_rule.as_deref(), Some("greenhouse_embed"));
        assert_eq!(result.company.as_deref(), Some("Acme"));
    }

    #[test]
    fn test_role_from_meta_when_no_h1() {
        let html = r#"<html><head><meta property="og:title" content="QA Lead"></head>
            <body><span class="jobTitle">QA Lead (Remote)</span><button>Apply</button></body></html>"#;
        let result = detector()
            .detect(&PageSnapshot::from_html("https://acme.com/jobs/9", html))
            .unwrap();
        assert!(result.is_job_page);
        assert_eq!(result.role.as_deref(), Some("QA Lead"));
    }

    #[test]
    fn test_dashboard_self_exclusion() {
        let result = detector()
            .detect(&page("http://localhost:3000/jobs/123", FULL_POSTING))
            .unwrap();
        assert!(!result.is_job_page);
        assert!(result.is_beacon_dashboard);
    }

    #[test]
    fn test_classify_degrades_errors() {
        let result = detector().classify(&page("not a url", FULL_POSTING));
        assert!(!result.is_job_page);
        assert!(result.error.unwrap().contains("Invalid page URL"));
    }

    #[test]
    fn test_detection_json_shape() {
        let result = detector().detect(&page("https://acme.com/jobs/123", FULL_POSTING)).unwrap();
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["isJobPage"], true);
        assert_eq!(json["role"], "Senior Engineer");
        assert!(json.get("isBeaconDashboard").is_none());
        assert!(json.get("error").is_none());

        let not_job = serde_json::to_value(JobPageDetection::not_job(None)).unwrap();
        assert_eq!(not_job, serde_json::json!({ "isJobPage": false }));
    }

    #[test]
    fn test_snapshot_reads_document_title() {
        let snapshot = page("https://acme.com/jobs/1", "");
        assert_eq!(snapshot.title, "Careers");
    }

    #[test]
    fn test_capitalize_first() {
        assert_eq!(capitalize_first("acme"), "Acme");
        assert_eq!(capitalize_first("Acme"), "Acme");
        assert_eq!(capitalize_first(""), "");
    }

    #[test]
    #[ignore] // Requires network access
    fn test_fetch_page() {
        let snapshot = fetch_page("https://example.com/", 10).unwrap();
        assert!(!snapshot.html.is_empty());
    }
}
