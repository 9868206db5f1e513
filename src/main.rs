mod ai;
mod analytics;
mod config;
mod db;
mod detector;
mod duplicates;
mod models;
mod resume;
mod rules;
mod storage;
mod tui;

use anyhow::{anyhow, Context, Result};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use analytics::PipelineStats;
use config::Config;
use db::Database;
use detector::{Detector, DetectorConfig, PageSnapshot};
use duplicates::{DuplicateCandidate, DuplicateCheck};
use models::{ApplicationRecord, ApplicationUpdate, Milestone, NewApplication};
use storage::{ObjectStore, ResumeUpload};

#[derive(Parser)]
#[command(name = "beacon")]
#[command(about = "Job application tracker - detect postings, log applications, avoid duplicates")]
struct Cli {
    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database
    Init,

    /// Decide whether a page is a single job posting
    Detect {
        /// Page URL (fetched unless --file is given)
        #[arg(short, long)]
        url: String,

        /// Saved HTML of the page at --url
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Print the detection result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Record a new application
    Add {
        #[arg(short, long)]
        company: String,

        #[arg(short, long)]
        role: String,

        /// Job posting URL
        #[arg(short, long)]
        url: String,

        /// Application date (YYYY-MM-DD, defaults to today)
        #[arg(short, long)]
        date: Option<String>,

        /// A cover letter was sent
        #[arg(long)]
        cover_letter: bool,

        #[arg(short, long)]
        notes: Option<String>,

        /// Resume file to store with the application
        #[arg(long)]
        resume: Option<PathBuf>,

        /// Save even if a duplicate is found
        #[arg(long)]
        force: bool,
    },

    /// Check whether an application already exists
    CheckDuplicate {
        #[arg(short, long)]
        url: String,

        #[arg(short, long)]
        role: Option<String>,

        #[arg(short, long)]
        company: Option<String>,

        /// Print the check result as JSON
        #[arg(long)]
        json: bool,
    },

    /// List applications
    List {
        /// Filter by company
        #[arg(short, long)]
        company: Option<String>,
    },

    /// Show application details
    Show {
        /// Application ID
        id: String,
    },

    /// Edit application fields (an empty value clears an optional field)
    Update {
        /// Application ID
        id: String,

        #[arg(long)]
        company: Option<String>,

        #[arg(long)]
        role: Option<String>,

        #[arg(long)]
        url: Option<String>,

        #[arg(long)]
        notes: Option<String>,

        #[arg(long)]
        cover_letter: Option<bool>,

        #[arg(long)]
        date_applied: Option<String>,

        #[arg(long)]
        date_screening: Option<String>,

        #[arg(long)]
        date_interview: Option<String>,

        #[arg(long)]
        date_accepted: Option<String>,

        #[arg(long)]
        date_rejected: Option<String>,
    },

    /// Record a milestone date
    Mark {
        /// Application ID
        id: String,

        #[arg(value_enum)]
        milestone: Milestone,

        /// Milestone date (YYYY-MM-DD, defaults to today)
        #[arg(short, long)]
        date: Option<String>,
    },

    /// Delete an application and its stored resume
    Delete {
        /// Application ID
        id: String,
    },

    /// Pipeline statistics
    Stats,

    /// Open applications worth following up on
    FollowUps,

    /// Work with stored resumes
    Resume {
        #[command(subcommand)]
        command: ResumeCommands,
    },

    /// AI summary of an application
    Summarize {
        /// Application ID
        id: String,

        /// Model to use
        #[arg(short, long)]
        model: Option<String>,

        /// Save the summary as an insight
        #[arg(long)]
        save: bool,
    },

    /// Manage saved insights
    Insight {
        #[command(subcommand)]
        command: InsightCommands,
    },

    /// Ask the assistant a free-form question
    Ask {
        message: String,

        /// Model to use
        #[arg(short, long)]
        model: Option<String>,
    },

    /// Interactive application browser
    Browse {
        /// Filter by company
        #[arg(short, long)]
        company: Option<String>,
    },
}

#[derive(Subcommand)]
enum ResumeCommands {
    /// Print the text of an application's resume
    Show {
        /// Application ID
        id: String,
    },

    /// Compare the resumes of two applications
    Compare {
        /// Earlier application ID
        from: String,

        /// Later application ID
        to: String,

        /// Model to use
        #[arg(short, long)]
        model: Option<String>,
    },
}

#[derive(Subcommand)]
enum InsightCommands {
    /// Save an insight
    Add {
        #[arg(short, long)]
        company: String,

        #[arg(short, long)]
        role: String,

        #[arg(short, long)]
        summary: String,
    },

    /// List saved insights
    List,
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("beacon=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = Config::from_env()?;
    let db = Database::open(&config.database_path)?;
    info!(db = %config.database_path.display(), "beacon starting");

    match cli.command {
        Commands::Init => {
            db.init()?;
            println!("Database initialized at {}", db.path().display());
        }

        Commands::Detect { url, file, json } => {
            let page = match file {
                Some(path) => PageSnapshot::from_file(&path, &url)?,
                None => detector::fetch_page(&url, config.fetch_timeout_secs)?,
            };
            let detector = Detector::new(&DetectorConfig::from(&config))?;
            let detection = detector.classify(&page);

            if json {
                println!("{}", serde_json::to_string_pretty(&detection)?);
            } else if detection.is_beacon_dashboard {
                println!("Beacon dashboard - not a job posting.");
            } else if let Some(error) = &detection.error {
                println!("Not a job posting (detection failed: {}).", error);
            } else if detection.is_job_page {
                println!("Job posting detected");
                println!("Role:    {}", detection.role.as_deref().unwrap_or(detector::UNKNOWN_POSITION));
                println!("Company: {}", detection.company.as_deref().unwrap_or(detector::UNKNOWN_COMPANY));
                println!("URL:     {}", detection.url.as_deref().unwrap_or(&page.url));
                if let Some(rule) = &detection.matched_rule {
                    println!("Rule:    {}", rule);
                }
            } else {
                match &detection.matched_rule {
                    Some(rule) => println!("Not a job posting (excluded by {}).", rule),
                    None => println!("Not a job posting."),
                }
            }
        }

        Commands::Add {
            company,
            role,
            url,
            date,
            cover_letter,
            notes,
            resume,
            force,
        } => {
            db.ensure_initialized()?;
            let date_applied = date.as_deref().map(parse_date_arg).transpose()?;
            let app = NewApplication {
                company,
                role,
                job_url: url,
                did_cover_letter: cover_letter,
                notes,
                date_applied,
            };
            let store = ObjectStore::from_config(&config);
            add_application(&db, &store, &app, resume.as_deref(), force, today())?;
        }

        Commands::CheckDuplicate {
            url,
            role,
            company,
            json,
        } => {
            db.ensure_initialized()?;
            let check = duplicates::check_duplicate(
                &db,
                &DuplicateCandidate {
                    job_url: Some(url),
                    role,
                    company,
                },
                today(),
            );
            if json {
                println!("{}", serde_json::to_string_pretty(&check)?);
            } else if check.is_duplicate {
                print_duplicate(&check);
            } else if let Some(error) = &check.error {
                println!("No duplicate found (check failed: {}).", error);
            } else {
                println!("No duplicate found.");
            }
        }

        Commands::List { company } => {
            db.ensure_initialized()?;
            let applications = db.list_applications(company.as_deref())?;
            if applications.is_empty() {
                println!("No applications found.");
            } else {
                println!("{:<36} {:<11} {:<10} {:<28} {:<20} {:>3}", "ID", "APPLIED", "STAGE", "ROLE", "COMPANY", "CL");
                println!("{}", "-".repeat(113));
                for app in applications {
                    println!(
                        "{:<36} {:<11} {:<10} {:<28} {:<20} {:>3}",
                        app.application_id,
                        app.date_applied.as_deref().unwrap_or("-"),
                        app.stage().label(),
                        truncate(&app.role, 26),
                        truncate(&app.company, 18),
                        if app.did_cover_letter { "yes" } else { "" }
                    );
                }
            }
        }

        Commands::Show { id } => {
            db.ensure_initialized()?;
            match db.get_application(&id)? {
                Some(app) => print_application(&app),
                None => {
                    println!("Application {} not found.", id);
                }
            }
        }

        Commands::Update {
            id,
            company,
            role,
            url,
            notes,
            cover_letter,
            date_applied,
            date_screening,
            date_interview,
            date_accepted,
            date_rejected,
        } => {
            db.ensure_initialized()?;
            let update = ApplicationUpdate {
                company,
                role,
                job_url: url,
                did_cover_letter: cover_letter,
                notes,
                date_applied: optional_date_arg(date_applied)?,
                date_screening: optional_date_arg(date_screening)?,
                date_interview: optional_date_arg(date_interview)?,
                date_accepted: optional_date_arg(date_accepted)?,
                date_rejected: optional_date_arg(date_rejected)?,
            };
            if update.is_empty() {
                println!("Nothing to update.");
            } else if db.update_application(&id, &update)? {
                println!("Updated application {}", id);
            } else {
                println!("Application {} not found.", id);
            }
        }

        Commands::Mark { id, milestone, date } => {
            db.ensure_initialized()?;
            let date = match date {
                Some(d) => parse_date_arg(&d)?,
                None => today().format("%Y-%m-%d").to_string(),
            };
            let Some(app) = db.get_application(&id)? else {
                println!("Application {} not found.", id);
                return Ok(());
            };
            if let Some(previous) = app.milestone_date(milestone) {
                println!("Replacing previous {:?} date {}", milestone, previous);
            }
            db.set_milestone(&id, milestone, &date)?;
            println!("Marked {} as {:?} on {}", id, milestone, date);
        }

        Commands::Delete { id } => {
            db.ensure_initialized()?;
            if db.delete_application(&id)? {
                ObjectStore::from_config(&config).delete_application_objects(&id)?;
                println!("Deleted application {}", id);
            } else {
                println!("Application {} not found.", id);
            }
        }

        Commands::Stats => {
            db.ensure_initialized()?;
            let stats = PipelineStats::from_records(&db.list_applications(None)?);
            print_stats(&stats);
        }

        Commands::FollowUps => {
            db.ensure_initialized()?;
            let follow_ups = analytics::pending_follow_ups(&db.list_applications(None)?);
            if follow_ups.is_empty() {
                println!("No open applications.");
            } else {
                println!("{:<36} {:<28} {:<20} {:<10} {:<11}", "ID", "ROLE", "COMPANY", "LAST", "DATE");
                println!("{}", "-".repeat(109));
                for f in follow_ups {
                    println!(
                        "{:<36} {:<28} {:<20} {:<10} {:<11}",
                        f.application_id,
                        truncate(&f.role, 26),
                        truncate(&f.company, 18),
                        f.last_event,
                        f.last_event_date.as_deref().unwrap_or("-")
                    );
                }
            }
        }

        Commands::Resume { command } => {
            db.ensure_initialized()?;
            let store = ObjectStore::from_config(&config);
            match command {
                ResumeCommands::Show { id } => {
                    let app = load_application(&db, &id)?;
                    let text = resume_text(&store, &app)?;
                    println!("Resume for {} at {}", app.role, app.company);
                    println!("\n--- Content ---\n{}", text);
                }

                ResumeCommands::Compare { from, to, model } => {
                    let from_app = load_application(&db, &from)?;
                    let to_app = load_application(&db, &to)?;
                    let old_text = resume_text(&store, &from_app)?;
                    let new_text = resume_text(&store, &to_app)?;

                    let diff = resume::line_diff(&old_text, &new_text, 5);
                    println!("Added lines:");
                    for line in &diff.added {
                        println!("  + {}", truncate(line, 100));
                    }
                    println!("Removed lines:");
                    for line in &diff.removed {
                        println!("  - {}", truncate(line, 100));
                    }

                    let provider = provider_for(model.as_deref(), &config)?;
                    println!("\nAnalyzing with {}...", provider.model_name());
                    let prompt = resume::comparison_prompt(&from_app, &to_app, &old_text, &new_text);
                    let analysis = ai::compare_resumes(provider.as_ref(), &prompt)?;
                    println!("\n{}", textwrap::fill(&analysis, 90));
                }
            }
        }

        Commands::Summarize { id, model, save } => {
            db.ensure_initialized()?;
            let app = load_application(&db, &id)?;

            // A missing or unreadable resume only narrows the summary
            let resume = match &app.resume_url {
                Some(_) => match resume_text(&ObjectStore::from_config(&config), &app) {
                    Ok(text) => Some(text),
                    Err(e) => {
                        warn!(application_id = %id, error = %e, "resume unavailable for summary");
                        None
                    }
                },
                None => None,
            };

            let provider = provider_for(model.as_deref(), &config)?;
            let summary = ai::summarize_application(provider.as_ref(), &app, resume.as_deref())?;
            println!("{}", textwrap::fill(&summary, 90));

            if save {
                let insight = db.add_insight(&app.company, &app.role, &summary)?;
                println!("\nSaved insight {}", insight.insight_id);
            }
        }

        Commands::Insight { command } => {
            db.ensure_initialized()?;
            match command {
                InsightCommands::Add {
                    company,
                    role,
                    summary,
                } => {
                    let insight = db.add_insight(&company, &role, &summary)?;
                    println!("Saved insight {}", insight.insight_id);
                }

                InsightCommands::List => {
                    let insights = db.list_insights()?;
                    if insights.is_empty() {
                        println!("No insights saved yet.");
                    }
                    for insight in insights {
                        println!("{} at {} ({})", insight.role, insight.company, insight.created_at);
                        for line in textwrap::fill(&insight.summary, 86).lines() {
                            println!("    {}", line);
                        }
                        println!();
                    }
                }
            }
        }

        Commands::Ask { message, model } => {
            let provider = provider_for(model.as_deref(), &config)?;
            let reply = ai::ask(provider.as_ref(), &message)?;
            println!("{}", reply.trim());
        }

        Commands::Browse { company } => {
            db.ensure_initialized()?;
            tui::run_browse(&db, company.as_deref())?;
        }
    }

    Ok(())
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Normalizes a user-supplied date to `YYYY-MM-DD`.
fn parse_date_arg(value: &str) -> Result<String> {
    let date = NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .with_context(|| format!("Invalid date '{}'. Expected YYYY-MM-DD", value))?;
    Ok(date.format("%Y-%m-%d").to_string())
}

/// Like `parse_date_arg`, but an empty value passes through to clear the field.
fn optional_date_arg(value: Option<String>) -> Result<Option<String>> {
    match value {
        Some(v) if v.trim().is_empty() => Ok(Some(String::new())),
        Some(v) => parse_date_arg(&v).map(Some),
        None => Ok(None),
    }
}

/// Duplicate-checks, inserts and attaches the resume. Nothing is left behind
/// when the resume cannot be read or stored.
fn add_application(
    db: &Database,
    store: &ObjectStore,
    app: &NewApplication,
    resume: Option<&Path>,
    force: bool,
    today: NaiveDate,
) -> Result<String> {
    let upload = resume
        .map(|path| {
            ResumeUpload::read(path).with_context(|| format!("Failed to read resume {}", path.display()))
        })
        .transpose()?;

    let check = duplicates::check_duplicate(
        db,
        &DuplicateCandidate {
            job_url: Some(app.job_url.clone()),
            role: Some(app.role.clone()),
            company: Some(app.company.clone()),
        },
        today,
    );
    if let Some(error) = &check.error {
        eprintln!("Warning: duplicate check failed ({}); saving anyway.", error);
    }
    if check.is_duplicate {
        print_duplicate(&check);
        if !force {
            return Err(anyhow!("Not saved. Re-run with --force to save anyway."));
        }
        println!("Saving anyway (--force).");
    }

    let id = db.insert_application(app)?;

    if let Some(upload) = upload {
        let stored = store
            .put_resume(&id, &upload.file_name, &upload.bytes)
            .map_err(anyhow::Error::from)
            .and_then(|resume_url| {
                db.set_resume_url(&id, &resume_url)?;
                Ok(resume_url)
            });
        match stored {
            Ok(resume_url) => println!("Stored resume at {}", resume_url),
            Err(e) => {
                warn!(application_id = %id, error = %e, "resume upload failed, removing application");
                db.delete_application(&id)?;
                if let Err(cleanup) = store.delete_application_objects(&id) {
                    warn!(application_id = %id, error = %cleanup, "could not remove stored objects");
                }
                return Err(e.context(format!("Failed to store resume {}", upload.file_name)));
            }
        }
    }

    println!("Added application {}", id);
    Ok(id)
}

fn load_application(db: &Database, id: &str) -> Result<ApplicationRecord> {
    db.get_application(id)?
        .ok_or_else(|| anyhow!("Application {} not found", id))
}

fn resume_text(store: &ObjectStore, app: &ApplicationRecord) -> Result<String> {
    let url = app
        .resume_url
        .as_deref()
        .ok_or_else(|| anyhow!("Application {} has no resume", app.application_id))?;
    let object = store.get(url)?;
    resume::extract_text(&object)
}

fn provider_for(model: Option<&str>, config: &Config) -> Result<Box<dyn ai::AIProvider>> {
    let spec = ai::resolve_model(model.unwrap_or(&config.ai_model))?;
    debug!(model = %spec.short_name, "resolved model");
    ai::create_provider(&spec, config)
}

fn print_duplicate(check: &DuplicateCheck) {
    let kind = match check.match_type {
        Some(duplicates::MatchType::Url) => "same job URL",
        Some(duplicates::MatchType::RoleMonth) => "same role and company this month",
        None => "match",
    };
    println!("Possible duplicate ({}):", kind);
    if let Some(existing) = &check.existing_application {
        println!(
            "  {} at {} applied {} [{}]",
            existing.role,
            existing.company,
            existing.date_applied.as_deref().unwrap_or("-"),
            existing.application_id
        );
    }
}

fn print_application(app: &ApplicationRecord) {
    println!("Application {}", app.application_id);
    println!("Role: {}", app.role);
    println!("Company: {}", app.company);
    println!("Stage: {}", app.stage().label());
    println!("URL: {}", app.job_url);
    println!("Cover letter: {}", if app.did_cover_letter { "yes" } else { "no" });
    if let Some(resume) = &app.resume_url {
        println!("Resume: {}", resume);
    }
    let dates = [
        ("Applied", &app.date_applied),
        ("Screening", &app.date_screening),
        ("Interview", &app.date_interview),
        ("Accepted", &app.date_accepted),
        ("Rejected", &app.date_rejected),
    ];
    for (label, date) in dates {
        if let Some(date) = date {
            println!("{}: {}", label, date);
        }
    }
    println!("Created: {}", app.created_at);
    println!("Updated: {}", app.updated_at);
    if let Some(notes) = &app.notes {
        println!("\n--- Notes ---\n{}", notes);
    }
}

fn print_stats(stats: &PipelineStats) {
    println!("Applications:      {}", stats.total);
    println!("  with cover letter:    {}", stats.with_cover_letter);
    println!("  without cover letter: {}", stats.without_cover_letter);
    println!();
    println!("{:<12} {:>6}", "STAGE", "COUNT");
    println!("{}", "-".repeat(19));
    for (label, n) in [
        ("screening", stats.screening),
        ("interview", stats.interviews),
        ("offer", stats.offers),
        ("rejected", stats.rejections),
        ("pending", stats.pending),
    ] {
        println!("{:<12} {:>6}", label, n);
    }

    println!();
    println!("{:<12} {:>10} {:>10}", "RATE", "WITH CL", "WITHOUT");
    println!("{}", "-".repeat(34));
    let (cl, no_cl) = (&stats.cover_letter_rates, &stats.no_cover_letter_rates);
    println!("{:<12} {:>9.1}% {:>9.1}%", "screening", cl.screening, no_cl.screening);
    println!("{:<12} {:>9.1}% {:>9.1}%", "interview", cl.interview, no_cl.interview);
    println!("{:<12} {:>9.1}% {:>9.1}%", "offer", cl.offer, no_cl.offer);

    println!();
    let days = |d: Option<f64>| d.map(|d| format!("{} days", d.round())).unwrap_or_else(|| "-".to_string());
    println!("Avg. time to screening: {}", days(stats.avg_days_to_screening));
    println!("Avg. time to interview: {}", days(stats.avg_days_to_interview));

    if !stats.top_companies.is_empty() {
        println!();
        println!("{:<30} {:>6}", "TOP COMPANIES", "APPS");
        println!("{}", "-".repeat(37));
        for (company, n) in &stats.top_companies {
            println!("{:<30} {:>6}", truncate(company, 28), n);
        }
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_date_arg() {
        assert_eq!(parse_date_arg("2025-10-16").unwrap(), "2025-10-16");
        assert_eq!(parse_date_arg(" 2025-1-6 ").unwrap(), "2025-01-06");
        assert!(parse_date_arg("10/16/2025").is_err());
        assert!(parse_date_arg("2025-02-30").is_err());
    }

    #[test]
    fn test_optional_date_arg_clears_on_empty() {
        assert_eq!(optional_date_arg(None).unwrap(), None);
        assert_eq!(optional_date_arg(Some("".to_string())).unwrap(), Some(String::new()));
        assert_eq!(
            optional_date_arg(Some("2025-10-01".to_string())).unwrap(),
            Some("2025-10-01".to_string())
        );
        assert!(optional_date_arg(Some("soon".to_string())).is_err());
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("Acme", 10), "Acme");
        assert_eq!(truncate("Staff Software Engineer", 10), "Staff S...");
        assert_eq!(truncate("Ingénieur logiciel", 8), "Ingén...");
    }

    fn add_fixture() -> (tempfile::TempDir, Database, ObjectStore) {
        let dir = tempfile::TempDir::new().unwrap();
        let db = Database::open_in_memory().unwrap();
        db.init().unwrap();
        let store = ObjectStore::new(dir.path().join("objects"), "job-applications-storage");
        (dir, db, store)
    }

    fn new_app() -> NewApplication {
        NewApplication {
            company: "Acme".to_string(),
            role: "Engineer".to_string(),
            job_url: "https://acme.com/jobs/1".to_string(),
            ..Default::default()
        }
    }

    fn today_for_tests() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 10, 16).unwrap()
    }

    #[test]
    fn test_add_with_unreadable_resume_saves_nothing() {
        let (dir, db, store) = add_fixture();
        let missing = dir.path().join("missing.pdf");

        let result = add_application(&db, &store, &new_app(), Some(&missing), false, today_for_tests());
        assert!(result.unwrap_err().to_string().contains("Failed to read resume"));
        assert!(db.list_applications(None).unwrap().is_empty());

        // The retry is not blocked as a duplicate
        let resume = dir.path().join("cv.txt");
        std::fs::write(&resume, b"Rust engineer").unwrap();
        let id = add_application(&db, &store, &new_app(), Some(&resume), false, today_for_tests()).unwrap();
        let stored = db.get_application(&id).unwrap().unwrap();
        let resume_url = stored.resume_url.unwrap();
        assert!(resume_url.ends_with(&format!("{}/resume-cv.txt", id)));
        assert_eq!(store.get(&resume_url).unwrap().bytes, b"Rust engineer");
    }

    #[test]
    fn test_add_rolls_back_when_resume_cannot_be_stored() {
        let (dir, db, store) = add_fixture();
        // Readable, but a backslash is not a valid object key
        let resume = dir.path().join("cv\\draft.txt");
        std::fs::write(&resume, b"draft").unwrap();

        let result = add_application(&db, &store, &new_app(), Some(&resume), false, today_for_tests());
        assert!(result.is_err());
        assert!(db.list_applications(None).unwrap().is_empty());
    }

    #[test]
    fn test_add_refuses_duplicate_unless_forced() {
        let (_dir, db, store) = add_fixture();
        add_application(&db, &store, &new_app(), None, false, today_for_tests()).unwrap();

        let result = add_application(&db, &store, &new_app(), None, false, today_for_tests());
        assert!(result.unwrap_err().to_string().contains("--force"));
        assert_eq!(db.list_applications(None).unwrap().len(), 1);

        add_application(&db, &store, &new_app(), None, true, today_for_tests()).unwrap();
        assert_eq!(db.list_applications(None).unwrap().len(), 2);
    }

    #[test]
    fn test_cli_parses_add() {
        let cli = Cli::try_parse_from([
            "beacon", "add", "--company", "Acme", "--role", "Engineer", "--url",
            "https://acme.com/jobs/1", "--cover-letter",
        ])
        .unwrap();
        match cli.command {
            Commands::Add { company, cover_letter, force, .. } => {
                assert_eq!(company, "Acme");
                assert!(cover_letter);
                assert!(!force);
            }
            _ => panic!("expected add"),
        }
    }

    #[test]
    fn test_cli_parses_mark_milestone() {
        let cli = Cli::try_parse_from(["beacon", "mark", "abc", "interview", "--date", "2025-10-09"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Mark { milestone: Milestone::Interview, .. }
        ));
    }
}
