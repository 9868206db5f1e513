use anyhow::Result;
use chrono::Local;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
};
use std::io::stdout;

use crate::db::Database;
use crate::models::{ApplicationRecord, Milestone, Stage};

struct AppState {
    applications: Vec<ApplicationRecord>,
    selected: usize,
    scroll_offset: u16,
    message: Option<String>,
}

impl AppState {
    fn new(applications: Vec<ApplicationRecord>) -> Self {
        Self {
            applications,
            selected: 0,
            scroll_offset: 0,
            message: None,
        }
    }

    fn current(&self) -> Option<&ApplicationRecord> {
        self.applications.get(self.selected)
    }

    fn next(&mut self) {
        if !self.applications.is_empty() && self.selected < self.applications.len() - 1 {
            self.selected += 1;
            self.scroll_offset = 0;
        }
    }

    fn prev(&mut self) {
        if self.selected > 0 {
            self.selected -= 1;
            self.scroll_offset = 0;
        }
    }

    fn scroll_down(&mut self) {
        self.scroll_offset = self.scroll_offset.saturating_add(3);
    }

    fn scroll_up(&mut self) {
        self.scroll_offset = self.scroll_offset.saturating_sub(3);
    }

    /// Mirrors a stored milestone into the in-memory list.
    fn record_milestone(&mut self, milestone: Milestone, date: &str) {
        let Some(app) = self.applications.get_mut(self.selected) else { return };
        let slot = match milestone {
            Milestone::Screening => &mut app.date_screening,
            Milestone::Interview => &mut app.date_interview,
            Milestone::Accepted => &mut app.date_accepted,
            Milestone::Rejected => &mut app.date_rejected,
        };
        *slot = Some(date.to_string());
    }

    fn mark(&mut self, db: &Database, milestone: Milestone) {
        let Some(id) = self.current().map(|a| a.application_id.clone()) else { return };
        let today = Local::now().date_naive().format("%Y-%m-%d").to_string();
        match db.set_milestone(&id, milestone, &today) {
            Ok(true) => {
                self.record_milestone(milestone, &today);
                self.message = Some(format!("Marked {:?} on {}", milestone, today));
            }
            Ok(false) => self.message = Some(format!("Application {} no longer exists", id)),
            Err(e) => self.message = Some(format!("Update failed: {:#}", e)),
        }
    }
}

pub fn run_browse(db: &Database, company: Option<&str>) -> Result<()> {
    let applications = db.list_applications(company)?;
    if applications.is_empty() {
        println!("No applications found.");
        return Ok(());
    }

    let mut state = AppState::new(applications);

    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let result = run_loop(&mut terminal, &mut state, db);

    // Restore terminal
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    result
}

fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    state: &mut AppState,
    db: &Database,
) -> Result<()> {
    let mut list_state = ListState::default();
    list_state.select(Some(0));

    loop {
        terminal.draw(|frame| draw(frame, state, &mut list_state))?;

        if let Event::Key(key) = event::read()? {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            let prev_selected = state.selected;
            match key.code {
                KeyCode::Char('q') | KeyCode::Esc => break,
                KeyCode::Down | KeyCode::Char('j') => state.next(),
                KeyCode::Up | KeyCode::Char('k') => state.prev(),
                KeyCode::Char('J') | KeyCode::PageDown => state.scroll_down(),
                KeyCode::Char('K') | KeyCode::PageUp => state.scroll_up(),
                KeyCode::Char('s') => state.mark(db, Milestone::Screening),
                KeyCode::Char('i') => state.mark(db, Milestone::Interview),
                KeyCode::Char('o') => state.mark(db, Milestone::Accepted),
                KeyCode::Char('x') => state.mark(db, Milestone::Rejected),
                _ => {}
            }
            if state.selected != prev_selected {
                list_state.select(Some(state.selected));
                state.message = None;
            }
        }
    }
    Ok(())
}

fn stage_style(stage: Stage) -> Style {
    match stage {
        Stage::Applied => Style::default().fg(Color::Green),
        Stage::Screening => Style::default().fg(Color::Yellow),
        Stage::Interview => Style::default().fg(Color::Cyan),
        Stage::Accepted => Style::default().fg(Color::Magenta),
        Stage::Rejected => Style::default().fg(Color::Red),
    }
}

fn stage_icon(stage: Stage) -> &'static str {
    match stage {
        Stage::Applied => " ",
        Stage::Screening => "s",
        Stage::Interview => "i",
        Stage::Accepted => "+",
        Stage::Rejected => "x",
    }
}

fn draw(frame: &mut Frame, state: &AppState, list_state: &mut ListState) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(35),
            Constraint::Percentage(65),
        ])
        .split(frame.area());

    // Left panel: application list
    let items: Vec<ListItem> = state
        .applications
        .iter()
        .map(|app| {
            let role = if app.role.chars().count() > 30 {
                format!("{}...", app.role.chars().take(27).collect::<String>())
            } else {
                app.role.clone()
            };
            ListItem::new(format!(
                "{} {} {} | {}",
                stage_icon(app.stage()),
                app.date_applied.as_deref().unwrap_or("          "),
                role,
                app.company
            ))
        })
        .collect();

    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title(format!(
            " Applications ({}) ", state.applications.len()
        )))
        .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
        .highlight_symbol("> ");

    frame.render_stateful_widget(list, chunks[0], list_state);

    // Right panel: application detail
    let detail = build_detail(state);
    let detail_widget = Paragraph::new(detail)
        .block(Block::default().borders(Borders::ALL).title(" Detail "))
        .wrap(Wrap { trim: false })
        .scroll((state.scroll_offset, 0));

    frame.render_widget(detail_widget, chunks[1]);

    // Footer help
    let help_area = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(1)])
        .split(frame.area());

    let footer = match &state.message {
        Some(message) => format!(" {}", message),
        None => " j/k:navigate  J/K:scroll  s:screening i:interview o:offer x:rejected  q:quit".to_string(),
    };
    let help = Paragraph::new(footer).style(Style::default().fg(Color::DarkGray));
    frame.render_widget(help, help_area[1]);
}

fn build_detail<'a>(state: &'a AppState) -> Text<'a> {
    let Some(app) = state.current() else {
        return Text::raw("No application selected");
    };

    let mut lines: Vec<Line> = Vec::new();

    // Header
    lines.push(Line::from(Span::styled(
        &app.role,
        Style::default().add_modifier(Modifier::BOLD),
    )));
    lines.push(Line::from(format!("at {}", app.company)));

    let stage = app.stage();
    lines.push(Line::from(Span::styled(
        format!("Stage: {}", stage.label()),
        stage_style(stage),
    )));

    if !app.job_url.is_empty() {
        lines.push(Line::from(format!("URL: {}", app.job_url)));
    }
    if let Some(resume) = &app.resume_url {
        lines.push(Line::from(format!("Resume: {}", resume)));
    }
    lines.push(Line::from(format!(
        "Cover letter: {}",
        if app.did_cover_letter { "yes" } else { "no" }
    )));
    lines.push(Line::from(Span::styled(
        format!("ID: {}", app.application_id),
        Style::default().fg(Color::DarkGray),
    )));

    lines.push(Line::from(""));

    // Timeline
    lines.push(Line::from(Span::styled(
        "TIMELINE",
        Style::default().add_modifier(Modifier::BOLD),
    )));
    let timeline = [
        ("Applied", app.date_applied.as_deref()),
        ("Screening", app.date_screening.as_deref()),
        ("Interview", app.date_interview.as_deref()),
        ("Accepted", app.date_accepted.as_deref()),
        ("Rejected", app.date_rejected.as_deref()),
    ];
    for (label, date) in timeline {
        match date {
            Some(date) => lines.push(Line::from(format!("  {:<10} {}", label, date))),
            None => lines.push(Line::from(Span::styled(
                format!("  {:<10} -", label),
                Style::default().fg(Color::DarkGray),
            ))),
        }
    }

    lines.push(Line::from(""));

    // Notes
    match app.notes.as_deref().filter(|n| !n.trim().is_empty()) {
        Some(notes) => {
            lines.push(Line::from(Span::styled(
                "NOTES",
                Style::default().add_modifier(Modifier::BOLD),
            )));
            for line in textwrap::fill(notes, 70).lines() {
                lines.push(Line::from(format!("  {}", line)));
            }
        }
        None => lines.push(Line::from(Span::styled(
            "(No notes)",
            Style::default().fg(Color::DarkGray),
        ))),
    }

    Text::from(lines)
}
