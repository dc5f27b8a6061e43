// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use crossterm::{execute, terminal};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, Wrap};
use sheetsage_app::{
    ColumnSpec, DatasetHandle, DatasetId, Operation, QueryRequest, Record, Rendering,
    ResponsePayload, ServiceError, Session, SessionError, UploadTarget, render_payload,
    table_cells,
};
use std::io;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};

const STATUS_CLEAR_AFTER: Duration = Duration::from_secs(4);
const CURSOR: &str = "▏";
const KEY_HINTS: &str = "tab switch field | enter submit | f1 help | esc quit";
const UPLOAD_MIN_HEIGHT: u16 = 4;
const BLOCK_MAX_HEIGHT: u16 = 8;

/// Everything the terminal front end needs from the outside world.
///
/// `spawn_*` run the request and report back through `tx`. The defaults run
/// synchronously on the caller's thread; a runtime backed by a real network
/// client overrides them to keep the UI responsive.
pub trait AppRuntime {
    /// Turns what the user typed into an upload candidate.
    fn select_path(&mut self, raw: &str) -> Result<UploadTarget>;
    fn upload(&mut self, target: &UploadTarget) -> Result<DatasetHandle, ServiceError>;
    fn query(
        &mut self,
        dataset: &DatasetId,
        question: &str,
    ) -> Result<ResponsePayload, ServiceError>;

    fn spawn_upload(&mut self, target: UploadTarget, tx: Sender<InternalEvent>) -> Result<()> {
        let outcome = self.upload(&target);
        tx.send(InternalEvent::UploadFinished(outcome))
            .map_err(|_| anyhow!("upload event channel closed"))?;
        Ok(())
    }

    fn spawn_query(&mut self, request: QueryRequest, tx: Sender<InternalEvent>) -> Result<()> {
        let outcome = self.query(&request.dataset, &request.question);
        tx.send(InternalEvent::QueryFinished(outcome))
            .map_err(|_| anyhow!("query event channel closed"))?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum InternalEvent {
    ClearStatus { token: u64 },
    UploadFinished(Result<DatasetHandle, ServiceError>),
    QueryFinished(Result<ResponsePayload, ServiceError>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum Focus {
    #[default]
    File,
    Query,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
struct ViewData {
    focus: Focus,
    path_input: String,
    help_visible: bool,
    status_token: u64,
}

pub fn run_app<R: AppRuntime>(session: &mut Session, runtime: &mut R) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, terminal::EnterAlternateScreen).context("enter alternate screen")?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;

    let mut view_data = ViewData::default();
    let (internal_tx, internal_rx) = mpsc::channel();

    let mut result = Ok(());
    loop {
        process_internal_events(session, &mut view_data, &internal_tx, &internal_rx);

        if let Err(error) = terminal.draw(|frame| render(frame, session, &view_data)) {
            result = Err(error).context("draw frame");
            break;
        }

        let has_event = match event::poll(Duration::from_millis(120)).context("poll event") {
            Ok(has_event) => has_event,
            Err(error) => {
                result = Err(error);
                break;
            }
        };
        if !has_event {
            continue;
        }
        match event::read().context("read event") {
            Ok(Event::Key(key)) => {
                if handle_key_event(session, runtime, &mut view_data, &internal_tx, key) {
                    break;
                }
            }
            Ok(_) => {}
            Err(error) => {
                result = Err(error);
                break;
            }
        }
    }

    disable_raw_mode().context("disable raw mode")?;
    execute!(io::stdout(), terminal::LeaveAlternateScreen).context("leave alternate screen")?;
    result
}

fn process_internal_events(
    session: &mut Session,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    rx: &Receiver<InternalEvent>,
) {
    while let Ok(event) = rx.try_recv() {
        match event {
            InternalEvent::ClearStatus { token } if token == view_data.status_token => {
                session.clear_notice();
            }
            InternalEvent::ClearStatus { .. } => {}
            InternalEvent::UploadFinished(outcome) => match session.complete_upload(outcome) {
                Ok(handle) => {
                    info!(dataset = %handle.id, sheets = handle.sheets.len(), "dataset ready");
                    view_data.focus = Focus::Query;
                    arm_status_clear(view_data, tx);
                }
                Err(error) => warn!(%error, "upload did not complete"),
            },
            InternalEvent::QueryFinished(outcome) => match session.complete_query(outcome) {
                Ok(answer) => debug!(
                    kind = answer
                        .data
                        .as_ref()
                        .and_then(|data| data.kind())
                        .unwrap_or("none"),
                    "answer stored"
                ),
                Err(error) => warn!(%error, "query did not complete"),
            },
        }
    }
}

fn schedule_status_clear(internal_tx: &Sender<InternalEvent>, token: u64) {
    let sender = internal_tx.clone();
    thread::spawn(move || {
        thread::sleep(STATUS_CLEAR_AFTER);
        let _ = sender.send(InternalEvent::ClearStatus { token });
    });
}

fn arm_status_clear(view_data: &mut ViewData, internal_tx: &Sender<InternalEvent>) {
    view_data.status_token = view_data.status_token.saturating_add(1);
    schedule_status_clear(internal_tx, view_data.status_token);
}

fn emit_status(
    session: &mut Session,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    message: impl Into<String>,
) {
    session.notify(message);
    arm_status_clear(view_data, internal_tx);
}

/// Returns true when the app should quit.
fn handle_key_event<R: AppRuntime>(
    session: &mut Session,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) -> bool {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return true;
    }
    if view_data.help_visible {
        view_data.help_visible = false;
        return false;
    }

    match key.code {
        KeyCode::Esc => return true,
        KeyCode::F(1) => view_data.help_visible = true,
        KeyCode::Tab | KeyCode::BackTab => toggle_focus(session, view_data, internal_tx),
        KeyCode::Enter => match view_data.focus {
            Focus::File => submit_path(session, runtime, view_data, internal_tx),
            Focus::Query => start_query(session, runtime, internal_tx),
        },
        KeyCode::Backspace => edit_focused(session, view_data, None),
        KeyCode::Char(ch)
            if !key
                .modifiers
                .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) =>
        {
            edit_focused(session, view_data, Some(ch));
        }
        _ => {}
    }
    false
}

fn toggle_focus(session: &mut Session, view_data: &mut ViewData, tx: &Sender<InternalEvent>) {
    match view_data.focus {
        Focus::File if session.dataset().is_none() => {
            emit_status(session, view_data, tx, "upload a spreadsheet before asking");
        }
        Focus::File => view_data.focus = Focus::Query,
        Focus::Query => view_data.focus = Focus::File,
    }
}

/// `None` deletes the last character.
fn edit_focused(session: &mut Session, view_data: &mut ViewData, ch: Option<char>) {
    match view_data.focus {
        Focus::File => match ch {
            Some(ch) => view_data.path_input.push(ch),
            None => {
                view_data.path_input.pop();
            }
        },
        Focus::Query => {
            if !session.can_edit_query() {
                return;
            }
            let mut query = session.query().to_owned();
            match ch {
                Some(ch) => query.push(ch),
                None => {
                    query.pop();
                }
            }
            session.set_query(query);
        }
    }
}

fn submit_path<R: AppRuntime>(
    session: &mut Session,
    runtime: &mut R,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
) {
    if session.is_busy() {
        return;
    }
    let raw = view_data.path_input.trim().to_owned();
    if !raw.is_empty() {
        match runtime.select_path(&raw) {
            Ok(target) => {
                debug!(file = target.file_name(), bytes = target.size(), "file selected");
                session.select_file(target);
            }
            Err(error) => {
                emit_status(session, view_data, tx, format!("cannot select file: {error:#}"));
                return;
            }
        }
    }
    start_upload(session, runtime, tx);
}

fn start_upload<R: AppRuntime>(session: &mut Session, runtime: &mut R, tx: &Sender<InternalEvent>) {
    let target = match session.begin_upload() {
        Ok(target) => target,
        Err(SessionError::Busy(_)) => return,
        Err(error) => {
            warn!(%error, "upload refused");
            return;
        }
    };

    info!(file = target.file_name(), "upload started");
    if let Err(error) = runtime.spawn_upload(target, tx.clone()) {
        let _ = session.complete_upload(Err(ServiceError::transport(format!("{error:#}"))));
    }
}

fn start_query<R: AppRuntime>(session: &mut Session, runtime: &mut R, tx: &Sender<InternalEvent>) {
    let request = match session.begin_query() {
        Ok(request) => request,
        Err(SessionError::Busy(_)) => return,
        Err(error) => {
            warn!(%error, "query refused");
            return;
        }
    };

    info!(dataset = %request.dataset, "query started");
    if let Err(error) = runtime.spawn_query(request, tx.clone()) {
        let _ = session.complete_query(Err(ServiceError::transport(format!("{error:#}"))));
    }
}

fn render(frame: &mut ratatui::Frame<'_>, session: &Session, view_data: &ViewData) {
    let width = frame.area().width;
    let upload_text = render_upload_text(session, view_data);
    let upload_height = bordered_height(&upload_text, width).max(UPLOAD_MIN_HEIGHT);
    let error_text = (!session.error_message().is_empty())
        .then(|| format!("Error! {}", session.error_message()));
    let error_height = error_text
        .as_deref()
        .map_or(0, |text| bordered_height(text, width));
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(upload_height),
            Constraint::Length(4),
            Constraint::Length(error_height),
            Constraint::Min(3),
            Constraint::Length(1),
        ])
        .split(frame.area());

    let upload = Paragraph::new(upload_text)
        .wrap(Wrap { trim: true })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("1. Upload Excel Data")
                .border_style(focus_style(view_data.focus == Focus::File)),
        );
    frame.render_widget(upload, layout[0]);

    let query = Paragraph::new(render_query_text(session, view_data)).block(
        Block::default()
            .borders(Borders::ALL)
            .title("2. Ask a Business Question")
            .border_style(focus_style(view_data.focus == Focus::Query)),
    );
    frame.render_widget(query, layout[1]);

    if let Some(error_text) = error_text {
        let error = Paragraph::new(error_text)
            .style(Style::default().fg(Color::Red))
            .wrap(Wrap { trim: true })
            .block(Block::default().borders(Borders::ALL));
        frame.render_widget(error, layout[2]);
    }

    render_response(frame, layout[3], session);

    let status = Paragraph::new(status_text(session)).style(Style::default().fg(Color::Yellow));
    frame.render_widget(status, layout[4]);

    if view_data.help_visible {
        let area = centered_rect(60, 40, frame.area());
        frame.render_widget(Clear, area);
        let help = Paragraph::new(help_overlay_text())
            .block(Block::default().borders(Borders::ALL).title("help"));
        frame.render_widget(help, area);
    }
}

fn render_response(frame: &mut ratatui::Frame<'_>, area: Rect, session: &Session) {
    let block = Block::default().borders(Borders::ALL).title("Insights");
    let Some(answer) = session.response() else {
        let hint = Paragraph::new("answers to your questions show up here").block(block);
        frame.render_widget(hint, area);
        return;
    };

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let summary = Paragraph::new(answer.text_summary.as_str()).wrap(Wrap { trim: true });
    let summary_height = u16::try_from(summary.line_count(inner.width)).unwrap_or(u16::MAX);
    let parts = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(summary_height),
            Constraint::Length(1),
            Constraint::Min(1),
        ])
        .split(inner);

    frame.render_widget(summary, parts[0]);

    match render_payload(answer.data.as_ref()) {
        None => {}
        Some(Rendering::Table { rows, columns }) => {
            frame.render_widget(table_widget(rows, columns), parts[2]);
        }
        Some(Rendering::Line(line)) => {
            let summary = Paragraph::new(line).style(
                Style::default()
                    .fg(Color::Green)
                    .add_modifier(Modifier::BOLD),
            );
            frame.render_widget(summary, parts[2]);
        }
        Some(rendering @ Rendering::VisualizationError(_)) => {
            let error =
                Paragraph::new(rendering.to_text()).style(Style::default().fg(Color::Red));
            frame.render_widget(error, parts[2]);
        }
        Some(rendering @ Rendering::Unsupported(_)) => {
            let notice = Paragraph::new(rendering.to_text())
                .style(Style::default().fg(Color::DarkGray));
            frame.render_widget(notice, parts[2]);
        }
    }
}

fn table_widget(rows: &[Record], columns: &[ColumnSpec]) -> Table<'static> {
    let header = Row::new(
        columns
            .iter()
            .map(|column| Cell::from(column.label.clone()))
            .collect::<Vec<_>>(),
    )
    .style(Style::default().add_modifier(Modifier::BOLD));
    let body = table_cells(rows, columns)
        .into_iter()
        .map(|cells| Row::new(cells.into_iter().map(Cell::from).collect::<Vec<_>>()))
        .collect::<Vec<_>>();
    let widths = vec![Constraint::Min(8); columns.len().max(1)];
    Table::new(body, widths).header(header).column_spacing(2)
}

/// Rows a bordered, word-wrapped paragraph of `text` needs in a block
/// `width` columns wide, capped at `BLOCK_MAX_HEIGHT`.
fn bordered_height(text: &str, width: u16) -> u16 {
    let inner_width = width.saturating_sub(2).max(1);
    let lines = Paragraph::new(text)
        .wrap(Wrap { trim: true })
        .line_count(inner_width);
    u16::try_from(lines)
        .unwrap_or(u16::MAX)
        .saturating_add(2)
        .min(BLOCK_MAX_HEIGHT)
}

fn focus_style(focused: bool) -> Style {
    if focused {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default()
    }
}

fn render_upload_text(session: &Session, view_data: &ViewData) -> String {
    let cursor = if view_data.focus == Focus::File && !session.is_busy() {
        CURSOR
    } else {
        ""
    };
    let detail = if session.in_flight() == Some(Operation::Upload) {
        Operation::Upload.busy_label().to_owned()
    } else if let Some(handle) = session.dataset() {
        let mut ready = format!("✅ File Ready for Querying (ID: {}...)", handle.id.short());
        if !handle.sheets.is_empty() {
            ready.push_str("\nsheets: ");
            ready.push_str(&handle.sheets.join(", "));
        }
        ready
    } else if let Some(target) = session.upload_target() {
        format!(
            "selected {} ({} bytes) | enter: Upload & Process Excel",
            target.file_name(),
            target.size()
        )
    } else {
        "type the path to an .xlsx or .xls file | enter: Upload & Process Excel".to_owned()
    };
    format!("path: {}{cursor}\n{detail}", view_data.path_input)
}

fn render_query_text(session: &Session, view_data: &ViewData) -> String {
    if session.dataset().is_none() {
        return "upload a spreadsheet to ask a question about it".to_owned();
    }
    let cursor = if view_data.focus == Focus::Query && session.can_edit_query() {
        CURSOR
    } else {
        ""
    };
    let detail = if session.in_flight() == Some(Operation::Query) {
        Operation::Query.busy_label()
    } else if session.can_query() {
        "enter: Get Insights"
    } else {
        "e.g. What is the total revenue for the West region?"
    };
    format!("> {}{cursor}\n{detail}", session.query())
}

fn status_text(session: &Session) -> String {
    session.notice().unwrap_or(KEY_HINTS).to_owned()
}

fn help_overlay_text() -> &'static str {
    "tab/shift+tab: switch between file and question\n\
enter (file): select the typed path and upload it\n\
enter (question): ask the uploaded dataset\n\
backspace: delete a character\n\
f1: help | esc or ctrl+c: quit\n\
any key: close help"
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}
