use std::io::{self, Stdout};
use std::time::{Duration, Instant};

use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
    KeyModifiers,
};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};
use ratatui::{Frame, Terminal};
use rowscope_adapters::{open_backend, probe, AdapterError};
use rowscope_core::config::ConnectionProfile;
use rowscope_core::probe::ProbeStatus;
use rowscope_core::query_runner::QueryBackend;
use rowscope_core::result_filter::FilteredList;
use rowscope_core::results::NULL_SENTINEL;
use rowscope_core::session::{PendingDelete, SchemaView, Screen, Session, SessionError, SessionState};
use thiserror::Error;
use tokio::runtime::{Builder, Runtime};
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tracing::{debug, info};

const TICK_RATE: Duration = Duration::from_millis(120);

#[derive(Debug, Error)]
pub enum TuiError {
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
    #[error(transparent)]
    Adapter(#[from] AdapterError),
}

/// Where typed characters go. Field edits are driven by the session state
/// instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InputMode {
    Normal,
    Query,
    ResultSearch,
    ListSearch,
    SchemaSearch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KeyMode {
    Navigate,
    Typing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DirectionKey {
    Up,
    Down,
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Msg {
    Quit,
    ToggleHelp,
    ToggleRowDetail,
    Back,
    Submit,
    EditQuery,
    BeginSearch,
    BeginEdit,
    SetNull,
    Delete,
    Confirm,
    Cancel,
    InspectSchema,
    Navigate(DirectionKey),
    Input(char),
    Backspace,
    Tick,
}

struct TuiApp<B: QueryBackend> {
    session: Session<B>,
    profile_name: String,
    probe: ProbeStatus,
    probe_updates: Option<UnboundedReceiver<ProbeStatus>>,
    mode: InputMode,
    query_input: String,
    search_input: String,
    show_help: bool,
    show_row_detail: bool,
    should_quit: bool,
}

impl<B: QueryBackend> TuiApp<B> {
    fn new(session: Session<B>, profile_name: impl Into<String>) -> Self {
        let mode = if session.screen() == Screen::Query {
            InputMode::Query
        } else {
            InputMode::Normal
        };
        Self {
            session,
            profile_name: profile_name.into(),
            probe: ProbeStatus::default(),
            probe_updates: None,
            mode,
            query_input: String::new(),
            search_input: String::new(),
            show_help: false,
            show_row_detail: false,
            should_quit: false,
        }
    }

    fn with_probe_updates(mut self, updates: UnboundedReceiver<ProbeStatus>) -> Self {
        self.probe_updates = Some(updates);
        self
    }

    fn key_mode(&self) -> KeyMode {
        if self.mode != InputMode::Normal
            || matches!(self.session.state(), SessionState::FieldEditing(_))
        {
            KeyMode::Typing
        } else {
            KeyMode::Navigate
        }
    }

    async fn handle(&mut self, msg: Msg) {
        let outcome = match msg {
            Msg::Quit => {
                self.should_quit = true;
                Ok(())
            }
            Msg::ToggleHelp => {
                self.show_help = !self.show_help;
                Ok(())
            }
            Msg::ToggleRowDetail => {
                self.show_row_detail =
                    !self.show_row_detail && self.session.selected_row().is_some();
                Ok(())
            }
            Msg::Tick => {
                self.on_tick();
                Ok(())
            }
            Msg::Input(character) => {
                self.input(character);
                Ok(())
            }
            Msg::Backspace => {
                self.backspace();
                Ok(())
            }
            Msg::SetNull => {
                self.session.set_field_null();
                Ok(())
            }
            Msg::EditQuery => {
                self.edit_query();
                Ok(())
            }
            Msg::BeginSearch => {
                self.begin_search();
                Ok(())
            }
            Msg::Navigate(direction) => {
                self.navigate(direction);
                Ok(())
            }
            Msg::Back => self.back().await,
            Msg::Submit => self.submit().await,
            Msg::BeginEdit => self.session.begin_field_edit(),
            Msg::Delete => self.session.begin_delete().await,
            Msg::Confirm => self.confirm().await,
            Msg::Cancel => {
                self.session.cancel();
                Ok(())
            }
            Msg::InspectSchema => self.inspect_schema().await,
        };

        // The session keeps the message for display; this is just a trace.
        if let Err(error) = outcome {
            debug!(%error, "key action rejected");
        }
    }

    fn on_tick(&mut self) {
        let Some(updates) = self.probe_updates.as_mut() else {
            return;
        };
        if let Ok(status) = updates.try_recv() {
            if let ProbeStatus::Reachable(report) = &status {
                info!(
                    profile = %report.profile_name,
                    latency_ms = report.latency.as_millis(),
                    "connection reachable"
                );
            }
            self.probe = status;
            self.probe_updates = None;
        }
    }

    fn input(&mut self, character: char) {
        if let Some(buffer) = self.session.field_buffer_mut() {
            buffer.push(character);
            return;
        }
        match self.mode {
            InputMode::Normal => {}
            InputMode::Query => self.query_input.push(character),
            InputMode::ResultSearch | InputMode::ListSearch | InputMode::SchemaSearch => {
                self.search_input.push(character);
                self.apply_search();
            }
        }
    }

    fn backspace(&mut self) {
        if let Some(buffer) = self.session.field_buffer_mut() {
            buffer.pop();
            return;
        }
        match self.mode {
            InputMode::Normal => {}
            InputMode::Query => {
                self.query_input.pop();
            }
            InputMode::ResultSearch | InputMode::ListSearch | InputMode::SchemaSearch => {
                self.search_input.pop();
                self.apply_search();
            }
        }
    }

    fn apply_search(&mut self) {
        match self.mode {
            InputMode::ResultSearch => self.session.set_result_filter(&self.search_input),
            InputMode::ListSearch => self.session.set_list_filter(&self.search_input),
            InputMode::SchemaSearch => self.session.set_schema_filter(&self.search_input),
            InputMode::Normal | InputMode::Query => {}
        }
    }

    fn edit_query(&mut self) {
        if !matches!(
            self.session.state(),
            SessionState::AwaitingQuery | SessionState::Executed
        ) {
            return;
        }
        self.session.open_query_editor();
        if self.query_input.is_empty() {
            self.session.query().clone_into(&mut self.query_input);
        }
        self.show_row_detail = false;
        self.mode = InputMode::Query;
    }

    fn begin_search(&mut self) {
        let (mode, current) = match (self.session.state(), self.session.screen()) {
            (SessionState::SchemaInspection(view), _) => {
                (InputMode::SchemaSearch, view.columns.filter().to_string())
            }
            (SessionState::Executed, Screen::Query) => (
                InputMode::ResultSearch,
                self.session.rows().filter().to_string(),
            ),
            (SessionState::AwaitingQuery, Screen::Databases) => (
                InputMode::ListSearch,
                self.session.databases().filter().to_string(),
            ),
            (SessionState::AwaitingQuery, Screen::Tables) => (
                InputMode::ListSearch,
                self.session.tables().filter().to_string(),
            ),
            _ => return,
        };
        self.search_input = current;
        self.mode = mode;
    }

    fn navigate(&mut self, direction: DirectionKey) {
        let delta = match direction {
            DirectionKey::Up | DirectionKey::Left => -1,
            DirectionKey::Down | DirectionKey::Right => 1,
        };
        match self.session.state() {
            SessionState::ConfirmDelete(_) => self.session.move_dependency_cursor(delta),
            SessionState::SchemaInspection(_) => self.session.move_schema_cursor(delta),
            SessionState::Executed => match direction {
                DirectionKey::Left | DirectionKey::Right => self.session.move_row(delta),
                DirectionKey::Up | DirectionKey::Down => self.session.move_field(delta),
            },
            SessionState::AwaitingQuery => self.session.move_list_cursor(delta),
            SessionState::FieldEditing(_) | SessionState::ConfirmUpdate(_) => {}
        }
    }

    async fn back(&mut self) -> Result<(), SessionError> {
        if matches!(self.session.state(), SessionState::FieldEditing(_)) {
            self.session.cancel_field_edit();
            return Ok(());
        }
        match self.mode {
            InputMode::Query => {
                self.mode = InputMode::Normal;
                Ok(())
            }
            InputMode::ResultSearch | InputMode::ListSearch | InputMode::SchemaSearch => {
                self.search_input.clear();
                self.apply_search();
                self.mode = InputMode::Normal;
                Ok(())
            }
            InputMode::Normal => {
                if self.show_row_detail {
                    self.show_row_detail = false;
                    return Ok(());
                }
                self.session.go_back().await
            }
        }
    }

    async fn submit(&mut self) -> Result<(), SessionError> {
        if matches!(self.session.state(), SessionState::FieldEditing(_)) {
            return self.session.commit_field_edit();
        }
        match self.mode {
            InputMode::Query => {
                self.mode = InputMode::Normal;
                let sql = self.query_input.clone();
                self.session.run_query(&sql).await
            }
            InputMode::ResultSearch | InputMode::ListSearch | InputMode::SchemaSearch => {
                self.mode = InputMode::Normal;
                Ok(())
            }
            InputMode::Normal => match (self.session.state(), self.session.screen()) {
                (SessionState::ConfirmDelete(_), _) => {
                    self.session.drill_into_dependency().await?;
                    self.session.query().clone_into(&mut self.query_input);
                    Ok(())
                }
                (SessionState::AwaitingQuery, Screen::Databases) => {
                    self.session.select_database().await
                }
                (SessionState::AwaitingQuery, Screen::Tables) => {
                    self.session.open_selected_table().await?;
                    self.session.query().clone_into(&mut self.query_input);
                    Ok(())
                }
                (SessionState::AwaitingQuery | SessionState::Executed, Screen::Query) => {
                    self.edit_query();
                    Ok(())
                }
                _ => Ok(()),
            },
        }
    }

    async fn confirm(&mut self) -> Result<(), SessionError> {
        if self.session.pending_sql().is_none() {
            return Ok(());
        }
        self.session.confirm().await
    }

    async fn inspect_schema(&mut self) -> Result<(), SessionError> {
        match (self.session.state(), self.session.screen()) {
            (SessionState::SchemaInspection(_), _) => {
                self.session.close_schema();
                Ok(())
            }
            (SessionState::Executed, _) => self.session.inspect_schema().await,
            (SessionState::AwaitingQuery, Screen::Tables) => {
                self.session.inspect_selected_table().await
            }
            _ => Ok(()),
        }
    }

    fn mode_name(&self) -> &'static str {
        if matches!(self.session.state(), SessionState::FieldEditing(_)) {
            return "edit field";
        }
        match self.mode {
            InputMode::Normal => "navigate",
            InputMode::Query => "query",
            InputMode::ResultSearch => "filter rows",
            InputMode::ListSearch => "filter list",
            InputMode::SchemaSearch => "filter columns",
        }
    }

    fn screen_name(&self) -> &'static str {
        match self.session.screen() {
            Screen::Databases => "Databases",
            Screen::Tables => "Tables",
            Screen::Query => "Query",
        }
    }

    fn probe_label(&self) -> String {
        match &self.probe {
            ProbeStatus::Pending => "checking".to_string(),
            ProbeStatus::Reachable(report) => format!("up {}ms", report.latency.as_millis()),
            ProbeStatus::Unreachable(_) => "unreachable".to_string(),
        }
    }
}

/// Opens the connection described by `profile` and runs the explorer until
/// the user quits.
pub fn run(profile: ConnectionProfile) -> Result<(), TuiError> {
    let runtime = Builder::new_multi_thread().enable_all().build()?;

    let (probe_tx, probe_rx) = mpsc::unbounded_channel();
    let probe_profile = profile.clone();
    runtime.spawn(async move {
        let outcome = probe(&probe_profile).await;
        if probe_tx.send(ProbeStatus::from_outcome(outcome)).is_err() {
            debug!("probe finished after the explorer closed");
        }
    });

    let backend = runtime.block_on(open_backend(&profile))?;
    let mut session = Session::new(
        backend,
        profile.dialect(),
        profile.initial_database().map(str::to_string),
    );
    if let Err(error) = runtime.block_on(session.start()) {
        debug!(%error, "initial listing failed");
    }
    let mut app = TuiApp::new(session, profile.name.clone()).with_probe_updates(probe_rx);

    let mut terminal = setup_terminal()?;
    let run_result = run_loop(&mut terminal, &runtime, &mut app);
    let restore_result = restore_terminal(&mut terminal);

    if let Err(error) = runtime.block_on(app.session.disconnect()) {
        debug!(%error, "disconnect failed");
    }

    if let Err(error) = run_result {
        restore_result?;
        return Err(error);
    }

    restore_result?;
    Ok(())
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>, TuiError> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;
    Ok(terminal)
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<(), TuiError> {
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;
    Ok(())
}

fn run_loop<B: QueryBackend>(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    runtime: &Runtime,
    app: &mut TuiApp<B>,
) -> Result<(), TuiError> {
    let mut last_tick = Instant::now();

    loop {
        terminal.draw(|frame| render(frame, app))?;

        let timeout = TICK_RATE
            .checked_sub(last_tick.elapsed())
            .unwrap_or(Duration::ZERO);
        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    if let Some(message) = map_key_event(app.key_mode(), key) {
                        runtime.block_on(app.handle(message));
                    }
                }
            }
        }

        if last_tick.elapsed() >= TICK_RATE {
            runtime.block_on(app.handle(Msg::Tick));
            last_tick = Instant::now();
        }

        if app.should_quit {
            break;
        }
    }

    Ok(())
}

fn render<B: QueryBackend>(frame: &mut Frame<'_>, app: &TuiApp<B>) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(8),
            Constraint::Length(4),
        ])
        .split(frame.area());

    let header = Paragraph::new(Line::from(vec![
        Span::styled(
            format!(" {} ", app.screen_name()),
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(" | "),
        Span::raw(format!(
            "Connection: {} ({})",
            app.profile_name,
            app.session.dialect()
        )),
        Span::raw(" | "),
        Span::raw(format!(
            "DB: {}",
            app.session.database().unwrap_or("-")
        )),
        Span::raw(" | "),
        Span::raw(format!("Server: {}", app.probe_label())),
        Span::raw(" | "),
        Span::raw(format!("Mode: {}", app.mode_name())),
    ]))
    .block(Block::default().borders(Borders::ALL).title("rowscope"));
    frame.render_widget(header, chunks[0]);

    let body_text = match app.session.screen() {
        Screen::Databases => list_lines(
            "Databases",
            app.session.databases(),
            "Enter: use database  /: filter",
        ),
        Screen::Tables => list_lines(
            "Tables",
            app.session.tables(),
            "Enter: open table  ?: schema  /: filter  e: query  Esc: databases",
        ),
        Screen::Query => query_lines(app, usize::from(chunks[1].height.saturating_sub(5)).max(1)),
    };
    let body = Paragraph::new(body_text)
        .block(Block::default().borders(Borders::ALL).title("Workspace"))
        .alignment(Alignment::Left);
    frame.render_widget(body, chunks[1]);

    let status = if let Some(error) = app.session.error() {
        Line::from(Span::styled(
            format!("Error: {error}"),
            Style::default().fg(Color::Red),
        ))
    } else if let Some(notice) = app.session.notice() {
        Line::from(Span::styled(
            notice.to_string(),
            Style::default().fg(Color::Green),
        ))
    } else if let ProbeStatus::Unreachable(reason) = &app.probe {
        Line::from(Span::styled(
            reason.clone(),
            Style::default().fg(Color::Yellow),
        ))
    } else {
        Line::from(format!("State: {}", app.session.state().label()))
    };
    let footer = Paragraph::new(vec![status, Line::from(key_hints(app))])
        .block(Block::default().borders(Borders::ALL).title("Status"));
    frame.render_widget(footer, chunks[2]);

    match app.session.state() {
        SessionState::FieldEditing(edit) => {
            let column = app
                .session
                .columns()
                .get(edit.column)
                .map_or("?", String::as_str);
            render_popup(
                frame,
                "Edit field",
                vec![
                    Line::from(format!("Column: {column}")),
                    Line::from(format!("Original: {}", edit.original)),
                    Line::from(format!("New: {}_", edit.new_value().unwrap_or(NULL_SENTINEL))),
                    Line::from(""),
                    Line::from("Enter: stage update  Ctrl+N: NULL  Esc: cancel"),
                ],
            );
        }
        SessionState::ConfirmUpdate(intent) => render_popup(
            frame,
            "Confirm update",
            vec![
                Line::from(intent.summary()),
                Line::from(""),
                Line::from(intent.sql.clone()),
                Line::from(""),
                Line::from("y: execute  n: cancel"),
            ],
        ),
        SessionState::ConfirmDelete(pending) => {
            render_popup(frame, "Confirm delete", delete_lines(pending));
        }
        SessionState::SchemaInspection(view) => {
            render_popup(frame, &format!("Schema: {}", view.table), schema_lines(view));
        }
        SessionState::AwaitingQuery | SessionState::Executed => {}
    }

    if app.show_row_detail {
        if let Some(json) = app.session.selected_row_json() {
            render_popup(frame, "Row", json.lines().map(|line| Line::from(line.to_string())).collect());
        }
    }

    if app.show_help {
        render_help_popup(frame);
    }
}

fn list_lines<'a>(title: &'a str, list: &'a FilteredList<String>, hint: &'a str) -> Vec<Line<'a>> {
    let mut lines = vec![Line::from(title), Line::from(hint)];
    if list.is_filtered() {
        lines.push(Line::from(format!(
            "Filter: {} ({} of {})",
            list.filter(),
            list.len(),
            list.items().len()
        )));
    }
    lines.push(Line::from(""));

    for (index, item) in list.visible().into_iter().enumerate() {
        let marker = if index == list.cursor() { ">" } else { " " };
        lines.push(Line::from(format!("{marker} {item}")));
    }
    if list.is_empty() {
        lines.push(Line::from("Nothing to show"));
    }
    lines
}

fn query_lines<B: QueryBackend>(app: &TuiApp<B>, visible_limit: usize) -> Vec<Line<'static>> {
    let editing = app.mode == InputMode::Query;
    let prompt = if editing {
        format!("SQL> {}_", app.query_input)
    } else {
        format!("SQL> {}", app.session.query())
    };
    let mut lines = vec![Line::from(Span::styled(
        prompt,
        Style::default().add_modifier(Modifier::BOLD),
    ))];

    let rows = app.session.rows();
    let columns = app.session.columns();
    if columns.is_empty() {
        lines.push(Line::from(""));
        lines.push(Line::from(if editing {
            "Enter: run  Esc: stop editing"
        } else {
            "e or Enter: write a query  Esc: tables"
        }));
        return lines;
    }

    let mut summary = format!("{} rows", rows.items().len());
    if rows.is_filtered() {
        summary = format!("{} of {summary} match `{}`", rows.len(), rows.filter());
    }
    if let Some(table) = &app.session.resolution().target_table {
        summary.push_str(&format!(" | table {table}"));
        if !app.session.resolution().primary_key.is_empty() {
            summary.push_str(&format!(" | key {}", app.session.resolution().primary_key.join(", ")));
        }
    }
    lines.push(Line::from(summary));

    let field_cursor = app.session.field_cursor();
    let header = columns
        .iter()
        .enumerate()
        .flat_map(|(index, column)| {
            let style = if index == field_cursor {
                Style::default().add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
            } else {
                Style::default().add_modifier(Modifier::BOLD)
            };
            [Span::raw(" | "), Span::styled(column.clone(), style)]
        })
        .skip(1);
    lines.push(Line::from(
        std::iter::once(Span::raw("       ")).chain(header).collect::<Vec<_>>(),
    ));

    let cursor = rows.cursor();
    let window_start = cursor.saturating_sub(visible_limit / 2);
    for (offset, row) in rows
        .visible()
        .into_iter()
        .skip(window_start)
        .take(visible_limit)
        .enumerate()
    {
        let index = window_start + offset;
        let marker = if index == cursor { ">" } else { " " };
        let mut spans = vec![Span::raw(format!("{marker} {:04} ", index + 1))];
        for (column, value) in row.iter().enumerate() {
            if column > 0 {
                spans.push(Span::raw(" | "));
            }
            let style = if index == cursor && column == field_cursor {
                Style::default().add_modifier(Modifier::REVERSED)
            } else {
                Style::default()
            };
            spans.push(Span::styled(value.clone(), style));
        }
        lines.push(Line::from(spans));
    }
    if rows.is_empty() {
        lines.push(Line::from("No rows"));
    }
    lines
}

fn delete_lines(pending: &PendingDelete) -> Vec<Line<'static>> {
    let mut lines = vec![
        Line::from(pending.intent.summary()),
        Line::from(""),
        Line::from(pending.intent.sql.clone()),
        Line::from(""),
    ];
    if pending.dependencies.is_empty() {
        lines.push(Line::from("No tables reference these rows."));
    } else {
        lines.push(Line::from("Referencing tables:"));
        for (index, dependency) in pending.dependencies.iter().enumerate() {
            let marker = if index == pending.cursor { ">" } else { " " };
            let style = if dependency.count > 0 {
                Style::default().fg(Color::Yellow)
            } else {
                Style::default()
            };
            lines.push(Line::from(Span::styled(
                format!(
                    "{marker} {}.{} -> {}: {} rows",
                    dependency.dependency.table,
                    dependency.dependency.column,
                    dependency.dependency.referenced_column,
                    dependency.count
                ),
                style,
            )));
        }
    }
    lines.push(Line::from(""));
    lines.push(Line::from("y: delete  n: cancel  j/k: dependency  Enter: show referencing rows"));
    lines
}

fn schema_lines(view: &SchemaView) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    if view.columns.is_filtered() {
        lines.push(Line::from(format!("Filter: {}", view.columns.filter())));
    }
    for (index, column) in view.columns.visible().into_iter().enumerate() {
        let marker = if index == view.columns.cursor() { ">" } else { " " };
        let mut line = format!("{marker} {} {}", column.name, column.data_type);
        if !column.max_length.is_empty() {
            line.push_str(&format!("({})", column.max_length));
        }
        if column.primary_key {
            line.push_str(" PK");
        }
        line.push_str(if column.nullable { " NULL" } else { " NOT NULL" });
        if !column.default_value.is_empty() {
            line.push_str(&format!(" DEFAULT {}", column.default_value));
        }
        lines.push(Line::from(line));
    }
    if view.columns.is_empty() {
        lines.push(Line::from("No columns"));
    }
    lines.push(Line::from(""));
    lines.push(Line::from("/: filter  ?/Esc: close"));
    lines
}

fn key_hints<B: QueryBackend>(app: &TuiApp<B>) -> &'static str {
    match (app.key_mode(), app.session.state()) {
        (KeyMode::Typing, _) => "Enter: accept  Esc: cancel  Backspace: delete",
        (KeyMode::Navigate, SessionState::Executed) => {
            "h/l: row  j/k: field  i: edit  Ctrl+D: delete  /: filter  ?: schema  v: row  e: query  F1: help"
        }
        (KeyMode::Navigate, _) => "j/k: move  Enter: select  Esc: back  q: quit  F1: help",
    }
}

fn render_popup(frame: &mut Frame<'_>, title: &str, lines: Vec<Line<'_>>) {
    let area = centered_rect(80, 60, frame.area());
    frame.render_widget(Clear, area);
    let popup = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(Block::default().borders(Borders::ALL).title(title.to_string()));
    frame.render_widget(popup, area);
}

fn render_help_popup(frame: &mut Frame<'_>) {
    let area = centered_rect(70, 70, frame.area());
    frame.render_widget(Clear, area);
    let help = Paragraph::new(vec![
        Line::from("Global keymap"),
        Line::from("q / Ctrl+C: quit"),
        Line::from("F1: toggle help"),
        Line::from("Esc: back"),
        Line::from("e: edit query, Enter: run"),
        Line::from("h/l: previous/next row, j/k: next/previous field"),
        Line::from("/: filter rows or list"),
        Line::from("i: edit field (Ctrl+N sets NULL)"),
        Line::from("Ctrl+D: delete selected or filtered rows"),
        Line::from("y/n: confirm or cancel pending change"),
        Line::from("?: column details"),
        Line::from("v: selected row as JSON"),
    ])
    .block(Block::default().borders(Borders::ALL).title("Help"));
    frame.render_widget(help, area);
}

fn centered_rect(width_percent: u16, height_percent: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100_u16 - height_percent) / 2),
            Constraint::Percentage(height_percent),
            Constraint::Percentage((100_u16 - height_percent) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100_u16 - width_percent) / 2),
            Constraint::Percentage(width_percent),
            Constraint::Percentage((100_u16 - width_percent) / 2),
        ])
        .split(vertical[1])[1]
}

fn map_key_event(mode: KeyMode, key: KeyEvent) -> Option<Msg> {
    match (key.modifiers, key.code) {
        (KeyModifiers::CONTROL, KeyCode::Char('c')) => return Some(Msg::Quit),
        (_, KeyCode::F(1)) => return Some(Msg::ToggleHelp),
        (_, KeyCode::Esc) => return Some(Msg::Back),
        (_, KeyCode::Enter) => return Some(Msg::Submit),
        _ => {}
    }

    match mode {
        KeyMode::Typing => match (key.modifiers, key.code) {
            (KeyModifiers::CONTROL, KeyCode::Char('n')) => Some(Msg::SetNull),
            (KeyModifiers::CONTROL, _) => None,
            (_, KeyCode::Backspace) => Some(Msg::Backspace),
            (_, KeyCode::Char(character)) => Some(Msg::Input(character)),
            _ => None,
        },
        KeyMode::Navigate => match (key.modifiers, key.code) {
            (KeyModifiers::CONTROL, KeyCode::Char('d')) => Some(Msg::Delete),
            (KeyModifiers::CONTROL, _) => None,
            (_, KeyCode::Char('q')) => Some(Msg::Quit),
            (_, KeyCode::Char('?')) => Some(Msg::InspectSchema),
            (_, KeyCode::Char('/')) => Some(Msg::BeginSearch),
            (_, KeyCode::Char('e')) => Some(Msg::EditQuery),
            (_, KeyCode::Char('i')) => Some(Msg::BeginEdit),
            (_, KeyCode::Char('v')) => Some(Msg::ToggleRowDetail),
            (_, KeyCode::Char('y')) => Some(Msg::Confirm),
            (_, KeyCode::Char('n')) => Some(Msg::Cancel),
            (_, KeyCode::Up | KeyCode::Char('k')) => Some(Msg::Navigate(DirectionKey::Up)),
            (_, KeyCode::Down | KeyCode::Char('j')) => Some(Msg::Navigate(DirectionKey::Down)),
            (_, KeyCode::Left | KeyCode::Char('h')) => Some(Msg::Navigate(DirectionKey::Left)),
            (_, KeyCode::Right | KeyCode::Char('l')) => Some(Msg::Navigate(DirectionKey::Right)),
            _ => None,
        },
    }
}
