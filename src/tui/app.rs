//! Main TUI application state machine.
//!
//! Handles:
//! - Screen navigation between login, dashboard and history
//! - Input event handling
//! - The explicit login session

use std::io;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    Frame, Terminal,
};
use zeroize::Zeroize;

use crate::adapters::{CsvRecordSource, JsonRiskModel};
use crate::application::{
    DashboardService, DashboardView, IdentityGate, LoginOutcome, RecordStore, RiskService,
};
use crate::config::AppConfig;
use crate::domain::Session;
use crate::ports::{RecordSource, RiskModel};

use super::ui::{
    dashboard::render_dashboard,
    history::{render_history, HistoryState},
    login::{render_login, LoginState},
    render_disclaimer,
};

/// Current screen/view in the application
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Login,
    Dashboard,
    History,
}

/// Main application state
pub struct App<S = CsvRecordSource, M = JsonRiskModel>
where
    S: RecordSource,
    M: RiskModel,
{
    screen: Screen,
    should_quit: bool,

    session: Session,
    records: Arc<RecordStore<S>>,
    dashboard: DashboardService<S, M>,

    login_state: LoginState,
    history_state: HistoryState,

    /// View for the logged-in patient; dropped on logout.
    view: Option<DashboardView>,
}

impl App {
    /// Create the application from configuration.
    ///
    /// Missing visit data or model is reported in the UI, not returned.
    #[must_use]
    pub fn new(config: &AppConfig) -> Self {
        let records = Arc::new(RecordStore::new(CsvRecordSource::new(&config.data_path)));
        let risk = Arc::new(RiskService::load(&config.model_path));
        Self::with_dependencies(records, risk)
    }
}

impl<S, M> App<S, M>
where
    S: RecordSource,
    M: RiskModel,
{
    /// Create application with injected dependencies.
    ///
    /// Visit data is loaded eagerly so a missing file shows on the login
    /// screen. The store retries on the next login attempt.
    pub fn with_dependencies(records: Arc<RecordStore<S>>, risk: Arc<RiskService<M>>) -> Self {
        let mut login_state = LoginState::default();
        match records.records() {
            Ok(loaded) => tracing::info!(
                "Loaded {} visit records for {} patients from {}",
                loaded.len(),
                records.patient_count().unwrap_or_default(),
                records.describe()
            ),
            Err(e) => {
                tracing::error!("Visit data unavailable: {}", e);
                login_state.notice = Some(format!("Patient data unavailable: {e}"));
            }
        }
        if !risk.is_available() {
            tracing::warn!("Starting without a risk model; predictions will not be shown");
        }

        Self {
            screen: Screen::Login,
            should_quit: false,
            session: Session::new(),
            dashboard: DashboardService::new(Arc::clone(&records), risk),
            records,
            login_state,
            history_state: HistoryState::default(),
            view: None,
        }
    }

    #[must_use]
    pub fn screen(&self) -> Screen {
        self.screen
    }

    #[must_use]
    pub fn session(&self) -> &Session {
        &self.session
    }

    #[must_use]
    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    #[must_use]
    pub fn view(&self) -> Option<&DashboardView> {
        self.view.as_ref()
    }

    /// Run the main application loop.
    ///
    /// # Errors
    /// Returns error if terminal operations fail.
    pub fn run(&mut self) -> Result<()> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        let result = self.main_loop(&mut terminal);

        // Restore terminal
        disable_raw_mode()?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        result
    }

    fn main_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
        loop {
            terminal.draw(|f| self.draw(f))?;

            if event::poll(Duration::from_millis(100))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        self.handle_key(key.code, key.modifiers);
                    }
                }
            }

            if self.should_quit {
                break;
            }
        }

        Ok(())
    }

    /// Draw the current screen with the disclaimer footer.
    pub fn draw(&self, f: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(0), Constraint::Length(3)])
            .split(f.area());

        match (self.screen, self.view.as_ref()) {
            (Screen::Dashboard, Some(view)) => render_dashboard(f, chunks[0], view),
            (Screen::History, Some(view)) => {
                render_history(f, chunks[0], view, &self.history_state);
            }
            _ => render_login(f, chunks[0], &self.login_state),
        }

        render_disclaimer(f, chunks[1]);
    }

    pub fn handle_key(&mut self, key: KeyCode, modifiers: KeyModifiers) {
        // Global quit handling
        if key == KeyCode::Char('q') && modifiers.contains(KeyModifiers::CONTROL) {
            self.should_quit = true;
            return;
        }

        match self.screen {
            Screen::Login => self.handle_login_key(key),
            Screen::Dashboard => self.handle_dashboard_key(key),
            Screen::History => self.handle_history_key(key),
        }
    }

    fn handle_login_key(&mut self, key: KeyCode) {
        match key {
            KeyCode::Enter => self.submit_login(),
            KeyCode::Esc => self.login_state.clear_sensitive(),
            KeyCode::Backspace => self.login_state.delete_char(),
            KeyCode::Char(c) => self.login_state.input_char(c),
            _ => {}
        }
    }

    fn handle_dashboard_key(&mut self, key: KeyCode) {
        match key {
            KeyCode::Char('h') | KeyCode::Char('H') => {
                self.history_state = HistoryState::default();
                self.screen = Screen::History;
            }
            KeyCode::Char('r') | KeyCode::Char('R') => self.refresh_view(),
            KeyCode::Char('l') | KeyCode::Char('L') => self.logout(),
            KeyCode::Char('q') | KeyCode::Char('Q') => self.should_quit = true,
            _ => {}
        }
    }

    fn handle_history_key(&mut self, key: KeyCode) {
        let len = self.view.as_ref().map_or(0, |v| v.history.len());
        match key {
            KeyCode::Up => self.history_state.prev(len),
            KeyCode::Down => self.history_state.next(len),
            KeyCode::Enter | KeyCode::Char(' ') => self.history_state.toggle(),
            KeyCode::Esc | KeyCode::Char('h') | KeyCode::Char('H') => {
                self.screen = Screen::Dashboard;
            }
            KeyCode::Char('l') | KeyCode::Char('L') => self.logout(),
            KeyCode::Char('q') | KeyCode::Char('Q') => self.should_quit = true,
            _ => {}
        }
    }

    fn submit_login(&mut self) {
        let mut candidate = self.login_state.take_input();
        let outcome = IdentityGate::login(&candidate, &self.records, &mut self.session);
        candidate.zeroize();

        match outcome {
            LoginOutcome::Granted(_) => {
                self.login_state.clear_sensitive();
                self.login_state.notice = None;
                self.refresh_view();
                if self.view.is_some() {
                    self.screen = Screen::Dashboard;
                }
            }
            LoginOutcome::Denied => {
                self.login_state.error_message = Some("Invalid Patient ID".to_string());
            }
            LoginOutcome::DataUnavailable(reason) => {
                self.login_state.error_message = Some("Patient data unavailable".to_string());
                self.login_state.notice = Some(reason);
            }
        }
    }

    /// Rebuild the dashboard view from the cached records.
    fn refresh_view(&mut self) {
        match self.dashboard.build(&self.session) {
            Ok(view) => {
                let len = view.history.len();
                if self.history_state.selected >= len {
                    self.history_state = HistoryState::default();
                }
                self.view = Some(view);
            }
            Err(e) => {
                tracing::error!("Failed to build dashboard: {}", e);
                self.logout();
                self.login_state.error_message = Some(e.to_string());
            }
        }
    }

    fn logout(&mut self) {
        if self.session.is_authenticated() {
            tracing::info!("Logged out");
        }
        self.session.logout();
        self.view = None;
        self.history_state = HistoryState::default();
        self.login_state.clear_sensitive();
        self.screen = Screen::Login;
    }
}
