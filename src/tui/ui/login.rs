//! Login screen: Patient identifier entry.

use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};
use zeroize::Zeroize;

use crate::tui::styles::{MedicalTheme, LOGO};

/// Longest identifier accepted by the input box.
const MAX_INPUT_LEN: usize = 64;

/// Login form state
#[derive(Debug, Default)]
pub struct LoginState {
    pub input: String,
    pub error_message: Option<String>,
    /// Non-fatal startup notice, e.g. visit data missing.
    pub notice: Option<String>,
}

impl LoginState {
    pub fn input_char(&mut self, c: char) {
        if !c.is_control() && self.input.chars().count() < MAX_INPUT_LEN {
            self.input.push(c);
            self.error_message = None;
        }
    }

    pub fn delete_char(&mut self) {
        self.input.pop();
    }

    /// Hand out the typed identifier and wipe the buffer.
    pub fn take_input(&mut self) -> String {
        let value = self.input.clone();
        self.input.zeroize();
        value
    }

    pub fn clear_sensitive(&mut self) {
        self.input.zeroize();
        self.error_message = None;
    }
}

impl Drop for LoginState {
    fn drop(&mut self) {
        self.input.zeroize();
    }
}

/// Render the login screen
pub fn render_login(f: &mut Frame, area: Rect, state: &LoginState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(6), // Logo
            Constraint::Length(2), // Subtitle
            Constraint::Length(3), // Input
            Constraint::Length(2), // Error
            Constraint::Length(2), // Notice
            Constraint::Min(0),    // Help
        ])
        .margin(1)
        .split(area);

    let logo = Paragraph::new(LOGO)
        .style(MedicalTheme::subtitle())
        .alignment(Alignment::Center);
    f.render_widget(logo, chunks[0]);

    let subtitle = Paragraph::new(Line::from(vec![Span::styled(
        "Patient Login",
        MedicalTheme::title(),
    )]))
    .alignment(Alignment::Center);
    f.render_widget(subtitle, chunks[1]);

    let input_area = centered(chunks[2], 40);
    let input = Paragraph::new(Line::from(vec![
        Span::styled(state.input.as_str(), MedicalTheme::text()),
        Span::styled("█", MedicalTheme::focused()),
    ]))
    .block(
        Block::default()
            .title(Span::styled(" Patient ID ", MedicalTheme::subtitle()))
            .borders(Borders::ALL)
            .border_style(MedicalTheme::border_focused()),
    );
    f.render_widget(input, input_area);

    if let Some(ref error) = state.error_message {
        let p = Paragraph::new(Span::styled(error.as_str(), MedicalTheme::danger()))
            .alignment(Alignment::Center);
        f.render_widget(p, chunks[3]);
    }

    if let Some(ref notice) = state.notice {
        let p = Paragraph::new(Span::styled(notice.as_str(), MedicalTheme::warning()))
            .alignment(Alignment::Center);
        f.render_widget(p, chunks[4]);
    }

    let help = Paragraph::new(Line::from(vec![
        Span::styled("[Enter] ", MedicalTheme::key_hint()),
        Span::styled("Login  ", MedicalTheme::key_desc()),
        Span::styled("[Esc] ", MedicalTheme::key_hint()),
        Span::styled("Clear  ", MedicalTheme::key_desc()),
        Span::styled("[Ctrl+Q] ", MedicalTheme::key_hint()),
        Span::styled("Quit", MedicalTheme::key_desc()),
    ]))
    .alignment(Alignment::Center);
    f.render_widget(help, chunks[5]);
}

fn centered(area: Rect, width: u16) -> Rect {
    let width = width.min(area.width);
    Rect {
        x: area.x + (area.width - width) / 2,
        width,
        ..area
    }
}
