//! Visit history: One row per visit, expandable to full details.

use std::collections::BTreeSet;

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use crate::application::{DashboardView, HistoryEntry};
use crate::domain::ScoreBand;
use crate::tui::styles::MedicalTheme;

/// Cursor and expanded rows. Indices refer to the view's history order.
#[derive(Debug, Default, Clone)]
pub struct HistoryState {
    pub selected: usize,
    pub expanded: BTreeSet<usize>,
}

impl HistoryState {
    pub fn next(&mut self, len: usize) {
        if len > 0 {
            self.selected = (self.selected + 1) % len;
        }
    }

    pub fn prev(&mut self, len: usize) {
        if len > 0 {
            self.selected = if self.selected == 0 {
                len - 1
            } else {
                self.selected - 1
            };
        }
    }

    pub fn toggle(&mut self) {
        if !self.expanded.remove(&self.selected) {
            self.expanded.insert(self.selected);
        }
    }

    #[must_use]
    pub fn is_expanded(&self, index: usize) -> bool {
        self.expanded.contains(&index)
    }
}

pub fn render_history(f: &mut Frame, area: Rect, view: &DashboardView, state: &HistoryState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(1)])
        .split(area);

    let mut lines = Vec::new();
    for (index, entry) in view.history.iter().enumerate() {
        let selected = index == state.selected;
        lines.push(summary_line(entry, selected, state.is_expanded(index)));
        if state.is_expanded(index) {
            lines.extend(detail_lines(entry));
        }
    }

    let block = Block::default()
        .title(Span::styled(
            format!(" Visit History ({} visits) ", view.history.len()),
            MedicalTheme::subtitle(),
        ))
        .borders(Borders::ALL)
        .border_style(MedicalTheme::border_focused());

    f.render_widget(Paragraph::new(lines).block(block), chunks[0]);

    let hints = Paragraph::new(Line::from(vec![
        Span::styled(" [↑/↓] ", MedicalTheme::key_hint()),
        Span::styled("Select ", MedicalTheme::key_desc()),
        Span::styled("[Enter] ", MedicalTheme::key_hint()),
        Span::styled("Expand ", MedicalTheme::key_desc()),
        Span::styled("[Esc] ", MedicalTheme::key_hint()),
        Span::styled("Back", MedicalTheme::key_desc()),
    ]));
    f.render_widget(hints, chunks[1]);
}

fn summary_line(entry: &HistoryEntry, selected: bool, expanded: bool) -> Line<'static> {
    let marker = if expanded { "▼" } else { "▶" };
    let date_style = if selected {
        MedicalTheme::selected()
    } else {
        MedicalTheme::text()
    };

    Line::from(vec![
        Span::styled(format!(" {marker} "), MedicalTheme::text_muted()),
        Span::styled(format!("Visit on {}", entry.visit.visit_date), date_style),
        Span::styled("  score ", MedicalTheme::text_secondary()),
        Span::styled(
            format!("{:.1}", entry.score),
            MedicalTheme::score_band(ScoreBand::from_score(entry.score)),
        ),
    ])
}

fn detail_lines(entry: &HistoryEntry) -> Vec<Line<'static>> {
    let visit = &entry.visit;
    let fmt = |v: Option<f64>, unit: &str| match v {
        Some(v) => format!("{v:.1}{unit}"),
        None => "—".to_string(),
    };

    let rows = [
        ("Weight", fmt(visit.weight_kg, " kg")),
        ("BMI", fmt(visit.bmi, "")),
        (
            "Blood Pressure",
            visit
                .blood_pressure()
                .map_or_else(|| "—".to_string(), |bp| format!("{bp} mmHg")),
        ),
        ("Heart Rate", fmt(visit.heart_rate, " bpm")),
        ("Recorded Score", fmt(visit.recorded_score, "")),
        ("Computed Score", format!("{:.1}", entry.score)),
    ];

    rows.into_iter()
        .map(|(label, value)| {
            Line::from(vec![
                Span::styled(format!("      {label}: "), MedicalTheme::text_secondary()),
                Span::styled(value, MedicalTheme::text()),
            ])
        })
        .collect()
}
