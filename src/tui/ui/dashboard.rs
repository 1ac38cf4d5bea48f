//! Dashboard view: Latest visit metrics, score and risk for one patient.

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, Paragraph, Sparkline},
    Frame,
};

use crate::application::{DashboardView, RiskOutcome};
use crate::tui::styles::{MedicalTheme, LOGO_SMALL};

const NOT_RECORDED: &str = "—";

/// Render the patient dashboard.
pub fn render_dashboard(f: &mut Frame, area: Rect, view: &DashboardView) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(0),    // Main content
            Constraint::Length(1), // Key hints
        ])
        .split(area);

    render_header(f, chunks[0], view);
    render_main_content(f, chunks[1], view);
    render_key_hints(f, chunks[2]);
}

fn render_header(f: &mut Frame, area: Rect, view: &DashboardView) {
    let name = view
        .profile
        .name
        .clone()
        .unwrap_or_else(|| format!("Patient {}", view.patient_id));

    let header = Paragraph::new(Line::from(vec![
        Span::styled(" ", MedicalTheme::text()),
        Span::styled(LOGO_SMALL, MedicalTheme::title()),
        Span::styled(" │ ", MedicalTheme::text_muted()),
        Span::styled(format!("Welcome, {name}"), MedicalTheme::text_secondary()),
        Span::styled(" │ ", MedicalTheme::text_muted()),
        Span::styled(
            format!("Last visit {}", view.latest.visit_date),
            MedicalTheme::text_muted(),
        ),
    ]))
    .block(
        Block::default()
            .borders(Borders::BOTTOM)
            .border_style(MedicalTheme::border()),
    );

    f.render_widget(header, area);
}

fn render_main_content(f: &mut Frame, area: Rect, view: &DashboardView) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(40), // Patient info and metrics
            Constraint::Percentage(60), // Score, trend and risk
        ])
        .split(area);

    let left = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(8), Constraint::Min(0)])
        .split(chunks[0]);

    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Score gauge
            Constraint::Min(5),    // Trend
            Constraint::Length(6), // Risk
        ])
        .split(chunks[1]);

    render_patient_info(f, left[0], view);
    render_metrics(f, left[1], view);
    render_score_gauge(f, right[0], view);
    render_trend(f, right[1], view);
    render_risk(f, right[2], &view.risk);
}

fn field_line(label: &str, value: Option<String>) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!("  {label}: "), MedicalTheme::text_secondary()),
        Span::styled(
            value.unwrap_or_else(|| NOT_RECORDED.to_string()),
            MedicalTheme::text(),
        ),
    ])
}

fn render_patient_info(f: &mut Frame, area: Rect, view: &DashboardView) {
    let profile = &view.profile;
    let smoking = profile
        .smoker
        .map(|s| if s { "Yes" } else { "No" }.to_string());

    let lines = vec![
        field_line("Name", profile.name.clone()),
        field_line("Gender", profile.gender.clone()),
        field_line("Date of Birth", profile.date_of_birth.clone()),
        field_line("Age", profile.age.map(|a| a.to_string())),
        field_line("Smoking", smoking),
        field_line("Visits", Some(view.history.len().to_string())),
    ];

    let block = Block::default()
        .title(Span::styled(" Patient Information ", MedicalTheme::subtitle()))
        .borders(Borders::ALL)
        .border_style(MedicalTheme::border());

    f.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_metrics(f: &mut Frame, area: Rect, view: &DashboardView) {
    let latest = &view.latest;
    let lines = vec![
        field_line("BMI", latest.bmi.map(|v| format!("{v:.1}"))),
        field_line(
            "Blood Pressure",
            latest.blood_pressure().map(|bp| format!("{bp} mmHg")),
        ),
        field_line("Heart Rate", latest.heart_rate.map(|v| format!("{v:.0} bpm"))),
        field_line("Weight", latest.weight_kg.map(|v| format!("{v:.1} kg"))),
        field_line("Recorded Risk", latest.recorded_risk.clone()),
    ];

    let block = Block::default()
        .title(Span::styled(" Latest Metrics ", MedicalTheme::subtitle()))
        .borders(Borders::ALL)
        .border_style(MedicalTheme::border());

    f.render_widget(Paragraph::new(lines).block(block), area);
}

/// Gauge fill is clamped to 0..=100; the label shows the raw score.
pub(crate) fn gauge_percent(score: f64) -> u16 {
    if score.is_nan() {
        return 0;
    }
    score.clamp(0.0, 100.0).round() as u16
}

fn render_score_gauge(f: &mut Frame, area: Rect, view: &DashboardView) {
    let block = Block::default()
        .title(Span::styled(" Health Score ", MedicalTheme::subtitle()))
        .borders(Borders::ALL)
        .border_style(MedicalTheme::border());

    let gauge = Gauge::default()
        .block(block)
        .gauge_style(MedicalTheme::score_band(view.band))
        .percent(gauge_percent(view.score))
        .label(format!("{:.1} ({})", view.score, view.band));

    f.render_widget(gauge, area);
}

fn render_trend(f: &mut Frame, area: Rect, view: &DashboardView) {
    let trend = view.trend();
    let title = match view.score_change() {
        Some(delta) => format!(" Score Trend ({delta:+.1} since last visit) "),
        None => " Score Trend ".to_string(),
    };

    let block = Block::default()
        .title(Span::styled(title, MedicalTheme::subtitle()))
        .borders(Borders::ALL)
        .border_style(MedicalTheme::border());

    if trend.len() < 2 {
        let p = Paragraph::new(Span::styled(
            "Trend needs at least two visits.",
            MedicalTheme::text_muted(),
        ))
        .block(block);
        f.render_widget(p, area);
        return;
    }

    let values: Vec<u64> = trend.iter().map(|&s| u64::from(gauge_percent(s))).collect();
    let sparkline = Sparkline::default()
        .block(block)
        .data(&values)
        .max(100)
        .style(MedicalTheme::score_band(view.band));

    f.render_widget(sparkline, area);
}

fn render_risk(f: &mut Frame, area: Rect, risk: &RiskOutcome) {
    let lines = match risk {
        RiskOutcome::Predicted(prediction) => {
            let mut lines = vec![Line::from(vec![
                Span::styled("  Predicted Risk: ", MedicalTheme::text_secondary()),
                Span::styled(
                    prediction.label.to_string(),
                    MedicalTheme::risk_label(prediction.label),
                ),
            ])];
            if let (Some(p), Some(level)) = (prediction.probability, prediction.risk_level()) {
                lines.push(Line::from(vec![
                    Span::styled("  Probability: ", MedicalTheme::text_secondary()),
                    Span::styled(format!("{:.0}% ", p * 100.0), MedicalTheme::text()),
                    Span::styled(level.to_string(), MedicalTheme::risk_level(level)),
                ]));
                lines.push(Line::from(Span::styled(
                    format!("  {}", level.description()),
                    MedicalTheme::text_muted(),
                )));
            }
            lines
        }
        RiskOutcome::Unavailable(reason) => vec![
            Line::from(Span::styled(
                "  Risk prediction unavailable",
                MedicalTheme::warning(),
            )),
            Line::from(Span::styled(format!("  {reason}"), MedicalTheme::text_muted())),
        ],
    };

    let block = Block::default()
        .title(Span::styled(" Heart Disease Risk ", MedicalTheme::subtitle()))
        .borders(Borders::ALL)
        .border_style(MedicalTheme::border());

    f.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_key_hints(f: &mut Frame, area: Rect) {
    let hints = Paragraph::new(Line::from(vec![
        Span::styled(" [H] ", MedicalTheme::key_hint()),
        Span::styled("History ", MedicalTheme::key_desc()),
        Span::styled("[R] ", MedicalTheme::key_hint()),
        Span::styled("Refresh ", MedicalTheme::key_desc()),
        Span::styled("[L] ", MedicalTheme::key_hint()),
        Span::styled("Logout ", MedicalTheme::key_desc()),
        Span::styled("[Q] ", MedicalTheme::key_hint()),
        Span::styled("Quit", MedicalTheme::key_desc()),
    ]));
    f.render_widget(hints, area);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gauge_percent_clamps() {
        assert_eq!(gauge_percent(53.5), 54);
        assert_eq!(gauge_percent(-12.0), 0);
        assert_eq!(gauge_percent(140.0), 100);
        assert_eq!(gauge_percent(f64::NAN), 0);
    }
}
