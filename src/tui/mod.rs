//! TUI module: Terminal User Interface using Ratatui.
//!
//! Screens:
//! - Login by patient identifier
//! - Dashboard with latest metrics, health score and risk
//! - Visit history with expandable details

mod app;
mod styles;
mod ui;

pub use app::{App, Screen};
pub use styles::MedicalTheme;
