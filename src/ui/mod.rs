pub mod recording;
pub mod terminal;

use std::fmt;

use crate::services::{ClassAvailability, RosterView};

pub use recording::RecordingRenderer;
pub use terminal::TerminalRenderer;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    Success(String),
    Error(String),
}

impl Notification {
    pub fn success(message: impl Into<String>) -> Self {
        Notification::Success(message.into())
    }

    pub fn error(message: impl Into<String>) -> Self {
        Notification::Error(message.into())
    }
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notification::Success(message) => f.write_str(message),
            Notification::Error(message) => write!(f, "Erro: {}", message),
        }
    }
}

/// Presentation side of the client. Implementations only draw; they never
/// call the backend.
pub trait Renderer: Send + Sync {
    fn render_roster(&self, view: &RosterView);
    fn render_classes(&self, classes: &[ClassAvailability]);
    fn notify(&self, notification: &Notification);
}
