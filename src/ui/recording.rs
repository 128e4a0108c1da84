use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::services::{ClassAvailability, RosterView};
use crate::ui::{Notification, Renderer};

#[derive(Default)]
struct Recorded {
    rosters: Vec<RosterView>,
    classes: Vec<Vec<ClassAvailability>>,
    notifications: Vec<Notification>,
}

/// Keeps everything it is asked to draw, for inspection in tests.
#[derive(Default)]
pub struct RecordingRenderer {
    recorded: Mutex<Recorded>,
}

impl RecordingRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rosters(&self) -> Vec<RosterView> {
        self.lock().rosters.clone()
    }

    pub fn last_roster(&self) -> Option<RosterView> {
        self.lock().rosters.last().cloned()
    }

    pub fn class_lists(&self) -> Vec<Vec<ClassAvailability>> {
        self.lock().classes.clone()
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.lock().notifications.clone()
    }

    pub fn last_message(&self) -> Option<String> {
        self.lock().notifications.last().map(|n| n.to_string())
    }

    fn lock(&self) -> MutexGuard<'_, Recorded> {
        self.recorded.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Renderer for RecordingRenderer {
    fn render_roster(&self, view: &RosterView) {
        self.lock().rosters.push(view.clone());
    }

    fn render_classes(&self, classes: &[ClassAvailability]) {
        self.lock().classes.push(classes.to_vec());
    }

    fn notify(&self, notification: &Notification) {
        self.lock().notifications.push(notification.clone());
    }
}
