use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;
use tracing::debug;

use crate::api::SchoolApi;
use crate::error::AppError;
use crate::models::{ClassRecord, FilterCriteria, SortPreference, StudentRecord};
use crate::services::availability::{ClassAvailability, OccupancyView, resolve_all};

/// Shown when a student has no class or references an unknown one.
pub const CLASS_PLACEHOLDER: &str = "-";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterRow {
    pub student: StudentRecord,
    pub class_name: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RosterStats {
    pub total: usize,
    pub active: usize,
    pub inactive: usize,
}

impl RosterStats {
    pub fn from_students<'a>(students: impl IntoIterator<Item = &'a StudentRecord>) -> Self {
        let mut stats = Self::default();
        for student in students {
            stats.total += 1;
            if student.active {
                stats.active += 1;
            }
        }
        stats.inactive = stats.total - stats.active;
        stats
    }
}

/// Everything the renderer needs after one refresh.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RosterView {
    pub rows: Vec<RosterRow>,
    pub stats: RosterStats,
    pub classes: Vec<ClassAvailability>,
}

/// Merges one fetch of classes and students into a view.
///
/// `everyone` is the unfiltered student set used for occupancy; pass `None`
/// when `students` is already unfiltered.
pub fn build_view(
    classes: Vec<ClassRecord>,
    students: Vec<StudentRecord>,
    everyone: Option<&[StudentRecord]>,
    filters: &FilterCriteria,
    sort: SortPreference,
) -> RosterView {
    let occupancy = OccupancyView::from_students(everyone.unwrap_or(students.as_slice()));
    let availability = resolve_all(&classes, &occupancy);

    let names: HashMap<i64, String> = classes.into_iter().map(|c| (c.id, c.name)).collect();

    let mut listed: Vec<StudentRecord> = students
        .into_iter()
        .filter(|s| filters.matches(s))
        .collect();
    sort.sort(&mut listed);

    let stats = RosterStats::from_students(&listed);
    let rows = listed
        .into_iter()
        .map(|student| {
            let class_name = student
                .class_id
                .and_then(|id| names.get(&id).cloned())
                .unwrap_or_else(|| CLASS_PLACEHOLDER.to_string());
            RosterRow {
                student,
                class_name,
            }
        })
        .collect();

    RosterView {
        rows,
        stats,
        classes: availability,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// The view became current and should be rendered.
    Applied(RosterView),
    /// A newer refresh already landed; this result was dropped.
    Stale { sequence: u64 },
}

#[derive(Default)]
struct AppliedView {
    sequence: u64,
    view: Option<RosterView>,
}

pub struct RosterViewModel {
    api: Arc<dyn SchoolApi>,
    issued: AtomicU64,
    applied: Mutex<AppliedView>,
}

impl RosterViewModel {
    pub fn new(api: Arc<dyn SchoolApi>) -> Self {
        Self {
            api,
            issued: AtomicU64::new(0),
            applied: Mutex::new(AppliedView::default()),
        }
    }

    /// Fetches classes and students concurrently and derives the view.
    /// Either read failing fails the whole load.
    pub async fn load(
        &self,
        filters: &FilterCriteria,
        sort: SortPreference,
    ) -> Result<RosterView, AppError> {
        if filters.is_empty() {
            let (classes, students) =
                tokio::try_join!(self.api.list_classes(), self.api.list_students(filters))?;
            return Ok(build_view(classes, students, None, filters, sort));
        }

        let unfiltered = FilterCriteria::default();
        let (classes, students, everyone) = tokio::try_join!(
            self.api.list_classes(),
            self.api.list_students(filters),
            self.api.list_students(&unfiltered),
        )?;
        Ok(build_view(classes, students, Some(&everyone), filters, sort))
    }

    /// Loads a new view and makes it current unless a refresh issued later
    /// has already been applied. On error the current view is untouched; an
    /// error from a refresh that was already superseded counts as stale.
    pub async fn refresh(
        &self,
        filters: &FilterCriteria,
        sort: SortPreference,
    ) -> Result<RefreshOutcome, AppError> {
        let sequence = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        debug!("refresh #{} started", sequence);

        let loaded = self.load(filters, sort).await;

        let mut applied = self.applied.lock().unwrap_or_else(PoisonError::into_inner);
        let view = match loaded {
            Ok(view) => view,
            Err(e) if sequence < applied.sequence => {
                debug!("refresh #{} failed after being superseded: {}", sequence, e);
                return Ok(RefreshOutcome::Stale { sequence });
            }
            Err(e) => return Err(e),
        };
        if sequence < applied.sequence {
            debug!(
                "refresh #{} discarded, #{} already applied",
                sequence, applied.sequence
            );
            return Ok(RefreshOutcome::Stale { sequence });
        }
        applied.sequence = sequence;
        applied.view = Some(view.clone());
        debug!("refresh #{} applied: {} rows", sequence, view.rows.len());
        Ok(RefreshOutcome::Applied(view))
    }

    pub fn current(&self) -> Option<RosterView> {
        self.applied
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .view
            .clone()
    }
}
