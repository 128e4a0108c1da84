use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::api::{ExportFormat, SchoolApi};
use crate::db::SortPreferenceStore;
use crate::error::{AppError, ErrorKind};
use crate::models::{FilterCriteria, SortPreference};
use crate::services::availability::{OccupancyView, resolve_all};
use crate::services::{
    ClassAvailability, ClassFormController, Debouncer, EnrollmentFormController, FormMode,
    RefreshOutcome, RosterViewModel, StudentFormController, export,
};
use crate::ui::{Notification, Renderer};

const LOAD_STUDENTS_FAILED: &str = "Erro ao carregar alunos";
const LOAD_CLASSES_FAILED: &str = "Erro ao carregar lista de turmas";
const SAVE_CLASS_FAILED: &str = "Erro ao salvar turma";
const SAVE_STUDENT_FAILED: &str = "Erro ao salvar aluno";
const ENROLL_FAILED: &str = "Erro ao realizar matrícula";
const DELETE_FAILED: &str = "Erro ao excluir aluno";
const EXPORT_FAILED: &str = "Erro ao exportar dados";
const EDIT_LOAD_FAILED: &str = "Erro ao carregar dados do aluno para edição";

/// Runs one refresh and draws it if it is still the newest. Failures are
/// reported to the user and leave the previous drawing in place.
async fn refresh_and_render(
    roster: &RosterViewModel,
    renderer: &dyn Renderer,
    filters: &FilterCriteria,
    sort: SortPreference,
) -> Result<(), AppError> {
    match roster.refresh(filters, sort).await {
        Ok(RefreshOutcome::Applied(view)) => {
            renderer.render_roster(&view);
            Ok(())
        }
        Ok(RefreshOutcome::Stale { .. }) => Ok(()),
        Err(e) => {
            warn!("roster refresh failed: {}", e);
            renderer.notify(&Notification::error(e.user_message(LOAD_STUDENTS_FAILED)));
            Err(e)
        }
    }
}

/// All client state for one session: filters, sort, form edit modes and
/// the handles used to talk to the backend and draw results.
pub struct AppState {
    api: Arc<dyn SchoolApi>,
    prefs: Arc<dyn SortPreferenceStore>,
    renderer: Arc<dyn Renderer>,
    roster: Arc<RosterViewModel>,
    search_debounce: Debouncer,
    filters: FilterCriteria,
    sort: SortPreference,
    pub class_form: ClassFormController,
    pub student_form: StudentFormController,
    pub enrollment_form: EnrollmentFormController,
}

impl AppState {
    /// Builds the session, reading the stored sort preference once.
    pub async fn load(
        api: Arc<dyn SchoolApi>,
        prefs: Arc<dyn SortPreferenceStore>,
        renderer: Arc<dyn Renderer>,
    ) -> Self {
        let sort = prefs.get().await;
        info!("session started with sort {} {:?}", sort.field, sort.direction);

        Self {
            roster: Arc::new(RosterViewModel::new(api.clone())),
            class_form: ClassFormController::new(api.clone()),
            student_form: StudentFormController::new(api.clone()),
            enrollment_form: EnrollmentFormController::new(api.clone()),
            search_debounce: Debouncer::default(),
            filters: FilterCriteria::default(),
            api,
            prefs,
            renderer,
            sort,
        }
    }

    pub fn with_debouncer(mut self, debouncer: Debouncer) -> Self {
        self.search_debounce = debouncer;
        self
    }

    pub fn filters(&self) -> &FilterCriteria {
        &self.filters
    }

    pub fn sort(&self) -> SortPreference {
        self.sort
    }

    pub fn roster(&self) -> &RosterViewModel {
        &self.roster
    }

    pub async fn refresh(&self) -> Result<(), AppError> {
        refresh_and_render(&self.roster, self.renderer.as_ref(), &self.filters, self.sort).await
    }

    /// Applies and persists a user-chosen sort, then refreshes. A failed
    /// write is logged; the new order still applies to this session.
    pub async fn set_sort(&mut self, sort: SortPreference) -> Result<(), AppError> {
        self.sort = sort;
        self.persist_sort().await;
        self.refresh().await
    }

    async fn persist_sort(&self) {
        if let Err(e) = self.prefs.set(&self.sort).await {
            warn!("failed to persist sort preference: {}", e);
        }
    }

    /// Installs filters and sort together with a single refresh. The sort
    /// is persisted only when it changed.
    pub async fn apply(
        &mut self,
        filters: FilterCriteria,
        sort: SortPreference,
    ) -> Result<(), AppError> {
        self.filters = filters;
        if sort != self.sort {
            self.sort = sort;
            self.persist_sort().await;
        }
        self.refresh().await
    }

    pub async fn set_filters(&mut self, filters: FilterCriteria) -> Result<(), AppError> {
        self.filters = filters;
        self.refresh().await
    }

    pub async fn set_class_filter(&mut self, class_id: Option<i64>) -> Result<(), AppError> {
        self.filters.class_id = class_id;
        self.refresh().await
    }

    pub async fn set_status_filter(&mut self, status: Option<bool>) -> Result<(), AppError> {
        self.filters.status = status;
        self.refresh().await
    }

    /// Records the search text and schedules a refresh after the quiet
    /// window. Each call cancels the previously scheduled one.
    pub fn on_search_input(&mut self, text: impl Into<String>) {
        self.filters.search = text.into();

        let roster = self.roster.clone();
        let renderer = self.renderer.clone();
        let filters = self.filters.clone();
        let sort = self.sort;
        self.search_debounce.schedule(move || async move {
            let _ = refresh_and_render(&roster, renderer.as_ref(), &filters, sort).await;
        });
    }

    /// Cancels a pending debounced search and runs it now.
    pub async fn flush_search(&self) -> Result<(), AppError> {
        self.search_debounce.cancel();
        self.refresh().await
    }

    /// Management list of classes with occupancy from the unfiltered roster.
    pub async fn show_classes(&self) -> Result<Vec<ClassAvailability>, AppError> {
        let everyone = FilterCriteria::default();
        let loaded = tokio::try_join!(self.api.list_classes(), self.api.list_students(&everyone));
        match loaded {
            Ok((classes, students)) => {
                let availability = resolve_all(&classes, &OccupancyView::from_students(&students));
                self.renderer.render_classes(&availability);
                Ok(availability)
            }
            Err(e) => Err(self.report(e, LOAD_CLASSES_FAILED)),
        }
    }

    pub async fn submit_class_form(&mut self) -> Result<(), AppError> {
        match self.class_form.submit().await {
            Ok(_) => {
                self.notify_success("Turma salva com sucesso");
                self.after_write().await;
                let _ = self.show_classes().await;
                Ok(())
            }
            Err(e) => Err(self.report(e, SAVE_CLASS_FAILED)),
        }
    }

    pub async fn submit_student_form(&mut self) -> Result<(), AppError> {
        match self.student_form.submit().await {
            Ok(FormMode::Create) => {
                self.notify_success("Aluno cadastrado com sucesso!");
                self.after_write().await;
                Ok(())
            }
            Ok(FormMode::Update(_)) => {
                self.notify_success("Aluno atualizado com sucesso!");
                self.after_write().await;
                Ok(())
            }
            Err(e) => Err(self.report(e, SAVE_STUDENT_FAILED)),
        }
    }

    pub async fn submit_enrollment_form(&mut self) -> Result<(), AppError> {
        match self.enrollment_form.submit().await {
            Ok(_) => {
                self.notify_success("Matrícula realizada com sucesso!");
                self.after_write().await;
                Ok(())
            }
            Err(e) => Err(self.report(e, ENROLL_FAILED)),
        }
    }

    pub async fn edit_class(&mut self, id: i64) -> Result<(), AppError> {
        let found = match self.api.list_classes().await {
            Ok(classes) => classes.into_iter().find(|c| c.id == id),
            Err(e) => return Err(self.report(e, LOAD_CLASSES_FAILED)),
        };
        match found {
            Some(class) => {
                self.class_form.begin_edit(&class);
                Ok(())
            }
            None => Err(self.report(
                AppError::NotFound("Turma não encontrada".to_string()),
                LOAD_CLASSES_FAILED,
            )),
        }
    }

    pub async fn edit_student(&mut self, id: i64) -> Result<(), AppError> {
        match self.student_form.begin_edit_by_id(id).await {
            Ok(()) => Ok(()),
            Err(e) => Err(self.report(e, EDIT_LOAD_FAILED)),
        }
    }

    /// Deletes a student. `confirmed` is the user's answer to the
    /// confirmation prompt; without it nothing is sent.
    pub async fn delete_student(&mut self, id: i64, confirmed: bool) -> Result<bool, AppError> {
        if !confirmed {
            return Ok(false);
        }
        match self.api.delete_student(id).await {
            Ok(()) => {
                info!("student {} deleted", id);
                self.notify_success("Aluno excluído com sucesso!");
                self.after_write().await;
                Ok(true)
            }
            Err(e) => Err(self.report(e, DELETE_FAILED)),
        }
    }

    pub async fn export(
        &self,
        format: ExportFormat,
        target: Option<&Path>,
    ) -> Result<PathBuf, AppError> {
        match export::export_students(self.api.as_ref(), format, target).await {
            Ok(path) => {
                self.notify_success(&format!("Dados exportados para {}", path.display()));
                Ok(path)
            }
            Err(e) => Err(self.report(e, EXPORT_FAILED)),
        }
    }

    async fn after_write(&self) {
        // refresh failures are already reported to the user
        let _ = self.refresh().await;
    }

    fn notify_success(&self, message: &str) {
        self.renderer.notify(&Notification::success(message));
    }

    fn report(&self, error: AppError, fallback: &str) -> AppError {
        match error.kind() {
            ErrorKind::Validation => debug!("rejected input: {}", error),
            _ => warn!("operation failed: {}", error),
        }
        self.renderer
            .notify(&Notification::error(error.user_message(fallback)));
        error
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::InMemorySchoolApi;
    use crate::db::MemoryPreferenceStore;
    use crate::models::{ClassRecord, SortDirection, SortField, StudentRecord};
    use crate::ui::RecordingRenderer;
    use chrono::NaiveDate;
    use std::time::Duration;

    fn student(id: i64, name: &str, class_id: Option<i64>, active: bool) -> StudentRecord {
        StudentRecord {
            id,
            name: name.to_string(),
            birth_date: NaiveDate::from_ymd_opt(2012, 6, 1).unwrap(),
            email: None,
            class_id,
            active,
        }
    }

    fn seeded_api() -> Arc<InMemorySchoolApi> {
        Arc::new(InMemorySchoolApi::with_data(
            vec![ClassRecord {
                id: 1,
                name: "3A".to_string(),
                capacity: 2,
            }],
            vec![
                student(10, "Carla", Some(1), true),
                student(11, "Ana", Some(1), false),
                student(12, "Bruno", None, true),
            ],
        ))
    }

    fn fresh_prefs() -> Arc<MemoryPreferenceStore> {
        Arc::new(MemoryPreferenceStore::new())
    }

    async fn session(
        api: Arc<InMemorySchoolApi>,
        prefs: Arc<MemoryPreferenceStore>,
    ) -> (AppState, Arc<RecordingRenderer>) {
        let renderer = Arc::new(RecordingRenderer::new());
        let state = AppState::load(api, prefs, renderer.clone()).await;
        (state, renderer)
    }

    fn row_ids(renderer: &RecordingRenderer) -> Vec<i64> {
        renderer
            .last_roster()
            .expect("nothing rendered")
            .rows
            .iter()
            .map(|r| r.student.id)
            .collect()
    }

    #[tokio::test]
    async fn startup_uses_stored_sort() {
        let prefs = Arc::new(MemoryPreferenceStore::with_raw(
            r#"{"field":"name","direction":"desc"}"#,
        ));
        let (state, renderer) = session(seeded_api(), prefs).await;

        state.refresh().await.unwrap();
        assert_eq!(row_ids(&renderer), vec![10, 12, 11]);
    }

    #[tokio::test]
    async fn corrupted_preference_starts_with_default() {
        let prefs = Arc::new(MemoryPreferenceStore::with_raw("][garbage"));
        let (state, _) = session(seeded_api(), prefs).await;
        assert_eq!(state.sort(), SortPreference::default());
    }

    #[tokio::test]
    async fn changing_sort_persists_and_rerenders() {
        let prefs = Arc::new(MemoryPreferenceStore::new());
        let (mut state, renderer) = session(seeded_api(), prefs.clone()).await;

        let sort = SortPreference::new(SortField::Active, SortDirection::Ascending);
        state.set_sort(sort).await.unwrap();

        assert_eq!(row_ids(&renderer), vec![11, 10, 12]);
        assert_eq!(
            prefs.raw().as_deref(),
            Some(r#"{"field":"active","direction":"asc"}"#)
        );
    }

    #[tokio::test]
    async fn sort_and_filters_render_once() {
        let prefs = fresh_prefs();
        let (mut state, renderer) = session(seeded_api(), prefs.clone()).await;

        let filters = FilterCriteria {
            status: Some(true),
            ..Default::default()
        };
        let sort = SortPreference::new(SortField::Name, SortDirection::Descending);
        state.apply(filters, sort).await.unwrap();

        assert_eq!(renderer.rosters().len(), 1);
        assert_eq!(row_ids(&renderer), vec![10, 12]);
        assert_eq!(
            prefs.raw().as_deref(),
            Some(r#"{"field":"name","direction":"desc"}"#)
        );
    }

    #[tokio::test]
    async fn unchanged_sort_is_not_rewritten() {
        let prefs = fresh_prefs();
        let (mut state, renderer) = session(seeded_api(), prefs.clone()).await;

        state
            .apply(FilterCriteria::default(), SortPreference::default())
            .await
            .unwrap();

        assert_eq!(renderer.rosters().len(), 1);
        assert_eq!(prefs.raw(), None);
    }

    #[tokio::test]
    async fn status_filter_keeps_global_occupancy() {
        let (mut state, renderer) = session(seeded_api(), fresh_prefs()).await;

        state.set_status_filter(Some(true)).await.unwrap();

        let view = renderer.last_roster().unwrap();
        assert_eq!(row_ids(&renderer), vec![12, 10]);
        assert_eq!(view.stats.total, 2);
        assert_eq!(view.stats.inactive, 0);
        assert_eq!(view.classes[0].occupied, 2);
        assert!(view.classes[0].is_full);
    }

    #[tokio::test]
    async fn failed_refresh_keeps_previous_render() {
        let api = seeded_api();
        let (state, renderer) = session(api.clone(), fresh_prefs()).await;
        state.refresh().await.unwrap();

        api.set_fail_student_reads(true);
        assert!(state.refresh().await.is_err());

        assert_eq!(renderer.rosters().len(), 1);
        assert_eq!(renderer.last_message().as_deref(), Some("Erro: Erro ao carregar alunos"));
        assert_eq!(state.roster().current().unwrap().rows.len(), 3);
    }

    #[tokio::test]
    async fn full_class_enrollment_shows_server_detail() {
        let (mut state, renderer) = session(seeded_api(), fresh_prefs()).await;
        state.enrollment_form.values.student_id = "12".to_string();
        state.enrollment_form.values.class_id = "1".to_string();

        assert!(state.submit_enrollment_form().await.is_err());
        assert_eq!(renderer.last_message().as_deref(), Some("Erro: Turma está lotada"));
        assert_eq!(state.enrollment_form.values.student_id, "12");
        assert!(renderer.rosters().is_empty());
    }

    #[tokio::test]
    async fn student_without_name_is_rejected_locally() {
        let api = seeded_api();
        let (mut state, renderer) = session(api.clone(), fresh_prefs()).await;
        state.student_form.values.birth_date = "2015-01-01".to_string();

        assert!(state.submit_student_form().await.is_err());
        assert_eq!(api.request_count(), 0);
        assert_eq!(renderer.last_message().as_deref(), Some("Erro: Nome é obrigatório"));
    }

    #[tokio::test]
    async fn saved_student_notifies_then_refreshes() {
        let (mut state, renderer) = session(seeded_api(), fresh_prefs()).await;
        state.student_form.values.name = "Davi".to_string();
        state.student_form.values.birth_date = "2015-01-01".to_string();

        state.submit_student_form().await.unwrap();

        assert_eq!(
            renderer.notifications(),
            vec![Notification::success("Aluno cadastrado com sucesso!")]
        );
        assert_eq!(renderer.last_roster().unwrap().stats.total, 4);
        assert_eq!(state.student_form.editing_id(), None);
    }

    #[tokio::test]
    async fn edited_student_reports_update() {
        let (mut state, renderer) = session(seeded_api(), fresh_prefs()).await;
        state.edit_student(12).await.unwrap();
        state.student_form.values.name = "Bruno Lima".to_string();

        state.submit_student_form().await.unwrap();
        assert_eq!(
            renderer.notifications(),
            vec![Notification::success("Aluno atualizado com sucesso!")]
        );
    }

    #[tokio::test]
    async fn delete_requires_confirmation() {
        let api = seeded_api();
        let (mut state, renderer) = session(api.clone(), fresh_prefs()).await;

        assert!(!state.delete_student(12, false).await.unwrap());
        assert_eq!(api.request_count(), 0);

        assert!(state.delete_student(12, true).await.unwrap());
        assert_eq!(api.students().len(), 2);
        assert_eq!(renderer.notifications()[0].to_string(), "Aluno excluído com sucesso!");
    }

    #[tokio::test]
    async fn class_list_shows_occupancy() {
        let (mut state, renderer) = session(seeded_api(), fresh_prefs()).await;
        state.class_form.values.name = "4B".to_string();
        state.class_form.values.capacity = "20".to_string();

        state.submit_class_form().await.unwrap();

        let lists = renderer.class_lists();
        let labels: Vec<_> = lists
            .last()
            .unwrap()
            .iter()
            .map(|c| c.management_label())
            .collect();
        assert_eq!(labels, vec!["3A (2/2 alunos)", "4B (0/20 alunos)"]);
    }

    #[tokio::test]
    async fn renaming_a_class_keeps_its_id() {
        let api = seeded_api();
        let (mut state, renderer) = session(api.clone(), fresh_prefs()).await;

        state.edit_class(1).await.unwrap();
        assert_eq!(state.class_form.values.capacity, "2");
        state.class_form.values.name = "3A Manhã".to_string();
        state.submit_class_form().await.unwrap();

        assert_eq!(api.classes()[0].name, "3A Manhã");
        assert_eq!(renderer.last_roster().unwrap().rows[2].class_name, "3A Manhã");
        assert!(state.edit_class(9).await.is_err());
        assert_eq!(renderer.last_message().as_deref(), Some("Erro: Turma não encontrada"));
    }

    #[tokio::test(start_paused = true)]
    async fn typing_fires_one_refresh_after_pause() {
        let (state, renderer) = session(seeded_api(), fresh_prefs()).await;
        let mut state = state.with_debouncer(Debouncer::new(Duration::from_millis(200)));

        for text in ["b", "br", "bru"] {
            state.on_search_input(text);
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(renderer.rosters().is_empty());

        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(renderer.rosters().len(), 1);
        assert_eq!(row_ids(&renderer), vec![12]);
        assert_eq!(state.filters().search, "bru");
    }
}
