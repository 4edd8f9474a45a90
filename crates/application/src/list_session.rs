use std::time::Instant;

use roadwatch_core::{AppError, AppResult, FieldErrors};
use roadwatch_domain::{FieldType, Record, RecordId};
use serde_json::{Map, Value};
use tracing::debug;

use crate::form_validation::validate_draft;
use crate::pagination::{Pagination, paginate};
use crate::record_query::{ChoiceFilter, FilterState, SortState};
use crate::record_service::{MutationOutcome, RecordService};

mod notice;


pub use notice::{NOTICE_TTL, Notice, NoticeKind};

/// Whether the modal form creates a record or edits one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormMode {
    /// Creating a new record.
    Add,
    /// Editing an existing record.
    Edit(RecordId),
}

/// Draft held by an open modal form, with its inline field errors.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingForm {
    mode: FormMode,
    draft: Map<String, Value>,
    errors: FieldErrors,
}

impl PendingForm {
    /// Returns the form mode.
    #[must_use]
    pub fn mode(&self) -> FormMode {
        self.mode
    }

    /// Returns the draft values.
    #[must_use]
    pub fn draft(&self) -> &Map<String, Value> {
        &self.draft
    }

    /// Returns the inline field errors.
    #[must_use]
    pub fn errors(&self) -> &FieldErrors {
        &self.errors
    }
}

/// What the presentation layer renders for one cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct ListView {
    /// Records on the current page.
    pub items: Vec<Record>,
    /// Number of pages, at least one.
    pub total_pages: usize,
    /// One-based current page.
    pub current_page: usize,
    /// Number of records matching the filters.
    pub total_matches: usize,
}

/// State machine behind one list view.
///
/// Owns the filter, sort and page position, the modal form, the delete
/// confirmation and the current notice. Filter and sort changes return to page
/// one; mutations keep the page unless it no longer exists.
pub struct ListSession {
    service: RecordService,
    filter: FilterState,
    sort: SortState,
    pagination: Pagination,
    derived: Vec<Record>,
    form: Option<PendingForm>,
    pending_delete: Option<RecordId>,
    notice: Option<Notice>,
}

impl ListSession {
    /// Opens a session with default filters and the schema's default sort.
    pub async fn open(service: RecordService, page_size: usize) -> AppResult<Self> {
        let sort = SortState::default_for(service.schema());
        let mut session = Self {
            service,
            filter: FilterState::default(),
            sort,
            pagination: Pagination::new(page_size)?,
            derived: Vec::new(),
            form: None,
            pending_delete: None,
            notice: None,
        };
        session.refresh().await;

        Ok(session)
    }

    /// Returns the filter state.
    #[must_use]
    pub fn filter(&self) -> &FilterState {
        &self.filter
    }

    /// Returns the sort state.
    #[must_use]
    pub fn sort(&self) -> &SortState {
        &self.sort
    }

    /// Returns the open form, if any.
    #[must_use]
    pub fn form(&self) -> Option<&PendingForm> {
        self.form.as_ref()
    }

    /// Returns the record awaiting delete confirmation.
    #[must_use]
    pub fn pending_delete(&self) -> Option<RecordId> {
        self.pending_delete
    }

    /// Returns the notice still visible at `now`.
    #[must_use]
    pub fn notice(&self, now: Instant) -> Option<&Notice> {
        self.notice
            .as_ref()
            .filter(|notice| notice.is_visible_at(now))
    }

    /// Clears the current notice.
    pub fn dismiss_notice(&mut self) {
        self.notice = None;
    }

    /// Returns the current page of the derived list.
    #[must_use]
    pub fn view(&self) -> ListView {
        let page = paginate(
            &self.derived,
            self.pagination.page_size(),
            self.pagination.current_page(),
        );

        ListView {
            items: page.items,
            total_pages: page.total_pages,
            current_page: page.current_page,
            total_matches: self.derived.len(),
        }
    }

    /// Sets the free-text search term.
    pub async fn set_search_term(&mut self, search_term: impl Into<String>) {
        self.filter.search_term = search_term.into();
        self.rederive_from_first_page().await;
    }

    /// Sets the category filter.
    pub async fn set_category_filter(&mut self, filter: ChoiceFilter) {
        self.filter.category_filter = filter;
        self.rederive_from_first_page().await;
    }

    /// Sets the status filter.
    pub async fn set_status_filter(&mut self, filter: ChoiceFilter) {
        self.filter.status_filter = filter;
        self.rederive_from_first_page().await;
    }

    /// Sorts by `key`, flipping direction when it is already the active key.
    pub async fn sort_by(&mut self, key: &str) -> AppResult<()> {
        let toggled = self.sort.toggled(key);
        self.sort = SortState::new(self.service.schema(), key, toggled.direction)?;
        self.rederive_from_first_page().await;

        Ok(())
    }

    /// Moves to the next page; no-op on the last page.
    pub fn next_page(&mut self) -> bool {
        let total_pages = self.total_pages();
        self.pagination.next(total_pages)
    }

    /// Moves to the previous page; no-op on the first page.
    pub fn prev_page(&mut self) -> bool {
        let total_pages = self.total_pages();
        self.pagination.prev(total_pages)
    }

    /// Moves to `page`; no-op outside `[1, total_pages]`.
    pub fn go_to_page(&mut self, page: usize) -> bool {
        let total_pages = self.total_pages();
        self.pagination.go_to(page, total_pages)
    }

    /// Opens the form for a new record.
    pub fn open_add_form(&mut self) {
        let schema = self.service.schema();
        let mut draft = Map::new();
        for field in schema.fields() {
            let name = field.logical_name().as_str();
            if Some(name) == schema.created_date_field() {
                continue;
            }

            let initial = match field.field_type() {
                FieldType::MultiChoice | FieldType::Coordinates => Value::Array(Vec::new()),
                FieldType::Number => Value::Null,
                FieldType::Choice if Some(name) == schema.status_field() => field
                    .options()
                    .first()
                    .map(|option| Value::String(option.clone()))
                    .unwrap_or(Value::Null),
                FieldType::Choice if !field.is_required() => Value::Null,
                _ => Value::String(String::new()),
            };
            draft.insert(name.to_owned(), initial);
        }

        self.form = Some(PendingForm {
            mode: FormMode::Add,
            draft,
            errors: FieldErrors::new(),
        });
    }

    /// Opens the form pre-populated from record `id`.
    pub async fn open_edit_form(&mut self, id: RecordId) -> AppResult<()> {
        match self.service.get(id).await {
            Ok(record) => {
                self.form = Some(PendingForm {
                    mode: FormMode::Edit(id),
                    draft: record.data().clone(),
                    errors: FieldErrors::new(),
                });
                Ok(())
            }
            Err(error) => self.absorb(error).await,
        }
    }

    /// Sets one draft value and clears that field's error.
    ///
    /// Returns `false` when no form is open.
    pub fn set_draft_field(&mut self, field: &str, value: Value) -> bool {
        let Some(form) = self.form.as_mut() else {
            return false;
        };

        form.draft.insert(field.to_owned(), value);
        form.errors.clear_field(field);
        true
    }

    /// Discards the open form.
    pub fn cancel_form(&mut self) {
        self.form = None;
    }

    /// Validates and submits the open form.
    ///
    /// Returns whether a record was written. A rejected draft keeps the form
    /// open with its field errors and never reaches the store.
    pub async fn submit_form(&mut self) -> AppResult<bool> {
        let Some(form) = self.form.as_mut() else {
            return Ok(false);
        };

        let mut draft = form.draft.clone();
        if form.mode == FormMode::Add {
            draft.retain(|_, value| !value.is_null());
        }

        let errors = validate_draft(self.service.schema(), &draft);
        if !errors.is_empty() {
            debug!(
                resource = %self.service.schema().logical_name().as_str(),
                errors = %errors,
                "form submission blocked by validation"
            );
            form.errors = errors;
            return Ok(false);
        }

        let (result, verb) = match form.mode {
            FormMode::Add => (self.service.create(draft).await, "added"),
            FormMode::Edit(id) => (self.service.update(id, draft).await, "updated"),
        };

        match result {
            Ok(outcome) => {
                self.form = None;
                self.committed(outcome, verb).await;
                Ok(true)
            }
            Err(error) => {
                if matches!(error, AppError::NotFound(_)) {
                    self.form = None;
                }
                self.absorb(error).await?;
                Ok(false)
            }
        }
    }

    /// Asks for confirmation before deleting record `id`.
    pub fn request_delete(&mut self, id: RecordId) {
        self.pending_delete = Some(id);
    }

    /// Abandons the pending delete.
    pub fn cancel_delete(&mut self) {
        self.pending_delete = None;
    }

    /// Deletes the record awaiting confirmation.
    ///
    /// Returns whether a record was removed.
    pub async fn confirm_delete(&mut self) -> AppResult<bool> {
        let Some(id) = self.pending_delete.take() else {
            return Ok(false);
        };

        match self.service.remove(id).await {
            Ok(outcome) => {
                self.committed(outcome, "deleted").await;
                Ok(true)
            }
            Err(error) => {
                self.absorb(error).await?;
                Ok(false)
            }
        }
    }

    /// Flips the status of record `id`.
    ///
    /// Returns whether the record changed.
    pub async fn toggle_status(&mut self, id: RecordId) -> AppResult<bool> {
        match self.service.toggle_status(id).await {
            Ok(outcome) => {
                self.committed(outcome, "status updated").await;
                Ok(true)
            }
            Err(error) => {
                self.absorb(error).await?;
                Ok(false)
            }
        }
    }

    /// Re-derives the list from the store, keeping the page when it still
    /// exists.
    pub async fn refresh(&mut self) {
        self.derived = self.service.derive(&self.filter, &self.sort).await;
        let total_pages = self.total_pages();
        self.pagination.reset_if_out_of_range(total_pages);
    }

    async fn rederive_from_first_page(&mut self) {
        self.pagination.reset();
        self.refresh().await;
    }

    fn total_pages(&self) -> usize {
        crate::pagination::total_pages(self.derived.len(), self.pagination.page_size())
    }

    async fn committed(&mut self, outcome: MutationOutcome<Record>, verb: &str) {
        let label = record_label(&outcome.value);
        match outcome.remote_error {
            None => self.post(NoticeKind::Success, format!("{label} {verb}")),
            Some(remote_error) => self.post(
                NoticeKind::Error,
                format!("{label} {verb} locally; backend sync failed: {remote_error}"),
            ),
        }
        self.refresh().await;
    }

    async fn absorb(&mut self, error: AppError) -> AppResult<()> {
        match error {
            AppError::Internal(_) => return Err(error),
            AppError::InvalidFields(errors) => match self.form.as_mut() {
                Some(form) => form.errors = errors,
                None => self.post(NoticeKind::Error, format!("invalid fields: {errors}")),
            },
            AppError::RemoteSync(message) => {
                self.post(NoticeKind::Error, format!("Backend sync failed: {message}"));
            }
            other => self.post(NoticeKind::Error, other.to_string()),
        }

        // A stale id means the store changed underneath the view.
        self.refresh().await;
        Ok(())
    }

    fn post(&mut self, kind: NoticeKind, message: String) {
        self.notice = Some(Notice::new(kind, message, Instant::now()));
    }
}

fn record_label(record: &Record) -> String {
    record
        .text("name")
        .map(str::to_owned)
        .unwrap_or_else(|| format!("Record {}", record.id()))
}
