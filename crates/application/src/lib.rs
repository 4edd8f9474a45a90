//! Application services and ports.

#![forbid(unsafe_code)]

mod form_validation;
mod list_session;
mod pagination;
mod record_ports;
mod record_query;
mod record_service;
mod record_store;

pub use form_validation::{is_simple_email, validate_draft};
pub use list_session::{
    FormMode, ListSession, ListView, NOTICE_TTL, Notice, NoticeKind, PendingForm,
};
pub use pagination::{DEFAULT_PAGE_SIZE, Page, Pagination, paginate, total_pages};
pub use record_ports::{RecordCache, RemoteChange, RemoteChangeKind, RemoteRecordSync};
pub use record_query::{
    ChoiceFilter, FILTER_ALL, FilterState, SortDirection, SortState, derive_records,
};
pub use record_service::{ListPage, MutationOutcome, RecordService, SyncFailurePolicy};
pub use record_store::{RecordStore, StoreChange};
