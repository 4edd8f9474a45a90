//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod http_remote_record_sync;
mod in_memory_record_cache;
mod json_file_record_cache;
mod noop_remote_record_sync;

pub use http_remote_record_sync::HttpRemoteRecordSync;
pub use in_memory_record_cache::InMemoryRecordCache;
pub use json_file_record_cache::JsonFileRecordCache;
pub use noop_remote_record_sync::NoopRemoteRecordSync;
