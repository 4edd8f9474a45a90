use std::num::NonZeroUsize;

use roadwatch_application::RecordService;

/// State shared by the routes of one managed collection.
#[derive(Clone)]
pub struct CollectionState {
    pub service: RecordService,
    pub page_size: NonZeroUsize,
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub users: CollectionState,
    pub assets: CollectionState,
    pub roads: CollectionState,
}
