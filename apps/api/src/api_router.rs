use axum::Router;
use axum::routing::{get, post};
use roadwatch_core::AppError;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::{AppState, CollectionState};

mod cors;

pub fn build_router(app_state: AppState, frontend_url: &str) -> Result<Router, AppError> {
    let road_routes = record_routes().merge(
        Router::new()
            .route("/stats", get(handlers::roads::road_stats_handler))
            .route("/map", get(handlers::roads::road_map_handler))
            .route("/{record_id}/center", get(handlers::roads::road_center_handler)),
    );

    Ok(Router::new()
        .route("/health", get(handlers::health::health_handler))
        .nest("/api/users", record_routes().with_state(app_state.users))
        .nest("/api/assets", record_routes().with_state(app_state.assets))
        .nest("/api/roads", road_routes.with_state(app_state.roads))
        .layer(cors::build_cors_layer(frontend_url)?)
        .layer(TraceLayer::new_for_http()))
}

fn record_routes() -> Router<CollectionState> {
    Router::new()
        .route(
            "/",
            get(handlers::records::list_records_handler)
                .post(handlers::records::create_record_handler),
        )
        .route(
            "/breakdown/{field}",
            get(handlers::records::breakdown_handler),
        )
        .route(
            "/{record_id}",
            get(handlers::records::get_record_handler)
                .patch(handlers::records::update_record_handler)
                .delete(handlers::records::delete_record_handler),
        )
        .route(
            "/{record_id}/toggle-status",
            post(handlers::records::toggle_status_handler),
        )
}
