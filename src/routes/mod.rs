use axum::{
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::Serialize;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::handlers::menu;
use crate::menu::PageMeta;
use crate::state::AppState;

pub mod health;

/// API response wrapper
#[derive(Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub code: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<PageMeta>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self::with_message("success", data)
    }

    pub fn with_message(message: impl Into<String>, data: T) -> Self {
        Self {
            code: true,
            message: message.into(),
            data: Some(data),
            meta: None,
        }
    }

    pub fn paged(data: T, meta: PageMeta) -> Self {
        Self {
            meta: Some(meta),
            ..Self::success(data)
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            code: false,
            message: message.into(),
            data: None,
            meta: None,
        }
    }
}

/// Create the main router
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Static segments take precedence over `/menus/:id`.
    let api_routes = Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Menu collection
        .route("/menus", get(menu::list_menus).post(menu::create_menu))
        .route("/menus/tree", get(menu::get_tree))
        .route("/menus/parents", get(menu::get_parents))
        .route("/menus/children/:parent_id", get(menu::get_children))
        .route("/menus/search", get(menu::search_menus))
        .route("/menus/stats", get(menu::get_stats))
        .route("/menus/check-exists", get(menu::check_exists))
        .route("/menus/by-url", get(menu::get_by_url))
        .route("/menus/by-permission/:permission", get(menu::get_by_permission))
        .route("/menus/export", get(menu::export_menus))
        .route("/menus/import", post(menu::import_menus))
        // Batch operations
        .route("/menus/reorder", post(menu::reorder_menus))
        .route("/menus/bulk-delete", post(menu::bulk_delete))
        .route("/menus/bulk-update", post(menu::bulk_update))
        // Single menu
        .route(
            "/menus/:id",
            get(menu::get_menu)
                .put(menu::update_menu)
                .delete(menu::delete_menu),
        )
        .route("/menus/:id/deletion-plan", get(menu::deletion_plan))
        .route("/menus/:id/breadcrumb", get(menu::get_breadcrumb))
        .route("/menus/:id/toggle-status", post(menu::toggle_status))
        .route("/menus/:id/duplicate", post(menu::duplicate_menu))
        .route("/menus/:id/move", post(menu::move_menu));

    Router::new()
        .nest("/api", api_routes)
        .fallback(fallback)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Fallback handler for 404
pub async fn fallback() -> (StatusCode, Json<ApiResponse<()>>) {
    (StatusCode::NOT_FOUND, Json(ApiResponse::error("Not Found")))
}
