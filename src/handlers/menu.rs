//! Menu handlers
//!
//! Thin HTTP layer over `MenuService`: extract, run one engine operation,
//! wrap the result in `ApiResponse`.

use axum::{
    extract::{Path, Query, State},
    http::header,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult, OptionExt};
use crate::menu::query::{SortDirection, SortField};
use crate::menu::{
    build_tree, compute_stats, filter, paginate, transfer, BulkReport, CreateMenu, Deletion,
    DeletionPlan, DuplicateOverrides, ImportReport, ListParams, MenuFilter, MenuForest, MenuId,
    MenuPatch, MenuRecord, MenuStats, ParentFilter, ReorderItem, TransferFormat,
};
use crate::routes::ApiResponse;
use crate::state::AppState;

type ApiResult<T> = AppResult<Json<ApiResponse<T>>>;

/// Query parameters for the paginated list
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub search: Option<String>,
    pub is_active: Option<bool>,
    pub parent_id: Option<ParentFilter>,
    pub permission: Option<String>,
    pub page: Option<usize>,
    pub per_page: Option<usize>,
    pub sort_by: Option<SortField>,
    /// asc / desc
    pub sort_order: Option<SortDirection>,
}

impl ListQuery {
    fn filter(&self) -> MenuFilter {
        MenuFilter {
            search: self.search.clone(),
            is_active: self.is_active,
            parent_id: self.parent_id,
            permission: self.permission.clone(),
        }
    }

    fn params(&self, default_per_page: usize) -> ListParams {
        ListParams {
            page: self.page.unwrap_or(1),
            per_page: self.per_page.unwrap_or(default_per_page),
            sort_by: self.sort_by.unwrap_or_default(),
            direction: self.sort_order.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct TreeQuery {
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct CheckExistsQuery {
    pub name: String,
    pub exclude_id: Option<MenuId>,
}

#[derive(Debug, Serialize)]
pub struct ExistsResponse {
    pub exists: bool,
}

#[derive(Debug, Deserialize)]
pub struct UrlQuery {
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct FormatQuery {
    pub format: Option<String>,
}

impl FormatQuery {
    fn format(&self) -> AppResult<TransferFormat> {
        match self.format.as_deref() {
            None | Some("") => Ok(TransferFormat::default()),
            Some(s) => Ok(s.parse::<TransferFormat>()?),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ReorderRequest {
    pub menus: Vec<ReorderItem>,
}

#[derive(Debug, Deserialize)]
pub struct BulkDeleteRequest {
    pub ids: Vec<MenuId>,
}

#[derive(Debug, Deserialize)]
pub struct BulkUpdateRequest {
    pub ids: Vec<MenuId>,
    pub data: MenuPatch,
}

/// Body of `/menus/:id/move`; a missing or null `parent_id` moves to the root
#[derive(Debug, Deserialize)]
pub struct MoveRequest {
    #[serde(default)]
    pub parent_id: Option<MenuId>,
}

/// GET /api/menus
pub async fn list_menus(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Vec<MenuRecord>> {
    let params = query.params(state.config.pagination.default_per_page);
    let max_per_page = state.config.pagination.max_per_page;
    let menu_filter = query.filter();

    let page = state
        .menus
        .read(|s| paginate(filter(s.records(), &menu_filter), &params, max_per_page))
        .await?;

    Ok(Json(ApiResponse::paged(page.data, page.meta)))
}

/// POST /api/menus
pub async fn create_menu(
    State(state): State<AppState>,
    Json(req): Json<CreateMenu>,
) -> ApiResult<MenuRecord> {
    let record = state.menus.mutate(|s| s.create(req)).await?;
    tracing::info!("Menu created: {} ({})", record.id, record.name);
    Ok(Json(ApiResponse::with_message("Menu created", record)))
}

/// GET /api/menus/tree
pub async fn get_tree(
    State(state): State<AppState>,
    Query(query): Query<TreeQuery>,
) -> ApiResult<MenuForest> {
    let forest = state.menus.read(|s| build_tree(s.records())).await;
    if !forest.orphans.is_empty() || !forest.unreachable.is_empty() {
        tracing::warn!(
            "Menu tree has {} orphans and {} unreachable records",
            forest.orphans.len(),
            forest.unreachable.len()
        );
    }

    let forest = match query.is_active {
        Some(flag) => forest.prune(|r| r.is_active == flag),
        None => forest,
    };
    Ok(Json(ApiResponse::success(forest)))
}

/// GET /api/menus/parents
pub async fn get_parents(State(state): State<AppState>) -> ApiResult<Vec<MenuRecord>> {
    let roots: Vec<MenuRecord> = state
        .menus
        .read(|s| s.roots().into_iter().cloned().collect())
        .await;
    Ok(Json(ApiResponse::success(roots)))
}

/// GET /api/menus/children/:parent_id
pub async fn get_children(
    State(state): State<AppState>,
    Path(parent_id): Path<MenuId>,
) -> ApiResult<Vec<MenuRecord>> {
    let children: Vec<MenuRecord> = state
        .menus
        .read(|s| {
            s.require(parent_id)?;
            Ok::<_, AppError>(s.children(Some(parent_id)).into_iter().cloned().collect())
        })
        .await?;
    Ok(Json(ApiResponse::success(children)))
}

/// GET /api/menus/search
pub async fn search_menus(
    State(state): State<AppState>,
    Query(menu_filter): Query<MenuFilter>,
) -> ApiResult<Vec<MenuRecord>> {
    let found: Vec<MenuRecord> = state
        .menus
        .read(|s| filter(s.records(), &menu_filter).into_iter().cloned().collect())
        .await;
    Ok(Json(ApiResponse::success(found)))
}

/// GET /api/menus/stats
pub async fn get_stats(State(state): State<AppState>) -> ApiResult<MenuStats> {
    let stats = state.menus.read(|s| compute_stats(s.records())).await;
    Ok(Json(ApiResponse::success(stats)))
}

/// GET /api/menus/check-exists
pub async fn check_exists(
    State(state): State<AppState>,
    Query(query): Query<CheckExistsQuery>,
) -> ApiResult<ExistsResponse> {
    let exists = state
        .menus
        .read(|s| s.name_exists(&query.name, query.exclude_id))
        .await;
    Ok(Json(ApiResponse::success(ExistsResponse { exists })))
}

/// GET /api/menus/by-url
pub async fn get_by_url(
    State(state): State<AppState>,
    Query(query): Query<UrlQuery>,
) -> ApiResult<MenuRecord> {
    let record = state
        .menus
        .read(|s| s.find_by_url(&query.url).cloned())
        .await
        .ok_or_not_found(format!("No menu with url {}", query.url))?;
    Ok(Json(ApiResponse::success(record)))
}

/// GET /api/menus/by-permission/:permission
pub async fn get_by_permission(
    State(state): State<AppState>,
    Path(permission): Path<String>,
) -> ApiResult<Vec<MenuRecord>> {
    let menu_filter = MenuFilter {
        permission: Some(permission),
        ..Default::default()
    };
    let found: Vec<MenuRecord> = state
        .menus
        .read(|s| filter(s.records(), &menu_filter).into_iter().cloned().collect())
        .await;
    Ok(Json(ApiResponse::success(found)))
}

/// GET /api/menus/export
pub async fn export_menus(
    State(state): State<AppState>,
    Query(query): Query<FormatQuery>,
) -> AppResult<Response> {
    let format = query.format()?;
    let content = state
        .menus
        .read(|s| transfer::export(s.records(), format))
        .await?;

    let disposition = format!("attachment; filename=\"menus.{}\"", format.extension());
    Ok((
        [
            (header::CONTENT_TYPE, format.content_type().to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        content,
    )
        .into_response())
}

/// POST /api/menus/import
pub async fn import_menus(
    State(state): State<AppState>,
    Query(query): Query<FormatQuery>,
    body: String,
) -> ApiResult<ImportReport> {
    let format = query.format()?;
    let records = transfer::parse(&body, format)?;
    if records.is_empty() {
        return Err(AppError::BadRequest("Import file contains no menus".to_string()));
    }

    let report = state.menus.mutate(|s| s.import(records)).await?;
    Ok(Json(ApiResponse::with_message("Menus imported", report)))
}

/// POST /api/menus/reorder
pub async fn reorder_menus(
    State(state): State<AppState>,
    Json(req): Json<ReorderRequest>,
) -> ApiResult<Vec<MenuRecord>> {
    let updated = state.menus.mutate(|s| s.reorder(&req.menus)).await?;
    Ok(Json(ApiResponse::with_message("Menus reordered", updated)))
}

/// POST /api/menus/bulk-delete
pub async fn bulk_delete(
    State(state): State<AppState>,
    Json(req): Json<BulkDeleteRequest>,
) -> ApiResult<BulkReport> {
    let report = state.menus.mutate(|s| s.bulk_delete(&req.ids)).await?;
    tracing::info!("Bulk deleted {} menus", report.affected.len());
    Ok(Json(ApiResponse::with_message("Menus deleted", report)))
}

/// POST /api/menus/bulk-update
pub async fn bulk_update(
    State(state): State<AppState>,
    Json(req): Json<BulkUpdateRequest>,
) -> ApiResult<BulkReport> {
    let report = state
        .menus
        .mutate(|s| s.bulk_update(&req.ids, &req.data))
        .await?;
    Ok(Json(ApiResponse::with_message("Menus updated", report)))
}

/// GET /api/menus/:id
pub async fn get_menu(
    State(state): State<AppState>,
    Path(id): Path<MenuId>,
) -> ApiResult<MenuRecord> {
    let record = state.menus.read(|s| s.require(id).cloned()).await?;
    Ok(Json(ApiResponse::success(record)))
}

/// PUT /api/menus/:id
pub async fn update_menu(
    State(state): State<AppState>,
    Path(id): Path<MenuId>,
    Json(patch): Json<MenuPatch>,
) -> ApiResult<MenuRecord> {
    let record = state.menus.mutate(|s| s.update(id, &patch)).await?;
    Ok(Json(ApiResponse::with_message("Menu updated", record)))
}

/// DELETE /api/menus/:id
pub async fn delete_menu(
    State(state): State<AppState>,
    Path(id): Path<MenuId>,
) -> ApiResult<Deletion> {
    let deletion = state.menus.mutate(|s| s.delete(id)).await?;
    tracing::info!("Menu {} deleted ({} records)", id, deletion.count());
    Ok(Json(ApiResponse::with_message("Menu deleted", deletion)))
}

/// GET /api/menus/:id/deletion-plan
pub async fn deletion_plan(
    State(state): State<AppState>,
    Path(id): Path<MenuId>,
) -> ApiResult<DeletionPlan> {
    let plan = state
        .menus
        .read(|s| crate::menu::validator::validate_delete(s, id))
        .await?;
    Ok(Json(ApiResponse::success(plan)))
}

/// GET /api/menus/:id/breadcrumb
pub async fn get_breadcrumb(
    State(state): State<AppState>,
    Path(id): Path<MenuId>,
) -> ApiResult<Vec<MenuRecord>> {
    let chain = state
        .menus
        .read(|s| s.breadcrumb(id).map(|c| c.into_iter().cloned().collect::<Vec<_>>()))
        .await?;
    Ok(Json(ApiResponse::success(chain)))
}

/// POST /api/menus/:id/toggle-status
pub async fn toggle_status(
    State(state): State<AppState>,
    Path(id): Path<MenuId>,
) -> ApiResult<MenuRecord> {
    let record = state.menus.mutate(|s| s.toggle_active(id)).await?;
    let message = if record.is_active { "Menu activated" } else { "Menu deactivated" };
    Ok(Json(ApiResponse::with_message(message, record)))
}

/// POST /api/menus/:id/duplicate
///
/// The body is optional; an empty body duplicates with default naming.
pub async fn duplicate_menu(
    State(state): State<AppState>,
    Path(id): Path<MenuId>,
    body: String,
) -> ApiResult<MenuRecord> {
    let overrides: DuplicateOverrides = if body.trim().is_empty() {
        DuplicateOverrides::default()
    } else {
        serde_json::from_str(&body)?
    };
    let record = state.menus.mutate(|s| s.duplicate(id, overrides)).await?;
    Ok(Json(ApiResponse::with_message("Menu duplicated", record)))
}

/// POST /api/menus/:id/move
pub async fn move_menu(
    State(state): State<AppState>,
    Path(id): Path<MenuId>,
    Json(req): Json<MoveRequest>,
) -> ApiResult<MenuRecord> {
    let record = state.menus.mutate(|s| s.move_menu(id, req.parent_id)).await?;
    Ok(Json(ApiResponse::with_message("Menu moved", record)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::menu::MenuStore;
    use crate::routes::create_router;
    use axum::body::{to_bytes, Body};
    use axum::http::{Method, Request, StatusCode};
    use axum::Router;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    /// main(1) > settings(2) > profile(3); help(4) is a second root
    fn app() -> Router {
        let mut store = MenuStore::new();
        let main = store.create(CreateMenu::new("main", "Main", "/")).unwrap();
        let settings = store
            .create(CreateMenu::new("settings", "Settings", "/settings").under(main.id))
            .unwrap();
        store
            .create(CreateMenu::new("profile", "Profile", "/settings/profile").under(settings.id))
            .unwrap();
        store.create(CreateMenu::new("help", "Help", "/help").sorted(1)).unwrap();
        create_router(AppState::in_memory(store))
    }

    async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(v) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(v.to_string())
            }
            None => Body::empty(),
        };
        let response = app.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = send(&app(), Method::GET, "/api/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["storage"], "memory");
        assert_eq!(body["data"]["menus"], 4);
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let app = app();
        let (status, body) = send(
            &app,
            Method::POST,
            "/api/menus",
            Some(json!({"name": "gifts", "display_name": "Gifts", "url": "/gifts", "parent_id": 1})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["code"], true);
        assert_eq!(body["data"]["id"], 5);
        assert_eq!(body["data"]["target"], "_self");

        let (status, body) = send(&app, Method::GET, "/api/menus/5", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["parent_id"], 1);
    }

    #[tokio::test]
    async fn test_create_validation_error_lists_fields() {
        let (status, body) = send(
            &app(),
            Method::POST,
            "/api/menus",
            Some(json!({"name": "Bad Name", "display_name": "", "url": "/x"})),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        let fields: Vec<&str> = body["details"]
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e["field"].as_str().unwrap())
            .collect();
        assert!(fields.contains(&"name"));
        assert!(fields.contains(&"display_name"));
    }

    #[tokio::test]
    async fn test_duplicate_name_conflict() {
        let (status, _) = send(
            &app(),
            Method::POST,
            "/api/menus",
            Some(json!({"name": "help", "display_name": "Help", "url": "/help2"})),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_list_is_paginated() {
        let (status, body) = send(&app(), Method::GET, "/api/menus?per_page=3&sort_by=id", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"].as_array().unwrap().len(), 3);
        assert_eq!(body["meta"]["total"], 4);
        assert_eq!(body["meta"]["last_page"], 2);

        let (status, _) = send(&app(), Method::GET, "/api/menus?per_page=500", None).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let uri = format!("/api/menus?page={}", usize::MAX);
        let (status, body) = send(&app(), Method::GET, &uri, None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["data"].as_array().unwrap().is_empty());
        assert_eq!(body["meta"]["last_page"], 1);
    }

    #[tokio::test]
    async fn test_list_filters_roots() {
        let (_, body) = send(&app(), Method::GET, "/api/menus?parent_id=root", None).await;
        let names: Vec<&str> = body["data"]
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, ["main", "help"]);
    }

    #[tokio::test]
    async fn test_tree_and_active_pruning() {
        let app = app();
        let (_, body) = send(&app, Method::GET, "/api/menus/tree", None).await;
        let roots = body["data"]["roots"].as_array().unwrap();
        assert_eq!(roots.len(), 2);
        assert_eq!(roots[0]["children"][0]["children"][0]["name"], "profile");
        assert_eq!(roots[0]["children"][0]["children"][0]["level"], 2);

        send(&app, Method::POST, "/api/menus/2/toggle-status", None).await;
        let (_, body) = send(&app, Method::GET, "/api/menus/tree?is_active=true", None).await;
        let main = &body["data"]["roots"][0];
        assert_eq!(main["name"], "main");
        assert!(main.get("children").is_none());
    }

    #[tokio::test]
    async fn test_stats() {
        let (_, body) = send(&app(), Method::GET, "/api/menus/stats", None).await;
        assert_eq!(body["data"]["total"], 4);
        assert_eq!(body["data"]["root_count"], 2);
        assert_eq!(body["data"]["max_depth"], 2);
    }

    #[tokio::test]
    async fn test_lookups() {
        let app = app();
        let (_, body) = send(&app, Method::GET, "/api/menus/check-exists?name=help", None).await;
        assert_eq!(body["data"]["exists"], true);
        let (_, body) = send(&app, Method::GET, "/api/menus/check-exists?name=help&exclude_id=4", None).await;
        assert_eq!(body["data"]["exists"], false);

        let (status, body) = send(&app, Method::GET, "/api/menus/by-url?url=/settings", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["id"], 2);
        let (status, _) = send(&app, Method::GET, "/api/menus/by-url?url=/nowhere", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (_, body) = send(&app, Method::GET, "/api/menus/children/1", None).await;
        assert_eq!(body["data"][0]["name"], "settings");
        let (status, _) = send(&app, Method::GET, "/api/menus/children/99", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (_, body) = send(&app, Method::GET, "/api/menus/3/breadcrumb", None).await;
        let names: Vec<&str> = body["data"]
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, ["main", "settings", "profile"]);
    }

    #[tokio::test]
    async fn test_move_into_descendant_rejected() {
        let app = app();
        let (status, _) = send(&app, Method::POST, "/api/menus/1/move", Some(json!({"parent_id": 3}))).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, body) = send(&app, Method::POST, "/api/menus/3/move", Some(json!({"parent_id": null}))).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["data"].get("parent_id").map_or(true, Value::is_null));
    }

    #[tokio::test]
    async fn test_delete_cascades() {
        let app = app();
        let (_, body) = send(&app, Method::GET, "/api/menus/1/deletion-plan", None).await;
        assert_eq!(body["data"]["ids"], json!([1, 2, 3]));

        let (status, body) = send(&app, Method::DELETE, "/api/menus/1", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["removed"], json!([1, 2, 3]));

        let (status, _) = send(&app, Method::GET, "/api/menus/2", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_duplicate_with_and_without_body() {
        let app = app();
        let (_, body) = send(&app, Method::POST, "/api/menus/4/duplicate", None).await;
        assert_eq!(body["data"]["name"], "help-copy");
        assert_eq!(body["data"]["display_name"], "Help (Copy)");

        let (_, body) = send(&app, Method::POST, "/api/menus/4/duplicate", Some(json!({}))).await;
        assert_eq!(body["data"]["name"], "help-copy-2");
    }

    #[tokio::test]
    async fn test_bulk_delete_is_atomic() {
        let app = app();
        let (status, body) = send(&app, Method::POST, "/api/menus/bulk-delete", Some(json!({"ids": [4, 99]}))).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["details"][1]["ok"], false);

        let (status, _) = send(&app, Method::GET, "/api/menus/4", None).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_bulk_update_and_reorder() {
        let app = app();
        let (status, body) = send(
            &app,
            Method::POST,
            "/api/menus/bulk-update",
            Some(json!({"ids": [1, 4], "data": {"permission": "admin"}})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["affected"], json!([1, 4]));

        let (_, body) = send(&app, Method::GET, "/api/menus/by-permission/admin", None).await;
        assert_eq!(body["data"].as_array().unwrap().len(), 2);

        let (status, _) = send(
            &app,
            Method::POST,
            "/api/menus/reorder",
            Some(json!({"menus": [{"id": 4, "sort_order": 0}, {"id": 1, "sort_order": 5}]})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let (_, body) = send(&app, Method::GET, "/api/menus/parents", None).await;
        assert_eq!(body["data"][0]["name"], "help");
    }

    #[tokio::test]
    async fn test_export_then_import_csv() {
        let app = app();
        let response = app
            .clone()
            .oneshot(Request::get("/api/menus/export?format=csv").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "text/csv");
        let csv = to_bytes(response.into_body(), usize::MAX).await.unwrap();

        // Importing into the same store collides on every name.
        let response = app
            .clone()
            .oneshot(
                Request::post("/api/menus/import?format=csv")
                    .body(Body::from(csv.clone()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let fresh = create_router(AppState::in_memory(MenuStore::new()));
        let response = fresh
            .clone()
            .oneshot(Request::post("/api/menus/import?format=csv").body(Body::from(csv)).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let (_, body) = send(&fresh, Method::GET, "/api/menus/stats", None).await;
        assert_eq!(body["data"]["total"], 4);
        assert_eq!(body["data"]["max_depth"], 2);
    }

    #[tokio::test]
    async fn test_unknown_export_format() {
        let (status, _) = send(&app(), Method::GET, "/api/menus/export?format=xml", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
