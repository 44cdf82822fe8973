//! HTTP route definitions

use axum::{
    extract::{Path, Query, State},
    http::{header, Method, StatusCode},
    middleware,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};
use uuid::Uuid;

use crate::app::AppState;
use crate::http::middleware::throttle_api;
use crate::stats::DashboardStats;
use crate::store::inventory::{BackupSnapshot, NewCategory, NewKit, NewPart, NewSupplier};
use crate::store::models::{Category, Kit, Part, Supplier};
use crate::store::InventoryError;
use crate::util::time::{unix_millis, uptime_secs};

/// Build the application router
pub fn build_router(state: AppState) -> Router {
    // CORS configuration - support multiple origins (comma-separated in CLIENT_ORIGIN)
    let allowed_origins: Vec<header::HeaderValue> = state
        .config
        .client_origin
        .split(',')
        .filter_map(|s| s.trim().parse::<header::HeaderValue>().ok())
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(allowed_origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true);

    let api_routes = Router::new()
        .route("/parts", get(list_parts).post(create_part))
        .route("/parts/:id", get(get_part).put(update_part).delete(delete_part))
        .route("/kits", get(list_kits).post(create_kit))
        .route("/kits/:id", get(get_kit).put(update_kit).delete(delete_kit))
        .route("/suppliers", get(list_suppliers).post(create_supplier))
        .route(
            "/suppliers/:id",
            get(get_supplier).put(update_supplier).delete(delete_supplier),
        )
        .route("/categories", get(list_categories).post(create_category))
        .route(
            "/categories/:id",
            get(get_category).put(update_category).delete(delete_category),
        )
        .route("/reports/dashboard/metrics", get(dashboard_metrics))
        .route("/backups/export", get(export_backup))
        .route("/backups/restore", post(restore_backup))
        .layer(middleware::from_fn_with_state(state.clone(), throttle_api));

    Router::new()
        .route("/health", get(health_handler))
        .nest("/api", api_routes)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

// ============================================================================
// Health endpoint
// ============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    uptime_secs: u64,
    timestamp_ms: u64,
    cached_documents: usize,
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        uptime_secs: uptime_secs(),
        timestamp_ms: unix_millis(),
        cached_documents: state.storage.cached_documents(),
    })
}

// ============================================================================
// List envelope
// ============================================================================

const DEFAULT_PAGE_LIMIT: usize = 50;

#[derive(Deserialize)]
struct ListQuery {
    search: Option<String>,
    status: Option<String>,
    page: Option<usize>,
    limit: Option<usize>,
}

#[derive(Serialize)]
struct Paginated<T> {
    data: Vec<T>,
    pagination: Pagination,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Pagination {
    page: usize,
    limit: usize,
    total: usize,
    total_pages: usize,
}

/// Single-record envelope matching the `{data: ...}` response shape
#[derive(Serialize)]
struct Enveloped<T> {
    data: T,
}

fn paginate<T>(records: Vec<T>, query: &ListQuery) -> Paginated<T> {
    let page = query.page.unwrap_or(1).max(1);
    let limit = query.limit.unwrap_or(DEFAULT_PAGE_LIMIT).max(1);

    let total = records.len();
    let total_pages = total.div_ceil(limit);

    // Client-supplied page numbers can be arbitrarily large
    let skip = (page - 1).saturating_mul(limit);
    let data = records.into_iter().skip(skip).take(limit).collect();

    Paginated {
        data,
        pagination: Pagination {
            page,
            limit,
            total,
            total_pages,
        },
    }
}

fn matches_search(haystacks: &[&str], needle: &str) -> bool {
    let needle = needle.to_lowercase();
    haystacks
        .iter()
        .any(|field| field.to_lowercase().contains(&needle))
}

// ============================================================================
// Parts endpoints
// ============================================================================

async fn list_parts(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Json<Paginated<Part>> {
    let mut parts = state.inventory.parts();

    if let Some(search) = &query.search {
        parts.retain(|p| matches_search(&[&p.part_no, &p.brand], search));
    }

    Json(paginate(parts, &query))
}

async fn get_part(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Enveloped<Part>>, AppError> {
    state
        .inventory
        .parts()
        .into_iter()
        .find(|p| p.id == id)
        .map(|part| Json(Enveloped { data: part }))
        .ok_or_else(|| AppError::NotFound(format!("Part {} not found", id)))
}

async fn create_part(
    State(state): State<AppState>,
    Json(new): Json<NewPart>,
) -> (StatusCode, Json<Enveloped<Part>>) {
    let part = state.inventory.add_part(new);
    (StatusCode::CREATED, Json(Enveloped { data: part }))
}

async fn update_part(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(new): Json<NewPart>,
) -> Result<Json<Enveloped<Part>>, AppError> {
    let part = state.inventory.update_part(id, new)?;
    Ok(Json(Enveloped { data: part }))
}

async fn delete_part(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.inventory.delete_part(id)?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Kits endpoints
// ============================================================================

async fn list_kits(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Json<Paginated<Kit>> {
    let mut kits = state.inventory.kits();

    if let Some(search) = &query.search {
        kits.retain(|k| matches_search(&[&k.name], search));
    }

    Json(paginate(kits, &query))
}

async fn get_kit(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Enveloped<Kit>>, AppError> {
    state
        .inventory
        .kits()
        .into_iter()
        .find(|k| k.id == id)
        .map(|kit| Json(Enveloped { data: kit }))
        .ok_or_else(|| AppError::NotFound(format!("Kit {} not found", id)))
}

async fn create_kit(
    State(state): State<AppState>,
    Json(new): Json<NewKit>,
) -> (StatusCode, Json<Enveloped<Kit>>) {
    let kit = state.inventory.add_kit(new);
    (StatusCode::CREATED, Json(Enveloped { data: kit }))
}

async fn update_kit(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(new): Json<NewKit>,
) -> Result<Json<Enveloped<Kit>>, AppError> {
    let kit = state.inventory.update_kit(id, new)?;
    Ok(Json(Enveloped { data: kit }))
}

async fn delete_kit(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.inventory.delete_kit(id)?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Suppliers endpoints
// ============================================================================

async fn list_suppliers(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Json<Paginated<Supplier>> {
    let mut suppliers = state.inventory.suppliers();

    if let Some(search) = &query.search {
        suppliers.retain(|s| matches_search(&[&s.code, &s.company_name], search));
    }

    if let Some(status) = &query.status {
        suppliers.retain(|s| &s.status == status);
    }

    Json(paginate(suppliers, &query))
}

async fn get_supplier(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Enveloped<Supplier>>, AppError> {
    state
        .inventory
        .suppliers()
        .into_iter()
        .find(|s| s.id == id)
        .map(|supplier| Json(Enveloped { data: supplier }))
        .ok_or_else(|| AppError::NotFound(format!("Supplier {} not found", id)))
}

async fn create_supplier(
    State(state): State<AppState>,
    Json(new): Json<NewSupplier>,
) -> (StatusCode, Json<Enveloped<Supplier>>) {
    let supplier = state.inventory.add_supplier(new);
    (StatusCode::CREATED, Json(Enveloped { data: supplier }))
}

async fn update_supplier(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(new): Json<NewSupplier>,
) -> Result<Json<Enveloped<Supplier>>, AppError> {
    let supplier = state.inventory.update_supplier(id, new)?;
    Ok(Json(Enveloped { data: supplier }))
}

async fn delete_supplier(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.inventory.delete_supplier(id)?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Categories endpoints
// ============================================================================

async fn list_categories(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Json<Paginated<Category>> {
    let mut categories = state.inventory.categories();

    if let Some(search) = &query.search {
        categories.retain(|c| matches_search(&[&c.name], search));
    }

    Json(paginate(categories, &query))
}

async fn get_category(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Enveloped<Category>>, AppError> {
    state
        .inventory
        .categories()
        .into_iter()
        .find(|c| c.id == id)
        .map(|category| Json(Enveloped { data: category }))
        .ok_or_else(|| AppError::NotFound(format!("Category {} not found", id)))
}

async fn create_category(
    State(state): State<AppState>,
    Json(new): Json<NewCategory>,
) -> (StatusCode, Json<Enveloped<Category>>) {
    let category = state.inventory.add_category(new);
    (StatusCode::CREATED, Json(Enveloped { data: category }))
}

async fn update_category(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(new): Json<NewCategory>,
) -> Result<Json<Enveloped<Category>>, AppError> {
    let category = state.inventory.update_category(id, new)?;
    Ok(Json(Enveloped { data: category }))
}

async fn delete_category(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.inventory.delete_category(id)?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Dashboard metrics
// ============================================================================

async fn dashboard_metrics(State(state): State<AppState>) -> Json<Enveloped<DashboardStats>> {
    Json(Enveloped {
        data: state.stats.current(),
    })
}

// ============================================================================
// Backup endpoints
// ============================================================================

async fn export_backup(State(state): State<AppState>) -> Json<Enveloped<BackupSnapshot>> {
    Json(Enveloped {
        data: state.inventory.snapshot(),
    })
}

#[derive(Serialize)]
struct RestoreResponse {
    success: bool,
    message: String,
}

async fn restore_backup(
    State(state): State<AppState>,
    Json(snapshot): Json<BackupSnapshot>,
) -> Json<RestoreResponse> {
    state.inventory.restore(snapshot);

    Json(RestoreResponse {
        success: true,
        message: "Inventory restored from snapshot".to_string(),
    })
}

// ============================================================================
// Error handling
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<InventoryError> for AppError {
    fn from(err: InventoryError) -> Self {
        match err {
            InventoryError::NotFound { .. } => AppError::NotFound(err.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match &self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        let body = serde_json::json!({
            "error": message
        });

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paginate_splits_and_counts() {
        let query = ListQuery {
            search: None,
            status: None,
            page: Some(2),
            limit: Some(3),
        };

        let page = paginate((1..=7).collect::<Vec<i32>>(), &query);
        assert_eq!(page.data, vec![4, 5, 6]);
        assert_eq!(page.pagination.total, 7);
        assert_eq!(page.pagination.total_pages, 3);
    }

    #[test]
    fn paginate_defaults_and_clamps() {
        let query = ListQuery {
            search: None,
            status: None,
            page: Some(0),
            limit: None,
        };

        let page = paginate(vec![1, 2, 3], &query);
        assert_eq!(page.pagination.page, 1);
        assert_eq!(page.pagination.limit, DEFAULT_PAGE_LIMIT);
        assert_eq!(page.data.len(), 3);
    }

    #[test]
    fn paginate_past_the_end_is_empty() {
        let query = ListQuery {
            search: None,
            status: None,
            page: Some(5),
            limit: Some(10),
        };

        let page = paginate(vec![1, 2, 3], &query);
        assert!(page.data.is_empty());
        assert_eq!(page.pagination.total, 3);
        assert_eq!(page.pagination.total_pages, 1);
    }

    #[test]
    fn paginate_survives_huge_page_numbers() {
        let query = ListQuery {
            search: None,
            status: None,
            page: Some(usize::MAX),
            limit: Some(50),
        };

        let page = paginate(vec![1, 2, 3], &query);
        assert!(page.data.is_empty());
        assert_eq!(page.pagination.page, usize::MAX);
        assert_eq!(page.pagination.total, 3);
    }

    #[test]
    fn search_is_case_insensitive_substring() {
        assert!(matches_search(&["BP-1042", "Bosch"], "bosch"));
        assert!(matches_search(&["BP-1042", "Bosch"], "1042"));
        assert!(!matches_search(&["BP-1042", "Bosch"], "denso"));
    }
}
