use axum::{
    Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::get,
};
use std::path::PathBuf;
use tower_http::cors::CorsLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::{IntoParams, OpenApi, ToSchema};
use utoipa_swagger_ui::SwaggerUi;

use ichi_core::config::{CoreConfig, resolve_data_file};
use ichi_core::constants::LEAF_DEPTH;
use ichi_core::{
    ClassKind, ClassificationEntry, ClassificationError, ClassificationService, ListResponse,
    SearchHit, SearchResponse, loader,
};

/// Application state shared across REST API handlers
///
/// Holds the read-side classification service; the underlying store is
/// loaded once at startup and never mutated by the server (repair runs
/// offline via the CLI).
#[derive(Clone)]
struct AppState {
    classification: ClassificationService,
}

/// Health check response body.
#[derive(serde::Serialize, ToSchema)]
struct HealthRes {
    ok: bool,
    message: String,
}

/// Error body returned for client and server errors.
#[derive(Debug, serde::Serialize, ToSchema)]
struct ApiError {
    error: String,
}

#[derive(serde::Deserialize, IntoParams)]
struct SearchParams {
    /// Free-text search term; required.
    q: Option<String>,
    /// Page size, clamped to [1, 1000] (default 100).
    limit: Option<i64>,
}

#[derive(serde::Deserialize, IntoParams)]
struct ListParams {
    /// Page size, clamped to [1, 1000] (default 100).
    limit: Option<i64>,
    /// Page offset, clamped to >= 0 (default 0).
    offset: Option<i64>,
    /// Sort field: `code` or `title`; anything else behaves as `code`.
    sort: Option<String>,
}

#[derive(OpenApi)]
#[openapi(
    paths(health, search_interventions, list_interventions, get_intervention),
    components(schemas(
        HealthRes,
        ApiError,
        SearchResponse,
        ListResponse,
        SearchHit,
        ClassificationEntry,
        ClassKind
    ))
)]
struct ApiDoc;

/// Main entry point for the ICHI classification index server
///
/// Serves the read-only REST API over the taxonomy loaded at startup.
/// The hierarchy repair batch is deliberately not reachable from here;
/// it runs offline through the `ichi` CLI so the server only ever reads.
///
/// # Environment Variables
/// - `ICHI_REST_ADDR`: REST server address (default: "0.0.0.0:3000")
/// - `ICHI_DATA_FILE`: Taxonomy dataset path (default: "taxonomy.json")
///
/// # Returns
/// * `Ok(())` - If the server starts and runs successfully
/// * `Err(anyhow::Error)` - If dataset load or server startup fails
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive("ichi=info".parse()?))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let rest_addr = std::env::var("ICHI_REST_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());
    let data_file = resolve_data_file(std::env::var_os("ICHI_DATA_FILE").map(PathBuf::from));
    let config = CoreConfig::new(data_file)?;

    let store = loader::load_store(config.data_file())?;
    tracing::info!(
        "++ Loaded {} classification entries from {}",
        store.len()?,
        config.data_file().display()
    );
    tracing::info!("++ Starting ICHI REST on {}", rest_addr);

    let app = Router::new()
        .route("/health", get(health))
        .route("/interventions", get(list_interventions))
        .route("/interventions/search", get(search_interventions))
        .route("/interventions/:code", get(get_intervention))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(CorsLayer::permissive())
        .with_state(AppState {
            classification: ClassificationService::new(store),
        });

    let listener = tokio::net::TcpListener::bind(&rest_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
/// Health check endpoint for the REST API
///
/// Used for monitoring and load balancer health checks.
async fn health(State(_state): State<AppState>) -> Json<HealthRes> {
    Json(HealthRes {
        ok: true,
        message: "ICHI index is alive".into(),
    })
}

#[utoipa::path(
    get,
    path = "/interventions/search",
    params(SearchParams),
    responses(
        (status = 200, description = "Matching leaf-level interventions", body = SearchResponse),
        (status = 400, description = "Missing or empty query parameter", body = ApiError),
        (status = 500, description = "Internal server error", body = ApiError)
    )
)]
/// Free-text search over intervention titles
///
/// Matches the term as a literal substring of display titles (wildcard
/// characters in the term are escaped, never interpreted) and is scoped to
/// leaf-level entries so ancestor categories whose titles merely contain the
/// term are not returned.
///
/// # Returns
/// * `Ok(Json<SearchResponse>)` - Envelope with the normalised query, count and hits
/// * `Err((StatusCode, Json<ApiError>))` - 400 for a missing/empty term, 500 on storage failure
async fn search_interventions(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>, (StatusCode, Json<ApiError>)> {
    let Some(q) = params.q else {
        return Err(missing_query_param());
    };

    match state.classification.search(&q, params.limit, Some(LEAF_DEPTH)) {
        Ok(res) => Ok(Json(res)),
        Err(ClassificationError::EmptyTerm) => Err(missing_query_param()),
        Err(e) => {
            tracing::error!("Search error: {:?}", e);
            Err(internal_error())
        }
    }
}

#[utoipa::path(
    get,
    path = "/interventions",
    params(ListParams),
    responses(
        (status = 200, description = "Page of classification entries", body = ListResponse),
        (status = 500, description = "Internal server error", body = ApiError)
    )
)]
/// Paginated browse over the whole taxonomy
///
/// Out-of-range pagination values are clamped, not rejected, and the
/// response echoes the effective values used. Unknown sort fields behave as
/// `code`.
async fn list_interventions(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<ListResponse>, (StatusCode, Json<ApiError>)> {
    match state
        .classification
        .list(params.limit, params.offset, params.sort.as_deref())
    {
        Ok(res) => Ok(Json(res)),
        Err(e) => {
            tracing::error!("List error: {:?}", e);
            Err(internal_error())
        }
    }
}

#[utoipa::path(
    get,
    path = "/interventions/{code}",
    params(
        ("code" = String, Path, description = "Classification code, case-sensitive")
    ),
    responses(
        (status = 200, description = "Full classification entry", body = ClassificationEntry),
        (status = 404, description = "Code not found", body = ApiError),
        (status = 500, description = "Internal server error", body = ApiError)
    )
)]
/// Point lookup of one classification entry by code
///
/// An unknown code is a not-found outcome (404), distinct from a storage
/// failure (500).
async fn get_intervention(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<ClassificationEntry>, (StatusCode, Json<ApiError>)> {
    match state.classification.lookup(&code) {
        Ok(Some(entry)) => Ok(Json(entry)),
        Ok(None) => Err((
            StatusCode::NOT_FOUND,
            Json(ApiError {
                error: "Code not found".into(),
            }),
        )),
        Err(e) => {
            tracing::error!("Lookup error: {:?}", e);
            Err(internal_error())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ichi_core::ClassificationStore;

    fn state() -> AppState {
        let entries = vec![ClassificationEntry {
            code: "KBO.JB.AE".to_string(),
            title: "Removal of appendix".to_string(),
            block_id: "KBO".to_string(),
            kind: ClassKind::Target,
            depth_in_kind: 1,
        }];
        AppState {
            classification: ClassificationService::new(
                ClassificationStore::from_entries(entries).expect("unique codes"),
            ),
        }
    }

    #[tokio::test]
    async fn search_without_q_is_a_400_with_error_body() {
        for q in [None, Some("   ".to_string())] {
            let (status, Json(body)) = search_interventions(
                State(state()),
                Query(SearchParams { q, limit: None }),
            )
            .await
            .expect_err("missing q must be rejected");
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body.error, "Missing query parameter q");
        }
    }

    #[tokio::test]
    async fn search_finds_leaf_entries() {
        let Json(res) = search_interventions(
            State(state()),
            Query(SearchParams {
                q: Some("append".to_string()),
                limit: None,
            }),
        )
        .await
        .expect("search succeeds");
        assert_eq!(res.count, 1);
        assert_eq!(res.results[0].code, "KBO.JB.AE");
    }

    #[tokio::test]
    async fn unknown_code_is_a_404() {
        let (status, Json(body)) =
            get_intervention(State(state()), Path("ZZZ.99".to_string()))
                .await
                .expect_err("unknown code must be 404");
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body.error, "Code not found");
    }
}

fn missing_query_param() -> (StatusCode, Json<ApiError>) {
    (
        StatusCode::BAD_REQUEST,
        Json(ApiError {
            error: "Missing query parameter q".into(),
        }),
    )
}

fn internal_error() -> (StatusCode, Json<ApiError>) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ApiError {
            error: "Internal error".into(),
        }),
    )
}
