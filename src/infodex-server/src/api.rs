use std::sync::Arc;
use std::time::Instant;

use actix_web::http::StatusCode;
use actix_web::{web, HttpResponse, Result as ActixResult};
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::RwLock;

use infodex_core::config::EngineConfig;
use infodex_core::response::{
    DeleteByQueryResponse, GetResponse, InfoResponse, VersionInfo, WriteResponse,
};

use crate::dsl::{self, DslError};
use crate::engine::{EngineError, MemoryEngine, SearchRequest};

/// Shared application state
pub struct AppState {
    pub engine: Arc<RwLock<MemoryEngine>>,
    pub config: Arc<EngineConfig>,
}

impl AppState {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            engine: Arc::new(RwLock::new(MemoryEngine::new())),
            config: Arc::new(config),
        }
    }
}

/// Query-string overrides accepted by `_search`
#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    /// `field[:order],...`
    pub sort: Option<String>,
    pub from: Option<usize>,
    pub size: Option<usize>,
}

/// Engine identity
/// GET /
#[tracing::instrument(skip(state))]
pub async fn info(state: web::Data<AppState>) -> ActixResult<HttpResponse> {
    Ok(HttpResponse::Ok().json(InfoResponse {
        name: format!("{}-node", state.config.cluster_name),
        cluster_name: state.config.cluster_name.clone(),
        version: VersionInfo {
            number: env!("CARGO_PKG_VERSION").to_string(),
        },
        tagline: "You Know, for Search".to_string(),
    }))
}

/// Create-only indexing
/// PUT|POST /{index}/_create/{id}
#[tracing::instrument(skip(path, body, state))]
pub async fn create_document(
    path: web::Path<(String, String)>,
    body: web::Bytes,
    state: web::Data<AppState>,
) -> ActixResult<HttpResponse> {
    let (index, id) = path.into_inner();
    tracing::debug!(index = %index, id = %id, "Creating document");

    let source: Value = match serde_json::from_slice(&body) {
        Ok(source) => source,
        Err(e) => {
            return Ok(engine_error(EngineError::MapperParsing(e.to_string())));
        }
    };

    let mut engine = state.engine.write().await;
    match engine.create(&index, &id, source) {
        Ok(version) => Ok(HttpResponse::Created().json(WriteResponse {
            index,
            id,
            version: Some(version),
            result: "created".to_string(),
        })),
        Err(e) => Ok(engine_error(e)),
    }
}

/// Fetch a document by id
/// GET /{index}/_doc/{id}
#[tracing::instrument(skip(path, state))]
pub async fn get_document(
    path: web::Path<(String, String)>,
    state: web::Data<AppState>,
) -> ActixResult<HttpResponse> {
    let (index, id) = path.into_inner();

    let engine = state.engine.read().await;
    match engine.get(&index, &id) {
        Ok(Some((version, source))) => Ok(HttpResponse::Ok().json(GetResponse {
            index,
            id,
            version: Some(version),
            found: true,
            source: Some(source.clone()),
        })),
        Ok(None) => {
            tracing::debug!(index = %index, id = %id, "Document not found");
            Ok(HttpResponse::NotFound().json(GetResponse::<Value> {
                index,
                id,
                version: None,
                found: false,
                source: None,
            }))
        }
        Err(e) => Ok(engine_error(e)),
    }
}

/// Delete a document by id
/// DELETE /{index}/_doc/{id}
#[tracing::instrument(skip(path, state))]
pub async fn delete_document(
    path: web::Path<(String, String)>,
    state: web::Data<AppState>,
) -> ActixResult<HttpResponse> {
    let (index, id) = path.into_inner();

    let mut engine = state.engine.write().await;
    match engine.delete(&index, &id) {
        Ok(Some(version)) => Ok(HttpResponse::Ok().json(WriteResponse {
            index,
            id,
            version: Some(version),
            result: "deleted".to_string(),
        })),
        Ok(None) => Ok(HttpResponse::NotFound().json(WriteResponse {
            index,
            id,
            version: None,
            result: "not_found".to_string(),
        })),
        Err(e) => Ok(engine_error(e)),
    }
}

/// Search an index
/// GET|POST /{index}/_search
#[tracing::instrument(skip(path, params, body, state))]
pub async fn search(
    path: web::Path<String>,
    params: web::Query<SearchParams>,
    body: web::Bytes,
    state: web::Data<AppState>,
) -> ActixResult<HttpResponse> {
    let index = path.into_inner();

    let mut request = match parse_body::<SearchRequest>(&body) {
        Ok(request) => request.unwrap_or_default(),
        Err(e) => return Ok(engine_error(e)),
    };

    let params = params.into_inner();
    if let Some(sort) = params.sort {
        match dsl::parse_sort_param(&sort) {
            Ok(keys) => request.sort = Some(dsl::sort_to_value(&keys)),
            Err(e) => return Ok(engine_error(e.into())),
        }
    }
    if params.from.is_some() {
        request.from = params.from;
    }
    if params.size.is_some() {
        request.size = params.size;
    }

    let engine = state.engine.read().await;
    match engine.search(&index, &request) {
        Ok(response) => Ok(HttpResponse::Ok().json(response)),
        Err(e) => Ok(engine_error(e)),
    }
}

#[derive(Debug, Deserialize)]
struct DeleteByQueryRequest {
    query: Option<Value>,
}

/// Delete every document matching a query
/// POST /{index}/_delete_by_query
#[tracing::instrument(skip(path, body, state))]
pub async fn delete_by_query(
    path: web::Path<String>,
    body: web::Bytes,
    state: web::Data<AppState>,
) -> ActixResult<HttpResponse> {
    let index = path.into_inner();
    let started = Instant::now();

    let query = match parse_body::<DeleteByQueryRequest>(&body) {
        Ok(Some(DeleteByQueryRequest { query: Some(query) })) => query,
        Ok(_) => {
            return Ok(engine_error(
                DslError::new("request body is required and must contain a query").into(),
            ))
        }
        Err(e) => return Ok(engine_error(e)),
    };

    let mut engine = state.engine.write().await;
    match engine.delete_by_query(&index, &query) {
        Ok(deleted) => Ok(HttpResponse::Ok().json(DeleteByQueryResponse {
            took: started.elapsed().as_millis() as u64,
            timed_out: false,
            total: deleted,
            deleted,
            failures: Vec::new(),
        })),
        Err(e) => Ok(engine_error(e)),
    }
}

/// `None` for an empty body
fn parse_body<T: serde::de::DeserializeOwned>(body: &[u8]) -> Result<Option<T>, EngineError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    serde_json::from_slice(body)
        .map(Some)
        .map_err(|e| DslError::new(format!("failed to parse request body: {e}")).into())
}

fn engine_error(error: EngineError) -> HttpResponse {
    tracing::warn!(status = error.status(), "Request failed: {}", error);
    let status =
        StatusCode::from_u16(error.status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    HttpResponse::build(status).json(error.to_response())
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(info))
        .route("/{index}/_search", web::get().to(search))
        .route("/{index}/_search", web::post().to(search))
        .route("/{index}/_delete_by_query", web::post().to(delete_by_query))
        .route("/{index}/_create/{id}", web::put().to(create_document))
        .route("/{index}/_create/{id}", web::post().to(create_document))
        .route("/{index}/_doc/{id}", web::get().to(get_document))
        .route("/{index}/_doc/{id}", web::delete().to(delete_document));
}
