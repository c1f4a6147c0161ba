use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::HashMap;

use crate::kind::RecordKind;
use crate::pagination::{clamp_limit, Cursor, Page, Pagination};
use crate::record::{self, IncomingRecord};
use crate::server::AppState;
use crate::storage::StorageBackend;
use crate::Error;

#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
    pub cursor: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct CreateRecordRequest {
    /// A JSON object, or a string holding one
    pub record: Value,
}

/// Body of a manual link request: `{"<target>_id": "<id>"}`
pub type LinkRequest = HashMap<String, Value>;

/// Query string extraction that reports failures as `ApiError`
pub type PageQuery = Result<Query<PageParams>, QueryRejection>;

/// JSON body extraction that reports failures as `ApiError`
pub type JsonBody<T> = Result<Json<T>, JsonRejection>;

#[derive(Serialize)]
pub struct ErrorResponse {
    pub message: String,
    pub error_name: String,
}

/// Error returned by every handler
pub struct ApiError {
    status: StatusCode,
    body: ErrorResponse,
}

impl ApiError {
    fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: ErrorResponse {
                message: message.into(),
                error_name: "ServerError".into(),
            },
        }
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        let status = if err.is_not_found() {
            StatusCode::NOT_FOUND
        } else if err.is_user_error() {
            StatusCode::BAD_REQUEST
        } else {
            tracing::error!("Request failed: {}", err);
            StatusCode::INTERNAL_SERVER_ERROR
        };
        Self {
            status,
            body: ErrorResponse {
                message: err.to_string(),
                error_name: err.error_name().into(),
            },
        }
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Error::InvalidRequest(rejection.body_text()).into()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Error::InvalidRequest(rejection.body_text()).into()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

type ApiResult = Result<Json<Value>, ApiError>;

/// Run a storage call off the async runtime
async fn blocking<T, F>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&dyn StorageBackend) -> crate::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let backend = state.backend.clone();
    tokio::task::spawn_blocking(move || f(backend.as_ref()))
        .await
        .map_err(|e| ApiError::internal(format!("storage task failed: {}", e)))?
        .map_err(ApiError::from)
}

fn record_link(kind: RecordKind, id: &str) -> String {
    format!("/{}/{}", kind.list_segment(), id)
}

fn entries(kind: RecordKind, ids: &[String]) -> Vec<Value> {
    ids.iter()
        .map(|id| json!({"id": id, "_link": record_link(kind, id)}))
        .collect()
}

/// Cursor and clamped limit of a listing request. The raw cursor string
/// is kept so it can be echoed back exactly as sent.
struct PageRequest {
    raw_cursor: String,
    cursor: Cursor,
    limit: usize,
}

fn parse_page(state: &AppState, query: PageQuery) -> Result<PageRequest, ApiError> {
    let Query(params) = query?;
    let raw_cursor = params.cursor.unwrap_or_else(|| Cursor::START.to_string());
    let cursor = raw_cursor.parse::<Cursor>()?;
    Ok(PageRequest {
        raw_cursor,
        cursor,
        limit: clamp_limit(params.limit, state.max_limit),
    })
}

fn page_body(list_key: String, kind: RecordKind, request: &PageRequest, page: &Page) -> Value {
    let mut body = Map::new();
    body.insert(
        "pagination".into(),
        json!(Pagination::new(&request.raw_cursor, page, request.limit)),
    );
    body.insert(list_key, Value::Array(entries(kind, &page.ids)));
    Value::Object(body)
}

pub async fn root() -> Json<Value> {
    let links: Map<String, Value> = RecordKind::all()
        .iter()
        .map(|kind| (kind.list_segment(), Value::from(format!("/{}", kind.list_segment()))))
        .collect();
    Json(Value::Object(links))
}

pub async fn version() -> Json<Value> {
    Json(json!({"version": env!("CARGO_PKG_VERSION")}))
}

pub async fn list_records(
    State(state): State<AppState>,
    kind: RecordKind,
    query: PageQuery,
) -> ApiResult {
    let request = parse_page(&state, query)?;
    let (cursor, limit) = (request.cursor, request.limit);
    let page = blocking(&state, move |b| b.list_kind(kind, cursor, limit)).await?;
    Ok(Json(page_body(kind.list_segment(), kind, &request, &page)))
}

/// Store a new record, then link it to every target it declares.
///
/// Declared targets are checked before the record is written, so a
/// dangling link leaves nothing behind.
pub async fn create_record(
    State(state): State<AppState>,
    kind: RecordKind,
    body: JsonBody<CreateRecordRequest>,
) -> ApiResult {
    let Json(request) = body?;
    let incoming = IncomingRecord::parse(kind, &request.record)?;
    let id = incoming.id.clone();

    blocking(&state, move |b| {
        for (target_kind, target) in &incoming.links {
            if !b.exists(*target_kind, target)? {
                return Err(Error::IdentifierNotFound(target.clone()));
            }
        }
        b.put(kind, &incoming.id, &incoming.payload)?;
        for (target_kind, target) in &incoming.links {
            connect(b, kind, &incoming.id, *target_kind, target)?;
        }
        Ok(())
    })
    .await?;

    tracing::info!("Created {} record {}", kind, id);
    Ok(Json(json!({"id": id, "_link": record_link(kind, &id)})))
}

/// Link so that the relationship, if any, is the second operand
fn connect(
    b: &dyn StorageBackend,
    kind: RecordKind,
    id: &str,
    target_kind: RecordKind,
    target: &str,
) -> crate::Result<()> {
    if kind.is_relationship() {
        b.link(target_kind, target, kind, id)?;
    } else {
        b.link(kind, id, target_kind, target)?;
    }
    Ok(())
}

async fn load_record(state: &AppState, kind: RecordKind, id: String, with_links: bool) -> ApiResult {
    let value = blocking(state, move |b| record::materialize(b, kind, &id, with_links)).await?;
    Ok(Json(value))
}

pub async fn get_record(
    State(state): State<AppState>,
    kind: RecordKind,
    Path(id): Path<String>,
) -> ApiResult {
    load_record(&state, kind, id, true).await
}

pub async fn get_sparse_record(
    State(state): State<AppState>,
    kind: RecordKind,
    Path(id): Path<String>,
) -> ApiResult {
    load_record(&state, kind, id, false).await
}

pub async fn list_linked(
    State(state): State<AppState>,
    kind: RecordKind,
    target: RecordKind,
    Path(id): Path<String>,
    query: PageQuery,
) -> ApiResult {
    let request = parse_page(&state, query)?;
    let (cursor, limit) = (request.cursor, request.limit);
    let page = blocking(&state, move |b| {
        if !b.exists(kind, &id)? {
            return Err(Error::IdentifierNotFound(id));
        }
        b.list_kind_links(target, &id, cursor, Some(limit))
    })
    .await?;

    let list_key = format!("linking{}Identifier_list", target.title());
    Ok(Json(page_body(list_key, target, &request, &page)))
}

pub async fn add_linked(
    State(state): State<AppState>,
    kind: RecordKind,
    target: RecordKind,
    Path(id): Path<String>,
    body: JsonBody<LinkRequest>,
) -> ApiResult {
    let Json(request) = body?;
    let field = format!("{}_id", target.as_str());
    let target_id = request
        .get(&field)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| Error::MissingParameter(field))?;

    let linked = id.clone();
    blocking(&state, move |b| {
        if !b.exists(kind, &linked)? {
            return Err(Error::IdentifierNotFound(linked));
        }
        connect(b, kind, &linked, target, &target_id)
    })
    .await?;

    Ok(Json(Value::String(id)))
}
