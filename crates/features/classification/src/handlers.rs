//! REST surface of the classification slice.

use crate::{ClassificationService, Classifications};
use axum::body::Bytes;
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Json, Path, State};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use topo_derive::{api_handler, api_model};
use topo_domain::constants::CLASSIFICATION_TAG;
use topo_domain::models::{
    Classification, ClassificationAttrs, ClassificationPatch, ClassificationWithObjects, ScopeTag,
};
use topo_kernel::condition::ConditionBuilder;
use topo_kernel::context::RequestContext;
use topo_kernel::server::{ApiError, ApiResponse, ApiResult, ApiState, EmptyData, ErrorKind};
use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

#[api_model]
/// Attributes of a new classification.
pub struct CreateRequest {
    /// Unique key, e.g. `bk_host_manage`
    pub classification_id: String,
    pub name: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub order: i64,
    /// Scope tag the classification belongs to
    #[serde(default)]
    pub metadata: Option<ScopeTag>,
}

#[api_model(deny_unknown_fields = false)]
/// Updatable attributes; identity fields in the body are ignored.
pub struct UpdateRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub order: Option<i64>,
    /// Scope the target is looked up in; never written
    #[serde(default)]
    pub metadata: Option<ScopeTag>,
}

#[api_model(deny_unknown_fields = false)]
/// Filter fields, an optional `page` block and an optional scope.
pub struct SearchRequest {
    #[serde(default)]
    pub metadata: Option<ScopeTag>,
    /// e.g. `{"order": {"$gte": 1}, "page": {"start": 0, "limit": 20, "sort": "-order"}}`
    #[serde(flatten)]
    #[cfg_attr(feature = "server", schema(value_type = Object))]
    pub filter: Map<String, Value>,
}

#[api_model]
#[derive(Default)]
/// Optional body of a delete.
pub struct DeleteRequest {
    #[serde(default)]
    pub metadata: Option<ScopeTag>,
}

fn service<'a>(state: &'a ApiState, ctx: &RequestContext) -> Result<&'a ClassificationService, ApiError> {
    state
        .try_get_slice::<Classifications>()
        .map(|slice| &slice.service)
        .map_err(|err| ApiError::new(ErrorKind::Internal, err.to_string(), ctx))
}

fn body<T>(body: Result<Json<T>, JsonRejection>, ctx: &RequestContext) -> Result<T, ApiError> {
    body.map(|Json(body)| body)
        .map_err(|rejection| ApiError::new(ErrorKind::InvalidInput, rejection.body_text(), ctx))
}

fn path_id(id: Result<Path<i64>, PathRejection>, ctx: &RequestContext) -> Result<i64, ApiError> {
    id.map(|Path(id)| id)
        .map_err(|rejection| ApiError::new(ErrorKind::InvalidInput, rejection.body_text(), ctx))
}

/// An absent or empty body decodes as `T::default()`.
fn optional_body<T>(bytes: &Bytes, ctx: &RequestContext) -> Result<T, ApiError>
where
    T: DeserializeOwned + Default,
{
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(bytes)
        .map_err(|err| ApiError::new(ErrorKind::InvalidInput, err.to_string(), ctx))
}

#[api_handler(
    post,
    path = "/classification",
    request_body = CreateRequest,
    responses(
        (status = OK, description = "Created classification", body = ApiResponse<Classification>),
        (status = BAD_REQUEST, description = "Invalid or duplicate attributes"),
        (status = MULTI_STATUS, description = "Created, but the audit record failed"),
    ),
    tag = CLASSIFICATION_TAG,
)]
pub async fn create_classification(
    State(state): State<ApiState>,
    ctx: RequestContext,
    request: Result<Json<CreateRequest>, JsonRejection>,
) -> ApiResult<Classification> {
    let request = body(request, &ctx)?;
    let ctx = ctx.with_scope(request.metadata);
    let attrs = ClassificationAttrs {
        classification_id: request.classification_id,
        name: request.name,
        icon: request.icon,
        kind: request.kind,
        order: request.order,
    };

    let created = service(&state, &ctx)?
        .create(&ctx, attrs)
        .await
        .map_err(|err| ApiError::from_error(&err, &ctx))?;
    Ok(ApiResponse::ok(&ctx, created))
}

#[api_handler(
    post,
    path = "/classification/search",
    request_body = SearchRequest,
    responses(
        (status = OK, description = "Matching classifications", body = ApiResponse<Vec<Classification>>),
        (status = BAD_REQUEST, description = "Malformed filter"),
    ),
    tag = CLASSIFICATION_TAG,
)]
pub async fn search_classification(
    State(state): State<ApiState>,
    ctx: RequestContext,
    request: Result<Json<SearchRequest>, JsonRejection>,
) -> ApiResult<Vec<Classification>> {
    let request = body(request, &ctx)?;
    let ctx = ctx.with_scope(request.metadata);
    let condition =
        ConditionBuilder::parse(request.filter).map_err(|err| ApiError::new(ErrorKind::MalformedFilter, err.to_string(), &ctx))?;

    let found = service(&state, &ctx)?
        .find(&ctx, &condition)
        .await
        .map_err(|err| ApiError::from_error(&err, &ctx))?;
    Ok(ApiResponse::ok(&ctx, found))
}

#[api_handler(
    post,
    path = "/classification/search_with_objects",
    request_body = SearchRequest,
    responses(
        (status = OK, description = "Matching classifications with their objects", body = ApiResponse<Vec<ClassificationWithObjects>>),
        (status = BAD_REQUEST, description = "Malformed filter"),
    ),
    tag = CLASSIFICATION_TAG,
)]
pub async fn search_classification_with_objects(
    State(state): State<ApiState>,
    ctx: RequestContext,
    request: Result<Json<SearchRequest>, JsonRejection>,
) -> ApiResult<Vec<ClassificationWithObjects>> {
    let request = body(request, &ctx)?;
    let ctx = ctx.with_scope(request.metadata);
    let condition =
        ConditionBuilder::parse(request.filter).map_err(|err| ApiError::new(ErrorKind::MalformedFilter, err.to_string(), &ctx))?;

    let found = service(&state, &ctx)?
        .find_with_related(&ctx, &condition)
        .await
        .map_err(|err| ApiError::from_error(&err, &ctx))?;
    Ok(ApiResponse::ok(&ctx, found))
}

#[api_handler(
    put,
    path = "/classification/{id}",
    params(("id" = i64, Path, description = "Classification id")),
    request_body = UpdateRequest,
    responses(
        (status = OK, description = "Updated", body = ApiResponse<EmptyData>),
        (status = NOT_FOUND, description = "No such classification in scope"),
        (status = MULTI_STATUS, description = "Updated, but the audit record failed"),
    ),
    tag = CLASSIFICATION_TAG,
)]
pub async fn update_classification(
    State(state): State<ApiState>,
    ctx: RequestContext,
    id: Result<Path<i64>, PathRejection>,
    request: Result<Json<UpdateRequest>, JsonRejection>,
) -> ApiResult<EmptyData> {
    let id = path_id(id, &ctx)?;
    let request = body(request, &ctx)?;
    let ctx = ctx.with_scope(request.metadata);
    let patch = ClassificationPatch { name: request.name, icon: request.icon, order: request.order };

    service(&state, &ctx)?
        .update(&ctx, id, &patch)
        .await
        .map_err(|err| ApiError::from_error(&err, &ctx))?;
    Ok(ApiResponse::ok(&ctx, EmptyData {}))
}

#[api_handler(
    delete,
    path = "/classification/{id}",
    params(("id" = i64, Path, description = "Classification id")),
    request_body = DeleteRequest,
    responses(
        (status = OK, description = "Deleted", body = ApiResponse<EmptyData>),
        (status = NOT_FOUND, description = "No such classification in scope"),
        (status = BAD_REQUEST, description = "Built in, or still owns objects"),
    ),
    tag = CLASSIFICATION_TAG,
)]
pub async fn delete_classification(
    State(state): State<ApiState>,
    ctx: RequestContext,
    id: Result<Path<i64>, PathRejection>,
    request: Bytes,
) -> ApiResult<EmptyData> {
    let id = path_id(id, &ctx)?;
    let request: DeleteRequest = optional_body(&request, &ctx)?;
    let ctx = ctx.with_scope(request.metadata);

    service(&state, &ctx)?
        .delete(&ctx, id)
        .await
        .map_err(|err| ApiError::from_error(&err, &ctx))?;
    Ok(ApiResponse::ok(&ctx, EmptyData {}))
}

pub fn router() -> OpenApiRouter<ApiState> {
    OpenApiRouter::new()
        .routes(routes!(create_classification))
        .routes(routes!(search_classification))
        .routes(routes!(search_classification_with_objects))
        .routes(routes!(update_classification, delete_classification))
}
