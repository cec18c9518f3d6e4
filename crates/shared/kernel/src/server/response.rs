//! The JSON envelope every endpoint answers with.
//!
//! ```json
//! { "result": true, "code": 0, "message": "success", "requestId": "…", "data": { … } }
//! ```

use crate::context::RequestContext;
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde_json::Value;
use std::fmt::Display;
use tracing::{error, warn};
use utoipa::ToSchema;

pub const SUCCESS_CODE: u32 = 0;
const SUCCESS_MESSAGE: &str = "success";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    MalformedFilter,
    InvalidInput,
    Forbidden,
    NotFound,
    AuditCapture,
    /// The mutation went through but its audit record did not.
    AuditPersistence,
    StorageUnavailable,
    Internal,
}

impl ErrorKind {
    #[must_use]
    pub const fn status(self) -> StatusCode {
        match self {
            Self::MalformedFilter | Self::InvalidInput => StatusCode::BAD_REQUEST,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::AuditCapture => StatusCode::CONFLICT,
            Self::AuditPersistence => StatusCode::MULTI_STATUS,
            Self::StorageUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    #[must_use]
    pub const fn code(self) -> u32 {
        match self {
            Self::MalformedFilter => 1_199_001,
            Self::InvalidInput => 1_199_002,
            Self::Forbidden => 1_199_003,
            Self::NotFound => 1_199_004,
            Self::AuditCapture => 1_199_005,
            Self::AuditPersistence => 1_199_006,
            Self::StorageUnavailable => 1_199_007,
            Self::Internal => 1_199_999,
        }
    }

    /// Partial success still reports `result: true`.
    #[must_use]
    pub const fn is_partial_success(self) -> bool {
        matches!(self, Self::AuditPersistence)
    }
}

/// Maps a crate error onto the envelope taxonomy.
pub trait IntoApiError: Display {
    fn kind(&self) -> ErrorKind;

    /// Payload carried along with the error, e.g. the id of a mutated entity.
    fn data(&self) -> Option<Value> {
        None
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    pub result: bool,
    pub code: u32,
    pub message: String,
    pub request_id: String,
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn ok(ctx: &RequestContext, data: T) -> Self {
        Self {
            result: true,
            code: SUCCESS_CODE,
            message: SUCCESS_MESSAGE.to_owned(),
            request_id: ctx.request_id.clone(),
            data: Some(data),
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

/// Placeholder payload of operations without data.
#[derive(Debug, Clone, Copy, Default, Serialize, ToSchema)]
pub struct EmptyData {}

#[derive(Debug, Clone)]
pub struct ApiError {
    pub kind: ErrorKind,
    pub message: String,
    pub request_id: String,
    pub data: Option<Value>,
}

impl ApiError {
    pub fn new(kind: ErrorKind, message: impl Into<String>, ctx: &RequestContext) -> Self {
        Self { kind, message: message.into(), request_id: ctx.request_id.clone(), data: None }
    }

    /// Translates `err` and logs it with the caller's correlation fields.
    pub fn from_error<E: IntoApiError>(err: &E, ctx: &RequestContext) -> Self {
        let kind = err.kind();
        match kind {
            ErrorKind::Internal | ErrorKind::StorageUnavailable | ErrorKind::AuditPersistence => {
                error!(request_id = %ctx.request_id, operator = %ctx.operator, code = kind.code(), %err, "Request failed");
            }
            _ => {
                warn!(request_id = %ctx.request_id, operator = %ctx.operator, code = kind.code(), %err, "Request rejected");
            }
        }
        Self { kind, message: err.to_string(), request_id: ctx.request_id.clone(), data: err.data() }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ApiResponse {
            result: self.kind.is_partial_success(),
            code: self.kind.code(),
            message: self.message,
            request_id: self.request_id,
            data: self.data,
        };
        (self.kind.status(), Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<ApiResponse<T>, ApiError>;
