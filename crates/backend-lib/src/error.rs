// crates/backend-lib/src/error.rs

//! Central error type + Axum integration.
use axum::{
    extract::rejection::JsonRejection,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use kalenderium_common::{FieldErrors, RpcError, RpcErrorKind};
use thiserror::Error;

/// Application error types with error codes and context
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Validation failed: {0}")]
    Validation(FieldErrors),

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Invalid or missing authentication token")]
    InvalidAuthenticationToken,

    #[error("Authentication required")]
    AuthenticationRequired,

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Method {0} not allowed")]
    MethodNotAllowed(String),

    #[error("Duplicate email")]
    DuplicateEmail,

    #[error("Record not found: {0}")]
    RecordNotFound(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::BadRequest(_) | AppError::DuplicateEmail => {
                StatusCode::BAD_REQUEST
            },
            AppError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            AppError::Authentication(_)
            | AppError::InvalidAuthenticationToken
            | AppError::AuthenticationRequired => StatusCode::UNAUTHORIZED,
            AppError::RecordNotFound(_) => StatusCode::NOT_FOUND,
            AppError::RateLimitExceeded => StatusCode::TOO_MANY_REQUESTS,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "VAL_001",
            AppError::BadRequest(_) => "REQ_001",
            AppError::MethodNotAllowed(_) => "REQ_002",
            AppError::Authentication(_) => "AUTH_001",
            AppError::InvalidAuthenticationToken => "AUTH_002",
            AppError::AuthenticationRequired => "AUTH_003",
            AppError::DuplicateEmail => "ACC_001",
            AppError::RecordNotFound(_) => "NF_001",
            AppError::RateLimitExceeded => "RATE_001",
            AppError::Internal(_) => "INT_001",
        }
    }

    /// Client-facing message. Internal details are never included.
    pub fn sanitized_message(&self) -> String {
        match self {
            AppError::Validation(_) => "Validation failed".to_string(),
            AppError::BadRequest(reason) => reason.clone(),
            AppError::MethodNotAllowed(method) => {
                format!("The {method} method is not supported for this resource")
            },
            AppError::Authentication(reason) => reason.clone(),
            AppError::InvalidAuthenticationToken => {
                "Invalid or missing authentication token".to_string()
            },
            AppError::AuthenticationRequired => {
                "You must be authenticated to access this resource".to_string()
            },
            AppError::DuplicateEmail => "A user with this email address already exists".to_string(),
            AppError::RecordNotFound(_) => "The requested resource could not be found".to_string(),
            AppError::RateLimitExceeded => "Rate limit exceeded".to_string(),
            AppError::Internal(_) => {
                "The server encountered a problem and could not process your request".to_string()
            },
        }
    }

    /// Whether this error hides server-side detail from the caller
    pub fn is_internal(&self) -> bool {
        matches!(self, AppError::Internal(_))
    }

    /// Convert into the RPC error payload; internal detail is dropped here
    pub fn to_rpc_error(&self) -> RpcError {
        match self {
            AppError::Validation(fields) => RpcError {
                kind: RpcErrorKind::Validation,
                message: self.sanitized_message(),
                fields: fields.clone(),
            },
            AppError::Authentication(_)
            | AppError::InvalidAuthenticationToken
            | AppError::AuthenticationRequired => {
                RpcError::new(RpcErrorKind::Authentication, self.sanitized_message())
            },
            AppError::BadRequest(reason) => RpcError::new(RpcErrorKind::Validation, reason.clone()),
            AppError::DuplicateEmail => {
                RpcError::new(RpcErrorKind::Duplicate, self.sanitized_message())
            },
            AppError::RecordNotFound(what) => RpcError::new(RpcErrorKind::NotFound, what.clone()),
            AppError::MethodNotAllowed(_)
            | AppError::RateLimitExceeded
            | AppError::Internal(_) => {
                RpcError::new(RpcErrorKind::Internal, self.sanitized_message())
            },
        }
    }
}

impl From<RpcError> for AppError {
    fn from(err: RpcError) -> Self {
        match err.kind {
            RpcErrorKind::Validation => AppError::Validation(err.fields),
            RpcErrorKind::Authentication => AppError::Authentication(err.message),
            RpcErrorKind::Duplicate => AppError::DuplicateEmail,
            RpcErrorKind::NotFound => AppError::RecordNotFound(err.message),
            RpcErrorKind::Internal => AppError::Internal(format!("account service: {}", err.message)),
        }
    }
}

impl From<FieldErrors> for AppError {
    fn from(fields: FieldErrors) -> Self {
        AppError::Validation(fields)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if self.is_internal() {
            tracing::error!(error = %self, code = self.error_code(), "request failed");
        }

        let mut error = serde_json::json!({
            "code": self.error_code(),
            "message": self.sanitized_message(),
        });
        if let AppError::Validation(fields) = &self {
            error["fields"] = serde_json::to_value(fields).unwrap_or_default();
        }
        let body = serde_json::json!({ "error": error });

        let mut response = (status, axum::Json(body)).into_response();
        if matches!(self, AppError::InvalidAuthenticationToken) {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        response
    }
}

/// Undecodable request bodies are the caller's fault, whatever axum's status
impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}
