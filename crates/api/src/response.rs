use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Serialize, Serializer};
use serde_json::{json, Value};

use thebestory_common::IdentifierError;
use thebestory_content::{ContentError, ListingError};

/// Application codes. Clients rely on these numbers, independently of the
/// HTTP status that carries them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    Internal = 1001,
    StoryNotCommitted = 1004,
    CommentNotCommitted = 1005,
    LikeNotCommitted = 1006,
    MalformedInput = 2002,
    BadIdentifier = 2003,
    BadListing = 3001,
    NotApproved = 4001,
    EmptyContent = 5004,
    ContentTooLong = 5006,
}

impl ErrorCode {
    /// Warning attached to a story whose topic row is missing.
    pub const PARTIAL_RESULT: ErrorCode = ErrorCode::MalformedInput;

    pub fn as_u16(self) -> u16 {
        self as u16
    }
}

impl Serialize for ErrorCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u16(self.as_u16())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    Ok,
    Warning,
    Error,
}

#[derive(Debug, Clone, Serialize)]
pub struct Envelope {
    pub status: ResponseStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<ErrorCode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub data: Value,
}

#[derive(Debug, Clone)]
pub struct AppSuccess {
    pub status: StatusCode,
    pub warning: Option<ErrorCode>,
    pub data: Value,
}

impl AppSuccess {
    pub fn new(status: StatusCode, data: Value) -> Self {
        Self { status, warning: None, data }
    }

    /// Marks the payload as usable but incomplete.
    pub fn with_warning(mut self, code: ErrorCode) -> Self {
        self.warning = Some(code);
        self
    }

    fn envelope(self) -> Envelope {
        Envelope {
            status: if self.warning.is_some() { ResponseStatus::Warning } else { ResponseStatus::Ok },
            code: self.warning,
            message: None,
            data: self.data,
        }
    }
}

impl IntoResponse for AppSuccess {
    fn into_response(self) -> Response {
        let status = self.status;
        (status, Json(self.envelope())).into_response()
    }
}

#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub code: ErrorCode,
    pub error: anyhow::Error,
}

impl AppError {
    pub fn new(status: StatusCode, code: ErrorCode, error: anyhow::Error) -> Self {
        Self { status, code, error }
    }

    pub fn internal(error: anyhow::Error) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, ErrorCode::Internal, error)
    }

    fn envelope(&self) -> Envelope {
        // Unexpected failures keep their cause in the log only.
        let message = match self.code {
            ErrorCode::Internal => "internal error".to_string(),
            _ => self.error.to_string(),
        };

        Envelope {
            status: ResponseStatus::Error,
            code: Some(self.code),
            message: Some(message),
            data: json!({}),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!("CODE: {}, STATUS: {}, ERROR: {:#}", self.code.as_u16(), self.status.as_u16(), self.error);
        } else {
            tracing::warn!("CODE: {}, STATUS: {}, ERROR: {}", self.code.as_u16(), self.status.as_u16(), self.error);
        }

        (self.status, Json(self.envelope())).into_response()
    }
}

impl From<ContentError> for AppError {
    fn from(err: ContentError) -> Self {
        let (status, code) = match &err {
            ContentError::StoryNotFound => (StatusCode::NOT_FOUND, ErrorCode::BadIdentifier),
            ContentError::StoryNotApproved => (StatusCode::FORBIDDEN, ErrorCode::NotApproved),
            ContentError::TopicNotFound(_) => (StatusCode::BAD_REQUEST, ErrorCode::MalformedInput),
            ContentError::ParentCommentNotFound => (StatusCode::BAD_REQUEST, ErrorCode::MalformedInput),
            ContentError::ReplyTooDeep { .. } => (StatusCode::BAD_REQUEST, ErrorCode::MalformedInput),
            ContentError::EmptyContent => (StatusCode::BAD_REQUEST, ErrorCode::EmptyContent),
            ContentError::ContentTooLong { .. } => (StatusCode::BAD_REQUEST, ErrorCode::ContentTooLong),
            ContentError::StoryNotCommitted(_) => (StatusCode::INTERNAL_SERVER_ERROR, ErrorCode::StoryNotCommitted),
            ContentError::CommentNotCommitted(_) => (StatusCode::INTERNAL_SERVER_ERROR, ErrorCode::CommentNotCommitted),
            ContentError::LikeNotCommitted(_) => (StatusCode::INTERNAL_SERVER_ERROR, ErrorCode::LikeNotCommitted),
            ContentError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, ErrorCode::Internal),
        };
        Self::new(status, code, err.into())
    }
}

impl From<ListingError> for AppError {
    fn from(err: ListingError) -> Self {
        Self::new(StatusCode::BAD_REQUEST, ErrorCode::BadListing, err.into())
    }
}

impl From<IdentifierError> for AppError {
    fn from(err: IdentifierError) -> Self {
        Self::new(StatusCode::BAD_REQUEST, ErrorCode::BadIdentifier, err.into())
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        Self::internal(err.into())
    }
}
