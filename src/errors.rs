use axum::extract::multipart::MultipartRejection;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};

use crate::JsonResponse;

#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    #[error("{0}")]
    NotFound(&'static str),
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Conflict(&'static str),
    #[error("{0}")]
    BadRequest(String),
    #[error("Internal Server Error")]
    ServerError,
    #[error("database error: {0}")]
    DatabaseError(sqlx::Error),
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

impl ErrorBody {
    pub fn new(error: &str) -> ErrorBody {
        ErrorBody {
            error: error.to_string(),
        }
    }
}

impl From<sqlx::Error> for RequestError {
    fn from(value: sqlx::Error) -> Self {
        if let sqlx::Error::Database(e) = &value {
            if e.message().contains("UNIQUE constraint failed") {
                return Self::Conflict("A record with the same unique value already exists");
            }
        }
        Self::DatabaseError(value)
    }
}

impl RequestError {
    /// Keeps axum's 422 for well-formed input with the wrong shape; everything else is a 400.
    fn rejected(status: StatusCode, message: String) -> Self {
        if status == StatusCode::UNPROCESSABLE_ENTITY {
            Self::Validation(message)
        } else {
            Self::BadRequest(message)
        }
    }
}

impl From<JsonRejection> for RequestError {
    fn from(rejection: JsonRejection) -> Self {
        Self::rejected(rejection.status(), rejection.body_text())
    }
}

impl From<PathRejection> for RequestError {
    fn from(rejection: PathRejection) -> Self {
        Self::rejected(rejection.status(), rejection.body_text())
    }
}

impl From<QueryRejection> for RequestError {
    fn from(rejection: QueryRejection) -> Self {
        Self::rejected(rejection.status(), rejection.body_text())
    }
}

impl From<MultipartRejection> for RequestError {
    fn from(rejection: MultipartRejection) -> Self {
        Self::rejected(rejection.status(), rejection.body_text())
    }
}

impl IntoResponse for RequestError {
    fn into_response(self) -> axum::response::Response {
        self.to_json_response().into_response()
    }
}

impl RequestError {
    pub fn to_json_response(&self) -> JsonResponse<ErrorBody> {
        let status_code = match self {
            RequestError::NotFound(_) => StatusCode::NOT_FOUND,
            RequestError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            RequestError::Conflict(_) => StatusCode::CONFLICT,
            RequestError::BadRequest(_) => StatusCode::BAD_REQUEST,
            RequestError::ServerError => StatusCode::INTERNAL_SERVER_ERROR,
            RequestError::DatabaseError(e) => {
                tracing::error!("Database error: {}", e);
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorBody::new("Internal Server Error")),
                );
            }
        };
        (status_code, Json(ErrorBody::new(&self.to_string())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn database_errors_are_hidden() {
        let (status, Json(body)) = RequestError::DatabaseError(sqlx::Error::RowNotFound)
            .to_json_response();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.error, "Internal Server Error");
    }

    #[test]
    fn rejections_keep_their_status_class() {
        let shape = RequestError::rejected(StatusCode::UNPROCESSABLE_ENTITY, "missing field".into());
        assert_eq!(shape.to_json_response().0, StatusCode::UNPROCESSABLE_ENTITY);
        let syntax = RequestError::rejected(StatusCode::BAD_REQUEST, "bad json".into());
        let (status, Json(body)) = syntax.to_json_response();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.error, "bad json");
    }

    #[test]
    fn validation_message_is_passed_through() {
        let (status, Json(body)) =
            RequestError::Validation("Title is required".to_string()).to_json_response();
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body.error, "Title is required");
    }
}
