use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Inactive: {0}")]
    Inactive(String),

    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),
}

impl AppError {
    /// Stable tag used in per-item batch results.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::NotFound(_) => "not_found",
            Self::Conflict(_) => "conflict",
            Self::Inactive(_) => "inactive",
            Self::Database(_) | Self::Config(_) => "internal",
        }
    }

    /// Message safe to hand back to a client. System errors are redacted.
    #[must_use]
    pub fn public_message(&self) -> String {
        match self {
            Self::Validation(msg)
            | Self::NotFound(msg)
            | Self::Conflict(msg)
            | Self::Inactive(msg) => msg.clone(),
            Self::Database(_) => "Database error".to_string(),
            Self::Config(_) => "Configuration error".to_string(),
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Inactive(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Database(_) | Self::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match &self {
            Self::Database(e) => tracing::error!("Database error: {e:?}"),
            Self::Config(e) => tracing::error!("Config error: {e:?}"),
            _ => {}
        }

        let body = Json(json!({
            "error": self.public_message(),
        }));

        (self.status(), body).into_response()
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigError;

    #[test]
    fn client_errors_keep_their_message_and_status() {
        let cases = [
            (AppError::Validation("bad".into()), StatusCode::BAD_REQUEST, "validation"),
            (AppError::NotFound("gone".into()), StatusCode::NOT_FOUND, "not_found"),
            (AppError::Conflict("dup".into()), StatusCode::CONFLICT, "conflict"),
            (AppError::Inactive("off".into()), StatusCode::UNPROCESSABLE_ENTITY, "inactive"),
        ];

        for (err, status, kind) in cases {
            assert_eq!(err.status(), status);
            assert_eq!(err.kind(), kind);
            assert!(!err.public_message().is_empty());
        }
    }

    #[test]
    fn system_errors_are_redacted() {
        let db = AppError::Database(sea_orm::DbErr::Custom("password=hunter2".into()));
        assert_eq!(db.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(db.kind(), "internal");
        assert_eq!(db.public_message(), "Database error");

        let config = AppError::Config(ConfigError::Missing("DATABASE_URL"));
        assert_eq!(config.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(config.public_message(), "Configuration error");
    }
}
