use axum::extract::FromRequest;

use crate::error::AppError;

/// `Json` body whose rejections surface as `AppError::Validation` (400 with a
/// JSON error body) instead of axum's plain-text 4xx.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct AppJson<T>(pub T);
