use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::response::{ApiResponse, Meta};

#[derive(Debug, Error)]
pub enum AppError {
    #[error("insufficient_stock_quantity")]
    InsufficientStock,

    #[error("invalid_product_list")]
    InvalidProductSet,

    #[error("order_final_status_reached")]
    OrderFinalStateReached,

    #[error("product {0} is not in the cart")]
    ProductNotInCart(Uuid),

    #[error("Not Found")]
    NotFound,

    #[error("Bad Request {0}")]
    BadRequest(String),

    #[error("Forbidden")]
    Forbidden,

    #[error("Database error")]
    DbError(#[from] sqlx::Error),

    #[error("ORM error")]
    OrmError(#[from] sea_orm::DbErr),

    #[error("Internal Server Error")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Underlying transaction or query failures that no other variant classifies.
    pub fn is_storage_failure(&self) -> bool {
        matches!(self, AppError::DbError(_) | AppError::OrmError(_))
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::InsufficientStock
            | AppError::InvalidProductSet
            | AppError::ProductNotInCart(_)
            | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::OrderFinalStateReached => StatusCode::CONFLICT,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::DbError(_) | AppError::OrmError(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

#[derive(Serialize)]
struct ErrorData {
    error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        match &self {
            AppError::DbError(err) => tracing::error!(error = %err, "storage failure"),
            AppError::OrmError(err) => tracing::error!(error = %err, "storage failure"),
            AppError::Internal(err) => tracing::error!(error = %err, "internal error"),
            _ => {}
        }

        let body = ApiResponse {
            message: self.to_string(),
            data: Some(ErrorData {
                error: self.to_string(),
            }),
            meta: Some(Meta::empty()),
        };

        (status, axum::Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_refusals_are_client_errors() {
        assert_eq!(AppError::InsufficientStock.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::InvalidProductSet.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            AppError::ProductNotInCart(Uuid::nil()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::OrderFinalStateReached.status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(AppError::NotFound.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn storage_failures_are_classified() {
        let err = AppError::from(sqlx::Error::RowNotFound);
        assert!(err.is_storage_failure());
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);

        let err = AppError::from(sea_orm::DbErr::Custom("boom".into()));
        assert!(err.is_storage_failure());

        assert!(!AppError::InsufficientStock.is_storage_failure());
        assert!(!AppError::Internal(anyhow::anyhow!("x")).is_storage_failure());
    }

    #[test]
    fn refusal_messages_are_stable() {
        assert_eq!(
            AppError::InsufficientStock.to_string(),
            "insufficient_stock_quantity"
        );
        assert_eq!(
            AppError::OrderFinalStateReached.to_string(),
            "order_final_status_reached"
        );
    }
}
