use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use sea_orm::DbErr;
use serde::Serialize;

use crate::models::ValidationFailure;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Db(#[from] DbErr),
    #[error("operation cancelled")]
    Cancelled,
}

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("validation failed for {}", field_list(.errors))]
pub struct ValidationErrors {
    pub errors: Vec<ValidationFailure>,
}

impl ValidationErrors {
    pub fn push(&mut self, property_name: &str, message: impl Into<String>) {
        self.errors.push(ValidationFailure::new(property_name, message));
    }

    pub fn into_result(self) -> Result<(), Self> {
        if self.errors.is_empty() { Ok(()) } else { Err(self) }
    }

    pub fn has(&self, property_name: &str) -> bool {
        self.errors.iter().any(|e| e.property_name == property_name)
    }
}

fn field_list(errors: &[ValidationFailure]) -> String {
    errors.iter().map(|e| e.property_name.as_str()).collect::<Vec<_>>().join(", ")
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error(transparent)]
    Validation(#[from] ValidationErrors),
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type CatalogResult<T> = Result<T, CatalogError>;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("not found")]
    NotFound,
    #[error("missing or malformed x-user-id header")]
    Unauthorized,
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::NotFound => StatusCode::NOT_FOUND.into_response(),
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, self.to_string()).into_response(),
            AppError::Catalog(CatalogError::Validation(errors)) => {
                (StatusCode::BAD_REQUEST, Json(errors)).into_response()
            },
            AppError::Catalog(CatalogError::Store(err)) => {
                tracing::warn!(error = %err, "request failed");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            },
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_errors_name_every_field() {
        let mut errors = ValidationErrors::default();
        errors.push("title", "'title' must not be empty.");
        errors.push("genres", "'genres' must not be empty.");

        assert_eq!(errors.to_string(), "validation failed for title, genres");
        let wrapped = CatalogError::from(errors);
        assert_eq!(wrapped.to_string(), "validation failed for title, genres");
    }
}
