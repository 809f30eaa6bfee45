//! HTTP handlers for `/books`.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use bookshelf_http::error::AppError;
use serde_json::Value;

use super::models::{BookListResponse, BookResponse, MessageResponse};
use super::repository::{BookRepository, BookRepositoryError};
use super::validation::{self, FieldError, ValidationErrors};

/// Repository handle shared by every handler
pub type SharedBookRepository = Arc<dyn BookRepository>;

/// Routes relative to the module mount point
pub fn router(repository: SharedBookRepository) -> Router {
    Router::new()
        .route("/", get(list_books).post(create_book))
        .route(
            "/{isbn}",
            get(get_book).put(update_book).delete(delete_book),
        )
        .with_state(repository)
}

impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> Self {
        AppError::validation(details(errors.errors()), "Invalid book payload")
    }
}

/// `details` entries of the error envelope
fn details(errors: &[FieldError]) -> Vec<Value> {
    errors
        .iter()
        .filter_map(|e| serde_json::to_value(e).ok())
        .collect()
}

impl From<BookRepositoryError> for AppError {
    fn from(error: BookRepositoryError) -> Self {
        match error {
            BookRepositoryError::NotFound(isbn) => {
                AppError::not_found(format!("No book with isbn '{}'", isbn))
            }
            BookRepositoryError::Conflict(isbn) => AppError::conflict(
                details(&[FieldError::new("isbn", "already exists")]),
                format!("A book with isbn '{}' already exists", isbn),
            ),
            BookRepositoryError::Store(e) => {
                AppError::Internal(anyhow::Error::new(e).context("book store failure"))
            }
        }
    }
}

async fn list_books(
    State(repository): State<SharedBookRepository>,
) -> Result<Json<BookListResponse>, AppError> {
    let books = repository.list_all().await?;
    Ok(Json(BookListResponse { books }))
}

async fn get_book(
    State(repository): State<SharedBookRepository>,
    Path(isbn): Path<String>,
) -> Result<Json<BookResponse>, AppError> {
    let book = repository.get_by_isbn(&isbn).await?;
    Ok(Json(BookResponse { book }))
}

async fn create_book(
    State(repository): State<SharedBookRepository>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<BookResponse>), AppError> {
    let Json(payload) = payload?;
    let book = validation::validate_create(&payload)?;

    let book = repository.create(&book).await?;
    tracing::info!(isbn = %book.isbn, "book created");

    Ok((StatusCode::CREATED, Json(BookResponse { book })))
}

async fn update_book(
    State(repository): State<SharedBookRepository>,
    Path(isbn): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<BookResponse>, AppError> {
    let Json(payload) = payload?;
    let changes = validation::validate_update(&payload)?;

    let book = repository.update(&isbn, &changes).await?;
    tracing::info!(isbn = %book.isbn, "book updated");

    Ok(Json(BookResponse { book }))
}

async fn delete_book(
    State(repository): State<SharedBookRepository>,
    Path(isbn): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    repository.delete_by_isbn(&isbn).await?;
    tracing::info!(isbn = %isbn, "book deleted");

    Ok(Json(MessageResponse {
        message: "Book deleted".to_string(),
    }))
}
