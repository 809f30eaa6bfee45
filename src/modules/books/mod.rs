pub mod models;
pub mod repository;
pub mod routes;
pub mod validation;

use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use bookshelf_db::Pool;
use bookshelf_kernel::{InitCtx, Migration, Module};
use serde_json::json;

use repository::SqlBookRepository;
use routes::SharedBookRepository;

/// Book catalog: CRUD over the `books` table
pub struct BooksModule {
    repository: SharedBookRepository,
}

impl BooksModule {
    pub fn new(repository: SharedBookRepository) -> Self {
        Self { repository }
    }
}

/// Schema for the `books` table
pub fn migrations() -> Vec<Migration> {
    vec![
        Migration {
            id: "001_init",
            up: r#"
                CREATE TABLE books (
                    isbn       TEXT PRIMARY KEY NOT NULL CHECK (isbn <> ''),
                    amazon_url TEXT NOT NULL,
                    author     TEXT NOT NULL,
                    language   TEXT NOT NULL,
                    pages      INTEGER NOT NULL CHECK (pages >= 0),
                    publisher  TEXT NOT NULL,
                    title      TEXT NOT NULL,
                    year       INTEGER NOT NULL
                );
                "#,
        },
        Migration {
            id: "002_title_index",
            up: "CREATE INDEX books_title_idx ON books (title);",
        },
    ]
}

#[async_trait]
impl Module for BooksModule {
    fn name(&self) -> &'static str {
        "books"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            "books module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router {
        routes::router(Arc::clone(&self.repository))
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        let error = |description: &str| {
            json!({
                "description": description,
                "content": {
                    "application/json": {
                        "schema": { "$ref": "#/components/schemas/ErrorResponse" }
                    }
                }
            })
        };
        let book_body = |schema: &str| {
            json!({
                "required": true,
                "content": {
                    "application/json": {
                        "schema": { "$ref": format!("#/components/schemas/{}", schema) }
                    }
                }
            })
        };
        let book_response = |description: &str| {
            json!({
                "description": description,
                "content": {
                    "application/json": {
                        "schema": { "$ref": "#/components/schemas/BookResponse" }
                    }
                }
            })
        };
        let isbn_param = json!([{
            "name": "isbn",
            "in": "path",
            "required": true,
            "schema": { "type": "string" }
        }]);

        let string_field = |description: &str| {
            json!({ "type": "string", "minLength": 1, "description": description })
        };
        let book_properties = json!({
            "isbn": string_field("Unique identifier, immutable after creation"),
            "amazon_url": string_field("Store link"),
            "author": string_field("Author of the book"),
            "language": string_field("Language the book is written in"),
            "pages": { "type": "integer", "format": "int32", "minimum": 0 },
            "publisher": string_field("Publisher of the book"),
            "title": string_field("Title of the book"),
            "year": { "type": "integer", "format": "int32" }
        });
        let mut update_properties = book_properties.clone();
        if let Some(props) = update_properties.as_object_mut() {
            props.remove("isbn");
        }

        Some(json!({
            "paths": {
                "/": {
                    "get": {
                        "summary": "List books ordered by title",
                        "tags": ["Books"],
                        "responses": {
                            "200": {
                                "description": "All books",
                                "content": {
                                    "application/json": {
                                        "schema": { "$ref": "#/components/schemas/BookListResponse" }
                                    }
                                }
                            },
                            "500": error("Internal server error")
                        }
                    },
                    "post": {
                        "summary": "Create a book",
                        "tags": ["Books"],
                        "requestBody": book_body("Book"),
                        "responses": {
                            "201": book_response("Book created"),
                            "400": error("Validation error"),
                            "409": error("A book with this isbn already exists")
                        }
                    }
                },
                "/{isbn}": {
                    "get": {
                        "summary": "Get a book by isbn",
                        "tags": ["Books"],
                        "parameters": isbn_param,
                        "responses": {
                            "200": book_response("The book"),
                            "404": error("Book not found")
                        }
                    },
                    "put": {
                        "summary": "Update some fields of a book",
                        "tags": ["Books"],
                        "parameters": isbn_param,
                        "requestBody": book_body("BookUpdate"),
                        "responses": {
                            "200": book_response("Updated book"),
                            "400": error("Validation error"),
                            "404": error("Book not found")
                        }
                    },
                    "delete": {
                        "summary": "Delete a book",
                        "tags": ["Books"],
                        "parameters": isbn_param,
                        "responses": {
                            "200": {
                                "description": "Book deleted",
                                "content": {
                                    "application/json": {
                                        "schema": { "$ref": "#/components/schemas/MessageResponse" }
                                    }
                                }
                            },
                            "404": error("Book not found")
                        }
                    }
                }
            },
            "components": {
                "schemas": {
                    "Book": {
                        "type": "object",
                        "properties": book_properties,
                        "required": validation::BOOK_FIELDS,
                        "additionalProperties": false
                    },
                    "BookUpdate": {
                        "type": "object",
                        "properties": update_properties,
                        "additionalProperties": false
                    },
                    "BookResponse": {
                        "type": "object",
                        "properties": { "book": { "$ref": "#/components/schemas/Book" } },
                        "required": ["book"]
                    },
                    "BookListResponse": {
                        "type": "object",
                        "properties": {
                            "books": {
                                "type": "array",
                                "items": { "$ref": "#/components/schemas/Book" }
                            }
                        },
                        "required": ["books"]
                    },
                    "MessageResponse": {
                        "type": "object",
                        "properties": { "message": { "type": "string" } },
                        "required": ["message"]
                    }
                }
            }
        }))
    }

    fn migrations(&self) -> Vec<Migration> {
        migrations()
    }

    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module started");
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module stopped");
        Ok(())
    }
}

/// Create the books module over a SQL repository on `pool`
pub fn create_module(pool: Pool) -> Arc<dyn Module> {
    Arc::new(BooksModule::new(Arc::new(SqlBookRepository::new(pool))))
}
