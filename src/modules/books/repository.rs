//! Persistence for books: one table, one statement per operation.

use async_trait::async_trait;
use bookshelf_db::Pool;
use sqlx::{QueryBuilder, Sqlite};
use thiserror::Error;

use super::models::{Book, BookChanges};

#[derive(Debug, Error)]
pub enum BookRepositoryError {
    #[error("book {0} not found")]
    NotFound(String),

    #[error("book {0} already exists")]
    Conflict(String),

    #[error("book store failure: {0}")]
    Store(#[from] sqlx::Error),
}

pub type RepositoryResult<T> = Result<T, BookRepositoryError>;

/// CRUD operations over the book catalog
#[async_trait]
pub trait BookRepository: Send + Sync {
    /// Insert a new book; fails with `Conflict` when the isbn is taken
    async fn create(&self, book: &Book) -> RepositoryResult<Book>;
    /// All books ordered by title
    async fn list_all(&self) -> RepositoryResult<Vec<Book>>;
    async fn get_by_isbn(&self, isbn: &str) -> RepositoryResult<Book>;
    /// Apply only the supplied fields; isbn never changes
    async fn update(&self, isbn: &str, changes: &BookChanges) -> RepositoryResult<Book>;
    async fn delete_by_isbn(&self, isbn: &str) -> RepositoryResult<()>;
}

/// [`BookRepository`] backed by the `books` table
#[derive(Clone)]
pub struct SqlBookRepository {
    pool: Pool,
}

impl SqlBookRepository {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BookRepository for SqlBookRepository {
    async fn create(&self, book: &Book) -> RepositoryResult<Book> {
        tracing::debug!(isbn = %book.isbn, "inserting book");

        sqlx::query_as::<_, Book>(
            r#"
            INSERT INTO books (isbn, amazon_url, author, language, pages, publisher, title, year)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING isbn, amazon_url, author, language, pages, publisher, title, year
            "#,
        )
        .bind(book.isbn.as_str())
        .bind(book.amazon_url.as_str())
        .bind(book.author.as_str())
        .bind(book.language.as_str())
        .bind(book.pages)
        .bind(book.publisher.as_str())
        .bind(book.title.as_str())
        .bind(book.year)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                BookRepositoryError::Conflict(book.isbn.clone())
            }
            other => BookRepositoryError::Store(other),
        })
    }

    async fn list_all(&self) -> RepositoryResult<Vec<Book>> {
        let books = sqlx::query_as::<_, Book>(
            r#"
            SELECT isbn, amazon_url, author, language, pages, publisher, title, year
            FROM books
            ORDER BY title
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        tracing::debug!(count = books.len(), "listed books");
        Ok(books)
    }

    async fn get_by_isbn(&self, isbn: &str) -> RepositoryResult<Book> {
        sqlx::query_as::<_, Book>(
            r#"
            SELECT isbn, amazon_url, author, language, pages, publisher, title, year
            FROM books
            WHERE isbn = ?
            "#,
        )
        .bind(isbn)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| BookRepositoryError::NotFound(isbn.to_string()))
    }

    async fn update(&self, isbn: &str, changes: &BookChanges) -> RepositoryResult<Book> {
        if changes.is_empty() {
            return self.get_by_isbn(isbn).await;
        }

        tracing::debug!(isbn = %isbn, ?changes, "updating book");

        let mut query = QueryBuilder::<Sqlite>::new("UPDATE books SET ");
        {
            let mut set = query.separated(", ");
            if let Some(amazon_url) = &changes.amazon_url {
                set.push("amazon_url = ").push_bind_unseparated(amazon_url.clone());
            }
            if let Some(author) = &changes.author {
                set.push("author = ").push_bind_unseparated(author.clone());
            }
            if let Some(language) = &changes.language {
                set.push("language = ").push_bind_unseparated(language.clone());
            }
            if let Some(pages) = changes.pages {
                set.push("pages = ").push_bind_unseparated(pages);
            }
            if let Some(publisher) = &changes.publisher {
                set.push("publisher = ").push_bind_unseparated(publisher.clone());
            }
            if let Some(title) = &changes.title {
                set.push("title = ").push_bind_unseparated(title.clone());
            }
            if let Some(year) = changes.year {
                set.push("year = ").push_bind_unseparated(year);
            }
        }
        query
            .push(" WHERE isbn = ")
            .push_bind(isbn.to_string())
            .push(" RETURNING isbn, amazon_url, author, language, pages, publisher, title, year");

        query
            .build_query_as::<Book>()
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| BookRepositoryError::NotFound(isbn.to_string()))
    }

    async fn delete_by_isbn(&self, isbn: &str) -> RepositoryResult<()> {
        let result = sqlx::query("DELETE FROM books WHERE isbn = ?")
            .bind(isbn)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(BookRepositoryError::NotFound(isbn.to_string()));
        }

        tracing::debug!(isbn = %isbn, "deleted book");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn repository() -> SqlBookRepository {
        let pool = bookshelf_db::connect_in_memory().await.unwrap();
        let migrations: Vec<(String, bookshelf_kernel::Migration)> = crate::modules::books::migrations()
            .into_iter()
            .map(|m| ("books".to_string(), m))
            .collect();
        bookshelf_db::run_migrations(&pool, &migrations).await.unwrap();
        SqlBookRepository::new(pool)
    }

    fn book(isbn: &str, title: &str) -> Book {
        Book {
            isbn: isbn.to_string(),
            amazon_url: "https://amazon.com/taco".to_string(),
            author: "Elie".to_string(),
            language: "English".to_string(),
            pages: 100,
            publisher: "Nothing publishers".to_string(),
            title: title.to_string(),
            year: 2008,
        }
    }

    #[tokio::test]
    async fn create_then_get_returns_equal_record() {
        let repo = repository().await;
        let stored = repo.create(&book("123432122", "my first book")).await.unwrap();
        assert_eq!(stored, book("123432122", "my first book"));
        assert_eq!(repo.get_by_isbn("123432122").await.unwrap(), stored);
    }

    #[tokio::test]
    async fn duplicate_isbn_is_a_conflict() {
        let repo = repository().await;
        repo.create(&book("123432122", "my first book")).await.unwrap();

        let err = repo
            .create(&book("123432122", "another title"))
            .await
            .unwrap_err();
        assert!(matches!(err, BookRepositoryError::Conflict(isbn) if isbn == "123432122"));
        assert_eq!(repo.list_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn list_is_ordered_by_title_case_sensitively() {
        let repo = repository().await;
        repo.create(&book("3", "banana")).await.unwrap();
        repo.create(&book("1", "apple")).await.unwrap();
        repo.create(&book("2", "Zebra")).await.unwrap();

        let titles: Vec<String> = repo
            .list_all()
            .await
            .unwrap()
            .into_iter()
            .map(|b| b.title)
            .collect();
        assert_eq!(titles, vec!["Zebra", "apple", "banana"]);
    }

    #[tokio::test]
    async fn missing_book_is_not_found() {
        let repo = repository().await;
        assert!(matches!(
            repo.get_by_isbn("00000").await,
            Err(BookRepositoryError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn update_changes_only_supplied_fields() {
        let repo = repository().await;
        repo.create(&book("123432122", "my first book")).await.unwrap();

        let changes = BookChanges {
            author: Some("Dr. Seuss".to_string()),
            pages: Some(44),
            ..BookChanges::default()
        };
        let updated = repo.update("123432122", &changes).await.unwrap();

        let mut expected = book("123432122", "my first book");
        expected.author = "Dr. Seuss".to_string();
        expected.pages = 44;
        assert_eq!(updated, expected);
        assert_eq!(repo.get_by_isbn("123432122").await.unwrap(), expected);
    }

    #[tokio::test]
    async fn update_of_missing_book_is_not_found() {
        let repo = repository().await;
        let changes = BookChanges {
            title: Some("ghost".to_string()),
            ..BookChanges::default()
        };
        assert!(matches!(
            repo.update("00000", &changes).await,
            Err(BookRepositoryError::NotFound(_))
        ));
        assert!(matches!(
            repo.update("00000", &BookChanges::default()).await,
            Err(BookRepositoryError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn empty_update_returns_current_record() {
        let repo = repository().await;
        let stored = repo.create(&book("123432122", "my first book")).await.unwrap();
        assert_eq!(
            repo.update("123432122", &BookChanges::default()).await.unwrap(),
            stored
        );
    }

    #[tokio::test]
    async fn delete_removes_row_once() {
        let repo = repository().await;
        repo.create(&book("123432122", "my first book")).await.unwrap();
        repo.create(&book("55", "keeper")).await.unwrap();

        repo.delete_by_isbn("123432122").await.unwrap();
        assert!(matches!(
            repo.get_by_isbn("123432122").await,
            Err(BookRepositoryError::NotFound(_))
        ));
        assert!(matches!(
            repo.delete_by_isbn("123432122").await,
            Err(BookRepositoryError::NotFound(_))
        ));
        assert_eq!(repo.list_all().await.unwrap(), vec![book("55", "keeper")]);
    }
}
