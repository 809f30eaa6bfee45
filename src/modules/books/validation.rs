//! Request-body validation for books.
//!
//! Bodies are checked as raw JSON so that unknown fields, missing fields and
//! type mismatches are all reported together, field by field, before a typed
//! record exists. No value is coerced: `"44"` is not a page count.

use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

use super::models::{Book, BookChanges};

/// Field names accepted on create, in column order.
pub const BOOK_FIELDS: [&str; 8] = [
    "isbn",
    "amazon_url",
    "author",
    "language",
    "pages",
    "publisher",
    "title",
    "year",
];

/// One problem with one field. `field` is `$root` for problems with the body itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    #[serde(rename = "error")]
    pub message: String,
}

impl FieldError {
    pub fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

/// Every field error found in a body, sorted by field name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{} invalid field(s)", .0.len())]
pub struct ValidationErrors(pub Vec<FieldError>);

impl ValidationErrors {
    pub fn errors(&self) -> &[FieldError] {
        &self.0
    }
}

/// Values pulled out of the body; a field is `None` when absent or invalid.
#[derive(Default)]
struct Parsed {
    isbn: Option<String>,
    amazon_url: Option<String>,
    author: Option<String>,
    language: Option<String>,
    pages: Option<i32>,
    publisher: Option<String>,
    title: Option<String>,
    year: Option<i32>,
}

/// Validate a create body: every field required, nothing else allowed.
pub fn validate_create(input: &Value) -> Result<Book, ValidationErrors> {
    let object = object(input)?;
    let (parsed, mut errors) = parse(object);
    missing(object, &mut errors);

    match parsed {
        Parsed {
            isbn: Some(isbn),
            amazon_url: Some(amazon_url),
            author: Some(author),
            language: Some(language),
            pages: Some(pages),
            publisher: Some(publisher),
            title: Some(title),
            year: Some(year),
        } if errors.is_empty() => Ok(Book {
            isbn,
            amazon_url,
            author,
            language,
            pages,
            publisher,
            title,
            year,
        }),
        // every absent or invalid field left an entry in `errors`
        _ => Err(sorted(errors)),
    }
}

/// Validate an update body: nothing required, unknown fields rejected.
///
/// An `isbn` in the body is type-checked but never applied.
pub fn validate_update(input: &Value) -> Result<BookChanges, ValidationErrors> {
    let (parsed, errors) = parse(object(input)?);
    if !errors.is_empty() {
        return Err(sorted(errors));
    }

    Ok(BookChanges {
        amazon_url: parsed.amazon_url,
        author: parsed.author,
        language: parsed.language,
        pages: parsed.pages,
        publisher: parsed.publisher,
        title: parsed.title,
        year: parsed.year,
    })
}

fn object(input: &Value) -> Result<&Map<String, Value>, ValidationErrors> {
    input.as_object().ok_or_else(|| {
        ValidationErrors(vec![FieldError::new(
            "$root",
            format!("must be a JSON object, got {}", json_type_name(input)),
        )])
    })
}

fn parse(object: &Map<String, Value>) -> (Parsed, Vec<FieldError>) {
    let mut errors = Vec::new();
    let mut parsed = Parsed::default();

    for (key, value) in object {
        match key.as_str() {
            "isbn" => parsed.isbn = text(key, value, &mut errors),
            "amazon_url" => parsed.amazon_url = text(key, value, &mut errors),
            "author" => parsed.author = text(key, value, &mut errors),
            "language" => parsed.language = text(key, value, &mut errors),
            "publisher" => parsed.publisher = text(key, value, &mut errors),
            "title" => parsed.title = text(key, value, &mut errors),
            "pages" => parsed.pages = integer(key, value, 0, &mut errors),
            "year" => parsed.year = integer(key, value, i32::MIN, &mut errors),
            _ => errors.push(FieldError::new(key, "is not allowed")),
        }
    }

    (parsed, errors)
}

fn sorted(mut errors: Vec<FieldError>) -> ValidationErrors {
    errors.sort_by(|a, b| a.field.cmp(&b.field));
    ValidationErrors(errors)
}

fn missing(object: &Map<String, Value>, errors: &mut Vec<FieldError>) {
    for field in BOOK_FIELDS {
        if !object.contains_key(field) {
            errors.push(FieldError::new(field, "is required"));
        }
    }
}

fn text(field: &str, value: &Value, errors: &mut Vec<FieldError>) -> Option<String> {
    match value {
        Value::String(s) if s.is_empty() => {
            errors.push(FieldError::new(field, "must not be empty"));
            None
        }
        Value::String(s) => Some(s.clone()),
        other => {
            errors.push(FieldError::new(
                field,
                format!("must be a string, got {}", json_type_name(other)),
            ));
            None
        }
    }
}

fn integer(field: &str, value: &Value, min: i32, errors: &mut Vec<FieldError>) -> Option<i32> {
    let in_range = match value {
        Value::Number(n) if n.is_i64() => n
            .as_i64()
            .and_then(|n| i32::try_from(n).ok())
            .filter(|n| *n >= min),
        // integers above i64::MAX
        Value::Number(n) if n.is_u64() => None,
        Value::Number(_) => {
            errors.push(FieldError::new(field, "must be an integer"));
            return None;
        }
        other => {
            errors.push(FieldError::new(
                field,
                format!("must be an integer, got {}", json_type_name(other)),
            ));
            return None;
        }
    };

    if in_range.is_none() {
        errors.push(FieldError::new(
            field,
            format!("must be between {} and {}", min, i32::MAX),
        ));
    }
    in_range
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    impl ValidationErrors {
        fn has_field(&self, field: &str) -> bool {
            self.0.iter().any(|e| e.field == field)
        }
    }

    fn sample() -> Value {
        json!({
            "isbn": "8761161518",
            "amazon_url": "http://a.co/eobPtX2",
            "author": "Dr. Seuss",
            "language": "english",
            "pages": 44,
            "publisher": "Princeton University Press",
            "title": "The Cat in the Hat",
            "year": 1980
        })
    }

    #[test]
    fn create_accepts_complete_record() {
        let book = validate_create(&sample()).unwrap();
        assert_eq!(book.isbn, "8761161518");
        assert_eq!(book.pages, 44);
        assert_eq!(book.year, 1980);
        assert_eq!(book.title, "The Cat in the Hat");
    }

    #[test]
    fn create_requires_isbn() {
        let mut body = sample();
        body.as_object_mut().unwrap().remove("isbn");

        let err = validate_create(&body).unwrap_err();
        assert_eq!(err.errors(), &[FieldError::new("isbn", "is required")]);
    }

    #[test]
    fn create_reports_every_missing_field() {
        let err = validate_create(&json!({})).unwrap_err();
        let fields: Vec<&str> = err.errors().iter().map(|e| e.field.as_str()).collect();
        let mut expected = BOOK_FIELDS.to_vec();
        expected.sort();
        assert_eq!(fields, expected);
    }

    #[test]
    fn create_rejects_unknown_fields() {
        let mut body = sample();
        body["rating"] = json!(5);

        let err = validate_create(&body).unwrap_err();
        assert_eq!(err.errors(), &[FieldError::new("rating", "is not allowed")]);
    }

    #[test]
    fn create_rejects_wrong_types_without_coercion() {
        let mut body = sample();
        body["pages"] = json!("44");
        body["year"] = json!(1980.5);
        body["author"] = json!(null);

        let err = validate_create(&body).unwrap_err();
        assert!(err.has_field("pages"));
        assert!(err.has_field("year"));
        assert!(err.has_field("author"));
        assert_eq!(err.errors().len(), 3);
    }

    #[test]
    fn create_rejects_empty_strings_and_negative_pages() {
        let mut body = sample();
        body["title"] = json!("");
        body["pages"] = json!(-1);

        let err = validate_create(&body).unwrap_err();
        assert_eq!(
            err.errors(),
            &[
                FieldError::new("pages", format!("must be between 0 and {}", i32::MAX)),
                FieldError::new("title", "must not be empty"),
            ]
        );
    }

    #[test]
    fn create_accepts_zero_pages_and_negative_year() {
        let mut body = sample();
        body["pages"] = json!(0);
        body["year"] = json!(-300);

        let book = validate_create(&body).unwrap();
        assert_eq!(book.pages, 0);
        assert_eq!(book.year, -300);
    }

    #[test]
    fn integers_beyond_i32_are_rejected() {
        let mut body = sample();
        body["year"] = json!(i64::from(i32::MAX) + 1);
        assert!(validate_create(&body).unwrap_err().has_field("year"));
    }

    #[test]
    fn integers_beyond_i64_report_the_range() {
        let err = validate_update(&json!({ "pages": u64::MAX, "year": i64::MIN })).unwrap_err();
        assert_eq!(
            err.errors(),
            &[
                FieldError::new("pages", format!("must be between 0 and {}", i32::MAX)),
                FieldError::new(
                    "year",
                    format!("must be between {} and {}", i32::MIN, i32::MAX)
                ),
            ]
        );

        let err = validate_update(&json!({ "pages": 4.0 })).unwrap_err();
        assert_eq!(err.errors(), &[FieldError::new("pages", "must be an integer")]);
    }

    #[test]
    fn non_object_bodies_are_rejected() {
        for body in [json!([]), json!("book"), json!(null), json!(7)] {
            let err = validate_create(&body).unwrap_err();
            assert!(err.has_field("$root"));
            let err = validate_update(&body).unwrap_err();
            assert!(err.has_field("$root"));
        }
    }

    #[test]
    fn update_accepts_partial_body() {
        let changes = validate_update(&json!({
            "amazon_url": "http://a.co/eobPtX2",
            "author": "Dr. Seuss",
            "language": "english",
            "pages": 44
        }))
        .unwrap();

        assert_eq!(
            changes,
            BookChanges {
                amazon_url: Some("http://a.co/eobPtX2".to_string()),
                author: Some("Dr. Seuss".to_string()),
                language: Some("english".to_string()),
                pages: Some(44),
                ..BookChanges::default()
            }
        );
    }

    #[test]
    fn update_with_empty_body_is_empty_change() {
        assert!(validate_update(&json!({})).unwrap().is_empty());
    }

    #[test]
    fn update_rejects_unknown_field() {
        let err = validate_update(&json!({
            "amazon_url": "http://a.co/eobPtX2",
            "bad_field": "bogus",
            "language": "english",
            "pages": 44,
            "publisher": "Princeton University Press",
            "title": "The Cat in the Hat",
            "year": 1980
        }))
        .unwrap_err();

        assert_eq!(err.errors(), &[FieldError::new("bad_field", "is not allowed")]);
    }

    #[test]
    fn update_ignores_but_checks_isbn() {
        let changes = validate_update(&json!({"isbn": "999", "author": "Elie"})).unwrap();
        assert_eq!(changes.author.as_deref(), Some("Elie"));

        let err = validate_update(&json!({"isbn": 999})).unwrap_err();
        assert!(err.has_field("isbn"));
    }

    #[test]
    fn update_applies_same_type_rules() {
        let err = validate_update(&json!({"pages": -5, "title": 3})).unwrap_err();
        assert!(err.has_field("pages"));
        assert!(err.has_field("title"));
    }

    #[test]
    fn errors_serialize_as_field_and_error() {
        let value = serde_json::to_value(FieldError::new("pages", "is required")).unwrap();
        assert_eq!(value, json!({"field": "pages", "error": "is required"}));
    }
}
