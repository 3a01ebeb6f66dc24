//! Line codec for the comma-delimited resource files.
//!
//! Fields that contain the delimiter, a double quote, a pipe, or a line break
//! are wrapped in double quotes with any embedded quote doubled. Everything
//! else is written verbatim, so plain legacy files stay readable. Decoding
//! keeps empty fields, including a trailing one, which is how a pending loan's
//! blank return date is stored.

use std::mem;

use thiserror::Error;

use crate::models::{Author, Book, Entity, Loan, Publisher, Student};

/// Separator between fields on a line.
pub const DELIMITER: char = ',';

const QUOTE: char = '"';

/// Why a persisted line could not be turned into a record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("expected at least {expected} fields, found {found}")]
    TooFewFields { expected: usize, found: usize },
    #[error("field `{field}` is not a number: '{value}'")]
    InvalidNumber { field: &'static str, value: String },
    #[error("line is not valid UTF-8")]
    InvalidUtf8,
}

/// Quote a single field if it would otherwise be ambiguous on reload.
pub fn encode_field(value: &str) -> String {
    let needs_quotes = value
        .chars()
        .any(|ch| ch == DELIMITER || ch == QUOTE || ch == '|' || ch == '\n' || ch == '\r');
    if !needs_quotes {
        return value.to_string();
    }

    let mut encoded = String::with_capacity(value.len() + 2);
    encoded.push(QUOTE);
    for ch in value.chars() {
        if ch == QUOTE {
            encoded.push(QUOTE);
        }
        encoded.push(ch);
    }
    encoded.push(QUOTE);
    encoded
}

/// Join already-stringified fields into one line (without the newline).
pub fn encode_line<S: AsRef<str>>(fields: &[S]) -> String {
    let mut line = String::new();
    for (idx, field) in fields.iter().enumerate() {
        if idx > 0 {
            line.push(DELIMITER);
        }
        line.push_str(&encode_field(field.as_ref()));
    }
    line
}

/// Split a line into its decoded fields. A quote opens or closes a quoted
/// section; inside one the delimiter is literal and `""` stands for `"`.
pub fn decode_line(line: &str, delimiter: char) -> Vec<String> {
    let mut fields = Vec::new();
    let mut token = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == QUOTE {
            if in_quotes && chars.peek() == Some(&QUOTE) {
                chars.next();
                token.push(QUOTE);
            } else {
                in_quotes = !in_quotes;
            }
        } else if ch == delimiter && !in_quotes {
            fields.push(mem::take(&mut token));
        } else {
            token.push(ch);
        }
    }
    fields.push(token);

    fields
}

/// True when `text` ends inside a quoted field, i.e. the record continues on
/// the next physical line. A doubled quote counts twice, so parity is enough.
pub fn quotes_open(text: &str) -> bool {
    text.chars().filter(|&ch| ch == QUOTE).count() % 2 == 1
}

/// A record that can be stored as one delimited line.
pub trait Record: Sized {
    const ENTITY: Entity;
    /// Fewest fields a line may carry and still decode.
    const MIN_FIELDS: usize;

    fn id(&self) -> i64;
    fn to_fields(&self) -> Vec<String>;
    /// Build a record from decoded fields. Callers guarantee
    /// `fields.len() >= MIN_FIELDS`.
    fn from_fields(fields: &[String]) -> Result<Self, DecodeError>;

    fn encode(&self) -> String {
        encode_line(&self.to_fields())
    }

    fn decode(line: &str) -> Result<Self, DecodeError> {
        let fields = decode_line(line, DELIMITER);
        if fields.len() < Self::MIN_FIELDS {
            return Err(DecodeError::TooFewFields {
                expected: Self::MIN_FIELDS,
                found: fields.len(),
            });
        }
        Self::from_fields(&fields)
    }
}

fn text(fields: &[String], idx: usize) -> String {
    fields.get(idx).cloned().unwrap_or_default()
}

fn number<T: std::str::FromStr>(
    fields: &[String],
    idx: usize,
    field: &'static str,
) -> Result<T, DecodeError> {
    let raw = fields.get(idx).map(String::as_str).unwrap_or_default();
    raw.trim().parse().map_err(|_| DecodeError::InvalidNumber {
        field,
        value: raw.to_string(),
    })
}

impl Record for Student {
    const ENTITY: Entity = Entity::Student;
    const MIN_FIELDS: usize = 3;

    fn id(&self) -> i64 {
        self.id
    }

    fn to_fields(&self) -> Vec<String> {
        vec![self.id.to_string(), self.name.clone(), self.grade.clone()]
    }

    fn from_fields(fields: &[String]) -> Result<Self, DecodeError> {
        Ok(Student {
            id: number(fields, 0, "id")?,
            name: text(fields, 1),
            grade: text(fields, 2),
        })
    }
}

impl Record for Author {
    const ENTITY: Entity = Entity::Author;
    const MIN_FIELDS: usize = 3;

    fn id(&self) -> i64 {
        self.id
    }

    fn to_fields(&self) -> Vec<String> {
        vec![
            self.id.to_string(),
            self.name.clone(),
            self.nationality.clone(),
        ]
    }

    fn from_fields(fields: &[String]) -> Result<Self, DecodeError> {
        Ok(Author {
            id: number(fields, 0, "id")?,
            name: text(fields, 1),
            nationality: text(fields, 2),
        })
    }
}

impl Record for Publisher {
    const ENTITY: Entity = Entity::Publisher;
    const MIN_FIELDS: usize = 2;

    fn id(&self) -> i64 {
        self.id
    }

    fn to_fields(&self) -> Vec<String> {
        vec![self.id.to_string(), self.name.clone()]
    }

    fn from_fields(fields: &[String]) -> Result<Self, DecodeError> {
        Ok(Publisher {
            id: number(fields, 0, "id")?,
            name: text(fields, 1),
        })
    }
}

impl Record for Book {
    const ENTITY: Entity = Entity::Book;
    const MIN_FIELDS: usize = 6;

    fn id(&self) -> i64 {
        self.id
    }

    fn to_fields(&self) -> Vec<String> {
        vec![
            self.id.to_string(),
            self.title.clone(),
            self.isbn.clone(),
            self.year.to_string(),
            self.author_id.to_string(),
            self.publisher_id.to_string(),
        ]
    }

    fn from_fields(fields: &[String]) -> Result<Self, DecodeError> {
        Ok(Book {
            id: number(fields, 0, "id")?,
            title: text(fields, 1),
            isbn: text(fields, 2),
            year: number(fields, 3, "year")?,
            author_id: number(fields, 4, "author_id")?,
            publisher_id: number(fields, 5, "publisher_id")?,
        })
    }
}

impl Record for Loan {
    const ENTITY: Entity = Entity::Loan;
    // Older files dropped the trailing empty return date of pending loans.
    const MIN_FIELDS: usize = 4;

    fn id(&self) -> i64 {
        self.id
    }

    fn to_fields(&self) -> Vec<String> {
        vec![
            self.id.to_string(),
            self.book_id.to_string(),
            self.student_id.to_string(),
            self.loan_date.clone(),
            self.return_date.clone(),
        ]
    }

    fn from_fields(fields: &[String]) -> Result<Self, DecodeError> {
        Ok(Loan {
            id: number(fields, 0, "id")?,
            book_id: number(fields, 1, "book_id")?,
            student_id: number(fields, 2, "student_id")?,
            loan_date: text(fields, 3),
            return_date: text(fields, 4),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_fields_are_written_verbatim() {
        assert_eq!(encode_field("Sudamericana"), "Sudamericana");
        assert_eq!(encode_field(""), "");
        assert_eq!(encode_field("a;b"), "a;b");
    }

    #[test]
    fn fields_with_delimiter_or_pipe_are_quoted() {
        assert_eq!(encode_field("Planeta, S.A."), "\"Planeta, S.A.\"");
        assert_eq!(encode_field("left|right"), "\"left|right\"");
        assert_eq!(encode_field("say \"hi\""), "\"say \"\"hi\"\"\"");
    }

    #[test]
    fn decode_keeps_quoted_delimiters() {
        let fields = decode_line("1,\"Planeta, S.A.\"", DELIMITER);
        assert_eq!(fields, vec!["1", "Planeta, S.A."]);
    }

    #[test]
    fn decode_keeps_empty_trailing_field() {
        let fields = decode_line("3,1,2,2024-01-10,", DELIMITER);
        assert_eq!(fields, vec!["3", "1", "2", "2024-01-10", ""]);
    }

    #[test]
    fn decode_handles_doubled_quotes() {
        let fields = decode_line("7,\"say \"\"hi\"\", ok\",x", DELIMITER);
        assert_eq!(fields, vec!["7", "say \"hi\", ok", "x"]);
    }

    #[test]
    fn semicolons_and_pipes_survive_a_round_trip() {
        let original = vec!["1", "a;b", "c|d", "e,f"];
        let line = encode_line(&original);
        assert_eq!(decode_line(&line, DELIMITER), original);
    }

    #[test]
    fn open_quotes_are_detected_across_line_breaks() {
        assert!(quotes_open("1,\"Line one"));
        assert!(!quotes_open("1,\"Line one\nLine two\""));
        assert!(!quotes_open("7,\"say \"\"hi\"\"\",x"));
        assert!(!quotes_open("1,Ana,First"));
    }

    #[test]
    fn short_line_is_rejected() {
        let err = Book::decode("1,Title,123").unwrap_err();
        assert_eq!(
            err,
            DecodeError::TooFewFields {
                expected: 6,
                found: 3
            }
        );
    }

    #[test]
    fn non_numeric_id_is_rejected() {
        let err = Student::decode("abc,Ana,First").unwrap_err();
        assert!(matches!(err, DecodeError::InvalidNumber { field: "id", .. }));
    }

    #[test]
    fn legacy_pending_loan_without_return_field_decodes() {
        let loan = Loan::decode("4,2,9,2024-03-01").unwrap();
        assert!(loan.is_active());
        assert_eq!(loan.loan_date, "2024-03-01");
    }

    #[test]
    fn book_line_matches_resource_layout() {
        let book = Book {
            id: 1,
            title: "Cien años de soledad".to_string(),
            isbn: "9780307474728".to_string(),
            year: 1967,
            author_id: 1,
            publisher_id: 1,
        };
        assert_eq!(book.encode(), "1,Cien años de soledad,9780307474728,1967,1,1");
        assert_eq!(Book::decode(&book.encode()).unwrap(), book);
    }
}
