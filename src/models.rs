//! Domain models for the library catalog. These are plain data holders that
//! mirror one line of their backing text resource each; the store in
//! [`crate::db`] owns every instance and is the only place that mutates them.
//! The patch types at the bottom describe partial updates so the "leave blank
//! to keep the current value" rule is expressed in types rather than in
//! string checks scattered across the UI.

use std::fmt;

/// The five record kinds the catalog tracks. Used to name resources, label
/// errors, and drive the tabbed UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Entity {
    Student,
    Author,
    Publisher,
    Book,
    Loan,
}

impl Entity {
    /// Fixed load/save order. Books and loans come last because they refer to
    /// the entities loaded before them.
    pub const ALL: [Entity; 5] = [
        Entity::Student,
        Entity::Author,
        Entity::Publisher,
        Entity::Book,
        Entity::Loan,
    ];

    /// File name of the resource backing this entity inside the data dir.
    pub fn file_name(self) -> &'static str {
        match self {
            Entity::Student => "students.txt",
            Entity::Author => "authors.txt",
            Entity::Publisher => "publishers.txt",
            Entity::Book => "books.txt",
            Entity::Loan => "loans.txt",
        }
    }

    pub fn plural(self) -> &'static str {
        match self {
            Entity::Student => "Students",
            Entity::Author => "Authors",
            Entity::Publisher => "Publishers",
            Entity::Book => "Books",
            Entity::Loan => "Loans",
        }
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Entity::Student => "Student",
            Entity::Author => "Author",
            Entity::Publisher => "Publisher",
            Entity::Book => "Book",
            Entity::Loan => "Loan",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// A registered borrower.
pub struct Student {
    pub id: i64,
    pub name: String,
    /// Free-form academic level ("1st year", "Masters", ...).
    pub grade: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Author {
    pub id: i64,
    pub name: String,
    pub nationality: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Publisher {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// A catalogued title. `isbn` is unique across the whole catalog and both
/// foreign keys must resolve whenever the book is added or edited.
pub struct Book {
    pub id: i64,
    pub title: String,
    pub isbn: String,
    /// Publication year, bounded by [`Book::MIN_YEAR`] and [`Book::MAX_YEAR`].
    pub year: i32,
    pub author_id: i64,
    pub publisher_id: i64,
}

impl Book {
    pub const MIN_YEAR: i32 = 0;
    pub const MAX_YEAR: i32 = 2025;
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// One lending of a book to a student. Dates are kept as `YYYY-MM-DD` text,
/// exactly as they are persisted; an empty `return_date` means the book is
/// still out.
pub struct Loan {
    pub id: i64,
    pub book_id: i64,
    pub student_id: i64,
    pub loan_date: String,
    pub return_date: String,
}

/// Persisted states of a loan. The transient "requested" step only exists
/// while `borrow` validates its inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoanStatus<'a> {
    Active,
    Returned(&'a str),
}

impl Loan {
    pub fn is_active(&self) -> bool {
        self.return_date.is_empty()
    }

    pub fn status(&self) -> LoanStatus<'_> {
        if self.is_active() {
            LoanStatus::Active
        } else {
            LoanStatus::Returned(&self.return_date)
        }
    }
}

impl fmt::Display for LoanStatus<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoanStatus::Active => f.write_str("(Pending)"),
            LoanStatus::Returned(date) => f.write_str(date),
        }
    }
}

/// A single field of a partial update: either leave the stored value alone or
/// replace it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Patch<T> {
    #[default]
    Keep,
    Set(T),
}

impl Patch<String> {
    /// Build a text patch from raw input, where blank input means "keep".
    pub fn text(input: &str) -> Self {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            Patch::Keep
        } else {
            Patch::Set(trimmed.to_string())
        }
    }

    /// Overwrite `target` when the patch carries a value that is not blank.
    pub(crate) fn apply_to(self, target: &mut String) {
        if let Patch::Set(value) = self {
            if !value.trim().is_empty() {
                *target = value;
            }
        }
    }
}

impl<T> Patch<T> {
    pub fn is_keep(&self) -> bool {
        matches!(self, Patch::Keep)
    }
}

impl<T> From<Option<T>> for Patch<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(value) => Patch::Set(value),
            None => Patch::Keep,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StudentPatch {
    pub name: Patch<String>,
    pub grade: Patch<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthorPatch {
    pub name: Patch<String>,
    pub nationality: Patch<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublisherPatch {
    pub name: Patch<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
/// Book edits are validated field by field; see `Catalog::update_book`.
pub struct BookPatch {
    pub title: Patch<String>,
    pub isbn: Patch<String>,
    pub year: Patch<i32>,
    pub author_id: Patch<i64>,
    pub publisher_id: Patch<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_patch_values_keep_the_stored_text() {
        let mut name = "Ana Lopez".to_string();
        Patch::Set("   ".to_string()).apply_to(&mut name);
        Patch::Set(String::new()).apply_to(&mut name);
        Patch::Keep.apply_to(&mut name);
        assert_eq!(name, "Ana Lopez");

        Patch::Set("Ana María Lopez".to_string()).apply_to(&mut name);
        assert_eq!(name, "Ana María Lopez");
    }

    #[test]
    fn text_patches_trim_their_input() {
        assert_eq!(Patch::text("  Second "), Patch::Set("Second".to_string()));
        assert!(Patch::text(" \t ").is_keep());
    }
}
