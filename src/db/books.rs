use tracing::{info, warn};

use crate::db::catalog::{next_id, Catalog, UNKNOWN};
use crate::error::CatalogError;
use crate::models::{Book, BookPatch, Entity, Patch};

/// A book resolved against its author and publisher for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookListing<'a> {
    pub book: &'a Book,
    pub author: &'a str,
    pub publisher: &'a str,
}

/// Result of a book edit. Rejected fields kept their old value; every other
/// field in the patch was applied.
#[derive(Debug, Default)]
pub struct UpdateOutcome {
    pub rejected: Vec<CatalogError>,
}

impl UpdateOutcome {
    pub fn is_clean(&self) -> bool {
        self.rejected.is_empty()
    }
}

impl Catalog {
    /// One past the largest book id, or 1 when there are none.
    pub fn next_book_id(&self) -> i64 {
        next_id(&self.books)
    }

    /// Insert a book. Rejects a used id or ISBN, a year outside the accepted
    /// range, and an author or publisher that does not exist.
    pub fn add_book(&mut self, book: Book) -> Result<(), CatalogError> {
        if self.books.contains_key(&book.id) {
            return Err(CatalogError::AlreadyExists {
                entity: Entity::Book,
                key: format!("ID {}", book.id),
            });
        }
        if let Some(existing) = self.book_with_isbn(&book.isbn) {
            return Err(CatalogError::AlreadyExists {
                entity: Entity::Book,
                key: format!("ISBN {} (book ID {})", book.isbn, existing.id),
            });
        }
        check_year(book.year)?;
        self.check_author(book.author_id)?;
        self.check_publisher(book.publisher_id)?;

        info!(id = book.id, isbn = %book.isbn, "adding book");
        self.books.insert(book.id, book);
        self.persist(&self.books)
    }

    /// Look a book up by id.
    pub fn find_book(&self, id: i64) -> Option<&Book> {
        self.books.get(&id)
    }

    pub fn books(&self) -> impl Iterator<Item = &Book> {
        self.books.values()
    }

    /// The book that already owns `isbn`, if any.
    pub fn book_with_isbn(&self, isbn: &str) -> Option<&Book> {
        self.books.values().find(|book| book.isbn == isbn)
    }

    /// Every book with its author and publisher names resolved.
    pub fn list_books(&self) -> Vec<BookListing<'_>> {
        self.books
            .values()
            .map(|book| BookListing {
                book,
                author: self
                    .authors
                    .get(&book.author_id)
                    .map_or(UNKNOWN, |author| author.name.as_str()),
                publisher: self
                    .publishers
                    .get(&book.publisher_id)
                    .map_or(UNKNOWN, |publisher| publisher.name.as_str()),
            })
            .collect()
    }

    /// Edit a book field by field. A new ISBN that belongs to another book, a
    /// year out of range, or an unknown author/publisher is reported in the
    /// outcome and leaves that field untouched; the rest of the patch still
    /// applies and the books resource is rewritten.
    pub fn update_book(
        &mut self,
        id: i64,
        patch: BookPatch,
    ) -> Result<UpdateOutcome, CatalogError> {
        if !self.books.contains_key(&id) {
            return Err(CatalogError::not_found(Entity::Book, id));
        }

        let mut outcome = UpdateOutcome::default();

        let isbn = match patch.isbn {
            Patch::Set(isbn) if !isbn.trim().is_empty() => match self
                .books
                .values()
                .find(|other| other.id != id && other.isbn == isbn)
            {
                Some(other) => {
                    outcome.rejected.push(CatalogError::AlreadyExists {
                        entity: Entity::Book,
                        key: format!("ISBN {isbn} (book ID {})", other.id),
                    });
                    None
                }
                None => Some(isbn),
            },
            _ => None,
        };

        let year = match patch.year {
            Patch::Set(year) => check_year(year)
                .map(|()| year)
                .map_err(|err| outcome.rejected.push(err))
                .ok(),
            Patch::Keep => None,
        };

        let author_id = match patch.author_id {
            Patch::Set(author_id) => self
                .check_author(author_id)
                .map(|()| author_id)
                .map_err(|err| outcome.rejected.push(err))
                .ok(),
            Patch::Keep => None,
        };

        let publisher_id = match patch.publisher_id {
            Patch::Set(publisher_id) => self
                .check_publisher(publisher_id)
                .map(|()| publisher_id)
                .map_err(|err| outcome.rejected.push(err))
                .ok(),
            Patch::Keep => None,
        };

        let book = self
            .books
            .get_mut(&id)
            .ok_or_else(|| CatalogError::not_found(Entity::Book, id))?;
        patch.title.apply_to(&mut book.title);
        if let Some(isbn) = isbn {
            book.isbn = isbn;
        }
        if let Some(year) = year {
            book.year = year;
        }
        if let Some(author_id) = author_id {
            book.author_id = author_id;
        }
        if let Some(publisher_id) = publisher_id {
            book.publisher_id = publisher_id;
        }

        for rejection in &outcome.rejected {
            warn!(id, "book field kept: {rejection}");
        }
        info!(id, rejected = outcome.rejected.len(), "updated book");
        self.persist(&self.books)?;
        Ok(outcome)
    }

    /// Delete a book unless it is currently on loan. Returned loans keep
    /// pointing at the removed id and render as unknown.
    pub fn remove_book(&mut self, id: i64) -> Result<Book, CatalogError> {
        if !self.books.contains_key(&id) {
            return Err(CatalogError::not_found(Entity::Book, id));
        }

        if let Some(loan) = self.active_loan_for_book(id) {
            return Err(CatalogError::ReferentialConflict {
                entity: Entity::Book,
                id,
                reason: format!("book has an active loan (loan ID {})", loan.id),
            });
        }

        let removed = self
            .books
            .remove(&id)
            .ok_or_else(|| CatalogError::not_found(Entity::Book, id))?;
        info!(id, "removed book");
        self.persist(&self.books)?;
        Ok(removed)
    }

    fn check_author(&self, author_id: i64) -> Result<(), CatalogError> {
        if self.authors.contains_key(&author_id) {
            Ok(())
        } else {
            Err(CatalogError::not_found(Entity::Author, author_id))
        }
    }

    fn check_publisher(&self, publisher_id: i64) -> Result<(), CatalogError> {
        if self.publishers.contains_key(&publisher_id) {
            Ok(())
        } else {
            Err(CatalogError::not_found(Entity::Publisher, publisher_id))
        }
    }
}

fn check_year(year: i32) -> Result<(), CatalogError> {
    if (Book::MIN_YEAR..=Book::MAX_YEAR).contains(&year) {
        Ok(())
    } else {
        Err(CatalogError::InvalidRange {
            field: "Year",
            value: i64::from(year),
            min: i64::from(Book::MIN_YEAR),
            max: i64::from(Book::MAX_YEAR),
        })
    }
}
