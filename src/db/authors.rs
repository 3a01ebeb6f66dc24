use tracing::info;

use crate::db::catalog::{next_id, Catalog};
use crate::error::CatalogError;
use crate::models::{Author, AuthorPatch, Entity};

impl Catalog {
    /// One past the largest author id, or 1 when there are none.
    pub fn next_author_id(&self) -> i64 {
        next_id(&self.authors)
    }

    /// Insert a new author and rewrite the authors resource. Fails when the
    /// id is taken.
    pub fn add_author(&mut self, author: Author) -> Result<(), CatalogError> {
        if self.authors.contains_key(&author.id) {
            return Err(CatalogError::AlreadyExists {
                entity: Entity::Author,
                key: format!("ID {}", author.id),
            });
        }

        info!(id = author.id, name = %author.name, "adding author");
        self.authors.insert(author.id, author);
        self.persist(&self.authors)
    }

    /// Look an author up by id.
    pub fn find_author(&self, id: i64) -> Option<&Author> {
        self.authors.get(&id)
    }

    pub fn authors(&self) -> impl Iterator<Item = &Author> {
        self.authors.values()
    }

    /// Apply a partial update; blank or `Keep` fields retain their value.
    pub fn update_author(&mut self, id: i64, patch: AuthorPatch) -> Result<(), CatalogError> {
        let author = self
            .authors
            .get_mut(&id)
            .ok_or_else(|| CatalogError::not_found(Entity::Author, id))?;

        patch.name.apply_to(&mut author.name);
        patch.nationality.apply_to(&mut author.nationality);

        info!(id, "updated author");
        self.persist(&self.authors)
    }

    /// Authors referenced by any book, returned or not, cannot be deleted.
    pub fn remove_author(&mut self, id: i64) -> Result<Author, CatalogError> {
        if !self.authors.contains_key(&id) {
            return Err(CatalogError::not_found(Entity::Author, id));
        }

        if let Some(book) = self.books.values().find(|book| book.author_id == id) {
            return Err(CatalogError::ReferentialConflict {
                entity: Entity::Author,
                id,
                reason: format!("referenced by book ID {}", book.id),
            });
        }

        let removed = self
            .authors
            .remove(&id)
            .ok_or_else(|| CatalogError::not_found(Entity::Author, id))?;
        info!(id, "removed author");
        self.persist(&self.authors)?;
        Ok(removed)
    }
}
