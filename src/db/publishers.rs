use tracing::info;

use crate::db::catalog::{next_id, Catalog};
use crate::error::CatalogError;
use crate::models::{Entity, Publisher, PublisherPatch};

impl Catalog {
    /// One past the largest publisher id, or 1 when there are none.
    pub fn next_publisher_id(&self) -> i64 {
        next_id(&self.publishers)
    }

    /// Insert a new publisher and rewrite the publishers resource. Fails
    /// when the id is taken.
    pub fn add_publisher(&mut self, publisher: Publisher) -> Result<(), CatalogError> {
        if self.publishers.contains_key(&publisher.id) {
            return Err(CatalogError::AlreadyExists {
                entity: Entity::Publisher,
                key: format!("ID {}", publisher.id),
            });
        }

        info!(id = publisher.id, name = %publisher.name, "adding publisher");
        self.publishers.insert(publisher.id, publisher);
        self.persist(&self.publishers)
    }

    /// Look a publisher up by id.
    pub fn find_publisher(&self, id: i64) -> Option<&Publisher> {
        self.publishers.get(&id)
    }

    pub fn publishers(&self) -> impl Iterator<Item = &Publisher> {
        self.publishers.values()
    }

    /// Rename a publisher. A blank name keeps the current one.
    pub fn update_publisher(&mut self, id: i64, patch: PublisherPatch) -> Result<(), CatalogError> {
        let publisher = self
            .publishers
            .get_mut(&id)
            .ok_or_else(|| CatalogError::not_found(Entity::Publisher, id))?;

        patch.name.apply_to(&mut publisher.name);

        info!(id, "updated publisher");
        self.persist(&self.publishers)
    }

    /// Delete a publisher unless a book still references it.
    pub fn remove_publisher(&mut self, id: i64) -> Result<Publisher, CatalogError> {
        if !self.publishers.contains_key(&id) {
            return Err(CatalogError::not_found(Entity::Publisher, id));
        }

        if let Some(book) = self.books.values().find(|book| book.publisher_id == id) {
            return Err(CatalogError::ReferentialConflict {
                entity: Entity::Publisher,
                id,
                reason: format!("referenced by book ID {}", book.id),
            });
        }

        let removed = self
            .publishers
            .remove(&id)
            .ok_or_else(|| CatalogError::not_found(Entity::Publisher, id))?;
        info!(id, "removed publisher");
        self.persist(&self.publishers)?;
        Ok(removed)
    }
}
