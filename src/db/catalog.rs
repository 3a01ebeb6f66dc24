//! The catalog container: five id-keyed collections, whole-catalog load and
//! save, and the id allocator shared by the per-entity modules.

use std::collections::BTreeMap;

use tracing::{error, info, warn};

use crate::db::codec::Record;
use crate::db::storage::{StagedWrite, Storage};
use crate::error::CatalogError;
use crate::models::{Author, Book, Entity, Loan, Publisher, Student};

/// In-memory owner of every collection. Each map is keyed by record id, which
/// gives stable lookups across mutations. Listings come out in ascending id
/// order. That equals insertion order for records created through `next_*_id`;
/// records added with an explicit lower id, or read from a file written out of
/// order, are listed by id.
///
/// The CRUD operations for each entity live in the sibling modules
/// (`students`, `authors`, ...). Every successful mutation rewrites exactly the
/// one resource it touched.
#[derive(Debug)]
pub struct Catalog {
    storage: Storage,
    pub(super) students: BTreeMap<i64, Student>,
    pub(super) authors: BTreeMap<i64, Author>,
    pub(super) publishers: BTreeMap<i64, Publisher>,
    pub(super) books: BTreeMap<i64, Book>,
    pub(super) loans: BTreeMap<i64, Loan>,
}

/// Outcome of loading one resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadSummary {
    pub entity: Entity,
    pub loaded: usize,
    pub skipped: usize,
}

/// Per-entity summaries from [`Catalog::load_all`], in load order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub entries: Vec<LoadSummary>,
}

impl LoadReport {
    pub fn total_loaded(&self) -> usize {
        self.entries.iter().map(|entry| entry.loaded).sum()
    }

    pub fn total_skipped(&self) -> usize {
        self.entries.iter().map(|entry| entry.skipped).sum()
    }

    pub fn get(&self, entity: Entity) -> Option<&LoadSummary> {
        self.entries.iter().find(|entry| entry.entity == entity)
    }
}

impl Catalog {
    /// Create an empty catalog backed by `storage`. Nothing is read until
    /// [`Catalog::load_all`] runs.
    pub fn new(storage: Storage) -> Self {
        Self {
            storage,
            students: BTreeMap::new(),
            authors: BTreeMap::new(),
            publishers: BTreeMap::new(),
            books: BTreeMap::new(),
            loans: BTreeMap::new(),
        }
    }

    /// Convenience for startup: build the catalog and load every resource.
    pub fn open(storage: Storage) -> Result<(Self, LoadReport), CatalogError> {
        let mut catalog = Self::new(storage);
        let report = catalog.load_all()?;
        Ok((catalog, report))
    }

    /// Where this catalog reads and writes its resources.
    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    /// Replace the in-memory state with the contents of the five resources,
    /// read in the fixed entity order. Nothing is replaced unless every
    /// resource could be read.
    pub fn load_all(&mut self) -> Result<LoadReport, CatalogError> {
        let mut report = LoadReport::default();

        let students = load_map::<Student>(&self.storage, &mut report)?;
        let authors = load_map::<Author>(&self.storage, &mut report)?;
        let publishers = load_map::<Publisher>(&self.storage, &mut report)?;
        let books = load_map::<Book>(&self.storage, &mut report)?;
        let loans = load_map::<Loan>(&self.storage, &mut report)?;

        self.students = students;
        self.authors = authors;
        self.publishers = publishers;
        self.books = books;
        self.loans = loans;

        info!(
            loaded = report.total_loaded(),
            skipped = report.total_skipped(),
            dir = %self.storage.dir().display(),
            "catalog loaded"
        );
        Ok(report)
    }

    /// Rewrite all five resources. Every resource is staged before any is
    /// replaced, so a write failure leaves the files on disk untouched.
    pub fn save_all(&self) -> Result<(), CatalogError> {
        let mut staged = Vec::with_capacity(Entity::ALL.len());

        let results = [
            self.storage.stage(self.students.values()),
            self.storage.stage(self.authors.values()),
            self.storage.stage(self.publishers.values()),
            self.storage.stage(self.books.values()),
            self.storage.stage(self.loans.values()),
        ];

        let mut failure = None;
        for result in results {
            match result {
                Ok(write) => staged.push(write),
                Err(err) if failure.is_none() => failure = Some(err),
                Err(_) => {}
            }
        }

        if let Some(err) = failure {
            error!("save aborted, no resource was replaced: {err}");
            staged.into_iter().for_each(StagedWrite::discard);
            return Err(err);
        }

        for write in staged {
            write.commit().inspect_err(|err| error!("failed to replace resource: {err}"))?;
        }

        info!(dir = %self.storage.dir().display(), "catalog saved");
        Ok(())
    }

    pub(super) fn persist<R: Record>(
        &self,
        records: &BTreeMap<i64, R>,
    ) -> Result<(), CatalogError> {
        self.storage
            .save(records.values())
            .inspect_err(|err| error!(entity = %R::ENTITY, "failed to save: {err}"))
    }

    /// Record count per entity, in tab order.
    pub fn counts(&self) -> [(Entity, usize); 5] {
        [
            (Entity::Student, self.students.len()),
            (Entity::Author, self.authors.len()),
            (Entity::Publisher, self.publishers.len()),
            (Entity::Book, self.books.len()),
            (Entity::Loan, self.loans.len()),
        ]
    }
}

/// Next free id: one past the largest key, or 1 for an empty collection.
pub(super) fn next_id<R>(records: &BTreeMap<i64, R>) -> i64 {
    records
        .keys()
        .next_back()
        .map_or(1, |max| max.saturating_add(1))
}

/// Name shown for a dangling reference.
pub const UNKNOWN: &str = "Unknown";

fn load_map<R: Record>(
    storage: &Storage,
    report: &mut LoadReport,
) -> Result<BTreeMap<i64, R>, CatalogError> {
    let loaded = storage.load::<R>()?;
    let mut skipped = loaded.skipped;
    let mut records = BTreeMap::new();

    for record in loaded.records {
        let id = record.id();
        if records.contains_key(&id) {
            skipped += 1;
            warn!(entity = %R::ENTITY, id, "skipping record with duplicate id");
            continue;
        }
        records.insert(id, record);
    }

    report.entries.push(LoadSummary {
        entity: R::ENTITY,
        loaded: records.len(),
        skipped,
    });
    Ok(records)
}
