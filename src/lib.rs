//! Core library surface for the school library catalog.
//!
//! The `bin` target wires these pieces together; integration tests drive the
//! [`Catalog`] directly against a temporary data directory.
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod models;
pub mod ui;

/// The in-memory catalog and the directory-backed store it persists to.
pub use db::{Catalog, LoadReport, Storage};

pub use config::Config;
pub use error::CatalogError;

/// Domain records and the partial-update types that modify them.
pub use models::{
    Author, AuthorPatch, Book, BookPatch, Entity, Loan, LoanStatus, Patch, Publisher,
    PublisherPatch, Student, StudentPatch,
};

/// The interactive application entry point and state container.
pub use ui::{run_app, App};
