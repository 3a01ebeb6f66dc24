//! The catalog "database": in-memory collections, their CRUD rules, the loan
//! workflow, and the text files they persist to.

mod authors;
mod books;
mod catalog;
pub mod codec;
mod loans;
mod publishers;
mod storage;
mod students;

pub use books::{BookListing, UpdateOutcome};
pub use catalog::{Catalog, LoadReport, LoadSummary, UNKNOWN};
pub use loans::{is_date_shaped, today, LoanListing, StudentLoans, DATE_FORMAT};
pub use storage::{Loaded, Storage};
