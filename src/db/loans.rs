//! Borrow/return workflow layered on the loan collection.
//!
//! A loan is born active (empty return date) and becomes returned exactly
//! once, when `give_back` stamps today's date on it. A book can have at most
//! one active loan at a time.

use chrono::Local;
use tracing::info;

use crate::db::catalog::{next_id, Catalog, UNKNOWN};
use crate::error::CatalogError;
use crate::models::{Entity, Loan};

/// `strftime` pattern for every date stored in the loans resource.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// A loan resolved against its book and student for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoanListing<'a> {
    pub loan: &'a Loan,
    pub book_title: &'a str,
    pub student_name: &'a str,
}

/// All loans of one student, with the student's display name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudentLoans<'a> {
    pub student_id: i64,
    pub student_name: &'a str,
    pub loans: Vec<LoanListing<'a>>,
}

/// Today's local date as `YYYY-MM-DD`.
pub fn today() -> String {
    Local::now().format(DATE_FORMAT).to_string()
}

/// Shape check only: four digits, dash, two digits, dash, two digits. Calendar
/// validity is left to the caller.
pub fn is_date_shaped(value: &str) -> bool {
    let bytes = value.as_bytes();
    bytes.len() == 10
        && bytes.iter().enumerate().all(|(idx, byte)| match idx {
            4 | 7 => *byte == b'-',
            _ => byte.is_ascii_digit(),
        })
}

impl Catalog {
    /// Id `borrow` will give the next loan.
    pub fn next_loan_id(&self) -> i64 {
        next_id(&self.loans)
    }

    /// Look a loan up by id.
    pub fn find_loan(&self, id: i64) -> Option<&Loan> {
        self.loans.get(&id)
    }

    pub fn loans(&self) -> impl Iterator<Item = &Loan> {
        self.loans.values()
    }

    /// The open loan holding `book_id`, if the book is out.
    pub fn active_loan_for_book(&self, book_id: i64) -> Option<&Loan> {
        self.loans
            .values()
            .find(|loan| loan.book_id == book_id && loan.is_active())
    }

    /// Insert a loan record after checking its id, its date, both references
    /// and, for an active loan, that the book is not already out.
    pub fn add_loan(&mut self, loan: Loan) -> Result<(), CatalogError> {
        if self.loans.contains_key(&loan.id) {
            return Err(CatalogError::AlreadyExists {
                entity: Entity::Loan,
                key: format!("ID {}", loan.id),
            });
        }
        if !is_date_shaped(&loan.loan_date) {
            return Err(CatalogError::InvalidDate(loan.loan_date));
        }
        if !loan.is_active() && !is_date_shaped(&loan.return_date) {
            return Err(CatalogError::InvalidDate(loan.return_date));
        }
        if !self.books.contains_key(&loan.book_id) {
            return Err(CatalogError::not_found(Entity::Book, loan.book_id));
        }
        if !self.students.contains_key(&loan.student_id) {
            return Err(CatalogError::not_found(Entity::Student, loan.student_id));
        }
        if loan.is_active() {
            if let Some(open) = self.active_loan_for_book(loan.book_id) {
                return Err(CatalogError::BookUnavailable {
                    book_id: loan.book_id,
                    loan_id: open.id,
                });
            }
        }

        info!(
            id = loan.id,
            book_id = loan.book_id,
            student_id = loan.student_id,
            "recording loan"
        );
        self.loans.insert(loan.id, loan);
        self.persist(&self.loans)
    }

    /// Lend `book_id` to `student_id` starting on `loan_date` and return the
    /// new loan's id.
    pub fn borrow(
        &mut self,
        book_id: i64,
        student_id: i64,
        loan_date: &str,
    ) -> Result<i64, CatalogError> {
        let id = self.next_loan_id();
        self.add_loan(Loan {
            id,
            book_id,
            student_id,
            loan_date: loan_date.to_string(),
            return_date: String::new(),
        })?;
        Ok(id)
    }

    /// Close an active loan with today's date and return that date.
    pub fn give_back(&mut self, loan_id: i64) -> Result<String, CatalogError> {
        let date = today();
        self.give_back_on(loan_id, &date)?;
        Ok(date)
    }

    /// Close an active loan with an explicit return date. A loan that was
    /// already returned keeps its original date.
    pub fn give_back_on(&mut self, loan_id: i64, return_date: &str) -> Result<(), CatalogError> {
        if !is_date_shaped(return_date) {
            return Err(CatalogError::InvalidDate(return_date.to_string()));
        }

        let loan = self
            .loans
            .get_mut(&loan_id)
            .ok_or_else(|| CatalogError::not_found(Entity::Loan, loan_id))?;
        if !loan.is_active() {
            return Err(CatalogError::AlreadyReturned {
                loan_id,
                date: loan.return_date.clone(),
            });
        }

        loan.return_date = return_date.to_string();
        info!(id = loan_id, return_date, "loan returned");
        self.persist(&self.loans)
    }

    /// Every loan, or only the active ones, with book titles and student names
    /// resolved.
    pub fn list_loans(&self, active_only: bool) -> Vec<LoanListing<'_>> {
        self.loans
            .values()
            .filter(|loan| !active_only || loan.is_active())
            .map(|loan| self.loan_listing(loan))
            .collect()
    }

    /// Every loan, active or returned, that references `student_id`.
    pub fn list_loans_for_student(&self, student_id: i64) -> StudentLoans<'_> {
        StudentLoans {
            student_id,
            student_name: self
                .students
                .get(&student_id)
                .map_or(UNKNOWN, |student| student.name.as_str()),
            loans: self
                .loans
                .values()
                .filter(|loan| loan.student_id == student_id)
                .map(|loan| self.loan_listing(loan))
                .collect(),
        }
    }

    fn loan_listing<'a>(&'a self, loan: &'a Loan) -> LoanListing<'a> {
        LoanListing {
            loan,
            book_title: self
                .books
                .get(&loan.book_id)
                .map_or(UNKNOWN, |book| book.title.as_str()),
            student_name: self
                .students
                .get(&loan.student_id)
                .map_or(UNKNOWN, |student| student.name.as_str()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn date_shape_accepts_iso_dates() {
        assert!(is_date_shaped("2024-01-10"));
        assert!(is_date_shaped("0000-99-99"));
    }

    #[test]
    fn date_shape_rejects_other_layouts() {
        assert!(!is_date_shaped("2024-1-10"));
        assert!(!is_date_shaped("10/01/2024"));
        assert!(!is_date_shaped("2024-01-10 "));
        assert!(!is_date_shaped(""));
    }

    #[test]
    fn today_is_date_shaped() {
        assert!(is_date_shaped(&today()));
    }
}
