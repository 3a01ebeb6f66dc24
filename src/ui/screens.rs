use crate::db::Catalog;
use crate::models::Entity;

use super::helpers::{
    author_row, book_row, loan_row, publisher_row, student_loan_row, student_row,
};

/// One rendered line of a listing, tied back to the record it shows.
pub(crate) struct Row {
    pub(crate) id: i64,
    pub(crate) text: String,
    /// Drawn emphasized; used for loans that are still out.
    pub(crate) emphasized: bool,
}

/// Build the rows for one tab straight from the catalog listings, so dangling
/// references already read "Unknown".
pub(crate) fn rows_for(catalog: &Catalog, entity: Entity, active_only: bool) -> Vec<Row> {
    match entity {
        Entity::Student => catalog
            .students()
            .map(|student| Row {
                id: student.id,
                text: student_row(student),
                emphasized: false,
            })
            .collect(),
        Entity::Author => catalog
            .authors()
            .map(|author| Row {
                id: author.id,
                text: author_row(author),
                emphasized: false,
            })
            .collect(),
        Entity::Publisher => catalog
            .publishers()
            .map(|publisher| Row {
                id: publisher.id,
                text: publisher_row(publisher),
                emphasized: false,
            })
            .collect(),
        Entity::Book => catalog
            .list_books()
            .iter()
            .map(|listing| Row {
                id: listing.book.id,
                text: book_row(listing),
                emphasized: catalog.active_loan_for_book(listing.book.id).is_some(),
            })
            .collect(),
        Entity::Loan => catalog
            .list_loans(active_only)
            .iter()
            .map(|listing| Row {
                id: listing.loan.id,
                text: loan_row(listing),
                emphasized: listing.loan.is_active(),
            })
            .collect(),
    }
}

pub(crate) fn student_loan_rows(catalog: &Catalog, student_id: i64) -> (String, Vec<Row>) {
    let loans = catalog.list_loans_for_student(student_id);
    let rows = loans
        .loans
        .iter()
        .map(|listing| Row {
            id: listing.loan.id,
            text: student_loan_row(listing),
            emphasized: listing.loan.is_active(),
        })
        .collect();
    (loans.student_name.to_string(), rows)
}

/// Clamp-and-move selection shared by both screens.
fn shift(selected: usize, offset: isize, len: usize) -> usize {
    if len == 0 {
        return 0;
    }
    let max = len as isize - 1;
    (selected as isize + offset).clamp(0, max) as usize
}

/// Tabbed listing of the five collections.
pub(crate) struct CatalogScreen {
    pub(crate) tab: usize,
    /// Remembered selection per tab, indexed like `Entity::ALL`.
    pub(crate) selected: [usize; 5],
    pub(crate) active_only: bool,
}

impl CatalogScreen {
    pub(crate) fn new() -> Self {
        Self {
            tab: 0,
            selected: [0; 5],
            active_only: false,
        }
    }

    pub(crate) fn entity(&self) -> Entity {
        Entity::ALL[self.tab % Entity::ALL.len()]
    }

    pub(crate) fn next_tab(&mut self) {
        self.tab = (self.tab + 1) % Entity::ALL.len();
    }

    pub(crate) fn previous_tab(&mut self) {
        self.tab = (self.tab + Entity::ALL.len() - 1) % Entity::ALL.len();
    }

    pub(crate) fn show(&mut self, entity: Entity) {
        if let Some(idx) = Entity::ALL.iter().position(|candidate| *candidate == entity) {
            self.tab = idx;
        }
    }

    pub(crate) fn selected(&self) -> usize {
        self.selected[self.tab]
    }

    pub(crate) fn move_selection(&mut self, offset: isize, len: usize) {
        self.selected[self.tab] = shift(self.selected[self.tab], offset, len);
    }

    pub(crate) fn select(&mut self, index: usize) {
        self.selected[self.tab] = index;
    }

    pub(crate) fn ensure_in_bounds(&mut self, len: usize) {
        let selected = &mut self.selected[self.tab];
        if len == 0 {
            *selected = 0;
        } else if *selected >= len {
            *selected = len - 1;
        }
    }

    pub(crate) fn toggle_active_only(&mut self) -> bool {
        self.active_only = !self.active_only;
        self.active_only
    }
}

/// Every loan of one student.
pub(crate) struct StudentLoansScreen {
    pub(crate) student_id: i64,
    pub(crate) selected: usize,
}

impl StudentLoansScreen {
    pub(crate) fn new(student_id: i64) -> Self {
        Self {
            student_id,
            selected: 0,
        }
    }

    pub(crate) fn move_selection(&mut self, offset: isize, len: usize) {
        self.selected = shift(self.selected, offset, len);
    }
}
