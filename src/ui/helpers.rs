use anyhow::Error;
use ratatui::layout::{Constraint, Direction, Layout, Rect};

use crate::db::{BookListing, LoanListing};
use crate::models::{Author, Publisher, Student};

pub(crate) fn student_row(student: &Student) -> String {
    format!(
        "ID: {} | Name: {} | Grade: {}",
        student.id, student.name, student.grade
    )
}

pub(crate) fn author_row(author: &Author) -> String {
    format!(
        "ID: {} | Name: {} | Nationality: {}",
        author.id, author.name, author.nationality
    )
}

pub(crate) fn publisher_row(publisher: &Publisher) -> String {
    format!("ID: {} | Name: {}", publisher.id, publisher.name)
}

pub(crate) fn book_row(listing: &BookListing<'_>) -> String {
    let book = listing.book;
    format!(
        "ID: {} | Title: {} | ISBN: {} | Year: {} | Author: {} | Publisher: {}",
        book.id, book.title, book.isbn, book.year, listing.author, listing.publisher
    )
}

pub(crate) fn loan_row(listing: &LoanListing<'_>) -> String {
    let loan = listing.loan;
    format!(
        "Loan {} | Book {} ({}) | Student {} ({}) | Loaned: {} | Returned: {}",
        loan.id,
        loan.book_id,
        listing.book_title,
        loan.student_id,
        listing.student_name,
        loan.loan_date,
        loan.status()
    )
}

/// Loan line for the per-student view, where the student is already known.
pub(crate) fn student_loan_row(listing: &LoanListing<'_>) -> String {
    let loan = listing.loan;
    format!(
        "Loan {} | Book: {} | Loaned: {} | Returned: {}",
        loan.id,
        listing.book_title,
        loan.loan_date,
        loan.status()
    )
}

/// Produce a rectangle centered within `area` that spans the requested percent
/// of the width and height. Used for modal dialogs.
pub(crate) fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(area);

    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(horizontal[1]);

    vertical[1]
}

/// Message for the footer: the outermost error, plus the root cause when the
/// chain has one (an I/O failure under "failed to access <file>").
pub(crate) fn surface_error(err: &Error) -> String {
    let top = err.to_string();
    match err.chain().last().map(|cause| cause.to_string()) {
        Some(root) if root != top => format!("{top}: {root}"),
        _ => top,
    }
}

pub(crate) fn plural(count: usize) -> &'static str {
    if count == 1 {
        ""
    } else {
        "s"
    }
}
