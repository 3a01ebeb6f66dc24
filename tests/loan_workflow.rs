use library_catalog::db::today;
use library_catalog::{
    Author, Book, Catalog, CatalogError, Entity, LoanStatus, Publisher, Student, Storage,
};
use tempfile::TempDir;

fn stocked_catalog() -> (TempDir, Catalog) {
    let dir = TempDir::new().unwrap();
    let mut catalog = Catalog::new(Storage::new(dir.path()));
    catalog
        .add_student(Student {
            id: 1,
            name: "Ana Lopez".to_string(),
            grade: "First".to_string(),
        })
        .unwrap();
    catalog
        .add_student(Student {
            id: 2,
            name: "Luis Perez".to_string(),
            grade: "Second".to_string(),
        })
        .unwrap();
    catalog
        .add_author(Author {
            id: 1,
            name: "Garcia Marquez".to_string(),
            nationality: "Colombian".to_string(),
        })
        .unwrap();
    catalog
        .add_publisher(Publisher {
            id: 1,
            name: "Sudamericana".to_string(),
        })
        .unwrap();
    catalog
        .add_book(Book {
            id: 1,
            title: "Cien años de soledad".to_string(),
            isbn: "9780307474728".to_string(),
            year: 1967,
            author_id: 1,
            publisher_id: 1,
        })
        .unwrap();
    (dir, catalog)
}

#[test]
fn lend_return_and_protect_references() {
    let (_dir, mut catalog) = stocked_catalog();

    let loan_id = catalog.borrow(1, 1, "2024-01-10").unwrap();
    assert_eq!(loan_id, 1);
    assert!(catalog.find_loan(1).unwrap().is_active());

    let err = catalog.borrow(1, 2, "2024-01-11").unwrap_err();
    assert!(matches!(
        err,
        CatalogError::BookUnavailable {
            book_id: 1,
            loan_id: 1
        }
    ));

    let returned_on = catalog.give_back(1).unwrap();
    assert_eq!(returned_on, today());
    assert_eq!(catalog.find_loan(1).unwrap().return_date, today());

    assert!(matches!(
        catalog.remove_author(1).unwrap_err(),
        CatalogError::ReferentialConflict {
            entity: Entity::Author,
            id: 1,
            ..
        }
    ));
}

#[test]
fn returned_books_can_be_lent_again() {
    let (_dir, mut catalog) = stocked_catalog();
    catalog.borrow(1, 1, "2024-01-10").unwrap();
    catalog.give_back_on(1, "2024-01-20").unwrap();

    assert_eq!(catalog.borrow(1, 2, "2024-02-01").unwrap(), 2);
    assert_eq!(catalog.active_loan_for_book(1).unwrap().id, 2);
}

#[test]
fn a_loan_is_returned_only_once() {
    let (_dir, mut catalog) = stocked_catalog();
    catalog.borrow(1, 1, "2024-01-10").unwrap();
    catalog.give_back_on(1, "2024-01-20").unwrap();

    let err = catalog.give_back(1).unwrap_err();
    assert!(matches!(err, CatalogError::AlreadyReturned { loan_id: 1, .. }));
    assert_eq!(
        catalog.find_loan(1).unwrap().status(),
        LoanStatus::Returned("2024-01-20")
    );
}

#[test]
fn borrowing_checks_both_references_and_the_date() {
    let (_dir, mut catalog) = stocked_catalog();

    assert!(matches!(
        catalog.borrow(9, 1, "2024-01-10").unwrap_err(),
        CatalogError::NotFound {
            entity: Entity::Book,
            id: 9
        }
    ));
    assert!(matches!(
        catalog.borrow(1, 9, "2024-01-10").unwrap_err(),
        CatalogError::NotFound {
            entity: Entity::Student,
            id: 9
        }
    ));
    assert!(matches!(
        catalog.borrow(1, 1, "10/01/2024").unwrap_err(),
        CatalogError::InvalidDate(_)
    ));
    assert_eq!(catalog.loans().count(), 0);
}

#[test]
fn students_with_active_loans_cannot_be_removed() {
    let (_dir, mut catalog) = stocked_catalog();
    catalog.borrow(1, 1, "2024-01-10").unwrap();

    assert!(matches!(
        catalog.remove_student(1).unwrap_err(),
        CatalogError::ReferentialConflict { .. }
    ));
    assert!(matches!(
        catalog.remove_book(1).unwrap_err(),
        CatalogError::ReferentialConflict { .. }
    ));

    catalog.give_back(1).unwrap();
    catalog.remove_student(1).unwrap();

    let history = catalog.list_loans(false);
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].student_name, library_catalog::db::UNKNOWN);
}

#[test]
fn listings_filter_active_loans_and_group_by_student() {
    let (_dir, mut catalog) = stocked_catalog();
    catalog
        .add_book(Book {
            id: 2,
            title: "Rayuela".to_string(),
            isbn: "9788437604572".to_string(),
            year: 1963,
            author_id: 1,
            publisher_id: 1,
        })
        .unwrap();

    catalog.borrow(1, 1, "2024-01-10").unwrap();
    catalog.give_back_on(1, "2024-01-12").unwrap();
    catalog.borrow(2, 1, "2024-01-15").unwrap();
    catalog.borrow(1, 2, "2024-01-16").unwrap();

    assert_eq!(catalog.list_loans(false).len(), 3);
    let active: Vec<i64> = catalog
        .list_loans(true)
        .iter()
        .map(|listing| listing.loan.id)
        .collect();
    assert_eq!(active, vec![2, 3]);

    let ana = catalog.list_loans_for_student(1);
    assert_eq!(ana.student_name, "Ana Lopez");
    assert_eq!(ana.loans.len(), 2);
    assert_eq!(ana.loans[1].book_title, "Rayuela");
}
