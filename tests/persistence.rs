use std::fs;

use library_catalog::{
    Author, Book, Catalog, CatalogError, Entity, Loan, Publisher, Student, Storage,
};
use tempfile::TempDir;

fn read(dir: &TempDir, entity: Entity) -> String {
    fs::read_to_string(dir.path().join(entity.file_name())).unwrap()
}

#[test]
fn missing_resources_load_as_empty_collections() {
    let dir = TempDir::new().unwrap();
    let (catalog, report) = Catalog::open(Storage::new(dir.path())).unwrap();

    assert_eq!(report.total_loaded(), 0);
    assert_eq!(report.entries.len(), 5);
    assert!(catalog.counts().iter().all(|(_, count)| *count == 0));
}

#[test]
fn every_mutation_rewrites_its_resource() {
    let dir = TempDir::new().unwrap();
    let mut catalog = Catalog::new(Storage::new(dir.path()));
    catalog
        .add_publisher(Publisher {
            id: 1,
            name: "Planeta, S.A.".to_string(),
        })
        .unwrap();

    assert_eq!(read(&dir, Entity::Publisher), "1,\"Planeta, S.A.\"\n");
    assert!(!dir.path().join(Entity::Student.file_name()).exists());
}

#[test]
fn catalog_survives_a_reload() {
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
        .add_publisher(Publisher {
            id: 1,
            name: "Planeta, S.A.".to_string(),
        })
        .unwrap();
    catalog
        .add_author(Author {
            id: 1,
            name: "Isabel Allende".to_string(),
            nationality: "Chilean".to_string(),
        })
        .unwrap();
    catalog
        .add_book(Book {
            id: 1,
            title: "La casa de los espíritus; novela".to_string(),
            isbn: "9788401242267".to_string(),
            year: 1982,
            author_id: 1,
            publisher_id: 1,
        })
        .unwrap();
    catalog.borrow(1, 1, "2024-01-10").unwrap();
    catalog.save_all().unwrap();

    let (reloaded, report) = Catalog::open(Storage::new(dir.path())).unwrap();
    assert_eq!(report.total_loaded(), 5);
    assert_eq!(report.total_skipped(), 0);
    assert_eq!(reloaded.find_publisher(1).unwrap().name, "Planeta, S.A.");
    assert_eq!(
        reloaded.find_book(1).unwrap().title,
        "La casa de los espíritus; novela"
    );
    assert!(reloaded.find_loan(1).unwrap().is_active());
    assert_eq!(reloaded.next_loan_id(), 2);
}

#[test]
fn malformed_lines_are_skipped_and_counted() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("students.txt"),
        "1,Ana Lopez,First\nnot-a-number,Luis,Second\n2,Short\n\n3,Marta Ruiz,Third\n",
    )
    .unwrap();

    let (catalog, report) = Catalog::open(Storage::new(dir.path())).unwrap();
    let students = report.get(Entity::Student).unwrap();
    assert_eq!(students.loaded, 2);
    assert_eq!(students.skipped, 2);
    assert_eq!(catalog.next_student_id(), 4);
}

#[test]
fn pending_loans_written_without_a_return_field_still_load() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("loans.txt"),
        "1,1,1,2024-01-10\n2,2,1,2024-01-11,\n3,3,1,2024-01-12,2024-01-20\n",
    )
    .unwrap();

    let (catalog, report) = Catalog::open(Storage::new(dir.path())).unwrap();
    assert_eq!(report.get(Entity::Loan).unwrap().loaded, 3);
    assert!(catalog.find_loan(1).unwrap().is_active());
    assert!(catalog.find_loan(2).unwrap().is_active());
    assert!(!catalog.find_loan(3).unwrap().is_active());
}

#[test]
fn duplicate_ids_in_a_resource_keep_the_first_record() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("publishers.txt"), "1,Sudamericana\n1,Alfaguara\n").unwrap();

    let (catalog, report) = Catalog::open(Storage::new(dir.path())).unwrap();
    assert_eq!(report.get(Entity::Publisher).unwrap().skipped, 1);
    assert_eq!(catalog.find_publisher(1).unwrap().name, "Sudamericana");
}

#[test]
fn failed_save_all_leaves_every_resource_untouched() {
    let dir = TempDir::new().unwrap();
    let mut catalog = Catalog::new(Storage::new(dir.path()));
    catalog
        .add_student(Student {
            id: 1,
            name: "Ana Lopez".to_string(),
            grade: "First".to_string(),
        })
        .unwrap();
    let before = read(&dir, Entity::Student);

    catalog
        .add_student(Student {
            id: 2,
            name: "Luis Perez".to_string(),
            grade: "Second".to_string(),
        })
        .unwrap();
    fs::write(dir.path().join("students.txt"), &before).unwrap();

    // A directory where the loans staging file should go makes staging fail.
    fs::create_dir(dir.path().join("loans.tmp")).unwrap();
    assert!(catalog.save_all().is_err());

    assert_eq!(read(&dir, Entity::Student), before);
    assert!(!dir.path().join("students.tmp").exists());
    assert!(!dir.path().join("authors.txt").exists());
}

/// Every record of every collection, for comparing two catalogs wholesale.
fn snapshot(
    catalog: &Catalog,
) -> (
    Vec<Student>,
    Vec<Author>,
    Vec<Publisher>,
    Vec<Book>,
    Vec<Loan>,
) {
    (
        catalog.students().cloned().collect(),
        catalog.authors().cloned().collect(),
        catalog.publishers().cloned().collect(),
        catalog.books().cloned().collect(),
        catalog.loans().cloned().collect(),
    )
}

#[test]
fn reload_reconstructs_every_record_exactly() {
    let dir = TempDir::new().unwrap();
    let mut catalog = Catalog::new(Storage::new(dir.path()));
    catalog
        .add_student(Student {
            id: 1,
            name: "Ana \"Anita\" Lopez".to_string(),
            grade: "First; section A".to_string(),
        })
        .unwrap();
    catalog
        .add_student(Student {
            id: 2,
            name: "Luis".to_string(),
            grade: String::new(),
        })
        .unwrap();
    catalog
        .add_author(Author {
            id: 1,
            name: "Garcia Marquez, Gabriel".to_string(),
            nationality: "Colombian|Mexican".to_string(),
        })
        .unwrap();
    catalog
        .add_publisher(Publisher {
            id: 1,
            name: "Planeta, S.A.".to_string(),
        })
        .unwrap();
    catalog
        .add_publisher(Publisher {
            id: 2,
            name: "Line one\nLine two".to_string(),
        })
        .unwrap();
    catalog
        .add_book(Book {
            id: 1,
            title: "\"Cien años\", de soledad | tomo 1; ed. 2\r\nfin".to_string(),
            isbn: "9780307474728".to_string(),
            year: 1967,
            author_id: 1,
            publisher_id: 2,
        })
        .unwrap();
    catalog.borrow(1, 1, "2024-01-10").unwrap();
    catalog.give_back_on(1, "2024-01-20").unwrap();
    catalog.borrow(1, 2, "2024-02-01").unwrap();
    catalog.save_all().unwrap();

    let (reloaded, report) = Catalog::open(Storage::new(dir.path())).unwrap();
    assert_eq!(report.total_skipped(), 0);
    assert_eq!(snapshot(&reloaded), snapshot(&catalog));
}

#[test]
fn quoted_line_breaks_do_not_split_records() {
    let dir = TempDir::new().unwrap();
    let mut catalog = Catalog::new(Storage::new(dir.path()));
    catalog
        .add_publisher(Publisher {
            id: 1,
            name: "Line one\nLine two".to_string(),
        })
        .unwrap();
    catalog
        .add_publisher(Publisher {
            id: 2,
            name: "Sudamericana".to_string(),
        })
        .unwrap();

    let (reloaded, report) = Catalog::open(Storage::new(dir.path())).unwrap();
    let publishers = report.get(Entity::Publisher).unwrap();
    assert_eq!((publishers.loaded, publishers.skipped), (2, 0));
    assert_eq!(
        reloaded.find_publisher(1).map(|p| p.name.as_str()),
        Some("Line one\nLine two")
    );
    assert_eq!(reloaded.find_publisher(2).unwrap().name, "Sudamericana");
}

#[test]
fn crlf_files_load_like_lf_files() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("publishers.txt"),
        "1,Sudamericana\r\n2,\"Planeta, S.A.\"\r\n",
    )
    .unwrap();

    let (catalog, report) = Catalog::open(Storage::new(dir.path())).unwrap();
    assert_eq!(report.total_skipped(), 0);
    assert_eq!(catalog.find_publisher(1).unwrap().name, "Sudamericana");
    assert_eq!(catalog.find_publisher(2).unwrap().name, "Planeta, S.A.");
}

#[test]
fn lines_that_are_not_utf8_are_skipped() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("students.txt"),
        b"1,Ana Lopez,First\n2,Mar\xEDa,Second\n3,Luis,Third\n",
    )
    .unwrap();

    let (catalog, report) = Catalog::open(Storage::new(dir.path())).unwrap();
    let students = report.get(Entity::Student).unwrap();
    assert_eq!((students.loaded, students.skipped), (2, 1));
    assert!(catalog.find_student(2).is_none());
    assert_eq!(catalog.find_student(3).unwrap().name, "Luis");
}

#[test]
fn failed_save_keeps_the_mutation_in_memory() {
    let dir = TempDir::new().unwrap();
    let mut catalog = Catalog::new(Storage::new(dir.path()));
    fs::create_dir(dir.path().join("students.tmp")).unwrap();

    let student = Student {
        id: 1,
        name: "Ana Lopez".to_string(),
        grade: "First".to_string(),
    };
    let err = catalog.add_student(student.clone()).unwrap_err();

    assert!(matches!(err, CatalogError::Io { .. }));
    assert_eq!(catalog.find_student(1), Some(&student));
    assert!(!dir.path().join("students.txt").exists());
}
