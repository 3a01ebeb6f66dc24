use std::str::FromStr;

use anyhow::{anyhow, Result};
use chrono::{Datelike, NaiveDate};
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};

use crate::db::{is_date_shaped, today, DATE_FORMAT};
use crate::models::{
    Author, AuthorPatch, Book, BookPatch, Entity, Publisher, PublisherPatch, Student,
    StudentPatch,
};

/// Earliest year accepted for a loan date typed into the borrow form.
const MIN_LOAN_YEAR: i32 = 1900;

/// What a form field accepts while typing and on submit.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub(crate) enum FieldKind {
    /// Letters and spaces.
    Name,
    /// Letters, digits and spaces.
    Text,
    /// Anything printable; commas are fine, the codec quotes them.
    Free,
    Isbn,
    Number,
    /// `YYYY-MM-DD`; blank means today.
    Date,
}

impl FieldKind {
    fn accepts(self, ch: char) -> bool {
        match self {
            FieldKind::Number => ch.is_ascii_digit(),
            FieldKind::Isbn | FieldKind::Date => ch.is_ascii_digit() || ch == '-',
            FieldKind::Name | FieldKind::Text | FieldKind::Free => !ch.is_control(),
        }
    }
}

#[derive(Clone, Debug)]
pub(crate) struct FormField {
    pub(crate) label: &'static str,
    pub(crate) kind: FieldKind,
    pub(crate) value: String,
    /// Stored value shown as a hint while editing.
    pub(crate) current: Option<String>,
}

impl FormField {
    fn new(label: &'static str, kind: FieldKind) -> Self {
        Self {
            label,
            kind,
            value: String::new(),
            current: None,
        }
    }
}

/// Which submit path a form feeds.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub(crate) enum FormPurpose {
    Add,
    Edit,
    Borrow,
}

/// Shared state for the add, edit, and borrow dialogs. The field layout is
/// picked from the entity; parsing turns it into a record or a patch.
#[derive(Clone, Debug)]
pub(crate) struct RecordForm {
    pub(crate) entity: Entity,
    pub(crate) purpose: FormPurpose,
    /// Id of the record being created or edited.
    pub(crate) id: i64,
    pub(crate) fields: Vec<FormField>,
    pub(crate) active: usize,
    pub(crate) error: Option<String>,
}

fn fields_for(entity: Entity) -> Vec<FormField> {
    match entity {
        Entity::Student => vec![
            FormField::new("Name", FieldKind::Name),
            FormField::new("Grade", FieldKind::Text),
        ],
        Entity::Author => vec![
            FormField::new("Name", FieldKind::Name),
            FormField::new("Nationality", FieldKind::Text),
        ],
        Entity::Publisher => vec![FormField::new("Name", FieldKind::Free)],
        Entity::Book => vec![
            FormField::new("Title", FieldKind::Free),
            FormField::new("ISBN", FieldKind::Isbn),
            FormField::new("Year", FieldKind::Number),
            FormField::new("Author ID", FieldKind::Number),
            FormField::new("Publisher ID", FieldKind::Number),
        ],
        Entity::Loan => vec![
            FormField::new("Book ID", FieldKind::Number),
            FormField::new("Student ID", FieldKind::Number),
            FormField::new("Loan date", FieldKind::Date),
        ],
    }
}

impl RecordForm {
    /// Blank form for a new record that will receive `id`.
    pub(crate) fn add(entity: Entity, id: i64) -> Self {
        Self {
            entity,
            purpose: FormPurpose::Add,
            id,
            fields: fields_for(entity),
            active: 0,
            error: None,
        }
    }

    /// Edit form. Inputs start empty and the stored values are shown as hints;
    /// anything left blank keeps its value.
    pub(crate) fn edit(entity: Entity, id: i64, current: Vec<String>) -> Self {
        let mut form = Self::add(entity, id);
        form.purpose = FormPurpose::Edit;
        for (field, value) in form.fields.iter_mut().zip(current) {
            field.current = Some(value);
        }
        form
    }

    pub(crate) fn edit_student(student: &Student) -> Self {
        Self::edit(
            Entity::Student,
            student.id,
            vec![student.name.clone(), student.grade.clone()],
        )
    }

    pub(crate) fn edit_author(author: &Author) -> Self {
        Self::edit(
            Entity::Author,
            author.id,
            vec![author.name.clone(), author.nationality.clone()],
        )
    }

    pub(crate) fn edit_publisher(publisher: &Publisher) -> Self {
        Self::edit(Entity::Publisher, publisher.id, vec![publisher.name.clone()])
    }

    pub(crate) fn edit_book(book: &Book) -> Self {
        Self::edit(
            Entity::Book,
            book.id,
            vec![
                book.title.clone(),
                book.isbn.clone(),
                book.year.to_string(),
                book.author_id.to_string(),
                book.publisher_id.to_string(),
            ],
        )
    }

    /// Borrow dialog, optionally pre-filled from the selected book or student.
    pub(crate) fn borrow(loan_id: i64, book_id: Option<i64>, student_id: Option<i64>) -> Self {
        let mut form = Self::add(Entity::Loan, loan_id);
        form.purpose = FormPurpose::Borrow;
        if let Some(book_id) = book_id {
            form.set_value(0, book_id.to_string());
            form.active = 1;
        }
        if let Some(student_id) = student_id {
            form.set_value(1, student_id.to_string());
            if book_id.is_none() {
                form.active = 0;
            }
        }
        form
    }

    pub(crate) fn title(&self) -> String {
        match self.purpose {
            FormPurpose::Add => format!("Add {} (ID {})", self.entity, self.id),
            FormPurpose::Edit => format!("Edit {} ID {} (blank keeps value)", self.entity, self.id),
            FormPurpose::Borrow => format!("Lend a Book (loan ID {})", self.id),
        }
    }

    fn set_value(&mut self, idx: usize, value: String) {
        if let Some(field) = self.fields.get_mut(idx) {
            field.value = value;
        }
    }

    pub(crate) fn next_field(&mut self) {
        if !self.fields.is_empty() {
            self.active = (self.active + 1) % self.fields.len();
        }
    }

    pub(crate) fn previous_field(&mut self) {
        if !self.fields.is_empty() {
            self.active = (self.active + self.fields.len() - 1) % self.fields.len();
        }
    }

    /// Append a character to the active field if its kind allows it.
    pub(crate) fn push_char(&mut self, ch: char) -> bool {
        match self.fields.get_mut(self.active) {
            Some(field) if field.kind.accepts(ch) => {
                field.value.push(ch);
                true
            }
            _ => false,
        }
    }

    pub(crate) fn backspace(&mut self) {
        if let Some(field) = self.fields.get_mut(self.active) {
            field.value.pop();
        }
    }

    fn field(&self, idx: usize) -> Result<&FormField> {
        self.fields
            .get(idx)
            .ok_or_else(|| anyhow!("Form has no field #{idx}."))
    }

    /// Validated value of a field that must be filled in.
    fn required(&self, idx: usize) -> Result<String> {
        let field = self.field(idx)?;
        let raw = field.value.trim();
        if raw.is_empty() {
            return Err(anyhow!("{} is required.", field.label));
        }
        validate(field.label, field.kind, raw)
    }

    /// Validated value of a field where blank means "keep".
    fn optional(&self, idx: usize) -> Result<Option<String>> {
        let field = self.field(idx)?;
        let raw = field.value.trim();
        if raw.is_empty() {
            return Ok(None);
        }
        validate(field.label, field.kind, raw).map(Some)
    }

    fn required_number<T: FromStr>(&self, idx: usize) -> Result<T> {
        let value = self.required(idx)?;
        parse_number(self.field(idx)?.label, &value)
    }

    fn optional_number<T: FromStr>(&self, idx: usize) -> Result<Option<T>> {
        match self.optional(idx)? {
            Some(value) => parse_number(self.field(idx)?.label, &value).map(Some),
            None => Ok(None),
        }
    }

    pub(crate) fn to_student(&self) -> Result<Student> {
        Ok(Student {
            id: self.id,
            name: self.required(0)?,
            grade: self.required(1)?,
        })
    }

    pub(crate) fn to_student_patch(&self) -> Result<StudentPatch> {
        Ok(StudentPatch {
            name: self.optional(0)?.into(),
            grade: self.optional(1)?.into(),
        })
    }

    pub(crate) fn to_author(&self) -> Result<Author> {
        Ok(Author {
            id: self.id,
            name: self.required(0)?,
            nationality: self.required(1)?,
        })
    }

    pub(crate) fn to_author_patch(&self) -> Result<AuthorPatch> {
        Ok(AuthorPatch {
            name: self.optional(0)?.into(),
            nationality: self.optional(1)?.into(),
        })
    }

    pub(crate) fn to_publisher(&self) -> Result<Publisher> {
        Ok(Publisher {
            id: self.id,
            name: self.required(0)?,
        })
    }

    pub(crate) fn to_publisher_patch(&self) -> Result<PublisherPatch> {
        Ok(PublisherPatch {
            name: self.optional(0)?.into(),
        })
    }

    pub(crate) fn to_book(&self) -> Result<Book> {
        Ok(Book {
            id: self.id,
            title: self.required(0)?,
            isbn: self.required(1)?,
            year: self.required_number(2)?,
            author_id: self.required_number(3)?,
            publisher_id: self.required_number(4)?,
        })
    }

    pub(crate) fn to_book_patch(&self) -> Result<BookPatch> {
        Ok(BookPatch {
            title: self.optional(0)?.into(),
            isbn: self.optional(1)?.into(),
            year: self.optional_number(2)?.into(),
            author_id: self.optional_number(3)?.into(),
            publisher_id: self.optional_number(4)?.into(),
        })
    }

    /// Book id, student id and loan date for `Catalog::borrow`. A blank date
    /// means today.
    pub(crate) fn to_loan_request(&self) -> Result<(i64, i64, String)> {
        let book_id = self.required_number(0)?;
        let student_id = self.required_number(1)?;
        let date = self.optional(2)?.unwrap_or_else(today);
        Ok((book_id, student_id, date))
    }

    /// Render one field as a `label: value` line, highlighting the focus.
    pub(crate) fn build_line(&self, idx: usize) -> Line<'static> {
        let Some(field) = self.fields.get(idx) else {
            return Line::from("");
        };
        let is_active = idx == self.active;

        let display = if !field.value.is_empty() {
            field.value.clone()
        } else {
            match (&field.current, field.kind) {
                (Some(current), _) => format!("<keep: {current}>"),
                (None, FieldKind::Date) => "<today>".to_string(),
                _ => "<required>".to_string(),
            }
        };

        let style = if is_active {
            Style::default().fg(Color::Yellow)
        } else if field.value.is_empty() {
            Style::default().fg(Color::DarkGray)
        } else {
            Style::default()
        };

        Line::from(vec![
            Span::raw(format!("{}: ", field.label)),
            Span::styled(display, style),
        ])
    }

    /// Cursor column offset within the active field's line, in terminal
    /// cells rather than chars.
    pub(crate) fn cursor_offset(&self) -> usize {
        self.fields
            .get(self.active)
            .map(|field| Span::raw(format!("{}: {}", field.label, field.value)).width())
            .unwrap_or(0)
    }
}

fn parse_number<T: FromStr>(label: &str, value: &str) -> Result<T> {
    value
        .parse::<T>()
        .map_err(|_| anyhow!("{label} must be a whole number."))
}

fn validate(label: &str, kind: FieldKind, value: &str) -> Result<String> {
    match kind {
        FieldKind::Name => validate_name(label, value),
        FieldKind::Text => validate_text(label, value),
        FieldKind::Free | FieldKind::Number => Ok(value.to_string()),
        FieldKind::Isbn => validate_isbn(value),
        FieldKind::Date => validate_date(value),
    }
}

pub(crate) fn validate_name(label: &str, value: &str) -> Result<String> {
    if value.chars().all(|ch| ch.is_alphabetic() || ch == ' ') {
        Ok(value.to_string())
    } else {
        Err(anyhow!("{label} may only contain letters and spaces."))
    }
}

pub(crate) fn validate_text(label: &str, value: &str) -> Result<String> {
    if value.chars().all(|ch| ch.is_alphanumeric() || ch == ' ') {
        Ok(value.to_string())
    } else {
        Err(anyhow!("{label} may only contain letters, digits and spaces."))
    }
}

/// Ten digits with an optional `-DDD` suffix, or thirteen digits.
pub(crate) fn validate_isbn(value: &str) -> Result<String> {
    let all_digits = |part: &str| part.chars().all(|ch| ch.is_ascii_digit());
    let valid = match value.split_once('-') {
        Some((head, tail)) => {
            head.len() == 10 && tail.len() == 3 && all_digits(head) && all_digits(tail)
        }
        None => (value.len() == 10 || value.len() == 13) && all_digits(value),
    };

    if valid {
        Ok(value.to_string())
    } else {
        Err(anyhow!(
            "ISBN must have 10 or 13 digits (e.g. 1234567890, 1234567890-123 or 9780307474728)."
        ))
    }
}

/// A real calendar date in `YYYY-MM-DD` form, from 1900 onwards.
pub(crate) fn validate_date(value: &str) -> Result<String> {
    if !is_date_shaped(value) {
        return Err(anyhow!("Invalid date format (use YYYY-MM-DD)."));
    }
    let date = NaiveDate::parse_from_str(value, DATE_FORMAT)
        .map_err(|_| anyhow!("{value} is not a valid calendar date."))?;
    if date.year() < MIN_LOAN_YEAR {
        return Err(anyhow!("Loan dates start in {MIN_LOAN_YEAR}."));
    }
    Ok(value.to_string())
}

/// Pending delete confirmation.
#[derive(Clone, Debug)]
pub(crate) struct ConfirmDelete {
    pub(crate) entity: Entity,
    pub(crate) id: i64,
    pub(crate) label: String,
}

/// Pending return confirmation.
#[derive(Clone, Debug)]
pub(crate) struct ConfirmReturn {
    pub(crate) loan_id: i64,
    pub(crate) book_title: String,
    pub(crate) student_name: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Patch;

    fn type_into(form: &mut RecordForm, idx: usize, text: &str) {
        form.active = idx;
        for ch in text.chars() {
            form.push_char(ch);
        }
    }

    #[test]
    fn names_reject_digits() {
        assert!(validate_name("Name", "Gabriel Garcia").is_ok());
        assert!(validate_name("Name", "José Martí").is_ok());
        assert!(validate_name("Name", "R2D2").is_err());
    }

    #[test]
    fn isbn_accepts_the_three_layouts() {
        assert!(validate_isbn("1234567890").is_ok());
        assert!(validate_isbn("1234567890-123").is_ok());
        assert!(validate_isbn("9780307474728").is_ok());
        assert!(validate_isbn("12345").is_err());
        assert!(validate_isbn("123-456-789").is_err());
    }

    #[test]
    fn dates_must_exist_on_the_calendar() {
        assert!(validate_date("2024-02-29").is_ok());
        assert!(validate_date("2023-02-29").is_err());
        assert!(validate_date("2024-04-31").is_err());
        assert!(validate_date("1850-01-01").is_err());
        assert!(validate_date("2024/01/01").is_err());
    }

    #[test]
    fn cursor_offset_counts_display_cells() {
        let mut form = RecordForm::add(Entity::Student, 1);
        type_into(&mut form, 0, "José");
        assert_eq!(form.cursor_offset(), "Name: ".len() + 4);

        type_into(&mut form, 1, "漢字");
        assert_eq!(form.cursor_offset(), "Grade: ".len() + 4);
    }

    #[test]
    fn number_fields_ignore_letters() {
        let mut form = RecordForm::add(Entity::Book, 1);
        type_into(&mut form, 2, "19a67");
        assert_eq!(form.fields[2].value, "1967");
    }

    #[test]
    fn add_form_builds_a_book() {
        let mut form = RecordForm::add(Entity::Book, 4);
        type_into(&mut form, 0, "Cien años de soledad");
        type_into(&mut form, 1, "9780307474728");
        type_into(&mut form, 2, "1967");
        type_into(&mut form, 3, "1");
        type_into(&mut form, 4, "2");

        let book = form.to_book().unwrap();
        assert_eq!(book.id, 4);
        assert_eq!(book.title, "Cien años de soledad");
        assert_eq!(book.year, 1967);
        assert_eq!(book.publisher_id, 2);
    }

    #[test]
    fn add_form_requires_every_field() {
        let mut form = RecordForm::add(Entity::Student, 1);
        type_into(&mut form, 0, "Ana");
        let err = form.to_student().unwrap_err();
        assert_eq!(err.to_string(), "Grade is required.");
    }

    #[test]
    fn blank_edit_fields_become_keep() {
        let book = Book {
            id: 3,
            title: "Old".to_string(),
            isbn: "1234567890".to_string(),
            year: 2000,
            author_id: 1,
            publisher_id: 1,
        };
        let mut form = RecordForm::edit_book(&book);
        type_into(&mut form, 2, "2001");

        let patch = form.to_book_patch().unwrap();
        assert_eq!(patch.title, Patch::Keep);
        assert_eq!(patch.isbn, Patch::Keep);
        assert_eq!(patch.year, Patch::Set(2001));
        assert!(patch.author_id.is_keep());
    }

    #[test]
    fn borrow_form_defaults_date_to_today() {
        let mut form = RecordForm::borrow(1, Some(5), None);
        type_into(&mut form, 1, "2");
        let (book_id, student_id, date) = form.to_loan_request().unwrap();
        assert_eq!((book_id, student_id), (5, 2));
        assert_eq!(date, today());
    }
}
