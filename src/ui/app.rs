use std::mem;

use anyhow::{anyhow, Result};
use crossterm::event::KeyCode;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::prelude::*;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Tabs, Wrap};
use ratatui::Frame;

use crate::db::{Catalog, LoadReport};
use crate::error::CatalogError;
use crate::models::{Entity, LoanStatus};

use super::forms::{ConfirmDelete, ConfirmReturn, FormPurpose, RecordForm};
use super::helpers::{centered_rect, plural, surface_error};
use super::screens::{rows_for, student_loan_rows, CatalogScreen, Row, StudentLoansScreen};

/// Space reserved for the tab bar.
const HEADER_HEIGHT: u16 = 3;
/// Footer space reserved for status messages and instructions.
const FOOTER_HEIGHT: u16 = 3;
/// Rows skipped by PageUp/PageDown.
const PAGE: isize = 10;

/// High-level navigation states.
enum Screen {
    Catalog,
    StudentLoans(StudentLoansScreen),
}

/// Modal overlays scoped to the current screen.
enum Mode {
    Normal,
    Form(RecordForm),
    ConfirmDelete(ConfirmDelete),
    ConfirmReturn(ConfirmReturn),
}

/// Holds the footer message text plus its severity.
struct StatusMessage {
    text: String,
    kind: StatusKind,
}

/// Severity levels shown in the footer.
enum StatusKind {
    Info,
    Error,
}

impl StatusKind {
    fn style(&self) -> Style {
        match self {
            StatusKind::Info => Style::default().fg(Color::Green),
            StatusKind::Error => Style::default().fg(Color::Red),
        }
    }
}

/// Central application state shared across the TUI. The catalog is owned
/// here; every edit goes through its operations, which persist on success.
pub struct App {
    catalog: Catalog,
    listing: CatalogScreen,
    screen: Screen,
    mode: Mode,
    status: Option<StatusMessage>,
}

impl App {
    pub fn new(catalog: Catalog) -> Self {
        Self {
            catalog,
            listing: CatalogScreen::new(),
            screen: Screen::Catalog,
            mode: Mode::Normal,
            status: None,
        }
    }

    /// Start the UI with a footer note summarizing what was loaded.
    pub fn with_load_report(catalog: Catalog, report: &LoadReport) -> Self {
        let mut app = Self::new(catalog);
        let loaded = report.total_loaded();
        let skipped = report.total_skipped();
        if skipped == 0 {
            app.set_status(
                format!("Loaded {loaded} record{}.", plural(loaded)),
                StatusKind::Info,
            );
        } else {
            app.set_status(
                format!(
                    "Loaded {loaded} record{}; skipped {skipped} malformed line{} (see log).",
                    plural(loaded),
                    plural(skipped)
                ),
                StatusKind::Error,
            );
        }
        app
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Route a key press to the active mode. Returns `true` when the user
    /// asked to quit.
    pub fn handle_key(&mut self, code: KeyCode) -> Result<bool> {
        let mut exit = false;
        let mode = mem::replace(&mut self.mode, Mode::Normal);

        self.mode = match mode {
            Mode::Normal => match self.screen {
                Screen::Catalog => self.handle_catalog_key(code, &mut exit)?,
                Screen::StudentLoans(_) => self.handle_student_loans_key(code, &mut exit)?,
            },
            Mode::Form(form) => self.handle_form(code, form)?,
            Mode::ConfirmDelete(confirm) => self.handle_confirm_delete(code, confirm)?,
            Mode::ConfirmReturn(confirm) => self.handle_confirm_return(code, confirm)?,
        };

        Ok(exit)
    }

    fn handle_catalog_key(&mut self, code: KeyCode, exit: &mut bool) -> Result<Mode> {
        let entity = self.listing.entity();
        let len = self.current_rows().len();

        match code {
            KeyCode::Char('q') | KeyCode::Esc => {
                *exit = true;
            }
            KeyCode::Tab | KeyCode::Right => {
                self.clear_status();
                self.listing.next_tab();
            }
            KeyCode::BackTab | KeyCode::Left => {
                self.clear_status();
                self.listing.previous_tab();
            }
            KeyCode::Up => self.listing.move_selection(-1, len),
            KeyCode::Down => self.listing.move_selection(1, len),
            KeyCode::PageUp => self.listing.move_selection(-PAGE, len),
            KeyCode::PageDown => self.listing.move_selection(PAGE, len),
            KeyCode::Home => self.listing.select(0),
            KeyCode::End => self.listing.select(len.saturating_sub(1)),
            KeyCode::Char('+') => {
                self.clear_status();
                return Ok(Mode::Form(self.add_form(entity)));
            }
            KeyCode::Char('e') | KeyCode::Char('E') => {
                if entity == Entity::Loan {
                    self.set_status(
                        "Loans cannot be edited; press 'r' to return one.",
                        StatusKind::Error,
                    );
                } else if let Some(form) = self
                    .selected_id()
                    .and_then(|id| self.edit_form(entity, id))
                {
                    self.clear_status();
                    return Ok(Mode::Form(form));
                } else {
                    self.set_status(
                        format!("No {} selected to edit.", entity.to_string().to_lowercase()),
                        StatusKind::Error,
                    );
                }
            }
            KeyCode::Char('-') => {
                if entity == Entity::Loan {
                    self.set_status("Loans are kept as history.", StatusKind::Error);
                } else if let Some(row) = self.current_rows().get(self.listing.selected()) {
                    let confirm = ConfirmDelete {
                        entity,
                        id: row.id,
                        label: row.text.clone(),
                    };
                    self.clear_status();
                    return Ok(Mode::ConfirmDelete(confirm));
                } else {
                    self.set_status(
                        format!("No {} selected to delete.", entity.to_string().to_lowercase()),
                        StatusKind::Error,
                    );
                }
            }
            KeyCode::Char('b') | KeyCode::Char('B') => {
                let selected = self.selected_id();
                let (book_id, student_id) = match entity {
                    Entity::Book => (selected, None),
                    Entity::Student => (None, selected),
                    _ => (None, None),
                };
                self.clear_status();
                return Ok(Mode::Form(RecordForm::borrow(
                    self.catalog.next_loan_id(),
                    book_id,
                    student_id,
                )));
            }
            KeyCode::Char('r') | KeyCode::Char('R') => {
                if entity != Entity::Loan {
                    self.set_status("Switch to the Loans tab to return a book.", StatusKind::Error);
                } else if let Some(loan_id) = self.selected_id() {
                    return Ok(self.confirm_return(loan_id));
                } else {
                    self.set_status("No loan selected to return.", StatusKind::Error);
                }
            }
            KeyCode::Char('a') | KeyCode::Char('A') => {
                if entity == Entity::Loan {
                    let active_only = self.listing.toggle_active_only();
                    let len = self.current_rows().len();
                    self.listing.ensure_in_bounds(len);
                    let message = if active_only {
                        "Showing active loans only."
                    } else {
                        "Showing all loans."
                    };
                    self.set_status(message, StatusKind::Info);
                }
            }
            KeyCode::Enter => {
                if entity == Entity::Student {
                    if let Some(student_id) = self.selected_id() {
                        self.clear_status();
                        self.screen = Screen::StudentLoans(StudentLoansScreen::new(student_id));
                    }
                }
            }
            KeyCode::Char('s') | KeyCode::Char('S') => self.save_all(),
            _ => {}
        }

        Ok(Mode::Normal)
    }

    fn handle_student_loans_key(&mut self, code: KeyCode, exit: &mut bool) -> Result<Mode> {
        let Screen::StudentLoans(view) = &self.screen else {
            return Ok(Mode::Normal);
        };
        let student_id = view.student_id;
        let (_, rows) = student_loan_rows(&self.catalog, student_id);
        let selected_loan = rows.get(view.selected).map(|row| row.id);
        let len = rows.len();

        match code {
            KeyCode::Char('q') => {
                *exit = true;
            }
            KeyCode::Esc | KeyCode::Backspace => {
                self.clear_status();
                self.screen = Screen::Catalog;
            }
            KeyCode::Up | KeyCode::Down | KeyCode::PageUp | KeyCode::PageDown => {
                let offset = match code {
                    KeyCode::Up => -1,
                    KeyCode::Down => 1,
                    KeyCode::PageUp => -PAGE,
                    _ => PAGE,
                };
                if let Screen::StudentLoans(view) = &mut self.screen {
                    view.move_selection(offset, len);
                }
            }
            KeyCode::Char('r') | KeyCode::Char('R') => match selected_loan {
                Some(loan_id) => return Ok(self.confirm_return(loan_id)),
                None => self.set_status("No loan selected to return.", StatusKind::Error),
            },
            KeyCode::Char('b') | KeyCode::Char('B') => {
                self.clear_status();
                return Ok(Mode::Form(RecordForm::borrow(
                    self.catalog.next_loan_id(),
                    None,
                    Some(student_id),
                )));
            }
            KeyCode::Char('s') | KeyCode::Char('S') => self.save_all(),
            _ => {}
        }

        Ok(Mode::Normal)
    }

    fn handle_form(&mut self, code: KeyCode, mut form: RecordForm) -> Result<Mode> {
        match code {
            KeyCode::Esc => {
                self.set_status("Cancelled.", StatusKind::Info);
                return Ok(Mode::Normal);
            }
            KeyCode::Tab | KeyCode::Down => form.next_field(),
            KeyCode::BackTab | KeyCode::Up => form.previous_field(),
            KeyCode::Backspace => form.backspace(),
            KeyCode::Enter => match self.submit_form(&form) {
                Ok(()) => return Ok(Mode::Normal),
                Err(err) => {
                    let message = surface_error(&err);
                    self.set_status(message.clone(), StatusKind::Error);
                    // The change is already in memory; retrying would duplicate it.
                    if matches!(
                        err.downcast_ref::<CatalogError>(),
                        Some(CatalogError::Io { .. })
                    ) {
                        return Ok(Mode::Normal);
                    }
                    form.error = Some(message);
                }
            },
            KeyCode::Char(ch) => {
                if form.push_char(ch) {
                    form.error = None;
                }
            }
            _ => {}
        }

        Ok(Mode::Form(form))
    }

    fn handle_confirm_delete(&mut self, code: KeyCode, confirm: ConfirmDelete) -> Result<Mode> {
        match code {
            KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => {
                if let Err(err) = self.perform_delete(&confirm) {
                    self.set_status(surface_error(&err), StatusKind::Error);
                }
                let len = self.current_rows().len();
                self.listing.ensure_in_bounds(len);
                Ok(Mode::Normal)
            }
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                self.set_status("Delete cancelled.", StatusKind::Info);
                Ok(Mode::Normal)
            }
            _ => Ok(Mode::ConfirmDelete(confirm)),
        }
    }

    fn handle_confirm_return(&mut self, code: KeyCode, confirm: ConfirmReturn) -> Result<Mode> {
        match code {
            KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => {
                match self.catalog.give_back(confirm.loan_id) {
                    Ok(date) => self.set_status(
                        format!("Loan {} returned on {date}.", confirm.loan_id),
                        StatusKind::Info,
                    ),
                    Err(err) => {
                        let message = surface_error(&anyhow::Error::from(err));
                        self.set_status(message, StatusKind::Error);
                    }
                }
                let len = self.current_rows().len();
                self.listing.ensure_in_bounds(len);
                Ok(Mode::Normal)
            }
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                self.set_status("Return cancelled.", StatusKind::Info);
                Ok(Mode::Normal)
            }
            _ => Ok(Mode::ConfirmReturn(confirm)),
        }
    }

    pub(crate) fn draw(&self, frame: &mut Frame) {
        let area = frame.area();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(HEADER_HEIGHT),
                Constraint::Min(0),
                Constraint::Length(FOOTER_HEIGHT),
            ])
            .split(area);

        self.draw_tabs(frame, chunks[0]);
        match &self.screen {
            Screen::Catalog => self.draw_listing(frame, chunks[1]),
            Screen::StudentLoans(view) => self.draw_student_loans(frame, chunks[1], view),
        }
        self.draw_footer(frame, chunks[2]);

        match &self.mode {
            Mode::Form(form) => self.draw_form(frame, area, form),
            Mode::ConfirmDelete(confirm) => self.draw_confirm_delete(frame, area, confirm),
            Mode::ConfirmReturn(confirm) => self.draw_confirm_return(frame, area, confirm),
            Mode::Normal => {}
        }
    }

    fn draw_tabs(&self, frame: &mut Frame, area: Rect) {
        let titles: Vec<Line> = self
            .catalog
            .counts()
            .iter()
            .map(|(entity, count)| Line::from(format!("{} ({count})", entity.plural())))
            .collect();

        let tabs = Tabs::new(titles)
            .block(Block::default().borders(Borders::ALL).title("Library Catalog"))
            .select(self.listing.tab)
            .highlight_style(
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            );
        frame.render_widget(tabs, area);
    }

    fn draw_listing(&self, frame: &mut Frame, area: Rect) {
        let entity = self.listing.entity();
        let rows = self.current_rows();
        let title = if entity == Entity::Loan && self.listing.active_only {
            format!("{} - active only", entity.plural())
        } else {
            entity.plural().to_string()
        };

        if rows.is_empty() {
            let message = match entity {
                Entity::Loan if self.listing.active_only => "No active loans.".to_string(),
                Entity::Loan => "No loans recorded. Press 'b' to lend a book.".to_string(),
                _ => format!(
                    "No {} registered. Press '+' to add one.",
                    entity.plural().to_lowercase()
                ),
            };
            let paragraph = Paragraph::new(message)
                .alignment(Alignment::Center)
                .block(Block::default().borders(Borders::ALL).title(title));
            frame.render_widget(paragraph, area);
            return;
        }

        render_rows(frame, area, title, &rows, self.listing.selected());
    }

    fn draw_student_loans(&self, frame: &mut Frame, area: Rect, view: &StudentLoansScreen) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(4), Constraint::Min(1)])
            .split(area);

        let (student_name, rows) = student_loan_rows(&self.catalog, view.student_id);
        let active = rows.iter().filter(|row| row.emphasized).count();

        let header = Paragraph::new(vec![
            Line::from(vec![
                Span::styled(
                    format!("Student ID {}", view.student_id),
                    Style::default().add_modifier(Modifier::BOLD),
                ),
                Span::raw(format!("  -  {student_name}")),
            ]),
            Line::from(Span::raw(format!(
                "{} loan{} recorded, {active} active",
                rows.len(),
                plural(rows.len())
            ))),
        ])
        .alignment(Alignment::Left)
        .block(Block::default().borders(Borders::ALL).title("Loans by Student"));
        frame.render_widget(header, chunks[0]);

        if rows.is_empty() {
            let message = Paragraph::new("No loans recorded for this student.")
                .alignment(Alignment::Center)
                .block(Block::default().borders(Borders::ALL));
            frame.render_widget(message, chunks[1]);
            return;
        }

        render_rows(frame, chunks[1], "History".to_string(), &rows, view.selected);
    }

    fn draw_footer(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default().borders(Borders::TOP);
        frame.render_widget(block.clone(), area);
        let inner = block.inner(area);

        let status_line = if let Some(status) = &self.status {
            Line::from(vec![Span::styled(status.text.clone(), status.kind.style())])
        } else {
            Line::from("")
        };

        let paragraph = Paragraph::new(vec![status_line, self.footer_instructions()])
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, inner);
    }

    fn footer_instructions(&self) -> Line<'static> {
        let key_style = Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD);
        let keys: &[(&str, &str)] = match (&self.screen, &self.mode) {
            (_, Mode::Form(_)) => &[
                ("[Tab]", " Next field   "),
                ("[Enter]", " Save   "),
                ("[Esc]", " Cancel"),
            ],
            (_, Mode::ConfirmDelete(_) | Mode::ConfirmReturn(_)) => {
                &[("[y]", " Confirm   "), ("[n]", " Cancel")]
            }
            (Screen::StudentLoans(_), Mode::Normal) => &[
                ("[↑↓]", " Navigate   "),
                ("[r]", " Return   "),
                ("[b]", " Lend   "),
                ("[Esc]", " Back   "),
                ("[q]", " Quit"),
            ],
            (Screen::Catalog, Mode::Normal) => match self.listing.entity() {
                Entity::Loan => &[
                    ("[Tab]", " Section   "),
                    ("[b]", " Lend   "),
                    ("[r]", " Return   "),
                    ("[a]", " Active only   "),
                    ("[s]", " Save   "),
                    ("[q]", " Quit"),
                ],
                Entity::Student => &[
                    ("[Tab]", " Section   "),
                    ("[+]", " Add   "),
                    ("[e]", " Edit   "),
                    ("[-]", " Delete   "),
                    ("[Enter]", " Loans   "),
                    ("[b]", " Lend   "),
                    ("[s]", " Save   "),
                    ("[q]", " Quit"),
                ],
                Entity::Book => &[
                    ("[Tab]", " Section   "),
                    ("[+]", " Add   "),
                    ("[e]", " Edit   "),
                    ("[-]", " Delete   "),
                    ("[b]", " Lend   "),
                    ("[s]", " Save   "),
                    ("[q]", " Quit"),
                ],
                Entity::Author | Entity::Publisher => &[
                    ("[Tab]", " Section   "),
                    ("[+]", " Add   "),
                    ("[e]", " Edit   "),
                    ("[-]", " Delete   "),
                    ("[s]", " Save   "),
                    ("[q]", " Quit"),
                ],
            },
        };

        Line::from(
            keys.iter()
                .flat_map(|(key, label)| [Span::styled(*key, key_style), Span::raw(*label)])
                .collect::<Vec<_>>(),
        )
    }

    fn draw_form(&self, frame: &mut Frame, area: Rect, form: &RecordForm) {
        let popup_area = centered_rect(70, 50, area);
        frame.render_widget(Clear, popup_area);

        let block = Block::default().title(form.title()).borders(Borders::ALL);
        frame.render_widget(block.clone(), popup_area);
        let inner = block.inner(popup_area);

        let mut lines: Vec<Line> = (0..form.fields.len())
            .map(|idx| form.build_line(idx))
            .collect();
        lines.push(Line::from(""));

        if let Some(error) = &form.error {
            lines.push(Line::from(Span::styled(
                error.clone(),
                Style::default().fg(Color::Red),
            )));
        } else {
            lines.push(Line::from(Span::styled(
                "Enter to save • Tab to switch field • Esc to cancel",
                Style::default().fg(Color::Gray),
            )));
        }

        let paragraph = Paragraph::new(lines).wrap(Wrap { trim: true });
        frame.render_widget(paragraph, inner);

        frame.set_cursor_position(cursor_position(inner, form));
    }

    fn draw_confirm_delete(&self, frame: &mut Frame, area: Rect, confirm: &ConfirmDelete) {
        let popup_area = centered_rect(60, 30, area);
        frame.render_widget(Clear, popup_area);

        let block = Block::default()
            .title("Confirm Removal")
            .borders(Borders::ALL);
        frame.render_widget(block.clone(), popup_area);
        let inner = block.inner(popup_area);

        let lines = vec![
            Line::from(format!("Delete {} ID {}?", confirm.entity, confirm.id)),
            Line::from(confirm.label.clone()),
            Line::from(""),
            Line::from(Span::styled(
                "Press Y to confirm or N / Esc to cancel.",
                Style::default().fg(Color::Gray),
            )),
        ];

        let paragraph = Paragraph::new(lines)
            .alignment(Alignment::Left)
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, inner);
    }

    fn draw_confirm_return(&self, frame: &mut Frame, area: Rect, confirm: &ConfirmReturn) {
        let popup_area = centered_rect(60, 30, area);
        frame.render_widget(Clear, popup_area);

        let block = Block::default().title("Return Book").borders(Borders::ALL);
        frame.render_widget(block.clone(), popup_area);
        let inner = block.inner(popup_area);

        let lines = vec![
            Line::from(format!(
                "Return \"{}\" borrowed by {} (loan ID {})?",
                confirm.book_title, confirm.student_name, confirm.loan_id
            )),
            Line::from("The return date will be today's date."),
            Line::from(""),
            Line::from(Span::styled(
                "Press Y to confirm or N / Esc to cancel.",
                Style::default().fg(Color::Gray),
            )),
        ];

        let paragraph = Paragraph::new(lines)
            .alignment(Alignment::Left)
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, inner);
    }

    fn set_status<S: Into<String>>(&mut self, text: S, kind: StatusKind) {
        self.status = Some(StatusMessage {
            text: text.into(),
            kind,
        });
    }

    fn clear_status(&mut self) {
        self.status = None;
    }

    fn current_rows(&self) -> Vec<Row> {
        rows_for(&self.catalog, self.listing.entity(), self.listing.active_only)
    }

    fn selected_id(&self) -> Option<i64> {
        self.current_rows()
            .get(self.listing.selected())
            .map(|row| row.id)
    }

    /// Switch to `entity`'s tab and select the record with `id`.
    fn focus(&mut self, entity: Entity, id: i64) {
        self.listing.show(entity);
        if let Some(idx) = self.current_rows().iter().position(|row| row.id == id) {
            self.listing.select(idx);
        }
    }

    fn add_form(&self, entity: Entity) -> RecordForm {
        match entity {
            Entity::Student => RecordForm::add(entity, self.catalog.next_student_id()),
            Entity::Author => RecordForm::add(entity, self.catalog.next_author_id()),
            Entity::Publisher => RecordForm::add(entity, self.catalog.next_publisher_id()),
            Entity::Book => RecordForm::add(entity, self.catalog.next_book_id()),
            Entity::Loan => RecordForm::borrow(self.catalog.next_loan_id(), None, None),
        }
    }

    fn edit_form(&self, entity: Entity, id: i64) -> Option<RecordForm> {
        match entity {
            Entity::Student => self.catalog.find_student(id).map(RecordForm::edit_student),
            Entity::Author => self.catalog.find_author(id).map(RecordForm::edit_author),
            Entity::Publisher => self.catalog.find_publisher(id).map(RecordForm::edit_publisher),
            Entity::Book => self.catalog.find_book(id).map(RecordForm::edit_book),
            Entity::Loan => None,
        }
    }

    fn confirm_return(&mut self, loan_id: i64) -> Mode {
        let listing = self
            .catalog
            .list_loans(false)
            .into_iter()
            .find(|listing| listing.loan.id == loan_id);

        let Some(listing) = listing else {
            self.set_status(
                CatalogError::NotFound {
                    entity: Entity::Loan,
                    id: loan_id,
                }
                .to_string(),
                StatusKind::Error,
            );
            return Mode::Normal;
        };

        if let LoanStatus::Returned(date) = listing.loan.status() {
            let message = CatalogError::AlreadyReturned {
                loan_id,
                date: date.to_string(),
            }
            .to_string();
            self.set_status(message, StatusKind::Error);
            return Mode::Normal;
        }

        let confirm = ConfirmReturn {
            loan_id,
            book_title: listing.book_title.to_string(),
            student_name: listing.student_name.to_string(),
        };
        self.clear_status();
        Mode::ConfirmReturn(confirm)
    }

    fn submit_form(&mut self, form: &RecordForm) -> Result<()> {
        match (form.purpose, form.entity) {
            (FormPurpose::Borrow, _) | (_, Entity::Loan) => {
                let (book_id, student_id, date) = form.to_loan_request()?;
                let loan_id = self.catalog.borrow(book_id, student_id, &date)?;
                if matches!(self.screen, Screen::Catalog) {
                    self.focus(Entity::Loan, loan_id);
                }
                self.set_status(
                    format!(
                        "Loan {loan_id} recorded: book {book_id} lent to student {student_id} on {date}."
                    ),
                    StatusKind::Info,
                );
            }
            (FormPurpose::Add, entity) => {
                match entity {
                    Entity::Student => self.catalog.add_student(form.to_student()?)?,
                    Entity::Author => self.catalog.add_author(form.to_author()?)?,
                    Entity::Publisher => self.catalog.add_publisher(form.to_publisher()?)?,
                    Entity::Book => self.catalog.add_book(form.to_book()?)?,
                    Entity::Loan => return Err(anyhow!("Use the lend dialog to record loans.")),
                }
                self.focus(entity, form.id);
                self.set_status(format!("{entity} added with ID {}.", form.id), StatusKind::Info);
            }
            (FormPurpose::Edit, Entity::Book) => {
                let outcome = self.catalog.update_book(form.id, form.to_book_patch()?)?;
                if outcome.is_clean() {
                    self.set_status(format!("Book {} updated.", form.id), StatusKind::Info);
                } else {
                    let kept = outcome
                        .rejected
                        .iter()
                        .map(ToString::to_string)
                        .collect::<Vec<_>>()
                        .join(" ");
                    self.set_status(
                        format!("Book {} updated, some values kept: {kept}", form.id),
                        StatusKind::Error,
                    );
                }
            }
            (FormPurpose::Edit, entity) => {
                match entity {
                    Entity::Student => self
                        .catalog
                        .update_student(form.id, form.to_student_patch()?)?,
                    Entity::Author => self
                        .catalog
                        .update_author(form.id, form.to_author_patch()?)?,
                    Entity::Publisher => self
                        .catalog
                        .update_publisher(form.id, form.to_publisher_patch()?)?,
                    Entity::Book | Entity::Loan => {
                        return Err(anyhow!("{entity} records cannot be edited here."))
                    }
                }
                self.set_status(format!("{entity} {} updated.", form.id), StatusKind::Info);
            }
        }
        Ok(())
    }

    fn perform_delete(&mut self, confirm: &ConfirmDelete) -> Result<()> {
        match confirm.entity {
            Entity::Student => {
                self.catalog.remove_student(confirm.id)?;
            }
            Entity::Author => {
                self.catalog.remove_author(confirm.id)?;
            }
            Entity::Publisher => {
                self.catalog.remove_publisher(confirm.id)?;
            }
            Entity::Book => {
                self.catalog.remove_book(confirm.id)?;
            }
            Entity::Loan => return Err(anyhow!("Loans are kept as history.")),
        }
        self.set_status(
            format!("Deleted {} ID {}.", confirm.entity, confirm.id),
            StatusKind::Info,
        );
        Ok(())
    }

    fn save_all(&mut self) {
        match self.catalog.save_all() {
            Ok(()) => {
                let message = format!("Saved to {}.", self.catalog.storage().dir().display());
                self.set_status(message, StatusKind::Info);
            }
            Err(err) => {
                let message = surface_error(&anyhow::Error::from(err));
                self.set_status(message, StatusKind::Error);
            }
        }
    }
}

/// Terminal cell for the form cursor, kept inside `inner` however long the
/// input grows.
fn cursor_position(inner: Rect, form: &RecordForm) -> (u16, u16) {
    let column = u16::try_from(form.cursor_offset()).unwrap_or(u16::MAX);
    let row = u16::try_from(form.active).unwrap_or(u16::MAX);
    let x = inner
        .x
        .saturating_add(column)
        .min(inner.right().saturating_sub(1));
    let y = inner
        .y
        .saturating_add(row)
        .min(inner.bottom().saturating_sub(1));
    (x, y)
}

fn render_rows(frame: &mut Frame, area: Rect, title: String, rows: &[Row], selected: usize) {
    let items: Vec<ListItem> = rows
        .iter()
        .map(|row| {
            let style = if row.emphasized {
                Style::default().fg(Color::Cyan)
            } else {
                Style::default()
            };
            ListItem::new(Line::from(Span::styled(row.text.clone(), style)))
        })
        .collect();

    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title(title))
        .highlight_style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    let mut state = ListState::default().with_selected(Some(selected));
    frame.render_stateful_widget(list, area, &mut state);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Storage;
    use crate::models::{Author, Book, Publisher, Student};

    fn seeded_app(dir: &std::path::Path) -> App {
        let mut catalog = Catalog::new(Storage::new(dir));
        catalog
            .add_student(Student {
                id: 1,
                name: "Ana Lopez".to_string(),
                grade: "First".to_string(),
            })
            .unwrap();
        catalog
            .add_author(Author {
                id: 1,
                name: "Gabriel Garcia Marquez".to_string(),
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
        App::new(catalog)
    }

    fn type_text(app: &mut App, text: &str) {
        for ch in text.chars() {
            app.handle_key(KeyCode::Char(ch)).unwrap();
        }
    }

    #[test]
    fn form_cursor_stays_inside_the_dialog() {
        let mut form = RecordForm::add(Entity::Student, 1);
        let inner = Rect::new(10, 5, 20, 4);
        assert_eq!(cursor_position(inner, &form), (16, 5));

        for _ in 0..40 {
            form.push_char('a');
        }
        form.active = 1;
        form.next_field();
        assert_eq!(cursor_position(inner, &form), (29, 5));
    }

    #[test]
    fn adding_a_student_through_the_form() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = seeded_app(dir.path());

        app.handle_key(KeyCode::Char('+')).unwrap();
        type_text(&mut app, "Luis Perez");
        app.handle_key(KeyCode::Tab).unwrap();
        type_text(&mut app, "Second");
        app.handle_key(KeyCode::Enter).unwrap();

        let student = app.catalog().find_student(2).unwrap();
        assert_eq!(student.name, "Luis Perez");
        assert!(matches!(app.mode, Mode::Normal));
        assert_eq!(app.listing.selected(), 1);
    }

    #[test]
    fn lending_from_the_books_tab_prefills_the_book() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = seeded_app(dir.path());
        app.listing.show(Entity::Book);

        app.handle_key(KeyCode::Char('b')).unwrap();
        type_text(&mut app, "1");
        app.handle_key(KeyCode::Tab).unwrap();
        type_text(&mut app, "2024-01-10");
        app.handle_key(KeyCode::Enter).unwrap();

        let loan = app.catalog().find_loan(1).unwrap();
        assert_eq!((loan.book_id, loan.student_id), (1, 1));
        assert_eq!(loan.loan_date, "2024-01-10");
        assert_eq!(app.listing.entity(), Entity::Loan);
    }

    #[test]
    fn blocked_delete_reports_the_conflict() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = seeded_app(dir.path());
        app.listing.show(Entity::Author);

        app.handle_key(KeyCode::Char('-')).unwrap();
        app.handle_key(KeyCode::Char('y')).unwrap();

        assert!(app.catalog().find_author(1).is_some());
        let status = app.status.as_ref().unwrap();
        assert!(matches!(status.kind, StatusKind::Error));
        assert!(status.text.contains("referenced by book ID 1"));
    }

    #[test]
    fn invalid_form_input_keeps_the_form_open() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = seeded_app(dir.path());

        app.handle_key(KeyCode::Char('+')).unwrap();
        type_text(&mut app, "R2D2");
        app.handle_key(KeyCode::Tab).unwrap();
        type_text(&mut app, "First");
        app.handle_key(KeyCode::Enter).unwrap();

        match &app.mode {
            Mode::Form(form) => assert!(form.error.is_some()),
            _ => panic!("form should stay open"),
        }
        assert!(app.catalog().find_student(2).is_none());
    }

    #[test]
    fn returning_a_loan_from_the_loans_tab() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = seeded_app(dir.path());
        app.catalog.borrow(1, 1, "2024-01-10").unwrap();
        app.listing.show(Entity::Loan);

        app.handle_key(KeyCode::Char('r')).unwrap();
        assert!(matches!(app.mode, Mode::ConfirmReturn(_)));
        app.handle_key(KeyCode::Char('y')).unwrap();

        assert!(!app.catalog().find_loan(1).unwrap().is_active());

        app.handle_key(KeyCode::Char('r')).unwrap();
        assert!(matches!(app.mode, Mode::Normal));
        assert!(app.status.as_ref().unwrap().text.contains("already returned"));
    }
}
